use std::{borrow::Cow, fmt::Display, mem::ManuallyDrop};

use facet_core::{Facet, Shape, Type, UserType};

use crate::{ParseError, ScalarKind, Tags, TagsError, TagsErrorKind, walk::SKIP};

/// The field types [`populate_fields_from_tags`] knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseTarget {
    /// What the tag value is parsed into.
    pub kind: ScalarKind,
    /// Whether the field is an `Option` of `kind`.
    pub optional: bool,
}

impl ParseTarget {
    /// Classifies a field shape, or returns `None` for unsupported types.
    pub fn of(shape: &'static Shape) -> Option<Self> {
        let (kind, optional) = if shape.is_type::<String>() {
            (ScalarKind::String, false)
        } else if shape.is_type::<Option<String>>() {
            (ScalarKind::String, true)
        } else if shape.is_type::<i64>() {
            (ScalarKind::Int, false)
        } else if shape.is_type::<Option<i64>>() {
            (ScalarKind::Int, true)
        } else if shape.is_type::<f64>() {
            (ScalarKind::Float, false)
        } else if shape.is_type::<Option<f64>>() {
            (ScalarKind::Float, true)
        } else if shape.is_type::<bool>() {
            (ScalarKind::Bool, false)
        } else if shape.is_type::<Option<bool>>() {
            (ScalarKind::Bool, true)
        } else {
            return None;
        };
        Some(Self { kind, optional })
    }

    /// Reads `key` from `tags` into the field at `slot`.
    ///
    /// # Safety
    ///
    /// `slot` must point to a live, initialized value of the type this target
    /// was classified from, with no other reference to it alive. It need not
    /// be aligned.
    unsafe fn read(self, tags: &Tags<'_>, key: &str, slot: *mut u8) -> Result<(), ParseError> {
        unsafe {
            match (self.kind, self.optional) {
                (ScalarKind::String, false) => with_unaligned(slot, |s: &mut String| {
                    read_string_tag(tags, key, s);
                    Ok(())
                }),
                (ScalarKind::String, true) => with_unaligned(slot, |s: &mut Option<String>| {
                    read_optional_string_tag(tags, key, s);
                    Ok(())
                }),
                (ScalarKind::Int, false) => with_unaligned(slot, |v| read_int_tag(tags, key, v)),
                (ScalarKind::Int, true) => {
                    with_unaligned(slot, |v| read_optional_int_tag(tags, key, v))
                }
                (ScalarKind::Float, false) => {
                    with_unaligned(slot, |v| read_float_tag(tags, key, v))
                }
                (ScalarKind::Float, true) => {
                    with_unaligned(slot, |v| read_optional_float_tag(tags, key, v))
                }
                (ScalarKind::Bool, false) => with_unaligned(slot, |v| read_bool_tag(tags, key, v)),
                (ScalarKind::Bool, true) => {
                    with_unaligned(slot, |v| read_optional_bool_tag(tags, key, v))
                }
            }
        }
    }
}

/// Moves the value at `slot` out, hands it to `f`, and moves it back.
///
/// Fields of `#[repr(packed)]` structs may sit at any address, so no
/// reference into `slot` is ever formed. The value is written back even if
/// `f` unwinds.
///
/// # Safety
///
/// `slot` must point to a live, initialized `T` that nothing else accesses
/// for the duration of the call.
unsafe fn with_unaligned<T, R>(slot: *mut u8, f: impl FnOnce(&mut T) -> R) -> R {
    struct WriteBack<T> {
        slot: *mut T,
        value: ManuallyDrop<T>,
    }

    impl<T> Drop for WriteBack<T> {
        fn drop(&mut self) {
            // SAFETY: `value` was read from `slot` and is taken exactly once.
            unsafe { self.slot.write_unaligned(ManuallyDrop::take(&mut self.value)) }
        }
    }

    let slot = slot.cast::<T>();
    let mut guard = WriteBack {
        slot,
        // SAFETY: the caller guarantees a live `T` at `slot`; ownership moves
        // into the guard until it is written back.
        value: ManuallyDrop::new(unsafe { slot.read_unaligned() }),
    };
    f(&mut *guard.value)
}

/// Fills the fields of `dest` from the values of a tag bundle.
///
/// Each top-level field reads the key named after it, with the first letter
/// lower-cased: a field `Title` reads `title`. Fields of flattened structs are
/// not descended into. Supported field types are `String`, `i64`, `f64`,
/// `bool` and their `Option`s; other fields are left alone. Keys missing from
/// the bundle leave their field unchanged.
///
/// A `"-"` value clears a non-empty `String` and resets a non-empty
/// `Option<String>` to `None`. It is never stored.
///
/// Values that fail to parse leave their field unchanged. All failures are
/// reported together, in field order, once every field has been processed.
pub fn populate_fields_from_tags<'facet, T: Facet<'facet>>(
    dest: &mut T,
    tags: &Tags<'_>,
) -> Result<(), TagsError> {
    let Type::User(UserType::Struct(struct_type)) = &T::SHAPE.ty else {
        return Err(TagsErrorKind::InvalidArgument("destination must be a struct").into());
    };

    let base = (dest as *mut T).cast::<u8>();
    let mut errors = Vec::new();

    for field in struct_type.fields {
        let field_shape = field.shape;
        let Some(target) = ParseTarget::of(field_shape) else {
            log::trace!(
                "Skipping field {} of unsupported type {field_shape}",
                field.name
            );
            continue;
        };

        let key = lower_first(field.name);
        log::trace!("Populating field {} from tag {key} as {target:?}", field.name);

        // SAFETY: `field` comes from `T`'s own shape, so `offset` is in bounds
        // of `*dest` and the value there has the type `target` was built from.
        // `dest` is exclusively borrowed for the whole call.
        let result = unsafe { target.read(tags, &key, base.add(field.offset)) };
        if let Err(err) = result {
            errors.push(err);
        }
    }

    if !errors.is_empty() {
        log::debug!(
            "{} of {} fields failed to parse",
            errors.len(),
            struct_type.fields.len()
        );
    }

    join_errors(errors)
}

/// Combines parse failures into a single error, or `Ok` if there were none.
pub fn join_errors(errors: impl IntoIterator<Item = ParseError>) -> Result<(), TagsError> {
    let errors: Vec<ParseError> = errors.into_iter().collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TagsErrorKind::Parse(errors).into())
    }
}

/// Reads a string value verbatim.
///
/// `"-"` clears the holder instead of being stored.
pub fn read_string_tag(tags: &Tags<'_>, name: &str, holder: &mut String) {
    let Some(value) = tags.lookup(name) else {
        return;
    };

    if value == SKIP {
        holder.clear();
        return;
    }

    value.clone_into(holder);
}

/// Reads a string value verbatim into an `Option`.
///
/// `"-"` resets a non-empty holder to `None` and otherwise leaves it alone.
pub fn read_optional_string_tag(tags: &Tags<'_>, name: &str, holder: &mut Option<String>) {
    let Some(value) = tags.lookup(name) else {
        return;
    };

    if value == SKIP {
        if holder.as_deref().is_some_and(|h| !h.is_empty()) {
            *holder = None;
        }
        return;
    }

    *holder = Some(value.to_owned());
}

/// Reads a base-10 `i64`.
pub fn read_int_tag(tags: &Tags<'_>, name: &str, holder: &mut i64) -> Result<(), ParseError> {
    if let Some(v) = read_parsed(tags, name, ScalarKind::Int, str::parse::<i64>)? {
        *holder = v;
    }
    Ok(())
}

/// Reads a base-10 `i64` into an `Option`.
pub fn read_optional_int_tag(
    tags: &Tags<'_>,
    name: &str,
    holder: &mut Option<i64>,
) -> Result<(), ParseError> {
    if let Some(v) = read_parsed(tags, name, ScalarKind::Int, str::parse::<i64>)? {
        *holder = Some(v);
    }
    Ok(())
}

/// Reads an `f64`.
pub fn read_float_tag(tags: &Tags<'_>, name: &str, holder: &mut f64) -> Result<(), ParseError> {
    if let Some(v) = read_parsed(tags, name, ScalarKind::Float, str::parse::<f64>)? {
        *holder = v;
    }
    Ok(())
}

/// Reads an `f64` into an `Option`.
pub fn read_optional_float_tag(
    tags: &Tags<'_>,
    name: &str,
    holder: &mut Option<f64>,
) -> Result<(), ParseError> {
    if let Some(v) = read_parsed(tags, name, ScalarKind::Float, str::parse::<f64>)? {
        *holder = Some(v);
    }
    Ok(())
}

/// Reads a `bool`, accepting `1`, `t`, `true` and `0`, `f`, `false` in the
/// usual capitalizations.
pub fn read_bool_tag(tags: &Tags<'_>, name: &str, holder: &mut bool) -> Result<(), ParseError> {
    if let Some(v) = read_parsed(tags, name, ScalarKind::Bool, parse_bool)? {
        *holder = v;
    }
    Ok(())
}

/// Reads a `bool` into an `Option`. See [`read_bool_tag`] for accepted spellings.
pub fn read_optional_bool_tag(
    tags: &Tags<'_>,
    name: &str,
    holder: &mut Option<bool>,
) -> Result<(), ParseError> {
    if let Some(v) = read_parsed(tags, name, ScalarKind::Bool, parse_bool)? {
        *holder = Some(v);
    }
    Ok(())
}

fn read_parsed<T, E: Display>(
    tags: &Tags<'_>,
    name: &str,
    kind: ScalarKind,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<Option<T>, ParseError> {
    let Some(value) = tags.lookup(name) else {
        return Ok(None);
    };

    parse(value)
        .map(Some)
        .map_err(|reason| ParseError::new(kind, value, name, reason))
}

fn parse_bool(value: &str) -> Result<bool, &'static str> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err("invalid syntax"),
    }
}

/// `Title` -> `title`, `maxItems` -> `maxItems`.
fn lower_first(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            Cow::Owned(first.to_lowercase().chain(chars).collect())
        }
        _ => Cow::Borrowed(name),
    }
}
