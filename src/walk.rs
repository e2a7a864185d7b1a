use std::ops::ControlFlow;

use facet_core::{Facet, Field, FieldFlags};
use facet_reflect::{HasFields, Peek, PeekStruct};

use crate::Tags;

/// Tag value that excludes a field, or a flattened field's whole subtree.
pub(crate) const SKIP: &str = "-";

/// Checks whether `value` has at least one field tagged with `key`.
///
/// Fields of `#[facet(flatten)]` sub-structs count, unless the flattened
/// field itself is tagged `"-"` under `key`. Values that aren't structs (or
/// an `Option` of one) have no tagged fields.
pub fn has_tagged_fields<'facet, T: Facet<'facet> + ?Sized>(value: &T, key: &str) -> bool {
    try_walk_tagged_fields(Peek::new(value), key, |_, _, _| ControlFlow::Break(())).is_break()
}

/// Collects `(field name, tag)` for every field tagged with `key`, in walk order.
pub fn tagged_fields<'facet, T: Facet<'facet> + ?Sized>(
    value: &T,
    key: &str,
) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    walk_tagged_fields(Peek::new(value), key, |_, field, tag| {
        fields.push((field.name, tag.to_owned()));
    });
    fields
}

/// Visits every field of a struct that is tagged with `key`.
///
/// The visitor receives the field's value, its descriptor and the primary tag
/// value (the part before the first comma). Fields are visited in declaration
/// order. Flattened fields are never visited themselves: their own fields are
/// visited in their place, or skipped entirely when the flattened field is
/// tagged `"-"`. Fields whose tag is missing, empty or `"-"` are skipped.
///
/// The value is looked through `Option`s and transparent wrappers first. Walking
/// `None` or a value that isn't a struct visits nothing.
pub fn walk_tagged_fields<'mem, 'facet, F>(peek: Peek<'mem, 'facet>, key: &str, mut visit: F)
where
    F: FnMut(Peek<'mem, 'facet>, &Field, &str),
{
    let _ = try_walk_tagged_fields(peek, key, |value, field, tag| {
        visit(value, field, tag);
        ControlFlow::<()>::Continue(())
    });
}

/// Like [`walk_tagged_fields`], but stops at the first visitor that breaks.
pub fn try_walk_tagged_fields<'mem, 'facet, B, F>(
    peek: Peek<'mem, 'facet>,
    key: &str,
    mut visit: F,
) -> ControlFlow<B>
where
    F: FnMut(Peek<'mem, 'facet>, &Field, &str) -> ControlFlow<B>,
{
    walk(peek, key, &mut visit)
}

fn walk<'mem, 'facet, B, F>(peek: Peek<'mem, 'facet>, key: &str, visit: &mut F) -> ControlFlow<B>
where
    F: FnMut(Peek<'mem, 'facet>, &Field, &str) -> ControlFlow<B>,
{
    let Some(record) = resolve_struct(peek) else {
        log::trace!("Nothing to walk in {}", peek.shape());
        return ControlFlow::Continue(());
    };

    for (field, value) in record.fields() {
        let tags = Tags::of(&field);
        let tag = tags.primary(key);

        if field.flags.contains(FieldFlags::FLATTEN) {
            if tag != SKIP {
                log::trace!("Entering flattened field {}", field.name);
                walk(value, key, visit)?;
            }
            continue;
        }

        if tag.is_empty() || tag == SKIP {
            continue;
        }

        log::trace!("Visiting field {} tagged {key}={tag:?}", field.name);
        visit(value, &field, tag)?;
    }

    ControlFlow::Continue(())
}

/// Looks through `Option`s and transparent wrappers down to a struct.
///
/// `None` at any layer resolves to nothing. `innermost_peek` is only asked to
/// peel non-`Option` shapes, since it panics on an empty `Option`.
pub(crate) fn resolve_struct<'mem, 'facet>(
    peek: Peek<'mem, 'facet>,
) -> Option<PeekStruct<'mem, 'facet>> {
    let mut peek = peek;
    loop {
        if let Ok(option) = peek.into_option() {
            peek = option.value()?;
            continue;
        }

        let inner = peek.innermost_peek();
        if inner.shape() == peek.shape() {
            return peek.into_struct().ok();
        }
        peek = inner;
    }
}
