use std::ops::ControlFlow;

use facet_core::Facet;
use facet_reflect::Peek;

use crate::{
    TagsError, TagsErrorKind,
    walk::{resolve_struct, try_walk_tagged_fields},
};

/// Returns the tag name of one field of a struct.
///
/// The field is identified by where it lives, not by its name: pass a
/// reference to the struct and a reference to the field inside it. Fields of
/// flattened structs can be found from the outer struct.
///
/// ```
/// use facet::Facet;
///
/// #[derive(Facet)]
/// struct Entity {
///     #[facet(db = "updated_at")]
///     updated_at: i64,
/// }
///
/// let entity = Entity { updated_at: 0 };
/// let name = facet_tags::find_tagged_name(&entity, &entity.updated_at, "db").unwrap();
/// assert_eq!(name, "updated_at");
/// ```
///
/// Fails with [`TagsErrorKind::InvalidArgument`] if `record` isn't a struct,
/// and with [`TagsErrorKind::NotFound`] if `field` isn't one of its fields
/// tagged with `key`.
pub fn find_tagged_name<'facet, R, F>(record: &R, field: &F, key: &str) -> Result<String, TagsError>
where
    R: Facet<'facet> + ?Sized,
    F: Facet<'facet>,
{
    let peek = Peek::new(record);
    if resolve_struct(peek).is_none() {
        return Err(TagsErrorKind::InvalidArgument("record must be a struct").into());
    }

    let target = (field as *const F).cast::<u8>();

    // A struct-typed field shares its address with its own first field, so
    // the shape has to match too.
    let found = try_walk_tagged_fields(peek, key, |value, _, tag| {
        if value.data().as_byte_ptr() == target && value.shape() == F::SHAPE {
            ControlFlow::Break(tag.to_owned())
        } else {
            ControlFlow::Continue(())
        }
    });

    match found {
        ControlFlow::Break(name) => Ok(name),
        ControlFlow::Continue(()) => {
            log::debug!(
                "No field of type {} tagged {key} at {target:p} in {}",
                F::SHAPE,
                peek.shape()
            );
            Err(TagsErrorKind::NotFound.into())
        }
    }
}

/// Like [`find_tagged_name`], but panics if the name can't be found.
///
/// Only use this where the field is known to carry the tag, such as with a
/// field of a concrete type written out at the call site.
pub fn tagged<'facet, R, F>(record: &R, field: &F, key: &str) -> String
where
    R: Facet<'facet> + ?Sized,
    F: Facet<'facet>,
{
    find_tagged_name(record, field, key).unwrap_or_else(|err| panic!("{err}"))
}
