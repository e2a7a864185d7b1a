#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod error;
mod find;
mod populate;
mod tags;
mod walk;

pub use error::{ParseError, ScalarKind, TagsError, TagsErrorKind};
pub use find::{find_tagged_name, tagged};
pub use populate::{
    ParseTarget, join_errors, populate_fields_from_tags, read_bool_tag, read_float_tag,
    read_int_tag, read_optional_bool_tag, read_optional_float_tag, read_optional_int_tag,
    read_optional_string_tag, read_string_tag,
};
pub use tags::Tags;
pub use walk::{has_tagged_fields, tagged_fields, try_walk_tagged_fields, walk_tagged_fields};

// Re-exported for visitor signatures
pub use facet_core::Field;
pub use facet_reflect::Peek;
