//! OpenAPI document binding.
//!
//! Turns a YAML or JSON description into an immutable [`Contract`]: path
//! templates with their operations, merged parameters, content maps, an arena
//! of schema nodes and, for YAML input, source positions.

mod arena;
mod build;
mod load;
mod source_map;
mod types;

pub use arena::{Conditional, Contains, Residual, SchemaArena, SchemaId, SchemaNode};
pub use build::*;
pub use load::*;
pub use source_map::SourceMap;
pub use types::*;

/// Escapes one reference token per RFC 6901.
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Appends an escaped token to a JSON pointer.
pub fn push_pointer(base: &str, segment: &str) -> String {
    format!("{base}/{}", escape_pointer_segment(segment))
}

/// Converts a local `$ref` such as `#/components/schemas/Pet` to a pointer.
///
/// Returns `None` for references into other documents.
pub(crate) fn pointer_from_fragment(reference: &str) -> Option<String> {
    let fragment = reference.strip_prefix('#')?;
    let decoded = urlencoding::decode(fragment).ok()?;
    Some(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_helpers() {
        assert_eq!(escape_pointer_segment("/pets/{id}"), "~1pets~1{id}");
        assert_eq!(escape_pointer_segment("a~b"), "a~0b");
        assert_eq!(push_pointer("/paths", "/pets"), "/paths/~1pets");
        assert_eq!(
            pointer_from_fragment("#/components/schemas/Pet").as_deref(),
            Some("/components/schemas/Pet")
        );
        assert_eq!(pointer_from_fragment("#").as_deref(), Some(""));
        assert_eq!(pointer_from_fragment("common.yaml#/Pet"), None);
    }
}
