mod validate;
mod yaml;

pub use validate::{is_identifier, validate_story_document};
pub use yaml::{parse_story_document, parse_yaml_document};
