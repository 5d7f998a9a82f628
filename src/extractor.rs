//! Line extractors: recognize one category of log line and parse it into
//! records.

pub mod composite;
pub mod definition;
pub mod line;

pub use composite::CompositeExtractor;
pub use definition::{
    ExtractorDefinition, FieldParse, FieldSpec, TimestampRole, TokenRef, UnknownTime,
};
pub use line::{element_name, LineExtractor};
