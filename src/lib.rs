// src/lib.rs
pub mod catalog;
pub mod clocktime;
pub mod definitions;
pub mod error;
pub mod extractor;
pub mod figure;
pub mod output_format;
pub mod pipeline;
pub mod record;
pub mod signal;
pub mod store;

pub use error::*;

pub use catalog::{Catalog, CatalogEntry, CatalogField};
pub use definitions::{FigureDefinition, GraphDefinitions};
pub use extractor::{
    CompositeExtractor, ExtractorDefinition, FieldParse, FieldSpec, LineExtractor, TimestampRole,
    TokenRef, UnknownTime,
};
pub use figure::{Figure, Panel, PanelSeries};
pub use output_format::{OutputFormat, SeriesWriter};
pub use pipeline::config::{ErrorStrategy, PipelineConfig};
pub use pipeline::context::{ParseErrorInfo, ProcessingStats};
pub use pipeline::stream::{FigureSnapshot, Renderer, StreamPipeline};
pub use pipeline::tail::{StopSignal, TailReader};
pub use record::{EventRecord, Filter, Value};
pub use signal::{parse_signal, SeriesSnapshot, SeriesSource, Signal};
pub use store::EventStore;
