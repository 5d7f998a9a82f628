pub mod config;
pub mod context;
pub mod stream;
pub mod tail;

pub use config::{ErrorStrategy, PipelineConfig};
pub use context::{ParseErrorInfo, ProcessingStats};
pub use stream::{FigureSnapshot, Renderer, StreamPipeline};
pub use tail::{StopSignal, TailReader};
