use std::time::Duration;

/// Configuration for pipeline behavior
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub error_strategy: ErrorStrategy,
    pub debug: bool,
    /// Sleep between polls when following a file
    pub poll_interval: Duration,
    pub max_line_length: usize,
    /// Warn about lines that more than one registered extractor matches
    pub detect_overlaps: bool,
    /// Cap on the parse errors kept in [`ProcessingStats`](super::ProcessingStats)
    pub max_parse_errors: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            error_strategy: ErrorStrategy::Skip,
            debug: false,
            poll_interval: Duration::from_millis(100),
            max_line_length: 1048576, // 1MB
            detect_overlaps: false,
            max_parse_errors: 100,
        }
    }
}

/// Simple error handling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStrategy {
    /// Skip problematic lines and continue processing
    Skip,
    /// Stop processing on first error
    FailFast,
}
