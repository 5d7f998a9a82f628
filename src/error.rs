use std::path::PathBuf;

/// Failures of the clock time codec
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClockTimeError {
    #[error("time is unknown (GST_CLOCK_TIME_NONE)")]
    TimeUnknown,

    #[error("malformed clock time '{0}'")]
    TimeMalformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("extractor '{extractor}' is misconfigured: {reason}")]
    ExtractorMisconfigured { extractor: String, reason: String },

    #[error("extractor '{extractor}': field '{field}' could not be parsed from '{token}': {reason}")]
    FieldParseFailure {
        extractor: String,
        field: String,
        token: String,
        reason: String,
    },

    #[error("extractor '{extractor}': field '{field}': {source}")]
    Time {
        extractor: String,
        field: String,
        #[source]
        source: ClockTimeError,
    },

    #[error("extractor '{extractor}': bad walltime '{token}': {source}")]
    Walltime {
        extractor: String,
        token: String,
        #[source]
        source: ClockTimeError,
    },

    #[error("extractor '{extractor}' has no field '{field}'")]
    UnknownField { extractor: String, field: String },

    #[error("group '{group}' has no extractor '{name}'")]
    UnknownSubExtractor { group: String, name: String },

    #[error("no extractor or group named '{0}'")]
    UnknownExtractor(String),
}

impl ExtractError {
    /// Per-line failures that the skip strategy may drop
    pub fn is_line_local(&self) -> bool {
        matches!(
            self,
            ExtractError::FieldParseFailure { .. }
                | ExtractError::Time { .. }
                | ExtractError::Walltime { .. }
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("syntax error in '{expr}' at position {position}: {message}")]
    Syntax {
        expr: String,
        position: usize,
        message: String,
    },

    #[error("unknown transform '{0}'")]
    UnknownTransform(String),

    #[error("transform '{name}': {message}")]
    BadArguments { name: String, message: String },

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read definitions '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid definitions: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("duplicate extractor or group name '{0}'")]
    Duplicate(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("figure '{figure}': {source}")]
    Signal {
        figure: String,
        #[source]
        source: SignalError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("cannot open log '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("line {line_number}: {source}")]
    Extract {
        line_number: usize,
        #[source]
        source: ExtractError,
    },

    #[error("Line too long: {length} > {max_length}")]
    LineTooLong { length: usize, max_length: usize },

    #[error("output error: {0}")]
    OutputError(String),
}

impl From<csv::Error> for ProcessingError {
    fn from(err: csv::Error) -> Self {
        ProcessingError::OutputError(err.to_string())
    }
}

impl From<serde_json::Error> for ProcessingError {
    fn from(err: serde_json::Error) -> Self {
        ProcessingError::OutputError(format!("JSON encoding error: {}", err))
    }
}
