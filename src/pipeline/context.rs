use std::time::Duration;

/// Parse error details for deferred reporting
#[derive(Debug, Clone)]
pub struct ParseErrorInfo {
    pub line_number: usize,
    pub extractor: String,
    pub error: String,
}

/// Runtime statistics
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    /// Complete lines handed to the extractors
    pub lines_read: usize,
    /// Lines claimed by an extractor, parsed or not
    pub lines_matched: usize,
    pub records_appended: usize,
    /// Lines dropped on purpose, e.g. an unknown time marked `skip`
    pub records_skipped: usize,
    pub errors: usize,
    /// Lines more than one extractor matched (only with overlap detection)
    pub overlaps: usize,
    pub refreshes: usize,
    pub processing_time: Duration,
    pub parse_errors: Vec<ParseErrorInfo>,
}

impl ProcessingStats {
    /// Count an error, keeping its details while under `limit`
    pub(crate) fn record_error(&mut self, info: ParseErrorInfo, limit: usize) {
        self.errors += 1;
        if self.parse_errors.len() < limit {
            self.parse_errors.push(info);
        }
    }
}
