// src/pipeline/stream.rs
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread;
use std::time::Instant;

use serde::Serialize;

use crate::error::{ExtractError, ProcessingError};
use crate::extractor::{CompositeExtractor, LineExtractor};
use crate::figure::{Figure, Panel};
use crate::pipeline::config::{ErrorStrategy, PipelineConfig};
use crate::pipeline::context::{ParseErrorInfo, ProcessingStats};
use crate::pipeline::tail::{StopSignal, TailReader};

/// Panels of one figure that changed since the last refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureSnapshot {
    pub figure: String,
    pub panels: Vec<Panel>,
}

/// Consumer of refreshed figures.
///
/// `refresh` is called on every refresh cycle, with an empty slice when no
/// figure changed.
pub trait Renderer {
    fn refresh(&mut self, figures: &[FigureSnapshot]) -> Result<(), ProcessingError>;
}

impl<F> Renderer for F
where
    F: FnMut(&[FigureSnapshot]) -> Result<(), ProcessingError>,
{
    fn refresh(&mut self, figures: &[FigureSnapshot]) -> Result<(), ProcessingError> {
        self(figures)
    }
}

/// Main pipeline orchestrator.
///
/// Each line goes to the first registered extractor that matches it, in
/// registration order.
pub struct StreamPipeline {
    extractors: Vec<LineExtractor>,
    figures: Vec<Figure>,
    config: PipelineConfig,
    stats: ProcessingStats,
    line_number: usize,
}

impl StreamPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        StreamPipeline {
            extractors: Vec::new(),
            figures: Vec::new(),
            config,
            stats: ProcessingStats::default(),
            line_number: 0,
        }
    }

    /// Register an extractor; registering the same instance twice is a no-op
    pub fn add_extractor(&mut self, extractor: LineExtractor) {
        if !self.extractors.iter().any(|e| e.same_as(&extractor)) {
            self.extractors.push(extractor);
        }
    }

    pub fn add_composite(&mut self, group: &CompositeExtractor) {
        for extractor in group.extractors() {
            self.add_extractor(extractor.clone());
        }
    }

    /// Register a figure together with every extractor feeding it
    pub fn add_figure(&mut self, figure: Figure) {
        for extractor in figure.extractors() {
            self.add_extractor(extractor);
        }
        self.figures.push(figure);
    }

    pub fn extractors(&self) -> &[LineExtractor] {
        &self.extractors
    }

    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get current accumulated stats
    pub fn get_stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Dispatch one complete line. Returns whether an extractor claimed it.
    pub fn analyze_line(&mut self, line: &str) -> Result<bool, ProcessingError> {
        self.line_number += 1;
        self.stats.lines_read += 1;

        if line.len() > self.config.max_line_length {
            let error = ProcessingError::LineTooLong {
                length: line.len(),
                max_length: self.config.max_line_length,
            };
            return match self.config.error_strategy {
                ErrorStrategy::FailFast => Err(error),
                ErrorStrategy::Skip => {
                    tracing::warn!("line {}: {}, skipping", self.line_number, error);
                    self.stats.record_error(
                        ParseErrorInfo {
                            line_number: self.line_number,
                            extractor: String::new(),
                            error: error.to_string(),
                        },
                        self.config.max_parse_errors,
                    );
                    Ok(false)
                }
            };
        }

        let mut matching = self.extractors.iter().filter(|e| e.matches(line));
        let Some(extractor) = matching.next() else {
            return Ok(false);
        };
        if self.config.detect_overlaps {
            let others: Vec<&str> = matching.map(LineExtractor::name).collect();
            if !others.is_empty() {
                tracing::warn!(
                    "line {}: claimed by '{}', also matched by {:?}",
                    self.line_number,
                    extractor.name(),
                    others
                );
                self.stats.overlaps += 1;
            }
        }

        let extractor = extractor.clone();
        self.stats.lines_matched += 1;
        let before = extractor.len();
        match extractor.analyze_line(line) {
            Ok(_) if extractor.len() > before => self.stats.records_appended += 1,
            Ok(_) => self.stats.records_skipped += 1,
            Err(error) => self.handle_error(&extractor, error)?,
        }
        Ok(true)
    }

    fn handle_error(
        &mut self,
        extractor: &LineExtractor,
        error: ExtractError,
    ) -> Result<(), ProcessingError> {
        if self.config.error_strategy == ErrorStrategy::FailFast || !error.is_line_local() {
            return Err(ProcessingError::Extract {
                line_number: self.line_number,
                source: error,
            });
        }
        tracing::warn!("line {}: {}", self.line_number, error);
        self.stats.record_error(
            ParseErrorInfo {
                line_number: self.line_number,
                extractor: extractor.name().to_string(),
                error: error.to_string(),
            },
            self.config.max_parse_errors,
        );
        Ok(())
    }

    /// Bounded mode: consume the whole input, then refresh once
    pub fn process_stream<R: BufRead, T: Renderer>(
        &mut self,
        input: R,
        renderer: &mut T,
    ) -> Result<ProcessingStats, ProcessingError> {
        let start_time = Instant::now();
        let mut reader = TailReader::new(input);

        while let Some(line) = reader.next_line()? {
            self.analyze_line(&line)?;
        }
        if let Some(line) = reader.take_partial() {
            self.analyze_line(&line)?;
        }
        self.refresh(renderer)?;

        self.stats.processing_time += start_time.elapsed();
        if self.config.debug {
            self.log_summary();
        }
        Ok(self.stats.clone())
    }

    pub fn analyze_file<T: Renderer>(
        &mut self,
        path: &Path,
        renderer: &mut T,
    ) -> Result<ProcessingStats, ProcessingError> {
        let file = open(path)?;
        tracing::info!("analyzing {}", path.display());
        self.process_stream(BufReader::new(file), renderer)
    }

    /// Continuous mode: process lines as they are appended, refreshing
    /// whenever the input runs dry, until `stop` is tripped
    pub fn follow_stream<R: BufRead, T: Renderer>(
        &mut self,
        input: R,
        renderer: &mut T,
        stop: &StopSignal,
    ) -> Result<ProcessingStats, ProcessingError> {
        let start_time = Instant::now();
        let mut reader = TailReader::new(input);

        while !stop.is_stopped() {
            match reader.next_line()? {
                Some(line) => {
                    self.analyze_line(&line)?;
                }
                None => {
                    self.refresh(renderer)?;
                    if stop.is_stopped() {
                        break;
                    }
                    thread::sleep(self.config.poll_interval);
                }
            }
        }
        if reader.has_partial() {
            tracing::debug!("stopped with an unterminated line pending, dropping it");
        }

        self.stats.processing_time += start_time.elapsed();
        if self.config.debug {
            self.log_summary();
        }
        Ok(self.stats.clone())
    }

    pub fn follow_file<T: Renderer>(
        &mut self,
        path: &Path,
        renderer: &mut T,
        stop: &StopSignal,
    ) -> Result<ProcessingStats, ProcessingError> {
        let file = open(path)?;
        tracing::info!(
            "following {} (polling every {:?})",
            path.display(),
            self.config.poll_interval
        );
        self.follow_stream(BufReader::new(file), renderer, stop)
    }

    /// Snapshot the figures that changed, hand them over, then clear the
    /// update flags of every store
    pub fn refresh<T: Renderer>(&mut self, renderer: &mut T) -> Result<(), ProcessingError> {
        let snapshots: Vec<FigureSnapshot> = self
            .figures
            .iter()
            .filter(|figure| figure.has_updates())
            .map(|figure| FigureSnapshot {
                figure: figure.name().to_string(),
                panels: figure.snapshot(),
            })
            .collect();
        tracing::debug!(
            "refresh {}: {} of {} figures updated",
            self.stats.refreshes + 1,
            snapshots.len(),
            self.figures.len()
        );

        renderer.refresh(&snapshots)?;

        for figure in &self.figures {
            figure.reset_updates();
        }
        for extractor in &self.extractors {
            extractor.reset_updates();
        }
        self.stats.refreshes += 1;
        Ok(())
    }

    fn log_summary(&self) {
        tracing::info!(
            "{} lines read, {} matched, {} records, {} skipped, {} errors in {:?}",
            self.stats.lines_read,
            self.stats.lines_matched,
            self.stats.records_appended,
            self.stats.records_skipped,
            self.stats.errors,
            self.stats.processing_time
        );
    }
}

fn open(path: &Path) -> Result<File, ProcessingError> {
    File::open(path).map_err(|source| ProcessingError::Open {
        path: path.to_path_buf(),
        source,
    })
}
