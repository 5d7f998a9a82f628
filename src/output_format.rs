use crate::error::ProcessingError;
use crate::figure::PanelSeries;
use crate::pipeline::stream::{FigureSnapshot, Renderer};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    #[value(name = "jsonl", help = "JSON Lines, one object per series and refresh")]
    Jsonl,
    #[value(name = "csv", help = "Comma-separated values, one row per point")]
    Csv,
    #[value(name = "tsv", help = "Tab-separated values, one row per point")]
    Tsv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(OutputFormat::Jsonl),
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Renderer that serializes every refreshed series to a writer
pub struct SeriesWriter<W: Write> {
    sink: Sink<W>,
    refreshes: usize,
    series_written: usize,
}

enum Sink<W: Write> {
    Json(W),
    Table(csv::Writer<W>),
}

#[derive(Serialize)]
struct SeriesLine<'a> {
    refresh: usize,
    figure: &'a str,
    panel: &'a str,
    #[serde(flatten)]
    series: &'a PanelSeries,
}

// Long format: one row per point
#[derive(Serialize)]
struct PointRow<'a> {
    refresh: usize,
    figure: &'a str,
    panel: &'a str,
    label: &'a str,
    key: Option<String>,
    walltime: f64,
    value: f64,
}

impl<W: Write> SeriesWriter<W> {
    pub fn new(format: OutputFormat, output: W) -> Self {
        let sink = match format {
            OutputFormat::Jsonl => Sink::Json(output),
            OutputFormat::Csv => Sink::Table(csv::WriterBuilder::new().from_writer(output)),
            OutputFormat::Tsv => Sink::Table(
                csv::WriterBuilder::new()
                    .delimiter(b'\t')
                    .from_writer(output),
            ),
        };
        SeriesWriter {
            sink,
            refreshes: 0,
            series_written: 0,
        }
    }

    pub fn series_written(&self) -> usize {
        self.series_written
    }

    /// Flush and hand back the underlying writer
    pub fn finish(self) -> Result<W, ProcessingError> {
        match self.sink {
            Sink::Json(mut output) => {
                output.flush()?;
                Ok(output)
            }
            Sink::Table(table) => table
                .into_inner()
                .map_err(|e| ProcessingError::OutputError(e.to_string())),
        }
    }

    fn write_series(
        &mut self,
        figure: &str,
        panel: &str,
        series: &PanelSeries,
    ) -> Result<(), ProcessingError> {
        match &mut self.sink {
            Sink::Json(output) => {
                let line = SeriesLine {
                    refresh: self.refreshes,
                    figure,
                    panel,
                    series,
                };
                serde_json::to_writer(&mut *output, &line)?;
                writeln!(output)?;
            }
            Sink::Table(table) => {
                let key = series.key.as_ref().map(ToString::to_string);
                let snapshot = &series.snapshot;
                for (walltime, value) in snapshot.walltime.iter().zip(&snapshot.values) {
                    table.serialize(PointRow {
                        refresh: self.refreshes,
                        figure,
                        panel,
                        label: &snapshot.label,
                        key: key.clone(),
                        walltime: *walltime,
                        value: *value,
                    })?;
                }
            }
        }
        self.series_written += 1;
        Ok(())
    }
}

impl<W: Write> Renderer for SeriesWriter<W> {
    fn refresh(&mut self, figures: &[FigureSnapshot]) -> Result<(), ProcessingError> {
        self.refreshes += 1;
        for figure in figures {
            for panel in &figure.panels {
                for series in &panel.series {
                    self.write_series(&figure.figure, &panel.title, series)?;
                }
            }
        }
        match &mut self.sink {
            Sink::Json(output) => output.flush()?,
            Sink::Table(table) => table.flush()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("TSV".parse::<OutputFormat>(), Ok(OutputFormat::Tsv));
        assert!("logfmt".parse::<OutputFormat>().is_err());
    }
}
