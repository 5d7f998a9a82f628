//! Headless grouping of signals into panels for a renderer.

use crate::extractor::LineExtractor;
use crate::record::{Filter, Value, SOURCE};
use crate::signal::transforms::merge_extractors;
use crate::signal::{SeriesSnapshot, Signal};
use serde::Serialize;

/// A named set of signals plotted together.
///
/// Records are fanned out on `split_key` (the element name by default):
/// either one panel per key value, or one series per signal and key value in
/// a single panel.
#[derive(Debug, Clone)]
pub struct Figure {
    name: String,
    signals: Vec<Signal>,
    split_key: String,
    split: bool,
}

/// One chart worth of series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub title: String,
    pub series: Vec<PanelSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSeries {
    /// Value of the split key this series was filtered on
    pub key: Option<Value>,
    #[serde(flatten)]
    pub snapshot: SeriesSnapshot,
}

impl Figure {
    pub fn new(name: impl Into<String>, signals: Vec<Signal>) -> Self {
        Figure {
            name: name.into(),
            signals,
            split_key: SOURCE.to_string(),
            split: false,
        }
    }

    pub fn split_key(mut self, key: impl Into<String>) -> Self {
        self.split_key = key.into();
        self
    }

    /// One panel per key value instead of one panel for everything
    pub fn split(mut self, split: bool) -> Self {
        self.split = split;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn has_updates(&self) -> bool {
        self.signals.iter().any(Signal::has_updates)
    }

    /// Call once every figure has been snapshotted
    pub fn reset_updates(&self) {
        for signal in &self.signals {
            signal.reset_updates();
        }
    }

    /// Extractors needed to feed this figure, without duplicates
    pub fn extractors(&self) -> Vec<LineExtractor> {
        let mut extractors = Vec::new();
        for signal in &self.signals {
            merge_extractors(&mut extractors, signal.extractors());
        }
        extractors
    }

    /// Distinct split key values across all signals, first seen first
    pub fn key_values(&self) -> Vec<Value> {
        let mut values: Vec<Value> = Vec::new();
        for signal in &self.signals {
            for value in signal.key_values(&self.split_key) {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
        values
    }

    pub fn snapshot(&self) -> Vec<Panel> {
        let keys = self.key_values();

        if keys.is_empty() {
            return vec![Panel {
                title: self.name.clone(),
                series: self.series_for(&Filter::new(), None),
            }];
        }

        if self.split {
            return keys
                .into_iter()
                .map(|key| {
                    let filter = Filter::new().with(self.split_key.as_str(), key.clone());
                    Panel {
                        title: format!("{} {}", self.name, key),
                        series: self.series_for(&filter, Some(&key)),
                    }
                })
                .collect();
        }

        let mut series = Vec::new();
        for signal in &self.signals {
            for key in &keys {
                let filter = Filter::new().with(self.split_key.as_str(), key.clone());
                let mut snapshot = signal.snapshot(&filter);
                if snapshot.walltime.is_empty() {
                    continue;
                }
                snapshot.label = format!("{} {}", snapshot.label, key);
                series.push(PanelSeries {
                    key: Some(key.clone()),
                    snapshot,
                });
            }
        }
        vec![Panel {
            title: self.name.clone(),
            series,
        }]
    }

    fn series_for(&self, filter: &Filter, key: Option<&Value>) -> Vec<PanelSeries> {
        self.signals
            .iter()
            .map(|signal| signal.snapshot(filter))
            .filter(|snapshot| !snapshot.values.is_empty())
            .map(|snapshot| PanelSeries {
                key: key.cloned(),
                snapshot,
            })
            .collect()
    }
}
