//! Composable, lazily evaluated time series.
//!
//! A [`Signal`] is either a field accessor over an extractor's store or a
//! transform over one or two upstream signals. Nothing is cached: every
//! query re-derives from whatever the stores currently hold.

pub mod expr;
pub mod transforms;

use crate::extractor::LineExtractor;
use crate::record::{Filter, Value};
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

pub use expr::parse_signal;
pub use transforms::{
    Average, Cumulative, CrossDiff, Derivative, InverseRate, RateOverTime, RunningAverage,
    SlidingAverage,
};

/// Capability shared by field accessors and transforms.
///
/// The provided methods forward to [`SeriesSource::upstream`], so a transform
/// only overrides what it changes.
pub trait SeriesSource: fmt::Debug {
    fn upstream(&self) -> Option<&Signal> {
        None
    }

    fn values(&self, filter: &Filter) -> Vec<f64>;

    fn label(&self) -> String {
        self.upstream().map(Signal::label).unwrap_or_default()
    }

    fn walltime(&self, filter: &Filter) -> Vec<f64> {
        self.upstream()
            .map(|s| s.walltime(filter))
            .unwrap_or_default()
    }

    fn marker(&self) -> String {
        self.upstream().map(Signal::marker).unwrap_or_default()
    }

    fn linestyle(&self) -> String {
        self.upstream()
            .map(Signal::linestyle)
            .unwrap_or_else(|| "-".to_string())
    }

    fn has_updates(&self) -> bool {
        self.upstream().map_or(false, Signal::has_updates)
    }

    fn reset_updates(&self) {
        if let Some(upstream) = self.upstream() {
            upstream.reset_updates();
        }
    }

    /// Distinct values of `key` seen so far in the underlying stores
    fn key_values(&self, key: &str) -> Vec<Value> {
        self.upstream()
            .map(|s| s.key_values(key))
            .unwrap_or_default()
    }

    /// Extractors whose stores feed this series
    fn extractors(&self) -> Vec<LineExtractor> {
        self.upstream().map(Signal::extractors).unwrap_or_default()
    }
}

/// Cheaply clonable handle onto a series source
#[derive(Clone)]
pub struct Signal(Rc<dyn SeriesSource>);

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Signal {
    pub fn new(source: impl SeriesSource + 'static) -> Self {
        Signal(Rc::new(source))
    }

    pub(crate) fn field(extractor: LineExtractor, name: &str) -> Self {
        Signal::new(FieldSignal {
            extractor,
            field: name.to_string(),
        })
    }

    pub fn label(&self) -> String {
        self.0.label()
    }

    pub fn walltime(&self, filter: &Filter) -> Vec<f64> {
        self.0.walltime(filter)
    }

    pub fn values(&self, filter: &Filter) -> Vec<f64> {
        self.0.values(filter)
    }

    pub fn marker(&self) -> String {
        self.0.marker()
    }

    pub fn linestyle(&self) -> String {
        self.0.linestyle()
    }

    pub fn has_updates(&self) -> bool {
        self.0.has_updates()
    }

    pub fn reset_updates(&self) {
        self.0.reset_updates()
    }

    pub fn key_values(&self, key: &str) -> Vec<Value> {
        self.0.key_values(key)
    }

    pub fn extractors(&self) -> Vec<LineExtractor> {
        self.0.extractors()
    }

    /// Evaluate the series once for output
    pub fn snapshot(&self, filter: &Filter) -> SeriesSnapshot {
        SeriesSnapshot {
            label: self.label(),
            walltime: self.walltime(filter),
            values: self.values(filter),
            marker: self.marker(),
            linestyle: self.linestyle(),
        }
    }

    pub fn average(&self) -> Signal {
        Signal::new(Average::new(self.clone()))
    }

    pub fn running_average(&self, window: usize) -> Signal {
        Signal::new(RunningAverage::new(self.clone(), window))
    }

    pub fn sliding_average(&self, window: usize, margin: f64) -> Signal {
        Signal::new(SlidingAverage::new(self.clone(), window, margin))
    }

    pub fn derivative(&self) -> Signal {
        Signal::new(Derivative::new(self.clone()))
    }

    pub fn rate_over_time(&self) -> Signal {
        Signal::new(RateOverTime::new(self.clone(), None))
    }

    /// Like [`Signal::rate_over_time`] but dividing by the differences of
    /// another series' values instead of wall time
    pub fn rate_over(&self, timeline: &Signal) -> Signal {
        Signal::new(RateOverTime::new(self.clone(), Some(timeline.clone())))
    }

    pub fn inverse_rate(&self) -> Signal {
        Signal::new(InverseRate::new(self.clone()))
    }

    pub fn cumulative(&self) -> Signal {
        Signal::new(Cumulative::new(self.clone()))
    }

    /// `other - self`, matched on wall time
    pub fn diff(&self, other: &Signal) -> Signal {
        Signal::new(CrossDiff::new(self.clone(), other.clone()))
    }
}

/// One evaluated series as handed to a renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSnapshot {
    pub label: String,
    pub walltime: Vec<f64>,
    pub values: Vec<f64>,
    pub marker: String,
    pub linestyle: String,
}

impl SeriesSnapshot {
    /// Not enough upstream samples yet; a normal state, not an error
    pub fn is_empty(&self) -> bool {
        self.walltime.is_empty() || self.values.is_empty()
    }
}

/// Raw field of one extractor
#[derive(Debug)]
pub struct FieldSignal {
    extractor: LineExtractor,
    field: String,
}

impl FieldSignal {
    fn spec(&self) -> Option<&crate::extractor::FieldSpec> {
        self.extractor.definition().fields.get(&self.field)
    }
}

impl SeriesSource for FieldSignal {
    fn values(&self, filter: &Filter) -> Vec<f64> {
        self.extractor.store().borrow().series(&self.field, filter).1
    }

    fn walltime(&self, filter: &Filter) -> Vec<f64> {
        self.extractor.store().borrow().series(&self.field, filter).0
    }

    fn label(&self) -> String {
        self.spec()
            .map(|s| s.description.clone())
            .unwrap_or_else(|| self.field.clone())
    }

    fn marker(&self) -> String {
        self.spec().map(|s| s.marker.clone()).unwrap_or_default()
    }

    fn linestyle(&self) -> String {
        self.spec()
            .map(|s| s.linestyle.clone())
            .unwrap_or_else(|| "-".to_string())
    }

    fn has_updates(&self) -> bool {
        self.extractor.has_updates()
    }

    fn reset_updates(&self) {
        self.extractor.reset_updates()
    }

    fn key_values(&self, key: &str) -> Vec<Value> {
        self.extractor.store().borrow().key_values(key)
    }

    fn extractors(&self) -> Vec<LineExtractor> {
        vec![self.extractor.clone()]
    }
}
