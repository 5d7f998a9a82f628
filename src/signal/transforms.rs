use crate::extractor::LineExtractor;
use crate::record::{Filter, Value};
use crate::signal::{SeriesSource, Signal};

/// Mean of the whole series as a flat two-point line
#[derive(Debug)]
pub struct Average {
    upstream: Signal,
}

impl Average {
    pub fn new(upstream: Signal) -> Self {
        Average { upstream }
    }
}

impl SeriesSource for Average {
    fn upstream(&self) -> Option<&Signal> {
        Some(&self.upstream)
    }

    fn label(&self) -> String {
        format!("average() {}", self.upstream.label())
    }

    fn walltime(&self, filter: &Filter) -> Vec<f64> {
        match self.upstream.walltime(filter).as_slice() {
            [first, .., last] => vec![*first, *last],
            _ => Vec::new(),
        }
    }

    fn values(&self, filter: &Filter) -> Vec<f64> {
        let values = self.upstream.values(filter);
        if values.len() < 2 {
            return Vec::new();
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        vec![mean, mean]
    }
}

/// Centered box filter.
///
/// `window / 2` samples are trimmed from each end so every output point
/// averages a full window.
#[derive(Debug)]
pub struct RunningAverage {
    upstream: Signal,
    window: usize,
}

impl RunningAverage {
    /// A window of 0 behaves as 1
    pub fn new(upstream: Signal, window: usize) -> Self {
        RunningAverage {
            upstream,
            window: window.max(1),
        }
    }

    fn half(&self) -> usize {
        self.window / 2
    }
}

impl SeriesSource for RunningAverage {
    fn upstream(&self) -> Option<&Signal> {
        Some(&self.upstream)
    }

    fn label(&self) -> String {
        format!("avg({}) {}", self.window, self.upstream.label())
    }

    fn walltime(&self, filter: &Filter) -> Vec<f64> {
        let walltime = self.upstream.walltime(filter);
        if walltime.len() <= self.window {
            return Vec::new();
        }
        walltime[self.half()..walltime.len() - self.half()].to_vec()
    }

    fn values(&self, filter: &Filter) -> Vec<f64> {
        let values = self.upstream.values(filter);
        if values.len() <= self.window {
            return Vec::new();
        }
        let kept = values.len() - 2 * self.half();
        values
            .windows(self.window)
            .take(kept)
            .map(|w| w.iter().sum::<f64>() / self.window as f64)
            .collect()
    }
}

/// Recursive exponential-style average.
///
/// With a positive `margin`, a sample that differs from the running value by
/// at least `margin` times either of them resets the average to that sample.
#[derive(Debug)]
pub struct SlidingAverage {
    upstream: Signal,
    window: usize,
    margin: f64,
}

impl SlidingAverage {
    /// A window of 0 behaves as 1
    pub fn new(upstream: Signal, window: usize, margin: f64) -> Self {
        SlidingAverage {
            upstream,
            window: window.max(1),
            margin,
        }
    }
}

impl SeriesSource for SlidingAverage {
    fn upstream(&self) -> Option<&Signal> {
        Some(&self.upstream)
    }

    fn label(&self) -> String {
        format!("avgslide({}) {}", self.window, self.upstream.label())
    }

    fn walltime(&self, filter: &Filter) -> Vec<f64> {
        let walltime = self.upstream.walltime(filter);
        if walltime.len() < self.window {
            return Vec::new();
        }
        walltime
    }

    fn values(&self, filter: &Filter) -> Vec<f64> {
        let values = self.upstream.values(filter);
        if values.len() < self.window {
            return Vec::new();
        }
        let window = self.window as f64;
        let mut result: Vec<f64> = Vec::with_capacity(values.len());
        for &value in &values {
            let next = match result.last() {
                None => value,
                Some(&previous) => {
                    let distance = (previous - value).abs();
                    let reset = self.margin > 0.0
                        && (distance >= self.margin * previous || distance >= self.margin * value);
                    if reset {
                        value
                    } else {
                        (value + previous * (window - 1.0)) / window
                    }
                }
            };
            result.push(next);
        }
        result
    }
}

/// `d(values) / d(walltime)`
#[derive(Debug)]
pub struct Derivative {
    upstream: Signal,
}

impl Derivative {
    pub fn new(upstream: Signal) -> Self {
        Derivative { upstream }
    }
}

impl SeriesSource for Derivative {
    fn upstream(&self) -> Option<&Signal> {
        Some(&self.upstream)
    }

    fn label(&self) -> String {
        format!("d(values)/d(time) {}", self.upstream.label())
    }

    fn walltime(&self, filter: &Filter) -> Vec<f64> {
        drop_first(self.upstream.walltime(filter))
    }

    fn values(&self, filter: &Filter) -> Vec<f64> {
        let walltime = self.upstream.walltime(filter);
        let values = self.upstream.values(filter);
        values
            .windows(2)
            .zip(walltime.windows(2))
            .map(|(v, t)| (v[1] - v[0]) / (t[1] - t[0]))
            .collect()
    }
}

/// `values[1:] / d(timeline)`, for counters accumulated between samples.
///
/// The timeline is the upstream wall time unless another series is given.
#[derive(Debug)]
pub struct RateOverTime {
    upstream: Signal,
    timeline: Option<Signal>,
}

impl RateOverTime {
    pub fn new(upstream: Signal, timeline: Option<Signal>) -> Self {
        RateOverTime { upstream, timeline }
    }
}

impl SeriesSource for RateOverTime {
    fn upstream(&self) -> Option<&Signal> {
        Some(&self.upstream)
    }

    fn label(&self) -> String {
        match &self.timeline {
            Some(timeline) => format!("{} / d({})", self.upstream.label(), timeline.label()),
            None => format!("{} / d(time)", self.upstream.label()),
        }
    }

    fn walltime(&self, filter: &Filter) -> Vec<f64> {
        let walltime = drop_first(self.upstream.walltime(filter));
        match &self.timeline {
            Some(_) => {
                let n = self.values(filter).len();
                walltime.into_iter().take(n).collect()
            }
            None => walltime,
        }
    }

    fn values(&self, filter: &Filter) -> Vec<f64> {
        let timeline = match &self.timeline {
            Some(timeline) => timeline.values(filter),
            None => self.upstream.walltime(filter),
        };
        let values = self.upstream.values(filter);
        values
            .iter()
            .skip(1)
            .zip(timeline.windows(2))
            .map(|(v, t)| v / (t[1] - t[0]))
            .collect()
    }

    fn has_updates(&self) -> bool {
        self.upstream.has_updates() || self.timeline.as_ref().map_or(false, Signal::has_updates)
    }

    fn reset_updates(&self) {
        self.upstream.reset_updates();
        if let Some(timeline) = &self.timeline {
            timeline.reset_updates();
        }
    }

    fn extractors(&self) -> Vec<LineExtractor> {
        let mut extractors = self.upstream.extractors();
        if let Some(timeline) = &self.timeline {
            merge_extractors(&mut extractors, timeline.extractors());
        }
        extractors
    }
}

/// `1 / d(values)`, the arrival rate of values that are themselves times
#[derive(Debug)]
pub struct InverseRate {
    upstream: Signal,
}

impl InverseRate {
    pub fn new(upstream: Signal) -> Self {
        InverseRate { upstream }
    }
}

impl SeriesSource for InverseRate {
    fn upstream(&self) -> Option<&Signal> {
        Some(&self.upstream)
    }

    fn label(&self) -> String {
        format!("d(walltime) {}", self.upstream.label())
    }

    fn walltime(&self, filter: &Filter) -> Vec<f64> {
        drop_first(self.upstream.walltime(filter))
    }

    fn values(&self, filter: &Filter) -> Vec<f64> {
        self.upstream
            .values(filter)
            .windows(2)
            .map(|v| 1.0 / (v[1] - v[0]))
            .collect()
    }
}

/// Running sum
#[derive(Debug)]
pub struct Cumulative {
    upstream: Signal,
}

impl Cumulative {
    pub fn new(upstream: Signal) -> Self {
        Cumulative { upstream }
    }
}

impl SeriesSource for Cumulative {
    fn upstream(&self) -> Option<&Signal> {
        Some(&self.upstream)
    }

    fn label(&self) -> String {
        format!("cumulative of {}", self.upstream.label())
    }

    fn values(&self, filter: &Filter) -> Vec<f64> {
        self.upstream
            .values(filter)
            .into_iter()
            .scan(0.0, |total, v| {
                *total += v;
                Some(*total)
            })
            .collect()
    }
}

/// Difference between two independently timestamped series, for latencies.
///
/// For each sample of `other`, emits `other - base` once for every `base`
/// sample strictly before it (consuming those), then once more against the
/// first remaining `base` sample if there is one. The output starts with a
/// `0` placeholder and its timeline is the sorted union of both wall times.
#[derive(Debug)]
pub struct CrossDiff {
    base: Signal,
    other: Signal,
}

impl CrossDiff {
    pub fn new(base: Signal, other: Signal) -> Self {
        CrossDiff { base, other }
    }
}

impl SeriesSource for CrossDiff {
    fn upstream(&self) -> Option<&Signal> {
        Some(&self.base)
    }

    fn label(&self) -> String {
        format!("diff: {} vs {}", self.base.label(), self.other.label())
    }

    fn walltime(&self, filter: &Filter) -> Vec<f64> {
        let mut walltime = self.base.walltime(filter);
        walltime.extend(self.other.walltime(filter));
        walltime.sort_by(f64::total_cmp);
        walltime
    }

    fn values(&self, filter: &Filter) -> Vec<f64> {
        let base_time = self.base.walltime(filter);
        let base_values = self.base.values(filter);
        let other_time = self.other.walltime(filter);
        let other_values = self.other.values(filter);

        let base_len = base_time.len().min(base_values.len());
        let mut result = vec![0.0];
        let mut idx = 0;
        for (&at, &value) in other_time.iter().zip(&other_values) {
            while idx < base_len && base_time[idx] < at {
                result.push(value - base_values[idx]);
                idx += 1;
            }
            if idx < base_len {
                result.push(value - base_values[idx]);
            }
        }
        result
    }

    fn has_updates(&self) -> bool {
        self.base.has_updates() || self.other.has_updates()
    }

    fn reset_updates(&self) {
        self.base.reset_updates();
        self.other.reset_updates();
    }

    fn key_values(&self, key: &str) -> Vec<Value> {
        let mut values = self.base.key_values(key);
        for value in self.other.key_values(key) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        values
    }

    fn extractors(&self) -> Vec<LineExtractor> {
        let mut extractors = self.base.extractors();
        merge_extractors(&mut extractors, self.other.extractors());
        extractors
    }
}

fn drop_first(mut series: Vec<f64>) -> Vec<f64> {
    if !series.is_empty() {
        series.remove(0);
    }
    series
}

pub(crate) fn merge_extractors(into: &mut Vec<LineExtractor>, more: Vec<LineExtractor>) {
    for extractor in more {
        if !into.iter().any(|e| e.same_as(&extractor)) {
            into.push(extractor);
        }
    }
}
