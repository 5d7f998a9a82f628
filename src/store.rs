use crate::record::{EventRecord, Filter, Value, WALLTIME};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a store: written by its extractor, read by signals
pub type StoreHandle = Rc<RefCell<EventStore>>;

/// Append-only buffer of the records one extractor produced
#[derive(Debug, Default)]
pub struct EventStore {
    records: Vec<EventRecord>,
    updated: bool,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> StoreHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn append(&mut self, record: EventRecord) {
        self.records.push(record);
        self.updated = true;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn has_updates(&self) -> bool {
        self.updated
    }

    pub fn reset_updates(&mut self) {
        self.updated = false;
    }

    /// Values of `field` for every record that has it and passes `filter`
    pub fn values(&self, field: &str, filter: &Filter) -> Vec<Value> {
        self.records
            .iter()
            .filter(|r| filter.matches(r))
            .filter_map(|r| r.get(field).cloned())
            .collect()
    }

    /// Aligned `(walltime, value)` columns for a numeric field.
    ///
    /// Text values read as NaN so both columns keep the same length.
    pub fn series(&self, field: &str, filter: &Filter) -> (Vec<f64>, Vec<f64>) {
        let mut walltime = Vec::new();
        let mut values = Vec::new();
        for record in self.records.iter().filter(|r| filter.matches(r)) {
            if let Some(value) = record.get(field) {
                walltime.push(record.walltime());
                values.push(value.as_f64().unwrap_or(f64::NAN));
            }
        }
        (walltime, values)
    }

    pub fn walltimes(&self, filter: &Filter) -> Vec<f64> {
        self.series(WALLTIME, filter).0
    }

    /// Distinct values of `field` seen so far, in first-seen order
    pub fn key_values(&self, field: &str) -> Vec<Value> {
        let mut seen: Vec<Value> = Vec::new();
        for value in self.records.iter().filter_map(|r| r.get(field)) {
            if !seen.contains(value) {
                seen.push(value.clone());
            }
        }
        seen
    }
}
