//! FILENAME: src/cache.rs
//! Table Cache - The internal record representation.
//!
//! The cache owns the raw dataset for one session:
//! - Records are stored once, positionally against the schema
//! - Every pipeline stage works on record indices; records themselves are
//!   never mutated or copied after `add_record`
//! - Display-string coercion lives here so that fuzzy matching, grouping
//!   keys and categorical membership all agree on the same rendering

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::definition::{FieldIndex, Schema};
use crate::error::TableError;

// ============================================================================
// VALUES
// ============================================================================

/// A single cell value.
///
/// Dates cross the API boundary as unix timestamps; the engine only relies
/// on their total order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Number(OrderedFloat),
    Text(String),
    Boolean(bool),
    Date(i64),
}

impl Value {
    pub fn number(n: f64) -> Self {
        Value::Number(OrderedFloat(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.0),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<i64> {
        match self {
            Value::Date(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Coerces the value to the string a frontend would display. Group keys,
    /// categorical membership and fuzzy matching all use this form.
    pub fn display_string(&self) -> String {
        match self {
            Value::Empty => "(blank)".to_string(),
            Value::Number(n) => format!("{}", n.0),
            Value::Text(s) => s.clone(),
            Value::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Date(ts) => format!("{}", ts),
        }
    }
}

/// Wrapper around f64 that implements Eq and Hash for use in hashed
/// contexts. NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

/// Total order over values: Empty first, then numbers, text, booleans,
/// dates. Within a type the natural order applies (numeric, lexicographic,
/// chronological).
pub fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Empty, Value::Empty) => Ordering::Equal,
        (Value::Empty, _) => Ordering::Less,
        (_, Value::Empty) => Ordering::Greater,

        (Value::Number(na), Value::Number(nb)) => {
            na.0.partial_cmp(&nb.0).unwrap_or(Ordering::Equal)
        }
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,

        (Value::Text(ta), Value::Text(tb)) => ta.cmp(tb),
        (Value::Text(_), _) => Ordering::Less,
        (_, Value::Text(_)) => Ordering::Greater,

        (Value::Boolean(ba), Value::Boolean(bb)) => ba.cmp(bb),
        (Value::Boolean(_), _) => Ordering::Less,
        (_, Value::Boolean(_)) => Ordering::Greater,

        (Value::Date(da), Value::Date(db)) => da.cmp(db),
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// A single source record, stored as one value per schema field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// The original row index in the source data (0-based).
    pub source_row: u32,

    /// Values indexed by FieldIndex.
    pub values: SmallVec<[Value; 8]>,
}

impl Record {
    pub fn value(&self, field: FieldIndex) -> &Value {
        self.values.get(field).unwrap_or(&Value::Empty)
    }
}

// ============================================================================
// TABLE CACHE
// ============================================================================

/// The record store for one session. Built once from caller data, read by
/// every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCache {
    records: Vec<Record>,
    field_count: usize,
}

impl TableCache {
    pub fn new(schema: &Schema) -> Self {
        TableCache {
            records: Vec::new(),
            field_count: schema.field_count(),
        }
    }

    /// Adds a record. Values must be in schema field order and match the
    /// schema's arity.
    pub fn add_record(&mut self, values: Vec<Value>) -> Result<(), TableError> {
        if values.len() != self.field_count {
            return Err(TableError::SchemaMismatch(format!(
                "record has {} values, schema has {} fields",
                values.len(),
                self.field_count
            )));
        }
        let source_row = self.records.len() as u32;
        self.records.push(Record {
            source_row,
            values: SmallVec::from_vec(values),
        });
        Ok(())
    }

    pub fn record(&self, index: u32) -> Option<&Record> {
        self.records.get(index as usize)
    }

    /// The value of `field` for record `index` (Empty when out of range).
    pub fn value(&self, index: u32, field: FieldIndex) -> &Value {
        self.records
            .get(index as usize)
            .map(|r| r.value(field))
            .unwrap_or(&Value::Empty)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// All record indices in source order. The starting point of the
    /// pipeline.
    pub fn all_indices(&self) -> Vec<u32> {
        (0..self.records.len() as u32).collect()
    }

    /// Distinct display strings of `field`, in first-seen record order.
    /// Used to populate categorical filter choices.
    pub fn unique_display_values(&self, field: FieldIndex) -> Vec<String> {
        let mut seen = rustc_hash::FxHashSet::default();
        let mut values = Vec::new();
        for record in &self.records {
            let display = record.value(field).display_string();
            if seen.insert(display.clone()) {
                values.push(display);
            }
        }
        values
    }
}
