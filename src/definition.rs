//! FILENAME: src/definition.rs
//! Table View Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a table view.
//! These structures are designed to be:
//! - Serializable (for sending over an IPC bridge)
//! - Immutable snapshots of user intent
//!
//! The schema is supplied once at session construction and never changes;
//! filter/sort/group state evolves through the session operations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::TableError;

/// Index into the schema's field list (0-based).
pub type FieldIndex = usize;

// ============================================================================
// SCHEMA
// ============================================================================

/// Filter semantics of a field. Decides which `FilterValue` shape the field
/// accepts and how the filter engine evaluates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Free-text field searched through the fuzzy matcher.
    TextFuzzy,
    /// Numeric field filtered by an inclusive `[min, max]` pair.
    NumericRange,
    /// Date field filtered by an optionally open `[start, end]` pair.
    DateRange,
    /// Field filtered by a set of accepted values.
    Categorical,
    /// No filter semantics; the field always passes through.
    Plain,
}

/// A single field (column) description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name, unique within the schema.
    pub name: String,

    /// Filter semantics for this field.
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDescriptor {
            name: name.into(),
            kind,
        }
    }
}

/// The fixed, ordered field list a session operates on.
///
/// Records store their values positionally against this schema; all
/// name-based lookups resolve through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Builds a schema, rejecting duplicate field names.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, TableError> {
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(TableError::SchemaMismatch(format!(
                    "duplicate field name: {}",
                    field.name
                )));
            }
        }
        Ok(Schema { fields })
    }

    /// Resolves a field name to its index, or `InvalidField`.
    pub fn field_index(&self, name: &str) -> Result<FieldIndex, TableError> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| TableError::InvalidField(name.to_string()))
    }

    pub fn field(&self, index: FieldIndex) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

// ============================================================================
// FILTER STATE
// ============================================================================

/// A filter constraint for one field. The accepted shape depends on the
/// field's `FieldKind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    /// Fuzzy query text (TextFuzzy fields).
    Text(String),

    /// Inclusive `[min, max]` bounds (NumericRange fields).
    NumberRange(f64, f64),

    /// `[start, end]` unix timestamps, either bound open (DateRange fields).
    DateRange(Option<i64>, Option<i64>),

    /// Accepted display values (Categorical fields).
    ValueSet(Vec<String>),
}

impl FilterValue {
    /// Whether this value imposes no constraint (empty text / empty set).
    pub fn is_neutral(&self) -> bool {
        match self {
            FilterValue::Text(s) => s.is_empty(),
            FilterValue::ValueSet(values) => values.is_empty(),
            FilterValue::NumberRange(..) | FilterValue::DateRange(..) => false,
        }
    }
}

/// The complete filter state: field name -> constraint.
///
/// Keyed by name rather than index so that a state snapshot can carry
/// entries for fields the schema does not know about; the filter engine
/// ignores those.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub entries: HashMap<String, FilterValue>,
}

impl FilterState {
    pub fn new() -> Self {
        FilterState::default()
    }

    /// A constraint for `field`, if one is set and non-neutral.
    pub fn active(&self, field: &str) -> Option<&FilterValue> {
        self.entries.get(field).filter(|v| !v.is_neutral())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SORT STATE
// ============================================================================

/// Sort direction for the single active sort field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Ascending
    }
}

/// Active sort configuration. `field == None` means no sort is applied and
/// the filtered order is preserved as-is.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SortState {
    pub field: Option<FieldIndex>,
    pub direction: SortDirection,
}

impl SortState {
    /// Applies one sort request: the same field toggles direction, a new
    /// field starts ascending.
    pub fn toggle(&mut self, field: FieldIndex) {
        if self.field == Some(field) && self.direction == SortDirection::Ascending {
            self.direction = SortDirection::Descending;
        } else {
            self.field = Some(field);
            self.direction = SortDirection::Ascending;
        }
    }
}

// ============================================================================
// GROUP STATE
// ============================================================================

/// Active grouping configuration. `field == None` means records render flat.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GroupState {
    pub field: Option<FieldIndex>,
}
