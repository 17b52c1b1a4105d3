//! FILENAME: src/session.rs
//! Table Session - The pipeline orchestrator.
//!
//! Owns the dataset plus all view state for one logical session and exposes
//! the operations a presentation layer drives. Stage outputs are memoized
//! behind dirty flags so a state change only recomputes the stages whose
//! inputs actually changed:
//!
//!   filter state  -> filtered indices -> sorted indices -> rendered rows
//!   sort state    ------------------------^                  ^
//!   group / expansion state -------------------------------- |
//!
//! Recomputation is pull-based from `rendered_rows` and idempotent; every
//! operation reads the current state through the session, never a captured
//! snapshot.

use rustc_hash::FxHashMap;

use crate::cache::{Record, TableCache, Value};
use crate::definition::{
    FieldKind, FilterState, FilterValue, GroupState, Schema, SortState,
};
use crate::engine::{
    apply_filters, group_records, render_flat_rows, render_grouped_rows, sort_records,
};
use crate::error::TableError;
use crate::view::RenderedRow;

/// One interactive table view over an immutable dataset.
#[derive(Debug, Clone)]
pub struct TableSession {
    schema: Schema,
    cache: TableCache,

    filters: FilterState,
    sort: SortState,
    group: GroupState,

    /// Group key -> expanded. Unseen keys default to collapsed; entries for
    /// buckets that are currently absent are kept and ignored.
    expansion: FxHashMap<String, bool>,

    // Memoized stage outputs.
    filtered: Vec<u32>,
    sorted: Vec<u32>,
    view: Vec<RenderedRow>,

    filter_dirty: bool,
    sort_dirty: bool,
    view_dirty: bool,
}

impl TableSession {
    /// Builds a session from a schema and the raw records, each given as
    /// values in schema field order.
    pub fn new(schema: Schema, records: Vec<Vec<Value>>) -> Result<Self, TableError> {
        let mut cache = TableCache::new(&schema);
        for values in records {
            cache.add_record(values)?;
        }
        log::debug!(
            "session created: {} fields, {} records",
            schema.field_count(),
            cache.record_count()
        );
        Ok(TableSession {
            schema,
            cache,
            filters: FilterState::new(),
            sort: SortState::default(),
            group: GroupState::default(),
            expansion: FxHashMap::default(),
            filtered: Vec::new(),
            sorted: Vec::new(),
            view: Vec::new(),
            filter_dirty: true,
            sort_dirty: true,
            view_dirty: true,
        })
    }

    // ========================================================================
    // FILTER OPERATIONS
    // ========================================================================

    /// Sets (or replaces) the filter constraint for one field. The field
    /// name, the value shape against the field kind, and range
    /// well-formedness are all validated before any state changes; on error
    /// the prior constraint is retained.
    pub fn set_filter(&mut self, field: &str, value: FilterValue) -> Result<(), TableError> {
        let index = self.schema.field_index(field)?;
        let kind = self.schema.field(index).map(|f| f.kind);
        validate_filter_value(kind.unwrap_or(FieldKind::Plain), &value)?;

        log::debug!("set_filter field={} value={:?}", field, value);
        self.filters.entries.insert(field.to_string(), value);
        self.invalidate_filter();
        Ok(())
    }

    /// Resets the entire filter state in one step.
    pub fn clear_filters(&mut self) {
        log::debug!("clear_filters");
        self.filters = FilterState::new();
        self.invalidate_filter();
    }

    // ========================================================================
    // SORT OPERATIONS
    // ========================================================================

    /// Requests a sort on `field`: repeated requests on the same field
    /// toggle ascending -> descending, a different field starts ascending.
    pub fn set_sort(&mut self, field: &str) -> Result<(), TableError> {
        let index = self.schema.field_index(field)?;
        self.sort.toggle(index);
        log::debug!("set_sort field={} direction={:?}", field, self.sort.direction);
        self.invalidate_sort();
        Ok(())
    }

    /// Resets to no sort; the filtered order shows through again.
    pub fn clear_sort(&mut self) {
        log::debug!("clear_sort");
        self.sort = SortState::default();
        self.invalidate_sort();
    }

    // ========================================================================
    // GROUP OPERATIONS
    // ========================================================================

    /// Groups the view by `field`. The expansion map is kept across group
    /// field changes; stale keys are harmless.
    pub fn set_group(&mut self, field: &str) -> Result<(), TableError> {
        let index = self.schema.field_index(field)?;
        self.group.field = Some(index);
        log::debug!("set_group field={}", field);
        self.invalidate_view();
        Ok(())
    }

    /// Removes grouping and resets all expansion state.
    pub fn clear_group(&mut self) {
        log::debug!("clear_group");
        self.group = GroupState::default();
        self.expansion.clear();
        self.invalidate_view();
    }

    /// Flips the expanded flag for one group key, leaving every other key
    /// untouched. A never-seen key starts collapsed, so its first toggle
    /// expands it.
    pub fn toggle_group_expansion(&mut self, key: &str) {
        let entry = self.expansion.entry(key.to_string()).or_insert(false);
        *entry = !*entry;
        log::debug!("toggle_group_expansion key={} expanded={}", key, *entry);
        self.invalidate_view();
    }

    // ========================================================================
    // READ PATH
    // ========================================================================

    /// The rendered row sequence for the current state. Recomputes only the
    /// stages whose inputs changed since the last call; never fails.
    pub fn rendered_rows(&mut self) -> &[RenderedRow] {
        self.ensure_view();
        &self.view
    }

    /// Distinct display values of a field, in first-seen record order. Used
    /// to populate categorical filter choices.
    pub fn unique_values(&self, field: &str) -> Result<Vec<String>, TableError> {
        let index = self.schema.field_index(field)?;
        Ok(self.cache.unique_display_values(index))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn record(&self, index: u32) -> Option<&Record> {
        self.cache.record(index)
    }

    pub fn record_count(&self) -> usize {
        self.cache.record_count()
    }

    /// Number of records surviving the current filters.
    pub fn filtered_count(&mut self) -> usize {
        self.ensure_filtered();
        self.filtered.len()
    }

    // ========================================================================
    // RECOMPUTATION
    // ========================================================================

    fn invalidate_filter(&mut self) {
        self.filter_dirty = true;
        self.sort_dirty = true;
        self.view_dirty = true;
    }

    fn invalidate_sort(&mut self) {
        self.sort_dirty = true;
        self.view_dirty = true;
    }

    fn invalidate_view(&mut self) {
        self.view_dirty = true;
    }

    fn ensure_filtered(&mut self) {
        if self.filter_dirty {
            self.filtered = apply_filters(&self.cache, &self.schema, &self.filters);
            self.filter_dirty = false;
        }
    }

    fn ensure_sorted(&mut self) {
        self.ensure_filtered();
        if self.sort_dirty {
            self.sorted = sort_records(&self.cache, &self.filtered, &self.sort);
            self.sort_dirty = false;
        }
    }

    fn ensure_view(&mut self) {
        self.ensure_sorted();
        if !self.view_dirty {
            return;
        }
        self.view = match self.group.field {
            Some(field) => {
                let buckets = group_records(&self.cache, &self.sorted, field);
                let field_name = self
                    .schema
                    .field(field)
                    .map(|f| f.name.as_str())
                    .unwrap_or_default();
                render_grouped_rows(&buckets, field_name, &self.expansion)
            }
            None => render_flat_rows(&self.sorted),
        };
        self.view_dirty = false;
    }
}

/// Checks a filter value against the target field's kind. Plain fields
/// accept anything (the engine ignores them); every other kind requires the
/// matching shape plus a well-formed range.
fn validate_filter_value(kind: FieldKind, value: &FilterValue) -> Result<(), TableError> {
    match (kind, value) {
        (FieldKind::Plain, _) => Ok(()),
        (FieldKind::TextFuzzy, FilterValue::Text(_)) => Ok(()),
        (FieldKind::Categorical, FilterValue::ValueSet(_)) => Ok(()),

        (FieldKind::NumericRange, FilterValue::NumberRange(min, max)) => {
            if !min.is_finite() || !max.is_finite() {
                return Err(TableError::InvalidRange(format!(
                    "non-finite bound: [{}, {}]",
                    min, max
                )));
            }
            if min > max {
                return Err(TableError::InvalidRange(format!(
                    "min {} exceeds max {}",
                    min, max
                )));
            }
            Ok(())
        }

        (FieldKind::DateRange, FilterValue::DateRange(start, end)) => match (start, end) {
            (Some(s), Some(e)) if s > e => Err(TableError::InvalidRange(format!(
                "start {} after end {}",
                s, e
            ))),
            _ => Ok(()),
        },

        (kind, value) => Err(TableError::InvalidRange(format!(
            "filter value {:?} does not fit field kind {:?}",
            value, kind
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::FieldDescriptor;

    fn create_test_session() -> TableSession {
        let schema = Schema::new(vec![
            FieldDescriptor::new("id", FieldKind::TextFuzzy),
            FieldDescriptor::new("name", FieldKind::TextFuzzy),
            FieldDescriptor::new("category", FieldKind::Categorical),
            FieldDescriptor::new("price", FieldKind::NumericRange),
            FieldDescriptor::new("createdAt", FieldKind::DateRange),
        ])
        .unwrap();
        let records = vec![
            vec![
                Value::text("1"),
                Value::text("Shoes"),
                Value::text("A"),
                Value::number(10.0),
                Value::Date(100),
            ],
            vec![
                Value::text("2"),
                Value::text("Shirt"),
                Value::text("B"),
                Value::number(900.0),
                Value::Date(200),
            ],
            vec![
                Value::text("3"),
                Value::text("Sandals"),
                Value::text("A"),
                Value::number(50.0),
                Value::Date(300),
            ],
        ];
        TableSession::new(schema, records).unwrap()
    }

    fn data_records(rows: &[RenderedRow]) -> Vec<u32> {
        rows.iter()
            .filter_map(|row| match row {
                RenderedRow::Data { record } => Some(*record),
                RenderedRow::GroupHeader(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_unfiltered_render_is_source_order() {
        let mut session = create_test_session();
        assert_eq!(data_records(session.rendered_rows()), vec![0, 1, 2]);
    }

    #[test]
    fn test_filter_group_toggle_scenario() {
        let mut session = create_test_session();
        session
            .set_filter("price", FilterValue::NumberRange(0.0, 100.0))
            .unwrap();
        session.set_group("category").unwrap();

        // B is filtered out before grouping; the remaining bucket renders
        // collapsed as a single header.
        let rows = session.rendered_rows().to_vec();
        assert_eq!(rows.len(), 1);
        assert!(matches!(&rows[0], RenderedRow::GroupHeader(h)
            if h.key == "A" && h.member_count == 2 && !h.expanded));

        session.toggle_group_expansion("A");
        let rows = session.rendered_rows().to_vec();
        assert_eq!(rows.len(), 3);
        assert_eq!(data_records(&rows), vec![0, 2]);

        // Toggling twice restores the original state.
        session.toggle_group_expansion("A");
        assert_eq!(session.rendered_rows().len(), 1);
    }

    #[test]
    fn test_clear_filters_restores_unfiltered_view() {
        let mut session = create_test_session();
        session.set_sort("price").unwrap();
        session.set_group("category").unwrap();
        let baseline = session.rendered_rows().to_vec();

        session
            .set_filter("price", FilterValue::NumberRange(0.0, 20.0))
            .unwrap();
        session
            .set_filter("name", FilterValue::Text("sho".to_string()))
            .unwrap();
        assert_ne!(session.rendered_rows().to_vec(), baseline);

        // One atomic clear reproduces the sorted + grouped baseline.
        session.clear_filters();
        assert_eq!(session.rendered_rows().to_vec(), baseline);
    }

    #[test]
    fn test_sort_toggle_and_clear() {
        let mut session = create_test_session();
        session.set_sort("price").unwrap();
        assert_eq!(data_records(session.rendered_rows()), vec![0, 2, 1]);

        // Same field again: descending.
        session.set_sort("price").unwrap();
        assert_eq!(data_records(session.rendered_rows()), vec![1, 2, 0]);

        session.clear_sort();
        assert_eq!(data_records(session.rendered_rows()), vec![0, 1, 2]);
    }

    #[test]
    fn test_sort_direction_reset_on_new_field() {
        let mut session = create_test_session();
        session.set_sort("price").unwrap();
        session.set_sort("price").unwrap();
        session.set_sort("name").unwrap();
        // Ascending by name: Sandals, Shirt, Shoes.
        assert_eq!(data_records(session.rendered_rows()), vec![2, 1, 0]);
    }

    #[test]
    fn test_invalid_field_leaves_state_unchanged() {
        let mut session = create_test_session();
        let baseline = session.rendered_rows().to_vec();

        assert!(matches!(
            session.set_filter("bogus", FilterValue::Text("x".to_string())),
            Err(TableError::InvalidField(_))
        ));
        assert!(matches!(
            session.set_sort("bogus"),
            Err(TableError::InvalidField(_))
        ));
        assert!(matches!(
            session.set_group("bogus"),
            Err(TableError::InvalidField(_))
        ));
        assert!(matches!(
            session.unique_values("bogus"),
            Err(TableError::InvalidField(_))
        ));

        assert_eq!(session.rendered_rows().to_vec(), baseline);
    }

    #[test]
    fn test_invalid_range_retains_prior_filter() {
        let mut session = create_test_session();
        session
            .set_filter("price", FilterValue::NumberRange(0.0, 100.0))
            .unwrap();

        assert!(matches!(
            session.set_filter("price", FilterValue::NumberRange(500.0, 5.0)),
            Err(TableError::InvalidRange(_))
        ));
        assert!(matches!(
            session.set_filter("price", FilterValue::NumberRange(f64::NAN, 5.0)),
            Err(TableError::InvalidRange(_))
        ));
        assert!(matches!(
            session.set_filter("createdAt", FilterValue::DateRange(Some(500), Some(100))),
            Err(TableError::InvalidRange(_))
        ));
        // Shape mismatch is a malformed constraint, not an unknown field.
        assert!(matches!(
            session.set_filter("price", FilterValue::Text("10".to_string())),
            Err(TableError::InvalidRange(_))
        ));

        // The [0, 100] constraint from before is still in force.
        assert_eq!(data_records(session.rendered_rows()), vec![0, 2]);
    }

    #[test]
    fn test_empty_dataset_renders_empty() {
        let schema = Schema::new(vec![
            FieldDescriptor::new("name", FieldKind::TextFuzzy),
            FieldDescriptor::new("category", FieldKind::Categorical),
        ])
        .unwrap();
        let mut session = TableSession::new(schema, Vec::new()).unwrap();

        session.set_group("category").unwrap();
        session
            .set_filter("name", FilterValue::Text("x".to_string()))
            .unwrap();
        assert!(session.rendered_rows().is_empty());
        assert_eq!(session.filtered_count(), 0);
    }

    #[test]
    fn test_toggle_unseen_key_is_harmless() {
        let mut session = create_test_session();
        session.toggle_group_expansion("never-a-group");
        // No grouping active: the view is unaffected.
        assert_eq!(data_records(session.rendered_rows()), vec![0, 1, 2]);
    }

    #[test]
    fn test_repeated_reads_are_identical() {
        let mut session = create_test_session();
        session
            .set_filter("name", FilterValue::Text("sh".to_string()))
            .unwrap();
        session.set_sort("price").unwrap();
        session.set_group("category").unwrap();
        session.toggle_group_expansion("A");

        let first = session.rendered_rows().to_vec();
        let second = session.rendered_rows().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_expansion_survives_group_field_change() {
        let mut session = create_test_session();
        session.set_group("category").unwrap();
        session.toggle_group_expansion("A");

        session.set_group("name").unwrap();
        session.set_group("category").unwrap();
        // "A" is still expanded; stale keys from the name grouping are
        // ignored.
        let rows = session.rendered_rows().to_vec();
        assert!(matches!(&rows[0], RenderedRow::GroupHeader(h)
            if h.key == "A" && h.expanded));

        session.clear_group();
        session.set_group("category").unwrap();
        let rows = session.rendered_rows().to_vec();
        assert!(matches!(&rows[0], RenderedRow::GroupHeader(h) if !h.expanded));
    }

    #[test]
    fn test_neutral_filter_imposes_no_constraint() {
        let mut session = create_test_session();
        session
            .set_filter("name", FilterValue::Text(String::new()))
            .unwrap();
        session
            .set_filter("category", FilterValue::ValueSet(Vec::new()))
            .unwrap();
        assert_eq!(session.filtered_count(), 3);
    }

    #[test]
    fn test_unique_values_for_filter_choices() {
        let session = create_test_session();
        assert_eq!(session.unique_values("category").unwrap(), vec!["A", "B"]);
    }
}
