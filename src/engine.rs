//! FILENAME: src/engine.rs
//! Pipeline stages - filter, sort, group, render.
//!
//! Each stage is a pure function from record indices to record indices (or
//! buckets / rendered rows). Composition order is fixed:
//!
//!   all records -> apply_filters -> sort_records -> group_records -> render_rows
//!
//! No stage reads a later stage's output and no stage mutates the cache.

use rustc_hash::FxHashMap;

use crate::cache::{compare_values, TableCache};
use crate::definition::{
    FieldIndex, FieldKind, FilterState, FilterValue, Schema, SortDirection, SortState,
};
use crate::fuzzy::fuzzy_match;
use crate::view::{GroupHeaderRow, RenderedRow};

// ============================================================================
// FILTERING
// ============================================================================

/// Applies the full filter state to the dataset, returning the surviving
/// record indices.
///
/// Fuzzy text filters run first, in schema order, each one narrowing the
/// candidate set left by the previous (sequential narrowing, not an
/// intersection of independent runs - the later fuzzy field only ever sees
/// what the earlier one kept). The remaining predicate kinds are then
/// evaluated as one conjunctive pass. State entries naming unknown fields
/// are ignored.
pub fn apply_filters(cache: &TableCache, schema: &Schema, filters: &FilterState) -> Vec<u32> {
    let mut indices = cache.all_indices();

    // Phase a: sequential fuzzy narrowing.
    for (field_index, descriptor) in schema.fields().iter().enumerate() {
        if descriptor.kind != FieldKind::TextFuzzy {
            continue;
        }
        if let Some(FilterValue::Text(query)) = filters.active(&descriptor.name) {
            indices = fuzzy_match(cache, &indices, field_index, query);
        }
    }

    // Phase b: conjunctive predicate pass over the narrowed set.
    indices.retain(|&index| record_passes_predicates(cache, schema, filters, index));

    log::debug!(
        "filter pass kept {} of {} records",
        indices.len(),
        cache.record_count()
    );
    indices
}

/// Evaluates every non-fuzzy predicate against one record. All active
/// constraints must hold (AND semantics).
fn record_passes_predicates(
    cache: &TableCache,
    schema: &Schema,
    filters: &FilterState,
    index: u32,
) -> bool {
    for (field_index, descriptor) in schema.fields().iter().enumerate() {
        let constraint = match filters.active(&descriptor.name) {
            Some(c) => c,
            None => continue,
        };

        let value = cache.value(index, field_index);
        let passes = match (descriptor.kind, constraint) {
            // Handled in the fuzzy phase.
            (FieldKind::TextFuzzy, _) => true,

            (FieldKind::NumericRange, FilterValue::NumberRange(min, max)) => value
                .as_number()
                .map(|v| *min <= v && v <= *max)
                .unwrap_or(false),

            (FieldKind::DateRange, FilterValue::DateRange(start, end)) => value
                .as_date()
                .map(|v| start.map_or(true, |s| v >= s) && end.map_or(true, |e| v <= e))
                .unwrap_or(false),

            (FieldKind::Categorical, FilterValue::ValueSet(accepted)) => {
                accepted.contains(&value.display_string())
            }

            // Plain fields and kind/shape mismatches never constrain.
            _ => true,
        };

        if !passes {
            return false;
        }
    }
    true
}

// ============================================================================
// SORTING
// ============================================================================

/// Stable sort of `indices` by the configured field. No sort field means
/// the input order is preserved untouched. Descending swaps the comparator
/// arguments rather than reversing the output, so equal keys keep their
/// relative input order either way.
pub fn sort_records(cache: &TableCache, indices: &[u32], sort: &SortState) -> Vec<u32> {
    let field = match sort.field {
        Some(f) => f,
        None => return indices.to_vec(),
    };

    let mut sorted = indices.to_vec();
    match sort.direction {
        SortDirection::Ascending => {
            sorted.sort_by(|&a, &b| compare_values(cache.value(a, field), cache.value(b, field)));
        }
        SortDirection::Descending => {
            sorted.sort_by(|&a, &b| compare_values(cache.value(b, field), cache.value(a, field)));
        }
    }
    sorted
}

// ============================================================================
// GROUPING
// ============================================================================

/// An ordered run of records sharing one group-key value.
#[derive(Debug, Clone)]
pub struct GroupBucket {
    /// Stringified group field value.
    pub key: String,

    /// Member record indices, in arrival (filtered + sorted) order.
    pub members: Vec<u32>,
}

/// Partitions `indices` into buckets keyed by the display string of
/// `field`. Buckets appear in first-seen order of their key; each record
/// lands in exactly one bucket.
pub fn group_records(cache: &TableCache, indices: &[u32], field: FieldIndex) -> Vec<GroupBucket> {
    let mut bucket_by_key: FxHashMap<String, usize> = FxHashMap::default();
    let mut buckets: Vec<GroupBucket> = Vec::new();

    for &index in indices {
        let key = cache.value(index, field).display_string();
        match bucket_by_key.get(&key) {
            Some(&pos) => buckets[pos].members.push(index),
            None => {
                bucket_by_key.insert(key.clone(), buckets.len());
                buckets.push(GroupBucket {
                    key,
                    members: vec![index],
                });
            }
        }
    }

    buckets
}

// ============================================================================
// RENDERING
// ============================================================================

/// Renders grouped buckets into the final row sequence: one header row per
/// bucket, followed by its members only when the bucket is expanded.
/// Unknown keys in `expansion` (buckets no longer present) are ignored.
pub fn render_grouped_rows(
    buckets: &[GroupBucket],
    group_field: &str,
    expansion: &FxHashMap<String, bool>,
) -> Vec<RenderedRow> {
    let mut rows = Vec::new();
    for bucket in buckets {
        let expanded = expansion.get(&bucket.key).copied().unwrap_or(false);
        rows.push(RenderedRow::GroupHeader(GroupHeaderRow {
            field: group_field.to_string(),
            key: bucket.key.clone(),
            member_count: bucket.members.len(),
            expanded,
        }));
        if expanded {
            rows.extend(bucket.members.iter().map(|&index| RenderedRow::Data { record: index }));
        }
    }
    rows
}

/// Renders an ungrouped index sequence as plain data rows.
pub fn render_flat_rows(indices: &[u32]) -> Vec<RenderedRow> {
    indices
        .iter()
        .map(|&index| RenderedRow::Data { record: index })
        .collect()
}
