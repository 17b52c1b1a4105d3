//! FILENAME: src/lib.rs
//! Interactive data table view engine.
//!
//! Transforms a raw record set into the row sequence a table frontend
//! actually renders: fuzzy/exact filtering -> range/set/date filtering ->
//! stable sorting -> grouping -> group-header synthesis with
//! expand/collapse state. The crate has no UI, network or file surface;
//! a presentation layer drives a [`TableSession`] through its operations
//! and consumes [`TableSession::rendered_rows`].
//!
//! Layers:
//! - `definition`: Serializable configuration (what the view IS)
//! - `cache`: Internal record representation (HOW we store)
//! - `fuzzy`: Approximate substring matching
//! - `engine`: Pipeline stages (HOW we calculate)
//! - `view`: Renderable output for the frontend (WHAT we display)
//! - `session`: State ownership and incremental recomputation

pub mod cache;
pub mod definition;
pub mod engine;
pub mod error;
pub mod fuzzy;
pub mod session;
pub mod view;

pub use cache::{compare_values, OrderedFloat, Record, TableCache, Value};
pub use definition::{
    FieldDescriptor, FieldIndex, FieldKind, FilterState, FilterValue, GroupState, Schema,
    SortDirection, SortState,
};
pub use engine::{
    apply_filters, group_records, render_flat_rows, render_grouped_rows, sort_records,
    GroupBucket,
};
pub use error::TableError;
pub use fuzzy::{fuzzy_match, substring_distance};
pub use session::TableSession;
pub use view::{GroupHeaderRow, RenderedRow};
