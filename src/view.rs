//! FILENAME: src/view.rs
//! Rendered output - the row sequence a frontend consumes.
//!
//! A rendered row is either a plain data row pointing back at a cache
//! record, or a synthetic group header. The enum variant is the marker a
//! frontend uses to tell the two apart; header rows carry no business data.

use serde::{Deserialize, Serialize};

/// Summary row synthesized for one group bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHeaderRow {
    /// Name of the field the view is grouped by.
    pub field: String,

    /// Stringified group value this bucket collects.
    pub key: String,

    /// Number of records in the bucket.
    pub member_count: usize,

    /// Whether the bucket's members are rendered below the header.
    pub expanded: bool,
}

/// One row of the final rendered sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderedRow {
    /// An underlying record, referenced by cache index.
    Data { record: u32 },

    /// A synthetic group summary row.
    GroupHeader(GroupHeaderRow),
}

impl RenderedRow {
    pub fn is_group_header(&self) -> bool {
        matches!(self, RenderedRow::GroupHeader(_))
    }
}
