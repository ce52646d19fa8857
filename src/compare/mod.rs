//! Semantic comparison of decoded archives.
//!
//! Sections are lifted into a [`CmpGraph`] where object references become
//! edges, then two graphs are walked side by side by a [`DiffSession`].
//! Findings are [`Issue`] values, not errors.

mod diff;
mod lifter;
mod node;
mod order;

pub use diff::*;
pub use lifter::*;
pub use node::*;
pub use order::{collection_order, structural_hash, CollectionOrder, CYCLE_SENTINEL};

use crate::nib::Sections;
use crate::util::Result;

/// Lift both archives and collect every difference.
pub fn compare_sections(left: &Sections, right: &Sections) -> Result<Vec<Issue>> {
    let left = lift(left)?;
    let right = lift(right)?;
    let issues: Vec<_> = compare(&left, &right).collect();
    tracing::debug!(issues = issues.len(), "compared archives");
    Ok(issues)
}
