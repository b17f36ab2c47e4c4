//! Parent-length resolution and the revision fold.
//!
//! The hardest part of the report: each revision row's byte contribution is
//! the unsigned difference between its length and its parent's length, and
//! the parent's length has to be resolved through a second query keyed by
//! the `rev_parent_id` values the rows reference. Rows whose lengths cannot
//! be resolved contribute nothing — incomplete historical data, not an
//! error.

use std::collections::BTreeMap;
use std::collections::HashMap;

use tracing::debug;

use crate::row::RevisionRow;

/// The article/content namespace. Edit counts and article lists only cover
/// this namespace; byte deltas cover all namespaces.
pub const ARTICLE_NAMESPACE: i64 = 0;

/// Per-project partial result of the revision fold, merged into the output
/// tables by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectEdits {
    /// Sum of absolute byte deltas per user, all namespaces.
    pub bytes: BTreeMap<String, u64>,
    /// Main-namespace edit count per user.
    pub edits: BTreeMap<String, u64>,
    /// Distinct main-namespace titles per user, first-occurrence order.
    pub articles: BTreeMap<String, Vec<String>>,
    /// Rows that survived the defensive length filter.
    pub surviving_rows: usize,
}

/// Distinct nonzero `parent_id` values referenced by `rows`, sorted.
///
/// Parent id 0 marks a root revision and has defined length 0 — nothing to
/// look up.
#[must_use]
pub fn distinct_parent_ids(rows: &[RevisionRow]) -> Vec<i64> {
    let mut ids: Vec<i64> = rows.iter().map(|row| row.parent_id).filter(|id| *id != 0).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Resolve the parent length of one row: 0 for a root revision, otherwise
/// the fetched length. `None` when the parent is dangling or its length is
/// itself unknown.
#[must_use]
pub fn resolved_parent_length(
    row: &RevisionRow,
    parent_lengths: &HashMap<i64, Option<i64>>,
) -> Option<i64> {
    if row.parent_id == 0 {
        return Some(0);
    }
    parent_lengths.get(&row.parent_id).copied().flatten()
}

/// Fold revision rows into per-user byte totals, main-namespace edit counts,
/// and deduplicated article lists.
///
/// Rows with an unknown current length or an unresolvable parent length are
/// skipped and logged at debug level.
#[must_use]
pub fn fold_revisions(
    rows: &[RevisionRow],
    parent_lengths: &HashMap<i64, Option<i64>>,
) -> ProjectEdits {
    let mut partial = ProjectEdits::default();

    for row in rows {
        let Some(length) = row.length else {
            debug!(rev_id = row.rev_id, "skipping revision with unknown length");
            continue;
        };
        let Some(parent_length) = resolved_parent_length(row, parent_lengths) else {
            debug!(
                rev_id = row.rev_id,
                parent_id = row.parent_id,
                "skipping revision with unresolvable parent length"
            );
            continue;
        };

        partial.surviving_rows += 1;

        // Unsigned magnitude: additions and deletions both count as
        // activity volume.
        let delta = (length - parent_length).unsigned_abs();
        *partial.bytes.entry(row.user.clone()).or_default() += delta;

        if row.namespace == ARTICLE_NAMESPACE {
            *partial.edits.entry(row.user.clone()).or_default() += 1;
            let articles = partial.articles.entry(row.user.clone()).or_default();
            if !articles.contains(&row.page_title) {
                articles.push(row.page_title.clone());
            }
        }
    }

    partial
}
