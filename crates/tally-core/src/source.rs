//! The replica data-source seam.
//!
//! The aggregation pipeline depends on five query shapes, one method each.
//! Implementations return raw rows in whatever order the store produced
//! them; decoding happens afterwards in [`crate::row`]. A query failure is
//! fatal for the run — retry policy, if any, belongs behind this trait.

use anyhow::Result;

use crate::row::RawRow;

/// A source of raw replica rows for a set of projects.
pub trait ReplicaSource {
    /// Per-user edit counts on `project` since `since_ts` (inclusive),
    /// restricted to `cohort`, grouped by user: `(user, count)` rows.
    fn edit_counts_since(&self, project: &str, cohort: &[String], since_ts: &str)
    -> Result<Vec<RawRow>>;

    /// Registration dates for `cohort` on `project`: `(user, ts | NULL)`
    /// rows. A cohort member with no account yields no row at all.
    fn registrations(&self, project: &str, cohort: &[String]) -> Result<Vec<RawRow>>;

    /// Revisions by `cohort` on `project` within `[start_ts, end_ts]`,
    /// joined with page metadata:
    /// `(user, page_title, rev_len | NULL, rev_parent_id, rev_id, page_namespace)` rows.
    fn revisions_between(
        &self,
        project: &str,
        cohort: &[String],
        start_ts: &str,
        end_ts: &str,
    ) -> Result<Vec<RawRow>>;

    /// Lengths of specific revisions on `project`: `(rev_id, rev_len | NULL)`
    /// rows. Ids unknown to the replica yield no row.
    fn revision_lengths(&self, project: &str, rev_ids: &[i64]) -> Result<Vec<RawRow>>;

    /// Root revisions in the file namespace of `project` (uploads) by
    /// `cohort` within `[start_ts, end_ts]`: `(user, file_title)` rows.
    fn root_uploads(
        &self,
        project: &str,
        cohort: &[String],
        start_ts: &str,
        end_ts: &str,
    ) -> Result<Vec<RawRow>>;
}
