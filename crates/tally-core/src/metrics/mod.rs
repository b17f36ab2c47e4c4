//! The aggregation pipeline: fetch, normalize, fold, backfill.
//!
//! One pass per project, in sequence, with per-project results merged into
//! disjoint partitions of the output tables; then the cross-project media
//! query; then the completion pass that makes every table total over
//! `projects × cohort`.

pub mod classify;
pub mod complete;
pub mod edits;
pub mod uploads;

use std::collections::BTreeMap;
use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::MetricsConfig;
use crate::row::{
    EditCountRow, LengthRow, RegistrationRow, RevisionRow, UploadRow, normalize_all,
};
use crate::source::ReplicaSource;
use crate::tables::MetricTable;
use crate::window::ReportWindow;

/// Parameters of one metrics run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRequest {
    /// User identities to report on. Treated as a set: order-irrelevant,
    /// duplicates ignored.
    pub cohort: Vec<String>,
    /// Projects (replica database names) to report on.
    pub projects: Vec<String>,
    /// The report window and lookback.
    pub window: ReportWindow,
    /// Metric knobs (threshold, media project, absence default).
    pub config: MetricsConfig,
}

/// The six output tables of a metrics run.
///
/// Every table is total over `projects × cohort` (the upload table over the
/// media project's cohort slice): a consumer may index blindly by user.
/// Construct via [`GlobalMetrics::compute`]; there are no mutating methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalMetrics {
    /// Whether the user made at least the threshold edits in the lookback
    /// window.
    pub active_editors: MetricTable<bool>,
    /// Whether the user's account was registered within the lookback window.
    pub newly_registered: MetricTable<bool>,
    /// Sum of absolute byte deltas over the user's edits in the window.
    pub absolute_bytes: MetricTable<u64>,
    /// Distinct main-namespace article titles edited, first-occurrence order.
    pub edited_articles: MetricTable<Vec<String>>,
    /// Count of main-namespace edits in the window.
    pub edit_counts: MetricTable<u64>,
    /// Media files uploaded to the media project, duplicates retained.
    pub uploaded_media: BTreeMap<String, Vec<String>>,
}

impl GlobalMetrics {
    /// Run the full fetch + aggregate pipeline.
    ///
    /// # Errors
    ///
    /// Fails fast on any data-source error, on malformed rows, and on a
    /// cohort member with no registration record
    /// ([`crate::error::MetricsError::InvalidIdentity`]).
    pub fn compute(source: &dyn ReplicaSource, request: &ReportRequest) -> Result<Self> {
        let cohort = normalized_cohort(&request.cohort);
        let config = &request.config;
        let window = &request.window;

        let lookback_ts = window.lookback_ts();
        let start_ts = window.start_ts();
        let end_ts = window.end_ts();

        let mut metrics = Self::default();

        for project in &request.projects {
            info!(project = project.as_str(), "aggregating project");

            // Registrations first: the one query that sees every cohort
            // member, so it doubles as identity validation (4.1) before any
            // metric for this project is computed.
            let registrations = normalize_all(
                &source.registrations(project, &cohort)?,
                RegistrationRow::from_raw,
            )
            .with_context(|| format!("registration rows on '{project}'"))?;
            classify::verify_cohort(&cohort, &registrations, project)?;

            for (user, newly) in classify::newly_registered(&registrations, &lookback_ts) {
                metrics.newly_registered.set(project, &user, newly);
            }

            let counts = normalize_all(
                &source.edit_counts_since(project, &cohort, &lookback_ts)?,
                EditCountRow::from_raw,
            )
            .with_context(|| format!("edit-count rows on '{project}'"))?;

            for (user, active) in classify::active_editors(&counts, config.active_edit_threshold) {
                metrics.active_editors.set(project, &user, active);
            }

            // Revision fold: bytes, main-namespace edit counts, article lists.
            let revisions = normalize_all(
                &source.revisions_between(project, &cohort, &start_ts, &end_ts)?,
                RevisionRow::from_raw,
            )
            .with_context(|| format!("revision rows on '{project}'"))?;

            let parent_ids = edits::distinct_parent_ids(&revisions);
            let parent_lengths: HashMap<i64, Option<i64>> = normalize_all(
                &source.revision_lengths(project, &parent_ids)?,
                LengthRow::from_raw,
            )
            .with_context(|| format!("parent-length rows on '{project}'"))?
            .into_iter()
            .map(|row| (row.rev_id, row.length))
            .collect();

            let partial = edits::fold_revisions(&revisions, &parent_lengths);
            debug!(
                project = project.as_str(),
                revisions = revisions.len(),
                surviving = partial.surviving_rows,
                "revision fold complete"
            );

            for (user, bytes) in partial.bytes {
                *metrics.absolute_bytes.entry(project, &user) += bytes;
            }
            for (user, edits) in partial.edits {
                *metrics.edit_counts.entry(project, &user) += edits;
            }
            for (user, articles) in partial.articles {
                metrics.edited_articles.set(project, &user, articles);
            }
        }

        // Media uploads: one cross-project query against the media project,
        // regardless of the input project set.
        let uploads = normalize_all(
            &source.root_uploads(&config.media_project, &cohort, &start_ts, &end_ts)?,
            UploadRow::from_raw,
        )
        .with_context(|| format!("upload rows on '{}'", config.media_project))?;
        metrics.uploaded_media = uploads::fold_uploads(&uploads);

        complete::backfill(&mut metrics, &request.projects, &cohort, config);

        Ok(metrics)
    }
}

/// Sort and dedup the cohort; makes "first unresolvable identity"
/// deterministic regardless of caller ordering.
fn normalized_cohort(cohort: &[String]) -> Vec<String> {
    let mut cohort = cohort.to_vec();
    cohort.sort_unstable();
    cohort.dedup();
    cohort
}
