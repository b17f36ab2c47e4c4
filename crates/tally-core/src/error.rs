//! Typed domain errors for the metrics pipeline.
//!
//! Query-layer failures travel as `anyhow` errors with context chains; the
//! errors here are the ones callers are expected to match on.

/// Fatal domain errors raised during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricsError {
    /// A cohort member has no registration record on a project.
    ///
    /// Raised eagerly, before any metric for the project is computed: every
    /// downstream table promises an entry per cohort member, which only
    /// holds if each member is a real account on each project.
    #[error("invalid identity '{user}': no registration record on project '{project}'")]
    InvalidIdentity {
        /// The unresolvable identity, first in cohort order.
        user: String,
        /// The project whose user table was consulted.
        project: String,
    },
}
