//! Cohort validation and the two lookback classifications.

use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::error::MetricsError;
use crate::row::{EditCountRow, RegistrationRow};

/// Verify that every cohort member has a registration row on `project`.
///
/// Runs before any metric for the project is computed: the completeness
/// invariant of the output tables assumes every cohort member is a real
/// account.
///
/// # Errors
///
/// [`MetricsError::InvalidIdentity`] naming the first (in cohort order)
/// identity with no registration row.
pub fn verify_cohort(
    cohort: &[String],
    rows: &[RegistrationRow],
    project: &str,
) -> Result<(), MetricsError> {
    let known: HashSet<&str> = rows.iter().map(|row| row.user.as_str()).collect();
    for user in cohort {
        if !known.contains(user.as_str()) {
            return Err(MetricsError::InvalidIdentity {
                user: user.clone(),
                project: project.to_string(),
            });
        }
    }
    Ok(())
}

/// Classify active editors from grouped lookback edit counts.
///
/// A user is active iff their count meets `threshold`. Users with no row
/// made no lookback edits and are left absent here; the completion pass
/// fills in the configured absence default.
#[must_use]
pub fn active_editors(rows: &[EditCountRow], threshold: u64) -> BTreeMap<String, bool> {
    rows.iter()
        .map(|row| (row.user.clone(), row.edits >= threshold))
        .collect()
}

/// Classify newly-registered users against the lookback start.
///
/// An absent registration timestamp means the account predates timestamp
/// tracking: old by definition, classified `false`. Otherwise the user is
/// newly registered iff `registered >= lookback_ts` — both sides in the
/// fixed-width replica encoding, compared lexicographically.
#[must_use]
pub fn newly_registered(rows: &[RegistrationRow], lookback_ts: &str) -> BTreeMap<String, bool> {
    rows.iter()
        .map(|row| {
            let newly = row
                .registered
                .as_deref()
                .is_some_and(|registered| registered >= lookback_ts);
            (row.user.clone(), newly)
        })
        .collect()
}
