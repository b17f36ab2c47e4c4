//! The completion pass: make every table total over `projects × cohort`.
//!
//! Users with zero qualifying rows end the folds absent from the maps. This
//! pass inserts the zero/empty/default entries so downstream consumers can
//! index blindly by `(project, user)`.

use super::GlobalMetrics;
use crate::config::MetricsConfig;

/// Backfill defaults for every `(project, cohort member)` pair, and for
/// every cohort member on the media project's upload table.
pub fn backfill(
    metrics: &mut GlobalMetrics,
    projects: &[String],
    cohort: &[String],
    config: &MetricsConfig,
) {
    for project in projects {
        for user in cohort {
            metrics.absolute_bytes.ensure(project, user);
            metrics.edited_articles.ensure(project, user);
            metrics.edit_counts.ensure(project, user);

            // No lookback rows means zero lookback edits; the default is
            // configurable because historical variants disagreed.
            if !metrics.active_editors.contains(project, user) {
                metrics.active_editors.set(project, user, config.absent_is_active);
            }

            // Validation guarantees a registration row per member, so this
            // only covers defensive completeness.
            if !metrics.newly_registered.contains(project, user) {
                metrics.newly_registered.set(project, user, false);
            }
        }
    }

    for user in cohort {
        metrics.uploaded_media.entry(user.clone()).or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn all_tables_become_total_over_projects_and_cohort() {
        let mut metrics = GlobalMetrics::default();
        let projects = strings(&["wiki1", "wiki2"]);
        let cohort = strings(&["alice", "bob"]);

        backfill(&mut metrics, &projects, &cohort, &MetricsConfig::default());

        for project in &projects {
            for user in &cohort {
                assert_eq!(metrics.absolute_bytes.get(project, user), Some(&0));
                assert_eq!(metrics.edit_counts.get(project, user), Some(&0));
                assert_eq!(metrics.edited_articles.get(project, user), Some(&Vec::new()));
                assert_eq!(metrics.active_editors.get(project, user), Some(&false));
                assert_eq!(metrics.newly_registered.get(project, user), Some(&false));
            }
        }
        assert_eq!(metrics.uploaded_media["alice"], Vec::<String>::new());
        assert_eq!(metrics.uploaded_media["bob"], Vec::<String>::new());
    }

    #[test]
    fn existing_entries_survive_backfill() {
        let mut metrics = GlobalMetrics::default();
        *metrics.absolute_bytes.entry("wiki1", "alice") = 123;
        metrics.active_editors.set("wiki1", "alice", true);
        metrics.uploaded_media.insert("alice".to_string(), vec!["File:A.jpg".to_string()]);

        backfill(
            &mut metrics,
            &strings(&["wiki1"]),
            &strings(&["alice"]),
            &MetricsConfig::default(),
        );

        assert_eq!(metrics.absolute_bytes.get("wiki1", "alice"), Some(&123));
        assert_eq!(metrics.active_editors.get("wiki1", "alice"), Some(&true));
        assert_eq!(metrics.uploaded_media["alice"], vec!["File:A.jpg"]);
    }

    #[test]
    fn absence_default_for_active_editors_is_configurable() {
        let mut metrics = GlobalMetrics::default();
        let config = MetricsConfig {
            absent_is_active: true,
            ..MetricsConfig::default()
        };

        backfill(&mut metrics, &strings(&["wiki1"]), &strings(&["bob"]), &config);

        assert_eq!(metrics.active_editors.get("wiki1", "bob"), Some(&true));
    }
}
