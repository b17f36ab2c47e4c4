//! Property-based laws for the revision fold.
//!
//! The fold over revision rows has a handful of invariants that must hold
//! for every input shape, not just the handful of fixtures in the unit
//! tests. Each law gets its own property.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use tally_core::metrics::edits::{
    ARTICLE_NAMESPACE, distinct_parent_ids, fold_revisions, resolved_parent_length,
};
use tally_core::row::RevisionRow;

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn arb_user() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "alice".to_string(),
        "bob".to_string(),
        "carol".to_string(),
    ])
}

fn arb_title() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "Alpha".to_string(),
        "Beta".to_string(),
        "Gamma".to_string(),
        "Delta".to_string(),
    ])
}

fn arb_revision() -> impl Strategy<Value = RevisionRow> {
    (
        arb_user(),
        arb_title(),
        prop::option::of(0_i64..5000),
        0_i64..20,
        1_i64..10_000,
        prop::sample::select(vec![0_i64, 1, 4, 6]),
    )
        .prop_map(|(user, page_title, length, parent_id, rev_id, namespace)| {
            RevisionRow {
                user,
                page_title,
                length,
                parent_id,
                rev_id,
                namespace,
            }
        })
}

fn arb_rows() -> impl Strategy<Value = Vec<RevisionRow>> {
    prop::collection::vec(arb_revision(), 0..40)
}

/// Lengths for an arbitrary subset of the rows' parent ids, so both the
/// resolved and the dangling branch get exercised.
fn arb_fold_input() -> impl Strategy<Value = (Vec<RevisionRow>, HashMap<i64, Option<i64>>)> {
    (arb_rows(), prop::collection::hash_map(0_i64..20, prop::option::of(0_i64..5000), 0..20))
}

// ---------------------------------------------------------------------------
// Laws
// ---------------------------------------------------------------------------

proptest! {
    /// Total bytes per user equal the sum of absolute deltas over exactly
    /// the rows whose length and parent length both resolved.
    #[test]
    fn bytes_are_the_sum_over_surviving_rows((rows, lengths) in arb_fold_input()) {
        let folded = fold_revisions(&rows, &lengths);

        let mut expected: HashMap<String, u64> = HashMap::new();
        for row in &rows {
            let (Some(length), Some(parent)) = (row.length, resolved_parent_length(row, &lengths))
            else {
                continue;
            };
            *expected.entry(row.user.clone()).or_default() += (length - parent).unsigned_abs();
        }

        for (user, bytes) in &folded.bytes {
            prop_assert_eq!(Some(bytes), expected.get(user), "user {}", user);
        }
        prop_assert_eq!(folded.bytes.len(), expected.len());
    }

    /// Edit counts count exactly the surviving main-namespace rows.
    #[test]
    fn edit_counts_match_surviving_article_rows((rows, lengths) in arb_fold_input()) {
        let folded = fold_revisions(&rows, &lengths);

        let total: u64 = folded.edits.values().sum();
        let expected = rows
            .iter()
            .filter(|row| {
                row.namespace == ARTICLE_NAMESPACE
                    && row.length.is_some()
                    && resolved_parent_length(row, &lengths).is_some()
            })
            .count();
        prop_assert_eq!(total, u64::try_from(expected).expect("fits"));
    }

    /// Article lists never contain a title twice, and only titles the user
    /// actually touched in the main namespace.
    #[test]
    fn article_lists_are_deduped_and_sound((rows, lengths) in arb_fold_input()) {
        let folded = fold_revisions(&rows, &lengths);

        for (user, articles) in &folded.articles {
            let distinct: HashSet<&String> = articles.iter().collect();
            prop_assert_eq!(distinct.len(), articles.len(), "duplicates for {}", user);

            for title in articles {
                prop_assert!(
                    rows.iter().any(|row| {
                        &row.user == user
                            && &row.page_title == title
                            && row.namespace == ARTICLE_NAMESPACE
                    }),
                    "phantom title {} for {}",
                    title,
                    user
                );
            }
        }
    }

    /// A root revision (parent id 0) with a known length always survives
    /// and contributes its full length.
    #[test]
    fn root_revisions_with_length_always_survive(
        user in arb_user(),
        title in arb_title(),
        length in 0_i64..5000,
        rev_id in 1_i64..10_000,
    ) {
        let row = RevisionRow {
            user: user.clone(),
            page_title: title,
            length: Some(length),
            parent_id: 0,
            rev_id,
            namespace: ARTICLE_NAMESPACE,
        };
        let folded = fold_revisions(std::slice::from_ref(&row), &HashMap::new());

        prop_assert_eq!(folded.bytes.get(&user), Some(&length.unsigned_abs()));
        prop_assert_eq!(folded.edits.get(&user), Some(&1));
        prop_assert_eq!(folded.surviving_rows, 1);
    }

    /// The parent-id set sent to the second query is sorted, deduplicated,
    /// and never contains the root sentinel.
    #[test]
    fn parent_id_set_is_sorted_distinct_and_nonzero(rows in arb_rows()) {
        let ids = distinct_parent_ids(&rows);

        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(!ids.contains(&0));

        let wanted: HashSet<i64> = rows
            .iter()
            .filter(|row| row.parent_id != 0)
            .map(|row| row.parent_id)
            .collect();
        prop_assert_eq!(ids.into_iter().collect::<HashSet<i64>>(), wanted);
    }
}
