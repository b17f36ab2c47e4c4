//! tally-core library.
//!
//! Computes aggregate contribution metrics for a fixed cohort of user
//! identities across a set of wiki projects over a bounded time window:
//! active-editor flags, newly-registered flags, absolute bytes contributed,
//! edited-article lists, main-namespace edit counts, and media uploads on
//! the shared media project.
//!
//! The pipeline is two-stage: a [`source::ReplicaSource`] fetches raw rows
//! from per-project replica databases, and [`metrics::GlobalMetrics`] folds
//! them into per-project, per-user tables that are total over
//! `projects × cohort` (every cohort member appears in every metric, even
//! with zero activity).

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod replica;
pub mod row;
pub mod source;
pub mod tables;
pub mod window;
