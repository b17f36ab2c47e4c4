//! Subcommand handlers.

pub mod report;
