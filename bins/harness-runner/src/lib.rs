//! Test-case execution harness: load a candidate once, run it against every
//! test case in a manifest, compare console output and build the report.

pub mod candidate;
pub mod capture;
pub mod config;
pub mod driver;
pub mod evaluator;
pub mod executor;
pub mod loader;
