//! Report Driver - LOAD → {DEGRADED, NORMAL} → DONE
//!
//! The load outcome is computed once by the caller and handed in. With a
//! load error every test case gets a degraded result and nothing is invoked.
//! Otherwise each test case is executed and evaluated in manifest order.
//! Manifest problems never abort the run: they become a single synthetic
//! result and the report is still produced.

use crate::candidate::Candidate;
use crate::evaluator::{degraded_result, evaluate_test};
use crate::executor::execute_test;
use crate::loader::LoadError;
use futures_util::stream::{self, StreamExt};
use harness_common::manifest::{Manifest, ManifestError};
use harness_common::types::{Report, TestCase, TestResult};
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

fn manifest_name(manifest_path: &Path) -> String {
    manifest_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| manifest_path.display().to_string())
}

/// Run every test case and assemble the report
///
/// `jobs` bounds how many test cases run at once. It only applies to
/// candidates whose invocations are isolated processes; anything else runs
/// one test case at a time. Results are always in manifest order.
#[instrument(skip_all, fields(manifest = %manifest_path.display()))]
pub async fn run<C: Candidate>(
    loaded: &Result<C, LoadError>,
    manifest_path: &Path,
    jobs: usize,
) -> Report {
    let test_results = match loaded {
        Err(load_error) => {
            warn!(error = %load_error, "Candidate not loaded; running degraded");
            run_degraded(load_error, manifest_path)
        }
        Ok(candidate) => run_normal(candidate, manifest_path, jobs).await,
    };

    let compile_error = loaded.as_ref().err().map(|e| e.to_string());
    let report = Report::new(compile_error, test_results);

    info!(
        passed = report.passed_count(),
        total = report.test_results.len(),
        "Run complete"
    );
    report
}

/// Every test case fails with the load error; nothing is invoked
fn run_degraded(load_error: &LoadError, manifest_path: &Path) -> Vec<TestResult> {
    let message = load_error.to_string();

    let manifest = match Manifest::load(manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!(error = %e, "Failed to read manifest");
            return vec![TestResult::setup_failure(e)];
        }
    };

    let mut results = Vec::with_capacity(manifest.len());
    for item in manifest.test_cases() {
        match item {
            Ok(test_case) => results.push(degraded_result(&test_case, &message)),
            Err(e) => {
                error!(error = %e, "Invalid manifest entry");
                results.push(TestResult::setup_failure(e));
                break;
            }
        }
    }
    results
}

async fn run_normal<C: Candidate>(
    candidate: &C,
    manifest_path: &Path,
    jobs: usize,
) -> Vec<TestResult> {
    let name = manifest_name(manifest_path);

    let manifest = match Manifest::load(manifest_path) {
        Ok(manifest) => manifest,
        Err(ManifestError::NotFound(_)) => {
            error!("Manifest not found");
            return vec![TestResult::no_tests(&name)];
        }
        Err(ManifestError::Decode(e)) => {
            error!(error = %e, "Manifest is not valid JSON");
            return vec![TestResult::json_decode(&name, e)];
        }
        Err(e) => {
            error!(error = %e, "Failed to read manifest");
            return vec![TestResult::runtime_main(e)];
        }
    };

    let mut test_cases = Vec::with_capacity(manifest.len());
    let mut iteration_error = None;
    for item in manifest.test_cases() {
        match item {
            Ok(test_case) => test_cases.push(test_case),
            Err(e) => {
                iteration_error = Some(e);
                break;
            }
        }
    }

    info!(test_cases = test_cases.len(), "Executing test cases");
    let mut results = execute_all(candidate, &test_cases, jobs).await;

    if let Some(e) = iteration_error {
        error!(error = %e, "Invalid manifest entry; stopping");
        results.push(TestResult::runtime_main(e));
    }
    results
}

async fn execute_all<C: Candidate>(
    candidate: &C,
    test_cases: &[TestCase],
    jobs: usize,
) -> Vec<TestResult> {
    let concurrency = if candidate.is_isolated() { jobs.max(1) } else { 1 };

    stream::iter(test_cases)
        .map(|test_case| async move {
            let outcome = execute_test(candidate, test_case).await;
            let result = evaluate_test(test_case, outcome);
            debug!(
                test_id = %result.test_case_id,
                passed = result.passed,
                execution_time_ms = result.execution_time_ms,
                "Test result"
            );
            result
        })
        .buffered(concurrency)
        .collect()
        .await
}
