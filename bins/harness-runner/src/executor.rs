//! Test Executor - one test case, one invocation
//!
//! **Responsibility:**
//! Invoke the candidate with a test case's inputs and turn everything that
//! happened into an `ExecutionOutcome`.
//!
//! **Guarantees:**
//! - A fresh `Capture` per invocation; nothing carries over between tests
//! - Elapsed time is measured whether the invocation succeeds or fails
//! - Candidate errors are returned as data, never propagated
//!
//! This module knows nothing about expected output or pass/fail.

use crate::candidate::Candidate;
use crate::capture::Capture;
use harness_common::types::TestCase;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// What one invocation produced
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOutcome {
    pub actual_output: Vec<String>,
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

/// Fold captured stderr into the error description
fn merge_stderr(error: Option<String>, stderr: Option<&str>) -> Option<String> {
    match (error, stderr) {
        (Some(error), Some(stderr)) => Some(format!("{}\nSTDERR: {}", error, stderr)),
        (None, Some(stderr)) => Some(format!("STDERR: {}", stderr)),
        (error, None) => error,
    }
}

#[instrument(skip(candidate, test_case), fields(test_id = %test_case.id))]
pub async fn execute_test<C: Candidate>(candidate: &C, test_case: &TestCase) -> ExecutionOutcome {
    let mut capture = Capture::new();

    let start = Instant::now();
    let result = candidate.invoke(&test_case.input, &mut capture).await;
    let execution_time_ms = (start.elapsed().as_secs_f64() * 1000.0).round() as u64;

    let streams = capture.finish();
    let error = result.err().map(|e| e.to_string());
    if let Some(error) = &error {
        warn!(error = %error, execution_time_ms, "Candidate raised an error");
    }

    let outcome = ExecutionOutcome {
        actual_output: streams.stdout_lines(),
        error: merge_stderr(error, streams.stderr_text()),
        execution_time_ms,
    };

    debug!(
        lines = outcome.actual_output.len(),
        execution_time_ms,
        "Test case executed"
    );
    outcome
}
