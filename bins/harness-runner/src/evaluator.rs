//! Test Evaluator - comparison and result building
//!
//! **Core Responsibility:**
//! Decide pass/fail from an `ExecutionOutcome` and build the `TestResult`
//! that goes into the report.
//!
//! **Critical Properties:**
//! - Knows nothing about how the candidate was run
//! - Pure functions: (test case, outcome) → result
//!
//! **Comparison Rules:**
//! - Line-oriented: actual and expected must have the same number of lines
//! - Each line is trimmed on both sides before comparing
//! - Internal whitespace and case are significant
//! - Any recorded error fails the test, whatever the output

use crate::executor::ExecutionOutcome;
use harness_common::types::{TestCase, TestResult};

/// Compare actual output lines with expected lines
///
/// Passes when both are empty, or when they have equal length and every
/// pair of lines matches after trimming.
pub fn outputs_match(actual: &[String], expected: &[String]) -> bool {
    if actual.is_empty() && expected.is_empty() {
        return true;
    }
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(a, e)| a.trim() == e.trim())
}

/// Final verdict for one test case
pub fn is_passed(outcome: &ExecutionOutcome, expected: &[String]) -> bool {
    outcome.error.is_none() && outputs_match(&outcome.actual_output, expected)
}

/// Empty sequences are reported as absent
fn non_empty(lines: &[String]) -> Option<Vec<String>> {
    (!lines.is_empty()).then(|| lines.to_vec())
}

/// Build the result for a test case that was actually executed
pub fn evaluate_test(test_case: &TestCase, outcome: ExecutionOutcome) -> TestResult {
    let passed = is_passed(&outcome, &test_case.expected_output);

    TestResult {
        test_case_id: test_case.id.clone(),
        test_case_name: test_case.name.clone(),
        passed,
        actual_output: non_empty(&outcome.actual_output),
        expected_output: non_empty(&test_case.expected_output),
        error_message: outcome.error,
        execution_time_ms: outcome.execution_time_ms,
    }
}

/// Build the result for a test case that was never executed because the
/// candidate failed to load
pub fn degraded_result(test_case: &TestCase, load_error: &str) -> TestResult {
    TestResult {
        test_case_id: test_case.id.clone(),
        test_case_name: test_case.name.clone(),
        passed: false,
        actual_output: None,
        expected_output: Some(test_case.expected_output.clone()),
        error_message: Some(load_error.to_string()),
        execution_time_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn make_test_case(expected: &[&str]) -> TestCase {
        TestCase {
            id: "tc".to_string(),
            name: "case".to_string(),
            input: Vec::new(),
            expected_output: lines(expected),
        }
    }

    fn make_outcome(actual: &[&str], error: Option<&str>) -> ExecutionOutcome {
        ExecutionOutcome {
            actual_output: lines(actual),
            error: error.map(str::to_string),
            execution_time_ms: 7,
        }
    }

    #[test]
    fn test_outputs_match_exact() {
        assert!(outputs_match(&lines(&["120"]), &lines(&["120"])));
        assert!(outputs_match(&lines(&["a", "b"]), &lines(&["a", "b"])));
    }

    #[test]
    fn test_outputs_match_trims_each_line() {
        assert!(outputs_match(&lines(&["  hello  ", "world\t"]), &lines(&["hello", " world"])));
    }

    #[test]
    fn test_outputs_match_both_empty() {
        assert!(outputs_match(&[], &[]));
    }

    #[test]
    fn test_outputs_length_mismatch() {
        assert!(!outputs_match(&lines(&["5", "6"]), &lines(&["5"])));
        assert!(!outputs_match(&[], &lines(&["5"])));
        assert!(!outputs_match(&lines(&["5"]), &[]));
    }

    #[test]
    fn test_outputs_case_and_inner_whitespace_significant() {
        assert!(!outputs_match(&lines(&["Hello"]), &lines(&["hello"])));
        assert!(!outputs_match(&lines(&["a  b"]), &lines(&["a b"])));
    }

    #[test]
    fn test_evaluate_test_pass() {
        let result = evaluate_test(&make_test_case(&["5"]), make_outcome(&["5"], None));
        assert!(result.passed);
        assert_eq!(result.actual_output, Some(lines(&["5"])));
        assert_eq!(result.expected_output, Some(lines(&["5"])));
        assert_eq!(result.error_message, None);
        assert_eq!(result.execution_time_ms, 7);
        assert_eq!(result.test_case_id, "tc");
    }

    #[test]
    fn test_evaluate_test_error_forces_failure() {
        let result = evaluate_test(
            &make_test_case(&["5"]),
            make_outcome(&["5"], Some("ValueError: bad input")),
        );
        assert!(!result.passed);
        assert_eq!(result.error_message.as_deref(), Some("ValueError: bad input"));
    }

    #[test]
    fn test_evaluate_test_extra_line_fails() {
        let result = evaluate_test(&make_test_case(&["5"]), make_outcome(&["5", "6"], None));
        assert!(!result.passed);
    }

    #[test]
    fn test_evaluate_test_empty_sequences_are_null() {
        let result = evaluate_test(&make_test_case(&[]), make_outcome(&[], None));
        assert!(result.passed);
        assert_eq!(result.actual_output, None);
        assert_eq!(result.expected_output, None);
    }

    #[test]
    fn test_degraded_result() {
        let result = degraded_result(&make_test_case(&["5"]), "ImportError: nope");
        assert!(!result.passed);
        assert_eq!(result.actual_output, None);
        assert_eq!(result.expected_output, Some(lines(&["5"])));
        assert_eq!(result.error_message.as_deref(), Some("ImportError: nope"));
        assert_eq!(result.execution_time_ms, 0);
    }

    #[test]
    fn test_degraded_result_keeps_empty_expected() {
        let result = degraded_result(&make_test_case(&[]), "ImportError: nope");
        assert_eq!(result.expected_output, Some(Vec::new()));
    }
}
