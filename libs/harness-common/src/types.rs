use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the test-case manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub input: Vec<Value>,
    #[serde(default)]
    pub expected_output: Vec<String>,
}

/// Graded result for a single test case, as it appears in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_case_id: String,
    pub test_case_name: String,
    pub passed: bool,
    pub actual_output: Option<Vec<String>>,
    pub expected_output: Option<Vec<String>>,
    pub error_message: Option<String>,
    pub execution_time_ms: u64,
}

/// Ids of the results emitted when the manifest itself cannot be used
pub const SETUP_FAILURE_ID: &str = "setup_failure";
pub const NO_TESTS_ID: &str = "error_no_tests";
pub const JSON_DECODE_ID: &str = "error_json_decode";
pub const RUNTIME_MAIN_ID: &str = "error_runtime_main";

impl TestResult {
    /// A result that stands in for the whole manifest rather than one test case
    pub fn synthetic(id: &str, name: &str, error_message: impl Into<String>) -> Self {
        Self {
            test_case_id: id.to_string(),
            test_case_name: name.to_string(),
            passed: false,
            actual_output: None,
            expected_output: None,
            error_message: Some(error_message.into()),
            execution_time_ms: 0,
        }
    }

    pub fn setup_failure(detail: impl std::fmt::Display) -> Self {
        Self::synthetic(
            SETUP_FAILURE_ID,
            "Setup Failure",
            format!("Critical error reading tests during import fail: {}", detail),
        )
    }

    pub fn no_tests(manifest_name: &str) -> Self {
        Self::synthetic(NO_TESTS_ID, "Test Data Error", format!("{} not found.", manifest_name))
    }

    pub fn json_decode(manifest_name: &str, detail: impl std::fmt::Display) -> Self {
        Self::synthetic(
            JSON_DECODE_ID,
            "Test Data Error",
            format!("Error decoding {}: {}", manifest_name, detail),
        )
    }

    pub fn runtime_main(detail: impl std::fmt::Display) -> Self {
        Self::synthetic(
            RUNTIME_MAIN_ID,
            "Main Runner Error",
            format!("Unexpected error in main runner: {}", detail),
        )
    }
}

/// Top-level document written to stdout once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub compile_error: Option<String>,
    /// Reserved; always empty
    pub stdout_keseluruhan: String,
    /// Reserved; always empty
    pub stderr_keseluruhan: String,
    pub test_results: Vec<TestResult>,
}

impl Report {
    pub fn new(compile_error: Option<String>, test_results: Vec<TestResult>) -> Self {
        Self {
            compile_error,
            stdout_keseluruhan: String::new(),
            stderr_keseluruhan: String::new(),
            test_results,
        }
    }

    pub fn passed_count(&self) -> usize {
        self.test_results.iter().filter(|r| r.passed).count()
    }

    /// Serialize to the single line the runner prints
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
