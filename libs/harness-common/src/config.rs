// Defaults shared by the runner and anything that prepares its inputs

/// Manifest file name looked up in the working directory
pub const DEFAULT_MANIFEST_FILE: &str = "test_data.json";

/// Name of the callable the candidate must provide
pub const DEFAULT_ENTRY_POINT: &str = "main_function";

/// Environment variable carrying the entry point name to process candidates
pub const ENTRY_POINT_ENV: &str = "HARNESS_ENTRY_POINT";

/// Environment variable carrying the full input array (JSON) to process candidates
pub const INPUT_ENV: &str = "HARNESS_INPUT";
