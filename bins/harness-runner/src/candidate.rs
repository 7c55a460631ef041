//! Candidates - the user-submitted entry point under test
//!
//! A candidate is anything that can be invoked with a test case's input
//! arguments and writes its console output into a [`Capture`]. Two kinds
//! exist:
//! - [`ProcessCandidate`]: an external program, one child process per
//!   invocation. Output is isolated by the child's own pipes.
//! - [`FnCandidate`]: a Rust function registered in a [`CandidateRegistry`],
//!   invoked in-process.

use crate::capture::Capture;
use harness_common::config::{ENTRY_POINT_ENV, INPUT_ENV};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

/// Error raised by the candidate during one invocation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct InvocationError {
    pub kind: String,
    pub message: String,
}

impl InvocationError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Something the executor can call with a test case's inputs
#[allow(async_fn_in_trait)]
pub trait Candidate {
    /// Whether invocations are isolated from each other and from the harness
    /// (separate processes), which makes running them concurrently safe.
    fn is_isolated(&self) -> bool;

    /// Invoke the entry point with `args` unpacked positionally
    async fn invoke(&self, args: &[Value], capture: &mut Capture) -> Result<(), InvocationError>;
}

/// External program acting as the candidate
#[derive(Debug, Clone)]
pub struct ProcessCandidate {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub entry_point: String,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

/// Render one input value as a command-line argument: strings are passed
/// through unchanged, everything else as compact JSON.
pub fn render_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Describe a non-zero exit the way a raised runtime error would read
fn describe_exit(status: std::process::ExitStatus) -> InvocationError {
    match status.code() {
        Some(137) => InvocationError::new("RuntimeError", "killed (out of memory or SIGKILL)"),
        Some(139) => InvocationError::new("RuntimeError", "segmentation fault"),
        Some(code) => InvocationError::new(
            "RuntimeError",
            format!("candidate exited with status {}", code),
        ),
        None => {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                if let Some(signal) = status.signal() {
                    return InvocationError::new(
                        "RuntimeError",
                        format!("candidate terminated by signal {}", signal),
                    );
                }
            }
            InvocationError::new("RuntimeError", "candidate terminated abnormally")
        }
    }
}

/// Read a child pipe to EOF. Bytes land in `buf` as they arrive, so a
/// cancelled read still leaves everything received so far.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) -> io::Result<()> {
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

impl Candidate for ProcessCandidate {
    fn is_isolated(&self) -> bool {
        true
    }

    async fn invoke(&self, args: &[Value], capture: &mut Capture) -> Result<(), InvocationError> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .args(args.iter().map(render_arg))
            .env(ENTRY_POINT_ENV, &self.entry_point)
            .env(INPUT_ENV, Value::Array(args.to_vec()).to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            InvocationError::new("OSError", format!("failed to start candidate: {}", e))
        })?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let run = async {
            let (status, out, err) = tokio::join!(
                child.wait(),
                drain(stdout_pipe, &mut stdout_buf),
                drain(stderr_pipe, &mut stderr_buf),
            );
            out.and(err).and(status)
        };
        let finished = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.ok(),
            None => Some(run.await),
        };

        // Writes into in-memory buffers cannot fail
        let _ = capture.stdout().write_all(&stdout_buf);
        let _ = capture.stderr().write_all(&stderr_buf);

        let Some(status) = finished else {
            let _ = child.kill().await;
            let limit = self.timeout.unwrap_or_default();
            warn!(timeout_ms = limit.as_millis() as u64, "Candidate timed out; killed");
            return Err(InvocationError::new(
                "TimeoutError",
                format!("execution exceeded {}ms", limit.as_millis()),
            ));
        };
        let status = status.map_err(|e| {
            InvocationError::new("OSError", format!("failed to collect candidate output: {}", e))
        })?;

        debug!(status = ?status, "Candidate process exited");
        if status.success() {
            Ok(())
        } else {
            Err(describe_exit(status))
        }
    }
}

/// Signature of an in-process candidate function
pub type CandidateFn =
    dyn Fn(&[Value], &mut Capture) -> Result<(), InvocationError> + Send + Sync;

/// Registered Rust function acting as the candidate
#[derive(Clone)]
pub struct FnCandidate {
    name: String,
    func: Arc<CandidateFn>,
}

impl FnCandidate {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for FnCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCandidate").field("name", &self.name).finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "candidate panicked".to_string()
    }
}

impl Candidate for FnCandidate {
    fn is_isolated(&self) -> bool {
        false
    }

    async fn invoke(&self, args: &[Value], capture: &mut Capture) -> Result<(), InvocationError> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.func)(args, capture))) {
            Ok(result) => result,
            Err(payload) => Err(InvocationError::new("Panic", panic_message(payload.as_ref()))),
        }
    }
}

/// Named in-process entry points, looked up once by the loader
#[derive(Default, Clone)]
pub struct CandidateRegistry {
    functions: HashMap<String, Arc<CandidateFn>>,
}

impl CandidateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&[Value], &mut Capture) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(func));
        self
    }

    pub fn get(&self, name: &str) -> Option<FnCandidate> {
        self.functions.get(name).map(|func| FnCandidate {
            name: name.to_string(),
            func: Arc::clone(func),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_arg() {
        assert_eq!(render_arg(&json!("hello world")), "hello world");
        assert_eq!(render_arg(&json!(42)), "42");
        assert_eq!(render_arg(&json!([1, 2])), "[1,2]");
        assert_eq!(render_arg(&json!({"a": true})), r#"{"a":true}"#);
        assert_eq!(render_arg(&Value::Null), "null");
    }

    #[test]
    fn test_invocation_error_display() {
        let err = InvocationError::new("ValueError", "bad input");
        assert_eq!(err.to_string(), "ValueError: bad input");
    }

    #[tokio::test]
    async fn test_fn_candidate_writes_into_capture() {
        let mut registry = CandidateRegistry::new();
        registry.register("main_function", |args, capture| {
            let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
            writeln!(capture.stdout(), "{}", sum).unwrap();
            Ok(())
        });

        let candidate = registry.get("main_function").unwrap();
        assert!(!candidate.is_isolated());
        let mut capture = Capture::new();
        candidate.invoke(&[json!(2), json!(3)], &mut capture).await.unwrap();
        assert_eq!(capture.finish().stdout, "5\n");
    }

    #[tokio::test]
    async fn test_fn_candidate_panic_becomes_error() {
        let mut registry = CandidateRegistry::new();
        registry.register("main_function", |_, _| panic!("index out of range"));

        let candidate = registry.get("main_function").unwrap();
        let err = candidate.invoke(&[], &mut Capture::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Panic: index out of range");
    }

    #[test]
    fn test_registry_lookup_missing() {
        let registry = CandidateRegistry::new();
        assert!(registry.get("main_function").is_none());
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn sh(script: &str) -> ProcessCandidate {
            ProcessCandidate {
                program: PathBuf::from("/bin/sh"),
                args: vec!["-c".to_string(), script.to_string(), "candidate".to_string()],
                entry_point: "main_function".to_string(),
                working_dir: None,
                timeout: None,
            }
        }

        #[tokio::test]
        async fn test_positional_args() {
            let candidate = sh(r#"echo "$1|$2|$#""#);
            let mut capture = Capture::new();
            candidate
                .invoke(&[json!("a b"), json!([1, 2])], &mut capture)
                .await
                .unwrap();
            assert_eq!(capture.finish().stdout, "a b|[1,2]|2\n");
        }

        #[tokio::test]
        async fn test_environment() {
            let candidate = sh(r#"echo "$HARNESS_ENTRY_POINT"; echo "$HARNESS_INPUT""#);
            let mut capture = Capture::new();
            candidate.invoke(&[json!(1), json!("x")], &mut capture).await.unwrap();
            assert_eq!(capture.finish().stdout, "main_function\n[1,\"x\"]\n");
        }

        #[tokio::test]
        async fn test_non_zero_exit_keeps_output() {
            let candidate = sh("echo partial; echo oops >&2; exit 3");
            let mut capture = Capture::new();
            let err = candidate.invoke(&[], &mut capture).await.unwrap_err();
            assert_eq!(err.to_string(), "RuntimeError: candidate exited with status 3");

            let streams = capture.finish();
            assert_eq!(streams.stdout, "partial\n");
            assert_eq!(streams.stderr, "oops\n");
        }

        #[tokio::test]
        async fn test_segfault_exit_code() {
            let err = sh("exit 139").invoke(&[], &mut Capture::new()).await.unwrap_err();
            assert_eq!(err.message, "segmentation fault");
        }

        #[tokio::test]
        async fn test_timeout_kills_candidate() {
            let mut candidate = sh("sleep 5");
            candidate.timeout = Some(Duration::from_millis(100));
            let started = std::time::Instant::now();
            let err = candidate.invoke(&[], &mut Capture::new()).await.unwrap_err();
            assert_eq!(err.kind, "TimeoutError");
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[tokio::test]
        async fn test_timeout_keeps_output_printed_before_kill() {
            let mut candidate = sh("echo before; echo warming >&2; sleep 5; echo after");
            candidate.timeout = Some(Duration::from_millis(500));
            let mut capture = Capture::new();
            let err = candidate.invoke(&[], &mut capture).await.unwrap_err();
            assert_eq!(err.to_string(), "TimeoutError: execution exceeded 500ms");

            let streams = capture.finish();
            assert_eq!(streams.stdout, "before\n");
            assert_eq!(streams.stderr, "warming\n");
        }

        #[tokio::test]
        async fn test_spawn_failure() {
            let candidate = ProcessCandidate {
                program: PathBuf::from("/nonexistent/candidate"),
                args: Vec::new(),
                entry_point: "main_function".to_string(),
                working_dir: None,
                timeout: None,
            };
            let err = candidate.invoke(&[], &mut Capture::new()).await.unwrap_err();
            assert_eq!(err.kind, "OSError");
        }
    }
}
