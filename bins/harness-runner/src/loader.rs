//! Candidate Loader
//!
//! Runs exactly once at start. The outcome is an explicit
//! `Result<_, LoadError>` that the driver passes along; a load error turns
//! the whole run into the degraded path.

use crate::candidate::{CandidateRegistry, FnCandidate, ProcessCandidate};
use crate::config::{CandidateConfig, RunnerConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why the candidate could not be loaded. Rendered as `"<ErrorKind>: <message>"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("ModuleNotFoundError: {0}")]
    ModuleNotFound(String),

    #[error("PermissionError: {0}")]
    NotExecutable(String),

    #[error("ImportError: {0}")]
    MissingEntryPoint(String),

    #[error("CompileError: {0}")]
    Compile(String),
}

/// Look up `program` the way a shell would: paths are taken relative to
/// `working_dir`, bare names are searched for in `PATH`.
///
/// The result is absolute, since the child is spawned inside `working_dir`.
fn resolve_program(program: &Path, working_dir: Option<&Path>) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        let candidate = match working_dir {
            Some(dir) if program.is_relative() => dir.join(program),
            _ => program.to_path_buf(),
        };
        if !candidate.is_file() {
            return None;
        }
        return std::path::absolute(&candidate).ok();
    }

    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|path| path.is_file())
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

fn module_name(module: &Path) -> String {
    module
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| module.display().to_string())
}

/// Run the configured compile command once. Any failure becomes a `CompileError`
/// carrying the compiler's diagnostics.
async fn compile(command: &[String], working_dir: Option<&Path>) -> Result<(), LoadError> {
    let Some((program, args)) = command.split_first() else {
        return Ok(());
    };

    info!(program = %program, "Compiling candidate");
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .await
        .map_err(|e| LoadError::Compile(format!("failed to run compiler '{}': {}", program, e)))?;

    if output.status.success() {
        debug!("Compilation succeeded");
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let diagnostics = if stderr.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.trim().to_string()
    };
    let message = if diagnostics.is_empty() {
        format!("compiler exited with {}", output.status)
    } else {
        diagnostics
    };
    warn!(error_preview = message.lines().next().unwrap_or(""), "Compilation failed");
    Err(LoadError::Compile(message))
}

/// Resolve an external program as the candidate
pub async fn load_process_candidate(config: &RunnerConfig) -> Result<ProcessCandidate, LoadError> {
    let CandidateConfig {
        program,
        args,
        module,
        compile: compile_command,
    } = &config.candidate;
    let working_dir = config.working_dir.as_deref();

    if let Some(module) = module {
        let module_path = match working_dir {
            Some(dir) if module.is_relative() => dir.join(module),
            _ => module.clone(),
        };
        if !module_path.is_file() {
            return Err(LoadError::ModuleNotFound(format!(
                "No module named '{}'",
                module_name(module)
            )));
        }
    }

    compile(compile_command, working_dir).await?;

    let resolved = resolve_program(program, working_dir).ok_or_else(|| {
        LoadError::ModuleNotFound(format!("candidate program '{}' not found", program.display()))
    })?;
    if !is_executable(&resolved) {
        return Err(LoadError::NotExecutable(format!(
            "candidate program '{}' is not executable",
            resolved.display()
        )));
    }

    info!(program = %resolved.display(), entry_point = %config.entry_point, "Candidate loaded");
    Ok(ProcessCandidate {
        program: resolved,
        args: args.clone(),
        entry_point: config.entry_point.clone(),
        working_dir: config.working_dir.clone(),
        timeout: config.timeout(),
    })
}

/// Resolve a registered in-process function as the candidate
pub fn load_registered(registry: &CandidateRegistry, entry_point: &str) -> Result<FnCandidate, LoadError> {
    registry.get(entry_point).ok_or_else(|| {
        LoadError::MissingEntryPoint(format!(
            "cannot import name '{}' from candidate registry",
            entry_point
        ))
    })
}
