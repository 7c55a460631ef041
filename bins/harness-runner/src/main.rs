use anyhow::{anyhow, Context, Result};
use clap::Parser;
use harness_runner::config::RunnerConfig;
use harness_runner::{driver, loader};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "harness-runner")]
#[command(about = "Run a candidate entry point against a test-case manifest and print a JSON report", long_about = None)]
struct Cli {
    /// Runner config file (JSON); defaults to config/harness.json when present
    #[arg(long, env = "HARNESS_CONFIG")]
    config: Option<PathBuf>,

    /// Test-case manifest
    #[arg(short, long, env = "HARNESS_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Candidate program invoked once per test case
    #[arg(short, long, env = "HARNESS_PROGRAM")]
    program: Option<PathBuf>,

    /// Candidate source file that must exist for the candidate to load
    #[arg(long, env = "HARNESS_MODULE")]
    module: Option<PathBuf>,

    /// Command run once before the tests, e.g. "rustc main.rs -o student_code".
    /// Split with shell quoting rules.
    #[arg(long, env = "HARNESS_COMPILE")]
    compile: Option<String>,

    /// Name of the entry point the candidate must provide
    #[arg(long)]
    entry_point: Option<String>,

    /// Directory the candidate runs in
    #[arg(short = 'C', long, env = "HARNESS_WORKING_DIR")]
    working_dir: Option<PathBuf>,

    /// Per-test time limit in milliseconds
    #[arg(short, long, env = "HARNESS_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Maximum number of test cases run at once
    #[arg(short, long, env = "HARNESS_JOBS")]
    jobs: Option<usize>,

    /// Emit logs as JSON
    #[arg(long, default_value = "false")]
    log_json: bool,

    /// Arguments passed to the candidate program before the test inputs
    #[arg(last = true)]
    candidate_args: Vec<String>,
}

impl Cli {
    /// Apply command-line overrides on top of the config file
    fn into_config(self) -> Result<RunnerConfig> {
        let mut config = RunnerConfig::load_or_default(self.config.as_deref())?;

        if let Some(manifest) = self.manifest {
            config.manifest = manifest;
        }
        if let Some(program) = self.program {
            config.candidate.program = program;
        }
        if let Some(module) = self.module {
            config.candidate.module = Some(module);
        }
        if let Some(compile) = self.compile {
            config.candidate.compile = split_command(&compile)?;
        }
        if let Some(entry_point) = self.entry_point {
            config.entry_point = entry_point;
        }
        if let Some(dir) = self.working_dir {
            config.working_dir = Some(dir);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = Some(timeout_ms);
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if !self.candidate_args.is_empty() {
            config.candidate.args = self.candidate_args;
        }

        config.validate()?;
        Ok(config)
    }
}

fn split_command(command: &str) -> Result<Vec<String>> {
    shlex::split(command).ok_or_else(|| anyhow!("Unbalanced quoting in command: {}", command))
}

/// Logs go to stderr; stdout carries only the report
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_line_number(true)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = cli.into_config()?;
    info!(
        manifest = %config.manifest_path().display(),
        program = %config.candidate.program.display(),
        jobs = config.jobs,
        timeout_ms = ?config.timeout_ms,
        "Harness runner starting"
    );

    let loaded = loader::load_process_candidate(&config).await;
    if let Err(e) = &loaded {
        warn!(error = %e, "Candidate failed to load; every test case will be marked failed");
    }

    let report = driver::run(&loaded, &config.manifest_path(), config.jobs).await;

    let line = report.to_json_line().context("Failed to serialize report")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line).context("Failed to write report")?;
    stdout.flush().context("Failed to flush report")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command_keeps_quoted_arguments() {
        assert_eq!(
            split_command("sh -c 'cc main.c && strip a.out'").unwrap(),
            vec!["sh", "-c", "cc main.c && strip a.out"]
        );
        assert_eq!(
            split_command("rustc main.rs -o student_code").unwrap(),
            vec!["rustc", "main.rs", "-o", "student_code"]
        );
    }

    #[test]
    fn test_split_command_unbalanced_quote() {
        assert!(split_command("sh -c 'oops").is_err());
    }

    #[test]
    fn test_compile_flag_reaches_config() {
        let cli = Cli::try_parse_from([
            "harness-runner",
            "--compile",
            r#"sh -c "echo a b""#,
        ])
        .unwrap();
        let config = cli.into_config().unwrap();
        assert_eq!(config.candidate.compile, vec!["sh", "-c", "echo a b"]);
    }
}
