use super::traits::{Solver, SolverInvocation, SolverReport};
use crate::common::constants::SOLVER_LOG_FILE;
use crate::domain::{AzrError, AzrResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const LOG_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub command: String,
    pub use_brune: bool,
    pub use_gsl: bool,
    pub ext_par_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub extra_args: Vec<String>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            command: "AZURE2".to_string(),
            use_brune: true,
            use_gsl: true,
            ext_par_file: None,
            timeout_secs: None,
            extra_args: Vec::new(),
        }
    }
}

impl SolverOptions {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Runs the AZURE2 executable in console mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Azure2Command {
    options: SolverOptions,
}

impl Azure2Command {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn arguments(&self, config_file: &Path) -> Vec<String> {
        let mut args = vec![
            config_file.to_string_lossy().into_owned(),
            "--no-gui".to_string(),
            "--no-readline".to_string(),
        ];
        if self.options.use_brune {
            args.push("--use-brune".to_string());
        }
        if self.options.use_gsl {
            args.push("--gsl-coul".to_string());
        }
        args.extend(self.options.extra_args.iter().cloned());
        args
    }

    fn spawn(&self, invocation: &SolverInvocation, log_path: &Path) -> AzrResult<Child> {
        let log = File::create(log_path)
            .map_err(|source| AzrError::io_path("IO.SOLVER_LOG", "create solver log", log_path, source))?;
        let log_err = log
            .try_clone()
            .map_err(|source| AzrError::io_path("IO.SOLVER_LOG", "share solver log", log_path, source))?;

        let mut command = Command::new(&self.options.command);
        command
            .args(self.arguments(&invocation.config_file))
            .stdin(Stdio::piped())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));
        if let Some(working_dir) = &invocation.working_dir {
            command.current_dir(working_dir);
        }

        command.spawn().map_err(|source| {
            AzrError::solver_invocation(
                "SOLVER.SPAWN",
                format!(
                    "failed to execute solver command '{}': {}",
                    self.options.command, source
                ),
            )
        })
    }

    fn wait(&self, child: &mut Child) -> AzrResult<ExitStatus> {
        let wait_error = |source: std::io::Error| {
            AzrError::solver_invocation(
                "SOLVER.WAIT",
                format!("failed to wait for solver '{}': {}", self.options.command, source),
            )
        };

        let Some(timeout) = self.options.timeout() else {
            return child.wait().map_err(wait_error);
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(wait_error)? {
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AzrError::solver_invocation(
                    "SOLVER.TIMEOUT",
                    format!(
                        "solver '{}' did not finish within {} s and was killed",
                        self.options.command,
                        timeout.as_secs()
                    ),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Solver for Azure2Command {
    fn run(&self, invocation: &SolverInvocation) -> AzrResult<SolverReport> {
        let invocation = invocation
            .clone()
            .with_ext_par_file(
                invocation
                    .ext_par_file
                    .as_deref()
                    .or(self.options.ext_par_file.as_deref()),
            );
        let log_path = invocation.output_dir.join(SOLVER_LOG_FILE);

        info!(
            command = %self.options.command,
            mode = %invocation.mode,
            config_file = %invocation.config_file.display(),
            "starting solver"
        );
        let started = Instant::now();
        let mut child = self.spawn(&invocation, &log_path)?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(invocation.stdin_script().as_bytes()) {
                Ok(()) => {}
                // The solver may exit before reading its answers; its status decides.
                Err(source) if source.kind() == ErrorKind::BrokenPipe => {}
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(AzrError::solver_invocation(
                        "SOLVER.STDIN",
                        format!("failed to answer solver prompts: {}", source),
                    ));
                }
            }
        }

        let status = self.wait(&mut child)?;
        let elapsed = started.elapsed();
        info!(
            command = %self.options.command,
            status = %status,
            elapsed_ms = elapsed.as_millis() as u64,
            "solver finished"
        );

        if !status.success() {
            return Err(AzrError::solver_invocation(
                "SOLVER.EXIT_STATUS",
                format!(
                    "solver '{}' exited with {}; log tail:\n{}",
                    self.options.command,
                    status,
                    log_tail(&log_path, LOG_TAIL_LINES)
                ),
            ));
        }

        Ok(SolverReport {
            exit_code: status.code(),
            elapsed,
            log_file: Some(log_path),
        })
    }
}

fn log_tail(path: &Path, lines: usize) -> String {
    let Ok(contents) = fs::read_to_string(path) else {
        return String::from("<solver log unavailable>");
    };
    let all: Vec<&str> = contents.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::{Azure2Command, SolverOptions, log_tail};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn default_options_enable_both_engines() {
        let command = Azure2Command::default();
        assert_eq!(
            command.arguments(Path::new("/tmp/azr-1.azr")),
            vec![
                "/tmp/azr-1.azr",
                "--no-gui",
                "--no-readline",
                "--use-brune",
                "--gsl-coul"
            ]
        );
    }

    #[test]
    fn disabled_engines_and_extra_args_shape_the_command_line() {
        let command = Azure2Command::new(SolverOptions {
            use_brune: false,
            use_gsl: false,
            extra_args: vec!["--ignore-externals".to_string()],
            ..SolverOptions::default()
        });
        assert_eq!(
            command.arguments(Path::new("run.azr")),
            vec!["run.azr", "--no-gui", "--no-readline", "--ignore-externals"]
        );
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: SolverOptions =
            serde_json::from_str(r#"{"command":"/opt/azure2/bin/AZURE2","timeout_secs":30}"#)
                .expect("options json");
        assert_eq!(options.command, "/opt/azure2/bin/AZURE2");
        assert!(options.use_brune);
        assert_eq!(options.timeout(), Some(Duration::from_secs(30)));
        assert!(options.ext_par_file.is_none());
    }

    #[test]
    fn log_tail_keeps_only_the_last_lines() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("solver.log");
        fs::write(&path, "a\nb\nc\nd\n").expect("log should be written");
        assert_eq!(log_tail(&path, 2), "c\nd");
        assert_eq!(log_tail(&temp.path().join("absent.log"), 2), "<solver log unavailable>");
    }
}
