use crate::domain::{AzrResult, RunMode};
use crate::modules::workspace::Workspace;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything the solver needs for one run against one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolverInvocation {
    pub config_file: PathBuf,
    pub output_dir: PathBuf,
    pub mode: RunMode,
    /// Directory the document's relative data paths resolve against.
    pub working_dir: Option<PathBuf>,
    pub ext_par_file: Option<PathBuf>,
    pub ext_capture_file: Option<PathBuf>,
}

impl SolverInvocation {
    pub fn new(workspace: &Workspace, mode: RunMode) -> Self {
        Self {
            config_file: workspace.config_file().to_path_buf(),
            output_dir: workspace.output_dir().to_path_buf(),
            mode,
            working_dir: None,
            ext_par_file: None,
            ext_capture_file: None,
        }
    }

    pub fn with_working_dir(mut self, working_dir: Option<&Path>) -> Self {
        self.working_dir = working_dir.map(Path::to_path_buf);
        self
    }

    pub fn with_ext_par_file(mut self, path: Option<&Path>) -> Self {
        self.ext_par_file = path.map(Path::to_path_buf);
        self
    }

    pub fn with_ext_capture_file(mut self, path: Option<&Path>) -> Self {
        self.ext_capture_file = path.map(Path::to_path_buf);
        self
    }

    /// The console answers: run mode, parameter file, capture file. Unset
    /// files are sent as empty lines.
    pub fn stdin_script(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            self.mode.choice(),
            optional_path(self.ext_par_file.as_deref()),
            optional_path(self.ext_capture_file.as_deref())
        )
    }
}

fn optional_path(path: Option<&Path>) -> String {
    path.map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolverReport {
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    pub log_file: Option<PathBuf>,
}

pub trait Solver {
    fn run(&self, invocation: &SolverInvocation) -> AzrResult<SolverReport>;
}

impl<T> Solver for &T
where
    T: Solver + ?Sized,
{
    fn run(&self, invocation: &SolverInvocation) -> AzrResult<SolverReport> {
        (**self).run(invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::{Solver, SolverInvocation, SolverReport};
    use crate::domain::{AzrError, AzrErrorCategory, AzrResult, RunMode};
    use std::path::{Path, PathBuf};

    struct FailingSolver;

    impl Solver for FailingSolver {
        fn run(&self, _invocation: &SolverInvocation) -> AzrResult<SolverReport> {
            Err(AzrError::solver_invocation(
                "SOLVER.EXIT_STATUS",
                "solver exited with status 1",
            ))
        }
    }

    fn invocation(mode: RunMode) -> SolverInvocation {
        SolverInvocation {
            config_file: PathBuf::from("/tmp/azr-1.azr"),
            output_dir: PathBuf::from("/tmp/output_azr-1"),
            mode,
            working_dir: None,
            ext_par_file: None,
            ext_capture_file: None,
        }
    }

    #[test]
    fn solver_errors_use_shared_error_types() {
        let solver = FailingSolver;
        let by_reference: &dyn Solver = &solver;
        let error = (&by_reference)
            .run(&invocation(RunMode::CalculateWithData))
            .expect_err("solver should fail");
        assert_eq!(error.category(), AzrErrorCategory::SolverInvocation);
        assert_eq!(error.exit_code(), 4);
    }

    #[test]
    fn stdin_script_leaves_unset_files_blank() {
        assert_eq!(
            invocation(RunMode::CalculateWithData).stdin_script(),
            "1\n\n\n"
        );
        let with_capture = invocation(RunMode::CalculateWithoutData)
            .with_ext_capture_file(Some(Path::new("/tmp/output_azr-1/intEC.dat")));
        assert_eq!(
            with_capture.stdin_script(),
            "3\n\n/tmp/output_azr-1/intEC.dat\n"
        );
    }
}
