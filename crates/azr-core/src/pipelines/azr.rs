use super::config::{Config, PreparedRun};
use crate::common::constants::CAPTURE_INTEGRALS_FILE;
use crate::domain::{AzrError, AzrResult, Operation};
use crate::modules::output::{
    ExtrapolationOutput, NumericTable, Output, OutputFile, ReducedWidthAmplitude,
    read_reduced_width_amplitudes,
};
use crate::modules::parameters::Parameter;
use crate::modules::solver::{Azure2Command, Solver, SolverInvocation, SolverOptions};
use crate::modules::workspace::{Workspace, WorkspaceAllocator, WorkspaceOptions};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info_span, warn};

/// Which capture integrals the solver should use for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureIntegrals {
    Compute,
    Stored,
}

/// Runs solver evaluations for a loaded configuration.
///
/// Every evaluation gets its own workspace, which is removed before the call
/// returns whether the run succeeded or not. Evaluations take `&self` and may
/// run concurrently; `update_ext_capture_integrals` needs `&mut self`.
#[derive(Debug)]
pub struct Azr<S = Azure2Command> {
    config: Config,
    solver: S,
    workspaces: WorkspaceAllocator,
    output_files: Vec<String>,
    extrap_files: Option<Vec<String>>,
    capture_integrals: Option<String>,
}

impl Azr<Azure2Command> {
    /// Loads `path` and drives the AZURE2 executable described by `solver`.
    pub fn load(
        path: &Path,
        parameters: Option<Vec<Parameter>>,
        solver: SolverOptions,
        workspace: &WorkspaceOptions,
    ) -> AzrResult<Self> {
        let config = Config::load(path, parameters)?;
        Ok(Self::new(
            config,
            Azure2Command::new(solver),
            WorkspaceAllocator::from_options(workspace),
        ))
    }
}

impl<S: Solver> Azr<S> {
    pub fn new(config: Config, solver: S, workspaces: WorkspaceAllocator) -> Self {
        let output_files = config.data().output_files();
        Self {
            config,
            solver,
            workspaces,
            output_files,
            extrap_files: None,
            capture_integrals: None,
        }
    }

    /// Replaces the output files read by `predict`.
    pub fn with_output_files(mut self, output_files: Vec<String>) -> Self {
        self.output_files = output_files;
        self
    }

    /// Output files read by `extrapolate` when no segment selection is given.
    pub fn with_extrap_files(mut self, extrap_files: Vec<String>) -> Self {
        self.extrap_files = Some(extrap_files);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn workspaces(&self) -> &WorkspaceAllocator {
        &self.workspaces
    }

    pub fn output_files(&self) -> &[String] {
        &self.output_files
    }

    pub fn capture_integrals(&self) -> Option<&str> {
        self.capture_integrals.as_deref()
    }

    pub fn predict(&self, theta: &[f64]) -> AzrResult<Vec<Output>> {
        let _span = info_span!("predict").entered();
        self.evaluate_data(Operation::Predict, theta, |workspace, files| {
            read_outputs(workspace, files)
        })
    }

    /// `predict` without column names.
    pub fn predict_tables(&self, theta: &[f64]) -> AzrResult<Vec<NumericTable>> {
        let _span = info_span!("predict").entered();
        self.evaluate_data(Operation::Predict, theta, |workspace, files| {
            read_outputs(workspace, files)
        })
    }

    /// `predict` plus the reduced width amplitudes of the same run.
    pub fn predict_with_rwas(
        &self,
        theta: &[f64],
    ) -> AzrResult<(Vec<Output>, Vec<ReducedWidthAmplitude>)> {
        let _span = info_span!("predict").entered();
        self.evaluate_data(Operation::Predict, theta, |workspace, files| {
            let outputs = read_outputs(workspace, files)?;
            let rwas = read_reduced_width_amplitudes(workspace.output_dir())?;
            Ok((outputs, rwas))
        })
    }

    pub fn extrapolate(
        &self,
        theta: &[f64],
        segment_indices: Option<&BTreeSet<usize>>,
    ) -> AzrResult<Vec<ExtrapolationOutput>> {
        let _span = info_span!("extrapolate").entered();
        self.evaluate_extrapolation(theta, segment_indices)
    }

    pub fn extrapolate_tables(
        &self,
        theta: &[f64],
        segment_indices: Option<&BTreeSet<usize>>,
    ) -> AzrResult<Vec<NumericTable>> {
        let _span = info_span!("extrapolate").entered();
        self.evaluate_extrapolation(theta, segment_indices)
    }

    pub fn rwas(&self, theta: &[f64]) -> AzrResult<Vec<ReducedWidthAmplitude>> {
        let _span = info_span!("rwas").entered();
        self.evaluate_data(Operation::Rwas, theta, |workspace, _| {
            read_reduced_width_amplitudes(workspace.output_dir())
        })
    }

    /// Lets the solver compute the external capture integrals at the
    /// document's own values and returns the integrals file.
    pub fn ext_capture_integrals(&self) -> AzrResult<String> {
        self.compute_capture_integrals(&self.config)
    }

    /// Shifts the energies of data segments `indices[k]` by `shifts[k]`,
    /// recomputes the capture integrals on the shifted data and keeps them
    /// for every later evaluation. On failure the shifts and the stored
    /// integrals are left as they were.
    pub fn update_ext_capture_integrals(
        &mut self,
        indices: &[usize],
        shifts: &[f64],
    ) -> AzrResult<()> {
        if indices.len() != shifts.len() {
            return Err(AzrError::shape_mismatch(
                "SHAPE.ENERGY_SHIFTS",
                format!(
                    "{} segment index(es) but {} shift(s)",
                    indices.len(),
                    shifts.len()
                ),
            ));
        }
        let segment_count = self.config.data().len();
        if let Some(&index) = indices.iter().find(|&&index| index >= segment_count) {
            return Err(AzrError::address_out_of_bounds(
                "ADDRESS.SEGMENT_INDEX",
                format!(
                    "segment index {} is out of range for {} segment(s)",
                    index, segment_count
                ),
            ));
        }

        let mut shifted = self.config.clone();
        for (&index, &shift) in indices.iter().zip(shifts) {
            shifted.data_mut().shift_energies(index, shift)?;
        }
        let integrals = self.compute_capture_integrals(&shifted)?;
        self.config = shifted;
        self.capture_integrals = Some(integrals);
        Ok(())
    }

    fn compute_capture_integrals(&self, config: &Config) -> AzrResult<String> {
        let _span = info_span!("capture_integrals").entered();
        let theta = config.input_values();
        self.evaluate(
            Operation::CaptureIntegrals,
            &theta,
            CaptureIntegrals::Compute,
            |workspace| config.prepare_data_run(workspace, &theta),
            |workspace, _| {
                let path = workspace.output_path(CAPTURE_INTEGRALS_FILE);
                fs::read_to_string(&path).map_err(|source| {
                    AzrError::solver_invocation(
                        "SOLVER.MISSING_OUTPUT",
                        format!(
                            "solver produced no capture integrals '{}': {}",
                            path.display(),
                            source
                        ),
                    )
                })
            },
        )
    }

    fn evaluate_data<T>(
        &self,
        operation: Operation,
        theta: &[f64],
        read: impl FnOnce(&Workspace, &[String]) -> AzrResult<T>,
    ) -> AzrResult<T> {
        self.evaluate(
            operation,
            theta,
            CaptureIntegrals::Stored,
            |workspace| {
                let mut prepared = self.config.prepare_data_run(workspace, theta)?;
                prepared.output_files = self.output_files.clone();
                Ok(prepared)
            },
            read,
        )
    }

    fn evaluate_extrapolation<T: OutputFile>(
        &self,
        theta: &[f64],
        segment_indices: Option<&BTreeSet<usize>>,
    ) -> AzrResult<Vec<T>> {
        // Validate before a workspace exists.
        let prepared = self.config.prepare_extrapolation_run(theta, segment_indices)?;
        let files = match (&self.extrap_files, segment_indices) {
            (Some(files), None) => files.clone(),
            _ => prepared.output_files.clone(),
        };
        if files.is_empty() {
            return Err(AzrError::document_format(
                "DOCUMENT.NO_TEST_SEGMENTS",
                "no extrapolation segment is included, so there is nothing to read",
            ));
        }

        let prepared = PreparedRun {
            output_files: files,
            ..prepared
        };
        self.evaluate(
            Operation::Extrapolate,
            theta,
            CaptureIntegrals::Stored,
            move |_| Ok(prepared),
            read_outputs::<T>,
        )
    }

    /// Allocate, materialize, run, read, release. The workspace is released
    /// on every path; failures carry theta and the workspace paths.
    fn evaluate<T>(
        &self,
        operation: Operation,
        theta: &[f64],
        capture: CaptureIntegrals,
        prepare: impl FnOnce(&Workspace) -> AzrResult<PreparedRun>,
        read: impl FnOnce(&Workspace, &[String]) -> AzrResult<T>,
    ) -> AzrResult<T> {
        let workspace = self
            .workspaces
            .allocate()
            .map_err(|error| error.with_context(format!("theta = {:?}", theta)))?;
        let context = workspace.describe();

        let result = self.run_in(&workspace, operation, capture, prepare, read);
        let release = workspace.release();

        let error = match (result, release) {
            (Ok(value), Ok(())) => return Ok(value),
            (Ok(_), Err(release_error)) => release_error,
            (Err(error), release) => {
                if let Err(release_error) = release {
                    warn!(error = %release_error, "workspace cleanup failed after evaluation error");
                }
                error
            }
        };
        Err(error.with_context(format!("theta = {:?}; {}", theta, context)))
    }

    fn run_in<T>(
        &self,
        workspace: &Workspace,
        operation: Operation,
        capture: CaptureIntegrals,
        prepare: impl FnOnce(&Workspace) -> AzrResult<PreparedRun>,
        read: impl FnOnce(&Workspace, &[String]) -> AzrResult<T>,
    ) -> AzrResult<T> {
        let prepared = prepare(workspace)?;
        workspace.materialize(&prepared.document, &prepared.levels)?;

        let capture_file = match (capture, &self.capture_integrals) {
            (CaptureIntegrals::Stored, Some(integrals)) => {
                Some(self.write_capture_integrals(workspace, integrals)?)
            }
            _ => None,
        };

        let invocation = SolverInvocation::new(workspace, operation.run_mode())
            .with_working_dir(Some(self.config.base_dir()))
            .with_ext_capture_file(capture_file.as_deref());
        let report = self.solver.run(&invocation)?;
        debug!(
            operation = operation.as_str(),
            exit_code = ?report.exit_code,
            "solver run completed"
        );

        read(workspace, &prepared.output_files)
    }

    fn write_capture_integrals(&self, workspace: &Workspace, integrals: &str) -> AzrResult<PathBuf> {
        let path = workspace.output_path(CAPTURE_INTEGRALS_FILE);
        fs::write(&path, integrals).map_err(|source| {
            AzrError::io_path("IO.CAPTURE_INTEGRALS", "write capture integrals", &path, source)
        })?;
        Ok(path)
    }
}

fn read_outputs<T: OutputFile>(workspace: &Workspace, files: &[String]) -> AzrResult<Vec<T>> {
    files
        .iter()
        .map(|file| T::read(&workspace.output_path(file)))
        .collect()
}
