#![allow(dead_code)]

use azr_core::domain::{AzrError, AzrResult, RunMode};
use azr_core::modules::solver::{Solver, SolverInvocation, SolverReport};
use azr_core::parser::ConfigDocument;
use azr_core::pipelines::Config;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub const LEVEL_TOKENS: usize = 28;

/// A `<levels>` row with every unused column zeroed.
pub fn level_row(
    spin: &str,
    parity: &str,
    energy: &str,
    energy_fixed: bool,
    width: &str,
    width_fixed: bool,
    channel: &str,
) -> String {
    let mut tokens = vec!["0"; LEVEL_TOKENS];
    tokens[0] = spin;
    tokens[1] = parity;
    tokens[2] = energy;
    tokens[3] = if energy_fixed { "1" } else { "0" };
    tokens[5] = channel;
    tokens[10] = if width_fixed { "1" } else { "0" };
    tokens[11] = width;
    tokens[21] = "1.9435";
    tokens[27] = "4.5";
    tokens.join("  ")
}

pub fn data_row(include: bool, in_channel: i32, out_channel: i32, vary_norm: bool, filename: &str) -> String {
    format!(
        "{}  {}  {}  0.1  2.0  0  0  0  1.0  {}  0.05  {}",
        u8::from(include),
        in_channel,
        out_channel,
        u8::from(vary_norm),
        filename
    )
}

/// `12C(p,g)`-shaped model: a free 1/2+ resonance, a fixed 1/2- bound
/// state, two data segments of which the first floats its normalization,
/// and three extrapolation segments.
pub fn write_model(base: &Path) -> PathBuf {
    fs::create_dir_all(base.join("data")).expect("data directory should be created");
    fs::write(
        base.join("data/capture.dat"),
        "0.35 90.0 1.0e-9 1.0e-10\n0.40 90.0 2.0e-9 2.0e-10\n",
    )
    .expect("capture data should be written");
    fs::write(base.join("data/elastic.dat"), "0.50 120.0 1.2 0.1\n")
        .expect("elastic data should be written");

    let source = [
        "<config>".to_string(),
        "true".to_string(),
        "output/".to_string(),
        "checks/".to_string(),
        "none".to_string(),
        "</config>".to_string(),
        "<levels>".to_string(),
        level_row("0.5", "1", "2.37", false, "33600", false, "1"),
        String::new(),
        level_row("0.5", "-1", "-0.6", true, "1.8", true, "1"),
        "</levels>".to_string(),
        "<segmentsData>".to_string(),
        data_row(true, 1, 2, true, "data/capture.dat"),
        data_row(true, 1, 1, false, "data/elastic.dat"),
        "</segmentsData>".to_string(),
        "<segmentsTest>".to_string(),
        "1  1  2  0.1  2.0  0.01  0  0  0  0".to_string(),
        "1  1  1  0.1  2.0  0.01  90  90  0  0".to_string(),
        "0  1  -1  0.1  2.0  0.01  0  0  0  0".to_string(),
        "</segmentsTest>".to_string(),
        String::new(),
    ]
    .join("\n");

    let path = base.join("12C_pg.azr");
    fs::write(&path, source).expect("model should be written");
    path
}

/// What the fake solver saw in the document it was handed.
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    pub mode: RunMode,
    pub output_dir_line: String,
    pub first_energy: f64,
    pub test_flags: Vec<bool>,
    pub data_filenames: Vec<String>,
    pub first_data_energy: f64,
    pub ext_capture_file: Option<PathBuf>,
    pub capture_contents: Option<String>,
}

/// Stands in for AZURE2: reads the materialized document back and writes
/// output files whose fit columns echo the first level energy.
#[derive(Debug, Default)]
pub struct FakeSolver {
    pub skip_outputs: bool,
    pub observed: Mutex<Vec<Observed>>,
}

impl FakeSolver {
    pub fn observations(&self) -> Vec<Observed> {
        self.observed.lock().expect("observations lock").clone()
    }
}

impl Solver for FakeSolver {
    fn run(&self, invocation: &SolverInvocation) -> AzrResult<SolverReport> {
        let document = ConfigDocument::read(&invocation.config_file)?;
        let base_dir = invocation
            .working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let config = Config::from_document(document.clone(), base_dir, None)?;

        let first_energy = config.model().template().flatten()[0].energy;
        let observed = Observed {
            mode: invocation.mode,
            output_dir_line: document.output_directory()?.to_string(),
            first_energy,
            test_flags: config
                .test()
                .all_segments()
                .iter()
                .map(|segment| segment.include())
                .collect(),
            data_filenames: config
                .data()
                .all_segments()
                .iter()
                .map(|segment| segment.filename().to_string())
                .collect(),
            first_data_energy: config.data().all_segments()[0].values().rows()[0][0],
            ext_capture_file: invocation.ext_capture_file.clone(),
            capture_contents: invocation
                .ext_capture_file
                .as_ref()
                .and_then(|path| fs::read_to_string(path).ok()),
        };
        self.observed.lock().expect("observations lock").push(observed);

        if self.skip_outputs {
            return Ok(report());
        }

        let write = |name: &str, body: String| {
            fs::write(invocation.output_dir.join(name), body)
                .map_err(|source| AzrError::io_path("IO.FAKE", "write fake output", &invocation.output_dir, source))
        };
        match invocation.mode {
            RunMode::CalculateWithData => {
                for file in config.data().output_files() {
                    write(
                        &file,
                        format!("0.35 2.3 90 {e} {e} 1e-9 1e-10 2.0 0.2\n", e = first_energy),
                    )?;
                }
                write(
                    "parameters.out",
                    format!("J = 1/2+\n  g_int = {}\nJ = 1/2-\n  g_int = 0.75\n", first_energy),
                )?;
                write("intEC.dat", format!("integrals at {}\n", config.data().all_segments()[0].values().rows()[0][0]))?;
            }
            RunMode::CalculateWithoutData => {
                for file in config.test().output_files() {
                    write(&file, format!("0.1 2.0 0 {e} {e}\n", e = first_energy))?;
                }
            }
        }
        Ok(report())
    }
}

fn report() -> SolverReport {
    SolverReport {
        exit_code: Some(0),
        elapsed: Duration::from_millis(1),
        log_file: None,
    }
}

pub struct FailingSolver;

impl Solver for FailingSolver {
    fn run(&self, _invocation: &SolverInvocation) -> AzrResult<SolverReport> {
        Err(AzrError::solver_invocation(
            "SOLVER.EXIT_STATUS",
            "solver 'AZURE2' exited with exit status: 1",
        ))
    }
}

pub fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

/// Runs the fake solver, then leaves a regular file where the workspace
/// expects its data directory, so the run succeeds but release cannot.
#[derive(Debug, Default)]
pub struct BlockedDataDirSolver {
    pub inner: FakeSolver,
}

impl Solver for BlockedDataDirSolver {
    fn run(&self, invocation: &SolverInvocation) -> AzrResult<SolverReport> {
        let report = self.inner.run(invocation)?;
        let name = invocation
            .output_dir
            .file_name()
            .map(|name| name.to_string_lossy().replace("output_azr-", "data_azr-"))
            .expect("workspace output directory has a name");
        let blocker = invocation
            .output_dir
            .parent()
            .expect("workspace output directory has a parent")
            .join(name);
        fs::write(&blocker, "not a directory").expect("blocker file should be written");
        Ok(report)
    }
}
