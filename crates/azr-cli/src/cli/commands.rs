use super::CliError;
use super::helpers::{RunConfig, load_run_config, print_json, resolve_theta, write_text};
use azr_core::modules::output::{ExtrapolationOutput, Output, ReducedWidthAmplitude};
use azr_core::modules::parameters::{Address, Parameter};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct SourceArgs {
    /// AZURE2 input document (overrides 'input' from --config)
    #[arg(value_name = "AZR_FILE")]
    input: Option<PathBuf>,

    /// JSON run configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Solver executable (overrides solver.command)
    #[arg(long, value_name = "COMMAND")]
    solver: Option<String>,

    /// Directory that holds per-evaluation workspaces
    #[arg(long, value_name = "DIR")]
    workspace_root: Option<PathBuf>,

    /// Kill the solver after this many seconds
    #[arg(long, value_name = "SECONDS")]
    timeout_secs: Option<u64>,

    /// Disable the Brune parameterization
    #[arg(long)]
    no_brune: bool,

    /// Use the solver's own Coulomb functions instead of GSL
    #[arg(long)]
    no_gsl: bool,
}

impl SourceArgs {
    /// Flags win over the run configuration file.
    fn resolve(self) -> Result<RunConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => load_run_config(path)?,
            None => RunConfig::default(),
        };
        if let Some(input) = self.input {
            config.input = Some(input);
        }
        if let Some(command) = self.solver {
            config.solver.command = command;
        }
        if let Some(root) = self.workspace_root {
            config.workspace.root_directory = Some(root);
        }
        if let Some(timeout) = self.timeout_secs {
            config.solver.timeout_secs = Some(timeout);
        }
        if self.no_brune {
            config.solver.use_brune = false;
        }
        if self.no_gsl {
            config.solver.use_gsl = false;
        }
        Ok(config)
    }
}

#[derive(clap::Args)]
pub(super) struct InspectArgs {
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(clap::Args)]
pub(super) struct EvaluateArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Comma-separated parameter vector; defaults to the document's values
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, value_name = "VALUES")]
    theta: Option<Vec<f64>>,
}

#[derive(clap::Args)]
pub(super) struct PredictArgs {
    #[command(flatten)]
    evaluate: EvaluateArgs,

    /// Also report reduced width amplitudes from the same run
    #[arg(long)]
    with_rwas: bool,
}

#[derive(clap::Args)]
pub(super) struct ExtrapolateArgs {
    #[command(flatten)]
    evaluate: EvaluateArgs,

    /// Zero-based extrapolation segments to include; all others are excluded
    #[arg(long, value_delimiter = ',', value_name = "INDICES")]
    segments: Option<Vec<usize>>,
}

#[derive(clap::Args)]
pub(super) struct CaptureArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Data segments whose energies are shifted before the integrals are computed
    #[arg(long, value_delimiter = ',', value_name = "INDICES", requires = "shifts")]
    segments: Option<Vec<usize>>,

    /// Energy shift per entry of --segments, in MeV
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, value_name = "MEV", requires = "segments")]
    shifts: Option<Vec<f64>>,

    /// Write the integrals here instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct ParameterRow<'a> {
    index: usize,
    label: String,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameter: Option<&'a Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    segment: Option<usize>,
}

#[derive(Serialize)]
struct DataSegmentRow {
    index: usize,
    include: bool,
    in_channel: i32,
    out_channel: i32,
    norm_factor: f64,
    vary_norm: bool,
    filename: String,
    output_file: String,
}

#[derive(Serialize)]
struct TestSegmentRow {
    index: usize,
    include: bool,
    in_channel: i32,
    out_channel: i32,
    output_file: String,
}

#[derive(Serialize)]
struct SegmentsReport {
    data: Vec<DataSegmentRow>,
    test: Vec<TestSegmentRow>,
    output_files: Vec<String>,
    extrap_files: Vec<String>,
}

#[derive(Serialize)]
struct FileResult<'a, T> {
    file: &'a str,
    #[serde(flatten)]
    result: T,
}

#[derive(Serialize)]
struct PredictReport<'a> {
    outputs: Vec<FileResult<'a, Output>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rwas: Option<Vec<ReducedWidthAmplitude>>,
}

pub(super) fn run_parameters_command(args: InspectArgs) -> Result<i32, CliError> {
    let config = args.source.resolve()?.load_config()?;
    let labels = config.parameter_labels();
    let values = config.input_values();
    let norm_segments = config.data().norm_segment_indices();

    let rows: Vec<ParameterRow<'_>> = labels
        .into_iter()
        .zip(values)
        .enumerate()
        .map(|(index, (label, value))| ParameterRow {
            index,
            label,
            value,
            parameter: config.parameters().get(index),
            address: config.addresses().get(index),
            segment: index
                .checked_sub(config.n1())
                .and_then(|offset| norm_segments.get(offset).copied()),
        })
        .collect();
    print_json(&rows)?;
    Ok(0)
}

pub(super) fn run_segments_command(args: InspectArgs) -> Result<i32, CliError> {
    let run = args.source.resolve()?;
    let config = run.load_config()?;

    let data = config
        .data()
        .all_segments()
        .iter()
        .enumerate()
        .map(|(index, segment)| DataSegmentRow {
            index,
            include: segment.include(),
            in_channel: segment.in_channel(),
            out_channel: segment.out_channel(),
            norm_factor: segment.norm_factor(),
            vary_norm: segment.vary_norm(),
            filename: segment.filename().to_string(),
            output_file: segment.output_filename(),
        })
        .collect();
    let test = config
        .test()
        .all_segments()
        .iter()
        .enumerate()
        .map(|(index, segment)| TestSegmentRow {
            index,
            include: segment.include(),
            in_channel: segment.in_channel(),
            out_channel: segment.out_channel(),
            output_file: segment.output_filename(),
        })
        .collect();

    print_json(&SegmentsReport {
        data,
        test,
        output_files: run
            .output_files
            .clone()
            .unwrap_or_else(|| config.data().output_files()),
        extrap_files: run
            .extrap_files
            .clone()
            .unwrap_or_else(|| config.test().output_files()),
    })?;
    Ok(0)
}

pub(super) fn run_predict_command(args: PredictArgs) -> Result<i32, CliError> {
    let azr = args.evaluate.source.resolve()?.evaluator()?;
    let theta = resolve_theta(azr.config(), args.evaluate.theta);

    let (outputs, rwas) = if args.with_rwas {
        let (outputs, rwas) = azr.predict_with_rwas(&theta)?;
        (outputs, Some(rwas))
    } else {
        (azr.predict(&theta)?, None)
    };
    let outputs = azr
        .output_files()
        .iter()
        .zip(outputs)
        .map(|(file, result)| FileResult { file, result })
        .collect();
    print_json(&PredictReport { outputs, rwas })?;
    Ok(0)
}

pub(super) fn run_extrapolate_command(args: ExtrapolateArgs) -> Result<i32, CliError> {
    let run = args.evaluate.source.resolve()?;
    let azr = run.evaluator()?;
    let theta = resolve_theta(azr.config(), args.evaluate.theta);
    let selection: Option<BTreeSet<usize>> =
        args.segments.map(|indices| indices.into_iter().collect());

    let outputs: Vec<ExtrapolationOutput> = azr.extrapolate(&theta, selection.as_ref())?;
    let files = match (&selection, &run.extrap_files) {
        (None, Some(files)) => files.clone(),
        _ => azr
            .config()
            .test()
            .with_included(selection.as_ref())?
            .output_files(),
    };
    let report: Vec<FileResult<'_, ExtrapolationOutput>> = files
        .iter()
        .zip(outputs)
        .map(|(file, result)| FileResult { file, result })
        .collect();
    print_json(&report)?;
    Ok(0)
}

pub(super) fn run_rwas_command(args: EvaluateArgs) -> Result<i32, CliError> {
    let azr = args.source.resolve()?.evaluator()?;
    let theta = resolve_theta(azr.config(), args.theta);
    print_json(&azr.rwas(&theta)?)?;
    Ok(0)
}

pub(super) fn run_capture_integrals_command(args: CaptureArgs) -> Result<i32, CliError> {
    let mut azr = args.source.resolve()?.evaluator()?;

    let integrals = match (args.segments, args.shifts) {
        (Some(indices), Some(shifts)) => {
            azr.update_ext_capture_integrals(&indices, &shifts)?;
            azr.capture_integrals().unwrap_or_default().to_string()
        }
        _ => azr.ext_capture_integrals()?,
    };

    match args.output {
        Some(path) => {
            write_text(&path, &integrals)?;
            eprintln!("Wrote capture integrals to {}", path.display());
        }
        None => print!("{}", integrals),
    }
    Ok(0)
}
