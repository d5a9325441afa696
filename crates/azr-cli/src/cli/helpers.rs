use super::CliError;
use anyhow::Context;
use azr_core::domain::AzrError;
use azr_core::modules::parameters::Parameter;
use azr_core::modules::solver::SolverOptions;
use azr_core::modules::workspace::WorkspaceOptions;
use azr_core::{Azr, Config};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of a `--config` JSON file. Relative paths inside it resolve
/// against the file's directory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(super) struct RunConfig {
    pub(super) input: Option<PathBuf>,
    pub(super) parameters: Option<Vec<Parameter>>,
    pub(super) output_files: Option<Vec<String>>,
    pub(super) extrap_files: Option<Vec<String>>,
    pub(super) solver: SolverOptions,
    pub(super) workspace: WorkspaceOptions,
}

impl RunConfig {
    pub(super) fn input(&self) -> Result<&Path, CliError> {
        self.input.as_deref().ok_or_else(|| {
            CliError::Usage(
                "no input document; pass it as an argument or set 'input' in --config".to_string(),
            )
        })
    }

    pub(super) fn load_config(&self) -> Result<Config, CliError> {
        Ok(Config::load(self.input()?, self.parameters.clone())?)
    }

    pub(super) fn evaluator(&self) -> Result<Azr, CliError> {
        let mut azr = Azr::load(
            self.input()?,
            self.parameters.clone(),
            self.solver.clone(),
            &self.workspace,
        )?;
        if let Some(files) = &self.output_files {
            azr = azr.with_output_files(files.clone());
        }
        if let Some(files) = &self.extrap_files {
            azr = azr.with_extrap_files(files.clone());
        }
        Ok(azr)
    }
}

pub(super) fn load_run_config(path: &Path) -> Result<RunConfig, CliError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read run configuration '{}'", path.display()))?;
    let mut config = serde_json::from_str::<RunConfig>(&content)
        .with_context(|| format!("failed to parse run configuration '{}'", path.display()))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    config.input = config.input.map(|input| resolve_cli_path(base_dir, &input));
    config.solver.ext_par_file = config
        .solver
        .ext_par_file
        .map(|file| resolve_cli_path(base_dir, &file));
    config.workspace.root_directory = config
        .workspace
        .root_directory
        .map(|root| resolve_cli_path(base_dir, &root));
    Ok(config)
}

pub(super) fn resolve_cli_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// The document's own values when no vector was given on the command line.
pub(super) fn resolve_theta(config: &Config, theta: Option<Vec<f64>>) -> Vec<f64> {
    theta.unwrap_or_else(|| config.input_values())
}

pub(super) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(value).context("failed to render result as JSON")?;
    println!("{}", rendered);
    Ok(())
}

pub(super) fn write_text(path: &Path, contents: &str) -> Result<(), CliError> {
    fs::write(path, contents).map_err(|source| {
        CliError::Compute(AzrError::io_path(
            "IO.CLI_OUTPUT",
            "write output file",
            path,
            source,
        ))
    })
}
