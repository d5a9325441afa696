use crate::domain::{AzrError, AzrResult};
use crate::modules::levels::{Level, LevelTemplate};
use crate::modules::parameters::{Address, Parameter, ParameterModel, infer_parameters};
use crate::modules::segments::{DataRegistry, ExtrapolationRegistry};
use crate::modules::workspace::Workspace;
use crate::parser::ConfigDocument;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A loaded input document: the level template with its resolved
/// parameters, both segment registries, and the document text they came from.
///
/// Everything here is read-only during an evaluation. Only the data
/// registry's energy shifts are mutable, through `data_mut`.
#[derive(Debug, Clone)]
pub struct Config {
    document: ConfigDocument,
    base_dir: PathBuf,
    model: ParameterModel,
    data: DataRegistry,
    test: ExtrapolationRegistry,
}

/// The document and levels for one workspace, plus the output files the run
/// must produce.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub document: ConfigDocument,
    pub levels: Vec<Level>,
    pub output_files: Vec<String>,
}

impl Config {
    /// Loads `path`; relative data filenames resolve against its directory.
    pub fn load(path: &Path, parameters: Option<Vec<Parameter>>) -> AzrResult<Self> {
        let document = ConfigDocument::read(path)?;
        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::from_document(document, base_dir, parameters)
    }

    /// Parameters default to those inferred from the level flags.
    pub fn from_document(
        document: ConfigDocument,
        base_dir: PathBuf,
        parameters: Option<Vec<Parameter>>,
    ) -> AzrResult<Self> {
        let template = LevelTemplate::from_document(&document)?;
        let parameters = parameters.unwrap_or_else(|| infer_parameters(&template));
        let model = ParameterModel::new(template, parameters)?;
        let data = DataRegistry::from_document(&document, &base_dir)?;
        let test = ExtrapolationRegistry::from_document(&document)?;
        debug!(
            parameters = model.len(),
            data_segments = data.len(),
            test_segments = test.len(),
            "loaded configuration"
        );

        Ok(Self {
            document,
            base_dir,
            model,
            data,
            test,
        })
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn model(&self) -> &ParameterModel {
        &self.model
    }

    pub fn parameters(&self) -> &[Parameter] {
        self.model.parameters()
    }

    pub fn addresses(&self) -> &[Address] {
        self.model.addresses()
    }

    pub fn data(&self) -> &DataRegistry {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataRegistry {
        &mut self.data
    }

    pub fn test(&self) -> &ExtrapolationRegistry {
        &self.test
    }

    /// Number of level parameters.
    pub fn n1(&self) -> usize {
        self.model.len()
    }

    /// Number of normalization factors.
    pub fn n2(&self) -> usize {
        self.data.norm_segment_indices().len()
    }

    /// Length of a full parameter vector.
    pub fn nd(&self) -> usize {
        self.n1() + self.n2()
    }

    /// Template values followed by the document's normalization factors.
    pub fn input_values(&self) -> Vec<f64> {
        let mut values = self.model.template_values();
        values.extend(self.data.norm_factors());
        values
    }

    pub fn parameter_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.parameters().iter().map(Parameter::label).collect();
        labels.extend(
            self.data
                .norm_segment_indices()
                .into_iter()
                .map(|index| format!("n_{{{}}}", index)),
        );
        labels
    }

    fn split_theta<'a>(&self, theta: &'a [f64]) -> AzrResult<(&'a [f64], &'a [f64])> {
        if theta.len() != self.nd() {
            return Err(AzrError::shape_mismatch(
                "SHAPE.THETA",
                format!(
                    "expected {} parameter value(s) ({} level, {} normalization), got {}",
                    self.nd(),
                    self.n1(),
                    self.n2(),
                    theta.len()
                ),
            ));
        }
        Ok(theta.split_at(self.n1()))
    }

    /// Builds the document for a run against measured data. Shifted segment
    /// data is written into the workspace's data directory first.
    pub fn prepare_data_run(
        &self,
        workspace: &Workspace,
        theta: &[f64],
    ) -> AzrResult<PreparedRun> {
        let (level_values, norms) = self.split_theta(theta)?;
        let levels = self.model.generate_levels(level_values)?;
        let mut document = self.document.clone();

        if self.data.is_modified() {
            let data_dir = workspace.create_data_dir()?;
            let mut relocated = self.data.clone();
            relocated.update_all_dir(data_dir)?;
            relocated.write_segments_with_norms(&mut document, norms)?;
            debug!(data_dir = %data_dir.display(), "relocated shifted segment data");
        } else {
            self.data.write_segments_with_norms(&mut document, norms)?;
        }

        Ok(PreparedRun {
            document,
            levels,
            output_files: self.data.output_files(),
        })
    }

    /// Builds the document for an extrapolation. With `segment_indices`,
    /// exactly those test segments are included.
    pub fn prepare_extrapolation_run(
        &self,
        theta: &[f64],
        segment_indices: Option<&BTreeSet<usize>>,
    ) -> AzrResult<PreparedRun> {
        let (level_values, _) = self.split_theta(theta)?;
        let levels = self.model.generate_levels(level_values)?;
        let test = self.test.with_included(segment_indices)?;
        let mut document = self.document.clone();
        test.write_segments(&mut document)?;

        Ok(PreparedRun {
            document,
            levels,
            output_files: test.output_files(),
        })
    }
}
