use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type AzrResult<T> = Result<T, AzrError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AzrErrorCategory {
    DocumentFormat,
    AddressResolution,
    AddressOutOfBounds,
    ShapeMismatch,
    SolverInvocation,
    OutputParse,
    IoSystem,
    Internal,
}

impl AzrErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DocumentFormat => "DocumentFormatError",
            Self::AddressResolution => "AddressResolutionError",
            Self::AddressOutOfBounds => "AddressOutOfBoundsError",
            Self::ShapeMismatch => "ShapeMismatchError",
            Self::SolverInvocation => "SolverInvocationError",
            Self::OutputParse => "OutputParseError",
            Self::IoSystem => "IoSystemError",
            Self::Internal => "InternalError",
        }
    }

    pub const fn exit_code(self) -> i32 {
        match self {
            Self::DocumentFormat
            | Self::AddressResolution
            | Self::AddressOutOfBounds
            | Self::ShapeMismatch => 2,
            Self::IoSystem => 3,
            Self::SolverInvocation | Self::OutputParse => 4,
            Self::Internal => 5,
        }
    }

    /// Errors detected while loading a document, before any workspace exists.
    pub const fn is_construction_error(self) -> bool {
        matches!(
            self,
            Self::DocumentFormat | Self::AddressResolution | Self::AddressOutOfBounds
        )
    }
}

impl Display for AzrErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzrError {
    category: AzrErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl AzrError {
    pub fn new(
        category: AzrErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn document_format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AzrErrorCategory::DocumentFormat, placeholder, message)
    }

    pub fn address_resolution(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AzrErrorCategory::AddressResolution, placeholder, message)
    }

    pub fn address_out_of_bounds(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AzrErrorCategory::AddressOutOfBounds, placeholder, message)
    }

    pub fn shape_mismatch(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AzrErrorCategory::ShapeMismatch, placeholder, message)
    }

    pub fn solver_invocation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AzrErrorCategory::SolverInvocation, placeholder, message)
    }

    pub fn output_parse(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AzrErrorCategory::OutputParse, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AzrErrorCategory::IoSystem, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AzrErrorCategory::Internal, placeholder, message)
    }

    /// I/O failure on a concrete path, the most common shape of `IoSystem` errors.
    pub fn io_path(
        placeholder: &'static str,
        action: &str,
        path: &Path,
        source: std::io::Error,
    ) -> Self {
        Self::io_system(
            placeholder,
            format!("failed to {} '{}': {}", action, path.display(), source),
        )
    }

    pub const fn category(&self) -> AzrErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    /// Appends reproduction context while keeping category and placeholder.
    pub fn with_context(mut self, context: impl AsRef<str>) -> Self {
        self.message.push_str(" (");
        self.message.push_str(context.as_ref());
        self.message.push(')');
        self
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for AzrError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for AzrError {}
