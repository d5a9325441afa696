mod model;
mod parser;

pub use model::{Level, LevelGroup, LevelTemplate};

#[cfg(test)]
pub(crate) use model::fixtures;
#[cfg(test)]
pub(crate) use parser::fixtures as row_fixtures;

use crate::domain::AzrResult;
use crate::parser::ConfigDocument;

impl LevelTemplate {
    pub fn from_document(document: &ConfigDocument) -> AzrResult<Self> {
        parser::read_levels(document)
    }
}

/// Serializes flattened `levels` into the document's level rows.
pub fn write_levels(document: &mut ConfigDocument, levels: &[Level]) -> AzrResult<()> {
    parser::write_levels(document, levels)
}
