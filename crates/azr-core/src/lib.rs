pub mod common;
pub mod domain;
pub mod modules;
pub mod parser;
pub mod pipelines;

pub use domain::{AzrError, AzrErrorCategory, AzrResult};
pub use pipelines::{Azr, Config};
