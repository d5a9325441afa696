//! Fixed layout of the AZURE2 input document and its output directory.
//!
//! Column offsets are zero-based token positions inside whitespace-separated
//! rows. They are dictated by the solver's file schema and are not configurable.

pub const CONFIG_OPEN: &str = "<config>";
pub const CONFIG_CLOSE: &str = "</config>";
pub const LEVELS_OPEN: &str = "<levels>";
pub const LEVELS_CLOSE: &str = "</levels>";
pub const SEGMENTS_DATA_OPEN: &str = "<segmentsData>";
pub const SEGMENTS_DATA_CLOSE: &str = "</segmentsData>";
pub const SEGMENTS_TEST_OPEN: &str = "<segmentsTest>";
pub const SEGMENTS_TEST_CLOSE: &str = "</segmentsTest>";

/// Line offsets from the `<config>` marker.
pub const CONFIG_OUTPUT_DIR_OFFSET: usize = 2;
pub const CONFIG_CHECKS_DIR_OFFSET: usize = 3;

pub const LEVEL_SPIN: usize = 0;
pub const LEVEL_PARITY: usize = 1;
pub const LEVEL_ENERGY: usize = 2;
pub const LEVEL_ENERGY_FIXED: usize = 3;
pub const LEVEL_CHANNEL: usize = 5;
pub const LEVEL_WIDTH_FIXED: usize = 10;
pub const LEVEL_WIDTH: usize = 11;
pub const LEVEL_SEPARATION_ENERGY: usize = 21;
pub const LEVEL_CHANNEL_RADIUS: usize = 27;
pub const LEVEL_MIN_TOKENS: usize = LEVEL_CHANNEL_RADIUS + 1;

pub const DATA_INCLUDE: usize = 0;
pub const DATA_IN_CHANNEL: usize = 1;
pub const DATA_OUT_CHANNEL: usize = 2;
pub const DATA_NORM_FACTOR: usize = 8;
pub const DATA_VARY_NORM: usize = 9;
pub const DATA_FILENAME: usize = 11;
pub const DATA_MIN_TOKENS: usize = DATA_FILENAME + 1;

pub const TEST_INCLUDE: usize = 0;
pub const TEST_IN_CHANNEL: usize = 1;
pub const TEST_OUT_CHANNEL: usize = 2;
pub const TEST_MIN_TOKENS: usize = TEST_OUT_CHANNEL + 1;

/// Out-channel value that selects the summed capture output file.
pub const TOTAL_CAPTURE_CHANNEL: i32 = -1;

pub const DATA_OUTPUT_EXTENSION: &str = "out";
pub const EXTRAP_OUTPUT_EXTENSION: &str = "extrap";
pub const PARAMETERS_OUTPUT_FILE: &str = "parameters.out";
pub const CAPTURE_INTEGRALS_FILE: &str = "intEC.dat";
pub const SOLVER_LOG_FILE: &str = "solver.log";

pub const OUTPUT_COLUMNS: usize = 9;
pub const EXTRAP_OUTPUT_COLUMNS: usize = 5;

pub fn output_filename(in_channel: i32, out_channel: i32, extension: &str) -> String {
    if out_channel == TOTAL_CAPTURE_CHANNEL {
        format!("AZUREOut_aa={}_TOTAL_CAPTURE.{}", in_channel, extension)
    } else {
        format!("AZUREOut_aa={}_R={}.{}", in_channel, out_channel, extension)
    }
}
