pub mod levels;
pub mod output;
pub mod parameters;
pub mod segments;
pub mod solver;
pub mod workspace;
