mod command;
mod traits;

pub use command::{Azure2Command, SolverOptions};
pub use traits::{Solver, SolverInvocation, SolverReport};
