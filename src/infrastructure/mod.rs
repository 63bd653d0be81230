pub mod cli;
pub mod logging;

pub use cli::{execute, run, Invocation, USAGE};
