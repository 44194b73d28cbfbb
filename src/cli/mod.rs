//! CLI module - argument parsing, interactive prompts and the inspect command

mod args;
pub mod inspect;
mod prompts;

pub use args::{default_output_dir, Cli, Commands};
pub use inspect::{inspect_table, run_inspect, InspectReport};
pub use prompts::*;
