//! Console helpers: progress bars, styled output and log setup

mod logging;
mod progress;
mod styling;

pub use logging::*;
pub use progress::*;
pub use styling::*;
