// reelq-cli/src/lib.rs
//
// Library portion of the reelq CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, ConvertArgs, EncodersArgs, PreviewArgs};
pub use commands::convert::run_convert;
pub use commands::encoders::run_encoders;
pub use commands::preview::run_preview;
