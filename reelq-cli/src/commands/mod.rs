//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// `convert`: queue files and run them through ffmpeg one at a time.
pub mod convert;
/// `encoders`: show what the installed ffmpeg can encode and decode.
pub mod encoders;
/// `preview`: extract a single frame.
pub mod preview;
