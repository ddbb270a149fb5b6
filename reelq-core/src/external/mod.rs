// ============================================================================
// reelq-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with ffmpeg and ffprobe
//
// This module encapsulates every place the library touches an external
// process. Consumers go through the `ProcessSpawner` / `ToolProcess` traits,
// so the runner and queue can be driven by scripted processes in tests.
//
// KEY COMPONENTS:
// - ToolInvocation: program plus ordered argument list
// - ProcessSpawner / ToolProcess: spawning and controlling a running tool
// - SidecarSpawner: concrete implementation using ffmpeg-sidecar
// - MediaProber / FfprobeProber: duration and codec lookup via ffprobe
// - locate_tool: execution-path lookup via the `which` crate

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};

// ---- Standard library imports ----
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Spawning and controlling ffmpeg through ffmpeg-sidecar
pub mod ffmpeg_executor;

/// Media inspection through the ffprobe crate
pub mod ffprobe_executor;

/// Scripted processes for tests
#[cfg(any(test, feature = "test-mocks"))]
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use ffmpeg_executor::{SidecarProcess, SidecarSpawner};
pub use ffprobe_executor::{FfprobeProber, MediaInfo, MediaProber, NoopProber};

// ============================================================================
// INVOCATION AND EXIT TYPES
// ============================================================================

/// A fully built command line for the external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Program name as shown in messages.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Quotes an argument for display so a logged command can be pasted into a shell.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Exit information of a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitState {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExitState {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitState {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Output of a tool run to completion.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub exit: ExitState,
    /// Standard output followed by standard error.
    pub text: String,
}

// ============================================================================
// PROCESS ABSTRACTION
// ============================================================================

/// A running external tool.
pub trait ToolProcess: Send + 'static {
    /// Hands out the diagnostic (stderr) stream. Returns `None` after the first call.
    fn take_diagnostics(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Asks the tool to stop gracefully.
    fn request_stop(&mut self) -> io::Result<()>;

    /// Terminates the tool immediately.
    fn kill(&mut self) -> io::Result<()>;

    /// Returns the exit state once the process is gone, without blocking.
    fn try_wait(&mut self) -> io::Result<Option<ExitState>>;
}

/// Something that can start the external tool.
pub trait ProcessSpawner: Send + Sync + 'static {
    type Process: ToolProcess;

    /// Resolves the tool on the execution path.
    fn locate(&self, program: &Path) -> CoreResult<PathBuf> {
        locate_tool(program)
    }

    /// Starts a long-running invocation and returns immediately.
    fn spawn(&self, invocation: &ToolInvocation) -> CoreResult<Self::Process>;

    /// Runs an invocation to completion and collects its output.
    fn capture(&self, invocation: &ToolInvocation) -> CoreResult<CapturedOutput>;
}

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Finds an executable by name on the execution path, or checks an explicit path.
///
/// # Errors
///
/// * `CoreError::ToolNotFound` - If nothing executable matches `program`
pub fn locate_tool(program: &Path) -> CoreResult<PathBuf> {
    match which::which(program) {
        Ok(path) => {
            log::debug!("Found {} at {}", program.display(), path.display());
            Ok(path)
        }
        Err(e) => {
            log::warn!("Dependency '{}' not found: {}", program.display(), e);
            Err(CoreError::ToolNotFound(program.display().to_string()))
        }
    }
}
