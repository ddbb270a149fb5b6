// ============================================================================
// reelq-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management
//
// Concrete ProcessSpawner backed by ffmpeg-sidecar. Graceful stops write `q`
// to ffmpeg's stdin, which makes it finalize the output and exit.

use super::{CapturedOutput, ExitState, ProcessSpawner, ToolInvocation, ToolProcess};
use crate::error::{CoreResult, command_start_error};

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;

use std::io::{self, Read, Write};
use std::process::{ChildStdin, Command, Stdio};

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `ToolProcess`.
pub struct SidecarProcess {
    child: FfmpegChild,
    stdin: Option<ChildStdin>,
}

impl ToolProcess for SidecarProcess {
    fn take_diagnostics(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .take_stderr()
            .map(|stderr| Box::new(stderr) as Box<dyn Read + Send>)
    }

    fn request_stop(&mut self) -> io::Result<()> {
        match self.stdin.as_mut() {
            Some(stdin) => {
                stdin.write_all(b"q")?;
                stdin.flush()
            }
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "ffmpeg stdin is not available",
            )),
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitState>> {
        Ok(self.child.as_inner_mut().try_wait()?.map(ExitState::from))
    }
}

/// Concrete implementation of `ProcessSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl ProcessSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, invocation: &ToolInvocation) -> CoreResult<Self::Process> {
        log::debug!("Spawning: {invocation}");
        let mut cmd = FfmpegCommand::new_with_path(&invocation.program);
        cmd.args(&invocation.args);
        let mut child = cmd
            .spawn()
            .map_err(|e| command_start_error(&invocation.program_name(), e))?;
        let stdin = child.take_stdin();
        Ok(SidecarProcess { child, stdin })
    }

    fn capture(&self, invocation: &ToolInvocation) -> CoreResult<CapturedOutput> {
        log::debug!("Running: {invocation}");
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| command_start_error(&invocation.program_name(), e))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CapturedOutput {
            exit: output.status.into(),
            text,
        })
    }
}
