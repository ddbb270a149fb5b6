// reelq-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Compiled for unit tests and when the "test-mocks" feature is enabled.

use super::{CapturedOutput, ExitState, MediaInfo, MediaProber, ProcessSpawner, ToolInvocation, ToolProcess};
use crate::error::{CoreError, CoreResult};
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

/// Exit code reported by a mock that honoured a quit request.
pub const MOCK_QUIT_EXIT_CODE: i32 = 255;

/// Encoder listing used when a test does not provide one.
pub const DEFAULT_ENCODER_LISTING: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 V....D mpeg4                MPEG-4 part 2
 V....D libvpx-vp9           libvpx VP9 (codec vp9)
 V....D gif                  GIF (Graphics Interchange Format)
 A....D aac                  AAC (Advanced Audio Coding)
 A....D libopus              libopus Opus (codec opus)
";

/// Decoder listing used when a test does not provide one.
pub const DEFAULT_DECODER_LISTING: &str = "\
Decoders:
 V..... = Video
 ------
 VFS..D h264                 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10
 VFS..D hevc                 HEVC (High Efficiency Video Coding)
 V....D vp9                  Google VP9
 V....D gif                  GIF (Graphics Interchange Format)
 A....D aac                  AAC (Advanced Audio Coding)
";

/// What a mock process does once spawned.
#[derive(Debug, Clone)]
pub struct MockScript {
    /// Diagnostic lines written before the process settles
    pub lines: Vec<String>,
    /// Exit code once the lines are written (ignored while hanging)
    pub exit_code: Option<i32>,
    /// Keep running after the lines until stopped or killed
    pub hang: bool,
    /// Ignore graceful stop requests, forcing a kill
    pub ignore_quit: bool,
    /// Fail at launch with this message instead of starting
    pub launch_error: Option<String>,
}

impl MockScript {
    pub fn success<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            exit_code: Some(0),
            hang: false,
            ignore_quit: false,
            launch_error: None,
        }
    }

    pub fn failure<I, S>(code: i32, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exit_code: Some(code),
            ..Self::success(lines)
        }
    }

    pub fn hanging<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hang: true,
            exit_code: None,
            ..Self::success(lines)
        }
    }

    pub fn launch_failure(message: &str) -> Self {
        Self {
            launch_error: Some(message.to_string()),
            ..Self::success(Vec::<String>::new())
        }
    }

    #[must_use]
    pub fn ignoring_quit(mut self) -> Self {
        self.ignore_quit = true;
        self
    }
}

struct MockControl {
    sender: Option<Sender<Vec<u8>>>,
    exit: Option<ExitState>,
    ignore_quit: bool,
    stop_requests: usize,
}

fn lock_control(control: &Mutex<MockControl>) -> MutexGuard<'_, MockControl> {
    control.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reader over chunks sent by the mock; EOF once every sender is gone.
struct ChannelReader {
    receiver: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.chunk.len() {
            match self.receiver.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Mock implementation of ToolProcess.
pub struct MockProcess {
    diagnostics: Option<ChannelReader>,
    control: Arc<Mutex<MockControl>>,
}

impl ToolProcess for MockProcess {
    fn take_diagnostics(&mut self) -> Option<Box<dyn Read + Send>> {
        self.diagnostics
            .take()
            .map(|reader| Box::new(reader) as Box<dyn Read + Send>)
    }

    fn request_stop(&mut self) -> io::Result<()> {
        let mut control = lock_control(&self.control);
        control.stop_requests += 1;
        if control.exit.is_none() && !control.ignore_quit {
            control.exit = Some(ExitState {
                code: Some(MOCK_QUIT_EXIT_CODE),
            });
            control.sender = None;
        }
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        let mut control = lock_control(&self.control);
        if control.exit.is_none() {
            control.exit = Some(ExitState { code: None });
        }
        control.sender = None;
        Ok(())
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitState>> {
        Ok(lock_control(&self.control).exit)
    }
}

#[derive(Default)]
struct SpawnerState {
    expectations: Vec<(String, MockScript)>,
    received_calls: Vec<ToolInvocation>,
    captured_calls: Vec<ToolInvocation>,
    controls: Vec<Arc<Mutex<MockControl>>>,
    max_concurrent: usize,
}

/// Mock implementation of ProcessSpawner.
///
/// Scripts are matched by a pattern contained in any argument (usually the
/// source file name) and consumed on first use. Unmatched spawns succeed
/// silently.
#[derive(Clone)]
pub struct MockSpawner {
    state: Arc<Mutex<SpawnerState>>,
    tool_missing: bool,
    encoder_listing: String,
    decoder_listing: String,
}

impl Default for MockSpawner {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(SpawnerState::default())),
            tool_missing: false,
            encoder_listing: DEFAULT_ENCODER_LISTING.to_string(),
            decoder_listing: DEFAULT_DECODER_LISTING.to_string(),
        }
    }
}

impl MockSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A spawner whose tool cannot be located.
    pub fn missing_tool() -> Self {
        Self {
            tool_missing: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_encoder_listing(mut self, listing: &str) -> Self {
        self.encoder_listing = listing.to_string();
        self
    }

    #[must_use]
    pub fn with_decoder_listing(mut self, listing: &str) -> Self {
        self.decoder_listing = listing.to_string();
        self
    }

    fn state(&self) -> MutexGuard<'_, SpawnerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_expectation(&self, arg_pattern: &str, script: MockScript) {
        self.state()
            .expectations
            .push((arg_pattern.to_string(), script));
    }

    /// Long-running invocations started so far.
    pub fn received_calls(&self) -> Vec<ToolInvocation> {
        self.state().received_calls.clone()
    }

    /// Run-to-completion invocations made so far.
    pub fn captured_calls(&self) -> Vec<ToolInvocation> {
        self.state().captured_calls.clone()
    }

    /// Mock processes that have not exited yet.
    pub fn live_processes(&self) -> usize {
        self.state()
            .controls
            .iter()
            .filter(|control| lock_control(control).exit.is_none())
            .count()
    }

    /// Highest number of simultaneously live processes seen at spawn time.
    pub fn max_concurrent(&self) -> usize {
        self.state().max_concurrent
    }

    /// Total graceful stop requests received by all processes.
    pub fn stop_requests(&self) -> usize {
        self.state()
            .controls
            .iter()
            .map(|control| lock_control(control).stop_requests)
            .sum()
    }
}

impl ProcessSpawner for MockSpawner {
    type Process = MockProcess;

    fn locate(&self, program: &Path) -> CoreResult<PathBuf> {
        if self.tool_missing {
            Err(CoreError::ToolNotFound(program.display().to_string()))
        } else {
            Ok(program.to_path_buf())
        }
    }

    fn spawn(&self, invocation: &ToolInvocation) -> CoreResult<Self::Process> {
        let mut state = self.state();
        state.received_calls.push(invocation.clone());

        let found_index = state.expectations.iter().position(|(pattern, _)| {
            invocation.args.iter().any(|arg| arg.contains(pattern.as_str()))
        });
        let script = match found_index {
            Some(index) => state.expectations.remove(index).1,
            None => MockScript::success(Vec::<String>::new()),
        };

        if let Some(message) = script.launch_error {
            return Err(CoreError::ProcessLaunchFailed(
                invocation.program_name(),
                io::Error::other(message),
            ));
        }

        let (sender, receiver) = mpsc::channel();
        for line in &script.lines {
            // Lines ending in a carriage return are sent untouched
            let mut bytes = line.clone().into_bytes();
            if !line.ends_with('\r') {
                bytes.push(b'\n');
            }
            let _ = sender.send(bytes);
        }

        let control = if script.hang {
            MockControl {
                sender: Some(sender),
                exit: None,
                ignore_quit: script.ignore_quit,
                stop_requests: 0,
            }
        } else {
            drop(sender);
            MockControl {
                sender: None,
                exit: Some(ExitState {
                    code: script.exit_code,
                }),
                ignore_quit: script.ignore_quit,
                stop_requests: 0,
            }
        };
        let control = Arc::new(Mutex::new(control));

        let live = state
            .controls
            .iter()
            .filter(|c| lock_control(c).exit.is_none())
            .count();
        state.max_concurrent = state.max_concurrent.max(live + 1);
        state.controls.push(Arc::clone(&control));

        Ok(MockProcess {
            diagnostics: Some(ChannelReader {
                receiver,
                chunk: Vec::new(),
                pos: 0,
            }),
            control,
        })
    }

    fn capture(&self, invocation: &ToolInvocation) -> CoreResult<CapturedOutput> {
        self.state().captured_calls.push(invocation.clone());
        if self.tool_missing {
            return Err(CoreError::ToolNotFound(invocation.program_name()));
        }

        let args = &invocation.args;
        let text = if args.iter().any(|a| a == "-encoders") {
            self.encoder_listing.clone()
        } else if args.iter().any(|a| a == "-decoders") {
            self.decoder_listing.clone()
        } else if args.iter().any(|a| a == "-frames:v") {
            // Single-frame extraction: leave a small file at the output path
            if let Some(output) = args.last() {
                std::fs::write(output, MOCK_FRAME_BYTES)?;
            }
            String::new()
        } else {
            String::new()
        };

        Ok(CapturedOutput {
            exit: ExitState { code: Some(0) },
            text,
        })
    }
}

/// Bytes the mock writes for an extracted frame.
pub const MOCK_FRAME_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nmock-frame";

/// Mock implementation of MediaProber keyed by path.
#[derive(Clone, Default)]
pub struct MockProber {
    results: Arc<Mutex<HashMap<PathBuf, MediaInfo>>>,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_media_info(&self, path: &Path, info: MediaInfo) {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.to_path_buf(), info);
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl MediaProber for MockProber {
    fn probe(&self, path: &Path) -> CoreResult<MediaInfo> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(path.to_path_buf());
        let results = self
            .results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        results
            .get(path)
            .cloned()
            .ok_or_else(|| CoreError::MediaProbe(format!("no media info for {}", path.display())))
    }
}
