//! Thumbnail extraction for scrubbing through a source.
//!
//! A frame is pulled with a single-frame ffmpeg run into a temporary PNG and
//! kept in a small cache keyed by source path and half-second bucket, so
//! dragging a scrubber back and forth does not relaunch ffmpeg for every
//! position.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{CoreError, CoreResult, command_failed_error};
use crate::external::{MediaProber, ProcessSpawner};
use crate::session::Session;
use crate::temp_files::{create_temp_file, temp_base_dir};

/// Seconds covered by one cache bucket.
const BUCKET_SECS: f64 = 0.5;

/// Arguments for extracting one frame at `at` seconds.
#[must_use]
pub fn build_preview_args(source: &Path, at: f64, width: u32, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-ss".into(),
        format!("{at:.3}"),
        "-i".into(),
        source.to_string_lossy().into_owned(),
        "-frames:v".into(),
        "1".into(),
        "-vf".into(),
        format!("scale={width}:-1:flags=lanczos"),
        "-q:v".into(),
        "2".into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Cache key: source path plus half-second bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewKey {
    path: PathBuf,
    bucket: u64,
}

impl PreviewKey {
    #[must_use]
    pub fn new(path: &Path, at: f64) -> Self {
        Self {
            path: path.to_path_buf(),
            bucket: (at.max(0.0) / BUCKET_SECS) as u64,
        }
    }
}

/// Bounded frame cache; the oldest insertion is evicted first.
#[derive(Debug)]
pub struct PreviewCache {
    capacity: usize,
    order: VecDeque<PreviewKey>,
    frames: HashMap<PreviewKey, Arc<Vec<u8>>>,
}

impl PreviewCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            frames: HashMap::new(),
        }
    }

    pub fn get(&self, key: &PreviewKey) -> Option<Arc<Vec<u8>>> {
        self.frames.get(key).cloned()
    }

    pub fn insert(&mut self, key: PreviewKey, frame: Arc<Vec<u8>>) {
        if self.frames.insert(key.clone(), frame).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.frames.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.frames.clear();
    }
}

/// Extracts and caches thumbnails through the session's ffmpeg.
pub struct PreviewExtractor<S: ProcessSpawner> {
    session: Arc<Session>,
    spawner: Arc<S>,
    prober: Arc<dyn MediaProber>,
    cache: Mutex<PreviewCache>,
}

impl<S: ProcessSpawner> PreviewExtractor<S> {
    pub fn new(session: Arc<Session>, spawner: Arc<S>, prober: Arc<dyn MediaProber>) -> Self {
        let capacity = session.config().preview_cache_capacity;
        Self {
            session,
            spawner,
            prober,
            cache: Mutex::new(PreviewCache::new(capacity)),
        }
    }

    /// PNG bytes of the frame at `at` seconds.
    ///
    /// # Errors
    ///
    /// * `CoreError::InvalidInput` - negative or non-finite timestamp
    /// * `CoreError::DecoderUnavailable` - the source codec cannot be decoded
    /// * `CoreError::ProcessExitedNonZero` - ffmpeg failed to extract the frame
    pub fn frame_at(&self, source: &Path, at: f64) -> CoreResult<Arc<Vec<u8>>> {
        if !at.is_finite() || at < 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "Preview position must be a non-negative number, got {at}"
            )));
        }

        let key = PreviewKey::new(source, at);
        if let Some(frame) = self.lock_cache().get(&key) {
            log::trace!("Preview cache hit for {} at {at:.2}s", source.display());
            return Ok(frame);
        }

        let at = self.check_source(source, at)?;
        let config = self.session.config();
        let temp = create_temp_file(&temp_base_dir(config), "reelq_preview", "png")?;
        let args = build_preview_args(source, at, config.preview_width, temp.path());
        let output = self.spawner.capture(&self.session.invocation(args))?;
        if !output.exit.success() {
            let tail: Vec<&str> = output.text.lines().rev().take(5).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            return Err(command_failed_error(output.exit.code, tail.join("\n")));
        }

        let bytes = fs::read(temp.path())?;
        if bytes.is_empty() {
            return Err(CoreError::OperationFailed(format!(
                "ffmpeg produced no frame for {} at {at:.2}s",
                source.display()
            )));
        }

        let frame = Arc::new(bytes);
        self.lock_cache().insert(key, Arc::clone(&frame));
        Ok(frame)
    }

    /// Number of cached frames.
    pub fn cached(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, PreviewCache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Checks the decoder and keeps the position inside the media.
    fn check_source(&self, source: &Path, at: f64) -> CoreResult<f64> {
        let info = match self.prober.probe(source) {
            Ok(info) => info,
            Err(e) => {
                log::debug!("Preview without media info: {e}");
                return Ok(at);
            }
        };

        let caps = self.session.capabilities();
        if let Some(codec) = info.video_codec.as_deref() {
            if caps.knows_decoders() && !caps.has_decoder(codec) {
                return Err(CoreError::DecoderUnavailable(codec.to_string()));
            }
        }
        Ok(match info.duration {
            Some(duration) if at >= duration => (duration - 0.1).max(0.0),
            _ => at,
        })
    }
}
