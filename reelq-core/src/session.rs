//! Session setup: tool location and capability probing.
//!
//! A session is opened once at application start. It owns the validated
//! configuration, the resolved ffmpeg path and the capability sets. After
//! opening it is never mutated and is shared read-only through an `Arc`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capabilities::EncoderCapabilities;
use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::external::{ProcessSpawner, ToolInvocation};

#[derive(Debug)]
pub struct Session {
    config: CoreConfig,
    tool_path: PathBuf,
    capabilities: EncoderCapabilities,
}

impl Session {
    /// Locates ffmpeg and probes its codecs.
    ///
    /// # Errors
    ///
    /// * `CoreError::ToolNotFound` - ffmpeg is not on the execution path
    /// * `CoreError::InvalidInput` - the configuration is invalid
    /// * `CoreError::ProcessExitedNonZero` - a listing command failed
    pub fn open<S: ProcessSpawner>(config: CoreConfig, spawner: &S) -> CoreResult<Arc<Self>> {
        config.validate()?;
        let tool_path = spawner.locate(&config.ffmpeg_program)?;
        let capabilities = EncoderCapabilities::probe(spawner, &tool_path)?;
        log::info!(
            "Using {} ({} encoders, {} decoders)",
            tool_path.display(),
            capabilities.encoders().count(),
            capabilities.decoders().count()
        );
        Ok(Arc::new(Self {
            config,
            tool_path,
            capabilities,
        }))
    }

    /// Session with known capabilities, skipping the tool lookup.
    pub fn with_capabilities(
        config: CoreConfig,
        tool_path: PathBuf,
        capabilities: EncoderCapabilities,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            tool_path,
            capabilities,
        })
    }

    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    #[must_use]
    pub fn tool_path(&self) -> &Path {
        &self.tool_path
    }

    #[must_use]
    pub fn capabilities(&self) -> &EncoderCapabilities {
        &self.capabilities
    }

    /// Wraps arguments into an invocation of the session's ffmpeg.
    #[must_use]
    pub fn invocation(&self, args: Vec<String>) -> ToolInvocation {
        ToolInvocation::new(&self.tool_path, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::external::mocks::MockSpawner;

    #[test]
    fn test_open_probes_capabilities() {
        let spawner = MockSpawner::new();
        let session = Session::open(CoreConfig::default(), &spawner).unwrap();
        assert!(session.capabilities().has_encoder("libx264"));
        assert_eq!(session.tool_path(), Path::new("ffmpeg"));
        assert_eq!(spawner.captured_calls().len(), 2);
    }

    #[test]
    fn test_open_without_tool_fails_before_anything_runs() {
        let spawner = MockSpawner::missing_tool();
        let result = Session::open(CoreConfig::default(), &spawner);
        assert!(matches!(result, Err(CoreError::ToolNotFound(_))));
        assert!(spawner.captured_calls().is_empty());
        assert!(spawner.received_calls().is_empty());
    }
}
