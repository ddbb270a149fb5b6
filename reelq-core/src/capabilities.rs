//! Encoder and decoder discovery.
//!
//! ffmpeg builds differ in which codecs they carry, so the available sets are
//! read once per session from `ffmpeg -hide_banner -encoders` and `-decoders`.
//! Each listing row starts with a six-character flag column followed by the
//! codec name, e.g. ` V....D libx264   libx264 H.264 ...`.

use serde::Serialize;

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{CoreResult, command_failed_error};
use crate::external::{ProcessSpawner, ToolInvocation};

const FLAG_CHARS: &str = "VASDFXB.";

/// Codec names supported by the installed ffmpeg.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EncoderCapabilities {
    encoders: BTreeSet<String>,
    decoders: BTreeSet<String>,
}

impl EncoderCapabilities {
    pub fn new<E, D, S>(encoders: E, decoders: D) -> Self
    where
        E: IntoIterator<Item = S>,
        D: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            encoders: encoders.into_iter().map(Into::into).collect(),
            decoders: decoders.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds the sets from raw `-encoders` and `-decoders` output.
    pub fn from_listings(encoder_listing: &str, decoder_listing: &str) -> Self {
        Self {
            encoders: parse_codec_listing(encoder_listing),
            decoders: parse_codec_listing(decoder_listing),
        }
    }

    /// Queries the tool for both listings.
    ///
    /// A listing that cannot be produced is an error; an empty listing is not.
    pub fn probe<S: ProcessSpawner>(spawner: &S, program: &Path) -> CoreResult<Self> {
        let encoders = run_listing(spawner, program, "-encoders")?;
        let decoders = run_listing(spawner, program, "-decoders")?;
        let caps = Self::from_listings(&encoders, &decoders);
        log::debug!(
            "Capability probe found {} encoders and {} decoders",
            caps.encoders.len(),
            caps.decoders.len()
        );
        Ok(caps)
    }

    #[must_use]
    pub fn has_encoder(&self, name: &str) -> bool {
        self.encoders.contains(name)
    }

    #[must_use]
    pub fn has_decoder(&self, name: &str) -> bool {
        self.decoders.contains(name)
    }

    pub fn encoders(&self) -> impl Iterator<Item = &str> {
        self.encoders.iter().map(String::as_str)
    }

    pub fn decoders(&self) -> impl Iterator<Item = &str> {
        self.decoders.iter().map(String::as_str)
    }

    /// Whether the decoder listing carried anything at all.
    #[must_use]
    pub fn knows_decoders(&self) -> bool {
        !self.decoders.is_empty()
    }

    /// First candidate present in the encoder set.
    #[must_use]
    pub fn pick_encoder<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        candidates
            .iter()
            .map(String::as_str)
            .find(|name| self.has_encoder(name))
    }
}

fn run_listing<S: ProcessSpawner>(spawner: &S, program: &Path, flag: &str) -> CoreResult<String> {
    let invocation = ToolInvocation::new(program, vec!["-hide_banner".to_string(), flag.to_string()]);
    let output = spawner.capture(&invocation)?;
    if !output.exit.success() {
        return Err(command_failed_error(output.exit.code, last_lines(&output.text, 5)));
    }
    Ok(output.text)
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}

/// Extracts codec names from an ffmpeg codec listing.
///
/// Headers, the legend (`V..... = Video`) and the dashed separator are skipped.
pub fn parse_codec_listing(listing: &str) -> BTreeSet<String> {
    listing
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            let name = fields.next()?;
            let is_flag_column =
                flags.len() == 6 && flags.chars().all(|c| FLAG_CHARS.contains(c));
            (is_flag_column && name != "=").then(|| name.to_string())
        })
        .collect()
}
