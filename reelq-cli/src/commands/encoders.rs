//! Implementation of the 'encoders' subcommand.
//!
//! Opens a session (locating ffmpeg and probing its codec listings) and shows
//! the capability sets together with the encoder each container would use.

use crate::cli::EncodersArgs;
use crate::config::tool_config;
use crate::error::CliResult;
use crate::terminal;

use reelq_core::{CoreConfig, EncoderCapabilities, OutputFormat, Session, SidecarSpawner};

use log::info;
use std::path::Path;

/// Encoder chosen for each container, video first then audio.
pub fn selected_encoders(
    caps: &EncoderCapabilities,
    config: &CoreConfig,
) -> Vec<(OutputFormat, Option<String>, Option<String>)> {
    let priority = &config.encoder_priority;
    OutputFormat::ALL
        .into_iter()
        .map(|format| {
            (
                format,
                caps.pick_encoder(priority.video(format)).map(str::to_string),
                caps.pick_encoder(priority.audio(format)).map(str::to_string),
            )
        })
        .collect()
}

pub fn run_encoders(ffmpeg: &Path, args: EncodersArgs, verbose: bool) -> CliResult<()> {
    let spawner = SidecarSpawner;
    let session = Session::open(tool_config(ffmpeg)?, &spawner)?;
    let caps = session.capabilities();
    let selected = selected_encoders(caps, session.config());

    if args.json {
        let selection: serde_json::Map<String, serde_json::Value> = selected
            .iter()
            .map(|(format, video, audio)| {
                (
                    format.extension().to_string(),
                    serde_json::json!({ "video": video, "audio": audio }),
                )
            })
            .collect();
        let value = serde_json::json!({
            "program": session.tool_path(),
            "encoders": caps.encoders().collect::<Vec<_>>(),
            "decoders": caps.decoders().collect::<Vec<_>>(),
            "selected": selection,
        });
        println!("{value}");
        return Ok(());
    }

    terminal::print_section("ffmpeg");
    terminal::print_status("Program", &session.tool_path().display().to_string(), true);
    terminal::print_status("Encoders", &caps.encoders().count().to_string(), false);
    terminal::print_status("Decoders", &caps.decoders().count().to_string(), false);

    terminal::print_section("Selected encoders");
    for (format, video, audio) in &selected {
        let video = video.as_deref().unwrap_or("ffmpeg default");
        let value = match (format.is_animated_image(), audio.as_deref()) {
            (true, _) => video.to_string(),
            (false, Some(audio)) => format!("{video} + {audio}"),
            (false, None) => format!("{video} + ffmpeg default"),
        };
        terminal::print_status(format.extension(), &value, false);
    }

    if verbose {
        terminal::print_section("All encoders");
        info!("    {}", caps.encoders().collect::<Vec<_>>().join(" "));
        terminal::print_section("All decoders");
        info!("    {}", caps.decoders().collect::<Vec<_>>().join(" "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_follows_priority() {
        let caps = EncoderCapabilities::new(["mpeg4", "libopus", "gif"], ["h264"]);
        let selected = selected_encoders(&caps, &CoreConfig::default());

        let mp4 = selected.iter().find(|(f, ..)| *f == OutputFormat::Mp4).unwrap();
        assert_eq!(mp4.1.as_deref(), Some("mpeg4"));
        assert_eq!(mp4.2, None);

        let webm = selected.iter().find(|(f, ..)| *f == OutputFormat::Webm).unwrap();
        assert_eq!(webm.1, None);
        assert_eq!(webm.2.as_deref(), Some("libopus"));

        let gif = selected.iter().find(|(f, ..)| *f == OutputFormat::Gif).unwrap();
        assert_eq!(gif.1.as_deref(), Some("gif"));
    }
}
