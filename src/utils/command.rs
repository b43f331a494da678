use crate::types::{config::AudioConfig, process::CommandLine};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Playback,
    Record,
}

impl Mode {
    pub fn flag(&self) -> &'static str {
        match self {
            Mode::Playback => "--playback",
            Mode::Record => "--record",
        }
    }
}

/// Builds the pw-cat invocation for `mode` on `path`.
///
/// Flags always come in the same order: mode, rate, channels, format,
/// volume, quality, then any optional stream properties that were set, and
/// the file path last.
pub fn build_cat_command(
    program: &str,
    mode: Mode,
    config: &AudioConfig,
    path: &Path,
) -> CommandLine {
    let mut command = CommandLine::new(program)
        .arg(mode.flag())
        .args(["--rate".to_string(), config.rate().to_string()])
        .args(["--channels".to_string(), config.channels().to_string()])
        .args(["--format".to_string(), config.format().to_string()])
        .args(["--volume".to_string(), format!("{:.3}", config.volume())])
        .args(["--quality".to_string(), config.quality().to_string()]);

    let optional = [
        ("--target", config.target()),
        ("--latency", config.latency()),
        ("--media-type", config.media_type()),
        ("--media-category", config.media_category()),
        ("--media-role", config.media_role()),
        ("--channel-map", config.channel_map()),
    ];
    for (flag, value) in optional {
        if let Some(value) = value {
            command = command.args([flag, value]);
        }
    }

    command.arg(path.as_os_str())
}

/// `pw-cat --playback|--record --list-targets`
pub fn build_list_targets_command(program: &str, mode: Mode) -> CommandLine {
    CommandLine::new(program).args([mode.flag(), "--list-targets"])
}
