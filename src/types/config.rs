use crate::{
    types::error::{Error, Result},
    utils::config::get_config_path,
};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, str::FromStr, time::Duration};

pub const RECOMMENDED_RATES: [u32; 12] = [
    8000, 11025, 16000, 22050, 44100, 48000, 88200, 96000, 176400, 192000, 352800, 384000,
];

pub const ALLOWED_CHANNELS: [u8; 2] = [1, 2];

pub const MAX_QUALITY: u8 = 10;

pub const DEFAULT_RATE: u32 = 48000;
pub const DEFAULT_CHANNELS: u8 = 2;
pub const DEFAULT_VOLUME: f32 = 1.0;
pub const DEFAULT_QUALITY: u8 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    U8,
    S8,
    #[default]
    S16,
    S32,
    F32,
    F64,
}

impl SampleFormat {
    pub const ALL: [SampleFormat; 6] = [
        SampleFormat::U8,
        SampleFormat::S8,
        SampleFormat::S16,
        SampleFormat::S32,
        SampleFormat::F32,
        SampleFormat::F64,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S8 => "s8",
            SampleFormat::S16 => "s16",
            SampleFormat::S32 => "s32",
            SampleFormat::F32 => "f32",
            SampleFormat::F64 => "f64",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SampleFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| Error::invalid("format", s, join(&SampleFormat::ALL)))
    }
}

/// Playback/record parameters as requested by a caller. Every field is
/// optional; missing fields are filled from a base request and finally from
/// the pw-cat defaults when validated.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfigRequest {
    pub rate: Option<u32>,
    pub channels: Option<u8>,
    pub format: Option<String>,
    pub volume: Option<f32>,
    pub quality: Option<u8>,

    pub target: Option<String>,
    pub latency: Option<String>,
    pub media_type: Option<String>,
    pub media_category: Option<String>,
    pub media_role: Option<String>,
    pub channel_map: Option<String>,
}

impl AudioConfigRequest {
    /// Fields set on `self` win, the rest come from `base`.
    pub fn merge(&self, base: &AudioConfigRequest) -> AudioConfigRequest {
        AudioConfigRequest {
            rate: self.rate.or(base.rate),
            channels: self.channels.or(base.channels),
            format: self.format.clone().or_else(|| base.format.clone()),
            volume: self.volume.or(base.volume),
            quality: self.quality.or(base.quality),
            target: self.target.clone().or_else(|| base.target.clone()),
            latency: self.latency.clone().or_else(|| base.latency.clone()),
            media_type: self.media_type.clone().or_else(|| base.media_type.clone()),
            media_category: self
                .media_category
                .clone()
                .or_else(|| base.media_category.clone()),
            media_role: self.media_role.clone().or_else(|| base.media_role.clone()),
            channel_map: self
                .channel_map
                .clone()
                .or_else(|| base.channel_map.clone()),
        }
    }

    pub fn validate(&self) -> Result<AudioConfig> {
        let rate = self.rate.unwrap_or(DEFAULT_RATE);
        if !RECOMMENDED_RATES.contains(&rate) {
            return Err(Error::invalid("rate", rate, join(&RECOMMENDED_RATES)));
        }

        let channels = self.channels.unwrap_or(DEFAULT_CHANNELS);
        if !ALLOWED_CHANNELS.contains(&channels) {
            return Err(Error::invalid("channels", channels, join(&ALLOWED_CHANNELS)));
        }

        let format = match &self.format {
            Some(format) => format.parse::<SampleFormat>()?,
            None => SampleFormat::default(),
        };

        let volume = self.volume.unwrap_or(DEFAULT_VOLUME);
        if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
            return Err(Error::invalid("volume", volume, "0.0..=1.0"));
        }

        let quality = self.quality.unwrap_or(DEFAULT_QUALITY);
        if quality > MAX_QUALITY {
            return Err(Error::invalid(
                "quality",
                quality,
                format!("0..={}", MAX_QUALITY),
            ));
        }

        let latency = non_empty("latency", &self.latency)?;
        if let Some(latency) = &latency
            && !latency.chars().any(|c| c.is_ascii_digit())
        {
            return Err(Error::invalid(
                "latency",
                latency,
                "a duration containing a number, e.g. 100ms",
            ));
        }

        Ok(AudioConfig {
            rate,
            channels,
            format,
            volume,
            quality,
            target: non_empty("target", &self.target)?,
            latency,
            media_type: non_empty("media_type", &self.media_type)?,
            media_category: non_empty("media_category", &self.media_category)?,
            media_role: non_empty("media_role", &self.media_role)?,
            channel_map: non_empty("channel_map", &self.channel_map)?,
        })
    }
}

/// A configuration that passed validation. Only obtainable through
/// [`AudioConfigRequest::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfig {
    rate: u32,
    channels: u8,
    format: SampleFormat,
    volume: f32,
    quality: u8,

    target: Option<String>,
    latency: Option<String>,
    media_type: Option<String>,
    media_category: Option<String>,
    media_role: Option<String>,
    channel_map: Option<String>,
}

impl AudioConfig {
    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn latency(&self) -> Option<&str> {
        self.latency.as_deref()
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn media_category(&self) -> Option<&str> {
        self.media_category.as_deref()
    }

    pub fn media_role(&self) -> Option<&str> {
        self.media_role.as_deref()
    }

    pub fn channel_map(&self) -> Option<&str> {
        self.channel_map.as_deref()
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            rate: DEFAULT_RATE,
            channels: DEFAULT_CHANNELS,
            format: SampleFormat::default(),
            volume: DEFAULT_VOLUME,
            quality: DEFAULT_QUALITY,
            target: None,
            latency: None,
            media_type: None,
            media_category: None,
            media_role: None,
            channel_map: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Binaries {
    pub cat: String,
    pub cli: String,
    pub link: String,
}

impl Default for Binaries {
    fn default() -> Self {
        Binaries {
            cat: "pw-cat".to_string(),
            cli: "pw-cli".to_string(),
            link: "pw-link".to_string(),
        }
    }
}

/// Everything a [`Controller`](crate::Controller) needs, handed over at
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub binaries: Binaries,
    pub defaults: AudioConfigRequest,
    pub record_seconds: u64,
    pub terminate_grace_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            binaries: Binaries::default(),
            defaults: AudioConfigRequest::default(),
            record_seconds: 5,
            terminate_grace_ms: 2000,
        }
    }
}

impl Settings {
    pub fn record_duration(&self) -> Duration {
        Duration::from_secs(self.record_seconds)
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }

    pub fn save_to_file(&self) -> Result<()> {
        let config_path = get_config_path()?.join("settings.json");
        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir)?;
        }

        let settings_json = serde_json::to_string_pretty(self)?;
        fs::write(config_path, settings_json.as_bytes())?;
        Ok(())
    }

    pub fn load_from_file() -> Result<Settings> {
        let config_path = get_config_path()?.join("settings.json");
        let bytes = fs::read(config_path)?;
        Ok(serde_json::from_slice::<Settings>(&bytes)?)
    }

    pub fn load_or_default() -> Settings {
        Settings::load_from_file().unwrap_or_else(|err| {
            tracing::debug!("Using default settings: {}", err);
            Settings::default()
        })
    }
}

fn non_empty(field: &'static str, value: &Option<String>) -> Result<Option<String>> {
    match value {
        Some(value) if value.trim().is_empty() => {
            Err(Error::invalid(field, "\"\"", "a non-empty string"))
        }
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
