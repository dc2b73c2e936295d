//! Encode presets.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 1280x720 web preset
pub const WEB_720P: &str = "web_720p";
/// 1920x1080 web preset
pub const WEB_1080P: &str = "web_1080p";
/// 2560x1440 web preset
pub const WEB_2K: &str = "web_2k";
/// Wire value asking the worker to pick a preset itself
pub const AUTO_PRESET: &str = "auto";

/// A named bundle of encode parameters from the worker's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetDefinition {
    pub name: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub width: u32,
    pub height: u32,
    /// e.g. "5M"
    pub video_bitrate: String,
    /// e.g. "128k"
    pub audio_bitrate: String,
    pub fps: u32,
}

impl PresetDefinition {
    fn builtin(name: &str, width: u32, height: u32, video_bitrate: &str) -> Self {
        Self {
            name: name.to_string(),
            video_codec: "h264_nvenc".to_string(),
            audio_codec: "aac".to_string(),
            width,
            height,
            video_bitrate: video_bitrate.to_string(),
            audio_bitrate: "128k".to_string(),
            fps: 30,
        }
    }

    /// "WIDTHxHEIGHT"
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Catalog used when the worker's preset endpoint is unreachable.
pub fn fallback_catalog() -> Vec<PresetDefinition> {
    vec![
        PresetDefinition::builtin(WEB_720P, 1280, 720, "2500k"),
        PresetDefinition::builtin(WEB_1080P, 1920, 1080, "5M"),
        PresetDefinition::builtin(WEB_2K, 2560, 1440, "10M"),
    ]
}

/// Preset requested at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PresetChoice {
    /// Let the worker choose from the input's characteristics
    #[default]
    Auto,
    Named(String),
}

impl PresetChoice {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            PresetChoice::Auto => AUTO_PRESET,
            PresetChoice::Named(name) => name,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, PresetChoice::Auto)
    }
}

impl fmt::Display for PresetChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an empty preset name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("preset name must not be empty")]
pub struct EmptyPresetName;

impl FromStr for PresetChoice {
    type Err = EmptyPresetName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            Err(EmptyPresetName)
        } else if s.eq_ignore_ascii_case(AUTO_PRESET) {
            Ok(PresetChoice::Auto)
        } else {
            Ok(PresetChoice::Named(s.to_string()))
        }
    }
}

impl Serialize for PresetChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PresetChoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_catalog_names() {
        let names: Vec<String> = fallback_catalog().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec![WEB_720P, WEB_1080P, WEB_2K]);
    }

    #[test]
    fn test_preset_choice_parse() {
        assert_eq!("auto".parse::<PresetChoice>().unwrap(), PresetChoice::Auto);
        assert_eq!("AUTO".parse::<PresetChoice>().unwrap(), PresetChoice::Auto);
        assert_eq!(
            "web_720p".parse::<PresetChoice>().unwrap(),
            PresetChoice::named(WEB_720P)
        );
        assert!("  ".parse::<PresetChoice>().is_err());
    }

    #[test]
    fn test_preset_choice_wire_form() {
        assert_eq!(serde_json::to_string(&PresetChoice::Auto).unwrap(), "\"auto\"");
        assert_eq!(
            serde_json::to_string(&PresetChoice::named(WEB_2K)).unwrap(),
            "\"web_2k\""
        );
    }
}
