use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

pub const DEFAULT_PLAYBACK_SPEED: f64 = 1.0;
pub const MAX_PLAYBACK_SPEED: f64 = 4.0;
pub const DEFAULT_CAPTION_LANGUAGE: &str = "en";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum PreferenceError {
    #[error("playback speed must be in (0, 4], got {0}")]
    InvalidSpeed(f64),

    #[error("unknown video quality: {0}")]
    UnknownQuality(String),

    #[error("caption language cannot be empty")]
    EmptyCaptionLanguage,
}

/// Validate a playback speed multiplier.
///
/// # Errors
///
/// Returns `PreferenceError::InvalidSpeed` for non-finite, non-positive, or
/// implausibly large values.
pub fn validate_speed(speed: f64) -> Result<f64, PreferenceError> {
    if speed.is_finite() && speed > 0.0 && speed <= MAX_PLAYBACK_SPEED {
        Ok(speed)
    } else {
        Err(PreferenceError::InvalidSpeed(speed))
    }
}

//
// ─── QUALITY ───────────────────────────────────────────────────────────────────
//

/// Preferred video rendition. `Auto` lets the player adapt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VideoQuality {
    #[default]
    Auto,
    P360,
    P480,
    P720,
    P1080,
}

impl VideoQuality {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoQuality::Auto => "auto",
            VideoQuality::P360 => "360p",
            VideoQuality::P480 => "480p",
            VideoQuality::P720 => "720p",
            VideoQuality::P1080 => "1080p",
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoQuality {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(VideoQuality::Auto),
            "360p" | "360" => Ok(VideoQuality::P360),
            "480p" | "480" => Ok(VideoQuality::P480),
            "720p" | "720" => Ok(VideoQuality::P720),
            "1080p" | "1080" => Ok(VideoQuality::P1080),
            other => Err(PreferenceError::UnknownQuality(other.to_string())),
        }
    }
}

// Renditions the client doesn't know about fall back to `Auto`.
impl From<String> for VideoQuality {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl From<VideoQuality> for String {
    fn from(value: VideoQuality) -> Self {
        value.as_str().to_string()
    }
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Playback preferences for a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRecord {
    #[serde(default, alias = "user_id")]
    pub user_id: Option<UserId>,
    #[serde(default = "default_speed", alias = "playback_speed")]
    pub playback_speed: f64,
    #[serde(default, alias = "preferred_quality")]
    pub preferred_quality: VideoQuality,
    #[serde(default = "default_true", alias = "auto_play_next")]
    pub auto_play_next: bool,
    #[serde(default, alias = "show_captions")]
    pub show_captions: bool,
    #[serde(default = "default_language", alias = "caption_language")]
    pub caption_language: String,
}

impl Default for PreferenceRecord {
    fn default() -> Self {
        Self {
            user_id: None,
            playback_speed: DEFAULT_PLAYBACK_SPEED,
            preferred_quality: VideoQuality::Auto,
            auto_play_next: true,
            show_captions: false,
            caption_language: DEFAULT_CAPTION_LANGUAGE.to_string(),
        }
    }
}

impl PreferenceRecord {
    /// Replace values a backend should never have stored (e.g. a zero speed).
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if validate_speed(self.playback_speed).is_err() {
            self.playback_speed = DEFAULT_PLAYBACK_SPEED;
        }
        if self.caption_language.trim().is_empty() {
            self.caption_language = DEFAULT_CAPTION_LANGUAGE.to_string();
        }
        self
    }

    /// Apply the set fields of a partial update.
    pub fn apply(&mut self, update: &PreferenceUpdate) {
        if let Some(speed) = update.playback_speed {
            self.playback_speed = speed;
        }
        if let Some(quality) = update.preferred_quality {
            self.preferred_quality = quality;
        }
        if let Some(auto_play) = update.auto_play_next {
            self.auto_play_next = auto_play;
        }
        if let Some(show) = update.show_captions {
            self.show_captions = show;
        }
        if let Some(language) = update.caption_language.as_ref() {
            self.caption_language.clone_from(language);
        }
    }
}

/// Partial preference write; unset fields are omitted from the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_quality: Option<VideoQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_play_next: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_captions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_language: Option<String>,
}

impl PreferenceUpdate {
    /// # Errors
    ///
    /// Returns `PreferenceError::InvalidSpeed` if the speed is out of range.
    pub fn speed(speed: f64) -> Result<Self, PreferenceError> {
        Ok(Self {
            playback_speed: Some(validate_speed(speed)?),
            ..Self::default()
        })
    }

    #[must_use]
    pub fn quality(quality: VideoQuality) -> Self {
        Self {
            preferred_quality: Some(quality),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn auto_play_next(enabled: bool) -> Self {
        Self {
            auto_play_next: Some(enabled),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns `PreferenceError::EmptyCaptionLanguage` if `language` is blank.
    pub fn captions(show: bool, language: &str) -> Result<Self, PreferenceError> {
        let language = language.trim();
        if language.is_empty() {
            return Err(PreferenceError::EmptyCaptionLanguage);
        }
        Ok(Self {
            show_captions: Some(show),
            caption_language: Some(language.to_string()),
            ..Self::default()
        })
    }

    /// Fold a later update into this one; fields set in `later` win.
    pub fn merge(&mut self, later: &PreferenceUpdate) {
        if later.playback_speed.is_some() {
            self.playback_speed = later.playback_speed;
        }
        if later.preferred_quality.is_some() {
            self.preferred_quality = later.preferred_quality;
        }
        if later.auto_play_next.is_some() {
            self.auto_play_next = later.auto_play_next;
        }
        if later.show_captions.is_some() {
            self.show_captions = later.show_captions;
        }
        if later.caption_language.is_some() {
            self.caption_language.clone_from(&later.caption_language);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn default_speed() -> f64 {
    DEFAULT_PLAYBACK_SPEED
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    DEFAULT_CAPTION_LANGUAGE.to_string()
}
