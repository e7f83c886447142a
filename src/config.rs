//! Settings for the keep-alive service.
//!
//! These are fixed defaults for the injected script. Embedders and tests can
//! construct other values in Rust; nothing is read from the page or the user.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::error::KeepAliveError;

/// Prefix of every diagnostic line.
pub const DEFAULT_TAG: &str = "[Tarabean KeepAlive]";

/// Upper bound (exclusive) for the tone gain. Anything at or above this is
/// considered perceptible.
pub const MAX_SILENT_GAIN: f32 = 0.01;

/// Generator and volume settings for the inaudible tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneSettings {
    pub waveform: Waveform,
    pub frequency_hz: f32,
    pub gain: f32,
}

impl Default for ToneSettings {
    fn default() -> Self {
        ToneSettings {
            waveform: Waveform::Sine,
            frequency_hz: 100.0,
            gain: 0.001,
        }
    }
}

impl ToneSettings {
    /// The gain must keep the stream technically active but imperceptible.
    pub fn validate(&self) -> Result<(), KeepAliveError> {
        if !self.frequency_hz.is_finite() || self.frequency_hz <= 0.0 {
            return Err(KeepAliveError::InvalidConfig(format!(
                "tone frequency must be positive, got {}",
                self.frequency_hz
            )));
        }
        if !(self.gain > 0.0 && self.gain < MAX_SILENT_GAIN) {
            return Err(KeepAliveError::InvalidConfig(format!(
                "tone gain must be in (0, {MAX_SILENT_GAIN}), got {}",
                self.gain
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeepAliveConfig {
    pub tag: String,
    pub tone: ToneSettings,
    /// How often the audio context is checked for suspension.
    pub resume_check: Duration,
    /// Interval of the background tick program.
    pub tick_interval: Duration,
    pub tick_payload: String,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        KeepAliveConfig {
            tag: DEFAULT_TAG.to_string(),
            tone: ToneSettings::default(),
            resume_check: Duration::from_millis(5000),
            tick_interval: Duration::from_millis(1000),
            tick_payload: "tick".to_string(),
        }
    }
}

impl KeepAliveConfig {
    pub fn validate(&self) -> Result<(), KeepAliveError> {
        self.tone.validate()?;
        // Host timers count whole milliseconds.
        if self.resume_check.as_millis() == 0 {
            return Err(KeepAliveError::InvalidConfig(
                "resume check interval must be at least 1ms".into(),
            ));
        }
        if self.tick_interval.as_millis() == 0 {
            return Err(KeepAliveError::InvalidConfig("tick interval must be at least 1ms".into()));
        }
        Ok(())
    }
}
