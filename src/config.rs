//! Compositor configuration, built from the preference store's key/value
//! pairs.

use std::time::Duration;

use thiserror::Error;

use crate::constants::{
    DEFAULT_HOVER_DELAY, DEFAULT_MAX_DAMAGE_ENTRIES, DEFAULT_POLL_INTERVAL,
    DEFAULT_RESOLUTION_HEIGHT, DEFAULT_RESOLUTION_WIDTH,
};
use crate::rect::Size;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown configuration key `{0}`")]
    UnknownKey(String),
    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue { key: String, value: String },
    #[error("`{0}` must be set together with its counterpart")]
    Incomplete(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositorConfig {
    /// Device resolution input coordinates arrive in.
    pub resolution: Size,
    /// Coordinate space windows are laid out in. `None` uses `resolution`.
    pub base_resolution: Option<Size>,
    /// Default hover delay; `None` disables hover notifications for
    /// windows without their own delay.
    pub hover_delay: Option<Duration>,
    pub poll_interval: Duration,
    pub max_damage_entries: usize,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            resolution: Size::new(DEFAULT_RESOLUTION_WIDTH, DEFAULT_RESOLUTION_HEIGHT),
            base_resolution: None,
            hover_delay: Some(DEFAULT_HOVER_DELAY),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_damage_entries: DEFAULT_MAX_DAMAGE_ENTRIES,
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_dimension(key: &str, value: &str) -> Result<i32, ConfigError> {
    match value.trim().parse::<i32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(invalid(key, value)),
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid(key, value))
}

impl CompositorConfig {
    /// Build a configuration from `(key, value)` pairs. Later pairs override
    /// earlier ones; missing keys keep their defaults.
    ///
    /// A hover delay of `0` disables hover notifications.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        let mut base_width = None;
        let mut base_height = None;
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "video.width" => config.resolution.w = parse_dimension(key, value)?,
                "video.height" => config.resolution.h = parse_dimension(key, value)?,
                "video.base_width" => base_width = Some(parse_dimension(key, value)?),
                "video.base_height" => base_height = Some(parse_dimension(key, value)?),
                "input.hover_delay_ms" => {
                    let ms = parse_millis(key, value)?;
                    config.hover_delay = (ms > 0).then(|| Duration::from_millis(ms));
                }
                "input.poll_interval_ms" => {
                    config.poll_interval = Duration::from_millis(parse_millis(key, value)?);
                }
                "damage.max_entries" => {
                    config.max_damage_entries = match value.trim().parse::<usize>() {
                        Ok(n) if n > 0 => n,
                        _ => return Err(invalid(key, value)),
                    };
                }
                other => return Err(ConfigError::UnknownKey(other.to_string())),
            }
        }
        config.base_resolution = match (base_width, base_height) {
            (Some(w), Some(h)) => Some(Size::new(w, h)),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Incomplete("video.base_width")),
            (None, Some(_)) => return Err(ConfigError::Incomplete("video.base_height")),
        };
        Ok(config)
    }

    /// Resolution windows are laid out in.
    pub fn base(&self) -> Size {
        self.base_resolution.unwrap_or(self.resolution)
    }
}
