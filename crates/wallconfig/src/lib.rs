//! TOML configuration for lumawall.
//!
//! A config file only needs the keys it changes; every missing section falls
//! back to the engine defaults.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use renderer::{
    ControllerConfig, CrossfadeCurve, EffectSetting, EffectsConfig, RendererConfig, ScalingMode,
};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CONFIG_VERSION: u32 = 1;
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Longest accepted crossfade.
pub const MAX_CROSSFADE: Duration = Duration::from_secs(60);
/// Longest accepted reload debounce window.
pub const MAX_RELOAD_DEBOUNCE: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scaling {
    #[default]
    Fill,
    Fit,
    Stretch,
    None,
}

impl From<Scaling> for ScalingMode {
    fn from(value: Scaling) -> Self {
        match value {
            Scaling::Fill => ScalingMode::Fill,
            Scaling::Fit => ScalingMode::Fit,
            Scaling::Stretch => ScalingMode::Stretch,
            Scaling::None => ScalingMode::None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Curve {
    #[default]
    Linear,
    Smoothstep,
    EaseInOut,
}

impl From<Curve> for CrossfadeCurve {
    fn from(value: Curve) -> Self {
        match value {
            Curve::Linear => CrossfadeCurve::Linear,
            Curve::Smoothstep => CrossfadeCurve::Smoothstep,
            Curve::EaseInOut => CrossfadeCurve::EaseInOut,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EffectEntry {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub percent: u32,
}

impl EffectEntry {
    /// Command-line style: any percent above zero turns the effect on.
    pub fn from_percent(percent: u32) -> Self {
        Self {
            enabled: percent > 0,
            percent,
        }
    }

    fn setting(self) -> EffectSetting {
        EffectSetting::new(self.enabled, self.percent.min(100) as u8)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EffectsSection {
    #[serde(default)]
    pub darken: EffectEntry,
    #[serde(default)]
    pub blur: EffectEntry,
    #[serde(default)]
    pub vignette: EffectEntry,
    #[serde(default)]
    pub grayscale: EffectEntry,
    #[serde(default)]
    pub parallax: EffectEntry,
}

impl EffectsSection {
    fn entries(&self) -> [(&'static str, EffectEntry); 5] {
        [
            ("darken", self.darken),
            ("blur", self.blur),
            ("vignette", self.vignette),
            ("grayscale", self.grayscale),
            ("parallax", self.parallax),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WallConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub scaling: Scaling,
    #[serde(
        default = "default_crossfade",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub crossfade: Duration,
    #[serde(default)]
    pub crossfade_curve: Curve,
    #[serde(
        default = "default_debounce",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub reload_debounce: Duration,
    #[serde(default = "default_max_blur_radius")]
    pub max_blur_radius: f32,
    #[serde(default)]
    pub adaptive_brightness: bool,
    #[serde(default)]
    pub effects: EffectsSection,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            scaling: Scaling::default(),
            crossfade: default_crossfade(),
            crossfade_curve: Curve::default(),
            reload_debounce: default_debounce(),
            max_blur_radius: default_max_blur_radius(),
            adaptive_brightness: false,
            effects: EffectsSection::default(),
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_crossfade() -> Duration {
    RendererConfig::default().crossfade
}

fn default_debounce() -> Duration {
    ControllerConfig::default().debounce
}

fn default_max_blur_radius() -> f32 {
    RendererConfig::default().max_blur_radius
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v.trim())
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl WallConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: WallConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Like [`WallConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(input) => Self::from_toml_str(&input),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {} (expected {CONFIG_VERSION})",
                self.version
            )));
        }
        if !self.max_blur_radius.is_finite() || self.max_blur_radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_blur_radius must be a positive number, got {}",
                self.max_blur_radius
            )));
        }
        for (name, value, max) in [
            ("crossfade", self.crossfade, MAX_CROSSFADE),
            ("reload_debounce", self.reload_debounce, MAX_RELOAD_DEBOUNCE),
        ] {
            if value > max {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be at most {}, got {}",
                    humantime::format_duration(max),
                    humantime::format_duration(value)
                )));
            }
        }
        for (name, entry) in self.effects.entries() {
            if entry.percent > 100 {
                return Err(ConfigError::Invalid(format!(
                    "effects.{name}.percent must be within 0..=100, got {}",
                    entry.percent
                )));
            }
        }
        Ok(())
    }

    pub fn scaling_mode(&self) -> ScalingMode {
        self.scaling.into()
    }

    pub fn effects_config(&self) -> EffectsConfig {
        EffectsConfig {
            darken: self.effects.darken.setting(),
            blur: self.effects.blur.setting(),
            vignette: self.effects.vignette.setting(),
            grayscale: self.effects.grayscale.setting(),
            parallax: self.effects.parallax.setting(),
            adaptive_brightness: self.adaptive_brightness,
        }
    }

    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            crossfade: self.crossfade,
            crossfade_curve: self.crossfade_curve.into(),
            max_blur_radius: self.max_blur_radius,
            ..RendererConfig::default()
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            debounce: self.reload_debounce,
        }
    }
}
