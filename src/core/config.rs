//! Configuration for the provider loader, the map surface and marker layout.
//!
//! Values come from `Default`, from `HEALTHMAP_*` environment variables or
//! from a JSON document. Everything here is fixed configuration: none of it
//! changes after a surface has been created.

use crate::{
    core::{constants, geo::LatLng},
    MapError, Result,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider SDK script parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub script_base_url: String,
    pub api_key: String,
    /// Feature libraries requested from the provider (`libraries=` query)
    pub libraries: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            script_base_url: constants::MAPS_SCRIPT_BASE_URL.to_string(),
            api_key: String::new(),
            libraries: vec!["places".to_string()],
        }
    }
}

impl ProviderConfig {
    /// Full script URL, also used as the loader's memo key
    pub fn script_url(&self) -> Result<String> {
        let mut params = vec![("key", self.api_key.clone())];
        if !self.libraries.is_empty() {
            params.push(("libraries", self.libraries.join(",")));
        }

        Url::parse_with_params(&self.script_base_url, &params)
            .map(String::from)
            .map_err(|e| MapError::Config(format!("bad script url {}: {}", self.script_base_url, e)))
    }
}

/// How long to wait for the provider before offering a retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// `None` waits forever
    pub timeout_ms: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: Some(constants::DEFAULT_LOAD_TIMEOUT_MS),
        }
    }
}

impl LoaderConfig {
    pub fn unbounded() -> Self {
        Self { timeout_ms: None }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout_ms: Some(timeout.as_millis() as u64),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    On,
    Off,
    Simplified,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Simplified => "simplified",
        }
    }
}

/// One provider style rule, e.g. simplify `poi.medical`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStyle {
    pub feature_type: String,
    pub visibility: Visibility,
}

/// Options applied once, when a surface is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceOptions {
    pub zoom: f64,
    pub styles: Vec<FeatureStyle>,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            zoom: constants::DEFAULT_ZOOM,
            styles: vec![FeatureStyle {
                feature_type: constants::MEDICAL_POI_FEATURE.to_string(),
                visibility: Visibility::Simplified,
            }],
        }
    }
}

/// Top-level configuration of a [`crate::HealthMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub provider: ProviderConfig,
    pub loader: LoaderConfig,
    pub surface: SurfaceOptions,
    /// Center used until the application supplies one
    pub default_center: LatLng,
    pub fit_padding: f64,
    pub place_icon_size: (u32, u32),
    pub user_icon_size: (u32, u32),
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            loader: LoaderConfig::default(),
            surface: SurfaceOptions::default(),
            default_center: constants::DEFAULT_CENTER,
            fit_padding: constants::DEFAULT_FIT_PADDING,
            place_icon_size: constants::PLACE_ICON_SIZE,
            user_icon_size: constants::USER_ICON_SIZE,
        }
    }
}

impl MapConfig {
    /// Defaults overridden by `HEALTHMAP_*` environment variables.
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("HEALTHMAP_MAPS_API_KEY") {
            config.provider.api_key = key;
        }
        if let Ok(libraries) = std::env::var("HEALTHMAP_MAPS_LIBRARIES") {
            config.provider.libraries = libraries
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(timeout) = env_parse::<u64>("HEALTHMAP_LOAD_TIMEOUT_MS") {
            // 0 disables the bound
            config.loader.timeout_ms = (timeout > 0).then_some(timeout);
        }
        if let Some(zoom) = env_parse::<f64>("HEALTHMAP_ZOOM") {
            config.surface.zoom = zoom;
        }
        if let Some(padding) = env_parse::<f64>("HEALTHMAP_FIT_PADDING") {
            config.fit_padding = padding;
        }

        config
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(constants::MIN_ZOOM..=constants::MAX_ZOOM).contains(&self.surface.zoom) {
            return Err(MapError::Config(format!(
                "zoom {} outside {}..={}",
                self.surface.zoom,
                constants::MIN_ZOOM,
                constants::MAX_ZOOM
            )));
        }
        if !self.fit_padding.is_finite() || self.fit_padding < 0.0 {
            return Err(MapError::Config(format!(
                "fit padding must be a non-negative number, got {}",
                self.fit_padding
            )));
        }
        if !self.default_center.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "default center {}",
                self.default_center
            )));
        }
        self.provider.script_url().map(|_| ())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}
