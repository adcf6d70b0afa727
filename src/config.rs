use crate::scene::sun::SunState;
use chrono::Timelike;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_ENV_VAR: &str = "SUNSTUDY_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "sunstudy.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid color '{0}': expected #RRGGBB")]
    Color(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// 8-bit sRGB color, written as `#RRGGBB` in config files and the settings panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub fn to_linear_f32(self) -> [f32; 3] {
        self.0.map(|channel| {
            let c = channel as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        })
    }
}

impl FromStr for Rgb {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::Color(value.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ConfigError::Color(value.to_string()))
        };
        Ok(Self([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}")
    }
}

impl serde::Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Colors for the two recolored tiers.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Palette {
    /// Context tier.
    pub color2: Rgb,
    /// Site tier.
    pub color3: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            color2: Rgb([0x80, 0x80, 0x80]),
            color3: Rgb([0xFF, 0xFD, 0xD0]),
        }
    }
}

/// Everything the settings panel can change while the viewer runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSettings {
    pub sun: SunState,
    pub palette: Palette,
    pub animate_time: bool,
    pub time_speed: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsChanges {
    pub sun: bool,
    pub materials: bool,
}

impl SettingsChanges {
    pub fn any(&self) -> bool {
        self.sun || self.materials
    }
}

/// Owns the live settings and records which consumers need to react to an edit.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings: ViewerSettings,
    pending: SettingsChanges,
}

impl SettingsStore {
    pub fn new(settings: ViewerSettings) -> Self {
        Self {
            settings,
            // First frame classifies and places the sun.
            pending: SettingsChanges {
                sun: true,
                materials: true,
            },
        }
    }

    pub fn snapshot(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn set_hour(&mut self, hour: u32) {
        let hour = hour.min(23);
        if self.settings.sun.hour_of_day != hour {
            self.settings.sun.hour_of_day = hour;
            self.pending.sun = true;
        }
    }

    pub fn set_minute(&mut self, minute: u32) {
        let minute = minute.min(59);
        if self.settings.sun.minute_of_hour != minute {
            self.settings.sun.minute_of_hour = minute;
            self.pending.sun = true;
        }
    }

    pub fn set_orbit_radius(&mut self, radius: f32) {
        if radius > 0.0 && radius.is_finite() && self.settings.sun.orbit_radius != radius {
            self.settings.sun.orbit_radius = radius;
            self.pending.sun = true;
        }
    }

    pub fn set_time_of_day(&mut self, hour: u32, minute: u32) {
        self.set_hour(hour);
        self.set_minute(minute);
    }

    pub fn set_color2(&mut self, color: Rgb) {
        if self.settings.palette.color2 != color {
            self.settings.palette.color2 = color;
            self.pending.materials = true;
        }
    }

    pub fn set_color3(&mut self, color: Rgb) {
        if self.settings.palette.color3 != color {
            self.settings.palette.color3 = color;
            self.pending.materials = true;
        }
    }

    pub fn set_animate_time(&mut self, enabled: bool) {
        self.settings.animate_time = enabled;
    }

    pub fn set_time_speed(&mut self, speed: f32) {
        if speed.is_finite() {
            self.settings.time_speed = speed.max(0.0);
        }
    }

    /// Marks materials dirty, e.g. after a new model was attached.
    pub fn request_material_pass(&mut self) {
        self.pending.materials = true;
    }

    pub fn take_changes(&mut self) -> SettingsChanges {
        std::mem::take(&mut self.pending)
    }
}

/// On-disk viewer configuration. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Primary model path followed by fallbacks, tried in order.
    pub model_paths: Vec<String>,
    pub model_scale: f32,
    /// Pinned start time. `None` uses the local clock.
    pub hour_of_day: Option<u32>,
    pub minute_of_hour: Option<u32>,
    pub sun_radius: f32,
    pub palette: Palette,
    pub animate_time: bool,
    pub time_speed: f32,
    pub movement_speed: f32,
    pub camera_position: [f32; 3],
    pub camera_target: [f32; 3],
    pub fov_deg: f32,
    pub window_size: [u32; 2],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model_paths: vec![
                "Oxford Tile/glTF/Oxford Tile.glb".to_string(),
                "Oxford_Tile.glb".to_string(),
                "assets/Oxford_Tile.glb".to_string(),
                "models/Oxford_Tile.glb".to_string(),
            ],
            model_scale: 0.05,
            hour_of_day: None,
            minute_of_hour: None,
            sun_radius: 18.0,
            palette: Palette::default(),
            animate_time: false,
            time_speed: 100.0,
            movement_speed: 2.5,
            camera_position: [2.0, 2.0, 5.0],
            camera_target: [0.0, 0.75, 0.0],
            fov_deg: 75.0,
            window_size: [1280, 720],
        }
    }
}

impl ViewerConfig {
    pub fn initial_settings(&self) -> ViewerSettings {
        let now = chrono::Local::now();
        ViewerSettings {
            sun: SunState {
                hour_of_day: self.hour_of_day.unwrap_or_else(|| now.hour()).min(23),
                minute_of_hour: self.minute_of_hour.unwrap_or_else(|| now.minute()).min(59),
                orbit_radius: if self.sun_radius > 0.0 { self.sun_radius } else { 18.0 },
            },
            palette: self.palette,
            animate_time: self.animate_time,
            time_speed: self.time_speed.max(0.0),
        }
    }

    /// Copies the persisted panel settings. Time of day is left as configured.
    pub fn remember(&mut self, settings: &ViewerSettings) {
        self.sun_radius = settings.sun.orbit_radius;
        self.palette = settings.palette;
        self.animate_time = settings.animate_time;
        self.time_speed = settings.time_speed;
    }

    /// Puts `primary` in front of the configured list, keeping the rest as fallbacks.
    pub fn with_primary_path(mut self, primary: Option<String>) -> Self {
        if let Some(primary) = primary {
            self.model_paths.retain(|path| *path != primary);
            self.model_paths.insert(0, primary);
        }
        self
    }
}

pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub fn load_config_from_file(path: &Path) -> Result<ViewerConfig> {
    let json = std::fs::read_to_string(path)?;
    let config: ViewerConfig = serde_json::from_str(&json)?;
    Ok(config)
}

pub fn save_config_to_file(config: &ViewerConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Reads the config at `path`, falling back to defaults when it is missing or unreadable.
pub fn load_or_default(path: &Path) -> ViewerConfig {
    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return ViewerConfig::default();
    }
    match load_config_from_file(path) {
        Ok(config) => {
            log::info!("Loaded config from {}", path.display());
            config
        }
        Err(err) => {
            log::warn!("Failed to read config {}: {}; using defaults", path.display(), err);
            ViewerConfig::default()
        }
    }
}
