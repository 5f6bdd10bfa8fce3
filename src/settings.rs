use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, PoisonError, RwLock};
use std::time::Duration;

use crate::overlay::elements::{Color, ShapeKind, ShapeStyle, TextStyle};
use crate::overlay::session::EditorConfig;
use crate::overlay::zoom::Zoom;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pdf-overlay";

/// Style applied to newly placed free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDefaults {
    #[serde(default = "default_font_family")]
    pub font_family: String,

    #[serde(default = "default_font_size")]
    pub font_size_px: f32,

    #[serde(default)]
    pub color: Color,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size_px: default_font_size(),
            color: Color::BLACK,
        }
    }
}

/// Tool state applied to newly drawn shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDefaults {
    #[serde(default)]
    pub kind: ShapeKind,

    #[serde(default)]
    pub color: Color,

    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,
}

impl Default for ShapeDefaults {
    fn default() -> Self {
        Self {
            kind: ShapeKind::Rectangle,
            color: Color::BLACK,
            stroke_width: default_stroke_width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Page width in pixels at 100% zoom
    #[serde(default = "default_editor_width")]
    pub editor_width_px: f32,

    #[serde(default = "default_zoom")]
    pub default_zoom: f32,

    /// Delays of the stabilization re-renders after a document opens
    #[serde(default = "default_retry_delays")]
    pub retry_delays_ms: Vec<u64>,

    /// Shape drags at or below this distance are ignored
    #[serde(default = "default_min_shape_drag")]
    pub min_shape_drag_px: f32,

    #[serde(default)]
    pub text_defaults: TextDefaults,

    #[serde(default)]
    pub shape_defaults: ShapeDefaults,

    #[serde(default)]
    pub show_original_text: bool,

    #[serde(default = "default_edit_tip_secs")]
    pub edit_tip_secs: u64,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_editor_width() -> f32 {
    1000.0
}

fn default_zoom() -> f32 {
    1.0
}

fn default_retry_delays() -> Vec<u64> {
    vec![100, 500, 1000]
}

fn default_min_shape_drag() -> f32 {
    5.0
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_font_size() -> f32 {
    16.0
}

fn default_stroke_width() -> f32 {
    2.0
}

fn default_edit_tip_secs() -> u64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            editor_width_px: default_editor_width(),
            default_zoom: default_zoom(),
            retry_delays_ms: default_retry_delays(),
            min_shape_drag_px: default_min_shape_drag(),
            text_defaults: TextDefaults::default(),
            shape_defaults: ShapeDefaults::default(),
            show_original_text: false,
            edit_tip_secs: default_edit_tip_secs(),
        }
    }
}

impl Settings {
    /// Session tunables derived from these settings
    pub fn editor_config(&self) -> EditorConfig {
        let editor_width_px = if self.editor_width_px.is_finite() && self.editor_width_px > 0.0 {
            self.editor_width_px
        } else {
            warn!(
                "Ignoring invalid editor_width_px {}, using {}",
                self.editor_width_px,
                default_editor_width()
            );
            default_editor_width()
        };

        EditorConfig {
            editor_width_px,
            default_zoom: Zoom::clamp_factor(self.default_zoom),
            retry_delays: self
                .retry_delays_ms
                .iter()
                .map(|&ms| Duration::from_millis(ms))
                .collect(),
            min_shape_drag_px: self.min_shape_drag_px.max(0.0),
            text_style: TextStyle {
                font_family: self.text_defaults.font_family.clone(),
                font_size_px: self.text_defaults.font_size_px,
                color: self.text_defaults.color,
                ..TextStyle::default()
            },
            shape_kind: self.shape_defaults.kind,
            shape_style: ShapeStyle {
                color: self.shape_defaults.color,
                stroke_width: self.shape_defaults.stroke_width,
            },
            show_original_text: self.show_original_text,
            edit_tip_duration: Duration::from_secs(self.edit_tip_secs),
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings into the global slot.
///
/// `override_path` wins over the platform config directory. A missing file is
/// created with defaults; an unreadable one leaves the defaults in place.
pub fn load_settings(override_path: Option<&Path>) {
    let path = match override_path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => {
                warn!("Could not determine config directory, using default settings");
                return;
            }
        },
    };

    if !path.exists() {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = SETTINGS.read().unwrap_or_else(PoisonError::into_inner);
        save_settings_to_file(&settings, &path);
        return;
    }

    if let Some(settings) = load_settings_from_path(&path) {
        *SETTINGS.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }
}

/// Parse a settings file, migrating and rewriting it when outdated
pub fn load_settings_from_path(path: &Path) -> Option<Settings> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }
                Some(settings)
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                None
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            None
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let body = match serde_yaml::to_string(settings) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return;
        }
    };

    match fs::write(path, format!("{SETTINGS_HEADER}{body}")) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# pdf-overlay settings
# ============================================================================
# editor_width_px    page width in pixels at 100% zoom
# retry_delays_ms    re-renders after a document opens, until the page settles
# min_shape_drag_px  shorter drags with a shape tool are treated as clicks
# Colors are #rrggbb; shape kinds are rectangle, circle, line or arrow.

"#;

// Public API for accessing settings

pub fn current_settings() -> Settings {
    SETTINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn editor_config() -> EditorConfig {
    current_settings().editor_config()
}
