//! Configuration surface of the service layer
//!
//! Everything the host hands to the factory or to an individual service call
//! lives here: provider selection, credentials, the map construction config
//! and the per-overlay option bags.

use crate::core::geo::LngLat;
use crate::provider::ClickHandler;
use crate::MapError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The closed set of supported map providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Amap,
    Bmap,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Amap => "amap",
            ProviderKind::Bmap => "bmap",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amap" => Ok(ProviderKind::Amap),
            "bmap" => Ok(ProviderKind::Bmap),
            other => Err(MapError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Credentials and capability options for one provider. Immutable once a
/// service has been constructed from them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceOptions {
    pub key: String,
    pub plugins: Vec<String>,
    pub security_js_code: Option<String>,
}

/// Top-level host configuration, keyed by provider identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapPluginConfig {
    pub amap: Option<ServiceOptions>,
    pub bmap: Option<ServiceOptions>,
}

impl MapPluginConfig {
    /// Options for the given provider, falling back to empty defaults the way
    /// the host glue does for an unconfigured backend.
    pub fn options_for(&self, kind: ProviderKind) -> ServiceOptions {
        let slot = match kind {
            ProviderKind::Amap => &self.amap,
            ProviderKind::Bmap => &self.bmap,
        };
        slot.clone().unwrap_or_default()
    }
}

/// Logical base-tile selection at map construction time. `Satellite` is
/// expanded into the concrete imagery + road-net layer pair before the map is
/// built, so callers never name provider layer classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileMode {
    #[default]
    Normal,
    Satellite,
}

/// Map construction configuration passed to `init_map`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapConfig {
    pub center: Option<LngLat>,
    pub zoom: Option<f64>,
    pub rotation: Option<f64>,
    pub tile_mode: TileMode,
}

/// Base layer stacks selectable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseLayerKind {
    Normal,
    Satellite,
    RoadNet,
}

/// Overlay layers that can be stacked on top of the base tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayLayerKind {
    Traffic,
    Buildings,
    Custom,
}

/// Interactive drawing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Marker,
    Polyline,
    Polygon,
    Rectangle,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

/// Screen-space offset in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pixel {
    pub x: i32,
    pub y: i32,
}

impl Pixel {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Screen-space size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Marker icon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IconOptions {
    pub image: String,
    pub size: Option<Size>,
}

/// Marker configuration. Style fields left unset fall back to the backend's
/// [`OverlayDefaults`].
#[derive(Default)]
pub struct MarkerOptions {
    pub position: LngLat,
    pub title: Option<String>,
    pub content: Option<String>,
    pub icon: Option<IconOptions>,
    pub draggable: bool,
    pub bubble: bool,
    pub offset: Option<Pixel>,
    pub label: Option<String>,
    pub ext_data: Option<serde_json::Value>,
    pub on_click: Option<ClickHandler>,
}

impl MarkerOptions {
    pub fn at(position: LngLat) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// Polyline configuration.
#[derive(Default)]
pub struct PolylineOptions {
    pub path: Vec<LngLat>,
    pub stroke_color: Option<String>,
    pub stroke_weight: Option<f64>,
    pub stroke_opacity: Option<f64>,
    pub stroke_style: LineStyle,
    pub z_index: Option<i32>,
    pub ext_data: Option<serde_json::Value>,
    pub on_click: Option<ClickHandler>,
}

/// Polygon configuration.
#[derive(Default)]
pub struct PolygonOptions {
    pub path: Vec<LngLat>,
    pub fill_color: Option<String>,
    pub fill_opacity: Option<f64>,
    pub stroke_color: Option<String>,
    pub stroke_weight: Option<f64>,
    pub stroke_style: LineStyle,
    pub draggable: bool,
    pub z_index: Option<i32>,
    pub ext_data: Option<serde_json::Value>,
    pub on_click: Option<ClickHandler>,
}

/// Info window configuration. `auto_close` and `close_when_click_map` default
/// to true, matching provider behavior.
pub struct InfoWindowOptions {
    pub position: LngLat,
    pub content: String,
    pub offset: Option<Pixel>,
    pub is_custom: bool,
    pub auto_close: bool,
    pub close_when_click_map: bool,
}

impl Default for InfoWindowOptions {
    fn default() -> Self {
        Self {
            position: LngLat::default(),
            content: String::new(),
            offset: None,
            is_custom: false,
            auto_close: true,
            close_when_click_map: true,
        }
    }
}

/// Options for overlay layers (traffic, buildings, custom tiles).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerOptions {
    pub opacity: Option<f64>,
    pub z_index: Option<i32>,
    pub tile_url: Option<String>,
}

/// Style applied to interactively drawn shapes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrawOptions {
    pub stroke_color: Option<String>,
    pub stroke_weight: Option<f64>,
    pub fill_color: Option<String>,
    pub fill_opacity: Option<f64>,
}

/// Per-backend default styling applied when overlay options omit style fields.
#[derive(Debug, Clone)]
pub struct OverlayDefaults {
    pub marker_icon: String,
    pub polyline_stroke_color: String,
    pub polyline_stroke_weight: f64,
    pub polyline_stroke_opacity: f64,
    pub polygon_fill_color: String,
    pub polygon_fill_opacity: f64,
    pub polygon_stroke_color: String,
    pub polygon_stroke_weight: f64,
    pub info_window_offset: Pixel,
}

/// Maps a compass direction name to an absolute rotation angle. Matching is
/// case-insensitive; unrecognized names fall back to north.
pub fn direction_angle(name: &str) -> f64 {
    match name.to_ascii_lowercase().as_str() {
        "north" => 0.0,
        "east" => 90.0,
        "south" => 180.0,
        "west" => 270.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("amap".parse::<ProviderKind>().unwrap(), ProviderKind::Amap);
        assert_eq!("bmap".parse::<ProviderKind>().unwrap(), ProviderKind::Bmap);
        match "gmap".parse::<ProviderKind>() {
            Err(MapError::UnsupportedProvider(id)) => assert_eq!(id, "gmap"),
            other => panic!("expected UnsupportedProvider, got {:?}", other.map(|k| k.as_str())),
        }
    }

    #[test]
    fn test_plugin_config_from_json() {
        let config: MapPluginConfig = serde_json::from_str(
            r#"{
                "amap": {
                    "key": "abc123",
                    "plugins": ["AMap.Geocoder", "AMap.MouseTool"],
                    "securityJsCode": "sec456"
                }
            }"#,
        )
        .unwrap();

        let amap = config.options_for(ProviderKind::Amap);
        assert_eq!(amap.key, "abc123");
        assert_eq!(amap.plugins.len(), 2);
        assert_eq!(amap.security_js_code.as_deref(), Some("sec456"));

        // Unconfigured provider falls back to empty options
        let bmap = config.options_for(ProviderKind::Bmap);
        assert!(bmap.key.is_empty());
    }

    #[test]
    fn test_map_config_defaults() {
        let config: MapConfig = serde_json::from_str(r#"{"zoom": 12}"#).unwrap();
        assert_eq!(config.zoom, Some(12.0));
        assert_eq!(config.tile_mode, TileMode::Normal);
        assert!(config.center.is_none());
    }

    #[test]
    fn test_direction_angle() {
        assert_eq!(direction_angle("north"), 0.0);
        assert_eq!(direction_angle("East"), 90.0);
        assert_eq!(direction_angle("SOUTH"), 180.0);
        assert_eq!(direction_angle("west"), 270.0);
        assert_eq!(direction_angle("up"), 0.0);
    }
}
