//! Provider capability interface
//!
//! Everything the service layer knows about a concrete map engine goes
//! through the traits in this module: a [`ProviderBackend`] validates
//! credentials and produces a [`Namespace`], the namespace constructs the
//! live map and its overlays, and the handles returned from those
//! constructors are the only way the service touches vendor state.
//!
//! Hosts embedding a real engine implement these traits; the crate ships a
//! headless implementation per backend that tracks the state a live map
//! would hold.

pub mod amap;
pub mod bmap;
pub mod headless;

use crate::core::{
    config::{
        DrawKind, DrawOptions, InfoWindowOptions, LayerOptions, MapConfig, MarkerOptions,
        OverlayDefaults, PolygonOptions, PolylineOptions, ProviderKind, ServiceOptions,
    },
    geo::LngLat,
};
use crate::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::any::Any;
use std::sync::Arc;

/// Shared blocking HTTP client for the vendor REST endpoints. Building the
/// client once avoids the cost of TLS and connection pool setup for every
/// geocoding request.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::blocking::Client> = Lazy::new(|| {
    reqwest::blocking::Client::builder()
        .user_agent("mapshim/0.1 (+https://github.com/dengxuyang/mapshim)")
        .build()
        .expect("failed to build reqwest blocking client")
});

/// Identifier of a registered map event listener.
pub type ListenerId = u64;

/// Host-facing click callback: receives the native event and the overlay it
/// was registered on.
pub type ClickHandler = Box<dyn Fn(ClickEvent, Arc<dyn OverlayHandle>) + Send + Sync>;

/// Click callback as installed on a single overlay handle.
pub type OverlayClickSink = Arc<dyn Fn(ClickEvent) + Send + Sync>;

/// Map-level event callback.
pub type MapEventHandler = Arc<dyn Fn(MapEvent) + Send + Sync>;

/// Callback-style geocoder completion. Providers may misbehave and call this
/// more than once; consumers bridge it through a single-shot guard.
pub type GeocodeCallback = Box<dyn FnMut(GeocodeStatus, GeocodeResponse) + Send>;

/// Invoked by a drawing tool when the user completes a shape.
pub type DrawCallback = Box<dyn FnMut(Arc<dyn OverlayHandle>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Marker,
    Polyline,
    Polygon,
    InfoWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Tile,
    Satellite,
    RoadNet,
    Traffic,
    Buildings,
    Custom,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Tile => write!(f, "tile"),
            LayerKind::Satellite => write!(f, "satellite"),
            LayerKind::RoadNet => write!(f, "roadnet"),
            LayerKind::Traffic => write!(f, "traffic"),
            LayerKind::Buildings => write!(f, "buildings"),
            LayerKind::Custom => write!(f, "custom"),
        }
    }
}

/// Native event delivered to overlay click handlers.
#[derive(Debug, Clone, Default)]
pub struct ClickEvent {
    pub position: Option<LngLat>,
}

/// Native event delivered to map-level listeners.
#[derive(Debug, Clone)]
pub struct MapEvent {
    pub name: String,
    pub position: Option<LngLat>,
}

/// Interaction flags toggled through the provider's status surface. `None`
/// fields are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapStatus {
    pub rotate_enable: Option<bool>,
    pub drag_enable: Option<bool>,
    pub zoom_enable: Option<bool>,
}

/// Outcome reported by a provider geocoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodeStatus {
    Complete,
    Error,
    NoData,
}

/// Payload of a geocoder callback. `info` is `"OK"` on success; forward
/// results arrive in `geocodes`, reverse results in `regeocode`.
#[derive(Debug, Clone, Default)]
pub struct GeocodeResponse {
    pub info: String,
    pub geocodes: Vec<GeocodeEntry>,
    pub regeocode: Option<ReverseGeocode>,
}

#[derive(Debug, Clone, Default)]
pub struct GeocodeEntry {
    pub formatted_address: String,
    pub province: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub location: Option<LngLat>,
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReverseGeocode {
    pub formatted_address: String,
    pub province: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
}

/// An overlay attached to a live map. The vendor owns the object; the service
/// holds non-owning references for bookkeeping.
pub trait OverlayHandle: Send + Sync {
    fn kind(&self) -> OverlayKind;

    fn position(&self) -> Option<LngLat>;
    fn set_position(&self, position: LngLat);

    fn path(&self) -> Vec<LngLat>;
    fn set_path(&self, path: &[LngLat]);

    fn is_visible(&self) -> bool;
    fn show(&self);
    fn hide(&self);

    fn set_click_handler(&self, handler: OverlayClickSink);

    fn ext_data(&self) -> Option<serde_json::Value> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// A tile or data layer. Base layers are swapped through
/// [`MapHandle::set_layers`]; overlay layers go through add/remove.
pub trait LayerHandle: Send + Sync {
    fn kind(&self) -> LayerKind;

    fn options(&self) -> LayerOptions {
        LayerOptions::default()
    }

    fn as_any(&self) -> &dyn Any;
}

/// The live map instance constructed by a [`Namespace`].
pub trait MapHandle: Send + Sync {
    fn add_overlay(&self, overlay: Arc<dyn OverlayHandle>);
    fn remove_overlay(&self, overlay: &Arc<dyn OverlayHandle>);
    fn overlays(&self) -> Vec<Arc<dyn OverlayHandle>>;

    fn set_center(&self, center: LngLat);
    fn center(&self) -> Option<LngLat>;
    fn set_zoom(&self, zoom: f64);
    fn zoom(&self) -> f64;

    /// Vendor auto-fit. `positions` has already been filtered by the service.
    fn set_fit_view(
        &self,
        positions: &[LngLat],
        padding: u32,
        immediate: bool,
        edge_insets: [u32; 4],
        duration_ms: u64,
    );

    /// Replaces the base layer stack atomically.
    fn set_layers(&self, layers: Vec<Arc<dyn LayerHandle>>);
    fn layers(&self) -> Vec<Arc<dyn LayerHandle>>;
    fn add_layer(&self, layer: Arc<dyn LayerHandle>);
    fn remove_layer(&self, layer: &Arc<dyn LayerHandle>);

    fn set_rotation(&self, angle: f64, animated: bool, duration_ms: u64);
    fn rotation(&self) -> f64;
    fn set_status(&self, status: MapStatus);
    fn set_default_cursor(&self, cursor: &str);

    fn on(&self, event: &str, handler: MapEventHandler) -> ListenerId;
    fn off(&self, event: &str, listener: ListenerId);

    fn destroy(&self);
    fn is_destroyed(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Callback-style geocoder exposed by a provider namespace.
pub trait Geocoder: Send + Sync {
    fn get_location(&self, address: &str, callback: GeocodeCallback);
    fn get_address(&self, position: LngLat, callback: GeocodeCallback);
}

/// Interactive drawing tool bound to one map.
pub trait MouseTool: Send + Sync {
    fn open(&self, kind: DrawKind, options: &DrawOptions);
    fn close(&self);
    fn on_draw(&self, callback: DrawCallback);
    fn as_any(&self) -> &dyn Any;
}

/// The capability namespace a loaded provider exposes: the map constructor
/// plus every overlay/layer/tool constructor the service consumes.
pub trait Namespace: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Constructs the live map. `base_layers` is the already-normalized layer
    /// stack (empty means the provider default tile layer).
    fn new_map(
        &self,
        container_id: &str,
        config: &MapConfig,
        base_layers: Vec<Arc<dyn LayerHandle>>,
    ) -> Result<Arc<dyn MapHandle>>;

    fn marker(&self, options: &MarkerOptions) -> Arc<dyn OverlayHandle>;
    fn polyline(&self, options: &PolylineOptions) -> Arc<dyn OverlayHandle>;
    fn polygon(&self, options: &PolygonOptions) -> Arc<dyn OverlayHandle>;
    fn info_window(&self, options: &InfoWindowOptions) -> Arc<dyn OverlayHandle>;

    fn tile_layer(&self, options: &LayerOptions) -> Arc<dyn LayerHandle>;
    fn satellite_layer(&self) -> Arc<dyn LayerHandle>;
    fn road_net_layer(&self) -> Arc<dyn LayerHandle>;
    fn traffic_layer(&self, options: &LayerOptions) -> Arc<dyn LayerHandle>;
    fn buildings_layer(&self, options: &LayerOptions) -> Arc<dyn LayerHandle>;

    fn geocoder(&self) -> Arc<dyn Geocoder>;
    fn mouse_tool(&self, map: Arc<dyn MapHandle>) -> Arc<dyn MouseTool>;
}

/// One registered backend: credential validation plus namespace construction.
/// Adding a provider means adding an implementation of this trait, never a
/// string branch in shared logic.
#[async_trait]
pub trait ProviderBackend: Send + Sync + 'static {
    fn kind(&self) -> ProviderKind;

    /// Style defaults applied when overlay options omit style fields.
    fn defaults(&self) -> OverlayDefaults;

    /// Loads the capability. Fails with [`crate::MapError::ProviderLoad`] on
    /// invalid credentials.
    async fn load(&self, options: &ServiceOptions) -> Result<Arc<dyn Namespace>>;
}
