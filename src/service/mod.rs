//! Map service layer
//!
//! [`MapService`] is the host-facing contract: one object per live map that
//! owns the overlay registry and every animation controller it has spawned.
//! [`ProviderService`] implements the contract once, generically over a
//! [`crate::provider::ProviderBackend`]; the factory hides the generic behind
//! `Box<dyn MapService>`.

pub mod base;
pub mod factory;
pub mod registry;

pub use base::{AmapService, BmapService, ProviderService};
pub use factory::MapServiceFactory;
pub use registry::{OverlayRegistry, StepTrack, Track};

use crate::animation::{StepTrackController, StepTrackOptions};
use crate::core::{
    config::{
        BaseLayerKind, DrawKind, DrawOptions, InfoWindowOptions, LayerOptions, MapConfig,
        MarkerOptions, OverlayLayerKind, PolygonOptions, PolylineOptions, ProviderKind,
    },
    geo::LngLat,
};
use crate::provider::{
    GeocodeEntry, LayerHandle, ListenerId, MapEventHandler, MapHandle, MouseTool, OverlayHandle,
    ReverseGeocode,
};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One live map and everything attached to it.
///
/// Overlay operations before a successful [`init_map`](Self::init_map) return
/// `None` (or are silent no-ops) rather than failing: UI code commonly races
/// initialization, and a missing overlay is recoverable where a panic or an
/// error channel is not. Asynchronous entry points (`init_map`, `geocode`,
/// `reverse_geocode`, `draw`) report failures through `Result` instead.
///
/// Calling `init_map` twice without an intervening
/// [`destroy_map`](Self::destroy_map) leaks the first map instance; prior
/// handles are overwritten, not merged.
#[async_trait]
pub trait MapService: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// True once `init_map` has resolved and until `destroy_map`.
    fn is_ready(&self) -> bool;

    /// The live map handle, if initialized.
    fn map(&self) -> Option<Arc<dyn MapHandle>>;

    /// Loads the provider capability and constructs the live map.
    async fn init_map(&mut self, container_id: &str, config: MapConfig)
        -> Result<Arc<dyn MapHandle>>;

    fn add_marker(&mut self, options: MarkerOptions) -> Option<Arc<dyn OverlayHandle>>;

    /// Maps [`add_marker`](Self::add_marker) over the input in order; the
    /// result is parallel to the input, `None`s included.
    fn add_markers(&mut self, options: Vec<MarkerOptions>) -> Vec<Option<Arc<dyn OverlayHandle>>>;

    fn remove_marker(&mut self, marker: &Arc<dyn OverlayHandle>);
    fn clear_markers(&mut self);

    fn add_polyline(&mut self, options: PolylineOptions) -> Option<Arc<dyn OverlayHandle>>;
    fn remove_polyline(&mut self, polyline: &Arc<dyn OverlayHandle>);
    fn clear_polylines(&mut self);

    fn add_polygon(&mut self, options: PolygonOptions) -> Option<Arc<dyn OverlayHandle>>;
    fn remove_polygon(&mut self, polygon: &Arc<dyn OverlayHandle>);
    fn clear_polygons(&mut self);

    fn add_info_window(&mut self, options: InfoWindowOptions) -> Option<Arc<dyn OverlayHandle>>;
    fn remove_info_window(&mut self, info_window: &Arc<dyn OverlayHandle>);
    fn clear_info_windows(&mut self);

    /// Full reset: every overlay kind, tracks and step tracks (their
    /// controllers destroyed, not merely stopped) and overlay layers.
    fn clear_all_overlays(&mut self);

    fn set_center(&mut self, center: LngLat);
    fn set_zoom(&mut self, zoom: f64);

    /// Auto-fits the view to `positions`, skipping `None` entries. A no-op on
    /// an empty slice or before initialization.
    fn fit_view(&mut self, positions: &[Option<LngLat>], padding: u32, duration_ms: u64);

    /// Replaces the base layer stack atomically.
    fn switch_base_layer(&mut self, kind: BaseLayerKind);

    fn add_overlay_layer(
        &mut self,
        kind: OverlayLayerKind,
        options: LayerOptions,
    ) -> Option<Arc<dyn LayerHandle>>;
    fn remove_overlay_layer(&mut self, layer: &Arc<dyn LayerHandle>);
    fn clear_overlay_layers(&mut self);

    /// Draws a full track: white polyline plus start and end markers.
    /// Returns `None` for paths shorter than two points.
    fn add_track(&mut self, path: &[LngLat]) -> Option<Track>;
    fn remove_track(&mut self, track: &Track);
    fn clear_tracks(&mut self);

    /// Builds an incrementally revealed track and returns its controller in
    /// the Idle state. `None` for paths shorter than two points.
    fn create_track_step_by_step(
        &mut self,
        path: &[LngLat],
        options: StepTrackOptions,
    ) -> Option<StepTrackController>;
    fn clear_step_tracks(&mut self);

    /// With `animate`, `angle` is a delta added to the current rotation and
    /// applied over `duration_ms`; otherwise it is set absolutely with no
    /// transition.
    fn set_rotation(&mut self, angle: f64, animate: bool, duration_ms: u64);
    fn rotation(&self) -> f64;

    /// Rotates to an absolute compass direction (north/east/south/west,
    /// case-insensitive; anything else means north).
    fn rotate_to_direction(&mut self, direction: &str, animate: bool);
    fn enable_rotation(&mut self, enabled: bool);

    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeEntry>>;
    async fn reverse_geocode(&self, position: LngLat) -> Result<ReverseGeocode>;

    /// The drawing tool, created lazily. `None` before initialization.
    fn mouse_tool(&mut self) -> Option<Arc<dyn MouseTool>>;

    /// Opens a drawing mode and resolves with the drawn overlay.
    async fn draw(&mut self, kind: DrawKind, options: DrawOptions)
        -> Result<Arc<dyn OverlayHandle>>;
    fn close_draw(&mut self);

    fn on_map_event(&mut self, event: &str, handler: MapEventHandler) -> Option<ListenerId>;
    fn off_map_event(&mut self, event: &str, listener: ListenerId);

    /// Tears everything down: cascades through the registry (including
    /// running animations), destroys the vendor map and returns the service
    /// to its uninitialized state. A no-op when not initialized.
    fn destroy_map(&mut self);
}
