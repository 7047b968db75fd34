//! Generic map service implementation
//!
//! All backend-independent behavior lives here: overlay lifecycle and
//! defaults, camera and layer control, tracks and playback, rotation
//! semantics, the callback-to-future bridges and the destroy cascade.
//! Backend specifics (credential validation, namespace construction, style
//! defaults) come in through the [`ProviderBackend`] it is generic over.

use crate::animation::{StepTrackController, StepTrackOptions};
use crate::core::{
    config::{
        BaseLayerKind, DrawKind, DrawOptions, IconOptions, InfoWindowOptions, LayerOptions,
        MapConfig, MarkerOptions, OverlayDefaults, OverlayLayerKind, Pixel, PolygonOptions,
        PolylineOptions, ProviderKind, ServiceOptions, Size, TileMode, direction_angle,
    },
    geo::LngLat,
};
use crate::provider::{
    amap::Amap, bmap::Bmap, ClickHandler, GeocodeCallback, GeocodeEntry, GeocodeResponse,
    GeocodeStatus, LayerHandle, ListenerId, MapEventHandler, MapHandle, MapStatus, MouseTool,
    Namespace, OverlayHandle, ProviderBackend, ReverseGeocode,
};
use crate::service::{
    registry::{OverlayRegistry, StepTrack, Track},
    MapService,
};
use crate::{MapError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Service over the AMap backend.
pub type AmapService = ProviderService<Amap>;

/// Service over the Baidu backend.
pub type BmapService = ProviderService<Bmap>;

const DEFAULT_ROTATE_DURATION_MS: u64 = 300;

// Track composite styling, shared by static and stepped tracks.
const TRACK_STROKE_COLOR: &str = "#fff";
const TRACK_STROKE_WEIGHT: f64 = 4.0;
const TRACK_Z_INDEX: i32 = 50;
const TRACK_END_COLOR: &str = "#1890ff";
const START_DOT_DIAMETER: u32 = 16;
const END_DOT_DIAMETER: u32 = 22;
const CURRENT_DOT_DIAMETER: u32 = 12;

pub struct ProviderService<B: ProviderBackend> {
    backend: B,
    options: ServiceOptions,
    defaults: OverlayDefaults,
    namespace: Option<Arc<dyn Namespace>>,
    map: Option<Arc<dyn MapHandle>>,
    mouse_tool: Option<Arc<dyn MouseTool>>,
    registry: OverlayRegistry,
}

impl<B: ProviderBackend> ProviderService<B> {
    pub fn new(backend: B, options: ServiceOptions) -> Self {
        let defaults = backend.defaults();
        Self {
            backend,
            options,
            defaults,
            namespace: None,
            map: None,
            mouse_tool: None,
            registry: OverlayRegistry::new(),
        }
    }

    /// Registry introspection, mostly for hosts that mirror overlay state.
    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    fn handles(&self) -> Option<(Arc<dyn MapHandle>, Arc<dyn Namespace>)> {
        match (&self.map, &self.namespace) {
            (Some(map), Some(namespace)) => Some((map.clone(), namespace.clone())),
            _ => None,
        }
    }

    /// Installs a click handler that hands the overlay back to the host
    /// alongside the native event. The overlay is captured weakly; the sink
    /// lives on the overlay itself and must not keep it alive.
    fn wire_click(overlay: &Arc<dyn OverlayHandle>, handler: ClickHandler) {
        let weak = Arc::downgrade(overlay);
        overlay.set_click_handler(Arc::new(move |event| {
            if let Some(overlay) = weak.upgrade() {
                handler(event, overlay);
            }
        }));
    }

    fn dot_marker(
        namespace: &Arc<dyn Namespace>,
        position: LngLat,
        color: &str,
        diameter: u32,
    ) -> Arc<dyn OverlayHandle> {
        let half = (diameter / 2) as i32;
        namespace.marker(&MarkerOptions {
            position,
            icon: Some(IconOptions {
                image: String::new(),
                size: Some(Size::new(diameter, diameter)),
            }),
            offset: Some(Pixel::new(-half, -half)),
            ext_data: Some(serde_json::json!({
                "color": color,
                "diameter": diameter,
            })),
            ..Default::default()
        })
    }

    fn track_polyline(
        namespace: &Arc<dyn Namespace>,
        path: &[LngLat],
    ) -> Arc<dyn OverlayHandle> {
        namespace.polyline(&PolylineOptions {
            path: path.to_vec(),
            stroke_color: Some(TRACK_STROKE_COLOR.to_string()),
            stroke_weight: Some(TRACK_STROKE_WEIGHT),
            stroke_opacity: Some(1.0),
            z_index: Some(TRACK_Z_INDEX),
            ..Default::default()
        })
    }

    /// Single-shot bridge over a callback-style geocoder call: resolves or
    /// rejects exactly once and ignores any further provider invocations.
    async fn geocode_bridge<F>(invoke: F) -> Result<GeocodeResponse>
    where
        F: FnOnce(GeocodeCallback),
    {
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        invoke(Box::new(move |status, response| {
            if let Some(tx) = tx.take() {
                let _ = tx.send((status, response));
            }
        }));

        let (status, response) = rx
            .await
            .map_err(|_| MapError::Geocoding("geocoder never completed".to_string()))?;
        if status == GeocodeStatus::Complete && response.info == "OK" {
            Ok(response)
        } else {
            Err(MapError::Geocoding(response.info))
        }
    }
}

#[async_trait]
impl<B: ProviderBackend> MapService for ProviderService<B> {
    fn provider(&self) -> ProviderKind {
        self.backend.kind()
    }

    fn is_ready(&self) -> bool {
        self.map.is_some()
    }

    fn map(&self) -> Option<Arc<dyn MapHandle>> {
        self.map.clone()
    }

    async fn init_map(
        &mut self,
        container_id: &str,
        config: MapConfig,
    ) -> Result<Arc<dyn MapHandle>> {
        log::info!("{}: initializing map in '{}'", self.backend.kind(), container_id);
        let namespace = self.backend.load(&self.options).await.map_err(|err| {
            log::error!("{}: capability load failed: {}", self.backend.kind(), err);
            err
        })?;

        // Expand the logical satellite mode into the concrete layer pair
        // before construction so callers never name provider layer classes.
        let base_layers = match config.tile_mode {
            TileMode::Normal => vec![namespace.tile_layer(&LayerOptions::default())],
            TileMode::Satellite => {
                vec![namespace.satellite_layer(), namespace.road_net_layer()]
            }
        };

        let map = namespace.new_map(container_id, &config, base_layers)?;
        self.namespace = Some(namespace);
        self.map = Some(map.clone());
        Ok(map)
    }

    fn add_marker(&mut self, mut options: MarkerOptions) -> Option<Arc<dyn OverlayHandle>> {
        let (map, namespace) = match self.handles() {
            Some(handles) => handles,
            None => {
                log::warn!("map not initialized, call init_map first");
                return None;
            }
        };

        if options.icon.is_none() {
            log::debug!("using default marker icon");
            options.icon = Some(IconOptions {
                image: self.defaults.marker_icon.clone(),
                size: None,
            });
        }
        if options.offset.is_none() {
            options.offset = Some(Pixel::new(0, 0));
        }

        let on_click = options.on_click.take();
        let marker = namespace.marker(&options);
        if let Some(on_click) = on_click {
            Self::wire_click(&marker, on_click);
        }

        map.add_overlay(marker.clone());
        self.registry.push_marker(marker.clone());
        Some(marker)
    }

    fn add_markers(&mut self, options: Vec<MarkerOptions>) -> Vec<Option<Arc<dyn OverlayHandle>>> {
        options.into_iter().map(|o| self.add_marker(o)).collect()
    }

    fn remove_marker(&mut self, marker: &Arc<dyn OverlayHandle>) {
        let Some(map) = self.map.clone() else { return };
        map.remove_overlay(marker);
        self.registry.remove_marker(marker);
    }

    fn clear_markers(&mut self) {
        let Some(map) = self.map.clone() else { return };
        for marker in self.registry.take_markers() {
            map.remove_overlay(&marker);
        }
    }

    fn add_polyline(&mut self, mut options: PolylineOptions) -> Option<Arc<dyn OverlayHandle>> {
        let (map, namespace) = self.handles()?;

        if options.stroke_color.is_none() {
            options.stroke_color = Some(self.defaults.polyline_stroke_color.clone());
        }
        if options.stroke_weight.is_none() {
            options.stroke_weight = Some(self.defaults.polyline_stroke_weight);
        }
        if options.stroke_opacity.is_none() {
            options.stroke_opacity = Some(self.defaults.polyline_stroke_opacity);
        }

        let on_click = options.on_click.take();
        let polyline = namespace.polyline(&options);
        if let Some(on_click) = on_click {
            Self::wire_click(&polyline, on_click);
        }

        map.add_overlay(polyline.clone());
        self.registry.push_polyline(polyline.clone());
        Some(polyline)
    }

    fn remove_polyline(&mut self, polyline: &Arc<dyn OverlayHandle>) {
        let Some(map) = self.map.clone() else { return };
        map.remove_overlay(polyline);
        self.registry.remove_polyline(polyline);
    }

    fn clear_polylines(&mut self) {
        let Some(map) = self.map.clone() else { return };
        for polyline in self.registry.take_polylines() {
            map.remove_overlay(&polyline);
        }
    }

    fn add_polygon(&mut self, mut options: PolygonOptions) -> Option<Arc<dyn OverlayHandle>> {
        let (map, namespace) = self.handles()?;

        if options.fill_color.is_none() {
            options.fill_color = Some(self.defaults.polygon_fill_color.clone());
        }
        if options.fill_opacity.is_none() {
            options.fill_opacity = Some(self.defaults.polygon_fill_opacity);
        }
        if options.stroke_color.is_none() {
            options.stroke_color = Some(self.defaults.polygon_stroke_color.clone());
        }
        if options.stroke_weight.is_none() {
            options.stroke_weight = Some(self.defaults.polygon_stroke_weight);
        }

        let on_click = options.on_click.take();
        let polygon = namespace.polygon(&options);
        if let Some(on_click) = on_click {
            Self::wire_click(&polygon, on_click);
        }

        map.add_overlay(polygon.clone());
        self.registry.push_polygon(polygon.clone());
        Some(polygon)
    }

    fn remove_polygon(&mut self, polygon: &Arc<dyn OverlayHandle>) {
        let Some(map) = self.map.clone() else { return };
        map.remove_overlay(polygon);
        self.registry.remove_polygon(polygon);
    }

    fn clear_polygons(&mut self) {
        let Some(map) = self.map.clone() else { return };
        for polygon in self.registry.take_polygons() {
            map.remove_overlay(&polygon);
        }
    }

    fn add_info_window(&mut self, mut options: InfoWindowOptions) -> Option<Arc<dyn OverlayHandle>> {
        let (map, namespace) = self.handles()?;

        if options.offset.is_none() {
            options.offset = Some(self.defaults.info_window_offset);
        }

        let info_window = namespace.info_window(&options);
        map.add_overlay(info_window.clone());
        self.registry.push_info_window(info_window.clone());
        Some(info_window)
    }

    fn remove_info_window(&mut self, info_window: &Arc<dyn OverlayHandle>) {
        let Some(map) = self.map.clone() else { return };
        map.remove_overlay(info_window);
        self.registry.remove_info_window(info_window);
    }

    fn clear_info_windows(&mut self) {
        let Some(map) = self.map.clone() else { return };
        for info_window in self.registry.take_info_windows() {
            map.remove_overlay(&info_window);
        }
    }

    fn clear_all_overlays(&mut self) {
        self.clear_markers();
        self.clear_polylines();
        self.clear_polygons();
        self.clear_info_windows();
        self.clear_tracks();
        self.clear_step_tracks();
        self.clear_overlay_layers();
    }

    fn set_center(&mut self, center: LngLat) {
        if let Some(map) = &self.map {
            map.set_center(center);
        }
    }

    fn set_zoom(&mut self, zoom: f64) {
        if let Some(map) = &self.map {
            map.set_zoom(zoom);
        }
    }

    fn fit_view(&mut self, positions: &[Option<LngLat>], padding: u32, duration_ms: u64) {
        let Some(map) = &self.map else { return };
        if positions.is_empty() {
            return;
        }
        let filtered: Vec<LngLat> = positions.iter().flatten().copied().collect();
        map.set_fit_view(&filtered, padding, false, [60, 60, 60, 60], duration_ms);
    }

    fn switch_base_layer(&mut self, kind: BaseLayerKind) {
        let Some((map, namespace)) = self.handles() else { return };
        let layers = match kind {
            BaseLayerKind::Satellite => {
                vec![namespace.satellite_layer(), namespace.road_net_layer()]
            }
            BaseLayerKind::RoadNet => vec![namespace.road_net_layer()],
            BaseLayerKind::Normal => vec![namespace.tile_layer(&LayerOptions::default())],
        };
        map.set_layers(layers);
    }

    fn add_overlay_layer(
        &mut self,
        kind: OverlayLayerKind,
        options: LayerOptions,
    ) -> Option<Arc<dyn LayerHandle>> {
        let (map, namespace) = self.handles()?;
        let layer = match kind {
            OverlayLayerKind::Traffic => namespace.traffic_layer(&options),
            OverlayLayerKind::Buildings => namespace.buildings_layer(&options),
            OverlayLayerKind::Custom => namespace.tile_layer(&options),
        };
        map.add_layer(layer.clone());
        self.registry.push_layer(layer.clone());
        Some(layer)
    }

    fn remove_overlay_layer(&mut self, layer: &Arc<dyn LayerHandle>) {
        let Some(map) = self.map.clone() else { return };
        map.remove_layer(layer);
        self.registry.remove_layer(layer);
    }

    fn clear_overlay_layers(&mut self) {
        let Some(map) = self.map.clone() else { return };
        for layer in self.registry.take_layers() {
            map.remove_layer(&layer);
        }
    }

    fn add_track(&mut self, path: &[LngLat]) -> Option<Track> {
        let (map, namespace) = self.handles()?;
        if path.len() < 2 {
            return None;
        }

        let polyline = Self::track_polyline(&namespace, path);
        let start_marker =
            Self::dot_marker(&namespace, path[0], "#ffffff", START_DOT_DIAMETER);
        let end_marker = Self::dot_marker(
            &namespace,
            path[path.len() - 1],
            TRACK_END_COLOR,
            END_DOT_DIAMETER,
        );

        map.add_overlay(polyline.clone());
        map.add_overlay(start_marker.clone());
        map.add_overlay(end_marker.clone());

        let track = Track {
            polyline,
            start_marker,
            end_marker,
            path: path.to_vec(),
        };
        self.registry.push_track(track.clone());
        Some(track)
    }

    fn remove_track(&mut self, track: &Track) {
        let Some(map) = self.map.clone() else { return };
        map.remove_overlay(&track.polyline);
        map.remove_overlay(&track.start_marker);
        map.remove_overlay(&track.end_marker);
        self.registry.remove_track(track);
    }

    fn clear_tracks(&mut self) {
        let Some(map) = self.map.clone() else { return };
        for track in self.registry.take_tracks() {
            map.remove_overlay(&track.polyline);
            map.remove_overlay(&track.start_marker);
            map.remove_overlay(&track.end_marker);
        }
    }

    fn create_track_step_by_step(
        &mut self,
        path: &[LngLat],
        options: StepTrackOptions,
    ) -> Option<StepTrackController> {
        let (map, namespace) = self.handles()?;
        if path.len() < 2 {
            return None;
        }

        // Same styling as a full track; only the first point is revealed.
        let polyline = Self::track_polyline(&namespace, &path[..1]);
        let start_marker =
            Self::dot_marker(&namespace, path[0], "#ffffff", START_DOT_DIAMETER);
        let end_marker = Self::dot_marker(
            &namespace,
            path[path.len() - 1],
            TRACK_END_COLOR,
            END_DOT_DIAMETER,
        );
        end_marker.hide();
        let current_marker =
            Self::dot_marker(&namespace, path[0], TRACK_END_COLOR, CURRENT_DOT_DIAMETER);

        map.add_overlay(polyline.clone());
        map.add_overlay(start_marker.clone());
        map.add_overlay(end_marker.clone());
        map.add_overlay(current_marker.clone());

        let controller = StepTrackController::new(
            map,
            polyline.clone(),
            start_marker.clone(),
            end_marker.clone(),
            current_marker.clone(),
            path.to_vec(),
            options,
        );

        self.registry.push_step_track(StepTrack {
            polyline,
            start_marker,
            end_marker,
            current_marker,
            controller: controller.clone(),
            path: path.to_vec(),
        });
        Some(controller)
    }

    fn clear_step_tracks(&mut self) {
        if self.map.is_none() {
            return;
        }
        for step_track in self.registry.take_step_tracks() {
            step_track.controller.destroy();
        }
    }

    fn set_rotation(&mut self, angle: f64, animate: bool, duration_ms: u64) {
        let Some(map) = &self.map else { return };
        if animate {
            let current = map.rotation();
            map.set_rotation(current + angle, true, duration_ms);
        } else {
            map.set_rotation(angle, false, 0);
        }
    }

    fn rotation(&self) -> f64 {
        self.map.as_ref().map(|m| m.rotation()).unwrap_or(0.0)
    }

    fn rotate_to_direction(&mut self, direction: &str, animate: bool) {
        let Some(map) = &self.map else { return };
        // Directions are absolute headings, so this bypasses the delta
        // semantics of set_rotation.
        let angle = direction_angle(direction);
        map.set_rotation(angle, animate, DEFAULT_ROTATE_DURATION_MS);
    }

    fn enable_rotation(&mut self, enabled: bool) {
        let Some(map) = &self.map else { return };
        map.set_status(MapStatus {
            rotate_enable: Some(enabled),
            ..Default::default()
        });
    }

    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeEntry>> {
        let namespace = self.namespace.clone().ok_or(MapError::NotInitialized)?;
        let geocoder = namespace.geocoder();
        let response =
            Self::geocode_bridge(|callback| geocoder.get_location(address, callback)).await?;
        Ok(response.geocodes)
    }

    async fn reverse_geocode(&self, position: LngLat) -> Result<ReverseGeocode> {
        let namespace = self.namespace.clone().ok_or(MapError::NotInitialized)?;
        let geocoder = namespace.geocoder();
        let response =
            Self::geocode_bridge(|callback| geocoder.get_address(position, callback)).await?;
        response
            .regeocode
            .ok_or_else(|| MapError::Geocoding("empty regeocode result".to_string()))
    }

    fn mouse_tool(&mut self) -> Option<Arc<dyn MouseTool>> {
        if self.mouse_tool.is_none() {
            let (map, namespace) = match self.handles() {
                Some(handles) => handles,
                None => {
                    log::warn!("map not initialized, call init_map first");
                    return None;
                }
            };
            self.mouse_tool = Some(namespace.mouse_tool(map));
        }
        self.mouse_tool.clone()
    }

    async fn draw(
        &mut self,
        kind: DrawKind,
        options: DrawOptions,
    ) -> Result<Arc<dyn OverlayHandle>> {
        let map = self.map.clone().ok_or(MapError::NotInitialized)?;
        let tool = self.mouse_tool().ok_or(MapError::NotInitialized)?;

        map.set_default_cursor("crosshair");

        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        tool.on_draw(Box::new(move |overlay| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(overlay);
            }
        }));
        tool.open(kind, &options);

        rx.await.map_err(|_| MapError::DrawInterrupted)
    }

    fn close_draw(&mut self) {
        let Some(tool) = &self.mouse_tool else { return };
        if let Some(map) = &self.map {
            map.set_default_cursor("default");
        }
        tool.close();
    }

    fn on_map_event(&mut self, event: &str, handler: MapEventHandler) -> Option<ListenerId> {
        self.map.as_ref().map(|map| map.on(event, handler))
    }

    fn off_map_event(&mut self, event: &str, listener: ListenerId) {
        if let Some(map) = &self.map {
            map.off(event, listener);
        }
    }

    fn destroy_map(&mut self) {
        if self.map.is_none() {
            return;
        }

        self.clear_all_overlays();
        self.close_draw();

        if let Some(map) = self.map.take() {
            map.destroy();
        }
        self.namespace = None;
        self.mouse_tool = None;
        log::info!("{}: map destroyed", self.backend.kind());
    }
}
