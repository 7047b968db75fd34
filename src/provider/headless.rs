//! Headless capability implementation
//!
//! Tracks the state a live vendor map would hold (camera, rotation, layer
//! stack, attached overlays, listeners, cursor) without rendering anything.
//! It backs the shipped `amap`/`bmap` namespaces and doubles as the test
//! double for the whole service layer; hosts embedding a real engine
//! implement the `provider` traits themselves instead.

use crate::core::{
    config::{
        DrawKind, DrawOptions, InfoWindowOptions, LayerOptions, MapConfig, MarkerOptions,
        PolygonOptions, PolylineOptions, ProviderKind,
    },
    geo::{path_center, LngLat},
};
use crate::provider::{
    ClickEvent, DrawCallback, Geocoder, LayerHandle, LayerKind, ListenerId, MapEvent,
    MapEventHandler, MapHandle, MapStatus, MouseTool, Namespace, OverlayClickSink, OverlayHandle,
    OverlayKind,
};
use crate::{MapError, Result};
use fxhash::FxHashMap as HashMap;
use std::any::Any;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct OverlayState {
    position: Option<LngLat>,
    path: Vec<LngLat>,
    visible: bool,
    click: Option<OverlayClickSink>,
    ext_data: Option<serde_json::Value>,
}

/// State-tracking overlay handle. The style it was constructed with is kept
/// as a snapshot so hosts and tests can inspect what the vendor would have
/// received.
pub struct HeadlessOverlay {
    kind: OverlayKind,
    style: serde_json::Value,
    state: Mutex<OverlayState>,
}

impl HeadlessOverlay {
    fn new(kind: OverlayKind, style: serde_json::Value, state: OverlayState) -> Arc<Self> {
        Arc::new(Self {
            kind,
            style,
            state: Mutex::new(state),
        })
    }

    pub fn from_marker(options: &MarkerOptions) -> Arc<Self> {
        let style = serde_json::json!({
            "icon": options.icon,
            "offset": options.offset,
            "draggable": options.draggable,
            "label": options.label,
        });
        Self::new(
            OverlayKind::Marker,
            style,
            OverlayState {
                position: Some(options.position),
                visible: true,
                ext_data: options.ext_data.clone(),
                ..Default::default()
            },
        )
    }

    pub fn from_polyline(options: &PolylineOptions) -> Arc<Self> {
        let style = serde_json::json!({
            "strokeColor": options.stroke_color,
            "strokeWeight": options.stroke_weight,
            "strokeOpacity": options.stroke_opacity,
            "strokeStyle": options.stroke_style,
            "zIndex": options.z_index,
        });
        Self::new(
            OverlayKind::Polyline,
            style,
            OverlayState {
                path: options.path.clone(),
                visible: true,
                ext_data: options.ext_data.clone(),
                ..Default::default()
            },
        )
    }

    pub fn from_polygon(options: &PolygonOptions) -> Arc<Self> {
        let style = serde_json::json!({
            "fillColor": options.fill_color,
            "fillOpacity": options.fill_opacity,
            "strokeColor": options.stroke_color,
            "strokeWeight": options.stroke_weight,
            "strokeStyle": options.stroke_style,
        });
        Self::new(
            OverlayKind::Polygon,
            style,
            OverlayState {
                path: options.path.clone(),
                visible: true,
                ext_data: options.ext_data.clone(),
                ..Default::default()
            },
        )
    }

    pub fn from_info_window(options: &InfoWindowOptions) -> Arc<Self> {
        let style = serde_json::json!({
            "content": options.content,
            "offset": options.offset,
            "isCustom": options.is_custom,
            "autoClose": options.auto_close,
            "closeWhenClickMap": options.close_when_click_map,
        });
        Self::new(
            OverlayKind::InfoWindow,
            style,
            OverlayState {
                position: Some(options.position),
                visible: true,
                ..Default::default()
            },
        )
    }

    /// Constructor-time style snapshot.
    pub fn style(&self) -> &serde_json::Value {
        &self.style
    }

    /// Delivers a click to the registered handler, if any. The handler is
    /// invoked outside the state lock so it may call back into the service.
    pub fn emit_click(&self, event: ClickEvent) {
        let handler = self.state.lock().unwrap().click.clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }
}

impl OverlayHandle for HeadlessOverlay {
    fn kind(&self) -> OverlayKind {
        self.kind
    }

    fn position(&self) -> Option<LngLat> {
        self.state.lock().unwrap().position
    }

    fn set_position(&self, position: LngLat) {
        self.state.lock().unwrap().position = Some(position);
    }

    fn path(&self) -> Vec<LngLat> {
        self.state.lock().unwrap().path.clone()
    }

    fn set_path(&self, path: &[LngLat]) {
        self.state.lock().unwrap().path = path.to_vec();
    }

    fn is_visible(&self) -> bool {
        self.state.lock().unwrap().visible
    }

    fn show(&self) {
        self.state.lock().unwrap().visible = true;
    }

    fn hide(&self) {
        self.state.lock().unwrap().visible = false;
    }

    fn set_click_handler(&self, handler: OverlayClickSink) {
        self.state.lock().unwrap().click = Some(handler);
    }

    fn ext_data(&self) -> Option<serde_json::Value> {
        self.state.lock().unwrap().ext_data.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// State-tracking layer handle.
pub struct HeadlessLayer {
    kind: LayerKind,
    options: LayerOptions,
}

impl HeadlessLayer {
    pub fn new(kind: LayerKind, options: LayerOptions) -> Arc<Self> {
        Arc::new(Self { kind, options })
    }
}

impl LayerHandle for HeadlessLayer {
    fn kind(&self) -> LayerKind {
        self.kind
    }

    fn options(&self) -> LayerOptions {
        self.options.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MapState {
    center: Option<LngLat>,
    zoom: f64,
    rotation: f64,
    overlays: Vec<Arc<dyn OverlayHandle>>,
    layers: Vec<Arc<dyn LayerHandle>>,
    rotate_enable: bool,
    drag_enable: bool,
    zoom_enable: bool,
    cursor: String,
    destroyed: bool,
    listeners: HashMap<String, Vec<(ListenerId, MapEventHandler)>>,
    next_listener: ListenerId,
}

/// State-tracking live map.
pub struct HeadlessMap {
    state: Mutex<MapState>,
}

impl HeadlessMap {
    pub fn new(config: &MapConfig, base_layers: Vec<Arc<dyn LayerHandle>>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MapState {
                center: config.center,
                zoom: config.zoom.unwrap_or(10.0),
                rotation: config.rotation.unwrap_or(0.0),
                overlays: Vec::new(),
                layers: base_layers,
                rotate_enable: false,
                drag_enable: true,
                zoom_enable: true,
                cursor: "default".to_string(),
                destroyed: false,
                listeners: HashMap::default(),
                next_listener: 1,
            }),
        })
    }

    pub fn cursor(&self) -> String {
        self.state.lock().unwrap().cursor.clone()
    }

    pub fn rotate_enabled(&self) -> bool {
        self.state.lock().unwrap().rotate_enable
    }

    /// Delivers a map event to every listener registered for `name`.
    pub fn emit_event(&self, event: MapEvent) {
        let handlers: Vec<MapEventHandler> = {
            let state = self.state.lock().unwrap();
            state
                .listeners
                .get(&event.name)
                .map(|entries| entries.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };
        for handler in handlers {
            handler(event.clone());
        }
    }
}

impl MapHandle for HeadlessMap {
    fn add_overlay(&self, overlay: Arc<dyn OverlayHandle>) {
        let mut state = self.state.lock().unwrap();
        if state.destroyed {
            return;
        }
        state.overlays.push(overlay);
    }

    fn remove_overlay(&self, overlay: &Arc<dyn OverlayHandle>) {
        let mut state = self.state.lock().unwrap();
        state.overlays.retain(|o| !Arc::ptr_eq(o, overlay));
    }

    fn overlays(&self) -> Vec<Arc<dyn OverlayHandle>> {
        self.state.lock().unwrap().overlays.clone()
    }

    fn set_center(&self, center: LngLat) {
        self.state.lock().unwrap().center = Some(center);
    }

    fn center(&self) -> Option<LngLat> {
        self.state.lock().unwrap().center
    }

    fn set_zoom(&self, zoom: f64) {
        self.state.lock().unwrap().zoom = zoom;
    }

    fn zoom(&self) -> f64 {
        self.state.lock().unwrap().zoom
    }

    fn set_fit_view(
        &self,
        positions: &[LngLat],
        _padding: u32,
        _immediate: bool,
        _edge_insets: [u32; 4],
        _duration_ms: u64,
    ) {
        // Without a projection the best headless approximation of the
        // vendor's auto-fit is to recenter on the bounding box.
        if let Some(center) = path_center(positions) {
            self.state.lock().unwrap().center = Some(center);
        }
    }

    fn set_layers(&self, layers: Vec<Arc<dyn LayerHandle>>) {
        self.state.lock().unwrap().layers = layers;
    }

    fn layers(&self) -> Vec<Arc<dyn LayerHandle>> {
        self.state.lock().unwrap().layers.clone()
    }

    fn add_layer(&self, layer: Arc<dyn LayerHandle>) {
        self.state.lock().unwrap().layers.push(layer);
    }

    fn remove_layer(&self, layer: &Arc<dyn LayerHandle>) {
        let mut state = self.state.lock().unwrap();
        state.layers.retain(|l| !Arc::ptr_eq(l, layer));
    }

    fn set_rotation(&self, angle: f64, _animated: bool, _duration_ms: u64) {
        // Transitions are a vendor concern; headless state jumps to the target.
        self.state.lock().unwrap().rotation = angle;
    }

    fn rotation(&self) -> f64 {
        self.state.lock().unwrap().rotation
    }

    fn set_status(&self, status: MapStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(flag) = status.rotate_enable {
            state.rotate_enable = flag;
        }
        if let Some(flag) = status.drag_enable {
            state.drag_enable = flag;
        }
        if let Some(flag) = status.zoom_enable {
            state.zoom_enable = flag;
        }
    }

    fn set_default_cursor(&self, cursor: &str) {
        self.state.lock().unwrap().cursor = cursor.to_string();
    }

    fn on(&self, event: &str, handler: MapEventHandler) -> ListenerId {
        let mut state = self.state.lock().unwrap();
        let id = state.next_listener;
        state.next_listener += 1;
        state
            .listeners
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    fn off(&self, event: &str, listener: ListenerId) {
        let mut state = self.state.lock().unwrap();
        if let Some(entries) = state.listeners.get_mut(event) {
            entries.retain(|(id, _)| *id != listener);
        }
    }

    fn destroy(&self) {
        let mut state = self.state.lock().unwrap();
        state.overlays.clear();
        state.layers.clear();
        state.listeners.clear();
        state.destroyed = true;
    }

    fn is_destroyed(&self) -> bool {
        self.state.lock().unwrap().destroyed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MouseToolState {
    active: Option<DrawKind>,
    callback: Option<DrawCallback>,
}

/// Drawing tool whose completion events are injected by the host (or a test)
/// through [`HeadlessMouseTool::finish`].
pub struct HeadlessMouseTool {
    map: Arc<dyn MapHandle>,
    state: Mutex<MouseToolState>,
}

impl HeadlessMouseTool {
    pub fn new(map: Arc<dyn MapHandle>) -> Arc<Self> {
        Arc::new(Self {
            map,
            state: Mutex::new(MouseToolState {
                active: None,
                callback: None,
            }),
        })
    }

    pub fn active_kind(&self) -> Option<DrawKind> {
        self.state.lock().unwrap().active
    }

    /// Completes the active drawing: attaches the shape to the map and fires
    /// the registered draw callback once.
    pub fn finish(&self, overlay: Arc<dyn OverlayHandle>) {
        let callback = {
            let mut state = self.state.lock().unwrap();
            if state.active.take().is_none() {
                return;
            }
            state.callback.take()
        };
        self.map.add_overlay(overlay.clone());
        if let Some(mut callback) = callback {
            callback(overlay);
        }
    }
}

impl MouseTool for HeadlessMouseTool {
    fn open(&self, kind: DrawKind, _options: &DrawOptions) {
        self.state.lock().unwrap().active = Some(kind);
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.active = None;
        state.callback = None;
    }

    fn on_draw(&self, callback: DrawCallback) {
        self.state.lock().unwrap().callback = Some(callback);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Capability namespace over the headless handles. The geocoder is supplied
/// by the backend so each provider keeps its own REST adaptation.
pub struct HeadlessNamespace {
    provider: ProviderKind,
    geocoder: Arc<dyn Geocoder>,
}

impl HeadlessNamespace {
    pub fn new(provider: ProviderKind, geocoder: Arc<dyn Geocoder>) -> Arc<Self> {
        Arc::new(Self { provider, geocoder })
    }
}

impl Namespace for HeadlessNamespace {
    fn provider(&self) -> ProviderKind {
        self.provider
    }

    fn new_map(
        &self,
        container_id: &str,
        config: &MapConfig,
        base_layers: Vec<Arc<dyn LayerHandle>>,
    ) -> Result<Arc<dyn MapHandle>> {
        if container_id.trim().is_empty() {
            return Err(MapError::ProviderInit(format!(
                "{}: map container id is empty",
                self.provider
            )));
        }
        Ok(HeadlessMap::new(config, base_layers))
    }

    fn marker(&self, options: &MarkerOptions) -> Arc<dyn OverlayHandle> {
        HeadlessOverlay::from_marker(options)
    }

    fn polyline(&self, options: &PolylineOptions) -> Arc<dyn OverlayHandle> {
        HeadlessOverlay::from_polyline(options)
    }

    fn polygon(&self, options: &PolygonOptions) -> Arc<dyn OverlayHandle> {
        HeadlessOverlay::from_polygon(options)
    }

    fn info_window(&self, options: &InfoWindowOptions) -> Arc<dyn OverlayHandle> {
        HeadlessOverlay::from_info_window(options)
    }

    fn tile_layer(&self, options: &LayerOptions) -> Arc<dyn LayerHandle> {
        let kind = if options.tile_url.is_some() {
            LayerKind::Custom
        } else {
            LayerKind::Tile
        };
        HeadlessLayer::new(kind, options.clone())
    }

    fn satellite_layer(&self) -> Arc<dyn LayerHandle> {
        HeadlessLayer::new(LayerKind::Satellite, LayerOptions::default())
    }

    fn road_net_layer(&self) -> Arc<dyn LayerHandle> {
        HeadlessLayer::new(LayerKind::RoadNet, LayerOptions::default())
    }

    fn traffic_layer(&self, options: &LayerOptions) -> Arc<dyn LayerHandle> {
        HeadlessLayer::new(LayerKind::Traffic, options.clone())
    }

    fn buildings_layer(&self, options: &LayerOptions) -> Arc<dyn LayerHandle> {
        HeadlessLayer::new(LayerKind::Buildings, options.clone())
    }

    fn geocoder(&self) -> Arc<dyn Geocoder> {
        self.geocoder.clone()
    }

    fn mouse_tool(&self, map: Arc<dyn MapHandle>) -> Arc<dyn MouseTool> {
        HeadlessMouseTool::new(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_overlay_click_dispatch() {
        let marker = HeadlessOverlay::from_marker(&MarkerOptions::at(LngLat::new(1.0, 2.0)));
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        marker.set_click_handler(Arc::new(move |_event| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        }));

        marker.emit_click(ClickEvent::default());
        marker.emit_click(ClickEvent::default());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_map_overlay_bookkeeping() {
        let map = HeadlessMap::new(&MapConfig::default(), Vec::new());
        let a: Arc<dyn OverlayHandle> =
            HeadlessOverlay::from_marker(&MarkerOptions::at(LngLat::new(0.0, 0.0)));
        let b: Arc<dyn OverlayHandle> =
            HeadlessOverlay::from_marker(&MarkerOptions::at(LngLat::new(1.0, 1.0)));

        map.add_overlay(a.clone());
        map.add_overlay(b.clone());
        assert_eq!(map.overlays().len(), 2);

        map.remove_overlay(&a);
        assert_eq!(map.overlays().len(), 1);
        assert!(Arc::ptr_eq(&map.overlays()[0], &b));
    }

    #[test]
    fn test_fit_view_recenters() {
        let map = HeadlessMap::new(&MapConfig::default(), Vec::new());
        map.set_fit_view(
            &[LngLat::new(0.0, 0.0), LngLat::new(4.0, 2.0)],
            60,
            false,
            [60, 60, 60, 60],
            1000,
        );
        assert_eq!(map.center(), Some(LngLat::new(2.0, 1.0)));
    }

    #[test]
    fn test_listener_registration() {
        let map = HeadlessMap::new(&MapConfig::default(), Vec::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let id = map.on(
            "click",
            Arc::new(move |_event| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        map.emit_event(MapEvent {
            name: "click".to_string(),
            position: None,
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        map.off("click", id);
        map.emit_event(MapEvent {
            name: "click".to_string(),
            position: None,
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mouse_tool_single_completion() {
        let map: Arc<dyn MapHandle> = HeadlessMap::new(&MapConfig::default(), Vec::new());
        let tool = HeadlessMouseTool::new(map.clone());
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        tool.on_draw(Box::new(move |_overlay| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        }));
        tool.open(DrawKind::Marker, &DrawOptions::default());

        let shape: Arc<dyn OverlayHandle> =
            HeadlessOverlay::from_marker(&MarkerOptions::at(LngLat::new(0.0, 0.0)));
        tool.finish(shape.clone());
        // Second completion without an active mode is ignored
        tool.finish(shape);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(map.overlays().len(), 1);
    }
}
