//! Per-service overlay bookkeeping
//!
//! Collections are always present and empty at construction, keyed by overlay
//! kind, insertion-ordered and duplicate-tolerant. Handle identity is
//! `Arc::ptr_eq`; composites compare by their polyline.

use crate::animation::StepTrackController;
use crate::core::geo::LngLat;
use crate::provider::{LayerHandle, OverlayHandle};
use std::sync::Arc;

/// A static, fully drawn path visualization. Destroyed as a unit.
#[derive(Clone)]
pub struct Track {
    pub polyline: Arc<dyn OverlayHandle>,
    pub start_marker: Arc<dyn OverlayHandle>,
    pub end_marker: Arc<dyn OverlayHandle>,
    pub path: Vec<LngLat>,
}

impl Track {
    pub fn same_as(&self, other: &Track) -> bool {
        Arc::ptr_eq(&self.polyline, &other.polyline)
    }
}

/// An incrementally revealed track. The controller exclusively owns the
/// timer; the composite keeps the overlay handles for registry iteration.
#[derive(Clone)]
pub struct StepTrack {
    pub polyline: Arc<dyn OverlayHandle>,
    pub start_marker: Arc<dyn OverlayHandle>,
    pub end_marker: Arc<dyn OverlayHandle>,
    pub current_marker: Arc<dyn OverlayHandle>,
    pub controller: StepTrackController,
    pub path: Vec<LngLat>,
}

#[derive(Default)]
pub struct OverlayRegistry {
    markers: Vec<Arc<dyn OverlayHandle>>,
    polylines: Vec<Arc<dyn OverlayHandle>>,
    polygons: Vec<Arc<dyn OverlayHandle>>,
    info_windows: Vec<Arc<dyn OverlayHandle>>,
    layers: Vec<Arc<dyn LayerHandle>>,
    tracks: Vec<Track>,
    step_tracks: Vec<StepTrack>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[Arc<dyn OverlayHandle>] {
        &self.markers
    }

    pub fn polylines(&self) -> &[Arc<dyn OverlayHandle>] {
        &self.polylines
    }

    pub fn polygons(&self) -> &[Arc<dyn OverlayHandle>] {
        &self.polygons
    }

    pub fn info_windows(&self) -> &[Arc<dyn OverlayHandle>] {
        &self.info_windows
    }

    pub fn layers(&self) -> &[Arc<dyn LayerHandle>] {
        &self.layers
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn step_tracks(&self) -> &[StepTrack] {
        &self.step_tracks
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
            && self.polylines.is_empty()
            && self.polygons.is_empty()
            && self.info_windows.is_empty()
            && self.layers.is_empty()
            && self.tracks.is_empty()
            && self.step_tracks.is_empty()
    }

    pub(crate) fn push_marker(&mut self, marker: Arc<dyn OverlayHandle>) {
        self.markers.push(marker);
    }

    pub(crate) fn push_polyline(&mut self, polyline: Arc<dyn OverlayHandle>) {
        self.polylines.push(polyline);
    }

    pub(crate) fn push_polygon(&mut self, polygon: Arc<dyn OverlayHandle>) {
        self.polygons.push(polygon);
    }

    pub(crate) fn push_info_window(&mut self, info_window: Arc<dyn OverlayHandle>) {
        self.info_windows.push(info_window);
    }

    pub(crate) fn push_layer(&mut self, layer: Arc<dyn LayerHandle>) {
        self.layers.push(layer);
    }

    pub(crate) fn push_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub(crate) fn push_step_track(&mut self, step_track: StepTrack) {
        self.step_tracks.push(step_track);
    }

    pub(crate) fn remove_marker(&mut self, marker: &Arc<dyn OverlayHandle>) {
        self.markers.retain(|m| !Arc::ptr_eq(m, marker));
    }

    pub(crate) fn remove_polyline(&mut self, polyline: &Arc<dyn OverlayHandle>) {
        self.polylines.retain(|p| !Arc::ptr_eq(p, polyline));
    }

    pub(crate) fn remove_polygon(&mut self, polygon: &Arc<dyn OverlayHandle>) {
        self.polygons.retain(|p| !Arc::ptr_eq(p, polygon));
    }

    pub(crate) fn remove_info_window(&mut self, info_window: &Arc<dyn OverlayHandle>) {
        self.info_windows.retain(|w| !Arc::ptr_eq(w, info_window));
    }

    pub(crate) fn remove_layer(&mut self, layer: &Arc<dyn LayerHandle>) {
        self.layers.retain(|l| !Arc::ptr_eq(l, layer));
    }

    pub(crate) fn remove_track(&mut self, track: &Track) {
        self.tracks.retain(|t| !t.same_as(track));
    }

    pub(crate) fn take_markers(&mut self) -> Vec<Arc<dyn OverlayHandle>> {
        std::mem::take(&mut self.markers)
    }

    pub(crate) fn take_polylines(&mut self) -> Vec<Arc<dyn OverlayHandle>> {
        std::mem::take(&mut self.polylines)
    }

    pub(crate) fn take_polygons(&mut self) -> Vec<Arc<dyn OverlayHandle>> {
        std::mem::take(&mut self.polygons)
    }

    pub(crate) fn take_info_windows(&mut self) -> Vec<Arc<dyn OverlayHandle>> {
        std::mem::take(&mut self.info_windows)
    }

    pub(crate) fn take_layers(&mut self) -> Vec<Arc<dyn LayerHandle>> {
        std::mem::take(&mut self.layers)
    }

    pub(crate) fn take_tracks(&mut self) -> Vec<Track> {
        std::mem::take(&mut self.tracks)
    }

    pub(crate) fn take_step_tracks(&mut self) -> Vec<StepTrack> {
        std::mem::take(&mut self.step_tracks)
    }
}
