//! Prelude module for common mapshim types and traits
//!
//! Re-exports the types most hosts need, for easy importing with
//! `use mapshim::prelude::*;`

pub use crate::core::{
    config::{
        BaseLayerKind, DrawKind, DrawOptions, IconOptions, InfoWindowOptions, LayerOptions,
        MapConfig, MapPluginConfig, MarkerOptions, OverlayDefaults, OverlayLayerKind, Pixel,
        PolygonOptions, PolylineOptions, ProviderKind, ServiceOptions, Size, TileMode,
    },
    geo::LngLat,
};

pub use crate::provider::{
    ClickEvent, GeocodeEntry, GeocodeResponse, GeocodeStatus, Geocoder, LayerHandle, LayerKind,
    ListenerId, MapEvent, MapHandle, MapStatus, MouseTool, Namespace, OverlayHandle, OverlayKind,
    ProviderBackend, ReverseGeocode,
};

pub use crate::service::{
    factory::MapServiceFactory,
    registry::{OverlayRegistry, StepTrack, Track},
    AmapService, BmapService, MapService, ProviderService,
};

pub use crate::animation::{StepPhase, StepTrackController, StepTrackOptions};

pub use crate::{Error as MapError, Result};

pub use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
