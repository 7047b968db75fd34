//! # mapshim
//!
//! A provider-agnostic service layer over interactive-map SDKs.
//!
//! A host application picks a backend by configuration, gets one stable
//! interface for overlays (markers, polylines, polygons, info windows,
//! layers), camera control, geocoding, drawing and scripted track playback,
//! and never names a vendor type. The vendor engine itself sits behind the
//! capability traits in [`provider`]; the crate ships headless
//! implementations that track live-map state and speak to the vendors' REST
//! geocoding endpoints.
//!
//! ```no_run
//! use mapshim::prelude::*;
//!
//! # async fn demo() -> mapshim::Result<()> {
//! let options = ServiceOptions {
//!     key: "your-web-key".to_string(),
//!     ..Default::default()
//! };
//! let mut service = MapServiceFactory::create_service("amap", options)?;
//! service.init_map("map-container", MapConfig::default()).await?;
//! service.add_marker(MarkerOptions::at(LngLat::new(116.397, 39.908)));
//! # Ok(())
//! # }
//! ```

pub mod animation;
pub mod core;
pub mod prelude;
pub mod provider;
pub mod service;

// Re-export public API
pub use crate::core::{
    config::{MapConfig, MapPluginConfig, ProviderKind, ServiceOptions},
    geo::LngLat,
};

pub use crate::service::{
    factory::MapServiceFactory,
    registry::{OverlayRegistry, StepTrack, Track},
    AmapService, BmapService, MapService, ProviderService,
};

pub use crate::animation::{StepPhase, StepTrackController, StepTrackOptions};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("unsupported map provider: {0}")]
    UnsupportedProvider(String),

    #[error("provider capability failed to load: {0}")]
    ProviderLoad(String),

    #[error("provider loaded but map construction failed: {0}")]
    ProviderInit(String),

    #[error("geocoding failed: {0}")]
    Geocoding(String),

    #[error("map service not initialized")]
    NotInitialized,

    #[error("drawing closed before a shape was completed")]
    DrawInterrupted,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error type alias for convenience
pub type Error = MapError;
