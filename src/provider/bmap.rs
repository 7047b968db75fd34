//! Baidu Maps backend
//!
//! Validates the host's `ak` and adapts the Baidu REST geocoder to the common
//! callback convention (Baidu reports numeric status codes; `0` maps to the
//! Complete/"OK" pair the service layer checks for).

use crate::core::{
    config::{OverlayDefaults, Pixel, ProviderKind, ServiceOptions},
    geo::LngLat,
};
use crate::provider::{
    headless::HeadlessNamespace, GeocodeCallback, GeocodeEntry, GeocodeResponse, GeocodeStatus,
    Geocoder, Namespace, ProviderBackend, ReverseGeocode, HTTP_CLIENT,
};
use crate::{MapError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::thread;

const GEOCODE_URL: &str = "https://api.map.baidu.com/geocoding/v3/";
const REVERSE_URL: &str = "https://api.map.baidu.com/reverse_geocoding/v3/";

const DEFAULT_MARKER_ICON: &str = "https://api.map.baidu.com/images/marker_red_sprite.png";

/// Baidu backend descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bmap;

#[async_trait]
impl ProviderBackend for Bmap {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Bmap
    }

    fn defaults(&self) -> OverlayDefaults {
        OverlayDefaults {
            marker_icon: DEFAULT_MARKER_ICON.to_string(),
            polyline_stroke_color: "#3366FF".to_string(),
            polyline_stroke_weight: 5.0,
            polyline_stroke_opacity: 1.0,
            polygon_fill_color: "#1791fc".to_string(),
            polygon_fill_opacity: 0.3,
            polygon_stroke_color: "#1791fc".to_string(),
            polygon_stroke_weight: 2.0,
            info_window_offset: Pixel::new(0, -30),
        }
    }

    async fn load(&self, options: &ServiceOptions) -> Result<Arc<dyn Namespace>> {
        if options.key.trim().is_empty() {
            return Err(MapError::ProviderLoad("bmap: missing ak".to_string()));
        }

        log::info!("bmap capability loaded");
        let geocoder = Arc::new(BmapGeocoder {
            ak: options.key.clone(),
        });
        Ok(HeadlessNamespace::new(ProviderKind::Bmap, geocoder))
    }
}

/// REST-backed geocoder for Baidu's v3 endpoints.
pub struct BmapGeocoder {
    ak: String,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    status: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    result: Option<RawResult>,
}

impl RawResponse {
    fn reason(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| format!("status {}", self.status))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawResult {
    location: Option<RawLocation>,
    level: Option<String>,
    formatted_address: Option<String>,
    #[serde(rename = "addressComponent")]
    address_component: Option<RawAddressComponent>,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    lng: f64,
    lat: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAddressComponent {
    province: Option<String>,
    city: Option<String>,
    district: Option<String>,
}

impl Geocoder for BmapGeocoder {
    fn get_location(&self, address: &str, mut callback: GeocodeCallback) {
        let ak = self.ak.clone();
        let address = address.to_string();
        thread::spawn(move || {
            let result: std::result::Result<RawResponse, String> = (|| {
                let resp = HTTP_CLIENT
                    .get(GEOCODE_URL)
                    .query(&[
                        ("address", address.as_str()),
                        ("ak", ak.as_str()),
                        ("output", "json"),
                    ])
                    .send()
                    .map_err(|e| e.to_string())?;
                resp.json().map_err(|e| e.to_string())
            })();

            match result {
                Ok(raw) if raw.status == 0 => {
                    let entry = raw.result.map(|r| GeocodeEntry {
                        // Forward geocoding v3 echoes no formatted address;
                        // the query string is the closest equivalent.
                        formatted_address: address.clone(),
                        location: r.location.map(|l| LngLat::new(l.lng, l.lat)),
                        level: r.level,
                        ..Default::default()
                    });
                    callback(
                        GeocodeStatus::Complete,
                        GeocodeResponse {
                            info: "OK".to_string(),
                            geocodes: entry.into_iter().collect(),
                            regeocode: None,
                        },
                    );
                }
                Ok(raw) => {
                    log::warn!("bmap geocode rejected: {}", raw.reason());
                    callback(
                        GeocodeStatus::Error,
                        GeocodeResponse {
                            info: raw.reason(),
                            ..Default::default()
                        },
                    );
                }
                Err(err) => {
                    log::warn!("bmap geocode request failed: {}", err);
                    callback(
                        GeocodeStatus::Error,
                        GeocodeResponse {
                            info: err,
                            ..Default::default()
                        },
                    );
                }
            }
        });
    }

    fn get_address(&self, position: LngLat, mut callback: GeocodeCallback) {
        let ak = self.ak.clone();
        // Reverse geocoding v3 takes lat,lng order, unlike everything else.
        let location = format!("{},{}", position.lat, position.lng);
        thread::spawn(move || {
            let result: std::result::Result<RawResponse, String> = (|| {
                let resp = HTTP_CLIENT
                    .get(REVERSE_URL)
                    .query(&[
                        ("location", location.as_str()),
                        ("ak", ak.as_str()),
                        ("output", "json"),
                    ])
                    .send()
                    .map_err(|e| e.to_string())?;
                resp.json().map_err(|e| e.to_string())
            })();

            match result {
                Ok(raw) if raw.status == 0 => {
                    let regeocode = raw.result.map(|r| {
                        let component = r.address_component.unwrap_or_default();
                        ReverseGeocode {
                            formatted_address: r.formatted_address.unwrap_or_default(),
                            province: component.province,
                            city: component.city,
                            district: component.district,
                        }
                    });
                    callback(
                        GeocodeStatus::Complete,
                        GeocodeResponse {
                            info: "OK".to_string(),
                            geocodes: Vec::new(),
                            regeocode,
                        },
                    );
                }
                Ok(raw) => {
                    log::warn!("bmap reverse geocode rejected: {}", raw.reason());
                    callback(
                        GeocodeStatus::Error,
                        GeocodeResponse {
                            info: raw.reason(),
                            ..Default::default()
                        },
                    );
                }
                Err(err) => {
                    log::warn!("bmap reverse geocode request failed: {}", err);
                    callback(
                        GeocodeStatus::Error,
                        GeocodeResponse {
                            info: err,
                            ..Default::default()
                        },
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_requires_ak() {
        assert!(matches!(
            Bmap.load(&ServiceOptions::default()).await,
            Err(MapError::ProviderLoad(_))
        ));

        let options = ServiceOptions {
            key: "ak".to_string(),
            ..Default::default()
        };
        let namespace = Bmap.load(&options).await.unwrap();
        assert_eq!(namespace.provider(), ProviderKind::Bmap);
    }

    #[test]
    fn test_reverse_response_parsing() {
        let raw: RawResponse = serde_json::from_str(
            r#"{
                "status": 0,
                "result": {
                    "formatted_address": "北京市海淀区中关村大街27号",
                    "addressComponent": {
                        "province": "北京市",
                        "city": "北京市",
                        "district": "海淀区"
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(raw.status, 0);
        let result = raw.result.unwrap();
        assert_eq!(
            result.formatted_address.as_deref(),
            Some("北京市海淀区中关村大街27号")
        );
    }

    #[test]
    fn test_error_reason() {
        let raw: RawResponse =
            serde_json::from_str(r#"{"status": 240, "msg": "APP 服务被禁用"}"#).unwrap();
        assert_eq!(raw.reason(), "APP 服务被禁用");
    }
}
