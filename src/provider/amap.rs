//! AMap (Gaode) backend
//!
//! Credential validation mirrors the JSAPI loader: a web key is mandatory and
//! the jscode security token must accompany any plugin load. The token is
//! passed explicitly through the load call; nothing is written to a shared
//! global. Geocoding goes through the vendor's REST endpoints.

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

const GEOCODE_URL: &str = "https://restapi.amap.com/v3/geocode/geo";
const REGEO_URL: &str = "https://restapi.amap.com/v3/geocode/regeo";

/// Default marker icon served from the vendor theme CDN.
const DEFAULT_MARKER_ICON: &str = "https://webapi.amap.com/theme/v1.3/markers/n/mark_b.png";

/// AMap backend descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Amap;

#[async_trait]
impl ProviderBackend for Amap {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Amap
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
            return Err(MapError::ProviderLoad("amap: missing api key".to_string()));
        }
        if !options.plugins.is_empty() && options.security_js_code.is_none() {
            return Err(MapError::ProviderLoad(
                "amap: securityJsCode is required when loading plugins".to_string(),
            ));
        }

        log::info!(
            "amap capability loaded ({} plugins)",
            options.plugins.len()
        );
        let geocoder = Arc::new(AmapGeocoder {
            key: options.key.clone(),
        });
        Ok(HeadlessNamespace::new(ProviderKind::Amap, geocoder))
    }
}

/// REST-backed geocoder speaking the vendor's callback convention.
pub struct AmapGeocoder {
    key: String,
}

#[derive(Debug, Deserialize)]
struct RawGeoResponse {
    status: String,
    #[serde(default)]
    info: String,
    #[serde(default)]
    geocodes: Vec<RawGeocode>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawGeocode {
    formatted_address: String,
    province: serde_json::Value,
    city: serde_json::Value,
    district: serde_json::Value,
    location: String,
    level: Option<String>,
}

impl Default for RawGeocode {
    fn default() -> Self {
        Self {
            formatted_address: String::new(),
            province: serde_json::Value::Null,
            city: serde_json::Value::Null,
            district: serde_json::Value::Null,
            location: String::new(),
            level: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRegeoResponse {
    status: String,
    #[serde(default)]
    info: String,
    regeocode: Option<RawRegeocode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRegeocode {
    formatted_address: String,
    #[serde(rename = "addressComponent")]
    address_component: RawAddressComponent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAddressComponent {
    province: serde_json::Value,
    city: serde_json::Value,
    district: serde_json::Value,
}

/// The REST API returns `[]` instead of a string for empty address fields.
fn field_str(value: &serde_json::Value) -> Option<String> {
    value.as_str().map(|s| s.to_string())
}

fn parse_location(raw: &str) -> Option<LngLat> {
    let mut parts = raw.split(',');
    let lng = parts.next()?.trim().parse().ok()?;
    let lat = parts.next()?.trim().parse().ok()?;
    Some(LngLat::new(lng, lat))
}

impl RawGeocode {
    fn into_entry(self) -> GeocodeEntry {
        GeocodeEntry {
            location: parse_location(&self.location),
            province: field_str(&self.province),
            city: field_str(&self.city),
            district: field_str(&self.district),
            formatted_address: self.formatted_address,
            level: self.level,
        }
    }
}

impl Geocoder for AmapGeocoder {
    fn get_location(&self, address: &str, mut callback: GeocodeCallback) {
        let key = self.key.clone();
        let address = address.to_string();
        thread::spawn(move || {
            let result: std::result::Result<RawGeoResponse, String> = (|| {
                let resp = HTTP_CLIENT
                    .get(GEOCODE_URL)
                    .query(&[("address", address.as_str()), ("key", key.as_str())])
                    .send()
                    .map_err(|e| e.to_string())?;
                resp.json().map_err(|e| e.to_string())
            })();

            match result {
                Ok(raw) if raw.status == "1" => {
                    let info = raw.info.clone();
                    let geocodes = raw.geocodes.into_iter().map(RawGeocode::into_entry).collect();
                    callback(
                        GeocodeStatus::Complete,
                        GeocodeResponse {
                            info,
                            geocodes,
                            regeocode: None,
                        },
                    );
                }
                Ok(raw) => {
                    log::warn!("amap geocode rejected: {}", raw.info);
                    callback(
                        GeocodeStatus::Error,
                        GeocodeResponse {
                            info: raw.info,
                            ..Default::default()
                        },
                    );
                }
                Err(err) => {
                    log::warn!("amap geocode request failed: {}", err);
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
        let key = self.key.clone();
        let location = format!("{},{}", position.lng, position.lat);
        thread::spawn(move || {
            let result: std::result::Result<RawRegeoResponse, String> = (|| {
                let resp = HTTP_CLIENT
                    .get(REGEO_URL)
                    .query(&[("location", location.as_str()), ("key", key.as_str())])
                    .send()
                    .map_err(|e| e.to_string())?;
                resp.json().map_err(|e| e.to_string())
            })();

            match result {
                Ok(raw) if raw.status == "1" => {
                    let regeocode = raw.regeocode.map(|r| ReverseGeocode {
                        formatted_address: r.formatted_address,
                        province: field_str(&r.address_component.province),
                        city: field_str(&r.address_component.city),
                        district: field_str(&r.address_component.district),
                    });
                    callback(
                        GeocodeStatus::Complete,
                        GeocodeResponse {
                            info: raw.info,
                            geocodes: Vec::new(),
                            regeocode,
                        },
                    );
                }
                Ok(raw) => {
                    log::warn!("amap reverse geocode rejected: {}", raw.info);
                    callback(
                        GeocodeStatus::Error,
                        GeocodeResponse {
                            info: raw.info,
                            ..Default::default()
                        },
                    );
                }
                Err(err) => {
                    log::warn!("amap reverse geocode request failed: {}", err);
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
    async fn test_load_requires_key() {
        let result = Amap.load(&ServiceOptions::default()).await;
        assert!(matches!(result, Err(MapError::ProviderLoad(_))));
    }

    #[tokio::test]
    async fn test_load_requires_security_code_with_plugins() {
        let options = ServiceOptions {
            key: "k".to_string(),
            plugins: vec!["AMap.Geocoder".to_string()],
            security_js_code: None,
        };
        assert!(matches!(
            Amap.load(&options).await,
            Err(MapError::ProviderLoad(_))
        ));

        let options = ServiceOptions {
            security_js_code: Some("sec".to_string()),
            ..options
        };
        assert!(Amap.load(&options).await.is_ok());
    }

    #[test]
    fn test_parse_location() {
        assert_eq!(
            parse_location("116.48,39.99"),
            Some(LngLat::new(116.48, 39.99))
        );
        assert_eq!(parse_location(""), None);
        assert_eq!(parse_location("garbage"), None);
    }

    #[test]
    fn test_geocode_response_parsing() {
        let raw: RawGeoResponse = serde_json::from_str(
            r#"{
                "status": "1",
                "info": "OK",
                "geocodes": [{
                    "formatted_address": "北京市朝阳区阜通东大街6号",
                    "province": "北京市",
                    "city": [],
                    "district": "朝阳区",
                    "location": "116.483038,39.990633",
                    "level": "门牌号"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(raw.status, "1");
        let entry = raw.geocodes.into_iter().next().unwrap().into_entry();
        assert!(entry.city.is_none());
        assert_eq!(entry.province.as_deref(), Some("北京市"));
        assert_eq!(entry.location, Some(LngLat::new(116.483038, 39.990633)));
    }
}
