//! Payload normalizer
//!
//! Maps an incoming sensor payload onto one canonical [`NormalizedEvent`].
//! Sensors from different firmware generations spell the same field in
//! different ways; each field declares its synonyms once, in precedence
//! order, and the first non-empty value wins.
//!
//! Normalization never fails. Unparseable confidences and missing groups
//! resolve to `None`; only the initial JSON parse can reject a payload.

use chrono::Utc;
use lprs_common::{Error, Result};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type JsonObject = Map<String, Value>;

const CAR_ID_KEYS: &[&str] = &["carID", "carid", "carId"];
const PLATE_KEYS: &[&str] = &["plateUTF8", "plateText"];
const CAR_STATE_KEYS: &[&str] = &["carState", "carstate"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geotag {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleInfo {
    pub make: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub vehicle_type: Option<String>,
    pub confidence_mmr: Option<f64>,
    pub confidence_color: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraInfo {
    pub serial_number: Option<String>,
    pub ip_address: Option<String>,
}

/// Canonical event produced from any supported payload shape
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    /// Never empty; synthesized when the sensor omits it
    pub car_id: String,
    pub car_id_synthesized: bool,
    pub plate: Option<String>,
    pub car_state: Option<String>,
    pub sensor_provider_id: Option<String>,
    pub event_datetime: Option<String>,
    pub capture_timestamp: Option<String>,
    pub plate_country: Option<String>,
    pub plate_region: Option<String>,
    pub plate_region_code: Option<String>,
    pub plate_confidence: Option<f64>,
    pub geotag: Option<Geotag>,
    pub vehicle: Option<VehicleInfo>,
    pub camera: Option<CameraInfo>,
}

/// Parse raw bytes as a JSON object
///
/// Syntactically invalid JSON and non-object documents are client errors.
pub fn parse_payload(raw: &[u8]) -> Result<JsonObject> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| Error::InvalidInput(format!("invalid JSON: {}", e)))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidInput(format!(
            "invalid JSON: expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Normalize a parsed payload. Pure apart from car id synthesis.
pub fn normalize(obj: &JsonObject) -> NormalizedEvent {
    let (car_id, car_id_synthesized) = match first_text(obj, CAR_ID_KEYS) {
        Some(id) => (id, false),
        None => (synthesize_car_id(), true),
    };

    NormalizedEvent {
        car_id,
        car_id_synthesized,
        plate: first_text(obj, PLATE_KEYS),
        car_state: first_text(obj, CAR_STATE_KEYS),
        sensor_provider_id: text(obj, "sensorProviderID"),
        event_datetime: text(obj, "datetime"),
        capture_timestamp: text(obj, "capture_timestamp"),
        plate_country: text(obj, "plateCountry"),
        plate_region: text(obj, "plateRegion"),
        plate_region_code: text(obj, "plateRegionCode"),
        plate_confidence: confidence(obj, "plateConfidence"),
        geotag: object(obj, "geotag").and_then(geotag),
        vehicle: object(obj, "vehicle_info").map(|v| VehicleInfo {
            make: text(v, "make"),
            model: text(v, "model"),
            color: text(v, "color"),
            vehicle_type: text(v, "type"),
            confidence_mmr: confidence(v, "confidenceMMR"),
            confidence_color: confidence(v, "confidenceColor"),
        }),
        camera: object(obj, "camera_info").map(|c| CameraInfo {
            serial_number: text(c, "SerialNumber"),
            ip_address: text(c, "IPAddress"),
        }),
    }
}

/// Time-derived identifier for reports without a car id
///
/// Nanosecond timestamp plus a random suffix, so two calls within the
/// same clock tick still differ.
pub fn synthesize_car_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("auto-{}-{}", nanos, &suffix[..8])
}

fn first_text(obj: &JsonObject, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(obj, key))
}

/// Non-empty string value; numbers are accepted and rendered as text
fn text(obj: &JsonObject, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Confidence sent as a decimal string (or a bare number); malformed is absent
fn confidence(obj: &JsonObject, key: &str) -> Option<f64> {
    let parsed = match obj.get(key)? {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn coordinate(obj: &JsonObject, key: &str) -> Option<f64> {
    confidence(obj, key)
}

fn object<'a>(obj: &'a JsonObject, key: &str) -> Option<&'a JsonObject> {
    obj.get(key)?.as_object()
}

/// Both coordinates or nothing
fn geotag(obj: &JsonObject) -> Option<Geotag> {
    Some(Geotag {
        lat: coordinate(obj, "lat")?,
        lon: coordinate(obj, "lon")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_car_id_synonyms_first_non_empty_wins() {
        let event = normalize(&obj(json!({"carID": "", "carid": "B", "carId": "C"})));
        assert_eq!(event.car_id, "B");
        assert!(!event.car_id_synthesized);

        let event = normalize(&obj(json!({"carId": "C", "carID": "A"})));
        assert_eq!(event.car_id, "A");
    }

    #[test]
    fn test_numeric_car_id_accepted() {
        let event = normalize(&obj(json!({"carID": 4711})));
        assert_eq!(event.car_id, "4711");
    }

    #[test]
    fn test_missing_car_id_synthesized_and_distinct() {
        let payload = obj(json!({"plateText": "X"}));
        let first = normalize(&payload);
        let second = normalize(&payload);

        assert!(first.car_id_synthesized);
        assert!(first.car_id.starts_with("auto-"));
        assert_ne!(first.car_id, second.car_id);
    }

    #[test]
    fn test_plate_and_state_synonyms() {
        let event = normalize(&obj(json!({
            "plateText": "FALLBACK",
            "plateUTF8": "ÄB123",
            "carstate": "lost"
        })));
        assert_eq!(event.plate.as_deref(), Some("ÄB123"));
        assert_eq!(event.car_state.as_deref(), Some("lost"));
    }

    #[test]
    fn test_malformed_confidence_is_absent() {
        for bad in ["", "high", "0,9", "NaN", "inf"] {
            let event = normalize(&obj(json!({"plateConfidence": bad})));
            assert_eq!(event.plate_confidence, None, "input {:?}", bad);
        }
        let event = normalize(&obj(json!({"plateConfidence": "0.87"})));
        assert_eq!(event.plate_confidence, Some(0.87));
    }

    #[test]
    fn test_absent_groups_are_none() {
        let event = normalize(&obj(json!({"carID": "1"})));
        assert!(event.geotag.is_none());
        assert!(event.vehicle.is_none());
        assert!(event.camera.is_none());
    }

    #[test]
    fn test_empty_sub_fields_become_none() {
        let event = normalize(&obj(json!({
            "vehicle_info": {"make": "Skoda", "model": "", "confidenceMMR": "x"},
            "camera_info": {"SerialNumber": "", "IPAddress": "10.0.0.2"}
        })));
        let vehicle = event.vehicle.unwrap();
        assert_eq!(vehicle.make.as_deref(), Some("Skoda"));
        assert_eq!(vehicle.model, None);
        assert_eq!(vehicle.confidence_mmr, None);

        let camera = event.camera.unwrap();
        assert_eq!(camera.serial_number, None);
        assert_eq!(camera.ip_address.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn test_geotag_needs_both_coordinates() {
        let full = normalize(&obj(json!({"geotag": {"lat": 50.1, "lon": 14.4}})));
        assert_eq!(full.geotag, Some(Geotag { lat: 50.1, lon: 14.4 }));

        let half = normalize(&obj(json!({"geotag": {"lat": 50.1}})));
        assert_eq!(half.geotag, None);
    }

    #[test]
    fn test_parse_payload_rejects_invalid_json() {
        assert!(matches!(parse_payload(b"{not json"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_payload(b"[1, 2]"), Err(Error::InvalidInput(_))));
        assert!(parse_payload(br#"{"carID": "1"}"#).is_ok());
    }
}
