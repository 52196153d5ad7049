//! Image and payload extraction from an ingestion request
//!
//! Three transports may all appear in one request:
//! 1. multipart file parts (`.jpg`/`.jpeg`/`.png` images, `.json` payload)
//! 2. multipart form fields `json` then `data` when no `.json` part exists
//! 3. a base64 `ImageArray` embedded in the JSON payload
//!
//! Any other content type means the whole body is the payload. Losing a
//! single image is never fatal; a request without any payload bytes is.

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request},
    http::header,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use lprs_common::{Error, Result};
use serde_json::Value;
use tower::{service_fn, Layer, ServiceExt};
use tracing::{debug, warn};

use super::normalize::JsonObject;

pub const IMAGE_TYPE_PLATE: &str = "plate";
pub const IMAGE_TYPE_VEHICLE: &str = "vehicle";
pub const IMAGE_TYPE_UPLOADED: &str = "uploaded";
pub const IMAGE_TYPE_EMBEDDED: &str = "embedded";

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];
const DEFAULT_EMBEDDED_FORMAT: &str = "jpg";

/// Where an extracted image came from; decides its disk name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Multipart file part
    Uploaded,
    /// `ImageArray` element with its declared (or defaulted) format
    Embedded { format: String },
}

#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub data: Vec<u8>,
    /// Client-supplied (uploads) or generated (embedded) name
    pub filename: String,
    pub image_type: String,
    pub origin: ImageOrigin,
}

/// Payload bytes plus the images carried next to it
#[derive(Debug, Default)]
pub struct RequestParts {
    pub payload: Vec<u8>,
    /// Original name of the `.json` file part, if the payload came from one
    pub json_filename: Option<String>,
    pub uploads: Vec<ExtractedImage>,
}

pub fn is_multipart(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/"))
        .unwrap_or(false)
}

/// Split a request into payload and uploaded images
///
/// Body size limits configured on the router apply to both paths.
pub async fn read_request(request: Request) -> Result<RequestParts> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let parts = if is_multipart(content_type.as_deref()) {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| Error::InvalidInput(format!("failed to parse multipart: {}", e)))?;
        read_multipart(multipart).await?
    } else {
        let body = Bytes::from_request(request, &())
            .await
            .map_err(|e| Error::InvalidInput(format!("failed to read body: {}", e)))?;
        RequestParts {
            payload: body.to_vec(),
            ..Default::default()
        }
    };

    require_payload(parts)
}

/// Same as [`read_request`] for an already buffered body
///
/// No size limit applies here; whoever buffered the body bounded it.
pub async fn read_body(body: Bytes, content_type: Option<&str>) -> Result<RequestParts> {
    if !is_multipart(content_type) {
        return require_payload(RequestParts {
            payload: body.to_vec(),
            ..Default::default()
        });
    }

    let mut builder = Request::builder().method("POST").uri("/api");
    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    let request = builder
        .body(Body::from(body))
        .map_err(|e| Error::InvalidInput(format!("invalid content type: {}", e)))?;

    // Without the layer the multipart extractor falls back to axum's 2 MiB default
    DefaultBodyLimit::disable()
        .layer(service_fn(read_request))
        .oneshot(request)
        .await
}

fn require_payload(parts: RequestParts) -> Result<RequestParts> {
    if parts.payload.is_empty() {
        return Err(Error::InvalidInput("no JSON data provided".to_string()));
    }
    Ok(parts)
}

async fn read_multipart(mut multipart: Multipart) -> Result<RequestParts> {
    let mut parts = RequestParts::default();
    let mut json_part: Option<(String, Vec<u8>)> = None;
    let mut form_json: Option<String> = None;
    let mut form_data: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("failed to parse multipart: {}", e)))?
    {
        let field_name = field.name().map(str::to_owned);

        let Some(file_name) = field.file_name().map(str::to_owned) else {
            match field_name.as_deref() {
                Some(name @ ("json" | "data")) => {
                    let value = field.text().await.map_err(|e| {
                        Error::InvalidInput(format!("failed to read form field {}: {}", name, e))
                    })?;
                    if name == "json" {
                        form_json = Some(value);
                    } else {
                        form_data = Some(value);
                    }
                }
                other => debug!(field = ?other, "ignoring multipart form field"),
            }
            continue;
        };

        let lower = file_name.to_lowercase();
        if lower.ends_with(".json") {
            let data = field.bytes().await.map_err(|e| {
                Error::InvalidInput(format!("failed to read {}: {}", file_name, e))
            })?;
            if json_part.is_some() {
                warn!(file = %file_name, "ignoring additional JSON file part");
            } else {
                json_part = Some((file_name, data.to_vec()));
            }
        } else if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            match field.bytes().await {
                Ok(data) if data.is_empty() => {
                    warn!(file = %file_name, "skipping empty image part");
                }
                Ok(data) => parts.uploads.push(ExtractedImage {
                    data: data.to_vec(),
                    image_type: infer_upload_type(&file_name).to_string(),
                    filename: file_name,
                    origin: ImageOrigin::Uploaded,
                }),
                Err(e) => warn!(file = %file_name, error = %e, "failed to read image part"),
            }
        } else {
            debug!(file = %file_name, "ignoring multipart file with unknown extension");
        }
    }

    if let Some((name, data)) = json_part {
        parts.payload = data;
        parts.json_filename = Some(name);
    } else if let Some(value) = [form_json, form_data]
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
    {
        parts.payload = value.into_bytes();
    }

    Ok(parts)
}

/// Role of an uploaded file guessed from its name
pub fn infer_upload_type(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    if lower.contains("lpup") || lower.contains("plate") {
        IMAGE_TYPE_PLATE
    } else if lower.contains("roi") || lower.contains("vehicle") {
        IMAGE_TYPE_VEHICLE
    } else {
        IMAGE_TYPE_UPLOADED
    }
}

/// Decode the payload's `ImageArray`, keeping array order
///
/// Empty `BinaryImage` entries are skipped silently; undecodable ones are
/// skipped with a warning.
pub fn decode_embedded(payload: &JsonObject) -> Vec<ExtractedImage> {
    let Some(entries) = payload.get("ImageArray").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let Some(entry) = entry.as_object() else {
                warn!(index, "ImageArray entry is not an object");
                return None;
            };

            let binary = entry
                .get("BinaryImage")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if binary.is_empty() {
                return None;
            }

            // Camera firmware wraps long base64 lines
            let compact: String = binary.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let data = match STANDARD.decode(compact.as_bytes()) {
                Ok(data) => data,
                Err(e) => {
                    warn!(index, error = %e, "failed to decode base64 image");
                    return None;
                }
            };

            let image_type = non_empty_str(entry, "ImageType").unwrap_or(IMAGE_TYPE_EMBEDDED);
            let format = non_empty_str(entry, "ImageFormat").unwrap_or(DEFAULT_EMBEDDED_FORMAT);

            Some(ExtractedImage {
                data,
                filename: format!("{}_{}.{}", image_type, index, format),
                image_type: image_type.to_string(),
                origin: ImageOrigin::Embedded {
                    format: format.to_string(),
                },
            })
        })
        .collect()
}

fn non_empty_str<'a>(obj: &'a JsonObject, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BOUNDARY: &str = "lprs-test-boundary";

    struct Part {
        name: &'static str,
        file_name: Option<&'static str>,
        data: Vec<u8>,
    }

    fn file(name: &'static str, file_name: &'static str, data: impl AsRef<[u8]>) -> Part {
        Part {
            name,
            file_name: Some(file_name),
            data: data.as_ref().to_vec(),
        }
    }

    fn field(name: &'static str, value: &str) -> Part {
        Part {
            name,
            file_name: None,
            data: value.as_bytes().to_vec(),
        }
    }

    fn multipart_body(parts: Vec<Part>) -> Bytes {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            let disposition = match part.file_name {
                Some(file) => format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name, file
                ),
                None => format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                ),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(&part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Bytes::from(body)
    }

    fn multipart_type() -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }

    #[test]
    fn test_infer_upload_type() {
        assert_eq!(infer_upload_type("cam1_LPUP_001.jpg"), IMAGE_TYPE_PLATE);
        assert_eq!(infer_upload_type("Plate.png"), IMAGE_TYPE_PLATE);
        assert_eq!(infer_upload_type("roi_001.jpg"), IMAGE_TYPE_VEHICLE);
        assert_eq!(infer_upload_type("VEHICLE.jpeg"), IMAGE_TYPE_VEHICLE);
        assert_eq!(infer_upload_type("snapshot.jpg"), IMAGE_TYPE_UPLOADED);
    }

    #[test]
    fn test_is_multipart() {
        assert!(is_multipart(Some("multipart/form-data; boundary=x")));
        assert!(is_multipart(Some("Multipart/Mixed; boundary=x")));
        assert!(!is_multipart(Some("application/json")));
        assert!(!is_multipart(None));
    }

    #[tokio::test]
    async fn test_plain_body_is_payload() {
        let parts = read_body(Bytes::from_static(b"{\"carID\":\"1\"}"), Some("application/json"))
            .await
            .unwrap();
        assert_eq!(parts.payload, b"{\"carID\":\"1\"}");
        assert!(parts.json_filename.is_none());
        assert!(parts.uploads.is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_rejected() {
        let result = read_body(Bytes::new(), Some("application/json")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_multipart_json_file_and_images() {
        let body = multipart_body(vec![
            file("event", "Event_42.JSON", r#"{"carID":"42"}"#),
            file("img1", "lpup.jpg", b"\xFF\xD8plate"),
            file("img2", "roi.png", b"\x89PNGvehicle"),
            file("note", "readme.txt", "ignored"),
            field("json", r#"{"carID":"form"}"#),
        ]);

        let parts = read_body(body, Some(multipart_type().as_str())).await.unwrap();

        assert_eq!(parts.payload, b"{\"carID\":\"42\"}");
        assert_eq!(parts.json_filename.as_deref(), Some("Event_42.JSON"));
        assert_eq!(parts.uploads.len(), 2);
        assert_eq!(parts.uploads[0].image_type, IMAGE_TYPE_PLATE);
        assert_eq!(parts.uploads[1].image_type, IMAGE_TYPE_VEHICLE);
        assert_eq!(parts.uploads[0].origin, ImageOrigin::Uploaded);
    }

    #[tokio::test]
    async fn test_multipart_form_field_order() {
        let body = multipart_body(vec![
            field("data", r#"{"carID":"data"}"#),
            field("json", r#"{"carID":"json"}"#),
        ]);
        let parts = read_body(body, Some(multipart_type().as_str())).await.unwrap();
        assert_eq!(parts.payload, b"{\"carID\":\"json\"}");

        let body = multipart_body(vec![field("data", r#"{"carID":"data"}"#)]);
        let parts = read_body(body, Some(multipart_type().as_str())).await.unwrap();
        assert_eq!(parts.payload, b"{\"carID\":\"data\"}");
    }

    #[tokio::test]
    async fn test_multipart_without_payload_rejected() {
        let body = multipart_body(vec![file("img", "a.jpg", b"\xFF\xD8")]);
        let result = read_body(body, Some(multipart_type().as_str())).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_decode_embedded_skips_empty_and_invalid() {
        let payload = json!({
            "ImageArray": [
                {"ImageType": "plate", "ImageFormat": "png", "BinaryImage": STANDARD.encode(b"one")},
                {"ImageType": "vehicle", "BinaryImage": ""},
                {"ImageType": "vehicle", "BinaryImage": "***not base64***"},
                {"BinaryImage": STANDARD.encode(b"four")}
            ]
        });

        let images = decode_embedded(payload.as_object().unwrap());

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].data, b"one");
        assert_eq!(images[0].image_type, "plate");
        assert_eq!(images[0].filename, "plate_0.png");
        assert_eq!(images[1].image_type, IMAGE_TYPE_EMBEDDED);
        assert_eq!(images[1].filename, "embedded_3.jpg");
        assert_eq!(
            images[1].origin,
            ImageOrigin::Embedded {
                format: "jpg".to_string()
            }
        );
    }

    #[test]
    fn test_decode_embedded_tolerates_wrapped_base64() {
        let encoded = STANDARD.encode(b"a longer image payload for wrapping");
        let wrapped = format!("{}\r\n{}", &encoded[..10], &encoded[10..]);
        let payload = json!({"ImageArray": [{"BinaryImage": wrapped}]});

        let images = decode_embedded(payload.as_object().unwrap());
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].data, b"a longer image payload for wrapping");
    }

    #[test]
    fn test_decode_embedded_without_array() {
        let payload = json!({"ImageArray": "nope"});
        assert!(decode_embedded(payload.as_object().unwrap()).is_empty());
        assert!(decode_embedded(&JsonObject::new()).is_empty());
    }
}
