//! Shared helpers for lprs-ingest integration tests

#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use lprs_common::config::{ServiceConfig, TomlConfig};
use lprs_ingest::{build_router, AppState};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "lprs-integration-boundary";

/// Smallest byte sequences the content sniffer recognizes
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// Service over a temporary root folder
pub struct TestApp {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

pub async fn create_test_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = ServiceConfig::from_toml(temp_dir.path().to_path_buf(), &TomlConfig::default());
    let state = AppState::open(&config)
        .await
        .expect("Failed to open service state");
    let router = build_router(state.clone(), config.max_body_bytes);

    TestApp {
        temp_dir,
        state,
        router,
    }
}

impl TestApp {
    pub fn json_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data").join("json")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data").join("images")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body)
    }

    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(request).await;
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send_json(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send_json(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        self.send_json(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_multipart(&self, uri: &str, parts: Vec<Part>) -> (StatusCode, Value) {
        self.send_json(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap(),
        )
        .await
    }

    /// Ingest a plain JSON payload and return the new event id
    pub async fn ingest(&self, payload: &Value) -> i64 {
        let (status, body) = self.post_json("/api", payload).await;
        assert_eq!(status, StatusCode::OK, "ingest failed: {}", body);
        body["id"].as_i64().expect("missing event id")
    }
}

/// One multipart part; `file_name` makes it a file part
pub struct Part {
    pub name: String,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

pub fn file_part(file_name: &str, data: impl AsRef<[u8]>) -> Part {
    Part {
        name: "file".to_string(),
        file_name: Some(file_name.to_string()),
        data: data.as_ref().to_vec(),
    }
}

pub fn field_part(name: &str, value: &str) -> Part {
    Part {
        name: name.to_string(),
        file_name: None,
        data: value.as_bytes().to_vec(),
    }
}

pub fn multipart_body(parts: Vec<Part>) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let headers = match &part.file_name {
            Some(file) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                part.name, file
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name),
        };
        body.extend_from_slice(headers.as_bytes());
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// File names currently present in a directory
pub fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
