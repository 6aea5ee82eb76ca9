//! Shared helpers for integration tests

// Not every test binary uses every helper.
#![allow(dead_code)]

use cerita::cache::{CacheRequest, FetchedResponse, Fetcher};
use cerita::error::{CeritaError, Result};
use cerita::model::NewStory;
use futures_util::future::BoxFuture;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A small valid-enough JPEG payload
pub fn sample_jpeg() -> Vec<u8> {
    let mut bytes = vec![0xff, 0xd8, 0xff, 0xe0];
    bytes.extend(std::iter::repeat(0xab).take(1024));
    bytes.push(0xff);
    bytes.push(0xd9);
    bytes
}

/// The submission used by most offline-write scenarios
pub fn sample_submission() -> NewStory {
    NewStory {
        description: "hello".to_string(),
        photo: sample_jpeg(),
        photo_content_type: "image/jpeg".to_string(),
        lat: Some(10.0),
        lon: Some(20.0),
    }
}

/// JSON body for a successful story-creation response
pub fn story_created_body(id: &str, description: &str) -> serde_json::Value {
    json!({
        "error": false,
        "message": "Story created",
        "story": {
            "id": id,
            "name": "Dina",
            "description": description,
            "photoUrl": format!("https://story-api.test/images/{id}.jpg"),
            "lat": 10.0,
            "lon": 20.0,
            "createdAt": "2024-05-01T10:00:00.000Z"
        }
    })
}

/// Mount a guest-endpoint success responder returning the given server id
pub async fn mount_guest_create(server: &MockServer, id: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/stories/guest"))
        .respond_with(ResponseTemplate::new(201).set_body_json(story_created_body(id, "hello")))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Programmable fetcher: per-URL responses plus a global offline switch
pub struct StubFetcher {
    responses: Mutex<HashMap<String, FetchedResponse>>,
    offline: AtomicBool,
    requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(&self, url: &str, status: u16, content_type: &str, body: &[u8]) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            FetchedResponse {
                status,
                content_type: content_type.to_string(),
                body: body.to_vec(),
            },
        );
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// URLs fetched so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for StubFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for StubFetcher {
    fn fetch<'a>(&'a self, request: &'a CacheRequest) -> BoxFuture<'a, Result<FetchedResponse>> {
        Box::pin(async move {
            self.requests
                .lock()
                .unwrap()
                .push(request.url.as_str().to_string());

            if self.offline.load(Ordering::SeqCst) {
                return Err(CeritaError::network("connection refused"));
            }

            match self.responses.lock().unwrap().get(request.url.as_str()) {
                Some(response) => Ok(response.clone()),
                None => Ok(FetchedResponse {
                    status: 404,
                    content_type: "text/plain".to_string(),
                    body: b"not found".to_vec(),
                }),
            }
        })
    }
}
