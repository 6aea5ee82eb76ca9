//! Remote Story API Client
//!
//! Thin reqwest wrapper over the story service's REST endpoints. Attaches
//! the bearer token when one is configured; story creation without a token
//! is routed to the guest endpoint instead.
//!
//! Non-2xx responses carry a JSON body with a `message` field; a missing or
//! unparseable body is tolerated and replaced by the status line.

use crate::config::Config;
use crate::error::{CeritaError, Result};
use crate::model::{NewStory, Story};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

/// Default page size for story listings
pub const DEFAULT_LIST_SIZE: u32 = 100;

/// Client for the remote story API
#[derive(Debug, Clone)]
pub struct StoryApi {
    client: Client,
    config: Config,
}

/// Response envelope for `GET /stories`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEnvelope {
    #[serde(default)]
    list_story: Vec<Story>,
}

/// Response envelope for `GET /stories/{id}` and `POST /stories`
#[derive(Debug, Deserialize)]
struct StoryEnvelope {
    story: Story,
}

/// Error body shape shared by all endpoints
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: String,
}

impl StoryApi {
    /// Create a client from configuration
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Fetch up to `size` stories
    pub async fn get_stories(&self, size: u32) -> Result<Vec<Story>> {
        let url = self.config.api_url(&format!("/stories?size={}", size));
        let response = self.with_auth(self.client.get(&url)).send().await?;
        let envelope: ListEnvelope = Self::into_success(response).await?.json().await?;
        debug!(count = envelope.list_story.len(), "stories fetched");
        Ok(envelope.list_story)
    }

    /// Fetch one story by id
    pub async fn get_story_detail(&self, id: &str) -> Result<Story> {
        let url = self.config.api_url(&format!("/stories/{}", id));
        let response = self.with_auth(self.client.get(&url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CeritaError::not_found(id));
        }
        let envelope: StoryEnvelope = Self::into_success(response).await?.json().await?;
        Ok(envelope.story)
    }

    /// Submit a new story as multipart form data
    ///
    /// Authenticated clients post to `/stories`; without a token the guest
    /// endpoint is used and no Authorization header is sent.
    pub async fn add_story(&self, submission: &NewStory) -> Result<Story> {
        submission.validate()?;

        let path = if self.config.auth_token.is_some() {
            "/stories"
        } else {
            "/stories/guest"
        };
        let url = self.config.api_url(path);

        let photo = Part::bytes(submission.photo.clone())
            .file_name("photo")
            .mime_str(&submission.photo_content_type)
            .map_err(|e| CeritaError::validation("photo_content_type", e.to_string()))?;

        let mut form = Form::new()
            .text("description", submission.description.clone())
            .part("photo", photo);
        if let (Some(lat), Some(lon)) = (submission.lat, submission.lon) {
            form = form.text("lat", lat.to_string()).text("lon", lon.to_string());
        }

        let response = self
            .with_auth(self.client.post(&url))
            .multipart(form)
            .send()
            .await?;
        let envelope: StoryEnvelope = Self::into_success(response).await?.json().await?;
        debug!(id = %envelope.story.id, "story submitted");
        Ok(envelope.story)
    }

    /// Download a remote photo, returning its MIME type and raw bytes
    ///
    /// Used for best-effort asset prefetching; no auth header is sent.
    pub async fn fetch_photo(&self, url: &str) -> Result<(String, Vec<u8>)> {
        let response = self.client.get(url).send().await?;
        let response = Self::into_success(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        Ok((content_type, bytes))
    }

    /// Attach the bearer token when one is configured
    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Map non-2xx responses to a network error, reading the body's
    /// `message` field when one exists
    async fn into_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorEnvelope>()
            .await
            .map(|e| e.message)
            .unwrap_or_default();
        warn!(%status, message, "api request failed");

        if message.is_empty() {
            Err(CeritaError::network(format!("request failed: {}", status)))
        } else {
            Err(CeritaError::network(message))
        }
    }
}
