//! Story Record Types
//!
//! Defines the three record families persisted by the durable store:
//! mirrored stories, outbox entries, and cached binary assets. Also owns
//! temporary-identifier generation and the data-URL encoding used to keep
//! offline photos self-contained.
//!
//! # Identifier Scheme
//!
//! A story carries either a server-assigned permanent id or a
//! client-generated temporary id of the form `offline-<millis>-<random>`.
//! The temporary record is replaced atomically by the permanent one when
//! reconciliation succeeds.

use crate::error::{CeritaError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix marking client-generated temporary identifiers
pub const TEMP_ID_PREFIX: &str = "offline-";

/// Author name recorded on stories created while disconnected
pub const OFFLINE_AUTHOR: &str = "Offline User";

/// One story record, mirrored locally and on the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Permanent server id or temporary client id
    pub id: String,
    /// Author display name
    pub name: String,
    /// Story text
    pub description: String,
    /// Remote URL, or a data URL for offline-authored photos
    pub photo_url: String,
    /// Optional latitude; present exactly when `lon` is present
    pub lat: Option<f64>,
    /// Optional longitude; present exactly when `lat` is present
    pub lon: Option<f64>,
    /// ISO-8601 creation timestamp
    pub created_at: String,
    /// True until the server has acknowledged the story
    #[serde(default)]
    pub is_offline: bool,
}

impl Story {
    /// Build the optimistic local record for a story authored offline
    pub fn new_offline(temp_id: &str, submission: &NewStory) -> Self {
        Self {
            id: temp_id.to_string(),
            name: OFFLINE_AUTHOR.to_string(),
            description: submission.description.clone(),
            photo_url: encode_data_url(&submission.photo_content_type, &submission.photo),
            lat: submission.lat,
            lon: submission.lon,
            created_at: chrono::Utc::now().to_rfc3339(),
            is_offline: true,
        }
    }

    /// Reject records that would violate the store's invariants
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(CeritaError::validation("id", "must not be empty"));
        }
        if self.lat.is_some() != self.lon.is_some() {
            return Err(CeritaError::validation(
                "lat/lon",
                "latitude and longitude must both be present or both absent",
            ));
        }
        Ok(())
    }
}

/// A story submission before it has an identity of any kind
#[derive(Debug, Clone)]
pub struct NewStory {
    pub description: String,
    /// Raw photo bytes
    pub photo: Vec<u8>,
    /// MIME type of the photo, e.g. `image/jpeg`
    pub photo_content_type: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl NewStory {
    /// Validate required submission fields before any I/O
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(CeritaError::validation("description", "must not be empty"));
        }
        if self.photo.is_empty() {
            return Err(CeritaError::validation("photo", "must not be empty"));
        }
        if self.photo_content_type.is_empty() {
            return Err(CeritaError::validation(
                "photo_content_type",
                "must not be empty",
            ));
        }
        if self.lat.is_some() != self.lon.is_some() {
            return Err(CeritaError::validation(
                "lat/lon",
                "latitude and longitude must both be present or both absent",
            ));
        }
        Ok(())
    }
}

/// A queued mutation awaiting replay against the remote API
///
/// Entries are self-contained: the photo is stored as a data URL, never a
/// remote reference, so the entry survives arbitrarily long offline periods.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    /// Store-assigned monotonic sequence key
    pub key: i64,
    pub description: String,
    /// Embedded photo as a data URL
    pub photo: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// ISO-8601 enqueue timestamp
    pub queued_at: String,
    /// Identifier of the optimistic entity this entry corresponds to
    pub temp_id: String,
}

impl OutboxEntry {
    /// Reconstruct the submission payload for replay
    pub fn to_submission(&self) -> Result<NewStory> {
        let (content_type, bytes) = decode_data_url(&self.photo)?;
        Ok(NewStory {
            description: self.description.clone(),
            photo: bytes,
            photo_content_type: content_type,
            lat: self.lat,
            lon: self.lon,
        })
    }
}

/// An outbox entry before the store has assigned its sequence key
#[derive(Debug, Clone)]
pub struct OutboxDraft {
    pub description: String,
    /// Embedded photo as a data URL
    pub photo: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub temp_id: String,
}

impl OutboxDraft {
    /// Outbox entries must be self-contained to survive offline periods
    pub fn validate(&self) -> Result<()> {
        if !self.photo.starts_with("data:") {
            return Err(CeritaError::validation(
                "photo",
                "outbox photo must be an embedded data URL",
            ));
        }
        if self.temp_id.is_empty() {
            return Err(CeritaError::validation("temp_id", "must not be empty"));
        }
        Ok(())
    }
}

/// A lazily cached copy of a remote binary asset
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAsset {
    /// Source URL the asset was fetched from
    pub url: String,
    /// Embedded copy as a data URL
    pub data: String,
    /// ISO-8601 cache timestamp
    pub cached_at: String,
}

/// Generate a client-side temporary identifier
pub fn generate_temp_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}-{}",
        TEMP_ID_PREFIX,
        chrono::Utc::now().timestamp_millis(),
        &random[..8]
    )
}

/// True if the identifier was generated client-side
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Encode raw bytes as a `data:<type>;base64,<payload>` URL
pub fn encode_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, BASE64.encode(bytes))
}

/// Decode a data URL back into its MIME type and raw bytes
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| CeritaError::validation("photo", "not a data URL"))?;
    let (content_type, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| CeritaError::validation("photo", "missing base64 payload"))?;
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| CeritaError::validation("photo", format!("invalid base64: {}", e)))?;
    Ok((content_type.to_string(), bytes))
}
