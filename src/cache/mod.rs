//! # Network Cache Layer
//!
//! Intercepts every outgoing GET request, classifies it by origin and
//! type, and applies one of four caching strategies with per-partition
//! eviction. This layer is independent of the durable story store and sits
//! in front of it: even the API calls the store makes pass through here.
//!
//! ## Key Components
//!
//! - `rules.rs` - request classification as an ordered first-match table
//! - `store.rs` - the partitioned response cache with eviction policies
//! - `layer.rs` - the strategy pipelines and install/activate lifecycle
//!
//! Non-GET requests are never intercepted; mutation traffic must not be
//! served from cache.

pub mod layer;
pub mod rules;
pub mod store;

pub use layer::{CacheLayer, Fetcher, HttpFetcher};
pub use rules::{Classifier, Destination, RequestClass};
pub use store::CacheStore;

use reqwest::{Method, Url};

/// Static shell partition, replaced on version bump
pub const STATIC_CACHE: &str = "static-cache-v1";
/// Story API data partition
pub const API_CACHE: &str = "api-cache-v1";
/// Remote image partition
pub const IMAGE_CACHE: &str = "image-cache-v1";
/// Map tile partition
pub const TILE_CACHE: &str = "tile-cache-v1";

/// Partitions the current version expects; activation deletes the rest
pub const EXPECTED_CACHES: &[&str] = &[STATIC_CACHE, API_CACHE, IMAGE_CACHE, TILE_CACHE];

/// Shell assets pre-populated into the static partition at install
pub const SHELL_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/favicon.png",
    "/logo.png",
    "/manifest.json",
    "/placeholder.png",
    "/marker-icon-2x.png",
    "/marker-icon.png",
    "/marker-shadow.png",
    "/layers-2x.png",
    "/layers.png",
];

/// An intercepted outgoing request
#[derive(Debug, Clone)]
pub struct CacheRequest {
    pub method: Method,
    pub url: Url,
    /// What the requesting context will do with the response
    pub destination: Destination,
    /// True for top-level document navigations
    pub is_navigation: bool,
}

impl CacheRequest {
    /// A plain GET with no special destination
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            destination: Destination::Other,
            is_navigation: false,
        }
    }

    /// Mark the request as an image load
    pub fn image(mut self) -> Self {
        self.destination = Destination::Image;
        self
    }

    /// Mark the request as a top-level navigation
    pub fn navigation(mut self) -> Self {
        self.is_navigation = true;
        self
    }

    /// Use a different method than GET
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

/// A response fetched from the network
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    /// True for 2xx statuses
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Fresh from the network
    Network,
    /// A cache partition
    Cache,
    /// The bundled placeholder image or the synthesized pixel
    Placeholder,
    /// A locally synthesized error response
    Synthesized,
}

/// The response handed back to the requester
#[derive(Debug, Clone)]
pub struct ServedResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

/// Outcome of a best-effort cache population
///
/// Cache writes never fail the response path; call sites are free to
/// discard this value. Failures are logged inside the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestEffort {
    Stored,
    Skipped,
}
