//! # Interception Layer
//!
//! The request-handling pipeline: classify, then run exactly one strategy.
//!
//! - API images: cache-first; total failure serves the bundled placeholder
//!   or, failing that, a synthesized 1x1 transparent pixel
//! - API data: network-first with cache fallback, synthesized 503 JSON
//!   when neither is available
//! - Map tiles: cache-first, empty 503 on total failure
//! - Everything else: cache-first for known static resources; navigations
//!   go network-first and fall back to the cached shell document
//!
//! Cache population is best-effort and never fails the response path.

use crate::cache::rules::is_static_resource;
use crate::cache::{
    BestEffort, CacheRequest, CacheStore, Classifier, FetchedResponse, RequestClass,
    ResponseSource, ServedResponse, API_CACHE, IMAGE_CACHE, SHELL_MANIFEST, STATIC_CACHE,
    TILE_CACHE,
};
use crate::error::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use tracing::{debug, info, warn};

/// 1x1 transparent PNG served when an image and its placeholder are both
/// unavailable
const TRANSPARENT_PIXEL_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Network access seam, injectable for tests
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, request: &'a CacheRequest) -> BoxFuture<'a, Result<FetchedResponse>>;
}

/// Production fetcher over reqwest
#[derive(Debug, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, request: &'a CacheRequest) -> BoxFuture<'a, Result<FetchedResponse>> {
        Box::pin(async move {
            let response = self
                .client
                .request(request.method.clone(), request.url.clone())
                .send()
                .await?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            let body = response.bytes().await?.to_vec();

            Ok(FetchedResponse {
                status,
                content_type,
                body,
            })
        })
    }
}

/// Intercepts outgoing requests and applies per-class caching strategies
pub struct CacheLayer {
    store: CacheStore,
    fetcher: Box<dyn Fetcher>,
    classifier: Classifier,
    /// URL of the cached shell document navigations fall back to
    shell_url: Url,
    /// URL of the bundled placeholder image
    placeholder_url: Url,
    /// Origin the shell manifest paths resolve against
    app_origin: Url,
}

impl CacheLayer {
    /// Build the layer for one app origin and one story API origin
    pub fn new(
        store: CacheStore,
        fetcher: Box<dyn Fetcher>,
        app_origin: Url,
        api_origin: Url,
    ) -> Result<Self> {
        let shell_url = join(&app_origin, "/index.html")?;
        let placeholder_url = join(&app_origin, "/placeholder.png")?;
        Ok(Self {
            store,
            fetcher,
            classifier: Classifier::new(api_origin),
            shell_url,
            placeholder_url,
            app_origin,
        })
    }

    /// Pre-populate the static partition with the shell manifest
    ///
    /// Individual failures are logged and skipped; install never aborts on
    /// a missing asset.
    pub async fn install(&self) -> Result<()> {
        info!("cache install started");
        for path in SHELL_MANIFEST {
            let url = join(&self.app_origin, path)?;
            let request = CacheRequest::get(url.clone());
            match self.fetcher.fetch(&request).await {
                Ok(response) if response.ok() => {
                    let _ = self.cache_write(STATIC_CACHE, &url, &response).await;
                }
                Ok(response) => {
                    warn!(%url, status = response.status, "shell asset not cached");
                }
                Err(e) => {
                    warn!(%url, error = %e, "shell asset fetch failed");
                }
            }
        }
        info!("cache install finished");
        Ok(())
    }

    /// Drop partitions from older versions
    pub async fn activate(&self) -> Result<u64> {
        self.store.remove_unknown_partitions().await
    }

    /// Handle one intercepted request
    ///
    /// Non-GET requests pass straight through to the network, untouched by
    /// any cache.
    pub async fn handle(&self, request: &CacheRequest) -> Result<ServedResponse> {
        if request.method != Method::GET {
            let response = self.fetcher.fetch(request).await?;
            return Ok(network(response));
        }

        match self.classifier.classify(request) {
            RequestClass::ApiImage => Ok(self.handle_image(request).await),
            RequestClass::ApiData => Ok(self.handle_api(request).await),
            RequestClass::MapTile => Ok(self.handle_tile(request).await),
            RequestClass::Static => Ok(self.handle_static(request).await),
        }
    }

    /// Cache-first with placeholder fallback
    async fn handle_image(&self, request: &CacheRequest) -> ServedResponse {
        if let Ok(Some(hit)) = self.store.get_response(IMAGE_CACHE, request.url.as_str()).await {
            debug!(url = %request.url, "image served from cache");
            return cached(hit);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    let _ = self.cache_write(IMAGE_CACHE, &request.url, &response).await;
                }
                network(response)
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "image fetch failed, serving placeholder");
                self.placeholder_image().await
            }
        }
    }

    /// Network-first with cache fallback and synthesized 503
    async fn handle_api(&self, request: &CacheRequest) -> ServedResponse {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    let _ = self.cache_write(API_CACHE, &request.url, &response).await;
                }
                network(response)
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "network failed for api request, trying cache");
                if let Ok(Some(hit)) = self.store.get_response(API_CACHE, request.url.as_str()).await
                {
                    return cached(hit);
                }
                ServedResponse {
                    status: 503,
                    content_type: "application/json".to_string(),
                    body: br#"{"error":"Network unavailable"}"#.to_vec(),
                    source: ResponseSource::Synthesized,
                }
            }
        }
    }

    /// Cache-first; failures return an empty 503
    async fn handle_tile(&self, request: &CacheRequest) -> ServedResponse {
        if let Ok(Some(hit)) = self.store.get_response(TILE_CACHE, request.url.as_str()).await {
            return cached(hit);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    let _ = self.cache_write(TILE_CACHE, &request.url, &response).await;
                }
                network(response)
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "tile unavailable");
                ServedResponse {
                    status: 503,
                    content_type: "text/plain".to_string(),
                    body: Vec::new(),
                    source: ResponseSource::Synthesized,
                }
            }
        }
    }

    /// Static assets cache-first; navigations network-first with a cached
    /// shell fallback
    async fn handle_static(&self, request: &CacheRequest) -> ServedResponse {
        if request.is_navigation {
            return match self.fetcher.fetch(request).await {
                Ok(response) => network(response),
                Err(e) => {
                    debug!(url = %request.url, error = %e, "navigation offline, serving shell");
                    match self.store.get_response(STATIC_CACHE, self.shell_url.as_str()).await {
                        Ok(Some(shell)) => cached(shell),
                        _ => unavailable(),
                    }
                }
            };
        }

        if let Ok(Some(hit)) = self.store.get_response(STATIC_CACHE, request.url.as_str()).await {
            return cached(hit);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.ok() && is_static_resource(&request.url) {
                    let _ = self.cache_write(STATIC_CACHE, &request.url, &response).await;
                }
                network(response)
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "static resource unavailable");
                unavailable()
            }
        }
    }

    /// Bundled placeholder image, or the synthesized transparent pixel
    async fn placeholder_image(&self) -> ServedResponse {
        if let Ok(Some(placeholder)) = self
            .store
            .get_response(STATIC_CACHE, self.placeholder_url.as_str())
            .await
        {
            return ServedResponse {
                status: 200,
                content_type: placeholder.content_type,
                body: placeholder.body,
                source: ResponseSource::Placeholder,
            };
        }

        // Decoding a compile-time constant cannot fail.
        let pixel = BASE64.decode(TRANSPARENT_PIXEL_B64).unwrap_or_default();
        ServedResponse {
            status: 200,
            content_type: "image/png".to_string(),
            body: pixel,
            source: ResponseSource::Placeholder,
        }
    }

    /// Best-effort cache population; failure is logged, never propagated
    async fn cache_write(
        &self,
        partition: &str,
        url: &Url,
        response: &FetchedResponse,
    ) -> BestEffort {
        match self.store.put_response(partition, url.as_str(), response).await {
            Ok(()) => BestEffort::Stored,
            Err(e) => {
                warn!(partition, %url, error = %e, "cache write skipped");
                BestEffort::Skipped
            }
        }
    }
}

fn network(response: FetchedResponse) -> ServedResponse {
    ServedResponse {
        status: response.status,
        content_type: response.content_type,
        body: response.body,
        source: ResponseSource::Network,
    }
}

fn cached(hit: crate::cache::store::StoredResponse) -> ServedResponse {
    ServedResponse {
        status: hit.status,
        content_type: hit.content_type,
        body: hit.body,
        source: ResponseSource::Cache,
    }
}

fn unavailable() -> ServedResponse {
    ServedResponse {
        status: 503,
        content_type: "text/plain".to_string(),
        body: b"Resource not available offline".to_vec(),
        source: ResponseSource::Synthesized,
    }
}

fn join(origin: &Url, path: &str) -> Result<Url> {
    origin
        .join(path)
        .map_err(|e| crate::error::CeritaError::validation("url", e.to_string()))
}
