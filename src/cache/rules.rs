//! Request Classification
//!
//! Maps each intercepted request to exactly one request class before any
//! I/O begins. The rules live in an ordered table evaluated
//! first-match-wins, so the priority between image, API, tile, and static
//! handling is explicit and testable. Classification is side-effect-free.

use crate::cache::CacheRequest;
use reqwest::Url;

/// Tile-provider origins served from the tile partition
pub const TILE_HOSTS: &[&str] = &[
    "tile.openstreetmap.org",
    "tile.openstreetmap.fr",
    "basemaps.cartocdn.com",
];

/// File extensions treated as cacheable static resources
pub const STATIC_EXTENSIONS: &[&str] = &[
    ".js", ".css", ".png", ".jpg", ".jpeg", ".svg", ".ico", ".json", ".woff", ".woff2",
];

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".blob"];

/// What the requesting context will do with the response
///
/// Only the image destination changes classification; navigations carry
/// their own flag on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Image,
    Other,
}

/// One of the four strategy families a request can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Image under the story API origin: cache-first, placeholder fallback
    ApiImage,
    /// Non-image story API request: network-first, cache fallback
    ApiData,
    /// Map tile from an allow-listed provider: cache-first, long retention
    MapTile,
    /// Everything else: static cache-first, navigation network-first
    Static,
}

type Predicate = Box<dyn Fn(&CacheRequest) -> bool + Send + Sync>;

/// Ordered (predicate, class) table, first match wins
pub struct Classifier {
    rules: Vec<(RequestClass, Predicate)>,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let classes: Vec<RequestClass> = self.rules.iter().map(|(c, _)| *c).collect();
        f.debug_struct("Classifier").field("order", &classes).finish()
    }
}

impl Classifier {
    /// Build the rule table for the given story API origin
    pub fn new(api_origin: Url) -> Self {
        let image_origin = api_origin.clone();
        let data_origin = api_origin;

        let rules: Vec<(RequestClass, Predicate)> = vec![
            (
                RequestClass::ApiImage,
                Box::new(move |req| {
                    same_origin(&req.url, &image_origin)
                        && (req.destination == Destination::Image
                            || req.url.path().contains("/images/")
                            || has_extension(req.url.path(), IMAGE_EXTENSIONS))
                }),
            ),
            (
                RequestClass::ApiData,
                Box::new(move |req| same_origin(&req.url, &data_origin)),
            ),
            (
                RequestClass::MapTile,
                Box::new(|req| {
                    req.url
                        .host_str()
                        .map(|host| TILE_HOSTS.iter().any(|t| host_within(host, t)))
                        .unwrap_or(false)
                }),
            ),
            (RequestClass::Static, Box::new(|_| true)),
        ];

        Self { rules }
    }

    /// Resolve a request to its class
    pub fn classify(&self, request: &CacheRequest) -> RequestClass {
        for (class, matches) in &self.rules {
            if matches(request) {
                return *class;
            }
        }
        // The table ends with a catch-all rule.
        RequestClass::Static
    }
}

/// True when the URL path ends in a known static-resource extension
pub fn is_static_resource(url: &Url) -> bool {
    has_extension(url.path(), STATIC_EXTENSIONS)
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    let lower = path.to_ascii_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext))
}

/// True when `host` is `domain` or a subdomain of it; the match must fall
/// on a label boundary
fn host_within(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .map(|prefix| prefix.ends_with('.'))
            .unwrap_or(false)
}

fn same_origin(url: &Url, origin: &Url) -> bool {
    url.scheme() == origin.scheme()
        && url.host_str() == origin.host_str()
        && url.port_or_known_default() == origin.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(Url::parse("https://story-api.dicoding.dev").unwrap())
    }

    fn request(url: &str) -> CacheRequest {
        CacheRequest::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_api_image_by_path() {
        let class = classifier().classify(&request(
            "https://story-api.dicoding.dev/images/stories/photo-1.jpg",
        ));
        assert_eq!(class, RequestClass::ApiImage);
    }

    #[test]
    fn test_api_image_by_destination() {
        let req = request("https://story-api.dicoding.dev/v1/some-resource").image();
        assert_eq!(classifier().classify(&req), RequestClass::ApiImage);
    }

    #[test]
    fn test_api_data() {
        let class = classifier().classify(&request("https://story-api.dicoding.dev/v1/stories?size=100"));
        assert_eq!(class, RequestClass::ApiData);
    }

    #[test]
    fn test_image_beats_data_in_priority() {
        // An image extension under the API origin must never fall through to
        // the API data rule.
        let class = classifier().classify(&request(
            "https://story-api.dicoding.dev/v1/photos/x.png",
        ));
        assert_eq!(class, RequestClass::ApiImage);
    }

    #[test]
    fn test_map_tile_allow_list() {
        for url in [
            "https://a.tile.openstreetmap.org/3/4/2.png",
            "https://b.tile.openstreetmap.fr/hot/3/4/2.png",
            "https://cartodb-basemaps-a.global.ssl.fastly.net/light_all/1/0/0.png",
        ] {
            let class = classifier().classify(&request(url));
            if url.contains("fastly") {
                // Not an allow-listed origin.
                assert_eq!(class, RequestClass::Static);
            } else {
                assert_eq!(class, RequestClass::MapTile);
            }
        }
    }

    #[test]
    fn test_lookalike_tile_host_is_not_a_tile() {
        // Suffix-matches "tile.openstreetmap.org" without being a
        // subdomain of it.
        let class = classifier().classify(&request(
            "https://eviltile.openstreetmap.org/3/4/2.png",
        ));
        assert_eq!(class, RequestClass::Static);
    }

    #[test]
    fn test_everything_else_is_static() {
        let class = classifier().classify(&request("https://app.example.test/assets/main.css"));
        assert_eq!(class, RequestClass::Static);
    }

    #[test]
    fn test_static_resource_extensions() {
        assert!(is_static_resource(
            &Url::parse("https://app.example.test/app.JS").unwrap()
        ));
        assert!(!is_static_resource(
            &Url::parse("https://app.example.test/api/data").unwrap()
        ));
    }
}
