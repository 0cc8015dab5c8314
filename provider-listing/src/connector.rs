//! Listing endpoint connector
//!
//! Implements the `ListingSource` trait against the content host's listing
//! endpoint: one HTTP GET per folder path, body handed to the extractor.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::listing::{ListingSource, RemoteEntry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::ListingError;
use crate::extract::extract_listing;

/// Default timeout for one listing fetch.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Connector for the directory-listing endpoint
///
/// The listing URL template is fixed: `{listing_url}?path={url-escaped path}`.
/// A fetch makes exactly one attempt (retry policy belongs to batch callers,
/// not the interactive path) and rejects within the configured timeout.
pub struct ListingConnector {
    /// HTTP client for listing requests
    http_client: Arc<dyn HttpClient>,

    /// Listing endpoint, e.g. `https://host.example.org/listing`
    listing_url: String,

    /// Base URL under which audio files are served
    audio_base_url: String,

    /// Per-fetch timeout
    timeout: Duration,
}

impl ListingConnector {
    /// Create a new connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `listing_url` - listing endpoint of the content host
    /// * `audio_base_url` - base URL of the audio content
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        listing_url: impl Into<String>,
        audio_base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            listing_url: listing_url.into(),
            audio_base_url: audio_base_url.into(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Override the per-fetch timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the listing URL for a folder path
    fn listing_url_for(&self, path: &str) -> String {
        format!("{}?path={}", self.listing_url, urlencoding::encode(path))
    }
}

#[async_trait]
impl ListingSource for ListingConnector {
    #[instrument(skip(self), fields(path = %path))]
    async fn fetch_listing(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let url = self.listing_url_for(path);
        debug!(url = %url, "Fetching folder listing");

        let request = HttpRequest::get(url).timeout(self.timeout);

        let response = self.http_client.execute(request).await.map_err(|e| {
            warn!(error = %e, "Listing fetch failed");
            match e {
                BridgeError::Timeout(_) => ListingError::Timeout {
                    path: path.to_string(),
                }
                .into(),
                other => BridgeError::from(ListingError::Network {
                    path: path.to_string(),
                    message: other.to_string(),
                }),
            }
        })?;

        if response.status != 200 {
            warn!(status = response.status, "Listing fetch returned non-200");
            return Err(ListingError::Http {
                status: response.status,
                path: path.to_string(),
            }
            .into());
        }

        let body = response
            .text()
            .map_err(|e| BridgeError::from(ListingError::InvalidResponse(e.to_string())))?;

        let listing = extract_listing(&body, path, &self.audio_base_url);
        debug!(
            folders = listing.folders.len(),
            tracks = listing.tracks.len(),
            "Extracted listing"
        );

        Ok(listing.into_entries())
    }
}
