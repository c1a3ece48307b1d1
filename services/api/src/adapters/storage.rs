//! services/api/src/adapters/storage.rs
//!
//! This module contains the object-storage fetch adapter, the concrete
//! implementation of the `DocumentFetcher` port. Redirects are followed
//! manually so that every hop is checked against the trusted storage origin
//! and the chain stays bounded.

use async_trait::async_trait;
use futures::TryStreamExt;
use omniread_core::locator::{normalize_secure, TrustedOrigin};
use omniread_core::ports::{DocumentFetcher, FetchError, FetchedDocument};
use reqwest::header::{HeaderValue, LOCATION};
use reqwest::{redirect, Client};
use std::time::Duration;
use tracing::{error, warn};
use url::Url;

/// Hard cap on redirect hops for one fetch.
const MAX_REDIRECT_HOPS: usize = 5;

/// Storage CDNs refuse requests without a browser-looking client.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A fetch adapter that implements the `DocumentFetcher` port over HTTPS.
///
/// Each `fetch` opens an independent upstream connection; there is no
/// caching or request coalescing. Dropping the returned stream aborts the
/// upstream transfer, which releases the connection when a client
/// disconnects mid-download.
pub struct CloudStorageFetcher {
    client: Client,
    trusted: TrustedOrigin,
}

impl CloudStorageFetcher {
    /// Creates a new `CloudStorageFetcher`. `timeout` bounds each upstream
    /// request, including the time spent consuming its body.
    pub fn new(trusted: TrustedOrigin, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            // Hops are followed by hand in `fetch` so each one can be
            // re-validated against the trusted origin.
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { client, trusted })
    }
}

//=========================================================================================
// `DocumentFetcher` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentFetcher for CloudStorageFetcher {
    async fn fetch(&self, locator: &str) -> Result<FetchedDocument, FetchError> {
        let mut url =
            normalize_secure(locator).map_err(|e| FetchError::InvalidLocator(e.to_string()))?;

        // One initial request plus up to MAX_REDIRECT_HOPS follow-ups.
        for _ in 0..=MAX_REDIRECT_HOPS {
            if !self.trusted.permits(&url) {
                warn!(
                    "Blocked fetch of locator outside the trusted storage domain: host={:?}",
                    url.host_str()
                );
                return Err(FetchError::Forbidden);
            }

            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(map_transport_error)?;

            let status = response.status();
            if status.is_redirection() {
                match response.headers().get(LOCATION) {
                    Some(location) => {
                        url = next_location(&url, location)?;
                        continue;
                    }
                    // A redirect with nowhere to go is surfaced as-is.
                    None => return Err(FetchError::UpstreamStatus(status.as_u16())),
                }
            }
            if !status.is_success() {
                error!("Upstream storage returned {} for {}", status, url);
                return Err(FetchError::UpstreamStatus(status.as_u16()));
            }

            let content_length = response.content_length();
            let stream = response.bytes_stream().map_err(map_transport_error);
            return Ok(FetchedDocument {
                content_length,
                stream: Box::pin(stream),
            });
        }

        error!("Redirect chain exceeded {} hops", MAX_REDIRECT_HOPS);
        Err(FetchError::TooManyRedirects)
    }
}

fn map_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}

/// Resolves a Location header against the URL that produced it. Relative
/// redirects are joined; the scheme is re-normalized for the next hop.
fn next_location(current: &Url, location: &HeaderValue) -> Result<Url, FetchError> {
    let location = location
        .to_str()
        .map_err(|_| FetchError::Network("Redirect Location header is not valid text".into()))?;
    let mut url = current
        .join(location)
        .map_err(|e| FetchError::InvalidLocator(e.to_string()))?;
    if url.scheme() == "http" {
        let _ = url.set_scheme("https");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn absolute_location_replaces_the_url() {
        let next = next_location(
            &url("https://res.cloudinary.com/demo/a.pdf"),
            &HeaderValue::from_static("https://res.cloudinary.com/demo/b.pdf"),
        )
        .unwrap();
        assert_eq!(next.as_str(), "https://res.cloudinary.com/demo/b.pdf");
    }

    #[test]
    fn relative_location_is_joined_against_the_current_url() {
        let next = next_location(
            &url("https://res.cloudinary.com/demo/raw/a.pdf"),
            &HeaderValue::from_static("/demo/raw/b.pdf"),
        )
        .unwrap();
        assert_eq!(next.as_str(), "https://res.cloudinary.com/demo/raw/b.pdf");
    }

    #[test]
    fn redirect_to_plain_http_is_upgraded() {
        let next = next_location(
            &url("https://res.cloudinary.com/demo/a.pdf"),
            &HeaderValue::from_static("http://res.cloudinary.com/demo/b.pdf"),
        )
        .unwrap();
        assert_eq!(next.scheme(), "https");
    }
}
