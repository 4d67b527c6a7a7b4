//! Core HTTP operations with optional rate limiting
//!
//! Every request is a single attempt. Not-found is reported as `None` by the
//! helpers that support absent resources; other error statuses become
//! [`FetchError::ServerError`].

use std::num::NonZeroU32;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::errors::{FetchError, FetchResult};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: Option<DirectRateLimiter>,
}

impl HttpHandler {
    /// Creates a new HttpHandler, rate limited when `rate_limit_rps` is set
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidRateLimit` for a zero rate
    pub fn new(client: Client, rate_limit_rps: Option<u32>) -> FetchResult<Self> {
        let rate_limiter = rate_limit_rps.map(Self::build_rate_limiter).transpose()?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    fn build_rate_limiter(rate_limit_rps: u32) -> FetchResult<DirectRateLimiter> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| FetchError::InvalidRateLimit {
            reason: "rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }

    /// Parse a URL, mapping failures to `FetchError::InvalidUrl`
    pub fn parse_url(url: &str) -> FetchResult<Url> {
        Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            error: e.to_string(),
        })
    }

    /// Issue a GET and return the raw response
    pub async fn get_response(&self, url: &Url) -> FetchResult<Response> {
        self.throttle().await;
        let response = self.client.get(url.as_str()).send().await?;
        tracing::debug!("GET {} -> {}", url, response.status());
        Ok(response)
    }

    /// GET a text body, `None` on 404
    pub async fn get_optional_text(&self, url: &Url) -> FetchResult<Option<String>> {
        let response = self.get_response(url).await?;
        match Self::check_status(response, url)? {
            Some(response) => Ok(Some(response.text().await?)),
            None => Ok(None),
        }
    }

    /// GET and decode a JSON body, `None` on 404
    pub async fn get_optional_json<T: DeserializeOwned>(&self, url: &Url) -> FetchResult<Option<T>> {
        let response = self.get_response(url).await?;
        match Self::check_status(response, url)? {
            Some(response) => Ok(Some(response.json().await?)),
            None => Ok(None),
        }
    }

    /// GET and decode a JSON body, treating 404 as an error
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> FetchResult<T> {
        self.get_optional_json(url)
            .await?
            .ok_or_else(|| FetchError::ServerError {
                status: StatusCode::NOT_FOUND.as_u16(),
                url: url.to_string(),
            })
    }

    /// POST a JSON body and return the response text
    pub async fn post_json_for_text<B: Serialize + ?Sized>(
        &self,
        url: &Url,
        body: &B,
    ) -> FetchResult<String> {
        self.throttle().await;
        let response = self.client.post(url.as_str()).json(body).send().await?;
        tracing::debug!("POST {} -> {}", url, response.status());
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    /// Pass successful responses through, map 404 to `None` and other
    /// failures to `ServerError`
    fn check_status(response: Response, url: &Url) -> FetchResult<Option<Response>> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::ServerError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(Some(response))
    }
}
