//! Upstream HTTP access: GeoMet point queries and plain document fetches.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header, Client, Url};
use thiserror::Error;
use tracing::debug;
use wms_protocol::{parse_feature_info_value, FeatureInfoError, GetFeatureInfoRequest};

use crate::config::ServiceConfig;
use crate::metrics;

pub const ACCEPT_FEATURE_INFO: &str = "application/json, text/plain";
pub const ACCEPT_FEED: &str = "application/xml, text/xml, */*";

/// Why a single upstream request produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("upstream ServiceException: {0}")]
    ServiceException(String),

    #[error("unparseable response: {0}")]
    Unparseable(String),
}

impl FetchFailure {
    /// Short label for the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchFailure::Network(_) => "network",
            FetchFailure::Timeout => "timeout",
            FetchFailure::HttpStatus(_) => "http_status",
            FetchFailure::ServiceException(_) => "service_exception",
            FetchFailure::Unparseable(_) => "unparseable",
        }
    }
}

impl From<FeatureInfoError> for FetchFailure {
    fn from(err: FeatureInfoError) -> Self {
        match err {
            FeatureInfoError::ServiceException(msg) => FetchFailure::ServiceException(msg),
            other => FetchFailure::Unparseable(other.to_string()),
        }
    }
}

/// HTTP client with a per-request deadline and fixed identification headers.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.request_timeout, &config.user_agent)
    }

    /// GET `url` and return the body. Status >= 400 is a failure.
    pub async fn get_text(&self, url: Url, accept: &str) -> Result<String, FetchFailure> {
        let request = self.client.get(url).header(header::ACCEPT, accept).send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| FetchFailure::Timeout)?
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(FetchFailure::HttpStatus(status.as_u16()));
        }

        tokio::time::timeout(self.timeout, response.text())
            .await
            .map_err(|_| FetchFailure::Timeout)?
            .map_err(classify_reqwest_error)
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Network(err.to_string())
    }
}

/// A service that answers GetFeatureInfo point queries.
#[async_trait]
pub trait PointSource: Send + Sync {
    /// Full request URL, for logs and debug output.
    fn request_url(&self, request: &GetFeatureInfoRequest) -> String;

    /// Raw response body.
    async fn fetch_body(&self, request: &GetFeatureInfoRequest) -> Result<String, FetchFailure>;

    /// Sampled value, parsed but not unit-converted.
    async fn fetch_value(&self, request: &GetFeatureInfoRequest) -> Result<f64, FetchFailure> {
        let body = self.fetch_body(request).await?;
        Ok(parse_feature_info_value(&body)?)
    }
}

/// MSC GeoMet WMS.
#[derive(Debug, Clone)]
pub struct GeoMetSource {
    client: UpstreamClient,
    base_url: Url,
}

impl GeoMetSource {
    pub fn new(client: UpstreamClient, base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid GeoMet URL: {}", base_url))?;
        Ok(Self { client, base_url })
    }

    fn build_url(&self, request: &GetFeatureInfoRequest) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().extend_pairs(request.query_pairs());
        url
    }
}

#[async_trait]
impl PointSource for GeoMetSource {
    fn request_url(&self, request: &GetFeatureInfoRequest) -> String {
        self.build_url(request).to_string()
    }

    async fn fetch_body(&self, request: &GetFeatureInfoRequest) -> Result<String, FetchFailure> {
        metrics::record_upstream_request();
        let url = self.build_url(request);
        let result = self.client.get_text(url, ACCEPT_FEATURE_INFO).await;
        if let Err(failure) = &result {
            debug!(layer = %request.layer, time = ?request.time, reason = failure.reason(), error = %failure, "GeoMet request failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reasons() {
        assert_eq!(FetchFailure::Timeout.reason(), "timeout");
        assert_eq!(FetchFailure::HttpStatus(503).reason(), "http_status");
        assert_eq!(
            FetchFailure::from(FeatureInfoError::ServiceException("x".into())).reason(),
            "service_exception"
        );
        assert_eq!(
            FetchFailure::from(FeatureInfoError::Empty).reason(),
            "unparseable"
        );
    }

    #[test]
    fn test_url_encodes_wms_parameters() {
        let client = UpstreamClient::new(Duration::from_secs(15), "test").unwrap();
        let source = GeoMetSource::new(client, "https://geo.weather.gc.ca/geomet").unwrap();
        let request = GetFeatureInfoRequest::for_point(
            "HRDPS.CONTINENTAL_TT",
            -123.1558,
            49.7016,
            Some("2024-07-15T21:00:00Z".into()),
        );
        let url = source.request_url(&request);
        assert!(url.starts_with("https://geo.weather.gc.ca/geomet?SERVICE=WMS&VERSION=1.1.1"));
        assert!(url.contains("LAYERS=HRDPS.CONTINENTAL_TT"));
        assert!(url.contains("TIME=2024-07-15T21%3A00%3A00Z"));
        assert!(url.contains("BBOX=-123.170800%2C49.686600%2C-123.140800%2C49.716600"));
    }
}
