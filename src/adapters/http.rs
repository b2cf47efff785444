use crate::domain::model::{
    Listing, RatingDistribution, RatingEntry, RatingSubmission, Report, ReportPayload, TargetRef,
};
use crate::domain::ports::{CatalogApi, ConfigProvider};
use crate::utils::error::{CatalogError, Result};
use crate::utils::validation::validate_url;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// [`CatalogApi`] over the catalog service's JSON REST interface.
#[derive(Debug, Clone)]
pub struct HttpCatalogApi {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpCatalogApi {
    pub fn new(base_url: &str, timeout: Duration, auth_token: Option<String>) -> Result<Self> {
        validate_url("api.base_url", base_url)?;
        let base_url = Url::parse(base_url).map_err(|e| CatalogError::ConfigError {
            message: format!("Invalid API base URL {}: {}", base_url, e),
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::ConfigError {
                message: format!("Could not build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            auth_token: auth_token.filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(
            config.api_base_url(),
            config.request_timeout(),
            config.auth_token().map(str::to_string),
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::ConfigError {
                message: format!("API base URL {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn ratings_endpoint(&self, target: &TargetRef, suffix: Option<&str>) -> Result<Url> {
        let mut segments = vec!["ratings", target.kind().as_str(), target.id()];
        segments.extend(suffix);
        self.endpoint(&segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {} ({})", status, response.url());

        if !status.is_success() {
            return Err(CatalogError::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait::async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn list_listings(&self, query: Option<&str>) -> Result<Vec<Listing>> {
        let mut url = self.endpoint(&["listings"])?;
        if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
            url.query_pairs_mut().append_pair("q", query);
        }

        tracing::debug!("Making API request to: {}", url);
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn get_rating_summary(&self, target: &TargetRef) -> Result<RatingDistribution> {
        let url = self.ratings_endpoint(target, Some("summary"))?;
        tracing::debug!("Making API request to: {}", url);
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn get_rating_entries(&self, target: &TargetRef) -> Result<Vec<RatingEntry>> {
        let url = self.ratings_endpoint(target, None)?;
        tracing::debug!("Making API request to: {}", url);
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn submit_rating(
        &self,
        target: &TargetRef,
        submission: &RatingSubmission,
    ) -> Result<RatingEntry> {
        let url = self.ratings_endpoint(target, None)?;
        tracing::debug!("Posting rating to: {}", url);
        self.send_json(self.request(Method::POST, url).json(submission))
            .await
    }

    async fn create_report(&self, payload: &ReportPayload) -> Result<Report> {
        let url = self.endpoint(&["reports"])?;
        tracing::debug!("Posting report to: {}", url);
        self.send_json(self.request(Method::POST, url).json(payload))
            .await
    }
}
