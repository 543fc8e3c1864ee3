use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::warn;

use crate::config::{ApiConfig, DEFAULT_VALIDATE_URL};
use crate::fetch::{ApiKey, BasicClient, HttpClient, fetch_json, fetch_status};
use crate::services::transit_api::{
    ApiRoute, ApiStop, PathDetails, RoutesResponse, StopsResponse, TransitApi,
};

/// Bus endpoints of the WMATA API.
pub struct WmataClient<C> {
    http: C,
    base_url: String,
    validate_url: String,
}

impl WmataClient<ApiKey<BasicClient>> {
    /// Client authenticating with the configured key.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let http = ApiKey::transit(BasicClient::new()?, &config.api_key)?;
        Ok(Self::new(http, &config.base_url).with_validate_url(&config.validate_url))
    }
}

impl<C: HttpClient> WmataClient<C> {
    pub fn new(http: C, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            validate_url: DEFAULT_VALIDATE_URL.to_string(),
        }
    }

    pub fn with_validate_url(mut self, url: &str) -> Self {
        self.validate_url = url.to_string();
        self
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

#[async_trait]
impl<C: HttpClient> TransitApi for WmataClient<C> {
    async fn validate_key(&self) -> Result<bool> {
        let status = fetch_status(&self.http, &self.validate_url).await?;
        if !status.is_success() {
            warn!(%status, "API key rejected");
        }
        Ok(status.is_success())
    }

    async fn stops(&self) -> Result<Vec<ApiStop>> {
        let resp: StopsResponse = fetch_json(&self.http, &self.endpoint("jStops"), &[]).await?;
        Ok(resp.stops)
    }

    async fn routes(&self) -> Result<Vec<ApiRoute>> {
        let resp: RoutesResponse = fetch_json(&self.http, &self.endpoint("jRoutes"), &[]).await?;
        Ok(resp.routes)
    }

    async fn path_details(
        &self,
        route_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<PathDetails> {
        let mut query = vec![("RouteID", route_id.to_string())];
        if let Some(date) = date {
            query.push(("Date", date.format("%Y-%m-%d").to_string()));
        }
        fetch_json(&self.http, &self.endpoint("jRouteDetails"), &query).await
    }
}
