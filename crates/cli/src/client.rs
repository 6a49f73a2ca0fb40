//! API client for a running rightsize advisor

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use engine_lib::{ContainerSeries, RecommendationSet};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn recommendations(
        &self,
        request: &RecommendationRequest<'_>,
    ) -> Result<RecommendationResponse> {
        self.post("api/v1/recommendations", request).await
    }

    pub async fn min_data_check(&self, series: &ContainerSeries) -> Result<bool> {
        let response: MinDataResponse = self
            .post("api/v1/min-data-check", &MinDataRequest { series })
            .await?;
        Ok(response.min_data_available)
    }
}

// Advisor wire types

#[derive(Debug, Serialize)]
pub struct RecommendationRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub series: &'a ContainerSeries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub container_name: String,
    pub engine: String,
    pub end_time: DateTime<Utc>,
    pub recommendations: RecommendationSet,
}

#[derive(Debug, Serialize)]
struct MinDataRequest<'a> {
    series: &'a ContainerSeries,
}

#[derive(Debug, Deserialize)]
struct MinDataResponse {
    min_data_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
        assert!(ApiClient::new("http://localhost:8080").is_ok());
    }

    #[test]
    fn test_request_omits_missing_fields() {
        let series = ContainerSeries::new();
        let request = RecommendationRequest {
            container_name: None,
            end_time: None,
            series: &series,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("container_name").is_none());
        assert!(json.get("end_time").is_none());
        assert_eq!(json["series"], serde_json::json!({}));
    }
}
