//! Record read/save endpoints

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::{RegistryClient, RegistryHttpClient};

#[derive(Debug, Serialize)]
struct ReadRequest<'a> {
    query: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_results: Option<u32>,
}

#[async_trait]
impl RegistryClient for RegistryHttpClient {
    async fn read(
        &self,
        endpoint: &str,
        filter: &Value,
        max_results: Option<u32>,
    ) -> Result<Vec<Value>> {
        let url = format!("{}/rest/{}/read", self.base_url, endpoint);
        tracing::debug!("Reading from registry endpoint {}", endpoint);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.login, Some(&self.password))
            .json(&ReadRequest {
                query: filter,
                max_results,
            })
            .send()
            .await?;

        self.handle_records(response).await
    }

    async fn save(&self, endpoint: &str, record: &Value) -> Result<Vec<Value>> {
        let url = format!("{}/rest/{}/save", self.base_url, endpoint);
        tracing::debug!("Saving to registry endpoint {}", endpoint);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.login, Some(&self.password))
            .json(record)
            .send()
            .await?;

        self.handle_records(response).await
    }
}
