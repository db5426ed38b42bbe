use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use claimdesk_core::config::ApiConfig;
use claimdesk_core::preview::{PreviewRequest, PreviewResult};
use claimdesk_core::{
    ApprovalPayload, CatalogHit, CatalogSearch, ClaimId, ClaimService, RejectPayload, ServiceError,
};

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("failed to build http client: {0}")]
    Build(String),
}

/// reqwest-backed implementation of the claim and catalog endpoints of the
/// campaign backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ApiClientError::Build(error.to_string()))?;
        Ok(Self { http, base_url: normalize_base_url(&config.base_url) })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json<B, T>(
        &self,
        token: &SecretString,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| transport(path, error))?;
        let response = check_status(path, response).await?;

        response.json().await.map_err(|error| transport(path, error))
    }

    async fn post_json_unit<B>(
        &self,
        token: &SecretString,
        path: &str,
        body: &B,
    ) -> Result<(), ServiceError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| transport(path, error))?;
        check_status(path, response).await?;
        Ok(())
    }

    async fn get_hits(
        &self,
        token: &SecretString,
        path: &str,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError> {
        let response = self
            .http
            .get(self.endpoint(path))
            .bearer_auth(token.expose_secret())
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|error| transport(path, error))?;
        let response = check_status(path, response).await?;

        response.json().await.map_err(|error| transport(path, error))
    }
}

#[async_trait]
impl ClaimService for ApiClient {
    async fn preview_redemption(
        &self,
        token: &SecretString,
        claim_id: &ClaimId,
        request: &PreviewRequest,
    ) -> Result<PreviewResult, ServiceError> {
        let path = format!("/claims/{}/redemption-preview", claim_id.0);
        debug!(
            event_name = "api.preview.request_sent",
            claim_id = %claim_id.0,
            "requesting redemption preview"
        );
        self.post_json(token, &path, request).await
    }

    async fn approve_claim(
        &self,
        token: &SecretString,
        claim_id: &ClaimId,
        payload: &ApprovalPayload,
    ) -> Result<(), ServiceError> {
        let path = format!("/claims/{}/approve", claim_id.0);
        debug!(
            event_name = "api.claim.approve_sent",
            claim_id = %claim_id.0,
            "approving claim"
        );
        self.post_json_unit(token, &path, payload).await
    }

    async fn reject_claim(
        &self,
        token: &SecretString,
        claim_id: &ClaimId,
        payload: &RejectPayload,
    ) -> Result<(), ServiceError> {
        let path = format!("/claims/{}/reject", claim_id.0);
        debug!(
            event_name = "api.claim.reject_sent",
            claim_id = %claim_id.0,
            "rejecting claim"
        );
        self.post_json_unit(token, &path, payload).await
    }
}

#[async_trait]
impl CatalogSearch for ApiClient {
    async fn scope_products(
        &self,
        token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError> {
        self.get_hits(token, "/catalog/scope/products", query).await
    }

    async fn scope_bundles(
        &self,
        token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError> {
        self.get_hits(token, "/catalog/scope/bundles", query).await
    }

    async fn grant_products(
        &self,
        token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError> {
        self.get_hits(token, "/catalog/grant/products", query).await
    }

    async fn grant_bundles(
        &self,
        token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError> {
        self.get_hits(token, "/catalog/grant/bundles", query).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

fn transport(path: &str, error: reqwest::Error) -> ServiceError {
    warn!(
        event_name = "api.transport_failed",
        path,
        error = %error,
        "backend call failed in transport"
    );
    ServiceError::Transport(error.to_string())
}

async fn check_status(path: &str, response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = rejection_message(status, &body);
    warn!(
        event_name = "api.request_rejected",
        path,
        status = status.as_u16(),
        message = %message,
        "backend rejected the request"
    );
    Err(ServiceError::Rejected(message))
}

fn rejection_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("request failed with status {status}"))
}

#[cfg(test)]
mod tests {
    use claimdesk_core::config::ApiConfig;
    use reqwest::StatusCode;

    use super::{normalize_base_url, rejection_message, ApiClient};

    #[test]
    fn base_url_loses_its_trailing_slash() {
        assert_eq!(normalize_base_url("https://api.example.test/"), "https://api.example.test");
        assert_eq!(normalize_base_url("https://api.example.test"), "https://api.example.test");
    }

    #[test]
    fn endpoints_join_cleanly() {
        let client = ApiClient::from_config(&ApiConfig {
            base_url: "https://api.example.test/".to_string(),
            timeout_secs: 5,
        })
        .expect("client builds");

        assert_eq!(
            client.endpoint("/claims/clm-1/approve"),
            "https://api.example.test/claims/clm-1/approve"
        );
    }

    #[test]
    fn rejection_prefers_the_server_message() {
        let message =
            rejection_message(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message":"claim expired"}"#);
        assert_eq!(message, "claim expired");
    }

    #[test]
    fn rejection_falls_back_to_the_status_line() {
        let message = rejection_message(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(message, "request failed with status 502 Bad Gateway");
    }

    #[test]
    fn blank_server_messages_are_ignored() {
        let message = rejection_message(StatusCode::BAD_REQUEST, r#"{"message":"  "}"#);
        assert_eq!(message, "request failed with status 400 Bad Request");
    }
}
