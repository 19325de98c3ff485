use super::types::{
    ApiEnvelope, OperatorForm, OperatorInfo, OperatorPage, OperatorQuery, OperatorStatus,
    OperatorUpdate, StatusChange, UserIdParam,
};
use crate::error::{Error, Result};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Settings for [`OperatorClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme, host and optional path prefix; `/api/operator/...` is appended.
    pub base_url: String,

    /// Sent with every request (for example `Authorization`).
    pub headers: BTreeMap<String, String>,

    /// Envelope `code` that means success.
    pub success_code: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            headers: BTreeMap::new(),
            success_code: 0,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Typed client for the operator admin resource.
///
/// Every method is a single request. JSON responses are unwrapped from the
/// `{ code, data, message }` envelope; a non-success `code` becomes
/// [`Error::Api`] and a non-2xx status becomes [`Error::RequestFailed`].
/// Mutations hand back the envelope's `data` untouched.
#[derive(Debug, Clone)]
pub struct OperatorClient {
    client: reqwest::Client,
    base: Url,
    config: ClientConfig,
}

impl OperatorClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidUrl(format!(
                "{}: cannot be used as a base URL",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// One page of operators matching `query`.
    pub async fn list(&self, query: &OperatorQuery) -> Result<OperatorPage> {
        let request = self.request(Method::GET, &["list"])?.query(query);
        self.send_json(request).await
    }

    pub async fn detail(&self, user_id: &str) -> Result<OperatorInfo> {
        self.send_json(self.request(Method::GET, &["detail", user_id])?)
            .await
    }

    pub async fn add(&self, form: &OperatorForm) -> Result<Value> {
        let request = self.request(Method::POST, &["add"])?.json(form);
        self.send_json(request).await
    }

    pub async fn update(&self, user_id: &str, form: &OperatorForm) -> Result<Value> {
        let body = OperatorUpdate { form, user_id };
        let request = self.request(Method::PUT, &["update"])?.json(&body);
        self.send_json(request).await
    }

    pub async fn delete(&self, user_id: &str) -> Result<Value> {
        let request = self
            .request(Method::DELETE, &["delete"])?
            .query(&UserIdParam { user_id });
        self.send_json(request).await
    }

    pub async fn reset_password(&self, user_id: &str) -> Result<Value> {
        let request = self
            .request(Method::POST, &["reset-password"])?
            .json(&UserIdParam { user_id });
        self.send_json(request).await
    }

    /// Enable or disable the operator identified by `operator_code`.
    pub async fn update_status(&self, operator_code: &str, control: OperatorStatus) -> Result<Value> {
        let request = self
            .request(Method::PUT, &["update-status"])?
            .json(&StatusChange {
                operator_code,
                control,
            });
        self.send_json(request).await
    }

    /// The raw export file (typically CSV or a spreadsheet) for `query`.
    pub async fn export(&self, query: &OperatorQuery) -> Result<Vec<u8>> {
        let request = self.request(Method::GET, &["export"])?.query(query);
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// `<base>/api/operator/<segments..>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(["api", "operator"])
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!(%method, url = %url, "operator request");
        let mut request = self.client.request(method, url);
        for (name, value) in &self.config.headers {
            request = request.header(name, value);
        }
        Ok(request)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), url = %response.url(), "operator request failed");
            return Err(Error::RequestFailed {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        let envelope: ApiEnvelope = serde_json::from_slice(&body).map_err(Error::decode)?;

        if envelope.code != self.config.success_code {
            error!(code = envelope.code, message = %envelope.message, "operator API rejected request");
            return Err(Error::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }
        serde_json::from_value(envelope.data).map_err(Error::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparsable_base_url() {
        let err = OperatorClient::new(ClientConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn endpoint_keeps_prefix_and_drops_trailing_slash() {
        let client = OperatorClient::new(ClientConfig::new("http://admin.test/prefix/")).unwrap();
        assert_eq!(
            client.endpoint(&["list"]).unwrap().as_str(),
            "http://admin.test/prefix/api/operator/list"
        );

        let bare = OperatorClient::new(ClientConfig::new("http://admin.test")).unwrap();
        assert_eq!(
            bare.endpoint(&["list"]).unwrap().as_str(),
            "http://admin.test/api/operator/list"
        );
    }

    #[test]
    fn user_id_is_a_single_encoded_segment() {
        let client = OperatorClient::new(ClientConfig::new("http://admin.test")).unwrap();
        let url = client.endpoint(&["detail", "a/b?c#d"]).unwrap();
        assert_eq!(url.path(), "/api/operator/detail/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn rejects_non_hierarchical_base_url() {
        let err = OperatorClient::new(ClientConfig::new("mailto:ops@admin.test")).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{ "base_url": "http://admin.test" }"#).unwrap();
        assert_eq!(config.success_code, 0);
        assert!(config.headers.is_empty());
    }
}
