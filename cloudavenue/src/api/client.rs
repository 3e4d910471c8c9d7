use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::error::{classify, ApiError, HttpResponse};
use super::job::{JobHandle, JobReport, JobStatus, JobTracker};

const ACCESS_TOKEN_HEADER: &str = "X-VMWARE-VCLOUD-ACCESS-TOKEN";
const REQUEST_ID_HEADER: &str = "X-Request-Id";
const SESSION_ACCEPT: &str = "application/json;version=38.0";

/// HTTP connection settings shared by every request of a client
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ConnectionConfig {
    fn build_client(&self) -> Result<reqwest::Client, ApiError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(ApiError::Transport)
    }
}

/// Organization credentials used to open a session
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub org: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("org", &self.org)
            .finish()
    }
}

/// Cloud Avenue API client
///
/// Cheap to clone; the HTTP connection pool and the bearer token are shared.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    token: String,
    org: String,
}

impl Client {
    /// Open a session with the organization credentials and keep its token
    pub async fn connect(
        endpoint: &str,
        credentials: &Credentials,
        config: &ConnectionConfig,
    ) -> Result<Self, ApiError> {
        let base_url = normalize_endpoint(endpoint)?;
        let http = config.build_client()?;
        let url = format!("{}/cloudapi/1.0.0/sessions", base_url);

        tracing::debug!(
            user = %credentials.user,
            org = %credentials.org,
            "Opening Cloud Avenue session"
        );

        let response = http
            .post(&url)
            .basic_auth(
                format!("{}@{}", credentials.user, credentials.org),
                Some(&credentials.password),
            )
            .header(ACCEPT, SESSION_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Auth(format!(
                "invalid credentials for user {} in organization {}",
                credentials.user, credentials.org
            )));
        }
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        let token = response
            .headers()
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::Auth(format!("session response has no {} header", ACCESS_TOKEN_HEADER))
            })?;

        tracing::info!(org = %credentials.org, "Cloud Avenue session opened");

        Ok(Self::from_parts(http, base_url, token, credentials.org.clone()))
    }

    /// Build a client around an existing bearer token
    pub fn with_token(
        endpoint: &str,
        token: &str,
        org: &str,
        config: &ConnectionConfig,
    ) -> Result<Self, ApiError> {
        let base_url = normalize_endpoint(endpoint)?;
        let http = config.build_client()?;
        Ok(Self::from_parts(
            http,
            base_url,
            token.to_string(),
            org.to_string(),
        ))
    }

    fn from_parts(http: reqwest::Client, base_url: String, token: String, org: String) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                token,
                org,
            }),
        }
    }

    pub fn org(&self) -> &str {
        &self.inner.org
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn edge_gateways(&self) -> super::edge_gateway::EdgeGatewaysApi<'_> {
        super::edge_gateway::EdgeGatewaysApi::new(self)
    }

    pub fn public_ips(&self) -> super::public_ip::PublicIpsApi<'_> {
        super::public_ip::PublicIpsApi::new(self)
    }

    pub fn vdcs(&self) -> super::vdc::VdcsApi<'_> {
        super::vdc::VdcsApi::new(self)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::DELETE, path, None).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        let request_id = Uuid::new_v4().to_string();

        tracing::debug!(%method, path, request_id = %request_id, "Cloud Avenue API request");

        let mut request = self
            .inner
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.inner.token)
            .header(ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!(%method, path, request_id = %request_id, "request failed: {}", e);
            ApiError::Transport(e)
        })?;

        let status = response.status();
        tracing::debug!(
            %method,
            path,
            request_id = %request_id,
            status = status.as_u16(),
            "Cloud Avenue API response"
        );

        if status.is_success() {
            parse_success_response(response).await
        } else if status == StatusCode::UNAUTHORIZED {
            Err(ApiError::Auth(format!(
                "{} {} was rejected, the session token is invalid or expired",
                method, path
            )))
        } else {
            Err(error_from_response(response).await)
        }
    }
}

fn normalize_endpoint(endpoint: &str) -> Result<String, ApiError> {
    let parsed =
        url::Url::parse(endpoint)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ApiError::InvalidUrl(format!(
            "{}: scheme must be http or https",
            endpoint
        )));
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

fn encode_body<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::Parse(format!("failed to encode request body: {}", e)))
}

async fn parse_success_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let text = response.text().await?;
    // Empty bodies (204, 202 without payload) decode as JSON null
    let body = if text.trim().is_empty() {
        "null"
    } else {
        text.as_str()
    };

    serde_json::from_str::<T>(body).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
        ApiError::Parse(e.to_string())
    })
}

async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let err = format!("HTTP status {}", status);
    let http = HttpResponse {
        status: status.as_u16(),
        body,
    };

    match classify(Some(&err), Some(&http)) {
        Some(classified) => {
            tracing::debug!(status = http.status, "{}", classified);
            ApiError::Http(classified)
        }
        None => ApiError::UnexpectedStatus(http.status),
    }
}

#[derive(Debug, Deserialize)]
struct JobStatusEntry {
    status: String,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl JobTracker for Client {
    async fn job_status(&self, job: &JobHandle) -> Result<JobReport, ApiError> {
        let path = format!(
            "/api/customers/v1.0/jobs/{}",
            urlencoding::encode(job.as_str())
        );
        let entries: Vec<JobStatusEntry> = self.get(&path).await?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Parse(format!("job {} returned no status", job)))?;

        Ok(JobReport {
            status: JobStatus::parse(&entry.status),
            raw: entry.status,
            description: entry.description.unwrap_or_default(),
        })
    }
}
