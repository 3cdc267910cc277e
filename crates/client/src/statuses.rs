use reqwest::{Client, Method, Response, StatusCode};
use status_sync_core::UserStatus;
use thiserror::Error;
use url::Url;

const STATUS_IDS_PATH: &str = "api/v4/users/status/ids";

/// Client for the chat server's user status endpoints.
#[derive(Clone)]
pub struct StatusClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl StatusClient {
    /// Creates a new client. `base_url` should end with `/` so joins keep any path prefix.
    pub fn new(base_url: Url, token: Option<String>, http: Client) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    /// Issues a POST call returning the statuses of the given users.
    pub async fn get_statuses_by_ids(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<UserStatus>, StatusClientError> {
        let url = self.base_url.join(STATUS_IDS_PATH)?;
        let response = self
            .request(Method::POST, url)
            .json(user_ids)
            .send()
            .await?;

        parse_json(response).await
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("X-Requested-With", "XMLHttpRequest");
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }
}

/// Errors produced by the status client.
#[derive(Debug, Error)]
pub enum StatusClientError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

async fn parse_json(response: Response) -> Result<Vec<UserStatus>, StatusClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(StatusClientError::Status { status, body });
    }

    Ok(response.json().await?)
}
