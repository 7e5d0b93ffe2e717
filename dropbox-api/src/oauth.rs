use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::DropboxApiError;
use crate::http::HttpClient;
use crate::models::{Credentials, RefreshedToken, TokenResponse};

pub const AUTHORIZE_URL: &str = "https://www.dropbox.com/oauth2/authorize";
pub const TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";

/// Build the URL the account owner opens to grant access.
///
/// `token_access_type=offline` makes Dropbox issue a refresh token alongside
/// the short-lived access token.
pub fn authorization_url(base: &Url, client_id: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("token_access_type", "offline");
    url
}

pub struct OAuthClient {
    http: HttpClient,
    authorize_url: Url,
    token_url: Url,
}

impl OAuthClient {
    pub fn new(
        authorize_url: &str,
        token_url: &str,
        timeout: Duration,
    ) -> Result<Self, DropboxApiError> {
        Ok(Self {
            http: HttpClient::new(timeout)?,
            authorize_url: Url::parse(authorize_url)?,
            token_url: Url::parse(token_url)?,
        })
    }

    pub fn authorization_url(&self, client_id: &str) -> Url {
        authorization_url(&self.authorize_url, client_id)
    }

    /// Exchange a single-use authorization code for access and refresh tokens
    pub async fn exchange_code(
        &self,
        credentials: &Credentials,
        code: &str,
    ) -> Result<TokenResponse, DropboxApiError> {
        let form = [
            ("code", code),
            ("grant_type", "authorization_code"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose_secret()),
        ];

        let response = self
            .http
            .request(self.token_url.as_str(), Some(&form[..]), None)
            .await?;
        let status = response.status;
        let body = response.into_success().inspect_err(|_| {
            tracing::warn!(%status, "Token endpoint rejected authorization code");
        })?;

        if body.get("refresh_token").and_then(Value::as_str).is_none() {
            tracing::warn!("Token response has no refresh token");
            return Err(DropboxApiError::MissingRefreshToken { body });
        }

        let tokens: TokenResponse = serde_json::from_value(body)
            .map_err(|source| DropboxApiError::Decode { status, source })?;

        tracing::debug!(
            expires_in = tokens.expires_in,
            has_account_id = tokens.account_id.is_some(),
            "Successfully exchanged code for tokens"
        );

        Ok(tokens)
    }

    /// Mint a new access token from a refresh token
    pub async fn refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> Result<RefreshedToken, DropboxApiError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose_secret()),
        ];

        let response = self
            .http
            .request(self.token_url.as_str(), Some(&form[..]), None)
            .await?;
        let status = response.status;
        let body = response.into_success().inspect_err(|_| {
            tracing::warn!(%status, "Token endpoint rejected refresh token");
        })?;

        let refreshed: RefreshedToken = serde_json::from_value(body)
            .map_err(|source| DropboxApiError::Decode { status, source })?;

        tracing::debug!(expires_in = refreshed.expires_in, "Successfully refreshed access token");

        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use reqwest::StatusCode;

    fn client_for(server: &mockito::Server) -> OAuthClient {
        OAuthClient::new(
            AUTHORIZE_URL,
            &format!("{}/oauth2/token", server.url()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn query_value(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn authorization_url_requests_offline_code() {
        let base = Url::parse(AUTHORIZE_URL).unwrap();
        let url = authorization_url(&base, "abc123");

        assert_eq!(url.host_str(), Some("www.dropbox.com"));
        assert_eq!(url.path(), "/oauth2/authorize");
        assert_eq!(query_value(&url, "client_id").as_deref(), Some("abc123"));
        assert_eq!(query_value(&url, "response_type").as_deref(), Some("code"));
        assert_eq!(
            query_value(&url, "token_access_type").as_deref(),
            Some("offline")
        );
    }

    #[test]
    fn authorization_url_encodes_reserved_characters() {
        let base = Url::parse(AUTHORIZE_URL).unwrap();

        for client_id in ["a&b=c", "key with spaces", "x?y#z", "100%/+;", "ключ"] {
            let url = authorization_url(&base, client_id);
            let reparsed = Url::parse(url.as_str()).unwrap();

            assert_eq!(
                query_value(&reparsed, "client_id").as_deref(),
                Some(client_id)
            );
            assert_eq!(reparsed.query_pairs().count(), 3);
            assert!(reparsed.fragment().is_none());
        }
    }

    #[tokio::test]
    async fn exchange_code_posts_grant_and_returns_tokens() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("code".into(), "code1".into()),
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("client_id".into(), "abc123".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token": "AT1", "refresh_token": "RT1", "expires_in": 14400,
                    "token_type": "bearer", "account_id": "dbid:42"}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let tokens = client
            .exchange_code(&Credentials::new("abc123", "secret"), "code1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access_token, "AT1");
        assert_eq!(tokens.refresh_token, "RT1");
        assert_eq!(tokens.expires_in, 14400);
        assert_eq!(tokens.token_type, "bearer");
        assert_eq!(tokens.account_id.as_deref(), Some("dbid:42"));
    }

    #[tokio::test]
    async fn exchange_code_rejected_status_carries_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .exchange_code(&Credentials::new("abc123", "secret"), "used")
            .await
            .unwrap_err();

        match err {
            DropboxApiError::Rejected { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body["error"], "invalid_grant");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn exchange_code_non_200_success_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(201)
            .with_body(r#"{"access_token": "AT1", "refresh_token": "RT1", "expires_in": 1, "token_type": "bearer"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .exchange_code(&Credentials::new("abc123", "secret"), "code1")
            .await
            .unwrap_err();

        assert!(matches!(err, DropboxApiError::Rejected { status, .. } if status == StatusCode::CREATED));
    }

    #[tokio::test]
    async fn exchange_code_without_refresh_token_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token": "AT1", "expires_in": 14400, "token_type": "bearer"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .exchange_code(&Credentials::new("abc123", "secret"), "code1")
            .await
            .unwrap_err();

        match err {
            DropboxApiError::MissingRefreshToken { body } => {
                assert_eq!(body["access_token"], "AT1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_posts_refresh_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "RT1".into()),
                Matcher::UrlEncoded("client_id".into(), "abc123".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token": "AT2", "expires_in": 14400, "token_type": "bearer"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let refreshed = client
            .refresh(&Credentials::new("abc123", "secret"), "RT1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(refreshed.access_token, "AT2");
        assert_eq!(refreshed.expires_in, 14400);
    }

    #[tokio::test]
    async fn refresh_rejected_status_carries_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(401)
            .with_body("invalid refresh token")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .refresh(&Credentials::new("abc123", "secret"), "revoked")
            .await
            .unwrap_err();

        match err {
            DropboxApiError::Rejected { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, serde_json::json!({ "error": "invalid refresh token" }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let result = OAuthClient::new("not a url", TOKEN_URL, Duration::from_secs(5));
        assert!(matches!(result, Err(DropboxApiError::InvalidUrl(_))));
    }
}
