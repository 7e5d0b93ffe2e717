mod error;
pub mod http;
pub mod models;
pub mod oauth;

pub use crate::error::DropboxApiError;
pub use http::{ApiResponse, HttpClient};
pub use models::{Credentials, RefreshedToken, TokenResponse};
pub use oauth::{authorization_url, OAuthClient, AUTHORIZE_URL, TOKEN_URL};
