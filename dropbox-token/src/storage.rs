use chrono::{DateTime, Local, SecondsFormat};
use dropbox_api::{Credentials, TokenResponse};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FlowError;

pub const TOKENS_FILE: &str = "dropbox-tokens.json";
pub const REFRESH_TOKEN_FILE: &str = "dropbox-refresh-token.txt";
pub const ENV_SNIPPET_FILE: &str = "dropbox-env-snippet.txt";

/// Layout of the JSON token record
#[derive(Debug, Serialize)]
struct TokenRecord<'a> {
    refresh_token: &'a str,
    access_token: &'a str,
    expires_in: u64,
    token_type: &'a str,
    account_id: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    created_at: &'a str,
}

#[derive(Debug, Clone)]
pub struct SavedFiles {
    pub tokens: PathBuf,
    pub refresh_token: PathBuf,
    pub env_snippet: PathBuf,
}

/// Writes the token files into one directory, overwriting previous runs
pub struct TokenFiles {
    dir: PathBuf,
}

impl TokenFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(
        &self,
        tokens: &TokenResponse,
        credentials: &Credentials,
    ) -> Result<SavedFiles, FlowError> {
        self.save_at(tokens, credentials, Local::now())
    }

    pub fn save_at(
        &self,
        tokens: &TokenResponse,
        credentials: &Credentials,
        created_at: DateTime<Local>,
    ) -> Result<SavedFiles, FlowError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                FlowError::TokenStorage(format!(
                    "Failed to create {}: {}",
                    self.dir.display(),
                    e
                ))
            })?;
        }

        let timestamp = created_at.to_rfc3339_opts(SecondsFormat::Micros, false);
        let client_secret = credentials.client_secret.expose_secret();

        let record = TokenRecord {
            refresh_token: &tokens.refresh_token,
            access_token: &tokens.access_token,
            expires_in: tokens.expires_in,
            token_type: &tokens.token_type,
            account_id: tokens.account_id.as_deref().unwrap_or_default(),
            client_id: &credentials.client_id,
            client_secret,
            created_at: &timestamp,
        };

        let saved = SavedFiles {
            tokens: self.dir.join(TOKENS_FILE),
            refresh_token: self.dir.join(REFRESH_TOKEN_FILE),
            env_snippet: self.dir.join(ENV_SNIPPET_FILE),
        };

        write_file(&saved.tokens, &serde_json::to_string_pretty(&record)?)?;
        write_file(&saved.refresh_token, &tokens.refresh_token)?;
        write_file(
            &saved.env_snippet,
            &env_snippet(
                &credentials.client_id,
                client_secret,
                &tokens.refresh_token,
                &timestamp,
            ),
        )?;

        tracing::info!(dir = %self.dir.display(), "Saved token files");

        Ok(saved)
    }
}

/// Lines to paste into an env file. The access token line is left commented
/// out since the refresh token replaces it.
pub fn env_snippet(
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
    generated_at: &str,
) -> String {
    format!(
        "# Dropbox OAuth Tokens (generated {generated_at})\n\
         DROPBOX_CLIENT_ID={client_id}\n\
         DROPBOX_CLIENT_SECRET={client_secret}\n\
         DROPBOX_REFRESH_TOKEN={refresh_token}\n\
         \n\
         # Remove or comment out DROPBOX_ACCESS_TOKEN (it expires!)\n\
         # DROPBOX_ACCESS_TOKEN=...\n"
    )
}

fn write_file(path: &Path, contents: &str) -> Result<(), FlowError> {
    fs::write(path, contents).map_err(|e| {
        FlowError::TokenStorage(format!("Failed to write {}: {}", path.display(), e))
    })
}
