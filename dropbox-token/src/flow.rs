use dropbox_api::{Credentials, DropboxApiError, OAuthClient, TokenResponse};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::io::Write;
use tokio::io::AsyncBufRead;

use crate::console::Console;
use crate::error::{Field, FlowError};
use crate::storage::{SavedFiles, TokenFiles, ENV_SNIPPET_FILE, REFRESH_TOKEN_FILE, TOKENS_FILE};

const APP_CONSOLE_URL: &str = "https://www.dropbox.com/developers/apps";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Skipped,
    Passed,
    Failed,
}

/// Result of a flow that got as far as writing the token files
#[derive(Debug)]
pub struct Outcome {
    pub saved: SavedFiles,
    pub verification: Verification,
}

/// Guided authorization-code flow for one account owner
pub struct Flow<R, W> {
    console: Console<R, W>,
    client: OAuthClient,
    files: TokenFiles,
    env_file: String,
}

impl<R, W> Flow<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(
        console: Console<R, W>,
        client: OAuthClient,
        files: TokenFiles,
        env_file: impl Into<String>,
    ) -> Self {
        Self {
            console,
            client,
            files,
            env_file: env_file.into(),
        }
    }

    pub fn into_console(self) -> Console<R, W> {
        self.console
    }

    /// Run the flow and report expected failures on the console.
    ///
    /// Only errors outside missing input and token endpoint refusals are returned.
    pub async fn execute(&mut self) -> Result<(), FlowError> {
        match self.run().await {
            Ok(outcome) => {
                tracing::info!(verification = ?outcome.verification, "Flow finished");
                Ok(())
            }
            Err(err) => self.report(err),
        }
    }

    pub async fn run(&mut self) -> Result<Outcome, FlowError> {
        self.introduce()?;

        let credentials = self.collect_credentials().await?;
        self.show_authorization_url(&credentials.client_id)?;

        let code = self.collect_code().await?;

        self.console.header("Step 4: Exchanging Code for Refresh Token")?;
        self.console.line("Requesting refresh token from Dropbox...\n")?;
        tracing::info!("Exchanging authorization code");
        let tokens = self.client.exchange_code(&credentials, &code).await?;

        self.console.line("✅ Success! Got refresh token.\n")?;
        self.show_tokens(&tokens)?;

        let saved = self.files.save(&tokens, &credentials)?;
        self.console.line(format!("📄 Saved tokens to: {}", saved.tokens.display()))?;
        self.console.line(format!(
            "📄 Saved refresh token to: {}",
            saved.refresh_token.display()
        ))?;
        self.console.line(format!(
            "📄 Saved .env snippet to: {}\n",
            saved.env_snippet.display()
        ))?;

        self.show_env_instructions(&credentials, &tokens.refresh_token)?;

        self.console.header("Step 6: Test the Refresh Token")?;
        let choice = self
            .console
            .prompt("Do you want to test the refresh token now? (y/n): ")
            .await?;

        let verification = if choice.eq_ignore_ascii_case("y") {
            if self
                .verify_refresh_token(&credentials, &tokens.refresh_token)
                .await?
            {
                Verification::Passed
            } else {
                return Ok(Outcome {
                    saved,
                    verification: Verification::Failed,
                });
            }
        } else {
            Verification::Skipped
        };

        self.show_next_steps()?;

        Ok(Outcome {
            saved,
            verification,
        })
    }

    /// Mint an access token from `refresh_token`. A rejected request prints the
    /// error body and yields `false`.
    pub async fn verify_refresh_token(
        &mut self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> Result<bool, FlowError> {
        self.console.header("Testing Refresh Token")?;
        self.console
            .line("Requesting new access token using refresh token...\n")?;

        match self.client.refresh(credentials, refresh_token).await {
            Ok(refreshed) => {
                let preview: String = refreshed.access_token.chars().take(20).collect();
                self.console.line("✅ Success! Refresh token works!\n")?;
                self.console.line(format!("New access token: {}...", preview))?;
                self.console
                    .line(format!("Expires in: {} seconds\n", refreshed.expires_in))?;
                self.console
                    .line("Your refresh token is valid and ready to use! 🎉\n")?;
                tracing::info!("Refresh token verified");
                Ok(true)
            }
            Err(DropboxApiError::Rejected { status, body }) => {
                tracing::warn!(%status, "Refresh token test failed");
                self.console.line("❌ Error testing refresh token:")?;
                self.print_json(&body)?;
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Print guidance for the failures a user can fix by rerunning.
    /// Anything else is handed back to the caller.
    fn report(&mut self, err: FlowError) -> Result<(), FlowError> {
        match err {
            FlowError::MissingInput(field) => {
                tracing::warn!(?field, "Required input missing");
                self.console.line(format!("\n❌ {} required!", field))?;
            }
            FlowError::Api(DropboxApiError::Rejected { status, body }) => {
                tracing::warn!(%status, "Authorization code exchange failed");
                self.console.line("❌ Error getting refresh token:")?;
                self.print_json(&body)?;
                self.console.line("\nCommon issues:")?;
                self.console
                    .line("• Code already used (each code works only once)")?;
                self.console
                    .line("• Code expired (they expire quickly - ask for a new one)")?;
                self.console.line("• Wrong Client ID/Secret")?;
                self.console
                    .line("• Code copied incorrectly (check for extra spaces/characters)")?;
            }
            FlowError::Api(DropboxApiError::MissingRefreshToken { body }) => {
                self.console.line("❌ No refresh token in response!")?;
                self.console
                    .line("Did you use token_access_type=offline in the URL?")?;
                self.print_json(&body)?;
            }
            other => return Err(other),
        }
        Ok(())
    }

    fn introduce(&mut self) -> Result<(), FlowError> {
        self.console.header("🔐 Dropbox Refresh Token Generator")?;
        self.console
            .line("This tool will help you get a refresh token for Dropbox.")?;
        self.console
            .line("Refresh tokens never expire (unlike access tokens).\n")?;

        self.console.line("⚠️  IMPORTANT: Multi-Person Workflow")?;
        self.console.line("-".repeat(70))?;
        self.console.line("This is perfect when:")?;
        self.console
            .line("  • YOU have the Dropbox app credentials (Client ID & Secret)")?;
        self.console.line("  • ANOTHER PERSON owns the Dropbox account")?;
        self.console
            .line("  • They need to authorize access to THEIR account")?;
        self.console
            .line("  • They will send you the authorization code\n")?;
        Ok(())
    }

    async fn collect_credentials(&mut self) -> Result<Credentials, FlowError> {
        self.console
            .header("Step 1: Enter Dropbox App Credentials")?;
        self.console
            .line("(YOU have these from the Dropbox App Console)\n")?;
        self.console.line(format!("Go to: {}", APP_CONSOLE_URL))?;
        self.console.line("Click your app → Settings tab\n")?;

        let client_id = self
            .console
            .prompt("Enter your App Key (Client ID): ")
            .await?;
        let client_secret = self
            .console
            .prompt("Enter your App Secret (Client Secret): ")
            .await?;

        if client_id.is_empty() || client_secret.is_empty() {
            return Err(FlowError::MissingInput(Field::Credentials));
        }

        Ok(Credentials::new(client_id, client_secret))
    }

    fn show_authorization_url(&mut self, client_id: &str) -> Result<(), FlowError> {
        let url = self.client.authorization_url(client_id);

        self.console
            .header("Step 2: Send This Link to the Dropbox Account Owner")?;
        self.console.line(
            "📧 SEND THIS ENTIRE URL TO THE PERSON WHO OWNS THE DROPBOX ACCOUNT:\n",
        )?;
        self.console.rule('━')?;
        self.console.line(&url)?;
        self.console.rule('━')?;
        self.console.blank()?;

        self.console.line("📋 Instructions for them:")?;
        self.console.line("1. Open the URL above in their browser")?;
        self.console
            .line("2. They will be asked to log into THEIR Dropbox account")?;
        self.console.line("3. Click 'Allow' to authorize your app")?;
        self.console
            .line("4. They'll be redirected to a page with an authorization code")?;
        self.console
            .line("5. Ask them to send you the ENTIRE URL or just the 'code' parameter")?;
        self.console.blank()?;
        self.console.line("Example URL they'll see:")?;
        self.console
            .line("  https://www.dropbox.com/1/oauth2/display_token?oauth_token=CODE_HERE")?;
        self.console.line("  OR")?;
        self.console.line("  http://localhost/?code=CODE_HERE")?;
        self.console.blank()?;
        Ok(())
    }

    async fn collect_code(&mut self) -> Result<String, FlowError> {
        self.console
            .header("Step 3: Enter the Authorization Code They Send You")?;
        self.console
            .line("Waiting for the authorization code from the account owner...")?;
        self.console
            .line("(They need to click the link above and send you the code)\n")?;

        let code = self.console.prompt("Enter the authorization code: ").await?;
        if code.is_empty() {
            return Err(FlowError::MissingInput(Field::AuthorizationCode));
        }
        Ok(code)
    }

    fn show_tokens(&mut self, tokens: &TokenResponse) -> Result<(), FlowError> {
        self.console.header("Your Tokens")?;

        self.console.line("Refresh Token (use this in production):")?;
        self.console.line(format!("  {}\n", tokens.refresh_token))?;

        self.console.line(format!(
            "Access Token (expires in {} seconds):",
            tokens.expires_in
        ))?;
        self.console.line(format!("  {}\n", tokens.access_token))?;

        if let Some(account_id) = &tokens.account_id {
            self.console.line(format!("Account ID: {}\n", account_id))?;
        }
        Ok(())
    }

    fn show_env_instructions(
        &mut self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> Result<(), FlowError> {
        self.console
            .header(&format!("Step 5: Update Your {}", self.env_file))?;

        self.console
            .line(format!("Add these to your {} file:\n", self.env_file))?;
        self.console
            .line(format!("DROPBOX_CLIENT_ID={}", credentials.client_id))?;
        self.console.line(format!(
            "DROPBOX_CLIENT_SECRET={}",
            credentials.client_secret.expose_secret()
        ))?;
        self.console
            .line(format!("DROPBOX_REFRESH_TOKEN={}", refresh_token))?;
        self.console
            .line("\n# Remove or comment out DROPBOX_ACCESS_TOKEN (it expires!)")?;
        self.console.line("# DROPBOX_ACCESS_TOKEN=...\n")?;
        Ok(())
    }

    fn show_next_steps(&mut self) -> Result<(), FlowError> {
        self.console.header("✅ All Done!")?;

        self.console.line("Next steps:")?;
        self.console
            .line(format!("1. Copy the env vars to {}", self.env_file))?;
        self.console
            .line("2. Restart your app so it picks up the new variables")?;
        self.console
            .line("3. Your app will now use refresh tokens (never expire!)")?;
        self.console
            .line("4. The Dropbox account owner's files are now reachable from your app\n")?;

        self.console.line(format!(
            "📁 Files created in {}:",
            self.files.dir().display()
        ))?;
        self.console
            .line(format!("  • {} - Complete token info", TOKENS_FILE))?;
        self.console
            .line(format!("  • {} - Just the refresh token", REFRESH_TOKEN_FILE))?;
        self.console
            .line(format!("  • {} - Ready to paste in .env\n", ENV_SNIPPET_FILE))?;

        self.console.line("🔒 Security reminder:")?;
        self.console
            .line("  • Keep these files secret (add them to .gitignore)")?;
        self.console
            .line("  • Don't share the refresh token or client secret")?;
        self.console.line(
            "  • The account owner is trusting YOU with access to their Dropbox\n",
        )?;
        Ok(())
    }

    fn print_json(&mut self, value: &Value) -> Result<(), FlowError> {
        self.console.line(serde_json::to_string_pretty(value)?)?;
        Ok(())
    }
}
