//! Client-secret and token files, and the first-run authorization flow.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use gdshare_common::{Error, Result};

use super::auth::{AuthConfig, AuthManager, TokenManager, Tokens, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, REDIRECT_URL};

/// Client secrets as downloaded from the cloud console.
#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_auth_uri")]
    auth_uri: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

/// Read a client-secret file into an [`AuthConfig`].
///
/// Accepts both the `installed` and the `web` application layouts. The
/// first registered redirect URI wins; `http://localhost` otherwise.
///
/// # Errors
/// - File missing or unreadable
/// - Neither section present
pub fn load_client_secrets(path: &Path) -> Result<AuthConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Cannot read client secrets {}: {}",
            path.display(),
            e
        ))
    })?;

    let file: ClientSecretsFile = serde_json::from_str(&raw)
        .map_err(|e| Error::Serialization(format!("Invalid client secrets file: {}", e)))?;

    let secrets = file.installed.or(file.web).ok_or_else(|| {
        Error::Config("Client secrets file has no 'installed' or 'web' section".to_string())
    })?;

    Ok(AuthConfig {
        client_id: secrets.client_id,
        client_secret: secrets.client_secret,
        auth_url: secrets.auth_uri,
        token_url: secrets.token_uri,
        redirect_url: secrets
            .redirect_uris
            .into_iter()
            .next()
            .unwrap_or_else(|| REDIRECT_URL.to_string()),
    })
}

/// JSON file holding the user's tokens between runs.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored tokens, or `None` when no file exists yet.
    pub fn load(&self) -> Result<Option<Tokens>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let tokens = serde_json::from_str(&raw)
            .map_err(|e| Error::Serialization(format!("Invalid token file: {}", e)))?;

        Ok(Some(tokens))
    }

    /// Write tokens, creating parent directories as needed.
    pub fn save(&self, tokens: &Tokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(tokens)
            .map_err(|e| Error::Serialization(format!("Failed to serialize tokens: {}", e)))?;
        std::fs::write(&self.path, json)?;

        Ok(())
    }
}

/// Produces an authenticated [`TokenManager`] from the credential files.
pub struct CredentialProvider {
    auth_config: AuthConfig,
    store: TokenStore,
}

impl CredentialProvider {
    /// Load client secrets from `credentials_path`; tokens live at `token_path`.
    pub fn new(credentials_path: &Path, token_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            auth_config: load_client_secrets(credentials_path)?,
            store: TokenStore::new(token_path),
        })
    }

    /// Authorize the user.
    ///
    /// Uses stored tokens when present, otherwise walks the user through
    /// the browser consent screen and stores the result. Either way a
    /// valid access token is obtained before returning.
    ///
    /// # Errors
    /// - Consent flow aborted or code rejected
    /// - Stored refresh token revoked
    pub async fn authorize(self) -> Result<Arc<TokenManager>> {
        let auth_manager = AuthManager::new(self.auth_config.clone())?;

        let tokens = match self.store.load()? {
            Some(tokens) => {
                tracing::debug!("Using stored tokens from {}", self.store.path().display());
                tokens
            }
            None => {
                let tokens = interactive_authorization(&auth_manager).await?;
                self.store.save(&tokens)?;
                tracing::info!("Credential file saved to: {}", self.store.path().display());
                tokens
            }
        };

        let token_manager = TokenManager::new(auth_manager, tokens).with_store(self.store);
        token_manager.get_access_token().await?;

        Ok(Arc::new(token_manager))
    }
}

/// Send the user to the consent screen and read back the code.
async fn interactive_authorization(auth_manager: &AuthManager) -> Result<Tokens> {
    let (auth_url, state) = auth_manager.authorization_url();

    eprintln!("Open the following URL in your browser and grant access:\n\n{}\n", auth_url);
    if let Err(e) = open::that(&auth_url) {
        tracing::debug!("Could not open browser: {}", e);
    }
    eprintln!("Paste the full redirect URL (or just the code) here:");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;

    let code = extract_code(&line, &state)?;
    auth_manager.exchange_code(&code).await
}

/// Pull the authorization code out of pasted input.
///
/// Accepts either the redirect URL, whose `state` must match, or a bare code.
fn extract_code(input: &str, expected_state: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Authentication("No authorization code entered".to_string()));
    }

    let Ok(url) = Url::parse(input) else {
        return Ok(input.to_string());
    };

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                return Err(Error::Authentication(format!("Authorization denied: {}", value)));
            }
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(Error::Authentication("CSRF state mismatch".to_string()));
    }

    code.ok_or_else(|| Error::Authentication("Redirect URL carries no code".to_string()))
}
