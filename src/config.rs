use std::{env, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
    #[error(transparent)]
    DotEnvError(#[from] dotenvy::Error),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub clip_bucket_name: String,
    // Store region as string for simplicity here, aws_clients can convert
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    pub google_client_id: String,
    pub google_client_secret: String,
    /// Where the identity provider sends the browser back to.
    pub oauth_redirect_url: String,
    /// Where we send the browser after login/logout; also the CORS origin
    /// allowed to carry the session cookie.
    pub frontend_url: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();

        let bind_address_str =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let clip_bucket_name = env::var("CLIP_BUCKET_NAME")
            .map_err(|_| ConfigError::MissingVar("CLIP_BUCKET_NAME".into()))?;

        let aws_region =
            env::var("AWS_DEFAULT_REGION").unwrap_or_else(|_| "ca-central-1".to_string());

        // Allow overriding endpoint for localstack/testing
        let localstack_endpoint = env::var("AWS_ENDPOINT_URL").ok();

        let google_client_id = env::var("GOOGLE_CLIENT_ID")
            .map_err(|_| ConfigError::MissingVar("GOOGLE_CLIENT_ID".into()))?;
        let google_client_secret = env::var("GOOGLE_CLIENT_SECRET")
            .map_err(|_| ConfigError::MissingVar("GOOGLE_CLIENT_SECRET".into()))?;
        let oauth_redirect_url = env::var("OAUTH_REDIRECT_URL")
            .map_err(|_| ConfigError::MissingVar("OAUTH_REDIRECT_URL".into()))?;

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3001".to_string());

        Ok(Config {
            bind_address,
            clip_bucket_name,
            aws_region,
            localstack_endpoint,
            google_client_id,
            google_client_secret,
            oauth_redirect_url,
            frontend_url,
        })
    }
}
