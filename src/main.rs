use dashmap::DashMap;
use soundboard_server::{
    auth::GoogleIdentityProvider,
    aws_clients::{create_dynamodb_client, create_s3_client, create_sdk_config},
    config::Config,
    errors::AppError,
    repositories::{
        DynamoDbSoundboardRepository, DynamoDbUserRepository, SOUNDBOARDS_TABLE, USERS_TABLE,
    },
    routes::create_router,
    startup::init_resources,
    state::AppState,
    storage::S3ClipStorage,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "soundboard_server=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    tracing::info!("Initializing AWS clients...");
    let sdk_config = create_sdk_config(&config).await?;
    let db_client = create_dynamodb_client(&sdk_config);
    let s3_client = create_s3_client(&sdk_config);

    init_resources(
        &db_client,
        &s3_client,
        &config.clip_bucket_name,
        &config.aws_region,
    )
    .await?;

    let state = Arc::new(AppState {
        board_repo: Arc::new(DynamoDbSoundboardRepository::new(
            db_client.clone(),
            SOUNDBOARDS_TABLE.to_string(),
        )),
        user_repo: Arc::new(DynamoDbUserRepository::new(
            db_client,
            USERS_TABLE.to_string(),
        )),
        clip_storage: Arc::new(S3ClipStorage::new(s3_client, config.clip_bucket_name.clone())),
        identity: Arc::new(GoogleIdentityProvider::new(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
            config.oauth_redirect_url.clone(),
        )),
        sessions: Arc::new(DashMap::new()),
        frontend_url: config.frontend_url.clone(),
    });

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|e| AppError::InitError(format!("Failed to bind {}: {}", config.bind_address, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Server error: {}", e)))?;

    Ok(())
}
