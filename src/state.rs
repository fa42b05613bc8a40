use crate::domain::{ClipStorage, IdentityProvider, SoundboardRepository, UserRepository};
use crate::models::User;
use dashmap::DashMap;
use std::sync::Arc;

/// Shared resources for the web server. Handlers receive it as
/// `State<Arc<AppState>>`.
pub struct AppState {
    pub board_repo: Arc<dyn SoundboardRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub clip_storage: Arc<dyn ClipStorage>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Opaque cookie-backed session cache: token -> logged-in user.
    /// In-process and unexpiring: entries live until logout or restart.
    pub sessions: Arc<DashMap<String, User>>,
    /// Where to send the browser after login/logout.
    pub frontend_url: String,
}
