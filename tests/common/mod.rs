#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use dashmap::DashMap;
use http::{Method, Request};
use soundboard_server::auth::SESSION_COOKIE;
use soundboard_server::domain::{
    ClipStorage, IdentityClaims, IdentityProvider, SoundboardRepository, UserRepository,
};
use soundboard_server::errors::{AuthError, RepoError, StorageError};
use soundboard_server::ids;
use soundboard_server::models::{Soundboard, SoundboardSummary, User};
use soundboard_server::routes::create_router;
use soundboard_server::state::AppState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory SoundboardRepository with the same atomicity shape as the
/// DynamoDB one: whole-aggregate put, last writer wins.
#[derive(Default)]
pub struct MemoryBoardRepo {
    boards: Mutex<HashMap<Uuid, Soundboard>>,
}

#[async_trait]
impl SoundboardRepository for MemoryBoardRepo {
    async fn create(&self, board: &Soundboard) -> Result<(), RepoError> {
        let mut boards = self.boards.lock().unwrap();
        if boards.contains_key(&board.id) {
            return Err(RepoError::Conflict(board.id.to_string()));
        }
        boards.insert(board.id, board.clone());
        Ok(())
    }

    async fn replace(&self, board: &Soundboard) -> Result<(), RepoError> {
        self.boards.lock().unwrap().insert(board.id, board.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Soundboard>, RepoError> {
        Ok(self.boards.lock().unwrap().get(&id).cloned())
    }

    async fn list_summaries(&self) -> Result<Vec<SoundboardSummary>, RepoError> {
        Ok(self
            .boards
            .lock()
            .unwrap()
            .values()
            .map(|b| SoundboardSummary {
                id: b.id,
                title: b.title.clone(),
            })
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.boards.lock().unwrap().remove(&id);
        Ok(())
    }
}

/// In-memory ClipStorage enforcing the put-if-absent contract on new keys.
#[derive(Default)]
pub struct MemoryClipStorage {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryClipStorage {
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl ClipStorage for MemoryClipStorage {
    async fn upload_new(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        objects.insert(key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn overwrite(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<(Vec<u8>, Option<String>), StorageError> {
        match self.objects.lock().unwrap().get(key) {
            Some((data, content_type)) => Ok((data.clone(), Some(content_type.clone()))),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<HashMap<String, User>>,
}

#[async_trait]
impl UserRepository for MemoryUserRepo {
    async fn find_or_create(
        &self,
        external_id: &str,
        display_name: &str,
    ) -> Result<User, RepoError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get(external_id) {
            return Ok(user.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            username: display_name.to_string(),
        };
        users.insert(external_id.to_string(), user.clone());
        Ok(user)
    }
}

/// Identity provider that accepts codes of the form `code-for-<subject>`.
pub struct FakeIdentityProvider;

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn authorize_url(&self) -> String {
        "http://idp.test/authorize".to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<IdentityClaims, AuthError> {
        match code.strip_prefix("code-for-") {
            Some(subject) => Ok(IdentityClaims {
                external_id: format!("sub-{subject}"),
                display_name: subject.to_string(),
            }),
            None => Err(AuthError::ExchangeFailed("unknown code".to_string())),
        }
    }
}

/// Test server over in-memory fakes. Each instance is isolated, so tests
/// can run in parallel.
pub struct TestServer {
    pub state: Arc<AppState>,
    pub storage: Arc<MemoryClipStorage>,
}

impl TestServer {
    pub fn new() -> Self {
        let storage = Arc::new(MemoryClipStorage::default());
        let state = Arc::new(AppState {
            board_repo: Arc::new(MemoryBoardRepo::default()),
            user_repo: Arc::new(MemoryUserRepo::default()),
            clip_storage: storage.clone(),
            identity: Arc::new(FakeIdentityProvider),
            sessions: Arc::new(DashMap::new()),
            frontend_url: "http://localhost:3001".to_string(),
        });
        Self { state, storage }
    }

    pub fn app(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Creates a user and an active session, returning the user and the
    /// Cookie header value to send.
    pub async fn login_as(&self, name: &str) -> (User, String) {
        let user = self
            .state
            .user_repo
            .find_or_create(&format!("sub-{name}"), name)
            .await
            .expect("failed to create test user");
        let token = ids::session_token();
        self.state.sessions.insert(token.clone(), user.clone());
        (user, format!("{SESSION_COOKIE}={token}"))
    }
}

// --- Multipart helpers ---

pub const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

pub enum Part {
    Text(String, String),
    File {
        name: String,
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

pub fn text(name: &str, value: &str) -> Part {
    Part::Text(name.to_string(), value.to_string())
}

pub fn file(name: &str, filename: &str, content_type: &str, bytes: Vec<u8>) -> Part {
    Part::File {
        name: name.to_string(),
        filename: filename.to_string(),
        content_type: content_type.to_string(),
        bytes,
    }
}

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    parts: &[Part],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder
        .body(Body::from(multipart_body(parts)))
        .expect("failed to build multipart request")
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not JSON")
}
