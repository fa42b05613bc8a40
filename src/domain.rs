use crate::errors::{AuthError, RepoError, StorageError};
use crate::models::{Soundboard, SoundboardSummary, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Trait defining operations on the soundboard aggregate store.
///
/// A soundboard is one document; `create` and `replace` each write the whole
/// aggregate in a single atomic put, so readers never see a half-applied
/// edit.
#[async_trait]
pub trait SoundboardRepository: Send + Sync + 'static {
    /// Inserts a new board. Fails with [`RepoError::Conflict`] if the id is
    /// already taken.
    async fn create(&self, board: &Soundboard) -> Result<(), RepoError>;

    /// Replaces the stored aggregate wholesale. Last writer wins; there is
    /// no version check (known race, see DESIGN.md).
    async fn replace(&self, board: &Soundboard) -> Result<(), RepoError>;

    /// Returns Ok(None) if the board does not exist.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Soundboard>, RepoError>;

    /// Lists id + title for every board.
    /// WARNING: scans the whole table. Fine at this scale.
    async fn list_summaries(&self) -> Result<Vec<SoundboardSummary>, RepoError>;

    /// Removes the board item. Deleting an absent id is not an error.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;
}

/// Trait defining user lookup keyed by the identity provider's subject.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Returns the user for `external_id`, creating one with
    /// `display_name` as the username on first login. The username is only
    /// filled at creation; later logins do not overwrite it.
    async fn find_or_create(
        &self,
        external_id: &str,
        display_name: &str,
    ) -> Result<User, RepoError>;
}

/// Trait defining operations for storing and retrieving blob payloads
/// (clip audio and cover images).
#[async_trait]
pub trait ClipStorage: Send + Sync + 'static {
    /// Uploads under a key that must not exist yet. A collision on a
    /// freshly generated clip token comes back as
    /// [`StorageError::AlreadyExists`] and fails the whole request.
    async fn upload_new(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Uploads unconditionally, replacing any existing object. Used for
    /// clip file replacements and cover images.
    async fn overwrite(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Returns the payload and its stored content type.
    async fn download(&self, key: &str) -> Result<(Vec<u8>, Option<String>), StorageError>;

    /// Deletes an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// What the identity provider hands back once a federated login completes.
#[derive(Debug, Clone)]
pub struct IdentityClaims {
    pub external_id: String,
    pub display_name: String,
}

/// Trait abstracting the federated login flow. The server only needs the
/// redirect target and the code-for-claims exchange; everything else about
/// the protocol stays inside the implementation.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    fn authorize_url(&self) -> String;

    async fn exchange_code(&self, code: &str) -> Result<IdentityClaims, AuthError>;
}
