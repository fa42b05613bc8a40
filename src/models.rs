use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A soundboard aggregate: board metadata plus its embedded clips.
///
/// The whole struct maps to a single DynamoDB item and is always read and
/// written as one unit. Clip payloads and the cover image live in S3; the
/// item only records their metadata.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Soundboard {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<CoverImage>,
    /// User id of the creator. Set at creation, never reassigned.
    pub creator: Uuid,
    /// Insertion order is display order.
    pub sounds: Vec<SoundClip>,
}

impl Soundboard {
    /// Looks up an embedded clip by its per-board id, as supplied in form
    /// field names (so a string).
    pub fn clip_mut(&mut self, clip_id: &str) -> Option<&mut SoundClip> {
        self.sounds
            .iter_mut()
            .find(|clip| clip.id.to_string() == clip_id)
    }
}

/// Cover image metadata. The bytes themselves are stored under the board's
/// cover key in S3.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CoverImage {
    pub content_type: String,
}

/// An audio clip embedded in exactly one soundboard. No independent
/// lifecycle: deleting the board deletes its clips.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SoundClip {
    /// Opaque per-board id, assigned at insertion.
    pub id: Uuid,
    /// Display title; defaults to `filename` when none was supplied.
    pub title: String,
    /// Original uploaded filename.
    pub filename: String,
    /// Must match `audio/*`.
    pub content_type: String,
    /// Size of the stored payload in bytes.
    pub file_size: u64,
    /// Clip length in seconds.
    pub duration: f64,
    /// System-wide unique token; doubles as the S3 object key suffix.
    pub unique_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    /// Identity-provider subject. Unique; a user is found-or-created by it.
    pub external_id: String,
    pub username: String,
}

/// Projection returned by the board listing, so the index page does not
/// drag full clip lists over the wire.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SoundboardSummary {
    pub id: Uuid,
    pub title: String,
}
