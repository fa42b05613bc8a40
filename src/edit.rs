//! Soundboard reconciliation: applying a batched edit (metadata, renames,
//! file replacements, deletions, additions) to one aggregate.
//!
//! `apply_edit` and `build_board` are pure: they validate everything and
//! produce the fully mutated aggregate plus the blob writes it implies,
//! without touching storage. `commit` then performs the blob uploads and
//! the single aggregate write. Any validation failure therefore aborts the
//! whole operation before anything is persisted.

use crate::audio;
use crate::domain::{ClipStorage, SoundboardRepository};
use crate::errors::{AppError, ValidationError};
use crate::ids;
use crate::models::{CoverImage, SoundClip, Soundboard};
use crate::storage::{cover_key, sound_key};
use crate::validation::{MAX_CLIP_SECONDS, clip_title, validate_clip};
use std::collections::HashMap;
use uuid::Uuid;

/// One file pulled out of the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A file to append, paired positionally with its optional explicit title.
#[derive(Debug, Clone)]
pub struct NewClip {
    pub file: UploadedFile,
    pub title: Option<String>,
}

/// Everything a PUT /soundboards/{id} request may carry. Each part is
/// optional and independent.
#[derive(Debug, Default)]
pub struct EditRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<UploadedFile>,
    /// (clip id, new title) pairs. Unknown ids are silently skipped.
    pub title_changes: Vec<(String, String)>,
    /// Replacement audio for existing clips, keyed by clip id. Keeps the
    /// clip's id and unique token, swaps everything else.
    pub replacements: HashMap<String, UploadedFile>,
    /// Clip ids to remove. Deleting an absent id is a no-op; deletion wins
    /// over a rename/replacement of the same id.
    pub deletions: Vec<String>,
    /// New clips, in upload order.
    pub additions: Vec<NewClip>,
}

/// Inputs for creating a board from scratch.
#[derive(Debug)]
pub struct CreateRequest {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<UploadedFile>,
    pub sounds: Vec<NewClip>,
}

/// A blob write the reconciliation decided on.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub key: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The fully reconciled aggregate plus the storage work needed to commit it.
#[derive(Debug)]
pub struct EditOutcome {
    pub board: Soundboard,
    /// New clip payloads; their keys must not exist yet.
    pub new_uploads: Vec<PendingUpload>,
    /// Replacement payloads and cover images; overwrite existing keys.
    pub overwrites: Vec<PendingUpload>,
    /// Keys of removed clips, deleted best-effort after the aggregate write.
    pub removed_keys: Vec<String>,
}

/// Validates one uploaded file and turns it into an embedded clip with a
/// fresh unique token, returning the payload bytes alongside.
fn build_clip(new_clip: NewClip) -> Result<(SoundClip, Vec<u8>), ValidationError> {
    let NewClip { file, title } = new_clip;
    let duration =
        audio::probe_duration(&file.bytes, &file.content_type).unwrap_or(MAX_CLIP_SECONDS);
    validate_clip(
        &file.filename,
        &file.content_type,
        file.bytes.len() as u64,
        duration,
    )?;
    let clip = SoundClip {
        id: Uuid::new_v4(),
        title: clip_title(title.as_deref(), &file.filename),
        filename: file.filename,
        content_type: file.content_type,
        file_size: file.bytes.len() as u64,
        duration,
        unique_id: ids::sound_token(),
    };
    Ok((clip, file.bytes))
}

/// Builds a fresh aggregate for the create flow. Same validation and id
/// rules as an edit's additions; first invalid clip aborts the whole
/// creation.
pub fn build_board(creator: Uuid, req: CreateRequest) -> Result<EditOutcome, ValidationError> {
    let mut board = Soundboard {
        id: Uuid::new_v4(),
        title: req.title,
        description: req.description.filter(|d| !d.trim().is_empty()),
        image: None,
        creator,
        sounds: Vec::new(),
    };

    let mut new_uploads = Vec::new();
    for new_clip in req.sounds {
        let (clip, bytes) = build_clip(new_clip)?;
        new_uploads.push(PendingUpload {
            key: sound_key(&clip.unique_id),
            content_type: clip.content_type.clone(),
            bytes,
        });
        board.sounds.push(clip);
    }

    let mut overwrites = Vec::new();
    if let Some(image) = req.image {
        board.image = Some(CoverImage {
            content_type: image.content_type.clone(),
        });
        overwrites.push(PendingUpload {
            key: cover_key(board.id),
            content_type: image.content_type,
            bytes: image.bytes,
        });
    }

    Ok(EditOutcome {
        board,
        new_uploads,
        overwrites,
        removed_keys: Vec::new(),
    })
}

/// Applies an edit request to the aggregate, in the order that makes the
/// sub-operations deterministic: metadata, renames/replacements, deletions,
/// additions. No I/O happens here; an Err leaves nothing to roll back.
pub fn apply_edit(
    mut board: Soundboard,
    req: EditRequest,
) -> Result<EditOutcome, ValidationError> {
    // 1. Board metadata and cover image.
    if let Some(title) = req.title
        && !title.trim().is_empty()
    {
        board.title = title;
    }
    if req.description.is_some() {
        board.description = req.description.filter(|d| !d.trim().is_empty());
    }
    let mut overwrites = Vec::new();
    if let Some(image) = req.image {
        board.image = Some(CoverImage {
            content_type: image.content_type.clone(),
        });
        overwrites.push(PendingUpload {
            key: cover_key(board.id),
            content_type: image.content_type,
            bytes: image.bytes,
        });
    }

    // 2. Renames, then file replacements. A clip id that no longer exists
    //    is skipped, not an error.
    for (clip_id, new_title) in &req.title_changes {
        if let Some(clip) = board.clip_mut(clip_id)
            && !new_title.trim().is_empty()
        {
            clip.title = new_title.clone();
        }
    }
    // Keyed by clip id so a later deletion of the same clip can drop the
    // queued upload.
    let mut replacement_uploads: HashMap<String, PendingUpload> = HashMap::new();
    for (clip_id, file) in req.replacements {
        let Some(clip) = board.clip_mut(&clip_id) else {
            continue;
        };
        let duration =
            audio::probe_duration(&file.bytes, &file.content_type).unwrap_or(MAX_CLIP_SECONDS);
        validate_clip(
            &file.filename,
            &file.content_type,
            file.bytes.len() as u64,
            duration,
        )?;
        clip.filename = file.filename;
        clip.content_type = file.content_type.clone();
        clip.file_size = file.bytes.len() as u64;
        clip.duration = duration;
        replacement_uploads.insert(
            clip_id,
            PendingUpload {
                key: sound_key(&clip.unique_id),
                content_type: file.content_type,
                bytes: file.bytes,
            },
        );
    }

    // 3. Deletions. Run after renames so deletion wins when both target
    //    the same clip.
    let mut removed_keys = Vec::new();
    for clip_id in &req.deletions {
        if let Some(pos) = board
            .sounds
            .iter()
            .position(|clip| clip.id.to_string() == *clip_id)
        {
            let clip = board.sounds.remove(pos);
            replacement_uploads.remove(clip_id);
            removed_keys.push(sound_key(&clip.unique_id));
        }
    }

    // 4. Additions, appended in upload order.
    let mut new_uploads = Vec::new();
    for new_clip in req.additions {
        let (clip, bytes) = build_clip(new_clip)?;
        new_uploads.push(PendingUpload {
            key: sound_key(&clip.unique_id),
            content_type: clip.content_type.clone(),
            bytes,
        });
        board.sounds.push(clip);
    }

    overwrites.extend(replacement_uploads.into_values());

    Ok(EditOutcome {
        board,
        new_uploads,
        overwrites,
        removed_keys,
    })
}

/// Persists a reconciled outcome: blob uploads first, then the single
/// aggregate write. Blob deletes for removed clips run after the write and
/// are best-effort; a failed delete leaves an unreferenced object, never a
/// dangling clip.
pub async fn commit(
    storage: &dyn ClipStorage,
    repo: &dyn SoundboardRepository,
    outcome: EditOutcome,
    is_create: bool,
) -> Result<Soundboard, AppError> {
    let EditOutcome {
        board,
        new_uploads,
        overwrites,
        removed_keys,
    } = outcome;

    for upload in new_uploads {
        storage
            .upload_new(&upload.key, upload.bytes, &upload.content_type)
            .await?;
    }
    for upload in overwrites {
        storage
            .overwrite(&upload.key, upload.bytes, &upload.content_type)
            .await?;
    }

    if is_create {
        repo.create(&board).await?;
    } else {
        repo.replace(&board).await?;
    }

    for key in &removed_keys {
        if let Err(e) = storage.delete(key).await {
            tracing::warn!(%key, error = ?e, "Failed to delete removed clip payload");
        }
    }

    Ok(board)
}
