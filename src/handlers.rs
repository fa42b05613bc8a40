use crate::{
    auth::{
        CurrentUser, OptionalCurrentUser, SESSION_COOKIE, ensure_owner, session_token_from_headers,
    },
    edit::{self, CreateRequest, EditRequest, NewClip, UploadedFile},
    errors::{AppError, StorageError},
    ids,
    state::AppState,
    storage::{cover_key, sound_key},
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State, multipart::Field},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    let name = field.name().unwrap_or("<unnamed>").to_string();
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read field '{}': {}", name, e)))
}

async fn read_file(field: Field<'_>) -> Result<UploadedFile, AppError> {
    let filename = field.file_name().unwrap_or("upload").to_string();
    let content_type = field
        .content_type()
        .map(|m| m.to_string())
        .or_else(|| {
            mime_guess::from_path(&filename)
                .first_raw()
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let bytes = field.bytes().await?.to_vec();
    Ok(UploadedFile {
        filename,
        content_type,
        bytes,
    })
}

/// `editTitles[<clip id>]` -> `<clip id>`.
fn bracketed_id(name: &str, prefix: &str) -> Option<String> {
    name.strip_prefix(prefix)?
        .strip_suffix(']')
        .map(str::to_string)
}

fn blank_to_none(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}

// --- Read endpoints ---

pub async fn list_soundboards(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let summaries = state.board_repo.list_summaries().await?;
    tracing::debug!(count = summaries.len(), "Listed soundboards");
    Ok(Json(summaries))
}

pub async fn get_soundboard(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let board_id = Uuid::parse_str(&id_str)?;
    let board = state
        .board_repo
        .get_by_id(board_id)
        .await?
        .ok_or(AppError::SoundboardNotFound(board_id))?;
    Ok(Json(board))
}

/// GET /sounds/{uniqueID}: the raw clip payload with its stored media type.
pub async fn get_sound(
    State(state): State<Arc<AppState>>,
    Path(unique_id): Path<String>,
) -> Result<Response, AppError> {
    let (bytes, content_type) = state
        .clip_storage
        .download(&sound_key(&unique_id))
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) => AppError::SoundNotFound(unique_id.clone()),
            e => e.into(),
        })?;

    let content_type =
        content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .map_err(|e| AppError::InternalServerError(format!("Failed to build sound response: {}", e)))
}

pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Response, AppError> {
    let board_id = Uuid::parse_str(&id_str)?;
    let (bytes, content_type) = state
        .clip_storage
        .download(&cover_key(board_id))
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) => AppError::ImageNotFound(board_id),
            e => e.into(),
        })?;

    let content_type =
        content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .map_err(|e| AppError::InternalServerError(format!("Failed to build image response: {}", e)))
}

// --- Mutating endpoints ---

/// POST /soundboards. Multipart: `title`, optional `description` and
/// `image`, `audioFiles` uploads paired positionally with `audioTitle`
/// fields.
pub async fn create_soundboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut title = None;
    let mut description = None;
    let mut image = None;
    let mut files: Vec<UploadedFile> = Vec::new();
    let mut titles: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "title" => title = Some(read_text(field).await?),
            "description" => description = Some(read_text(field).await?),
            "image" => image = Some(read_file(field).await?),
            "audioTitle" => titles.push(read_text(field).await?),
            other if other.starts_with("audioFiles") => files.push(read_file(field).await?),
            other => tracing::debug!("Ignoring unknown multipart field: {}", other),
        }
    }

    let title = title
        .and_then(blank_to_none)
        .ok_or_else(|| AppError::MissingFormField("title".to_string()))?;

    let sounds = files
        .into_iter()
        .enumerate()
        .map(|(i, file)| NewClip {
            title: titles.get(i).cloned().and_then(blank_to_none),
            file,
        })
        .collect();

    let outcome = edit::build_board(
        user.id,
        CreateRequest {
            title,
            description,
            image,
            sounds,
        },
    )?;
    let board = edit::commit(
        state.clip_storage.as_ref(),
        state.board_repo.as_ref(),
        outcome,
        true,
    )
    .await?;

    tracing::info!(board_id = %board.id, creator = %user.id, clips = board.sounds.len(), "Soundboard created");
    Ok((StatusCode::CREATED, Json(board)))
}

/// PUT /soundboards/{id}: the batched edit transaction. Multipart:
/// `title`/`description`/`image`, `editTitles[<clipId>]` renames,
/// `editSounds[<clipId>]` replacement files, repeated `deleteSounds` ids,
/// and new clips as `audioFile` uploads paired with `newTitle` fields.
pub async fn edit_soundboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id_str): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let board_id = Uuid::parse_str(&id_str)?;
    let board = state
        .board_repo
        .get_by_id(board_id)
        .await?
        .ok_or(AppError::SoundboardNotFound(board_id))?;
    ensure_owner(&user, &board)?;

    let mut req = EditRequest::default();
    let mut new_files: Vec<UploadedFile> = Vec::new();
    let mut new_titles: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "title" => req.title = Some(read_text(field).await?),
            "description" => req.description = Some(read_text(field).await?),
            "image" => req.image = Some(read_file(field).await?),
            "deleteSounds" => req.deletions.push(read_text(field).await?),
            "newTitle" => new_titles.push(read_text(field).await?),
            other => {
                if let Some(clip_id) = bracketed_id(other, "editTitles[") {
                    req.title_changes.push((clip_id, read_text(field).await?));
                } else if let Some(clip_id) = bracketed_id(other, "editSounds[") {
                    req.replacements.insert(clip_id, read_file(field).await?);
                } else if other.starts_with("audioFile") {
                    new_files.push(read_file(field).await?);
                } else {
                    tracing::debug!("Ignoring unknown multipart field: {}", other);
                }
            }
        }
    }

    req.additions = new_files
        .into_iter()
        .enumerate()
        .map(|(i, file)| NewClip {
            title: new_titles.get(i).cloned().and_then(blank_to_none),
            file,
        })
        .collect();

    let outcome = edit::apply_edit(board, req)?;
    let board = edit::commit(
        state.clip_storage.as_ref(),
        state.board_repo.as_ref(),
        outcome,
        false,
    )
    .await?;

    tracing::info!(board_id = %board.id, clips = board.sounds.len(), "Soundboard edited");
    Ok(Json(board))
}

/// DELETE /soundboards/{id}. The aggregate item goes first; blob deletes
/// after, best-effort, so a failure leaves unreferenced objects rather than
/// dangling clips.
pub async fn delete_soundboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id_str): Path<String>,
) -> Result<StatusCode, AppError> {
    let board_id = Uuid::parse_str(&id_str)?;
    let board = state
        .board_repo
        .get_by_id(board_id)
        .await?
        .ok_or(AppError::SoundboardNotFound(board_id))?;
    ensure_owner(&user, &board)?;

    state.board_repo.delete(board_id).await?;

    for clip in &board.sounds {
        let key = sound_key(&clip.unique_id);
        if let Err(e) = state.clip_storage.delete(&key).await {
            tracing::warn!(%key, error = ?e, "Failed to delete clip payload for removed board");
        }
    }
    if board.image.is_some() {
        let key = cover_key(board_id);
        if let Err(e) = state.clip_storage.delete(&key).await {
            tracing::warn!(%key, error = ?e, "Failed to delete cover image for removed board");
        }
    }

    tracing::info!(%board_id, "Soundboard deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- Session endpoints ---

/// GET /user: the logged-in user as JSON, or `null`.
pub async fn current_user(OptionalCurrentUser(user): OptionalCurrentUser) -> impl IntoResponse {
    Json(user)
}

pub async fn login(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::temporary(&state.identity.authorize_url())
}

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

/// GET /auth/callback: completes the federated login, finds or creates the
/// user, and hands the browser a session cookie.
pub async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, AppError> {
    let code = params
        .code
        .ok_or_else(|| AppError::InvalidInput("missing authorization code".to_string()))?;

    let claims = state.identity.exchange_code(&code).await?;
    let user = state
        .user_repo
        .find_or_create(&claims.external_id, &claims.display_name)
        .await?;

    let token = ids::session_token();
    state.sessions.insert(token.clone(), user.clone());
    tracing::info!(user_id = %user.id, "Login complete");

    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to(&state.frontend_url),
    ))
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = session_token_from_headers(&headers) {
        state.sessions.remove(&token);
    }
    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    (
        [(header::SET_COOKIE, cookie)],
        Redirect::to(&state.frontend_url),
    )
}
