use crate::errors::ValidationError;

pub const MAX_CLIP_BYTES: u64 = 15 * 1024 * 1024;
pub const MAX_CLIP_SECONDS: f64 = 15.0;

/// Checks a candidate clip against the intake rules. All three rules are
/// applied independently; the first failure is reported.
pub fn validate_clip(
    filename: &str,
    content_type: &str,
    file_size: u64,
    duration: f64,
) -> Result<(), ValidationError> {
    if !content_type.starts_with("audio/") {
        return Err(ValidationError::InvalidFileType {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
        });
    }
    if file_size > MAX_CLIP_BYTES {
        return Err(ValidationError::FileTooLarge {
            filename: filename.to_string(),
            size: file_size,
        });
    }
    if !(0.0..=MAX_CLIP_SECONDS).contains(&duration) {
        return Err(ValidationError::ClipTooLong {
            filename: filename.to_string(),
            duration,
        });
    }
    Ok(())
}

/// Title defaulting: an explicit non-blank title wins, otherwise the clip
/// is titled after its original filename. Applied positionally by the
/// caller, so a missing title at index i falls back to file i's name.
pub fn clip_title(explicit: Option<&str>, filename: &str) -> String {
    match explicit {
        Some(title) if !title.trim().is_empty() => title.to_string(),
        _ => filename.to_string(),
    }
}
