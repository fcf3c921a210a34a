use shared::{
    domain::{MediaId, UploadId, UserId},
    error::{ApiError, ErrorCode},
    protocol::{MediaUploaded, StartUploadRequest, UploadStatus},
};
use storage::{ChunkAppend, StoredMedia, StoredUpload};
use tracing::{debug, info};

use crate::{ensure_owner, internal, not_found, ApiContext};

async fn owned_upload(
    ctx: &ApiContext,
    user_id: UserId,
    upload_id: UploadId,
) -> Result<StoredUpload, ApiError> {
    let upload = ctx
        .storage
        .upload_status(upload_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("upload"))?;
    ensure_owner(upload.owner_id, user_id, "upload")?;
    Ok(upload)
}

fn status_of(upload: &StoredUpload) -> UploadStatus {
    UploadStatus {
        upload_id: upload.upload_id,
        offset: upload.offset,
        total_bytes: upload.total_bytes,
    }
}

pub async fn start_upload(
    ctx: &ApiContext,
    user_id: UserId,
    req: StartUploadRequest,
) -> Result<UploadStatus, ApiError> {
    let filename = req.filename.trim();
    if filename.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "filename is required"));
    }
    if req.total_bytes == 0 {
        return Err(ApiError::new(ErrorCode::Validation, "upload is empty"));
    }
    if req.total_bytes > ctx.max_upload_bytes {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("upload exceeds {} bytes", ctx.max_upload_bytes),
        ));
    }

    let upload_id = ctx
        .storage
        .start_upload(
            user_id,
            req.kind,
            filename,
            req.mime_type.as_deref(),
            req.total_bytes,
        )
        .await
        .map_err(internal)?;
    info!(upload_id = upload_id.0, user_id = user_id.0, total_bytes = req.total_bytes, "upload started");
    Ok(UploadStatus {
        upload_id,
        offset: 0,
        total_bytes: req.total_bytes,
    })
}

pub async fn upload_status(
    ctx: &ApiContext,
    user_id: UserId,
    upload_id: UploadId,
) -> Result<UploadStatus, ApiError> {
    let upload = owned_upload(ctx, user_id, upload_id).await?;
    Ok(status_of(&upload))
}

/// Appends a chunk at `offset`. A stale offset is a conflict whose message
/// carries the offset the server expects next.
pub async fn append_upload_chunk(
    ctx: &ApiContext,
    user_id: UserId,
    upload_id: UploadId,
    offset: u64,
    bytes: &[u8],
) -> Result<UploadStatus, ApiError> {
    let upload = owned_upload(ctx, user_id, upload_id).await?;
    if bytes.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "chunk is empty"));
    }

    match ctx
        .storage
        .append_upload_chunk(upload_id, offset, bytes)
        .await
        .map_err(internal)?
    {
        ChunkAppend::Appended { offset } => {
            debug!(upload_id = upload_id.0, offset, "chunk appended");
            Ok(UploadStatus {
                upload_id,
                offset,
                total_bytes: upload.total_bytes,
            })
        }
        ChunkAppend::OffsetMismatch { expected } => Err(ApiError::new(
            ErrorCode::Conflict,
            format!("expected offset {expected}"),
        )),
        ChunkAppend::Overflow { total_bytes } => Err(ApiError::new(
            ErrorCode::Validation,
            format!("chunk runs past the declared {total_bytes} bytes"),
        )),
    }
}

pub async fn complete_upload(
    ctx: &ApiContext,
    user_id: UserId,
    upload_id: UploadId,
) -> Result<MediaUploaded, ApiError> {
    let upload = owned_upload(ctx, user_id, upload_id).await?;
    if upload.offset < upload.total_bytes {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!(
                "upload incomplete: {} of {} bytes received",
                upload.offset, upload.total_bytes
            ),
        ));
    }

    let media_id = ctx
        .storage
        .complete_upload(upload_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("upload"))?;
    info!(upload_id = upload_id.0, media_id = media_id.0, "upload completed");

    Ok(MediaUploaded {
        media_id,
        kind: upload.kind,
        url: ctx.media_url(media_id),
        size_bytes: upload.total_bytes,
        mime_type: upload.mime_type,
    })
}

/// Media is public once uploaded.
pub async fn load_media(ctx: &ApiContext, media_id: MediaId) -> Result<StoredMedia, ApiError> {
    ctx.storage
        .load_media(media_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("media"))
}

#[cfg(test)]
#[path = "tests/uploads_tests.rs"]
mod tests;
