//! File reference uploader
//!
//! Resolves file and image references attached to the last message into
//! upstream handles: validate, materialize bytes, sign, push, and for
//! documents register the object against the conversation.

use std::sync::Arc;

use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurpose, DecodePaddingMode, GeneralPurposeConfig},
    Engine,
};
use bytes::Bytes;
use futures::future::try_join_all;
use reqwest::Url;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    routes::metrics::record_upload,
    spark::{SaveFileRequest, SparkApi},
};

use super::session::ConversationSession;

/// Media types referenced inline as image links rather than attached as documents
pub const IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/tiff",
    "image/png",
    "image/bmp",
    "image/heic",
    "image/heif",
];

/// Inline data accepts padded and unpadded base64
const INLINE_DATA: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Upstream handle of an uploaded reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileHandle {
    /// Image link passed to the chat call in `fileUrl`
    Image(String),
    /// Document registered against the conversation; nothing to pass inline
    SessionAttached,
}

impl FileHandle {
    pub fn image_link(&self) -> Option<&str> {
        match self {
            FileHandle::Image(link) => Some(link),
            FileHandle::SessionAttached => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            FileHandle::Image(_) => "image",
            FileHandle::SessionAttached => "document",
        }
    }
}

/// File bytes ready for upload
#[derive(Debug)]
struct Materialized {
    file_name: String,
    mime_type: String,
    data: Bytes,
}

/// Uploads referenced files to the upstream object store
#[derive(Clone)]
pub struct FileUploader {
    api: Arc<dyn SparkApi>,
    max_file_size: u64,
}

impl FileUploader {
    pub fn new(api: Arc<dyn SparkApi>, max_file_size: u64) -> Self {
        Self { api, max_file_size }
    }

    /// Upload every reference in parallel; the first failure fails the batch
    pub async fn upload_all(
        &self,
        session: &ConversationSession,
        urls: &[&str],
    ) -> AppResult<Vec<FileHandle>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        info!(count = urls.len(), session_id = %session.session_id, "Uploading referenced files");
        try_join_all(urls.iter().map(|url| self.upload(session, url))).await
    }

    /// Upload one reference
    #[instrument(skip(self, session, url), fields(session_id = %session.session_id))]
    pub async fn upload(&self, session: &ConversationSession, url: &str) -> AppResult<FileHandle> {
        let file = self.materialize(url).await?;
        debug!(
            file = %file.file_name,
            mime = %file.mime_type,
            size = file.data.len(),
            "File materialized"
        );

        let grant = self.api.sign_upload(&file.file_name, &file.mime_type).await?;
        let file_size = file.data.len() as u64;
        let link = self.api.put_object(&grant, file.data).await?;

        let handle = if IMAGE_MIME_TYPES.contains(&file.mime_type.as_str()) {
            FileHandle::Image(link)
        } else {
            let request = SaveFileRequest {
                business_type: 0,
                chat_id: session.session_id.clone(),
                file_business_key: Uuid::new_v4().to_string(),
                file_name: file.file_name.clone(),
                file_size,
                file_url: link,
            };
            // Registration is best-effort; the chat call proceeds either way.
            if let Err(e) = self.api.save_file(&request).await {
                warn!(file = %file.file_name, error = %e, "Failed to attach file to conversation");
            }
            FileHandle::SessionAttached
        };

        record_upload(handle.kind());
        Ok(handle)
    }

    async fn materialize(&self, url: &str) -> AppResult<Materialized> {
        if let Some((mime_type, payload)) = split_data_url(url) {
            let data = INLINE_DATA
                .decode(payload.trim())
                .map_err(|e| AppError::BadRequest(format!("Invalid inline file data: {}", e)))?;
            if data.len() as u64 > self.max_file_size {
                return Err(AppError::FileTooLarge("inline file data".to_string()));
            }
            let extension = mime_guess::get_mime_extensions_str(&mime_type)
                .and_then(|extensions| extensions.first())
                .copied()
                .unwrap_or("bin");
            return Ok(Materialized {
                file_name: format!("{}.{}", Uuid::new_v4(), extension),
                mime_type,
                data: Bytes::from(data),
            });
        }

        self.validate(url).await?;

        let file_name = file_name_from_url(url);
        let mime_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let data = self.api.download_file(url, self.max_file_size).await?;

        Ok(Materialized {
            file_name,
            mime_type,
            data,
        })
    }

    /// HEAD probe: error statuses and declared oversize fail before download
    async fn validate(&self, url: &str) -> AppResult<()> {
        let probe = self.api.probe_file(url).await?;
        if probe.status >= 400 {
            return Err(AppError::FileUrlInvalid(format!(
                "File {} is not valid: [{}] {}",
                url, probe.status, probe.reason
            )));
        }
        if probe
            .content_length
            .is_some_and(|length| length > self.max_file_size)
        {
            return Err(AppError::FileTooLarge(format!("File {} is not valid", url)));
        }
        Ok(())
    }
}

/// Split a `data:<mime>;base64,<payload>` URL
fn split_data_url(url: &str) -> Option<(String, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header
        .split(';')
        .next()
        .filter(|mime| !mime.is_empty())
        .unwrap_or("application/octet-stream");
    Some((mime_type.to_ascii_lowercase(), payload))
}

/// Last path segment of a URL, query excluded
fn file_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
