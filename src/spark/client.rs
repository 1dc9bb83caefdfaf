//! Spark web API client
//!
//! HTTP client for the Spark web chat service, authenticated as a browser
//! session.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_LENGTH};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, Url};
use tracing::{debug, error, instrument, warn};

use crate::{
    config::{Config, Timeouts},
    error::{AppError, AppResult},
};

use super::{
    api::{ByteStream, SparkApi},
    credential::{anonymous_browser_headers, random_digits, SparkCredential, GT_TOKEN},
    envelope::Envelope,
    models::{
        ChatEndpoint, ChatForm, CreateChatRequest, CreatedChat, DeleteChatRequest, FileProbe,
        SaveFileRequest, UploadGrant, UploadedObject,
    },
};

const CREATE_CHAT_PATH: &str = "/iflygpt/u/chat-list/v1/create-chat-list";
const DELETE_CHAT_PATH: &str = "/iflygpt/u/chat-list/v1/del-chat-list";
const SIGN_UPLOAD_PATH: &str = "/iflygpt/oss/sign";
const SAVE_FILE_PATH: &str = "/iflygpt-longcontext/chat/enhance/saveFile";
const USER_INFO_PATH: &str = "/iflygpt/userInfo";

/// Spark web API client bound to one session credential
pub struct SparkClient {
    client: reqwest::Client,
    base_url: String,
    credential: SparkCredential,
    timeouts: Timeouts,
}

impl SparkClient {
    /// Create a new Spark client
    pub fn new(client: reqwest::Client, config: &Config, credential: SparkCredential) -> Self {
        Self {
            client,
            base_url: config.spark_base_url.clone(),
            credential,
            timeouts: config.timeouts,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode its envelope
    ///
    /// The HTTP status alone never fails the call: a non-2xx response whose
    /// body is a failure envelope reports that envelope.
    async fn send_envelope(&self, request: RequestBuilder, what: &str) -> AppResult<Envelope> {
        let response = request.send().await.map_err(|e| transport_error(e, what))?;
        let status = response.status();
        debug!(status = %status, call = what, "Spark response status");

        let body = response.bytes().await.map_err(|e| transport_error(e, what))?;
        let envelope = Envelope::parse_bytes(&body);

        if status.is_success() {
            return envelope;
        }

        match envelope {
            Ok(failure @ Envelope::Failure { .. }) => Ok(failure),
            _ => {
                let text = String::from_utf8_lossy(&body);
                error!(status = %status, body = %text, call = what, "Spark request failed");
                Err(AppError::UpstreamError(format!(
                    "Spark API error {} on {}: {}",
                    status, what, text
                )))
            }
        }
    }
}

#[async_trait]
impl SparkApi for SparkClient {
    #[instrument(skip(self), fields(account = %self.credential.fingerprint()))]
    async fn create_conversation(&self, bot_id: Option<&str>) -> AppResult<String> {
        let url = self.url(CREATE_CHAT_PATH);
        debug!(url = %url, "Creating Spark conversation");

        let request = self
            .client
            .post(&url)
            .headers(self.credential.xhr_headers()?)
            .json(&CreateChatRequest {
                bot_id: bot_id.map(str::to_string),
            })
            .timeout(self.timeouts.session);

        let created: CreatedChat = self
            .send_envelope(request, "create conversation")
            .await?
            .into_typed()?;

        let chat_id = created.id_string().ok_or_else(|| {
            AppError::UpstreamError("Spark returned a conversation without an id".to_string())
        })?;

        debug!(chat_id = %chat_id, "Conversation created");
        Ok(chat_id)
    }

    #[instrument(skip(self), fields(chat_id = %chat_id))]
    async fn remove_conversation(&self, chat_id: &str) -> AppResult<()> {
        let request = self
            .client
            .post(self.url(DELETE_CHAT_PATH))
            .headers(self.credential.xhr_headers()?)
            .json(&DeleteChatRequest {
                chat_list_id: chat_id.to_string(),
            })
            .timeout(self.timeouts.session);

        self.send_envelope(request, "remove conversation")
            .await?
            .into_payload()?;

        debug!("Conversation removed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn probe_file(&self, url: &str) -> AppResult<FileProbe> {
        let response = self
            .client
            .head(url)
            .headers(anonymous_browser_headers())
            .timeout(self.timeouts.session)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "File probe failed");
                AppError::FileUrlInvalid(format!("File {} is not reachable: {}", url, e))
            })?;

        let status = response.status();
        let probe = FileProbe {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            content_length: declared_length(&response),
        };

        debug!(status = probe.status, content_length = ?probe.content_length, "File probe result");
        Ok(probe)
    }

    #[instrument(skip(self))]
    async fn download_file(&self, url: &str, max_size: u64) -> AppResult<Bytes> {
        let response = self
            .client
            .get(url)
            .headers(anonymous_browser_headers())
            .timeout(self.timeouts.transfer)
            .send()
            .await
            .map_err(|e| transport_error(e, "file download"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::FileUrlInvalid(format!(
                "File {} is not valid: [{}]",
                url, status
            )));
        }

        if declared_length(&response).is_some_and(|len| len > max_size) {
            return Err(AppError::FileTooLarge(format!("File {} is not valid", url)));
        }

        let mut buffer = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(e, "file download"))?;
            if (buffer.len() + chunk.len()) as u64 > max_size {
                return Err(AppError::FileTooLarge(format!("File {} is not valid", url)));
            }
            buffer.extend_from_slice(&chunk);
        }

        debug!(size = buffer.len(), "File downloaded");
        Ok(buffer.freeze())
    }

    #[instrument(skip(self))]
    async fn sign_upload(&self, file_name: &str, mime_type: &str) -> AppResult<UploadGrant> {
        let part = Part::bytes(Vec::new())
            .file_name(file_name.to_string())
            .mime_str(mime_type)?;
        let form = Form::new().part("file", part);

        let request = self
            .client
            .post(self.url(SIGN_UPLOAD_PATH))
            .headers(self.credential.browser_headers()?)
            .multipart(form)
            .timeout(self.timeouts.transfer);

        self.send_envelope(request, "sign upload")
            .await?
            .into_typed()
    }

    #[instrument(skip(self, grant, data), fields(size = data.len()))]
    async fn put_object(&self, grant: &UploadGrant, data: Bytes) -> AppResult<String> {
        let mut url = Url::parse(&grant.url).map_err(|e| {
            AppError::UpstreamError(format!("Spark returned an invalid upload URL: {}", e))
        })?;
        // Component-encoded: the store signs over `%20`, not form-style `+`.
        let signed = format!(
            "authorization={}&date={}&host={}",
            urlencoding::encode(&STANDARD.encode(&grant.authorization)),
            urlencoding::encode(&grant.date),
            urlencoding::encode(&grant.host),
        );
        let query = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{signed}"),
            _ => signed,
        };
        url.set_query(Some(&query));

        let mut headers = anonymous_browser_headers();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&grant.authorization).map_err(|_| {
                AppError::UpstreamError("Spark returned an invalid upload authorization".into())
            })?,
        );

        let request = self
            .client
            .post(url)
            .headers(headers)
            .body(data)
            .timeout(self.timeouts.transfer);

        let object: UploadedObject = self
            .send_envelope(request, "put object")
            .await?
            .into_typed()?;

        debug!(link = %object.link, "Object stored");
        Ok(object.link)
    }

    #[instrument(skip(self, request), fields(chat_id = %request.chat_id, file = %request.file_name))]
    async fn save_file(&self, request: &SaveFileRequest) -> AppResult<()> {
        let builder = self
            .client
            .post(self.url(SAVE_FILE_PATH))
            .headers(self.credential.xhr_headers()?)
            .json(request)
            .timeout(self.timeouts.transfer);

        self.send_envelope(builder, "save file")
            .await?
            .into_payload()?;
        Ok(())
    }

    #[instrument(skip(self, form), fields(chat_id = %form.chat_id, endpoint = ?endpoint))]
    async fn open_chat(&self, endpoint: ChatEndpoint, form: &ChatForm) -> AppResult<ByteStream> {
        let mut multipart = Form::new()
            .text("fd", random_digits(6))
            .text("isBot", if form.bot_id.is_some() { "1" } else { "0" });
        if let Some(bot_id) = &form.bot_id {
            multipart = multipart.text("botId", bot_id.clone());
        }
        multipart = multipart
            .text("clientType", "1")
            .text("text", form.text.clone());
        if let Some(sid) = &form.sid {
            multipart = multipart.text("sid", sid.clone());
        }
        multipart = multipart
            .text("chatId", form.chat_id.clone())
            .text("GtToken", GT_TOKEN);
        if let Some(file_url) = &form.file_url {
            multipart = multipart.text("fileUrl", file_url.clone());
        }

        let url = self.url(endpoint.path());
        debug!(url = %url, text_len = form.text.len(), "Posting chat message");

        // The deadline covers the body too, so a stalled event stream errors out.
        let response = self
            .client
            .post(&url)
            .headers(self.credential.chat_headers()?)
            .multipart(multipart)
            .timeout(self.timeouts.chat)
            .send()
            .await
            .map_err(|e| transport_error(e, "chat request"))?;

        let status = response.status();
        debug!(status = %status, "Chat response status");

        if !status.is_success() {
            return Err(chat_failure(response).await);
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| transport_error(e, "chat stream")));
        Ok(Box::pin(stream))
    }

    #[instrument(skip(self), fields(account = %self.credential.fingerprint()))]
    async fn user_info(&self) -> AppResult<bool> {
        let request = self
            .client
            .get(self.url(USER_INFO_PATH))
            .headers(self.credential.xhr_headers()?)
            .timeout(self.timeouts.session);

        let live = match self.send_envelope(request, "user info").await?.into_payload() {
            Ok(payload) => payload
                .get("userInfo")
                .is_some_and(|info| !info.is_null()),
            Err(e) => {
                debug!(error = %e, "Session token is not live");
                false
            }
        };
        Ok(live)
    }
}

fn declared_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn transport_error(e: reqwest::Error, what: &str) -> AppError {
    if e.is_timeout() {
        error!(error = %e, call = what, "Spark call timed out");
        AppError::Timeout(what.to_string())
    } else {
        error!(error = %e, call = what, "Spark call failed");
        AppError::HttpError(e)
    }
}

async fn chat_failure(response: Response) -> AppError {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    match Envelope::parse_bytes(&body) {
        Ok(Envelope::Failure { code, message }) => AppError::UpstreamRequestFailed { code, message },
        _ => {
            let text = String::from_utf8_lossy(&body);
            error!(status = %status, body = %text, "Chat request rejected");
            AppError::UpstreamError(format!("Spark chat error {}: {}", status, text))
        }
    }
}
