use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

use crate::{
    dispatch::Messenger,
    error::DeliveryError,
    model::{NotificationContent, Recipient},
};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Telegram rejects photo captions longer than this many characters.
pub const CAPTION_LIMIT: usize = 1024;

const PARSE_MODE: &str = "Markdown";

/// [`Messenger`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramMessenger {
    token: String,
    api_url: String,
    http: Client,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramMessenger {
    pub fn new(token: impl Into<String>) -> Result<Self, DeliveryError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            http,
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url, self.token)
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        let res = self
            .http
            .post(self.endpoint("sendMessage"))
            .json(&SendMessage {
                chat_id,
                text,
                parse_mode: PARSE_MODE,
            })
            .send()
            .await?;

        check_response(res).await
    }

    async fn send_photo(
        &self,
        chat_id: &str,
        photo: &Path,
        caption: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let bytes = tokio::fs::read(photo)
            .await
            .map_err(|source| DeliveryError::Media {
                path: photo.display().to_string(),
                source,
            })?;

        let file_name = photo
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo.jpg".to_string());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", Part::bytes(bytes).file_name(file_name));

        if let Some(caption) = caption {
            form = form
                .text("caption", caption.to_string())
                .text("parse_mode", PARSE_MODE);
        }

        let res = self
            .http
            .post(self.endpoint("sendPhoto"))
            .multipart(form)
            .send()
            .await?;

        check_response(res).await
    }
}

async fn check_response(res: reqwest::Response) -> Result<(), DeliveryError> {
    let status = res.status();
    let body = res.text().await?;

    let parsed: Option<ApiResponse> = serde_json::from_str(&body).ok();

    match parsed {
        Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
        Some(ApiResponse { description, .. }) => Err(DeliveryError::Rejected {
            status: status.as_u16(),
            description: description.unwrap_or_else(|| "no description".to_string()),
        }),
        None => Err(DeliveryError::Rejected {
            status: status.as_u16(),
            description: body.chars().take(200).collect(),
        }),
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(
        &self,
        recipient: &Recipient,
        content: &NotificationContent,
    ) -> Result<(), DeliveryError> {
        let chat_id = recipient.as_str();

        match &content.media {
            None => self.send_text(chat_id, &content.text).await,
            Some(photo) if content.text.chars().count() <= CAPTION_LIMIT => {
                self.send_photo(chat_id, photo, Some(&content.text)).await
            }
            Some(photo) => {
                self.send_photo(chat_id, photo, None).await?;
                self.send_text(chat_id, &content.text).await
            }
        }
    }
}

impl std::fmt::Debug for TelegramMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramMessenger")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn messenger(server: &MockServer) -> TelegramMessenger {
        TelegramMessenger::new("123:abc")
            .unwrap()
            .with_api_url(server.uri())
    }

    fn ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true, "result": {}}))
    }

    #[tokio::test]
    async fn text_only_uses_send_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_json(serde_json::json!({
                "chat_id": "42",
                "text": "*hi*",
                "parse_mode": "Markdown"
            })))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let content = NotificationContent {
            text: "*hi*".into(),
            media: None,
        };
        messenger(&server)
            .send(&Recipient::new("42"), &content)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn photo_is_sent_with_caption() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("day_clear_1.jpg");
        std::fs::write(&photo, b"jpeg-bytes").unwrap();

        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendPhoto"))
            .and(body_string_contains("weather caption"))
            .and(body_string_contains("day_clear_1.jpg"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let content = NotificationContent {
            text: "weather caption".into(),
            media: Some(photo),
        };
        messenger(&server)
            .send(&Recipient::new("42"), &content)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn long_text_goes_out_after_uncaptioned_photo() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("default.jpg");
        std::fs::write(&photo, b"jpeg-bytes").unwrap();

        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendPhoto"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let content = NotificationContent {
            text: "x".repeat(CAPTION_LIMIT + 1),
            media: Some(photo),
        };
        messenger(&server)
            .send(&Recipient::new("42"), &content)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn api_error_is_rejected_with_description() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let content = NotificationContent {
            text: "hi".into(),
            media: None,
        };
        let err = messenger(&server)
            .send(&Recipient::new("nope"), &content)
            .await
            .unwrap_err();

        match err {
            DeliveryError::Rejected { status, description } => {
                assert_eq!(status, 400);
                assert_eq!(description, "Bad Request: chat not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_does_not_leak_token() {
        let content = NotificationContent {
            text: "hi".into(),
            media: None,
        };

        // nothing listens on the discard port
        let err = TelegramMessenger::new("123456:SECRET-TOKEN")
            .unwrap()
            .with_api_url("http://127.0.0.1:9")
            .send(&Recipient::new("42"), &content)
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::Transport(_)), "unexpected error: {err:?}");
        assert!(!err.to_string().contains("SECRET-TOKEN"));
        assert!(!format!("{err:?}").contains("SECRET-TOKEN"));
    }

    #[tokio::test]
    async fn unreadable_photo_is_a_media_error() {
        let server = MockServer::start().await;
        let content = NotificationContent {
            text: "hi".into(),
            media: Some("/definitely/not/here.jpg".into()),
        };

        let err = messenger(&server)
            .send(&Recipient::new("42"), &content)
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Media { .. }));
    }
}
