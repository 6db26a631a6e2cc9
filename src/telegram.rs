use crate::commands::{self, Command, CommandReply};
use crate::pipeline::{Dispatcher, InboundMessage, Outcome};
use crate::retry::{with_retry_if, RetryConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// Telegram webhook types
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    /// A corrected message; translated like a new one
    pub edited_message: Option<Message>,
}

impl Update {
    /// The new or edited message carried by this update, if any.
    pub fn into_effective_message(self) -> Option<Message> {
        self.message.or(self.edited_message)
    }
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[allow(dead_code)]
    pub r#type: String,
}

impl Message {
    pub fn to_inbound(&self) -> InboundMessage {
        InboundMessage {
            chat_id: self.chat.id,
            user_id: self.from.as_ref().map(|u| u.id),
            text: self.text.clone(),
            caption: self.caption.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SetWebhookRequest<'a> {
    url: &'a str,
    secret_token: &'a str,
    allowed_updates: [&'a str; 2],
}

/// Bot API client for outbound calls.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    api_base: String,
    retry: RetryConfig,
    /// Own username; commands addressed to other bots are not answered
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(api_url: &str, bot_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: format!("{}/bot{}", api_url.trim_end_matches('/'), bot_token),
            retry: RetryConfig::api_call(),
            username: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Fetch the bot's own account (`getMe`).
    pub async fn get_me(&self) -> Result<User> {
        let response = self
            .client
            .get(format!("{}/getMe", self.api_base))
            .send()
            .await
            .context("Failed to send request to Telegram API")?;

        let status = response.status();
        let body: ApiResponse<User> = response
            .json()
            .await
            .context(format!("Invalid getMe response ({})", status))?;

        match body.result {
            Some(user) if body.ok => Ok(user),
            _ => anyhow::bail!(
                "Telegram API error ({}): {}",
                status,
                body.description.unwrap_or_default()
            ),
        }
    }

    /// Send a message, optionally as a reply. Retries 429, 5xx and network
    /// errors.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        html: bool,
        reply_to_message_id: Option<i64>,
    ) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: html.then_some("HTML"),
            reply_to_message_id,
        };

        with_retry_if(
            &self.retry,
            &format!("sendMessage to {}", chat_id),
            || self.post("sendMessage", &request),
            is_retryable_error,
        )
        .await
    }

    /// Register `url` as the webhook, with `secret` echoed in every delivery.
    pub async fn set_webhook(&self, url: &str, secret: &str) -> Result<()> {
        let request = SetWebhookRequest {
            url,
            secret_token: secret,
            allowed_updates: ["message", "edited_message"],
        };

        with_retry_if(
            &self.retry,
            "setWebhook",
            || self.post("setWebhook", &request),
            is_retryable_error,
        )
        .await?;

        info!("✓ Webhook registered at {}", url);
        Ok(())
    }

    async fn post<T: Serialize>(&self, method: &str, body: &T) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .json(body)
            .send()
            .await
            .context("Failed to send request to Telegram API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error ({}): {}", status, body);
        }

        Ok(())
    }
}

/// Retry rate limits (429) and server errors; give up on other 4xx.
/// Error format: "Telegram API error (403 Forbidden): ..."
fn is_retryable_error(error: &anyhow::Error) -> bool {
    let error_str = error.to_string();

    if let Some(rest) = error_str.strip_prefix("Telegram API error (") {
        if let Some(status) = rest
            .split_whitespace()
            .next()
            .and_then(|s| s.trim_end_matches(')').parse::<u16>().ok())
        {
            return status == 429 || status >= 500;
        }
    }

    // Network errors, timeouts
    true
}

/// Route one webhook update: commands to the command surface, everything
/// else through the translation pipeline. Sends at most one reply.
pub async fn handle_update(
    bot: &TelegramClient,
    dispatcher: &Dispatcher,
    update: Update,
) -> Result<()> {
    let Some(message) = update.into_effective_message() else {
        return Ok(()); // Not a message update, ignore
    };

    if message.from.as_ref().is_some_and(|u| u.is_bot) {
        return Ok(());
    }

    let chat_id = message.chat.id;
    let user_id = message.from.as_ref().map(|u| u.id);

    let command = message
        .text
        .as_deref()
        .and_then(|text| Command::parse_for(text, bot.username()));
    if let Some(command) = command {
        debug!("Command {:?} in chat {}", command, chat_id);
        let CommandReply { text, html } =
            commands::execute(dispatcher.db(), chat_id, user_id, command)
                .await
                .context("Command failed")?;
        return bot
            .send_message(chat_id, &text, html, Some(message.message_id))
            .await;
    }

    match dispatcher.process(&message.to_inbound()).await {
        Outcome::Reply(reply) => {
            bot.send_message(chat_id, &reply, false, Some(message.message_id))
                .await
        }
        Outcome::Dropped(reason) => {
            debug!("Dropped message {} in {}: {:?}", message.message_id, chat_id, reason);
            Ok(())
        }
        Outcome::Failed => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn fast_client(server: &MockServer) -> TelegramClient {
        TelegramClient::new(&server.uri(), "test-token")
            .with_retry(RetryConfig::new(3, Duration::from_millis(5)))
    }

    // ==================== Update Deserialization Tests ====================

    #[test]
    fn test_update_deserialization_with_message() {
        let json = r#"{
            "update_id": 123456789,
            "message": {
                "message_id": 100,
                "from": {"id": 987654321, "is_bot": false, "username": "testuser", "first_name": "Test"},
                "chat": {"id": -1001234567890, "type": "supergroup"},
                "text": "Hola a todos"
            }
        }"#;

        let update: Update = serde_json::from_str(json).expect("Should deserialize");
        let message = update.message.unwrap();
        assert_eq!(message.message_id, 100);
        assert_eq!(message.chat.id, -1001234567890);

        let inbound = message.to_inbound();
        assert_eq!(inbound.chat_id, -1001234567890);
        assert_eq!(inbound.user_id, Some(987654321));
        assert_eq!(inbound.payload(), Some("Hola a todos"));
    }

    #[test]
    fn test_photo_with_caption() {
        let json = r#"{
            "update_id": 1,
            "message": {
                "message_id": 5,
                "from": {"id": 7, "first_name": "A"},
                "chat": {"id": 7, "type": "private"},
                "photo": [{"file_id": "abc", "width": 90, "height": 90}],
                "caption": "Regardez ça"
            }
        }"#;

        let update: Update = serde_json::from_str(json).expect("Should deserialize");
        let inbound = update.message.unwrap().to_inbound();
        assert_eq!(inbound.text, None);
        assert_eq!(inbound.payload(), Some("Regardez ça"));
    }

    #[test]
    fn test_update_without_message() {
        let update: Update =
            serde_json::from_str(r#"{"update_id": 123456789}"#).expect("Should deserialize");
        assert!(update.message.is_none());
        assert!(update.into_effective_message().is_none());
    }

    #[test]
    fn test_edited_message_is_effective_message() {
        let json = r#"{
            "update_id": 2,
            "edited_message": {
                "message_id": 11,
                "from": {"id": 7, "is_bot": false, "first_name": "A"},
                "chat": {"id": -5, "type": "group"},
                "edit_date": 1700000000,
                "text": "Bonjour"
            }
        }"#;

        let update: Update = serde_json::from_str(json).expect("Should deserialize");
        assert!(update.message.is_none());

        let message = update.into_effective_message().expect("Edited message should be used");
        assert_eq!(message.message_id, 11);
        assert_eq!(message.to_inbound().payload(), Some("Bonjour"));
    }

    #[test]
    fn test_message_without_from() {
        let json = r#"{
            "update_id": 1,
            "message": {"message_id": 1, "chat": {"id": 1, "type": "channel"}, "text": "x"}
        }"#;
        let update: Update = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(update.message.unwrap().to_inbound().user_id, None);
    }

    // ==================== Request Serialization Tests ====================

    #[test]
    fn test_send_message_request_plain_reply() {
        let request = SendMessageRequest {
            chat_id: 42,
            text: "🌐 EN → ES\nHola",
            parse_mode: None,
            reply_to_message_id: Some(9),
        };
        let json = serde_json::to_value(&request).expect("Should serialize");
        assert_eq!(json["chat_id"], 42);
        assert_eq!(json["reply_to_message_id"], 9);
        assert!(json.get("parse_mode").is_none());
    }

    #[test]
    fn test_send_message_request_html() {
        let request = SendMessageRequest {
            chat_id: 42,
            text: "<b>Help</b>",
            parse_mode: Some("HTML"),
            reply_to_message_id: None,
        };
        let json = serde_json::to_value(&request).expect("Should serialize");
        assert_eq!(json["parse_mode"], "HTML");
        assert!(json.get("reply_to_message_id").is_none());
    }

    // ==================== is_retryable_error Tests ====================

    #[test]
    fn test_is_retryable_error() {
        let e = |s: &str| anyhow::anyhow!(s.to_string());
        assert!(is_retryable_error(&e("Telegram API error (429 Too Many Requests): slow down")));
        assert!(is_retryable_error(&e("Telegram API error (502 Bad Gateway): ")));
        assert!(!is_retryable_error(&e("Telegram API error (400 Bad Request): chat not found")));
        assert!(!is_retryable_error(&e(
            "Telegram API error (403 Forbidden): bot was blocked by the user"
        )));
        assert!(is_retryable_error(&e("Failed to send request to Telegram API")));
    }

    // ==================== HTTP Tests with Wiremock ====================

    #[tokio::test]
    async fn test_send_message_posts_reply() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": 42,
                "text": "hello",
                "reply_to_message_id": 7
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        fast_client(&mock_server)
            .send_message(42, "hello", false, Some(7))
            .await
            .expect("Should send");
    }

    #[tokio::test]
    async fn test_send_message_retries_on_500() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&mock_server)
            .await;

        let result = fast_client(&mock_server).send_message(1, "x", false, None).await;
        assert!(result.is_ok(), "Should succeed after retry: {:?}", result);
    }

    #[tokio::test]
    async fn test_send_message_no_retry_on_403() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string(r#"{"ok":false,"description":"Forbidden: bot was blocked by the user"}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = fast_client(&mock_server)
            .send_message(1, "x", false, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_get_me_returns_username() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/bottest-token/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"id": 42, "is_bot": true, "first_name": "T", "username": "MyTranslatorBot"}
            })))
            .mount(&mock_server)
            .await;

        let me = fast_client(&mock_server).get_me().await.expect("Should fetch");
        assert_eq!(me.id, 42);
        assert_eq!(me.username.as_deref(), Some("MyTranslatorBot"));
    }

    #[tokio::test]
    async fn test_get_me_invalid_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/bottest-token/getMe"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            })))
            .mount(&mock_server)
            .await;

        let err = fast_client(&mock_server).get_me().await.unwrap_err();
        assert!(err.to_string().contains("Unauthorized"), "{}", err);
    }

    #[tokio::test]
    async fn test_set_webhook_sends_secret() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bottest-token/setWebhook"))
            .and(body_partial_json(serde_json::json!({
                "url": "https://bot.example.com/webhook",
                "secret_token": "s3cret",
                "allowed_updates": ["message", "edited_message"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        fast_client(&mock_server)
            .set_webhook("https://bot.example.com/webhook", "s3cret")
            .await
            .expect("Should register");
    }
}
