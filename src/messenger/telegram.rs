use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::Result;

use super::{DeliveryError, Messenger, SendOptions};

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

/// Sends messages through the Telegram Bot API `sendMessage` method.
pub struct TelegramMessenger {
    endpoint: String,
    agent: ureq::Agent,
}

impl TelegramMessenger {
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Self {
        Self {
            endpoint: format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), token),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let token = crate::config::resolve_secret(&config.token_env)?;
        Ok(Self::new(
            &config.telegram_api_url,
            &token,
            Duration::from_secs(config.http_timeout_secs),
        ))
    }
}

fn build_payload<'a>(channel: &'a str, text: &'a str, options: SendOptions) -> SendMessage<'a> {
    SendMessage {
        chat_id: channel,
        text,
        parse_mode: options.render_as_html.then_some("HTML"),
        disable_web_page_preview: options.suppress_link_preview,
    }
}

/// Interpret a Bot API reply body. `status` is the HTTP status it came with.
fn check_reply(status: u16, body: &str) -> std::result::Result<(), DeliveryError> {
    match serde_json::from_str::<ApiReply>(body) {
        Ok(reply) if reply.ok => Ok(()),
        Ok(reply) => Err(DeliveryError::Api {
            code: reply.error_code.unwrap_or(status),
            description: reply
                .description
                .unwrap_or_else(|| "no description".to_string()),
        }),
        Err(_) => Err(DeliveryError::Api {
            code: status,
            description: format!("unexpected reply: {}", body.trim()),
        }),
    }
}

impl Messenger for TelegramMessenger {
    fn send(
        &self,
        channel: &str,
        text: &str,
        options: SendOptions,
    ) -> std::result::Result<(), DeliveryError> {
        let payload = build_payload(channel, text, options);

        // The endpoint embeds the bot token; keep it out of error strings.
        match self.agent.post(&self.endpoint).send_json(&payload) {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|e| DeliveryError::Connectivity(format!("failed to read reply: {e}")))?;
                check_reply(status, &body)?;
                debug!(channel, "message accepted by Telegram");
                Ok(())
            }
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                check_reply(code, &body)
            }
            Err(ureq::Error::Transport(t)) => Err(DeliveryError::Connectivity(format!(
                "{}: {}",
                t.kind(),
                t.message().unwrap_or("no details")
            ))),
        }
    }
}
