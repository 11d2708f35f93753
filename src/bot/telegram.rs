//! Minimal Telegram long-poll transport.
//!
//! Talks straight to the Bot API over `reqwest`: `getUpdates` with a long
//! poll, one spawned handler task per incoming message, replies via
//! `sendMessage` plus `sendMediaGroup` when the reply carries photos. The
//! handlers read only the snapshot store, so a burst of chat traffic never
//! touches the crawler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{CommandRouter, Photo};

const LONG_POLL_SECS: u64 = 25;

pub struct TelegramBot {
    http: Client,
    token: String,
    /// Base URL for overriding in tests
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

impl TelegramBot {
    pub fn new(token: impl Into<String>, base_url: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            // must outlast the long poll
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(TelegramBot {
            http,
            token: token.into(),
            base_url: base_url.unwrap_or("https://api.telegram.org").to_string(),
        })
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let url = format!(
            "{}/bot{}/getUpdates?offset={}&timeout={}&allowed_updates=[\"message\"]",
            self.base_url, self.token, offset, LONG_POLL_SECS
        );
        let resp = self.http.get(&url).send().await.context("getUpdates failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("getUpdates HTTP {}", resp.status());
        }
        let parsed: UpdatesResponse = resp.json().await.context("Failed to parse getUpdates")?;
        if !parsed.ok {
            anyhow::bail!("getUpdates returned ok=false");
        }
        Ok(parsed.result)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("sendMessage HTTP {}", resp.status());
        }
        Ok(())
    }

    /// One album with a captioned entry per photo. Albums need 2-10 entries,
    /// so a single photo goes through `sendPhoto` instead.
    async fn send_media_group(&self, chat_id: i64, photos: &[Photo]) -> Result<()> {
        if let [photo] = photos {
            return self.send_photo(chat_id, photo).await;
        }
        let photos = &photos[..photos.len().min(10)];

        let url = format!("{}/bot{}/sendMediaGroup", self.base_url, self.token);
        let media: Vec<serde_json::Value> = photos
            .iter()
            .map(|p| {
                serde_json::json!({
                    "type": "photo",
                    "media": p.url,
                    "caption": p.caption,
                })
            })
            .collect();
        let body = serde_json::json!({
            "chat_id": chat_id,
            "media": media,
        });
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("sendMediaGroup HTTP {}", resp.status());
        }
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, photo: &Photo) -> Result<()> {
        let url = format!("{}/bot{}/sendPhoto", self.base_url, self.token);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "photo": photo.url,
            "caption": photo.caption,
        });
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("sendPhoto HTTP {}", resp.status());
        }
        Ok(())
    }

    /// Long-poll loop. Each message is handled in its own task.
    pub async fn run(self, router: CommandRouter, mut shutdown: watch::Receiver<bool>) {
        info!("Telegram bot started");
        let bot = Arc::new(self);
        let mut offset = 0i64;

        loop {
            let updates = tokio::select! {
                res = bot.get_updates(offset) => res,
                _ = shutdown.changed() => {
                    info!("Telegram bot stopping");
                    return;
                }
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(message) = update.message else { continue };
                        let Some(text) = message.text else { continue };
                        let chat_id = message.chat.id;
                        debug!("Message from chat {}: {}", chat_id, text);

                        let bot = Arc::clone(&bot);
                        let router = router.clone();
                        tokio::spawn(async move {
                            let reply = router.reply_to(&text).await;
                            if let Err(e) = bot.send_message(chat_id, &reply.text).await {
                                warn!("Failed to reply to chat {}: {}", chat_id, e);
                                return;
                            }
                            if reply.photos.is_empty() {
                                return;
                            }
                            if let Err(e) =
                                bot.send_media_group(chat_id, &reply.photos).await
                            {
                                warn!(
                                    "Failed to send roster photos to chat {}: {}",
                                    chat_id, e
                                );
                            }
                        });
                    }
                }
                Err(e) => {
                    warn!("getUpdates failed: {}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_response_parsing() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 7, "message": {"chat": {"id": 42}, "text": "/live"}},
                {"update_id": 8, "message": {"chat": {"id": 42}}},
                {"update_id": 9}
            ]
        }"#;
        let parsed: UpdatesResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.result.len(), 3);
        assert_eq!(
            parsed.result[0].message.as_ref().unwrap().text.as_deref(),
            Some("/live")
        );
        assert!(parsed.result[1].message.as_ref().unwrap().text.is_none());
        assert!(parsed.result[2].message.is_none());
    }
}
