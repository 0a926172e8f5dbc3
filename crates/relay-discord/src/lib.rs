//! Discord webhook notification channel for the incident relay.

pub mod embed;
pub mod webhook_client;

pub use embed::embed_payload;
pub use webhook_client::DiscordWebhookClient;
