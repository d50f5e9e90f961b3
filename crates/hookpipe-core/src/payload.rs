//! Wire shapes for webhook messages and the webhook object itself.

use crate::chunk::MESSAGE_CHAR_LIMIT;
use crate::{Error, Result, WebhookIdentity};
use serde::{Deserialize, Serialize};

/// A message posted through a webhook. Needs `content`, `embeds`, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub content: String,
    /// Overrides the webhook's display name for this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tts: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl MessagePayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Same sender settings, different content.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }

    /// Full check for a standalone message.
    pub fn validate(&self) -> Result<()> {
        self.validate_content_len()?;
        if self.content.is_empty() && self.embeds.is_empty() {
            return Err(Error::InvalidPayload(
                "message needs content or at least one embed".to_string(),
            ));
        }
        Ok(())
    }

    /// Length check only; a message carrying an attachment may have no content.
    pub fn validate_content_len(&self) -> Result<()> {
        let chars = self.content.chars().count();
        if chars > MESSAGE_CHAR_LIMIT {
            return Err(Error::InvalidPayload(format!(
                "content is {chars} characters, limit is {MESSAGE_CHAR_LIMIT}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Always "rich" for webhook embeds.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// ISO8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Image or thumbnail reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedMedia {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum WebhookKind {
    /// Posts messages to a channel with a generated token.
    #[default]
    Incoming,
    /// Internal webhook used by channel following.
    ChannelFollower,
    /// Used with interactions.
    Application,
    Unknown(u8),
}

impl From<u8> for WebhookKind {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::Incoming,
            2 => Self::ChannelFollower,
            3 => Self::Application,
            n => Self::Unknown(n),
        }
    }
}

impl From<WebhookKind> for u8 {
    fn from(k: WebhookKind) -> Self {
        match k {
            WebhookKind::Incoming => 1,
            WebhookKind::ChannelFollower => 2,
            WebhookKind::Application => 3,
            WebhookKind::Unknown(n) => n,
        }
    }
}

/// The webhook object as the service reports it.
///
/// Fields are authoritative from the service response, never from a local request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookInfo {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: WebhookKind,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar hash, not an image.
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub application_id: Option<String>,
}

impl WebhookInfo {
    /// The identity this object describes, when the service included a token.
    pub fn identity(&self) -> Option<Result<WebhookIdentity>> {
        self.token
            .as_deref()
            .map(|t| WebhookIdentity::from_id_and_token(self.id.as_str(), t))
    }
}

/// Token-authenticated webhook modification. The channel cannot be changed this way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `data:<mime>;base64,<data>` image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl WebhookUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_payload_serializes_only_content() {
        let v = serde_json::to_value(MessagePayload::text("hi")).unwrap();
        assert_eq!(v, serde_json::json!({"content": "hi"}));
    }

    #[test]
    fn full_payload_uses_service_field_names() {
        let p = MessagePayload {
            content: "hi".to_string(),
            username: Some("ci".to_string()),
            avatar_url: Some("https://example.com/a.png".to_string()),
            tts: true,
            embeds: vec![Embed {
                title: Some("t".to_string()),
                kind: Some("rich".to_string()),
                fields: vec![EmbedField {
                    name: "k".to_string(),
                    value: "v".to_string(),
                    inline: true,
                }],
                ..Embed::default()
            }],
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["avatar_url"], "https://example.com/a.png");
        assert_eq!(v["tts"], true);
        assert_eq!(v["embeds"][0]["type"], "rich");
        assert_eq!(v["embeds"][0]["fields"][0]["inline"], true);
        assert!(v["embeds"][0].get("footer").is_none());
    }

    #[test]
    fn with_content_keeps_sender_settings() {
        let template = MessagePayload {
            username: Some("bot".to_string()),
            tts: true,
            ..MessagePayload::default()
        };
        let p = template.with_content("line");
        assert_eq!(p.content, "line");
        assert_eq!(p.username.as_deref(), Some("bot"));
        assert!(p.tts);
    }

    #[test]
    fn validate_enforces_limit_in_chars() {
        assert!(MessagePayload::text("é".repeat(MESSAGE_CHAR_LIMIT)).validate().is_ok());
        let err = MessagePayload::text("a".repeat(MESSAGE_CHAR_LIMIT + 1))
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
    }

    #[test]
    fn validate_requires_content_or_embeds() {
        assert!(MessagePayload::default().validate().is_err());
        let embed_only = MessagePayload {
            embeds: vec![Embed::default()],
            ..MessagePayload::default()
        };
        assert!(embed_only.validate().is_ok());
        assert!(MessagePayload::default().validate_content_len().is_ok());
    }

    #[test]
    fn webhook_info_parses_service_object() {
        let js = r#"{
            "type": 1,
            "id": "671422873239289884",
            "name": "logger",
            "avatar": null,
            "channel_id": "199737254929760256",
            "guild_id": "199737254929760256",
            "application_id": null,
            "token": "abc-DEF_1"
        }"#;
        let info: WebhookInfo = serde_json::from_str(js).unwrap();
        assert_eq!(info.kind, WebhookKind::Incoming);
        assert_eq!(info.name.as_deref(), Some("logger"));
        assert!(info.avatar.is_none());
        let id = info.identity().unwrap().unwrap();
        assert_eq!(id.id(), "671422873239289884");
    }

    #[test]
    fn unknown_webhook_kind_round_trips() {
        let k: WebhookKind = serde_json::from_str("9").unwrap();
        assert_eq!(k, WebhookKind::Unknown(9));
        assert_eq!(serde_json::to_string(&k).unwrap(), "9");
    }

    #[test]
    fn update_skips_unset_fields() {
        let u = WebhookUpdate {
            name: Some("n".to_string()),
            avatar: None,
        };
        assert_eq!(serde_json::to_value(&u).unwrap(), serde_json::json!({"name": "n"}));
        assert!(WebhookUpdate::default().is_empty());
    }
}
