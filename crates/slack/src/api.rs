//! Slack Web API surface the bot depends on.
//!
//! The HTTP client lives outside this crate; the orchestrator only sees this
//! trait so every remote call can be faked in tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::{MessageAttachment, MessageTemplate};

/// Address of a posted message, used for reactions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: String,
    pub timestamp: String,
}

impl MessageRef {
    pub fn new(channel_id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self { channel_id: channel_id.into(), timestamp: timestamp.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostMessage {
    pub channel_id: String,
    pub template: MessageTemplate,
    pub attachments: Vec<MessageAttachment>,
    pub thread_ts: Option<String>,
    /// When set the message is only shown to this user.
    pub ephemeral_user: Option<String>,
}

impl PostMessage {
    pub fn new(channel_id: impl Into<String>, template: MessageTemplate) -> Self {
        Self {
            channel_id: channel_id.into(),
            template,
            attachments: Vec::new(),
            thread_ts: None,
            ephemeral_user: None,
        }
    }

    pub fn attachments(mut self, attachments: Vec<MessageAttachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn in_thread(mut self, thread_ts: Option<String>) -> Self {
        self.thread_ts = thread_ts;
        self
    }

    pub fn ephemeral_to(mut self, user_id: impl Into<String>) -> Self {
        self.ephemeral_user = Some(user_id.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserGroup {
    pub name: String,
    pub users: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub display_name: String,
    pub real_name: String,
}

impl UserProfile {
    pub fn preferred_name(&self) -> Option<&str> {
        [self.display_name.as_str(), self.real_name.as_str()]
            .into_iter()
            .find(|name| !name.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub title: String,
    pub data: Vec<u8>,
    pub channels: Vec<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("slack api request `{method}` failed: {reason}")]
    Request { method: &'static str, reason: String },
    #[error("slack api `{method}` returned error `{code}`")]
    Slack { method: &'static str, code: String },
}

impl ApiError {
    pub fn request(method: &'static str, reason: impl Into<String>) -> Self {
        Self::Request { method, reason: reason.into() }
    }

    pub fn slack(method: &'static str, code: impl Into<String>) -> Self {
        Self::Slack { method, code: code.into() }
    }
}

#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn post_message(&self, message: PostMessage) -> Result<MessageRef, ApiError>;
    async fn add_reaction(&self, name: &str, target: &MessageRef) -> Result<(), ApiError>;
    async fn remove_reaction(&self, name: &str, target: &MessageRef) -> Result<(), ApiError>;
    async fn user_groups(&self) -> Result<Vec<UserGroup>, ApiError>;
    async fn user_profile(&self, user_id: &str) -> Result<UserProfile, ApiError>;
    /// Hides a message posted in response to an interaction.
    async fn delete_original(&self, response_url: &str) -> Result<(), ApiError>;
    /// Returns the uploaded file ID.
    async fn upload_file(&self, upload: FileUpload) -> Result<String, ApiError>;
}

/// Accepts every call and posts nowhere.
#[derive(Default)]
pub struct NoopSlackApi;

#[async_trait]
impl SlackApi for NoopSlackApi {
    async fn post_message(&self, message: PostMessage) -> Result<MessageRef, ApiError> {
        Ok(MessageRef::new(message.channel_id, "0000000000.000000"))
    }

    async fn add_reaction(&self, _name: &str, _target: &MessageRef) -> Result<(), ApiError> {
        Ok(())
    }

    async fn remove_reaction(&self, _name: &str, _target: &MessageRef) -> Result<(), ApiError> {
        Ok(())
    }

    async fn user_groups(&self) -> Result<Vec<UserGroup>, ApiError> {
        Ok(Vec::new())
    }

    async fn user_profile(&self, _user_id: &str) -> Result<UserProfile, ApiError> {
        Ok(UserProfile::default())
    }

    async fn delete_original(&self, _response_url: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn upload_file(&self, upload: FileUpload) -> Result<String, ApiError> {
        Ok(format!("F-{}", upload.filename))
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiError, UserProfile};

    #[test]
    fn preferred_name_skips_empty_display_name() {
        let profile =
            UserProfile { display_name: String::new(), real_name: "Alice Doe".to_owned() };
        assert_eq!(profile.preferred_name(), Some("Alice Doe"));
        assert_eq!(UserProfile::default().preferred_name(), None);
    }

    #[test]
    fn api_errors_name_the_method() {
        let error = ApiError::slack("reactions.add", "already_reacted");
        assert_eq!(error.to_string(), "slack api `reactions.add` returned error `already_reacted`");
    }
}
