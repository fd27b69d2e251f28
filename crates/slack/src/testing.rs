use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::api::{
    ApiError, FileUpload, MessageRef, PostMessage, SlackApi, UserGroup, UserProfile,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiCall {
    PostMessage(PostMessage),
    AddReaction { name: String, target: MessageRef },
    RemoveReaction { name: String, target: MessageRef },
    UserGroups,
    UserProfile(String),
    DeleteOriginal(String),
    UploadFile(FileUpload),
}

/// In-memory `SlackApi` that records every call in order.
pub struct RecordingSlackApi {
    calls: Mutex<Vec<ApiCall>>,
    groups: Result<Vec<UserGroup>, ApiError>,
    profile: Result<UserProfile, ApiError>,
    fail_posts: bool,
    fail_reactions: bool,
}

impl Default for RecordingSlackApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            groups: Ok(Vec::new()),
            profile: Ok(UserProfile {
                display_name: "alice".to_owned(),
                real_name: "Alice Doe".to_owned(),
            }),
            fail_posts: false,
            fail_reactions: false,
        }
    }
}

impl RecordingSlackApi {
    pub fn with_groups(mut self, groups: Result<Vec<UserGroup>, ApiError>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_profile(mut self, profile: Result<UserProfile, ApiError>) -> Self {
        self.profile = profile;
        self
    }

    pub fn failing_posts(mut self) -> Self {
        self.fail_posts = true;
        self
    }

    pub fn failing_reactions(mut self) -> Self {
        self.fail_reactions = true;
        self
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().await.clone()
    }

    pub async fn posts(&self) -> Vec<PostMessage> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                ApiCall::PostMessage(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Reaction calls rendered as `+name` / `-name` in call order.
    pub async fn reactions(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                ApiCall::AddReaction { name, .. } => Some(format!("+{name}")),
                ApiCall::RemoveReaction { name, .. } => Some(format!("-{name}")),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: ApiCall) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl SlackApi for RecordingSlackApi {
    async fn post_message(&self, message: PostMessage) -> Result<MessageRef, ApiError> {
        let channel_id = message.channel_id.clone();
        self.record(ApiCall::PostMessage(message)).await;
        if self.fail_posts {
            return Err(ApiError::slack("chat.postMessage", "channel_not_found"));
        }
        Ok(MessageRef::new(channel_id, "1730000100.0001"))
    }

    async fn add_reaction(&self, name: &str, target: &MessageRef) -> Result<(), ApiError> {
        self.record(ApiCall::AddReaction { name: name.to_owned(), target: target.clone() }).await;
        if self.fail_reactions {
            return Err(ApiError::slack("reactions.add", "already_reacted"));
        }
        Ok(())
    }

    async fn remove_reaction(&self, name: &str, target: &MessageRef) -> Result<(), ApiError> {
        self.record(ApiCall::RemoveReaction { name: name.to_owned(), target: target.clone() })
            .await;
        if self.fail_reactions {
            return Err(ApiError::slack("reactions.remove", "no_reaction"));
        }
        Ok(())
    }

    async fn user_groups(&self) -> Result<Vec<UserGroup>, ApiError> {
        self.record(ApiCall::UserGroups).await;
        self.groups.clone()
    }

    async fn user_profile(&self, user_id: &str) -> Result<UserProfile, ApiError> {
        self.record(ApiCall::UserProfile(user_id.to_owned())).await;
        self.profile.clone()
    }

    async fn delete_original(&self, response_url: &str) -> Result<(), ApiError> {
        self.record(ApiCall::DeleteOriginal(response_url.to_owned())).await;
        Ok(())
    }

    async fn upload_file(&self, upload: FileUpload) -> Result<String, ApiError> {
        let file_id = format!("F-{}", upload.filename);
        self.record(ApiCall::UploadFile(upload)).await;
        Ok(file_id)
    }
}
