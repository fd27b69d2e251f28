use std::sync::Arc;

use chatops_core::config::BotConfig;
use tracing::warn;

use crate::{
    api::{MessageRef, SlackApi},
    commands::MessageInfo,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionNames {
    pub doing: String,
    pub done: String,
    pub failed: String,
    pub dialog: String,
}

impl ReactionNames {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            doing: config.reaction_doing.clone(),
            done: config.reaction_done.clone(),
            failed: config.reaction_failed.clone(),
            dialog: config.reaction_dialog.clone(),
        }
    }
}

impl Default for ReactionNames {
    fn default() -> Self {
        Self::from_config(&BotConfig::default())
    }
}

/// Status markers on the message that triggered a command. Failures are
/// logged and never interrupt the caller.
pub struct ProgressReactor {
    api: Arc<dyn SlackApi>,
    names: ReactionNames,
}

impl ProgressReactor {
    pub fn new(api: Arc<dyn SlackApi>, names: ReactionNames) -> Self {
        Self { api, names }
    }

    pub fn names(&self) -> &ReactionNames {
        &self.names
    }

    pub async fn begin(&self, message: &MessageInfo) {
        self.add(message, &self.names.doing).await;
    }

    pub async fn succeed(&self, message: &MessageInfo) {
        self.add(message, &self.names.done).await;
        self.remove(message, &self.names.doing).await;
    }

    pub async fn fail(&self, message: &MessageInfo) {
        self.add(message, &self.names.failed).await;
        self.remove(message, &self.names.doing).await;
    }

    /// Failed marker alone, for forms answered with anything but submit.
    pub async fn mark_failed(&self, message: &MessageInfo) {
        self.add(message, &self.names.failed).await;
    }

    pub async fn dialog_opened(&self, message: &MessageInfo) {
        self.add(message, &self.names.dialog).await;
    }

    pub async fn dialog_closed(&self, message: &MessageInfo) {
        self.remove(message, &self.names.dialog).await;
    }

    async fn add(&self, message: &MessageInfo, name: &str) {
        let Some(target) = target(message) else {
            return;
        };
        if let Err(error) = self.api.add_reaction(name, &target).await {
            warn!(
                event_name = "slack.reaction.add_failed",
                reaction = name,
                channel_id = %target.channel_id,
                timestamp = %target.timestamp,
                error = %error,
                "failed to add reaction"
            );
        }
    }

    async fn remove(&self, message: &MessageInfo, name: &str) {
        let Some(target) = target(message) else {
            return;
        };
        if let Err(error) = self.api.remove_reaction(name, &target).await {
            warn!(
                event_name = "slack.reaction.remove_failed",
                reaction = name,
                channel_id = %target.channel_id,
                timestamp = %target.timestamp,
                error = %error,
                "failed to remove reaction"
            );
        }
    }
}

fn target(message: &MessageInfo) -> Option<MessageRef> {
    if !message.kind.has_origin_message() {
        return None;
    }
    Some(MessageRef::new(message.channel_id.clone(), message.timestamp.clone()))
}
