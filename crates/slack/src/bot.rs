//! Command execution for messages and form callbacks.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chatops_core::{
    config::BotConfig, Actor, Attachment, AttachmentKind, Bot, CommandOutput, CommandSummary,
    ExecuteParams,
};
use chrono::Local;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    api::{ApiError, FileUpload, MessageRef, PostMessage, SlackApi, UserProfile},
    blocks::{
        error_attachment, limit_text, MessageAttachment, MessageBuilder, MessageTemplate,
        RichTextItem,
    },
    commands::{event_text_command, find_params, EventKind, MessageInfo},
    events::BlockActionCallback,
    forms::{build_form, collect_submitted, form_required, ResumeToken, SUBMIT_ACTION},
    metrics::UsageMeter,
    permissions::PermissionEvaluator,
    reactions::{ProgressReactor, ReactionNames},
    registry::{CommandDefinition, CommandRegistry},
};

const BOT_NAME: &str = "Slack";

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to encode resume token: {0}")]
    Token(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Executed,
    Failed,
    FormIssued,
    /// Permission denied; the unsupported-command fallback ran instead.
    Denied,
    Cancelled,
    /// Form callback with an unreadable resume token.
    Aborted,
    Ignored,
}

#[derive(Clone, Debug)]
pub struct BotSettings {
    pub public_channel: Option<String>,
    pub attachment_color: String,
    pub error_color: String,
    pub max_text_length: usize,
}

impl BotSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            public_channel: config.public_channel.clone(),
            attachment_color: config.attachment_color.clone(),
            error_color: config.error_color.clone(),
            max_text_length: config.max_text_length,
        }
    }
}

pub struct SlackBot {
    api: Arc<dyn SlackApi>,
    registry: Arc<CommandRegistry>,
    permissions: PermissionEvaluator,
    reactor: ProgressReactor,
    meter: Arc<UsageMeter>,
    settings: BotSettings,
}

impl SlackBot {
    pub fn new(
        api: Arc<dyn SlackApi>,
        registry: Arc<CommandRegistry>,
        config: &BotConfig,
        meter: Arc<UsageMeter>,
    ) -> Self {
        Self {
            reactor: ProgressReactor::new(Arc::clone(&api), ReactionNames::from_config(config)),
            permissions: PermissionEvaluator::new(config.permissions.as_deref()),
            settings: BotSettings::from_config(config),
            api,
            registry,
            meter,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn meter(&self) -> &Arc<UsageMeter> {
        &self.meter
    }

    /// Handles a slash command, mention or direct message.
    pub async fn handle_message(
        &self,
        message: MessageInfo,
        profile: Option<UserProfile>,
    ) -> DispatchOutcome {
        let (text, token) = event_text_command(&message);
        let Some((definition, invoked)) = self.registry.resolve(&text) else {
            return self.unsupported(&message, &text, &token, profile).await;
        };

        if !self.registry.is_designated(&definition) {
            let qualified = definition.qualified_name();
            if self.permissions.deny_access(self.api.as_ref(), &message.user_id, &qualified).await {
                debug!(
                    event_name = "slack.command.denied",
                    user_id = %message.user_id,
                    command = %qualified,
                    "user is not permitted to run command"
                );
                self.unsupported(&message, &text, &token, profile).await;
                return DispatchOutcome::Denied;
            }
        }

        self.execute_definition(&definition, &invoked, &message, profile).await
    }

    /// Empty text goes to help, anything else to the default command.
    async fn unsupported(
        &self,
        message: &MessageInfo,
        text: &str,
        token: &str,
        profile: Option<UserProfile>,
    ) -> DispatchOutcome {
        if text.is_empty() {
            if let Some(help) = self.registry.help_command() {
                let help = Arc::clone(help);
                return self.execute_definition(&help, token, message, profile).await;
            }
        }

        if let Some(default) = self.registry.default_command() {
            let default = Arc::clone(default);
            return self.execute_definition(&default, token, message, profile).await;
        }

        self.meter.record("", "", text, &message.user_id);
        debug!(
            event_name = "slack.command.unsupported",
            user_id = %message.user_id,
            text,
            "no command matched and no fallback is configured"
        );
        DispatchOutcome::Ignored
    }

    async fn execute_definition(
        &self,
        definition: &CommandDefinition,
        invoked: &str,
        message: &MessageInfo,
        profile: Option<UserProfile>,
    ) -> DispatchOutcome {
        let (text, _) = event_text_command(message);
        self.meter.record(definition.group_name(), &definition.name, &text, &message.user_id);

        let params = find_params(invoked, &definition.patterns, message);
        if form_required(definition.fields.len(), params.len()) {
            return match self.issue_form(definition, &params, message).await {
                Ok(()) => DispatchOutcome::FormIssued,
                Err(error) => {
                    error!(
                        event_name = "slack.form.post_failed",
                        command = %definition.qualified_name(),
                        user_id = %message.user_id,
                        error = %error,
                        "failed to post interactive form"
                    );
                    self.reply_error(message, &error.to_string()).await;
                    self.reactor.fail(message).await;
                    DispatchOutcome::Failed
                }
            };
        }

        self.post_command(definition, message, profile, &params).await
    }

    async fn post_command(
        &self,
        definition: &CommandDefinition,
        message: &MessageInfo,
        profile: Option<UserProfile>,
        params: &ExecuteParams,
    ) -> DispatchOutcome {
        let mut actor = Actor::new(message.user_id.clone());
        if let Some(name) = profile.as_ref().and_then(UserProfile::preferred_name) {
            actor = actor.with_name(name);
        }

        self.reactor.begin(message).await;
        let started = Instant::now();
        let result = definition.command.execute(self, &actor, params).await;
        let elapsed = started.elapsed();

        let output = match result {
            Ok(output) => output,
            Err(error) => {
                warn!(
                    event_name = "slack.command.failed",
                    command = %definition.qualified_name(),
                    user_id = %message.user_id,
                    error_class = error.error_class(),
                    error = %error,
                    "command execution failed"
                );
                self.reply_error(message, &error.to_string()).await;
                self.reactor.fail(message).await;
                return DispatchOutcome::Failed;
            }
        };

        if let Err(error) = self.reply(definition, message, &output, elapsed).await {
            warn!(
                event_name = "slack.reply.failed",
                command = %definition.qualified_name(),
                channel_id = %message.channel_id,
                error = %error,
                "failed to post command reply"
            );
            self.reply_error(message, &error.to_string()).await;
            self.reactor.fail(message).await;
            return DispatchOutcome::Failed;
        }

        info!(
            event_name = "slack.command.executed",
            command = %definition.qualified_name(),
            user_id = %message.user_id,
            elapsed_ms = elapsed.as_millis() as u64,
            "command executed"
        );
        if definition.marks_failure {
            self.reactor.fail(message).await;
        } else {
            self.reactor.succeed(message).await;
        }
        DispatchOutcome::Executed
    }

    async fn reply(
        &self,
        definition: &CommandDefinition,
        message: &MessageInfo,
        output: &CommandOutput,
        elapsed: Duration,
    ) -> Result<MessageRef, ReplyError> {
        let attachments = self.render_attachments(&output.attachments).await?;
        let body = limit_text(&output.message, self.settings.max_text_length);
        let response = definition.response;

        let mut builder = MessageBuilder::new(body.clone());
        if response.original || response.duration {
            let mut quote = Vec::new();
            if response.duration {
                quote.push(RichTextItem::Text { text: format!("[{}] ", format_elapsed(elapsed)) });
            }
            if response.original {
                let (text, _) = event_text_command(message);
                quote.push(RichTextItem::User { user_id: message.user_id.clone() });
                quote.push(RichTextItem::Text { text: format!(" {text}") });
            }
            builder = builder.quote("quote", quote);
        }
        let template = builder
            .section("reply", |section| {
                section.mrkdwn(body);
            })
            .build();

        let mut post = PostMessage::new(message.channel_id.clone(), template)
            .attachments(attachments)
            .in_thread(message.thread_timestamp.clone());
        if !response.visible {
            post = post.ephemeral_to(message.user_id.clone());
        }
        Ok(self.api.post_message(post).await?)
    }

    async fn render_attachments(
        &self,
        attachments: &[Attachment],
    ) -> Result<Vec<MessageAttachment>, ReplyError> {
        let mut rendered = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let builder = MessageBuilder::new(attachment.title.clone());
            let builder = match attachment.kind {
                AttachmentKind::Image => {
                    let upload = FileUpload {
                        filename: format!("{BOT_NAME}-{}", Local::now().format("%Y%m%dT%H%M%S")),
                        title: attachment.title.clone(),
                        data: attachment.data.clone(),
                        channels: self.settings.public_channel.iter().cloned().collect(),
                    };
                    let file_id = self.api.upload_file(upload).await?;
                    builder.image(file_id, attachment.text.clone(), &attachment.title)
                }
                AttachmentKind::Text => {
                    let mut builder = builder;
                    if !attachment.title.is_empty() {
                        builder = builder.section("", |section| {
                            section.mrkdwn(attachment.title.clone());
                        });
                    }
                    let body = String::from_utf8_lossy(&attachment.data);
                    if !body.is_empty() {
                        let body = limit_text(&body, self.settings.max_text_length);
                        builder = builder.section("", |section| {
                            section.mrkdwn(body);
                        });
                    }
                    builder
                }
            };
            rendered.push(MessageAttachment {
                color: self.settings.attachment_color.clone(),
                blocks: builder.build().blocks,
            });
        }
        Ok(rendered)
    }

    /// Private error reply. Failures are only logged.
    async fn reply_error(&self, message: &MessageInfo, text: &str) {
        let post = PostMessage::new(message.channel_id.clone(), MessageTemplate {
            fallback_text: text.to_owned(),
            blocks: Vec::new(),
        })
        .attachments(vec![error_attachment(text, &self.settings.error_color)])
        .in_thread(message.thread_timestamp.clone())
        .ephemeral_to(message.user_id.clone());

        if let Err(error) = self.api.post_message(post).await {
            error!(
                event_name = "slack.reply.error_failed",
                channel_id = %message.channel_id,
                user_id = %message.user_id,
                error = %error,
                "failed to post error reply"
            );
        }
    }

    async fn issue_form(
        &self,
        definition: &CommandDefinition,
        params: &ExecuteParams,
        message: &MessageInfo,
    ) -> Result<(), ReplyError> {
        let token = ResumeToken::new(message.timestamp.clone(), message.text.clone()).encode()?;
        let today = Local::now().format("%Y-%m-%d").to_string();
        let blocks =
            build_form(&definition.interaction_id(), &definition.fields, params, &token, &today);
        let template = MessageTemplate {
            fallback_text: format!("`{}` needs more parameters", definition.qualified_name()),
            blocks,
        };

        self.reactor.dialog_opened(message).await;
        let post = PostMessage::new(message.channel_id.clone(), template)
            .in_thread(message.thread_timestamp.clone())
            .ephemeral_to(message.user_id.clone());
        if let Err(error) = self.api.post_message(post).await {
            self.reactor.dialog_closed(message).await;
            return Err(error.into());
        }

        debug!(
            event_name = "slack.form.issued",
            command = %definition.qualified_name(),
            user_id = %message.user_id,
            fields = definition.fields.len(),
            resolved = params.len(),
            "interactive form issued"
        );
        Ok(())
    }

    /// Resumes or aborts a command from a submitted or cancelled form.
    /// Permissions were checked when the form was issued.
    pub async fn handle_block_action(&self, callback: BlockActionCallback) -> DispatchOutcome {
        let mut message = MessageInfo {
            kind: EventKind::Interaction,
            text: String::new(),
            user_id: callback.user_id.clone(),
            channel_id: callback.channel_id.clone(),
            timestamp: String::new(),
            thread_timestamp: callback.thread_ts.clone(),
        };

        let Some(action) = callback.actions.first() else {
            error!(
                event_name = "slack.form.no_actions",
                user_id = %message.user_id,
                "block action callback carries no actions"
            );
            self.reactor.dialog_closed(&message).await;
            return DispatchOutcome::Ignored;
        };

        let Some(definition) = self.registry.interaction(&action.block_id) else {
            debug!(block_id = %action.block_id, "no command registered for block action");
            return DispatchOutcome::Ignored;
        };

        let token = match ResumeToken::decode(action.value.as_deref().unwrap_or_default()) {
            Ok(token) => token,
            Err(error) => {
                warn!(
                    event_name = "slack.form.token_invalid",
                    command = %definition.qualified_name(),
                    user_id = %message.user_id,
                    error = %error,
                    "discarding form callback with unreadable resume token"
                );
                self.reactor.dialog_closed(&message).await;
                return DispatchOutcome::Aborted;
            }
        };

        message.timestamp = token.timestamp;
        message.text = token.text;
        if message.timestamp.is_empty() {
            message.kind = EventKind::SlashCommand;
        }

        if let Some(response_url) = callback.response_url.as_deref() {
            if let Err(error) = self.api.delete_original(response_url).await {
                warn!(
                    event_name = "slack.form.hide_failed",
                    user_id = %message.user_id,
                    error = %error,
                    "failed to hide answered form"
                );
            }
        }
        self.reactor.dialog_closed(&message).await;

        if action.action_id != SUBMIT_ACTION {
            debug!(
                event_name = "slack.form.cancelled",
                command = %definition.qualified_name(),
                action_id = %action.action_id,
                "form answered without submit"
            );
            self.reactor.mark_failed(&message).await;
            return DispatchOutcome::Cancelled;
        }

        let profile = match self.api.user_profile(&message.user_id).await {
            Ok(profile) => Some(profile),
            Err(error) => {
                warn!(
                    event_name = "slack.profile.lookup_failed",
                    user_id = %message.user_id,
                    error = %error,
                    "could not fetch user profile"
                );
                None
            }
        };

        let params = collect_submitted(&definition.interaction_id(), callback.state);
        self.post_command(&definition, &message, profile, &params).await
    }
}

impl Bot for SlackBot {
    fn name(&self) -> &str {
        BOT_NAME
    }

    fn catalog(&self) -> Vec<CommandSummary> {
        self.registry.catalog()
    }
}

/// Elapsed time rounded to milliseconds, e.g. `15ms`, `1.234s`, `2m3.5s`.
fn format_elapsed(elapsed: Duration) -> String {
    let millis = (elapsed.as_nanos() + 500_000) / 1_000_000;
    if millis == 0 {
        return "0s".to_owned();
    }
    if millis < 1_000 {
        return format!("{millis}ms");
    }

    let hours = millis / 3_600_000;
    let minutes = millis % 3_600_000 / 60_000;
    let seconds = millis % 60_000 / 1_000;
    let fraction = millis % 1_000;

    let mut rendered = String::new();
    if hours > 0 {
        rendered.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        rendered.push_str(&format!("{minutes}m"));
    }
    rendered.push_str(&seconds.to_string());
    if fraction > 0 {
        let fraction = format!("{fraction:03}");
        rendered.push('.');
        rendered.push_str(fraction.trim_end_matches('0'));
    }
    rendered.push('s');
    rendered
}
