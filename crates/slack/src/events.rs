use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    api::UserProfile,
    bot::{DispatchOutcome, SlackBot},
    commands::{EventKind, MessageInfo, SlashCommandPayload},
    forms::FormState,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    AppMention(MessageEvent),
    DirectMessage(MessageEvent),
    BlockAction(BlockActionCallback),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::AppMention(_) => SlackEventType::AppMention,
            Self::DirectMessage(_) => SlackEventType::DirectMessage,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }

    /// `(user_id, channel_id)` of the event, when it has one.
    pub fn origin(&self) -> Option<(&str, &str)> {
        match self {
            Self::SlashCommand(payload) => Some((&payload.user_id, &payload.channel_id)),
            Self::AppMention(event) | Self::DirectMessage(event) => {
                Some((&event.user_id, &event.channel_id))
            }
            Self::BlockAction(callback) => Some((&callback.user_id, &callback.channel_id)),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    AppMention,
    DirectMessage,
    BlockAction,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub user_profile: Option<UserProfile>,
}

impl MessageEvent {
    fn message_info(&self, kind: EventKind) -> MessageInfo {
        MessageInfo {
            kind,
            text: self.text.clone(),
            user_id: self.user_id.clone(),
            channel_id: self.channel_id.clone(),
            timestamp: self.ts.clone(),
            thread_timestamp: self.thread_ts.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockAction {
    pub action_id: String,
    /// Interaction ID of the form the button belongs to.
    pub block_id: String,
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockActionCallback {
    pub user_id: String,
    pub channel_id: String,
    pub thread_ts: Option<String>,
    pub response_url: Option<String>,
    pub actions: Vec<BlockAction>,
    pub state: FormState,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed(DispatchOutcome),
    Ignored,
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(&self, envelope: &SlackEnvelope, ctx: &EventContext) -> HandlerResult;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(&self, envelope: &SlackEnvelope, ctx: &EventContext) -> HandlerResult {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return HandlerResult::Ignored;
        };

        handler.handle(envelope, ctx).await
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher with every event type routed to `bot`.
pub fn bot_dispatcher(bot: Arc<SlackBot>) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(Arc::clone(&bot)));
    dispatcher.register(MessageHandler::new(Arc::clone(&bot), EventKind::AppMention));
    dispatcher.register(MessageHandler::new(Arc::clone(&bot), EventKind::DirectMessage));
    dispatcher.register(BlockActionHandler::new(bot));
    dispatcher
}

pub struct SlashCommandHandler {
    bot: Arc<SlackBot>,
}

impl SlashCommandHandler {
    pub fn new(bot: Arc<SlackBot>) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl EventHandler for SlashCommandHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(&self, envelope: &SlackEnvelope, _ctx: &EventContext) -> HandlerResult {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return HandlerResult::Ignored;
        };

        let outcome = self.bot.handle_message(MessageInfo::from_slash_command(payload), None).await;
        HandlerResult::Processed(outcome)
    }
}

/// Handles app mentions or direct messages, depending on `kind`.
pub struct MessageHandler {
    bot: Arc<SlackBot>,
    kind: EventKind,
}

impl MessageHandler {
    pub fn new(bot: Arc<SlackBot>, kind: EventKind) -> Self {
        Self { bot, kind }
    }
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn event_type(&self) -> SlackEventType {
        match self.kind {
            EventKind::DirectMessage => SlackEventType::DirectMessage,
            _ => SlackEventType::AppMention,
        }
    }

    async fn handle(&self, envelope: &SlackEnvelope, _ctx: &EventContext) -> HandlerResult {
        let event = match (&envelope.event, self.kind) {
            (SlackEvent::AppMention(event), EventKind::AppMention)
            | (SlackEvent::DirectMessage(event), EventKind::DirectMessage) => event,
            _ => return HandlerResult::Ignored,
        };

        let message = event.message_info(self.kind);
        let outcome = self.bot.handle_message(message, event.user_profile.clone()).await;
        HandlerResult::Processed(outcome)
    }
}

pub struct BlockActionHandler {
    bot: Arc<SlackBot>,
}

impl BlockActionHandler {
    pub fn new(bot: Arc<SlackBot>) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl EventHandler for BlockActionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(&self, envelope: &SlackEnvelope, _ctx: &EventContext) -> HandlerResult {
        let SlackEvent::BlockAction(callback) = &envelope.event else {
            return HandlerResult::Ignored;
        };

        HandlerResult::Processed(self.bot.handle_block_action(callback.clone()).await)
    }
}
