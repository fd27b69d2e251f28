//! Command descriptors and the processor groups that expose them.
//!
//! Commands are implemented outside the bot and only describe themselves: how
//! arguments are captured from free text (`params`), which fields an
//! interactive form should collect when those arguments are incomplete
//! (`fields`), and how the reply is presented (`response`).

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ExecutionError;

/// Resolved parameters keyed by field/capture name.
pub type ExecuteParams = HashMap<String, String>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Edit,
    MultiEdit,
    Url,
    Date,
    Select,
    MultiSelect,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub label: String,
    pub hint: Option<String>,
    pub default: Option<String>,
    pub values: Vec<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type,
            label: label.into(),
            hint: None,
            default: None,
            values: Vec::new(),
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Reply presentation flags. All three are independent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Post to the channel instead of privately to the actor.
    pub visible: bool,
    /// Echo the invocation text as a quote above the reply.
    pub original: bool,
    /// Show elapsed execution time.
    pub duration: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Text,
    Image,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub title: String,
    /// Alternative text for images; unused for text attachments.
    pub text: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn text(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Text,
            title: title.into(),
            text: String::new(),
            data: body.into().into_bytes(),
        }
    }

    pub fn image(title: impl Into<String>, alt_text: impl Into<String>, data: Vec<u8>) -> Self {
        Self { kind: AttachmentKind::Image, title: title.into(), text: alt_text.into(), data }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub message: String,
    pub attachments: Vec<Attachment>,
}

impl CommandOutput {
    pub fn message(message: impl Into<String>) -> Self {
        Self { message: message.into(), attachments: Vec::new() }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// The user on whose behalf a command runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), name: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|name| !name.is_empty()).unwrap_or(&self.id)
    }
}

/// One routable command as listed by help output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSummary {
    pub group: Option<String>,
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
}

impl CommandSummary {
    /// Text a user types to run the command.
    pub fn invocation(&self) -> String {
        match &self.group {
            Some(group) => format!("{group} {}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Handle to the bot running a command.
pub trait Bot: Send + Sync {
    fn name(&self) -> &str;

    fn catalog(&self) -> Vec<CommandSummary> {
        Vec::new()
    }
}

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;

    fn aliases(&self) -> Vec<String> {
        Vec::new()
    }

    fn description(&self) -> &str;

    /// Alternative named-capture patterns; the first one producing captures wins.
    fn params(&self) -> Vec<String> {
        Vec::new()
    }

    fn fields(&self) -> Vec<Field> {
        Vec::new()
    }

    fn response(&self) -> Response {
        Response::default()
    }

    async fn execute(
        &self,
        bot: &dyn Bot,
        actor: &Actor,
        params: &ExecuteParams,
    ) -> Result<CommandOutput, ExecutionError>;
}

/// A named group of commands. An empty name places the commands at root level.
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;
    fn commands(&self) -> Vec<Arc<dyn Command>>;
}

pub struct CommandGroup {
    name: String,
    commands: Vec<Arc<dyn Command>>,
}

impl CommandGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), commands: Vec::new() }
    }

    pub fn root() -> Self {
        Self::new("")
    }

    pub fn command<C>(mut self, command: C) -> Self
    where
        C: Command + 'static,
    {
        self.commands.push(Arc::new(command));
        self
    }
}

impl Processor for CommandGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        self.commands.clone()
    }
}

#[derive(Clone, Default)]
pub struct Processors {
    items: Vec<Arc<dyn Processor>>,
}

impl Processors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<P>(&mut self, processor: P) -> &mut Self
    where
        P: Processor + 'static,
    {
        self.items.push(Arc::new(processor));
        self
    }

    pub fn items(&self) -> &[Arc<dyn Processor>] {
        &self.items
    }
}
