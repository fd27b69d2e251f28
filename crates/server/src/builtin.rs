//! Commands shipped with the server binary.

use async_trait::async_trait;
use chatops_core::{
    config::BotConfig, Actor, Bot, Command, CommandGroup, CommandOutput, ExecuteParams,
    ExecutionError, Field, FieldType, Processors, Response,
};

pub const UNKNOWN_COMMAND: &str = "unknown";

/// Root-level built-ins. The help command takes its configured name; the
/// unknown-command responder is only registered when it is the configured default.
pub fn processors(config: &BotConfig) -> Processors {
    let mut root = CommandGroup::root().command(Echo);
    if let Some(name) = config.help_command.as_deref() {
        root = root.command(Help { name: name.to_owned() });
    }
    if config.default_command.as_deref() == Some(UNKNOWN_COMMAND) {
        root = root.command(Unknown);
    }

    let mut processors = Processors::new();
    processors.add(root);
    processors
}

pub struct Help {
    name: String,
}

#[async_trait]
impl Command for Help {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "List the commands this bot understands"
    }

    async fn execute(
        &self,
        bot: &dyn Bot,
        actor: &Actor,
        _params: &ExecuteParams,
    ) -> Result<CommandOutput, ExecutionError> {
        let mut lines = vec![format!("Hi {}, {} understands:", actor.display_name(), bot.name())];
        for summary in bot.catalog() {
            let mut line = format!("• `{}` {}", summary.invocation(), summary.description);
            if !summary.aliases.is_empty() {
                line.push_str(&format!(" (aliases: {})", summary.aliases.join(", ")));
            }
            lines.push(line);
        }
        Ok(CommandOutput::message(lines.join("\n")))
    }
}

pub struct Echo;

#[async_trait]
impl Command for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn aliases(&self) -> Vec<String> {
        vec!["say".to_owned()]
    }

    fn description(&self) -> &str {
        "Repeat the given text in the channel"
    }

    fn params(&self) -> Vec<String> {
        vec!["(?P<text>.+)".to_owned()]
    }

    fn fields(&self) -> Vec<Field> {
        vec![Field::new("text", FieldType::MultiEdit, "Text").hint("what should be repeated")]
    }

    fn response(&self) -> Response {
        Response { visible: true, original: true, duration: false }
    }

    async fn execute(
        &self,
        _bot: &dyn Bot,
        _actor: &Actor,
        params: &ExecuteParams,
    ) -> Result<CommandOutput, ExecutionError> {
        let text = params
            .get("text")
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ExecutionError::MissingParameter("text".to_owned()))?;
        Ok(CommandOutput::message(text))
    }
}

pub struct Unknown;

#[async_trait]
impl Command for Unknown {
    fn name(&self) -> &str {
        UNKNOWN_COMMAND
    }

    fn description(&self) -> &str {
        "Answer requests no command understands"
    }

    async fn execute(
        &self,
        _bot: &dyn Bot,
        _actor: &Actor,
        _params: &ExecuteParams,
    ) -> Result<CommandOutput, ExecutionError> {
        Ok(CommandOutput::message("Sorry, I don't know that one. Try `help`."))
    }
}
