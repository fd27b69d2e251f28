use std::sync::Arc;

use chatops_core::{config::AppConfig, Processors};
use chatops_slack::{
    bot_dispatcher, CommandRegistry, EventDispatcher, NoopSlackApi, NoopSocketTransport,
    ReconnectPolicy, RegistryError, SlackBot, SocketModeRunner, UsageMeter,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub registry: Arc<CommandRegistry>,
    pub meter: Arc<UsageMeter>,
    pub bot: Arc<SlackBot>,
    pub dispatcher: Arc<EventDispatcher>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("command registry could not be built: {0}")]
    Registry(#[from] RegistryError),
}

pub fn bootstrap_with_config(
    config: AppConfig,
    processors: &Processors,
) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let registry = Arc::new(CommandRegistry::build(
        processors,
        config.bot.default_command.as_deref(),
        config.bot.help_command.as_deref(),
    )?);
    if config.bot.default_command.is_some() && registry.default_command().is_none() {
        tracing::warn!(
            event_name = "system.bootstrap.default_missing",
            command = config.bot.default_command.as_deref().unwrap_or_default(),
            "configured default command is not registered"
        );
    }
    if config.bot.help_command.is_some() && registry.help_command().is_none() {
        tracing::warn!(
            event_name = "system.bootstrap.help_missing",
            command = config.bot.help_command.as_deref().unwrap_or_default(),
            "configured help command is not registered"
        );
    }

    let meter = Arc::new(UsageMeter::new());
    let bot = Arc::new(SlackBot::new(
        Arc::new(NoopSlackApi),
        Arc::clone(&registry),
        &config.bot,
        Arc::clone(&meter),
    ));
    let dispatcher = Arc::new(bot_dispatcher(Arc::clone(&bot)));
    let slack_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        Arc::clone(&dispatcher),
        ReconnectPolicy::default(),
    );

    info!(
        event_name = "system.bootstrap.ready",
        commands = registry.len(),
        handlers = dispatcher.handler_count(),
        "application bootstrap complete"
    );

    Ok(Application { config, registry, meter, bot, dispatcher, slack_runner })
}

#[cfg(test)]
mod tests {
    use chatops_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use chatops_slack::{
        commands::SlashCommandPayload,
        events::{EventContext, HandlerResult, SlackEnvelope, SlackEvent},
        DispatchOutcome, RunSummary,
    };

    use crate::{bootstrap::bootstrap_with_config, builtin};

    fn valid_options(default_command: Option<&str>) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                slack_app_token: Some("xapp-test".to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                default_command: default_command.map(str::to_string),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    fn slash(text: &str) -> SlackEnvelope {
        SlackEnvelope {
            envelope_id: "env-1".to_string(),
            event: SlackEvent::SlashCommand(SlashCommandPayload {
                command: "/ops".to_string(),
                text: text.to_string(),
                channel_id: "C1".to_string(),
                user_id: "U1".to_string(),
                trigger_id: "T1".to_string(),
            }),
        }
    }

    #[test]
    fn config_load_fails_fast_without_required_slack_tokens() {
        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                slack_app_token: Some("invalid-token".to_string()),
                slack_bot_token: Some("xoxb-valid".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[test]
    fn bootstrap_registers_builtins_and_designations() {
        let config = AppConfig::load(valid_options(Some("unknown"))).expect("config");
        let processors = builtin::processors(&config.bot);

        let app = bootstrap_with_config(config, &processors).expect("bootstrap");

        assert!(app.registry.help_command().is_some());
        assert!(app.registry.default_command().is_some());
        assert!(app.registry.resolve("unknown").is_none(), "default is not routable");
        assert!(app.registry.resolve("echo hi").is_some());
        assert_eq!(app.dispatcher.handler_count(), 4);
    }

    #[tokio::test]
    async fn bootstrapped_dispatcher_runs_commands_end_to_end() {
        let config = AppConfig::load(valid_options(None)).expect("config");
        let processors = builtin::processors(&config.bot);
        let app = bootstrap_with_config(config, &processors).expect("bootstrap");

        let result = app.dispatcher.dispatch(&slash("echo hello"), &EventContext::default()).await;
        assert_eq!(result, HandlerResult::Processed(DispatchOutcome::Executed));

        let result = app.dispatcher.dispatch(&slash("nonsense"), &EventContext::default()).await;
        assert_eq!(result, HandlerResult::Processed(DispatchOutcome::Ignored));
        assert_eq!(app.meter.total(), 2);

        let summary = app.slack_runner.start().await;
        assert_eq!(summary, RunSummary { sessions: 1, dispatched: 0 });
    }
}
