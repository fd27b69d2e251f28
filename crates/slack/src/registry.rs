//! Routing table built once from the configured processors.

use std::{collections::HashMap, sync::Arc};

use chatops_core::{Command, CommandSummary, Field, Processors, Response};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::forms;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command `{command}` has invalid parameter pattern `{pattern}`: {source}")]
    InvalidParamPattern {
        command: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A registered command with everything the dispatcher needs precomputed.
pub struct CommandDefinition {
    pub command: Arc<dyn Command>,
    pub name: String,
    pub group: Option<String>,
    pub aliases: Vec<String>,
    pub patterns: Vec<Regex>,
    pub fields: Vec<Field>,
    pub response: Response,
    /// Set for the default command, which answers requests nothing else handles.
    pub marks_failure: bool,
}

impl CommandDefinition {
    fn new(
        command: Arc<dyn Command>,
        group: Option<&str>,
        marks_failure: bool,
    ) -> Result<Self, RegistryError> {
        let name = command.name().to_owned();
        let patterns = command
            .params()
            .into_iter()
            .map(|pattern| {
                Regex::new(&pattern).map_err(|source| RegistryError::InvalidParamPattern {
                    command: name.clone(),
                    pattern,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            group: group.filter(|group| !group.is_empty()).map(str::to_owned),
            aliases: command.aliases(),
            patterns,
            fields: command.fields(),
            response: command.response(),
            marks_failure,
            command,
        })
    }

    /// `group/command` for grouped commands, the bare name at root.
    pub fn qualified_name(&self) -> String {
        match &self.group {
            Some(group) => format!("{group}/{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn interaction_id(&self) -> String {
        forms::interaction_id(&self.name, self.group.as_deref())
    }

    pub fn group_name(&self) -> &str {
        self.group.as_deref().unwrap_or_default()
    }

    fn answers_to(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|alias| alias == token)
    }

    fn summary(&self) -> CommandSummary {
        CommandSummary {
            group: self.group.clone(),
            name: self.name.clone(),
            aliases: self.aliases.clone(),
            description: self.command.description().to_owned(),
        }
    }
}

#[derive(Default)]
pub struct CommandRegistry {
    groups: Vec<(String, Vec<Arc<CommandDefinition>>)>,
    root: Vec<Arc<CommandDefinition>>,
    interactions: HashMap<String, Arc<CommandDefinition>>,
    default_command: Option<Arc<CommandDefinition>>,
    help_command: Option<Arc<CommandDefinition>>,
}

impl CommandRegistry {
    /// Grouped processors are registered before root ones. The default command
    /// is only reachable as a fallback; the help command is routable too.
    pub fn build(
        processors: &Processors,
        default_name: Option<&str>,
        help_name: Option<&str>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();

        for processor in processors.items().iter().filter(|p| !p.name().is_empty()) {
            let group = processor.name();
            let mut definitions = Vec::new();
            for command in processor.commands() {
                let definition = Arc::new(CommandDefinition::new(command, Some(group), false)?);
                registry.register_interaction(&definition);
                definitions.push(definition);
            }
            match registry.groups.iter_mut().find(|(name, _)| name == group) {
                Some((_, existing)) => existing.extend(definitions),
                None => registry.groups.push((group.to_owned(), definitions)),
            }
        }

        for processor in processors.items().iter().filter(|p| p.name().is_empty()) {
            for command in processor.commands() {
                let name = command.name().to_owned();
                if default_name == Some(name.as_str()) {
                    registry.default_command =
                        Some(Arc::new(CommandDefinition::new(command, None, true)?));
                    continue;
                }

                let definition = Arc::new(CommandDefinition::new(command, None, false)?);
                if help_name == Some(name.as_str()) {
                    registry.help_command = Some(Arc::clone(&definition));
                }
                registry.register_interaction(&definition);
                registry.root.push(definition);
            }
        }

        debug!(
            groups = registry.groups.len(),
            root = registry.root.len(),
            interactions = registry.interactions.len(),
            has_default = registry.default_command.is_some(),
            has_help = registry.help_command.is_some(),
            "command registry built"
        );
        Ok(registry)
    }

    fn register_interaction(&mut self, definition: &Arc<CommandDefinition>) {
        if !definition.fields.is_empty() {
            self.interactions.insert(definition.interaction_id(), Arc::clone(definition));
        }
    }

    /// Routes candidate text to a command. Returns the token that invoked it.
    pub fn resolve(&self, text: &str) -> Option<(Arc<CommandDefinition>, String)> {
        let mut words = text.split_whitespace();
        let first = words.next()?;

        if let Some((_, definitions)) = self.groups.iter().find(|(name, _)| name == first) {
            let second = words.next()?;
            return definitions
                .iter()
                .find(|definition| definition.answers_to(second))
                .map(|definition| (Arc::clone(definition), second.to_owned()));
        }

        self.root
            .iter()
            .find(|definition| definition.answers_to(first))
            .map(|definition| (Arc::clone(definition), first.to_owned()))
    }

    pub fn interaction(&self, interaction_id: &str) -> Option<Arc<CommandDefinition>> {
        self.interactions.get(interaction_id).cloned()
    }

    pub fn default_command(&self) -> Option<&Arc<CommandDefinition>> {
        self.default_command.as_ref()
    }

    pub fn help_command(&self) -> Option<&Arc<CommandDefinition>> {
        self.help_command.as_ref()
    }

    /// Default and help commands bypass permission checks.
    pub fn is_designated(&self, definition: &Arc<CommandDefinition>) -> bool {
        [&self.default_command, &self.help_command]
            .into_iter()
            .flatten()
            .any(|designated| Arc::ptr_eq(designated, definition))
    }

    /// Number of routable commands.
    pub fn len(&self) -> usize {
        self.root.len() + self.groups.iter().map(|(_, defs)| defs.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn catalog(&self) -> Vec<CommandSummary> {
        self.groups
            .iter()
            .flat_map(|(_, definitions)| definitions.iter())
            .chain(self.root.iter())
            .map(|definition| definition.summary())
            .collect()
    }
}
