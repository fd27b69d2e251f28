//! Group-based access rules.
//!
//! A rule set is configured as `group=command[,group=command...]` where both
//! sides are regular expressions, e.g. `.*=^(help|news)$,oncall=^(escalate)$`.
//! Rules are evaluated in declaration order and the first rule whose command
//! pattern matches and whose group pattern names a group containing the user
//! grants access. Exhausting the rules denies.

use regex::Regex;
use tracing::{debug, error, warn};

use crate::api::{SlackApi, UserGroup};

#[derive(Clone, Debug)]
pub struct RulePattern {
    source: String,
    compiled: Result<Regex, regex::Error>,
}

impl RulePattern {
    fn new(source: &str) -> Self {
        Self { source: source.to_owned(), compiled: Regex::new(source) }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Clone, Debug)]
pub struct PermissionRule {
    pub group: RulePattern,
    pub command: RulePattern,
}

#[derive(Clone, Debug, Default)]
pub struct PermissionRules {
    rules: Vec<PermissionRule>,
}

impl PermissionRules {
    /// Entries without `=` are skipped. Regexes are compiled here but errors
    /// only surface when a rule is evaluated.
    pub fn parse(raw: &str) -> Self {
        let rules = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let Some((group, command)) = entry.split_once('=') else {
                    warn!(
                        event_name = "permissions.rule_malformed",
                        rule = entry,
                        "permission rule is not in group=command form; skipping"
                    );
                    return None;
                };
                Some(PermissionRule {
                    group: RulePattern::new(group.trim()),
                    command: RulePattern::new(command.trim()),
                })
            })
            .collect();

        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionRule> {
        self.rules.iter()
    }
}

#[derive(Clone, Debug, Default)]
pub struct PermissionEvaluator {
    rules: Option<PermissionRules>,
}

impl PermissionEvaluator {
    pub fn new(raw: Option<&str>) -> Self {
        let rules = raw.map(str::trim).filter(|raw| !raw.is_empty()).map(PermissionRules::parse);
        Self { rules }
    }

    pub fn is_configured(&self) -> bool {
        self.rules.is_some()
    }

    /// Returns true when `user_id` may not run `command`.
    ///
    /// A group lookup failure allows the call while an invalid rule regex or
    /// exhausted rules deny it.
    pub async fn deny_access(&self, api: &dyn SlackApi, user_id: &str, command: &str) -> bool {
        let Some(rules) = &self.rules else {
            return false;
        };

        let mut groups: Option<Vec<UserGroup>> = None;
        for rule in rules.iter() {
            let command_pattern = match &rule.command.compiled {
                Ok(pattern) => pattern,
                Err(error) => {
                    error!(
                        event_name = "permissions.command_regex_invalid",
                        pattern = rule.command.source(),
                        error = %error,
                        "permission command pattern is invalid; denying"
                    );
                    return true;
                }
            };
            if !command_pattern.is_match(command) {
                continue;
            }

            let group_pattern = match &rule.group.compiled {
                Ok(pattern) => pattern,
                Err(error) => {
                    error!(
                        event_name = "permissions.group_regex_invalid",
                        pattern = rule.group.source(),
                        error = %error,
                        "permission group pattern is invalid; denying"
                    );
                    return true;
                }
            };

            if groups.is_none() {
                match api.user_groups().await {
                    Ok(fetched) => groups = Some(fetched),
                    Err(error) => {
                        warn!(
                            event_name = "permissions.group_lookup_failed",
                            user_id,
                            command,
                            error = %error,
                            "user group lookup failed; allowing"
                        );
                        return false;
                    }
                }
            }

            let granted = groups.as_deref().unwrap_or_default().iter().any(|group| {
                group_pattern.is_match(&group.name)
                    && group.users.iter().any(|user| user == user_id)
            });
            if granted {
                debug!(user_id, command, rule = rule.group.source(), "permission granted");
                return false;
            }
        }

        true
    }
}
