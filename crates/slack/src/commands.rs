use chatops_core::ExecuteParams;
use regex::Regex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    SlashCommand,
    AppMention,
    DirectMessage,
    Interaction,
}

impl EventKind {
    /// Slash invocations have no message to react to.
    pub fn has_origin_message(self) -> bool {
        !matches!(self, Self::SlashCommand)
    }
}

/// Per-request view of the event that triggered a dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageInfo {
    pub kind: EventKind,
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    pub timestamp: String,
    pub thread_timestamp: Option<String>,
}

impl MessageInfo {
    pub fn from_slash_command(payload: &SlashCommandPayload) -> Self {
        Self {
            kind: EventKind::SlashCommand,
            text: payload.text.clone(),
            user_id: payload.user_id.clone(),
            channel_id: payload.channel_id.clone(),
            timestamp: String::new(),
            thread_timestamp: None,
        }
    }
}

/// Returns the candidate command text and its first word.
pub fn event_text_command(message: &MessageInfo) -> (String, String) {
    let text = match message.kind {
        EventKind::SlashCommand | EventKind::DirectMessage => message.text.trim(),
        EventKind::AppMention => {
            message.text.split_once('>').map(|(_, rest)| rest.trim()).unwrap_or_default()
        }
        // Resumed forms carry the text of either a mention or a direct message;
        // only a leading mention is stripped so links and user refs survive.
        EventKind::Interaction => {
            let text = message.text.trim();
            text.strip_prefix("<@")
                .and_then(|rest| rest.split_once('>'))
                .map_or(text, |(_, rest)| rest.trim())
        }
    };
    let token = text.split_whitespace().next().unwrap_or_default();
    (text.to_owned(), token.to_owned())
}

/// Runs the alternative patterns against the text after `invoked`; the first
/// pattern producing named captures supplies every parameter.
pub fn find_params(invoked: &str, patterns: &[Regex], message: &MessageInfo) -> ExecuteParams {
    let mut params = ExecuteParams::new();
    if patterns.is_empty() {
        return params;
    }

    let (text, _) = event_text_command(message);
    let Some((_, arguments)) = text.split_once(invoked) else {
        return params;
    };
    let arguments = arguments.trim();

    for pattern in patterns {
        let Some(captures) = pattern.captures(arguments) else {
            continue;
        };
        for name in pattern.capture_names().flatten() {
            let value = captures.name(name).map(|m| m.as_str()).unwrap_or_default();
            params.insert(name.to_owned(), value.to_owned());
        }
        if !params.is_empty() {
            return params;
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::{event_text_command, find_params, EventKind, MessageInfo};

    fn message(kind: EventKind, text: &str) -> MessageInfo {
        MessageInfo {
            kind,
            text: text.to_owned(),
            user_id: "U1".to_owned(),
            channel_id: "C1".to_owned(),
            timestamp: "1730000000.1000".to_owned(),
            thread_timestamp: None,
        }
    }

    fn patterns(raw: &[&str]) -> Vec<Regex> {
        raw.iter().map(|p| Regex::new(p).expect("pattern")).collect()
    }

    #[test]
    fn slash_text_is_trimmed_whole() {
        let (text, token) =
            event_text_command(&message(EventKind::SlashCommand, "  deploy env=prod "));
        assert_eq!(text, "deploy env=prod");
        assert_eq!(token, "deploy");
    }

    #[test]
    fn mention_text_starts_after_the_mention() {
        let (text, token) =
            event_text_command(&message(EventKind::AppMention, "<@UBOT> k8s pods  ns=default"));
        assert_eq!(text, "k8s pods  ns=default");
        assert_eq!(token, "k8s");
    }

    #[test]
    fn mention_without_delimiter_yields_empty_text() {
        let (text, token) = event_text_command(&message(EventKind::AppMention, "hello bot"));
        assert_eq!(text, "");
        assert_eq!(token, "");
    }

    #[test]
    fn resumed_interactions_strip_a_mention_when_present() {
        let (text, _) = event_text_command(&message(EventKind::Interaction, "<@UBOT> deploy"));
        assert_eq!(text, "deploy");
        let (text, _) = event_text_command(&message(EventKind::Interaction, "deploy now"));
        assert_eq!(text, "deploy now");
    }

    #[test]
    fn resumed_direct_messages_keep_links_and_user_refs() {
        let resumed = message(EventKind::Interaction, " deploy url=<https://x.io> to <@U42> ");
        let (text, token) = event_text_command(&resumed);
        assert_eq!(text, "deploy url=<https://x.io> to <@U42>");
        assert_eq!(token, "deploy");

        let mentioned = message(EventKind::Interaction, "<@UBOT> deploy url=<https://x.io>");
        assert_eq!(event_text_command(&mentioned).0, "deploy url=<https://x.io>");
    }

    #[test]
    fn direct_messages_parse_like_slash_commands() {
        let (text, token) = event_text_command(&message(EventKind::DirectMessage, " help "));
        assert_eq!((text.as_str(), token.as_str()), ("help", "help"));
    }

    #[test]
    fn first_matching_pattern_wins_over_later_matches() {
        let patterns = patterns(&["env=(?P<env>\\w+)", "(?P<target>\\S+)"]);
        let params = find_params(
            "deploy",
            &patterns,
            &message(EventKind::SlashCommand, "deploy env=prod"),
        );

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn unmatched_patterns_yield_empty_params() {
        let patterns = patterns(&["env=(?P<env>\\w+) version=(?P<version>\\S+)"]);
        let params = find_params(
            "deploy",
            &patterns,
            &message(EventKind::SlashCommand, "deploy env=prod"),
        );
        assert!(params.is_empty());
    }

    #[test]
    fn unnamed_groups_are_ignored_and_missing_named_groups_are_empty() {
        let patterns = patterns(&["(\\w+) (?P<env>\\w+)(?: (?P<tag>\\w+))?"]);
        let params = find_params(
            "deploy",
            &patterns,
            &message(EventKind::AppMention, "<@UBOT> deploy api prod"),
        );

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("env").map(String::as_str), Some("prod"));
        assert_eq!(params.get("tag").map(String::as_str), Some(""));
    }

    #[test]
    fn arguments_follow_the_invoked_command_inside_a_group() {
        let patterns = patterns(&["ns=(?P<namespace>\\S+)"]);
        let params = find_params(
            "pods",
            &patterns,
            &message(EventKind::SlashCommand, "k8s pods ns=payments"),
        );
        assert_eq!(params.get("namespace").map(String::as_str), Some("payments"));
    }

    #[test]
    fn no_patterns_means_no_params() {
        let params = find_params("uptime", &[], &message(EventKind::SlashCommand, "uptime now"));
        assert!(params.is_empty());
    }
}
