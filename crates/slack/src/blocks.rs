use chatops_core::config::TRIMMED_MARKER;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "button")]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptionObject {
    pub text: TextObject,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<TextObject>,
}

impl OptionObject {
    pub fn new(value: impl Into<String>, description: Option<TextObject>) -> Self {
        let value = value.into();
        Self { text: TextObject::plain(value.clone()), value, description }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputElement {
    PlainTextInput {
        action_id: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
    UrlTextInput {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
    Datepicker {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_date: Option<String>,
    },
    StaticSelect {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
        options: Vec<OptionObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_option: Option<OptionObject>,
    },
    MultiStaticSelect {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
        options: Vec<OptionObject>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        initial_options: Vec<OptionObject>,
    },
}

impl InputElement {
    pub fn action_id(&self) -> &str {
        match self {
            Self::PlainTextInput { action_id, .. }
            | Self::UrlTextInput { action_id, .. }
            | Self::Datepicker { action_id, .. }
            | Self::StaticSelect { action_id, .. }
            | Self::MultiStaticSelect { action_id, .. } => action_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichTextItem {
    Text { text: String },
    User { user_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichTextElement {
    RichTextQuote { elements: Vec<RichTextItem> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlackFileRef {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        #[serde(skip_serializing_if = "String::is_empty")]
        block_id: String,
        text: TextObject,
    },
    Actions {
        #[serde(skip_serializing_if = "String::is_empty")]
        block_id: String,
        elements: Vec<ButtonElement>,
    },
    Context {
        #[serde(skip_serializing_if = "String::is_empty")]
        block_id: String,
        elements: Vec<TextObject>,
    },
    Input {
        #[serde(skip_serializing_if = "String::is_empty")]
        block_id: String,
        label: TextObject,
        element: InputElement,
    },
    RichText {
        #[serde(skip_serializing_if = "String::is_empty")]
        block_id: String,
        elements: Vec<RichTextElement>,
    },
    Image {
        slack_file: SlackFileRef,
        alt_text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<TextObject>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

/// Coloured legacy attachment wrapping a block set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageAttachment {
    pub color: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn input(
        mut self,
        block_id: impl Into<String>,
        label: impl Into<String>,
        element: InputElement,
    ) -> Self {
        self.blocks.push(Block::Input {
            block_id: block_id.into(),
            label: TextObject::plain(label),
            element,
        });
        self
    }

    pub fn quote(mut self, block_id: impl Into<String>, elements: Vec<RichTextItem>) -> Self {
        self.blocks.push(Block::RichText {
            block_id: block_id.into(),
            elements: vec![RichTextElement::RichTextQuote { elements }],
        });
        self
    }

    pub fn image(
        mut self,
        file_id: impl Into<String>,
        alt_text: impl Into<String>,
        title: &str,
    ) -> Self {
        self.blocks.push(Block::Image {
            slack_file: SlackFileRef { id: file_id.into() },
            alt_text: alt_text.into(),
            title: (!title.is_empty()).then(|| TextObject::plain(title)),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Cuts `text` so the result stays below `max` bytes, ending with the trimmed marker.
pub fn limit_text(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_owned();
    }

    let mut cut = max.saturating_sub(TRIMMED_MARKER.len() + 1);
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{TRIMMED_MARKER}", &text[..cut])
}

pub fn error_attachment(message: &str, color: &str) -> MessageAttachment {
    let template = MessageBuilder::new(message)
        .section("reply.error.v1", |section| {
            section.mrkdwn(message);
        })
        .build();
    MessageAttachment { color: color.to_owned(), blocks: template.blocks }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        error_attachment, limit_text, ButtonElement, InputElement, MessageBuilder, RichTextItem,
        TextObject,
    };
    use chatops_core::config::TRIMMED_MARKER;

    #[test]
    fn limit_text_keeps_short_text_untouched() {
        assert_eq!(limit_text("all pods healthy", 3000), "all pods healthy");
    }

    #[test]
    fn limit_text_replaces_tail_with_marker() {
        let body = "x".repeat(3500);
        let limited = limit_text(&body, 3000);

        assert!(limited.ends_with(TRIMMED_MARKER));
        assert!(limited.len() < 3000);
        assert_eq!(limited.len(), 3000 - 1);
    }

    #[test]
    fn limit_text_never_splits_multibyte_characters() {
        let body = "é".repeat(40);
        let limited = limit_text(&body, 40);
        assert!(limited.ends_with(TRIMMED_MARKER));
        assert!(limited.len() <= 40);
    }

    #[test]
    fn buttons_and_inputs_serialize_to_block_kit_shape() {
        let template = MessageBuilder::new("form")
            .input(
                "",
                "Environment",
                InputElement::PlainTextInput {
                    action_id: "deploy-env".to_owned(),
                    multiline: false,
                    initial_value: Some("staging".to_owned()),
                    placeholder: None,
                },
            )
            .actions("deploy", |actions| {
                actions.button(ButtonElement::new("submit", "Submit").value("token"));
            })
            .build();

        let value = serde_json::to_value(&template.blocks).expect("serialize");
        assert_eq!(
            value,
            json!([
                {
                    "type": "input",
                    "label": {"type": "plain_text", "text": "Environment"},
                    "element": {
                        "type": "plain_text_input",
                        "action_id": "deploy-env",
                        "initial_value": "staging"
                    }
                },
                {
                    "type": "actions",
                    "block_id": "deploy",
                    "elements": [{
                        "type": "button",
                        "action_id": "submit",
                        "text": {"type": "plain_text", "text": "Submit"},
                        "value": "token"
                    }]
                }
            ])
        );
    }

    #[test]
    fn quote_block_renders_user_and_text_items() {
        let template = MessageBuilder::new("reply")
            .quote(
                "quote",
                vec![
                    RichTextItem::User { user_id: "U1".to_owned() },
                    RichTextItem::Text { text: " deploy".to_owned() },
                ],
            )
            .build();

        let value = serde_json::to_value(&template.blocks[0]).expect("serialize");
        assert_eq!(value["type"], "rich_text");
        assert_eq!(value["elements"][0]["type"], "rich_text_quote");
        assert_eq!(value["elements"][0]["elements"][0]["user_id"], "U1");
    }

    #[test]
    fn error_attachment_uses_error_color_and_mrkdwn() {
        let attachment = error_attachment("boom", "#ff0000");
        assert_eq!(attachment.color, "#ff0000");
        assert_eq!(attachment.blocks.len(), 1);
        let value = serde_json::to_value(&attachment.blocks[0]).expect("serialize");
        assert_eq!(value["text"], serde_json::to_value(TextObject::mrkdwn("boom")).expect("text"));
    }
}
