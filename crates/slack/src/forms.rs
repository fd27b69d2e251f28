//! Interactive forms for commands whose parameters could not be parsed.
//!
//! Nothing is stored server side. The original message timestamp and text
//! travel in the value of both form buttons as a [`ResumeToken`], so any
//! replica can resume the command when the form is answered.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chatops_core::{ExecuteParams, Field, FieldType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blocks::{
    Block, ButtonElement, ButtonStyle, InputElement, MessageBuilder, OptionObject, TextObject,
};

pub const SUBMIT_ACTION: &str = "submit";
pub const CANCEL_ACTION: &str = "cancel";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResumeToken {
    pub timestamp: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum TokenDecodeError {
    #[error("resume token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("resume token payload is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

impl ResumeToken {
    pub fn new(timestamp: impl Into<String>, text: impl Into<String>) -> Self {
        Self { timestamp: timestamp.into(), text: text.into() }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }

    pub fn decode(value: &str) -> Result<Self, TokenDecodeError> {
        let bytes = STANDARD.decode(value)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// A form is needed when fewer parameters were resolved than fields declared.
pub fn form_required(fields: usize, resolved: usize) -> bool {
    fields > resolved
}

pub fn interaction_id(command: &str, group: Option<&str>) -> String {
    match group.filter(|group| !group.is_empty()) {
        Some(group) => format!("{command}-{group}"),
        None => command.to_owned(),
    }
}

pub fn action_id(interaction_id: &str, field: &str) -> String {
    format!("{interaction_id}-{field}")
}

/// Builds one input block per field plus the submit/cancel actions.
/// `today` is the initial date for date pickers, formatted `YYYY-MM-DD`.
pub fn build_form(
    interaction_id: &str,
    fields: &[Field],
    params: &ExecuteParams,
    token: &str,
    today: &str,
) -> Vec<Block> {
    let mut builder = MessageBuilder::new("Please fill in the command parameters");

    for field in fields {
        let default = params
            .get(&field.name)
            .filter(|value| !value.is_empty())
            .cloned()
            .or_else(|| field.default.clone())
            .unwrap_or_default();
        let action_id = action_id(interaction_id, &field.name);
        let element = input_element(field, action_id, default, today);
        builder = builder.input("", field.label.clone(), element);
    }

    builder
        .actions(interaction_id, |actions| {
            actions
                .button(
                    ButtonElement::new(SUBMIT_ACTION, "Submit")
                        .style(ButtonStyle::Primary)
                        .value(token),
                )
                .button(ButtonElement::new(CANCEL_ACTION, "Cancel").value(token));
        })
        .build()
        .blocks
}

fn input_element(field: &Field, action_id: String, default: String, today: &str) -> InputElement {
    let hint = field.hint.as_deref().filter(|hint| !hint.is_empty()).map(TextObject::plain);
    let initial = (!default.is_empty()).then(|| default.clone());
    let options = || -> Vec<OptionObject> {
        field.values.iter().map(|value| OptionObject::new(value.clone(), hint.clone())).collect()
    };

    match field.field_type {
        FieldType::Edit => InputElement::PlainTextInput {
            action_id,
            multiline: false,
            initial_value: initial,
            placeholder: hint.clone(),
        },
        FieldType::MultiEdit => InputElement::PlainTextInput {
            action_id,
            multiline: true,
            initial_value: initial,
            placeholder: hint.clone(),
        },
        FieldType::Url => {
            InputElement::UrlTextInput {
                action_id,
                initial_value: initial,
                placeholder: hint.clone(),
            }
        }
        FieldType::Date => {
            InputElement::Datepicker { action_id, initial_date: Some(today.to_owned()) }
        }
        FieldType::Select => {
            let options = options();
            let initial_option = options.iter().find(|option| option.value == default).cloned();
            InputElement::StaticSelect {
                action_id,
                placeholder: hint.clone(),
                options,
                initial_option,
            }
        }
        FieldType::MultiSelect => {
            let selected: Vec<&str> =
                default.split(',').map(str::trim).filter(|value| !value.is_empty()).collect();
            let options = options();
            let initial_options = options
                .iter()
                .filter(|option| selected.contains(&option.value.as_str()))
                .cloned()
                .collect();
            InputElement::MultiStaticSelect {
                action_id,
                placeholder: hint.clone(),
                options,
                initial_options,
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SelectedOption {
    pub value: String,
}

/// One control value from the `state.values` of a block action callback.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionValue {
    PlainTextInput {
        #[serde(default)]
        value: Option<String>,
    },
    UrlTextInput {
        #[serde(default)]
        value: Option<String>,
    },
    Datepicker {
        #[serde(default)]
        selected_date: Option<String>,
    },
    StaticSelect {
        #[serde(default)]
        selected_option: Option<SelectedOption>,
    },
    MultiStaticSelect {
        #[serde(default)]
        selected_options: Vec<SelectedOption>,
    },
    #[serde(other)]
    Unknown,
}

impl ActionValue {
    pub fn into_value(self) -> String {
        match self {
            Self::PlainTextInput { value } | Self::UrlTextInput { value } => {
                value.unwrap_or_default()
            }
            Self::Datepicker { selected_date } => selected_date.unwrap_or_default(),
            Self::StaticSelect { selected_option } => {
                selected_option.map(|option| option.value).unwrap_or_default()
            }
            Self::MultiStaticSelect { selected_options } => selected_options
                .into_iter()
                .map(|option| option.value)
                .collect::<Vec<_>>()
                .join(","),
            Self::Unknown => String::new(),
        }
    }
}

pub type FormState = HashMap<String, HashMap<String, ActionValue>>;

/// Recovers field values keyed by field name from a submitted form.
pub fn collect_submitted(interaction_id: &str, state: FormState) -> ExecuteParams {
    let prefix = format!("{interaction_id}-");
    state
        .into_values()
        .flat_map(HashMap::into_iter)
        .map(|(action_id, value)| {
            let name = action_id.strip_prefix(&prefix).map(str::to_owned).unwrap_or(action_id);
            (name, value.into_value())
        })
        .collect()
}
