//! Slack front end for the chatops bot.
//!
//! - **Parsing** (`commands`) - command token and free text from slash commands, mentions and DMs
//! - **Registry** (`registry`) - grouped commands plus the designated default and help commands
//! - **Permissions** (`permissions`) - ordered `group=command` regex rules over Slack user groups
//! - **Forms** (`forms`) - stateless interactive forms resumed from the button value
//! - **Reactions** (`reactions`) - doing/done/failed/dialog markers on the triggering message
//! - **Orchestration** (`bot`) - ties the above together per event
//! - **Transport** (`events`, `socket`) - Socket Mode loop and event dispatch
//! - **Block Kit** (`blocks`) - message and form builders
//!
//! # Architecture
//!
//! ```text
//! Socket Mode → EventDispatcher → SlackBot → Command::execute
//!                                     ↓
//!                 SlackApi ← replies, forms, reactions
//! ```

pub mod api;
pub mod blocks;
pub mod bot;
pub mod commands;
pub mod events;
pub mod forms;
pub mod metrics;
pub mod permissions;
pub mod reactions;
pub mod registry;
pub mod socket;

#[cfg(test)]
mod testing;

pub use api::{NoopSlackApi, SlackApi};
pub use bot::{DispatchOutcome, SlackBot};
pub use events::{bot_dispatcher, EventDispatcher};
pub use metrics::UsageMeter;
pub use registry::{CommandRegistry, RegistryError};
pub use socket::{NoopSocketTransport, ReconnectPolicy, RunSummary, SocketModeRunner};
