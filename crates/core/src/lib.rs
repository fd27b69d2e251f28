pub mod command;
pub mod config;
pub mod errors;

pub use command::{
    Actor, Attachment, AttachmentKind, Bot, Command, CommandGroup, CommandOutput, CommandSummary,
    ExecuteParams, Field, FieldType, Processor, Processors, Response,
};
pub use errors::ExecutionError;
