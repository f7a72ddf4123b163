//! Data model shared by the parser and the processor.

pub mod command;
pub mod descriptor;
pub mod request;

pub use command::{BoundArgument, BoundCommand, BoundOption, HierarchyNode, ParsedCommand};
pub use descriptor::{
    ArgumentDescriptor, CommandDescriptor, CommandFlags, CommandType, DEFAULT_ROOT_ID, DataType,
    OptionDescriptor,
};
pub use request::{ParsedOption, ParsedRequest, Request};
