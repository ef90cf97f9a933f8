pub mod catalog;
pub mod error;
pub mod execution;
pub mod invocation;
pub mod space;

pub use catalog::{FieldDefault, FieldKind, MAX_PRIMARY_TOOLS, ToolField, ToolSpec};
pub use error::ToolError;
pub use execution::{FALLBACK_TOOL_NAME, ToolExecution, ToolOutput, ToolStatus};
pub use invocation::{FormData, ToolInvocation};
pub use space::SpaceKind;
