//! Tool implementations
//!
//! Each tool implements the `Tool` trait from `crate::tool`.

mod bash;
mod code_search;
mod edit_file;
mod list_files;
mod read_file;

pub use bash::BashTool;
pub use code_search::CodeSearchTool;
pub use edit_file::EditFileTool;
pub use list_files::ListFilesTool;
pub use read_file::ReadFileTool;

use crate::tool::{DuplicateToolError, ToolRegistry};
use std::path::PathBuf;

/// Create a registry with all standard tools
pub fn create_registry(working_dir: PathBuf) -> Result<ToolRegistry, DuplicateToolError> {
    let mut registry = ToolRegistry::new();

    registry.register(ReadFileTool::new(working_dir.clone()))?;
    registry.register(ListFilesTool::new(working_dir.clone()))?;
    registry.register(BashTool::new())?;
    registry.register(EditFileTool::new(working_dir.clone()))?;
    registry.register(CodeSearchTool::new(working_dir))?;

    Ok(registry)
}
