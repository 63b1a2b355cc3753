use wiki::{Block, Parameters};

use crate::context::MacroContext;
use crate::error::MacroExecutionError;

pub const CATEGORY_CONTENT: &str = "Content";

/// Registration data of a macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Lower runs earlier in a transformation.
    pub priority: u32,
    pub default_categories: Vec<String>,
    pub supports_inline: bool,
}

/// A macro that can be executed by a [`MacroTransformation`](crate::MacroTransformation).
pub trait Macro: Send + Sync {
    fn descriptor(&self) -> &MacroDescriptor;

    fn execute(
        &self,
        parameters: &Parameters,
        content: Option<&str>,
        context: &MacroContext,
    ) -> Result<Vec<Block>, MacroExecutionError>;
}
