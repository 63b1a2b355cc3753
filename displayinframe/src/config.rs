use wiki::{SharedIdGenerator, Syntax};

use crate::guard::Execution;

/// How a [`DocumentRenderer`](crate::services::DocumentRenderer) should
/// render a document.
///
/// Turning content transformation on or off also turns both context
/// isolation flags on or off; they cannot be set separately.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    execution: Execution,
    content_transformed: bool,
    execution_context_isolated: bool,
    transformation_context_isolated: bool,
    section_id: Option<String>,
    target_syntax: Syntax,
    content_translated: bool,
    id_generator: Option<SharedIdGenerator>,
}

impl RenderConfig {
    pub fn new(execution: Execution) -> Self {
        RenderConfig {
            execution,
            content_transformed: false,
            execution_context_isolated: false,
            transformation_context_isolated: false,
            section_id: None,
            target_syntax: Syntax::Html,
            content_translated: false,
            id_generator: None,
        }
    }

    pub fn with_content_transformed(mut self, transformed: bool) -> Self {
        self.content_transformed = transformed;
        self.execution_context_isolated = transformed;
        self.transformation_context_isolated = transformed;
        self
    }

    pub fn with_section(mut self, section_id: Option<String>) -> Self {
        self.section_id = section_id;
        self
    }

    pub fn with_target_syntax(mut self, syntax: Syntax) -> Self {
        self.target_syntax = syntax;
        self
    }

    pub fn with_content_translated(mut self, translated: bool) -> Self {
        self.content_translated = translated;
        self
    }

    pub fn with_id_generator(mut self, ids: Option<SharedIdGenerator>) -> Self {
        self.id_generator = ids;
        self
    }

    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    pub fn is_content_transformed(&self) -> bool {
        self.content_transformed
    }

    pub fn is_execution_context_isolated(&self) -> bool {
        self.execution_context_isolated
    }

    pub fn is_transformation_context_isolated(&self) -> bool {
        self.transformation_context_isolated
    }

    pub fn section_id(&self) -> Option<&str> {
        self.section_id.as_deref()
    }

    pub fn target_syntax(&self) -> Syntax {
        self.target_syntax
    }

    pub fn is_content_translated(&self) -> bool {
        self.content_translated
    }

    pub fn id_generator(&self) -> Option<&SharedIdGenerator> {
        self.id_generator.as_ref()
    }
}
