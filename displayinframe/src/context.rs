use wiki::reference::DocumentReference;
use wiki::{SharedIdGenerator, Syntax};

use crate::guard::Execution;

/// What a macro sees of the page it is executed in.
#[derive(Debug, Clone)]
pub struct MacroContext {
    execution: Execution,
    target_syntax: Syntax,
    /// Id generator of the tree holding the macro call.
    id_generator: Option<SharedIdGenerator>,
    /// Base location set by an enclosing metadata block.
    base: Option<DocumentReference>,
}

impl MacroContext {
    pub fn new(execution: Execution) -> Self {
        MacroContext {
            execution,
            target_syntax: Syntax::Html,
            id_generator: None,
            base: None,
        }
    }

    pub fn with_target_syntax(mut self, syntax: Syntax) -> Self {
        self.target_syntax = syntax;
        self
    }

    pub fn with_id_generator(mut self, ids: SharedIdGenerator) -> Self {
        self.id_generator = Some(ids);
        self
    }

    pub fn with_base(mut self, base: DocumentReference) -> Self {
        self.base = Some(base);
        self
    }

    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    pub fn target_syntax(&self) -> Syntax {
        self.target_syntax
    }

    pub fn id_generator(&self) -> Option<&SharedIdGenerator> {
        self.id_generator.as_ref()
    }

    /// Location relative references are resolved against: the enclosing
    /// base if any, else the current document.
    pub fn location(&self) -> Option<&DocumentReference> {
        self.base.as_ref().or(self.execution.document())
    }
}
