use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use wiki::reference::{DocumentReference, UserReference};

/// The document is already being displayed further up the current call
/// stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Found recursive display of document [{0}]")]
pub struct RecursionError(pub DocumentReference);

/// Documents currently being displayed within one execution, outermost
/// first. Clones share the same stack.
#[derive(Debug, Clone, Default)]
pub struct InclusionStack {
    frames: Rc<RefCell<Vec<DocumentReference>>>,
}

impl InclusionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `reference` unless it is already on the stack. The returned scope
    /// pops it again when dropped, whatever happens in between.
    pub fn enter(&self, reference: &DocumentReference) -> Result<InclusionScope, RecursionError> {
        let mut frames = self.frames.borrow_mut();
        if frames.contains(reference) {
            return Err(RecursionError(reference.clone()));
        }
        frames.push(reference.clone());
        Ok(InclusionScope {
            stack: self.clone(),
            reference: reference.clone(),
        })
    }

    pub fn contains(&self, reference: &DocumentReference) -> bool {
        self.frames.borrow().contains(reference)
    }

    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }

    pub fn snapshot(&self) -> Vec<DocumentReference> {
        self.frames.borrow().clone()
    }
}

/// Keeps a document on its [`InclusionStack`] for as long as it lives.
#[must_use = "the document leaves the inclusion stack as soon as the scope is dropped"]
#[derive(Debug)]
pub struct InclusionScope {
    stack: InclusionStack,
    reference: DocumentReference,
}

impl InclusionScope {
    pub fn reference(&self) -> &DocumentReference {
        &self.reference
    }
}

impl Drop for InclusionScope {
    fn drop(&mut self) {
        let mut frames = self.stack.frames.borrow_mut();
        // Scopes may be dropped out of order; remove this scope's own entry.
        if let Some(idx) = frames.iter().rposition(|r| *r == self.reference) {
            frames.remove(idx);
        }
        if frames.is_empty() {
            // Release the buffer once the outermost display is done.
            frames.shrink_to_fit();
        }
    }
}

/// State scoped to one top-level render: who renders, in which language,
/// which document is current, and which documents are being displayed.
///
/// Unrelated renders each start from [`Execution::new`] and never share an
/// inclusion stack.
#[derive(Debug, Clone)]
pub struct Execution {
    user: UserReference,
    locale: Option<String>,
    document: Option<DocumentReference>,
    inclusions: InclusionStack,
}

impl Execution {
    pub fn new(user: UserReference) -> Self {
        Execution {
            user,
            locale: None,
            document: None,
            inclusions: InclusionStack::new(),
        }
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_document(mut self, document: DocumentReference) -> Self {
        self.document = Some(document);
        self
    }

    /// A nested execution for rendering `document` on its own: the current
    /// document changes, the inclusion stack is shared.
    pub fn isolated(&self, document: DocumentReference) -> Execution {
        Execution {
            user: self.user.clone(),
            locale: self.locale.clone(),
            document: Some(document),
            inclusions: self.inclusions.clone(),
        }
    }

    pub fn user(&self) -> &UserReference {
        &self.user
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn document(&self) -> Option<&DocumentReference> {
        self.document.as_ref()
    }

    pub fn inclusions(&self) -> &InclusionStack {
        &self.inclusions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(s: &str) -> DocumentReference {
        s.parse().unwrap()
    }

    #[test]
    fn nested_entry_of_same_document_fails() {
        let stack = InclusionStack::new();
        let a = reference("xwiki:Main.A");
        let _outer = stack.enter(&a).unwrap();
        assert_eq!(stack.enter(&a).unwrap_err(), RecursionError(a.clone()));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn sibling_entries_succeed() {
        let stack = InclusionStack::new();
        let a = reference("xwiki:Main.A");
        {
            let _first = stack.enter(&a).unwrap();
        }
        let second = stack.enter(&a).unwrap();
        assert_eq!(second.reference(), &a);
    }

    #[test]
    fn scope_is_released_on_error_paths() {
        fn failing(stack: &InclusionStack, r: &DocumentReference) -> Result<(), String> {
            let _scope = stack.enter(r).map_err(|e| e.to_string())?;
            Err("render failed".to_string())
        }

        let stack = InclusionStack::new();
        let a = reference("xwiki:Main.A");
        assert!(failing(&stack, &a).is_err());
        assert!(stack.is_empty());
        assert!(!stack.contains(&a));
    }

    #[test]
    fn out_of_order_release_removes_the_right_entry() {
        let stack = InclusionStack::new();
        let a = reference("xwiki:Main.A");
        let b = reference("xwiki:Main.B");
        let outer = stack.enter(&a).unwrap();
        let inner = stack.enter(&b).unwrap();

        drop(outer);
        assert_eq!(stack.snapshot(), vec![b.clone()]);
        assert!(stack.enter(&a).is_ok());

        drop(inner);
        assert!(stack.is_empty());
    }

    #[test]
    fn isolated_execution_shares_the_stack() {
        let execution = Execution::new(UserReference::guest()).with_document(reference("xwiki:Main.Page"));
        let nested = execution.isolated(reference("xwiki:Main.Other"));
        let _scope = nested.inclusions().enter(&reference("xwiki:Main.Other")).unwrap();

        assert_eq!(execution.inclusions().depth(), 1);
        assert_eq!(nested.document(), Some(&reference("xwiki:Main.Other")));
        assert_eq!(execution.document(), Some(&reference("xwiki:Main.Page")));
    }

    #[test]
    fn separate_executions_do_not_interfere() {
        let first = Execution::new(UserReference::guest());
        let second = Execution::new(UserReference::guest());
        let a = reference("xwiki:Main.A");
        let _scope = first.inclusions().enter(&a).unwrap();
        assert!(second.inclusions().enter(&a).is_ok());
    }
}
