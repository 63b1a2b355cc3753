use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Generates document-unique heading ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
    used: HashSet<String>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `H` followed by the alphanumeric characters of `text`; a `-N` suffix
    /// is appended when the id was already handed out.
    pub fn generate(&mut self, text: &str) -> String {
        let base: String = std::iter::once('H')
            .chain(text.chars().filter(|c| c.is_alphanumeric()))
            .collect();

        let mut id = base.clone();
        let mut counter = 0usize;
        while self.used.contains(&id) {
            counter += 1;
            id = format!("{}-{}", base, counter);
        }
        self.used.insert(id.clone());
        id
    }
}

/// Clonable handle to an [`IdGenerator`], shared between a page and the
/// documents rendered into it.
#[derive(Debug, Clone, Default)]
pub struct SharedIdGenerator(Rc<RefCell<IdGenerator>>);

impl SharedIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self, text: &str) -> String {
        self.0.borrow_mut().generate(text)
    }

    /// True if both handles point at the same generator.
    pub fn same_as(&self, other: &SharedIdGenerator) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
