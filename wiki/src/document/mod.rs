use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::block::{Block, plain_text};
use crate::block::id::SharedIdGenerator;
use crate::block::metadata::MetaData;
use crate::reference::DocumentReference;

/// Input and output syntaxes known to the wiki.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    #[default]
    Markdown,
    Html,
    Plain,
}

impl Syntax {
    pub fn id(&self) -> &'static str {
        match self {
            Syntax::Markdown => "markdown/1.0",
            Syntax::Html => "xhtml/1.0",
            Syntax::Plain => "plain/1.0",
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Syntax {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "markdown/1.0" => Ok(Syntax::Markdown),
            "html" | "xhtml" | "xhtml/1.0" => Ok(Syntax::Html),
            "plain" | "plain/1.0" => Ok(Syntax::Plain),
            other => Err(format!("unknown syntax '{}'", other)),
        }
    }
}

/// A stored wiki document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentModel {
    pub reference: DocumentReference,
    pub title: Option<String>,
    pub syntax: Syntax,
    /// Source in the default language.
    pub content: String,
    /// Translated sources keyed by locale.
    pub translations: BTreeMap<String, String>,
}

impl DocumentModel {
    pub fn new(reference: DocumentReference, content: impl Into<String>) -> Self {
        DocumentModel {
            reference,
            title: None,
            syntax: Syntax::Markdown,
            content: content.into(),
            translations: BTreeMap::new(),
        }
    }

    pub fn with_translation(mut self, locale: impl Into<String>, content: impl Into<String>) -> Self {
        self.translations.insert(locale.into(), content.into());
        self
    }

    /// Source for `locale`, falling back to the default language.
    pub fn content_for(&self, locale: Option<&str>) -> &str {
        locale
            .and_then(|l| self.translations.get(l))
            .map(|s| s.as_str())
            .unwrap_or(&self.content)
    }
}

/// Root of a parsed or rendered content tree.
#[derive(Debug, Clone)]
pub struct Xdom {
    pub children: Vec<Block>,
    pub metadata: MetaData,
    id_generator: SharedIdGenerator,
}

impl Xdom {
    pub fn new(children: Vec<Block>, id_generator: SharedIdGenerator) -> Self {
        Xdom {
            children,
            metadata: MetaData::new(),
            id_generator,
        }
    }

    pub fn id_generator(&self) -> &SharedIdGenerator {
        &self.id_generator
    }

    /// Switch to `ids` and renumber every heading with it, so the tree can be
    /// spliced into the page owning `ids` without id clashes.
    pub fn adopt_id_generator(&mut self, ids: SharedIdGenerator) {
        renumber_headings(&mut self.children, &ids);
        self.id_generator = ids;
    }
}

fn renumber_headings(blocks: &mut [Block], ids: &SharedIdGenerator) {
    for block in blocks {
        if let Block::Heading { id, content, .. } = block {
            *id = ids.generate(&plain_text(content));
        } else if let Some(children) = block.children_mut() {
            renumber_headings(children, ids);
        }
    }
}

/// Trees compare by content; the id generator is bookkeeping.
impl PartialEq for Xdom {
    fn eq(&self, other: &Self) -> bool {
        self.children == other.children && self.metadata == other.metadata
    }
}
