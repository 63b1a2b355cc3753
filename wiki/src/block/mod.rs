pub mod id;
pub mod metadata;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::block::metadata::MetaData;

/// Named string parameters of a group or a macro call.
pub type Parameters = BTreeMap<String, String>;

/// A node of the rendered content tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A heading together with the content it governs. The heading is the
    /// first child; deeper headings open nested sections.
    Section(Vec<Block>),
    Heading {
        level: u8,
        id: String,
        content: Vec<Inline>,
    },
    Paragraph(Vec<Inline>),
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    Quotation(Vec<Block>),
    /// `start` is set for ordered lists. Items are `ListItem` blocks.
    List {
        start: Option<u64>,
        items: Vec<Block>,
    },
    ListItem(Vec<Block>),
    HorizontalLine,
    /// Styled container.
    Group {
        parameters: Parameters,
        children: Vec<Block>,
    },
    /// Transparent container carrying provenance metadata.
    MetaData {
        metadata: MetaData,
        children: Vec<Block>,
    },
    /// A macro call that has not been executed yet.
    Macro(MacroMarker),
    /// Placeholder left where a macro failed.
    Error {
        message: String,
        description: String,
    },
}

/// An unexpanded macro call as written in the page source.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroMarker {
    pub id: String,
    /// Parameter names are lowercase.
    pub parameters: Parameters,
    pub content: Option<String>,
    /// Byte span of the call in the page source.
    pub span: Range<usize>,
}

impl Block {
    pub fn group(parameters: Parameters, children: Vec<Block>) -> Self {
        Block::Group {
            parameters,
            children,
        }
    }

    pub fn metadata(metadata: MetaData, children: Vec<Block>) -> Self {
        Block::MetaData { metadata, children }
    }

    pub fn error(message: impl Into<String>, description: impl Into<String>) -> Self {
        Block::Error {
            message: message.into(),
            description: description.into(),
        }
    }

    /// Child blocks of container nodes; empty for leaves.
    pub fn children(&self) -> &[Block] {
        match self {
            Block::Section(children)
            | Block::Quotation(children)
            | Block::ListItem(children)
            | Block::Group { children, .. }
            | Block::MetaData { children, .. } => children,
            Block::List { items, .. } => items,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Block>> {
        match self {
            Block::Section(children)
            | Block::Quotation(children)
            | Block::ListItem(children)
            | Block::Group { children, .. }
            | Block::MetaData { children, .. } => Some(children),
            Block::List { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Block::Heading { .. })
    }

    pub fn is_section(&self) -> bool {
        matches!(self, Block::Section(_))
    }
}

/// Inline content of paragraphs and headings.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Code(String),
    Link {
        dest: String,
        title: String,
        content: Vec<Inline>,
    },
    Image {
        dest: String,
        title: String,
        alt: Vec<Inline>,
    },
    SoftBreak,
    HardBreak,
}

/// Plain text of a run of inlines.
pub fn plain_text(inlines: &[Inline]) -> String {
    inlines.iter().map(|i| i.to_string()).collect()
}

impl fmt::Display for Inline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inline::Text(s) | Inline::Code(s) => write!(f, "{}", s),
            Inline::Strong(children)
            | Inline::Emphasis(children)
            | Inline::Strikethrough(children)
            | Inline::Link {
                content: children, ..
            }
            | Inline::Image { alt: children, .. } => {
                for child in children {
                    write!(f, "{}", child)?;
                }
                Ok(())
            }
            Inline::SoftBreak => write!(f, " "),
            Inline::HardBreak => writeln!(f),
        }
    }
}
