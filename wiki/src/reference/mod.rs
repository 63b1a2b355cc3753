pub mod resolver;
pub mod serializer;

use std::fmt;
use std::str::FromStr;

pub use resolver::{DefaultResolver, ResolveError};
pub use serializer::DefaultSerializer;

/// Name of the home document of a space or nested page.
pub const HOME_DOCUMENT: &str = "WebHome";

/// Default space used when a reference names a page without any space.
pub const DEFAULT_SPACE: &str = "Main";

/// How a raw reference string should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityType {
    /// `[wiki:][Space.]*Page`
    #[default]
    Document,
    /// `[wiki:]A/B/C`, the home document of a nested page.
    Page,
    /// `[wiki:]A.B`, the home document of a space.
    Space,
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(EntityType::Document),
            "page" => Ok(EntityType::Page),
            "space" => Ok(EntityType::Space),
            other => Err(format!(
                "unknown reference type '{}' (expected document, page or space)",
                other
            )),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Document => write!(f, "document"),
            EntityType::Page => write!(f, "page"),
            EntityType::Space => write!(f, "space"),
        }
    }
}

/// A fully qualified reference to a wiki document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentReference {
    pub wiki: String,
    /// Enclosing spaces, outermost first. Never empty.
    pub spaces: Vec<String>,
    pub name: String,
}

impl DocumentReference {
    pub fn new(wiki: impl Into<String>, spaces: Vec<String>, name: impl Into<String>) -> Self {
        DocumentReference {
            wiki: wiki.into(),
            spaces,
            name: name.into(),
        }
    }

    pub fn is_home(&self) -> bool {
        self.name == HOME_DOCUMENT
    }

    /// The spaces holding the sibling pages of this document.
    pub fn parent_spaces(&self) -> &[String] {
        if self.is_home() && self.spaces.len() > 1 {
            &self.spaces[..self.spaces.len() - 1]
        } else {
            &self.spaces
        }
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&DefaultSerializer.serialize(self))
    }
}

/// Parses an absolute `wiki:Space.Page` reference.
impl FromStr for DocumentReference {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (wiki, segments) = resolver::split_document(s)?;
        match wiki {
            Some(wiki) if segments.len() >= 2 => {
                let mut spaces = segments;
                let name = spaces.pop().unwrap_or_default();
                Ok(DocumentReference::new(wiki, spaces, name))
            }
            _ => Err(ResolveError::NotAbsolute(s.to_string())),
        }
    }
}

/// The user on whose behalf a page is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserReference(pub String);

impl UserReference {
    pub fn new(name: impl Into<String>) -> Self {
        UserReference(name.into())
    }

    pub fn guest() -> Self {
        UserReference("XWiki.XWikiGuest".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_reference_round_trips_through_display() {
        let reference: DocumentReference = "xwiki:Sandbox.Sub.Page".parse().unwrap();
        assert_eq!(reference.wiki, "xwiki");
        assert_eq!(reference.spaces, vec!["Sandbox", "Sub"]);
        assert_eq!(reference.name, "Page");
        assert_eq!(reference.to_string(), "xwiki:Sandbox.Sub.Page");
    }

    #[test]
    fn relative_reference_is_not_absolute() {
        assert!("Sandbox.Page".parse::<DocumentReference>().is_err());
        assert!("xwiki:Page".parse::<DocumentReference>().is_err());
    }

    #[test]
    fn entity_type_from_str() {
        assert_eq!("Space".parse::<EntityType>(), Ok(EntityType::Space));
        assert_eq!("document".parse::<EntityType>(), Ok(EntityType::Document));
        assert!("attachment".parse::<EntityType>().is_err());
    }

    #[test]
    fn parent_spaces_of_nested_page_home() {
        let home: DocumentReference = "xwiki:A.B.WebHome".parse().unwrap();
        assert_eq!(home.parent_spaces(), &["A".to_string()]);
        let terminal: DocumentReference = "xwiki:A.B".parse().unwrap();
        assert_eq!(terminal.parent_spaces(), &["A".to_string()]);
    }
}
