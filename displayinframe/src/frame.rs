use wiki::{Block, MetaData, Parameters, Xdom};

/// CSS class of the frame container.
pub const FRAME_CLASS: &str = "DisplayInFrame";

/// How the link back to a displayed document is derived from its serialized
/// reference: `wiki:Space.Page` becomes `<view_path>Space/Page`.
///
/// This is a convenience link for readers, not a routing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStyle {
    wiki_prefix: String,
    view_path: String,
}

impl LinkStyle {
    pub fn new(wiki_prefix: impl Into<String>, view_path: impl Into<String>) -> Self {
        LinkStyle {
            wiki_prefix: wiki_prefix.into(),
            view_path: view_path.into(),
        }
    }

    /// Links for documents of `main_wiki` under `/bin/view/`.
    pub fn for_wiki(main_wiki: &str) -> Self {
        LinkStyle::new(format!("{}:", main_wiki), "/bin/view/")
    }

    pub fn with_view_path(mut self, view_path: impl Into<String>) -> Self {
        self.view_path = view_path.into();
        self
    }

    pub fn link_href(&self, source: &str) -> String {
        match source.strip_prefix(&self.wiki_prefix) {
            Some(rest) => format!("{}{}", self.view_path, rest.replace('.', "/")),
            None => source.replace('.', "/"),
        }
    }
}

impl Default for LinkStyle {
    fn default() -> Self {
        LinkStyle::for_wiki("xwiki")
    }
}

/// If the tree starts with a section whose first child is a heading, drop
/// that heading and unwrap the section in place. Returns whether anything
/// changed. Nested sections and later headings are left alone.
pub fn exclude_first_heading(xdom: &mut Xdom) -> bool {
    let starts_with_heading = matches!(
        xdom.children.first(),
        Some(Block::Section(children)) if children.first().is_some_and(Block::is_heading)
    );
    if !starts_with_heading {
        return false;
    }

    let Block::Section(mut children) = xdom.children.remove(0) else {
        return false;
    };
    children.remove(0);
    xdom.children.splice(0..0, children);
    true
}

/// Wrap rendered content in the frame container and tag it with its origin.
pub fn wrap_in_frame(xdom: Xdom, source: &str, href: &str) -> Block {
    let content = Block::metadata(xdom.metadata, xdom.children);

    let mut parameters = Parameters::new();
    parameters.insert("class".to_string(), FRAME_CLASS.to_string());
    parameters.insert("source".to_string(), source.to_string());
    parameters.insert("href".to_string(), href.to_string());
    let frame = Block::group(parameters, vec![content]);

    Block::metadata(
        MetaData::new()
            .with(MetaData::SOURCE, source)
            .with(MetaData::BASE, source),
        vec![frame],
    )
}
