pub mod error;
mod macro_call;
mod structural;

pub use error::ParseError;

use crate::block::Block;
use crate::block::id::SharedIdGenerator;
use crate::document::Xdom;

use macro_call::Segment;

/// Page parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the page source into a sectioned block tree. Heading ids are
    /// unique within the page.
    pub fn parse(&self) -> Result<Xdom, Vec<ParseError>> {
        let ids = SharedIdGenerator::new();
        let segments = macro_call::split_segments(&self.source, self.file_id)?;

        let mut flat = Vec::new();
        for segment in segments {
            match segment {
                Segment::Markdown(range) => {
                    flat.extend(structural::parse_blocks(&self.source[range], &ids));
                }
                Segment::Macro(marker) => flat.push(Block::Macro(marker)),
            }
        }

        Ok(Xdom::new(structural::build_sections(flat), ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Inline;

    fn parse(source: &str) -> Xdom {
        Parser::new(source.to_string(), 0).parse().expect("parse failed")
    }

    #[test]
    fn headings_open_nested_sections() {
        let xdom = parse("# One\nfirst\n## Two\nsecond\n# Three\nthird");
        assert_eq!(xdom.children.len(), 2);

        let one = xdom.children[0].children();
        assert!(matches!(&one[0], Block::Heading { level: 1, id, .. } if id == "HOne"));
        assert_eq!(one[1], Block::Paragraph(vec![Inline::Text("first".into())]));
        assert!(one[2].is_section());
        assert!(matches!(&one[2].children()[0], Block::Heading { level: 2, .. }));

        let three = xdom.children[1].children();
        assert!(matches!(&three[0], Block::Heading { id, .. } if id == "HThree"));
    }

    #[test]
    fn content_before_first_heading_stays_at_top_level() {
        let xdom = parse("intro\n\n# Title\nbody");
        assert!(matches!(xdom.children[0], Block::Paragraph(_)));
        assert!(xdom.children[1].is_section());
    }

    #[test]
    fn macro_lines_become_markers_inside_sections() {
        let xdom = parse("# Title\n{{displayinframe reference=\"Space.Page\"/}}\nafter");
        let section = xdom.children[0].children();
        match &section[1] {
            Block::Macro(marker) => {
                assert_eq!(marker.id, "displayinframe");
                assert_eq!(marker.parameters["reference"], "Space.Page");
                assert_eq!(marker.content, None);
            }
            other => panic!("expected macro marker, got {:?}", other),
        }
        assert!(matches!(section[2], Block::Paragraph(_)));
    }

    #[test]
    fn lists_and_quotes_keep_their_structure() {
        let xdom = parse("- a\n- b\n\n> quoted\n\n1. one\n");
        match &xdom.children[0] {
            Block::List { start: None, items } => {
                assert_eq!(items.len(), 2);
                assert_eq!(
                    items[0],
                    Block::ListItem(vec![Block::Paragraph(vec![Inline::Text("a".into())])])
                );
            }
            other => panic!("expected list, got {:?}", other),
        }
        assert!(matches!(&xdom.children[1], Block::Quotation(c) if c.len() == 1));
        assert!(matches!(&xdom.children[2], Block::List { start: Some(1), .. }));
    }

    #[test]
    fn reports_all_macro_errors() {
        let errors = Parser::new("{{broken reference=}}\n\n{{open}}\nno end".to_string(), 3)
            .parse()
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.file_id == 3));
    }
}
