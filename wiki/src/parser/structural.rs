use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser as CmarkParser, Tag, TagEnd};

use crate::block::id::SharedIdGenerator;
use crate::block::{Block, Inline, plain_text};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a run of Markdown into a flat list of blocks. Headings are not yet
/// grouped into sections; see [`build_sections`].
pub(crate) fn parse_blocks(source: &str, ids: &SharedIdGenerator) -> Vec<Block> {
    let options = Options::ENABLE_STRIKETHROUGH;
    let events: Vec<Event<'_>> = CmarkParser::new_ext(source, options).collect();

    let collector = BlockCollector { ids };
    let mut i = 0;
    collector.collect_blocks(&events, &mut i, &|_| false)
}

/// Group a flat block list into nested sections. A heading of level N opens
/// a section holding every following block up to the next heading of level
/// N or shallower.
pub(crate) fn build_sections(blocks: Vec<Block>) -> Vec<Block> {
    let mut top_blocks = Vec::new();
    // Open sections as (heading level, children).
    let mut open: Vec<(u8, Vec<Block>)> = Vec::new();

    for block in blocks {
        if let Block::Heading { level, .. } = &block {
            let level = *level;
            close_sections_to_level(&mut open, &mut top_blocks, level);
            open.push((level, vec![block]));
        } else if let Some((_, children)) = open.last_mut() {
            children.push(block);
        } else {
            top_blocks.push(block);
        }
    }

    close_sections_to_level(&mut open, &mut top_blocks, 0);
    top_blocks
}

/// Close open sections at the same or deeper level than `new_level`.
fn close_sections_to_level(open: &mut Vec<(u8, Vec<Block>)>, top_blocks: &mut Vec<Block>, new_level: u8) {
    while open.last().is_some_and(|(level, _)| *level >= new_level) {
        let Some((_, children)) = open.pop() else {
            break;
        };
        let section = Block::Section(children);
        match open.last_mut() {
            Some((_, parent)) => parent.push(section),
            None => top_blocks.push(section),
        }
    }
}

// ---------------------------------------------------------------------------
// Event walking
// ---------------------------------------------------------------------------

struct BlockCollector<'a> {
    ids: &'a SharedIdGenerator,
}

impl BlockCollector<'_> {
    /// Collect block nodes until a matching End tag.
    fn collect_blocks(
        &self,
        events: &[Event<'_>],
        i: &mut usize,
        is_end: &dyn Fn(&TagEnd) -> bool,
    ) -> Vec<Block> {
        let mut blocks = Vec::new();
        // Inlines outside a paragraph, as in tight list items.
        let mut loose: Vec<Inline> = Vec::new();

        while *i < events.len() {
            match &events[*i] {
                Event::End(tag_end) if is_end(tag_end) => {
                    *i += 1;
                    break;
                }
                Event::Start(Tag::Heading { level, .. }) => {
                    flush_loose(&mut loose, &mut blocks);
                    let level = heading_level_to_u8(level);
                    *i += 1;
                    let content = self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Heading(_)));
                    let id = self.ids.generate(&plain_text(&content));
                    blocks.push(Block::Heading { level, id, content });
                }
                Event::Start(Tag::Paragraph) => {
                    flush_loose(&mut loose, &mut blocks);
                    *i += 1;
                    let inlines = self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Paragraph));
                    blocks.push(Block::Paragraph(inlines));
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    flush_loose(&mut loose, &mut blocks);
                    let language = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    };
                    *i += 1;
                    let content = collect_text_until(events, i, |e| matches!(e, TagEnd::CodeBlock));
                    blocks.push(Block::CodeBlock { language, content });
                }
                Event::Start(Tag::HtmlBlock) => {
                    flush_loose(&mut loose, &mut blocks);
                    *i += 1;
                    let content = collect_text_until(events, i, |e| matches!(e, TagEnd::HtmlBlock));
                    blocks.push(Block::Paragraph(vec![Inline::Text(content.trim_end().to_string())]));
                }
                Event::Start(Tag::BlockQuote(_)) => {
                    flush_loose(&mut loose, &mut blocks);
                    *i += 1;
                    let children = self.collect_blocks(events, i, &|e| matches!(e, TagEnd::BlockQuote(_)));
                    blocks.push(Block::Quotation(children));
                }
                Event::Start(Tag::List(start)) => {
                    flush_loose(&mut loose, &mut blocks);
                    let start = *start;
                    *i += 1;
                    let items = self.collect_blocks(events, i, &|e| matches!(e, TagEnd::List(_)));
                    blocks.push(Block::List { start, items });
                }
                Event::Start(Tag::Item) => {
                    flush_loose(&mut loose, &mut blocks);
                    *i += 1;
                    let children = self.collect_blocks(events, i, &|e| matches!(e, TagEnd::Item));
                    blocks.push(Block::ListItem(children));
                }
                Event::Rule => {
                    flush_loose(&mut loose, &mut blocks);
                    blocks.push(Block::HorizontalLine);
                    *i += 1;
                }
                _ => match self.collect_inline(events, i) {
                    Some(inline) => loose.push(inline),
                    None => *i += 1,
                },
            }
        }

        flush_loose(&mut loose, &mut blocks);
        blocks
    }

    /// Collect inline nodes until a matching End tag.
    fn collect_inlines(
        &self,
        events: &[Event<'_>],
        i: &mut usize,
        is_end: &dyn Fn(&TagEnd) -> bool,
    ) -> Vec<Inline> {
        let mut inlines = Vec::new();

        while *i < events.len() {
            if let Event::End(tag_end) = &events[*i] {
                if is_end(tag_end) {
                    *i += 1;
                    break;
                }
            }
            match self.collect_inline(events, i) {
                Some(inline) => inlines.push(inline),
                None => *i += 1,
            }
        }

        inlines
    }

    /// Collect the inline node starting at `events[*i]`, if there is one.
    fn collect_inline(&self, events: &[Event<'_>], i: &mut usize) -> Option<Inline> {
        let inline = match &events[*i] {
            Event::Text(s) | Event::InlineHtml(s) | Event::Html(s) => {
                *i += 1;
                Inline::Text(s.to_string())
            }
            Event::Code(s) => {
                *i += 1;
                Inline::Code(s.to_string())
            }
            Event::SoftBreak => {
                *i += 1;
                Inline::SoftBreak
            }
            Event::HardBreak => {
                *i += 1;
                Inline::HardBreak
            }
            Event::Start(Tag::Strong) => {
                *i += 1;
                Inline::Strong(self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Strong)))
            }
            Event::Start(Tag::Emphasis) => {
                *i += 1;
                Inline::Emphasis(self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Emphasis)))
            }
            Event::Start(Tag::Strikethrough) => {
                *i += 1;
                Inline::Strikethrough(self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Strikethrough)))
            }
            Event::Start(Tag::Link { dest_url, title, .. }) => {
                let dest = dest_url.to_string();
                let title = title.to_string();
                *i += 1;
                let content = self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Link));
                Inline::Link { dest, title, content }
            }
            Event::Start(Tag::Image { dest_url, title, .. }) => {
                let dest = dest_url.to_string();
                let title = title.to_string();
                *i += 1;
                let alt = self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Image));
                Inline::Image { dest, title, alt }
            }
            _ => return None,
        };
        Some(inline)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn flush_loose(loose: &mut Vec<Inline>, blocks: &mut Vec<Block>) {
    if !loose.is_empty() {
        blocks.push(Block::Paragraph(std::mem::take(loose)));
    }
}

fn heading_level_to_u8(level: &HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Collect all text content until a matching End tag.
fn collect_text_until(events: &[Event<'_>], i: &mut usize, is_end: impl Fn(&TagEnd) -> bool) -> String {
    let mut text = String::new();
    while *i < events.len() {
        match &events[*i] {
            Event::End(tag_end) if is_end(tag_end) => {
                *i += 1;
                break;
            }
            Event::Text(s) | Event::Html(s) => {
                text.push_str(s);
                *i += 1;
            }
            _ => {
                *i += 1;
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(level: u8, id: &str) -> Block {
        Block::Heading {
            level,
            id: id.to_string(),
            content: vec![Inline::Text(id.to_string())],
        }
    }

    #[test]
    fn skipped_levels_still_nest() {
        let sections = build_sections(vec![heading(1, "a"), heading(3, "b"), heading(2, "c")]);
        assert_eq!(
            sections,
            vec![Block::Section(vec![
                heading(1, "a"),
                Block::Section(vec![heading(3, "b")]),
                Block::Section(vec![heading(2, "c")]),
            ])]
        );
    }

    #[test]
    fn inline_markup_is_preserved() {
        let ids = SharedIdGenerator::new();
        let blocks = parse_blocks("some **bold** and [a link](Space.Page)", &ids);
        match &blocks[0] {
            Block::Paragraph(inlines) => {
                assert!(matches!(&inlines[1], Inline::Strong(c) if c == &vec![Inline::Text("bold".into())]));
                assert!(matches!(&inlines[3], Inline::Link { dest, .. } if dest == "Space.Page"));
            }
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn fenced_code_keeps_language() {
        let ids = SharedIdGenerator::new();
        let blocks = parse_blocks("```rust\nfn main() {}\n```\n", &ids);
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                language: Some("rust".into()),
                content: "fn main() {}\n".into()
            }]
        );
    }
}
