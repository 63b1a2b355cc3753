use std::fmt::Write;

use crate::block::{Block, Inline};

/// Render blocks as an XHTML fragment.
pub fn to_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        write_block(&mut out, block);
    }
    out
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        // Containers without markup of their own.
        Block::Section(children) | Block::MetaData { children, .. } => {
            for child in children {
                write_block(out, child);
            }
        }
        Block::Heading { level, id, content } => {
            let _ = write!(out, "<h{} id=\"{}\">", level, escape(id));
            write_inlines(out, content);
            let _ = write!(out, "</h{}>", level);
        }
        Block::Paragraph(inlines) => {
            out.push_str("<p>");
            write_inlines(out, inlines);
            out.push_str("</p>");
        }
        Block::CodeBlock { language, content } => {
            match language {
                Some(lang) => {
                    let _ = write!(out, "<pre><code class=\"language-{}\">", escape(lang));
                }
                None => out.push_str("<pre><code>"),
            }
            out.push_str(&escape(content));
            out.push_str("</code></pre>");
        }
        Block::Quotation(children) => {
            out.push_str("<blockquote>");
            for child in children {
                write_block(out, child);
            }
            out.push_str("</blockquote>");
        }
        Block::List { start, items } => {
            let tag = match start {
                Some(1) => {
                    out.push_str("<ol>");
                    "ol"
                }
                Some(n) => {
                    let _ = write!(out, "<ol start=\"{}\">", n);
                    "ol"
                }
                None => {
                    out.push_str("<ul>");
                    "ul"
                }
            };
            for item in items {
                write_block(out, item);
            }
            let _ = write!(out, "</{}>", tag);
        }
        Block::ListItem(children) => {
            out.push_str("<li>");
            for child in children {
                write_block(out, child);
            }
            out.push_str("</li>");
        }
        Block::HorizontalLine => out.push_str("<hr/>"),
        Block::Group {
            parameters,
            children,
        } => {
            out.push_str("<div");
            for (name, value) in parameters {
                let _ = write!(out, " {}=\"{}\"", escape(name), escape(value));
            }
            out.push('>');
            for child in children {
                write_block(out, child);
            }
            out.push_str("</div>");
        }
        Block::Macro(_) => {}
        Block::Error {
            message,
            description,
        } => {
            let _ = write!(out, "<div class=\"box errormessage\">{}", escape(message));
            if !description.is_empty() {
                let _ = write!(out, "<pre>{}</pre>", escape(description));
            }
            out.push_str("</div>");
        }
    }
}

fn write_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        write_inline(out, inline);
    }
}

fn write_inline(out: &mut String, inline: &Inline) {
    match inline {
        Inline::Text(s) => out.push_str(&escape(s)),
        Inline::Code(s) => {
            let _ = write!(out, "<code>{}</code>", escape(s));
        }
        Inline::Strong(children) => wrap(out, "strong", children),
        Inline::Emphasis(children) => wrap(out, "em", children),
        Inline::Strikethrough(children) => wrap(out, "del", children),
        Inline::Link {
            dest,
            title,
            content,
        } => {
            let _ = write!(out, "<a href=\"{}\"", escape(dest));
            if !title.is_empty() {
                let _ = write!(out, " title=\"{}\"", escape(title));
            }
            out.push('>');
            write_inlines(out, content);
            out.push_str("</a>");
        }
        Inline::Image { dest, title, alt } => {
            let alt: String = alt.iter().map(|i| i.to_string()).collect();
            let _ = write!(out, "<img src=\"{}\" alt=\"{}\"", escape(dest), escape(&alt));
            if !title.is_empty() {
                let _ = write!(out, " title=\"{}\"", escape(title));
            }
            out.push_str("/>");
        }
        Inline::SoftBreak => out.push(' '),
        Inline::HardBreak => out.push_str("<br/>"),
    }
}

fn wrap(out: &mut String, tag: &str, children: &[Inline]) {
    let _ = write!(out, "<{}>", tag);
    write_inlines(out, children);
    let _ = write!(out, "</{}>", tag);
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
