use crate::block::{Block, plain_text};

/// Render blocks as plain text, one paragraph per leaf block, separated by
/// blank lines. Containers are transparent.
pub fn to_plain_text(blocks: &[Block]) -> String {
    let mut parts = Vec::new();
    collect(blocks, &mut parts);
    parts.join("\n\n")
}

fn collect(blocks: &[Block], parts: &mut Vec<String>) {
    for block in blocks {
        match block {
            Block::Section(children)
            | Block::ListItem(children)
            | Block::Group { children, .. }
            | Block::MetaData { children, .. } => collect(children, parts),
            Block::Heading { content, .. } | Block::Paragraph(content) => {
                parts.push(plain_text(content));
            }
            Block::CodeBlock { content, .. } => parts.push(content.trim_end().to_string()),
            Block::Quotation(children) => {
                let inner = to_plain_text(children);
                let quoted: Vec<String> = inner.lines().map(|l| format!("> {}", l)).collect();
                parts.push(quoted.join("\n"));
            }
            Block::List { start, items } => {
                let lines: Vec<String> = items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| {
                        let marker = match start {
                            Some(n) => format!("{}.", n + idx as u64),
                            None => "-".to_string(),
                        };
                        let text = to_plain_text(item.children()).replace("\n\n", "\n");
                        format!("{} {}", marker, text)
                    })
                    .collect();
                parts.push(lines.join("\n"));
            }
            Block::HorizontalLine => parts.push("----".to_string()),
            Block::Macro(_) => {}
            Block::Error { message, .. } => parts.push(format!("[error] {}", message)),
        }
    }
}
