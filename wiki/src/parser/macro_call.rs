use std::ops::Range;

use crate::block::{MacroMarker, Parameters};
use crate::parser::error::ParseError;

/// A run of Markdown source or a macro call standing on its own lines.
#[derive(Debug)]
pub(crate) enum Segment {
    Markdown(Range<usize>),
    Macro(MacroMarker),
}

/// Split page source into Markdown runs and macro calls.
///
/// A macro call starts with `{{` at the beginning of a line (leading
/// whitespace allowed) outside fenced code and must end its line.
pub(crate) fn split_segments(source: &str, file_id: usize) -> Result<Vec<Segment>, Vec<ParseError>> {
    let mut segments = Vec::new();
    let mut errors = Vec::new();
    let mut markdown_start = 0;
    let mut fence: Option<&str> = None;
    let mut pos = 0;

    while pos < source.len() {
        let line_end = source[pos..]
            .find('\n')
            .map(|p| pos + p + 1)
            .unwrap_or(source.len());
        let line = &source[pos..line_end];
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            pos = line_end;
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            pos = line_end;
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            pos = line_end;
            continue;
        }
        if !trimmed.starts_with("{{") {
            pos = line_end;
            continue;
        }

        let call_start = pos + (line.len() - trimmed.len());
        if markdown_start < pos {
            segments.push(Segment::Markdown(markdown_start..pos));
        }

        match parse_call(source, call_start, file_id) {
            Ok((marker, call_end)) => {
                let rest_end = source[call_end..]
                    .find('\n')
                    .map(|p| call_end + p + 1)
                    .unwrap_or(source.len());
                if !source[call_end..rest_end].trim().is_empty() {
                    errors.push(
                        ParseError::new(
                            format!("unexpected text after the [{}] macro", marker.id),
                            call_end..rest_end,
                            file_id,
                        )
                        .with_note("macro calls must stand on their own line"),
                    );
                }
                segments.push(Segment::Macro(marker));
                pos = rest_end;
            }
            Err(err) => {
                errors.push(err);
                pos = line_end;
            }
        }
        markdown_start = pos;
    }

    if markdown_start < source.len() {
        segments.push(Segment::Markdown(markdown_start..source.len()));
    }

    if errors.is_empty() {
        Ok(segments)
    } else {
        Err(errors)
    }
}

/// Parse one macro call at `start` (pointing at `{{`). Returns the marker
/// and the byte offset just past the call.
fn parse_call(source: &str, start: usize, file_id: usize) -> Result<(MacroMarker, usize), ParseError> {
    let mut cursor = Cursor {
        source,
        pos: start + 2,
        start,
        file_id,
    };

    let id = cursor.identifier();
    if id.is_empty() {
        return Err(cursor.error("expected a macro name after '{{'"));
    }

    let mut parameters = Parameters::new();
    let self_closing = loop {
        cursor.skip_whitespace();
        if cursor.eat("/}}") {
            break true;
        }
        if cursor.eat("}}") {
            break false;
        }

        let name = cursor.identifier();
        if name.is_empty() {
            return Err(cursor.error(format!("malformed parameter in the [{}] macro", id)));
        }
        cursor.skip_whitespace();
        if !cursor.eat("=") {
            return Err(cursor.error(format!("expected '=' after parameter '{}'", name)));
        }
        cursor.skip_whitespace();
        let value = cursor.quoted()?;
        if parameters.insert(name.to_ascii_lowercase(), value).is_some() {
            return Err(cursor.error(format!("duplicate parameter '{}'", name)));
        }
    };

    let header_end = cursor.pos;
    let mut marker = MacroMarker {
        id: id.clone(),
        parameters,
        content: None,
        span: start..header_end,
    };

    if self_closing {
        return Ok((marker, header_end));
    }

    let closing = format!("{{{{/{}}}}}", id);
    let Some(offset) = source[header_end..].find(&closing) else {
        return Err(ParseError::new(
            format!("missing closing marker {} for the [{}] macro", closing, id),
            start..header_end,
            file_id,
        ));
    };

    let body = &source[header_end..header_end + offset];
    let body = body.strip_prefix("\r\n").or_else(|| body.strip_prefix('\n')).unwrap_or(body);
    let body = body.strip_suffix('\n').map(|b| b.strip_suffix('\r').unwrap_or(b)).unwrap_or(body);
    let call_end = header_end + offset + closing.len();

    marker.content = Some(body.to_string());
    marker.span = start..call_end;
    Ok((marker, call_end))
}

struct Cursor<'a> {
    source: &'a str,
    pos: usize,
    start: usize,
    file_id: usize,
}

impl Cursor<'_> {
    fn rest(&self) -> &str {
        &self.source[self.pos..]
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let skipped = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        self.pos += skipped;
    }

    fn identifier(&mut self) -> String {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(rest.len());
        let ident = rest[..len].to_string();
        self.pos += len;
        ident
    }

    fn quoted(&mut self) -> Result<String, ParseError> {
        if !self.eat("\"") {
            return Err(self.error("expected a double-quoted parameter value"));
        }
        let source = self.source;
        let mut value = String::new();
        let mut chars = source[self.pos..].char_indices();
        while let Some((idx, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += idx + 1;
                    return Ok(value);
                }
                '\\' => match chars.next() {
                    Some((_, escaped @ ('"' | '\\'))) => value.push(escaped),
                    Some((_, other)) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => break,
                },
                '\n' => break,
                other => value.push(other),
            }
        }
        Err(self.error("unterminated parameter value"))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let end = self.pos.max(self.start + 2).min(self.source.len());
        ParseError::new(message, self.start..end, self.file_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_macro(source: &str) -> MacroMarker {
        let segments = split_segments(source, 0).expect("split failed");
        segments
            .into_iter()
            .find_map(|s| match s {
                Segment::Macro(m) => Some(m),
                Segment::Markdown(_) => None,
            })
            .expect("no macro found")
    }

    #[test]
    fn self_closing_call_with_parameters() {
        let marker = single_macro("{{displayinframe reference=\"A.B\" excludeFirstHeading=\"true\"/}}");
        assert_eq!(marker.id, "displayinframe");
        assert_eq!(marker.parameters["reference"], "A.B");
        assert_eq!(marker.parameters["excludefirstheading"], "true");
        assert_eq!(marker.content, None);
    }

    #[test]
    fn escaped_quotes_in_values() {
        let marker = single_macro(r#"{{m title="say \"hi\" \\ bye"/}}"#);
        assert_eq!(marker.parameters["title"], r#"say "hi" \ bye"#);
    }

    #[test]
    fn multi_line_content() {
        let marker = single_macro("{{code}}\nfn main() {}\n{{/code}}\n");
        assert_eq!(marker.content.as_deref(), Some("fn main() {}"));
    }

    #[test]
    fn markdown_around_macros_is_kept() {
        let source = "before\n{{m/}}\nafter\n";
        let segments = split_segments(source, 0).unwrap();
        assert_eq!(segments.len(), 3);
        match (&segments[0], &segments[2]) {
            (Segment::Markdown(a), Segment::Markdown(b)) => {
                assert_eq!(&source[a.clone()], "before\n");
                assert_eq!(&source[b.clone()], "after\n");
            }
            other => panic!("unexpected segments {:?}", other),
        }
    }

    #[test]
    fn fenced_code_is_not_scanned() {
        let segments = split_segments("```\n{{m/}}\n```\n", 0).unwrap();
        assert!(matches!(segments.as_slice(), [Segment::Markdown(_)]));
    }

    #[test]
    fn trailing_text_is_an_error() {
        let errors = split_segments("{{m/}} trailing\n", 0).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unexpected text"));
    }

    #[test]
    fn duplicate_parameters_are_rejected() {
        let errors = split_segments("{{m a=\"1\" A=\"2\"/}}", 0).unwrap_err();
        assert!(errors[0].message.contains("duplicate parameter"));
    }
}
