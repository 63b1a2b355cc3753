use thiserror::Error;

use crate::reference::{DEFAULT_SPACE, DocumentReference, EntityType, HOME_DOCUMENT};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("empty reference")]
    Empty,
    #[error("malformed reference [{reference}]: {reason}")]
    Malformed { reference: String, reason: String },
    #[error("reference [{0}] is not absolute")]
    NotAbsolute(String),
}

/// Resolves raw reference strings relative to a current location.
///
/// Parts missing from the raw string are taken from the location, then from
/// the defaults (`main_wiki`, space [`DEFAULT_SPACE`]).
#[derive(Debug, Clone)]
pub struct DefaultResolver {
    main_wiki: String,
}

impl DefaultResolver {
    pub fn new(main_wiki: impl Into<String>) -> Self {
        DefaultResolver {
            main_wiki: main_wiki.into(),
        }
    }

    pub fn main_wiki(&self) -> &str {
        &self.main_wiki
    }

    pub fn resolve(
        &self,
        raw: &str,
        kind: EntityType,
        location: Option<&DocumentReference>,
    ) -> Result<DocumentReference, ResolveError> {
        if raw.trim().is_empty() {
            return Err(ResolveError::Empty);
        }

        let wiki_for = |explicit: Option<String>| {
            explicit
                .or_else(|| location.map(|l| l.wiki.clone()))
                .unwrap_or_else(|| self.main_wiki.clone())
        };

        match kind {
            EntityType::Document => {
                let (wiki, mut segments) = split_document(raw)?;
                let name = segments.pop().unwrap_or_default();
                let spaces = if segments.is_empty() {
                    location
                        .map(|l| l.spaces.clone())
                        .unwrap_or_else(|| vec![DEFAULT_SPACE.to_string()])
                } else {
                    segments
                };
                Ok(DocumentReference::new(wiki_for(wiki), spaces, name))
            }
            EntityType::Space => {
                let (wiki, spaces) = split_document(raw)?;
                Ok(DocumentReference::new(wiki_for(wiki), spaces, HOME_DOCUMENT))
            }
            EntityType::Page => {
                let (wiki, rest) = split_wiki(raw)?;
                let segments = split_escaped(raw, rest, '/')?;
                let spaces = match (segments.len(), location) {
                    // A lone page name is a sibling of the current page.
                    (1, Some(location)) => {
                        let mut spaces = location.parent_spaces().to_vec();
                        spaces.extend(segments);
                        spaces
                    }
                    _ => segments,
                };
                Ok(DocumentReference::new(wiki_for(wiki), spaces, HOME_DOCUMENT))
            }
        }
    }
}

/// Split a document reference into its optional wiki and its dot-separated,
/// unescaped segments.
pub(crate) fn split_document(raw: &str) -> Result<(Option<String>, Vec<String>), ResolveError> {
    if raw.trim().is_empty() {
        return Err(ResolveError::Empty);
    }
    let (wiki, rest) = split_wiki(raw)?;
    let segments = split_escaped(raw, rest, '.')?;
    Ok((wiki, segments))
}

/// Split off the wiki part at the first unescaped `:`.
fn split_wiki(raw: &str) -> Result<(Option<String>, &str), ResolveError> {
    let mut escaped = false;
    for (idx, c) in raw.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ':' => {
                let wiki = unescape(raw, &raw[..idx])?;
                if wiki.is_empty() {
                    return Err(malformed(raw, "empty wiki name"));
                }
                return Ok((Some(wiki), &raw[idx + 1..]));
            }
            _ => {}
        }
    }
    Ok((None, raw))
}

fn split_escaped(raw: &str, input: &str, separator: char) -> Result<Vec<String>, ResolveError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => current.push(next),
                None => return Err(malformed(raw, "dangling escape character")),
            }
        } else if c == separator {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    segments.push(current);

    if segments.iter().any(|s| s.is_empty()) {
        return Err(malformed(raw, "empty name segment"));
    }
    Ok(segments)
}

fn unescape(raw: &str, input: &str) -> Result<String, ResolveError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(
                chars
                    .next()
                    .ok_or_else(|| malformed(raw, "dangling escape character"))?,
            );
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

fn malformed(raw: &str, reason: &str) -> ResolveError {
    ResolveError::Malformed {
        reference: raw.to_string(),
        reason: reason.to_string(),
    }
}
