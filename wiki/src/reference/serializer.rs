use crate::reference::DocumentReference;

/// Canonical `wiki:Space.Sub.Page` serialization.
///
/// Separators occurring inside a name are escaped with a backslash so the
/// output can be parsed back by [`DefaultResolver`](super::DefaultResolver).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSerializer;

impl DefaultSerializer {
    pub fn serialize(&self, reference: &DocumentReference) -> String {
        let mut out = escape(&reference.wiki);
        out.push(':');
        for space in &reference.spaces {
            out.push_str(&escape(space));
            out.push('.');
        }
        out.push_str(&escape(&reference.name));
        out
    }
}

fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '.' | ':' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_separators_inside_names() {
        let reference = DocumentReference::new(
            "xwiki",
            vec!["Release 1.0".to_string()],
            "Notes: draft".to_string(),
        );
        assert_eq!(
            DefaultSerializer.serialize(&reference),
            "xwiki:Release 1\\.0.Notes\\: draft"
        );
    }
}
