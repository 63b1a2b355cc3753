use std::sync::{OnceLock, Weak};

use tracing::{debug, trace};
use wiki::parser::Parser;
use wiki::{Block, DocumentModel, MetaData, Xdom};

use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::services::DocumentRenderer;
use crate::transformation::{MacroTransformation, TransformationContext};

/// Parses documents and runs the macro transformation over them.
///
/// The transformation holds the macros, and the display macro holds this
/// renderer, so the link back is attached once everything is built.
#[derive(Debug, Default)]
pub struct WikiRenderer {
    transformation: OnceLock<Weak<MacroTransformation>>,
}

impl WikiRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transformation used for transformed renders. Only the first
    /// call has an effect.
    pub fn attach(&self, transformation: Weak<MacroTransformation>) {
        if self.transformation.set(transformation).is_err() {
            debug!("renderer already has a transformation attached");
        }
    }
}

impl DocumentRenderer for WikiRenderer {
    fn render(&self, document: &DocumentModel, config: &RenderConfig) -> Result<Xdom, RenderError> {
        let source = if config.is_content_translated() {
            document.content_for(config.execution().locale())
        } else {
            &document.content
        };

        let mut xdom = Parser::new(source.to_string(), 0)
            .parse()
            .map_err(|errors| RenderError::Parse {
                reference: document.reference.to_string(),
                errors,
            })?;
        xdom.metadata.insert(MetaData::SYNTAX, document.syntax.id());

        if let Some(section) = config.section_id() {
            let found = take_section(&mut xdom.children, section).ok_or_else(|| RenderError::SectionNotFound {
                section: section.to_string(),
                reference: document.reference.to_string(),
            })?;
            xdom.children = vec![found];
        }

        if let Some(ids) = config.id_generator() {
            xdom.adopt_id_generator(ids.clone());
        }

        if config.is_content_transformed() {
            let transformation = self
                .transformation
                .get()
                .and_then(Weak::upgrade)
                .ok_or(RenderError::TransformationUnavailable)?;
            let execution = if config.is_execution_context_isolated() {
                config.execution().isolated(document.reference.clone())
            } else {
                config.execution().clone()
            };
            let context = TransformationContext::new(execution, config.target_syntax());
            let executed = transformation.transform(&mut xdom, &context);
            trace!(document = %document.reference, executed, "transformed");
        }

        Ok(xdom)
    }
}

/// Remove and return the section whose heading has id `section`.
fn take_section(blocks: &mut Vec<Block>, section: &str) -> Option<Block> {
    let position = blocks.iter().position(|block| match block {
        Block::Section(children) => {
            matches!(children.first(), Some(Block::Heading { id, .. }) if id == section)
        }
        _ => false,
    });
    if let Some(idx) = position {
        return Some(blocks.remove(idx));
    }
    blocks
        .iter_mut()
        .filter_map(Block::children_mut)
        .find_map(|children| take_section(children, section))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::guard::Execution;
    use wiki::{Inline, SharedIdGenerator, UserReference};

    fn document(content: &str) -> DocumentModel {
        DocumentModel::new("xwiki:Main.Page".parse().unwrap(), content)
    }

    fn config() -> RenderConfig {
        RenderConfig::new(Execution::new(UserReference::guest()))
    }

    #[test]
    fn plain_render_keeps_macro_markers() {
        let xdom = WikiRenderer::new().render(&document("{{later/}}"), &config()).unwrap();
        assert!(matches!(&xdom.children[0], Block::Macro(marker) if marker.id == "later"));
        assert_eq!(xdom.metadata.get(MetaData::SYNTAX), Some("markdown/1.0"));
    }

    #[test]
    fn section_filter_keeps_one_section() {
        let doc = document("# One\nfirst\n# Two\nsecond\n## Deep\ndeeper");
        let xdom = WikiRenderer::new()
            .render(&doc, &config().with_section(Some("HDeep".into())))
            .unwrap();
        assert_eq!(xdom.children.len(), 1);
        assert_eq!(
            xdom.children[0].children()[1],
            Block::Paragraph(vec![Inline::Text("deeper".into())])
        );
    }

    #[test]
    fn missing_section_is_an_error() {
        let err = WikiRenderer::new()
            .render(&document("# One"), &config().with_section(Some("HNope".into())))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot find section [HNope] in document [xwiki:Main.Page]"
        );
    }

    #[test]
    fn translated_render_uses_execution_locale() {
        let doc = document("hello").with_translation("fr", "bonjour");
        let execution = Execution::new(UserReference::guest()).with_locale(Some("fr".into()));
        let translated = RenderConfig::new(execution.clone()).with_content_translated(true);

        let xdom = WikiRenderer::new().render(&doc, &translated).unwrap();
        assert_eq!(xdom.children[0], Block::Paragraph(vec![Inline::Text("bonjour".into())]));

        let xdom = WikiRenderer::new().render(&doc, &RenderConfig::new(execution)).unwrap();
        assert_eq!(xdom.children[0], Block::Paragraph(vec![Inline::Text("hello".into())]));
    }

    #[test]
    fn shared_id_generator_renumbers_headings() {
        let ids = SharedIdGenerator::new();
        ids.generate("Title");
        let xdom = WikiRenderer::new()
            .render(&document("# Title"), &config().with_id_generator(Some(ids.clone())))
            .unwrap();
        assert!(matches!(&xdom.children[0].children()[0], Block::Heading { id, .. } if id == "HTitle-1"));
        assert!(xdom.id_generator().same_as(&ids));
    }

    #[test]
    fn transformed_render_needs_a_transformation() {
        let renderer = WikiRenderer::new();
        let transformed = config().with_content_transformed(true);
        assert!(matches!(
            renderer.render(&document("text"), &transformed),
            Err(RenderError::TransformationUnavailable)
        ));

        let transformation = Arc::new(MacroTransformation::new());
        renderer.attach(Arc::downgrade(&transformation));
        let xdom = renderer.render(&document("{{unknown/}}"), &transformed).unwrap();
        assert!(matches!(&xdom.children[0], Block::Error { .. }));
    }
}
