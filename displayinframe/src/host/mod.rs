//! A ready-made host: page stores, view rules and a renderer wired to a
//! transformation that knows the display macro.

mod renderer;
mod rights;
mod store;

pub use renderer::WikiRenderer;
pub use rights::{AccessRule, AccessRules};
pub use store::{FileWiki, MemoryWiki};

use std::sync::Arc;

use tracing::info;
use wiki::reference::{DefaultResolver, DefaultSerializer, DocumentReference, EntityType};
use wiki::{Syntax, UserReference, Xdom};

use crate::config::RenderConfig;
use crate::display::DisplayInFrameMacro;
use crate::error::InclusionError;
use crate::frame::LinkStyle;
use crate::guard::Execution;
use crate::services::{AuthorizationChecker, DocumentLoader, DocumentRenderer};
use crate::transformation::MacroTransformation;

/// Who asks for a page and in which form.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub user: UserReference,
    pub locale: Option<String>,
    pub target_syntax: Syntax,
}

impl Default for RenderRequest {
    fn default() -> Self {
        RenderRequest {
            user: UserReference::guest(),
            locale: None,
            target_syntax: Syntax::Html,
        }
    }
}

/// A wiki able to render its pages with the display macro enabled.
///
/// Every [`Wiki::render_page`] call starts a fresh execution, so one `Wiki`
/// can serve renders from several threads at once.
pub struct Wiki {
    resolver: DefaultResolver,
    serializer: DefaultSerializer,
    loader: Arc<dyn DocumentLoader>,
    authorization: Arc<dyn AuthorizationChecker>,
    renderer: Arc<WikiRenderer>,
    transformation: Arc<MacroTransformation>,
}

impl Wiki {
    pub fn new(
        main_wiki: &str,
        loader: Arc<dyn DocumentLoader>,
        authorization: Arc<dyn AuthorizationChecker>,
    ) -> Self {
        Wiki::with_link_style(main_wiki, LinkStyle::for_wiki(main_wiki), loader, authorization)
    }

    pub fn with_link_style(
        main_wiki: &str,
        link_style: LinkStyle,
        loader: Arc<dyn DocumentLoader>,
        authorization: Arc<dyn AuthorizationChecker>,
    ) -> Self {
        let resolver = DefaultResolver::new(main_wiki);
        let renderer = Arc::new(WikiRenderer::new());

        let display = DisplayInFrameMacro::new(
            Arc::new(resolver.clone()),
            loader.clone(),
            authorization.clone(),
            renderer.clone(),
            Arc::new(DefaultSerializer),
        )
        .with_link_style(link_style);

        let mut transformation = MacroTransformation::new();
        transformation.register(Arc::new(display));
        let transformation = Arc::new(transformation);
        renderer.attach(Arc::downgrade(&transformation));

        Wiki {
            resolver,
            serializer: DefaultSerializer,
            loader,
            authorization,
            renderer,
            transformation,
        }
    }

    pub fn transformation(&self) -> &MacroTransformation {
        &self.transformation
    }

    pub fn loader(&self) -> &dyn DocumentLoader {
        self.loader.as_ref()
    }

    /// Resolve a page reference typed by a user against the main wiki.
    pub fn resolve(&self, raw: &str) -> Result<DocumentReference, InclusionError> {
        self.resolver
            .resolve(raw, EntityType::Document, None)
            .map_err(|source| InclusionError::Reference {
                reference: raw.to_string(),
                source,
            })
    }

    /// Load, check and fully render one page for `request`.
    pub fn render_page(
        &self,
        reference: &DocumentReference,
        request: &RenderRequest,
    ) -> Result<Xdom, InclusionError> {
        let serialized = self.serializer.serialize(reference);
        info!(page = %serialized, user = %request.user, "rendering page");

        let document = self.loader.load(reference).map_err(|source| InclusionError::Load {
            reference: serialized.clone(),
            source,
        })?;
        if !self.authorization.has_view_access(&request.user, reference) {
            return Err(InclusionError::Permission {
                user: request.user.to_string(),
                reference: serialized,
            });
        }

        let execution = Execution::new(request.user.clone())
            .with_locale(request.locale.clone())
            .with_document(reference.clone());
        // The page itself counts as being displayed.
        let _page = execution
            .inclusions()
            .enter(reference)
            .map_err(|_| InclusionError::Recursion(serialized.clone()))?;
        let config = RenderConfig::new(execution)
            .with_content_transformed(true)
            .with_content_translated(true)
            .with_target_syntax(request.target_syntax);

        self.renderer
            .render(&document, &config)
            .map_err(|source| InclusionError::Render { source })
    }
}
