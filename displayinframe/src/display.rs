use std::sync::Arc;

use tracing::debug;
use wiki::{Block, Parameters};

use crate::config::RenderConfig;
use crate::context::MacroContext;
use crate::error::{InclusionError, MacroExecutionError};
use crate::frame::{self, LinkStyle};
use crate::macros::{CATEGORY_CONTENT, Macro, MacroDescriptor};
use crate::parameters::InclusionParameters;
use crate::services::{
    AuthorizationChecker, DocumentLoader, DocumentRenderer, ReferenceResolver, ReferenceSerializer,
};

pub const MACRO_ID: &str = "displayinframe";

const DESCRIPTION: &str = "Display other pages into the current page inside a frame.";

/// Runs before other macros so a displayed page brings its content in
/// before the rest of the including page is transformed.
const PRIORITY: u32 = 10;

/// Displays another document inside a frame linking back to it.
pub struct DisplayInFrameMacro {
    descriptor: MacroDescriptor,
    resolver: Arc<dyn ReferenceResolver>,
    loader: Arc<dyn DocumentLoader>,
    authorization: Arc<dyn AuthorizationChecker>,
    renderer: Arc<dyn DocumentRenderer>,
    serializer: Arc<dyn ReferenceSerializer>,
    link_style: LinkStyle,
}

impl DisplayInFrameMacro {
    pub fn new(
        resolver: Arc<dyn ReferenceResolver>,
        loader: Arc<dyn DocumentLoader>,
        authorization: Arc<dyn AuthorizationChecker>,
        renderer: Arc<dyn DocumentRenderer>,
        serializer: Arc<dyn ReferenceSerializer>,
    ) -> Self {
        DisplayInFrameMacro {
            descriptor: MacroDescriptor {
                id: MACRO_ID.to_string(),
                name: "DisplayInFrame".to_string(),
                description: DESCRIPTION.to_string(),
                priority: PRIORITY,
                default_categories: vec![CATEGORY_CONTENT.to_string()],
                supports_inline: false,
            },
            resolver,
            loader,
            authorization,
            renderer,
            serializer,
            link_style: LinkStyle::default(),
        }
    }

    pub fn with_link_style(mut self, link_style: LinkStyle) -> Self {
        self.link_style = link_style;
        self
    }

    /// Render the referenced document and return it as a single framed block.
    /// Any failure aborts the whole display; nothing partial is returned.
    pub fn display(
        &self,
        parameters: &InclusionParameters,
        context: &MacroContext,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let reference = self
            .resolver
            .resolve(context.location(), &parameters.reference, parameters.reference_type)
            .map_err(|source| InclusionError::Reference {
                reference: parameters.reference.clone(),
                source,
            })?;
        let serialized = self.serializer.serialize(&reference);
        let _span = tracing::debug_span!("displayinframe", document = %serialized).entered();

        let inclusion = context
            .execution()
            .inclusions()
            .enter(&reference)
            .map_err(|_| {
                debug!(stack = ?context.execution().inclusions().snapshot(), "recursive display refused");
                InclusionError::Recursion(serialized.clone())
            })?;

        let document = self
            .loader
            .load(&reference)
            .map_err(|source| InclusionError::Load {
                reference: serialized.clone(),
                source,
            })?;

        let user = context.execution().user();
        if !self.authorization.has_view_access(user, &document.reference) {
            return Err(InclusionError::Permission {
                user: user.to_string(),
                reference: self.serializer.serialize(&document.reference),
            }
            .into());
        }

        let config = render_config(parameters, context);
        debug!(
            section = ?config.section_id(),
            depth = context.execution().inclusions().depth(),
            "rendering displayed document"
        );
        let rendered = self.renderer.render(&document, &config);
        drop(inclusion);
        let mut xdom = rendered.map_err(|source| InclusionError::Render { source })?;

        if parameters.exclude_first_heading && frame::exclude_first_heading(&mut xdom) {
            debug!("excluded first heading");
        }

        let source = self.serializer.serialize(&document.reference);
        let href = self.link_style.link_href(&source);
        Ok(vec![frame::wrap_in_frame(xdom, &source, &href)])
    }
}

/// Transformed, isolated rendering of the requested section, in the target
/// syntax of the including page, sharing its id generator when it has one.
fn render_config(parameters: &InclusionParameters, context: &MacroContext) -> RenderConfig {
    RenderConfig::new(context.execution().clone())
        .with_content_transformed(true)
        .with_section(parameters.section.clone())
        .with_target_syntax(context.target_syntax())
        .with_content_translated(true)
        .with_id_generator(context.id_generator().cloned())
}

impl Macro for DisplayInFrameMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        parameters: &Parameters,
        _content: Option<&str>,
        context: &MacroContext,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let parameters = InclusionParameters::from_parameters(parameters)?;
        self.display(&parameters, context)
    }
}
