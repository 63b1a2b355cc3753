//! Collaborators the display macro needs from its host.

use wiki::reference::{DefaultResolver, DefaultSerializer, DocumentReference, EntityType, ResolveError};
use wiki::{DocumentModel, UserReference, Xdom};

use crate::config::RenderConfig;
use crate::error::{LoadError, RenderError};

pub trait ReferenceResolver: Send + Sync {
    /// Resolve `raw` relative to `location` (the current document, if any).
    fn resolve(
        &self,
        location: Option<&DocumentReference>,
        raw: &str,
        kind: EntityType,
    ) -> Result<DocumentReference, ResolveError>;
}

pub trait ReferenceSerializer: Send + Sync {
    fn serialize(&self, reference: &DocumentReference) -> String;
}

pub trait DocumentLoader: Send + Sync {
    fn load(&self, reference: &DocumentReference) -> Result<DocumentModel, LoadError>;
}

pub trait AuthorizationChecker: Send + Sync {
    fn has_view_access(&self, user: &UserReference, reference: &DocumentReference) -> bool;
}

pub trait DocumentRenderer: Send + Sync {
    fn render(&self, document: &DocumentModel, config: &RenderConfig) -> Result<Xdom, RenderError>;
}

impl ReferenceResolver for DefaultResolver {
    fn resolve(
        &self,
        location: Option<&DocumentReference>,
        raw: &str,
        kind: EntityType,
    ) -> Result<DocumentReference, ResolveError> {
        DefaultResolver::resolve(self, raw, kind, location)
    }
}

impl ReferenceSerializer for DefaultSerializer {
    fn serialize(&self, reference: &DocumentReference) -> String {
        DefaultSerializer::serialize(self, reference)
    }
}
