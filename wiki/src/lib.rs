pub mod block;
pub mod document;
pub mod parser;
pub mod reference;
pub mod render;

pub use block::{Block, Inline, MacroMarker, Parameters};
pub use block::id::{IdGenerator, SharedIdGenerator};
pub use block::metadata::MetaData;
pub use document::{DocumentModel, Syntax, Xdom};
pub use reference::{DocumentReference, EntityType, UserReference};
