//! A wiki macro that displays another page's rendered content inside the
//! current page, wrapped in a frame that links back to the source page.
//!
//! [`DisplayInFrameMacro`] is the core. It depends on five collaborators
//! (see [`services`]) that a host injects; [`host`] provides a complete set
//! of them backed by in-memory or on-disk pages.

pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod frame;
pub mod guard;
pub mod host;
pub mod macros;
pub mod parameters;
pub mod services;
pub mod transformation;

pub use config::RenderConfig;
pub use context::MacroContext;
pub use display::DisplayInFrameMacro;
pub use error::{InclusionError, LoadError, MacroExecutionError, RenderError};
pub use frame::LinkStyle;
pub use guard::{Execution, InclusionScope, InclusionStack, RecursionError};
pub use macros::{Macro, MacroDescriptor};
pub use parameters::InclusionParameters;
pub use transformation::{MacroTransformation, TransformationContext};
