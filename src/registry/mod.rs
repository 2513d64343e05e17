//! Rule/symbolizer registry module
//!
//! Tracks the rule and symbolizer being edited within a style and runs the
//! filter compile/parse cycle against the active rule.

mod classifier;
mod editor;
mod filter_session;
mod kind;
#[cfg(feature = "python")]
pub(crate) mod session;


pub use classifier::*;
pub use editor::*;
pub use filter_session::*;
pub use kind::*;
#[cfg(feature = "python")]
pub use session::*;
