//! Auto-binding register assignment for Altina shader sources.
//!
//! Resource declarations written as `AE_PER_<GROUP>_<KIND>(...)` markers are
//! rewritten into concrete `register(...)` declarations before the external
//! compiler runs, with slot indices allocated per update-frequency group.

mod error;
mod rewrite;

pub use error::*;
pub use rewrite::{
    apply_auto_bindings, rewrite_source, AutoBindingLayout, BindingGroup, BindingKind,
    RewriteOutput, RewrittenSource,
};
