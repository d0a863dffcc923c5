//! Parses the `@altina` annotation blocks embedded in shader source comments
//! and turns them into a permutation dimension layout, a builtin flag layout,
//! a rule set, and an optional raster state declaration.
//!
//! The same crate expands the multi-dimension cross product into concrete
//! value assignments, filters them through the rule evaluator, and fingerprints
//! each surviving variant with a stable 64-bit identity.

mod error;
mod expand;
mod identity;
mod layout;
mod parse;
mod raster;
mod rules;

pub use error::*;
pub use expand::{expand_multi_values, DEFAULT_EXPANSION_CAP};
pub use identity::{permutation_id, PermutationId};
pub use layout::*;
pub use parse::{parse_shader_dsl, ShaderDsl};
pub use raster::{CullMode, FillMode, FrontFace, RasterState};
pub use rules::{evaluate_rules, BinaryOp, ExprId, LetBinding, RuleExpr, RuleSet, UnaryOp};
