use crate::error::RuleEvalError;
use crate::layout::{BuiltinLayout, BuiltinValues, PermutationLayout, PermutationValues};
use rustc_hash::FxHashMap;

/// Index of an expression node within its owning [`RuleSet`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprId(u32);

impl ExprId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical not: nonzero becomes 0, zero becomes 1.
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// One expression tree node. Children are referenced by arena index,
/// never by pointer, so rule sets clone freely and cannot form cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleExpr {
    Literal(i64),
    /// A dimension, builtin, or earlier let-binding name.
    Identifier(String),
    Unary { op: UnaryOp, operand: ExprId },
    Binary { op: BinaryOp, left: ExprId, right: ExprId },
}

/// A named intermediate value computed before the require clauses run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetBinding {
    pub name: String,
    pub expr: ExprId,
}

/// Let-bindings and require-clauses parsed from a rules block.
///
/// All expression nodes live in one flat append-only arena owned by the
/// rule set; [`ExprId`]s are only valid against the set that minted them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    exprs: Vec<RuleExpr>,
    pub lets: Vec<LetBinding>,
    pub requires: Vec<ExprId>,
}

impl RuleSet {
    /// Appends a node and returns its index. Operands must already be in
    /// the arena, so children always precede their parents.
    pub fn push_expr(&mut self, expr: RuleExpr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn expr(&self, id: ExprId) -> Option<&RuleExpr> {
        self.exprs.get(id.index())
    }

    pub fn is_empty(&self) -> bool {
        self.lets.is_empty() && self.requires.is_empty()
    }
}

/// Evaluates a rule set against one concrete value assignment.
///
/// Every value is checked against its declared domain, let-bindings are
/// evaluated in declaration order into a shared environment, and then each
/// require clause runs. `Ok(true)` means every require clause held,
/// `Ok(false)` means at least one evaluated to zero. Pass `builtins` as
/// `None` when the rule set never references builtin flags.
pub fn evaluate_rules(
    rules: &RuleSet,
    layout: &PermutationLayout,
    values: &PermutationValues,
    builtins: Option<(&BuiltinLayout, &BuiltinValues)>,
) -> Result<bool, RuleEvalError> {
    if layout.dimensions.len() != values.len() {
        return Err(RuleEvalError::LayoutMismatch);
    }
    if let Some((builtin_layout, builtin_values)) = builtins {
        if builtin_layout.builtins.len() != builtin_values.len() {
            return Err(RuleEvalError::LayoutMismatch);
        }
    }

    let mut env: FxHashMap<&str, i64> = FxHashMap::default();
    env.reserve(
        layout.dimensions.len()
            + builtins.map_or(0, |(builtin_layout, _)| builtin_layout.builtins.len()),
    );
    for (dim, &value) in layout.dimensions.iter().zip(values.as_slice()) {
        if !dim.kind.contains(value) {
            return Err(RuleEvalError::ValueOutOfDomain(dim.name.clone()));
        }
        env.insert(dim.name.as_str(), value);
    }
    if let Some((builtin_layout, builtin_values)) = builtins {
        for (flag, &value) in builtin_layout.builtins.iter().zip(builtin_values.as_slice()) {
            if value != 0 && value != 1 {
                return Err(RuleEvalError::ValueOutOfDomain(flag.name.clone()));
            }
            env.insert(flag.name.as_str(), value);
        }
    }

    for binding in &rules.lets {
        if env.contains_key(binding.name.as_str()) {
            return Err(RuleEvalError::LetNameConflict(binding.name.clone()));
        }
        let value = eval_expr(rules, binding.expr, &env)?;
        env.insert(binding.name.as_str(), value);
    }

    for &require in &rules.requires {
        if eval_expr(rules, require, &env)? == 0 {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval_expr(
    rules: &RuleSet,
    id: ExprId,
    env: &FxHashMap<&str, i64>,
) -> Result<i64, RuleEvalError> {
    let node = rules.expr(id).ok_or(RuleEvalError::BadExprIndex)?;
    match node {
        RuleExpr::Literal(value) => Ok(*value),
        RuleExpr::Identifier(name) => env
            .get(name.as_str())
            .copied()
            .ok_or_else(|| RuleEvalError::UnknownIdentifier(name.clone())),
        RuleExpr::Unary { op, operand } => {
            let value = eval_expr(rules, *operand, env)?;
            Ok(match op {
                UnaryOp::Not => i64::from(value == 0),
                UnaryOp::Neg => value.wrapping_neg(),
                UnaryOp::Plus => value,
            })
        }
        // && and || short-circuit so a guarded divisor never evaluates.
        RuleExpr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => {
            if eval_expr(rules, *left, env)? == 0 {
                return Ok(0);
            }
            Ok(i64::from(eval_expr(rules, *right, env)? != 0))
        }
        RuleExpr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => {
            if eval_expr(rules, *left, env)? != 0 {
                return Ok(1);
            }
            Ok(i64::from(eval_expr(rules, *right, env)? != 0))
        }
        RuleExpr::Binary { op, left, right } => {
            let lhs = eval_expr(rules, *left, env)?;
            let rhs = eval_expr(rules, *right, env)?;
            match op {
                BinaryOp::Mul => Ok(lhs.wrapping_mul(rhs)),
                BinaryOp::Div => {
                    if rhs == 0 {
                        Err(RuleEvalError::DivisionByZero)
                    } else {
                        Ok(lhs.wrapping_div(rhs))
                    }
                }
                BinaryOp::Rem => {
                    if rhs == 0 {
                        Err(RuleEvalError::ModuloByZero)
                    } else {
                        Ok(lhs.wrapping_rem(rhs))
                    }
                }
                BinaryOp::Add => Ok(lhs.wrapping_add(rhs)),
                BinaryOp::Sub => Ok(lhs.wrapping_sub(rhs)),
                BinaryOp::Lt => Ok(i64::from(lhs < rhs)),
                BinaryOp::Le => Ok(i64::from(lhs <= rhs)),
                BinaryOp::Gt => Ok(i64::from(lhs > rhs)),
                BinaryOp::Ge => Ok(i64::from(lhs >= rhs)),
                BinaryOp::Eq => Ok(i64::from(lhs == rhs)),
                BinaryOp::Ne => Ok(i64::from(lhs != rhs)),
                BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
            }
        }
    }
}
