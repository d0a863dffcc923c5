use thiserror::Error;

/// Error type for shader DSL parsing.
#[derive(Error, Debug)]
pub enum ParseDslError {
    /// A recognized `@altina` block opener had no matching closing brace.
    #[error("unterminated `@altina {0}` block")]
    UnterminatedBlock(&'static str),
    /// A declaration line did not match the block's grammar.
    #[error("shader DSL lexing error at line {row}, column {col}")]
    LexerError { offset: usize, row: u32, col: usize },
    /// A declaration line matched the grammar but carried an invalid value.
    #[error("shader DSL parse error at line {row}")]
    ParserError { row: u32, kind: ParseErrorKind },
    #[error("duplicate declaration of `{0}`")]
    DuplicateName(String),
    #[error("builtin `{0}` must carry the `AE_BUILTIN_` name prefix")]
    BuiltinPrefix(String),
    #[error("enum dimension `{0}` declares no values")]
    EmptyEnum(String),
    #[error("int dimension `{0}` is missing its `[lo..hi]` range")]
    MissingRange(String),
    #[error("default {value} for `{name}` is outside the declared domain")]
    DefaultOutOfDomain { name: String, value: i64 },
    #[error("unknown rule statement `{0}`")]
    UnknownRuleStatement(String),
    #[error("`let` name `{0}` conflicts with an existing symbol")]
    LetNameConflict(String),
    #[error("unknown identifier `{0}` in rule expression")]
    UnknownRuleIdentifier(String),
    #[error("expected {expected} in rule expression")]
    RuleSyntax { expected: &'static str },
}

/// What a declaration value failed to parse as.
#[derive(Debug)]
pub enum ParseErrorKind {
    ValueType,
    Attribute,
    Int,
    Float,
    Bool,
    FillMode,
    CullMode,
    FrontFace,
}

/// Error type for rule evaluation over a concrete value assignment.
#[derive(Error, Debug)]
pub enum RuleEvalError {
    #[error("value count does not match its layout")]
    LayoutMismatch,
    #[error("value for `{0}` is outside its declared domain")]
    ValueOutOfDomain(String),
    #[error("`let` name `{0}` conflicts with an existing symbol")]
    LetNameConflict(String),
    #[error("unknown identifier `{0}` in rule expression")]
    UnknownIdentifier(String),
    #[error("division by zero in rule expression")]
    DivisionByZero,
    #[error("modulo by zero in rule expression")]
    ModuloByZero,
    #[error("expression index out of bounds")]
    BadExprIndex,
}

/// Error type for multi-dimension cross product expansion.
#[derive(Error, Debug)]
pub enum ExpandError {
    #[error("permutation count exceeds the cap of {0}")]
    CapExceeded(usize),
    #[error("dimension `{0}` has an empty value domain")]
    EmptyDomain(String),
}
