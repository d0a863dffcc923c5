use crate::error::ParseDslError;
use crate::layout::{BuiltinLayout, PermutationLayout};
use crate::rules::{BinaryOp, ExprId, LetBinding, RuleExpr, RuleSet, UnaryOp};

/// One token of the rule language. Symbols borrow the block text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleToken<'a> {
    Identifier(&'a str),
    Number(i64),
    Symbol(&'a str),
    End,
}

const TWO_CHAR_SYMBOLS: [&str; 7] = ["&&", "||", "==", "!=", "<=", ">=", ".."];

struct RuleLexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> RuleLexer<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn next_token(&mut self) -> Result<RuleToken<'a>, ParseDslError> {
        self.skip_trivia();
        let text = self.text;
        if self.pos >= text.len() {
            return Ok(RuleToken::End);
        }
        let rest = &text[self.pos..];
        let ch = rest.chars().next().ok_or(ParseDslError::RuleSyntax {
            expected: "a token",
        })?;

        if ch.is_ascii_alphabetic() || ch == '_' {
            let end = rest
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(rest.len());
            self.pos += end;
            return Ok(RuleToken::Identifier(&rest[..end]));
        }
        if ch.is_ascii_digit() {
            let end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            let value = rest[..end]
                .parse::<i64>()
                .map_err(|_| ParseDslError::RuleSyntax {
                    expected: "an integer literal",
                })?;
            self.pos += end;
            return Ok(RuleToken::Number(value));
        }
        for symbol in TWO_CHAR_SYMBOLS {
            if rest.starts_with(symbol) {
                self.pos += symbol.len();
                return Ok(RuleToken::Symbol(&rest[..symbol.len()]));
            }
        }
        let len = ch.len_utf8();
        self.pos += len;
        Ok(RuleToken::Symbol(&rest[..len]))
    }

    fn skip_trivia(&mut self) {
        loop {
            let text = self.text;
            let rest = &text[self.pos..];
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if let Some(after) = trimmed.strip_prefix("//") {
                match after.find('\n') {
                    Some(at) => self.pos += 2 + at + 1,
                    None => self.pos = text.len(),
                }
            } else if let Some(after) = trimmed.strip_prefix("/*") {
                match after.find("*/") {
                    Some(at) => self.pos += 2 + at + 2,
                    None => self.pos = text.len(),
                }
            } else {
                return;
            }
        }
    }
}

/// Parses a `rules` block into a [`RuleSet`]. Identifiers must resolve to
/// a permutation dimension, a builtin flag, or an earlier `let` at parse
/// time, so a malformed block never reaches evaluation.
pub(crate) fn parse_rules(
    text: &str,
    permutations: &PermutationLayout,
    builtins: &BuiltinLayout,
) -> Result<RuleSet, ParseDslError> {
    if text.trim().is_empty() {
        return Ok(RuleSet::default());
    }
    let mut parser = RuleParser::new(text, permutations, builtins)?;
    parser.parse_all()?;
    Ok(parser.rules)
}

struct RuleParser<'a> {
    lexer: RuleLexer<'a>,
    current: RuleToken<'a>,
    permutations: &'a PermutationLayout,
    builtins: &'a BuiltinLayout,
    rules: RuleSet,
}

impl<'a> RuleParser<'a> {
    fn new(
        text: &'a str,
        permutations: &'a PermutationLayout,
        builtins: &'a BuiltinLayout,
    ) -> Result<Self, ParseDslError> {
        let mut lexer = RuleLexer::new(text);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            permutations,
            builtins,
            rules: RuleSet::default(),
        })
    }

    fn advance(&mut self) -> Result<(), ParseDslError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn match_symbol(&mut self, symbol: &str) -> Result<bool, ParseDslError> {
        if matches!(self.current, RuleToken::Symbol(t) if t == symbol) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn match_keyword(&mut self, keyword: &str) -> Result<bool, ParseDslError> {
        if matches!(self.current, RuleToken::Identifier(t) if t == keyword) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn parse_all(&mut self) -> Result<(), ParseDslError> {
        while self.current != RuleToken::End {
            if self.match_keyword("let")? {
                self.parse_let()?;
            } else if self.match_keyword("require")? {
                self.parse_require()?;
            } else {
                return Err(ParseDslError::UnknownRuleStatement(describe(self.current)));
            }
        }
        Ok(())
    }

    fn parse_let(&mut self) -> Result<(), ParseDslError> {
        let RuleToken::Identifier(name) = self.current else {
            return Err(ParseDslError::RuleSyntax {
                expected: "a name after `let`",
            });
        };
        let name = name.to_string();
        self.advance()?;
        if self.resolves(&name) {
            return Err(ParseDslError::LetNameConflict(name));
        }
        if !self.match_symbol("=")? {
            return Err(ParseDslError::RuleSyntax {
                expected: "`=` after the let name",
            });
        }
        let expr = self.parse_expression()?;
        self.match_symbol(";")?;
        self.rules.lets.push(LetBinding { name, expr });
        Ok(())
    }

    fn parse_require(&mut self) -> Result<(), ParseDslError> {
        let expr = self.parse_expression()?;
        self.match_symbol(";")?;
        self.rules.requires.push(expr);
        Ok(())
    }

    fn resolves(&self, name: &str) -> bool {
        self.permutations.index_of(name).is_some()
            || self.builtins.index_of(name).is_some()
            || self.rules.lets.iter().any(|let_| let_.name == name)
    }

    fn parse_expression(&mut self) -> Result<ExprId, ParseDslError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<ExprId, ParseDslError> {
        let mut lhs = self.parse_and()?;
        while self.match_symbol("||")? {
            let rhs = self.parse_and()?;
            lhs = self.rules.push_expr(RuleExpr::Binary {
                op: BinaryOp::Or,
                left: lhs,
                right: rhs,
            });
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<ExprId, ParseDslError> {
        let mut lhs = self.parse_equality()?;
        while self.match_symbol("&&")? {
            let rhs = self.parse_equality()?;
            lhs = self.rules.push_expr(RuleExpr::Binary {
                op: BinaryOp::And,
                left: lhs,
                right: rhs,
            });
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<ExprId, ParseDslError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = if self.match_symbol("==")? {
                BinaryOp::Eq
            } else if self.match_symbol("!=")? {
                BinaryOp::Ne
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_relational()?;
            lhs = self.rules.push_expr(RuleExpr::Binary {
                op,
                left: lhs,
                right: rhs,
            });
        }
    }

    fn parse_relational(&mut self) -> Result<ExprId, ParseDslError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = if self.match_symbol("<=")? {
                BinaryOp::Le
            } else if self.match_symbol(">=")? {
                BinaryOp::Ge
            } else if self.match_symbol("<")? {
                BinaryOp::Lt
            } else if self.match_symbol(">")? {
                BinaryOp::Gt
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_additive()?;
            lhs = self.rules.push_expr(RuleExpr::Binary {
                op,
                left: lhs,
                right: rhs,
            });
        }
    }

    fn parse_additive(&mut self) -> Result<ExprId, ParseDslError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.match_symbol("+")? {
                BinaryOp::Add
            } else if self.match_symbol("-")? {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_multiplicative()?;
            lhs = self.rules.push_expr(RuleExpr::Binary {
                op,
                left: lhs,
                right: rhs,
            });
        }
    }

    fn parse_multiplicative(&mut self) -> Result<ExprId, ParseDslError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.match_symbol("*")? {
                BinaryOp::Mul
            } else if self.match_symbol("/")? {
                BinaryOp::Div
            } else if self.match_symbol("%")? {
                BinaryOp::Rem
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_unary()?;
            lhs = self.rules.push_expr(RuleExpr::Binary {
                op,
                left: lhs,
                right: rhs,
            });
        }
    }

    fn parse_unary(&mut self) -> Result<ExprId, ParseDslError> {
        let op = if self.match_symbol("!")? {
            UnaryOp::Not
        } else if self.match_symbol("-")? {
            UnaryOp::Neg
        } else if self.match_symbol("+")? {
            UnaryOp::Plus
        } else {
            return self.parse_primary();
        };
        let operand = self.parse_unary()?;
        Ok(self.rules.push_expr(RuleExpr::Unary { op, operand }))
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseDslError> {
        if self.match_symbol("(")? {
            let inner = self.parse_expression()?;
            if !self.match_symbol(")")? {
                return Err(ParseDslError::RuleSyntax { expected: "`)`" });
            }
            return Ok(inner);
        }
        match self.current {
            RuleToken::Number(value) => {
                self.advance()?;
                Ok(self.rules.push_expr(RuleExpr::Literal(value)))
            }
            RuleToken::Identifier(name) => {
                if !self.resolves(name) {
                    return Err(ParseDslError::UnknownRuleIdentifier(name.to_string()));
                }
                let name = name.to_string();
                self.advance()?;
                Ok(self.rules.push_expr(RuleExpr::Identifier(name)))
            }
            _ => Err(ParseDslError::RuleSyntax {
                expected: "an expression",
            }),
        }
    }
}

fn describe(token: RuleToken) -> String {
    match token {
        RuleToken::Identifier(text) | RuleToken::Symbol(text) => text.to_string(),
        RuleToken::Number(value) => value.to_string(),
        RuleToken::End => String::from("<end of block>"),
    }
}
