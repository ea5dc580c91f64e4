//! Expression parsing implementation
//!
//! Each precedence level is one method; lower levels bind tighter.
//!
//! # Operator Precedence (lowest to highest)
//!
//! 1. Lambda: `lambda x: ...`
//! 2. Conditional: `a if c else b`
//! 3. Boolean: `or`, then `and`, then `not`
//! 4. Comparison (chained): `< > == >= <= != in not in is is not`
//! 5. Bitwise: `|`, then `^`, then `&`
//! 6. Shift: `<< >>`
//! 7. Additive: `+ -`
//! 8. Multiplicative: `* / // %`
//! 9. Unary: `- + ~`
//! 10. Power: `**` (right-associative, binds tighter than a unary on its left)
//! 11. Postfix: calls, subscripts, slices, attribute access
//! 12. Atoms: literals, names, displays, comprehensions, parenthesized forms

use crate::parser::ast::*;
use crate::parser::lexer::{FStringSegment, TokenKind};
use crate::parser::parse::{Parser, SyntaxError};
use crate::rewrite::stamp_location;
use std::rc::Rc;

type ParseFn = fn(&mut Parser) -> Result<Expr, SyntaxError>;

impl Parser {
    /// One or more comma-separated expressions; more than one forms a tuple
    pub(crate) fn parse_testlist(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_sequence(Parser::parse_expression)
    }

    /// Assignment targets of `for` loops and comprehensions
    pub(crate) fn parse_target_list(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_sequence(Parser::parse_bitwise_or)
    }

    fn parse_sequence(&mut self, item: ParseFn) -> Result<Expr, SyntaxError> {
        let loc = self.current_location();
        let first = item(self)?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if !self.can_start_expression() {
                break;
            }
            items.push(item(self)?);
        }
        Ok(Expr::new(ExprKind::Tuple(items), loc))
    }

    /// Parse a single expression (`test` in the grammar)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.enter()?;
        let expr = self.parse_conditional();
        self.leave();
        self.bounded(expr?)
    }

    fn parse_conditional(&mut self) -> Result<Expr, SyntaxError> {
        if self.check(&TokenKind::Lambda) {
            return self.parse_lambda();
        }

        let expr = self.parse_or_test()?;

        if self.match_token(&TokenKind::If) {
            let condition = self.parse_or_test()?;
            self.expect_token(&TokenKind::Else, "expected 'else' after 'if' expression")?;
            let else_expr = self.parse_expression()?;
            let loc = expr.location;
            return Ok(Expr::new(
                ExprKind::IfExp {
                    condition: Box::new(condition),
                    then_expr: Box::new(expr),
                    else_expr: Box::new(else_expr),
                },
                loc,
            ));
        }

        Ok(expr)
    }

    fn parse_lambda(&mut self) -> Result<Expr, SyntaxError> {
        let loc = self.current_location();
        self.advance(); // 'lambda'

        let params = self.parse_parameters(&TokenKind::Colon, false)?;
        self.expect_colon()?;
        let body = self.parse_expression()?;
        let body_loc = body.location;

        Ok(Expr::new(
            ExprKind::Lambda(Rc::new(FunctionDef {
                name: "<lambda>".to_string(),
                params,
                body: vec![Stmt::new(StmtKind::Return(Some(body)), body_loc)],
                location: loc,
            })),
            loc,
        ))
    }

    /// Parameter list of a `def` (closed by `)`) or a `lambda` (closed by `:`)
    pub(crate) fn parse_parameters(
        &mut self,
        closing: &TokenKind,
        annotations: bool,
    ) -> Result<Vec<Param>, SyntaxError> {
        let mut params = Vec::new();

        while !self.check(closing) {
            let loc = self.current_location();
            if matches!(
                self.peek_kind(),
                TokenKind::Star | TokenKind::DoubleStar | TokenKind::Slash
            ) {
                return Err(SyntaxError::new(
                    "star and positional-only parameters are not supported in snippets",
                    loc,
                ));
            }

            let name = self.expect_name()?;
            if annotations && self.match_token(&TokenKind::Colon) {
                self.parse_expression()?;
            }
            let default = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Param {
                name,
                default,
                location: loc,
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    pub(crate) fn parse_or_test(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and_test()?;
        while self.match_token(&TokenKind::Or) {
            let right = self.parse_and_test()?;
            left = self.bounded(bool_op(BoolOp::Or, left, right))?;
        }
        Ok(left)
    }

    fn parse_and_test(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_not_test()?;
        while self.match_token(&TokenKind::And) {
            let right = self.parse_not_test()?;
            left = self.bounded(bool_op(BoolOp::And, left, right))?;
        }
        Ok(left)
    }

    fn parse_not_test(&mut self) -> Result<Expr, SyntaxError> {
        let loc = self.current_location();
        if self.match_token(&TokenKind::Not) {
            self.enter()?;
            let operand = self.parse_not_test();
            self.leave();
            let operand = operand?;
            return Ok(Expr::new(
                ExprKind::UnaryOp {
                    op: UnOp::Not,
                    operand: Box::new(operand),
                },
                loc,
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_bitwise_or()?;

        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = self.match_comparison_operator() {
            ops.push(op);
            comparators.push(self.parse_bitwise_or()?);
        }

        if ops.is_empty() {
            return Ok(left);
        }

        let loc = left.location;
        Ok(Expr::new(
            ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
            loc,
        ))
    }

    fn match_comparison_operator(&mut self) -> Option<CmpOp> {
        let op = match self.peek_kind() {
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::Le => CmpOp::LtE,
            TokenKind::Ge => CmpOp::GtE,
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::NotEq,
            TokenKind::In => CmpOp::In,
            TokenKind::Not if self.peek_ahead(1) == Some(&TokenKind::In) => {
                self.advance();
                CmpOp::NotIn
            }
            TokenKind::Is => {
                if self.peek_ahead(1) == Some(&TokenKind::Not) {
                    self.advance();
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                }
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_binary_level(
        &mut self,
        operand: ParseFn,
        operator: fn(&TokenKind) -> Option<BinOp>,
    ) -> Result<Expr, SyntaxError> {
        let mut left = operand(self)?;
        while let Some(op) = operator(self.peek_kind()) {
            self.advance();
            let right = operand(self)?;
            let loc = left.location;
            left = self.bounded(Expr::new(
                ExprKind::BinaryOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                loc,
            ))?;
        }
        Ok(left)
    }

    pub(crate) fn parse_bitwise_or(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_binary_level(Parser::parse_bitwise_xor, |kind| {
            matches!(kind, TokenKind::Pipe).then_some(BinOp::BitOr)
        })
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_binary_level(Parser::parse_bitwise_and, |kind| {
            matches!(kind, TokenKind::Caret).then_some(BinOp::BitXor)
        })
    }

    fn parse_bitwise_and(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_binary_level(Parser::parse_shift, |kind| {
            matches!(kind, TokenKind::Amp).then_some(BinOp::BitAnd)
        })
    }

    fn parse_shift(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_binary_level(Parser::parse_additive, |kind| match kind {
            TokenKind::LtLt => Some(BinOp::Shl),
            TokenKind::GtGt => Some(BinOp::Shr),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_binary_level(Parser::parse_multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_binary_level(Parser::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::DoubleSlash => Some(BinOp::FloorDiv),
            TokenKind::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let loc = self.current_location();
        let op = match self.peek_kind() {
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Plus => UnOp::Pos,
            TokenKind::Tilde => UnOp::Invert,
            _ => return self.parse_power(),
        };
        if op == UnOp::Neg && self.negates_int_min() {
            self.advance();
            self.advance();
            return Ok(Expr::new(ExprKind::Int(i64::MIN), loc));
        }
        self.advance();
        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        let operand = operand?;
        Ok(Expr::new(
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            loc,
        ))
    }

    /// `-9223372036854775808` with nothing binding tighter than the minus
    fn negates_int_min(&self) -> bool {
        self.peek_ahead(1) == Some(&TokenKind::IntMinMagnitude)
            && !matches!(
                self.peek_ahead(2),
                Some(
                    TokenKind::DoubleStar
                        | TokenKind::LParen
                        | TokenKind::LBracket
                        | TokenKind::Dot
                )
            )
    }

    fn parse_power(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.parse_postfix()?;
        if !self.match_token(&TokenKind::DoubleStar) {
            return Ok(base);
        }
        self.enter()?;
        let exponent = self.parse_unary();
        self.leave();
        let exponent = exponent?;
        let loc = base.location;
        Ok(Expr::new(
            ExprKind::BinaryOp {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            },
            loc,
        ))
    }

    /// Calls, subscripts and attribute access chained onto an atom
    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_atom()?;

        loop {
            let loc = expr.location;
            if self.match_token(&TokenKind::LParen) {
                let (args, keywords) = self.parse_call_arguments()?;
                expr = Expr::new(
                    ExprKind::Call {
                        func: Box::new(expr),
                        args,
                        keywords,
                    },
                    loc,
                );
            } else if self.match_token(&TokenKind::LBracket) {
                let index = self.parse_subscript()?;
                self.expect_token(&TokenKind::RBracket, "expected ']'")?;
                expr = Expr::new(
                    ExprKind::Subscript {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    loc,
                );
            } else if self.match_token(&TokenKind::Dot) {
                let name = self.expect_name()?;
                expr = Expr::new(
                    ExprKind::Attribute {
                        object: Box::new(expr),
                        name,
                    },
                    loc,
                );
            } else {
                break;
            }
            expr = self.bounded(expr)?;
        }

        Ok(expr)
    }

    fn parse_call_arguments(&mut self) -> Result<(Vec<Expr>, Vec<Keyword>), SyntaxError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        while !self.check(&TokenKind::RParen) {
            let loc = self.current_location();
            if matches!(self.peek_kind(), TokenKind::Star | TokenKind::DoubleStar) {
                return Err(SyntaxError::new(
                    "star arguments are not supported in snippets",
                    loc,
                ));
            }

            let keyword = match (self.peek_kind(), self.peek_ahead(1)) {
                (TokenKind::Name(name), Some(TokenKind::Eq)) => Some(name.clone()),
                _ => None,
            };

            if let Some(name) = keyword {
                self.advance();
                self.advance();
                let value = self.parse_expression()?;
                keywords.push(Keyword { name, value });
            } else {
                if !keywords.is_empty() {
                    return Err(SyntaxError::new(
                        "positional argument follows keyword argument",
                        loc,
                    ));
                }
                let arg = self.parse_expression()?;
                if self.check(&TokenKind::For) {
                    args.push(self.parse_list_comprehension(arg)?);
                } else {
                    args.push(arg);
                }
            }

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_token(&TokenKind::RParen, "expected ')'")?;
        Ok((args, keywords))
    }

    /// Subscript contents: an index, a slice, or a tuple of them
    fn parse_subscript(&mut self) -> Result<Expr, SyntaxError> {
        let loc = self.current_location();
        let first = self.parse_slice_item()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_slice_item()?);
        }
        Ok(Expr::new(ExprKind::Tuple(items), loc))
    }

    fn parse_slice_item(&mut self) -> Result<Expr, SyntaxError> {
        let loc = self.current_location();

        let lower = if self.check(&TokenKind::Colon) {
            None
        } else {
            let expr = self.parse_expression()?;
            if !self.check(&TokenKind::Colon) {
                return Ok(expr);
            }
            Some(Box::new(expr))
        };
        self.expect_colon()?;

        let upper = if self.slice_bound_follows() {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        let step = if self.match_token(&TokenKind::Colon) && self.slice_bound_follows() {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Ok(Expr::new(ExprKind::Slice { lower, upper, step }, loc))
    }

    fn slice_bound_follows(&self) -> bool {
        !matches!(
            self.peek_kind(),
            TokenKind::Colon | TokenKind::RBracket | TokenKind::Comma
        )
    }

    fn parse_atom(&mut self) -> Result<Expr, SyntaxError> {
        let loc = self.current_location();

        let kind = match self.peek_kind() {
            TokenKind::Int(n) => ExprKind::Int(*n),
            TokenKind::IntMinMagnitude => {
                return Err(SyntaxError::new(
                    "integer literal '9223372036854775808' does not fit in 64 bits",
                    loc,
                ));
            }
            TokenKind::Float(n) => ExprKind::Float(*n),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::None => ExprKind::NoneLiteral,
            TokenKind::Name(name) => ExprKind::Name(name.clone()),
            TokenKind::Str(_) | TokenKind::FString(_) => return self.parse_strings(),
            TokenKind::LParen => return self.parse_parenthesized(),
            TokenKind::LBracket => return self.parse_list_display(),
            TokenKind::LBrace => return self.parse_dict_display(),
            TokenKind::Lambda => return self.parse_lambda(),
            _ => return Err(self.unexpected()),
        };
        self.advance();

        Ok(Expr::new(kind, loc))
    }

    /// Adjacent string literals concatenate; any f-string makes the whole an f-string
    fn parse_strings(&mut self) -> Result<Expr, SyntaxError> {
        let loc = self.current_location();
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut formatted = false;

        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Str(text) => push_literal(&mut parts, text),
                TokenKind::FString(segments) => {
                    formatted = true;
                    for segment in segments {
                        match segment {
                            FStringSegment::Literal(text) => push_literal(&mut parts, text),
                            FStringSegment::Field {
                                source,
                                conversion,
                                spec,
                            } => parts.push(FStringPart::Field {
                                expr: Box::new(self.parse_fstring_field(&source, token.location)?),
                                conversion,
                                spec,
                            }),
                        }
                    }
                }
                _ => break,
            }
            self.advance();
        }

        if formatted {
            return Ok(Expr::new(ExprKind::FString(parts), loc));
        }

        let text = parts
            .into_iter()
            .map(|part| match part {
                FStringPart::Literal(text) => text,
                FStringPart::Field { .. } => String::new(),
            })
            .collect();
        Ok(Expr::new(ExprKind::Str(text), loc))
    }

    fn parse_parenthesized(&mut self) -> Result<Expr, SyntaxError> {
        let loc = self.current_location();
        self.advance(); // '('

        if self.match_token(&TokenKind::RParen) {
            return Ok(Expr::new(ExprKind::Tuple(Vec::new()), loc));
        }

        let first = self.parse_expression()?;

        if self.check(&TokenKind::For) {
            // Generator expressions are evaluated eagerly as lists
            let comprehension = self.parse_list_comprehension(first)?;
            self.expect_token(&TokenKind::RParen, "expected ')'")?;
            return Ok(comprehension);
        }

        if self.match_token(&TokenKind::RParen) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RParen) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_token(&TokenKind::RParen, "expected ')'")?;

        Ok(Expr::new(ExprKind::Tuple(items), loc))
    }

    fn parse_list_display(&mut self) -> Result<Expr, SyntaxError> {
        let loc = self.current_location();
        self.advance(); // '['

        let mut items = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            let item = self.parse_expression()?;
            if items.is_empty() && self.check(&TokenKind::For) {
                let mut comprehension = self.parse_list_comprehension(item)?;
                comprehension.location = loc;
                self.expect_token(&TokenKind::RBracket, "expected ']'")?;
                return Ok(comprehension);
            }
            items.push(item);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RBracket, "expected ']'")?;

        Ok(Expr::new(ExprKind::List(items), loc))
    }

    fn parse_dict_display(&mut self) -> Result<Expr, SyntaxError> {
        let loc = self.current_location();
        self.advance(); // '{'

        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = self.parse_expression()?;
            if !self.check(&TokenKind::Colon) {
                return Err(SyntaxError::new(
                    "set displays are not supported in snippets",
                    key.location,
                ));
            }
            self.advance();
            let value = self.parse_expression()?;

            if entries.is_empty() && self.check(&TokenKind::For) {
                let generators = self.parse_comprehension_clauses()?;
                self.expect_token(&TokenKind::RBrace, "expected '}'")?;
                return Ok(Expr::new(
                    ExprKind::DictComp {
                        key: Box::new(key),
                        value: Box::new(value),
                        generators,
                    },
                    loc,
                ));
            }

            entries.push((key, value));
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RBrace, "expected '}'")?;

        Ok(Expr::new(ExprKind::Dict(entries), loc))
    }

    fn parse_list_comprehension(&mut self, element: Expr) -> Result<Expr, SyntaxError> {
        let loc = element.location;
        let generators = self.parse_comprehension_clauses()?;
        Ok(Expr::new(
            ExprKind::ListComp {
                element: Box::new(element),
                generators,
            },
            loc,
        ))
    }

    fn parse_comprehension_clauses(&mut self) -> Result<Vec<Comprehension>, SyntaxError> {
        let mut generators = Vec::new();

        while self.match_token(&TokenKind::For) {
            let target = self.parse_target_list()?;
            self.expect_token(&TokenKind::In, "expected 'in'")?;
            let iter = self.parse_or_test()?;
            let mut conditions = Vec::new();
            while self.match_token(&TokenKind::If) {
                conditions.push(self.parse_or_test()?);
            }
            generators.push(Comprehension {
                target,
                iter,
                conditions,
            });
        }

        Ok(generators)
    }

    fn can_start_expression(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Int(_)
                | TokenKind::IntMinMagnitude
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::FString(_)
                | TokenKind::Name(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::None
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Minus
                | TokenKind::Plus
                | TokenKind::Tilde
                | TokenKind::Not
                | TokenKind::Lambda
        )
    }
}

fn bool_op(op: BoolOp, left: Expr, right: Expr) -> Expr {
    let loc = left.location;
    Expr::new(
        ExprKind::BoolOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        loc,
    )
}

fn push_literal(parts: &mut Vec<FStringPart>, text: String) {
    if let Some(FStringPart::Literal(last)) = parts.last_mut() {
        last.push_str(&text);
    } else {
        parts.push(FStringPart::Literal(text));
    }
}

impl Parser {
    /// Parse the expression inside an f-string replacement field. Every node is
    /// stamped with the location of the f-string token it came from.
    fn parse_fstring_field(
        &self,
        source: &str,
        location: SourceLocation,
    ) -> Result<Expr, SyntaxError> {
        let relocate = |mut err: SyntaxError| {
            err.location = location;
            err.message = format!("f-string: {}", err.message);
            err
        };

        let mut parser = Parser::new(source).map_err(relocate)?;
        parser.depth = self.depth;
        let mut expr = parser.parse_testlist().map_err(relocate)?;
        parser.match_token(&TokenKind::Newline);
        if !parser.is_at_end() {
            return Err(SyntaxError::new("f-string: invalid syntax", location));
        }

        stamp_location(&mut expr, location);
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::constants::{MAX_EXPR_HEIGHT, MAX_NESTING_DEPTH};
    use crate::parser::ast::*;
    use crate::parser::parse::{Parser, SyntaxError};

    fn expr(source: &str) -> Expr {
        let program = Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .unwrap_or_else(|e| panic!("Parse failed: {}", e));
        match program.body.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Expr(expr)) => expr,
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match expr("1 + 2 * 3").kind {
            ExprKind::BinaryOp {
                op: BinOp::Add,
                right,
                ..
            } => {
                assert!(matches!(right.kind, ExprKind::BinaryOp { op: BinOp::Mul, .. }));
            }
            other => panic!("Expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_power_binds_tighter_than_unary_minus() {
        match expr("-2 ** 2").kind {
            ExprKind::UnaryOp { op: UnOp::Neg, operand } => {
                assert!(matches!(operand.kind, ExprKind::BinaryOp { op: BinOp::Pow, .. }));
            }
            other => panic!("Expected negation, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_comparison() {
        match expr("a < b <= c").kind {
            ExprKind::Compare { ops, comparators, .. } => {
                assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE]);
                assert_eq!(comparators.len(), 2);
            }
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_not_in_and_is_not() {
        match expr("a not in b").kind {
            ExprKind::Compare { ops, .. } => assert_eq!(ops, vec![CmpOp::NotIn]),
            other => panic!("Expected comparison, got {:?}", other),
        }
        match expr("a is not None").kind {
            ExprKind::Compare { ops, .. } => assert_eq!(ops, vec![CmpOp::IsNot]),
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_expression() {
        assert!(matches!(expr("1 if x else 2").kind, ExprKind::IfExp { .. }));
    }

    #[test]
    fn test_call_with_keywords() {
        match expr("print(1, 2, sep='-', end='')").kind {
            ExprKind::Call { args, keywords, .. } => {
                assert_eq!(args.len(), 2);
                assert_eq!(keywords.len(), 2);
                assert_eq!(keywords[0].name, "sep");
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_slices() {
        match expr("xs[1:-1:2]").kind {
            ExprKind::Subscript { index, .. } => {
                assert!(matches!(
                    index.kind,
                    ExprKind::Slice {
                        lower: Some(_),
                        upper: Some(_),
                        step: Some(_)
                    }
                ));
            }
            other => panic!("Expected subscript, got {:?}", other),
        }
        match expr("xs[::-1]").kind {
            ExprKind::Subscript { index, .. } => {
                assert!(matches!(
                    index.kind,
                    ExprKind::Slice {
                        lower: None,
                        upper: None,
                        step: Some(_)
                    }
                ));
            }
            other => panic!("Expected subscript, got {:?}", other),
        }
    }

    #[test]
    fn test_comprehensions() {
        assert!(matches!(
            expr("[x * 2 for x in range(3) if x]").kind,
            ExprKind::ListComp { .. }
        ));
        assert!(matches!(
            expr("{k: v for k, v in pairs}").kind,
            ExprKind::DictComp { .. }
        ));
        match expr("sum(x for x in xs)").kind {
            ExprKind::Call { args, .. } => {
                assert!(matches!(args[0].kind, ExprKind::ListComp { .. }));
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_tuple_and_parenthesized() {
        assert!(matches!(expr("(1)").kind, ExprKind::Int(1)));
        assert!(matches!(&expr("(1,)").kind, ExprKind::Tuple(items) if items.len() == 1));
        assert!(matches!(&expr("()").kind, ExprKind::Tuple(items) if items.is_empty()));
        assert!(matches!(&expr("1, 2").kind, ExprKind::Tuple(items) if items.len() == 2));
    }

    #[test]
    fn test_lambda() {
        match expr("lambda a, b=1: a + b").kind {
            ExprKind::Lambda(def) => {
                assert_eq!(def.name, "<lambda>");
                assert_eq!(def.params.len(), 2);
                assert!(matches!(def.body[0].kind, StmtKind::Return(Some(_))));
            }
            other => panic!("Expected lambda, got {:?}", other),
        }
    }

    #[test]
    fn test_fstring_fields_are_parsed() {
        let program = Parser::new("\n\nf'{a + 1:>4} and {b!r}'")
            .and_then(|mut p| p.parse_program())
            .unwrap();
        match &program.body[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::FString(parts),
                ..
            }) => {
                assert_eq!(parts.len(), 3);
                match &parts[0] {
                    FStringPart::Field { expr, spec, .. } => {
                        assert_eq!(spec.as_deref(), Some(">4"));
                        assert_eq!(expr.location.line, 3);
                        assert!(matches!(expr.kind, ExprKind::BinaryOp { .. }));
                    }
                    other => panic!("Expected field, got {:?}", other),
                }
            }
            other => panic!("Expected f-string, got {:?}", other),
        }
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        assert!(matches!(&expr("'ab' 'cd'").kind, ExprKind::Str(s) if s == "abcd"));
    }

    fn parse_err(source: &str) -> SyntaxError {
        match Parser::new(source).and_then(|mut p| p.parse_program()) {
            Ok(program) => panic!("Expected syntax error, got {:?}", program.body.len()),
            Err(err) => err,
        }
    }

    #[test]
    fn test_negated_int_min_literal() {
        assert!(matches!(expr("-9223372036854775808").kind, ExprKind::Int(i64::MIN)));
        match expr("x - -9223372036854775808").kind {
            ExprKind::BinaryOp { right, .. } => {
                assert!(matches!(right.kind, ExprKind::Int(i64::MIN)));
            }
            other => panic!("Expected subtraction, got {:?}", other),
        }

        for source in [
            "9223372036854775808",
            "-9223372036854775808 ** 2",
            "- 9223372036854775808 .real",
        ] {
            let err = parse_err(source);
            assert_eq!(
                err.message,
                "integer literal '9223372036854775808' does not fit in 64 bits",
                "{}",
                source
            );
        }
    }

    fn nested(open: &str, close: &str, levels: usize) -> String {
        format!("{}1{}", open.repeat(levels), close.repeat(levels))
    }

    #[test]
    fn test_nesting_within_limit() {
        let list = expr(&nested("[", "]", MAX_NESTING_DEPTH - 1));
        assert_eq!(list.height as usize, MAX_NESTING_DEPTH);
        expr(&nested("f(", ")", 30));
        expr(&format!("{}1", "-".repeat(30)));
    }

    #[test]
    fn test_too_many_nested_brackets() {
        for (open, close) in [("(", ")"), ("[", "]"), ("{1: ", "}"), ("f(", ")")] {
            let err = parse_err(&nested(open, close, 100));
            assert_eq!(err.message, "too many nested parentheses", "{}", open);
        }
        let err = parse_err(&nested("(", ")", 100_000));
        assert_eq!(err.message, "too many nested parentheses");
        let err = parse_err(&"(".repeat(100_000));
        assert_eq!(err.message, "'(' was never closed");
    }

    #[test]
    fn test_long_unary_and_power_chains() {
        let err = parse_err(&format!("{}1", "-".repeat(100_000)));
        assert_eq!(err.message, "expression is nested too deeply");
        let err = parse_err(&format!("{}x", "not ".repeat(1_000)));
        assert_eq!(err.message, "expression is nested too deeply");
        let err = parse_err(&vec!["2"; 1_000].join(" ** "));
        assert_eq!(err.message, "expression is nested too deeply");
    }

    #[test]
    fn test_operator_chain_height_is_bounded() {
        let fits = vec!["1"; MAX_EXPR_HEIGHT as usize].join(" + ");
        assert_eq!(expr(&fits).height, MAX_EXPR_HEIGHT);

        for separator in [" + ", " or ", " * ", " | "] {
            let err = parse_err(&vec!["x"; 100_000].join(separator));
            assert_eq!(err.message, "expression is too long or nested too deeply");
        }
        let err = parse_err(&format!("x{}", ".y".repeat(100_000)));
        assert_eq!(err.message, "expression is too long or nested too deeply");
        let err = parse_err(&format!("x{}", "()".repeat(100_000)));
        assert_eq!(err.message, "expression is too long or nested too deeply");
    }

    #[test]
    fn test_nesting_depth_carries_into_fstring_fields() {
        let source = format!(
            "{}f'{{x}}'{}",
            "(".repeat(MAX_NESTING_DEPTH - 1),
            ")".repeat(MAX_NESTING_DEPTH - 1)
        );
        let err = parse_err(&source);
        assert!(err.message.starts_with("f-string: "), "{}", err.message);
        assert!(err.message.ends_with("nested too deeply"), "{}", err.message);
    }
}
