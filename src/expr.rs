//! The IF-condition expression language.
//!
//! Conditions support comparisons, boolean connectives, a little arithmetic,
//! number/string literals, the reserved words `null` / `true` / `false`, and
//! bare (possibly dotted) identifiers that resolve against the parameter
//! context at render time. A condition is lexed and parsed once, at template
//! parse time; evaluation happens per render pass.
//!
//! Missing parameters resolve to null rather than erroring, so the common
//! `/*IF name != null*/` guard works for optional parameters. The final
//! result of a condition must be boolean; anything else is reported as an
//! illegal boolean expression.

use crate::context::CommandContext;
use crate::error::{Result, TwoSqlError};
use crate::types::ParamValue;

/// One token of a condition expression.
#[derive(Debug, Clone, PartialEq)]
enum ExprToken {
    Number(f64),
    Str(String),
    Ident(String),
    Null,
    True,
    False,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

/// Parsed form of a condition expression.
#[derive(Debug, Clone)]
pub enum ExprAst {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    /// Parameter reference, resolved through the context at evaluation time
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<ExprAst>,
    },
    Binary {
        op: BinaryOp,
        left: Box<ExprAst>,
        right: Box<ExprAst>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Parse a condition expression into its AST.
///
/// Fails with [`TwoSqlError::IllegalBoolExpression`] on malformed input so
/// that a bad condition is rejected when the template is parsed, not when it
/// is first rendered.
pub fn parse_expression(expression: &str) -> Result<ExprAst> {
    let tokens = lex(expression)
        .map_err(|msg| TwoSqlError::illegal_bool_expression(expression, msg))?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let ast = parser
        .or_expr()
        .map_err(|msg| TwoSqlError::illegal_bool_expression(expression, msg))?;
    if parser.pos != parser.tokens.len() {
        return Err(TwoSqlError::illegal_bool_expression(
            expression,
            format!("unexpected trailing token {:?}", parser.tokens[parser.pos]),
        ));
    }
    Ok(ast)
}

/// Evaluate a condition to its boolean result.
///
/// `expression` is the original condition text, carried for diagnostics.
pub fn evaluate_condition(
    ast: &ExprAst,
    ctx: &CommandContext<'_>,
    expression: &str,
) -> Result<bool> {
    let value = evaluate(ast, ctx)
        .map_err(|msg| TwoSqlError::illegal_bool_expression(expression, msg))?;
    match value {
        ParamValue::Boolean(b) => Ok(b),
        other => Err(TwoSqlError::illegal_bool_expression(
            expression,
            format!("condition evaluated to non-boolean value {}", other),
        )),
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// Characters that terminate a bare symbol.
fn is_symbol_boundary(c: char) -> bool {
    c.is_whitespace() || "=+-*/^()!<>&|".contains(c)
}

fn lex(text: &str) -> std::result::Result<Vec<ExprToken>, String> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        // Number literal first, then operator, then catch-all symbol.
        if let Some((len, value)) = lex_number(rest) {
            tokens.push(ExprToken::Number(value));
            rest = rest[len..].trim_start();
            continue;
        }
        if let Some((len, token)) = lex_operator(rest) {
            tokens.push(token);
            rest = rest[len..].trim_start();
            continue;
        }
        if let Some(stripped) = rest.strip_prefix('\'') {
            let close = stripped
                .find('\'')
                .ok_or_else(|| format!("unterminated string literal in {:?}", rest))?;
            tokens.push(ExprToken::Str(stripped[..close].to_string()));
            rest = stripped[close + 1..].trim_start();
            continue;
        }
        let end = rest
            .find(is_symbol_boundary)
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(format!("unexpected character {:?}", &rest[..1]));
        }
        let word = &rest[..end];
        tokens.push(match word.to_ascii_lowercase().as_str() {
            "null" => ExprToken::Null,
            "true" => ExprToken::True,
            "false" => ExprToken::False,
            _ => ExprToken::Ident(word.to_string()),
        });
        rest = rest[end..].trim_start();
    }

    Ok(tokens)
}

fn lex_number(rest: &str) -> Option<(usize, f64)> {
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let mut end = digits;
    let after = &rest[digits..];
    if let Some(frac) = after.strip_prefix('.') {
        let frac_digits = frac.chars().take_while(|c| c.is_ascii_digit()).count();
        if frac_digits > 0 {
            end = digits + 1 + frac_digits;
        }
    }
    rest[..end].parse().ok().map(|v| (end, v))
}

fn lex_operator(rest: &str) -> Option<(usize, ExprToken)> {
    const TWO_CHAR: [(&str, ExprToken); 6] = [
        ("&&", ExprToken::And),
        ("||", ExprToken::Or),
        ("<=", ExprToken::Le),
        (">=", ExprToken::Ge),
        ("==", ExprToken::Eq),
        ("!=", ExprToken::Ne),
    ];
    for (pat, token) in TWO_CHAR {
        if rest.starts_with(pat) {
            return Some((2, token));
        }
    }
    let token = match rest.chars().next()? {
        '=' => ExprToken::Eq,
        '<' => ExprToken::Lt,
        '>' => ExprToken::Gt,
        '!' => ExprToken::Not,
        '+' => ExprToken::Plus,
        '-' => ExprToken::Minus,
        '*' => ExprToken::Star,
        '/' => ExprToken::Slash,
        '^' => ExprToken::Caret,
        '(' => ExprToken::LParen,
        ')' => ExprToken::RParen,
        _ => return None,
    };
    Some((1, token))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct ExprParser {
    tokens: Vec<ExprToken>,
    pos: usize,
}

type ParseResult = std::result::Result<ExprAst, String>;

impl ExprParser {
    fn peek(&self) -> Option<&ExprToken> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<ExprToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn or_expr(&mut self) -> ParseResult {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&ExprToken::Or) {
            self.bump();
            let right = self.and_expr()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> ParseResult {
        let mut left = self.equality_expr()?;
        while self.peek() == Some(&ExprToken::And) {
            self.bump();
            let right = self.equality_expr()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> ParseResult {
        let mut left = self.relational_expr()?;
        loop {
            let op = match self.peek() {
                Some(ExprToken::Eq) => BinaryOp::Eq,
                Some(ExprToken::Ne) => BinaryOp::Ne,
                _ => break,
            };
            self.bump();
            let right = self.relational_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn relational_expr(&mut self) -> ParseResult {
        let mut left = self.additive_expr()?;
        loop {
            let op = match self.peek() {
                Some(ExprToken::Lt) => BinaryOp::Lt,
                Some(ExprToken::Le) => BinaryOp::Le,
                Some(ExprToken::Gt) => BinaryOp::Gt,
                Some(ExprToken::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.bump();
            let right = self.additive_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn additive_expr(&mut self) -> ParseResult {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Some(ExprToken::Plus) => BinaryOp::Add,
                Some(ExprToken::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.multiplicative_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn multiplicative_expr(&mut self) -> ParseResult {
        let mut left = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Some(ExprToken::Star) => BinaryOp::Mul,
                Some(ExprToken::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.bump();
            let right = self.unary_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> ParseResult {
        match self.peek() {
            Some(ExprToken::Not) => {
                self.bump();
                let operand = self.unary_expr()?;
                Ok(unary(UnaryOp::Not, operand))
            }
            Some(ExprToken::Minus) => {
                self.bump();
                let operand = self.unary_expr()?;
                Ok(unary(UnaryOp::Neg, operand))
            }
            _ => self.power_expr(),
        }
    }

    /// `^` is exponentiation, right-associative, tighter than unary.
    fn power_expr(&mut self) -> ParseResult {
        let base = self.primary_expr()?;
        if self.peek() == Some(&ExprToken::Caret) {
            self.bump();
            let exponent = self.unary_expr()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary_expr(&mut self) -> ParseResult {
        match self.bump() {
            Some(ExprToken::Number(v)) => Ok(ExprAst::Number(v)),
            Some(ExprToken::Str(s)) => Ok(ExprAst::Str(s)),
            Some(ExprToken::Ident(name)) => Ok(ExprAst::Ident(name)),
            Some(ExprToken::Null) => Ok(ExprAst::Null),
            Some(ExprToken::True) => Ok(ExprAst::Bool(true)),
            Some(ExprToken::False) => Ok(ExprAst::Bool(false)),
            Some(ExprToken::LParen) => {
                let inner = self.or_expr()?;
                match self.bump() {
                    Some(ExprToken::RParen) => Ok(inner),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(other) => Err(format!("unexpected token {:?}", other)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

fn binary(op: BinaryOp, left: ExprAst, right: ExprAst) -> ExprAst {
    ExprAst::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn unary(op: UnaryOp, operand: ExprAst) -> ExprAst {
    ExprAst::Unary {
        op,
        operand: Box::new(operand),
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

type EvalResult = std::result::Result<ParamValue, String>;

fn evaluate(ast: &ExprAst, ctx: &CommandContext<'_>) -> EvalResult {
    match ast {
        ExprAst::Number(v) => Ok(ParamValue::Float64(*v)),
        ExprAst::Str(s) => Ok(ParamValue::Utf8(s.clone())),
        ExprAst::Bool(b) => Ok(ParamValue::Boolean(*b)),
        ExprAst::Null => Ok(ParamValue::Null),
        ExprAst::Ident(name) => Ok(ctx.arg(name)),
        ExprAst::Unary { op, operand } => {
            let value = evaluate(operand, ctx)?;
            match op {
                UnaryOp::Not => match value {
                    ParamValue::Boolean(b) => Ok(ParamValue::Boolean(!b)),
                    other => Err(format!("cannot apply ! to {}", other)),
                },
                UnaryOp::Neg => match value {
                    ParamValue::Int64(v) => Ok(ParamValue::Int64(-v)),
                    ParamValue::Float64(v) => Ok(ParamValue::Float64(-v)),
                    other => Err(format!("cannot negate {}", other)),
                },
            }
        }
        ExprAst::Binary { op, left, right } => match op {
            // Boolean connectives short-circuit.
            BinaryOp::And => {
                if !eval_bool(left, ctx, "&&")? {
                    return Ok(ParamValue::Boolean(false));
                }
                Ok(ParamValue::Boolean(eval_bool(right, ctx, "&&")?))
            }
            BinaryOp::Or => {
                if eval_bool(left, ctx, "||")? {
                    return Ok(ParamValue::Boolean(true));
                }
                Ok(ParamValue::Boolean(eval_bool(right, ctx, "||")?))
            }
            BinaryOp::Eq => {
                let (l, r) = (evaluate(left, ctx)?, evaluate(right, ctx)?);
                Ok(ParamValue::Boolean(values_equal(&l, &r)))
            }
            BinaryOp::Ne => {
                let (l, r) = (evaluate(left, ctx)?, evaluate(right, ctx)?);
                Ok(ParamValue::Boolean(!values_equal(&l, &r)))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let (l, r) = (evaluate(left, ctx)?, evaluate(right, ctx)?);
                let ordering = compare_values(&l, &r)?;
                let result = match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                };
                Ok(ParamValue::Boolean(result))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
                let (l, r) = (evaluate(left, ctx)?, evaluate(right, ctx)?);
                arithmetic(*op, &l, &r)
            }
        },
    }
}

fn eval_bool(ast: &ExprAst, ctx: &CommandContext<'_>, op: &str) -> std::result::Result<bool, String> {
    match evaluate(ast, ctx)? {
        ParamValue::Boolean(b) => Ok(b),
        other => Err(format!("operand of {} is not boolean: {}", op, other)),
    }
}

/// Null-safe equality: null only equals null; mismatched types are unequal.
fn values_equal(l: &ParamValue, r: &ParamValue) -> bool {
    match (l, r) {
        (ParamValue::Null, ParamValue::Null) => true,
        (ParamValue::Null, _) | (_, ParamValue::Null) => false,
        _ => match (as_f64(l), as_f64(r)) {
            (Some(a), Some(b)) => a == b,
            _ => l == r,
        },
    }
}

fn compare_values(
    l: &ParamValue,
    r: &ParamValue,
) -> std::result::Result<std::cmp::Ordering, String> {
    if let (Some(a), Some(b)) = (as_f64(l), as_f64(r)) {
        return a
            .partial_cmp(&b)
            .ok_or_else(|| "cannot order NaN".to_string());
    }
    match (l, r) {
        (ParamValue::Utf8(a), ParamValue::Utf8(b)) => Ok(a.cmp(b)),
        (ParamValue::Date(a), ParamValue::Date(b)) => Ok(a.cmp(b)),
        (ParamValue::Timestamp(a), ParamValue::Timestamp(b)) => Ok(a.cmp(b)),
        _ => Err(format!("cannot order {} and {}", l, r)),
    }
}

fn arithmetic(op: BinaryOp, l: &ParamValue, r: &ParamValue) -> EvalResult {
    if op == BinaryOp::Add {
        if let (ParamValue::Utf8(a), ParamValue::Utf8(b)) = (l, r) {
            return Ok(ParamValue::Utf8(format!("{}{}", a, b)));
        }
    }
    let (a, b) = match (as_f64(l), as_f64(r)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(format!("cannot apply arithmetic to {} and {}", l, r)),
    };
    // Integer-valued inputs stay integer except for / and ^.
    let both_int = matches!((l, r), (ParamValue::Int64(_), ParamValue::Int64(_)));
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err("division by zero".to_string());
            }
            a / b
        }
        BinaryOp::Pow => a.powf(b),
        _ => unreachable!("non-arithmetic operator"),
    };
    if both_int && matches!(op, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul) {
        Ok(ParamValue::Int64(result as i64))
    } else {
        Ok(ParamValue::Float64(result))
    }
}

fn as_f64(value: &ParamValue) -> Option<f64> {
    match value {
        ParamValue::Int64(v) => Some(*v as f64),
        ParamValue::Float64(v) => Some(*v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BindStyle;
    use crate::types::Params;

    fn eval(expression: &str, params: Params) -> Result<bool> {
        let ast = parse_expression(expression)?;
        let ctx = CommandContext::root(params, BindStyle::Question);
        evaluate_condition(&ast, &ctx, expression)
    }

    #[test]
    fn test_null_guard_true_when_bound() {
        let params = Params::new().with("sarary", 1000);
        assert!(eval("sarary != null", params).unwrap());
    }

    #[test]
    fn test_null_guard_false_when_missing() {
        assert!(!eval("sarary != null", Params::new()).unwrap());
    }

    #[test]
    fn test_comparison_and_connectives() {
        let params = Params::new().with("age", 30).with("job", "CLERK");
        assert!(eval("age >= 18 && job == 'CLERK'", params.clone()).unwrap());
        assert!(!eval("age < 18 || job != 'CLERK'", params).unwrap());
    }

    #[test]
    fn test_single_equals_is_equality() {
        let params = Params::new().with("deptno", 20);
        assert!(eval("deptno = 20", params).unwrap());
    }

    #[test]
    fn test_dotted_identifier() {
        let params = Params::new().with(
            "emp",
            ParamValue::Map(
                [("name".to_string(), ParamValue::Utf8("SCOTT".into()))]
                    .into_iter()
                    .collect(),
            ),
        );
        assert!(eval("emp.name == 'SCOTT'", params.clone()).unwrap());
        // Missing member resolves to null rather than erroring.
        assert!(eval("emp.missing == null", params).unwrap());
    }

    #[test]
    fn test_arithmetic_and_power() {
        let params = Params::new().with("n", 3);
        assert!(eval("n * 2 + 1 == 7", params.clone()).unwrap());
        assert!(eval("n ^ 2 == 9", params).unwrap());
    }

    #[test]
    fn test_unary_not_and_parens() {
        let params = Params::new().with("active", true);
        assert!(!eval("!(active || false)", params).unwrap());
    }

    #[test]
    fn test_non_boolean_result_is_error() {
        let err = eval("1 + 1", Params::new()).unwrap_err();
        assert!(matches!(err, TwoSqlError::IllegalBoolExpression { .. }));
    }

    #[test]
    fn test_relational_on_null_is_error() {
        let err = eval("missing > 5", Params::new()).unwrap_err();
        assert!(matches!(err, TwoSqlError::IllegalBoolExpression { .. }));
    }

    #[test]
    fn test_malformed_expression_fails_at_parse() {
        assert!(parse_expression("a <").is_err());
        assert!(parse_expression("(a == 1").is_err());
        assert!(parse_expression("== 1").is_err());
    }

    #[test]
    fn test_string_concatenation() {
        let params = Params::new().with("first", "AB").with("last", "CD");
        assert!(eval("first + last == 'ABCD'", params).unwrap());
    }

    #[test]
    fn test_reserved_words_case_insensitive() {
        let params = Params::new().with("a", 1);
        assert!(eval("a != NULL", params).unwrap());
        assert!(eval("TRUE", Params::new()).unwrap());
    }
}
