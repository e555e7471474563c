//! Directive parser.
//!
//! Drives the tokenizer and assembles the node tree, keeping a stack of the
//! currently open containers. `/*IF ...*/` and `/*BEGIN*/` comments open
//! blocks that must be closed by a matching `/*END*/`; `-- ELSE` switches
//! the innermost IF to its else branch. Any other directive comment is a
//! bind-variable reference whose trailing literal placeholder is consumed.

use crate::error::{Result, TwoSqlError};
use crate::expr::{parse_expression, ExprAst};
use crate::node::{IfNode, Node};
use crate::tokenizer::{SqlTokenizer, TokenKind};

/// Parser over one template text.
pub struct Parser<'a> {
    tokenizer: SqlTokenizer<'a>,
}

/// An open container on the parse stack.
enum Frame {
    Root(Vec<Node>),
    If {
        expression: String,
        condition: ExprAst,
        children: Vec<Node>,
        else_children: Option<Vec<Node>>,
    },
    Begin(Vec<Node>),
}

impl Frame {
    /// The child list new nodes are appended to.
    fn children_mut(&mut self) -> &mut Vec<Node> {
        match self {
            Frame::Root(children) | Frame::Begin(children) => children,
            Frame::If {
                children,
                else_children,
                ..
            } => match else_children {
                Some(else_children) => else_children,
                None => children,
            },
        }
    }

    /// Whether this is an IF (or else) branch that has no children yet;
    /// only the first fragment of such a branch is prefix-adjusted.
    fn is_fresh_conditional(&self) -> bool {
        match self {
            Frame::If {
                children,
                else_children: None,
                ..
            } => children.is_empty(),
            Frame::If {
                else_children: Some(else_children),
                ..
            } => else_children.is_empty(),
            _ => false,
        }
    }

    fn in_else(&self) -> bool {
        matches!(
            self,
            Frame::If {
                else_children: Some(_),
                ..
            }
        )
    }
}

impl<'a> Parser<'a> {
    /// Parse a template into its root node.
    ///
    /// Leading/trailing whitespace and a single trailing `;` are stripped
    /// before tokenizing.
    pub fn parse(sql: &'a str) -> Result<Node> {
        let trimmed = sql.trim();
        let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
        let mut parser = Parser {
            tokenizer: SqlTokenizer::new(trimmed),
        };
        parser.run()
    }

    fn run(&mut self) -> Result<Node> {
        let mut stack = vec![Frame::Root(Vec::new())];
        loop {
            match self.tokenizer.next()? {
                TokenKind::Eof => break,
                TokenKind::Sql => self.on_sql(&mut stack),
                TokenKind::Comment => self.on_comment(&mut stack)?,
                TokenKind::Else => self.on_else(&mut stack),
                TokenKind::BindVariable => self.on_bind_variable(&mut stack),
            }
        }

        match stack.pop() {
            Some(Frame::Root(children)) if stack.is_empty() => Ok(Node::Container(children)),
            _ => Err(TwoSqlError::UnclosedBlock),
        }
    }

    fn on_sql(&mut self, stack: &mut [Frame]) {
        let mut sql = self.tokenizer.token().to_string();
        if stack.iter().any(Frame::in_else) {
            // Stray line-comment remnants inside an else branch.
            sql = sql.replace("--", "");
        }
        let top = stack.last_mut().expect("parse stack is never empty");
        let node = if top.is_fresh_conditional() {
            wrap_leading_keyword(sql)
        } else {
            Node::Sql(sql)
        };
        top.children_mut().push(node);
    }

    fn on_comment(&mut self, stack: &mut Vec<Frame>) -> Result<()> {
        let comment = self.tokenizer.token().to_string();
        if !is_directive(&comment) {
            // Inert SQL comment; contributes nothing to the tree.
            return Ok(());
        }

        if let Some(rest) = comment.strip_prefix("IF") {
            let expression = rest.trim().to_string();
            if expression.is_empty() {
                return Err(TwoSqlError::MissingIfCondition);
            }
            let condition = parse_expression(&expression)?;
            stack.push(Frame::If {
                expression,
                condition,
                children: Vec::new(),
                else_children: None,
            });
        } else if comment == "BEGIN" {
            stack.push(Frame::Begin(Vec::new()));
        } else if comment == "END" {
            close_block(stack);
        } else {
            self.on_bind_directive(stack, comment);
        }
        Ok(())
    }

    fn on_else(&mut self, stack: &mut [Frame]) {
        // Only meaningful directly inside an IF that has no else branch yet.
        if let Some(Frame::If { else_children, .. }) = stack.last_mut() {
            if else_children.is_none() {
                *else_children = Some(Vec::new());
                self.tokenizer.skip_whitespace();
            }
        }
    }

    fn on_bind_variable(&mut self, stack: &mut [Frame]) {
        let name = self.tokenizer.token().to_string();
        let top = stack.last_mut().expect("parse stack is never empty");
        top.children_mut().push(Node::BindVariable { name });
    }

    fn on_bind_directive(&mut self, stack: &mut [Frame], directive: String) {
        // The word after the comment is the literal placeholder; consume it.
        let word = self.tokenizer.skip_token().to_string();
        let node = if word.starts_with('(') && word.ends_with(')') {
            Node::ParenBindVariable { name: directive }
        } else if let Some(name) = directive.strip_prefix('$') {
            Node::EmbeddedValue {
                name: name.to_string(),
            }
        } else {
            Node::BindVariable { name: directive }
        };
        let top = stack.last_mut().expect("parse stack is never empty");
        top.children_mut().push(node);
    }
}

/// Pop the innermost open block and attach it to its parent. A stray END
/// at the top level is ignored.
fn close_block(stack: &mut Vec<Frame>) {
    if stack.len() <= 1 {
        return;
    }
    let node = match stack.pop().expect("stack length checked above") {
        Frame::If {
            expression,
            condition,
            children,
            else_children,
        } => Node::If(IfNode {
            expression,
            condition,
            children,
            else_branch: else_children,
        }),
        Frame::Begin(children) => Node::Begin(children),
        Frame::Root(_) => unreachable!("root frame is never popped here"),
    };
    stack
        .last_mut()
        .expect("parent frame exists")
        .children_mut()
        .push(node);
}

/// Wrap the opening fragment of a conditional branch so that a leading
/// `AND`/`OR` keyword can be dropped at render time.
fn wrap_leading_keyword(sql: String) -> Node {
    let (is_keyword, prefix, body) = {
        let mut scanner = SqlTokenizer::new(&sql);
        scanner.skip_whitespace();
        let word = scanner.skip_token().to_string();
        scanner.skip_whitespace();
        let is_keyword = word.eq_ignore_ascii_case("AND") || word.eq_ignore_ascii_case("OR");
        (
            is_keyword,
            scanner.before().to_string(),
            scanner.after().to_string(),
        )
    };
    if is_keyword {
        Node::PrefixedSql { prefix, body }
    } else {
        Node::Sql(sql)
    }
}

/// A comment is a directive only when it starts like an identifier.
fn is_directive(comment: &str) -> bool {
    comment
        .chars()
        .next()
        .map_or(false, |c| c.is_alphanumeric() || "_\\$@".contains(c))
}
