//! Template tokenizer.
//!
//! Splits annotated SQL text into a stream of typed tokens: plain SQL runs,
//! `/* ... */` comment bodies, bare `?` bind markers, and `-- ELSE` line
//! markers. The tokenizer is stateful and lazy; the parser pulls one token
//! at a time with [`SqlTokenizer::next`].

use crate::error::{Result, TwoSqlError};

/// The kind of the current token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A run of plain SQL text
    Sql,
    /// The body of a `/* ... */` comment, terminators excluded
    Comment,
    /// A bare `?` bind marker, tokenized as a synthesized positional name
    BindVariable,
    /// A `-- ELSE` marker; carries no text
    Else,
    /// End of input
    Eof,
}

/// Stateful scanner over annotated SQL text.
pub struct SqlTokenizer<'a> {
    sql: &'a str,
    position: usize,
    token: String,
    kind: TokenKind,
    next_kind: TokenKind,
    bind_variable_num: usize,
}

impl<'a> SqlTokenizer<'a> {
    /// Create a tokenizer over the given template text.
    pub fn new(sql: &'a str) -> Self {
        Self {
            sql,
            position: 0,
            token: String::new(),
            kind: TokenKind::Sql,
            next_kind: TokenKind::Sql,
            bind_variable_num: 0,
        }
    }

    /// Text of the current token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Kind of the current token.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Current scan position (byte offset).
    pub fn position(&self) -> usize {
        self.position
    }

    /// Everything before the current scan position.
    pub fn before(&self) -> &'a str {
        &self.sql[..self.position]
    }

    /// Everything from the current scan position on.
    pub fn after(&self) -> &'a str {
        &self.sql[self.position..]
    }

    /// Advance to the next token and return its kind.
    pub fn next(&mut self) -> Result<TokenKind> {
        if self.position >= self.sql.len() {
            self.token.clear();
            self.kind = TokenKind::Eof;
            self.next_kind = TokenKind::Eof;
            return Ok(self.kind);
        }

        match self.next_kind {
            TokenKind::Sql => self.scan_sql()?,
            TokenKind::Comment => self.scan_comment()?,
            TokenKind::BindVariable => self.scan_bind_variable(),
            TokenKind::Else => self.scan_else(),
            TokenKind::Eof => {
                self.token.clear();
                self.kind = TokenKind::Eof;
            }
        }

        Ok(self.kind)
    }

    /// Scan a plain SQL run up to the nearest directive marker.
    fn scan_sql(&mut self) -> Result<()> {
        let rest = &self.sql[self.position..];
        let comment_start = rest.find("/*").map(|i| i + self.position);
        let bind_start = rest.find('?').map(|i| i + self.position);

        // A line comment only matters if its first word is ELSE.
        let mut else_start = None;
        let mut else_len = 0;
        if let Some(lc) = rest.find("--").map(|i| i + self.position) {
            let skip = self.whitespace_end(lc + 2);
            if self.sql[skip..].starts_with("ELSE") {
                else_start = Some(lc);
                else_len = skip + 4 - lc;
            }
        }

        let next_start = [comment_start, else_start, bind_start]
            .into_iter()
            .flatten()
            .min();

        match next_start {
            None => {
                self.token = rest.to_string();
                self.kind = TokenKind::Sql;
                self.next_kind = TokenKind::Eof;
                self.position = self.sql.len();
            }
            Some(pos) => {
                self.token = self.sql[self.position..pos].to_string();
                self.kind = TokenKind::Sql;
                let need_next = pos == self.position;
                if Some(pos) == comment_start {
                    self.next_kind = TokenKind::Comment;
                    self.position = pos + 2;
                } else if Some(pos) == else_start {
                    self.next_kind = TokenKind::Else;
                    self.position = pos + else_len;
                } else {
                    self.next_kind = TokenKind::BindVariable;
                    self.position = pos;
                }
                // An empty SQL run is never surfaced; chain to the marker.
                if need_next {
                    self.next()?;
                }
            }
        }
        Ok(())
    }

    /// Scan a comment body up to the matching `*/`.
    fn scan_comment(&mut self) -> Result<()> {
        let rest = &self.sql[self.position..];
        let end = rest
            .find("*/")
            .ok_or_else(|| TwoSqlError::unclosed_token("*/", rest))?;
        self.token = rest[..end].to_string();
        self.kind = TokenKind::Comment;
        self.next_kind = TokenKind::Sql;
        self.position += end + 2;
        Ok(())
    }

    /// Consume one `?` and synthesize a positional name for it.
    fn scan_bind_variable(&mut self) {
        self.bind_variable_num += 1;
        self.token = format!("${}", self.bind_variable_num);
        self.kind = TokenKind::BindVariable;
        self.next_kind = TokenKind::Sql;
        self.position += 1;
    }

    /// The ELSE marker carries no token text.
    fn scan_else(&mut self) {
        self.token.clear();
        self.kind = TokenKind::Else;
        self.next_kind = TokenKind::Sql;
    }

    /// Greedily consume a single word, honoring `'...'` and `(...)` quoting,
    /// stopping at whitespace, `,`, `(`, `)`, a `/*` comment start, or a
    /// `--` line comment.
    pub fn skip_token(&mut self) -> &str {
        let first = self.sql[self.position..].chars().next().unwrap_or('\0');
        let quoting = first == '\'' || first == '(';
        let close = if first == '(' { ')' } else { '\'' };

        let scan_from = if quoting {
            self.position + first.len_utf8()
        } else {
            self.position
        };

        let mut index = self.sql.len();
        let mut chars = self.sql[scan_from..].char_indices().peekable();
        while let Some((off, c)) = chars.next() {
            let i = scan_from + off;
            let following = chars.peek().map(|&(_, n)| n);
            if !quoting && (c.is_whitespace() || c == ',' || c == ')' || c == '(') {
                index = i;
                break;
            } else if c == '/' && following == Some('*') {
                index = i;
                break;
            } else if c == '-' && following == Some('-') {
                index = i;
                break;
            } else if quoting && first == '\'' && c == '\'' && following != Some('\'') {
                index = i + c.len_utf8();
                break;
            } else if quoting && c == close {
                index = i + c.len_utf8();
                break;
            }
        }

        self.token = self.sql[self.position..index].to_string();
        self.kind = TokenKind::Sql;
        self.next_kind = TokenKind::Sql;
        self.position = index;
        &self.token
    }

    /// Consume a run of whitespace and return it.
    pub fn skip_whitespace(&mut self) -> &str {
        let index = self.whitespace_end(self.position);
        self.token = self.sql[self.position..index].to_string();
        self.position = index;
        &self.token
    }

    /// First non-whitespace offset at or after `from`.
    fn whitespace_end(&self, from: usize) -> usize {
        self.sql[from..]
            .char_indices()
            .find(|(_, c)| !c.is_whitespace())
            .map(|(i, _)| from + i)
            .unwrap_or(self.sql.len())
    }
}
