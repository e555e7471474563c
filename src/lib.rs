//! twosql - Two-Way SQL Templating Engine
//!
//! twosql parses SQL text annotated with comment-embedded directives into an
//! immutable template tree, then renders that tree against a set of named
//! parameters to produce executable SQL plus an ordered bind-value list.
//! The same file is valid SQL when handed to a database as-is (the
//! directives hide inside comments) and a dynamic statement when rendered -
//! hence "two-way".
//!
//! # Directives
//!
//! | Directive | Syntax | Effect |
//! |---|---|---|
//! | Conditional | `/*IF expr*/ ... /*END*/` | include block if expr is true |
//! | Alternate branch | `-- ELSE` inside an IF block | include when expr is false |
//! | Grouping | `/*BEGIN*/ ... /*END*/` | include only if an inner IF fired |
//! | Named bind | `/*name*/literal` | bind one value, replacing the literal |
//! | List bind | `/*name*/(...)` | expand a list to `(?, ?, ...)` |
//! | Embedded literal | `/*$name*/literal` | substitute raw SQL text, unbound |
//! | Positional bind | bare `?` | anonymous positional placeholder |
//!
//! # Quick Start
//!
//! ```rust
//! use twosql::{BindStyle, Params, Result, SqlTemplate};
//!
//! fn main() -> Result<()> {
//!     let template = SqlTemplate::parse(
//!         "SELECT * FROM emp WHERE job = /*job*/'CLERK'\
//!          /*IF deptno != null*/ AND deptno = /*deptno*/20/*END*/",
//!     )?;
//!
//!     // Both parameters present: the conditional clause is included.
//!     let params = Params::new().with("job", "MANAGER").with("deptno", 30);
//!     let rendered = template.render(&params, BindStyle::Question)?;
//!     assert_eq!(
//!         rendered.sql,
//!         "SELECT * FROM emp WHERE job = ? AND deptno = ?"
//!     );
//!
//!     // Without deptno the clause disappears along with its bind value.
//!     let params = Params::new().with("job", "MANAGER");
//!     let rendered = template.render(&params, BindStyle::Question)?;
//!     assert_eq!(rendered.sql, "SELECT * FROM emp WHERE job = ?");
//!     assert_eq!(rendered.values.len(), 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Dynamic WHERE clauses
//!
//! ```rust
//! use twosql::{BindStyle, Params, Result, SqlTemplate};
//!
//! fn main() -> Result<()> {
//!     let template = SqlTemplate::parse(
//!         "SELECT * FROM emp\
//!          /*BEGIN*/ WHERE\
//!          /*IF job != null*/ job = /*job*/'CLERK'/*END*/\
//!          /*IF deptno != null*/ AND deptno = /*deptno*/20/*END*/\
//!          /*END*/",
//!     )?;
//!
//!     // No parameters: the whole WHERE block vanishes.
//!     let rendered = template.render(&Params::new(), BindStyle::Question)?;
//!     assert_eq!(rendered.sql, "SELECT * FROM emp");
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod context;
pub mod error;
pub mod expr;
pub mod node;
pub mod parser;
pub mod tokenizer;
pub mod types;

// Re-export commonly used types
pub use cache::{TemplateCache, TemplateCacheConfig};
pub use context::BindStyle;
pub use error::{Result, TwoSqlError};
pub use types::{DataType, ParamValue, Params};

use context::CommandContext;
use node::{render, Node};
use parser::Parser;

/// A parsed two-way SQL template.
///
/// The tree inside a `SqlTemplate` is immutable and carries no render
/// state, so one parsed template can be shared (e.g. via `Arc` from a
/// [`TemplateCache`]) and rendered concurrently from many threads.
pub struct SqlTemplate {
    source: String,
    root: Node,
}

impl SqlTemplate {
    /// Parse a template.
    ///
    /// Fails with a [`TwoSqlError`] syntax variant on malformed input:
    /// an unterminated comment, an IF/BEGIN block with no matching END,
    /// an IF with an empty or malformed condition.
    pub fn parse(sql: &str) -> Result<Self> {
        let root = Parser::parse(sql)?;
        Ok(Self {
            source: sql.to_string(),
            root,
        })
    }

    /// The original template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed node tree.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Render the template against a parameter set.
    ///
    /// Each call uses a fresh context; rendering the same template twice
    /// with identical parameters yields identical output.
    pub fn render(&self, params: &Params, bind_style: BindStyle) -> Result<RenderedSql> {
        let mut ctx = CommandContext::root(params.clone(), bind_style);
        render(&self.root, &mut ctx)?;
        let parts = ctx.into_parts();
        Ok(RenderedSql {
            sql: parts.sql,
            sql_with_values: parts.sql_with_values,
            values: parts.bind_values,
            value_types: parts.bind_types,
            value_names: parts.bind_names,
        })
    }
}

impl std::fmt::Debug for SqlTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlTemplate")
            .field("source", &self.source)
            .finish()
    }
}

/// The output of one render pass.
#[derive(Debug, Clone)]
pub struct RenderedSql {
    /// Final SQL in placeholder form, ready for a parameterized execution
    /// facility
    pub sql: String,
    /// Diagnostic SQL with bind values substituted as literals
    pub sql_with_values: String,
    /// Bound values, in placeholder order
    pub values: Vec<ParamValue>,
    /// Type tag of each bound value
    pub value_types: Vec<DataType>,
    /// Name of each bound value (dots replaced by underscores; list
    /// elements numbered `name1`, `name2`, ...)
    pub value_names: Vec<String>,
}

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::cache::{TemplateCache, TemplateCacheConfig};
    pub use crate::context::BindStyle;
    pub use crate::error::{Result, TwoSqlError};
    pub use crate::types::{DataType, ParamValue, Params};
    pub use crate::{RenderedSql, SqlTemplate};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render_round_trip() {
        let template = SqlTemplate::parse("SELECT * FROM emp").unwrap();
        let rendered = template.render(&Params::new(), BindStyle::Question).unwrap();
        assert_eq!(rendered.sql, "SELECT * FROM emp");
        assert!(rendered.values.is_empty());
    }

    #[test]
    fn test_source_keeps_original_text() {
        let template = SqlTemplate::parse("SELECT 1;").unwrap();
        assert_eq!(template.source(), "SELECT 1;");
    }

    #[test]
    fn test_render_is_idempotent() {
        let template =
            SqlTemplate::parse("SELECT * FROM emp WHERE deptno = /*deptno*/20").unwrap();
        let params = Params::new().with("deptno", 10);
        let first = template.render(&params, BindStyle::ColonName).unwrap();
        let second = template.render(&params, BindStyle::ColonName).unwrap();
        assert_eq!(first.sql, second.sql);
        assert_eq!(first.values, second.values);
        assert_eq!(first.value_names, second.value_names);
    }
}
