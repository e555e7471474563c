//! Parsed template tree and rendering.
//!
//! Templates parse into a tree of [`Node`] values. The tree is immutable
//! after parsing and carries no render state, so one parsed template can be
//! rendered concurrently from any number of contexts. Rendering is a single
//! [`render`] function matching on node kind.

use tracing::warn;

use crate::context::CommandContext;
use crate::error::Result;
use crate::expr::{evaluate_condition, ExprAst};
use crate::types::{DataType, ParamValue};

/// One node of a parsed template.
#[derive(Debug, Clone)]
pub enum Node {
    /// Ordered sequence of children (the root, and generic grouping)
    Container(Vec<Node>),
    /// A fixed SQL fragment with no parameters
    Sql(String),
    /// An SQL fragment whose leading `AND`/`OR` keyword is dropped when it
    /// opens a dynamic scope
    PrefixedSql { prefix: String, body: String },
    /// `/*IF expr*/ ... /*END*/` with an optional `-- ELSE` branch
    If(IfNode),
    /// `/*BEGIN*/ ... /*END*/`: included only if an inner IF fired
    Begin(Vec<Node>),
    /// One named bind parameter
    BindVariable { name: String },
    /// A list parameter expanded to a parenthesized placeholder sequence
    ParenBindVariable { name: String },
    /// A parameter substituted as raw SQL text, unbound
    EmbeddedValue { name: String },
}

/// Body of an IF node: the raw condition text (kept for diagnostics), its
/// parsed form, the true branch, and the optional else branch.
#[derive(Debug, Clone)]
pub struct IfNode {
    pub(crate) expression: String,
    pub(crate) condition: ExprAst,
    pub(crate) children: Vec<Node>,
    pub(crate) else_branch: Option<Vec<Node>>,
}

/// Render one node into the given context.
pub fn render(node: &Node, ctx: &mut CommandContext<'_>) -> Result<()> {
    match node {
        Node::Container(children) => render_all(children, ctx),
        Node::Sql(sql) => {
            ctx.add_sql(sql);
            Ok(())
        }
        Node::PrefixedSql { prefix, body } => {
            // The keyword is kept only if this scope already emitted output.
            if ctx.is_enabled() {
                ctx.add_sql(prefix);
            }
            ctx.add_sql(body);
            Ok(())
        }
        Node::If(if_node) => render_if(if_node, ctx),
        Node::Begin(children) => render_begin(children, ctx),
        Node::BindVariable { name } => {
            let value = ctx.arg(name);
            if value.is_null() {
                ctx.warn_missing(name);
            }
            let data_type = value.data_type();
            let bind_name = name.replace('.', "_");
            ctx.add_bind(value, data_type, &bind_name);
            Ok(())
        }
        Node::ParenBindVariable { name } => render_paren_bind(name, ctx),
        Node::EmbeddedValue { name } => {
            let value = ctx.arg(name);
            if !value.is_null() {
                ctx.add_sql(&value.raw_text());
            }
            Ok(())
        }
    }
}

fn render_all(children: &[Node], ctx: &mut CommandContext<'_>) -> Result<()> {
    for child in children {
        render(child, ctx)?;
    }
    Ok(())
}

fn render_if(if_node: &IfNode, ctx: &mut CommandContext<'_>) -> Result<()> {
    if evaluate_condition(&if_node.condition, ctx, &if_node.expression)? {
        render_all(&if_node.children, ctx)?;
        ctx.set_enabled();
    } else if let Some(else_branch) = &if_node.else_branch {
        render_all(else_branch, ctx)?;
        ctx.set_enabled();
    }
    Ok(())
}

fn render_begin(children: &[Node], ctx: &mut CommandContext<'_>) -> Result<()> {
    let parts = {
        let mut child = CommandContext::child(ctx);
        render_all(children, &mut child)?;
        child.into_parts()
    };
    // Only IF nodes flip the enabled flag; a spliced BEGIN does not
    // activate its parent scope.
    if parts.enabled {
        ctx.add_fragment(
            &parts.sql,
            &parts.sql_with_values,
            parts.bind_values,
            parts.bind_types,
            parts.bind_names,
        );
    }
    Ok(())
}

fn render_paren_bind(name: &str, ctx: &mut CommandContext<'_>) -> Result<()> {
    let items = match ctx.arg(name) {
        ParamValue::List(items) => items,
        ParamValue::Null => {
            warn!(parameter = name, "list bind variable has no value; omitted");
            return Ok(());
        }
        other => {
            warn!(
                parameter = name,
                value = %other,
                "list bind variable is not a list; omitted"
            );
            return Ok(());
        }
    };

    if items.is_empty() {
        ctx.add_sql("()");
        return Ok(());
    }

    // One shared type for every element: last non-null wins, nulls skipped.
    let shared_type = items
        .iter()
        .rev()
        .find(|v| !v.is_null())
        .map(|v| v.data_type())
        .unwrap_or(DataType::Null);

    ctx.add_sql("(");
    for (i, item) in items.into_iter().enumerate() {
        let bind_name = format!("{}{}", name, i + 1);
        if i == 0 {
            ctx.add_bind(item, shared_type, &bind_name);
        } else {
            ctx.append_bind(item, shared_type, &bind_name);
        }
    }
    ctx.add_sql(")");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BindStyle;
    use crate::expr::parse_expression;
    use crate::types::Params;

    fn render_to_parts(node: &Node, params: Params, style: BindStyle) -> crate::context::ContextParts {
        let mut ctx = CommandContext::root(params, style);
        render(node, &mut ctx).unwrap();
        ctx.into_parts()
    }

    fn if_node(expression: &str, children: Vec<Node>, else_branch: Option<Vec<Node>>) -> Node {
        Node::If(IfNode {
            expression: expression.to_string(),
            condition: parse_expression(expression).unwrap(),
            children,
            else_branch,
        })
    }

    #[test]
    fn test_sql_node_appends_text() {
        let node = Node::Sql("SELECT 1".to_string());
        let parts = render_to_parts(&node, Params::new(), BindStyle::Question);
        assert_eq!(parts.sql, "SELECT 1");
        assert!(parts.bind_values.is_empty());
    }

    #[test]
    fn test_bind_variable_styles() {
        let node = Node::BindVariable {
            name: "deptno".to_string(),
        };
        let params = Params::new().with("deptno", 20);
        let parts = render_to_parts(&node, params.clone(), BindStyle::Question);
        assert_eq!(parts.sql, "?");
        let parts = render_to_parts(&node, params.clone(), BindStyle::ColonName);
        assert_eq!(parts.sql, ":deptno");
        let parts = render_to_parts(&node, params, BindStyle::QuestionWithParam);
        assert_eq!(parts.sql, "?deptno");
    }

    #[test]
    fn test_missing_bind_variable_binds_null() {
        let node = Node::BindVariable {
            name: "absent".to_string(),
        };
        let parts = render_to_parts(&node, Params::new(), BindStyle::Question);
        assert_eq!(parts.sql, "?");
        assert_eq!(parts.sql_with_values, "null");
        assert_eq!(parts.bind_values, vec![ParamValue::Null]);
        assert_eq!(parts.bind_types, vec![DataType::Null]);
    }

    #[test]
    fn test_dotted_bind_name_uses_underscores() {
        let node = Node::BindVariable {
            name: "emp.name".to_string(),
        };
        let emp = ParamValue::Map(
            [("name".to_string(), ParamValue::Utf8("SCOTT".into()))]
                .into_iter()
                .collect(),
        );
        let params = Params::new().with("emp", emp);
        let parts = render_to_parts(&node, params, BindStyle::ColonName);
        assert_eq!(parts.sql, ":emp_name");
        assert_eq!(parts.bind_names, vec!["emp_name".to_string()]);
    }

    #[test]
    fn test_paren_bind_expansion() {
        let node = Node::ParenBindVariable {
            name: "names".to_string(),
        };
        let params = Params::new().with("names", vec!["CLARK", "FORD"]);
        let parts = render_to_parts(&node, params, BindStyle::Question);
        assert_eq!(parts.sql, "(?, ?)");
        assert_eq!(parts.sql_with_values, "('CLARK', 'FORD')");
        assert_eq!(
            parts.bind_names,
            vec!["names1".to_string(), "names2".to_string()]
        );
    }

    #[test]
    fn test_paren_bind_empty_list() {
        let node = Node::ParenBindVariable {
            name: "names".to_string(),
        };
        let params = Params::new().with("names", Vec::<String>::new());
        let parts = render_to_parts(&node, params, BindStyle::Question);
        assert_eq!(parts.sql, "()");
        assert!(parts.bind_values.is_empty());
    }

    #[test]
    fn test_paren_bind_type_inference_last_non_null_wins() {
        let node = Node::ParenBindVariable {
            name: "vals".to_string(),
        };
        let params = Params::new().with(
            "vals",
            ParamValue::List(vec![
                ParamValue::Int64(1),
                ParamValue::Null,
                ParamValue::Utf8("x".into()),
                ParamValue::Null,
            ]),
        );
        let parts = render_to_parts(&node, params, BindStyle::Question);
        assert_eq!(parts.bind_types, vec![DataType::Utf8; 4]);
    }

    #[test]
    fn test_paren_bind_missing_emits_nothing() {
        let node = Node::ParenBindVariable {
            name: "names".to_string(),
        };
        let parts = render_to_parts(&node, Params::new(), BindStyle::Question);
        assert_eq!(parts.sql, "");
        assert!(parts.bind_values.is_empty());
    }

    #[test]
    fn test_embedded_value_is_raw_text() {
        let node = Node::Container(vec![
            Node::Sql("ORDER BY sal ".to_string()),
            Node::EmbeddedValue {
                name: "direction".to_string(),
            },
        ]);
        let params = Params::new().with("direction", "DESC");
        let parts = render_to_parts(&node, params, BindStyle::Question);
        assert_eq!(parts.sql, "ORDER BY sal DESC");
        assert!(parts.bind_values.is_empty());
    }

    #[test]
    fn test_embedded_value_missing_emits_nothing() {
        let node = Node::EmbeddedValue {
            name: "direction".to_string(),
        };
        let parts = render_to_parts(&node, Params::new(), BindStyle::Question);
        assert_eq!(parts.sql, "");
    }

    #[test]
    fn test_if_true_renders_children_and_enables() {
        let node = Node::Begin(vec![if_node(
            "a != null",
            vec![Node::Sql("A = 1".to_string())],
            None,
        )]);
        let params = Params::new().with("a", 5);
        let parts = render_to_parts(&node, params, BindStyle::Question);
        assert_eq!(parts.sql, "A = 1");
    }

    #[test]
    fn test_if_false_without_else_emits_nothing() {
        let node = if_node("a != null", vec![Node::Sql("A = 1".to_string())], None);
        let parts = render_to_parts(&node, Params::new(), BindStyle::Question);
        assert_eq!(parts.sql, "");
    }

    #[test]
    fn test_if_false_with_else_renders_else() {
        let node = if_node(
            "a != null",
            vec![Node::Sql("A = 1".to_string())],
            Some(vec![Node::Sql("A IS NULL".to_string())]),
        );
        let parts = render_to_parts(&node, Params::new(), BindStyle::Question);
        assert_eq!(parts.sql, "A IS NULL");
    }

    #[test]
    fn test_begin_not_activated_emits_nothing() {
        let node = Node::Begin(vec![
            Node::Sql("WHERE ".to_string()),
            if_node("a != null", vec![Node::Sql("A = 1".to_string())], None),
        ]);
        let parts = render_to_parts(&node, Params::new(), BindStyle::Question);
        assert_eq!(parts.sql, "");
        assert!(parts.bind_values.is_empty());
    }

    #[test]
    fn test_prefix_dropped_only_while_scope_disabled() {
        let node = Node::Begin(vec![
            Node::Sql("WHERE ".to_string()),
            if_node(
                "a != null",
                vec![Node::PrefixedSql {
                    prefix: " AND ".to_string(),
                    body: "A = 1".to_string(),
                }],
                None,
            ),
            if_node(
                "b != null",
                vec![Node::PrefixedSql {
                    prefix: " AND ".to_string(),
                    body: "B = 2".to_string(),
                }],
                None,
            ),
        ]);
        let params = Params::new().with("a", 1).with("b", 2);
        let parts = render_to_parts(&node, params, BindStyle::Question);
        assert_eq!(parts.sql, "WHERE A = 1 AND B = 2");
    }
}
