//! Per-render accumulation state.
//!
//! A [`CommandContext`] collects the output of one render pass: the
//! placeholder-form SQL, a value-substituted diagnostic form, and the
//! ordered bind value/type/name triples. `BEGIN` blocks render into child
//! contexts chained to their parent for parameter lookup; a child context
//! starts disabled and its output is only spliced into the parent if some
//! inner conditional enabled it.

use std::collections::HashMap;

use tracing::warn;

use crate::types::{DataType, ParamValue, Params};

/// Placeholder syntax expected by the target SQL execution facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindStyle {
    /// Plain positional `?`
    #[default]
    Question,
    /// `?` immediately followed by the parameter name, e.g. `?deptno`
    QuestionWithParam,
    /// `@name`
    AtName,
    /// `:name`
    ColonName,
}

impl BindStyle {
    /// Map a driver identifier to its bind style.
    ///
    /// Unknown drivers fall back to plain positional `?`.
    pub fn for_driver(driver: &str) -> Self {
        match driver.to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" | "db2" => BindStyle::AtName,
            "oracle" | "postgres" | "postgresql" => BindStyle::ColonName,
            "mysql" | "mariadb" => BindStyle::QuestionWithParam,
            _ => BindStyle::Question,
        }
    }

    /// Render one placeholder for the given bind name.
    pub fn placeholder(&self, name: &str) -> String {
        match self {
            BindStyle::Question => "?".to_string(),
            BindStyle::QuestionWithParam => format!("?{}", name),
            BindStyle::AtName => format!("@{}", name),
            BindStyle::ColonName => format!(":{}", name),
        }
    }
}

/// Mutable accumulation state for one render pass or one `BEGIN` scope.
pub struct CommandContext<'a> {
    args: HashMap<String, ParamValue>,
    parent: Option<&'a CommandContext<'a>>,
    bind_style: BindStyle,
    sql: String,
    sql_with_values: String,
    bind_values: Vec<ParamValue>,
    bind_types: Vec<DataType>,
    bind_names: Vec<String>,
    enabled: bool,
}

impl<'a> CommandContext<'a> {
    /// Create the root context for a render pass. Root contexts start
    /// enabled: prefix adjustment never fires at the top level.
    pub fn root(params: Params, bind_style: BindStyle) -> Self {
        Self {
            args: params.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            parent: None,
            bind_style,
            sql: String::new(),
            sql_with_values: String::new(),
            bind_values: Vec::new(),
            bind_types: Vec::new(),
            bind_names: Vec::new(),
            enabled: true,
        }
    }

    /// Create a child scope for a `BEGIN` block. Child contexts hold no
    /// arguments of their own and start disabled.
    pub fn child(parent: &'a CommandContext<'a>) -> Self {
        Self {
            args: HashMap::new(),
            parent: Some(parent),
            bind_style: parent.bind_style,
            sql: String::new(),
            sql_with_values: String::new(),
            bind_values: Vec::new(),
            bind_types: Vec::new(),
            bind_names: Vec::new(),
            enabled: false,
        }
    }

    /// Resolve a (possibly dotted) parameter name.
    ///
    /// Local bindings win, then the parent chain; dotted-path traversal
    /// through [`ParamValue::Map`] values happens at the root. Any miss
    /// resolves to [`ParamValue::Null`], never an error.
    pub fn arg(&self, name: &str) -> ParamValue {
        if let Some(value) = self.args.get(name) {
            return value.clone();
        }
        if let Some(parent) = self.parent {
            return parent.arg(name);
        }

        let mut segments = name.split('.');
        let root_name = segments.next().unwrap_or(name);
        let Some(mut current) = self.args.get(root_name) else {
            return ParamValue::Null;
        };
        for segment in segments {
            match current.field(segment) {
                Some(value) => current = value,
                None => return ParamValue::Null,
            }
        }
        current.clone()
    }

    /// Bind style used by this render pass.
    pub fn bind_style(&self) -> BindStyle {
        self.bind_style
    }

    /// Whether some conditional has enabled output in this scope.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mark this scope as enabled.
    pub fn set_enabled(&mut self) {
        self.enabled = true;
    }

    /// Append plain SQL text to both buffers.
    pub fn add_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
        self.sql_with_values.push_str(sql);
    }

    /// Append one placeholder and record its bind triple.
    pub fn add_bind(&mut self, value: ParamValue, data_type: DataType, name: &str) {
        let placeholder = self.bind_style.placeholder(name);
        self.sql.push_str(&placeholder);
        self.sql_with_values.push_str(&value.literal());
        self.bind_values.push(value);
        self.bind_types.push(data_type);
        self.bind_names.push(name.to_string());
    }

    /// Append `, ` plus one placeholder; used for list expansion.
    pub fn append_bind(&mut self, value: ParamValue, data_type: DataType, name: &str) {
        self.add_sql(", ");
        self.add_bind(value, data_type, name);
    }

    /// Splice a rendered child fragment into this context.
    pub fn add_fragment(
        &mut self,
        sql: &str,
        sql_with_values: &str,
        values: Vec<ParamValue>,
        types: Vec<DataType>,
        names: Vec<String>,
    ) {
        self.sql.push_str(sql);
        self.sql_with_values.push_str(sql_with_values);
        self.bind_values.extend(values);
        self.bind_types.extend(types);
        self.bind_names.extend(names);
    }

    /// Record a soft lookup miss for a plain bind variable.
    pub fn warn_missing(&self, name: &str) {
        warn!(parameter = name, "bind variable has no value; binding null");
    }

    /// Accumulated placeholder-form SQL.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Accumulated diagnostic SQL with values substituted.
    pub fn sql_with_values(&self) -> &str {
        &self.sql_with_values
    }

    /// Consume the context, yielding buffers and bind triples.
    pub fn into_parts(self) -> ContextParts {
        ContextParts {
            sql: self.sql,
            sql_with_values: self.sql_with_values,
            bind_values: self.bind_values,
            bind_types: self.bind_types,
            bind_names: self.bind_names,
            enabled: self.enabled,
        }
    }
}

/// Owned output of a finished context.
pub struct ContextParts {
    pub sql: String,
    pub sql_with_values: String,
    pub bind_values: Vec<ParamValue>,
    pub bind_types: Vec<DataType>,
    pub bind_names: Vec<String>,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_style_placeholders() {
        assert_eq!(BindStyle::Question.placeholder("a"), "?");
        assert_eq!(BindStyle::QuestionWithParam.placeholder("a"), "?a");
        assert_eq!(BindStyle::AtName.placeholder("a"), "@a");
        assert_eq!(BindStyle::ColonName.placeholder("a"), ":a");
    }

    #[test]
    fn test_bind_style_for_driver() {
        assert_eq!(BindStyle::for_driver("sqlserver"), BindStyle::AtName);
        assert_eq!(BindStyle::for_driver("db2"), BindStyle::AtName);
        assert_eq!(BindStyle::for_driver("Oracle"), BindStyle::ColonName);
        assert_eq!(BindStyle::for_driver("postgres"), BindStyle::ColonName);
        assert_eq!(BindStyle::for_driver("mysql"), BindStyle::QuestionWithParam);
        assert_eq!(BindStyle::for_driver("sqlite"), BindStyle::Question);
        assert_eq!(BindStyle::for_driver("something-else"), BindStyle::Question);
    }

    #[test]
    fn test_arg_lookup_through_parent() {
        let root = CommandContext::root(Params::new().with("a", 1), BindStyle::Question);
        let child = CommandContext::child(&root);
        let grandchild = CommandContext::child(&child);
        assert_eq!(grandchild.arg("a"), ParamValue::Int64(1));
        assert_eq!(grandchild.arg("missing"), ParamValue::Null);
    }

    #[test]
    fn test_dotted_path_resolution() {
        let emp: ParamValue = ParamValue::Map(
            [
                ("name".to_string(), ParamValue::Utf8("SCOTT".into())),
                (
                    "dept".to_string(),
                    ParamValue::Map(
                        [("no".to_string(), ParamValue::Int64(20))]
                            .into_iter()
                            .collect(),
                    ),
                ),
            ]
            .into_iter()
            .collect(),
        );
        let root = CommandContext::root(Params::new().with("emp", emp), BindStyle::Question);
        assert_eq!(root.arg("emp.name"), ParamValue::Utf8("SCOTT".into()));
        assert_eq!(root.arg("emp.dept.no"), ParamValue::Int64(20));
        assert_eq!(root.arg("emp.missing"), ParamValue::Null);
        assert_eq!(root.arg("emp.name.deeper"), ParamValue::Null);
    }

    #[test]
    fn test_add_bind_buffers() {
        let mut ctx = CommandContext::root(Params::new(), BindStyle::AtName);
        ctx.add_sql("WHERE id = ");
        ctx.add_bind(ParamValue::Int64(7), DataType::Int64, "id");
        assert_eq!(ctx.sql(), "WHERE id = @id");
        assert_eq!(ctx.sql_with_values(), "WHERE id = 7");
        let parts = ctx.into_parts();
        assert_eq!(parts.bind_values, vec![ParamValue::Int64(7)]);
        assert_eq!(parts.bind_types, vec![DataType::Int64]);
        assert_eq!(parts.bind_names, vec!["id".to_string()]);
    }

    #[test]
    fn test_child_starts_disabled() {
        let root = CommandContext::root(Params::new(), BindStyle::Question);
        assert!(root.is_enabled());
        let child = CommandContext::child(&root);
        assert!(!child.is_enabled());
    }
}
