use crate::{
    db::{
        comparator::{FieldComparator, NullOrder},
        plan::fragment::{FragmentShape, StoreFragment},
        predicate::{FieldPredicate, PredicateKind},
    },
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

///
/// PlaceholderStyle
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `?` for every parameter.
    #[default]
    Question,
    /// `$1`, `$2`, ... in binding order.
    Numbered,
}

///
/// SqlOptions
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqlOptions {
    pub placeholder: PlaceholderStyle,
    pub quote: char,
    /// Table name override; defaults to the entity name.
    pub table: Option<String>,
}

impl Default for SqlOptions {
    fn default() -> Self {
        Self {
            placeholder: PlaceholderStyle::Question,
            quote: '"',
            table: None,
        }
    }
}

///
/// SqlFragment
///
/// Parameterized statement text. Values only ever appear in `params`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

///
/// SqlWriter
///

struct SqlWriter<'a> {
    options: &'a SqlOptions,
    sql: String,
    params: Vec<Value>,
}

impl<'a> SqlWriter<'a> {
    const fn new(options: &'a SqlOptions) -> Self {
        Self {
            options,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn ident(&mut self, name: &str) {
        let quote = self.options.quote;
        self.sql.push(quote);
        for ch in name.chars() {
            if ch == quote {
                self.sql.push(quote);
            }
            self.sql.push(ch);
        }
        self.sql.push(quote);
    }

    fn param(&mut self, value: Value) {
        self.params.push(value);
        match self.options.placeholder {
            PlaceholderStyle::Question => self.sql.push('?'),
            PlaceholderStyle::Numbered => {
                let _ = write!(self.sql, "${}", self.params.len());
            }
        }
    }

    fn predicate<E>(&mut self, predicate: &FieldPredicate<E>) {
        let column = predicate.field().name();
        let operands = predicate.operands();

        match predicate.kind() {
            PredicateKind::AlwaysTrue => self.push("1 = 1"),
            PredicateKind::AlwaysFalse => self.push("1 = 0"),
            PredicateKind::IsNull => {
                self.ident(column);
                self.push(" IS NULL");
            }
            PredicateKind::IsNotNull => {
                self.ident(column);
                self.push(" IS NOT NULL");
            }
            PredicateKind::Equal => self.binary(column, "=", operands),
            PredicateKind::NotEqual => self.binary(column, "<>", operands),
            PredicateKind::GreaterThan => self.binary(column, ">", operands),
            PredicateKind::GreaterOrEqual => self.binary(column, ">=", operands),
            PredicateKind::LessThan => self.binary(column, "<", operands),
            PredicateKind::LessOrEqual => self.binary(column, "<=", operands),
            PredicateKind::Between => self.between(column, "BETWEEN", operands),
            PredicateKind::NotBetween => self.between(column, "NOT BETWEEN", operands),
            PredicateKind::In => self.in_list(column, false, operands),
            PredicateKind::NotIn => self.in_list(column, true, operands),
            PredicateKind::StartsWith => self.like(column, "LIKE", "", "%", operands),
            PredicateKind::NotStartsWith => self.like(column, "NOT LIKE", "", "%", operands),
            PredicateKind::EndsWith => self.like(column, "LIKE", "%", "", operands),
            PredicateKind::NotEndsWith => self.like(column, "NOT LIKE", "%", "", operands),
            PredicateKind::Contains => self.like(column, "LIKE", "%", "%", operands),
            PredicateKind::NotContains => self.like(column, "NOT LIKE", "%", "%", operands),
        }
    }

    fn binary(&mut self, column: &str, op: &str, operands: &[Value]) {
        self.ident(column);
        let _ = write!(self.sql, " {op} ");
        self.param(operands.first().cloned().unwrap_or(Value::Null));
    }

    fn between(&mut self, column: &str, op: &str, operands: &[Value]) {
        self.ident(column);
        let _ = write!(self.sql, " {op} ");
        self.param(operands.first().cloned().unwrap_or(Value::Null));
        self.push(" AND ");
        self.param(operands.get(1).cloned().unwrap_or(Value::Null));
    }

    // An empty NOT IN still has to drop null rows to match in-process
    // semantics, so it renders as a null check.
    fn in_list(&mut self, column: &str, negated: bool, operands: &[Value]) {
        if operands.is_empty() {
            if negated {
                self.ident(column);
                self.push(" IS NOT NULL");
            } else {
                self.push("1 = 0");
            }
            return;
        }

        self.ident(column);
        self.push(if negated { " NOT IN (" } else { " IN (" });
        for (index, value) in operands.iter().enumerate() {
            if index > 0 {
                self.push(", ");
            }
            self.param(value.clone());
        }
        self.push(")");
    }

    fn like(&mut self, column: &str, op: &str, prefix: &str, suffix: &str, operands: &[Value]) {
        let needle = operands.first().and_then(Value::as_text).unwrap_or_default();
        let pattern = format!("{prefix}{}{suffix}", escape_like(needle));

        self.ident(column);
        let _ = write!(self.sql, " {op} ");
        self.param(Value::Text(pattern));
        self.push(" ESCAPE '\\'");
    }

    fn order_key<E>(&mut self, comparator: &FieldComparator<E>) {
        let column = comparator.field().name();

        match comparator.null_order() {
            NullOrder::First => {
                self.ident(column);
                self.push(" IS NULL DESC, ");
            }
            NullOrder::Last => {
                self.ident(column);
                self.push(" IS NULL ASC, ");
            }
            NullOrder::None => {}
        }

        self.ident(column);
        self.push(if comparator.is_reversed() { " DESC" } else { " ASC" });
    }

    // Order only matters when a window picks rows; aggregates and
    // existence checks must not carry an ORDER BY.
    fn select_body<E>(&mut self, fragment: &StoreFragment<E>, projection: &str, ordered: bool) {
        let _ = write!(self.sql, "SELECT {projection} FROM ");
        let table = self
            .options
            .table
            .clone()
            .unwrap_or_else(|| fragment.entity().to_string());
        self.ident(&table);

        for (index, predicate) in fragment.predicates().iter().enumerate() {
            self.push(if index == 0 { " WHERE " } else { " AND " });
            self.predicate(predicate);
        }

        let order = if ordered { fragment.order() } else { &[] };
        for (index, comparator) in order.iter().enumerate() {
            self.push(if index == 0 { " ORDER BY " } else { ", " });
            self.order_key(comparator);
        }

        if let Some(window) = fragment.window() {
            if let Some(limit) = window.limit {
                self.push(" LIMIT ");
                self.param(Value::Uint(limit));
            }
            if window.offset > 0 {
                self.push(" OFFSET ");
                self.param(Value::Uint(window.offset));
            }
        }
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

impl<E> StoreFragment<E> {
    /// Render as a parameterized SQL statement.
    #[must_use]
    pub fn render(&self, options: &SqlOptions) -> SqlFragment {
        let mut writer = SqlWriter::new(options);

        match self.shape() {
            FragmentShape::Rows => writer.select_body(self, "*", true),
            FragmentShape::Count if self.window().is_some() => {
                writer.push("SELECT COUNT(*) FROM (");
                writer.select_body(self, "1", true);
                writer.push(") AS ");
                writer.ident("windowed");
            }
            FragmentShape::Count => writer.select_body(self, "COUNT(*)", false),
            FragmentShape::Exists => {
                writer.push("SELECT EXISTS (");
                writer.select_body(self, "1", self.window().is_some());
                writer.push(")");
            }
            FragmentShape::NotExists => {
                writer.push("SELECT NOT EXISTS (");
                writer.select_body(self, "1", self.window().is_some());
                writer.push(")");
            }
        }

        SqlFragment {
            sql: writer.sql,
            params: writer.params,
        }
    }
}
