use serde_json::{Number, Value};
use sqlx::{postgres::PgArguments, FromRow};

use super::partial_update::StatementFragment;

/// Collects `WHERE` conditions with positional parameters.
///
/// Used by the list endpoints: each filter the caller supplied adds one
/// condition, parameters are numbered in the order conditions are pushed.
#[derive(Debug, Default)]
pub struct WhereClause {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a condition that uses exactly one parameter. `{}` in `template`
    /// is replaced with the parameter's placeholder.
    pub fn push(&mut self, template: &str, param: Value) -> &mut Self {
        self.params.push(param);
        let placeholder = format!("${}", self.params.len());
        self.conditions.push(template.replace("{}", &placeholder));
        self
    }

    /// Push a condition without parameters
    pub fn push_raw(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as ` WHERE a AND b`, or an empty string when no conditions were pushed.
    pub fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Compose `UPDATE <table> SET <fragment> WHERE <key> = $n RETURNING <returning>`
/// where `$n` is the first placeholder after the fragment's values.
pub fn update_statement(
    table: &str,
    fragment: &StatementFragment,
    key_column: &str,
    returning: &str,
) -> String {
    format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
        table,
        fragment.set_clause,
        key_column,
        fragment.next_placeholder(),
        returning
    )
}

/// How a JSON number goes out as a parameter
#[derive(Debug, PartialEq)]
enum NumberBind {
    Int(i64),
    Float(f64),
    /// Postgres has no u64; anything above `i64::MAX` goes out as text
    Text(String),
}

impl NumberBind {
    fn of(n: &Number) -> Self {
        if let Some(i) = n.as_i64() {
            NumberBind::Int(i)
        } else if n.is_u64() {
            NumberBind::Text(n.to_string())
        } else if let Some(f) = n.as_f64() {
            NumberBind::Float(f)
        } else {
            NumberBind::Text(n.to_string())
        }
    }
}

/// Bind a JSON value as a positional parameter.
///
/// NULL goes out as an int4 NULL since sqlx has no untyped NULL. int4 has
/// an assignment cast to every nullable column type in the schema.
pub fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => q.bind(None::<i32>),
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => match NumberBind::of(n) {
            NumberBind::Int(i) => q.bind(i),
            NumberBind::Float(f) => q.bind(f),
            NumberBind::Text(t) => q.bind(t),
        },
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::partial_update::{sql_for_partial_update, FieldNameTable, UpdatePayload};
    use serde_json::json;

    #[test]
    fn numbers_bind_without_wrapping() {
        assert_eq!(NumberBind::of(&Number::from(-5)), NumberBind::Int(-5));
        assert_eq!(NumberBind::of(&Number::from(i64::MAX as u64)), NumberBind::Int(i64::MAX));
        assert_eq!(
            NumberBind::of(&Number::from(u64::MAX)),
            NumberBind::Text(u64::MAX.to_string())
        );
        assert_eq!(
            NumberBind::of(&Number::from_f64(0.5).unwrap()),
            NumberBind::Float(0.5)
        );
    }

    #[test]
    fn where_clause_numbers_params_in_push_order() {
        let mut w = WhereClause::new();
        w.push("name ILIKE {}", json!("%net%"))
            .push_raw("equity > 0")
            .push("num_employees >= {}", json!(10));
        assert_eq!(w.to_sql(), " WHERE name ILIKE $1 AND equity > 0 AND num_employees >= $2");
        assert_eq!(w.params(), &[json!("%net%"), json!(10)]);
    }

    #[test]
    fn empty_where_clause_renders_nothing() {
        let w = WhereClause::new();
        assert!(w.is_empty());
        assert_eq!(w.to_sql(), "");
    }

    #[test]
    fn update_statement_puts_key_after_values() {
        let payload = UpdatePayload::new()
            .with("numEmployees", json!(5))
            .with("name", json!("C1 Renamed"));
        let names = FieldNameTable::from_pairs(&[("numEmployees", "num_employees")]);
        let fragment = sql_for_partial_update(&payload, &names).unwrap();
        let sql = update_statement("companies", &fragment, "handle", "handle, name");
        assert_eq!(
            sql,
            r#"UPDATE companies SET "num_employees"=$1, "name"=$2 WHERE handle = $3 RETURNING handle, name"#
        );
    }
}
