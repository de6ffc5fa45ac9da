use super::query::parse_calls;
use super::{is_identifier, split_clauses, split_top_level, Call};
use crate::Result;
use shadowdb_error::errinput;

/// A parsed `insert`, `update` or `delete` statement. Values are kept as literal text until
/// they are checked against the table's column types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// `insert into t (a, b) values (1, "x")`. Without a column list the values cover every
    /// column in order.
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        values: Vec<String>,
    },
    /// `update t set a = 1, b = "x" where f(a)`.
    Update {
        table: String,
        assignments: Vec<(String, String)>,
        conditions: Vec<Call>,
    },
    /// `delete from t where f(a)`.
    Delete { table: String, conditions: Vec<Call> },
}

impl Mutation {
    pub fn parse(sql: &str) -> Result<Self> {
        let sql = sql.trim();
        let verb = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match verb.as_str() {
            "insert" => parse_insert(sql),
            "update" => parse_update(sql),
            "delete" => parse_delete(sql),
            _ => errinput!("invalid statement {sql:?}"),
        }
    }

    /// The table the statement modifies.
    pub fn table(&self) -> &str {
        match self {
            Self::Insert { table, .. } | Self::Update { table, .. } | Self::Delete { table, .. } => {
                table
            }
        }
    }
}

fn table_name(text: &str) -> Result<String> {
    let name = text.trim();
    if !is_identifier(name) {
        return errinput!("invalid table name {name:?}");
    }
    Ok(name.to_string())
}

/// Strips the outer parentheses of `(a, b)` and splits what is inside on commas.
fn parenthesized_list(text: &str) -> Result<Vec<String>> {
    let text = text.trim();
    let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) else {
        return errinput!("expected a parenthesized list, found {text:?}");
    };
    let items: Vec<String> = split_top_level(inner, ',')
        .into_iter()
        .map(|item| item.trim().to_string())
        .collect();
    if items.iter().any(String::is_empty) {
        return errinput!("empty item in {text:?}");
    }
    Ok(items)
}

fn parse_insert(sql: &str) -> Result<Mutation> {
    let clauses = split_clauses(sql, &["insert into", "values"])?;
    let [("insert into", target), ("values", values)] = clauses.as_slice() else {
        return errinput!("expected insert into <table> [(columns)] values (values)");
    };

    let (table, columns) = match target.find('(') {
        Some(open) => (
            table_name(&target[..open])?,
            Some(parenthesized_list(&target[open..])?),
        ),
        None => (table_name(target)?, None),
    };
    let values = parenthesized_list(values)?;
    if let Some(columns) = &columns {
        if columns.len() != values.len() {
            return errinput!(
                "{} columns but {} values in insert",
                columns.len(),
                values.len()
            );
        }
    }
    Ok(Mutation::Insert {
        table,
        columns,
        values,
    })
}

fn parse_update(sql: &str) -> Result<Mutation> {
    let clauses = split_clauses(sql, &["update", "set", "where"])?;
    let (table, assignments, conditions) = match clauses.as_slice() {
        [("update", table), ("set", set)] => (table, set, None),
        [("update", table), ("set", set), ("where", conditions)] => {
            (table, set, Some(conditions))
        }
        _ => return errinput!("expected update <table> set <assignments> [where <conditions>]"),
    };

    let assignments = split_top_level(assignments, ',')
        .into_iter()
        .map(|assignment| match assignment.split_once('=') {
            Some((column, value)) if is_identifier(column.trim()) && !value.trim().is_empty() => {
                Ok((column.trim().to_string(), value.trim().to_string()))
            }
            _ => errinput!("invalid assignment {:?}", assignment.trim()),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Mutation::Update {
        table: table_name(table)?,
        assignments,
        conditions: conditions.map_or(Ok(vec![]), |c| parse_calls(c))?,
    })
}

fn parse_delete(sql: &str) -> Result<Mutation> {
    let clauses = split_clauses(sql, &["delete from", "where"])?;
    let (table, conditions) = match clauses.as_slice() {
        [("delete from", table)] => (table, None),
        [("delete from", table), ("where", conditions)] => (table, Some(conditions)),
        _ => return errinput!("expected delete from <table> [where <conditions>]"),
    };
    Ok(Mutation::Delete {
        table: table_name(table)?,
        conditions: conditions.map_or(Ok(vec![]), |c| parse_calls(c))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_insert() {
        let insert = Mutation::parse(r#"insert into test (name, age ) values ( "a, b",  12 )"#);
        assert_eq!(
            insert,
            Ok(Mutation::Insert {
                table: "test".into(),
                columns: Some(vec!["name".into(), "age".into()]),
                values: vec![r#""a, b""#.into(), "12".into()],
            })
        );

        let insert = Mutation::parse("INSERT INTO test VALUES (1, 2.5)").unwrap();
        assert_eq!(insert.table(), "test");
        assert!(matches!(insert, Mutation::Insert { columns: None, .. }));

        assert!(Mutation::parse("insert into test (a, b) values (1)").is_err());
        assert!(Mutation::parse("insert into test values 1").is_err());
        assert!(Mutation::parse("insert test values (1)").is_err());
    }

    #[test]
    fn test_parse_update() {
        let update = Mutation::parse(r#"update test set name = "x=y", age=9 where old(age)"#);
        assert_eq!(
            update,
            Ok(Mutation::Update {
                table: "test".into(),
                assignments: vec![
                    ("name".into(), r#""x=y""#.into()),
                    ("age".into(), "9".into())
                ],
                conditions: vec![Call {
                    function: "old".into(),
                    args: vec!["age".into()]
                }],
            })
        );

        let update = Mutation::parse("update test set age = 1").unwrap();
        assert!(matches!(update, Mutation::Update { ref conditions, .. } if conditions.is_empty()));

        assert!(Mutation::parse("update test where old(age)").is_err());
        assert!(Mutation::parse("update test set age where old(age)").is_err());
    }

    #[test]
    fn test_parse_delete() {
        let delete = Mutation::parse("delete from test where old(age), cheap(price)").unwrap();
        let Mutation::Delete { table, conditions } = delete else {
            panic!("expected delete");
        };
        assert_eq!(table, "test");
        assert_eq!(conditions.len(), 2);

        assert!(Mutation::parse("delete from test").is_ok());
        assert!(Mutation::parse("delete test").is_err());
        assert!(Mutation::parse("drop table test").is_err());
    }
}
