use super::{is_identifier, split_alias, split_clauses, split_top_level, Call};
use crate::Result;
use shadowdb_error::{errinput, Error};

const KEYWORDS: &[&str] = &[
    "select", "from", "where", "group by", "having", "order by", "limit",
];

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    /// `*`: every column of the table.
    Wildcard,
    /// A stored column, e.g. `name` or `name as n`.
    Column { name: String, alias: Option<String> },
    /// A function of columns, e.g. `sum(price) as total`.
    Function { call: Call, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub columns: Vec<String>,
    pub descending: bool,
}

/// A parsed `select` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub table: String,
    pub conditions: Vec<Call>,
    pub group_by: Vec<String>,
    pub having: Vec<Call>,
    pub order_by: Option<OrderBy>,
    /// `(offset, count)`.
    pub limit: Option<(usize, usize)>,
}

impl Select {
    /// `select * from <table> where <conditions>`, as updates and deletes use to find their
    /// rows.
    pub fn matching(table: &str, conditions: Vec<Call>) -> Self {
        Self {
            distinct: false,
            items: vec![SelectItem::Wildcard],
            table: table.to_string(),
            conditions,
            group_by: vec![],
            having: vec![],
            order_by: None,
            limit: None,
        }
    }

    pub fn parse(sql: &str) -> Result<Self> {
        let mut select = Self::matching("", vec![]);
        select.items.clear();
        let mut seen = Vec::new();

        for (keyword, body) in split_clauses(sql, KEYWORDS)? {
            if seen.contains(&keyword) {
                return errinput!("duplicate {keyword} clause");
            }
            seen.push(keyword);
            if body.is_empty() {
                return errinput!("empty {keyword} clause");
            }
            match keyword {
                "select" => {
                    let list = match split_clauses(&body, &["distinct"]) {
                        Ok(clauses) if clauses.len() == 1 => {
                            select.distinct = true;
                            clauses[0].1.clone()
                        }
                        _ => body,
                    };
                    select.items = parse_items(&list)?;
                }
                "from" => {
                    if !is_identifier(&body) {
                        return errinput!("invalid table name {body:?}");
                    }
                    select.table = body;
                }
                "where" => select.conditions = parse_calls(&body)?,
                "group by" => select.group_by = parse_columns(&body)?,
                "having" => select.having = parse_calls(&body)?,
                "order by" => select.order_by = Some(parse_order_by(&body)?),
                "limit" => select.limit = Some(parse_limit(&body)?),
                _ => return errinput!("unexpected {keyword}"),
            }
        }

        if !seen.contains(&"select") {
            return errinput!("expected select");
        }
        if select.table.is_empty() {
            return errinput!("missing from clause");
        }
        Ok(select)
    }
}

fn parse_items(list: &str) -> Result<Vec<SelectItem>> {
    split_top_level(list, ',')
        .into_iter()
        .map(|part| {
            let (expr, alias) = split_alias(part)?;
            if expr == "*" {
                if alias.is_some() {
                    return errinput!("* cannot be aliased");
                }
                Ok(SelectItem::Wildcard)
            } else if expr.contains('(') {
                Ok(SelectItem::Function {
                    call: Call::parse(&expr)?,
                    alias,
                })
            } else if is_identifier(&expr) {
                Ok(SelectItem::Column { name: expr, alias })
            } else {
                errinput!("invalid select item {expr:?}")
            }
        })
        .collect()
}

/// Parses a comma-separated list of conditions, which must all hold.
pub(crate) fn parse_calls(text: &str) -> Result<Vec<Call>> {
    split_top_level(text, ',').into_iter().map(Call::parse).collect()
}

fn parse_columns(text: &str) -> Result<Vec<String>> {
    split_top_level(text, ',')
        .into_iter()
        .map(|part| {
            let name = part.trim();
            if !is_identifier(name) && !name.contains('(') {
                return errinput!("invalid column {name:?}");
            }
            Ok(name.to_string())
        })
        .collect()
}

fn parse_order_by(text: &str) -> Result<OrderBy> {
    let text = text.trim();
    let lower = text.to_ascii_lowercase();
    let (columns, descending) = if lower.ends_with(" desc") {
        (&text[..text.len() - 5], true)
    } else if lower.ends_with(" asc") {
        (&text[..text.len() - 4], false)
    } else {
        (text, false)
    };
    Ok(OrderBy {
        columns: parse_columns(columns)?,
        descending,
    })
}

/// `limit count` or `limit offset, count`.
fn parse_limit(text: &str) -> Result<(usize, usize)> {
    let number = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| Error::InvalidInput(format!("invalid limit {:?}", s.trim())))
    };
    match split_top_level(text, ',').as_slice() {
        [count] => Ok((0, number(count)?)),
        [offset, count] => Ok((number(offset)?, number(count)?)),
        _ => errinput!("invalid limit {text:?}"),
    }
}
