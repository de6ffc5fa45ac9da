//! The statement language: a small SQL subset.
//!
//! Statements are split into clauses by keyword rather than parsed by a grammar. Keywords,
//! commas and semicolons only count outside quotes and parentheses.
pub mod query;
pub mod update;

use crate::Result;
use chrono::{DateTime, Utc};
use shadowdb_catalog::field::Field;
use shadowdb_catalog::types::Type;
use shadowdb_error::{errinput, Error};

pub use query::{OrderBy, Select, SelectItem};
pub use update::Mutation;

/// A function applied to columns, e.g. `adult(age)` or `area(w, h)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub function: String,
    pub args: Vec<String>,
}

impl Call {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (Some(open), Some(close)) = (text.find('('), text.rfind(')')) else {
            return errinput!("expected a function call, found {text:?}");
        };
        if close < open || !text[close + 1..].trim().is_empty() {
            return errinput!("malformed function call {text:?}");
        }
        let function = text[..open].trim();
        if !is_identifier(function) {
            return errinput!("invalid function name {function:?}");
        }
        let args = split_top_level(&text[open + 1..close], ',')
            .into_iter()
            .map(|arg| arg.trim().to_string())
            .filter(|arg| !arg.is_empty())
            .collect();
        Ok(Self {
            function: function.to_string(),
            args,
        })
    }
}

/// Whether every parenthesis outside a quoted string is matched.
pub fn check_parentheses(text: &str) -> bool {
    let mut depth = 0usize;
    let mut quote = None;
    for c in text.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            (None, _) => {}
        }
    }
    depth == 0 && quote.is_none()
}

/// Splits on `sep` wherever it occurs outside quotes and parentheses.
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            (None, _) => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Splits a batch of statements on top-level `;`, dropping empty statements.
pub fn split_statements(text: &str) -> Vec<&str> {
    split_top_level(text, ';')
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub(crate) fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_word_char)
}

/// Matches a (possibly multi-word) keyword case-insensitively at the start of `rest`, returning
/// the byte length matched. Words are separated by any run of whitespace and the keyword must
/// end at a word boundary.
fn match_keyword(rest: &str, keyword: &str) -> Option<usize> {
    let mut pos = 0;
    for (n, word) in keyword.split(' ').enumerate() {
        if n > 0 {
            let gap = rest[pos..].len() - rest[pos..].trim_start().len();
            if gap == 0 {
                return None;
            }
            pos += gap;
        }
        let candidate = rest.get(pos..pos + word.len())?;
        if !candidate.eq_ignore_ascii_case(word) {
            return None;
        }
        pos += word.len();
    }
    match rest[pos..].chars().next() {
        Some(c) if is_word_char(c) => None,
        _ => Some(pos),
    }
}

/// Finds every top-level occurrence of one of `keywords`, as `(start, end, keyword)`.
fn keyword_marks(text: &str, keywords: &[&'static str]) -> Vec<(usize, usize, &'static str)> {
    let mut marks = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut prev: Option<char> = None;
    let mut skip_to = 0;
    for (i, c) in text.char_indices() {
        if i < skip_to {
            continue;
        }
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, _) if depth == 0 && !prev.is_some_and(is_word_char) => {
                if let Some((len, keyword)) = keywords
                    .iter()
                    .find_map(|kw| match_keyword(&text[i..], kw).map(|len| (len, *kw)))
                {
                    marks.push((i, i + len, keyword));
                    skip_to = i + len;
                }
            }
            (None, _) => {}
        }
        prev = Some(c);
    }
    marks
}

/// Cuts a statement into `(keyword, body)` pairs at every top-level occurrence of one of
/// `keywords`. Keywords are reported as given. Text before the first keyword is an error.
pub fn split_clauses(text: &str, keywords: &[&'static str]) -> Result<Vec<(&'static str, String)>> {
    let marks = keyword_marks(text, keywords);
    let leading = match marks.first() {
        Some((start, _, _)) => &text[..*start],
        None => text,
    };
    if !leading.trim().is_empty() {
        return errinput!("unexpected {:?}", leading.trim());
    }

    let mut clauses = Vec::new();
    for (n, (_, body_start, keyword)) in marks.iter().enumerate() {
        let body_end = marks.get(n + 1).map_or(text.len(), |next| next.0);
        clauses.push((*keyword, text[*body_start..body_end].trim().to_string()));
    }
    Ok(clauses)
}

/// Splits `expr as alias` into its parts.
pub fn split_alias(text: &str) -> Result<(String, Option<String>)> {
    match keyword_marks(text, &["as"]).as_slice() {
        [] => Ok((text.trim().to_string(), None)),
        [(start, end, _)] => {
            let expr = text[..*start].trim();
            let alias = text[*end..].trim();
            if expr.is_empty() || !is_identifier(alias) {
                return errinput!("invalid alias in {text:?}");
            }
            Ok((expr.to_string(), Some(alias.to_string())))
        }
        _ => errinput!("invalid alias in {text:?}"),
    }
}

/// Parses a literal as a value of the given column type.
pub fn parse_literal(text: &str, field_type: Type) -> Result<Field> {
    let text = text.trim();
    let invalid = |what: &str| Error::InvalidInput(format!("invalid {what} {text:?}"));
    let field = match field_type {
        Type::Boolean if text.eq_ignore_ascii_case("true") => Field::Boolean(true),
        Type::Boolean if text.eq_ignore_ascii_case("false") => Field::Boolean(false),
        Type::Boolean => return Err(invalid("boolean")),
        Type::Integer => Field::Integer(text.parse().map_err(|_| invalid("integer"))?),
        Type::Float => Field::Float(text.parse().map_err(|_| invalid("float"))?),
        Type::Varchar => match unquote(text) {
            Some(s) => Field::Varchar(s.to_string()),
            None => return errinput!("expected a quoted string, found {text}"),
        },
        Type::Timestamp => {
            let ts = DateTime::parse_from_rfc3339(unquote(text).unwrap_or(text))
                .map_err(|_| invalid("timestamp"))?;
            Field::Timestamp(ts.with_timezone(&Utc))
        }
    };
    Ok(field)
}

fn unquote(text: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|q| {
        text.strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_parentheses() {
        assert!(check_parentheses("select f(a, g(b)) from t"));
        assert!(check_parentheses(r#"insert into t values ("(")"#));
        assert!(!check_parentheses("select f(a from t"));
        assert!(!check_parentheses("select f)a( from t"));
        assert!(!check_parentheses(r#"select "abc from t"#));
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level(r#"a, f(b, c), "x,y""#, ','),
            vec!["a", " f(b, c)", r#" "x,y""#]
        );
        assert_eq!(split_statements(" a ; b;; "), vec!["a", "b"]);
        assert_eq!(split_statements(r#"insert into t values ("a;b")"#).len(), 1);
    }

    #[test]
    fn test_split_clauses() {
        let clauses = split_clauses(
            "SELECT name, fromage(x) FROM t WHERE  f(name) Order  By name desc limit 1,2",
            &["select", "from", "where", "group by", "order by", "limit"],
        )
        .unwrap();
        assert_eq!(
            clauses,
            vec![
                ("select", "name, fromage(x)".to_string()),
                ("from", "t".to_string()),
                ("where", "f(name)".to_string()),
                ("order by", "name desc".to_string()),
                ("limit", "1,2".to_string()),
            ]
        );

        // Keywords inside strings and calls are ignored.
        let clauses =
            split_clauses(r#"where f("from here", where_col)"#, &["from", "where"]).unwrap();
        assert_eq!(clauses.len(), 1);

        assert!(split_clauses("name from t", &["select", "from"]).is_err());
    }

    #[test]
    fn test_call_and_alias() {
        assert_eq!(
            Call::parse(" area( w , h ) ").unwrap(),
            Call {
                function: "area".into(),
                args: vec!["w".into(), "h".into()]
            }
        );
        assert!(Call::parse("area").is_err());
        assert!(Call::parse("area(w) x").is_err());

        assert_eq!(
            split_alias("sum(price) AS total").unwrap(),
            ("sum(price)".to_string(), Some("total".to_string()))
        );
        assert_eq!(split_alias("basket").unwrap(), ("basket".to_string(), None));
        assert!(split_alias("a as b c").is_err());
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse_literal("12", Type::Integer), Ok(Field::Integer(12)));
        assert_eq!(parse_literal("-3", Type::Float), Ok(Field::Float(-3.0)));
        assert_eq!(parse_literal(" TRUE ", Type::Boolean), Ok(Field::Boolean(true)));
        assert_eq!(parse_literal(r#""a b""#, Type::Varchar), Ok(Field::from("a b")));
        assert_eq!(parse_literal("'x'", Type::Varchar), Ok(Field::from("x")));
        assert_eq!(
            parse_literal("'1970-01-01T00:00:01Z'", Type::Timestamp)
                .unwrap()
                .to_string(),
            "1970-01-01T00:00:01+00:00"
        );

        assert!(parse_literal("1.5", Type::Integer).is_err());
        assert!(parse_literal("abc", Type::Varchar).is_err());
        assert!(parse_literal("\"", Type::Varchar).is_err());
        assert!(parse_literal("yes", Type::Boolean).is_err());
        assert!(parse_literal("yesterday", Type::Timestamp).is_err());
    }
}
