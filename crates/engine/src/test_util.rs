use crate::database::Database;
use crate::instance::Instance;
use crate::options::Options;
use shadowdb_catalog::column::Column;
use shadowdb_catalog::types::Type;
use shadowdb_execution::result::ResultSet;
use shadowdb_storage::disk::IoMode;
use std::path::Path;
use std::sync::Arc;

/// An instance rooted at `root` with three-row pages and the test conditions registered.
pub(crate) fn instance(root: &Path, io_mode: IoMode) -> Instance {
    let mut options = Options::new(root);
    options.io_mode = io_mode;
    options.max_rows = 3;
    options.max_pages = 2;
    let mut instance = Instance::new(options).expect("root directory is writable");
    let functions = instance.functions_mut();
    functions.register_condition("adult", |v| Ok(v[0].as_i64().unwrap_or(0) >= 18));
    functions.register_condition("cheap", |v| Ok(v[0].as_f64().unwrap_or(0.0) < 3.0));
    instance
}

/// Database `shop` with an empty `test (name VARCHAR, age INTEGER, price FLOAT)` table.
pub(crate) fn shop(instance: &Instance) -> Arc<Database> {
    let db = instance.create_database("shop").expect("fresh database");
    db.create_table(
        "test",
        vec![
            Column::new("name".to_string(), Type::Varchar),
            Column::new("age".to_string(), Type::Integer),
            Column::new("price".to_string(), Type::Float),
        ],
    )
    .expect("fresh table");
    db
}

pub(crate) fn insert(db: &Database, name: &str, age: i64, price: f64) {
    db.update(&format!(
        r#"insert into test (name, age, price) values ("{name}", {age}, {price:?})"#
    ))
    .expect("valid insert");
}

pub(crate) fn ints(result: &ResultSet, column: &str) -> Vec<i64> {
    result
        .values(column)
        .expect("column is in the result")
        .iter()
        .map(|field| field.as_i64().expect("integer column"))
        .collect()
}

pub(crate) fn strings(result: &ResultSet, column: &str) -> Vec<String> {
    result
        .values(column)
        .expect("column is in the result")
        .iter()
        .map(|field| field.as_str().expect("varchar column").to_string())
        .collect()
}
