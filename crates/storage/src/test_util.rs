use shadowdb_catalog::column::Column;
use shadowdb_catalog::field::Field;
use shadowdb_catalog::schema::Schema;
use shadowdb_catalog::tuple::Tuple;
use shadowdb_catalog::types::Type;

/// `(name VARCHAR, age INTEGER)`
pub(crate) fn schema() -> Schema {
    Schema::new(&[
        Column::new("name".to_string(), Type::Varchar),
        Column::new("age".to_string(), Type::Integer),
    ])
}

pub(crate) fn row(name: &str, age: i64) -> Tuple {
    Tuple::from_fields(&schema(), vec![name.into(), Field::Integer(age)])
        .expect("row matches the test schema")
}
