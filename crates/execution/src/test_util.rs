use crate::scan::ScanSource;
use crate::Result;
use shadowdb_catalog::column::Column;
use shadowdb_catalog::field::Field;
use shadowdb_catalog::record_id::RecordId;
use shadowdb_catalog::schema::Schema;
use shadowdb_catalog::tuple::Tuple;
use shadowdb_catalog::types::Type;

/// An in-memory table.
pub struct VecSource {
    rows: Vec<Tuple>,
}

impl VecSource {
    pub fn new(rows: Vec<Tuple>) -> Self {
        Self { rows }
    }
}

impl ScanSource for VecSource {
    fn scan(&self, emit: &mut dyn FnMut(Tuple) -> bool) -> Result<()> {
        for row in &self.rows {
            if !emit(row.clone()) {
                break;
            }
        }
        Ok(())
    }
}

/// Six people, two of them the same age.
pub fn people() -> Vec<Tuple> {
    let schema = Schema::new(&[
        Column::new("name".into(), Type::Varchar),
        Column::new("age".into(), Type::Integer),
    ]);
    [("alice", 30), ("bob", 12), ("carol", 41), ("dave", 25), ("erin", 25), ("frank", -1)]
        .into_iter()
        .enumerate()
        .map(|(i, (name, age))| {
            let mut row =
                Tuple::from_fields(&schema, vec![Field::from(name), Field::Integer(age)]).unwrap();
            row.set_record_id(RecordId::new(1, i as u32));
            row
        })
        .collect()
}

/// Rows with a single integer column `n` running from 0 to `count - 1`.
pub fn numbers(count: i64) -> Vec<Tuple> {
    let schema = Schema::new(&[Column::new("n".into(), Type::Integer)]);
    (0..count)
        .map(|n| Tuple::from_fields(&schema, vec![Field::Integer(n)]).unwrap())
        .collect()
}
