use crate::operator::{impl_ports, Operator, Ports};
use crate::Result;
use shadowdb_catalog::tuple::Tuple;
use std::collections::HashSet;

/// Drops rows whose key columns repeat a row already emitted.
///
/// Rows are identified by a BLAKE3 digest over each key column's name, type and encoded value.
/// Without explicit key columns the whole row is the key.
pub struct DistinctExec {
    key: Option<Vec<String>>,
    seen: HashSet<blake3::Hash>,
    ports: Ports,
}

impl DistinctExec {
    pub fn new(key: Option<Vec<String>>) -> Self {
        Self {
            key,
            seen: HashSet::new(),
            ports: Ports::new(),
        }
    }

    fn digest(&self, tuple: &Tuple) -> Result<blake3::Hash> {
        let names: Vec<String> = match &self.key {
            Some(key) => key.clone(),
            None => {
                let mut names: Vec<String> = tuple.cells().map(|(name, _)| name.clone()).collect();
                names.sort();
                names
            }
        };

        let mut hasher = blake3::Hasher::new();
        for name in &names {
            let cell = tuple.cell(name)?;
            hasher.update(&(name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update(&[cell.field_type().tag()]);
            hasher.update(&(cell.data().len() as u64).to_le_bytes());
            hasher.update(cell.data());
        }
        Ok(hasher.finalize())
    }
}

impl Operator for DistinctExec {
    fn process(&mut self) -> Result<()> {
        while let Some(tuple) = self.ports.recv()? {
            let digest = self.digest(&tuple)?;
            if self.seen.insert(digest) && !self.ports.send(tuple) {
                break;
            }
        }
        self.ports.close();
        Ok(())
    }

    impl_ports!();

    fn name(&self) -> &'static str {
        "distinct"
    }
}
