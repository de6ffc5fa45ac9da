use crate::operator::{impl_ports, Operator, Ports};
use crate::Result;
use bytes::Bytes;
use shadowdb_catalog::tuple::Tuple;
use std::collections::BTreeMap;

/// Orders rows by the encoded values of the sort columns.
///
/// Field encodings preserve order within a type, so comparing the encoded keys column by
/// column gives value order. Rows with equal keys keep their arrival order, in both
/// directions.
pub struct SortExec {
    columns: Vec<String>,
    descending: bool,
    ports: Ports,
}

impl SortExec {
    pub fn new(columns: Vec<String>, descending: bool) -> Self {
        Self {
            columns,
            descending,
            ports: Ports::new(),
        }
    }

    fn key(&self, tuple: &Tuple) -> Result<Vec<Bytes>> {
        self.columns
            .iter()
            .map(|name| Ok(tuple.cell(name)?.data().clone()))
            .collect()
    }
}

impl Operator for SortExec {
    fn process(&mut self) -> Result<()> {
        let mut sorted: BTreeMap<Vec<Bytes>, Vec<Tuple>> = BTreeMap::new();
        while let Some(tuple) = self.ports.recv()? {
            sorted.entry(self.key(&tuple)?).or_default().push(tuple);
        }

        let groups: Box<dyn Iterator<Item = Vec<Tuple>>> = if self.descending {
            Box::new(sorted.into_values().rev())
        } else {
            Box::new(sorted.into_values())
        };
        'emit: for group in groups {
            for tuple in group {
                if !self.ports.send(tuple) {
                    break 'emit;
                }
            }
        }
        self.ports.close();
        Ok(())
    }

    impl_ports!();

    fn name(&self) -> &'static str {
        "sort"
    }
}
