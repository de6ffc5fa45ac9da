use crate::operator::{impl_ports, Operator, Ports};
use crate::registry::{derived_name, AggregateFn};
use crate::Result;
use shadowdb_catalog::tuple::{Cell, Tuple};
use std::collections::HashMap;

/// One reducer of an aggregation, e.g. `sum(price) as total`.
#[derive(Clone)]
pub struct AggregateSpec {
    function: String,
    column: String,
    alias: Option<String>,
    f: AggregateFn,
}

impl AggregateSpec {
    pub fn new(
        function: impl Into<String>,
        column: impl Into<String>,
        alias: Option<String>,
        f: AggregateFn,
    ) -> Self {
        Self {
            function: function.into(),
            column: column.into(),
            alias,
            f,
        }
    }

    /// The name the result is stored under, e.g. `sum(price)`.
    pub fn output_name(&self) -> String {
        derived_name(&self.function, std::slice::from_ref(&self.column))
    }
}

/// Groups rows by the values of the group-by columns and reduces each group to one row.
///
/// The output row for a group is its first row plus one value per reducer. Groups come out in
/// the order their first row arrived. With no group-by columns the whole input is one group.
pub struct AggregateExec {
    group_by: Vec<String>,
    aggregates: Vec<AggregateSpec>,
    ports: Ports,
}

impl AggregateExec {
    pub fn new(group_by: Vec<String>, aggregates: Vec<AggregateSpec>) -> Self {
        Self {
            group_by,
            aggregates,
            ports: Ports::new(),
        }
    }

    fn group_key(&self, tuple: &Tuple) -> Result<blake3::Hash> {
        let mut hasher = blake3::Hasher::new();
        for name in &self.group_by {
            let data = tuple.cell(name)?.data();
            hasher.update(&(data.len() as u64).to_le_bytes());
            hasher.update(data);
        }
        Ok(hasher.finalize())
    }

    fn reduce(&self, group: Vec<Tuple>) -> Result<Option<Tuple>> {
        let Some(mut output) = group.first().cloned() else {
            return Ok(None);
        };
        for spec in &self.aggregates {
            let values = group
                .iter()
                .map(|tuple| tuple.field(&spec.column))
                .collect::<Result<Vec<_>>>()?;
            let cell = Cell::from_field(&(spec.f)(&values)?);
            if let Some(alias) = &spec.alias {
                output.set(alias.clone(), cell.clone());
            }
            output.set(spec.output_name(), cell);
        }
        Ok(Some(output))
    }
}

impl Operator for AggregateExec {
    fn process(&mut self) -> Result<()> {
        let mut groups: Vec<Vec<Tuple>> = Vec::new();
        let mut index: HashMap<blake3::Hash, usize> = HashMap::new();
        while let Some(tuple) = self.ports.recv()? {
            let key = self.group_key(&tuple)?;
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(tuple);
        }

        for group in groups {
            if let Some(output) = self.reduce(group)? {
                if !self.ports.send(output) {
                    break;
                }
            }
        }
        self.ports.close();
        Ok(())
    }

    impl_ports!();

    fn name(&self) -> &'static str {
        "aggregate"
    }
}
