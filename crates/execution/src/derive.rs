use crate::operator::{column_values, impl_ports, Operator, Ports};
use crate::registry::{derived_name, ColumnFn, ComputeFn};
use crate::Result;
use shadowdb_catalog::tuple::{Cell, Tuple};
use shadowdb_error::errinput;

#[derive(Clone)]
enum DeriveFn {
    Column(ColumnFn),
    Compute(ComputeFn),
}

/// A value computed from other columns of the same row and stored as a new column.
#[derive(Clone)]
pub struct Derivation {
    function: String,
    columns: Vec<String>,
    alias: Option<String>,
    f: DeriveFn,
}

impl Derivation {
    /// A one-argument column function, e.g. `upper(name)`.
    pub fn column(function: impl Into<String>, column: impl Into<String>, f: ColumnFn) -> Self {
        Self {
            function: function.into(),
            columns: vec![column.into()],
            alias: None,
            f: DeriveFn::Column(f),
        }
    }

    /// A function over several columns, e.g. `area(w,h) as a`.
    pub fn compute(
        function: impl Into<String>,
        columns: Vec<String>,
        alias: Option<String>,
        f: ComputeFn,
    ) -> Self {
        Self {
            function: function.into(),
            columns,
            alias,
            f: DeriveFn::Compute(f),
        }
    }

    pub fn output_name(&self) -> String {
        derived_name(&self.function, &self.columns)
    }

    fn apply(&self, tuple: &mut Tuple) -> Result<()> {
        let values = column_values(tuple, &self.columns)?;
        let field = match &self.f {
            DeriveFn::Column(f) => match values.as_slice() {
                [value] => f(value)?,
                _ => return errinput!("{} takes exactly one column", self.function),
            },
            DeriveFn::Compute(f) => f(&values)?,
        };
        let cell = Cell::from_field(&field);
        if let Some(alias) = &self.alias {
            tuple.set(alias.clone(), cell.clone());
        }
        tuple.set(self.output_name(), cell);
        Ok(())
    }
}

/// Adds derived columns to every row. The pipeline uses one of these for column functions
/// (early, so that later stages can filter and rename them) and one for compute functions
/// (after aggregation).
pub struct DeriveExec {
    derivations: Vec<Derivation>,
    ports: Ports,
}

impl DeriveExec {
    pub fn new(derivations: Vec<Derivation>) -> Self {
        Self {
            derivations,
            ports: Ports::new(),
        }
    }
}

impl Operator for DeriveExec {
    fn process(&mut self) -> Result<()> {
        while let Some(mut tuple) = self.ports.recv()? {
            for derivation in &self.derivations {
                derivation.apply(&mut tuple)?;
            }
            if !self.ports.send(tuple) {
                break;
            }
        }
        self.ports.close();
        Ok(())
    }

    impl_ports!();

    fn is_active(&self) -> bool {
        !self.derivations.is_empty()
    }

    fn name(&self) -> &'static str {
        "derive"
    }
}
