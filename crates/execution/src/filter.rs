use crate::operator::{column_values, impl_ports, Operator, Ports};
use crate::registry::ConditionFn;
use crate::Result;
use shadowdb_catalog::tuple::Tuple;

/// A named predicate bound to the columns it reads, e.g. `adult(age)`.
#[derive(Clone)]
pub struct Condition {
    function: String,
    columns: Vec<String>,
    f: ConditionFn,
}

impl Condition {
    pub fn new(function: impl Into<String>, columns: Vec<String>, f: ConditionFn) -> Self {
        Self {
            function: function.into(),
            columns,
            f,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn evaluate(&self, tuple: &Tuple) -> Result<bool> {
        let values = column_values(tuple, &self.columns)?;
        (self.f)(&values)
    }
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.function, self.columns.join(","))
    }
}

/// Passes on the rows for which every condition holds. Used both for `where` (before
/// aggregation) and for `having` (after it).
pub struct FilterExec {
    conditions: Vec<Condition>,
    ports: Ports,
}

impl FilterExec {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self {
            conditions,
            ports: Ports::new(),
        }
    }

    fn accepts(&self, tuple: &Tuple) -> Result<bool> {
        for condition in &self.conditions {
            if !condition.evaluate(tuple)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Operator for FilterExec {
    fn process(&mut self) -> Result<()> {
        while let Some(tuple) = self.ports.recv()? {
            if self.accepts(&tuple)? && !self.ports.send(tuple) {
                break;
            }
        }
        self.ports.close();
        Ok(())
    }

    impl_ports!();

    fn is_active(&self) -> bool {
        !self.conditions.is_empty()
    }

    fn name(&self) -> &'static str {
        "filter"
    }
}
