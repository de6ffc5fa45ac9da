use crate::Result;
use shadowdb_catalog::field::Field;
use shadowdb_error::{errinput, Error};
use std::collections::HashMap;
use std::sync::Arc;

/// A row predicate over the values of the columns it is applied to.
pub type ConditionFn = Arc<dyn Fn(&[Field]) -> Result<bool> + Send + Sync>;
/// Maps one value to a derived value.
pub type ColumnFn = Arc<dyn Fn(&Field) -> Result<Field> + Send + Sync>;
/// Reduces the values of one column across a group.
pub type AggregateFn = Arc<dyn Fn(&[Field]) -> Result<Field> + Send + Sync>;
/// Computes a value from several columns of the same row.
pub type ComputeFn = Arc<dyn Fn(&[Field]) -> Result<Field> + Send + Sync>;

/// Which registry table a function name resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Condition,
    Column,
    Aggregate,
    Compute,
}

/// The named functions statements may call.
///
/// A registry is a plain value: whoever compiles a statement is handed one, and a clone taken
/// at some point is unaffected by registrations made on the original afterwards.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    conditions: HashMap<String, ConditionFn>,
    columns: HashMap<String, ColumnFn>,
    aggregates: HashMap<String, AggregateFn>,
    computes: HashMap<String, ComputeFn>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the `sum`, `count`, `min`, `max` and `avg` aggregates.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_aggregate("sum", |values| {
            values
                .iter()
                .try_fold(Field::Integer(0), |acc, value| acc.checked_add(value))
        });
        registry.register_aggregate("count", |values| Ok(Field::Integer(values.len() as i64)));
        registry.register_aggregate("min", |values| {
            values
                .iter()
                .min()
                .cloned()
                .ok_or_else(|| Error::InvalidInput("min of no values".to_string()))
        });
        registry.register_aggregate("max", |values| {
            values
                .iter()
                .max()
                .cloned()
                .ok_or_else(|| Error::InvalidInput("max of no values".to_string()))
        });
        registry.register_aggregate("avg", |values| {
            if values.is_empty() {
                return errinput!("avg of no values");
            }
            let mut total = 0.0;
            for value in values {
                match value.as_f64() {
                    Some(v) => total += v,
                    None => return errinput!("cannot average {} values", value.get_type()),
                }
            }
            Ok(Field::Float(total / values.len() as f64))
        });
        registry
    }

    pub fn register_condition(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Field]) -> Result<bool> + Send + Sync + 'static,
    ) {
        self.conditions.insert(name.into(), Arc::new(f));
    }

    pub fn register_column(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Field) -> Result<Field> + Send + Sync + 'static,
    ) {
        self.columns.insert(name.into(), Arc::new(f));
    }

    pub fn register_aggregate(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Field]) -> Result<Field> + Send + Sync + 'static,
    ) {
        self.aggregates.insert(name.into(), Arc::new(f));
    }

    pub fn register_compute(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Field]) -> Result<Field> + Send + Sync + 'static,
    ) {
        self.computes.insert(name.into(), Arc::new(f));
    }

    pub fn condition(&self, name: &str) -> Result<ConditionFn> {
        match self.conditions.get(name) {
            Some(f) => Ok(f.clone()),
            None => errinput!("unknown condition function {name}"),
        }
    }

    pub fn column(&self, name: &str) -> Result<ColumnFn> {
        match self.columns.get(name) {
            Some(f) => Ok(f.clone()),
            None => errinput!("unknown column function {name}"),
        }
    }

    pub fn aggregate(&self, name: &str) -> Result<AggregateFn> {
        match self.aggregates.get(name) {
            Some(f) => Ok(f.clone()),
            None => errinput!("unknown aggregate function {name}"),
        }
    }

    pub fn compute(&self, name: &str) -> Result<ComputeFn> {
        match self.computes.get(name) {
            Some(f) => Ok(f.clone()),
            None => errinput!("unknown compute function {name}"),
        }
    }

    /// Resolves a function called from a select list. Column functions shadow aggregates,
    /// which shadow compute functions.
    pub fn select_kind(&self, name: &str) -> Option<FunctionKind> {
        if self.columns.contains_key(name) {
            Some(FunctionKind::Column)
        } else if self.aggregates.contains_key(name) {
            Some(FunctionKind::Aggregate)
        } else if self.computes.contains_key(name) {
            Some(FunctionKind::Compute)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn sorted(mut names: Vec<&String>) -> Vec<&String> {
            names.sort();
            names
        }
        f.debug_struct("FunctionRegistry")
            .field("conditions", &sorted(self.conditions.keys().collect()))
            .field("columns", &sorted(self.columns.keys().collect()))
            .field("aggregates", &sorted(self.aggregates.keys().collect()))
            .field("computes", &sorted(self.computes.keys().collect()))
            .finish()
    }
}

/// The name a derived value is stored under, e.g. `sum(price)` or `area(w,h)`.
pub fn derived_name(function: &str, columns: &[String]) -> String {
    format!("{}({})", function, columns.join(","))
}

/// Whether a column name was produced by a function rather than stored in a table.
pub fn is_derived(name: &str) -> bool {
    name.contains('(')
}
