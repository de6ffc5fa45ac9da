use crate::sql::{Call, Select, SelectItem};
use crate::Result;
use shadowdb_catalog::schema::Schema;
use shadowdb_error::errinput;
use shadowdb_execution::aggregate::{AggregateExec, AggregateSpec};
use shadowdb_execution::derive::{DeriveExec, Derivation};
use shadowdb_execution::distinct::DistinctExec;
use shadowdb_execution::filter::{Condition, FilterExec};
use shadowdb_execution::limit::LimitExec;
use shadowdb_execution::pipeline::{ClauseKind, QueryPlan};
use shadowdb_execution::project::ProjectExec;
use shadowdb_execution::registry::{derived_name, FunctionKind, FunctionRegistry};
use shadowdb_execution::rename::RenameExec;
use shadowdb_execution::scan::{ScanExec, ScanSource};
use shadowdb_execution::sort::SortExec;
use std::collections::HashSet;

/// Compiles a select statement into a pipeline reading from `source`.
///
/// Every table column and function the statement names is resolved here, so a plan that
/// compiles only fails at run time on bad data or a failing user function.
pub(crate) fn plan_select<'a>(
    select: &Select,
    source: &'a dyn ScanSource,
    schema: &Schema,
    registry: &FunctionRegistry,
) -> Result<QueryPlan<'a>> {
    let check_column = |name: &str| -> Result<()> {
        match schema.column_index_of(name) {
            Some(_) => Ok(()),
            None => errinput!("unknown column {name} in table {}", select.table),
        }
    };

    let mut output = Vec::new();
    let mut keep = HashSet::new();
    let mut referenced = Vec::new();
    let mut wildcard = false;
    let mut renames = Vec::new();
    let mut column_fns = Vec::new();
    let mut computes = Vec::new();
    let mut aggregates = Vec::new();
    // Names the select list adds to each row: aliases and derived columns.
    let mut added = HashSet::new();

    for item in &select.items {
        match item {
            SelectItem::Wildcard => {
                wildcard = true;
                for name in schema.names() {
                    keep.insert(name.clone());
                    output.push(name);
                }
            }
            SelectItem::Column { name, alias } => {
                check_column(name)?;
                referenced.push(name.clone());
                let shown = alias.clone().unwrap_or_else(|| name.clone());
                if let Some(alias) = alias {
                    renames.push((name.clone(), alias.clone()));
                    added.insert(alias.clone());
                }
                keep.insert(shown.clone());
                output.push(shown);
            }
            SelectItem::Function { call, alias } => {
                for arg in &call.args {
                    check_column(arg)?;
                    referenced.push(arg.clone());
                }
                let derived = derived_name(&call.function, &call.args);
                let shown = alias.clone().unwrap_or_else(|| derived.clone());
                added.insert(derived.clone());
                added.insert(shown.clone());
                match registry.select_kind(&call.function) {
                    Some(FunctionKind::Column) => {
                        let [column] = call.args.as_slice() else {
                            return errinput!("{} takes exactly one column", call.function);
                        };
                        column_fns.push(Derivation::column(
                            &call.function,
                            column,
                            registry.column(&call.function)?,
                        ));
                        if let Some(alias) = alias {
                            renames.push((derived, alias.clone()));
                        }
                    }
                    Some(FunctionKind::Aggregate) => {
                        let [column] = call.args.as_slice() else {
                            return errinput!("{} takes exactly one column", call.function);
                        };
                        aggregates.push(AggregateSpec::new(
                            &call.function,
                            column,
                            alias.clone(),
                            registry.aggregate(&call.function)?,
                        ));
                    }
                    Some(FunctionKind::Compute) => {
                        computes.push(Derivation::compute(
                            &call.function,
                            call.args.clone(),
                            alias.clone(),
                            registry.compute(&call.function)?,
                        ));
                    }
                    Some(FunctionKind::Condition) | None => {
                        return errinput!("unknown function {}", call.function);
                    }
                }
                keep.insert(shown.clone());
                output.push(shown);
            }
        }
    }

    let conditions = |calls: &[Call]| -> Result<Vec<Condition>> {
        calls
            .iter()
            .map(|call| {
                Ok(Condition::new(
                    &call.function,
                    call.args.clone(),
                    registry.condition(&call.function)?,
                ))
            })
            .collect()
    };

    // Where conditions run before aggregation, so they may only read stored columns or the
    // column functions computed ahead of them.
    let derived_early: HashSet<String> = column_fns.iter().map(Derivation::output_name).collect();
    for call in &select.conditions {
        for arg in &call.args {
            if !derived_early.contains(arg) {
                check_column(arg)?;
            }
        }
    }
    for column in &select.group_by {
        check_column(column)?;
    }
    // Having and order by run after every derived column exists.
    let check_late = |name: &str| -> Result<()> {
        if added.contains(name) {
            Ok(())
        } else {
            check_column(name)
        }
    };
    for call in &select.having {
        for arg in &call.args {
            check_late(arg)?;
        }
    }
    if let Some(order_by) = &select.order_by {
        for column in &order_by.columns {
            check_late(column)?;
        }
    }

    let mut plan = QueryPlan::new(output);
    plan.set(ClauseKind::TableRead, ScanExec::new(source));
    if select.distinct {
        let key = (!wildcard).then_some(referenced);
        plan.set(ClauseKind::Distinct, DistinctExec::new(key));
    }
    if !column_fns.is_empty() {
        plan.set(ClauseKind::ColumnFunction, DeriveExec::new(column_fns));
    }
    if !select.conditions.is_empty() {
        plan.set(ClauseKind::Selection, FilterExec::new(conditions(&select.conditions)?));
    }
    if !renames.is_empty() {
        plan.set(ClauseKind::Rename, RenameExec::new(renames));
    }
    if !aggregates.is_empty() || !select.group_by.is_empty() {
        plan.set(
            ClauseKind::Aggregation,
            AggregateExec::new(select.group_by.clone(), aggregates),
        );
    }
    if !computes.is_empty() {
        plan.set(ClauseKind::Compute, DeriveExec::new(computes));
    }
    if !select.having.is_empty() {
        plan.set(ClauseKind::Having, FilterExec::new(conditions(&select.having)?));
    }
    if let Some(order_by) = &select.order_by {
        plan.set(
            ClauseKind::Sort,
            SortExec::new(order_by.columns.clone(), order_by.descending),
        );
    }
    if let Some((offset, count)) = select.limit {
        plan.set(ClauseKind::Limit, LimitExec::new(offset, count));
    }
    plan.set(ClauseKind::Projection, ProjectExec::new(Some(keep)));
    Ok(plan)
}
