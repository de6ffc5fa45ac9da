use crate::operator::Operator;
use crate::result::ResultSet;
use crate::Result;
use shadowdb_error::{errinput, Error};
use std::collections::BTreeMap;
use std::thread;
use tracing::debug;

/// The pipeline stages, in the fixed order rows flow through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClauseKind {
    TableRead,
    Distinct,
    ColumnFunction,
    Selection,
    Rename,
    Aggregation,
    Compute,
    Having,
    Sort,
    Limit,
    Projection,
}

/// A compiled query: at most one operator per stage.
///
/// Stages that were not configured are skipped. Executing the plan chains the operators with
/// bounded channels, runs each on its own thread and gathers the rows leaving the last stage.
pub struct QueryPlan<'a> {
    operators: BTreeMap<ClauseKind, Box<dyn Operator + 'a>>,
    columns: Vec<String>,
}

impl<'a> QueryPlan<'a> {
    /// `columns` are the output column names, in presentation order.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            operators: BTreeMap::new(),
            columns,
        }
    }

    /// Installs the operator for a stage, replacing any operator already there.
    pub fn set(&mut self, kind: ClauseKind, operator: impl Operator + 'a) {
        self.operators.insert(kind, Box::new(operator));
    }

    pub fn stages(&self) -> Vec<ClauseKind> {
        self.operators
            .iter()
            .filter(|(_, op)| op.is_active())
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Runs the pipeline to completion. If any operator fails, the error of the earliest failing
    /// stage is returned and the rows are discarded.
    pub fn execute(self) -> Result<ResultSet> {
        if !self.operators.contains_key(&ClauseKind::TableRead) {
            return errinput!("query has no table to read");
        }

        let mut stages: Vec<(ClauseKind, Box<dyn Operator + 'a>)> = self
            .operators
            .into_iter()
            .filter(|(_, op)| op.is_active())
            .collect();
        debug!(stages = ?stages.iter().map(|(k, _)| *k).collect::<Vec<_>>(), "executing query");

        let mut upstream = None;
        for (_, op) in stages.iter_mut() {
            if let Some(rx) = upstream.take() {
                op.connect_input(rx);
            }
            upstream = op.output();
        }
        let Some(mut output) = upstream else {
            return Err(Error::InvalidData("pipeline produced no output".to_string()));
        };

        let (rows, results) = thread::scope(|s| {
            let handles: Vec<_> = stages
                .into_iter()
                .map(|(kind, mut op)| {
                    s.spawn(move || {
                        let result = op.process();
                        if let Err(err) = &result {
                            debug!(stage = op.name(), %err, "operator failed");
                        }
                        // Dropping the operator closes both of its channel ends.
                        drop(op);
                        (kind, result)
                    })
                })
                .collect();

            let mut rows = Vec::new();
            while let Some(row) = output.blocking_recv() {
                rows.push(row);
            }

            let results: Vec<_> = handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect();
            (rows, results)
        });

        for (_, result) in results {
            result?;
        }
        Ok(ResultSet::new(self.columns, rows))
    }
}
