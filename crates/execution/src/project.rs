use crate::operator::{impl_ports, Operator, Ports};
use crate::registry::is_derived;
use crate::Result;
use std::collections::HashSet;

/// Trims each row to the columns a query asked for. Derived values (names containing `(`)
/// always survive. Without a column set every stored column survives too, as for `select *`.
pub struct ProjectExec {
    keep: Option<HashSet<String>>,
    ports: Ports,
}

impl ProjectExec {
    pub fn new(keep: Option<HashSet<String>>) -> Self {
        Self {
            keep,
            ports: Ports::new(),
        }
    }
}

impl Operator for ProjectExec {
    fn process(&mut self) -> Result<()> {
        while let Some(mut tuple) = self.ports.recv()? {
            if let Some(keep) = &self.keep {
                tuple.retain(|name| keep.contains(name) || is_derived(name));
            }
            if !self.ports.send(tuple) {
                break;
            }
        }
        self.ports.close();
        Ok(())
    }

    impl_ports!();

    fn name(&self) -> &'static str {
        "project"
    }
}
