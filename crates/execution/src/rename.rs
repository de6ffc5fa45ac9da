use crate::operator::{impl_ports, Operator, Ports};
use crate::Result;

/// Makes each `(from, to)` column available under its new name as well.
pub struct RenameExec {
    renames: Vec<(String, String)>,
    ports: Ports,
}

impl RenameExec {
    pub fn new(renames: Vec<(String, String)>) -> Self {
        Self {
            renames,
            ports: Ports::new(),
        }
    }
}

impl Operator for RenameExec {
    fn process(&mut self) -> Result<()> {
        while let Some(mut tuple) = self.ports.recv()? {
            for (from, to) in &self.renames {
                let cell = tuple.cell(from)?.clone();
                tuple.set(to.clone(), cell);
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
        !self.renames.is_empty()
    }

    fn name(&self) -> &'static str {
        "rename"
    }
}
