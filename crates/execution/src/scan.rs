use crate::operator::{impl_ports, Operator, Ports};
use crate::Result;
use shadowdb_catalog::tuple::Tuple;

/// Something a table scan can read rows from: a table as seen by one transaction.
///
/// `scan` feeds every visible row to `emit` and stops early if `emit` returns `false`.
pub trait ScanSource: Sync {
    fn scan(&self, emit: &mut dyn FnMut(Tuple) -> bool) -> Result<()>;
}

/// Emits every row of its source.
pub struct ScanExec<'a> {
    source: &'a dyn ScanSource,
    ports: Ports,
}

impl<'a> ScanExec<'a> {
    pub fn new(source: &'a dyn ScanSource) -> Self {
        Self {
            source,
            ports: Ports::new(),
        }
    }
}

impl Operator for ScanExec<'_> {
    fn process(&mut self) -> Result<()> {
        let ports = &mut self.ports;
        let result = self.source.scan(&mut |tuple: Tuple| ports.send(tuple));
        self.ports.close();
        result
    }

    impl_ports!();

    fn name(&self) -> &'static str {
        "scan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{people, VecSource};

    #[test]
    fn test_scan_emits_everything() {
        let source = VecSource::new(people());
        let mut scan = ScanExec::new(&source);
        let mut output = scan.output().unwrap();

        // The channel is bounded, so drain it from another thread.
        let collected = std::thread::scope(|s| {
            let reader = s.spawn(move || {
                let mut rows = vec![];
                while let Some(row) = output.blocking_recv() {
                    rows.push(row);
                }
                rows
            });
            scan.process().unwrap();
            reader.join().unwrap()
        });
        assert_eq!(collected.len(), people().len());
    }
}
