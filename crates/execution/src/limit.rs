use crate::operator::{impl_ports, Operator, Ports};
use crate::Result;

/// Skips `offset` rows, then passes on at most `count`.
///
/// The rest of the input is still drained so that upstream operators run to completion rather
/// than stalling on a full channel.
pub struct LimitExec {
    offset: usize,
    count: usize,
    ports: Ports,
}

impl LimitExec {
    pub fn new(offset: usize, count: usize) -> Self {
        Self {
            offset,
            count,
            ports: Ports::new(),
        }
    }
}

impl Operator for LimitExec {
    fn process(&mut self) -> Result<()> {
        let mut seen = 0;
        let mut sent = 0;
        while let Some(tuple) = self.ports.recv()? {
            seen += 1;
            if seen <= self.offset || sent >= self.count {
                continue;
            }
            sent += 1;
            if !self.ports.send(tuple) {
                break;
            }
            if sent == self.count {
                // Nothing more goes out; let downstream finish early.
                self.ports.close();
            }
        }
        self.ports.close();
        Ok(())
    }

    impl_ports!();

    fn name(&self) -> &'static str {
        "limit"
    }
}
