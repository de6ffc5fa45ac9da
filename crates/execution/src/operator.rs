use crate::Result;
use shadowdb_catalog::field::Field;
use shadowdb_catalog::tuple::Tuple;
use shadowdb_error::Error;
use tokio::sync::mpsc;

/// Capacity of the bounded channel between two adjacent operators.
pub const CHANNEL_CAPACITY: usize = 64;

pub type RowSender = mpsc::Sender<Tuple>;
pub type RowReceiver = mpsc::Receiver<Tuple>;

/// One relational operator of a query pipeline.
///
/// Every operator owns the channel it writes to. The pipeline hands the receiving end of one
/// operator's channel to the next operator, then runs each `process` on its own thread. An
/// operator's output closes when `process` returns (or the operator is dropped), which is how
/// downstream operators learn that their input is exhausted.
pub trait Operator: Send {
    /// Consumes the input stream to exhaustion, writing results to the output channel.
    fn process(&mut self) -> Result<()>;

    /// Attaches the upstream operator's output as this operator's input.
    fn connect_input(&mut self, upstream: RowReceiver);

    /// Hands out the receiving end of this operator's output. Only the first call returns it.
    fn output(&mut self) -> Option<RowReceiver>;

    /// Whether the operator was configured and belongs in the pipeline.
    fn is_active(&self) -> bool {
        true
    }

    /// A short name for logs.
    fn name(&self) -> &'static str;
}

/// The channel plumbing every operator carries.
#[derive(Debug)]
pub struct Ports {
    input: Option<RowReceiver>,
    output: Option<RowSender>,
    downstream: Option<RowReceiver>,
}

impl Ports {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            input: None,
            output: Some(tx),
            downstream: Some(rx),
        }
    }

    pub fn connect(&mut self, upstream: RowReceiver) {
        self.input = Some(upstream);
    }

    pub fn take_downstream(&mut self) -> Option<RowReceiver> {
        self.downstream.take()
    }

    /// Receives the next input row, or `None` once the upstream output has closed.
    pub fn recv(&mut self) -> Result<Option<Tuple>> {
        match self.input.as_mut() {
            Some(input) => Ok(input.blocking_recv()),
            None => Err(Error::InvalidInput("operator has no input".to_string())),
        }
    }

    /// Sends a row downstream. Returns `false` if the downstream receiver is gone, in which case
    /// there is no point producing more rows.
    pub fn send(&mut self, tuple: Tuple) -> bool {
        match self.output.as_ref() {
            Some(output) => output.blocking_send(tuple).is_ok(),
            None => false,
        }
    }

    /// Closes the output so that downstream sees the end of the stream.
    pub fn close(&mut self) {
        self.output = None;
    }
}

impl Default for Ports {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes the named values of a tuple, in the order given.
pub fn column_values(tuple: &Tuple, columns: &[String]) -> Result<Vec<Field>> {
    columns.iter().map(|name| tuple.field(name)).collect()
}

/// Implements the channel half of [`Operator`] for a struct with a `ports: Ports` field.
macro_rules! impl_ports {
    () => {
        fn connect_input(&mut self, upstream: $crate::operator::RowReceiver) {
            self.ports.connect(upstream);
        }

        fn output(&mut self) -> Option<$crate::operator::RowReceiver> {
            self.ports.take_downstream()
        }
    };
}
pub(crate) use impl_ports;

#[cfg(test)]
mod tests {
    use super::*;
    use shadowdb_catalog::record_id::RecordId;

    #[test]
    fn test_ports_forward_and_close() {
        let mut upstream = Ports::new();
        let mut ports = Ports::new();
        ports.connect(upstream.take_downstream().unwrap());
        let mut downstream = ports.take_downstream().unwrap();
        assert!(ports.take_downstream().is_none());

        let mut tuple = Tuple::new();
        tuple.set_record_id(RecordId::new(1, 2));
        assert!(upstream.send(tuple));
        upstream.close();

        let received = ports.recv().unwrap().unwrap();
        assert_eq!(received.record_id(), RecordId::new(1, 2));
        assert!(ports.recv().unwrap().is_none());

        drop(ports);
        // The sender was dropped with the operator, so the stream ends.
        assert!(downstream.blocking_recv().is_none());
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let mut ports = Ports::new();
        drop(ports.take_downstream());
        assert!(!ports.send(Tuple::new()));
    }

    #[test]
    fn test_recv_without_input() {
        let mut ports = Ports::new();
        assert!(ports.recv().is_err());
    }
}
