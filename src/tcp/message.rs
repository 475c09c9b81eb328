use crate::tcp::wrap32::Wrap32;

/// A segment in the sender-to-receiver direction: the sequence number of the
/// first byte (or SYN), the flags, and the payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TcpSenderMessage {
    pub seqno: Wrap32,
    pub syn: bool,
    pub payload: Vec<u8>,
    pub fin: bool,
    pub rst: bool,
}

impl TcpSenderMessage {
    /// The number of sequence numbers this segment consumes. SYN and FIN
    /// each occupy one.
    pub fn sequence_length(&self) -> u64 {
        self.syn as u64 + self.payload.len() as u64 + self.fin as u64
    }
}

/// The receiver-to-sender reply: ackno (absent before the SYN arrives), the
/// advertised window, and the reset flag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TcpReceiverMessage {
    pub ackno: Option<Wrap32>,
    pub window_size: u16,
    pub rst: bool,
}

// -- Unit tests --
