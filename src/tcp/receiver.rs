use crate::conn::byte_stream::{ByteStream, Reader};
use crate::conn::reassembler::Reassembler;
use crate::tcp::message::{TcpReceiverMessage, TcpSenderMessage};
use crate::tcp::wrap32::Wrap32;

/// The receiver half of the TCP control loop: turns inbound segments into
/// reassembler insertions and produces ackno/window/RST replies.
#[derive(Debug)]
pub struct TcpReceiver {
    reassembler: Reassembler,
    isn: Option<Wrap32>, // Initial seq number, fixed by the first SYN
}

impl TcpReceiver {
    pub fn new(capacity: u64) -> Self {
        TcpReceiver {
            reassembler: Reassembler::new(ByteStream::new(capacity)),
            isn: None,
        }
    }

    /// Process one inbound segment
    pub fn receive(&mut self, message: TcpSenderMessage) {
        if message.rst {
            self.reassembler.output_mut().set_error();
            return;
        }

        if message.syn && self.isn.is_none() {
            self.isn = Some(message.seqno);
        }

        // Segments before the SYN are discarded
        let Some(isn) = self.isn else {
            return;
        };

        let checkpoint = self.reassembler.output().bytes_pushed();
        let abs_seqno = message.seqno.unwrap(isn, checkpoint);

        // A non-SYN segment claiming the ISN slot carries no stream byte
        if !message.syn && abs_seqno == 0 {
            return;
        }

        // SYN occupies sequence number zero, so stream index = abs_seqno - 1
        let stream_index = if message.syn { 0 } else { abs_seqno - 1 };
        self.reassembler.insert(stream_index, &message.payload, message.fin);
    }

    /// The reply to send upstream: ackno (once the SYN arrived), advertised
    /// window, and the RST mirror of the stream error bit.
    pub fn send(&self) -> TcpReceiverMessage {
        let output = self.reassembler.output();

        let ackno = self.isn.map(|isn| {
            // SYN and FIN each consume one sequence number
            let abs_ackno = 1 + output.bytes_pushed() + u64::from(output.is_closed());
            Wrap32::wrap(abs_ackno, isn)
        });

        TcpReceiverMessage {
            ackno,
            window_size: output.available_capacity().min(u16::MAX as u64) as u16,
            rst: output.has_error(),
        }
    }

    /// The reassembler feeding the inbound stream
    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    /// Consumer view of the assembled inbound stream
    pub fn reader(&mut self) -> Reader<'_> {
        self.reassembler.reader()
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn syn(seqno: u32) -> TcpSenderMessage {
        TcpSenderMessage {
            seqno: Wrap32::new(seqno),
            syn: true,
            ..Default::default()
        }
    }

    fn data(seqno: u32, payload: &[u8]) -> TcpSenderMessage {
        TcpSenderMessage {
            seqno: Wrap32::new(seqno),
            payload: payload.to_vec(),
            ..Default::default()
        }
    }

    fn fin(seqno: u32) -> TcpSenderMessage {
        TcpSenderMessage {
            seqno: Wrap32::new(seqno),
            fin: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_ackno_before_syn() {
        let mut rx = TcpReceiver::new(4000);
        assert_eq!(rx.send().ackno, None);

        // Data before the SYN is discarded entirely
        rx.receive(data(1, b"hello"));
        assert_eq!(rx.send().ackno, None);
        assert_eq!(rx.reassembler().output().bytes_pushed(), 0);
    }

    #[test]
    fn test_syn_sets_ackno() {
        let mut rx = TcpReceiver::new(4000);
        rx.receive(syn(1000));
        assert_eq!(rx.send().ackno, Some(Wrap32::new(1001)));
    }

    #[test]
    fn test_handshake_then_data_then_fin() {
        let mut rx = TcpReceiver::new(4000);

        rx.receive(syn(1000));
        assert_eq!(rx.send().ackno, Some(Wrap32::new(1001)));

        rx.receive(data(1001, b"hi"));
        assert_eq!(rx.send().ackno, Some(Wrap32::new(1003)));

        let mut buf = String::new();
        rx.reader().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hi");

        // FIN consumes one sequence number once the stream closes
        rx.receive(fin(1003));
        assert_eq!(rx.send().ackno, Some(Wrap32::new(1004)));
        assert!(rx.reassembler().output().is_closed());
    }

    #[test]
    fn test_syn_with_payload_and_fin() {
        let mut rx = TcpReceiver::new(4000);
        let msg = TcpSenderMessage {
            seqno: Wrap32::new(5),
            syn: true,
            payload: b"ok".to_vec(),
            fin: true,
            rst: false,
        };
        rx.receive(msg);

        // 1 (SYN) + 2 (payload) + 1 (FIN after close)
        assert_eq!(rx.send().ackno, Some(Wrap32::new(9)));
        assert!(rx.reassembler().output().is_closed());
    }

    #[test]
    fn test_out_of_order_segments_ack_lowest_gap() {
        let mut rx = TcpReceiver::new(4000);
        rx.receive(syn(0));

        rx.receive(data(3, b"cd"));
        assert_eq!(rx.send().ackno, Some(Wrap32::new(1)));
        assert_eq!(rx.reassembler().bytes_pending(), 2);

        rx.receive(data(1, b"ab"));
        assert_eq!(rx.send().ackno, Some(Wrap32::new(5)));
        assert_eq!(rx.reassembler().bytes_pending(), 0);

        let mut buf = String::new();
        rx.reader().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "abcd");
    }

    #[test]
    fn test_retransmission_is_idempotent() {
        let mut rx = TcpReceiver::new(4000);
        rx.receive(syn(100));
        rx.receive(data(101, b"abcd"));
        let first = rx.send();

        rx.receive(data(101, b"abcd"));
        rx.receive(syn(100));
        let second = rx.send();

        assert_eq!(first.ackno, second.ackno);
        assert_eq!(rx.reassembler().output().bytes_pushed(), 4);
    }

    #[test]
    fn test_duplicate_syn_does_not_move_isn() {
        let mut rx = TcpReceiver::new(4000);
        rx.receive(syn(1000));
        rx.receive(syn(2000)); // late SYN from nowhere; ISN stays put
        assert_eq!(rx.send().ackno, Some(Wrap32::new(1001)));
    }

    #[test]
    fn test_window_size_is_capped_at_u16_max() {
        let rx = TcpReceiver::new(1_000_000);
        assert_eq!(rx.send().window_size, u16::MAX);
    }

    #[test]
    fn test_window_shrinks_with_buffered_data() {
        let mut rx = TcpReceiver::new(4);
        rx.receive(syn(0));
        rx.receive(data(1, b"ab"));
        assert_eq!(rx.send().window_size, 2);
    }

    #[test]
    fn test_rst_sets_sticky_error() {
        let mut rx = TcpReceiver::new(4000);
        rx.receive(syn(0));
        rx.receive(TcpSenderMessage {
            rst: true,
            ..Default::default()
        });

        assert!(rx.reassembler().output().has_error());
        assert!(rx.send().rst);

        // Later data is still refused by the errored stream
        rx.receive(data(1, b"ab"));
        assert_eq!(rx.reassembler().output().bytes_pushed(), 0);
    }

    #[test]
    fn test_seqno_wraparound() {
        let mut rx = TcpReceiver::new(4000);
        rx.receive(syn(u32::MAX));
        assert_eq!(rx.send().ackno, Some(Wrap32::new(0)));

        rx.receive(data(0, b"a"));
        assert_eq!(rx.send().ackno, Some(Wrap32::new(1)));
    }

    #[test]
    fn test_segment_claiming_isn_slot_is_discarded() {
        let mut rx = TcpReceiver::new(4000);
        rx.receive(syn(500));
        rx.receive(data(500, b"xy")); // non-SYN segment at the ISN itself
        assert_eq!(rx.reassembler().output().bytes_pushed(), 0);
        assert_eq!(rx.send().ackno, Some(Wrap32::new(501)));
    }
}
