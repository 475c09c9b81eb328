use crate::conn::byte_stream::{ByteStream, Writer};
use crate::tcp::message::{TcpReceiverMessage, TcpSenderMessage};
use crate::tcp::wrap32::Wrap32;
use std::collections::VecDeque;
use tracing::trace;

/// Largest payload a single segment may carry
pub const MAX_PAYLOAD_SIZE: u64 = 1000;

/// The sender half of the TCP control loop: packetizes the outbound byte
/// stream into segments respecting the peer's advertised window, tracks
/// outstanding segments, and retransmits on timeout with exponential backoff.
#[derive(Debug)]
pub struct TcpSender {
    input: ByteStream, // Outbound byte stream, filled by the application
    isn: Wrap32,

    syn_sent: bool,
    fin_sent: bool,

    window_size: u16, // Last advertised by the peer; 0 is probed as 1
    next_seqno: u64,  // Next absolute sequence number to use
    ackno: u64,       // Highest acknowledged absolute sequence number
    bytes_in_flight: u64,

    initial_rto_ms: u64,
    current_rto_ms: u64, // Doubles on timeout under an open window
    timer_ms: u64,
    timer_running: bool,
    consecutive_retransmissions: u64,

    outstanding: VecDeque<TcpSenderMessage>, // FIFO; the front is the retransmission candidate
}

impl TcpSender {
    pub fn new(input: ByteStream, isn: Wrap32, initial_rto_ms: u64) -> Self {
        TcpSender {
            input,
            isn,
            syn_sent: false,
            fin_sent: false,
            window_size: 1,
            next_seqno: 0,
            ackno: 0,
            bytes_in_flight: 0,
            initial_rto_ms,
            current_rto_ms: initial_rto_ms,
            timer_ms: 0,
            timer_running: false,
            consecutive_retransmissions: 0,
            outstanding: VecDeque::new(),
        }
    }

    /// Producer view of the outbound stream
    pub fn writer(&mut self) -> Writer<'_> {
        self.input.writer()
    }

    /// Packetize as much of the outbound stream as the effective window
    /// allows, emitting each segment through `transmit`.
    pub fn push(&mut self, mut transmit: impl FnMut(&TcpSenderMessage)) {
        // A zero window is probed with a one-byte effective window
        let effective_window = u64::from(self.window_size).max(1);

        while self.bytes_in_flight < effective_window && !self.fin_sent {
            let mut msg = self.make_empty_message();

            if !self.syn_sent {
                msg.syn = true;
                self.syn_sent = true;
            }

            let remaining = effective_window - self.bytes_in_flight;
            let max_payload = (remaining - msg.sequence_length()).min(MAX_PAYLOAD_SIZE) as usize;

            while self.input.bytes_buffered() > 0 && msg.payload.len() < max_payload {
                let chunk = self.input.peek();
                let take = chunk.len().min(max_payload - msg.payload.len());
                msg.payload.extend_from_slice(&chunk[..take]);
                self.input.pop(take as u64);
            }

            // FIN rides along only if the window has a sequence number left for it
            if !self.fin_sent && self.input.is_finished() && remaining > msg.sequence_length() {
                msg.fin = true;
                self.fin_sent = true;
            }

            if msg.sequence_length() == 0 {
                break;
            }

            transmit(&msg);
            self.next_seqno += msg.sequence_length();
            self.bytes_in_flight += msg.sequence_length();
            self.outstanding.push_back(msg);

            if !self.timer_running {
                self.timer_running = true;
                self.timer_ms = 0;
            }
        }
    }

    /// A segment carrying no sequence numbers: the current seqno plus the
    /// RST mirror of the outbound stream's error bit. Used to reply with a
    /// bare ackno or to surface a reset.
    pub fn make_empty_message(&self) -> TcpSenderMessage {
        TcpSenderMessage {
            seqno: Wrap32::wrap(self.next_seqno, self.isn),
            rst: self.input.has_error(),
            ..Default::default()
        }
    }

    /// Process an ackno/window message from the peer's receiver
    pub fn receive(&mut self, msg: &TcpReceiverMessage) {
        if self.input.has_error() {
            return;
        }
        if msg.rst {
            self.input.set_error();
            return;
        }

        self.window_size = msg.window_size;

        let Some(ackno) = msg.ackno else {
            return;
        };
        let ack_abs = ackno.unwrap(self.isn, self.next_seqno);

        if ack_abs > self.next_seqno {
            return; // Acknowledges data never sent
        }
        if ack_abs <= self.ackno {
            return; // Stale
        }

        let mut acked = false;
        while let Some(front) = self.outstanding.front() {
            let segment_start = front.seqno.unwrap(self.isn, self.next_seqno);
            if segment_start + front.sequence_length() > ack_abs {
                break; // Only partially covered; keep for retransmission
            }
            self.bytes_in_flight -= front.sequence_length();
            self.outstanding.pop_front();
            acked = true;
        }

        if acked {
            self.ackno = ack_abs;
            self.current_rto_ms = self.initial_rto_ms;
            self.consecutive_retransmissions = 0;
            self.timer_ms = 0;
            self.timer_running = !self.outstanding.is_empty();
        }
    }

    /// Advance the retransmission timer by `ms_since_last_tick`, resending
    /// the oldest outstanding segment on expiry.
    pub fn tick(&mut self, ms_since_last_tick: u64, mut transmit: impl FnMut(&TcpSenderMessage)) {
        if self.timer_running {
            self.timer_ms += ms_since_last_tick;
        }

        if self.timer_running && self.timer_ms >= self.current_rto_ms {
            if let Some(front) = self.outstanding.front() {
                trace!(
                    retransmissions = self.consecutive_retransmissions,
                    rto_ms = self.current_rto_ms,
                    "retransmitting oldest outstanding segment"
                );
                transmit(front);

                // Zero-window probes stay at the base RTO
                if self.window_size > 0 {
                    self.consecutive_retransmissions += 1;
                    self.current_rto_ms *= 2;
                }
                self.timer_ms = 0;
            }
        }
    }

    /// How many sequence numbers are outstanding?
    pub fn sequence_numbers_in_flight(&self) -> u64 {
        self.bytes_in_flight
    }

    /// How many consecutive retransmissions have happened?
    pub fn consecutive_retransmissions(&self) -> u64 {
        self.consecutive_retransmissions
    }
}

// -- Unit tests --
