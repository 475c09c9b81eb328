use crate::conn::byte_stream::ByteStream;
use crate::conn::byte_stream::Reader;
use std::collections::BTreeMap;

/// Accepts out-of-order, possibly-overlapping byte ranges indexed by an
/// absolute stream offset and delivers them in order to a `ByteStream`.
#[derive(Debug)]
pub struct Reassembler {
    pending: BTreeMap<u64, Vec<u8>>, // Gap-separated future fragments. key = stream offset
    output: ByteStream,              // The assembled ByteStream, ready to be read
    next_index: u64,                 // The next stream offset expected to deliver
    last_index: Option<u64>,         // One past the final byte, once the EOF fragment arrives
}

impl Reassembler {
    /// New `Reassembler` with the provided `ByteStream` as output
    pub fn new(output: ByteStream) -> Self {
        Reassembler {
            pending: BTreeMap::new(),
            output,
            next_index: 0,
            last_index: None,
        }
    }

    /// Insert a fragment of the stream starting at absolute offset
    /// `first_index`. Bytes below `next_index` or beyond the current window
    /// are clipped away; in-order bytes go straight to the output, the rest
    /// are held until the gap before them fills.
    pub fn insert(&mut self, first_index: u64, data: &[u8], is_last: bool) {
        if is_last {
            self.last_index = Some(first_index + data.len() as u64);
        }

        let end = first_index + data.len() as u64;
        if !data.is_empty() && end > self.next_index {
            // Clip to [next_index, next_index + available_capacity)
            let acceptable_end = self.next_index + self.output.available_capacity();
            if first_index < acceptable_end {
                let start = first_index.max(self.next_index);
                let clipped_end = end.min(acceptable_end);
                if start < clipped_end {
                    let lo = (start - first_index) as usize;
                    let hi = (clipped_end - first_index) as usize;
                    let fragment = data[lo..hi].to_vec();
                    if start == self.next_index {
                        self.deliver(fragment);
                    } else {
                        self.store(start, fragment);
                    }
                }
            }
        }

        if self.last_index == Some(self.next_index) {
            self.output.close();
        }
    }

    /// The total number of bytes pending reassembly
    pub fn bytes_pending(&self) -> u64 {
        self.pending.values().map(|fragment| fragment.len() as u64).sum()
    }

    /// The absolute offset of the next byte to be delivered
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// The assembled output stream
    pub fn output(&self) -> &ByteStream {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut ByteStream {
        &mut self.output
    }

    /// Consumer view of the assembled output
    pub fn reader(&mut self) -> Reader<'_> {
        self.output.reader()
    }

    /// Write a fragment that begins exactly at `next_index`, then drain any
    /// pending entries the new data made contiguous.
    fn deliver(&mut self, fragment: Vec<u8>) {
        self.output.push(&fragment);
        self.next_index = self.output.bytes_pushed();

        while let Some((&index, _)) = self.pending.first_key_value() {
            if index > self.next_index {
                break;
            }
            let stored = self.pending.remove(&index).unwrap_or_default();
            let overlap = (self.next_index - index) as usize;
            if overlap < stored.len() {
                self.output.push(&stored[overlap..]);
                self.next_index = self.output.bytes_pushed();
            }
        }
    }

    /// Store an out-of-order fragment, coalescing with the touching
    /// predecessor and any successors it reaches.
    fn store(&mut self, mut index: u64, mut fragment: Vec<u8>) {
        if let Some((&prev_index, prev_data)) = self.pending.range(..=index).next_back() {
            let prev_end = prev_index + prev_data.len() as u64;
            if prev_end >= index {
                if prev_end >= index + fragment.len() as u64 {
                    return; // Fully covered by an existing fragment
                }
                let keep = (prev_end - index) as usize;
                let mut merged = self.pending.remove(&prev_index).unwrap_or_default();
                merged.extend_from_slice(&fragment[keep..]);
                index = prev_index;
                fragment = merged;
            }
        }

        loop {
            let frag_end = index + fragment.len() as u64;
            let (succ_index, succ_end) = match self.pending.range(index..).next() {
                Some((&i, d)) if i <= frag_end => (i, i + d.len() as u64),
                _ => break,
            };
            let succ = self.pending.remove(&succ_index).unwrap_or_default();
            if succ_end > frag_end {
                let tail_from = (frag_end - succ_index) as usize;
                fragment.extend_from_slice(&succ[tail_from..]);
            }
        }

        self.pending.insert(index, fragment);
    }
}

// -- Unit tests --
