/// A 32-bit on-the-wire sequence number, relative to an initial sequence
/// number (ISN). Maps bijectively to a 64-bit absolute stream index via
/// `wrap`/`unwrap`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Wrap32 {
    value: u32,
}

impl Wrap32 {
    pub fn new(value: u32) -> Self {
        Wrap32 { value }
    }

    /// Wrap an absolute `seq_no` given an initial `seq_no` (the zero point)
    pub fn wrap(n: u64, isn: Wrap32) -> Self {
        Wrap32::new(n.wrapping_add(isn.value as u64) as u32)
    }

    /// Unwrap to the absolute `seq_no` closest to `checkpoint`, ties broken
    /// toward the smaller value
    pub fn unwrap(&self, isn: Wrap32, checkpoint: u64) -> u64 {
        const WRAP_SIZE: u64 = 1 << 32;

        let offset = self.value.wrapping_sub(isn.value) as u64;
        let anchor = (checkpoint & !(WRAP_SIZE - 1)) + offset;

        // Candidates in the checkpoint's era and the two adjacent eras,
        // ascending so the smaller wins a distance tie
        [anchor.checked_sub(WRAP_SIZE), Some(anchor), anchor.checked_add(WRAP_SIZE)]
            .into_iter()
            .flatten()
            .min_by_key(|candidate| candidate.abs_diff(checkpoint))
            .unwrap_or(anchor)
    }
}

// -- Unit tests --
