//! Deterministic id generation.
//!
//! RULE: nothing in the simulation may call any platform RNG.
//! Generated task ids derive from the seed the engine was built with,
//! so two engines with the same seed and the same operations produce
//! the same ids (and therefore byte-identical event logs).

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

const ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

pub struct TaskIdGenerator {
    inner: Pcg64Mcg,
    next:  u64,
}

impl TaskIdGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15),
            next:  1,
        }
    }

    /// `task-<sequence>-<9 base36 chars>`.
    pub fn next_id(&mut self) -> String {
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| ID_ALPHABET[(self.inner.next_u64() % ID_ALPHABET.len() as u64) as usize] as char)
            .collect();
        let id = format!("task-{}-{suffix}", self.next);
        self.next += 1;
        id
    }
}
