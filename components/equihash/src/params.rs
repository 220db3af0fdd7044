use core::fmt;

use crate::verify::{Error, Kind};

/// A valid pair of Equihash parameters `(n, k)`.
///
/// `n` is the number of hash output bits consumed per leaf, and `k` is the number of
/// collision-elimination rounds. A solution consists of `2^k` leaf indices, each drawn
/// from a space of `2^(n/(k+1) + 1)` leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Params {
    pub(crate) n: u32,
    pub(crate) k: u32,
}

/// The bit length of a minimal-encoded solution rounded up to whole bytes, or `None`
/// if it overflows.
fn packed_bit_length(n: u32, k: u32) -> Option<usize> {
    let index_bits = (n / (k + 1)) as usize + 1;
    1usize
        .checked_shl(k)?
        .checked_mul(index_bits)?
        .checked_add(7)
}

impl Params {
    /// Returns an error if the parameters are invalid.
    pub fn new(n: u32, k: u32) -> Result<Self, Error> {
        // We place the following requirements on the parameters:
        // - k >= 1, so there is at least one collision round.
        // - k < n, so the collision bit length is at least 1.
        // - n is a multiple of k + 1, so we have an integer collision bit length.
        // - the collision bit length is below 32, so every index fits in a u32.
        // - n <= 512, so every BLAKE2b output holds at least one leaf.
        // - k < 32, and the minimal encoding of 2^k indices has a length that fits
        //   in a usize.
        if (k >= 1)
            && (k < n)
            && (n % (k + 1) == 0)
            && (n / (k + 1) < 32)
            && (n <= 512)
            && (k < 32)
            && packed_bit_length(n, k).is_some()
        {
            Ok(Params { n, k })
        } else {
            Err(Error(Kind::InvalidParams))
        }
    }

    /// The number of hash output bits consumed per leaf.
    pub fn n(&self) -> u32 {
        self.n
    }

    /// The number of collision rounds.
    pub fn k(&self) -> u32 {
        self.k
    }

    pub(crate) fn indices_per_hash_output(&self) -> u32 {
        512 / self.n
    }

    /// The BLAKE2b output length in bytes.
    pub(crate) fn hash_output(&self) -> u8 {
        ((self.indices_per_hash_output() * self.n + 7) / 8) as u8
    }

    /// The number of bits two rows must share to collide in a single round.
    pub fn collision_bit_length(&self) -> usize {
        (self.n / (self.k + 1)) as usize
    }

    /// The width of a single index in the minimal encoding.
    pub fn index_bit_length(&self) -> usize {
        self.collision_bit_length() + 1
    }

    /// The number of leaves the solver searches over.
    pub fn leaf_count(&self) -> u64 {
        1 << self.index_bit_length()
    }

    /// The number of indices in a solution.
    pub fn solution_len(&self) -> usize {
        1 << self.k
    }

    /// The length in bytes of a solution in the minimal encoding.
    pub fn minimal_len(&self) -> usize {
        (self.solution_len() * self.index_bit_length() + 7) / 8
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Equihash({}, {})", self.n, self.k)
    }
}
