//! The minimal (bit-packed) encoding of Equihash solutions.

use alloc::vec::Vec;

use crate::params::Params;
use crate::verify::{Error, Kind};

/// Reads consecutive big-endian bit fields of at most 32 bits out of a byte slice.
pub(crate) struct BitReader<'a> {
    bytes: &'a [u8],
    // Position of the next unread bit, counted from the most-significant bit of
    // `bytes[0]`.
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        BitReader { bytes, pos: 0 }
    }

    pub(crate) fn skip(&mut self, bit_len: usize) {
        self.pos += bit_len;
    }

    pub(crate) fn remaining(&self) -> usize {
        (self.bytes.len() * 8).saturating_sub(self.pos)
    }

    /// Returns `None` if fewer than `bit_len` bits remain.
    pub(crate) fn read(&mut self, bit_len: usize) -> Option<u32> {
        debug_assert!((1..=32).contains(&bit_len));
        if self.remaining() < bit_len {
            return None;
        }

        let first = self.pos / 8;
        let last = (self.pos + bit_len + 7) / 8;

        // At most 5 bytes are needed, so the accumulator never overflows.
        let acc_value = self.bytes[first..last]
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        let shift = (last - first) * 8 - (self.pos % 8) - bit_len;

        self.pos += bit_len;
        Some(((acc_value >> shift) & ((1 << bit_len) - 1)) as u32)
    }
}

/// Packs `values` as consecutive big-endian `bit_len`-bit fields, zero-filling the
/// final byte.
///
/// Every value must be smaller than `2^bit_len`.
pub(crate) fn compress_array(values: &[u32], bit_len: usize) -> Vec<u8> {
    debug_assert!((1..=32).contains(&bit_len));

    let mut vout = Vec::with_capacity((values.len() * bit_len + 7) / 8);

    // The acc_bits least-significant bits of acc_value represent a bit sequence
    // in big-endian order.
    let mut acc_bits = 0;
    let mut acc_value: u64 = 0;

    for v in values {
        acc_value = (acc_value << bit_len) | u64::from(*v);
        acc_bits += bit_len;

        while acc_bits >= 8 {
            acc_bits -= 8;
            vout.push((acc_value >> acc_bits) as u8);
        }
        acc_value &= (1 << acc_bits) - 1;
    }

    if acc_bits > 0 {
        vout.push((acc_value << (8 - acc_bits)) as u8);
    }

    vout
}

/// Returns `None` if `minimal` is not a well-formed minimal encoding for `p`: either
/// its length is wrong or its trailing padding bits are not zero.
pub fn indices_from_minimal(p: Params, minimal: &[u8]) -> Option<Vec<u32>> {
    if minimal.len() != p.minimal_len() {
        return None;
    }

    let bit_len = p.index_bit_length();
    let mut csr = BitReader::new(minimal);
    let mut ret = Vec::with_capacity(p.solution_len());
    for _ in 0..p.solution_len() {
        ret.push(csr.read(bit_len)?);
    }

    // Padding only exists when 2^k * (n/(k+1) + 1) is not a multiple of 8.
    let padding = csr.remaining();
    if padding > 0 && csr.read(padding)? != 0 {
        return None;
    }

    Some(ret)
}

/// Encodes `indices` in the minimal representation for `p`.
///
/// Returns an error if the number of indices is not `2^k`, or if an index does not
/// fit in `n/(k+1) + 1` bits.
pub fn minimal_from_indices(p: Params, indices: &[u32]) -> Result<Vec<u8>, Error> {
    if indices.len() != p.solution_len() {
        return Err(Error(Kind::MalformedProof));
    }

    let bit_len = p.index_bit_length();
    if bit_len < 32 && indices.iter().any(|i| (*i >> bit_len) != 0) {
        return Err(Error(Kind::Encoding));
    }

    Ok(compress_array(indices, bit_len))
}
