//! The BLAKE2b-based hash that generates Equihash leaves.

use alloc::vec::Vec;

use blake2b_simd::{Hash as Blake2bHash, Params as Blake2bParams, State as Blake2bState};

use crate::{minimal::BitReader, params::Params};

/// The version of the wire format shared by the hash construction and the minimal
/// encoding. Any change to either must bump this.
pub const FORMAT_VERSION: u8 = 1;

const PERSONALIZATION_PREFIX: &[u8; 8] = b"ZcashPoW";

/// Returns the BLAKE2b personalization for `(n, k)`, which separates the digests of
/// different parameter sets.
pub fn personalization(n: u32, k: u32) -> [u8; 16] {
    let mut personal = [0; 16];
    personal[..8].copy_from_slice(PERSONALIZATION_PREFIX);
    personal[8..12].copy_from_slice(&n.to_le_bytes());
    personal[12..].copy_from_slice(&k.to_le_bytes());
    personal
}

/// Encodes a nonce the way it is absorbed into the hash: as a 256-bit little-endian
/// integer.
pub fn nonce_bytes(nonce: u32) -> [u8; 32] {
    let mut bytes = [0; 32];
    bytes[..4].copy_from_slice(&nonce.to_le_bytes());
    bytes
}

pub(crate) fn initialise_state(p: &Params) -> Blake2bState {
    Blake2bParams::new()
        .hash_length(p.hash_output() as usize)
        .personal(&personalization(p.n, p.k))
        .to_state()
}

/// Returns the hash state with `seed` and `nonce` absorbed, ready to be cloned for
/// each block.
pub(crate) fn base_state(p: &Params, seed: &[u8], nonce: u32) -> Blake2bState {
    let mut state = initialise_state(p);
    state.update(seed);
    state.update(&nonce_bytes(nonce));
    state
}

pub(crate) fn generate_hash(base_state: &Blake2bState, i: u32) -> Blake2bHash {
    let mut state = base_state.clone();
    state.update(&i.to_le_bytes());
    state.finalize()
}

/// Computes the digest of block `block` for `(seed, nonce)`.
///
/// Each digest holds the hash outputs of `512 / n` consecutive leaves.
pub fn digest(p: &Params, seed: &[u8], nonce: u32, block: u32) -> Blake2bHash {
    generate_hash(&base_state(p, seed, nonce), block)
}

/// Writes the `k + 1` collision chunks of the leaf in position `slot` of `digest`
/// into `out`.
pub(crate) fn expand_leaf(p: &Params, digest: &[u8], slot: usize, out: &mut [u32]) {
    let bit_len = p.collision_bit_length();
    debug_assert_eq!(out.len(), p.k as usize + 1);

    let mut reader = BitReader::new(digest);
    reader.skip(slot * p.n as usize);
    for chunk in out.iter_mut() {
        // The digest length covers every slot, so the read cannot run short.
        *chunk = reader.read(bit_len).unwrap_or_default();
    }
}

/// Returns the collision chunks of leaf `i`.
pub(crate) fn leaf_hash(p: &Params, base_state: &Blake2bState, i: u32) -> Vec<u32> {
    let per_block = p.indices_per_hash_output();
    let hash = generate_hash(base_state, i / per_block);
    let mut chunks = vec![0; p.k as usize + 1];
    expand_leaf(p, hash.as_bytes(), (i % per_block) as usize, &mut chunks);
    chunks
}

#[cfg(test)]
mod tests {
    use super::{base_state, digest, expand_leaf, leaf_hash, nonce_bytes, personalization, Params};

    #[test]
    fn personalization_encoding() {
        assert_eq!(
            &personalization(200, 9),
            b"ZcashPoW\xc8\x00\x00\x00\x09\x00\x00\x00",
        );
        assert_ne!(personalization(96, 5), personalization(96, 3));
    }

    #[test]
    fn nonce_encoding() {
        let mut expected = [0; 32];
        expected[0] = 1;
        assert_eq!(nonce_bytes(1), expected);
        expected[..4].copy_from_slice(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(nonce_bytes(0x1234_5678), expected);
    }

    #[test]
    fn digest_is_deterministic() {
        let p = Params { n: 96, k: 5 };
        let seed = [7; 32];
        let a = digest(&p, &seed, 3, 11);
        let b = digest(&p, &seed, 3, 11);
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(a.as_bytes().len(), 60);

        // Every input is significant.
        assert_ne!(a.as_bytes(), digest(&p, &seed, 4, 11).as_bytes());
        assert_ne!(a.as_bytes(), digest(&p, &seed, 3, 12).as_bytes());
        assert_ne!(a.as_bytes(), digest(&p, &[8; 32], 3, 11).as_bytes());
        assert_ne!(
            a.as_bytes()[..48],
            digest(&Params { n: 96, k: 3 }, &seed, 3, 11).as_bytes()[..48],
        );
    }

    #[test]
    fn leaves_split_digests() {
        let p = Params { n: 96, k: 5 };
        let state = base_state(&p, b"seed", 0);
        let block = digest(&p, b"seed", 0, 1);

        // Leaf 7 is the third leaf of the second block.
        let leaf = leaf_hash(&p, &state, 7);
        let bytes = &block.as_bytes()[24..36];
        for (j, chunk) in leaf.iter().enumerate() {
            let expected = u32::from(bytes[2 * j]) << 8 | u32::from(bytes[2 * j + 1]);
            assert_eq!(*chunk, expected);
        }

        let mut chunks = [0; 6];
        expand_leaf(&p, block.as_bytes(), 2, &mut chunks);
        assert_eq!(&chunks[..], &leaf[..]);
    }
}
