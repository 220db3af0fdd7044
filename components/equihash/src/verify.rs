//! Verification functions for the [Equihash] proof-of-work algorithm.
//!
//! [Equihash]: https://zips.z.cash/protocol/protocol.pdf#equihash

use alloc::vec::Vec;
use core::fmt;

use blake2b_simd::State as Blake2bState;

use crate::{digest, minimal::indices_from_minimal, params::Params};

#[derive(Clone)]
struct Node {
    /// The collision chunks that have not been matched on yet.
    hash: Vec<u32>,
    indices: Vec<u32>,
}

impl Node {
    fn new(p: &Params, state: &Blake2bState, i: u32) -> Self {
        Node {
            hash: digest::leaf_hash(p, state, i),
            indices: vec![i],
        }
    }

    fn from_children(a: Node, b: Node) -> Self {
        // The leading chunk collided, so it is dropped.
        let hash: Vec<_> = a
            .hash
            .iter()
            .zip(b.hash.iter())
            .skip(1)
            .map(|(a, b)| a ^ b)
            .collect();
        let indices = if a.indices_before(&b) {
            let mut indices = a.indices;
            indices.extend(b.indices.iter());
            indices
        } else {
            let mut indices = b.indices;
            indices.extend(a.indices.iter());
            indices
        };
        Node { hash, indices }
    }

    #[cfg(test)]
    fn from_children_ref(a: &Node, b: &Node) -> Self {
        let hash: Vec<_> = a
            .hash
            .iter()
            .zip(b.hash.iter())
            .skip(1)
            .map(|(a, b)| a ^ b)
            .collect();
        let mut indices = Vec::with_capacity(a.indices.len() + b.indices.len());
        if a.indices_before(b) {
            indices.extend(a.indices.iter());
            indices.extend(b.indices.iter());
        } else {
            indices.extend(b.indices.iter());
            indices.extend(a.indices.iter());
        }
        Node { hash, indices }
    }

    fn indices_before(&self, other: &Node) -> bool {
        // Indices within a subtree are distinct, so comparing the leading indices is
        // equivalent to comparing the index sequences lexicographically.
        self.indices[0] < other.indices[0]
    }

    fn is_zero(&self) -> bool {
        self.hash.iter().all(|v| *v == 0)
    }
}

/// An Equihash solution failed to verify, or could not be produced.
#[derive(Debug)]
pub struct Error(pub(crate) Kind);

impl Error {
    /// Returns the reason for this error.
    pub fn kind(&self) -> &Kind {
        &self.0
    }

    /// Returns `true` if the input was structurally invalid, rather than a well-formed
    /// but incorrect solution.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self.0,
            Kind::InvalidParams | Kind::MalformedProof | Kind::UnsupportedVersion(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Kind::InvalidParams | Kind::Encoding | Kind::UnsupportedVersion(_) => {
                write!(f, "{}", self.0)
            }
            _ => write!(f, "Invalid solution: {}", self.0),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// The ways in which Equihash operations can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Kind {
    /// The `(n, k)` pair is not a valid parameter set.
    InvalidParams,
    /// The solution has the wrong length, an out-of-range index, or bad padding.
    MalformedProof,
    /// An index is too wide for the minimal encoding.
    Encoding,
    /// A serialized proof uses a format version this crate does not know.
    UnsupportedVersion(u8),
    /// Two sibling subtrees do not collide on their leading bits.
    Collision,
    /// The subtrees of a node are in the wrong order.
    OutOfOrder,
    /// The same index appears more than once.
    DuplicateIdxs,
    /// The XOR of all leaves is not zero.
    NonZeroRootHash,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::InvalidParams => f.write_str("invalid parameters"),
            Kind::MalformedProof => f.write_str("malformed solution encoding"),
            Kind::Encoding => f.write_str("index too wide for the minimal encoding"),
            Kind::UnsupportedVersion(v) => write!(f, "unsupported proof format version {}", v),
            Kind::Collision => f.write_str("invalid collision length between StepRows"),
            Kind::OutOfOrder => f.write_str("Index tree incorrectly ordered"),
            Kind::DuplicateIdxs => f.write_str("duplicate indices"),
            Kind::NonZeroRootHash => f.write_str("root hash of tree is non-zero"),
        }
    }
}

fn has_collision(a: &Node, b: &Node) -> bool {
    a.hash[0] == b.hash[0]
}

fn distinct_indices(a: &Node, b: &Node) -> bool {
    for i in &(a.indices) {
        for j in &(b.indices) {
            if i == j {
                return false;
            }
        }
    }
    true
}

fn validate_subtrees(a: &Node, b: &Node) -> Result<(), Kind> {
    if !has_collision(a, b) {
        Err(Kind::Collision)
    } else if b.indices_before(a) {
        Err(Kind::OutOfOrder)
    } else if !distinct_indices(a, b) {
        Err(Kind::DuplicateIdxs)
    } else {
        Ok(())
    }
}

fn check_indices(p: &Params, indices: &[u32]) -> Result<(), Error> {
    if indices.len() != p.solution_len()
        || indices.iter().any(|i| u64::from(*i) >= p.leaf_count())
    {
        Err(Error(Kind::MalformedProof))
    } else {
        Ok(())
    }
}

#[cfg(test)]
fn is_valid_solution_iterative(
    p: Params,
    input: &[u8],
    nonce: u32,
    indices: &[u32],
) -> Result<(), Error> {
    check_indices(&p, indices)?;
    let state = digest::base_state(&p, input, nonce);

    let mut rows = Vec::new();
    for i in indices {
        rows.push(Node::new(&p, &state, *i));
    }

    while rows.len() > 1 {
        let mut cur_rows = Vec::new();
        for pair in rows.chunks(2) {
            let a = &pair[0];
            let b = &pair[1];
            validate_subtrees(a, b).map_err(Error)?;
            cur_rows.push(Node::from_children_ref(a, b));
        }
        rows = cur_rows;
    }

    assert!(rows.len() == 1);

    if rows[0].is_zero() {
        Ok(())
    } else {
        Err(Error(Kind::NonZeroRootHash))
    }
}

fn tree_validator(p: &Params, state: &Blake2bState, indices: &[u32]) -> Result<Node, Error> {
    if indices.len() > 1 {
        let end = indices.len();
        let mid = end / 2;
        let a = tree_validator(p, state, &indices[0..mid])?;
        let b = tree_validator(p, state, &indices[mid..end])?;
        validate_subtrees(&a, &b).map_err(Error)?;
        Ok(Node::from_children(a, b))
    } else {
        Ok(Node::new(p, state, indices[0]))
    }
}

/// Checks whether `indices` is a valid solution for `(input, nonce)` with the
/// parameters `p`.
pub(crate) fn is_valid_solution_recursive(
    p: Params,
    input: &[u8],
    nonce: u32,
    indices: &[u32],
) -> Result<(), Error> {
    check_indices(&p, indices)?;
    let state = digest::base_state(&p, input, nonce);

    let root = tree_validator(&p, &state, indices)?;

    // Hashes were trimmed at every level, so only the final chunk remains.
    if root.is_zero() {
        Ok(())
    } else {
        Err(Error(Kind::NonZeroRootHash))
    }
}

/// Checks whether `soln` is a valid minimal-encoded solution for `(input, nonce)`
/// with the parameters `(n, k)`.
pub fn is_valid_solution(
    n: u32,
    k: u32,
    input: &[u8],
    nonce: u32,
    soln: &[u8],
) -> Result<(), Error> {
    let p = Params::new(n, k)?;
    let indices = indices_from_minimal(p, soln).ok_or(Error(Kind::MalformedProof))?;

    // Recursive validation is faster
    is_valid_solution_recursive(p, input, nonce, &indices)
}
