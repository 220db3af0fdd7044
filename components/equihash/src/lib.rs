//! Equihash is a Proof-of-Work algorithm, based on a generalization of the Birthday
//! problem which finds colliding hash values. It was designed to be memory-hard; more
//! specifically, the bottle-neck for parallel implementations of Equihash solvers would
//! be memory bandwidth.
//!
//! This crate implements both sides of Equihash:
//!
//! - a solver that searches for proofs with Wagner's algorithm, for any valid
//!   `(n, k)` parameters with `n / (k + 1) < 32`, and a nonce search that can run
//!   on the global threadpool and be cancelled;
//! - a verifier that checks a proof in `O(2^k)` hash evaluations.
//!
//! Leaves are generated with BLAKE2b personalized as in the Zcash consensus rules,
//! and solutions are exchanged in the minimal (bit-packed) encoding, so the Zcash
//! reference test vectors verify with this crate.
//!
#![cfg_attr(feature = "std", doc = "## Feature flags")]
#![cfg_attr(feature = "std", doc = document_features::document_features!())]
//!
//! References
//! ==========
//! - [Section 7.6.1: Equihash.] Zcash Protocol Specification, version 2020.1.10 or later.
//! - Alex Biryukov and Dmitry Khovratovich.
//!   [*Equihash: Asymmetric Proof-of-Work Based on the Generalized Birthday Problem.*][BK16]
//!   NDSS ’16.
//!
//! [Section 7.6.1: Equihash.]: https://zips.z.cash/protocol/protocol.pdf#equihash
//! [BK16]: https://www.internetsociety.org/sites/default/files/blogs-media/equihash-asymmetric-proof-of-work-based-generalized-birthday-problem.pdf

// Catch documentation errors caused by code changes.
#![deny(rustdoc::broken_intra_doc_links)]
#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, doc(auto_cfg))]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
extern crate alloc;

mod api;
pub mod digest;
mod minimal;
mod params;
mod proof;
mod verify;

#[cfg(test)]
mod test_vectors;

pub use api::{verify, Completion, Solution, SolveOptions, VerifyOptions};
pub use digest::FORMAT_VERSION;
pub use minimal::{indices_from_minimal, minimal_from_indices};
pub use params::Params;
pub use proof::{Proof, VerifiedProof};
pub use verify::{is_valid_solution, Error, Kind};

#[cfg(feature = "solver")]
pub mod search;
#[cfg(feature = "solver")]
pub mod solver;

#[cfg(feature = "solver")]
pub use {
    api::solve,
    search::{SearchDriver, SearchHandle, SearchOutcome},
    solver::{CancelToken, Solver},
};
