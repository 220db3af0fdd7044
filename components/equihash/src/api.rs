//! A flat interface for solving and verifying with plain values.

use alloc::vec::Vec;

use tracing::debug;

use crate::verify::is_valid_solution;

#[cfg(feature = "solver")]
use crate::{
    search::{SearchDriver, SearchOutcome},
    solver::{CancelToken, Solver},
    verify::Error,
};

/// The inputs to `solve`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolveOptions {
    /// The Equihash `n` parameter.
    pub n: u32,
    /// The Equihash `k` parameter.
    pub k: u32,
    /// The seed absorbed into every leaf hash.
    pub seed: Vec<u8>,
    /// The first nonce to try.
    pub start_nonce: u32,
    /// The maximum number of nonces to try, or `None` to search until `u32::MAX`.
    pub max_attempts: Option<u32>,
}

impl SolveOptions {
    /// Options that search every nonce from 0.
    pub fn new(n: u32, k: u32, seed: &[u8]) -> Self {
        SolveOptions {
            n,
            k,
            seed: seed.to_vec(),
            start_nonce: 0,
            max_attempts: None,
        }
    }
}

/// A proof in its minimal encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    /// The minimal encoding of the solution indices.
    pub value: Vec<u8>,
    /// The nonce the solution was found for.
    pub nonce: u32,
    /// The `n` parameter the solution was found with.
    pub n: u32,
    /// The `k` parameter the solution was found with.
    pub k: u32,
}

/// How a call to `solve` finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// A proof was found.
    Solved(Solution),
    /// No proof was found within the attempt limit. `nonce` is the next nonce to try,
    /// or `None` if every nonce up to `u32::MAX` was tried.
    NotFound { nonce: Option<u32>, n: u32, k: u32 },
    /// The search was cancelled while trying `nonce`.
    Cancelled { nonce: u32, n: u32, k: u32 },
}

#[cfg(feature = "solver")]
impl Completion {
    fn from_outcome(outcome: SearchOutcome) -> Result<Self, Error> {
        Ok(match outcome {
            SearchOutcome::Found(proof) => Completion::Solved(Solution {
                value: proof.to_minimal()?,
                nonce: proof.nonce(),
                n: proof.params().n(),
                k: proof.params().k(),
            }),
            SearchOutcome::Exhausted { params, next_nonce } => Completion::NotFound {
                nonce: next_nonce,
                n: params.n(),
                k: params.k(),
            },
            SearchOutcome::Cancelled { params, next_nonce } => Completion::Cancelled {
                nonce: next_nonce,
                n: params.n(),
                k: params.k(),
            },
        })
    }
}

/// Starts a search on the global threadpool, and returns a token that cancels it.
///
/// `on_complete` is called exactly once, on a worker thread. It receives an error
/// only if the options are invalid.
#[cfg(feature = "solver")]
pub fn solve<F>(options: SolveOptions, on_complete: F) -> CancelToken
where
    F: FnOnce(Result<Completion, Error>) + Send + 'static,
{
    let cancel = CancelToken::new();

    match Solver::new(options.n, options.k, &options.seed) {
        Err(e) => rayon::spawn_fifo(move || on_complete(Err(e))),
        Ok(solver) => {
            let mut driver = SearchDriver::new(solver).starting_at(options.start_nonce);
            if let Some(max) = options.max_attempts {
                driver = driver.max_attempts(max);
            }
            driver.spawn_with(cancel.clone(), move |outcome| {
                on_complete(Completion::from_outcome(outcome))
            });
        }
    }

    cancel
}

/// The inputs to [`verify`].
#[derive(Clone, Copy, Debug)]
pub struct VerifyOptions<'a> {
    /// The Equihash `n` parameter.
    pub n: u32,
    /// The Equihash `k` parameter.
    pub k: u32,
    /// The seed the solution commits to.
    pub seed: &'a [u8],
    /// The nonce the solution commits to.
    pub nonce: u32,
    /// The minimal encoding of the solution indices.
    pub value: &'a [u8],
}

/// Returns `true` if `options.value` is a valid solution for the given parameters,
/// seed and nonce.
pub fn verify(options: &VerifyOptions<'_>) -> bool {
    match is_valid_solution(
        options.n,
        options.k,
        options.seed,
        options.nonce,
        options.value,
    ) {
        Ok(()) => true,
        Err(e) => {
            debug!(
                n = options.n,
                k = options.k,
                nonce = options.nonce,
                "Rejected solution: {}",
                e
            );
            false
        }
    }
}
