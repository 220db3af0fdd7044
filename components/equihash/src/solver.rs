//! A collision-search solver for Equihash, based on Wagner's algorithm for the
//! generalised birthday problem.
//!
//! The search proceeds in rounds. Round 0 expands every leaf index into its `k + 1`
//! collision chunks. Each of the following `k` rounds sorts the surviving rows into
//! buckets by their leading chunk, and pairs up every two rows within a bucket; the
//! new row carries the XOR of the remaining chunks. After round `k`, the surviving
//! pairs are exactly the trees whose leaves XOR to zero.
//!
//! Rows only remember which two rows of the previous round they were built from, so
//! the hash chunks of a round can be released as soon as the next round is built.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::vec::Vec;

use blake2b_simd::State as Blake2bState;
use memuse::DynamicUsage;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::{
    digest,
    params::Params,
    proof::{Proof, VerifiedProof},
    verify::Error,
};

/// The default number of rows kept per bucket. Rows beyond this are dropped, which
/// only lowers the chance of finding a solution for the current nonce.
pub const DEFAULT_BUCKET_CAPACITY: usize = 64;

/// A shared flag for cancelling an in-flight search.
///
/// The solver checks the flag between rounds, so a cancelled search stops after the
/// round it is currently running.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Constructs a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every search holding this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The hash chunks of every row in a single round.
///
/// Row `r` owns `hashes[r * width..(r + 1) * width]`.
struct HashTable {
    width: usize,
    hashes: Vec<u32>,
}

impl HashTable {
    fn len(&self) -> usize {
        self.hashes.len() / self.width
    }

    fn row(&self, r: u32) -> &[u32] {
        let start = r as usize * self.width;
        &self.hashes[start..start + self.width]
    }
}

impl DynamicUsage for HashTable {
    fn dynamic_usage(&self) -> usize {
        self.hashes.dynamic_usage()
    }

    fn dynamic_usage_bounds(&self) -> (usize, Option<usize>) {
        self.hashes.dynamic_usage_bounds()
    }
}

/// For every row of a round, the two rows of the previous round it was built from.
type Links = Vec<[u32; 2]>;

/// The result of a single solver run.
pub(crate) enum Attempt {
    /// The run completed, finding zero or more solutions.
    Solved(Vec<Vec<u32>>),
    /// The run was cancelled between rounds.
    Cancelled,
}

fn generate_leaves(p: &Params, state: &Blake2bState) -> HashTable {
    let width = p.k as usize + 1;
    let per_block = p.indices_per_hash_output() as usize;

    let mut hashes = vec![0; p.leaf_count() as usize * width];
    hashes
        .par_chunks_mut(per_block * width)
        .enumerate()
        .for_each(|(block, out)| {
            let hash = digest::generate_hash(state, block as u32);
            for (slot, leaf) in out.chunks_exact_mut(width).enumerate() {
                digest::expand_leaf(p, hash.as_bytes(), slot, leaf);
            }
        });

    HashTable { width, hashes }
}

/// Sorts the rows of `table` by their leading chunk, and returns the sorted row order
/// along with the runs of rows sharing a leading chunk.
///
/// Runs longer than `capacity` keep their first `capacity` rows. Runs of a single row
/// have no partner and are pruned.
fn buckets(table: &HashTable, capacity: usize) -> (Vec<u32>, Vec<Range<usize>>, usize) {
    let mut order: Vec<u32> = (0..table.len()).map(|r| r as u32).collect();
    order.par_sort_unstable_by_key(|&r| (table.row(r)[0], r));

    let mut runs = vec![];
    let mut dropped = 0;
    let mut start = 0;
    while start < order.len() {
        let key = table.row(order[start])[0];
        let end = start
            + order[start..]
                .iter()
                .take_while(|&&r| table.row(r)[0] == key)
                .count();
        if end - start > 1 {
            let kept = (end - start).min(capacity);
            dropped += end - start - kept;
            runs.push(start..start + kept);
        }
        start = end;
    }

    (order, runs, dropped)
}

fn shares_parent(prev: Option<&[[u32; 2]]>, a: u32, b: u32) -> bool {
    match prev {
        None => false,
        Some(links) => {
            let [a0, a1] = links[a as usize];
            let [b0, b1] = links[b as usize];
            a0 == b0 || a0 == b1 || a1 == b0 || a1 == b1
        }
    }
}

/// Pairs up the rows within each bucket.
///
/// In the final round a pair must also agree on its remaining chunk, and no hashes
/// are produced.
fn collide(
    table: &HashTable,
    order: &[u32],
    runs: &[Range<usize>],
    prev: Option<&[[u32; 2]]>,
    last: bool,
) -> (Vec<u32>, Links) {
    let parts: Vec<(Vec<u32>, Links)> = runs
        .par_iter()
        .map(|run| {
            let mut hashes = vec![];
            let mut links = vec![];
            let rows = &order[run.clone()];
            for (i, &a) in rows.iter().enumerate() {
                for &b in &rows[i + 1..] {
                    // Two rows built from a common row would repeat its leaves.
                    if shares_parent(prev, a, b) {
                        continue;
                    }
                    let (ha, hb) = (table.row(a), table.row(b));
                    if last {
                        if ha[1..] == hb[1..] {
                            links.push([a, b]);
                        }
                    } else {
                        hashes.extend(ha.iter().zip(hb.iter()).skip(1).map(|(x, y)| x ^ y));
                        links.push([a, b]);
                    }
                }
            }
            (hashes, links)
        })
        .collect();

    let rows: usize = parts.iter().map(|(_, links)| links.len()).sum();
    let mut hashes = Vec::with_capacity(rows * table.width.saturating_sub(1));
    let mut links = Vec::with_capacity(rows);
    for (h, l) in parts {
        hashes.extend(h);
        links.extend(l);
    }
    (hashes, links)
}

/// Returns the leaf indices of row `row` in round `level`, in canonical order.
fn expand_indices(rounds: &[Links], level: usize, row: u32) -> Vec<u32> {
    if level == 0 {
        return vec![row];
    }
    let [a, b] = rounds[level - 1][row as usize];
    let a = expand_indices(rounds, level - 1, a);
    let b = expand_indices(rounds, level - 1, b);
    let (mut first, second) = if a[0] < b[0] { (a, b) } else { (b, a) };
    first.extend(second);
    first
}

fn distinct(indices: &[u32]) -> bool {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).all(|w| w[0] != w[1])
}

/// Performs a single solver run for `(seed, nonce)`, returning the unique candidate
/// solutions in sorted order.
pub(crate) fn solve_candidates(
    p: Params,
    seed: &[u8],
    nonce: u32,
    bucket_capacity: usize,
    cancel: &CancelToken,
) -> Attempt {
    let state = digest::base_state(&p, seed, nonce);
    let mut table = generate_leaves(&p, &state);
    let mut rounds: Vec<Links> = Vec::with_capacity(p.k as usize);

    for r in 1..=p.k {
        if cancel.is_cancelled() {
            debug!(nonce, round = r, "Solver run cancelled");
            return Attempt::Cancelled;
        }

        let (order, runs, dropped) = buckets(&table, bucket_capacity);
        let (hashes, links) = collide(
            &table,
            &order,
            &runs,
            rounds.last().map(|l| l.as_slice()),
            r == p.k,
        );
        trace!(
            nonce,
            round = r,
            rows = links.len(),
            dropped,
            table_bytes = table.dynamic_usage(),
            "Finished collision round"
        );

        // Release this round's hashes before the next round begins.
        table = HashTable {
            width: table.width - 1,
            hashes,
        };
        rounds.push(links);
    }

    let roots = rounds.last().map_or(0, |l| l.len());
    let mut solutions = (0..roots)
        .map(|root| expand_indices(&rounds, rounds.len(), root as u32))
        .filter(|indices| distinct(indices))
        .collect::<Vec<_>>();

    // Distinct trees can still select the same leaves.
    solutions.sort();
    solutions.dedup();

    debug!(nonce, candidates = roots, solutions = solutions.len(), "Solver run finished");
    Attempt::Solved(solutions)
}

/// An Equihash solver for a fixed parameter set and seed.
#[derive(Clone, Debug)]
pub struct Solver {
    params: Params,
    seed: Vec<u8>,
    bucket_capacity: usize,
}

impl Solver {
    /// Constructs a solver for the parameters `(n, k)` and the given seed.
    ///
    /// Returns an error if the parameters are invalid.
    pub fn new(n: u32, k: u32, seed: &[u8]) -> Result<Self, Error> {
        Ok(Solver {
            params: Params::new(n, k)?,
            seed: seed.to_vec(),
            bucket_capacity: DEFAULT_BUCKET_CAPACITY,
        })
    }

    /// Sets the number of rows kept per bucket (at least 2).
    pub fn with_bucket_capacity(mut self, capacity: usize) -> Self {
        self.bucket_capacity = capacity.max(2);
        self
    }

    /// Returns the parameters this solver searches with.
    pub fn params(&self) -> Params {
        self.params
    }

    /// Returns the seed this solver searches with.
    pub fn seed(&self) -> &[u8] {
        &self.seed
    }

    /// Runs the solver for `nonce`, returning `None` if it was cancelled.
    pub(crate) fn run(&self, nonce: u32, cancel: &CancelToken) -> Option<Vec<VerifiedProof>> {
        match solve_candidates(self.params, &self.seed, nonce, self.bucket_capacity, cancel) {
            Attempt::Cancelled => None,
            Attempt::Solved(solutions) => Some(
                solutions
                    .into_iter()
                    .filter_map(|indices| {
                        let proof = Proof::from_parts(self.params, self.seed.clone(), nonce, indices);
                        match proof.into_verified() {
                            Ok(proof) => Some(proof),
                            Err(e) => {
                                warn!(nonce, "Solver produced an invalid solution: {}", e);
                                None
                            }
                        }
                    })
                    .collect(),
            ),
        }
    }

    /// Returns every distinct proof for `nonce`, in sorted order.
    pub fn solve_all(&self, nonce: u32) -> Vec<VerifiedProof> {
        self.run(nonce, &CancelToken::new()).unwrap_or_default()
    }

    /// Returns the first proof for `nonce`, if any.
    pub fn solve(&self, nonce: u32) -> Option<VerifiedProof> {
        self.solve_all(nonce).into_iter().next()
    }
}

/// Searches for a proof for `(seed, nonce)` with the parameters `(n, k)`.
///
/// Returns `Ok(None)` if this nonce has no solution; the caller should retry with
/// another nonce.
pub fn solve(n: u32, k: u32, seed: &[u8], nonce: u32) -> Result<Option<VerifiedProof>, Error> {
    Ok(Solver::new(n, k, seed)?.solve(nonce))
}
