//! Nonce search on top of the [`Solver`], optionally run on the global threadpool.

use crossbeam_channel as channel;
use std::time::Duration;
use std::vec::Vec;

use tracing::{debug, warn};

use crate::{
    params::Params,
    proof::VerifiedProof,
    solver::{CancelToken, Solver},
    verify::Error,
};

/// The result of a nonce search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A proof was found.
    Found(VerifiedProof),
    /// The attempt limit was reached without finding a proof.
    ///
    /// `next_nonce` is the first nonce that was not tried, or `None` if the search
    /// reached `u32::MAX`.
    Exhausted {
        params: Params,
        next_nonce: Option<u32>,
    },
    /// The search was cancelled while trying `next_nonce`, which should be retried.
    Cancelled { params: Params, next_nonce: u32 },
}

/// Searches consecutive nonces until one of them has a proof.
#[derive(Clone, Debug)]
pub struct SearchDriver {
    solver: Solver,
    start_nonce: u32,
    max_attempts: Option<u32>,
}

impl SearchDriver {
    /// Constructs a driver that starts at nonce 0 and stops only at `u32::MAX`.
    pub fn new(solver: Solver) -> Self {
        SearchDriver {
            solver,
            start_nonce: 0,
            max_attempts: None,
        }
    }

    /// Sets the first nonce to try.
    pub fn starting_at(mut self, nonce: u32) -> Self {
        self.start_nonce = nonce;
        self
    }

    /// Sets the maximum number of nonces to try.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Returns the parameters this driver searches with.
    pub fn params(&self) -> Params {
        self.solver.params()
    }

    /// Runs the search on the current thread.
    ///
    /// `cancel` is checked between nonces, and by the solver between rounds.
    pub fn find_proof(&self, cancel: &CancelToken) -> SearchOutcome {
        let params = self.params();
        let mut nonce = self.start_nonce;
        let mut attempts: u32 = 0;

        loop {
            if self.max_attempts.map_or(false, |max| attempts >= max) {
                debug!(%params, attempts, "Search exhausted");
                return SearchOutcome::Exhausted {
                    params,
                    next_nonce: Some(nonce),
                };
            }
            if cancel.is_cancelled() {
                return SearchOutcome::Cancelled {
                    params,
                    next_nonce: nonce,
                };
            }

            debug!(%params, nonce, "Trying nonce");
            match self.solver.run(nonce, cancel) {
                None => {
                    return SearchOutcome::Cancelled {
                        params,
                        next_nonce: nonce,
                    }
                }
                Some(proofs) => {
                    if let Some(proof) = proofs.into_iter().next() {
                        debug!(%params, nonce, attempts = attempts + 1, "Found proof");
                        return SearchOutcome::Found(proof);
                    }
                }
            }

            attempts = attempts.saturating_add(1);
            nonce = match nonce.checked_add(1) {
                Some(next) => next,
                None => {
                    debug!(%params, attempts, "Search reached the last nonce");
                    return SearchOutcome::Exhausted {
                        params,
                        next_nonce: None,
                    };
                }
            };
        }
    }

    /// Runs the search on the global threadpool, passing the outcome to
    /// `on_complete` on the worker thread.
    pub(crate) fn spawn_with<F>(self, cancel: CancelToken, on_complete: F)
    where
        F: FnOnce(SearchOutcome) + Send + 'static,
    {
        rayon::spawn_fifo(move || on_complete(self.find_proof(&cancel)));
    }

    /// Runs the search on the global threadpool.
    ///
    /// Dropping the returned handle cancels the search.
    pub fn spawn(self) -> SearchHandle {
        let params = self.params();
        let start_nonce = self.start_nonce;
        let cancel = CancelToken::new();
        let (tx, rx) = channel::bounded(1);

        self.spawn_with(cancel.clone(), move |outcome| {
            if tx.send(outcome).is_err() {
                debug!("SearchHandle was dropped before the search finished");
            }
        });

        SearchHandle {
            params,
            start_nonce,
            cancel,
            result: rx,
        }
    }
}

/// A handle to a search running on the global threadpool.
///
/// The outcome can be retrieved once.
#[derive(Debug)]
pub struct SearchHandle {
    params: Params,
    start_nonce: u32,
    cancel: CancelToken,
    result: channel::Receiver<SearchOutcome>,
}

impl SearchHandle {
    /// Requests that the search stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns a token that cancels this search.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Blocks until the search finishes.
    pub fn wait(self) -> SearchOutcome {
        self.result.recv().unwrap_or_else(|_| self.worker_lost())
    }

    /// Blocks until the search finishes or `timeout` elapses, returning `None` in the
    /// latter case.
    ///
    /// The search keeps running after a timeout; call [`SearchHandle::cancel`] to stop
    /// it.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<SearchOutcome> {
        match self.result.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(channel::RecvTimeoutError::Timeout) => None,
            Err(channel::RecvTimeoutError::Disconnected) => Some(self.worker_lost()),
        }
    }

    /// Returns the outcome if the search has finished.
    pub fn try_wait(&self) -> Option<SearchOutcome> {
        match self.result.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(channel::TryRecvError::Empty) => None,
            Err(channel::TryRecvError::Disconnected) => Some(self.worker_lost()),
        }
    }

    fn worker_lost(&self) -> SearchOutcome {
        warn!(params = %self.params, "Search worker exited without an outcome");
        SearchOutcome::Cancelled {
            params: self.params,
            next_nonce: self.start_nonce,
        }
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Searches nonces `start_nonce..` for a proof with the parameters `(n, k)`, trying
/// at most `max_attempts` of them.
///
/// Returns `Ok(None)` if no proof was found.
pub fn find_proof(
    n: u32,
    k: u32,
    seed: &[u8],
    start_nonce: u32,
    max_attempts: u32,
) -> Result<Option<VerifiedProof>, Error> {
    let driver = SearchDriver::new(Solver::new(n, k, seed)?)
        .starting_at(start_nonce)
        .max_attempts(max_attempts);

    match driver.find_proof(&CancelToken::new()) {
        SearchOutcome::Found(proof) => Ok(Some(proof)),
        SearchOutcome::Exhausted { .. } | SearchOutcome::Cancelled { .. } => Ok(None),
    }
}

/// Collects every proof for each nonce in `nonces`, in nonce order.
pub fn find_all_proofs(
    solver: &Solver,
    nonces: impl IntoIterator<Item = u32>,
) -> Vec<VerifiedProof> {
    nonces
        .into_iter()
        .flat_map(|nonce| solver.solve_all(nonce))
        .collect()
}
