//! Request/response correlator.
//!
//! The protocol has no request ids: responses arrive in the order requests
//! were written. The correlator keeps a FIFO of waiters and completes the
//! oldest one for each terminal emission of the state machine. Intermediate
//! progress and profile frames never reach it. When the channel dies, every
//! outstanding waiter is failed with the transport error so no caller hangs.

use crate::block::Block;
use crate::query::ServerInfo;
use crate::{Error, Result};
use std::collections::VecDeque;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A completed operation, as seen by the facade.
#[derive(Debug)]
pub enum Response {
    /// Handshake result.
    ServerInfo(ServerInfo),
    /// Merged query result.
    Result(Block),
    /// Command or insert confirmation.
    Executed,
    /// Ping reply.
    Pong,
}

/// The waiter half held by the correlator.
pub type Waiter = oneshot::Sender<Result<Response>>;

/// FIFO of outstanding waiters.
#[derive(Debug, Default)]
pub struct Correlator {
    pending: VecDeque<(&'static str, Waiter)>,
}

impl Correlator {
    /// New, empty correlator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding waiters.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when no request is outstanding.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Register a waiter for the request just written. `kind` is only used
    /// in logs.
    pub fn enqueue(&mut self, kind: &'static str, waiter: Waiter) {
        self.pending.push_back((kind, waiter));
    }

    /// Complete the oldest waiter with a terminal outcome.
    pub fn complete(&mut self, outcome: Result<Response>) {
        match self.pending.pop_front() {
            Some((kind, waiter)) => {
                debug!(kind, ok = outcome.is_ok(), "completing request");
                // The caller may have given up (timeout); that is fine.
                let _ = waiter.send(outcome);
            }
            None => {
                warn!("terminal emission with no outstanding request");
            }
        }
    }

    /// Fail every outstanding waiter; used when the channel goes inactive.
    pub fn fail_all(&mut self, error: &Error) {
        if self.pending.is_empty() {
            return;
        }
        debug!(
            outstanding = self.pending.len(),
            error = %error,
            "failing all outstanding requests"
        );
        for (_, waiter) in self.pending.drain(..) {
            let _ = waiter.send(Err(error.replicate()));
        }
    }
}

impl Drop for Correlator {
    fn drop(&mut self) {
        self.fail_all(&Error::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot::error::TryRecvError;

    fn waiter_pair() -> (Waiter, oneshot::Receiver<Result<Response>>) {
        oneshot::channel()
    }

    #[test]
    fn test_fifo_completion_order() {
        let mut correlator = Correlator::new();
        let (tx1, mut rx1) = waiter_pair();
        let (tx2, mut rx2) = waiter_pair();
        correlator.enqueue("ping", tx1);
        correlator.enqueue("query", tx2);

        correlator.complete(Ok(Response::Pong));
        assert!(matches!(rx1.try_recv().unwrap(), Ok(Response::Pong)));
        assert!(matches!(rx2.try_recv(), Err(TryRecvError::Empty)));

        correlator.complete(Ok(Response::Executed));
        assert!(matches!(rx2.try_recv().unwrap(), Ok(Response::Executed)));
        assert!(correlator.is_empty());
    }

    #[test]
    fn test_channel_close_fails_all_outstanding() {
        let mut correlator = Correlator::new();
        let mut receivers = Vec::new();
        for _ in 0..5 {
            let (tx, rx) = waiter_pair();
            correlator.enqueue("query", tx);
            receivers.push(rx);
        }

        correlator.fail_all(&Error::Connection("peer reset".to_string()));

        for mut rx in receivers {
            match rx.try_recv().unwrap() {
                Err(Error::Connection(msg)) => assert_eq!(msg, "peer reset"),
                other => panic!("unexpected outcome: {:?}", other),
            }
        }
        assert!(correlator.is_empty());
    }

    #[test]
    fn test_response_then_close_fails_only_later_waiters() {
        let mut correlator = Correlator::new();
        let (tx1, mut rx1) = waiter_pair();
        let (tx2, mut rx2) = waiter_pair();
        let (tx3, mut rx3) = waiter_pair();
        correlator.enqueue("query", tx1);
        correlator.enqueue("query", tx2);
        correlator.enqueue("ping", tx3);

        correlator.complete(Ok(Response::Executed));
        correlator.fail_all(&Error::ReadTimeout);

        assert!(matches!(rx1.try_recv().unwrap(), Ok(Response::Executed)));
        assert!(matches!(rx2.try_recv().unwrap(), Err(Error::ReadTimeout)));
        assert!(matches!(rx3.try_recv().unwrap(), Err(Error::ReadTimeout)));
    }

    #[test]
    fn test_complete_with_no_waiter_is_harmless() {
        let mut correlator = Correlator::new();
        correlator.complete(Ok(Response::Pong));
        assert!(correlator.is_empty());
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let mut correlator = Correlator::new();
        let (tx, rx) = waiter_pair();
        drop(rx);
        correlator.enqueue("query", tx);
        correlator.complete(Ok(Response::Executed));
    }

    #[test]
    fn test_drop_fails_outstanding() {
        let (tx, mut rx) = waiter_pair();
        {
            let mut correlator = Correlator::new();
            correlator.enqueue("query", tx);
        }
        assert!(matches!(rx.try_recv().unwrap(), Err(Error::Closed)));
    }
}
