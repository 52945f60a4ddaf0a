//! Predicate-matched one-shot frame waiters

use crate::error::RelayError;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;

type Predicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

struct Waiter {
    id: u64,
    predicate: Predicate,
    tx: oneshot::Sender<Result<Value, RelayError>>,
}

#[derive(Default)]
struct RouterState {
    next_id: u64,
    waiters: Vec<Waiter>,
    closed: Option<RelayError>,
}

/// Registry of waiters for one connection
///
/// Every inbound frame is offered to every registered waiter; each waiter
/// whose predicate accepts it receives a copy and is removed. Once the
/// connection ends, pending and future waiters fail with the close reason.
#[derive(Default)]
pub struct FrameRouter {
    state: Mutex<RouterState>,
}

impl FrameRouter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribe to the next frame accepted by `predicate`
    pub fn register<F>(self: &Arc<Self>, predicate: F) -> FrameWaiter
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;

        if let Some(reason) = state.closed.clone() {
            let _ = tx.send(Err(reason));
        } else {
            state.waiters.push(Waiter {
                id,
                predicate: Box::new(predicate),
                tx,
            });
        }

        FrameWaiter {
            id,
            rx,
            router: Arc::downgrade(self),
        }
    }

    /// Deliver `frame` to every matching waiter, returning how many took it
    pub fn dispatch(&self, frame: &Value) -> usize {
        let mut state = self.state.lock();
        let mut delivered = 0;
        let mut index = 0;
        while index < state.waiters.len() {
            if (state.waiters[index].predicate)(frame) {
                let waiter = state.waiters.swap_remove(index);
                if waiter.tx.send(Ok(frame.clone())).is_ok() {
                    delivered += 1;
                }
            } else {
                index += 1;
            }
        }
        delivered
    }

    /// Fail every pending waiter and refuse new ones
    pub fn close(&self, reason: RelayError) {
        let mut state = self.state.lock();
        if state.closed.is_none() {
            state.closed = Some(reason.clone());
        }
        for waiter in state.waiters.drain(..) {
            let _ = waiter.tx.send(Err(reason.clone()));
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed.is_some()
    }

    /// Number of waiters still registered
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn deregister(&self, id: u64) {
        self.state.lock().waiters.retain(|waiter| waiter.id != id);
    }
}

/// One-shot subscription to a matching frame
///
/// Dropping the waiter deregisters it, whether or not it ever matched.
pub struct FrameWaiter {
    id: u64,
    rx: oneshot::Receiver<Result<Value, RelayError>>,
    router: Weak<FrameRouter>,
}

impl FrameWaiter {
    /// Wait for the matching frame, or for the connection to end
    pub async fn recv(mut self) -> Result<Value, RelayError> {
        match (&mut self.rx).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::Closed),
        }
    }

    /// [`FrameWaiter::recv`] bounded by `timeout`
    pub async fn recv_timeout(self, timeout: Duration) -> Result<Value, RelayError> {
        tokio::time::timeout(timeout, self.recv())
            .await
            .map_err(|_| RelayError::Timeout(timeout))?
    }
}

impl Drop for FrameWaiter {
    fn drop(&mut self) {
        if let Some(router) = self.router.upgrade() {
            router.deregister(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn command_is(expected: &'static str) -> impl Fn(&Value) -> bool + Send + Sync {
        move |frame| frame["commandType"] == expected
    }

    #[tokio::test]
    async fn test_matching_frame_resolves_waiter() {
        let router = FrameRouter::new();
        let waiter = router.register(command_is("GetUsers"));

        assert_eq!(router.dispatch(&json!({"commandType": "SendMessage"})), 0);
        assert_eq!(router.waiter_count(), 1);

        assert_eq!(router.dispatch(&json!({"commandType": "GetUsers", "users": []})), 1);
        assert_eq!(router.waiter_count(), 0);

        let frame = waiter.recv().await.unwrap();
        assert_eq!(frame["users"], json!([]));
    }

    #[tokio::test]
    async fn test_one_frame_reaches_every_match() {
        let router = FrameRouter::new();
        let first = router.register(|frame| frame["body"]["status"] == "CommanderSelect");
        let second = router.register(|frame| frame["command"] == "updateGameInfo");

        let frame = json!({"command": "updateGameInfo", "body": {"status": "CommanderSelect"}});
        assert_eq!(router.dispatch(&frame), 2);
        assert_eq!(first.recv().await.unwrap(), frame);
        assert_eq!(second.recv().await.unwrap(), frame);
    }

    #[tokio::test]
    async fn test_drop_deregisters() {
        let router = FrameRouter::new();
        let waiter = router.register(command_is("GetUsers"));
        assert_eq!(router.waiter_count(), 1);

        drop(waiter);
        assert_eq!(router.waiter_count(), 0);
        assert_eq!(router.dispatch(&json!({"commandType": "GetUsers"})), 0);
    }

    #[tokio::test]
    async fn test_close_fails_pending_and_future_waiters() {
        let router = FrameRouter::new();
        let pending = router.register(command_is("GetUsers"));

        router.close(RelayError::Io("connection reset".to_string()));
        assert_eq!(
            pending.recv().await,
            Err(RelayError::Io("connection reset".to_string()))
        );

        let late = router.register(command_is("GetUsers"));
        assert_eq!(
            late.recv().await,
            Err(RelayError::Io("connection reset".to_string()))
        );
        assert_eq!(router.waiter_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_timeout() {
        let router = FrameRouter::new();
        let waiter = router.register(command_is("GetUsers"));

        let result = waiter.recv_timeout(Duration::from_secs(5)).await;
        assert_eq!(result, Err(RelayError::Timeout(Duration::from_secs(5))));
        assert_eq!(router.waiter_count(), 0);
    }
}
