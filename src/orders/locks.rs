use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::domain::OrderId;

/// Serializes work on individual orders with a bounded wait.
///
/// Only ids currently held are tracked, so the set never grows past the number
/// of in-flight transitions.
#[derive(Debug)]
pub struct OrderLocks {
    held: Mutex<HashSet<OrderId>>,
    released: Condvar,
    wait: Duration,
}

/// Exclusive hold on one order, released on drop.
#[derive(Debug)]
pub struct OrderLease<'a> {
    locks: &'a OrderLocks,
    order_id: OrderId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("order {order_id} stayed busy for {waited:?}")]
pub struct LockTimeout {
    pub order_id: OrderId,
    pub waited: Duration,
}

impl OrderLocks {
    pub fn new(wait: Duration) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            wait,
        }
    }

    pub fn acquire(&self, order_id: &OrderId) -> Result<OrderLease<'_>, LockTimeout> {
        let deadline = Instant::now() + self.wait;
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);

        while held.contains(order_id) {
            let now = Instant::now();
            if now >= deadline {
                return Err(LockTimeout {
                    order_id: order_id.clone(),
                    waited: self.wait,
                });
            }
            let (guard, _) = self
                .released
                .wait_timeout(held, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            held = guard;
        }

        held.insert(order_id.clone());
        Ok(OrderLease {
            locks: self,
            order_id: order_id.clone(),
        })
    }

    #[cfg(test)]
    pub fn is_held(&self, order_id: &OrderId) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(order_id)
    }
}

impl Drop for OrderLease<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.order_id);
        drop(held);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn id(raw: &str) -> OrderId {
        OrderId(raw.to_string())
    }

    #[test]
    fn second_acquire_times_out_while_held() {
        let locks = OrderLocks::new(Duration::from_millis(20));
        let _lease = locks.acquire(&id("ord-1")).expect("first acquire");

        let err = locks.acquire(&id("ord-1")).expect_err("busy order");
        assert_eq!(err.order_id, id("ord-1"));
    }

    #[test]
    fn different_orders_do_not_contend() {
        let locks = OrderLocks::new(Duration::from_millis(20));
        let _first = locks.acquire(&id("ord-1")).expect("first");
        let _second = locks.acquire(&id("ord-2")).expect("independent order");
    }

    #[test]
    fn release_wakes_waiting_acquirer() {
        let locks = Arc::new(OrderLocks::new(Duration::from_secs(5)));
        let lease = locks.acquire(&id("ord-1")).expect("first");

        let waiter = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.acquire(&id("ord-1")).map(|_| ()))
        };

        thread::sleep(Duration::from_millis(20));
        drop(lease);

        waiter
            .join()
            .expect("waiter thread")
            .expect("acquired after release");
        assert!(!locks.is_held(&id("ord-1")));
    }
}
