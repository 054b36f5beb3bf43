//! One-shot per-key rendezvous (§4.I "Parallel mode", §9 "Message passer"):
//! a small map from block offset to payload, guaranteeing exactly one send
//! per key and a blocking receive — the only cross-thread synchronization
//! inside the carry-CRT finish phase (§5 "Suspension / blocking points").
//!
//! Grounded in §9's suggested shape directly: a `HashMap<Key, payload>`
//! under a mutex with a condition variable, rather than a channel per key.
use std::{
    collections::HashMap,
    sync::{Condvar, Mutex},
};

pub struct MessagePasser<T> {
    state: Mutex<HashMap<usize, T>>,
    condvar: Condvar,
}

impl<T: Clone> MessagePasser<T> {
    pub fn new() -> Self {
        MessagePasser {
            state: Mutex::new(HashMap::new()),
            condvar: Condvar::new(),
        }
    }

    /// Sends `value` for `key`. Calling this twice for the same key is a
    /// caller bug (debug-asserted, not a recoverable error — the finish
    /// phase's block ordering guarantees exactly one sender per key).
    pub fn send(&self, key: usize, value: T) {
        let mut guard = self.state.lock().unwrap();
        let prior = guard.insert(key, value);
        debug_assert!(prior.is_none(), "message passer: duplicate send for key {key}");
        self.condvar.notify_all();
    }

    /// Blocks the calling thread until `send(key, _)` has run, then returns
    /// its value.
    pub fn receive(&self, key: usize) -> T {
        let mut guard = self.state.lock().unwrap();
        loop {
            if let Some(value) = guard.get(&key) {
                return value.clone();
            }
            guard = self.condvar.wait(guard).unwrap();
        }
    }
}

impl<T: Clone> Default for MessagePasser<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn receive_returns_the_sent_value() {
        let passer: MessagePasser<u64> = MessagePasser::new();
        passer.send(7, 123);
        assert_eq!(passer.receive(7), 123);
    }

    #[test]
    fn receive_blocks_until_send_from_another_thread() {
        let passer: Arc<MessagePasser<u64>> = Arc::new(MessagePasser::new());
        let reader = {
            let passer = Arc::clone(&passer);
            thread::spawn(move || passer.receive(0))
        };
        thread::sleep(Duration::from_millis(20));
        passer.send(0, 99);
        assert_eq!(reader.join().unwrap(), 99);
    }

    #[test]
    fn distinct_keys_do_not_interfere() {
        let passer: MessagePasser<u64> = MessagePasser::new();
        passer.send(1, 10);
        passer.send(2, 20);
        assert_eq!(passer.receive(2), 20);
        assert_eq!(passer.receive(1), 10);
    }
}
