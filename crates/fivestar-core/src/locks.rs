//! Per-key async mutexes.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out one async mutex per key. Holders of the same key run one at a
/// time; different keys never contend.
#[derive(Default)]
pub struct KeyedLocks {
  inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
  pub fn new() -> Self { Self::default() }

  pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
    let lock = {
      let mut inflight = self.inflight.lock().await;
      // Entries nobody holds or waits on are only referenced by the map.
      inflight.retain(|_, l| Arc::strong_count(l) > 1);
      Arc::clone(
        inflight
          .entry(key.to_owned())
          .or_insert_with(|| Arc::new(Mutex::new(()))),
      )
    };
    lock.lock_owned().await
  }

  /// Number of keys currently tracked.
  pub async fn len(&self) -> usize { self.inflight.lock().await.len() }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[tokio::test]
  async fn same_key_is_exclusive() {
    let locks = Arc::new(KeyedLocks::new());
    let guard = locks.acquire("item").await;

    let contender = {
      let locks = Arc::clone(&locks);
      tokio::spawn(async move {
        let _g = locks.acquire("item").await;
      })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!contender.is_finished());

    drop(guard);
    contender.await.unwrap();
  }

  #[tokio::test]
  async fn different_keys_do_not_block() {
    let locks = KeyedLocks::new();
    let _a = locks.acquire("a").await;
    let _b = tokio::time::timeout(Duration::from_secs(1), locks.acquire("b"))
      .await
      .expect("independent key should not wait");
  }

  #[tokio::test]
  async fn released_keys_are_pruned() {
    let locks = KeyedLocks::new();
    drop(locks.acquire("a").await);
    drop(locks.acquire("b").await);
    let _c = locks.acquire("c").await;
    assert_eq!(locks.len().await, 1);
  }
}
