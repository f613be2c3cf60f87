use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use progress_core::model::LearnerId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per learner, so read-modify-write sequences for the same learner
/// never interleave while different learners proceed independently.
///
/// Entries are dropped once nobody holds or waits on them.
#[derive(Debug, Default)]
pub(crate) struct LearnerLocks {
    slots: Mutex<HashMap<LearnerId, Arc<AsyncMutex<()>>>>,
}

impl LearnerLocks {
    pub(crate) async fn lock(&self, id: &LearnerId) -> LearnerGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(id.clone()).or_default())
        };
        let guard = slot.lock_owned().await;
        LearnerGuard {
            locks: self,
            id: id.clone(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub(crate) struct LearnerGuard<'a> {
    locks: &'a LearnerLocks,
    id: LearnerId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for LearnerGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Waiters clone the Arc under this same lock, so a count of one means idle.
        if slots
            .get(&self.id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn learner(id: &str) -> LearnerId {
        LearnerId::new(id).unwrap()
    }

    #[tokio::test]
    async fn same_learner_is_exclusive() {
        let locks = Arc::new(LearnerLocks::default());
        let first = locks.lock(&learner("abc")).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(&learner("abc")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        contender.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn different_learners_do_not_block() {
        let locks = LearnerLocks::default();
        let _a = locks.lock(&learner("a")).await;
        let _b = locks.lock(&learner("b")).await;
        assert_eq!(locks.tracked(), 2);
    }
}
