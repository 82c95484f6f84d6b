//! Waiting pool
//!
//! Connections that asked for a partner and have not been matched yet. The
//! pool keeps insertion order and delegates the choice of partner to a
//! [`SelectionPolicy`], so tests can pin the pairing order with [`FifoPolicy`].

use crate::config::SelectionStrategy;
use crate::connection::ConnectionId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashSet, VecDeque};

/// Chooses which waiting connection gets matched next
pub trait SelectionPolicy: Send {
    /// Pick an index into `waiting` whose id is not `excluding`.
    ///
    /// `waiting` is in enqueue order. Returning `None` means nobody is
    /// eligible.
    fn select(&mut self, waiting: &VecDeque<ConnectionId>, excluding: ConnectionId)
        -> Option<usize>;
}

/// Oldest eligible waiter first
#[derive(Debug, Default, Clone, Copy)]
pub struct FifoPolicy;

impl SelectionPolicy for FifoPolicy {
    fn select(
        &mut self,
        waiting: &VecDeque<ConnectionId>,
        excluding: ConnectionId,
    ) -> Option<usize> {
        waiting.iter().position(|id| *id != excluding)
    }
}

/// Uniformly random eligible waiter
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SelectionPolicy for RandomPolicy {
    fn select(
        &mut self,
        waiting: &VecDeque<ConnectionId>,
        excluding: ConnectionId,
    ) -> Option<usize> {
        let eligible = waiting.iter().filter(|id| **id != excluding).count();
        if eligible == 0 {
            return None;
        }

        let nth = self.rng.gen_range(0..eligible);
        waiting
            .iter()
            .enumerate()
            .filter(|(_, id)| **id != excluding)
            .nth(nth)
            .map(|(index, _)| index)
    }
}

/// Build the policy named by a config strategy
pub fn policy_for(strategy: SelectionStrategy, seed: Option<u64>) -> Box<dyn SelectionPolicy> {
    match strategy {
        SelectionStrategy::Fifo => Box::new(FifoPolicy),
        SelectionStrategy::Random => match seed {
            Some(seed) => Box::new(RandomPolicy::with_seed(seed)),
            None => Box::new(RandomPolicy::from_entropy()),
        },
    }
}

/// Set of connections seeking a partner
pub struct WaitingPool {
    /// Enqueue order
    order: VecDeque<ConnectionId>,

    /// Membership, kept in step with `order`
    members: HashSet<ConnectionId>,

    policy: Box<dyn SelectionPolicy>,
}

impl WaitingPool {
    pub fn new(policy: Box<dyn SelectionPolicy>) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            policy,
        }
    }

    /// Pool with FIFO selection
    pub fn fifo() -> Self {
        Self::new(Box::new(FifoPolicy))
    }

    /// Add `id` to the pool.
    ///
    /// Enqueueing an id that is already waiting is a no-op and returns
    /// `false`. The caller is responsible for not enqueueing ids that are
    /// members of a session.
    pub fn enqueue(&mut self, id: ConnectionId) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push_back(id);
        true
    }

    /// Remove and return a waiting id other than `excluding`
    pub fn dequeue_arbitrary_other(&mut self, excluding: ConnectionId) -> Option<ConnectionId> {
        let index = self.policy.select(&self.order, excluding)?;
        let id = self.order.remove(index)?;
        self.members.remove(&id);
        Some(id)
    }

    /// Remove `id` if present; returns whether it was waiting
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        if !self.members.remove(&id) {
            return false;
        }
        self.order.retain(|waiting| *waiting != id);
        true
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Waiting ids in enqueue order
    pub fn iter(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.order.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> ConnectionId {
        ConnectionId::new(raw)
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut pool = WaitingPool::fifo();
        assert!(pool.enqueue(id(1)));
        assert!(!pool.enqueue(id(1)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_fifo_dequeue_order() {
        let mut pool = WaitingPool::fifo();
        pool.enqueue(id(1));
        pool.enqueue(id(2));
        pool.enqueue(id(3));

        assert_eq!(pool.dequeue_arbitrary_other(id(9)), Some(id(1)));
        assert_eq!(pool.dequeue_arbitrary_other(id(9)), Some(id(2)));
        assert_eq!(pool.dequeue_arbitrary_other(id(9)), Some(id(3)));
        assert_eq!(pool.dequeue_arbitrary_other(id(9)), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_dequeue_skips_excluded() {
        let mut pool = WaitingPool::fifo();
        pool.enqueue(id(1));

        // Only the excluded id is waiting
        assert_eq!(pool.dequeue_arbitrary_other(id(1)), None);
        assert!(pool.contains(id(1)));

        pool.enqueue(id(2));
        assert_eq!(pool.dequeue_arbitrary_other(id(1)), Some(id(2)));
        assert!(!pool.contains(id(2)));
        assert!(pool.contains(id(1)));
    }

    #[test]
    fn test_remove() {
        let mut pool = WaitingPool::fifo();
        pool.enqueue(id(1));
        pool.enqueue(id(2));

        assert!(pool.remove(id(1)));
        assert!(!pool.remove(id(1)));
        assert_eq!(pool.iter().collect::<Vec<_>>(), vec![id(2)]);
    }

    #[test]
    fn test_random_policy_never_selects_excluded() {
        let mut pool = WaitingPool::new(Box::new(RandomPolicy::with_seed(7)));
        for raw in 1..=5 {
            pool.enqueue(id(raw));
        }

        let mut drawn = Vec::new();
        while let Some(next) = pool.dequeue_arbitrary_other(id(3)) {
            assert_ne!(next, id(3));
            drawn.push(next);
        }

        drawn.sort();
        assert_eq!(drawn, vec![id(1), id(2), id(4), id(5)]);
        assert_eq!(pool.iter().collect::<Vec<_>>(), vec![id(3)]);
    }

    #[test]
    fn test_seeded_random_policy_is_reproducible() {
        let run = |seed| {
            let mut pool = WaitingPool::new(policy_for(SelectionStrategy::Random, Some(seed)));
            for raw in 1..=8 {
                pool.enqueue(id(raw));
            }
            std::iter::from_fn(|| pool.dequeue_arbitrary_other(id(0))).collect::<Vec<_>>()
        };

        assert_eq!(run(42), run(42));
    }
}
