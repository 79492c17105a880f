//! Fixed-capacity registry of linked peers (single-core topology).
//!
//! Slots are reused through a free list, so connect/disconnect churn
//! never allocates and a handle lookup is a linear scan over at most
//! [`MAX_PEERS`] entries.

use heapless::Vec;
use log::warn;

use super::PeerHandle;

/// Concurrent peers the console service accepts.
pub const MAX_PEERS: usize = 4;

pub struct ConnectionRegistry {
    slots: [Option<PeerHandle>; MAX_PEERS],
    free: Vec<u8, MAX_PEERS>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        let mut free = Vec::new();
        // Pop from the back, so push in reverse to hand out slot 0 first.
        for idx in (0..MAX_PEERS as u8).rev() {
            let _ = free.push(idx);
        }
        Self {
            slots: [None; MAX_PEERS],
            free,
        }
    }

    /// Record a new peer. Returns `false` if it was already present or
    /// the registry is full.
    pub fn add(&mut self, peer: PeerHandle) -> bool {
        if self.contains(peer) {
            return false;
        }
        let Some(idx) = self.free.pop() else {
            warn!("LINK: registry full, peer {} not tracked", peer);
            return false;
        };
        self.slots[idx as usize] = Some(peer);
        true
    }

    /// Forget a peer. Returns `false` if it was unknown.
    pub fn remove(&mut self, peer: PeerHandle) -> bool {
        let Some(idx) = self.slots.iter().position(|s| *s == Some(peer)) else {
            return false;
        };
        self.slots[idx] = None;
        let _ = self.free.push(idx as u8);
        true
    }

    pub fn contains(&self, peer: PeerHandle) -> bool {
        self.slots.contains(&Some(peer))
    }

    pub fn count(&self) -> usize {
        MAX_PEERS - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = PeerHandle> + '_ {
        self.slots.iter().filter_map(|s| *s)
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
