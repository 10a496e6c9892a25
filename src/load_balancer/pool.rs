//! Upstream pool management.
//!
//! # Responsibilities
//! - Hold the fixed, ordered list of upstreams
//! - Apply round-robin selection, skipping upstreams that are not alive
//! - Hand out shared references for liveness collaborators

use std::sync::Arc;

use thiserror::Error;

use crate::load_balancer::{round_robin::RoundRobin, Upstream};

/// Errors raised by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// A pool needs at least one upstream.
    #[error("server pool requires at least one upstream")]
    Empty,

    /// Every upstream was checked once and none is alive.
    #[error("no healthy upstream among {pool_size} configured")]
    NoHealthyUpstream { pool_size: usize },
}

/// An ordered, fixed-size set of upstreams with a rotation cursor.
#[derive(Debug)]
pub struct ServerPool<U> {
    upstreams: Vec<Arc<U>>,
    cursor: RoundRobin,
}

impl<U: Upstream> ServerPool<U> {
    /// Build a pool in the given order. Fails if `upstreams` is empty.
    pub fn new(upstreams: Vec<U>) -> Result<Self, PoolError> {
        if upstreams.is_empty() {
            return Err(PoolError::Empty);
        }

        Ok(Self {
            upstreams: upstreams.into_iter().map(Arc::new).collect(),
            cursor: RoundRobin::new(),
        })
    }

    /// Return the next alive upstream and advance the cursor past it.
    pub fn next(&self) -> Result<Arc<U>, PoolError> {
        let len = self.upstreams.len();
        match self.cursor.select(len, |i| self.upstreams[i].is_alive()) {
            Some(index) => Ok(self.upstreams[index].clone()),
            None => {
                tracing::debug!(pool_size = len, "No alive upstream found after a full scan");
                Err(PoolError::NoHealthyUpstream { pool_size: len })
            }
        }
    }

    /// All upstreams, in rotation order.
    pub fn upstreams(&self) -> &[Arc<U>] {
        &self.upstreams
    }

    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    /// Always `false`; construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }
}
