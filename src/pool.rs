//! Reuse pool for request contexts
//!
//! The handler adapter checks a [`Context`] out of a [`ContextPool`] for every
//! request and hands it back when the handler is done. The pool is injected
//! into the app, so tests can swap the recycling implementation for
//! [`FreshPool`], which never reuses anything.

use crate::context::Context;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Concurrency-safe source of request contexts
pub trait ContextPool: Send + Sync + 'static {
    /// Take a blank context, constructing one if none is idle
    fn acquire(&self) -> Context;

    /// Give a context back after its request finished
    fn release(&self, ctx: Context);

    fn stats(&self) -> PoolStats;
}

/// Check a context out of `pool`, returning it automatically on drop
pub fn checkout(pool: &Arc<dyn ContextPool>) -> PooledContext {
    PooledContext {
        ctx: Some(pool.acquire()),
        pool: Arc::clone(pool),
    }
}

/// Thread-safe LIFO pool of reusable contexts
///
/// Growth is unbounded: an empty pool constructs a new context instead of
/// waiting. At most `max_idle` released contexts are kept; extra ones are
/// dropped.
pub struct RecyclingPool {
    idle: Mutex<Vec<Context>>,
    max_idle: usize,
    counters: Counters,
}

impl RecyclingPool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
            counters: Counters::default(),
        }
    }

    /// Pool sized from the CPU count: 4x cores, clamped to 16..=512
    pub fn with_default_size() -> Self {
        let core_count = num_cpus::get();
        let max_idle = (core_count * 4).clamp(16, 512);
        log::debug!(
            "Sizing context pool to {} idle contexts ({} CPU cores)",
            max_idle,
            core_count
        );
        Self::new(max_idle)
    }

    /// Pre-populate the pool so early requests skip construction
    pub fn warm_up(&self, count: usize) {
        let mut idle = match self.idle.lock() {
            Ok(idle) => idle,
            Err(_) => return,
        };

        while idle.len() < count.min(self.max_idle) {
            idle.push(self.counters.create());
        }

        log::info!("Warmed up context pool with {} contexts", idle.len());
    }

    /// Drop all idle contexts
    pub fn clear(&self) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.clear();
        }
    }
}

impl Default for RecyclingPool {
    fn default() -> Self {
        Self::with_default_size()
    }
}

impl ContextPool for RecyclingPool {
    fn acquire(&self) -> Context {
        self.counters.acquired.fetch_add(1, Ordering::Relaxed);

        // The lock is released before a new context is constructed.
        let reused = match self.idle.lock() {
            Ok(mut idle) => idle.pop(),
            Err(_) => None,
        };

        reused.unwrap_or_else(|| self.counters.create())
    }

    fn release(&self, mut ctx: Context) {
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        ctx.reset();

        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.max_idle {
                idle.push(ctx);
            }
        }
        // Pool full or lock poisoned: the context is dropped here
    }

    fn stats(&self) -> PoolStats {
        self.counters
            .snapshot(self.idle.lock().map(|idle| idle.len()).unwrap_or(0), self.max_idle)
    }
}

/// Pool that never reuses: every acquire constructs, every release drops
#[derive(Default)]
pub struct FreshPool {
    counters: Counters,
}

impl FreshPool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextPool for FreshPool {
    fn acquire(&self) -> Context {
        self.counters.acquired.fetch_add(1, Ordering::Relaxed);
        self.counters.create()
    }

    fn release(&self, ctx: Context) {
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        drop(ctx);
    }

    fn stats(&self) -> PoolStats {
        self.counters.snapshot(0, 0)
    }
}

#[derive(Default)]
struct Counters {
    next_serial: AtomicU64,
    created: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl Counters {
    fn create(&self) -> Context {
        self.created.fetch_add(1, Ordering::Relaxed);
        Context::new(self.next_serial.fetch_add(1, Ordering::Relaxed))
    }

    fn snapshot(&self, idle: usize, max_idle: usize) -> PoolStats {
        PoolStats {
            idle,
            max_idle,
            created: self.created.load(Ordering::Relaxed),
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
        }
    }
}

/// RAII handle for a checked-out context
///
/// Derefs to [`Context`]. Dropping it, including during unwinding or when
/// the request future is cancelled, releases the context to its pool.
pub struct PooledContext {
    ctx: Option<Context>,
    pool: Arc<dyn ContextPool>,
}

impl PooledContext {
    /// Release the context now instead of at end of scope
    pub fn release(mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}

impl std::ops::Deref for PooledContext {
    type Target = Context;

    fn deref(&self) -> &Context {
        // `ctx` is only taken in `release` and `drop`, both of which consume the guard
        self.ctx.as_ref().expect("PooledContext: context already released")
    }
}

impl std::ops::DerefMut for PooledContext {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx.as_mut().expect("PooledContext: context already released")
    }
}

impl Drop for PooledContext {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}

/// Pool statistics for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Contexts currently idle in the pool
    pub idle: usize,
    pub max_idle: usize,
    /// Contexts constructed, including warm-up
    pub created: usize,
    pub acquired: usize,
    pub released: usize,
}

impl PoolStats {
    /// Contexts currently checked out
    pub fn in_use(&self) -> usize {
        self.acquired.saturating_sub(self.released)
    }
}
