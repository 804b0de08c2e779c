/*!
 * Mock city cache for testing.
 *
 * Wraps a [`MemoryCityCache`] and fails selected operations on demand:
 * - `MockCityCache::working()` - behaves exactly like the memory cache
 * - `MockCityCache::failing()` - every operation errors
 * - `MockCityCache::with_fault(..)` - fail only the chosen operations
 *
 * Faults can be switched on and off while the cache is shared with a
 * coordinator, to script "cache goes down mid-session" scenarios.
 */

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::memory::MemoryCityCache;
use super::{CacheResult, CityCache};
use crate::errors::CacheError;

/// Cache operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFault {
    /// `members` returns an error
    Get,
    /// `add` returns an error
    Add,
    /// `remove` returns an error
    Remove,
    /// `clear` returns an error without touching the entry
    Clear,
    /// `clear` drops half of the entry's members, then returns an error
    PartialClear,
}

/// Fault-injecting city cache
#[derive(Clone)]
pub struct MockCityCache {
    /// Storage used when an operation is allowed through
    inner: MemoryCityCache,
    /// Currently active faults
    faults: Arc<RwLock<HashSet<CacheFault>>>,
    /// Number of calls received, failed or not
    call_count: Arc<AtomicUsize>,
}

impl MockCityCache {
    /// Create a mock cache with no faults
    pub fn working() -> Self {
        Self {
            inner: MemoryCityCache::new(true),
            faults: Arc::new(RwLock::new(HashSet::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock cache where every operation fails
    pub fn failing() -> Self {
        Self::working()
            .with_fault(CacheFault::Get)
            .with_fault(CacheFault::Add)
            .with_fault(CacheFault::Remove)
            .with_fault(CacheFault::Clear)
    }

    /// Enable a fault (builder style)
    pub fn with_fault(self, fault: CacheFault) -> Self {
        self.set_fault(fault, true);
        self
    }

    /// Enable or disable a fault at runtime
    pub fn set_fault(&self, fault: CacheFault, active: bool) {
        let mut faults = self.faults.write();
        if active {
            faults.insert(fault);
        } else {
            faults.remove(&fault);
        }
    }

    /// Disable every fault
    pub fn heal(&self) {
        self.faults.write().clear();
    }

    /// The backing memory cache, for inspecting or seeding state
    pub fn inner(&self) -> &MemoryCityCache {
        &self.inner
    }

    /// Number of cache calls received so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn is_active(&self, fault: CacheFault) -> bool {
        self.faults.read().contains(&fault)
    }

    fn injected(operation: &'static str, province_id: i64) -> CacheError {
        CacheError::OperationFailed {
            operation,
            province_id,
            message: "injected fault".to_string(),
        }
    }
}

#[async_trait]
impl CityCache for MockCityCache {
    async fn members(&self, province_id: i64) -> CacheResult<Vec<String>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.is_active(CacheFault::Get) {
            return Err(CacheError::Unavailable("injected fault".to_string()));
        }
        self.inner.members(province_id).await
    }

    async fn add(&self, province_id: i64, city_name: &str) -> CacheResult<()> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.is_active(CacheFault::Add) {
            return Err(Self::injected("add", province_id));
        }
        self.inner.add(province_id, city_name).await
    }

    async fn remove(&self, province_id: i64, city_name: &str) -> CacheResult<()> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.is_active(CacheFault::Remove) {
            return Err(Self::injected("remove", province_id));
        }
        self.inner.remove(province_id, city_name).await
    }

    async fn clear(&self, province_id: i64) -> CacheResult<()> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.is_active(CacheFault::Clear) {
            return Err(Self::injected("clear", province_id));
        }
        if self.is_active(CacheFault::PartialClear) {
            let total = self.inner.peek(province_id).len();
            self.inner.remove_some(province_id, total.div_ceil(2));
            return Err(Self::injected("clear", province_id));
        }
        self.inner.clear(province_id).await
    }
}
