/*!
 * Contract tests shared by every city cache backend
 */

use cityinfo::cache::{CacheFault, CityCache, MemoryCityCache, MockCityCache};
use cityinfo::errors::CacheError;

use crate::common::{names, sorted};

/// Every backend that behaves like a working cache
fn working_backends() -> Vec<(&'static str, Box<dyn CityCache>)> {
    vec![
        ("memory", Box::new(MemoryCityCache::new(true))),
        ("mock", Box::new(MockCityCache::working())),
    ]
}

#[tokio::test]
async fn test_cacheContract_shouldTrackMembersPerProvince() {
    for (backend, cache) in working_backends() {
        cache.add(1, "Springfield").await.unwrap();
        cache.add(1, "Shelbyville").await.unwrap();
        cache.add(1, "Springfield").await.unwrap();
        cache.add(2, "Brockway").await.unwrap();

        assert_eq!(
            sorted(cache.members(1).await.unwrap()),
            names(&["Shelbyville", "Springfield"]),
            "{} backend",
            backend
        );
        assert_eq!(
            cache.members(2).await.unwrap(),
            names(&["Brockway"]),
            "{} backend",
            backend
        );
    }
}

#[tokio::test]
async fn test_cacheContract_missingEntryAndEmptyEntry_shouldLookTheSame() {
    for (backend, cache) in working_backends() {
        cache.add(1, "Springfield").await.unwrap();
        cache.remove(1, "Springfield").await.unwrap();

        assert!(cache.members(1).await.unwrap().is_empty(), "{} backend", backend);
        assert!(cache.members(42).await.unwrap().is_empty(), "{} backend", backend);
    }
}

#[tokio::test]
async fn test_cacheContract_removeAndClearOfUnknownKeys_shouldSucceed() {
    for (backend, cache) in working_backends() {
        assert!(cache.remove(7, "Nowhere").await.is_ok(), "{} backend", backend);
        assert!(cache.clear(7).await.is_ok(), "{} backend", backend);
    }
}

#[tokio::test]
async fn test_cacheContract_clear_shouldOnlyEvictThatProvince() {
    for (backend, cache) in working_backends() {
        cache.add(1, "Springfield").await.unwrap();
        cache.add(2, "Brockway").await.unwrap();

        cache.clear(1).await.unwrap();

        assert!(cache.members(1).await.unwrap().is_empty(), "{} backend", backend);
        assert_eq!(cache.members(2).await.unwrap().len(), 1, "{} backend", backend);
    }
}

#[tokio::test]
async fn test_mockCache_faults_shouldReportOperationAndProvince() {
    let cache = MockCityCache::working().with_fault(CacheFault::Remove);
    cache.add(3, "Springfield").await.unwrap();

    let error = cache.remove(3, "Springfield").await.unwrap_err();

    assert_eq!(
        error,
        CacheError::OperationFailed {
            operation: "remove",
            province_id: 3,
            message: "injected fault".to_string(),
        }
    );
    assert_eq!(cache.inner().peek(3).len(), 1);
}

#[tokio::test]
async fn test_mockCache_clearFault_shouldLeaveEntryIntact() {
    let cache = MockCityCache::working().with_fault(CacheFault::Clear);
    cache.add(1, "Springfield").await.unwrap();
    cache.add(1, "Shelbyville").await.unwrap();

    assert!(cache.clear(1).await.is_err());
    assert_eq!(cache.inner().peek(1).len(), 2);
}
