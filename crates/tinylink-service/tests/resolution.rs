use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tinylink_allocator::{GenerateAndCheck, Generator, RandomGenerator};
use tinylink_cache::MokaUrlCache;
use tinylink_core::{
    CacheError, Repository, RetryPolicy, ShortCode, Shortener, ShortenerError, StorageError,
    UrlCache, UrlRecord,
};
use tinylink_service::{ResolutionService, ServiceConfig};
use tinylink_storage::InMemoryRepository;

/// Wraps the in-memory store and counts every call.
#[derive(Default)]
struct CountingRepository {
    inner: InMemoryRepository,
    inserts: AtomicUsize,
    gets: AtomicUsize,
}

impl CountingRepository {
    fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for CountingRepository {
    async fn insert(&self, record: &UrlRecord) -> Result<ShortCode, StorageError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(record).await
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(code).await
    }
}

/// Wraps the moka cache and counts writes.
#[derive(Default)]
struct CountingCache {
    inner: MokaUrlCache,
    sets: AtomicUsize,
}

#[async_trait]
impl UrlCache for CountingCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>, CacheError> {
        self.inner.get_url(code).await
    }

    async fn set_url(
        &self,
        code: &ShortCode,
        long_url: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set_url(code, long_url, ttl).await
    }

    async fn del(&self, code: &ShortCode) -> Result<(), CacheError> {
        self.inner.del(code).await
    }

    async fn close(&self) {
        self.inner.close().await
    }
}

/// A cache whose every call fails, like a cluster that is down.
struct FailingCache;

#[async_trait]
impl UrlCache for FailingCache {
    async fn get_url(&self, _code: &ShortCode) -> Result<Option<String>, CacheError> {
        Err(CacheError::Timeout("no reply within 3000ms".to_string()))
    }

    async fn set_url(
        &self,
        _code: &ShortCode,
        _long_url: &str,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(CacheError::RedirectionsExhausted {
            key: "tl:url:any".to_string(),
            redirections: 16,
        })
    }

    async fn del(&self, _code: &ShortCode) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

/// Offers every code twice in a row: `c0, c0, c1, c1, ...`.
#[derive(Default)]
struct CollisionProne {
    calls: AtomicUsize,
}

impl Generator for CollisionProne {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) / 2;
        ShortCode::new_unchecked(format!("c{n:06}"))
    }
}

/// Always offers the same code.
#[derive(Default)]
struct Constant {
    calls: AtomicUsize,
}

impl Generator for Constant {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ShortCode::new_unchecked("AAAAAAA")
    }
}

fn config() -> ServiceConfig {
    ServiceConfig::builder().base_url("https://tl.ink").build()
}

struct Harness<G> {
    repo: Arc<CountingRepository>,
    cache: Arc<CountingCache>,
    service: ResolutionService<
        Arc<CountingRepository>,
        GenerateAndCheck<Arc<CountingRepository>, G>,
        Arc<CountingCache>,
    >,
}

fn harness<G: Generator>(generator: G) -> Harness<G> {
    let repo = Arc::new(CountingRepository::default());
    let cache = Arc::new(CountingCache::default());
    let allocator = GenerateAndCheck::new(Arc::clone(&repo), generator);
    let service = ResolutionService::new(
        Arc::clone(&repo),
        allocator,
        Arc::clone(&cache),
        config(),
    );
    Harness {
        repo,
        cache,
        service,
    }
}

#[tokio::test]
async fn create_then_immediate_resolve() {
    let h = harness(RandomGenerator::new());

    let short = h.service.create("https://example.com/a", None).await.unwrap();
    assert_eq!(short.url, format!("https://tl.ink/{}", short.code));

    let long_url = h.service.resolve(short.code.as_str()).await.unwrap();
    assert_eq!(long_url, "https://example.com/a");
}

#[tokio::test]
async fn resolve_after_create_reads_only_the_cache() {
    let h = harness(RandomGenerator::new());

    let short = h.service.create("https://example.com", None).await.unwrap();
    for _ in 0..3 {
        h.service.resolve(short.code.as_str()).await.unwrap();
    }

    assert_eq!(h.repo.gets(), 0);
}

#[tokio::test]
async fn evicted_entry_is_served_from_store_and_repopulated() {
    let h = harness(RandomGenerator::new());

    let short = h.service.create("https://example.com", None).await.unwrap();
    h.cache.del(&short.code).await.unwrap();
    assert_eq!(h.cache.get_url(&short.code).await.unwrap(), None);

    let long_url = h.service.resolve(short.code.as_str()).await.unwrap();
    assert_eq!(long_url, "https://example.com");
    assert_eq!(h.repo.gets(), 1);
    assert_eq!(
        h.cache.get_url(&short.code).await.unwrap().as_deref(),
        Some("https://example.com")
    );

    // the repopulated entry serves the next read
    h.service.resolve(short.code.as_str()).await.unwrap();
    assert_eq!(h.repo.gets(), 1);
}

#[tokio::test]
async fn unknown_code_is_not_found() {
    let h = harness(RandomGenerator::new());

    let err = h.service.resolve("doesnotexist").await.unwrap_err();
    assert!(matches!(err, ShortenerError::NotFound(_)));
    // nothing to cache for a missing code
    assert_eq!(h.cache.sets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_url_has_no_side_effects() {
    let h = harness(RandomGenerator::new());

    let err = h.service.create("not-a-url", None).await.unwrap_err();
    assert!(matches!(err, ShortenerError::InvalidUrl(_)));
    assert_eq!(h.repo.inserts(), 0);
    assert_eq!(h.repo.gets(), 0);
    assert_eq!(h.cache.sets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn always_colliding_generator_exhausts_after_the_bound() {
    let repo = Arc::new(CountingRepository::default());
    repo.insert(&UrlRecord::new(
        ShortCode::new_unchecked("AAAAAAA"),
        "https://first.example",
        None,
    ))
    .await
    .unwrap();
    let generator = Arc::new(Constant::default());
    let allocator = GenerateAndCheck::with_policy(
        Arc::clone(&repo),
        Arc::clone(&generator),
        RetryPolicy::immediate(5),
    );
    let service = ResolutionService::new(
        Arc::clone(&repo),
        allocator,
        MokaUrlCache::default(),
        config(),
    );

    let err = service.create("https://second.example", None).await.unwrap_err();
    assert!(matches!(err, ShortenerError::ExhaustedKeySpace(_)));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 5);
    // one seeding insert plus one per attempt
    assert_eq!(repo.inserts(), 6);
}

#[tokio::test]
async fn concurrent_creates_with_colliding_generator_get_distinct_codes() {
    let h = Arc::new(harness(CollisionProne::default()));

    let first = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.service.create("https://one.example", None).await })
    };
    let second = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.service.create("https://two.example", None).await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_ne!(first.code, second.code);

    let mut resolved = HashSet::new();
    resolved.insert(h.service.resolve(first.code.as_str()).await.unwrap());
    resolved.insert(h.service.resolve(second.code.as_str()).await.unwrap());
    assert_eq!(
        resolved,
        HashSet::from(["https://one.example".to_string(), "https://two.example".to_string()])
    );
}

#[tokio::test]
async fn concurrent_creates_never_share_a_code() {
    let h = Arc::new(harness(RandomGenerator::new()));

    let mut handles = vec![];
    for i in 0..200 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            let long_url = format!("https://example.com/{i}");
            let short = h.service.create(&long_url, None).await.unwrap();
            (short.code, long_url)
        }));
    }

    let mut codes = HashSet::new();
    let mut created = vec![];
    for handle in handles {
        let (code, long_url) = handle.await.unwrap();
        assert!(codes.insert(code.clone()), "code {code} handed out twice");
        created.push((code, long_url));
    }

    for (code, long_url) in created {
        assert_eq!(h.service.resolve(code.as_str()).await.unwrap(), long_url);
    }
}

#[tokio::test]
async fn cache_failures_are_absorbed() {
    let repo = Arc::new(CountingRepository::default());
    let allocator = GenerateAndCheck::new(Arc::clone(&repo), RandomGenerator::new());
    let service = ResolutionService::new(Arc::clone(&repo), allocator, FailingCache, config());

    let short = service.create("https://example.com", None).await.unwrap();
    assert_eq!(
        service.resolve(short.code.as_str()).await.unwrap(),
        "https://example.com"
    );
    assert_eq!(
        service.resolve(short.code.as_str()).await.unwrap(),
        "https://example.com"
    );
    // every read falls back to the store
    assert_eq!(repo.gets(), 2);
}

#[tokio::test]
async fn store_outage_surfaces_as_upstream_unavailable() {
    struct Down;

    #[async_trait]
    impl Repository for Down {
        async fn insert(&self, _record: &UrlRecord) -> Result<ShortCode, StorageError> {
            Err(StorageError::Timeout("pool timed out".to_string()))
        }

        async fn get(&self, _code: &ShortCode) -> Result<Option<UrlRecord>, StorageError> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }
    }

    let down = Arc::new(Down);
    let allocator = GenerateAndCheck::new(Arc::clone(&down), RandomGenerator::new());
    let service = ResolutionService::new(down, allocator, MokaUrlCache::default(), config());

    let err = service.create("https://example.com", None).await.unwrap_err();
    assert!(matches!(err, ShortenerError::UpstreamUnavailable(_)));

    let err = service.resolve("AbC1234").await.unwrap_err();
    assert!(matches!(err, ShortenerError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn close_releases_the_cache() {
    let h = harness(RandomGenerator::new());
    let short = h.service.create("https://example.com", None).await.unwrap();

    h.service.close().await;
    // moka drops its entries on close; the store still answers
    assert_eq!(h.cache.get_url(&short.code).await.unwrap(), None);
}
