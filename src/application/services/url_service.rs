//! Short-code allocation and cache-aside URL resolution.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CounterCache, lookup_key};
use crate::utils::code_generator::{CodeGenerator, is_valid_short_code};

/// Service for allocating short codes and resolving them back to URLs.
///
/// Allocation retries uniqueness collisions with fresh candidates, growing
/// the candidate length by one every second failed attempt so the collision
/// space shrinks as attempts accumulate. The candidate generator is
/// pluggable; swapping it never changes the retry policy.
///
/// Resolution is cache-aside and fail-soft: cache errors count as misses,
/// store errors resolve to not-found, and the caller never sees an
/// infrastructure failure.
pub struct UrlService<R: ShortUrlRepository, C: CounterCache> {
    repository: Arc<R>,
    cache: Arc<C>,
    generator: Arc<dyn CodeGenerator>,
    code_length: usize,
    max_attempts: usize,
    cache_ttl_seconds: u64,
}

impl<R: ShortUrlRepository, C: CounterCache> UrlService<R, C> {
    /// Creates a new URL service.
    pub fn new(
        repository: Arc<R>,
        cache: Arc<C>,
        generator: Arc<dyn CodeGenerator>,
        code_length: usize,
        max_attempts: usize,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            repository,
            cache,
            generator,
            code_length,
            max_attempts,
            cache_ttl_seconds,
        }
    }

    /// Allocates a short code for `original_url`, or returns the existing
    /// mapping when the URL was already shortened (idempotent re-shortening).
    ///
    /// On success the `short:<code>` lookup entry is written best-effort.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an empty URL,
    /// [`AppError::Internal`] when `max_attempts` candidates all collided,
    /// and passes through other store errors.
    pub async fn shorten(&self, original_url: &str) -> Result<ShortUrl, AppError> {
        let original_url = original_url.trim();
        if original_url.is_empty() {
            return Err(AppError::bad_request("URL cannot be empty", json!({})));
        }

        if let Some(existing) = self.repository.find_by_original_url(original_url).await? {
            return Ok(existing);
        }

        let mut attempt = 0;
        let mut length = self.code_length;

        while attempt < self.max_attempts {
            let code = self.generator.generate(length);

            match self
                .repository
                .create(NewShortUrl {
                    original_url: original_url.to_string(),
                    short_code: code.clone(),
                })
                .await
            {
                Ok(url) => {
                    if !self
                        .cache
                        .set(
                            &lookup_key(&url.short_code),
                            &url.original_url,
                            self.cache_ttl_seconds,
                        )
                        .await
                    {
                        debug!(short_code = %url.short_code, "lookup cache entry not written");
                    }
                    return Ok(url);
                }
                Err(e) if e.is_conflict() => {
                    attempt += 1;
                    // grow the candidate length every second failed attempt
                    if attempt % 2 == 0 {
                        length += 1;
                    }
                    debug!(code = %code, attempt, length, "short code collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::internal(
            "Could not allocate a unique short code",
            json!({ "attempts": self.max_attempts }),
        ))
    }

    /// Resolves a short code to its row, or `None` when it does not exist,
    /// is soft-deleted, has an invalid shape, or the store is unreachable.
    ///
    /// A cache hit does not short-circuit the store read: the cache holds
    /// only the URL string, so the authoritative, fully populated row always
    /// comes from the durable store. The hit only warms repeated lookups.
    /// On a miss the entry is repopulated best-effort.
    pub async fn resolve(&self, short_code: &str) -> Option<ShortUrl> {
        if !is_valid_short_code(short_code) {
            return None;
        }

        let key = lookup_key(short_code);

        if self.cache.get(&key).await.is_some() {
            return match self.repository.find_by_code(short_code).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(error = %e, short_code, "store lookup failed, treating as not found");
                    None
                }
            };
        }

        match self.repository.find_by_code(short_code).await {
            Ok(Some(url)) => {
                if !self
                    .cache
                    .set(&key, &url.original_url, self.cache_ttl_seconds)
                    .await
                {
                    debug!(short_code, "lookup cache entry not repopulated");
                }
                Some(url)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, short_code, "store lookup failed, treating as not found");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockShortUrlRepository;
    use crate::infrastructure::cache::MockCounterCache;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    const LENGTH: usize = 6;
    const MAX_ATTEMPTS: usize = 5;
    const TTL: u64 = 86_400;

    /// Generator stub that replays fixed codes and records requested lengths.
    struct StubGenerator {
        codes: Mutex<Vec<String>>,
        lengths: Mutex<Vec<usize>>,
    }

    impl StubGenerator {
        fn repeating(code: &str) -> Arc<Self> {
            Arc::new(Self {
                codes: Mutex::new(vec![code.to_string()]),
                lengths: Mutex::new(Vec::new()),
            })
        }

        fn seen_lengths(&self) -> Vec<usize> {
            self.lengths.lock().unwrap().clone()
        }
    }

    impl CodeGenerator for StubGenerator {
        fn generate(&self, length: usize) -> String {
            self.lengths.lock().unwrap().push(length);
            let codes = self.codes.lock().unwrap();
            codes.last().cloned().unwrap_or_else(|| "stub".to_string())
        }
    }

    fn sample_url(id: i64, code: &str, original: &str) -> ShortUrl {
        let now = Utc::now();
        ShortUrl {
            id,
            uuid: Uuid::now_v7(),
            original_url: original.to_string(),
            short_code: code.to_string(),
            visit_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn service(
        repo: MockShortUrlRepository,
        cache: MockCounterCache,
        generator: Arc<dyn CodeGenerator>,
    ) -> UrlService<MockShortUrlRepository, MockCounterCache> {
        UrlService::new(
            Arc::new(repo),
            Arc::new(cache),
            generator,
            LENGTH,
            MAX_ATTEMPTS,
            TTL,
        )
    }

    #[tokio::test]
    async fn test_shorten_creates_and_caches() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_original_url()
            .times(1)
            .returning(|_| Ok(None));
        let created = sample_url(1, "abc123", "https://example.com");
        repo.expect_create()
            .withf(|new_url| new_url.original_url == "https://example.com")
            .times(1)
            .returning(move |_| Ok(created.clone()));

        let mut cache = MockCounterCache::new();
        cache
            .expect_set()
            .withf(|key, value, ttl| key == "short:abc123" && value == "https://example.com" && *ttl == TTL)
            .times(1)
            .returning(|_, _, _| true);

        let svc = service(repo, cache, Arc::new(crate::utils::code_generator::RandomAlphanumeric));
        let url = svc.shorten("https://example.com").await.unwrap();

        assert_eq!(url.short_code, "abc123");
    }

    #[tokio::test]
    async fn test_shorten_trims_whitespace() {
        let mut repo = MockShortUrlRepository::new();
        let existing = sample_url(7, "abc123", "https://example.com");
        repo.expect_find_by_original_url()
            .withf(|url| url == "https://example.com")
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));

        let svc = service(
            repo,
            MockCounterCache::new(),
            Arc::new(crate::utils::code_generator::RandomAlphanumeric),
        );
        let url = svc.shorten("  https://example.com  ").await.unwrap();

        assert_eq!(url.id, 7);
    }

    #[tokio::test]
    async fn test_shorten_empty_url_rejected() {
        let svc = service(
            MockShortUrlRepository::new(),
            MockCounterCache::new(),
            Arc::new(crate::utils::code_generator::RandomAlphanumeric),
        );

        let result = svc.shorten("   ").await;
        assert!(matches!(result.unwrap_err(), AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_shorten_is_idempotent_for_known_url() {
        let mut repo = MockShortUrlRepository::new();
        let existing = sample_url(5, "known1", "https://example.com");
        repo.expect_find_by_original_url()
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_create().times(0);

        let svc = service(
            repo,
            MockCounterCache::new(),
            Arc::new(crate::utils::code_generator::RandomAlphanumeric),
        );
        let url = svc.shorten("https://example.com").await.unwrap();

        assert_eq!(url.short_code, "known1");
    }

    #[tokio::test]
    async fn test_collision_grows_length_every_second_attempt() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_original_url()
            .times(1)
            .returning(|_| Ok(None));
        repo.expect_create()
            .times(MAX_ATTEMPTS)
            .returning(|_| Err(AppError::conflict("duplicate", json!({}))));

        let generator = StubGenerator::repeating("samecode");
        let svc = service(repo, MockCounterCache::new(), generator.clone());

        let result = svc.shorten("https://example.com").await;
        assert!(matches!(result.unwrap_err(), AppError::Internal { .. }));

        // length grows after the 2nd and 4th failed attempts
        assert_eq!(generator.seen_lengths(), vec![6, 6, 7, 7, 8]);
    }

    #[tokio::test]
    async fn test_collision_then_success_caches_final_code() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_original_url()
            .times(1)
            .returning(|_| Ok(None));
        let mut calls = 0;
        let created = sample_url(9, "second", "https://example.com");
        repo.expect_create().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(AppError::conflict("duplicate", json!({})))
            } else {
                Ok(created.clone())
            }
        });

        let mut cache = MockCounterCache::new();
        cache
            .expect_set()
            .withf(|key, _, _| key == "short:second")
            .times(1)
            .returning(|_, _, _| true);

        let svc = service(repo, cache, Arc::new(crate::utils::code_generator::RandomAlphanumeric));
        let url = svc.shorten("https://example.com").await.unwrap();

        assert_eq!(url.id, 9);
    }

    #[tokio::test]
    async fn test_shorten_passes_through_store_errors() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_original_url()
            .times(1)
            .returning(|_| Ok(None));
        repo.expect_create()
            .times(1)
            .returning(|_| Err(AppError::internal("store down", json!({}))));

        let svc = service(
            repo,
            MockCounterCache::new(),
            Arc::new(crate::utils::code_generator::RandomAlphanumeric),
        );

        let result = svc.shorten("https://example.com").await;
        assert!(matches!(result.unwrap_err(), AppError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_resolve_cache_hit_still_reads_store() {
        let mut cache = MockCounterCache::new();
        cache
            .expect_get()
            .withf(|key| key == "short:abc123")
            .times(1)
            .returning(|_| Some("https://example.com".to_string()));
        cache.expect_set().times(0);

        let mut repo = MockShortUrlRepository::new();
        let row = sample_url(3, "abc123", "https://example.com");
        repo.expect_find_by_code()
            .withf(|code| code == "abc123")
            .times(1)
            .returning(move |_| Ok(Some(row.clone())));

        let svc = service(repo, cache, Arc::new(crate::utils::code_generator::RandomAlphanumeric));
        let resolved = svc.resolve("abc123").await.unwrap();

        assert_eq!(resolved.id, 3);
    }

    #[tokio::test]
    async fn test_resolve_miss_repopulates_cache() {
        let mut cache = MockCounterCache::new();
        cache.expect_get().times(1).returning(|_| None);
        cache
            .expect_set()
            .withf(|key, value, _| key == "short:abc123" && value == "https://example.com")
            .times(1)
            .returning(|_, _, _| true);

        let mut repo = MockShortUrlRepository::new();
        let row = sample_url(3, "abc123", "https://example.com");
        repo.expect_find_by_code()
            .times(1)
            .returning(move |_| Ok(Some(row.clone())));

        let svc = service(repo, cache, Arc::new(crate::utils::code_generator::RandomAlphanumeric));
        assert!(svc.resolve("abc123").await.is_some());
    }

    #[tokio::test]
    async fn test_resolve_unknown_code_is_none() {
        let mut cache = MockCounterCache::new();
        cache.expect_get().times(1).returning(|_| None);

        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_code().times(1).returning(|_| Ok(None));

        let svc = service(repo, cache, Arc::new(crate::utils::code_generator::RandomAlphanumeric));
        assert!(svc.resolve("missing1").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_store_error_is_none_not_panic() {
        let mut cache = MockCounterCache::new();
        cache.expect_get().times(1).returning(|_| None);

        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_code()
            .times(1)
            .returning(|_| Err(AppError::internal("store down", json!({}))));

        let svc = service(repo, cache, Arc::new(crate::utils::code_generator::RandomAlphanumeric));
        assert!(svc.resolve("abc123").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_invalid_shape_skips_cache_and_store() {
        let mut cache = MockCounterCache::new();
        cache.expect_get().times(0);
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_code().times(0);

        let svc = service(repo, cache, Arc::new(crate::utils::code_generator::RandomAlphanumeric));
        assert!(svc.resolve("a b;c").await.is_none());
        assert!(svc.resolve("abc").await.is_none());
    }
}
