use std::time::Duration;

use tinylink_cache::{RedisCacheConfig, RedisUrlCache, UrlCache, DEFAULT_CACHE_TTL};
use tinylink_core::ShortCode;
use tinylink_test_infra::redis::RedisServer;

async fn cache(server: &RedisServer) -> RedisUrlCache {
    let config = RedisCacheConfig::builder()
        .url(server.url().await.expect("redis url"))
        .key_prefix("test:url:")
        .build();
    RedisUrlCache::connect(&config).await.expect("connect redis")
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn set_get_and_del() {
    let server = RedisServer::new().await.expect("start redis");
    let cache = cache(&server).await;

    assert_eq!(cache.get_url(&code("AbC1234")).await.unwrap(), None);

    cache
        .set_url(&code("AbC1234"), "https://example.com", DEFAULT_CACHE_TTL)
        .await
        .unwrap();
    assert_eq!(
        cache.get_url(&code("AbC1234")).await.unwrap().as_deref(),
        Some("https://example.com")
    );

    cache.del(&code("AbC1234")).await.unwrap();
    assert_eq!(cache.get_url(&code("AbC1234")).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn entries_expire() {
    let server = RedisServer::new().await.expect("start redis");
    let cache = cache(&server).await;

    cache
        .set_url(&code("AbC1234"), "https://example.com", Duration::from_secs(1))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(cache.get_url(&code("AbC1234")).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn reconnects_after_the_server_drops_the_connection() {
    let server = RedisServer::new().await.expect("start redis");
    let cache = cache(&server).await;
    cache
        .set_url(&code("AbC1234"), "https://example.com", DEFAULT_CACHE_TTL)
        .await
        .unwrap();

    let client = redis::Client::open(server.url().await.expect("redis url")).unwrap();
    let mut admin = client.get_multiplexed_async_connection().await.unwrap();
    redis::cmd("CLIENT")
        .arg("KILL")
        .arg("TYPE")
        .arg("normal")
        .query_async::<()>(&mut admin)
        .await
        .unwrap();

    let mut recovered = None;
    for _ in 0..50 {
        if let Ok(hit) = cache.get_url(&code("AbC1234")).await {
            recovered = hit;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(recovered.as_deref(), Some("https://example.com"));
}
