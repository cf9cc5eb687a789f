//! Shared fixtures for the Redis integration tests
//!
//! Every test gets its own throwaway Redis 7 container via TestContainers, so
//! suites never observe each other's keys.

use rstest::*;
use testcontainers::{
	ContainerAsync, GenericImage,
	core::{IntoContainerPort, WaitFor},
	runners::AsyncRunner,
};

/// Fixture providing a Redis container
///
/// Container startup is retried a few times because pulling the image or
/// binding a port can fail transiently on loaded CI hosts.
#[fixture]
pub async fn redis_container() -> (ContainerAsync<GenericImage>, u16, String) {
	const MAX_RETRIES: u32 = 3;
	const RETRY_DELAY_MS: u64 = 2000;

	let mut last_error = None;

	for attempt in 0..MAX_RETRIES {
		match try_start_redis_container().await {
			Ok(result) => return result,
			Err(e) => {
				eprintln!(
					"Redis container start attempt {} of {} failed: {:?}",
					attempt + 1,
					MAX_RETRIES,
					e
				);
				last_error = Some(e);

				if attempt < MAX_RETRIES - 1 {
					tokio::time::sleep(std::time::Duration::from_millis(RETRY_DELAY_MS)).await;
				}
			}
		}
	}

	panic!(
		"Failed to start Redis container after {} attempts: {:?}",
		MAX_RETRIES, last_error
	);
}

async fn try_start_redis_container()
-> Result<(ContainerAsync<GenericImage>, u16, String), Box<dyn std::error::Error>> {
	let redis = GenericImage::new("redis", "7-alpine")
		.with_exposed_port(6379.tcp())
		.with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
		.start()
		.await?;

	let port = redis.get_host_port_ipv4(6379).await?;

	let url = format!("redis://localhost:{}", port);

	Ok((redis, port, url))
}

/// Fixture layering a deadpool connection pool over [`redis_container`]
///
/// The container rides along in the returned tuple; dropping it tears the
/// server down, so bind it for the whole test.
#[fixture]
pub async fn redis_pool(
	#[future] redis_container: (ContainerAsync<GenericImage>, u16, String),
) -> (ContainerAsync<GenericImage>, deadpool_redis::Pool, String) {
	let (container, _port, url) = redis_container.await;
	let pool = deadpool_redis::Config::from_url(&url)
		.create_pool(Some(deadpool_redis::Runtime::Tokio1))
		.expect("Failed to create Redis pool");
	(container, pool, url)
}
