//! Broker connection with a bounded, fixed-delay retry policy.
//!
//! This is the only place a broker failure may halt the process. Once the
//! connection is up, errors inside the consumer loops stay there.

use std::future::Future;

use lapin::{Connection, ConnectionProperties};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, warn};

use super::BrokerError;
use crate::config::{RetryPolicy, redact_url};

/// Connect to the broker, retrying per `policy`.
///
/// Each failed attempt is logged with its number; the terminal outcome is
/// logged either way.
///
/// # Errors
///
/// Returns `BrokerError::Connect` once every attempt has failed.
pub async fn connect_with_retry(
    url: &SecretString,
    policy: RetryPolicy,
    connection_name: &str,
) -> Result<Connection, BrokerError> {
    let endpoint = redact_url(url.expose_secret());
    info!(%endpoint, attempts = policy.attempts, "Connecting to broker");

    let result = retry_fixed(policy, |_attempt| {
        let properties =
            ConnectionProperties::default().with_connection_name(connection_name.into());
        Connection::connect(url.expose_secret(), properties)
    })
    .await;

    match result {
        Ok(connection) => {
            info!(%endpoint, "Connected to broker");
            Ok(connection)
        }
        Err(source) => {
            error!(%endpoint, attempts = policy.attempts, error = %source, "Giving up on broker connection");
            Err(BrokerError::Connect {
                attempts: policy.attempts,
                source,
            })
        }
    }
}

/// Run `op` until it succeeds or `policy.attempts` runs out.
///
/// `op` receives the 1-based attempt number. Between attempts the task sleeps
/// for `policy.delay`; there is no sleep after the last failure. Returns the
/// error of the final attempt.
pub async fn retry_fixed<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = attempts,
                    retry_in_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Broker not ready, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    const FAST: RetryPolicy = RetryPolicy {
        attempts: 5,
        delay: Duration::from_millis(1),
    };

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_fixed(FAST, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(format!("refused on attempt {attempt}"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_bounded_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_fixed(FAST, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("refused on attempt {attempt}")) }
        })
        .await;

        assert_eq!(result.unwrap_err(), "refused on attempt 5");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_retry_zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            attempts: 0,
            delay: Duration::ZERO,
        };
        let calls = AtomicU32::new(0);
        let _: Result<(), &str> = retry_fixed(policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("down") }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
