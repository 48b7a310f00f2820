// src/util.rs
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry an async operation with bounded exponential backoff. Intended only
/// for idempotent read-style calls (prices, quotes, LLM generation); never
/// wrap a transaction submission in this.
///
/// Delay doubles after every failed attempt: base, 2*base, 4*base, ...
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut operation: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts {
                    log::error!("Operation failed after {} attempts: {}", attempt, e);
                    return Err(e);
                }
                let delay = base_delay * 2u32.saturating_pow(attempt - 1);
                log::warn!(
                    "Operation failed (attempt {}/{}): {}. Retrying in {:?}",
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Format a SOL amount for logs and notifications.
pub fn format_sol(amount: f64) -> String {
    format!("{:.6} SOL", amount)
}

/// Format a USD amount for logs and notifications.
pub fn format_usd(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Truncate a wallet/token address for display ("DVp7do...1ZpK").
pub fn truncate_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retry_returns_first_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok(7)
                    }
                }
            },
            5,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("down".to_string()) }
            },
            3,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn address_truncation() {
        assert_eq!(truncate_address("short"), "short");
        assert_eq!(
            truncate_address("So11111111111111111111111111111111111111112"),
            "So1111...1112"
        );
    }
}
