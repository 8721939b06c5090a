//! Retry logic with exponential backoff
//!
//! Chapter downloads are retried as a whole. Each retry waits for the current delay and then
//! roughly doubles it, perturbed by a jitter factor in `[0.9, 1.1]` so that chapters which
//! failed together do not hammer the host again in lockstep.
//!
//! # Example
//!
//! ```no_run
//! use manga_dl::retry::{IsRetryable, download_with_retry};
//! use manga_dl::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! download_with_retry(&config, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{DownloadError, Error};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Lower bound of the jitter factor applied when computing the next delay
pub const JITTER_MIN: f64 = 0.9;

/// Upper bound of the jitter factor applied when computing the next delay
pub const JITTER_MAX: f64 = 1.1;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, non-2xx responses, partially downloaded chapters) should
/// return `true`. Permanent failures (empty chapters, bad configuration, packaging) should
/// return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Anything that reached the wire may succeed on another attempt
            Error::Network(e) => !e.is_builder(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            Error::Download(e) => e.is_retryable(),
            // Page lookups and group lookups go through the content API
            Error::Source(_) => true,
            Error::Pack(_) => false,
            Error::Config { .. } => false,
            Error::Serialization(_) => false,
            Error::Other(_) => false,
        }
    }
}

impl IsRetryable for DownloadError {
    fn is_retryable(&self) -> bool {
        match self {
            DownloadError::HttpStatus { .. }
            | DownloadError::Timeout { .. }
            | DownloadError::EmptyBody { .. }
            | DownloadError::PagesFailed { .. } => true,
            // An empty chapter stays empty
            DownloadError::NoPages { .. } => false,
            // So does a malformed page list
            DownloadError::InvalidPageName { .. } => false,
            // Already the outcome of a retry loop
            DownloadError::ChapterFailed { .. } | DownloadError::NothingDownloaded { .. } => false,
        }
    }
}

/// Delay schedule between attempts
///
/// Starts at the configured initial delay. Every [`Backoff::advance`] multiplies the delay by
/// two and by a jitter factor drawn from `[0.9, 1.1]` (exactly 1.0 when jitter is disabled),
/// rounding up to the next whole millisecond.
#[derive(Clone, Debug)]
pub struct Backoff {
    delay_ms: u64,
    jitter: bool,
}

impl Backoff {
    /// Create a schedule from the retry configuration
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            delay_ms: u64::try_from(config.initial_delay.as_millis()).unwrap_or(u64::MAX),
            jitter: config.jitter,
        }
    }

    /// Delay to wait before the next attempt
    pub fn current(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Move to the next delay and return it
    pub fn advance(&mut self) -> Duration {
        let factor = if self.jitter {
            rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX)
        } else {
            1.0
        };
        self.delay_ms = next_delay_ms(self.delay_ms, factor);
        self.current()
    }
}

/// Compute `ceil(delay_ms * 2 * factor)`, saturating at `u64::MAX`
pub fn next_delay_ms(delay_ms: u64, factor: f64) -> u64 {
    let next = (delay_ms as f64 * 2.0 * factor).ceil();
    if next >= u64::MAX as f64 {
        u64::MAX
    } else {
        next as u64
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// The operation runs at most `config.max_attempts` times in total (a value of 0 is treated
/// as 1). Non-retryable errors are returned at once; after the last attempt the last error is
/// returned unchanged so that the caller can decide whether to skip or escalate.
///
/// # Example
///
/// ```no_run
/// use manga_dl::retry::download_with_retry;
/// use manga_dl::config::RetryConfig;
/// use manga_dl::error::Error;
///
/// # async fn example() -> Result<(), Error> {
/// let config = RetryConfig::default();
/// let pages = download_with_retry(&config, || async {
///     // Simulate a chapter download that might fail
///     Ok::<usize, Error>(18)
/// }).await?;
/// # Ok(())
/// # }
/// ```
pub async fn download_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    let mut backoff = Backoff::new(config);

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = backoff.current();

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
                backoff.advance();
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed with non-retryable error"
                    );
                }
                return Err(e);
            }
        }
    }
}
