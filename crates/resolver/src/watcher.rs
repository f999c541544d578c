//! Completion watcher — filesystem polling with optional deadlines.
//!
//! [`poll_until`] is the single wait primitive. File-ready and
//! timestamp-change waits are thin wrappers around it.

use agentflow_core::{ActionKind, Error, Renderer, Result, WaitError};
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::records;

/// Poll interval plus an optional deadline. `timeout: None` waits forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

impl WaitOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
        }
    }

    /// Bound the wait. A zero duration means unbounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn with_optional_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }
}

/// Run `probe` until it yields a value, sleeping `interval` between tries.
///
/// The probe runs at least once even with an already-expired deadline.
/// Errors from the probe end the wait immediately.
pub async fn poll_until<T, F, Fut>(target: &str, opts: WaitOptions, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let started = Instant::now();
    loop {
        if let Some(value) = probe().await? {
            return Ok(value);
        }
        if let Some(limit) = opts.timeout {
            let waited = started.elapsed();
            if waited >= limit {
                return Err(WaitError::Timeout {
                    target: target.to_string(),
                    waited,
                }
                .into());
            }
        }
        debug!(waiting_on = target, "Not ready, polling again");
        tokio::time::sleep(opts.interval).await;
    }
}

/// Wait until `path` exists.
pub async fn wait_for_file(path: &Path, opts: WaitOptions) -> Result<()> {
    let target = path.display().to_string();
    poll_until(&target, opts, move || async move {
        match tokio::fs::try_exists(path).await {
            Ok(true) => Ok(Some(())),
            Ok(false) => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    })
    .await
}

/// Wait until the timestamp of `id` in `kind`'s output record differs from
/// `previous`. Returns the new timestamp.
pub async fn wait_for_timestamp_change(
    renderer: &dyn Renderer,
    record: &Path,
    kind: ActionKind,
    id: &str,
    previous: f64,
    opts: WaitOptions,
) -> Result<f64> {
    let target = format!("timestamp of '{id}' in {}", record.display());
    poll_until(&target, opts, move || async move {
        let current = records::current_timestamp(renderer, record, kind, id).await?;
        Ok::<_, Error>((current != previous).then_some(current))
    })
    .await
}
