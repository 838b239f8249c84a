//! Waiter - Poll asynchronous cloud operations until they settle
//!
//! Every long-running call site (instance launch, disk resize, table tasks,
//! ...) goes through [`Waiter`]. The check closure reports what it saw and the
//! waiter decides, per its configuration, whether that is success, a reason
//! to keep polling, or a terminal failure.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Budget for waiting on reads to become consistent
pub const READ_RETRY_TIMEOUT: Duration = Duration::from_secs(3 * 60);

/// Budget for waiting on mutations to complete
pub const WRITE_RETRY_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Pause between two status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Outcome of one status check for [`Waiter::until`]
#[derive(Debug, Clone, PartialEq)]
pub enum Poll<T> {
    /// The operation settled
    Ready(T),
    /// Keep polling; the string is the status observed
    Pending(String),
}

/// What a status check found for [`Waiter::until_status`]
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Found(String),
    NotFound,
}

/// How an absent resource is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    /// Deletion confirmed
    Success,
    /// Not visible yet (eventual consistency after create)
    Retry,
    /// The resource vanished while waiting
    Fail,
}

/// Failure raised by a status check
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckError {
    /// Transient; poll again
    #[error("{0}")]
    Retryable(String),
    /// Stop waiting immediately
    #[error("{0}")]
    Fatal(String),
}

/// Wait error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WaitError {
    #[error("timed out after {elapsed:?} waiting for {description}{}", last_status_suffix(.last_status))]
    Timeout {
        description: String,
        elapsed: Duration,
        last_status: Option<String>,
    },

    #[error("{description} reached failure status {status}")]
    FailureStatus { description: String, status: String },

    #[error("{description} not found")]
    NotFound { description: String },

    #[error("{description}: {message}")]
    Check { description: String, message: String },
}

fn last_status_suffix(status: &Option<String>) -> String {
    match status {
        Some(s) => format!(" (last status: {})", s),
        None => String::new(),
    }
}

/// Bounded fixed-interval poller
#[derive(Debug, Clone)]
pub struct Waiter {
    description: String,
    timeout: Duration,
    interval: Duration,
    success: Vec<String>,
    failure: Vec<String>,
    not_found: NotFound,
}

impl Waiter {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            timeout: WRITE_RETRY_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
            success: Vec::new(),
            failure: Vec::new(),
            not_found: NotFound::Retry,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Statuses that end the wait successfully
    pub fn success(mut self, statuses: &[&str]) -> Self {
        self.success = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Statuses that end the wait with an error
    pub fn failure(mut self, statuses: &[&str]) -> Self {
        self.failure = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn not_found(mut self, policy: NotFound) -> Self {
        self.not_found = policy;
        self
    }

    /// Poll until `check` yields [`Poll::Ready`].
    ///
    /// The check runs at least once, even with a zero timeout.
    pub async fn until<T, F, Fut>(&self, mut check: F) -> Result<T, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Poll<T>, CheckError>>,
    {
        self.run(|| {
            let checked = check();
            async move {
                match checked.await {
                    Ok(Poll::Ready(value)) => Step::Ready(value),
                    Ok(Poll::Pending(status)) => Step::Pending(status),
                    Err(CheckError::Retryable(message)) => Step::Retry(message),
                    Err(CheckError::Fatal(message)) => Step::Stop(WaitError::Check {
                        description: self.description.clone(),
                        message,
                    }),
                }
            }
        })
        .await
    }

    /// Poll until the observed status is one of the success statuses.
    ///
    /// Returns the final status, or `None` when absence counted as success.
    pub async fn until_status<F, Fut>(&self, mut check: F) -> Result<Option<String>, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation, CheckError>>,
    {
        self.run(|| {
            let checked = check();
            async move {
                match checked.await {
                    Ok(Observation::Found(status)) => self.classify(status),
                    Ok(Observation::NotFound) => match self.not_found {
                        NotFound::Success => Step::Ready(None),
                        NotFound::Retry => Step::Pending("NOT_FOUND".to_string()),
                        NotFound::Fail => Step::Stop(WaitError::NotFound {
                            description: self.description.clone(),
                        }),
                    },
                    Err(CheckError::Retryable(message)) => Step::Retry(message),
                    Err(CheckError::Fatal(message)) => Step::Stop(WaitError::Check {
                        description: self.description.clone(),
                        message,
                    }),
                }
            }
        })
        .await
    }

    fn classify(&self, status: String) -> Step<Option<String>> {
        if self.success.contains(&status) {
            Step::Ready(Some(status))
        } else if self.failure.contains(&status) {
            Step::Stop(WaitError::FailureStatus {
                description: self.description.clone(),
                status,
            })
        } else {
            Step::Pending(status)
        }
    }

    async fn run<T, F, Fut>(&self, mut step: F) -> Result<T, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Step<T>>,
    {
        let start = Instant::now();
        let mut last_status = None;

        loop {
            match step().await {
                Step::Ready(value) => return Ok(value),
                Step::Stop(err) => return Err(err),
                Step::Pending(status) => {
                    log::debug!("waiting for {}: status {}", self.description, status);
                    last_status = Some(status);
                }
                Step::Retry(message) => {
                    log::warn!("check failed for {}, retrying: {}", self.description, message);
                }
            }

            if start.elapsed() >= self.timeout {
                return Err(WaitError::Timeout {
                    description: self.description.clone(),
                    elapsed: start.elapsed(),
                    last_status,
                });
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Classified result of one poll
enum Step<T> {
    Ready(T),
    Pending(String),
    Retry(String),
    Stop(WaitError),
}

impl fmt::Display for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (timeout {:?})", self.description, self.timeout)
    }
}

/// Re-run `op` while its error is retryable.
///
/// Returns the last error once `timeout` has passed or as soon as an error is
/// not retryable.
pub async fn retry<T, E, F, Fut, R>(
    timeout: Duration,
    interval: Duration,
    mut op: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: fmt::Display,
{
    let start = Instant::now();

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) && start.elapsed() < timeout => {
                log::warn!("retryable error, retrying: {}", e);
            }
            Err(e) => return Err(e),
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scripted(statuses: &[&str]) -> impl FnMut() -> std::future::Ready<Result<Observation, CheckError>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
        let mut idx = 0;
        move || {
            let status = statuses[idx.min(statuses.len() - 1)].clone();
            idx += 1;
            let observation = if status == "-" {
                Observation::NotFound
            } else {
                Observation::Found(status)
            };
            std::future::ready(Ok(observation))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_success_status() {
        let waiter = Waiter::new("instance ins-1").success(&["RUNNING"]);
        let status = waiter
            .until_status(scripted(&["PENDING", "PENDING", "RUNNING"]))
            .await
            .unwrap();
        assert_eq!(status.as_deref(), Some("RUNNING"));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_failure_status() {
        let waiter = Waiter::new("instance ins-1")
            .success(&["RUNNING"])
            .failure(&["LAUNCH_FAILED"]);
        let err = waiter
            .until_status(scripted(&["PENDING", "LAUNCH_FAILED"]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            WaitError::FailureStatus {
                description: "instance ins-1".to_string(),
                status: "LAUNCH_FAILED".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_with_last_status() {
        let waiter = Waiter::new("disk disk-1")
            .success(&["UNATTACHED"])
            .timeout(Duration::from_secs(30))
            .interval(Duration::from_secs(5));
        let err = waiter.until_status(scripted(&["EXPANDING"])).await.unwrap_err();

        match &err {
            WaitError::Timeout { last_status, elapsed, .. } => {
                assert_eq!(last_status.as_deref(), Some("EXPANDING"));
                assert!(*elapsed >= Duration::from_secs(30));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("last status: EXPANDING"));
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_policies() {
        let success = Waiter::new("snapshot")
            .success(&["NORMAL"])
            .not_found(NotFound::Success);
        assert_eq!(success.until_status(scripted(&["-"])).await.unwrap(), None);

        let retry = Waiter::new("snapshot")
            .success(&["NORMAL"])
            .not_found(NotFound::Retry);
        assert_eq!(
            retry.until_status(scripted(&["-", "-", "NORMAL"])).await.unwrap(),
            Some("NORMAL".to_string())
        );

        let fail = Waiter::new("snapshot")
            .success(&["NORMAL"])
            .not_found(NotFound::Fail);
        assert_eq!(
            fail.until_status(scripted(&["CREATING", "-"])).await.unwrap_err(),
            WaitError::NotFound {
                description: "snapshot".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_check_error_keeps_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let waiter = Waiter::new("table task");

        let value = waiter
            .until(|| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    match n {
                        0 => Err(CheckError::Retryable("InternalError".to_string())),
                        1 => Ok(Poll::Pending("50".to_string())),
                        _ => Ok(Poll::Ready(100)),
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 100);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_check_error_stops_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let err = Waiter::new("cluster")
            .until(|| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<Poll<()>, _>(CheckError::Fatal("AuthFailure".to_string())) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.to_string(), "cluster: AuthFailure");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_returns_last_error_on_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: Result<(), String> = retry(
            Duration::from_secs(10),
            Duration::from_secs(3),
            || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("attempt {}", n)) }
            },
            |_| true,
        )
        .await;

        let attempts = calls.load(Ordering::SeqCst);
        assert!(attempts > 1);
        assert_eq!(result.unwrap_err(), format!("attempt {}", attempts - 1));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_stops_on_non_retryable_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: Result<(), String> = retry(
            Duration::from_secs(10),
            Duration::from_secs(1),
            || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err("InvalidParameter".to_string()) }
            },
            |e: &String| e.starts_with("Internal"),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err(), "InvalidParameter");
    }
}
