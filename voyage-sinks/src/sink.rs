//! The uniform write-entry/close contract shared by all sinks.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use voyage::Node;

use crate::error::{Result, SinkError};
use crate::params::SinkParams;

/// One storage backend. Implementations handle a single delivery attempt
/// and report failures as errors; retries, accounting and the concurrency
/// gate live in [`Sink`].
///
/// # Thread Safety
///
/// Backends must be `Send + Sync`: one instance serves every in-flight page
/// task concurrently.
#[async_trait]
pub trait SinkBackend: Send + Sync {
    /// Short backend name used in logs.
    fn kind(&self) -> &'static str;

    /// Delivers one entry under `uid`.
    async fn put(&self, entry: &Node, uid: &str) -> Result<()>;

    /// Releases backend resources. Called exactly once, after all writes.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Options common to every sink.
#[derive(Debug, Clone, Copy)]
pub struct SinkOptions {
    /// Propagate write failures to the caller instead of swallowing them.
    pub fail_on_error: bool,
    /// Maximum concurrent writes; 0 means unbounded.
    pub max_concurrent: usize,
}

impl Default for SinkOptions {
    fn default() -> SinkOptions {
        SinkOptions {
            fail_on_error: true,
            max_concurrent: 0,
        }
    }
}

impl SinkOptions {
    /// Reads the common options out of a parameter record.
    pub fn from_params(params: &SinkParams) -> Result<SinkOptions> {
        let fail_on_error = params.bool_or("fail_on_error", true)?;
        let max_concurrent = params.int_or("max_concurrent", 0)?;
        if max_concurrent < 0 {
            return Err(SinkError::Config(
                "max_concurrent must be >= 0".to_string(),
            ));
        }
        Ok(SinkOptions {
            fail_on_error,
            max_concurrent: max_concurrent as usize,
        })
    }
}

/// A configured sink: one backend plus the shared write discipline.
pub struct Sink {
    backend: Box<dyn SinkBackend>,
    gate: Option<Semaphore>,
    fail_on_error: bool,
    written: AtomicU64,
    failed: AtomicU64,
}

impl Sink {
    pub fn new(backend: Box<dyn SinkBackend>, options: SinkOptions) -> Sink {
        let gate = match options.max_concurrent {
            0 => None,
            n => Some(Semaphore::new(n)),
        };
        Sink {
            backend,
            gate,
            fail_on_error: options.fail_on_error,
            written: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.backend.kind()
    }

    /// (successful, failed) write counts so far.
    pub fn totals(&self) -> (u64, u64) {
        (
            self.written.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }

    /// Writes one entry, holding a gate permit for the duration of the
    /// backend call. Failures are counted and logged; they only propagate
    /// when the sink is configured to fail on error.
    pub async fn write_entry(&self, entry: &Node, uid: &str) -> Result<()> {
        let _permit = match &self.gate {
            Some(gate) => Some(gate.acquire().await.map_err(|_| {
                SinkError::Backend("concurrency gate closed".to_string())
            })?),
            None => None,
        };
        match self.backend.put(entry, uid).await {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
                debug!(sink = self.kind(), uid, "wrote entry");
                Ok(())
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!(sink = self.kind(), uid, error = %e, "failed to write entry");
                if self.fail_on_error {
                    Err(SinkError::WriteFailed {
                        uid: uid.to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Shuts the backend down and logs the final totals. The driver calls
    /// this exactly once, after every scheduled write has completed.
    pub async fn close(&self) -> Result<()> {
        let result = self.backend.shutdown().await;
        let (written, failed) = self.totals();
        info!(
            sink = self.kind(),
            total = written + failed,
            written,
            failed,
            "sink closed"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    /// Backend that records call concurrency and can be told to fail.
    #[derive(Default)]
    struct Probe {
        fail: bool,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SinkBackend for Probe {
        fn kind(&self) -> &'static str {
            "probe"
        }

        async fn put(&self, _entry: &Node, _uid: &str) -> Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                Err(SinkError::Backend("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn probe_sink(fail: bool, options: SinkOptions) -> Arc<Sink> {
        let backend = Probe {
            fail,
            ..Probe::default()
        };
        Arc::new(Sink::new(Box::new(backend), options))
    }

    #[tokio::test]
    async fn successful_writes_are_counted() {
        let sink = probe_sink(false, SinkOptions::default());
        let entry = Node::root();
        sink.write_entry(&entry, "Q1").await.unwrap();
        sink.write_entry(&entry, "Q2").await.unwrap();
        assert_eq!(sink.totals(), (2, 0));
    }

    #[tokio::test]
    async fn failure_propagates_when_fail_on_error() {
        let sink = probe_sink(true, SinkOptions::default());
        let err = sink.write_entry(&Node::root(), "Q1").await.unwrap_err();
        assert!(matches!(err, SinkError::WriteFailed { uid } if uid == "Q1"));
        assert_eq!(sink.totals(), (0, 1));
    }

    #[tokio::test]
    async fn failure_is_swallowed_otherwise() {
        let sink = probe_sink(
            true,
            SinkOptions {
                fail_on_error: false,
                max_concurrent: 0,
            },
        );
        sink.write_entry(&Node::root(), "Q1").await.unwrap();
        sink.write_entry(&Node::root(), "Q2").await.unwrap();
        assert_eq!(sink.totals(), (0, 2));
    }

    #[tokio::test]
    async fn gate_bounds_concurrent_writes() {
        let peak = Arc::new(AtomicUsize::new(0));
        let backend = Probe {
            fail: false,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
        };
        let sink = Arc::new(Sink::new(
            Box::new(backend),
            SinkOptions {
                fail_on_error: true,
                max_concurrent: 3,
            },
        ));

        let mut tasks = Vec::new();
        for i in 0..20 {
            let sink = Arc::clone(&sink);
            tasks.push(tokio::spawn(async move {
                sink.write_entry(&Node::root(), &format!("Q{i}")).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(sink.totals(), (20, 0));
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency was {peak}");
    }
}
