//! High-level service facade combining the normalizer and the active strategy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{error, info};

use crate::model::{Source, VerificationResult};
use crate::normalize::normalize;
use crate::ports::{LookupError, LookupStrategy};

/// Deadline applied to the outbound lookup when none is configured.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Public entry point for verifying plates against one configured strategy.
pub struct VerificationService {
    strategy: Arc<dyn LookupStrategy>,
    deadline: Duration,
}

impl VerificationService {
    /// Create a new service bound to the provided strategy.
    #[must_use]
    pub fn new(strategy: Arc<dyn LookupStrategy>) -> Self {
        Self {
            strategy,
            deadline: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Replace the deadline applied to each outbound lookup.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Strategy answering queries for this service.
    #[must_use]
    pub fn source(&self) -> Source {
        self.strategy.source()
    }

    /// Verify a raw plate string.
    ///
    /// Never fails: rejected input yields an `invalida` result without any
    /// network call, and strategy failures are folded into an `error` result.
    pub async fn handle(&self, raw: &str) -> VerificationResult {
        let Some(plate) = normalize(raw) else {
            info!(raw, "rejected plate input");
            return VerificationResult::invalid(raw);
        };

        let source = self.strategy.source();
        info!(%plate, %source, "verifying plate");

        let started = Instant::now();
        let outcome = timeout(self.deadline, self.strategy.verify(&plate))
            .await
            .unwrap_or_else(|_elapsed| Err(LookupError::Network("timeout".to_owned())));
        let ms = elapsed_ms(started);

        match outcome {
            Ok(verdict) => {
                info!(%plate, %source, tipo = %verdict.classification, ms, "lookup finished");
                VerificationResult::answered(plate, source, ms, verdict)
            }
            Err(err) => {
                error!(%plate, %source, kind = %err.kind(), ms, "lookup failed: {err}");
                VerificationResult::failed(plate, source, ms, err.detail())
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
