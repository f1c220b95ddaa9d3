use crate::{
    DeliveryConfig,
    DeliveryError,
    Transport,
};
use backon::{
    ConstantBuilder,
    Retryable as _,
};
use metrics_backend_librato_core::{
    util_time,
    OutgoingPayload,
};
use std::{
    sync::{
        atomic::{
            AtomicI64,
            Ordering,
        },
        Arc,
    },
    time::Duration,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How one payload's delivery ended.
#[derive(Debug)]
pub enum Delivery {
    Delivered { attempts: u8 },
    Dropped { attempts: u8, error: DeliveryError },
    /// The backend was shut down before the delivery settled.
    Cancelled,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered { .. })
    }

    pub fn attempts(&self) -> u8 {
        match self {
            Delivery::Delivered { attempts } | Delivery::Dropped { attempts, .. } => *attempts,
            Delivery::Cancelled => 0,
        }
    }
}

/// Timestamps shared between the backend and its in-flight deliveries.
#[derive(Debug)]
pub(crate) struct FlushState {
    pub(crate) last_flush: AtomicI64,
    pub(crate) last_exception: AtomicI64,
}

impl FlushState {
    pub(crate) fn new(startup_time: i64) -> Self {
        Self {
            last_flush: AtomicI64::new(startup_time),
            last_exception: AtomicI64::new(startup_time),
        }
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Sends payloads with at most one retry.
///
/// A transport failure or 5xx answer is retried once after `retry_delay`, a
/// 4xx answer is dropped right away. Deliveries run on spawned tasks and
/// observe a shared cancellation token, so [`DeliveryClient::shutdown`] also
/// cancels retries that are still waiting.
pub struct DeliveryClient<T> {
    transport: Arc<T>,
    retry_delay: Duration,
    debug: bool,
    self_metrics: bool,
    state: Arc<FlushState>,
    token: CancellationToken,
}

impl<T> DeliveryClient<T>
where
    T: Transport + Send + Sync + 'static,
{
    pub fn new(transport: T, config: &DeliveryConfig, startup_time: i64) -> Self {
        Self {
            transport: Arc::new(transport),
            retry_delay: config.retry_delay,
            debug: config.debug,
            self_metrics: config.self_metrics,
            state: Arc::new(FlushState::new(startup_time)),
            token: CancellationToken::new(),
        }
    }

    pub(crate) fn state(&self) -> &FlushState {
        &self.state
    }

    /// Serialize `payload` and deliver it in the background. Must be called
    /// from within a Tokio runtime.
    pub fn deliver(&self, payload: &OutgoingPayload) -> JoinHandle<Delivery> {
        let body = match payload.to_bytes() {
            Ok(body) => body,
            Err(err) => {
                error!(?err, "failed to encode metrics payload, dropping it");
                self.state
                    .last_exception
                    .store(util_time::epoch_seconds(), Ordering::Release);
                return tokio::spawn(async move {
                    Delivery::Dropped {
                        attempts: 0,
                        error: err.into(),
                    }
                });
            }
        };

        let transport = self.transport.clone();
        let state = self.state.clone();
        let token = self.token.clone();
        let retry_delay = self.retry_delay;
        let debug = self.debug;
        let self_metrics = self.self_metrics;
        let n = payload.len();

        tokio::spawn(async move {
            defer! {
                trace!(%n, "metrics delivery settled");
            }

            let mut retried = false;
            let send = (|| transport.send(body.clone()))
                .retry(ConstantBuilder::default().with_delay(retry_delay).with_max_times(1))
                .sleep(tokio::time::sleep)
                .when(DeliveryError::is_retryable)
                .notify(|err, delay| {
                    retried = true;
                    warn!(%err, "failed to send metrics, retrying in {delay:?}");
                });

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(%n, "metrics delivery cancelled");
                    return Delivery::Cancelled;
                }
                result = send => result,
            };
            let attempts = if retried { 2 } else { 1 };

            match result {
                Ok(()) => {
                    state
                        .last_flush
                        .store(util_time::epoch_seconds(), Ordering::Release);
                    if self_metrics {
                        metrics::histogram!("librato_backend_payload_bytes").record(body.len() as f64);
                    }
                    if debug {
                        debug!(%n, %attempts, "metrics delivered");
                    }
                    Delivery::Delivered { attempts }
                }
                Err(error) => {
                    state
                        .last_exception
                        .store(util_time::epoch_seconds(), Ordering::Release);
                    if self_metrics {
                        metrics::counter!("librato_backend_dropped_payloads").increment(1);
                    }
                    if retried || error.is_retryable() {
                        error!(%error, %attempts, "failed to send metrics, giving up and losing {n} metrics");
                    } else if debug {
                        warn!(%error, "metrics rejected, losing {n} metrics");
                    }
                    Delivery::Dropped { attempts, error }
                }
            }
        })
    }

    /// Cancel all pending deliveries, including scheduled retries.
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}
