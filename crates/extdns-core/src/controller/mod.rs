//! Reconciliation controller
//!
//! The Controller is responsible for:
//! - Reading the desired endpoints from a [`Source`]
//! - Reading the current endpoints from a [`DnsProvider`]
//! - Calculating a [`Plan`] under the configured [`Policy`]
//! - Handing the resulting [`Changes`] to the provider
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   desired   ┌──────────────┐   changes   ┌─────────────┐
//! │   Source    │────────────▶│  Controller  │────────────▶│ DnsProvider │
//! └─────────────┘             └──────────────┘◀────────────└─────────────┘
//!                                    │            current
//!                                    ▼
//!                             ┌──────────────┐
//!                             │    Events    │
//!                             └──────────────┘
//! ```
//!
//! Every pass starts from scratch. Nothing observed in one pass is carried
//! into the next, so a pass interrupted half-way is repaired by the next one.

use crate::config::ControllerConfig;
use crate::error::Result;
use crate::plan::{Changes, Plan, Policy};
use crate::traits::{DnsProvider, Source};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

/// Events emitted by the Controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Controller started
    Started { interval_secs: u64 },

    /// A reconciliation pass completed without error
    PassSucceeded {
        pass: u64,
        creates: usize,
        updates: usize,
        deletes: usize,
        finished_at: DateTime<Utc>,
    },

    /// A reconciliation pass failed
    PassFailed { pass: u64, error: String },

    /// Controller stopped
    Stopped { reason: String },
}

/// Core reconciliation controller
///
/// ## Lifecycle
///
/// 1. Create with [`Controller::new()`]
/// 2. Start with [`Controller::run()`] or drive single passes with
///    [`Controller::run_once()`]
/// 3. `run()` loops until a shutdown signal is received
pub struct Controller {
    /// Desired-state source
    source: Box<dyn Source>,

    /// DNS provider holding the actual state
    provider: Box<dyn DnsProvider>,

    /// Plan policy
    policy: Policy,

    /// Interval between passes
    interval: Duration,

    /// Pass counter
    passes: AtomicU64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ControllerEvent>,
}

impl Controller {
    /// Create a new controller
    ///
    /// # Returns
    ///
    /// A tuple of (controller, event_receiver) where event_receiver yields
    /// controller events
    pub fn new(
        source: Box<dyn Source>,
        provider: Box<dyn DnsProvider>,
        config: &ControllerConfig,
    ) -> Result<(Self, mpsc::Receiver<ControllerEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let controller = Self {
            source,
            provider,
            policy: config.policy,
            interval: Duration::from_secs(config.interval_secs),
            passes: AtomicU64::new(0),
            event_tx: tx,
        };

        Ok((controller, rx))
    }

    /// Run a single reconciliation pass
    ///
    /// # Returns
    ///
    /// The changes handed to the provider. On error the provider may have
    /// applied part of them; the next pass re-reads and converges.
    pub async fn run_once(&self) -> Result<Changes> {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;

        match self.reconcile(pass).await {
            Ok(changes) => {
                self.emit_event(ControllerEvent::PassSucceeded {
                    pass,
                    creates: changes.create.len(),
                    updates: changes.update_count(),
                    deletes: changes.delete.len(),
                    finished_at: Utc::now(),
                });
                Ok(changes)
            }
            Err(e) => {
                self.emit_event(ControllerEvent::PassFailed {
                    pass,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn reconcile(&self, pass: u64) -> Result<Changes> {
        let desired = self.source.endpoints().await?;
        let current = self.provider.records().await?;
        debug!(
            pass,
            desired = desired.len(),
            current = current.len(),
            "Calculating plan"
        );

        let changes = Plan::new(current, desired, self.policy).calculate();
        if changes.is_empty() {
            debug!(pass, "All records are up to date");
            return Ok(changes);
        }

        info!(
            pass,
            provider = self.provider.provider_name(),
            creates = changes.create.len(),
            updates = changes.update_count(),
            deletes = changes.delete.len(),
            "Applying changes"
        );
        self.provider.apply_changes(&changes).await?;
        Ok(changes)
    }

    /// Run the controller until SIGINT
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the controller until the given shutdown signal fires
    ///
    /// With `None` the controller waits for SIGINT instead.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.emit_event(ControllerEvent::Started {
            interval_secs: self.interval.as_secs(),
        });

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                Some(_) = ticks.next() => {
                    if let Err(e) = self.run_once().await {
                        // Keep running; the next pass starts from a fresh snapshot
                        error!("Reconciliation pass failed: {}", e);
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(ControllerEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        Ok(())
    }

    /// Emit a controller event, dropping it when the channel is full
    fn emit_event(&self, event: ControllerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
