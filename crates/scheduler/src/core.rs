//! The [`Scheduler`]: fire timing, single-flight execution, manual trigger,
//! and reconfiguration without leaking fire-loop tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use subguard_core::AppConfig;
use subguard_lifecycle::LifecycleManager;

use crate::round::ValidationRound;
use crate::timing::TimingSpec;

/// Cloneable handle for requesting an immediate validation round.
#[derive(Clone)]
pub struct SchedulerHandle {
    trigger_tx: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Best-effort trigger: non-blocking post to a single-slot mailbox.
    ///
    /// If a round is already pending the request is dropped, not queued, so
    /// bursts of triggers collapse to at most one extra round. Returns
    /// whether the trigger was accepted.
    pub fn trigger_manual(&self) -> bool {
        match self.trigger_tx.try_send(()) {
            Ok(()) => {
                info!("manual validation round requested");
                true
            }
            Err(_) => {
                warn!("a validation round is already pending, ignoring manual trigger");
                false
            }
        }
    }
}

/// State shared between the run loop and the fire-loop tasks.
struct FireContext {
    /// Single-flight guard: the only datum mutated from multiple tasks.
    running: AtomicBool,
    round: Arc<dyn ValidationRound>,
    lifecycle: Arc<LifecycleManager>,
}

impl FireContext {
    /// Execute one validation round under the single-flight guard.
    ///
    /// A round that is already running makes this a logged no-op. A round
    /// error is fatal: the external routine owns retry policy, so an error
    /// reaching us is unrecoverable by contract.
    async fn run_round(&self, timing: &TimingSpec) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("a validation round is already running, skipping");
            return;
        }

        info!("starting validation round");
        let result = match self.round.run().await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "validation round failed, terminating");
                std::process::exit(1);
            }
        };
        info!(
            sources = result.len(),
            ok = result.success_count(),
            failed = result.failure_count(),
            "validation round complete"
        );

        reclaim_memory();
        self.running.store(false, Ordering::Release);

        match self.lifecycle.process(&result) {
            Ok(evicted) if !evicted.is_empty() => {
                info!(count = evicted.len(), "sources evicted after repeated failures");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "source lifecycle processing failed"),
        }

        match timing.next_fire() {
            Some(next) => {
                info!(next_run = %next.format("%Y-%m-%d %H:%M:%S"), "next validation round scheduled");
            }
            None => warn!("no upcoming fire time for the active schedule"),
        }
    }
}

/// Best-effort hint to the allocator to return freed round memory to the OS.
fn reclaim_memory() {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    {
        // SAFETY: malloc_trim is a best-effort C hint with no preconditions.
        let trimmed = unsafe { libc::malloc_trim(0) };
        if trimmed != 0 {
            debug!("allocator returned freed pages to the OS");
        }
    }
}

/// Owns all mutable timing state behind a single-owner contract.
///
/// Callers interact only through [`start`](Scheduler::start),
/// [`reconfigure`](Scheduler::reconfigure) (via the reload stream passed to
/// [`run`](Scheduler::run)), and [`SchedulerHandle::trigger_manual`].
pub struct Scheduler {
    ctx: Arc<FireContext>,
    timing: TimingSpec,
    /// Last-known interval, used when a reloaded cron expression fails to parse.
    fallback_interval: Duration,
    trigger_tx: mpsc::Sender<()>,
    trigger_rx: mpsc::Receiver<()>,
    /// Shutdown signal for the current fire-loop generation. A fresh channel
    /// is minted on every mode switch; a signaled one is never reused.
    shutdown_tx: Option<watch::Sender<bool>>,
    loop_task: Option<JoinHandle<()>>,
}

enum RunEvent {
    Trigger,
    TriggerClosed,
    Reload(AppConfig),
    ReloadClosed,
}

impl Scheduler {
    pub fn new(
        config: &AppConfig,
        round: Arc<dyn ValidationRound>,
        lifecycle: Arc<LifecycleManager>,
    ) -> Self {
        // Single-slot mailbox: see SchedulerHandle::trigger_manual.
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        Self {
            ctx: Arc::new(FireContext {
                running: AtomicBool::new(false),
                round,
                lifecycle,
            }),
            timing: TimingSpec::from_config(config),
            fallback_interval: config.interval(),
            trigger_tx,
            trigger_rx,
            shutdown_tx: None,
            loop_task: None,
        }
    }

    /// A handle for requesting manual rounds.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            trigger_tx: self.trigger_tx.clone(),
        }
    }

    /// Begin the active timing mode's fire loop.
    ///
    /// Interval mode fires an immediate first round; cron mode waits for the
    /// expression's next match.
    pub fn start(&mut self) {
        match &self.timing {
            TimingSpec::Cron { expr, .. } => {
                info!(cron = %expr, "cron schedule active, first round waits for the next match");
            }
            TimingSpec::Interval { period } => {
                info!(interval_secs = period.as_secs(), "interval schedule active");
            }
        }
        let fire_immediately = !self.timing.is_cron();
        self.spawn_fire_loop(fire_immediately);
    }

    /// Switch timing modes after a configuration reload.
    ///
    /// Tears down the previous fire loop before installing the new one, and
    /// never fires an immediate round. Not safe to call concurrently with
    /// itself; the `&mut self` receiver holds callers to a single owner.
    pub fn reconfigure(&mut self, config: &AppConfig) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }
        // The old loop exits promptly on the signal; its handle is dropped.
        drop(self.loop_task.take());

        self.fallback_interval = config.interval();
        self.timing = TimingSpec::derive(&config.cron_expression, self.fallback_interval);
        self.ctx.lifecycle.set_threshold(config.sub_urls_fail_remove);

        match &self.timing {
            TimingSpec::Cron { expr, .. } => info!(cron = %expr, "rescheduled onto cron expression"),
            TimingSpec::Interval { period } => {
                info!(interval_secs = period.as_secs(), "rescheduled onto fixed interval");
            }
        }
        self.spawn_fire_loop(false);
    }

    /// Main loop: consumes manual triggers and configuration reload events.
    ///
    /// This loop is the single owner of [`reconfigure`](Self::reconfigure).
    pub async fn run(mut self, mut reload_rx: mpsc::UnboundedReceiver<AppConfig>) {
        let mut reload_open = true;
        loop {
            let event = tokio::select! {
                trigger = self.trigger_rx.recv() => match trigger {
                    Some(()) => RunEvent::Trigger,
                    None => RunEvent::TriggerClosed,
                },
                reload = reload_rx.recv(), if reload_open => match reload {
                    Some(config) => RunEvent::Reload(config),
                    None => RunEvent::ReloadClosed,
                },
            };

            match event {
                RunEvent::Trigger => self.ctx.run_round(&self.timing).await,
                RunEvent::Reload(config) => {
                    info!("configuration reloaded, rescheduling");
                    self.reconfigure(&config);
                }
                RunEvent::ReloadClosed => {
                    debug!("configuration reload stream closed");
                    reload_open = false;
                }
                RunEvent::TriggerClosed => break,
            }
        }
    }

    fn spawn_fire_loop(&mut self, fire_immediately: bool) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let ctx = Arc::clone(&self.ctx);
        let timing = self.timing.clone();
        let task = match &self.timing {
            TimingSpec::Interval { period } => {
                spawn_interval_loop(ctx, timing, *period, fire_immediately, shutdown_rx)
            }
            TimingSpec::Cron { schedule, .. } => {
                spawn_cron_loop(ctx, timing, schedule.clone(), shutdown_rx)
            }
        };
        self.loop_task = Some(task);
    }
}

/// Fire `period` after each round completes, optionally starting with an
/// immediate round.
fn spawn_interval_loop(
    ctx: Arc<FireContext>,
    timing: TimingSpec,
    period: Duration,
    fire_immediately: bool,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let first = if fire_immediately {
            tokio::time::Instant::now()
        } else {
            tokio::time::Instant::now() + period
        };
        let mut ticker = tokio::time::interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    ctx.run_round(&timing).await;
                    // The period runs from round completion, so the actual
                    // fire matches the advertised next-run time.
                    ticker.reset();
                }
                _ = shutdown_rx.changed() => {
                    debug!("interval fire loop stopped");
                    break;
                }
            }
        }
    })
}

/// Sleep until each upcoming cron match, firing a round on every match.
fn spawn_cron_loop(
    ctx: Arc<FireContext>,
    timing: TimingSpec,
    schedule: Schedule,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let next = match schedule.upcoming(Utc).next() {
                Some(next) => next,
                None => {
                    warn!("cron schedule has no upcoming fire times, stopping fire loop");
                    break;
                }
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(wait) => ctx.run_round(&timing).await,
                _ = shutdown_rx.changed() => {
                    debug!("cron fire loop stopped");
                    break;
                }
            }
        }
    })
}
