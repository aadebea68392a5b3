use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use carga_metrics::TagSet;
use tokio::sync::{Barrier, Notify};

use crate::gate::IterationGate;
use crate::iteration::Iteration;
use crate::metrics_context::MetricsContext;
use crate::run::RunContext;
use crate::scenario::Scenario;
use crate::schedule::RampingSchedule;

#[derive(Debug, Default)]
pub struct StartSignal {
    started: AtomicBool,
    notify: Notify,
}

impl StartSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.started.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug, Clone)]
pub enum VuWork {
    Constant { gate: Arc<IterationGate> },
    RampingVus { schedule: Arc<RampingSchedule> },
}

#[derive(Debug, Clone)]
pub struct VuContext {
    pub vu_id: u64,
    /// 1-based index within the scenario; ramping compares it against the target.
    pub scenario_vu: u64,
    pub metrics_ctx: MetricsContext,
    pub work: VuWork,
    pub run_ctx: Arc<RunContext>,
    pub run_started: Arc<OnceLock<Instant>>,
    pub ready_barrier: Arc<Barrier>,
    pub start_signal: Arc<StartSignal>,
}

/// Counts the VU in `vus` while alive and lifts `vus_max` to the new peak.
pub struct ActiveVuGuard {
    run_ctx: Arc<RunContext>,
    tags: TagSet,
}

impl Drop for ActiveVuGuard {
    fn drop(&mut self) {
        let metrics = &self.run_ctx.metrics;
        let ids = self.run_ctx.iteration_metrics;
        if let Some(h) = metrics.get_handle(ids.vus, self.tags.clone()) {
            h.add_gauge(-1);
        }
    }
}

impl VuContext {
    pub fn enter_active_vu(&self) -> ActiveVuGuard {
        let metrics = &self.run_ctx.metrics;
        let ids = self.run_ctx.iteration_metrics;
        let tags = metrics.resolve_tags(&[("scenario", self.metrics_ctx.scenario())]);

        if let Some(h) = metrics.get_handle(ids.vus, tags.clone()) {
            let active = h.add_gauge(1);
            if let Some(peak) = metrics.get_handle(ids.vus_max, tags.clone()) {
                peak.max_gauge(active);
            }
        }

        ActiveVuGuard {
            run_ctx: self.run_ctx.clone(),
            tags,
        }
    }

    fn record_iteration(&self, duration: Duration) {
        let tags = self.metrics_ctx.base_tags(None);
        self.run_ctx
            .iteration_metrics
            .record_iteration(&self.run_ctx.metrics, duration, &tags);
    }
}

async fn run_one(ctx: &VuContext, scenario: &dyn Scenario, it: &mut Iteration) {
    it.begin();
    let started = Instant::now();
    scenario.iteration(it).await;
    ctx.record_iteration(started.elapsed());
}

pub async fn run_vu(ctx: VuContext, scenario: Arc<dyn Scenario>) {
    let mut it = Iteration::new(ctx.run_ctx.clone(), ctx.metrics_ctx.clone(), ctx.vu_id);

    ctx.ready_barrier.wait().await;
    ctx.start_signal.wait().await;

    let run_started = ctx.run_started.get().copied().unwrap_or_else(Instant::now);

    match &ctx.work {
        VuWork::Constant { gate } => {
            let _active = ctx.enter_active_vu();
            while gate.next() {
                run_one(&ctx, scenario.as_ref(), &mut it).await;
            }
        }
        VuWork::RampingVus { schedule } => {
            let mut active: Option<ActiveVuGuard> = None;
            loop {
                let elapsed = run_started.elapsed();
                if schedule.is_done(elapsed) {
                    break;
                }

                if ctx.scenario_vu > schedule.target_at(elapsed) {
                    active = None;
                    let wait = schedule.next_recheck_in(elapsed, ctx.scenario_vu);
                    tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
                    continue;
                }

                if active.is_none() {
                    active = Some(ctx.enter_active_vu());
                }
                run_one(&ctx, scenario.as_ref(), &mut it).await;
            }
        }
    }

    tracing::debug!(vu = ctx.vu_id, iterations = it.index(), "vu finished");
}
