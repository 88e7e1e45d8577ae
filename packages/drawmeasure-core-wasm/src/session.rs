//! Wires trigger policy, engine, summary and label sync into one event path.

use crate::config::MeasureConfig;
use crate::console_log;
use crate::errors::MeasureResult;
use crate::labels::{LabelSink, LabelSynchronizer};
use crate::metrics;
use crate::models::{DrawnFeature, MeasurementReport};
use crate::summary::SummaryState;
use crate::trigger::{DrawEvent, DrawMode, RecomputeGate, RecomputeTicket, TriggerPolicy};

#[derive(Debug)]
pub struct MeasureSession {
    config: MeasureConfig,
    policy: TriggerPolicy,
    gate: RecomputeGate,
    synchronizer: LabelSynchronizer,
    summary: SummaryState,
    recomputes: usize,
}

impl Default for MeasureSession {
    fn default() -> Self {
        Self::new(MeasureConfig::default())
    }
}

impl MeasureSession {
    pub fn new(config: MeasureConfig) -> Self {
        Self {
            policy: TriggerPolicy::new(config.recompute_on_pointer_move),
            gate: RecomputeGate::new(),
            synchronizer: LabelSynchronizer::new(),
            summary: SummaryState::project(&Default::default(), &config),
            recomputes: 0,
            config,
        }
    }

    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    /// Swap settings. Label sources are rewritten on the next recompute since
    /// ids or formatting may have changed.
    pub fn configure(&mut self, config: MeasureConfig) {
        self.policy
            .set_recompute_on_pointer_move(config.recompute_on_pointer_move);
        self.synchronizer.reset();
        self.config = config;
    }

    pub fn set_mode(&mut self, mode: DrawMode) {
        self.policy.should_recompute(&DrawEvent::ModeChange(mode));
    }

    pub fn mode(&self) -> &DrawMode {
        self.policy.mode()
    }

    pub fn summary(&self) -> &SummaryState {
        &self.summary
    }

    pub fn recomputes(&self) -> usize {
        self.recomputes
    }

    /// Run one event through the pipeline. `snapshot` is only called when the
    /// event triggers a recompute. Returns the new summary, or `None` when
    /// nothing was recomputed.
    pub fn handle_event<F, S>(
        &mut self,
        event: DrawEvent,
        snapshot: F,
        sink: &mut S,
    ) -> MeasureResult<Option<SummaryState>>
    where
        F: FnOnce() -> MeasureResult<Vec<DrawnFeature>>,
        S: LabelSink + ?Sized,
    {
        if !self.policy.should_recompute(&event) {
            return Ok(None);
        }

        let ticket = self.gate.begin();
        let features = snapshot()?;
        let report = metrics::compute(&features, &self.config);
        self.apply(&ticket, &report, sink)
    }

    /// Reserve a generation for a recompute run elsewhere (e.g. a worker).
    pub fn begin_recompute(&mut self) -> RecomputeTicket {
        self.gate.begin()
    }

    /// Publish a finished report unless a newer recompute has started since.
    pub fn apply<S: LabelSink + ?Sized>(
        &mut self,
        ticket: &RecomputeTicket,
        report: &MeasurementReport,
        sink: &mut S,
    ) -> MeasureResult<Option<SummaryState>> {
        if !self.gate.finish(ticket) {
            console_log!("Dropping stale recompute {}", ticket.generation());
            return Ok(None);
        }

        self.recomputes += 1;
        self.summary = SummaryState::project(&report.metrics, &self.config);
        self.synchronizer
            .sync(sink, &self.config, &report.segment_labels, &report.polygon_labels)?;

        Ok(Some(self.summary.clone()))
    }

    /// Mark a label source as out of date, e.g. after a deferred write to it
    /// failed, so the next recompute rewrites it.
    pub fn forget_labels(&mut self, source_id: &str) {
        self.synchronizer.forget(source_id);
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}
