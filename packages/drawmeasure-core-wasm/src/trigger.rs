//! When to recompute, and which recompute result is allowed to land.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{MeasureError, MeasureResult};

/// Drawing-tool modes, named as the drawing control reports them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    SimpleSelect,
    DirectSelect,
    DrawPoint,
    DrawLineString,
    DrawPolygon,
    Other(String),
}

impl DrawMode {
    pub fn parse(name: &str) -> Self {
        match name {
            "simple_select" => DrawMode::SimpleSelect,
            "direct_select" => DrawMode::DirectSelect,
            "draw_point" => DrawMode::DrawPoint,
            "draw_line_string" => DrawMode::DrawLineString,
            "draw_polygon" => DrawMode::DrawPolygon,
            other => DrawMode::Other(other.to_string()),
        }
    }

    /// Sketching or vertex editing, where geometry moves under the pointer.
    pub fn is_interactive(&self) -> bool {
        matches!(
            self,
            DrawMode::DirectSelect
                | DrawMode::DrawPoint
                | DrawMode::DrawLineString
                | DrawMode::DrawPolygon
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawEvent {
    Create,
    Update,
    Delete,
    PointerMove,
    ModeChange(DrawMode),
}

impl FromStr for DrawEvent {
    type Err = MeasureError;

    /// Accepts both the drawing control's event names and bare ones.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "draw.create" | "create" => Ok(DrawEvent::Create),
            "draw.update" | "update" => Ok(DrawEvent::Update),
            "draw.delete" | "delete" => Ok(DrawEvent::Delete),
            "mousemove" | "pointermove" | "touchmove" => Ok(DrawEvent::PointerMove),
            other => Err(MeasureError::UnknownEvent(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TriggerPolicy {
    mode: DrawMode,
    recompute_on_pointer_move: bool,
}

impl TriggerPolicy {
    pub fn new(recompute_on_pointer_move: bool) -> Self {
        Self {
            mode: DrawMode::default(),
            recompute_on_pointer_move,
        }
    }

    pub fn set_recompute_on_pointer_move(&mut self, enabled: bool) {
        self.recompute_on_pointer_move = enabled;
    }

    pub fn mode(&self) -> &DrawMode {
        &self.mode
    }

    /// Edits always recompute. Pointer movement recomputes only while a
    /// sketch or vertex edit is under way. Mode changes only update state.
    pub fn should_recompute(&mut self, event: &DrawEvent) -> bool {
        match event {
            DrawEvent::Create | DrawEvent::Update | DrawEvent::Delete => true,
            DrawEvent::PointerMove => self.recompute_on_pointer_move && self.mode.is_interactive(),
            DrawEvent::ModeChange(mode) => {
                self.mode = mode.clone();
                false
            }
        }
    }
}

/// Handle for one started recompute. Cancelled as soon as a newer one starts.
#[derive(Debug, Clone)]
pub struct RecomputeTicket {
    generation: u64,
    cancelled: Arc<AtomicBool>,
}

impl RecomputeTicket {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// For offloaded computations to bail out early once superseded.
    pub fn throw_if_cancelled(&self) -> MeasureResult<()> {
        if self.is_cancelled() {
            Err(MeasureError::Superseded(self.generation))
        } else {
            Ok(())
        }
    }
}

/// At most one recompute in flight; only the newest result is ever applied.
#[derive(Debug, Default)]
pub struct RecomputeGate {
    last_started: u64,
    last_applied: u64,
    in_flight: Option<RecomputeTicket>,
}

impl RecomputeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a recompute, superseding whatever is still in flight.
    pub fn begin(&mut self) -> RecomputeTicket {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }
        self.last_started += 1;
        let ticket = RecomputeTicket::new(self.last_started);
        self.in_flight = Some(ticket.clone());
        ticket
    }

    /// True if the result for `ticket` may be applied. Stale or out-of-order
    /// results are refused.
    pub fn finish(&mut self, ticket: &RecomputeTicket) -> bool {
        if ticket.is_cancelled() || ticket.generation <= self.last_applied {
            return false;
        }
        self.last_applied = ticket.generation;
        if self
            .in_flight
            .as_ref()
            .is_some_and(|t| t.generation == ticket.generation)
        {
            self.in_flight = None;
        }
        true
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight.as_ref().map(RecomputeTicket::generation)
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }
}
