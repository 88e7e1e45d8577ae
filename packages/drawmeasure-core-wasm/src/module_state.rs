use lazy_static::lazy_static;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;

use crate::session::MeasureSession;

// Process-wide state behind the wasm exports. The JS side drives a single map,
// so one session is enough.
pub struct ModuleState {
    pub session: MeasureSession,
    // Events that failed before reaching the engine (bad JSON, unknown names)
    pub rejected_events: usize,
}

lazy_static! {
    static ref MODULE_STATE: ReentrantMutex<RefCell<ModuleState>> =
        ReentrantMutex::new(RefCell::new(ModuleState::new()));
}

impl ModuleState {
    pub fn new() -> Self {
        ModuleState {
            session: MeasureSession::default(),
            rejected_events: 0,
        }
    }

    pub fn with_mut<F, R>(f: F) -> R
    where
        F: FnOnce(&mut ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let mut borrow = guard.borrow_mut();
        f(&mut borrow)
    }

    pub fn with<F, R>(f: F) -> R
    where
        F: FnOnce(&ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let borrow = guard.borrow();
        f(&borrow)
    }

    pub fn reset(&mut self) {
        self.session.reset();
        self.rejected_events = 0;
    }
}

// Holds the lock without borrowing, so tests touching the global state run
// one at a time while their own `with`/`with_mut` calls still go through.
#[cfg(test)]
pub(crate) fn exclusive() -> parking_lot::ReentrantMutexGuard<'static, RefCell<ModuleState>> {
    MODULE_STATE.lock()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::MemoryLabelSink;
    use crate::models::{Coordinate, DrawnFeature, DrawnGeometry};
    use crate::trigger::DrawEvent;

    #[test]
    fn global_session_keeps_state_between_calls() {
        let _lock = exclusive();
        ModuleState::with_mut(|state| {
            state.reset();
            let mut sink = MemoryLabelSink::default();
            state
                .session
                .handle_event(
                    DrawEvent::Create,
                    || {
                        Ok(vec![DrawnFeature::new(DrawnGeometry::Point(Coordinate::new(
                            0.0, 0.0,
                        )))])
                    },
                    &mut sink,
                )
                .unwrap();
        });

        let points = ModuleState::with(|state| state.session.summary().counts.points);
        assert_eq!(points, 1);

        ModuleState::with_mut(ModuleState::reset);
        assert_eq!(ModuleState::with(|s| s.session.summary().total_features), 0);
    }
}
