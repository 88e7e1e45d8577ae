use wasm_bindgen::prelude::*;
use serde::Serialize;

// Create a console module for logging
pub mod console;
pub mod config;
pub mod errors;
pub mod geodesy;
pub mod labels;
pub mod metrics;
pub mod models;
pub mod session;
pub mod summary;
pub mod trigger;
pub mod units;
// Global session behind the exports below
mod module_state;

use config::MeasureConfig;
use errors::{MeasureError, MeasureResult};
use labels::{DeferredLabelSink, JsLabelSink, LabelSink};
use module_state::ModuleState;
use summary::SummaryState;
use trigger::{DrawEvent, DrawMode};

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::console::log(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => ($crate::console::warn(&format!($($t)*)))
}

impl From<MeasureError> for JsValue {
    fn from(e: MeasureError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

// Summaries use #[serde(flatten)], which goes through serialize_map; the
// json-compatible serializer turns maps into plain objects instead of `Map`.
fn to_value<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    Ok(value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}

use std::sync::Once;
static INIT: Once = Once::new();

#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("Measurement module initialized");
    });
}

/// Install settings from a JSON object; omitted keys keep their defaults.
#[wasm_bindgen]
pub fn configure(config_json: &str) -> Result<(), JsValue> {
    let config = MeasureConfig::from_json(config_json)?;
    ModuleState::with_mut(|state| state.session.configure(config));
    Ok(())
}

/// Measure a `FeatureCollection` without touching session state.
/// Returns the full report (metrics, both label collections, failures) as JSON.
#[wasm_bindgen]
pub fn measure_features(collection_json: &str) -> Result<String, JsValue> {
    let features = models::parse_feature_collection(collection_json)?;
    let config = ModuleState::with(|state| state.session.config().clone());
    let report = metrics::compute(&features, &config);

    serde_json::to_string(&report)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize report: {}", e)))
}

/// Entry point for draw/pointer events. `collection_json` is the drawing tool's
/// current `getAll()` result; `on_labels(sourceId, featureCollection)` receives
/// label replacements. Returns the new summary, or `undefined` when the event
/// did not trigger a recompute.
#[wasm_bindgen]
pub fn handle_draw_event(
    event: &str,
    collection_json: &str,
    on_labels: &js_sys::Function,
) -> Result<JsValue, JsValue> {
    let mut sink = JsLabelSink::new(on_labels);
    match dispatch_draw_event(event, collection_json, &mut sink)? {
        Some(summary) => to_value(&summary),
        None => Ok(JsValue::UNDEFINED),
    }
}

// The session records its label writes while the module state is borrowed;
// they reach `sink` only after the borrow ends, so the sink may call back
// into the exports.
fn dispatch_draw_event<S: LabelSink + ?Sized>(
    event: &str,
    collection_json: &str,
    sink: &mut S,
) -> MeasureResult<Option<SummaryState>> {
    let (outcome, deferred) = ModuleState::with_mut(|state| {
        let mut deferred = DeferredLabelSink::new();
        let outcome = event.parse::<DrawEvent>().and_then(|event| {
            state.session.handle_event(
                event,
                || models::parse_feature_collection(collection_json),
                &mut deferred,
            )
        });
        if outcome.is_err() {
            state.rejected_events += 1;
        }
        (outcome, deferred)
    });

    let summary = outcome?;
    let mut failed = Vec::new();
    let flushed = deferred.flush(sink, |source_id| failed.push(source_id.to_string()));
    if let Err(e) = flushed {
        ModuleState::with_mut(|state| {
            for source_id in &failed {
                state.session.forget_labels(source_id);
            }
            state.rejected_events += 1;
        });
        return Err(e);
    }

    Ok(summary)
}

/// Tell the core which drawing mode is active (`draw.modechange`).
#[wasm_bindgen]
pub fn set_draw_mode(mode: &str) {
    ModuleState::with_mut(|state| state.session.set_mode(DrawMode::parse(mode)));
}

#[wasm_bindgen]
pub fn get_summary() -> Result<JsValue, JsValue> {
    let summary = ModuleState::with(|state| state.session.summary().clone());
    to_value(&summary)
}

/// Session counters for diagnostics.
#[wasm_bindgen]
pub fn get_session_stats() -> String {
    ModuleState::with(|state| {
        serde_json::json!({
            "recomputes": state.session.recomputes(),
            "rejectedEvents": state.rejected_events,
        })
        .to_string()
    })
}

#[wasm_bindgen]
pub fn reset_session() {
    ModuleState::with_mut(ModuleState::reset);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_LINE_SOURCE_ID, DEFAULT_POLYGON_SOURCE_ID};
    use crate::labels::MemoryLabelSink;
    use crate::models::LabelCollection;

    const ONE_LINE: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","geometry":{"type":"LineString","coordinates":[[0,0],[0.01,0]]}}
    ]}"#;

    /// Reads the session from inside the label callback, the way a JS
    /// `on_labels` handler that calls `get_summary` would.
    #[derive(Default)]
    struct ReadsStateSink {
        lines_seen: Vec<usize>,
        inner: MemoryLabelSink,
    }

    impl LabelSink for ReadsStateSink {
        fn replace_source(&mut self, source_id: &str, labels: &LabelCollection) -> MeasureResult<()> {
            self.lines_seen
                .push(ModuleState::with(|state| state.session.summary().counts.lines));
            self.inner.replace_source(source_id, labels)
        }
    }

    struct BrokenSink;

    impl LabelSink for BrokenSink {
        fn replace_source(&mut self, source_id: &str, _: &LabelCollection) -> MeasureResult<()> {
            Err(MeasureError::Sink {
                source_id: source_id.to_string(),
                reason: "map not ready".into(),
            })
        }
    }

    #[test]
    fn label_sink_can_read_session_state() {
        let _lock = crate::module_state::exclusive();
        ModuleState::with_mut(ModuleState::reset);

        let mut sink = ReadsStateSink::default();
        let summary = dispatch_draw_event("draw.create", ONE_LINE, &mut sink)
            .unwrap()
            .unwrap();

        assert_eq!(summary.counts.lines, 1);
        // the summary is already published when the labels arrive
        assert_eq!(sink.lines_seen, vec![1, 1]);
        assert_eq!(sink.inner.sources[DEFAULT_LINE_SOURCE_ID].len(), 1);
        assert!(sink.inner.sources[DEFAULT_POLYGON_SOURCE_ID].is_empty());

        ModuleState::with_mut(ModuleState::reset);
    }

    #[test]
    fn failed_label_write_is_retried_on_next_event() {
        let _lock = crate::module_state::exclusive();
        ModuleState::with_mut(ModuleState::reset);

        let err = dispatch_draw_event("draw.create", ONE_LINE, &mut BrokenSink).unwrap_err();
        assert!(matches!(err, MeasureError::Sink { .. }));
        assert_eq!(ModuleState::with(|s| s.rejected_events), 1);

        // same snapshot, but both sources were forgotten so both are rewritten
        let mut sink = MemoryLabelSink::default();
        dispatch_draw_event("draw.update", ONE_LINE, &mut sink).unwrap();
        assert_eq!(sink.writes, 2);

        ModuleState::with_mut(ModuleState::reset);
    }

    #[test]
    fn unknown_event_is_rejected_without_writes() {
        let _lock = crate::module_state::exclusive();
        ModuleState::with_mut(ModuleState::reset);

        let mut sink = MemoryLabelSink::default();
        let err = dispatch_draw_event("draw.explode", ONE_LINE, &mut sink).unwrap_err();
        assert_eq!(err, MeasureError::UnknownEvent("draw.explode".into()));
        assert_eq!(sink.writes, 0);
        assert_eq!(ModuleState::with(|s| s.rejected_events), 1);

        ModuleState::with_mut(ModuleState::reset);
    }
}
