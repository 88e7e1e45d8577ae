//! Pushing label collections into the rendering surface's label sources.

use std::collections::HashMap;

use serde::Serialize;
use wasm_bindgen::JsValue;

use crate::config::MeasureConfig;
use crate::errors::{MeasureError, MeasureResult};
use crate::models::LabelCollection;

/// The one capability the core needs from the renderer: replace everything
/// in a named source with a new collection.
pub trait LabelSink {
    fn replace_source(&mut self, source_id: &str, labels: &LabelCollection) -> MeasureResult<()>;
}

/// Keeps renderer-side label sources equal to the latest engine output.
///
/// Every write is a full replacement. A collection identical to the last one
/// successfully written to a source is not written again.
#[derive(Debug, Default)]
pub struct LabelSynchronizer {
    applied: HashMap<String, LabelCollection>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub line_labels_written: bool,
    pub polygon_labels_written: bool,
}

impl LabelSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both label sources. A failure on one source does not stop the
    /// other from being written; the first error is returned afterwards.
    pub fn sync<S: LabelSink + ?Sized>(
        &mut self,
        sink: &mut S,
        config: &MeasureConfig,
        segment_labels: &LabelCollection,
        polygon_labels: &LabelCollection,
    ) -> MeasureResult<SyncOutcome> {
        let lines = self.push(sink, &config.line_source_id, segment_labels);
        let polygons = self.push(sink, &config.polygon_source_id, polygon_labels);

        Ok(SyncOutcome {
            line_labels_written: lines?,
            polygon_labels_written: polygons?,
        })
    }

    fn push<S: LabelSink + ?Sized>(
        &mut self,
        sink: &mut S,
        source_id: &str,
        labels: &LabelCollection,
    ) -> MeasureResult<bool> {
        if self.applied.get(source_id) == Some(labels) {
            return Ok(false);
        }

        match sink.replace_source(source_id, labels) {
            Ok(()) => {
                self.applied.insert(source_id.to_string(), labels.clone());
                Ok(true)
            }
            Err(e) => {
                // The source is in an unknown state now; force the next write.
                self.applied.remove(source_id);
                Err(e)
            }
        }
    }

    /// Forget what was written so the next sync rewrites every source.
    pub fn reset(&mut self) {
        self.applied.clear();
    }

    /// Forget one source so the next sync rewrites it.
    pub fn forget(&mut self, source_id: &str) {
        self.applied.remove(source_id);
    }

    pub fn applied(&self, source_id: &str) -> Option<&LabelCollection> {
        self.applied.get(source_id)
    }
}

/// Records replacements instead of performing them, so they can be replayed
/// into the real sink once no session state is borrowed.
#[derive(Debug, Default)]
pub struct DeferredLabelSink {
    writes: Vec<(String, LabelCollection)>,
}

impl DeferredLabelSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Replay every recorded write in order. A failing source is passed to
    /// `on_failure` and does not stop the rest; the first error is returned.
    pub fn flush<S, F>(self, sink: &mut S, mut on_failure: F) -> MeasureResult<()>
    where
        S: LabelSink + ?Sized,
        F: FnMut(&str),
    {
        let mut first_error = None;
        for (source_id, labels) in &self.writes {
            if let Err(e) = sink.replace_source(source_id, labels) {
                on_failure(source_id);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl LabelSink for DeferredLabelSink {
    fn replace_source(&mut self, source_id: &str, labels: &LabelCollection) -> MeasureResult<()> {
        self.writes.push((source_id.to_string(), labels.clone()));
        Ok(())
    }
}

/// In-process label sources, for hosts without a JS renderer.
#[derive(Debug, Default)]
pub struct MemoryLabelSink {
    pub sources: HashMap<String, LabelCollection>,
    pub writes: usize,
}

impl LabelSink for MemoryLabelSink {
    fn replace_source(&mut self, source_id: &str, labels: &LabelCollection) -> MeasureResult<()> {
        self.sources.insert(source_id.to_string(), labels.clone());
        self.writes += 1;
        Ok(())
    }
}

/// Forwards each replacement to a JS callback `(sourceId, featureCollection)`,
/// typically wrapping `map.getSource(sourceId).setData(featureCollection)`.
pub struct JsLabelSink<'a> {
    callback: &'a js_sys::Function,
}

impl<'a> JsLabelSink<'a> {
    pub fn new(callback: &'a js_sys::Function) -> Self {
        Self { callback }
    }
}

impl LabelSink for JsLabelSink<'_> {
    fn replace_source(&mut self, source_id: &str, labels: &LabelCollection) -> MeasureResult<()> {
        let sink_error = |reason: String| MeasureError::Sink {
            source_id: source_id.to_string(),
            reason,
        };

        let data = labels
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| sink_error(e.to_string()))?;

        self.callback
            .call2(&JsValue::NULL, &JsValue::from_str(source_id), &data)
            .map(|_| ())
            .map_err(|e| sink_error(e.as_string().unwrap_or_else(|| format!("{:?}", e))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_LINE_SOURCE_ID, DEFAULT_POLYGON_SOURCE_ID};
    use crate::models::{Coordinate, LabelFeature};

    fn distance_labels(texts: &[&str]) -> LabelCollection {
        LabelCollection::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| LabelFeature::distance(Coordinate::new(i as f64, 0.0), *t))
                .collect(),
        )
    }

    fn area_labels(texts: &[&str]) -> LabelCollection {
        LabelCollection::new(
            texts
                .iter()
                .map(|t| LabelFeature::area(Coordinate::new(0.0, 0.0), *t))
                .collect(),
        )
    }

    /// Fails every write to one source.
    struct FailingSink {
        inner: MemoryLabelSink,
        broken: &'static str,
    }

    impl LabelSink for FailingSink {
        fn replace_source(&mut self, source_id: &str, labels: &LabelCollection) -> MeasureResult<()> {
            if source_id == self.broken {
                return Err(MeasureError::Sink {
                    source_id: source_id.to_string(),
                    reason: "source not loaded".into(),
                });
            }
            self.inner.replace_source(source_id, labels)
        }
    }

    #[test]
    fn writes_both_sources() {
        let mut sync = LabelSynchronizer::new();
        let mut sink = MemoryLabelSink::default();
        let config = MeasureConfig::default();

        let outcome = sync
            .sync(&mut sink, &config, &distance_labels(&["1.11 km"]), &area_labels(&["1.00 km²"]))
            .unwrap();

        assert!(outcome.line_labels_written && outcome.polygon_labels_written);
        assert_eq!(sink.sources[DEFAULT_LINE_SOURCE_ID].len(), 1);
        assert_eq!(sink.sources[DEFAULT_POLYGON_SOURCE_ID].len(), 1);
    }

    #[test]
    fn same_labels_twice_is_a_no_op() {
        let mut sync = LabelSynchronizer::new();
        let mut sink = MemoryLabelSink::default();
        let config = MeasureConfig::default();
        let lines = distance_labels(&["1.11 km", "2.22 km"]);
        let polygons = area_labels(&[]);

        sync.sync(&mut sink, &config, &lines, &polygons).unwrap();
        let outcome = sync.sync(&mut sink, &config, &lines, &polygons).unwrap();

        assert_eq!(outcome, SyncOutcome::default());
        assert_eq!(sink.writes, 2);
        assert_eq!(sink.sources[DEFAULT_LINE_SOURCE_ID], lines);
    }

    #[test]
    fn replaces_rather_than_appends() {
        let mut sync = LabelSynchronizer::new();
        let mut sink = MemoryLabelSink::default();
        let config = MeasureConfig::default();

        sync.sync(&mut sink, &config, &distance_labels(&["1.11 km", "2.22 km"]), &area_labels(&["4.56 km²"]))
            .unwrap();
        sync.sync(&mut sink, &config, &distance_labels(&["3.34 km"]), &LabelCollection::default())
            .unwrap();

        let lines = &sink.sources[DEFAULT_LINE_SOURCE_ID];
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.features[0].text(), "3.34 km");
        assert!(sink.sources[DEFAULT_POLYGON_SOURCE_ID].is_empty());
    }

    #[test]
    fn failure_on_one_source_still_writes_the_other() {
        let mut sync = LabelSynchronizer::new();
        let mut sink = FailingSink {
            inner: MemoryLabelSink::default(),
            broken: DEFAULT_LINE_SOURCE_ID,
        };
        let config = MeasureConfig::default();
        let lines = distance_labels(&["1.11 km"]);
        let polygons = area_labels(&["1.00 km²"]);

        let err = sync.sync(&mut sink, &config, &lines, &polygons).unwrap_err();
        assert!(matches!(err, MeasureError::Sink { .. }));
        assert_eq!(sink.inner.sources[DEFAULT_POLYGON_SOURCE_ID], polygons);
        assert!(sync.applied(DEFAULT_LINE_SOURCE_ID).is_none());

        // once the source recovers the same labels are retried
        sink.broken = "none";
        let outcome = sync.sync(&mut sink, &config, &lines, &polygons).unwrap();
        assert!(outcome.line_labels_written);
        assert!(!outcome.polygon_labels_written);
    }

    #[test]
    fn deferred_writes_replay_in_order() {
        let mut sync = LabelSynchronizer::new();
        let mut deferred = DeferredLabelSink::new();
        let config = MeasureConfig::default();
        let lines = distance_labels(&["1.11 km"]);
        let polygons = area_labels(&["1.00 km²"]);

        sync.sync(&mut deferred, &config, &lines, &polygons).unwrap();
        assert_eq!(deferred.len(), 2);

        let mut sink = MemoryLabelSink::default();
        deferred.flush(&mut sink, |_| panic!("no write should fail")).unwrap();
        assert_eq!(sink.writes, 2);
        assert_eq!(sink.sources[DEFAULT_LINE_SOURCE_ID], lines);
        assert_eq!(sink.sources[DEFAULT_POLYGON_SOURCE_ID], polygons);
    }

    #[test]
    fn failed_deferred_write_is_retried_after_forget() {
        let mut sync = LabelSynchronizer::new();
        let config = MeasureConfig::default();
        let lines = distance_labels(&["1.11 km"]);
        let polygons = area_labels(&["1.00 km²"]);
        let mut sink = FailingSink {
            inner: MemoryLabelSink::default(),
            broken: DEFAULT_POLYGON_SOURCE_ID,
        };

        let mut deferred = DeferredLabelSink::new();
        sync.sync(&mut deferred, &config, &lines, &polygons).unwrap();
        let mut failed = Vec::new();
        let err = deferred
            .flush(&mut sink, |id| failed.push(id.to_string()))
            .unwrap_err();
        assert!(matches!(err, MeasureError::Sink { .. }));
        assert_eq!(failed, vec![DEFAULT_POLYGON_SOURCE_ID.to_string()]);
        assert_eq!(sink.inner.sources[DEFAULT_LINE_SOURCE_ID], lines);

        for id in &failed {
            sync.forget(id);
        }
        sink.broken = "none";
        let mut deferred = DeferredLabelSink::new();
        let outcome = sync.sync(&mut deferred, &config, &lines, &polygons).unwrap();
        assert!(!outcome.line_labels_written);
        assert!(outcome.polygon_labels_written);
        deferred.flush(&mut sink, |_| {}).unwrap();
        assert_eq!(sink.inner.sources[DEFAULT_POLYGON_SOURCE_ID], polygons);
    }

    #[test]
    fn reset_forces_rewrite() {
        let mut sync = LabelSynchronizer::new();
        let mut sink = MemoryLabelSink::default();
        let config = MeasureConfig::default();
        let lines = distance_labels(&["1.11 km"]);
        let polygons = LabelCollection::default();

        sync.sync(&mut sink, &config, &lines, &polygons).unwrap();
        sync.reset();
        sync.sync(&mut sink, &config, &lines, &polygons).unwrap();
        assert_eq!(sink.writes, 4);
    }
}
