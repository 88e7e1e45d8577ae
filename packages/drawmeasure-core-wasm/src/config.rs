use serde::{Deserialize, Serialize};

use crate::errors::{MeasureError, MeasureResult};

pub const DEFAULT_LINE_SOURCE_ID: &str = "line-distance-labels";
pub const DEFAULT_POLYGON_SOURCE_ID: &str = "polygon-area-labels";
const MAX_DECIMALS: usize = 6;

/// Host-tunable settings, installed from JSON with `configure`.
/// Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeasureConfig {
    /// Decimal places for every formatted distance/area.
    pub decimals: usize,
    pub line_source_id: String,
    pub polygon_source_id: String,
    /// Recompute on pointer movement while a drawing interaction is active.
    pub recompute_on_pointer_move: bool,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            decimals: 2,
            line_source_id: DEFAULT_LINE_SOURCE_ID.to_string(),
            polygon_source_id: DEFAULT_POLYGON_SOURCE_ID.to_string(),
            recompute_on_pointer_move: true,
        }
    }
}

impl MeasureConfig {
    pub fn from_json(json: &str) -> MeasureResult<Self> {
        let config: MeasureConfig =
            serde_json::from_str(json).map_err(|e| MeasureError::Config(e.to_string()))?;
        config.validated()
    }

    fn validated(mut self) -> MeasureResult<Self> {
        if self.line_source_id.is_empty() || self.polygon_source_id.is_empty() {
            return Err(MeasureError::Config("label source ids must not be empty".into()));
        }
        if self.line_source_id == self.polygon_source_id {
            return Err(MeasureError::Config(format!(
                "line and polygon labels need distinct sources, both are '{}'",
                self.line_source_id
            )));
        }
        self.decimals = self.decimals.min(MAX_DECIMALS);
        Ok(self)
    }
}
