// Read model for the sidebar/overlay: counts and formatted totals.
use serde::Serialize;

use crate::config::MeasureConfig;
use crate::models::Metrics;
use crate::units::{format_area_km2, format_distance_km};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeatureCounts {
    pub points: usize,
    pub lines: usize,
    pub polygons: usize,
}

impl FeatureCounts {
    pub fn total(&self) -> usize {
        self.points + self.lines + self.polygons
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryState {
    #[serde(flatten)]
    pub counts: FeatureCounts,
    pub total_features: usize,
    pub total_distance_km: f64,
    pub total_area_m2: f64,
    pub total_distance_label: String,
    pub total_area_label: String,
}

impl Default for SummaryState {
    fn default() -> Self {
        Self::project(&Metrics::default(), &MeasureConfig::default())
    }
}

impl SummaryState {
    /// Build the whole summary from one engine run; nothing is merged with
    /// earlier state.
    pub fn project(metrics: &Metrics, config: &MeasureConfig) -> Self {
        let counts = FeatureCounts {
            points: metrics.point_count,
            lines: metrics.line_count,
            polygons: metrics.polygon_count,
        };

        Self {
            counts,
            total_features: counts.total(),
            total_distance_km: metrics.total_distance_km,
            total_area_m2: metrics.total_area_m2,
            total_distance_label: format_distance_km(metrics.total_distance_km, config.decimals),
            total_area_label: format_area_km2(metrics.total_area_m2, config.decimals),
        }
    }
}
