use serde::Serialize;

use crate::error::RowError;
use crate::rates::RateCard;
use crate::slab::WeightSlab;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One order line from the joined shipment dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentRecord {
    /// 1-based line in the source file (header is line 1).
    pub line: usize,
    pub order_id: String,
    pub weight_grams: f64,
    pub zone: String,
    pub shipment_type: String,
    pub billed_minor: i64,
}

/// Parsed shipments plus rows the loader already had to reject.
#[derive(Debug, Clone, Default)]
pub struct LoadedShipments {
    pub records: Vec<ShipmentRecord>,
    pub rejected: Vec<SkippedRow>,
}

/// Everything a run needs: shipments and the active rate card.
pub struct ReconInput {
    pub shipments: LoadedShipments,
    pub rates: RateCard,
}

// ---------------------------------------------------------------------------
// Per-row output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyClass {
    Correct,
    Overcharged,
    Undercharged,
}

impl std::fmt::Display for DiscrepancyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Correct => write!(f, "correct"),
            Self::Overcharged => write!(f, "overcharged"),
            Self::Undercharged => write!(f, "undercharged"),
        }
    }
}

/// A shipment enriched with its slab, expected charge and discrepancy.
#[derive(Debug, Clone, Serialize)]
pub struct ChargedShipment {
    pub line: usize,
    pub order_id: String,
    pub zone: String,
    pub shipment_type: String,
    pub weight_grams: f64,
    pub weight_kg: f64,
    pub weight_slab_kg: f64,
    pub billed_minor: i64,
    pub expected_minor: i64,
    pub difference_minor: i64,
    pub discrepancy_class: DiscrepancyClass,
    #[serde(skip)]
    pub slab: WeightSlab,
}

/// A row that could not be priced, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub line: usize,
    pub order_id: String,
    pub error: RowError,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ZoneDiscrepancy {
    pub zone: String,
    pub count: usize,
    pub mean_difference_minor: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShipmentTypeDiscrepancy {
    pub shipment_type: String,
    pub count: usize,
    pub mean_difference_minor: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlabCount {
    pub weight_slab_kg: f64,
    pub count: usize,
    #[serde(skip)]
    pub slab: WeightSlab,
}

/// Square Pearson matrix. `None` cells have no defined coefficient
/// (fewer than two observations or a constant column).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.columns.iter().position(|c| c == row)?;
        let c = self.columns.iter().position(|c2| c2 == col)?;
        self.values[r][c]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconAggregates {
    pub by_zone: Vec<ZoneDiscrepancy>,
    pub by_shipment_type: Vec<ShipmentTypeDiscrepancy>,
    pub slab_distribution: Vec<SlabCount>,
    pub correlation: Option<CorrelationMatrix>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    /// Priced orders. `correct + overcharged + undercharged == total_orders`.
    pub total_orders: usize,
    pub correct: usize,
    pub overcharged: usize,
    pub undercharged: usize,
    /// Rows excluded from every figure above.
    pub skipped: usize,
    pub total_billed_minor: i64,
    pub total_expected_minor: i64,
    /// Sum of positive differences.
    pub overcharged_minor: i64,
    /// Sum of negative differences, as a positive number.
    pub undercharged_minor: i64,
    pub net_difference_minor: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub aggregates: ReconAggregates,
    pub rows: Vec<ChargedShipment>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub tolerance_minor: i64,
    pub rate_zones: usize,
}
