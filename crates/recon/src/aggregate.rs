use std::collections::BTreeMap;

use crate::correlation::correlation_matrix;
use crate::model::{
    ChargedShipment, ReconAggregates, ShipmentTypeDiscrepancy, SlabCount, ZoneDiscrepancy,
};
use crate::money::to_major;
use crate::slab::WeightSlab;

pub const COL_WEIGHT_KG: &str = "weight_kg";
pub const COL_EXPECTED: &str = "expected_charge";
pub const COL_DIFFERENCE: &str = "charge_difference";

/// Build every aggregate table over the priced rows.
pub fn build_aggregates(rows: &[ChargedShipment]) -> ReconAggregates {
    ReconAggregates {
        by_zone: mean_by_zone(rows),
        by_shipment_type: mean_by_shipment_type(rows),
        slab_distribution: slab_distribution(rows),
        correlation: correlation_matrix(&numeric_columns(rows)),
    }
}

/// Mean difference per zone, ordered by zone.
pub fn mean_by_zone(rows: &[ChargedShipment]) -> Vec<ZoneDiscrepancy> {
    group_mean(rows, |r| &r.zone)
        .into_iter()
        .map(|(zone, count, mean)| ZoneDiscrepancy {
            zone,
            count,
            mean_difference_minor: mean,
        })
        .collect()
}

/// Mean and count of difference per shipment type, ordered by type.
pub fn mean_by_shipment_type(rows: &[ChargedShipment]) -> Vec<ShipmentTypeDiscrepancy> {
    group_mean(rows, |r| &r.shipment_type)
        .into_iter()
        .map(|(shipment_type, count, mean)| ShipmentTypeDiscrepancy {
            shipment_type,
            count,
            mean_difference_minor: mean,
        })
        .collect()
}

/// How many rows landed in each slab. Most common slab first; ties by
/// lighter slab first.
pub fn slab_distribution(rows: &[ChargedShipment]) -> Vec<SlabCount> {
    let mut counts: BTreeMap<WeightSlab, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.slab).or_insert(0) += 1;
    }

    let mut out: Vec<SlabCount> = counts
        .into_iter()
        .map(|(slab, count)| SlabCount {
            weight_slab_kg: slab.kg(),
            count,
            slab,
        })
        .collect();
    // Stable sort keeps BTreeMap (ascending slab) order within equal counts.
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// The three diagnostic columns, in major units for money.
pub fn numeric_columns(rows: &[ChargedShipment]) -> Vec<(String, Vec<f64>)> {
    vec![
        (COL_WEIGHT_KG.to_string(), rows.iter().map(|r| r.weight_kg).collect()),
        (COL_EXPECTED.to_string(), rows.iter().map(|r| to_major(r.expected_minor)).collect()),
        (COL_DIFFERENCE.to_string(), rows.iter().map(|r| to_major(r.difference_minor)).collect()),
    ]
}

fn group_mean<'a, F>(rows: &'a [ChargedShipment], key: F) -> Vec<(String, usize, f64)>
where
    F: Fn(&'a ChargedShipment) -> &'a String,
{
    let mut groups: BTreeMap<&str, (i128, usize)> = BTreeMap::new();
    for row in rows {
        let entry = groups.entry(key(row).as_str()).or_insert((0, 0));
        entry.0 += i128::from(row.difference_minor);
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(k, (sum, count))| (k.to_string(), count, sum as f64 / count as f64))
        .collect()
}
