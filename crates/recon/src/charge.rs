use crate::rates::ZoneRate;
use crate::slab::WeightSlab;

/// Half-kilogram units billed on top of the base slab. The base fee covers
/// the first 0.5 kg, so a 0 kg or 0.5 kg slab has no additional units.
pub fn additional_units(slab: WeightSlab) -> u64 {
    slab.units().saturating_sub(1)
}

/// Expected charge in minor units: `fixed + additional_units * additional`.
pub fn expected_charge(slab: WeightSlab, fixed_minor: i64, additional_minor: i64) -> i64 {
    let units = i64::try_from(additional_units(slab)).unwrap_or(i64::MAX);
    fixed_minor.saturating_add(units.saturating_mul(additional_minor))
}

/// Expected charge for a slab under a zone's rate.
pub fn expected_for_rate(slab: WeightSlab, rate: &ZoneRate) -> i64 {
    expected_charge(slab, rate.fixed_minor, rate.additional_minor)
}
