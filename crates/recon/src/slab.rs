//! Weight slab normalization.
//!
//! Couriers bill in half-kilogram slabs. A raw weight is rounded *up* to the
//! next slab boundary; a weight already on a boundary stays where it is.
//!
//! Weights are quantized to whole milligrams (rounding up) before slabbing so
//! that float noise such as `2.1 * 1000.0 = 2100.0000000000005` never moves a
//! parcel across a boundary in either direction by more than a milligram.

use crate::error::RowError;

/// Milligrams in one billing slab (0.5 kg).
pub const SLAB_MG: u64 = 500_000;

/// Heaviest accepted parcel, in grams. Anything above is treated as bad data.
pub const MAX_WEIGHT_GRAMS: f64 = 1_000_000_000.0;

/// A billing slab, stored as a count of half-kilogram units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeightSlab {
    units: u64,
}

impl WeightSlab {
    pub fn from_units(units: u64) -> Self {
        Self { units }
    }

    /// Number of half-kilogram units in the slab.
    pub fn units(&self) -> u64 {
        self.units
    }

    pub fn kg(&self) -> f64 {
        self.units as f64 * 0.5
    }
}

impl std::fmt::Display for WeightSlab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} kg", self.kg())
    }
}

/// Quantize a gram weight to milligrams, rejecting NaN, infinities, negatives
/// and absurdly large values.
pub fn weight_to_mg(weight_grams: f64) -> Result<u64, RowError> {
    if !weight_grams.is_finite() || weight_grams < 0.0 || weight_grams > MAX_WEIGHT_GRAMS {
        return Err(RowError::InvalidWeight {
            value: weight_grams.to_string(),
        });
    }
    Ok((weight_grams * 1000.0).ceil() as u64)
}

/// Slab for an already-quantized milligram weight.
pub fn slab_for_mg(weight_mg: u64) -> WeightSlab {
    WeightSlab::from_units(weight_mg.div_ceil(SLAB_MG))
}

/// Slab for a gram weight, as it arrives from the shipment dataset.
pub fn slab_for_grams(weight_grams: f64) -> Result<WeightSlab, RowError> {
    weight_to_mg(weight_grams).map(slab_for_mg)
}

/// Round a kilogram weight up to its billing slab, in kilograms.
pub fn normalize(weight_kg: f64) -> Result<f64, RowError> {
    if !weight_kg.is_finite() || weight_kg < 0.0 {
        return Err(RowError::InvalidWeight {
            value: weight_kg.to_string(),
        });
    }
    slab_for_grams(weight_kg * 1000.0).map(|s| s.kg())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reference_points() {
        assert_eq!(normalize(2.0).unwrap(), 2.0);
        assert_eq!(normalize(2.1).unwrap(), 2.5);
        assert_eq!(normalize(2.5).unwrap(), 2.5);
        assert_eq!(normalize(2.6).unwrap(), 3.0);
        assert_eq!(normalize(0.0).unwrap(), 0.0);
    }

    #[test]
    fn sub_slab_weights() {
        assert_eq!(normalize(0.4).unwrap(), 0.5);
        assert_eq!(normalize(0.6).unwrap(), 1.0);
        assert_eq!(normalize(0.001).unwrap(), 0.5);
        assert_eq!(normalize(1.0).unwrap(), 1.0);
    }

    #[test]
    fn small_remainders_still_round_up() {
        // 40 g and 540 g over a boundary are billed as the next slab.
        assert_eq!(slab_for_grams(2040.0).unwrap().kg(), 2.5);
        assert_eq!(slab_for_grams(2540.0).unwrap().kg(), 3.0);
    }

    #[test]
    fn gram_noise_does_not_cross_boundary() {
        let grams = 2.1 * 1000.0;
        assert_eq!(slab_for_grams(grams).unwrap().units(), 5);
        assert_eq!(slab_for_grams(1500.0).unwrap().units(), 3);
    }

    #[test]
    fn rejects_bad_weights() {
        assert!(matches!(normalize(-0.1), Err(RowError::InvalidWeight { .. })));
        assert!(matches!(normalize(f64::NAN), Err(RowError::InvalidWeight { .. })));
        assert!(matches!(slab_for_grams(f64::INFINITY), Err(RowError::InvalidWeight { .. })));
        assert!(matches!(slab_for_grams(2.0e9), Err(RowError::InvalidWeight { .. })));
    }

    #[test]
    fn display() {
        assert_eq!(WeightSlab::from_units(3).to_string(), "1.5 kg");
    }

    proptest! {
        #[test]
        fn slab_is_half_kg_multiple_and_covers_weight(weight_kg in 0.0f64..5_000.0) {
            let slab = normalize(weight_kg).unwrap();
            prop_assert_eq!((slab * 2.0).fract(), 0.0);
            prop_assert!(slab >= weight_kg);
            prop_assert!(slab - weight_kg < 0.5);
        }

        #[test]
        fn whole_gram_weights_are_exact(grams in 0u64..5_000_000) {
            let slab = slab_for_grams(grams as f64).unwrap();
            prop_assert_eq!(slab.units(), grams.div_ceil(500));
        }

        #[test]
        fn slab_is_monotone(a in 0.0f64..1_000.0, b in 0.0f64..1_000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(normalize(lo).unwrap() <= normalize(hi).unwrap());
        }
    }
}
