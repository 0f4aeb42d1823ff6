use crate::model::{ChargedShipment, DiscrepancyClass, ReconSummary};

/// Overall counts and totals over the priced rows.
///
/// Money totals accumulate in i128 and saturate into i64.
pub fn compute_summary(rows: &[ChargedShipment], skipped: usize) -> ReconSummary {
    let mut summary = ReconSummary {
        total_orders: rows.len(),
        skipped,
        ..ReconSummary::default()
    };

    let mut billed: i128 = 0;
    let mut expected: i128 = 0;
    let mut over: i128 = 0;
    let mut under: i128 = 0;

    for r in rows {
        match r.discrepancy_class {
            DiscrepancyClass::Correct => summary.correct += 1,
            DiscrepancyClass::Overcharged => summary.overcharged += 1,
            DiscrepancyClass::Undercharged => summary.undercharged += 1,
        }

        billed += i128::from(r.billed_minor);
        expected += i128::from(r.expected_minor);
        let diff = i128::from(r.difference_minor);
        if diff > 0 {
            over += diff;
        } else {
            under -= diff;
        }
    }

    summary.total_billed_minor = clamp_minor(billed);
    summary.total_expected_minor = clamp_minor(expected);
    summary.overcharged_minor = clamp_minor(over);
    summary.undercharged_minor = clamp_minor(under);
    summary.net_difference_minor = clamp_minor(over - under);
    summary
}

fn clamp_minor(total: i128) -> i64 {
    i64::try_from(total).unwrap_or(if total < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::slab::WeightSlab;
    use proptest::prelude::*;

    fn row(billed: i64, expected: i64, class: DiscrepancyClass) -> ChargedShipment {
        ChargedShipment {
            line: 2,
            order_id: "o".into(),
            zone: "a".into(),
            shipment_type: "Forward charges".into(),
            weight_grams: 400.0,
            weight_kg: 0.4,
            weight_slab_kg: 0.5,
            billed_minor: billed,
            expected_minor: expected,
            difference_minor: billed.saturating_sub(expected),
            discrepancy_class: class,
            slab: WeightSlab::from_units(1),
        }
    }

    #[test]
    fn summary_counts() {
        let rows = vec![
            row(3000, 3000, DiscrepancyClass::Correct),
            row(6000, 5000, DiscrepancyClass::Overcharged),
            row(4000, 5000, DiscrepancyClass::Undercharged),
            row(4500, 5000, DiscrepancyClass::Undercharged),
        ];
        let s = compute_summary(&rows, 2);
        assert_eq!(s.total_orders, 4);
        assert_eq!(s.correct, 1);
        assert_eq!(s.overcharged, 1);
        assert_eq!(s.undercharged, 2);
        assert_eq!(s.correct + s.overcharged + s.undercharged, s.total_orders);
        assert_eq!(s.skipped, 2);
        assert_eq!(s.overcharged_minor, 1000);
        assert_eq!(s.undercharged_minor, 1500);
        assert_eq!(s.net_difference_minor, -500);
        assert_eq!(s.total_billed_minor, 17500);
        assert_eq!(s.total_expected_minor, 18000);
    }

    #[test]
    fn empty() {
        let s = compute_summary(&[], 0);
        assert_eq!(s, ReconSummary::default());
    }

    #[test]
    fn extreme_amounts_saturate() {
        let (_, class) = classify(i64::MIN + 1, 3000, 0);
        let s = compute_summary(&[row(i64::MIN + 1, 3000, class)], 0);
        assert_eq!(s.undercharged, 1);
        assert_eq!(s.undercharged_minor, i64::MAX);
        assert_eq!(s.net_difference_minor, i64::MIN);

        let big = row(i64::MAX - 3000, 3000, DiscrepancyClass::Overcharged);
        let s = compute_summary(&[big.clone(), big], 0);
        assert_eq!(s.total_billed_minor, i64::MAX);
        assert_eq!(s.total_expected_minor, 6000);
        assert_eq!(s.overcharged_minor, i64::MAX);
    }

    proptest! {
        #[test]
        fn classes_partition_total(
            pairs in prop::collection::vec((any::<i64>(), 0i64..i64::MAX), 0..50),
            tolerance in 0i64..1000,
        ) {
            let rows: Vec<ChargedShipment> = pairs
                .iter()
                .map(|&(billed, expected)| {
                    let (_, class) = classify(billed, expected, tolerance);
                    row(billed, expected, class)
                })
                .collect();

            let s = compute_summary(&rows, 0);
            prop_assert_eq!(s.correct + s.overcharged + s.undercharged, s.total_orders);
            prop_assert_eq!(s.total_orders, rows.len());
            prop_assert!(s.overcharged_minor >= 0);
            prop_assert!(s.undercharged_minor >= 0);
        }
    }
}
