use crate::model::DiscrepancyClass;

/// Compare billed against expected. Returns `billed - expected` and its class.
///
/// With `tolerance_minor == 0` (the default) only an exact match is Correct.
/// A positive tolerance widens Correct to `|difference| <= tolerance`.
pub fn classify(billed_minor: i64, expected_minor: i64, tolerance_minor: i64) -> (i64, DiscrepancyClass) {
    let difference = billed_minor.saturating_sub(expected_minor);
    (difference, class_for_difference(difference, tolerance_minor))
}

pub fn class_for_difference(difference_minor: i64, tolerance_minor: i64) -> DiscrepancyClass {
    if difference_minor.unsigned_abs() <= tolerance_minor.max(0).unsigned_abs() {
        DiscrepancyClass::Correct
    } else if difference_minor > 0 {
        DiscrepancyClass::Overcharged
    } else {
        DiscrepancyClass::Undercharged
    }
}
