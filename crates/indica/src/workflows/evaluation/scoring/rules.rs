use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use super::super::domain::CriterionScore;

const TOTAL_SCORE_DECIMALS: u32 = 2;

/// Decimal value of `value` as it is written (shortest round-trip form), so
/// `7.005` stays `7.005` instead of its binary neighbour. `None` when the
/// value does not fit `Decimal` without loss (magnitudes past ~7.9e28 or
/// more than 28 fractional digits).
fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    let decimal = Decimal::from_str(&value.to_string()).ok()?;
    (to_f64(decimal)? == value).then_some(decimal)
}

fn to_f64(value: Decimal) -> Option<f64> {
    value.to_string().parse().ok()
}

/// Running sums over the scored criteria of an evaluation.
///
/// The sums are kept exactly in `Decimal` while every operand fits, and in
/// `f64` alongside; `exact` is dropped as soon as one operand or partial sum
/// leaves the decimal range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WeightedSums {
    pub exact: Option<(Decimal, Decimal)>,
    pub score_sum: f64,
    pub weight_sum: f64,
    pub contributing: usize,
    pub skipped: usize,
}

impl WeightedSums {
    /// Weighted average rounded half-up to two decimals, or `None` when
    /// nothing carries weight yet.
    pub fn average(&self) -> Option<f64> {
        if let Some((score_sum, weight_sum)) = self.exact {
            if weight_sum <= Decimal::ZERO {
                return None;
            }
            if let Some(average) = score_sum.checked_div(weight_sum) {
                return to_f64(round_half_up(average, TOTAL_SCORE_DECIMALS));
            }
        }

        if self.weight_sum.is_nan() || self.weight_sum <= 0.0 {
            return None;
        }
        round_total(self.score_sum / self.weight_sum)
    }
}

pub(crate) fn weighted_sums(criteria: &[CriterionScore]) -> WeightedSums {
    let mut sums = WeightedSums {
        exact: Some((Decimal::ZERO, Decimal::ZERO)),
        score_sum: 0.0,
        weight_sum: 0.0,
        contributing: 0,
        skipped: 0,
    };

    for criterion in criteria {
        let Some(score) = criterion.score else {
            continue;
        };
        let weight = criterion.weight;
        if !score.is_finite() || !weight.is_finite() {
            sums.skipped += 1;
            continue;
        }

        sums.score_sum += score * weight;
        sums.weight_sum += weight;
        sums.contributing += 1;
        sums.exact = sums.exact.and_then(|(score_sum, weight_sum)| {
            let score = to_decimal(score)?;
            let weight = to_decimal(weight)?;
            let score_sum = score_sum.checked_add(score.checked_mul(weight)?)?;
            let weight_sum = weight_sum.checked_add(weight)?;
            Some((score_sum, weight_sum))
        });
    }

    sums
}

/// Round an `f64` average half-up to two decimals.
///
/// Values `Decimal` cannot hold exactly are either below the rounding unit
/// (and round to zero) or so large that their fractional part is already gone.
fn round_total(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    if let Some(decimal) = to_decimal(value) {
        return to_f64(round_half_up(decimal, TOTAL_SCORE_DECIMALS));
    }
    if value.abs() < 0.005 {
        return Some(0.0);
    }
    if value.abs() < 1e15 {
        // Too many significant digits for `Decimal`; round its string form.
        let rounded = Decimal::from_str(&format!("{value:.3}")).ok()?;
        return to_f64(round_half_up(rounded, TOTAL_SCORE_DECIMALS));
    }
    Some(value)
}

/// Half-up rounding (`7.005 -> 7.01`), matching fixed-point formatting.
pub fn round_half_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Mean of already-rounded totals, rounded the same way.
pub(crate) fn mean_total(totals: &[f64]) -> Option<f64> {
    if totals.is_empty() {
        return None;
    }

    let exact = totals.iter().try_fold(Decimal::ZERO, |sum, total| {
        sum.checked_add(to_decimal(*total)?)
    });
    match exact.and_then(|sum| sum.checked_div(Decimal::from(totals.len() as u64))) {
        Some(mean) => to_f64(round_half_up(mean, TOTAL_SCORE_DECIMALS)),
        None => round_total(totals.iter().sum::<f64>() / totals.len() as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::evaluation::domain::CriterionId;

    fn criterion(score: Option<f64>, weight: f64) -> CriterionScore {
        CriterionScore {
            criteria_id: CriterionId(format!("c-{weight}")),
            name: "Criterion".to_string(),
            score,
            weight,
            comments: String::new(),
        }
    }

    #[test]
    fn sums_ignore_unscored_entries() {
        let sums = weighted_sums(&[criterion(Some(8.0), 3.0), criterion(None, 5.0)]);
        assert_eq!(sums.exact, Some((Decimal::from(24), Decimal::from(3))));
        assert_eq!(sums.score_sum, 24.0);
        assert_eq!(sums.weight_sum, 3.0);
        assert_eq!(sums.contributing, 1);
        assert_eq!(sums.skipped, 0);
    }

    #[test]
    fn non_finite_values_are_skipped() {
        let sums = weighted_sums(&[criterion(Some(f64::NAN), 1.0), criterion(Some(4.0), 1.0)]);
        assert_eq!(sums.skipped, 1);
        assert_eq!(sums.average(), Some(4.0));
    }

    #[test]
    fn average_is_none_without_weight() {
        let sums = weighted_sums(&[criterion(None, 2.0)]);
        assert_eq!(sums.average(), None);
    }

    #[test]
    fn round_half_up_breaks_ties_upwards() {
        let value = Decimal::new(7005, 3);
        assert_eq!(round_half_up(value, 2), Decimal::new(701, 2));
        let value = Decimal::new(7125, 3);
        assert_eq!(round_half_up(value, 2), Decimal::new(713, 2));
    }

    #[test]
    fn mean_total_rounds_the_average() {
        assert_eq!(mean_total(&[7.0, 8.01]), Some(7.51));
        assert_eq!(mean_total(&[7.0, 8.25]), Some(7.63));
        assert_eq!(mean_total(&[]), None);
    }

    #[test]
    fn decimal_conversion_uses_written_form() {
        assert_eq!(to_decimal(7.005), Some(Decimal::new(7005, 3)));
        assert_eq!(to_decimal(f64::INFINITY), None);
        assert_eq!(to_decimal(1e29), None);
        assert_eq!(to_decimal(1e-30), None);
        assert_eq!(to_f64(Decimal::new(701, 2)), Some(7.01));
    }

    #[test]
    fn fractional_scores_tie_upwards() {
        // (7.01 + 7.00) / 2 = 7.005, which binary floats would round down
        let sums = weighted_sums(&[criterion(Some(7.01), 1.0), criterion(Some(7.0), 1.0)]);
        assert_eq!(sums.average(), Some(7.01));
    }

    #[test]
    fn huge_weights_fall_back_to_float_sums() {
        let sums = weighted_sums(&[criterion(Some(8.0), 1.0), criterion(Some(2.0), 1e29)]);
        assert_eq!(sums.exact, None);
        assert_eq!(sums.contributing, 2);
        assert_eq!(sums.average(), Some(2.0));
    }

    #[test]
    fn tiny_weights_still_contribute() {
        let sums = weighted_sums(&[criterion(Some(8.0), 1e-30)]);
        assert_eq!(sums.exact, None);
        assert_eq!(sums.average(), Some(8.0));
    }

    #[test]
    fn float_totals_round_half_up() {
        assert_eq!(round_total(1e-12), Some(0.0));
        assert_eq!(round_total(6.666666666666667), Some(6.67));
        assert_eq!(round_total(f64::NAN), None);
        assert_eq!(round_total(1e30), Some(1e30));
    }
}
