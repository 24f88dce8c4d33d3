//! Group aggregation: reduce raw per-trial voltages to one robust
//! representative value per (wavelength, concentration) pair.
//!
//! The trimming rule, in order:
//!
//! 1. sort the group's readings in descending order
//! 2. retain the top `cap` readings (all of them when the group is smaller)
//! 3. compute Q1/Q3 of the retained set by linear-interpolation percentile
//! 4. fence at `[Q1 − 1.5·IQR, Q3 + 1.5·IQR]` and drop readings strictly
//!    outside
//! 5. average the survivors
//!
//! The top-cap window comes *before* the IQR fences, so readings below the
//! window are dropped unconditionally while extremes inside the window are
//! dropped symmetrically. Saturation spikes and in-window dropouts are
//! rejected; low-ranked readings never are. Step order is load-bearing and
//! must not be rearranged.

use std::collections::HashMap;

use crate::domain::{GroupSkipReason, Observation, SeriesPoint, SkippedGroup, WavelengthSeries};
use crate::math::{mean, percentile};

/// Expected number of replicate samples per (wavelength, concentration)
/// condition; readings ranked below this never enter the aggregate.
pub const REPLICATE_CAP: usize = 150;

/// Outcome of trimming one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trimmed {
    /// Mean of the surviving readings.
    pub value: f64,
    /// Raw readings in the group.
    pub raw: usize,
    /// Readings inside the top-cap window.
    pub capped: usize,
    /// Readings that also survived the IQR fences.
    pub kept: usize,
}

/// Trim a group of raw voltage readings to its representative value.
///
/// Returns `None` for an empty group, or if the fences reject every retained
/// reading. A group of size 1 always survives: Q1 = Q3 = the value, the IQR is
/// zero, and the value sits exactly on both fences.
pub fn trim_group(readings: &[f64], cap: usize) -> Option<Trimmed> {
    if readings.is_empty() {
        return None;
    }

    let mut retained: Vec<f64> = readings.to_vec();
    retained.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    retained.truncate(cap);

    // Percentile interpolation wants ascending order; the retained window is
    // descending, so reversing is enough.
    let mut ascending = retained.clone();
    ascending.reverse();

    let q1 = percentile(&ascending, 25.0)?;
    let q3 = percentile(&ascending, 75.0)?;
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    let survivors: Vec<f64> = retained
        .iter()
        .copied()
        .filter(|v| *v >= lower && *v <= upper)
        .collect();

    let rejected = retained.len() - survivors.len();
    if rejected > 0 {
        let outliers: Vec<f64> = retained
            .iter()
            .copied()
            .filter(|v| *v < lower || *v > upper)
            .collect();
        log::debug!("rejected {rejected} outlier reading(s) outside [{lower:.3}, {upper:.3}]: {outliers:?}");
    }

    let value = mean(&survivors)?;
    Some(Trimmed {
        value,
        raw: readings.len(),
        capped: retained.len(),
        kept: survivors.len(),
    })
}

/// Partition observations into per-wavelength series of representative values.
///
/// Wavelengths keep their first-encounter order; every wavelength iterates the
/// global concentration list (also first-encounter order), so series share a
/// common concentration axis. Pairs with no readings, and pairs whose readings
/// were all rejected, are skipped and reported.
pub fn build_series(
    observations: &[Observation],
    cap: usize,
) -> (Vec<WavelengthSeries>, Vec<SkippedGroup>) {
    let mut wavelengths: Vec<f64> = Vec::new();
    let mut concentrations: Vec<f64> = Vec::new();
    let mut groups: HashMap<(u64, u64), Vec<f64>> = HashMap::new();

    for obs in observations {
        if !wavelengths.contains(&obs.wavelength) {
            wavelengths.push(obs.wavelength);
        }
        if !concentrations.contains(&obs.concentration) {
            concentrations.push(obs.concentration);
        }
        groups
            .entry((obs.wavelength.to_bits(), obs.concentration.to_bits()))
            .or_default()
            .push(obs.voltage);
    }

    let mut series = Vec::with_capacity(wavelengths.len());
    let mut skipped = Vec::new();

    for &wavelength in &wavelengths {
        let mut points = Vec::with_capacity(concentrations.len());
        for &concentration in &concentrations {
            let Some(readings) = groups.get(&(wavelength.to_bits(), concentration.to_bits()))
            else {
                skipped.push(SkippedGroup {
                    wavelength,
                    concentration,
                    reason: GroupSkipReason::Empty,
                });
                continue;
            };

            match trim_group(readings, cap) {
                Some(trimmed) => {
                    log::info!(
                        "wavelength {} nm, {concentration} mg/dL: {} of {} reading(s) kept, mean {:.2} uV",
                        crate::domain::wavelength_label(wavelength),
                        trimmed.kept,
                        trimmed.raw,
                        trimmed.value
                    );
                    points.push(SeriesPoint {
                        concentration,
                        voltage: trimmed.value,
                        raw: trimmed.raw,
                        kept: trimmed.kept,
                    });
                }
                None => skipped.push(SkippedGroup {
                    wavelength,
                    concentration,
                    reason: GroupSkipReason::AllOutliers,
                }),
            }
        }
        series.push(WavelengthSeries { wavelength, points });
    }

    (series, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn small_clean_group_averages_everything() {
        let readings = [4.0, 2.0, 3.0, 1.0, 5.0];
        let t = trim_group(&readings, REPLICATE_CAP).unwrap();
        assert_relative_eq!(t.value, 3.0);
        assert_eq!(t.kept, 5);
        assert_eq!(t.capped, 5);
    }

    #[test]
    fn single_reading_survives_collapsed_fences() {
        let t = trim_group(&[42.5], REPLICATE_CAP).unwrap();
        assert_relative_eq!(t.value, 42.5);
        assert_eq!(t.kept, 1);
    }

    #[test]
    fn identical_readings_are_not_outliers() {
        // IQR = 0, fences collapse onto the value itself.
        let t = trim_group(&[7.0; 20], REPLICATE_CAP).unwrap();
        assert_relative_eq!(t.value, 7.0);
        assert_eq!(t.kept, 20);
    }

    #[test]
    fn saturation_spike_is_rejected() {
        let t = trim_group(&[10.0, 10.0, 10.0, 10.0, 1000.0], REPLICATE_CAP).unwrap();
        assert_relative_eq!(t.value, 10.0);
        assert_eq!(t.kept, 4);
        assert_eq!(t.capped, 5);
    }

    #[test]
    fn readings_below_the_cap_window_never_contribute() {
        // 1..=200: the window keeps 51..=200 and the fences are wide enough to
        // keep all of them, so the mean is over 51..=200 only.
        let readings: Vec<f64> = (1..=200).map(f64::from).collect();
        let t = trim_group(&readings, 150).unwrap();
        assert_relative_eq!(t.value, 125.5);
        assert_eq!(t.capped, 150);
        assert_eq!(t.kept, 150);

        // Perturbing readings outside the window does not change the result.
        let mut perturbed = readings.clone();
        for v in perturbed.iter_mut().take(50) {
            *v -= 1000.0;
        }
        let t2 = trim_group(&perturbed, 150).unwrap();
        assert_relative_eq!(t.value, t2.value);
    }

    #[test]
    fn result_is_independent_of_arrival_order() {
        let readings = [3.0, 9.5, 1.0, 120.0, 4.0, 4.0, 2.5, 8.0];
        let mut reversed: Vec<f64> = readings.to_vec();
        reversed.reverse();
        let mut interleaved: Vec<f64> = Vec::new();
        for i in 0..readings.len() / 2 {
            interleaved.push(readings[i]);
            interleaved.push(readings[readings.len() - 1 - i]);
        }

        let a = trim_group(&readings, REPLICATE_CAP).unwrap();
        let b = trim_group(&reversed, REPLICATE_CAP).unwrap();
        let c = trim_group(&interleaved, REPLICATE_CAP).unwrap();
        assert_relative_eq!(a.value, b.value);
        assert_relative_eq!(a.value, c.value);
    }

    #[test]
    fn empty_group_yields_nothing() {
        assert!(trim_group(&[], REPLICATE_CAP).is_none());
    }

    fn obs(wavelength: f64, concentration: f64, voltage: f64) -> Observation {
        Observation {
            wavelength,
            concentration,
            voltage,
        }
    }

    #[test]
    fn series_preserve_first_encounter_order() {
        let observations = vec![
            obs(1550.0, 40.0, 10.0),
            obs(940.0, 40.0, 20.0),
            obs(1550.0, 0.0, 5.0),
            obs(940.0, 0.0, 6.0),
        ];
        let (series, skipped) = build_series(&observations, REPLICATE_CAP);

        assert!(skipped.is_empty());
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].wavelength, 1550.0);
        assert_eq!(series[1].wavelength, 940.0);
        // Concentration axis follows global first-encounter order: 40 before 0.
        assert_eq!(series[0].concentrations(), vec![40.0, 0.0]);
        assert_eq!(series[1].concentrations(), vec![40.0, 0.0]);
    }

    #[test]
    fn missing_pairs_are_skipped_not_fatal() {
        let observations = vec![
            obs(940.0, 0.0, 1.0),
            obs(940.0, 10.0, 2.0),
            obs(1610.0, 10.0, 3.0),
        ];
        let (series, skipped) = build_series(&observations, REPLICATE_CAP);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].points.len(), 2);
        assert_eq!(series[1].points.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].wavelength, 1610.0);
        assert_eq!(skipped[0].concentration, 0.0);
        assert_eq!(skipped[0].reason, GroupSkipReason::Empty);
    }

    #[test]
    fn series_points_carry_reading_counts() {
        let mut observations = vec![obs(940.0, 20.0, 50.0); 6];
        observations.push(obs(940.0, 20.0, 5000.0));
        let (series, _) = build_series(&observations, REPLICATE_CAP);

        let point = &series[0].points[0];
        assert_eq!(point.raw, 7);
        assert_eq!(point.kept, 6);
        assert_relative_eq!(point.voltage, 50.0);
    }
}
