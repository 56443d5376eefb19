//! SWIP wellness scoring.
//!
//! An additive point system around a baseline of 50. It is a heuristic, not a
//! statistically validated model. The thresholds, caps and emotion vocabulary
//! are fixed so scores stay comparable with everything already stored.

use crate::models::ingest::Metrics;

const BASELINE: f64 = 50.0;

const RMSSD_HIGH_MS: f64 = 40.0;
const RMSSD_LOW_MS: f64 = 20.0;
const RMSSD_BONUS_RATE: f64 = 0.5;
const RMSSD_BONUS_CAP: f64 = 25.0;
const RMSSD_PENALTY_RATE: f64 = 0.3;
const RMSSD_PENALTY_CAP: f64 = 15.0;

const SDNN_HIGH_MS: f64 = 50.0;
const SDNN_LOW_MS: f64 = 30.0;
const SDNN_BONUS_RATE: f64 = 0.3;
const SDNN_BONUS_CAP: f64 = 20.0;
const SDNN_PENALTY_RATE: f64 = 0.2;
const SDNN_PENALTY_CAP: f64 = 10.0;

const VARIABILITY_CV_THRESHOLD: f64 = 0.1;
const VARIABILITY_BONUS: f64 = 5.0;

/// Compute the SWIP score (0-100) for one session.
///
/// # Factors
/// - RMSSD (parasympathetic marker): bonus above 40ms, penalty below 20ms
/// - SDNN (overall variability): bonus above 50ms, penalty below 30ms
/// - Emotion label: fixed deltas for a small vocabulary
/// - Raw HR and RR series: +5 when both vary by more than 10%
///
/// Absent inputs contribute nothing. The result is clamped, then rounded.
pub fn compute_score(metrics: &Metrics) -> u8 {
    let mut score = BASELINE;

    if let Some(rmssd) = metrics.rmssd() {
        score += band_adjustment(
            rmssd,
            Band {
                high: RMSSD_HIGH_MS,
                low: RMSSD_LOW_MS,
                bonus_rate: RMSSD_BONUS_RATE,
                bonus_cap: RMSSD_BONUS_CAP,
                penalty_rate: RMSSD_PENALTY_RATE,
                penalty_cap: RMSSD_PENALTY_CAP,
            },
        );
    }

    if let Some(sdnn) = metrics.sdnn() {
        score += band_adjustment(
            sdnn,
            Band {
                high: SDNN_HIGH_MS,
                low: SDNN_LOW_MS,
                bonus_rate: SDNN_BONUS_RATE,
                bonus_cap: SDNN_BONUS_CAP,
                penalty_rate: SDNN_PENALTY_RATE,
                penalty_cap: SDNN_PENALTY_CAP,
            },
        );
    }

    if let Some(emotion) = metrics.emotion.as_deref() {
        score += emotion_adjustment(emotion);
    }

    if let (Some(hr), Some(rr)) = (metrics.hr.as_deref(), metrics.rr.as_deref()) {
        let hr_cv = coefficient_of_variation(hr);
        let rr_cv = coefficient_of_variation(rr);
        if let (Some(hr_cv), Some(rr_cv)) = (hr_cv, rr_cv) {
            if hr_cv > VARIABILITY_CV_THRESHOLD && rr_cv > VARIABILITY_CV_THRESHOLD {
                score += VARIABILITY_BONUS;
            }
        }
    }

    score.clamp(0.0, 100.0).round() as u8
}

/// Healthy/unhealthy thresholds of one HRV statistic.
struct Band {
    high: f64,
    low: f64,
    bonus_rate: f64,
    bonus_cap: f64,
    penalty_rate: f64,
    penalty_cap: f64,
}

fn band_adjustment(value: f64, band: Band) -> f64 {
    if value > band.high {
        ((value - band.high) * band.bonus_rate).min(band.bonus_cap)
    } else if value < band.low {
        -((band.low - value) * band.penalty_rate).min(band.penalty_cap)
    } else {
        0.0
    }
}

/// Fixed deltas for the known labels; anything else is neutral.
fn emotion_adjustment(label: &str) -> f64 {
    match label.trim().to_lowercase().as_str() {
        "calm" | "relaxed" | "peaceful" => 10.0,
        "focused" | "concentrated" => 5.0,
        "excited" | "energetic" => 3.0,
        "tired" | "exhausted" => -5.0,
        "stressed" | "anxious" | "tense" => -15.0,
        _ => 0.0,
    }
}

/// Population standard deviation over mean. `None` for an empty series or a
/// non-positive mean.
fn coefficient_of_variation(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return None;
    }
    let variance = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() / mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ingest::Hrv;

    fn metrics(rmssd: Option<f64>, sdnn: Option<f64>, emotion: Option<&str>) -> Metrics {
        Metrics {
            hrv: Some(Hrv { sdnn, rmssd }),
            emotion: emotion.map(str::to_string),
            ..Metrics::default()
        }
    }

    #[test]
    fn test_empty_metrics_score_baseline() {
        assert_eq!(compute_score(&Metrics::default()), 50);
    }

    #[test]
    fn test_calm_session_with_good_hrv() {
        // 50 + min(10*0.5, 25) + min(10*0.3, 20) + 10
        let m = metrics(Some(50.0), Some(60.0), Some("calm"));
        assert_eq!(compute_score(&m), 68);
    }

    #[test]
    fn test_stressed_without_hrv() {
        let m = Metrics {
            emotion: Some("stressed".to_string()),
            ..Metrics::default()
        };
        assert_eq!(compute_score(&m), 35);
    }

    #[test]
    fn test_low_rmssd_penalty() {
        // 50 - min(10*0.3, 15)
        let m = metrics(Some(10.0), None, None);
        assert_eq!(compute_score(&m), 47);
    }

    #[test]
    fn test_zero_rmssd_is_not_absent() {
        let m = metrics(Some(0.0), None, None);
        assert_eq!(compute_score(&m), 44);
    }

    #[test]
    fn test_penalties_accumulate() {
        // 50 - 20*0.3 - 30*0.2 - 15
        let m = metrics(Some(0.0), Some(0.0), Some("anxious"));
        assert_eq!(compute_score(&m), 23);
    }

    #[test]
    fn test_low_sdnn_penalty() {
        // 50 - min((30-20)*0.2, 10)
        let m = metrics(None, Some(20.0), None);
        assert_eq!(compute_score(&m), 48);
    }

    #[test]
    fn test_values_inside_band_are_neutral() {
        let m = metrics(Some(30.0), Some(40.0), None);
        assert_eq!(compute_score(&m), 50);
    }

    #[test]
    fn test_score_is_clamped_to_100() {
        let m = Metrics {
            hr: Some(vec![60.0, 80.0]),
            rr: Some(vec![0.8, 1.0]),
            hrv: Some(Hrv {
                sdnn: Some(200.0),
                rmssd: Some(200.0),
            }),
            emotion: Some("calm".to_string()),
            timestamp: None,
        };
        assert_eq!(compute_score(&m), 100);
    }

    #[test]
    fn test_emotion_is_case_insensitive() {
        let m = metrics(None, None, Some("  Relaxed "));
        assert_eq!(compute_score(&m), 60);

        let m = metrics(None, None, Some("EXHAUSTED"));
        assert_eq!(compute_score(&m), 45);
    }

    #[test]
    fn test_unknown_emotion_is_neutral() {
        let m = metrics(None, None, Some("melancholic"));
        assert_eq!(compute_score(&m), 50);
    }

    #[test]
    fn test_joint_variability_bonus() {
        // hr: mean 70, sd 10 (cv 0.14); rr: mean 0.9, sd 0.1 (cv 0.11)
        let m = Metrics {
            hr: Some(vec![60.0, 80.0]),
            rr: Some(vec![0.8, 1.0]),
            ..Metrics::default()
        };
        assert_eq!(compute_score(&m), 55);
    }

    #[test]
    fn test_variability_bonus_needs_both_series() {
        let hr_only = Metrics {
            hr: Some(vec![60.0, 80.0]),
            ..Metrics::default()
        };
        assert_eq!(compute_score(&hr_only), 50);

        let flat_rr = Metrics {
            hr: Some(vec![60.0, 80.0]),
            rr: Some(vec![1000.0, 1010.0]),
            ..Metrics::default()
        };
        assert_eq!(compute_score(&flat_rr), 50);
    }

    #[test]
    fn test_empty_series_give_no_bonus() {
        let m = Metrics {
            hr: Some(vec![]),
            rr: Some(vec![]),
            ..Metrics::default()
        };
        assert_eq!(compute_score(&m), 50);
    }

    #[test]
    fn test_half_points_round_up() {
        // 50 + (41-40)*0.5 = 50.5
        let m = metrics(Some(41.0), None, None);
        assert_eq!(compute_score(&m), 51);
    }

    #[test]
    fn test_score_is_deterministic_and_bounded() {
        let emotions = [None, Some("calm"), Some("tense"), Some("focused"), Some("??")];
        for rmssd in [None, Some(0.0), Some(15.0), Some(35.0), Some(90.0), Some(500.0)] {
            for sdnn in [None, Some(0.0), Some(25.0), Some(45.0), Some(120.0)] {
                for emotion in emotions {
                    let m = metrics(rmssd, sdnn, emotion);
                    let first = compute_score(&m);
                    assert!(first <= 100);
                    assert_eq!(first, compute_score(&m));
                }
            }
        }
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(coefficient_of_variation(&[]), None);
        assert_eq!(coefficient_of_variation(&[5.0, 5.0]), Some(0.0));
        let cv = coefficient_of_variation(&[60.0, 80.0]).unwrap();
        assert!((cv - 10.0 / 70.0).abs() < 1e-12);
    }
}
