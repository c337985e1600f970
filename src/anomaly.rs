//! Vitals anomaly classification and patient status resolution.
//!
//! Both functions are pure: a reading maps to an ordered set of alert
//! candidates, and a candidate set plus the current status maps to the new
//! status. All persistence happens in the ingestion pipeline.

use crate::config::AnomalyThresholds;
use crate::models::{PatientStatus, Severity, VitalsReading};

/// An alert the classifier proposes for a single vital. Becomes a persisted
/// `Alert` once the pipeline writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

/// Classify one reading against fixed physiological thresholds. Each vital
/// is evaluated independently, so several alerts may fire from one reading;
/// a missing field contributes nothing. Candidate order follows the field
/// order of the reading and is stable for identical input.
pub fn classify_reading(
    reading: &VitalsReading,
    thresholds: &AnomalyThresholds,
) -> Vec<AlertCandidate> {
    let mut candidates = Vec::new();

    if let Some(candidate) = check_heart_rate(reading.heart_rate, thresholds) {
        candidates.push(candidate);
    }
    if let Some(candidate) = check_blood_pressure(
        reading.blood_pressure_systolic,
        reading.blood_pressure_diastolic,
        thresholds,
    ) {
        candidates.push(candidate);
    }
    if let Some(candidate) = check_oxygen(reading.oxygen_level, thresholds) {
        candidates.push(candidate);
    }
    if let Some(candidate) = check_temperature(reading.temperature, thresholds) {
        candidates.push(candidate);
    }
    if let Some(candidate) = check_glucose(reading.glucose, thresholds) {
        candidates.push(candidate);
    }

    candidates
}

/// Resolve the patient status from the candidates of one processing pass.
/// High always wins over a simultaneous Medium; a Medium never downgrades
/// an already-critical patient; an empty set leaves the status unchanged.
pub fn resolve_status(current: PatientStatus, candidates: &[AlertCandidate]) -> PatientStatus {
    let worst = candidates.iter().map(|c| c.severity).max();
    match worst {
        Some(Severity::High) => PatientStatus::Critical,
        Some(Severity::Medium) if current != PatientStatus::Critical => PatientStatus::Warning,
        _ => current,
    }
}

fn check_heart_rate(value: Option<f64>, t: &AnomalyThresholds) -> Option<AlertCandidate> {
    let hr = value?;
    if hr > t.heart_rate_high {
        let severity = if hr > t.heart_rate_severe_high {
            Severity::High
        } else {
            Severity::Medium
        };
        return Some(AlertCandidate {
            severity,
            title: "High Heart Rate".to_string(),
            message: format!("Heart rate of {hr:.0} bpm is above the normal range"),
        });
    }
    if hr < t.heart_rate_low {
        let severity = if hr < t.heart_rate_severe_low {
            Severity::High
        } else {
            Severity::Medium
        };
        return Some(AlertCandidate {
            severity,
            title: "Low Heart Rate".to_string(),
            message: format!("Heart rate of {hr:.0} bpm is below the normal range"),
        });
    }
    None
}

fn check_blood_pressure(
    systolic: Option<f64>,
    diastolic: Option<f64>,
    t: &AnomalyThresholds,
) -> Option<AlertCandidate> {
    let sys_high = systolic.is_some_and(|v| v > t.systolic_high);
    let dia_high = diastolic.is_some_and(|v| v > t.diastolic_high);
    if sys_high || dia_high {
        let severity = if systolic.is_some_and(|v| v > t.systolic_severe_high) {
            Severity::High
        } else {
            Severity::Medium
        };
        return Some(AlertCandidate {
            severity,
            title: "High Blood Pressure".to_string(),
            message: format!(
                "Blood pressure {}/{} mmHg is elevated",
                format_bp(systolic),
                format_bp(diastolic)
            ),
        });
    }

    let sys_low = systolic.is_some_and(|v| v < t.systolic_low);
    let dia_low = diastolic.is_some_and(|v| v < t.diastolic_low);
    if sys_low || dia_low {
        return Some(AlertCandidate {
            severity: Severity::Medium,
            title: "Low Blood Pressure".to_string(),
            message: format!(
                "Blood pressure {}/{} mmHg is below the normal range",
                format_bp(systolic),
                format_bp(diastolic)
            ),
        });
    }
    None
}

fn check_oxygen(value: Option<f64>, t: &AnomalyThresholds) -> Option<AlertCandidate> {
    let spo2 = value?;
    if spo2 < t.oxygen_low {
        let severity = if spo2 < t.oxygen_severe_low {
            Severity::High
        } else {
            Severity::Medium
        };
        return Some(AlertCandidate {
            severity,
            title: "Low Oxygen Saturation".to_string(),
            message: format!("Oxygen saturation of {spo2:.0}% is below the normal range"),
        });
    }
    None
}

fn check_temperature(value: Option<f64>, t: &AnomalyThresholds) -> Option<AlertCandidate> {
    let temp = value?;
    if temp > t.temperature_high {
        let severity = if temp > t.temperature_severe_high {
            Severity::High
        } else {
            Severity::Medium
        };
        return Some(AlertCandidate {
            severity,
            title: "High Temperature".to_string(),
            message: format!("Body temperature of {temp:.1} C indicates fever"),
        });
    }
    if temp < t.temperature_low {
        return Some(AlertCandidate {
            severity: Severity::Medium,
            title: "Low Temperature".to_string(),
            message: format!("Body temperature of {temp:.1} C is below the normal range"),
        });
    }
    None
}

fn check_glucose(value: Option<f64>, t: &AnomalyThresholds) -> Option<AlertCandidate> {
    let glucose = value?;
    if glucose > t.glucose_high {
        let severity = if glucose > t.glucose_severe_high {
            Severity::High
        } else {
            Severity::Medium
        };
        return Some(AlertCandidate {
            severity,
            title: "High Blood Glucose".to_string(),
            message: format!("Glucose level of {glucose:.0} mg/dL is above the normal range"),
        });
    }
    if glucose < t.glucose_low {
        let severity = if glucose < t.glucose_severe_low {
            Severity::High
        } else {
            Severity::Medium
        };
        return Some(AlertCandidate {
            severity,
            title: "Low Blood Glucose".to_string(),
            message: format!("Glucose level of {glucose:.0} mg/dL is below the normal range"),
        });
    }
    None
}

fn format_bp(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.0}"),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading() -> VitalsReading {
        VitalsReading {
            heart_rate: None,
            blood_pressure_systolic: None,
            blood_pressure_diastolic: None,
            oxygen_level: None,
            temperature: None,
            glucose: None,
            respiration: None,
            recorded_at: Utc::now(),
            device_id: "test-device".to_string(),
        }
    }

    #[test]
    fn empty_reading_yields_no_candidates() {
        let candidates = classify_reading(&reading(), &AnomalyThresholds::default());
        assert!(candidates.is_empty());
    }

    #[test]
    fn tachycardia_is_a_single_high_alert() {
        let mut r = reading();
        r.heart_rate = Some(125.0);
        let candidates = classify_reading(&r, &AnomalyThresholds::default());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "High Heart Rate");
        assert_eq!(candidates[0].severity, Severity::High);
    }

    #[test]
    fn mildly_elevated_heart_rate_is_medium() {
        let mut r = reading();
        r.heart_rate = Some(105.0);
        let candidates = classify_reading(&r, &AnomalyThresholds::default());
        assert_eq!(candidates[0].severity, Severity::Medium);
    }

    #[test]
    fn boundary_values_raise_nothing() {
        // Comparisons are strict, so readings exactly on a threshold pass.
        for hr in [100.0, 60.0] {
            let mut r = reading();
            r.heart_rate = Some(hr);
            assert!(classify_reading(&r, &AnomalyThresholds::default()).is_empty());
        }
        let mut r = reading();
        r.oxygen_level = Some(95.0);
        assert!(classify_reading(&r, &AnomalyThresholds::default()).is_empty());
    }

    #[test]
    fn mild_hypoxia_is_medium() {
        let mut r = reading();
        r.oxygen_level = Some(93.0);
        let candidates = classify_reading(&r, &AnomalyThresholds::default());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Low Oxygen Saturation");
        assert_eq!(candidates[0].severity, Severity::Medium);
    }

    #[test]
    fn severe_hypoxia_reclassifies_to_high() {
        let mut r = reading();
        r.oxygen_level = Some(88.0);
        let candidates = classify_reading(&r, &AnomalyThresholds::default());
        assert_eq!(candidates[0].severity, Severity::High);
    }

    #[test]
    fn hypertensive_reading_severity_depends_on_systolic() {
        let mut r = reading();
        r.blood_pressure_systolic = Some(150.0);
        r.blood_pressure_diastolic = Some(95.0);
        let candidates = classify_reading(&r, &AnomalyThresholds::default());
        assert_eq!(candidates[0].severity, Severity::Medium);

        r.blood_pressure_systolic = Some(165.0);
        let candidates = classify_reading(&r, &AnomalyThresholds::default());
        assert_eq!(candidates[0].severity, Severity::High);
    }

    #[test]
    fn diastolic_alone_can_flag_blood_pressure() {
        let mut r = reading();
        r.blood_pressure_diastolic = Some(92.0);
        let candidates = classify_reading(&r, &AnomalyThresholds::default());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "High Blood Pressure");
    }

    #[test]
    fn glucose_extremes_reclassify_to_high() {
        let mut r = reading();
        r.glucose = Some(260.0);
        let candidates = classify_reading(&r, &AnomalyThresholds::default());
        assert_eq!(candidates[0].severity, Severity::High);

        r.glucose = Some(50.0);
        let candidates = classify_reading(&r, &AnomalyThresholds::default());
        assert_eq!(candidates[0].title, "Low Blood Glucose");
        assert_eq!(candidates[0].severity, Severity::High);
    }

    #[test]
    fn fever_tiers() {
        let mut r = reading();
        r.temperature = Some(38.0);
        assert_eq!(
            classify_reading(&r, &AnomalyThresholds::default())[0].severity,
            Severity::Medium
        );
        r.temperature = Some(39.2);
        assert_eq!(
            classify_reading(&r, &AnomalyThresholds::default())[0].severity,
            Severity::High
        );
    }

    #[test]
    fn multiple_vitals_fire_independently_in_stable_order() {
        let mut r = reading();
        r.heart_rate = Some(130.0);
        r.oxygen_level = Some(93.0);
        r.glucose = Some(200.0);
        let thresholds = AnomalyThresholds::default();
        let first = classify_reading(&r, &thresholds);
        let second = classify_reading(&r, &thresholds);
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert_eq!(first[0].title, "High Heart Rate");
        assert_eq!(first[1].title, "Low Oxygen Saturation");
        assert_eq!(first[2].title, "High Blood Glucose");
    }

    #[test]
    fn respiration_has_no_thresholds() {
        let mut r = reading();
        r.respiration = Some(40.0);
        assert!(classify_reading(&r, &AnomalyThresholds::default()).is_empty());
    }

    #[test]
    fn high_candidate_forces_critical() {
        let candidates = vec![
            AlertCandidate {
                severity: Severity::Medium,
                title: "Low Oxygen Saturation".to_string(),
                message: String::new(),
            },
            AlertCandidate {
                severity: Severity::High,
                title: "High Heart Rate".to_string(),
                message: String::new(),
            },
        ];
        assert_eq!(
            resolve_status(PatientStatus::Stable, &candidates),
            PatientStatus::Critical
        );
    }

    #[test]
    fn medium_never_downgrades_critical() {
        let candidates = vec![AlertCandidate {
            severity: Severity::Medium,
            title: "Low Oxygen Saturation".to_string(),
            message: String::new(),
        }];
        assert_eq!(
            resolve_status(PatientStatus::Critical, &candidates),
            PatientStatus::Critical
        );
        assert_eq!(
            resolve_status(PatientStatus::Stable, &candidates),
            PatientStatus::Warning
        );
    }

    #[test]
    fn no_candidates_leaves_status_unchanged() {
        assert_eq!(
            resolve_status(PatientStatus::Warning, &[]),
            PatientStatus::Warning
        );
    }
}
