//! Care-team candidate scoring.
//!
//! Two strategies share this module: the full additive scorer used by
//! assignment requests, and the lighter-weight doctor search used by manual
//! escalation. Keeping both here makes the intentional difference in
//! weighting visible in one place.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{ScoringWeights, DEFAULT_MAX_PATIENTS};
use crate::error::{CareError, CareResult};
use crate::models::{Availability, CareProvider, CareRole, ProviderWorkload, Urgency};

/// Specializations and the condition keywords they cover. Generalists carry
/// an empty list and match any condition.
const SPECIALIZATION_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "cardiology",
        &[
            "heart",
            "cardiac",
            "hypertension",
            "blood pressure",
            "arrhythmia",
            "cholesterol",
        ],
    ),
    (
        "endocrinology",
        &["diabetes", "thyroid", "glucose", "insulin", "hormone"],
    ),
    (
        "pulmonology",
        &["asthma", "copd", "lung", "respiratory", "bronchitis"],
    ),
    ("nephrology", &["kidney", "renal", "dialysis"]),
    (
        "neurology",
        &["seizure", "epilepsy", "migraine", "stroke", "parkinson", "alzheimer"],
    ),
    (
        "gastroenterology",
        &["reflux", "gerd", "crohn", "colitis", "liver", "ibs"],
    ),
    ("rheumatology", &["arthritis", "lupus", "rheumatoid", "gout"]),
    ("oncology", &["cancer", "tumor", "lymphoma", "leukemia"]),
    (
        "psychiatry",
        &["depression", "anxiety", "bipolar", "ptsd", "schizophrenia"],
    ),
    ("family medicine", &[]),
    ("internal medicine", &[]),
];

/// What the scorer knows about the patient side of the match.
#[derive(Debug, Clone, Default)]
pub struct PatientProfile {
    pub chronic_conditions: Vec<String>,
    pub preferred_specialization: Option<String>,
}

/// Per-factor breakdown persisted with the assignment so the choice stays
/// auditable. Role-specific factors are absent for the other role.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreFactors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<SpecializationFactor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certification: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_tier: Option<f64>,
    pub availability: f64,
    pub workload: f64,
    pub experience: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecializationFactor {
    pub points: f64,
    pub matched_conditions: Vec<String>,
    pub preferred_bonus: f64,
}

/// Written to the patient record at assignment time; overwritten whenever
/// the patient is reassigned.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentReason {
    pub score: f64,
    pub role: String,
    pub factors: ScoreFactors,
    pub assigned_by: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub provider: CareProvider,
    pub current_patients: i64,
    pub score: f64,
    pub factors: ScoreFactors,
}

/// Score and sort the candidate pool, best first. Ties on total score break
/// by ascending provider id so repeated calls over an unchanged pool select
/// the same candidate.
pub fn rank_candidates(
    pool: &[ProviderWorkload],
    profile: &PatientProfile,
    urgency: Urgency,
    weights: &ScoringWeights,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = pool
        .iter()
        .map(|entry| {
            let (score, factors) = score_provider(entry, profile, urgency, weights);
            RankedCandidate {
                provider: entry.provider.clone(),
                current_patients: entry.current_patients,
                score,
                factors,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.provider.id.cmp(&b.provider.id))
    });
    ranked
}

/// The top of the ranking, or `NoSuitableCandidate` when the pool is empty
/// or nobody scored above zero.
pub fn select_top(ranked: &[RankedCandidate], role: CareRole) -> CareResult<&RankedCandidate> {
    match ranked.first() {
        Some(top) if top.score > 0.0 => Ok(top),
        _ => Err(CareError::NoSuitableCandidate(role)),
    }
}

fn score_provider(
    entry: &ProviderWorkload,
    profile: &PatientProfile,
    urgency: Urgency,
    weights: &ScoringWeights,
) -> (f64, ScoreFactors) {
    let provider = &entry.provider;
    let mut total = 0.0;

    let mut specialization = None;
    let mut certification = None;
    let mut experience_tier = None;

    match provider.role {
        CareRole::Doctor => {
            let field = provider.specialization.as_deref().unwrap_or("");
            let (points, matched) =
                specialization_match(field, &profile.chronic_conditions, weights);
            let preferred_bonus = match profile.preferred_specialization.as_deref() {
                Some(preferred) if contains_ci(field, preferred) => {
                    weights.preferred_specialization
                }
                _ => 0.0,
            };
            total += points + preferred_bonus;
            specialization = Some(SpecializationFactor {
                points,
                matched_conditions: matched,
                preferred_bonus,
            });
        }
        CareRole::Caretaker => {
            let cert = if provider.certified.unwrap_or(false) {
                weights.certification
            } else {
                0.0
            };
            let years = provider.experience();
            let tier = if years >= 5 {
                weights.experience_tier_senior
            } else if years >= 2 {
                weights.experience_tier_mid
            } else {
                0.0
            };
            total += cert + tier;
            certification = Some(cert);
            experience_tier = Some(tier);
        }
    }

    let availability = match provider.availability {
        Availability::Available => weights.availability_available,
        Availability::Busy if urgency == Urgency::Urgent => weights.availability_busy_urgent,
        _ => 0.0,
    };

    let capacity = if provider.max_patients > 0 {
        provider.max_patients
    } else {
        DEFAULT_MAX_PATIENTS
    } as f64;
    let workload = (weights.workload_max
        - (entry.current_patients as f64 / capacity) * weights.workload_max)
        .max(0.0);

    let experience = (provider.experience() as f64 * weights.experience_per_year)
        .min(weights.experience_cap);

    total += availability + workload + experience;

    (
        total,
        ScoreFactors {
            specialization,
            certification,
            experience_tier,
            availability,
            workload,
            experience,
        },
    )
}

/// Award points per chronic condition against the keyword map. A condition
/// matches a specialization entry when the provider's specialization field
/// contains the entry key and the entry either lists no keywords
/// (generalist) or one of its keywords appears in the condition text.
fn specialization_match(
    specialization: &str,
    conditions: &[String],
    weights: &ScoringWeights,
) -> (f64, Vec<String>) {
    if specialization.trim().is_empty() {
        return (0.0, Vec::new());
    }

    let field = specialization.to_lowercase();
    let mut points = 0.0;
    let mut matched = Vec::new();

    for condition in conditions {
        let text = condition.to_lowercase();
        let hit = SPECIALIZATION_KEYWORDS.iter().any(|(key, keywords)| {
            field.contains(key)
                && (keywords.is_empty() || keywords.iter().any(|kw| text.contains(kw)))
        });
        if hit {
            points += weights.specialization_match;
            matched.push(condition.clone());
        }
    }

    (points, matched)
}

#[derive(Debug, Clone)]
pub struct FastCandidate {
    pub provider: CareProvider,
    pub score: f64,
}

/// The manual-escalation heuristic: offline doctors are excluded outright;
/// availability sets the base score and any chronic condition that
/// substring-matches the specialization (in either direction) adds a flat
/// bonus. Deliberately cheaper and coarser than the full scorer.
pub fn rank_fast(
    doctors: &[CareProvider],
    chronic_conditions: &[String],
    weights: &ScoringWeights,
) -> Vec<FastCandidate> {
    let mut ranked: Vec<FastCandidate> = doctors
        .iter()
        .filter(|d| d.availability != Availability::Offline)
        .map(|doctor| {
            let mut score = match doctor.availability {
                Availability::Available => weights.fast_available,
                _ => weights.fast_busy,
            };
            let field = doctor
                .specialization
                .as_deref()
                .unwrap_or("")
                .to_lowercase();
            if !field.is_empty()
                && chronic_conditions.iter().any(|condition| {
                    let text = condition.to_lowercase();
                    text.contains(&field) || field.contains(&text)
                })
            {
                score += weights.fast_condition_bonus;
            }
            FastCandidate {
                provider: doctor.clone(),
                score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.provider.id.cmp(&b.provider.id))
    });
    ranked
}

pub fn build_reason(role: CareRole, candidate: &RankedCandidate, now: DateTime<Utc>) -> AssignmentReason {
    AssignmentReason {
        score: candidate.score,
        role: role.as_str().to_string(),
        factors: candidate.factors.clone(),
        assigned_by: "system".to_string(),
        timestamp: now,
    }
}

/// Conditions recorded as matched by the specialization factor, if any.
pub fn matched_conditions(candidate: &RankedCandidate) -> Vec<String> {
    candidate
        .factors
        .specialization
        .as_ref()
        .map(|s| s.matched_conditions.clone())
        .unwrap_or_default()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    if needle.trim().is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn doctor(id: u128, specialization: &str, availability: Availability) -> CareProvider {
        CareProvider {
            id: Uuid::from_u128(id),
            full_name: format!("Dr. {specialization}"),
            email: format!("doctor{id}@example.com"),
            role: CareRole::Doctor,
            availability,
            specialization: Some(specialization.to_string()),
            years_in_practice: Some(10),
            certified: None,
            experience_years: None,
            max_patients: 50,
        }
    }

    fn caretaker(id: u128, certified: bool, years: i32) -> CareProvider {
        CareProvider {
            id: Uuid::from_u128(id),
            full_name: "Casey Nguyen".to_string(),
            email: format!("caretaker{id}@example.com"),
            role: CareRole::Caretaker,
            availability: Availability::Available,
            specialization: None,
            years_in_practice: None,
            certified: Some(certified),
            experience_years: Some(years),
            max_patients: 50,
        }
    }

    fn workload(provider: CareProvider, current: i64) -> ProviderWorkload {
        ProviderWorkload {
            provider,
            current_patients: current,
        }
    }

    fn profile(conditions: &[&str]) -> PatientProfile {
        PatientProfile {
            chronic_conditions: conditions.iter().map(|c| c.to_string()).collect(),
            preferred_specialization: None,
        }
    }

    #[test]
    fn cardiology_matches_hypertension() {
        let pool = vec![workload(doctor(1, "Cardiology", Availability::Available), 0)];
        let ranked = rank_candidates(
            &pool,
            &profile(&["Hypertension"]),
            Urgency::Routine,
            &ScoringWeights::default(),
        );
        let factor = ranked[0].factors.specialization.as_ref().unwrap();
        assert_eq!(factor.points, 100.0);
        assert_eq!(factor.matched_conditions, vec!["Hypertension".to_string()]);
    }

    #[test]
    fn generalist_matches_any_condition() {
        let pool = vec![workload(
            doctor(1, "Family Medicine", Availability::Available),
            0,
        )];
        let ranked = rank_candidates(
            &pool,
            &profile(&["Chronic Fatigue", "Hypertension"]),
            Urgency::Routine,
            &ScoringWeights::default(),
        );
        let factor = ranked[0].factors.specialization.as_ref().unwrap();
        assert_eq!(factor.points, 200.0);
        assert_eq!(factor.matched_conditions.len(), 2);
    }

    #[test]
    fn unrelated_specialization_scores_no_match() {
        let pool = vec![workload(doctor(1, "Oncology", Availability::Available), 0)];
        let ranked = rank_candidates(
            &pool,
            &profile(&["Hypertension"]),
            Urgency::Routine,
            &ScoringWeights::default(),
        );
        let factor = ranked[0].factors.specialization.as_ref().unwrap();
        assert_eq!(factor.points, 0.0);
        assert!(factor.matched_conditions.is_empty());
    }

    #[test]
    fn preferred_specialization_adds_flat_bonus() {
        let pool = vec![workload(doctor(1, "Cardiology", Availability::Available), 0)];
        let mut with_pref = profile(&[]);
        with_pref.preferred_specialization = Some("cardio".to_string());
        let ranked = rank_candidates(
            &pool,
            &with_pref,
            Urgency::Routine,
            &ScoringWeights::default(),
        );
        let factor = ranked[0].factors.specialization.as_ref().unwrap();
        assert_eq!(factor.preferred_bonus, 100.0);
    }

    #[test]
    fn caretaker_certification_and_tiers() {
        let weights = ScoringWeights::default();
        let senior = rank_candidates(
            &[workload(caretaker(1, true, 7), 0)],
            &profile(&[]),
            Urgency::Routine,
            &weights,
        );
        assert_eq!(senior[0].factors.certification, Some(50.0));
        assert_eq!(senior[0].factors.experience_tier, Some(30.0));

        let mid = rank_candidates(
            &[workload(caretaker(2, false, 3), 0)],
            &profile(&[]),
            Urgency::Routine,
            &weights,
        );
        assert_eq!(mid[0].factors.certification, Some(0.0));
        assert_eq!(mid[0].factors.experience_tier, Some(15.0));

        let junior = rank_candidates(
            &[workload(caretaker(3, false, 1), 0)],
            &profile(&[]),
            Urgency::Routine,
            &weights,
        );
        assert_eq!(junior[0].factors.experience_tier, Some(0.0));
    }

    #[test]
    fn busy_counts_only_when_urgent() {
        let weights = ScoringWeights::default();
        let pool = vec![workload(doctor(1, "Cardiology", Availability::Busy), 0)];
        let routine = rank_candidates(&pool, &profile(&[]), Urgency::Routine, &weights);
        assert_eq!(routine[0].factors.availability, 0.0);
        let urgent = rank_candidates(&pool, &profile(&[]), Urgency::Urgent, &weights);
        assert_eq!(urgent[0].factors.availability, 25.0);
    }

    #[test]
    fn workload_decays_linearly_and_clamps_at_capacity() {
        let weights = ScoringWeights::default();
        let half = rank_candidates(
            &[workload(doctor(1, "Cardiology", Availability::Available), 25)],
            &profile(&[]),
            Urgency::Routine,
            &weights,
        );
        assert_eq!(half[0].factors.workload, 25.0);

        let over = rank_candidates(
            &[workload(doctor(2, "Cardiology", Availability::Available), 60)],
            &profile(&[]),
            Urgency::Routine,
            &weights,
        );
        assert_eq!(over[0].factors.workload, 0.0);
    }

    #[test]
    fn experience_score_caps_at_25() {
        let mut veteran = doctor(1, "Cardiology", Availability::Available);
        veteran.years_in_practice = Some(40);
        let ranked = rank_candidates(
            &[workload(veteran, 0)],
            &profile(&[]),
            Urgency::Routine,
            &ScoringWeights::default(),
        );
        assert_eq!(ranked[0].factors.experience, 25.0);
    }

    #[test]
    fn ties_break_by_ascending_id() {
        let pool = vec![
            workload(doctor(2, "Cardiology", Availability::Available), 0),
            workload(doctor(1, "Cardiology", Availability::Available), 0),
        ];
        let profile = profile(&["Hypertension"]);
        let weights = ScoringWeights::default();
        let first = rank_candidates(&pool, &profile, Urgency::Routine, &weights);
        let second = rank_candidates(&pool, &profile, Urgency::Routine, &weights);
        assert_eq!(first[0].provider.id, Uuid::from_u128(1));
        assert_eq!(first[0].provider.id, second[0].provider.id);
        assert_eq!(first[0].score, second[0].score);
    }

    #[test]
    fn empty_or_zero_pool_is_rejected() {
        assert!(matches!(
            select_top(&[], CareRole::Doctor),
            Err(CareError::NoSuitableCandidate(CareRole::Doctor))
        ));

        let mut offline = doctor(1, "Oncology", Availability::Offline);
        offline.years_in_practice = Some(0);
        let ranked = rank_candidates(
            &[workload(offline, 50)],
            &profile(&["Hypertension"]),
            Urgency::Routine,
            &ScoringWeights::default(),
        );
        assert_eq!(ranked[0].score, 0.0);
        assert!(select_top(&ranked, CareRole::Doctor).is_err());
    }

    #[test]
    fn fast_mode_excludes_offline_and_rewards_condition_match() {
        let weights = ScoringWeights::default();
        let doctors = vec![
            doctor(1, "Cardiology", Availability::Busy),
            doctor(2, "Neurology", Availability::Offline),
            doctor(3, "Pulmonology", Availability::Available),
        ];
        let ranked = rank_fast(&doctors, &["Cardiology follow-up".to_string()], &weights);
        assert_eq!(ranked.len(), 2);
        // Busy cardiologist: 50 + 100 condition bonus beats available
        // pulmonologist at 100.
        assert_eq!(ranked[0].provider.id, Uuid::from_u128(1));
        assert_eq!(ranked[0].score, 150.0);
        assert_eq!(ranked[1].score, 100.0);
    }

    #[test]
    fn fast_mode_matches_substring_in_both_directions() {
        let weights = ScoringWeights::default();
        let doctors = vec![doctor(1, "Cardio", Availability::Available)];
        let ranked = rank_fast(&doctors, &["Cardiology".to_string()], &weights);
        assert_eq!(ranked[0].score, 200.0);
    }
}
