//! Care-tier escalation. A patient moves caretaker-only to doctor-supervised
//! either automatically, driven by repeated high-severity alerts, or on
//! request from someone on the care team. Doctor-supervised is terminal:
//! nothing in this module ever removes an assigned doctor.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ScoringWeights, ESCALATION_HIGH_ALERT_MIN, ESCALATION_WINDOW_HOURS};
use crate::db;
use crate::error::{CareError, CareResult};
use crate::models::{Alert, Patient, Severity};
use crate::scoring;

#[derive(Debug)]
pub struct EscalationOutcome {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub message: String,
}

/// The four conditions that arm an automatic escalation. All must hold;
/// the alert-count threshold is checked separately against the store.
pub fn auto_escalation_armed(patient: &Patient, alert_severity: Severity) -> bool {
    patient.assigned_caretaker_id.is_some()
        && patient.assigned_doctor_id.is_none()
        && patient.auto_escalate_to_doctor
        && alert_severity == Severity::High
}

/// Invoked by the alert pipeline after each alert write. Returns the
/// escalation outcome when one fired, `None` otherwise.
pub async fn check_auto_escalation(
    pool: &PgPool,
    patient: &Patient,
    alert: &Alert,
) -> CareResult<Option<EscalationOutcome>> {
    if !auto_escalation_armed(patient, alert.severity) {
        return Ok(None);
    }

    let window_start = Utc::now() - Duration::hours(ESCALATION_WINDOW_HOURS);
    let high_count = db::count_high_alerts_since(pool, patient.id, window_start).await?;
    if high_count < ESCALATION_HIGH_ALERT_MIN {
        return Ok(None);
    }

    let Some(doctor) = db::first_available_doctor(pool).await? else {
        warn!(patient = %patient.id, "auto-escalation armed but no doctor is available");
        return Ok(None);
    };

    let reason = format!(
        "{high_count} high-severity alerts within {ESCALATION_WINDOW_HOURS} hours (latest: {})",
        alert.title
    );
    db::apply_escalation(pool, patient, &doctor, &reason, None, true, Utc::now()).await?;

    info!(
        patient = %patient.id,
        doctor = %doctor.id,
        high_count,
        "patient auto-escalated to doctor supervision"
    );

    Ok(Some(EscalationOutcome {
        doctor_id: doctor.id,
        doctor_name: doctor.full_name.clone(),
        message: format!("Escalated to {} ({reason})", doctor.full_name),
    }))
}

/// Manual escalation requested by the patient, their caretaker, or their
/// doctor. Runs the lighter-weight doctor search rather than the full
/// scorer. If a doctor is already assigned this is a successful no-op.
pub async fn escalate_to_doctor(
    pool: &PgPool,
    actor: Uuid,
    patient_id: Uuid,
    reason: Option<String>,
) -> CareResult<EscalationOutcome> {
    db::fetch_user_email(pool, actor)
        .await?
        .ok_or(CareError::Unauthenticated)?;

    let patient = db::fetch_patient(pool, patient_id).await?;
    if !patient.care_team_includes(actor) {
        return Err(CareError::PermissionDenied(
            "only the patient or their care team may request escalation".to_string(),
        ));
    }

    if let Some(doctor_id) = patient.assigned_doctor_id {
        let doctor_name = db::fetch_provider(pool, doctor_id)
            .await?
            .map(|d| d.full_name)
            .unwrap_or_else(|| "assigned doctor".to_string());
        return Ok(EscalationOutcome {
            doctor_id,
            doctor_name: doctor_name.clone(),
            message: format!("{} is already supervising this patient", doctor_name),
        });
    }

    let doctors = db::reachable_doctors(pool).await?;
    let weights = ScoringWeights::default();
    let ranked = scoring::rank_fast(&doctors, &patient.chronic_conditions, &weights);
    let best = ranked.first().ok_or(CareError::NoAvailableDoctor)?;

    let reason_text = reason.unwrap_or_else(|| "manual escalation request".to_string());
    db::apply_escalation(
        pool,
        &patient,
        &best.provider,
        &reason_text,
        Some(actor),
        false,
        Utc::now(),
    )
    .await?;

    info!(
        patient = %patient.id,
        doctor = %best.provider.id,
        score = best.score,
        "patient manually escalated to doctor supervision"
    );

    Ok(EscalationOutcome {
        doctor_id: best.provider.id,
        doctor_name: best.provider.full_name.clone(),
        message: format!("Escalated to {}", best.provider.full_name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientStatus;

    fn escalatable_patient() -> Patient {
        Patient {
            id: Uuid::from_u128(1),
            full_name: "Rosa Delgado".to_string(),
            email: "rosa@example.com".to_string(),
            status: PatientStatus::Critical,
            chronic_conditions: vec![],
            assigned_doctor_id: None,
            assigned_caretaker_id: Some(Uuid::from_u128(2)),
            assignment_reason: None,
            auto_escalate_to_doctor: true,
            escalated_at: None,
            escalated_from: None,
            escalation_reason: None,
        }
    }

    #[test]
    fn arms_only_when_all_conditions_hold() {
        let patient = escalatable_patient();
        assert!(auto_escalation_armed(&patient, Severity::High));
    }

    #[test]
    fn missing_caretaker_disarms() {
        let mut patient = escalatable_patient();
        patient.assigned_caretaker_id = None;
        assert!(!auto_escalation_armed(&patient, Severity::High));
    }

    #[test]
    fn existing_doctor_disarms() {
        let mut patient = escalatable_patient();
        patient.assigned_doctor_id = Some(Uuid::from_u128(9));
        assert!(!auto_escalation_armed(&patient, Severity::High));
    }

    #[test]
    fn opt_out_flag_disarms() {
        let mut patient = escalatable_patient();
        patient.auto_escalate_to_doctor = false;
        assert!(!auto_escalation_armed(&patient, Severity::High));
    }

    #[test]
    fn non_high_severity_disarms() {
        let patient = escalatable_patient();
        assert!(!auto_escalation_armed(&patient, Severity::Medium));
        assert!(!auto_escalation_armed(&patient, Severity::Low));
    }
}
