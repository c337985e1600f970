//! Vitals ingestion: the event path that runs on every new reading.
//!
//! One invocation appends the reading, classifies it, persists any alerts,
//! resolves the patient status, fans alert notifications out to the care
//! team, and finally gives the escalation controller a chance to fire.
//! Each step reads current persisted state and writes back; a failure
//! partway through leaves earlier writes in place.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::anomaly;
use crate::config::AnomalyThresholds;
use crate::db;
use crate::error::{CareError, CareResult};
use crate::escalation::{self, EscalationOutcome};
use crate::models::{Alert, Patient, PatientStatus, Severity, VitalsReading};

#[derive(Debug)]
pub struct IngestSummary {
    pub alerts: Vec<Alert>,
    pub status: PatientStatus,
    pub escalation: Option<EscalationOutcome>,
}

pub async fn ingest_reading(
    pool: &PgPool,
    patient_id: Uuid,
    reading: VitalsReading,
    thresholds: &AnomalyThresholds,
) -> CareResult<IngestSummary> {
    if !reading.has_any_vital() {
        return Err(CareError::InvalidArgument(
            "reading carries no vital fields".to_string(),
        ));
    }

    let patient = db::fetch_patient(pool, patient_id).await?;
    db::insert_reading(pool, patient.id, &reading).await?;

    let candidates = anomaly::classify_reading(&reading, thresholds);
    let now = Utc::now();

    let mut alerts = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let alert = db::insert_alert(pool, patient.id, candidate, now).await?;
        fan_out_alert(pool, &patient, &alert).await?;
        alerts.push(alert);
    }

    let status = anomaly::resolve_status(patient.status, &candidates);
    if status != patient.status {
        db::update_patient_status(pool, patient.id, status).await?;
    }

    // The controller re-reads the patient so it sees the status and any
    // assignment changes made earlier in this pass.
    let escalation = match alerts.iter().find(|a| a.severity == Severity::High) {
        Some(alert) => {
            let current = db::fetch_patient(pool, patient.id).await?;
            escalation::check_auto_escalation(pool, &current, alert).await?
        }
        None => None,
    };

    info!(
        patient = %patient.id,
        alerts = alerts.len(),
        status = status.as_str(),
        escalated = escalation.is_some(),
        "vitals reading processed"
    );

    Ok(IngestSummary {
        alerts,
        status,
        escalation,
    })
}

/// Alert notifications go to the patient and every assigned care-team
/// member, mirroring the alert severity.
async fn fan_out_alert(pool: &PgPool, patient: &Patient, alert: &Alert) -> CareResult<()> {
    let mut recipients = vec![patient.id];
    recipients.extend(patient.assigned_caretaker_id);
    recipients.extend(patient.assigned_doctor_id);

    for recipient in recipients {
        db::insert_notification(pool, recipient, &alert.title, &alert.message, alert.severity)
            .await?;
    }
    Ok(())
}

/// Batch entry point used for device exports and backfills: one CSV row per
/// reading, addressed by patient email. Runs the full ingestion pipeline
/// per row.
pub async fn import_csv(
    pool: &PgPool,
    csv_path: &Path,
    thresholds: &AnomalyThresholds,
) -> CareResult<(usize, usize)> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        patient_email: String,
        heart_rate: Option<f64>,
        blood_pressure_systolic: Option<f64>,
        blood_pressure_diastolic: Option<f64>,
        oxygen_level: Option<f64>,
        temperature: Option<f64>,
        glucose: Option<f64>,
        respiration: Option<f64>,
        device_id: Option<String>,
        recorded_at: Option<DateTime<Utc>>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .map_err(|e| CareError::InvalidArgument(format!("cannot read CSV: {e}")))?;

    let mut readings = 0usize;
    let mut alerts = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result.map_err(|e| CareError::InvalidArgument(format!("bad CSV row: {e}")))?;
        let patient = db::fetch_patient_by_email(pool, &row.patient_email)
            .await?
            .ok_or_else(|| CareError::NotFound(format!("patient {}", row.patient_email)))?;

        let reading = VitalsReading {
            heart_rate: row.heart_rate,
            blood_pressure_systolic: row.blood_pressure_systolic,
            blood_pressure_diastolic: row.blood_pressure_diastolic,
            oxygen_level: row.oxygen_level,
            temperature: row.temperature,
            glucose: row.glucose,
            respiration: row.respiration,
            recorded_at: row.recorded_at.unwrap_or_else(Utc::now),
            device_id: row.device_id.unwrap_or_else(|| "csv-import".to_string()),
        };

        let summary = ingest_reading(pool, patient.id, reading, thresholds).await?;
        readings += 1;
        alerts += summary.alerts.len();
    }

    Ok((readings, alerts))
}
