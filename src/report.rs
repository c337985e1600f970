//! Vitals export and the scheduled report/retention jobs.

use std::fmt::Write;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config::NOTIFICATION_RETENTION_DAYS;
use crate::db::{self, DailyCounts};
use crate::error::{CareError, CareResult};
use crate::models::VitalsReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct VitalsExport {
    pub data: String,
    pub count: usize,
    pub patient_name: String,
}

/// Export a patient's readings over an optional date range. Only the
/// patient and their assigned care team may export.
pub async fn export_vitals(
    pool: &PgPool,
    actor: Uuid,
    patient_id: Uuid,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    format: ExportFormat,
) -> CareResult<VitalsExport> {
    db::fetch_user_email(pool, actor)
        .await?
        .ok_or(CareError::Unauthenticated)?;

    let patient = db::fetch_patient(pool, patient_id).await?;
    if !patient.care_team_includes(actor) {
        return Err(CareError::PermissionDenied(
            "only the patient or their care team may export vitals".to_string(),
        ));
    }

    let start = start_date.map(day_start).transpose()?;
    // The end date is inclusive, so the query bound is the next midnight.
    let end = end_date.map(|d| day_start(d + Duration::days(1))).transpose()?;
    let readings = db::fetch_vitals(pool, patient.id, start, end).await?;

    let data = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&readings)?,
        ExportFormat::Csv => readings_to_csv(&readings)?,
    };

    Ok(VitalsExport {
        count: readings.len(),
        patient_name: patient.full_name,
        data,
    })
}

fn readings_to_csv(readings: &[VitalsReading]) -> CareResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for reading in readings {
        writer
            .serialize(reading)
            .map_err(|e| CareError::Internal(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CareError::Internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CareError::Internal(e.to_string()))
}

fn day_start(date: NaiveDate) -> CareResult<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CareError::InvalidArgument(format!("invalid date {date}")))?;
    Ok(Utc.from_utc_datetime(&midnight))
}

/// One patient's markdown summary for a calendar day.
pub fn build_daily_summary(patient_name: &str, date: NaiveDate, counts: &DailyCounts) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Daily Care Report: {patient_name}");
    let _ = writeln!(output, "Covering {date}");
    let _ = writeln!(output);
    let _ = writeln!(output, "- Vitals readings recorded: {}", counts.vitals);

    let total_alerts = counts.low_alerts + counts.medium_alerts + counts.high_alerts;
    if total_alerts == 0 {
        let _ = writeln!(output, "- No alerts raised.");
    } else {
        let _ = writeln!(
            output,
            "- Alerts raised: {total_alerts} (high {}, medium {}, low {})",
            counts.high_alerts, counts.medium_alerts, counts.low_alerts
        );
    }

    output
}

/// Daily job: write one report row per patient covering `date` (callers
/// normally pass yesterday).
pub async fn generate_daily_reports(pool: &PgPool, date: NaiveDate) -> CareResult<usize> {
    let day_begin = day_start(date)?;
    let day_end = day_start(date + Duration::days(1))?;

    let roster = db::patient_roster(pool).await?;
    for (patient_id, full_name) in &roster {
        let counts = db::daily_counts(pool, *patient_id, day_begin, day_end).await?;
        let summary = build_daily_summary(full_name, date, &counts);
        db::upsert_daily_report(pool, *patient_id, date, &counts, &summary).await?;
    }

    info!(date = %date, patients = roster.len(), "daily reports generated");
    Ok(roster.len())
}

/// Weekly job: read notifications past the retention window are dropped.
pub async fn sweep_stale_notifications(pool: &PgPool) -> CareResult<u64> {
    let cutoff = Utc::now() - Duration::days(NOTIFICATION_RETENTION_DAYS);
    let removed = db::delete_stale_notifications(pool, cutoff).await?;
    info!(removed, "stale read notifications swept");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_alert_mix() {
        let counts = DailyCounts {
            vitals: 12,
            low_alerts: 1,
            medium_alerts: 2,
            high_alerts: 1,
        };
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid date");
        let summary = build_daily_summary("Rosa Delgado", date, &counts);
        assert!(summary.contains("Rosa Delgado"));
        assert!(summary.contains("2026-08-06"));
        assert!(summary.contains("Vitals readings recorded: 12"));
        assert!(summary.contains("high 1, medium 2, low 1"));
    }

    #[test]
    fn quiet_day_reports_no_alerts() {
        let counts = DailyCounts {
            vitals: 4,
            low_alerts: 0,
            medium_alerts: 0,
            high_alerts: 0,
        };
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid date");
        let summary = build_daily_summary("Marcus Webb", date, &counts);
        assert!(summary.contains("No alerts raised."));
    }

    #[test]
    fn csv_export_includes_header_and_rows() {
        let readings = vec![VitalsReading {
            heart_rate: Some(72.0),
            blood_pressure_systolic: Some(118.0),
            blood_pressure_diastolic: Some(76.0),
            oxygen_level: Some(98.0),
            temperature: Some(36.6),
            glucose: None,
            respiration: None,
            recorded_at: Utc.with_ymd_and_hms(2026, 8, 6, 9, 30, 0).unwrap(),
            device_id: "ble-monitor-1".to_string(),
        }];
        let csv = readings_to_csv(&readings).expect("serializes");
        assert!(csv.starts_with("heart_rate,"));
        assert!(csv.contains("ble-monitor-1"));
    }
}
