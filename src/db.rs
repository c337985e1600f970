use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgExecutor, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::anomaly::AlertCandidate;
use crate::error::{CareError, CareResult};
use crate::models::{
    Alert, Availability, CareProvider, CareRole, Invitation, InvitationStatus, Patient,
    PatientStatus, ProviderWorkload, Severity, VitalsReading,
};
use crate::scoring::{AssignmentReason, RankedCandidate};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let patients = vec![
        (
            Uuid::parse_str("5b5f1a0e-8a3d-4a86-9a51-0d6a2e9a1c01")?,
            "Rosa Delgado",
            "rosa.delgado@vitalwatch.health",
            vec!["Hypertension".to_string(), "Type 2 Diabetes".to_string()],
        ),
        (
            Uuid::parse_str("1f4f3f62-7c1b-4d7a-b7d8-48c7a3f2bc02")?,
            "Marcus Webb",
            "marcus.webb@vitalwatch.health",
            vec!["Asthma".to_string()],
        ),
        (
            Uuid::parse_str("9f0d2b8a-52f4-4e4e-b0a3-0f3a1d9c2d03")?,
            "Lena Fischer",
            "lena.fischer@vitalwatch.health",
            vec![],
        ),
    ];

    for (id, name, email, conditions) in patients {
        sqlx::query(
            r#"
            INSERT INTO care_engine.patients (id, full_name, email, chronic_conditions)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, chronic_conditions = EXCLUDED.chronic_conditions
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(&conditions)
        .execute(pool)
        .await?;
    }

    let doctors = vec![
        (
            Uuid::parse_str("a4c7d9e1-3b5a-4f2c-8d1e-7a9b0c3d4e11")?,
            "Dr. Priya Raman",
            "priya.raman@vitalwatch.health",
            "Cardiology",
            12,
            "available",
        ),
        (
            Uuid::parse_str("b8e2f4a6-1c3d-4e5f-9a7b-2d4c6e8f0a12")?,
            "Dr. Tomas Keller",
            "tomas.keller@vitalwatch.health",
            "Endocrinology",
            8,
            "busy",
        ),
        (
            Uuid::parse_str("c1d3e5f7-9a0b-4c2d-8e6f-3a5b7c9d1e13")?,
            "Dr. Alice Munro",
            "alice.munro@vitalwatch.health",
            "Family Medicine",
            20,
            "available",
        ),
    ];

    for (id, name, email, specialization, years, availability) in doctors {
        sqlx::query(
            r#"
            INSERT INTO care_engine.providers
            (id, full_name, email, role, availability, specialization, years_in_practice)
            VALUES ($1, $2, $3, 'medical', $4, $5, $6)
            ON CONFLICT (email) DO UPDATE
            SET availability = EXCLUDED.availability,
                specialization = EXCLUDED.specialization,
                years_in_practice = EXCLUDED.years_in_practice
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(availability)
        .bind(specialization)
        .bind(years)
        .execute(pool)
        .await?;
    }

    let caretakers = vec![
        (
            Uuid::parse_str("d2e4f6a8-0b1c-4d3e-9f5a-4b6c8d0e2f14")?,
            "Imani Brooks",
            "imani.brooks@vitalwatch.health",
            true,
            6,
        ),
        (
            Uuid::parse_str("e3f5a7b9-1c2d-4e4f-8a6b-5c7d9e1f3a15")?,
            "Sam Porter",
            "sam.porter@vitalwatch.health",
            false,
            1,
        ),
    ];

    for (id, name, email, certified, years) in caretakers {
        sqlx::query(
            r#"
            INSERT INTO care_engine.providers
            (id, full_name, email, role, certified, experience_years)
            VALUES ($1, $2, $3, 'caretaker', $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET certified = EXCLUDED.certified,
                experience_years = EXCLUDED.experience_years
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(certified)
        .bind(years)
        .execute(pool)
        .await?;
    }

    Ok(())
}

const PATIENT_COLUMNS: &str = "id, full_name, email, status, chronic_conditions, \
     assigned_doctor_id, assigned_caretaker_id, assignment_reason, \
     auto_escalate_to_doctor, escalated_at, escalated_from, escalation_reason";

const PROVIDER_COLUMNS: &str = "id, full_name, email, role, availability, specialization, \
     years_in_practice, certified, experience_years, max_patients";

fn map_patient(row: &PgRow) -> CareResult<Patient> {
    let status: String = row.get("status");
    Ok(Patient {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        status: PatientStatus::parse(&status)
            .ok_or_else(|| CareError::Internal(format!("unknown patient status '{status}'")))?,
        chronic_conditions: row.get("chronic_conditions"),
        assigned_doctor_id: row.get("assigned_doctor_id"),
        assigned_caretaker_id: row.get("assigned_caretaker_id"),
        assignment_reason: row.get("assignment_reason"),
        auto_escalate_to_doctor: row.get("auto_escalate_to_doctor"),
        escalated_at: row.get("escalated_at"),
        escalated_from: row.get("escalated_from"),
        escalation_reason: row.get("escalation_reason"),
    })
}

fn map_provider(row: &PgRow) -> CareResult<CareProvider> {
    let role: String = row.get("role");
    let availability: String = row.get("availability");
    Ok(CareProvider {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        role: CareRole::parse(&role)
            .ok_or_else(|| CareError::Internal(format!("unknown provider role '{role}'")))?,
        availability: Availability::parse(&availability).ok_or_else(|| {
            CareError::Internal(format!("unknown availability '{availability}'"))
        })?,
        specialization: row.get("specialization"),
        years_in_practice: row.get("years_in_practice"),
        certified: row.get("certified"),
        experience_years: row.get("experience_years"),
        max_patients: row.get("max_patients"),
    })
}

fn map_invitation(row: &PgRow) -> CareResult<Invitation> {
    let invite_type: String = row.get("invite_type");
    let status: String = row.get("status");
    Ok(Invitation {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        recipient_email: row.get("recipient_email"),
        invite_type: CareRole::parse(&invite_type).ok_or_else(|| {
            CareError::Internal(format!("unknown invitation type '{invite_type}'"))
        })?,
        status: InvitationStatus::parse(&status)
            .ok_or_else(|| CareError::Internal(format!("unknown invitation status '{status}'")))?,
        message: row.get("message"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    })
}

fn map_reading(row: &PgRow) -> VitalsReading {
    VitalsReading {
        heart_rate: row.get("heart_rate"),
        blood_pressure_systolic: row.get("blood_pressure_systolic"),
        blood_pressure_diastolic: row.get("blood_pressure_diastolic"),
        oxygen_level: row.get("oxygen_level"),
        temperature: row.get("temperature"),
        glucose: row.get("glucose"),
        respiration: row.get("respiration"),
        recorded_at: row.get("recorded_at"),
        device_id: row.get("device_id"),
    }
}

pub async fn try_fetch_patient(pool: &PgPool, id: Uuid) -> CareResult<Option<Patient>> {
    let row = sqlx::query(&format!(
        "SELECT {PATIENT_COLUMNS} FROM care_engine.patients WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_patient).transpose()
}

pub async fn fetch_patient(pool: &PgPool, id: Uuid) -> CareResult<Patient> {
    try_fetch_patient(pool, id)
        .await?
        .ok_or_else(|| CareError::NotFound(format!("patient {id}")))
}

pub async fn fetch_patient_by_email(pool: &PgPool, email: &str) -> CareResult<Option<Patient>> {
    let row = sqlx::query(&format!(
        "SELECT {PATIENT_COLUMNS} FROM care_engine.patients WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_patient).transpose()
}

pub async fn fetch_provider(pool: &PgPool, id: Uuid) -> CareResult<Option<CareProvider>> {
    let row = sqlx::query(&format!(
        "SELECT {PROVIDER_COLUMNS} FROM care_engine.providers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_provider).transpose()
}

/// Resolve any authenticated user (patient or provider) to their email.
/// `None` means the caller identity is unknown.
pub async fn fetch_user_email(pool: &PgPool, id: Uuid) -> CareResult<Option<String>> {
    if let Some(patient) = try_fetch_patient(pool, id).await? {
        return Ok(Some(patient.email));
    }
    Ok(fetch_provider(pool, id).await?.map(|p| p.email))
}

/// Load every provider of the requested role with their derived patient
/// count. The count is a per-provider sub-query against current
/// assignments, never a stored field.
pub async fn providers_with_workload(
    pool: &PgPool,
    role: CareRole,
) -> CareResult<Vec<ProviderWorkload>> {
    let rows = sqlx::query(&format!(
        "SELECT {PROVIDER_COLUMNS} FROM care_engine.providers WHERE role = $1 ORDER BY id"
    ))
    .bind(role.provider_tag())
    .fetch_all(pool)
    .await?;

    let column = match role {
        CareRole::Doctor => "assigned_doctor_id",
        CareRole::Caretaker => "assigned_caretaker_id",
    };

    let mut pool_entries = Vec::with_capacity(rows.len());
    for row in &rows {
        let provider = map_provider(row)?;
        let count_row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM care_engine.patients WHERE {column} = $1"
        ))
        .bind(provider.id)
        .fetch_one(pool)
        .await?;
        pool_entries.push(ProviderWorkload {
            provider,
            current_patients: count_row.get("n"),
        });
    }
    Ok(pool_entries)
}

/// Deterministic "first available" pick for automatic escalation.
pub async fn first_available_doctor(pool: &PgPool) -> CareResult<Option<CareProvider>> {
    let row = sqlx::query(&format!(
        "SELECT {PROVIDER_COLUMNS} FROM care_engine.providers \
         WHERE role = 'medical' AND availability = 'available' ORDER BY id LIMIT 1"
    ))
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_provider).transpose()
}

/// Doctor pool for the manual escalation search. Offline doctors are
/// excluded at the query level.
pub async fn reachable_doctors(pool: &PgPool) -> CareResult<Vec<CareProvider>> {
    let rows = sqlx::query(&format!(
        "SELECT {PROVIDER_COLUMNS} FROM care_engine.providers \
         WHERE role = 'medical' AND availability <> 'offline' ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    rows.iter().map(map_provider).collect()
}

pub async fn insert_reading(
    pool: &PgPool,
    patient_id: Uuid,
    reading: &VitalsReading,
) -> CareResult<()> {
    sqlx::query(
        r#"
        INSERT INTO care_engine.vitals
        (id, patient_id, heart_rate, blood_pressure_systolic, blood_pressure_diastolic,
         oxygen_level, temperature, glucose, respiration, device_id, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(patient_id)
    .bind(reading.heart_rate)
    .bind(reading.blood_pressure_systolic)
    .bind(reading.blood_pressure_diastolic)
    .bind(reading.oxygen_level)
    .bind(reading.temperature)
    .bind(reading.glucose)
    .bind(reading.respiration)
    .bind(&reading.device_id)
    .bind(reading.recorded_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_alert(
    pool: &PgPool,
    patient_id: Uuid,
    candidate: &AlertCandidate,
    now: DateTime<Utc>,
) -> CareResult<Alert> {
    let alert = Alert {
        id: Uuid::new_v4(),
        patient_id,
        title: candidate.title.clone(),
        message: candidate.message.clone(),
        severity: candidate.severity,
        created_at: now,
    };
    sqlx::query(
        r#"
        INSERT INTO care_engine.alerts (id, patient_id, title, message, severity, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(alert.id)
    .bind(alert.patient_id)
    .bind(&alert.title)
    .bind(&alert.message)
    .bind(alert.severity.as_str())
    .bind(alert.created_at)
    .execute(pool)
    .await?;
    Ok(alert)
}

pub async fn update_patient_status(
    pool: &PgPool,
    patient_id: Uuid,
    status: PatientStatus,
) -> CareResult<()> {
    sqlx::query("UPDATE care_engine.patients SET status = $1 WHERE id = $2")
        .bind(status.as_str())
        .bind(patient_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count_high_alerts_since(
    pool: &PgPool,
    patient_id: Uuid,
    since: DateTime<Utc>,
) -> CareResult<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM care_engine.alerts \
         WHERE patient_id = $1 AND severity = 'high' AND created_at >= $2",
    )
    .bind(patient_id)
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(row.get("n"))
}

async fn add_notification<'a, E>(
    executor: E,
    recipient: Uuid,
    title: &str,
    body: &str,
    severity: Severity,
) -> CareResult<()>
where
    E: PgExecutor<'a>,
{
    sqlx::query(
        r#"
        INSERT INTO care_engine.notifications (id, recipient_id, title, body, severity, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(recipient)
    .bind(title)
    .bind(body)
    .bind(severity.as_str())
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn insert_notification(
    pool: &PgPool,
    recipient: Uuid,
    title: &str,
    body: &str,
    severity: Severity,
) -> CareResult<()> {
    add_notification(pool, recipient, title, body, severity).await
}

async fn add_audit<'a, E>(
    executor: E,
    actor: Option<Uuid>,
    patient_id: Uuid,
    action: &str,
    detail: serde_json::Value,
) -> CareResult<()>
where
    E: PgExecutor<'a>,
{
    sqlx::query(
        r#"
        INSERT INTO care_engine.audit_log (id, actor, patient_id, action, detail, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(actor)
    .bind(patient_id)
    .bind(action)
    .bind(detail)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// Persist a scored assignment: patient fields, both notifications, and the
/// audit entry commit together so a partial write cannot leave the patient
/// pointing at a provider that was never notified.
pub async fn apply_assignment(
    pool: &PgPool,
    patient: &Patient,
    role: CareRole,
    candidate: &RankedCandidate,
    reason: &AssignmentReason,
    set_auto_escalate: bool,
    matched_conditions: &[String],
    actor: Uuid,
) -> CareResult<()> {
    let reason_json = serde_json::to_value(reason)?;
    let provider = &candidate.provider;
    let mut tx = pool.begin().await?;

    match role {
        CareRole::Doctor => {
            sqlx::query(
                "UPDATE care_engine.patients \
                 SET assigned_doctor_id = $1, assignment_reason = $2 WHERE id = $3",
            )
            .bind(provider.id)
            .bind(&reason_json)
            .bind(patient.id)
            .execute(&mut *tx)
            .await?;
        }
        CareRole::Caretaker => {
            let auto_escalate = set_auto_escalate || patient.auto_escalate_to_doctor;
            sqlx::query(
                "UPDATE care_engine.patients \
                 SET assigned_caretaker_id = $1, assignment_reason = $2, \
                     auto_escalate_to_doctor = $3 WHERE id = $4",
            )
            .bind(provider.id)
            .bind(&reason_json)
            .bind(auto_escalate)
            .bind(patient.id)
            .execute(&mut *tx)
            .await?;
        }
    }

    add_notification(
        &mut *tx,
        provider.id,
        "New patient assignment",
        &format!(
            "You are now the {} for {}",
            role.as_str(),
            patient.full_name
        ),
        Severity::Medium,
    )
    .await?;
    add_notification(
        &mut *tx,
        patient.id,
        "Care team updated",
        &format!(
            "{} has been assigned as your {}",
            provider.full_name,
            role.as_str()
        ),
        Severity::Low,
    )
    .await?;
    add_audit(
        &mut *tx,
        Some(actor),
        patient.id,
        "care_team_assigned",
        serde_json::json!({
            "assignee_id": provider.id,
            "assignee_name": provider.full_name,
            "role": role.as_str(),
            "score": candidate.score,
            "assignee_patient_load": candidate.current_patients,
            "matched_conditions": matched_conditions,
        }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Persist an escalation: doctor assignment plus escalation bookkeeping,
/// the three notifications, and the audit entry in one transaction.
pub async fn apply_escalation(
    pool: &PgPool,
    patient: &Patient,
    doctor: &CareProvider,
    reason_text: &str,
    actor: Option<Uuid>,
    automatic: bool,
    now: DateTime<Utc>,
) -> CareResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE care_engine.patients \
         SET assigned_doctor_id = $1, escalated_at = $2, escalated_from = $3, \
             escalation_reason = $4 WHERE id = $5",
    )
    .bind(doctor.id)
    .bind(now)
    .bind(patient.assigned_caretaker_id)
    .bind(reason_text)
    .bind(patient.id)
    .execute(&mut *tx)
    .await?;

    add_notification(
        &mut *tx,
        doctor.id,
        "Escalated patient assigned",
        &format!(
            "{} requires doctor supervision: {}",
            patient.full_name, reason_text
        ),
        Severity::High,
    )
    .await?;
    if let Some(caretaker_id) = patient.assigned_caretaker_id {
        add_notification(
            &mut *tx,
            caretaker_id,
            "Patient escalated",
            &format!(
                "{} is now under the supervision of {}",
                patient.full_name, doctor.full_name
            ),
            Severity::Low,
        )
        .await?;
    }
    add_notification(
        &mut *tx,
        patient.id,
        "A doctor has joined your care team",
        &format!("{} is now supervising your care", doctor.full_name),
        Severity::Low,
    )
    .await?;
    add_audit(
        &mut *tx,
        actor,
        patient.id,
        "patient_escalated",
        serde_json::json!({
            "doctor_id": doctor.id,
            "doctor_name": doctor.full_name,
            "reason": reason_text,
            "automatic": automatic,
        }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn insert_invitation(pool: &PgPool, invitation: &Invitation) -> CareResult<()> {
    sqlx::query(
        r#"
        INSERT INTO care_engine.invitations
        (id, sender_id, recipient_email, invite_type, status, message, created_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(invitation.id)
    .bind(invitation.sender_id)
    .bind(&invitation.recipient_email)
    .bind(invitation.invite_type.as_str())
    .bind(invitation.status.as_str())
    .bind(&invitation.message)
    .bind(invitation.created_at)
    .bind(invitation.expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fetch_invitation(pool: &PgPool, id: Uuid) -> CareResult<Invitation> {
    let row = sqlx::query(
        "SELECT id, sender_id, recipient_email, invite_type, status, message, \
         created_at, expires_at FROM care_engine.invitations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.as_ref()
        .map(map_invitation)
        .transpose()?
        .ok_or_else(|| CareError::NotFound(format!("invitation {id}")))
}

pub async fn set_invitation_status(
    pool: &PgPool,
    id: Uuid,
    status: InvitationStatus,
) -> CareResult<()> {
    sqlx::query("UPDATE care_engine.invitations SET status = $1 WHERE id = $2")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Link an accepted invitee into the sender's care team. Replaces any
/// previous assignee for that role.
pub async fn link_care_provider(
    pool: &PgPool,
    patient_id: Uuid,
    provider_id: Uuid,
    role: CareRole,
) -> CareResult<()> {
    let query = match role {
        CareRole::Doctor => {
            "UPDATE care_engine.patients SET assigned_doctor_id = $1 WHERE id = $2"
        }
        CareRole::Caretaker => {
            "UPDATE care_engine.patients SET assigned_caretaker_id = $1 WHERE id = $2"
        }
    };
    sqlx::query(query)
        .bind(provider_id)
        .bind(patient_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_provider_availability(
    pool: &PgPool,
    provider_id: Uuid,
    availability: Availability,
) -> CareResult<()> {
    sqlx::query("UPDATE care_engine.providers SET availability = $1 WHERE id = $2")
        .bind(availability.as_str())
        .bind(provider_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn fetch_vitals(
    pool: &PgPool,
    patient_id: Uuid,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> CareResult<Vec<VitalsReading>> {
    let mut query = String::from(
        "SELECT heart_rate, blood_pressure_systolic, blood_pressure_diastolic, \
         oxygen_level, temperature, glucose, respiration, device_id, recorded_at \
         FROM care_engine.vitals WHERE patient_id = $1",
    );
    let mut index = 2;
    if start.is_some() {
        query.push_str(&format!(" AND recorded_at >= ${index}"));
        index += 1;
    }
    if end.is_some() {
        query.push_str(&format!(" AND recorded_at < ${index}"));
    }
    query.push_str(" ORDER BY recorded_at");

    let mut rows = sqlx::query(&query).bind(patient_id);
    if let Some(value) = start {
        rows = rows.bind(value);
    }
    if let Some(value) = end {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(map_reading).collect())
}

pub async fn delete_expired_invitations(pool: &PgPool, now: DateTime<Utc>) -> CareResult<u64> {
    let result = sqlx::query(
        "DELETE FROM care_engine.invitations WHERE status = 'pending' AND expires_at < $1",
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_stale_notifications(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> CareResult<u64> {
    let result = sqlx::query(
        "DELETE FROM care_engine.notifications WHERE is_read AND created_at < $1",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn patient_roster(pool: &PgPool) -> CareResult<Vec<(Uuid, String)>> {
    let rows = sqlx::query("SELECT id, full_name FROM care_engine.patients ORDER BY full_name")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|row| (row.get("id"), row.get("full_name")))
        .collect())
}

pub struct DailyCounts {
    pub vitals: i64,
    pub low_alerts: i64,
    pub medium_alerts: i64,
    pub high_alerts: i64,
}

pub async fn daily_counts(
    pool: &PgPool,
    patient_id: Uuid,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
) -> CareResult<DailyCounts> {
    let vitals_row = sqlx::query(
        "SELECT COUNT(*) AS n FROM care_engine.vitals \
         WHERE patient_id = $1 AND recorded_at >= $2 AND recorded_at < $3",
    )
    .bind(patient_id)
    .bind(day_start)
    .bind(day_end)
    .fetch_one(pool)
    .await?;

    let alert_rows = sqlx::query(
        "SELECT severity, COUNT(*) AS n FROM care_engine.alerts \
         WHERE patient_id = $1 AND created_at >= $2 AND created_at < $3 GROUP BY severity",
    )
    .bind(patient_id)
    .bind(day_start)
    .bind(day_end)
    .fetch_all(pool)
    .await?;

    let mut counts = DailyCounts {
        vitals: vitals_row.get("n"),
        low_alerts: 0,
        medium_alerts: 0,
        high_alerts: 0,
    };
    for row in alert_rows {
        let severity: String = row.get("severity");
        let n: i64 = row.get("n");
        match Severity::parse(&severity) {
            Some(Severity::Low) => counts.low_alerts = n,
            Some(Severity::Medium) => counts.medium_alerts = n,
            Some(Severity::High) => counts.high_alerts = n,
            None => {}
        }
    }
    Ok(counts)
}

pub async fn upsert_daily_report(
    pool: &PgPool,
    patient_id: Uuid,
    report_date: NaiveDate,
    counts: &DailyCounts,
    summary: &str,
) -> CareResult<()> {
    sqlx::query(
        r#"
        INSERT INTO care_engine.daily_reports
        (id, patient_id, report_date, vitals_count, low_alerts, medium_alerts,
         high_alerts, summary, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (patient_id, report_date) DO UPDATE
        SET vitals_count = EXCLUDED.vitals_count,
            low_alerts = EXCLUDED.low_alerts,
            medium_alerts = EXCLUDED.medium_alerts,
            high_alerts = EXCLUDED.high_alerts,
            summary = EXCLUDED.summary
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(patient_id)
    .bind(report_date)
    .bind(counts.vitals)
    .bind(counts.low_alerts)
    .bind(counts.medium_alerts)
    .bind(counts.high_alerts)
    .bind(summary)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}
