//! Care-team assignment: runs the scorer over the live provider pool and
//! persists the winning candidate with its factor breakdown.

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config::ScoringWeights;
use crate::db;
use crate::error::{CareError, CareResult};
use crate::models::{CareRole, Urgency};
use crate::scoring::{self, PatientProfile};

#[derive(Debug)]
pub struct AssignmentOutcome {
    pub assigned_id: Uuid,
    pub assigned_name: String,
    pub role: CareRole,
    pub score: f64,
    pub matched_conditions: Vec<String>,
}

/// Assign the best-scoring provider of `role` to the patient. Repeating the
/// call reruns scoring and overwrites the previous assignee; there is
/// deliberately no "already assigned" guard, so callers always see the
/// current ranking applied.
pub async fn assign_care_team_member(
    pool: &PgPool,
    actor: Uuid,
    patient_id: Uuid,
    role: CareRole,
    preferred_specialization: Option<String>,
    urgency: Urgency,
    auto_escalate: bool,
) -> CareResult<AssignmentOutcome> {
    db::fetch_user_email(pool, actor)
        .await?
        .ok_or(CareError::Unauthenticated)?;

    let patient = db::fetch_patient(pool, patient_id).await?;
    if !patient.is_managed_by(actor) {
        return Err(CareError::PermissionDenied(
            "only the patient or their caretaker may manage the care team".to_string(),
        ));
    }

    let candidates = db::providers_with_workload(pool, role).await?;
    let profile = PatientProfile {
        chronic_conditions: patient.chronic_conditions.clone(),
        preferred_specialization,
    };
    let weights = ScoringWeights::default();
    let ranked = scoring::rank_candidates(&candidates, &profile, urgency, &weights);
    let top = scoring::select_top(&ranked, role)?;

    let reason = scoring::build_reason(role, top, Utc::now());
    let matched = scoring::matched_conditions(top);
    db::apply_assignment(
        pool,
        &patient,
        role,
        top,
        &reason,
        auto_escalate && role == CareRole::Caretaker,
        &matched,
        actor,
    )
    .await?;

    info!(
        patient = %patient.id,
        assignee = %top.provider.id,
        role = %role,
        score = top.score,
        "care team member assigned"
    );

    Ok(AssignmentOutcome {
        assigned_id: top.provider.id,
        assigned_name: top.provider.full_name.clone(),
        role,
        score: top.score,
        matched_conditions: matched,
    })
}
