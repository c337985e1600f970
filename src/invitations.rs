//! Care-team invitations: pending → accepted/declined, with expired pending
//! rows removed by the daily sweep rather than transitioned.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config::INVITATION_TTL_DAYS;
use crate::db;
use crate::error::{CareError, CareResult};
use crate::models::{CareRole, Invitation, InvitationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationAction {
    Accept,
    Decline,
}

impl InvitationAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "accept" => Some(InvitationAction::Accept),
            "decline" => Some(InvitationAction::Decline),
            _ => None,
        }
    }
}

pub async fn send_invitation(
    pool: &PgPool,
    actor: Uuid,
    recipient_email: &str,
    invite_type: CareRole,
    message: Option<String>,
) -> CareResult<Uuid> {
    db::fetch_user_email(pool, actor)
        .await?
        .ok_or(CareError::Unauthenticated)?;

    let recipient = recipient_email.trim();
    if recipient.is_empty() || !recipient.contains('@') {
        return Err(CareError::InvalidArgument(format!(
            "'{recipient_email}' is not a valid recipient email"
        )));
    }

    let now = Utc::now();
    let invitation = Invitation {
        id: Uuid::new_v4(),
        sender_id: actor,
        recipient_email: recipient.to_string(),
        invite_type,
        status: InvitationStatus::Pending,
        message: message.unwrap_or_default(),
        created_at: now,
        expires_at: now + Duration::days(INVITATION_TTL_DAYS),
    };
    db::insert_invitation(pool, &invitation).await?;

    info!(invitation = %invitation.id, invite_type = %invite_type, "invitation sent");
    Ok(invitation.id)
}

/// Everything that must hold before a response is applied. Kept pure so the
/// precondition rules are testable without a store: the caller must be the
/// addressed recipient, the invitation must still be pending, and it must
/// not have expired (expired rows stay pending until the sweep).
pub fn validate_response(
    invitation: &Invitation,
    responder_email: &str,
    now: DateTime<Utc>,
) -> CareResult<()> {
    if !invitation
        .recipient_email
        .eq_ignore_ascii_case(responder_email)
    {
        return Err(CareError::PermissionDenied(
            "this invitation is addressed to a different user".to_string(),
        ));
    }
    if invitation.status != InvitationStatus::Pending {
        return Err(CareError::FailedPrecondition(format!(
            "invitation has already been {}",
            invitation.status.as_str()
        )));
    }
    if invitation.is_expired(now) {
        return Err(CareError::FailedPrecondition(
            "invitation has expired".to_string(),
        ));
    }
    Ok(())
}

pub async fn respond_to_invitation(
    pool: &PgPool,
    actor: Uuid,
    invitation_id: Uuid,
    action: InvitationAction,
) -> CareResult<()> {
    let responder_email = db::fetch_user_email(pool, actor)
        .await?
        .ok_or(CareError::Unauthenticated)?;

    let invitation = db::fetch_invitation(pool, invitation_id).await?;
    validate_response(&invitation, &responder_email, Utc::now())?;

    match action {
        InvitationAction::Decline => {
            db::set_invitation_status(pool, invitation.id, InvitationStatus::Declined).await?;
        }
        InvitationAction::Accept => {
            let responder = db::fetch_provider(pool, actor).await?.ok_or_else(|| {
                CareError::FailedPrecondition(
                    "the invited user is not a registered care provider".to_string(),
                )
            })?;
            if responder.role != invitation.invite_type {
                return Err(CareError::FailedPrecondition(format!(
                    "invitation is for a {} but the responder is a {}",
                    invitation.invite_type, responder.role
                )));
            }
            let patient = db::try_fetch_patient(pool, invitation.sender_id)
                .await?
                .ok_or_else(|| {
                    CareError::NotFound(format!("patient {}", invitation.sender_id))
                })?;
            db::set_invitation_status(pool, invitation.id, InvitationStatus::Accepted).await?;
            db::link_care_provider(pool, patient.id, responder.id, invitation.invite_type)
                .await?;
        }
    }

    info!(invitation = %invitation.id, accepted = matches!(action, InvitationAction::Accept), "invitation resolved");
    Ok(())
}

/// Daily sweep: expired invitations that were never answered are deleted,
/// not transitioned.
pub async fn sweep_expired(pool: &PgPool) -> CareResult<u64> {
    let removed = db::delete_expired_invitations(pool, Utc::now()).await?;
    info!(removed, "expired pending invitations swept");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(status: InvitationStatus, created_days_ago: i64) -> Invitation {
        let created_at = Utc::now() - Duration::days(created_days_ago);
        Invitation {
            id: Uuid::from_u128(7),
            sender_id: Uuid::from_u128(1),
            recipient_email: "imani.brooks@vitalwatch.health".to_string(),
            invite_type: CareRole::Caretaker,
            status,
            message: String::new(),
            created_at,
            expires_at: created_at + Duration::days(INVITATION_TTL_DAYS),
        }
    }

    #[test]
    fn pending_unexpired_invitation_is_accepted() {
        let inv = invitation(InvitationStatus::Pending, 1);
        assert!(validate_response(&inv, "imani.brooks@vitalwatch.health", Utc::now()).is_ok());
    }

    #[test]
    fn recipient_email_is_case_insensitive() {
        let inv = invitation(InvitationStatus::Pending, 1);
        assert!(validate_response(&inv, "Imani.Brooks@VitalWatch.health", Utc::now()).is_ok());
    }

    #[test]
    fn wrong_recipient_is_denied() {
        let inv = invitation(InvitationStatus::Pending, 1);
        let err = validate_response(&inv, "sam.porter@vitalwatch.health", Utc::now())
            .expect_err("should reject");
        assert!(matches!(err, CareError::PermissionDenied(_)));
    }

    #[test]
    fn already_answered_fails_precondition() {
        let inv = invitation(InvitationStatus::Accepted, 1);
        let err = validate_response(&inv, "imani.brooks@vitalwatch.health", Utc::now())
            .expect_err("should reject");
        assert!(matches!(err, CareError::FailedPrecondition(_)));
    }

    #[test]
    fn expired_invitation_fails_precondition_and_stays_pending() {
        let inv = invitation(InvitationStatus::Pending, INVITATION_TTL_DAYS + 1);
        let err = validate_response(&inv, "imani.brooks@vitalwatch.health", Utc::now())
            .expect_err("should reject");
        assert!(matches!(err, CareError::FailedPrecondition(_)));
        // The row itself is untouched; deletion is the sweep's job.
        assert_eq!(inv.status, InvitationStatus::Pending);
    }
}
