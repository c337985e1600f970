//! Provider-facing operations.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::error::{CareError, CareResult};
use crate::models::Availability;

/// Providers set their own availability; patients have no such field, so a
/// non-provider caller is rejected.
pub async fn update_availability(
    pool: &PgPool,
    actor: Uuid,
    availability: Availability,
) -> CareResult<Availability> {
    let provider = db::fetch_provider(pool, actor).await?.ok_or_else(|| {
        CareError::PermissionDenied(
            "only doctors and caretakers can set availability".to_string(),
        )
    })?;

    db::update_provider_availability(pool, provider.id, availability).await?;
    info!(provider = %provider.id, availability = availability.as_str(), "availability updated");
    Ok(availability)
}
