//! Producer registry

use shared::error::AppError;
use shared::models::{Producer, ProducerCreate};

use crate::audit::{self, AuditAction};
use crate::auth::Actor;
use crate::db::repository::producer as repo;
use crate::error::ServiceResult;
use crate::state::AppState;

pub async fn create_producer(state: &AppState, data: ProducerCreate, actor: &Actor) -> ServiceResult<Producer> {
    actor.require_admin()?;
    if data.name.trim().is_empty() {
        return Err(AppError::validation("name is required").into());
    }
    if let Some(url) = &data.notify_url
        && !(url.starts_with("https://") || url.starts_with("http://"))
    {
        return Err(AppError::validation("notify_url must be an http(s) URL").into());
    }
    let mut tx = state.pool.begin().await?;
    let producer = repo::create(&mut tx, data).await?;
    audit::record(
        &mut tx,
        actor,
        AuditAction::ProducerCreated,
        "producer",
        &producer.id.to_string(),
        Some(serde_json::json!({ "code": producer.code })),
    )
    .await?;
    tx.commit().await?;
    tracing::info!(producer_id = producer.id, code = %producer.code, "Producer registered");
    Ok(producer)
}

pub async fn list_producers(state: &AppState, actor: &Actor) -> ServiceResult<Vec<Producer>> {
    actor.require_back_office()?;
    Ok(repo::list(&state.pool).await?)
}
