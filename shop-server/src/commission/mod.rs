//! Commission Engine
//!
//! Exactly one commission per (partner, order), written once. The amount is
//! `order_total × percent / 100` rounded half away from zero; a 0 % partner
//! gets a `waived` row so the attribution is still on record.

pub mod attribution;

use shared::error::{AppError, ErrorCode};
use shared::models::{CommissionStatus, Order, PartnerCommission, PartnerConfig, PartnerCreate};

use crate::audit::{self, AuditAction};
use crate::auth::{Actor, Role};
use crate::db::repository::{commission as repo, partner as partner_repo};
use crate::error::ServiceResult;
use crate::money::percent_of_cents;
use crate::state::AppState;

pub use attribution::resolve_partner_code;

/// Compute and persist the commission of `order` for `partner_code`
///
/// `None` when the partner is unknown or inactive, or the commission already
/// exists (including a race lost at insert time).
pub async fn compute_commission(
    state: &AppState,
    order: &Order,
    partner_code: &str,
    attribution_source: Option<&str>,
) -> ServiceResult<Option<PartnerCommission>> {
    let Some(partner) = partner_repo::find_by_code(&state.pool, partner_code).await? else {
        tracing::debug!(order_id = order.id, partner_code, "No partner for attribution code");
        return Ok(None);
    };
    if !partner.active {
        tracing::debug!(order_id = order.id, partner_code, "Partner inactive, no commission");
        return Ok(None);
    }
    if repo::exists(&state.pool, partner.id, order.id).await? {
        return Ok(None);
    }

    let commission_cents = percent_of_cents(order.total_cents, partner.commission_percent);
    let status = if partner.commission_percent == 0.0 {
        CommissionStatus::Waived
    } else {
        CommissionStatus::Pending
    };

    let mut tx = state.pool.begin().await?;
    let Some(commission) = repo::insert_if_absent(
        &mut tx,
        &repo::NewCommission {
            partner_config_id: partner.id,
            order_id: order.id,
            order_total_cents: order.total_cents,
            commission_percent: partner.commission_percent,
            commission_cents,
            status,
            attribution_source,
        },
        shared::util::now_millis(),
    )
    .await?
    else {
        return Ok(None);
    };
    audit::record(
        &mut tx,
        &Actor::system("commission"),
        AuditAction::CommissionCreated,
        "commission",
        &commission.id.to_string(),
        Some(serde_json::json!({
            "partner_code": partner.code,
            "order_id": order.id,
            "commission_cents": commission.commission_cents,
            "status": commission.status,
        })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        order_id = order.id,
        partner = %partner.code,
        commission_cents,
        status = status.as_str(),
        "Commission recorded"
    );
    Ok(Some(commission))
}

/// Attribute a paid order from its campaign and record the commission
pub async fn attribute_order(state: &AppState, order: &Order) -> ServiceResult<Option<PartnerCommission>> {
    let Some(code) = resolve_partner_code(
        order.utm_campaign.as_deref(),
        &state.config.attribution_marker,
        &state.config.attribution_partner_code,
    ) else {
        return Ok(None);
    };
    compute_commission(state, order, &code, order.utm_campaign.as_deref()).await
}

/// `pending -> paid` with the payout transfer reference
pub async fn mark_commission_paid(
    state: &AppState,
    commission_id: i64,
    transfer_id: &str,
    actor: &Actor,
) -> ServiceResult<PartnerCommission> {
    actor.require_admin()?;
    let transfer_id = transfer_id.trim();
    if transfer_id.is_empty() {
        return Err(AppError::validation("transfer_id is required").into());
    }

    let existing = repo::find_by_id(&state.pool, commission_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CommissionNotFound).with_detail("commission_id", commission_id))?;
    if existing.status != CommissionStatus::Pending {
        return Err(AppError::new(ErrorCode::CommissionNotPayable)
            .with_detail("status", existing.status.as_str())
            .into());
    }

    let mut tx = state.pool.begin().await?;
    let Some(paid) = repo::mark_paid(&mut tx, commission_id, transfer_id, shared::util::now_millis()).await? else {
        return Err(AppError::with_message(ErrorCode::CommissionNotPayable, "Commission changed concurrently").into());
    };
    audit::record(
        &mut tx,
        actor,
        AuditAction::CommissionPaid,
        "commission",
        &commission_id.to_string(),
        Some(serde_json::json!({
            "transfer_id": transfer_id,
            "commission_cents": paid.commission_cents,
        })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(commission_id, transfer_id, "Commission paid");
    Ok(paid)
}

/// Commissions visible to `actor`; partners only ever see their own
pub async fn list_commissions(
    state: &AppState,
    actor: &Actor,
    partner_id: Option<i64>,
    status: Option<CommissionStatus>,
) -> ServiceResult<Vec<PartnerCommission>> {
    let partner_id = match actor.role {
        Role::Partner => actor.partner_id,
        Role::Admin | Role::Viewer => partner_id,
        Role::System => return Err(AppError::forbidden("Not available to system callers").into()),
    };
    Ok(repo::list(&state.pool, partner_id, status).await?)
}

pub async fn create_partner(state: &AppState, data: PartnerCreate, actor: &Actor) -> ServiceResult<PartnerConfig> {
    actor.require_admin()?;
    if data.code.trim().is_empty() || data.name.trim().is_empty() {
        return Err(AppError::validation("code and name are required").into());
    }
    let mut tx = state.pool.begin().await?;
    let partner = partner_repo::create(&mut tx, data).await?;
    audit::record(
        &mut tx,
        actor,
        AuditAction::PartnerCreated,
        "partner",
        &partner.id.to_string(),
        Some(serde_json::json!({
            "code": partner.code,
            "commission_percent": partner.commission_percent,
        })),
    )
    .await?;
    tx.commit().await?;
    Ok(partner)
}

/// Inactive partners earn no new commissions; existing rows are untouched
pub async fn deactivate_partner(state: &AppState, partner_id: i64, actor: &Actor) -> ServiceResult<()> {
    actor.require_admin()?;
    let mut tx = state.pool.begin().await?;
    if !partner_repo::set_active(&mut tx, partner_id, false).await? {
        return Err(AppError::new(ErrorCode::PartnerNotFound).with_detail("partner_id", partner_id).into());
    }
    audit::record(
        &mut tx,
        actor,
        AuditAction::PartnerDeactivated,
        "partner",
        &partner_id.to_string(),
        None,
    )
    .await?;
    tx.commit().await?;
    Ok(())
}
