//! Test fixtures: in-memory database, stub channels, seed helpers

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::models::{
    FulfillmentOrder, FulfillmentStatus, LedgerAmounts, LedgerEntry, LedgerEntryType, Order, OrderCreate,
    OrderItemCreate, OrderStatus, PartnerConfig, PartnerCreate, Producer, ProducerCreate,
};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::mpsc;

use crate::auth::{Actor, Role};
use crate::channels::{
    AlertChannel, ChannelError, Channels, GatewayError, PaymentGateway, ProducerNotice, ProducerNotifier, TrackingSync,
};
use crate::config::Config;
use crate::db::DbService;
use crate::db::repository::{
    ledger as ledger_repo, order as order_repo, partner as partner_repo, producer as producer_repo,
};
use crate::fulfillment::RetryPolicy;
use crate::ledger::entries::sale_amounts;
use crate::ledger::split::{Beneficiary, split_profit};
use crate::side_effects::{SideEffect, SideEffectQueue, SideEffectWorker};
use crate::state::AppState;

/// Producer cost per unit for orders seeded by [`order`]
pub const UNIT_COST_CENTS: i64 = 400;
/// Fee reported by [`StubGateway`]
pub const GATEWAY_FEE_CENTS: i64 = 175;

/// Single-connection in-memory database with migrations applied
pub async fn pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    DbService::migrate(&pool).await.unwrap();
    pool
}

pub fn config(retry_policy: RetryPolicy) -> Config {
    Config {
        database_path: ":memory:".into(),
        http_port: 0,
        environment: "development".into(),
        log_level: "debug".into(),
        log_json: false,
        log_dir: None,
        jwt_secret: "test-jwt-secret".into(),
        stripe_secret_key: "sk_test".into(),
        stripe_webhook_secret: "whsec_test".into(),
        cron_token: "test-cron-token".into(),
        tracking_url: None,
        alert_webhook_url: None,
        outbound_timeout_secs: 5,
        retry_policy,
        stale_pending_minutes: 60,
        attribution_marker: "mkt-engine".into(),
        attribution_partner_code: "HOUSE".into(),
        profit_split: vec![
            Beneficiary {
                name: "owner".into(),
                bps: 7000,
            },
            Beneficiary {
                name: "ops".into(),
                bps: 3000,
            },
        ],
    }
}

/// App state wired to recording stubs
pub struct TestEnv {
    pub state: AppState,
    pub notifier: Arc<StubNotifier>,
    pub tracking: Arc<RecordingTracking>,
    pub alerts: Arc<RecordingAlerts>,
    pub gateway: Arc<StubGateway>,
    rx: tokio::sync::Mutex<mpsc::Receiver<SideEffect>>,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_policy(RetryPolicy::default()).await
    }

    pub async fn with_policy(retry_policy: RetryPolicy) -> Self {
        Self::with_config(config(retry_policy)).await
    }

    pub async fn with_config(config: Config) -> Self {
        let notifier = Arc::new(StubNotifier::default());
        let tracking = Arc::new(RecordingTracking::default());
        let alerts = Arc::new(RecordingAlerts::default());
        let gateway = Arc::new(StubGateway::default());
        let channels = Channels {
            notifier: notifier.clone(),
            tracking: tracking.clone(),
            alerts: alerts.clone(),
            gateway: gateway.clone(),
        };
        let (queue, rx) = SideEffectQueue::new();
        let state = AppState::new(pool().await, config, channels, queue);
        Self {
            state,
            notifier,
            tracking,
            alerts,
            gateway,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Apply every queued side effect now, in order
    pub async fn drain_side_effects(&self) {
        let worker = SideEffectWorker::new(self.tracking.clone(), self.alerts.clone());
        let mut rx = self.rx.lock().await;
        while let Ok(effect) = rx.try_recv() {
            worker.apply(effect).await;
        }
    }
}

/// Producer notifier that succeeds unless told to fail for a producer
#[derive(Default)]
pub struct StubNotifier {
    failing: Mutex<HashSet<i64>>,
    calls: Mutex<HashMap<i64, usize>>,
}

impl StubNotifier {
    pub fn fail_for(&self, producer_id: i64) {
        self.failing.lock().unwrap().insert(producer_id);
    }

    pub fn succeed_for(&self, producer_id: i64) {
        self.failing.lock().unwrap().remove(&producer_id);
    }

    pub fn calls_for(&self, producer_id: i64) -> usize {
        self.calls.lock().unwrap().get(&producer_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ProducerNotifier for StubNotifier {
    async fn notify(&self, notice: &ProducerNotice) -> Result<(), ChannelError> {
        let producer_id = notice.producer.id;
        *self.calls.lock().unwrap().entry(producer_id).or_default() += 1;
        if self.failing.lock().unwrap().contains(&producer_id) {
            return Err(ChannelError::Status {
                status: 503,
                body: "producer unavailable".into(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingTracking {
    failing: AtomicBool,
    upserts: Mutex<Vec<(String, i64, FulfillmentStatus)>>,
    statuses: Mutex<Vec<(String, OrderStatus)>>,
}

impl RecordingTracking {
    pub fn failing() -> Self {
        let t = Self::default();
        t.set_failing(true);
        t
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn upserts(&self) -> Vec<(String, i64, FulfillmentStatus)> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn order_statuses(&self) -> Vec<(String, OrderStatus)> {
        self.statuses.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), ChannelError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ChannelError::Status {
                status: 500,
                body: "tracking down".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TrackingSync for RecordingTracking {
    async fn upsert_fulfillment(&self, order_number: &str, fo: &FulfillmentOrder) -> Result<(), ChannelError> {
        self.check()?;
        self.upserts
            .lock()
            .unwrap()
            .push((order_number.to_string(), fo.id, fo.status));
        Ok(())
    }

    async fn update_order_status(&self, order_number: &str, status: OrderStatus) -> Result<(), ChannelError> {
        self.check()?;
        self.statuses.lock().unwrap().push((order_number.to_string(), status));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAlerts {
    messages: Mutex<Vec<String>>,
}

impl RecordingAlerts {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertChannel for RecordingAlerts {
    async fn send(&self, message: &str) -> Result<(), ChannelError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Gateway reporting a fixed fee
#[derive(Default)]
pub struct StubGateway {
    failing: AtomicBool,
}

impl StubGateway {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn fee_for(&self, payment_ref: &str) -> Result<i64, GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::FeeUnavailable(payment_ref.to_string()));
        }
        Ok(GATEWAY_FEE_CENTS)
    }
}

pub async fn producer(state: &AppState, code: &str) -> Producer {
    let mut conn = state.pool.acquire().await.unwrap();
    producer_repo::create(
        &mut conn,
        ProducerCreate {
            code: code.into(),
            name: format!("{code} Producer"),
            notify_url: Some(format!("https://{}.producer.test/orders", code.to_lowercase())),
            contact_email: None,
        },
    )
    .await
    .unwrap()
}

/// Order still awaiting payment; lines are `(producer_id, sku, quantity, unit_price_cents)`
pub async fn unpaid_order(state: &AppState, number: &str, lines: &[(i64, &str, i64, i64)]) -> Order {
    let data = OrderCreate {
        order_number: number.into(),
        customer_email: Some(format!("{}@customer.test", number.to_lowercase())),
        packaging_cents: 0,
        shipping_cents: 0,
        customs_cents: 0,
        utm_source: None,
        utm_campaign: None,
        items: lines
            .iter()
            .map(|(producer_id, sku, quantity, unit_price_cents)| OrderItemCreate {
                producer_id: *producer_id,
                sku: sku.to_string(),
                name: format!("Item {sku}"),
                quantity: *quantity,
                unit_price_cents: *unit_price_cents,
                unit_cost_cents: UNIT_COST_CENTS,
            })
            .collect(),
    };
    order_repo::create(&state.pool, &data).await.unwrap()
}

/// Paid order with payment ref `pi_<number>`
pub async fn order(state: &AppState, number: &str, lines: &[(i64, &str, i64, i64)]) -> Order {
    let order = unpaid_order(state, number, lines).await;
    let mut conn = state.pool.acquire().await.unwrap();
    assert!(
        order_repo::mark_paid(&mut conn, order.id, &format!("pi_{number}"), shared::util::now_millis())
            .await
            .unwrap()
    );
    drop(conn);
    order_repo::find_by_id(&state.pool, order.id).await.unwrap().unwrap()
}

pub async fn partner(state: &AppState, code: &str, commission_percent: f64) -> PartnerConfig {
    let mut conn = state.pool.acquire().await.unwrap();
    partner_repo::create(
        &mut conn,
        PartnerCreate {
            code: code.into(),
            name: format!("{code} Partner"),
            commission_percent,
            payout_account: None,
        },
    )
    .await
    .unwrap()
}

/// Noon UTC of a calendar day, in millis
pub fn noon_millis(year: i32, month: u32, day: u32) -> i64 {
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap()
        .and_utc()
        .timestamp_millis()
}

/// Ledger entry written as of `created_at`
pub async fn entry_at(
    state: &AppState,
    order_id: i64,
    entry_type: LedgerEntryType,
    amounts: &LedgerAmounts,
    created_at: i64,
) -> LedgerEntry {
    let shares = split_profit(amounts.gross_profit(), &state.config.profit_split);
    let mut conn = state.pool.acquire().await.unwrap();
    ledger_repo::insert_entry(
        &mut conn,
        &ledger_repo::NewEntry {
            order_id,
            entry_type,
            amounts,
            note: None,
            created_by: "test",
            shares: &shares,
        },
        created_at,
    )
    .await
    .unwrap()
}

/// Sale entry of a paid order, at the stub gateway fee, written as of `created_at`
pub async fn sale_at(state: &AppState, order: &Order, created_at: i64) -> LedgerEntry {
    let amounts = sale_amounts(order, GATEWAY_FEE_CENTS);
    entry_at(state, order.id, LedgerEntryType::Sale, &amounts, created_at).await
}

pub fn admin() -> Actor {
    admin_as("admin@shop.test")
}

pub fn admin_as(email: &str) -> Actor {
    Actor {
        id: format!("user:{email}"),
        email: Some(email.into()),
        role: Role::Admin,
        partner_id: None,
    }
}

pub fn viewer() -> Actor {
    Actor {
        id: "user:viewer@shop.test".into(),
        email: Some("viewer@shop.test".into()),
        role: Role::Viewer,
        partner_id: None,
    }
}

pub fn partner_actor(partner_id: i64) -> Actor {
    Actor {
        id: format!("partner:{partner_id}"),
        email: None,
        role: Role::Partner,
        partner_id: Some(partner_id),
    }
}
