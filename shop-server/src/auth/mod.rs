//! Operator authentication
//!
//! Tokens are issued by the storefront's login flow; this service only
//! validates them and turns the claims into an [`Actor`].

mod extractor;
pub mod jwt;

pub use extractor::{CRON_TOKEN_HEADER, CronAuth};
pub use jwt::{Claims, JwtError, JwtService};

use serde::{Deserialize, Serialize};
use shared::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Mutates fulfillment, commissions, ledger and reports
    Admin,
    /// Read-only back office access
    Viewer,
    /// Partner portal; sees its own commissions only
    Partner,
    /// Webhook and cron triggers
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Viewer => "viewer",
            Self::Partner => "partner",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "viewer" => Ok(Self::Viewer),
            "partner" => Ok(Self::Partner),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Authenticated caller of an operator action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
    /// Set for `Role::Partner`
    pub partner_id: Option<i64>,
}

impl Actor {
    /// Actor for webhook- and cron-triggered work
    pub fn system(source: &str) -> Self {
        Self {
            id: format!("system:{source}"),
            email: None,
            role: Role::System,
            partner_id: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            crate::security_log!(WARN, "admin_required", actor_id = %self.id, role = self.role.as_str());
            Err(AppError::admin_required())
        }
    }

    /// Back office read access; partners only see their own data
    pub fn require_back_office(&self) -> Result<(), AppError> {
        match self.role {
            Role::Admin | Role::Viewer => Ok(()),
            _ => Err(AppError::forbidden("Back office access required")),
        }
    }

    /// Label stored in `created_by` / `generated_by` columns
    pub fn label(&self) -> String {
        match &self.email {
            Some(email) => email.clone(),
            None => self.id.clone(),
        }
    }
}

impl TryFrom<Claims> for Actor {
    type Error = String;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role: Role = claims.role.parse()?;
        if role == Role::Partner && claims.partner_id.is_none() {
            return Err("partner token without partner_id".into());
        }
        Ok(Self {
            id: claims.sub,
            email: claims.email,
            role,
            partner_id: claims.partner_id,
        })
    }
}
