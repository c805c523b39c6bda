//! Backoffice user models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nature_de_pierre_core::{AdminRole, AdminUserId, Email};

/// A backoffice account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The admin making the current request, as carried by the bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAdmin {
    pub id: AdminUserId,
    pub email: String,
    pub role: AdminRole,
}

impl CurrentAdmin {
    #[must_use]
    pub const fn can_write(&self) -> bool {
        self.role.can_write()
    }
}

impl From<&AdminUser> for CurrentAdmin {
    fn from(admin: &AdminUser) -> Self {
        Self {
            id: admin.id,
            email: admin.email.as_str().to_owned(),
            role: admin.role,
        }
    }
}
