//! Audit log rows, derived notifications and dashboard figures.

use chrono::{DateTime, Utc};

use super::auth::{Role, User};
use serde::{Deserialize, Serialize};

/// One audited change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub table_name: String,
    pub record_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OverdueInvoice,
    LowStock,
    PendingLeave,
}

/// A notification computed from live data; nothing is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub url: String,
    pub record_id: i64,
}

/// Response body of the notifications endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationFeed {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

impl NotificationFeed {
    pub fn new(notifications: Vec<Notification>) -> Self {
        let unread_count = notifications.len();
        NotificationFeed {
            notifications,
            unread_count,
        }
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// User counts over live accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    pub admin_users: i64,
    pub inactive_users: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Normal,
    Important,
}

/// One line of the dashboard's recent activity list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub time: DateTime<Utc>,
    pub importance: Importance,
}

impl Activity {
    /// A registration; accounts above employee level are flagged important.
    pub fn registered(user: &User) -> Self {
        Activity {
            kind: "user".to_string(),
            description: format!("New user registered: {}", user.full_name()),
            time: user.created_at,
            importance: match user.role {
                Role::Employee => Importance::Normal,
                _ => Importance::Important,
            },
        }
    }
}

/// Response body of the dashboard endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub stats: UserStats,
    pub recent_activities: Vec<Activity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, first_name: Option<&str>) -> User {
        User {
            id: 1,
            username: "grace".to_string(),
            email: "grace@example.com".to_string(),
            password_hash: String::new(),
            first_name: first_name.map(str::to_string),
            last_name: None,
            role,
            is_active: true,
            last_login: None,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_registration_activity() {
        let activity = Activity::registered(&user(Role::Employee, Some("Grace")));
        assert_eq!(activity.description, "New user registered: Grace");
        assert_eq!(activity.importance, Importance::Normal);

        let activity = Activity::registered(&user(Role::Viewer, None));
        assert_eq!(activity.description, "New user registered: grace");
        assert_eq!(activity.importance, Importance::Important);
    }

    #[test]
    fn test_activity_serializes_type_field() {
        let json = serde_json::to_value(Activity::registered(&user(Role::Admin, None))).unwrap();
        assert_eq!(json["type"], "user");
        assert_eq!(json["importance"], "important");
    }
}
