use serde::{Deserialize, Serialize};

/// A Mattermost account, as returned by the users endpoints. Only the
/// fields this tool touches are kept; the server sends many more.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,

    pub username: String,

    pub email: String,

    #[serde(default)]
    pub nickname: String,

    /// Unix millis of deactivation, 0 for active accounts.
    #[serde(default)]
    pub delete_at: i64,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.delete_at == 0
    }
}

/// Partial update for `PUT users/{id}/patch`. Absent fields are left
/// untouched by the server, so everything is optional.
#[derive(Debug, Default, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// Body for `PUT users/{id}/active`.
#[derive(Debug, Serialize)]
pub struct ActiveRequest {
    pub active: bool,
}
