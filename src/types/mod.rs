pub mod channel;
pub mod team;
pub mod user;

use serde::Deserialize;

/// Generic body returned by Mattermost mutation endpoints that carry no
/// resource, like session revocation or member removal.
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Error body returned by the server on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub message: String,
}

impl ApiError {
    /// Best human readable description the body offers.
    pub fn describe(self) -> Option<String> {
        if !self.message.is_empty() {
            return Some(self.message);
        }
        if !self.id.is_empty() {
            return Some(self.id);
        }
        None
    }
}
