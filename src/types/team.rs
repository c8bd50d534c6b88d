use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: String,

    pub name: String,
}

/// Membership record, also the body for `POST teams/{id}/members`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TeamMember {
    pub team_id: String,
    pub user_id: String,
}
