use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,

    pub name: String,
}

/// Body for `POST channels/{id}/members`. The server fills in the rest.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelMember {
    pub user_id: String,
}

/// Convert a human readable channel name to the URL form the name lookup
/// endpoint expects: lower case, spaces replaced with dashes.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("My Channel"), "my-channel");
        assert_eq!(normalize_name("town-square"), "town-square");
        assert_eq!(normalize_name("Off Topic Chat"), "off-topic-chat");
        assert_eq!(normalize_name(""), "");
    }
}
