use anyhow::{bail, Context, Result};
use log::{debug, info};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::Site;
use crate::types::channel::{Channel, ChannelMember};
use crate::types::team::{Team, TeamMember};
use crate::types::user::{ActiveRequest, User, UserPatch};
use crate::types::{ApiError, StatusResponse};

/// Authenticated handle to one Mattermost server. All calls go through the
/// REST v4 API with a bearer token.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    client: reqwest::Client,
    token: String,
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("network error: {0}")]
    Network(#[from] anyhow::Error),

    #[error("client error: {0}")]
    Client(String),

    #[error("server error: code {code}, {message}")]
    Server { code: u16, message: String },

    #[error("server returned invalid json: {0:?}")]
    InvalidJson(String),

    #[error("unexpected error: {0}")]
    Unexpected(&'static str),
}

enum Payload {
    None,
    Json(String),
}

impl Client {
    /// Build a client for the resolved site and verify both the connection
    /// and the token with a `users/me` round trip.
    pub async fn connect(site: &Site, token: String) -> Result<Self> {
        let base_url = site.base_url();
        if Url::parse(&base_url).is_err() {
            bail!("invalid server url '{base_url}'");
        }

        let client = Client {
            base_url,
            client: reqwest::Client::new(),
            token,
        };

        let me = client.me().await.context("verify session")?;
        info!("Authenticated to '{}' as '{}'", site.host, me.username);

        Ok(client)
    }

    pub async fn me(&self) -> Result<User, RequestError> {
        self.do_request(Method::GET, "users/me", Payload::None)
            .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User, RequestError> {
        let path = format!("users/email/{email}");
        self.do_request(Method::GET, &path, Payload::None).await
    }

    pub async fn revoke_all_sessions(&self, user_id: &str) -> Result<(), RequestError> {
        let path = format!("users/{user_id}/sessions/revoke/all");
        let resp: StatusResponse = self.do_request(Method::POST, &path, Payload::None).await?;
        if !resp.is_ok() {
            return Err(RequestError::Unexpected(
                "server did not confirm session revocation",
            ));
        }
        Ok(())
    }

    pub async fn update_active(&self, user_id: &str, active: bool) -> Result<(), RequestError> {
        let path = format!("users/{user_id}/active");
        let json = serde_json::to_string(&ActiveRequest { active }).unwrap();
        let resp: StatusResponse = self
            .do_request(Method::PUT, &path, Payload::Json(json))
            .await?;
        if !resp.is_ok() {
            return Err(RequestError::Unexpected(
                "server did not confirm active status update",
            ));
        }
        Ok(())
    }

    /// Apply a partial update and return the user as the server now sees it.
    pub async fn patch_user(&self, user_id: &str, patch: &UserPatch) -> Result<User, RequestError> {
        let path = format!("users/{user_id}/patch");
        let json = serde_json::to_string(patch).unwrap();
        self.do_request(Method::PUT, &path, Payload::Json(json))
            .await
    }

    pub async fn get_team_by_name(&self, name: &str) -> Result<Team, RequestError> {
        let path = format!("teams/name/{name}");
        self.do_request(Method::GET, &path, Payload::None).await
    }

    pub async fn add_team_member(&self, team_id: &str, user_id: &str) -> Result<(), RequestError> {
        let path = format!("teams/{team_id}/members");
        let member = TeamMember {
            team_id: team_id.to_string(),
            user_id: user_id.to_string(),
        };
        let json = serde_json::to_string(&member).unwrap();
        // A successful response echoes the membership back.
        let created: TeamMember = self
            .do_request(Method::POST, &path, Payload::Json(json))
            .await?;
        if created.team_id != team_id || created.user_id != user_id {
            return Err(RequestError::Unexpected(
                "server returned mismatched team membership",
            ));
        }
        Ok(())
    }

    pub async fn remove_team_member(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<(), RequestError> {
        let path = format!("teams/{team_id}/members/{user_id}");
        let resp: StatusResponse = self
            .do_request(Method::DELETE, &path, Payload::None)
            .await?;
        if !resp.is_ok() {
            return Err(RequestError::Unexpected(
                "server did not confirm team member removal",
            ));
        }
        Ok(())
    }

    /// Look up a channel by its URL name within a team. The name must
    /// already be normalized, see [`crate::types::channel::normalize_name`].
    pub async fn get_channel_by_name(
        &self,
        team_name: &str,
        channel_name: &str,
    ) -> Result<Channel, RequestError> {
        let path = format!("teams/name/{team_name}/channels/name/{channel_name}");
        self.do_request(Method::GET, &path, Payload::None).await
    }

    pub async fn add_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<(), RequestError> {
        let path = format!("channels/{channel_id}/members");
        let member = ChannelMember {
            user_id: user_id.to_string(),
        };
        let json = serde_json::to_string(&member).unwrap();
        let created: ChannelMember = self
            .do_request(Method::POST, &path, Payload::Json(json))
            .await?;
        if created.user_id != user_id {
            return Err(RequestError::Unexpected(
                "server returned mismatched channel membership",
            ));
        }
        Ok(())
    }

    pub async fn remove_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<(), RequestError> {
        let path = format!("channels/{channel_id}/members/{user_id}");
        let resp: StatusResponse = self
            .do_request(Method::DELETE, &path, Payload::None)
            .await?;
        if !resp.is_ok() {
            return Err(RequestError::Unexpected(
                "server did not confirm channel member removal",
            ));
        }
        Ok(())
    }

    async fn do_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<T, RequestError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Request server: {method} {url}");

        let mut req = self.client.request(method, &url);
        if let Payload::Json(json) = payload {
            req = req.header("Content-Type", "application/json").body(json);
        }
        req = req
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json");

        let req = match req.build() {
            Ok(req) => req,
            Err(e) => return Err(RequestError::Client(format!("build request failed: {e:#}"))),
        };

        let resp = match self.client.execute(req).await {
            Ok(resp) => resp,
            Err(e) => return Err(RequestError::Network(e.into())),
        };

        let code = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => return Err(RequestError::Network(e.into())),
        };

        if !code.is_success() {
            let message = serde_json::from_str::<ApiError>(&text)
                .ok()
                .and_then(ApiError::describe)
                .unwrap_or(text);
            return Err(RequestError::Server {
                code: code.as_u16(),
                message,
            });
        }

        match serde_json::from_str(&text) {
            Ok(data) => Ok(data),
            Err(_) => Err(RequestError::InvalidJson(text)),
        }
    }
}

impl RequestError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RequestError::Server { code, .. } if *code == StatusCode::NOT_FOUND.as_u16())
    }
}
