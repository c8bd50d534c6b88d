use anyhow::{bail, Context, Result};
use clap::Args;
use log::{debug, info, warn};

use crate::client::Client;
use crate::types::channel::normalize_name;
use crate::types::user::{User, UserPatch};

/// Task flags. Any combination may be requested in one invocation, except
/// for the pairs that contradict each other.
#[derive(Args, Debug, Default, Clone)]
pub struct TaskArgs {
    /// User email address. Required for all task types.
    #[arg(long, short = 'e', value_name = "EMAIL")]
    pub useremail: String,

    /// Force a user to be logged out.
    #[arg(long)]
    pub forcelogout: bool,

    /// Disable an existing user.
    #[arg(long)]
    pub disableuser: bool,

    /// Enable an existing user.
    #[arg(long)]
    pub enableuser: bool,

    /// Change the user's nickname to the supplied value.
    #[arg(long, value_name = "NICKNAME")]
    pub newnickname: Option<String>,

    /// Clear the user's nickname.
    #[arg(long)]
    pub removenickname: bool,

    /// Add the user to the specified team.
    #[arg(long, value_name = "TEAM")]
    pub teamadd: Option<String>,

    /// Remove the user from the specified team.
    #[arg(long, value_name = "TEAM")]
    pub teamremove: Option<String>,

    /// Add the user to the specified channel. Requires --team.
    #[arg(long, value_name = "CHANNEL")]
    pub channeladd: Option<String>,

    /// Remove the user from the specified channel. Requires --team.
    #[arg(long, value_name = "CHANNEL")]
    pub channelremove: Option<String>,

    /// The team containing the channel, required for channel operations.
    #[arg(long, value_name = "TEAM")]
    pub team: Option<String>,
}

/// One mutation against the resolved user. Dispatch order is the order of
/// the variants here: logout, active status, nickname, teams, channels.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    ForceLogout,
    Disable,
    Enable,
    SetNickname(String),
    ClearNickname,
    TeamAdd(String),
    TeamRemove(String),
    ChannelAdd { channel: String, team: String },
    ChannelRemove { channel: String, team: String },
}

impl TaskArgs {
    /// Turn the flags into the ordered task list. All combination rules are
    /// checked here, before anything touches the network.
    pub fn plan(&self) -> Result<Vec<Task>> {
        if self.enableuser && self.disableuser {
            bail!("--enableuser and --disableuser cannot be combined");
        }
        if self.newnickname.is_some() && self.removenickname {
            bail!("--newnickname and --removenickname cannot be combined");
        }
        if (self.channeladd.is_some() || self.channelremove.is_some()) && self.team.is_none() {
            bail!("a team name is required when performing channel operations");
        }

        let mut tasks = Vec::new();
        if self.forcelogout {
            tasks.push(Task::ForceLogout);
        }
        if self.disableuser {
            tasks.push(Task::Disable);
        }
        if self.enableuser {
            tasks.push(Task::Enable);
        }
        if let Some(ref nickname) = self.newnickname {
            tasks.push(Task::SetNickname(nickname.clone()));
        }
        if self.removenickname {
            tasks.push(Task::ClearNickname);
        }
        if let Some(ref team) = self.teamadd {
            tasks.push(Task::TeamAdd(team.clone()));
        }
        if let Some(ref team) = self.teamremove {
            tasks.push(Task::TeamRemove(team.clone()));
        }
        if let Some(ref channel) = self.channeladd {
            tasks.push(Task::ChannelAdd {
                channel: channel.clone(),
                team: self.team.clone().unwrap(),
            });
        }
        if let Some(ref channel) = self.channelremove {
            tasks.push(Task::ChannelRemove {
                channel: channel.clone(),
                team: self.team.clone().unwrap(),
            });
        }

        Ok(tasks)
    }
}

impl Task {
    pub fn describe(&self, email: &str) -> String {
        match self {
            Task::ForceLogout => format!("Logging out user '{email}'"),
            Task::Disable => format!("Disabling user '{email}'"),
            Task::Enable => format!("Enabling user '{email}'"),
            Task::SetNickname(nickname) => {
                format!("Setting nickname for user '{email}' to '{nickname}'")
            }
            Task::ClearNickname => format!("Clearing nickname for user '{email}'"),
            Task::TeamAdd(team) => format!("Adding user '{email}' to team '{team}'"),
            Task::TeamRemove(team) => format!("Removing user '{email}' from team '{team}'"),
            Task::ChannelAdd { channel, team } => {
                format!("Adding user '{email}' to channel '{channel}' in team '{team}'")
            }
            Task::ChannelRemove { channel, team } => {
                format!("Removing user '{email}' from channel '{channel}' in team '{team}'")
            }
        }
    }

    async fn run(&self, client: &Client, user: &User) -> Result<()> {
        match self {
            Task::ForceLogout => client
                .revoke_all_sessions(&user.id)
                .await
                .context("revoke sessions"),

            Task::Disable => client
                .update_active(&user.id, false)
                .await
                .context("update active status"),

            Task::Enable => client
                .update_active(&user.id, true)
                .await
                .context("update active status"),

            Task::SetNickname(nickname) => {
                let patch = UserPatch {
                    nickname: Some(nickname.clone()),
                };
                let patched = client
                    .patch_user(&user.id, &patch)
                    .await
                    .context("patch user")?;
                if patched.nickname != *nickname {
                    bail!("server did not apply the new nickname");
                }
                Ok(())
            }

            Task::ClearNickname => {
                let patch = UserPatch {
                    nickname: Some(String::new()),
                };
                let patched = client
                    .patch_user(&user.id, &patch)
                    .await
                    .context("patch user")?;
                if !patched.nickname.is_empty() {
                    bail!("server did not clear the nickname");
                }
                Ok(())
            }

            Task::TeamAdd(team) => {
                let team = client
                    .get_team_by_name(team)
                    .await
                    .with_context(|| format!("resolve team '{team}'"))?;
                debug!("Resolved team '{}' to id {}", team.name, team.id);
                client
                    .add_team_member(&team.id, &user.id)
                    .await
                    .context("add team member")
            }

            Task::TeamRemove(team) => {
                let team = client
                    .get_team_by_name(team)
                    .await
                    .with_context(|| format!("resolve team '{team}'"))?;
                debug!("Resolved team '{}' to id {}", team.name, team.id);
                client
                    .remove_team_member(&team.id, &user.id)
                    .await
                    .context("remove team member")
            }

            Task::ChannelAdd { channel, team } => {
                let name = normalize_name(channel);
                let channel = client
                    .get_channel_by_name(team, &name)
                    .await
                    .with_context(|| format!("resolve channel '{name}' in team '{team}'"))?;
                debug!("Resolved channel '{}' to id {}", channel.name, channel.id);
                client
                    .add_channel_member(&channel.id, &user.id)
                    .await
                    .context("add channel member")
            }

            Task::ChannelRemove { channel, team } => {
                let name = normalize_name(channel);
                let channel = client
                    .get_channel_by_name(team, &name)
                    .await
                    .with_context(|| format!("resolve channel '{name}' in team '{team}'"))?;
                debug!("Resolved channel '{}' to id {}", channel.name, channel.id);
                client
                    .remove_channel_member(&channel.id, &user.id)
                    .await
                    .context("remove channel member")
            }
        }
    }
}

/// Execute tasks in order. A failed task is reported and the remaining
/// tasks still run; the number of failures is returned so the caller can
/// pick the exit code.
pub async fn run_tasks(client: &Client, user: &User, tasks: &[Task]) -> usize {
    let mut failed = 0;
    for task in tasks {
        info!("{}", task.describe(&user.email));
        match task.run(client, user).await {
            Ok(()) => info!("Done"),
            Err(err) => {
                warn!("Task failed: {err:#}");
                failed += 1;
            }
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_fixed_order() {
        let args = TaskArgs {
            useremail: String::from("a@example.com"),
            channelremove: Some(String::from("town square")),
            teamadd: Some(String::from("dev")),
            removenickname: true,
            forcelogout: true,
            team: Some(String::from("main")),
            ..Default::default()
        };
        let tasks = args.plan().unwrap();
        assert_eq!(
            tasks,
            vec![
                Task::ForceLogout,
                Task::ClearNickname,
                Task::TeamAdd(String::from("dev")),
                Task::ChannelRemove {
                    channel: String::from("town square"),
                    team: String::from("main"),
                },
            ]
        );
    }

    #[test]
    fn test_plan_empty() {
        let args = TaskArgs {
            useremail: String::from("a@example.com"),
            ..Default::default()
        };
        assert!(args.plan().unwrap().is_empty());
    }

    #[test]
    fn test_plan_enable_disable_conflict() {
        let args = TaskArgs {
            useremail: String::from("a@example.com"),
            enableuser: true,
            disableuser: true,
            ..Default::default()
        };
        let err = args.plan().unwrap_err();
        assert!(err.to_string().contains("cannot be combined"));
    }

    #[test]
    fn test_plan_nickname_conflict() {
        let args = TaskArgs {
            useremail: String::from("a@example.com"),
            newnickname: Some(String::from("Bob")),
            removenickname: true,
            ..Default::default()
        };
        assert!(args.plan().is_err());
    }

    #[test]
    fn test_plan_channel_requires_team() {
        let args = TaskArgs {
            useremail: String::from("a@example.com"),
            channeladd: Some(String::from("town square")),
            ..Default::default()
        };
        let err = args.plan().unwrap_err();
        assert!(err.to_string().contains("team name is required"));

        let args = TaskArgs {
            useremail: String::from("a@example.com"),
            channelremove: Some(String::from("town square")),
            ..Default::default()
        };
        assert!(args.plan().is_err());
    }

    #[test]
    fn test_plan_channel_with_team() {
        let args = TaskArgs {
            useremail: String::from("a@example.com"),
            channeladd: Some(String::from("Off Topic")),
            team: Some(String::from("main")),
            ..Default::default()
        };
        let tasks = args.plan().unwrap();
        assert_eq!(
            tasks,
            vec![Task::ChannelAdd {
                channel: String::from("Off Topic"),
                team: String::from("main"),
            }]
        );
    }
}
