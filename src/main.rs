mod client;
mod config;
mod logs;
mod tasks;
mod types;

use std::process;

use anyhow::{bail, Context, Result};
use clap::error::ErrorKind as ArgsErrorKind;
use clap::Parser;
use log::{debug, info, warn};

use crate::client::Client;
use crate::config::{ConfigFile, Site, SiteArgs};
use crate::tasks::TaskArgs;

/// Manage Mattermost user accounts: force logout, enable or disable the
/// account, change the nickname, and manage team and channel memberships.
#[derive(Parser)]
#[command(author, version, about)]
struct App {
    /// Print debug information.
    #[arg(long, short = 'd')]
    debug: bool,

    #[command(flatten)]
    site: SiteArgs,

    #[command(flatten)]
    task: TaskArgs,
}

async fn run(app: App) -> Result<()> {
    let file = ConfigFile::load(app.site.config.as_deref())?;
    let site = Site::resolve(&app.site, &file)?;
    debug!("Using Mattermost instance at {}", site.base_url());

    let tasks = app.task.plan()?;
    if tasks.is_empty() {
        warn!("No task requested, nothing to do");
        return Ok(());
    }

    let token = site.read_token()?;
    let client = Client::connect(&site, token).await?;

    let email = &app.task.useremail;
    let user = match client.get_user_by_email(email).await {
        Ok(user) => user,
        Err(err) if err.is_not_found() => bail!("user '{email}' not found"),
        Err(err) => return Err(err).with_context(|| format!("resolve user '{email}'")),
    };
    info!(
        "Resolved user '{email}' to '{}' ({})",
        user.username,
        if user.is_active() { "active" } else { "inactive" }
    );

    let failed = tasks::run_tasks(&client, &user, &tasks).await;
    if failed > 0 {
        bail!("{failed} of {} tasks failed", tasks.len());
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let app = match App::try_parse() {
        Ok(app) => app,
        Err(err) => {
            err.use_stderr();
            err.print().expect("write help message to stderr");
            if matches!(
                err.kind(),
                ArgsErrorKind::DisplayHelp
                    | ArgsErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                    | ArgsErrorKind::DisplayVersion
            ) {
                return;
            }
            process::exit(3);
        }
    };

    if let Err(err) = logs::init(app.debug) {
        eprintln!("Init logs error: {err:#}");
        process::exit(1);
    }

    match run(app).await {
        Ok(()) => {}
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}
