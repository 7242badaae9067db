//! Interactive import: sign in, start, verify, follow, download.

use crate::Settings;
use crate::auth::{self, SignIn};
use crate::display::{print_errors, progress_bar, render, save_file};
use anyhow::{Context, Result, bail};
use inquire::{Confirm, MultiSelect, Password, Select, Text};
use photoport_lib::{
    FileToDownload, IdentityGateway, ImportLimit, JobClient, JobTracker, PendingCredentials,
    RestIdentityProvider, SessionId, TerminalState, TrackerConfig, TrackerState,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

type Tracker = JobTracker<JobClient>;

/// Arguments of the import command.
pub(crate) struct ImportArgs {
    pub(crate) sign_in: SignIn,
    pub(crate) email: Option<String>,
    pub(crate) destination: Option<String>,
    pub(crate) limit: Option<ImportLimit>,
    pub(crate) output_dir: PathBuf,
}

/// Run an import from sign-in to download, then sign out.
pub(crate) async fn import(settings: &Settings, args: ImportArgs) -> Result<()> {
    let provider = RestIdentityProvider::new(settings.identity.clone())
        .context("Failed to create identity client")?;
    let identity = IdentityGateway::new(provider, settings.identity.refresh_skew);
    let client = JobClient::new(settings.client.clone(), Arc::new(identity.clone()))
        .context("Failed to create job client")?;
    let tracker = JobTracker::new(client, TrackerConfig::default());

    // Signing out drops the job state and the cloud credentials.
    let _subscription = identity.on_session_changed({
        let tracker = tracker.clone();
        move |user| match user {
            Some(user) => info!(email = %user.email, "session started"),
            None => tracker.reset(),
        }
    })?;

    if let Some(user) = auth::sign_in(&identity, args.sign_in).await? {
        println!("Signed in as {}", user.email);
    }

    let outcome = match prompt_credentials(args.email, args.destination, args.limit) {
        Ok(credentials) => drive(&tracker, credentials, &args.output_dir, settings.quiet).await,
        Err(e) => Err(e),
    };

    identity.sign_out().await;
    outcome
}

fn prompt_credentials(
    email: Option<String>,
    destination: Option<String>,
    limit: Option<ImportLimit>,
) -> Result<PendingCredentials> {
    let email = match email {
        Some(email) => email,
        None => Text::new("Cloud account email:")
            .prompt()
            .context("Import cancelled")?,
    };
    let password = Password::new("Cloud account password:")
        .without_confirmation()
        .prompt()
        .context("Import cancelled")?;
    let destination = match destination {
        Some(destination) => destination,
        None => Text::new("Destination folder:")
            .with_help_message("Folder on the backend host, e.g. D:\\Photos\\Cloud")
            .prompt()
            .context("Import cancelled")?,
    };
    let limit = match limit {
        Some(limit) => limit,
        None => Select::new("How many files to import?", ImportLimit::PRESETS.to_vec())
            .prompt()
            .context("Import cancelled")?,
    };
    Ok(PendingCredentials::new(email, password, destination, limit))
}

/// Drives the tracker until the import ends or the operator gives up.
async fn drive(
    tracker: &Tracker,
    credentials: PendingCredentials,
    output_dir: &Path,
    quiet: bool,
) -> Result<()> {
    tracker.start(credentials).await;

    loop {
        let view = tracker.view();
        match view.state {
            TrackerState::Idle => match view.message {
                Some(message) => bail!("{message}"),
                None => bail!("Import did not start"),
            },
            TrackerState::AwaitingTwoFactor => verify(tracker).await?,
            TrackerState::Polling => follow(tracker, quiet).await?,
            TrackerState::Terminal(TerminalState::Stopped) => {
                if let Some(message) = &view.message {
                    println!("{message}");
                }
                let resume = Confirm::new("Resume the import?")
                    .with_default(false)
                    .prompt()
                    .unwrap_or(false);
                if !resume || tracker.resume().await.is_ignored() {
                    return finish(tracker, output_dir).await;
                }
            }
            TrackerState::Terminal(_) => return finish(tracker, output_dir).await,
        }
    }
}

/// Prompts for the verification code and submits it.
///
/// An empty answer or Esc abandons the verification.
async fn verify(tracker: &Tracker) -> Result<()> {
    if let Some(message) = tracker.view().message {
        println!("{message}");
    }

    let code = Text::new("Verification code:")
        .with_help_message("Leave empty or press Esc to go back")
        .prompt_skippable()
        .context("Verification cancelled")?;
    let Some(code) = code.filter(|c| !c.trim().is_empty()) else {
        tracker.cancel_two_factor();
        bail!("Verification abandoned");
    };

    tracker.enter_code(code.trim());
    tracker.submit_code().await;
    if tracker.state() == TrackerState::AwaitingTwoFactor {
        tracker.clear_code();
    }
    Ok(())
}

/// Renders progress until polling ends. Ctrl+C stops the import.
async fn follow(tracker: &Tracker, quiet: bool) -> Result<()> {
    let bar = progress_bar(quiet)?;
    let mut updates = tracker.subscribe();

    loop {
        let view = updates.borrow_and_update().clone();
        render(&bar, &view);
        if view.state != TrackerState::Polling {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                bar.set_message("Stopping import...");
                if tracker.stop().await.is_ignored() {
                    bar.set_message("The import cannot be stopped right now");
                }
            }
        }
    }

    bar.finish();
    Ok(())
}

/// Reports the outcome and offers the produced files for download.
async fn finish(tracker: &Tracker, output_dir: &Path) -> Result<()> {
    let view = tracker.view();
    if let Some(message) = &view.message {
        println!("{message}");
    }
    if let Some(job) = &view.job {
        print_errors(&job.errors);
    }

    let Some(session_id) = &view.session_id else {
        return Ok(());
    };
    if view.files().is_empty() {
        return Ok(());
    }
    offer_downloads(tracker.backend(), session_id, view.files(), output_dir).await
}

async fn offer_downloads(
    client: &JobClient,
    session_id: &SessionId,
    files: &[FileToDownload],
    output_dir: &Path,
) -> Result<()> {
    let paths: Vec<String> = files.iter().map(|f| f.path.clone()).collect();
    let Some(chosen) = MultiSelect::new("Select files to download:", paths)
        .prompt_skippable()
        .context("File selection cancelled")?
    else {
        return Ok(());
    };

    for file in files.iter().filter(|f| chosen.contains(&f.path)) {
        match client.download(session_id, &file.download_token).await {
            Ok(bytes) => {
                let saved = save_file(output_dir, file.file_name(), &bytes)?;
                println!("Saved {}", saved.display());
            }
            Err(e) => eprintln!("Failed to download {}: {}", file.path, e.user_message()),
        }
    }
    Ok(())
}
