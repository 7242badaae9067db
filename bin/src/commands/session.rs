//! Commands that act on an existing import session by ID.

use crate::Settings;
use crate::display::{print_job, save_file};
use anyhow::{Context, Result};
use inquire::Password;
use photoport_lib::{ClientError, JobClient, SessionId};
use std::path::Path;

fn client(settings: &Settings) -> Result<JobClient> {
    JobClient::unauthenticated(settings.client.clone()).context("Failed to create job client")
}

/// Show the status of a session, optionally refreshing until it ends.
pub(crate) async fn status(settings: &Settings, session_id: &str, follow: Option<u64>) -> Result<()> {
    use std::io::Write;

    let client = client(settings)?;
    let session_id = SessionId::new(session_id);

    let Some(interval_secs) = follow else {
        let job = fetch(&client, &session_id).await?;
        print_job(&job);
        return Ok(());
    };

    let interval = std::time::Duration::from_secs(interval_secs.max(1));
    loop {
        let job = fetch(&client, &session_id).await?;

        // Clear screen
        print!("\x1B[2J\x1B[1;1H");
        std::io::stdout().flush()?;
        println!("Watching session (refresh every {interval_secs}s, Ctrl+C to exit)\n");
        print_job(&job);

        if job.is_terminal() {
            return Ok(());
        }
        tokio::time::sleep(interval).await;
    }
}

async fn fetch(client: &JobClient, session_id: &SessionId) -> Result<photoport_lib::ImportJob> {
    match client.poll_status(session_id).await {
        Ok(job) => Ok(job),
        Err(ClientError::SessionNotFound) => {
            anyhow::bail!("Session {session_id} not found or expired")
        }
        Err(e) => Err(anyhow::Error::new(e).context("Failed to fetch session status")),
    }
}

/// Stop a running session.
pub(crate) async fn stop(settings: &Settings, session_id: &str) -> Result<()> {
    let client = client(settings)?;
    let session_id = SessionId::new(session_id);
    client
        .stop(&session_id)
        .await
        .with_context(|| format!("Failed to stop session {session_id}"))?;
    println!("Import {session_id} stopped.");
    Ok(())
}

/// Resume a stopped session. The cloud account password is prompted.
pub(crate) async fn resume(settings: &Settings, session_id: &str) -> Result<()> {
    let client = client(settings)?;
    let session_id = SessionId::new(session_id);
    let password = Password::new("Cloud account password:")
        .without_confirmation()
        .prompt()
        .context("Resume cancelled")?;

    client
        .resume(&session_id, &password)
        .await
        .with_context(|| format!("Failed to resume session {session_id}"))?;
    println!("Import {session_id} resumed.");
    Ok(())
}

/// Download one file of a session into `output_dir`.
pub(crate) async fn download(
    settings: &Settings,
    session_id: &str,
    token: &str,
    path: Option<&str>,
    output_dir: &Path,
) -> Result<()> {
    let client = client(settings)?;
    let session_id = SessionId::new(session_id);
    let bytes = client
        .download(&session_id, token)
        .await
        .context("Download failed")?;

    let saved = save_file(output_dir, path.unwrap_or(token), &bytes)?;
    println!("Saved {} ({} bytes)", saved.display(), bytes.len());
    Ok(())
}
