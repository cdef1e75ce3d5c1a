use iland_api::api::{TaskApi, TrackOptions};
use iland_api::{Client, ClientConfig, Credentials};
use std::time::Duration;

/// Wait for a task to finish
///
/// Usage: `track_task <task-uuid>` with ILAND_CLIENT_ID, ILAND_CLIENT_SECRET,
/// ILAND_USERNAME and ILAND_PASSWORD set.
///
/// The first request logs in with the password grant. If tracking outlives the
/// access token, the client renews it in the background of the next poll.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let task_id = std::env::args().nth(1).ok_or("missing task uuid")?;

    let credentials = Credentials::new(
        std::env::var("ILAND_CLIENT_ID")?,
        std::env::var("ILAND_CLIENT_SECRET")?,
        std::env::var("ILAND_USERNAME")?,
        std::env::var("ILAND_PASSWORD")?,
    );
    let client = Client::new(credentials, ClientConfig::new().with_timeout(30))?;

    let snapshot = client.get_task(&task_id).await?;
    println!(
        "{}: {} ({}%)",
        snapshot.operation,
        snapshot.status.as_str(),
        snapshot.progress
    );

    let options = TrackOptions::default()
        .with_interval(Duration::from_secs(5))
        .with_deadline(Duration::from_secs(15 * 60));

    match client.track_task_with(&task_id, options).await {
        Ok(task) if task.succeeded() => println!("✓ Task finished"),
        Ok(task) => println!("✗ Task settled as {}: {}", task.status.as_str(), task.message),
        Err(e) if e.requires_login() => println!("✗ Login rejected: {}", e),
        Err(e) => println!("✗ Tracking failed: {}", e),
    }

    Ok(())
}
