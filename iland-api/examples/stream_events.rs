use iland_api::api::EventApi;
use iland_api::{Client, ClientConfig, Credentials};

/// Print events as they arrive
///
/// Usage: `stream_events [company-id]` with ILAND_CLIENT_ID,
/// ILAND_CLIENT_SECRET, ILAND_USERNAME and ILAND_PASSWORD set.
///
/// Dropped connections are redialed every five seconds; Ctrl-C stops the stream.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let company_id = std::env::args().nth(1);

    let credentials = Credentials::new(
        std::env::var("ILAND_CLIENT_ID")?,
        std::env::var("ILAND_CLIENT_SECRET")?,
        std::env::var("ILAND_USERNAME")?,
        std::env::var("ILAND_PASSWORD")?,
    );
    let client = Client::new(credentials, ClientConfig::new())?;

    let mut events = client.stream_events(company_id.as_deref());
    let stop = events.cancellation_token();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        stop.cancel();
    });

    while let Some(event) = events.next_event().await {
        println!(
            "[{}] {} {} ({}) by {}",
            event.timestamp, event.kind, event.entity_name, event.entity_type, event.initiated_by_user
        );
    }

    println!("Stream closed");
    Ok(())
}
