use crate::client::Client;
use crate::stream::{EventStream, StreamOptions};

/// Real-time event subscription
pub trait EventApi {
    /// Stream events for the whole account, or for one company when
    /// `company_id` is given
    fn stream_events(&self, company_id: Option<&str>) -> EventStream;

    fn stream_events_with(&self, company_id: Option<&str>, options: StreamOptions) -> EventStream;
}

impl EventApi for Client {
    fn stream_events(&self, company_id: Option<&str>) -> EventStream {
        self.open_event_stream(company_id)
    }

    fn stream_events_with(&self, company_id: Option<&str>, options: StreamOptions) -> EventStream {
        self.open_event_stream_with(company_id, options)
    }
}
