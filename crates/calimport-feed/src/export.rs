//! Export of accepted events to the events API.
//!
//! [`to_transport`] maps a [`NormalizedEvent`] to the record shape the API
//! expects. [`ExportClient`] sends the whole batch as a single create call.

use std::time::Duration;

use calimport_core::{CanonicalDate, NormalizedEvent};
use chrono::{NaiveTime, TimeZone};
use serde::Serialize;
use url::Url;

/// Reservation text used when an event has no dedicated room.
pub const CUSTOM_EVENT_TEXT: &str = "Custom Event";

/// Mutation that creates a batch of events.
pub const CREATE_EVENTS_MUTATION: &str = "mutation CreateEvents($data: [EventCreateInput!]!) { \
     createEvents(data: $data) { count } }";

/// An event as the API expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportRecord {
    pub title: String,
    pub description: Option<String>,
    pub author_id: String,
    /// Epoch seconds at local midnight of the first day.
    pub date_start: i64,
    /// Epoch seconds at local midnight of the last day.
    pub date_end: i64,
    pub reservations: Vec<Reservation>,
    pub import_id: String,
}

/// A room booking attached to a transport record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_text: Option<String>,
}

/// Maps a normalized event to its transport record.
///
/// Dates become epoch seconds at midnight in `tz`. Events with a room get a
/// reservation for it; all others get a freeform reservation.
pub fn to_transport<Tz: TimeZone>(
    event: &NormalizedEvent,
    author_id: &str,
    tz: &Tz,
) -> TransportRecord {
    let reservation = match event.location_id.room_id() {
        Some(room) => Reservation {
            name: event.title.clone(),
            room_id: Some(room.to_string()),
            custom_text: None,
        },
        None => Reservation {
            name: event.title.clone(),
            room_id: None,
            custom_text: Some(CUSTOM_EVENT_TEXT.to_string()),
        },
    };

    TransportRecord {
        title: event.title.clone(),
        description: event.description.clone(),
        author_id: author_id.to_string(),
        date_start: local_midnight(&event.dates.start, tz),
        date_end: local_midnight(&event.dates.end, tz),
        reservations: vec![reservation],
        import_id: event.import_id.clone(),
    }
}

/// Returns the epoch seconds of midnight on `date` in `tz`.
fn local_midnight<Tz: TimeZone>(date: &CanonicalDate, tz: &Tz) -> i64 {
    let midnight = date.date().and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.timestamp(),
        // Midnight skipped by a DST transition.
        None => tz.from_utc_datetime(&midnight).timestamp(),
    }
}

/// Configuration for the export endpoint.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// API endpoint receiving the create call.
    pub endpoint: Url,

    /// Bearer token.
    pub token: String,

    /// Author recorded on every created event.
    pub author_id: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl ExportConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Creates an export configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub fn new(
        endpoint: impl AsRef<str>,
        token: impl Into<String>,
        author_id: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            endpoint: Url::parse(endpoint.as_ref())?,
            token: token.into(),
            author_id: author_id.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Request body of the create call.
#[derive(Debug, Serialize)]
struct CreateEventsRequest {
    query: &'static str,
    variables: CreateEventsVariables,
}

#[derive(Debug, Serialize)]
struct CreateEventsVariables {
    data: Vec<TransportRecord>,
}

/// Builds the request body for a batch.
fn create_events_body<Tz: TimeZone>(
    events: &[NormalizedEvent],
    author_id: &str,
    tz: &Tz,
) -> CreateEventsRequest {
    CreateEventsRequest {
        query: CREATE_EVENTS_MUTATION,
        variables: CreateEventsVariables {
            data: events
                .iter()
                .map(|event| to_transport(event, author_id, tz))
                .collect(),
        },
    }
}

#[cfg(feature = "http")]
pub use client::ExportClient;

#[cfg(feature = "http")]
mod client {
    use chrono::TimeZone;
    use reqwest::Client;
    use serde::Deserialize;
    use tracing::{debug, info, warn};

    use super::{ExportConfig, create_events_body};
    use crate::error::{FeedError, FeedResult};
    use calimport_core::NormalizedEvent;

    #[derive(Debug, Deserialize)]
    struct CreateEventsResponse {
        data: Option<CreateEventsData>,
        #[serde(default)]
        errors: Vec<ResponseError>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct CreateEventsData {
        create_events: Option<CreatedCount>,
    }

    #[derive(Debug, Deserialize)]
    struct CreatedCount {
        count: usize,
    }

    #[derive(Debug, Deserialize)]
    struct ResponseError {
        message: String,
    }

    /// Sends accepted events to the events API.
    pub struct ExportClient {
        client: Client,
        config: ExportConfig,
    }

    impl ExportClient {
        /// Creates an export client.
        pub fn new(config: ExportConfig) -> FeedResult<Self> {
            let client = Client::builder()
                .timeout(config.timeout)
                .user_agent(format!("calimport/{}", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| {
                    FeedError::network(format!("Failed to create HTTP client: {}", e))
                })?;

            Ok(Self { client, config })
        }

        /// Creates every event in one call and returns the number created.
        ///
        /// No retry. A non-success status or a non-empty `errors` array fails
        /// the whole batch.
        pub async fn create_events<Tz: TimeZone>(
            &self,
            events: &[NormalizedEvent],
            tz: &Tz,
        ) -> FeedResult<usize> {
            let body = create_events_body(events, &self.config.author_id, tz);
            debug!(
                endpoint = %self.config.endpoint,
                events = events.len(),
                "Sending create call"
            );

            let response = self
                .client
                .post(self.config.endpoint.clone())
                .bearer_auth(&self.config.token)
                .json(&body)
                .send()
                .await
                .map_err(|e| {
                    FeedError::network(format!("Export request failed: {}", e)).with_source(e)
                })?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %text, "Export rejected");
                return Err(if status.is_server_error() {
                    FeedError::server(format!("Server error ({}): {}", status, text))
                } else {
                    FeedError::rejected(format!("Export rejected ({}): {}", status, text))
                });
            }

            let parsed: CreateEventsResponse = response.json().await.map_err(|e| {
                FeedError::invalid_response(format!("Failed to decode export response: {}", e))
            })?;

            if !parsed.errors.is_empty() {
                let messages: Vec<&str> = parsed.errors.iter().map(|e| e.message.as_str()).collect();
                return Err(FeedError::export(messages.join("; ")));
            }

            let count = parsed
                .data
                .and_then(|data| data.create_events)
                .map(|created| created.count)
                .ok_or_else(|| FeedError::invalid_response("Export response has no count"))?;

            info!(created = count, "Exported events");
            Ok(count)
        }

        /// Returns the configuration.
        pub fn config(&self) -> &ExportConfig {
            &self.config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calimport_core::{Location, SemanticDate, resolve_range};
    use chrono::{FixedOffset, Utc};

    fn event(location: Location) -> NormalizedEvent {
        let start = SemanticDate::new(2024, 1, 15).unwrap();
        NormalizedEvent {
            import_id: "1234567890-abc123-999999@afosterri.org".to_string(),
            title: "Story hour".to_string(),
            description: Some("Bring a book".to_string()),
            location_id: location,
            dates: resolve_range(&start, None),
        }
    }

    #[test]
    fn room_becomes_reservation() {
        let record = to_transport(&event(Location::Room("room-1".into())), "author-1", &Utc);
        insta::assert_json_snapshot!(record, @r#"
        {
          "title": "Story hour",
          "description": "Bring a book",
          "authorId": "author-1",
          "dateStart": 1705276800,
          "dateEnd": 1705276800,
          "reservations": [
            {
              "name": "Story hour",
              "roomId": "room-1"
            }
          ],
          "importId": "1234567890-abc123-999999@afosterri.org"
        }
        "#);
    }

    #[test]
    fn no_room_gets_custom_text() {
        for location in [Location::Freeform, Location::Unassigned] {
            let record = to_transport(&event(location), "author-1", &Utc);
            assert_eq!(record.reservations.len(), 1);
            assert_eq!(record.reservations[0].room_id, None);
            assert_eq!(
                record.reservations[0].custom_text.as_deref(),
                Some(CUSTOM_EVENT_TEXT)
            );
        }
    }

    #[test]
    fn timestamps_use_local_midnight() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let record = to_transport(&event(Location::Freeform), "author-1", &tz);
        assert_eq!(record.date_start, 1705276800 + 5 * 3600);
    }

    #[test]
    fn multi_day_range() {
        let start = SemanticDate::new(2024, 1, 15).unwrap();
        let mut event = event(Location::Freeform);
        event.dates = resolve_range(
            &start,
            Some(&calimport_core::Recurrence::DailyUntil(
                SemanticDate::new(2024, 1, 17).unwrap(),
            )),
        );

        let record = to_transport(&event, "author-1", &Utc);
        assert_eq!(record.date_end - record.date_start, 2 * 86400);
    }

    #[test]
    fn body_wraps_records_in_variables() {
        let events = vec![event(Location::Freeform)];
        let body = serde_json::to_value(create_events_body(&events, "author-1", &Utc)).unwrap();

        assert_eq!(body["query"], CREATE_EVENTS_MUTATION);
        assert_eq!(body["variables"]["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["variables"]["data"][0]["authorId"], "author-1");
    }

    #[cfg(feature = "http")]
    mod client {
        use super::*;
        use crate::error::FeedErrorCode;
        use wiremock::matchers::{body_partial_json, header, method};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn client_for(server: &MockServer) -> ExportClient {
            let config = ExportConfig::new(server.uri(), "secret-token", "author-1").unwrap();
            ExportClient::new(config).unwrap()
        }

        #[tokio::test]
        async fn returns_created_count() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(header("authorization", "Bearer secret-token"))
                .and(body_partial_json(serde_json::json!({
                    "variables": {
                        "data": [{
                            "authorId": "author-1",
                            "importId": "1234567890-abc123-999999@afosterri.org"
                        }]
                    }
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "data": { "createEvents": { "count": 1 } }
                })))
                .expect(1)
                .mount(&server)
                .await;

            let count = client_for(&server)
                .create_events(&[event(Location::Freeform)], &Utc)
                .await
                .unwrap();
            assert_eq!(count, 1);
        }

        #[tokio::test]
        async fn errors_array_fails_the_export() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "data": null,
                    "errors": [{ "message": "room-1 does not exist" }]
                })))
                .mount(&server)
                .await;

            let err = client_for(&server)
                .create_events(&[event(Location::Room("room-1".into()))], &Utc)
                .await
                .unwrap_err();
            assert_eq!(err.code(), FeedErrorCode::ExportFailed);
            assert_eq!(err.message(), "room-1 does not exist");
        }

        #[tokio::test]
        async fn non_success_status_fails_without_retry() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
                .expect(1)
                .mount(&server)
                .await;

            let err = client_for(&server)
                .create_events(&[event(Location::Freeform)], &Utc)
                .await
                .unwrap_err();
            assert_eq!(err.code(), FeedErrorCode::Rejected);
        }

        #[tokio::test]
        async fn missing_count_is_invalid_response() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
                .mount(&server)
                .await;

            let err = client_for(&server)
                .create_events(&[event(Location::Freeform)], &Utc)
                .await
                .unwrap_err();
            assert_eq!(err.code(), FeedErrorCode::InvalidResponse);
        }
    }
}
