//! Live event feed over a long-lived `text/event-stream` response.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::IntoResponse,
};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

use heartlog_core::{Event, FrameEncoder, LiveFeedSession};

use crate::render;
use crate::server::AppState;

/// Frames queued between the session loop and the response body.
const OUTPUT_BUFFER: usize = 16;

pub const KEEPALIVE_FRAME: &str = "keepalive: \n\n";

/// Encodes events as single-line `data:` frames holding the rendered row.
#[derive(Default)]
pub struct SseEncoder {
    row: String,
}

impl FrameEncoder for SseEncoder {
    fn event(&mut self, event: &Event) -> String {
        self.row.clear();
        render::write_event_row(&mut self.row, event);

        // A bare CR also ends a line in the event-stream format.
        let mut frame = String::with_capacity(self.row.len() + 7);
        frame.push_str("data:");
        frame.extend(self.row.chars().filter(|c| *c != '\n' && *c != '\r'));
        frame.push_str("\n\n");
        frame
    }

    fn keepalive(&mut self) -> String {
        KEEPALIVE_FRAME.to_string()
    }
}

/// Handler for `GET /.sse`
pub async fn live_updates(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = LiveFeedSession::open(state.dispatcher.broadcaster(), state.config.keepalive);
    let (tx, rx) = mpsc::channel::<String>(OUTPUT_BUFFER);

    // Ends when the response body is dropped (viewer gone) or on shutdown.
    tokio::spawn(session.run(SseEncoder::default(), tx, state.shutdown_signal()));

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        body,
    )
}
