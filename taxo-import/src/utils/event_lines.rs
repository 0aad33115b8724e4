//! JSON-lines sink for the import event stream

use std::io::Write;
use taxo_common::events::ImportEvent;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Write every received event to `out` as one JSON line
///
/// Runs until every sender of the bus is dropped. A lagging receiver logs how
/// many events it missed and keeps going. Returns the sink and the number of
/// lines written.
pub async fn write_event_lines<W: Write>(
    mut rx: broadcast::Receiver<ImportEvent>,
    mut out: W,
) -> std::io::Result<(W, usize)> {
    let mut written = 0;

    loop {
        match rx.recv().await {
            Ok(event) => {
                let line = serde_json::to_string(&event)?;
                writeln!(out, "{}", line)?;
                written += 1;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(
                    "Event stream lagged, {} events dropped (raise import.event_capacity)",
                    skipped
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Event bus closed, stream finished");
                break;
            }
        }
    }

    out.flush()?;
    Ok((out, written))
}
