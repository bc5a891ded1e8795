use orderdesk_shared::CollectionKind;
use orderdesk_sync::{SyncEngine, ViewEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::AppState;

/// Print view events until Ctrl-C.
pub async fn run(state: &AppState, view: CollectionKind, json: bool) -> anyhow::Result<()> {
    let engine = &state.engine;
    let mut events = engine.subscribe_events();
    engine.set_active_view(view);
    info!(%view, "Watching for changes, Ctrl-C to stop");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => println!("{}", describe(engine, &event, json)?),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Dropped view events"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping");
                break;
            }
        }
    }
    Ok(())
}

fn describe(engine: &SyncEngine, event: &ViewEvent, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string(event)?);
    }
    Ok(match event {
        ViewEvent::Changed { collection, active } => {
            let marker = if *active { "*" } else { " " };
            let more = if engine.has_more(*collection) { "+" } else { "" };
            format!(
                "{marker} {collection}: {}{more} loaded",
                engine.len(*collection)
            )
        }
        ViewEvent::Notice(message) => format!("! {message}"),
    })
}
