//! Change feed listener
//!
//! One `LISTEN` connection per store. Each NOTIFY payload is a JSON
//! `ChangeEvent` written by the per-table change trigger; it is fanned out to
//! the subscribers of its table.

use signal_system::{ChangeEvent, SignalManager};
use sqlx::postgres::PgListener;
use std::time::Duration;

pub(crate) async fn run_listener(
    mut listener: PgListener,
    channel: String,
    signals: SignalManager,
    reconnect_delay: Duration,
) {
    loop {
        match listener.recv().await {
            Ok(notification) => match ChangeEvent::from_payload(notification.payload()) {
                Ok(event) => {
                    let delivered = signals.emit(&event);
                    tracing::trace!(
                        table = %event.table,
                        kind = event.kind.as_str(),
                        delivered,
                        "change notification"
                    );
                }
                Err(error) => {
                    tracing::warn!(%channel, %error, "ignoring malformed change notification");
                }
            },
            Err(error) => {
                // recv() reconnects on the next call; back off first
                tracing::warn!(%channel, %error, "change listener connection lost");
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}
