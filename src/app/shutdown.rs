//! Ctrl-C handling.

use log::warn;
use tokio_util::sync::CancellationToken;

/// Returns a token cancelled on the first Ctrl-C.
///
/// The fetch loop checks it between URLs and passes it to every fetch, so an
/// in-flight wait or request is abandoned and no further URL is started.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => {
                        warn!("Interrupted, finishing up");
                        trigger.cancel();
                    }
                    Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
                }
            }
            _ = trigger.cancelled() => {}
        }
    });
    token
}
