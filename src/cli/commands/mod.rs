//! CLI command implementations.

mod config;
mod dedupe;
mod dialogue;
mod init;
mod reel;
mod score;
mod story;

pub use config::run_config;
pub use dedupe::run_dedupe;
pub use dialogue::run_dialogue;
pub use init::run_init;
pub use reel::run_reel;
pub use score::run_score;
pub use story::run_story;

use tokio_util::sync::CancellationToken;

/// Cancellation token cancelled on Ctrl-C, so long sequencing passes can
/// stop between oracle calls and still write a complete output.
pub(crate) fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    token
}
