pub mod chat;
pub mod config;
pub mod conversations;
pub mod health;
pub mod image;
pub mod license;
pub mod models;
pub mod moderate;

use nothing_chat::CancellationToken;

/// Cancels `token` when Ctrl-C arrives; abort the handle once the work is done
pub fn cancel_on_ctrl_c(token: &CancellationToken) -> tokio::task::JoinHandle<()> {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}
