use std::sync::{Mutex, OnceLock};

use crate::optimizer::CancelToken;

static SHUTDOWN_TOKENS: OnceLock<Mutex<Vec<CancelToken>>> = OnceLock::new();
static SHUTDOWN_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

fn shutdown_tokens() -> &'static Mutex<Vec<CancelToken>> {
    SHUTDOWN_TOKENS.get_or_init(|| Mutex::new(Vec::new()))
}

fn install_shutdown_hook_once() {
    SHUTDOWN_HOOK_INSTALLED.get_or_init(|| {
        if let Err(err) = ctrlc::set_handler(cancel_registered) {
            log::warn!("shutdown: failed to install interrupt hook err={err}");
        }
    });
}

fn cancel_registered() {
    let tokens: Vec<CancelToken> = match shutdown_tokens().lock() {
        Ok(guard) => guard.clone(),
        Err(_) => Vec::new(),
    };
    log::warn!("shutdown: interrupt received, cancelling {} optimization(s)", tokens.len());
    for token in tokens {
        token.cancel();
    }
}

/// Cancels `token` when the process receives Ctrl-C. Results that arrive
/// after that are discarded by the planner.
pub fn cancel_on_shutdown(token: &CancelToken) {
    install_shutdown_hook_once();
    if let Ok(mut guard) = shutdown_tokens().lock() {
        guard.push(token.clone());
    }
}

/// A fresh token already wired to Ctrl-C.
pub fn shutdown_token() -> CancelToken {
    let token = CancelToken::new();
    cancel_on_shutdown(&token);
    token
}
