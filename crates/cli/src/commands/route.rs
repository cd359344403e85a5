//! Route check command.

use shopfront_client::Navigation;
use shopfront_client::guard::navigate;
use tracing::info;

use super::Shell;

/// Report what navigating to `path` would do for the current session.
pub fn check(shell: &Shell, path: &str) {
    let session = shell.ctx.session().snapshot();
    match navigate(path, &session) {
        Navigation::Render(route) => info!("{path}: render {route:?}"),
        Navigation::Pending(route) => info!("{path}: {route:?} pending session"),
        Navigation::Redirect(to) => info!("{path}: redirect to {to}"),
        Navigation::NotFound => info!("{path}: not found"),
    }
}
