//! Follow session and cart changes made by other processes.

use shopfront_core::format_price;
use tracing::info;

use super::Shell;

/// Poll the state file and print every session or cart change until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the Ctrl-C handler cannot be installed.
pub async fn run(shell: Shell) -> Result<(), Box<dyn std::error::Error>> {
    let poller = shell.area.spawn_poller(shell.config.poll_interval);
    let mut session = shell.ctx.session().subscribe();
    let mut cart = shell.ctx.cart().subscribe();

    info!(
        "Watching {} every {:?} (Ctrl-C to stop)",
        shell.config.state_file.display(),
        shell.config.poll_interval
    );

    loop {
        tokio::select! {
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *session.borrow_and_update();
                if state.is_logged_in() {
                    info!("Session: logged in as {}", state.role_name());
                } else {
                    info!("Session: logged out");
                }
            }
            changed = cart.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = cart.borrow_and_update().clone();
                info!(
                    "Cart: {} line(s), subtotal {}",
                    snapshot.badge_count(),
                    format_price(snapshot.subtotal())
                );
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
        }
    }

    poller.unsubscribe();
    info!("Stopped watching");
    Ok(())
}
