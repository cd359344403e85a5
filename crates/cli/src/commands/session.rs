//! Session commands.

use shopfront_client::auth;
use shopfront_client::guard::NavLink;
use shopfront_core::Role;
use tracing::info;

use super::{CommandError, Shell};

/// Sign in against the backend and store the token.
///
/// # Errors
///
/// Returns an error if the backend rejects the credentials or the session
/// cannot be stored.
pub async fn sign_in(
    shell: &Shell,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = auth::sign_in(&shell.api, &shell.ctx, email, password).await?;
    info!("Signed in as {email} ({})", state.role_name());
    Ok(())
}

/// Sign out and forget the token.
///
/// # Errors
///
/// Returns an error if storage cannot be modified.
pub fn sign_out(shell: &Shell) -> Result<(), Box<dyn std::error::Error>> {
    auth::sign_out(&shell.api, &shell.ctx)?;
    info!("Signed out");
    Ok(())
}

/// Request a password reset email.
///
/// # Errors
///
/// Returns an error if the address is invalid or the backend rejects it.
pub async fn forgot_password(shell: &Shell, email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let message = auth::request_password_reset(&shell.api, email).await?;
    info!(
        "{}",
        message.as_deref().unwrap_or("Password reset link sent to your email")
    );
    Ok(())
}

/// Set a new password from a reset link token.
///
/// # Errors
///
/// Returns an error if the password is too short or the token is rejected.
pub async fn reset_password(
    shell: &Shell,
    token: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let message = auth::reset_password(&shell.api, token, password).await?;
    info!("{}", message.as_deref().unwrap_or("Password reset successful"));
    Ok(())
}

/// Mark the session logged in with an optional role.
///
/// # Errors
///
/// Returns an error if the role is unknown or storage cannot be written.
pub fn login(shell: &Shell, role: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let role = role
        .map(|name| {
            name.parse::<Role>()
                .map_err(|_| CommandError::UnknownRole(name.to_owned()))
        })
        .transpose()?;

    let state = shell.ctx.session().login(role)?;
    info!("Logged in as {}", state.role_name());
    Ok(())
}

/// Mark the session logged out.
///
/// # Errors
///
/// Returns an error if storage cannot be written.
pub fn logout(shell: &Shell) -> Result<(), Box<dyn std::error::Error>> {
    shell.ctx.session().logout()?;
    info!("Logged out");
    Ok(())
}

/// Print the session and the navigation menu it produces.
pub fn whoami(shell: &Shell) {
    let state = shell.ctx.session().snapshot();
    if state.is_logged_in() {
        info!("Logged in as {}", state.role_name());
    } else {
        info!("Logged out");
    }

    let menu = shell.ctx.nav_menu();
    let links: Vec<&str> = menu
        .links
        .iter()
        .map(|link| match link {
            NavLink::Route(route) => route.path(),
            NavLink::Logout => "logout",
        })
        .collect();
    info!("Menu: {} | cart ({})", links.join(" "), menu.cart_badge);
}
