//! Shopfront CLI - a terminal "tab" over the durable client state.
//!
//! Every invocation opens the storage document named by
//! `SHOPFRONT_STATE_FILE`, so several shells act like several browser tabs
//! sharing one session and one cart.
//!
//! # Usage
//!
//! ```bash
//! # Sign in against the backend
//! shopfront session sign-in -e seller@example.com -p hunter2
//!
//! # Mark the session logged in without a backend
//! shopfront session login --role admin
//!
//! # Add a catalog product, then bump its quantity
//! shopfront cart add 665f1c2e8a
//! shopfront cart inc 665f1c2e8a
//!
//! # Follow changes made from other shells
//! shopfront watch
//! ```
//!
//! # Commands
//!
//! - `session` - Sign in, sign out, inspect the session
//! - `cart` - Show and edit the cart
//! - `products` - Browse the catalog
//! - `route` - Check where a path leads for the current session
//! - `watch` - Print session and cart changes as they happen

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront client tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the login session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Check where a path leads for the current session
    Route {
        /// Path to check, e.g. `/dashboard/users`
        path: String,
    },
    /// Print session and cart changes made by other shells until Ctrl-C
    Watch,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Sign in against the backend
    SignIn {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Sign out and forget the bearer token
    SignOut,
    /// Email a password reset link
    ForgotPassword {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Set a new password using the token from a reset link
    ResetPassword {
        /// Token from the reset link
        #[arg(short, long)]
        token: String,

        /// New password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
    /// Mark the session logged in without contacting the backend
    Login {
        /// Role (`user`, `seller`, `admin`)
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Mark the session logged out
    Logout,
    /// Show the current session and navigation menu
    Whoami,
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines and the subtotal
    Show,
    /// Add a product by id
    ///
    /// Looks the product up in the catalog unless `--name` and `--price`
    /// are both given.
    Add {
        /// Product id
        id: String,

        /// Line name, for adding without the backend
        #[arg(long, requires = "price")]
        name: Option<String>,

        /// Unit price, for adding without the backend
        #[arg(long, requires = "name")]
        price: Option<Decimal>,

        /// Initial quantity
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity
    Qty {
        /// Product id
        id: String,
        /// New quantity (must be at least 1)
        quantity: u32,
    },
    /// Increase a line's quantity by one
    Inc {
        /// Product id
        id: String,
    },
    /// Decrease a line's quantity by one, never below one
    Dec {
        /// Product id
        id: String,
    },
    /// Remove a line
    Remove {
        /// Product id
        id: String,
    },
    /// Empty the cart
    Clear,
    /// Finish checkout: empty the cart once the payment is confirmed
    Checkout {
        /// Payment id from the provider redirect; omit when none was given
        #[arg(long)]
        payment_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List visible products
    List,
    /// List categories
    Categories,
    /// Show dashboard statistics for the catalog
    Stats,
    /// List products owned by the signed-in seller
    Mine,
    /// Create a category
    AddCategory {
        /// Category name
        name: String,
    },
    /// Rename a category
    RenameCategory {
        /// Category id
        id: String,
        /// New name
        name: String,
    },
    /// Delete a category
    DeleteCategory {
        /// Category id
        id: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env first so RUST_LOG set there applies
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shopfront=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let shell = commands::Shell::open()?;

    match cli.command {
        Commands::Session { action } => match action {
            SessionAction::SignIn { email, password } => {
                commands::session::sign_in(&shell, &email, &password).await?;
            }
            SessionAction::SignOut => commands::session::sign_out(&shell)?,
            SessionAction::ForgotPassword { email } => {
                commands::session::forgot_password(&shell, &email).await?;
            }
            SessionAction::ResetPassword { token, password } => {
                commands::session::reset_password(&shell, &token, &password).await?;
            }
            SessionAction::Login { role } => commands::session::login(&shell, role.as_deref())?,
            SessionAction::Logout => commands::session::logout(&shell)?,
            SessionAction::Whoami => commands::session::whoami(&shell),
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&shell),
            CartAction::Add {
                id,
                name,
                price,
                quantity,
            } => {
                let offline = name.zip(price);
                commands::cart::add(&shell, &id, offline, quantity).await?;
            }
            CartAction::Qty { id, quantity } => commands::cart::set_quantity(&shell, &id, quantity)?,
            CartAction::Inc { id } => commands::cart::increment(&shell, &id)?,
            CartAction::Dec { id } => commands::cart::decrement(&shell, &id)?,
            CartAction::Remove { id } => commands::cart::remove(&shell, &id)?,
            CartAction::Clear => commands::cart::clear(&shell)?,
            CartAction::Checkout { payment_id } => {
                commands::cart::checkout_complete(&shell, payment_id.as_deref()).await?;
            }
        },
        Commands::Products { action } => match action {
            ProductsAction::List => commands::products::list(&shell).await?,
            ProductsAction::Categories => commands::products::categories(&shell).await?,
            ProductsAction::Stats => commands::products::stats(&shell).await?,
            ProductsAction::Mine => commands::products::mine(&shell).await?,
            ProductsAction::AddCategory { name } => {
                commands::products::add_category(&shell, &name).await?;
            }
            ProductsAction::RenameCategory { id, name } => {
                commands::products::rename_category(&shell, &id, &name).await?;
            }
            ProductsAction::DeleteCategory { id } => {
                commands::products::delete_category(&shell, &id).await?;
            }
        },
        Commands::Route { path } => commands::route::check(&shell, &path),
        Commands::Watch => commands::watch::run(shell).await?,
    }
    Ok(())
}
