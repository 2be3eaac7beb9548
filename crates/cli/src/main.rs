//! Figurine CLI - browse the catalog and manage a cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse and filter the catalog
//! figurine catalog --category anime --sort price-low
//!
//! # Manage the cart
//! figurine cart add 3 --quantity 2
//! figurine cart show
//! figurine summary --promo SAVE10
//!
//! # Accounts: the cart and favorites follow the signed-in account
//! figurine signup mika --email mika@example.com
//! figurine account update --phone "0917 123 4567" --city Makati
//! figurine signout
//! ```
//!
//! # Commands
//!
//! - `catalog` - List products with filters and sorting
//! - `cart` - Show, add, remove, set quantities or clear
//! - `favorites` - Show, toggle, clear or move everything to the cart
//! - `summary` - Checkout totals with an optional promo code
//! - `signup` / `signin` / `signout` / `whoami` - Account management
//! - `account` - Show or update the signed-in user's profile

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use figurine_core::{Email, ProductId};
use figurine_core::catalog::{PriceRange, ProductFilter, SortBy};
use figurine_storefront::{ProfileUpdate, StorefrontConfig};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Context;
use commands::account::AddressChanges;

#[derive(Parser)]
#[command(name = "figurine")]
#[command(author, version, about = "Figurine storefront in your terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Catalog(CatalogArgs),
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Show checkout totals for the cart
    Summary {
        /// Promo code to apply
        #[arg(long)]
        promo: Option<String>,
    },
    /// Create an account and sign in
    Signup(AccountArgs),
    /// Sign in to an existing account
    Signin(AccountArgs),
    /// Sign out and go back to the guest cart
    Signout,
    /// Show who is signed in
    Whoami,
    /// Show or update your profile
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Args)]
struct CatalogArgs {
    /// Search names, brands, franchises and descriptions
    #[arg(short, long)]
    search: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    franchise: Option<String>,
    /// Figure scale, e.g. 1/7
    #[arg(long)]
    scale: Option<String>,
    /// Price range as MIN-MAX or MIN-
    #[arg(long)]
    price: Option<PriceRange>,
    /// Only products in stock
    #[arg(long)]
    in_stock: bool,
    /// Only products on sale
    #[arg(long)]
    on_sale: bool,
    /// name, price-low, price-high, rating, newest or popularity
    #[arg(long, default_value = "name")]
    sort: SortBy,
}

impl From<CatalogArgs> for ProductFilter {
    fn from(args: CatalogArgs) -> Self {
        Self {
            search: args.search,
            category: args.category,
            brand: args.brand,
            franchise: args.franchise,
            scale: args.scale,
            price_range: args.price,
            in_stock: args.in_stock,
            on_sale: args.on_sale,
            sort_by: args.sort,
        }
    }
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart contents
    Show,
    /// Add a product
    Add {
        id: ProductId,
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,
        /// Confirm adding more of a product already in the cart
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove a product
    Remove {
        id: ProductId,
        #[arg(short, long)]
        yes: bool,
    },
    /// Set a product's quantity (0 removes it)
    Set {
        id: ProductId,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear {
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorites
    Show,
    /// Add a product, or remove it if already a favorite
    Toggle {
        id: ProductId,
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove all favorites
    Clear {
        #[arg(short, long)]
        yes: bool,
    },
    /// Add every favorite to the cart
    MoveToCart,
}

#[derive(Args)]
struct AccountArgs {
    /// Account key (letters, digits, '-' and '_')
    key: String,
    #[arg(short, long)]
    email: Option<String>,
    /// Display name
    #[arg(short, long)]
    name: Option<String>,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Show the signed-in user's profile
    Show,
    /// Change profile fields; omitted fields keep their value
    Update(ProfileArgs),
}

#[derive(Args)]
struct ProfileArgs {
    /// Display name
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    street: Option<String>,
    #[arg(long)]
    city: Option<String>,
    /// State or province
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    zip: Option<String>,
    #[arg(long)]
    country: Option<String>,
    /// Date of birth as YYYY-MM-DD
    #[arg(long)]
    birthday: Option<NaiveDate>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    bio: Option<String>,
}

impl ProfileArgs {
    fn into_changes(self) -> Result<(ProfileUpdate, AddressChanges), commands::CliError> {
        let update = ProfileUpdate {
            display_name: self.name,
            email: self.email.as_deref().map(Email::parse).transpose()?,
            phone: self.phone,
            address: None,
            date_of_birth: self.birthday,
            gender: self.gender,
            bio: self.bio,
        };
        let address = AddressChanges {
            street: self.street,
            city: self.city,
            state: self.state,
            zip_code: self.zip,
            country: self.country,
        };
        Ok((update, address))
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.sentry_environment.clone().into()),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Log to stderr so command output on stdout stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "figurine_storefront=info,figurine_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut ctx = Context::open(config)?;
    let mut out = std::io::stdout().lock();

    let result = match cli.command {
        Commands::Catalog(args) => commands::catalog::list(&ctx, &mut out, &args.into()),
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx, &mut out),
            CartAction::Add { id, quantity, yes } => {
                commands::cart::add(&mut ctx, &mut out, id, quantity, yes)
            }
            CartAction::Remove { id, yes } => commands::cart::remove(&mut ctx, &mut out, id, yes),
            CartAction::Set { id, quantity } => commands::cart::set(&ctx, &mut out, id, quantity),
            CartAction::Clear { yes } => commands::cart::clear(&mut ctx, &mut out, yes),
        },
        Commands::Favorites { action } => match action {
            FavoritesAction::Show => commands::favorites::show(&ctx, &mut out),
            FavoritesAction::Toggle { id, yes } => {
                commands::favorites::toggle(&mut ctx, &mut out, id, yes)
            }
            FavoritesAction::Clear { yes } => commands::favorites::clear(&mut ctx, &mut out, yes),
            FavoritesAction::MoveToCart => commands::favorites::move_to_cart(&ctx, &mut out),
        },
        Commands::Summary { promo } => commands::catalog::summary(&ctx, &mut out, promo.as_deref()),
        Commands::Signup(args) => match account_identity(args) {
            Ok(identity) => commands::account::sign_up(&ctx, &mut out, identity).await,
            Err(e) => Err(e),
        },
        Commands::Signin(args) => account_identity(args)
            .and_then(|identity| commands::account::sign_in(&ctx, &mut out, identity)),
        Commands::Signout => commands::account::sign_out(&ctx, &mut out),
        Commands::Whoami => commands::account::whoami(&ctx, &mut out),
        Commands::Account { action } => match action {
            AccountAction::Show => commands::account::show_profile(&ctx, &mut out).await,
            AccountAction::Update(args) => match args.into_changes() {
                Ok((update, address)) => {
                    commands::account::update_profile(&ctx, &mut out, update, address).await
                }
                Err(e) => Err(e),
            },
        },
    };

    // Pending remote writes land before the process exits, even on failure.
    ctx.close().await;
    result?;
    Ok(())
}

fn account_identity(args: AccountArgs) -> Result<figurine_storefront::Identity, commands::CliError> {
    commands::identity_from_args(&args.key, args.email.as_deref(), args.name)
}
