use std::{str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use lustre_api::{
    auth::{AuthConfig, AuthService, UserRole},
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::Material,
    events::{Event, EventSender},
    handlers::AppServices,
    services::pricing::RatePropagationReport,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::CreateAdmin(args) => handle_create_admin(&context, args, cli.json).await?,
        Commands::Rates(command) => handle_rates_command(&context, command, cli.json).await?,
        Commands::Products(command) => {
            handle_products_command(&context, command, cli.json).await?
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "lustre", about = "Lustre back-office CLI", version)]
struct Cli {
    #[arg(long, global = true, help = "Print machine-readable JSON output")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create an administrator account
    CreateAdmin(CreateAdminArgs),
    #[command(subcommand)]
    Rates(RatesCommands),
    #[command(subcommand)]
    Products(ProductsCommands),
}

#[derive(Args)]
struct CreateAdminArgs {
    #[arg(long, help = "Email address for the account")]
    email: String,
    #[arg(long, help = "Display name")]
    name: String,
    #[arg(long, help = "Password for the account")]
    password: String,
}

#[derive(Subcommand)]
enum RatesCommands {
    /// Show the current rate for every material
    List,
    /// Record a daily rate and reprice matching products
    Set(SetRateArgs),
    /// Reprice products from the current rate without changing it
    Reprice {
        #[arg(value_parser = parse_material, help = "gold or silver")]
        material: Material,
    },
}

#[derive(Args)]
struct SetRateArgs {
    #[arg(value_parser = parse_material, help = "gold or silver")]
    material: Material,
    #[arg(help = "Rate per gram in the base currency")]
    rate_per_gram: Decimal,
    #[arg(long, help = "Rate date (YYYY-MM-DD); defaults to today")]
    date: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum ProductsCommands {
    /// List products, inactive ones included
    List {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 20)]
        per_page: u64,
        #[arg(long)]
        search: Option<String>,
    },
}

fn parse_material(raw: &str) -> Result<Material, String> {
    Material::from_str(raw.trim()).map_err(|_| format!("unknown material '{}'", raw))
}

struct CliContext {
    db: Arc<DbPool>,
    services: AppServices,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config: AppConfig = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        let auth_service = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&config),
            db.clone(),
        ));

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(32);
        let event_sender = Arc::new(EventSender::new(event_tx));

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "lustre_cli", event = ?event, "received async event");
            }
        });

        let services = AppServices::new(db.clone(), event_sender, auth_service, &config);
        Ok(Self { db, services })
    }
}

async fn handle_create_admin(context: &CliContext, args: CreateAdminArgs, json: bool) -> Result<()> {
    if args.password.len() < 8 {
        return Err(anyhow!("password must be at least 8 characters"));
    }
    let user = context
        .services
        .auth
        .create_user(&args.email, &args.name, &args.password, UserRole::Admin)
        .await
        .context("failed to create admin")?;

    if json {
        print_json(&serde_json::json!({
            "id": user.id,
            "email": user.email,
            "role": user.role.to_string(),
        }))?;
    } else {
        println!("Created admin {} ({})", user.email, user.id);
    }
    Ok(())
}

async fn handle_rates_command(context: &CliContext, command: RatesCommands, json: bool) -> Result<()> {
    let rates = &context.services.rates;
    match command {
        RatesCommands::List => {
            let current = rates
                .list_current_rates()
                .await
                .context("failed to load rates")?;
            if json {
                print_json(&current)?;
            } else if current.is_empty() {
                println!("No rates recorded");
            } else {
                for rate in current {
                    println!(
                        "- {} • {} per gram • effective {}",
                        rate.material, rate.rate_per_gram, rate.effective_date
                    );
                }
            }
        }
        RatesCommands::Set(args) => {
            if args.rate_per_gram <= Decimal::ZERO {
                return Err(anyhow!("rate_per_gram must be positive"));
            }
            let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
            let report = rates
                .set_daily_rate(args.material, date, args.rate_per_gram)
                .await
                .context("failed to set rate")?;
            render_report(&report, json)?;
        }
        RatesCommands::Reprice { material } => {
            let report = rates
                .reprice_material(material)
                .await
                .context("failed to reprice products")?;
            render_report(&report, json)?;
        }
    }
    Ok(())
}

async fn handle_products_command(
    context: &CliContext,
    command: ProductsCommands,
    json: bool,
) -> Result<()> {
    match command {
        ProductsCommands::List {
            page,
            per_page,
            search,
        } => {
            let (products, total) = context
                .services
                .products
                .list_products(page.max(1), per_page.clamp(1, 100), search, true)
                .await
                .context("failed to list products")?;
            if json {
                print_json(&products)?;
            } else {
                println!("{} products", total);
                for product in products {
                    println!(
                        "- {} • {} • {}{}",
                        product.slug,
                        product.name,
                        product.price,
                        if product.is_active { "" } else { " • inactive" }
                    );
                }
            }
        }
    }
    Ok(())
}

fn render_report(report: &RatePropagationReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    println!(
        "{} rate {} for {}",
        report.material, report.rate_per_gram, report.rate_date
    );
    if report.applied_as_current {
        println!(
            "  repriced {} products, updated {} market prices",
            report.products_repriced, report.market_prices_updated
        );
    } else {
        println!("  a newer rate is current; products left unchanged");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
