use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

use commands::catalog::NewProductArgs;

#[derive(Parser)]
#[command(name = "bzr")]
#[command(about = "Marketplace purchase service CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> overlay). Defaults apply when omitted.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> overlay)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Seller seeding
    Seller {
        #[command(subcommand)]
        cmd: SellerCmd,
    },

    /// Product seeding
    Product {
        #[command(subcommand)]
        cmd: ProductCmd,
    },

    /// Purchase inspection
    Purchase {
        #[command(subcommand)]
        cmd: PurchaseCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply embedded SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum SellerCmd {
    /// Insert a seller with its payout bank details and print its id.
    Add {
        #[arg(long)]
        name: String,

        /// Bank name (e.g. BCA)
        #[arg(long)]
        bank_name: String,

        #[arg(long)]
        holder: String,

        #[arg(long)]
        number: String,
    },
}

#[derive(Subcommand)]
enum ProductCmd {
    /// Insert a product and print its id.
    Add {
        #[arg(long)]
        seller_id: Uuid,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "general")]
        category: String,

        /// Unit price in minor currency units
        #[arg(long)]
        price: i64,

        #[arg(long)]
        sku: String,

        #[arg(long)]
        stock: i64,

        /// Product image id in the file service
        #[arg(long)]
        file_id: Option<Uuid>,
    },
}

#[derive(Subcommand)]
enum PurchaseCmd {
    /// Print a purchase as JSON
    Show {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let (_, cfg) = commands::load_config(&cli.config_paths)?;
            let pool = commands::connect(&cfg).await?;
            match cmd {
                DbCmd::Status => {
                    let s = bzr_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_purchases_table={} unpaid_purchases={}",
                        s.ok, s.has_purchases_table, s.unpaid_purchases
                    );
                }
                DbCmd::Migrate => {
                    bzr_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = bzr_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Seller { cmd } => match cmd {
            SellerCmd::Add {
                name,
                bank_name,
                holder,
                number,
            } => {
                let (_, cfg) = commands::load_config(&cli.config_paths)?;
                let pool = commands::connect(&cfg).await?;
                let id = commands::catalog::add_seller(&pool, name, bank_name, holder, number)
                    .await?;
                println!("seller_id={id}");
            }
        },

        Commands::Product { cmd } => match cmd {
            ProductCmd::Add {
                seller_id,
                name,
                category,
                price,
                sku,
                stock,
                file_id,
            } => {
                let (_, cfg) = commands::load_config(&cli.config_paths)?;
                let pool = commands::connect(&cfg).await?;
                let id = commands::catalog::add_product(
                    &pool,
                    NewProductArgs {
                        seller_id,
                        name,
                        category,
                        price,
                        sku,
                        stock,
                        file_id,
                    },
                )
                .await?;
                println!("product_id={id}");
            }
        },

        Commands::Purchase { cmd } => match cmd {
            PurchaseCmd::Show { id } => {
                let (_, cfg) = commands::load_config(&cli.config_paths)?;
                let pool = commands::connect(&cfg).await?;
                println!("{}", commands::purchase::show(pool, &cfg, &id).await?);
            }
        },
    }

    Ok(())
}
