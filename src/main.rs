use clap::Parser;
use partprice::application::price_search::PriceSearchRequest;
use partprice::cli::commands::{Cli, Commands};
use partprice::domain::entities::inventory::{NewInventoryItem, StockStatus};
use partprice::domain::values::platform::PlatformSelector;
use partprice::domain::values::price_ladder::PricingConfig;
use partprice::infrastructure::config::AppConfig;
use partprice::PartPrice;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,partprice=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let pp = match AppConfig::load(cli.config.as_deref()).and_then(PartPrice::new) {
        Ok(pp) => pp,
        Err(e) => {
            eprintln!("Error initializing partprice: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_command(pp, cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_command(pp: PartPrice, cmd: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::Search {
            reference,
            platform,
            limit,
            include_slow,
            tenant,
            equivalents,
        } => {
            let platform: PlatformSelector = platform.parse().map_err(|e: String| e)?;
            let request = PriceSearchRequest {
                platform,
                sample_limit: limit,
                include_slow,
                tenant_id: tenant,
                with_equivalents: equivalents,
                ..PriceSearchRequest::new(&reference)
            };
            let response = pp.search(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::FullSearch { reference, tenant } => {
            let result = pp.full_search(&reference, tenant).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Equivalents { reference } => {
            let expansion = pp.equivalents(&reference).await?;
            println!("{}", serde_json::to_string_pretty(&expansion)?);
        }
        Commands::Suggest {
            label,
            market_price,
            tenant,
        } => match pp.suggest(tenant, &label, market_price)? {
            Some(suggestion) => println!("{}", serde_json::to_string_pretty(&suggestion)?),
            None => println!("No price family matches '{label}'"),
        },
        Commands::Stats { prices } => {
            let stats = pp.stats(&prices)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Platforms { probe } => {
            if probe {
                let statuses = pp.probe_platforms().await;
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&pp.platforms())?);
            }
        }
        Commands::PricingUpload { file, tenant } => {
            let text = std::fs::read_to_string(&file)?;
            let config = PricingConfig::from_toml(&text)?;
            pp.upload_pricing(tenant, &config)?;
            let scope = tenant.map_or_else(|| "global".to_string(), |t| format!("tenant {t}"));
            println!(
                "Uploaded {} ladders and {} family mappings for {scope}",
                config.ladders.len(),
                config.families.len()
            );
        }
        Commands::TenantAdd { name, exclude } => {
            let id = pp.add_tenant(&name, exclude).await?;
            println!("Tenant {id} added");
        }
        Commands::InventoryAdd { json } => {
            let data: serde_json::Value = serde_json::from_str(&json)?;
            let text = |field: &str| data[field].as_str().map(String::from);

            let status: StockStatus = match data["status"].as_str() {
                Some(s) => s.parse().map_err(|e: String| e)?,
                None => StockStatus::InStock,
            };
            let item = NewInventoryItem {
                tenant_id: data["tenant_id"].as_i64().ok_or("tenant_id required")?,
                reference: text("reference").ok_or("reference required")?,
                oem_code: text("oem_code"),
                alt_oem_code: text("alt_oem_code"),
                iam_code: text("iam_code"),
                title: text("title").unwrap_or_default(),
                price: data["price"].as_f64(),
                status,
                location: text("location"),
            };
            let id = pp.add_inventory_item(&item).await?;
            println!("Inventory item {id} added");
        }
    }
    Ok(())
}
