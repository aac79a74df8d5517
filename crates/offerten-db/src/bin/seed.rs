//! # Seed Data Generator
//!
//! Populates the database with a moving company's catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed the database from offerten.toml (or the defaults)
//! cargo run -p offerten-db --bin seed
//!
//! # Specify database path and issue a few sample quotes
//! cargo run -p offerten-db --bin seed -- --db ./data/offerten.db --quotes 5
//!
//! # Use a specific config file
//! cargo run -p offerten-db --bin seed -- --config ./offerten.toml
//! ```
//!
//! ## Generated Data
//! - Service categories: fixed, hourly and custom priced
//! - Additional services, with `Stundensatz` carrying the worker surcharge
//! - Optionally: sample customers and quotes with varying crew sizes

use std::env;
use std::path::PathBuf;

use offerten_core::money::Money;
use offerten_core::types::{CustomerSnapshot, DocumentType, PricingModel};
use offerten_db::{AppConfig, CategoryChoice, CategoryDraft, Database, DocumentRequest, ServiceDraft};
use tracing_subscriber::EnvFilter;

/// (code, name, model, base price, hourly rate) in francs
const CATEGORIES: &[(&str, &str, PricingModel, Option<i64>, Option<i64>)] = &[
    ("UMZUG", "Umzug", PricingModel::Fixed, Some(1200), None),
    ("REINIGUNG", "Reinigung", PricingModel::Fixed, Some(450), None),
    ("RAEUMUNG", "Räumung", PricingModel::Hourly, None, Some(95)),
    ("ENTRUEMPELUNG", "Entrümpelung", PricingModel::Hourly, None, Some(85)),
    ("KLAVIER", "Klaviertransport", PricingModel::Custom, None, None),
];

/// (name, price in francs)
const ADD_ONS: &[(&str, i64)] = &[
    ("Stundensatz", 120),
    ("Reinigung", 350),
    ("Entsorgung", 150),
    ("Verpackungsmaterial", 80),
    ("Möbellift", 250),
];

const SAMPLE_CUSTOMERS: &[(&str, &str)] = &[
    ("Familie Meier", "Zürich"),
    ("Keller AG", "Winterthur"),
    ("Anna Huber", "Bern"),
    ("Marco Rossi", "Lugano"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut quotes: usize = 0;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--quotes" | "-q" => {
                if i + 1 < args.len() {
                    quotes = args[i + 1].parse().unwrap_or(0);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Offerten Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (overrides the config)");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -q, --quotes <N>     Sample quotes to issue (default: 0)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🌱 Offerten Seed Data Generator");
    println!("===============================");
    println!("Database: {}", config.database.path.display());
    println!("Quotes:   {}", quotes);
    println!();

    let db = Database::open(&config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let catalog = db.catalog();
    let (categories, services) = catalog.count().await?;
    if categories > 0 || services > 0 {
        println!(
            "⚠ Catalog already has {} categories and {} additional services",
            categories, services
        );
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Creating catalog...");

    let mut category_ids = Vec::new();
    for (code, name, pricing_model, base_price, hourly_rate) in CATEGORIES {
        let category = catalog
            .create_category(&CategoryDraft {
                code: code.to_string(),
                name: name.to_string(),
                pricing_model: *pricing_model,
                base_price: base_price.map(Money::from_francs),
                hourly_rate: hourly_rate.map(Money::from_francs),
            })
            .await?;
        println!("  {} ({:?})", category.name, category.pricing_model);
        category_ids.push(category.id);
    }

    let mut service_ids = Vec::new();
    for (name, price) in ADD_ONS {
        let service = catalog
            .create_service(&ServiceDraft {
                name: name.to_string(),
                price: Money::from_francs(*price),
                applies_worker_surcharge: None,
            })
            .await?;
        println!(
            "  + {} {}{}",
            service.name,
            service.price,
            if service.applies_worker_surcharge {
                " (worker surcharge)"
            } else {
                ""
            }
        );
        service_ids.push(service.id);
    }

    if quotes > 0 {
        println!();
        println!("Issuing sample quotes...");

        let issuer = db.issuer();
        let start = std::time::Instant::now();

        let mut customers = Vec::new();
        for (name, city) in SAMPLE_CUSTOMERS {
            let customer = issuer
                .create_customer(&CustomerSnapshot {
                    name: name.to_string(),
                    city: Some(city.to_string()),
                    email: Some(format!(
                        "{}@example.ch",
                        name.to_lowercase().replace(' ', ".")
                    )),
                    ..Default::default()
                })
                .await?;
            customers.push(customer.id);
        }

        for n in 0..quotes {
            // Fixed categories only; custom ones need an amount
            let category_id = &category_ids[n % 2];
            let request = DocumentRequest {
                document_type: DocumentType::Quote,
                customer_id: Some(customers[n % customers.len()].clone()),
                customer: None,
                categories: vec![CategoryChoice {
                    category_id: category_id.clone(),
                    custom_amount: None,
                }],
                add_on_ids: service_ids.iter().take(n % 3 + 1).cloned().collect(),
                workers: (n % 5) as i32 + 1,
                rooms: (n % 4) as i32 + 1,
                trucks: 1,
                base_override: None,
                notes: None,
            };

            match issuer.issue(&request).await {
                Ok(quote) => println!(
                    "  {} {} {}",
                    quote.document_number, quote.customer.name, quote.total
                ),
                Err(e) => eprintln!("Failed to issue quote {}: {}", n + 1, e),
            }
        }

        println!();
        println!("✓ Issued {} quotes in {:?}", quotes, start.elapsed());
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
