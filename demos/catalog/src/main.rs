//! Catalog Demo
//!
//! Boots a Courier runtime, installs the product catalog over an in-memory
//! store seeded with a few products, and dispatches one request.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package catalog-demo -- list
//! cargo run --package catalog-demo -- create --name Pen --category Office --image-file pen.png --price 5
//! cargo run --package catalog-demo -- by-category Office
//! cargo run --package catalog-demo -- --config demo.toml get 6f1c...
//! ```
//!
//! Configuration is read from `courier.toml` and `COURIER_*` variables, as
//! with any Courier application.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use courier::catalog::{
    self, CreateProduct, CreateProductRequest, CreateProductResponse, GetProductByCategory,
    GetProductById, GetProducts, GetProductsResponse, InMemoryDocumentStore,
};
use courier::prelude::*;
use courier::runtime::ConfigLoader;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "catalog-demo", about = "Dispatch catalog requests through Courier")]
struct Cli {
    /// Configuration file to load instead of the default search
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Start with an empty catalog
    #[arg(long)]
    empty: bool,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Create a product and print its id
    Create {
        #[arg(long)]
        name: String,
        /// May be given several times
        #[arg(long)]
        category: Vec<String>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        image_file: String,
        #[arg(long)]
        price: f64,
    },
    /// List every product
    List,
    /// List products in a category
    ByCategory { category: String },
    /// Show one product
    Get { id: String },
}

// ============================================================================
// Seed Data
// ============================================================================

fn seed() -> Vec<CreateProduct> {
    [
        ("Fountain Pen", &["Office", "Gifts"][..], "pen.png", 24.5),
        ("Desk Lamp", &["Home", "Office"][..], "lamp.png", 39.0),
        ("Notebook", &["Office"][..], "notebook.png", 4.2),
    ]
    .into_iter()
    .map(|(name, category, image_file, price)| CreateProduct {
        name: name.to_string(),
        category: category.iter().map(|c| c.to_string()).collect(),
        description: format!("{name} from the demo catalog"),
        image_file: image_file.to_string(),
        price,
    })
    .collect()
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    let config = loader.load().context("failed to load configuration")?;
    let runtime = CourierRuntime::from_config(config);

    let mediator = runtime.build(|builder| {
        catalog::install(builder, InMemoryDocumentStore::shared())
    })?;

    if !cli.empty {
        for product in seed() {
            mediator.send_default(product).await?;
        }
        info!("Seeded demo catalog");
    }

    if let Err(e) = run(&mediator, cli.command).await {
        error!(error = %e, "Request failed");
        return Err(e);
    }

    Ok(())
}

async fn run(mediator: &Mediator, action: Action) -> Result<()> {
    let output = match action {
        Action::Create {
            name,
            category,
            description,
            image_file,
            price,
        } => {
            let request = CreateProductRequest {
                name,
                category,
                description,
                image_file,
                price,
            };
            let response: CreateProductResponse = mediator
                .send_default(CreateProduct::from(request))
                .await?
                .into();
            println!("Created {}", response.location());
            serde_json::to_string_pretty(&response)?
        }
        Action::List => {
            let response: GetProductsResponse = mediator.send_default(GetProducts).await?.into();
            serde_json::to_string_pretty(&response)?
        }
        Action::ByCategory { category } => {
            let result = mediator
                .send_default(GetProductByCategory { category })
                .await?;
            serde_json::to_string_pretty(&result.products)?
        }
        Action::Get { id } => {
            let id = id.parse().context("product id must be a UUID")?;
            let result = mediator.send_default(GetProductById { id }).await?;
            serde_json::to_string_pretty(&result.product)?
        }
    };

    println!("{output}");
    Ok(())
}
