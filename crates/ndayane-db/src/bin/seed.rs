//! # Seed Data Generator
//!
//! Populates a database with a hardware-store catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./ndayane_dev.db
//! cargo run -p ndayane-db --bin seed
//!
//! # Specify database path, more logging
//! RUST_LOG=debug cargo run -p ndayane-db --bin seed -- --db ./data/ndayane.db
//! ```
//!
//! ## Generated Data
//! - Two warehouses: "Magasin principal" (principal) and "Dépôt annexe"
//! - An admin and a cashier account
//! - Products across families (ciment, fer, visserie, plomberie,
//!   électricité, peinture, outillage), each in a few sizes, stocked in the
//!   principal warehouse
//! - A handful of clients (one with credit on account, one in debt)
//! - Two suppliers
//!
//! Everything is written in one transaction.

use chrono::Utc;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ndayane_core::{
    Client, Money, Product, StockMovement, StockMovementReason, Supplier, User, UserRole, Warehouse,
};
use ndayane_db::{Database, DbConfig};

/// Product families: (reference prefix, unit, base price in FCFA, names)
const FAMILIES: &[(&str, &str, i64, &[&str])] = &[
    (
        "CIM",
        "sac",
        4_750,
        &["Ciment CPJ 45 50kg", "Ciment CPJ 35 50kg", "Ciment blanc 25kg"],
    ),
    (
        "FER",
        "barre",
        2_900,
        &["Fer à béton HA8", "Fer à béton HA10", "Fer à béton HA12", "Fil d'attache"],
    ),
    (
        "VIS",
        "boîte",
        1_000,
        &["Vis à bois", "Vis tôle", "Boulons", "Chevilles", "Clous"],
    ),
    (
        "PLB",
        "pièce",
        1_500,
        &["Tube PVC", "Coude PVC", "Robinet", "Raccord laiton", "Siphon"],
    ),
    (
        "ELC",
        "pièce",
        800,
        &["Câble électrique (m)", "Interrupteur", "Prise murale", "Ampoule LED", "Disjoncteur"],
    ),
    (
        "PNT",
        "pot",
        6_500,
        &["Peinture à eau", "Peinture glycéro", "Vernis", "Diluant"],
    ),
    (
        "OUT",
        "pièce",
        3_500,
        &["Marteau", "Truelle", "Niveau à bulle", "Mètre ruban", "Scie à métaux"],
    ),
];

/// Size variants: (suffix, price multiplier in percent)
const SIZES: &[(&str, i64)] = &[("", 100), (" - grand modèle", 160), (" - lot pro", 450)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./ndayane_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Ndayane POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./ndayane_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    {
        let mut conn = db.pool().acquire().await?;
        if !db.products().list_active(&mut conn, 1).await?.is_empty() {
            warn!("Database already has products, skipping seed (delete the file to regenerate)");
            return Ok(());
        }
    }

    let start = std::time::Instant::now();
    let now = Utc::now();
    let mut tx = db.pool().begin().await?;

    // ===== Warehouses =====
    let principal = Warehouse {
        id: Uuid::new_v4().to_string(),
        name: "Magasin principal".to_string(),
        location: Some("Ndayane".to_string()),
        is_principal: true,
        created_at: now,
    };
    let annex = Warehouse {
        id: Uuid::new_v4().to_string(),
        name: "Dépôt annexe".to_string(),
        location: Some("Zone artisanale".to_string()),
        is_principal: false,
        created_at: now,
    };
    db.warehouses().insert(&mut tx, &principal).await?;
    db.warehouses().insert(&mut tx, &annex).await?;

    // ===== Users =====
    for (username, full_name, role) in [
        ("admin", "Administrateur", UserRole::Admin),
        ("caisse1", "Caissier principal", UserRole::Cashier),
    ] {
        db.users()
            .insert(
                &mut tx,
                &User {
                    id: Uuid::new_v4().to_string(),
                    username: username.to_string(),
                    full_name: full_name.to_string(),
                    role,
                    is_active: true,
                    created_at: now,
                },
            )
            .await?;
    }

    // ===== Catalog & stock =====
    let mut generated = 0usize;
    for (family_idx, (prefix, unit, base_price, names)) in FAMILIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (suffix, percent)) in SIZES.iter().enumerate() {
                let seed = family_idx * 100 + name_idx * 10 + size_idx;
                let sale_price = round_to_25(base_price * percent / 100 + (seed as i64 % 7) * 50);

                let product = Product {
                    id: Uuid::new_v4().to_string(),
                    reference: format!("{}-{:03}", prefix, name_idx * 10 + size_idx),
                    name: format!("{}{}", name, suffix),
                    purchase_price: Money::new(round_to_25(sale_price * 75 / 100)),
                    sale_price: Money::new(sale_price),
                    unit: unit.to_string(),
                    min_stock: 5 + (seed % 4) as i64 * 5,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };
                db.products().insert(&mut tx, &product).await?;

                let quantity = (seed as i64 * 13) % 120;
                if quantity > 0 {
                    db.stock()
                        .add(&mut tx, &product.id, &principal.id, quantity, now)
                        .await?;
                    db.stock()
                        .record_movement(
                            &mut tx,
                            &StockMovement {
                                id: Uuid::new_v4().to_string(),
                                product_id: product.id.clone(),
                                warehouse_id: principal.id.clone(),
                                delta: quantity,
                                reason: StockMovementReason::Adjustment,
                                reference: Some("Inventaire initial".to_string()),
                                created_at: now,
                            },
                        )
                        .await?;
                }

                generated += 1;
            }
        }
    }

    // ===== Clients =====
    for (name, phone, balance) in [
        ("Client comptoir", None, 0),
        ("Entreprise Fall BTP", Some("+221 77 123 45 67"), -25_000),
        ("Mamadou Sarr (maçon)", Some("+221 76 555 12 12"), 18_500),
        ("Mairie de Ndayane", Some("+221 33 900 00 00"), 0),
    ] {
        db.clients()
            .insert(
                &mut tx,
                &Client {
                    id: Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    phone: phone.map(str::to_string),
                    email: None,
                    address: None,
                    opening_balance: Money::new(balance),
                    balance: Money::new(balance),
                    created_at: now,
                    updated_at: now,
                },
            )
            .await?;
    }

    // ===== Suppliers =====
    for name in ["SOCOCIM Industries", "Quincaillerie Centrale de Dakar"] {
        db.suppliers()
            .insert(
                &mut tx,
                &Supplier {
                    id: Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    phone: None,
                    email: None,
                    address: Some("Dakar".to_string()),
                    is_active: true,
                    created_at: now,
                },
            )
            .await?;
    }

    tx.commit().await?;

    info!(
        products = generated,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Seed complete"
    );

    let mut conn = db.pool().acquire().await?;
    let hits = db.products().search(&mut conn, "ciment", 10).await?;
    info!(results = hits.len(), "Search 'ciment'");

    Ok(())
}

/// Rounds a price to the nearest 25 FCFA (smallest coin in use).
fn round_to_25(amount: i64) -> i64 {
    ((amount + 12) / 25) * 25
}
