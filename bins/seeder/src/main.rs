//! Database seeder for Residia development and testing.
//!
//! Seeds a resident, a rate-based community with a rate change mid-history,
//! a standalone community priced by its legacy fixed amount, their units,
//! and a few expenses. Existing rows are left alone, so it can be rerun.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::NaiveDate;
use residia_db::entities::{
    communities, expenses, rate_configurations,
    sea_orm_active_enums::{CommunityKind, ExpenseStatus},
    units, users,
};
use residia_shared::DatabaseConfig;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

/// Demo resident (consistent for all seeds)
const DEMO_USER_ID: Uuid = Uuid::from_u128(0x0001);
/// Rate-based demo community
const MAPLE_COURT_ID: Uuid = Uuid::from_u128(0x0100);
/// Standalone demo community
const HILLTOP_ID: Uuid = Uuid::from_u128(0x0200);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = residia_db::connect(&DatabaseConfig {
        url,
        max_connections: 2,
        min_connections: 1,
    })
    .await
    .context("Failed to connect to database")?;

    println!("Seeding demo resident...");
    seed_user(&db).await?;

    println!("Seeding Maple Court (rate-based)...");
    seed_maple_court(&db).await?;

    println!("Seeding Hilltop Towers (standalone)...");
    seed_hilltop(&db).await?;

    println!("Seeding complete!");
    Ok(())
}

fn date(y: i32, m: u32, d: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).with_context(|| format!("invalid date {y}-{m}-{d}"))
}

async fn community_exists(db: &DatabaseConnection, id: Uuid) -> anyhow::Result<bool> {
    Ok(communities::Entity::find_by_id(id).one(db).await?.is_some())
}

async fn seed_user(db: &DatabaseConnection) -> anyhow::Result<()> {
    if users::Entity::find_by_id(DEMO_USER_ID).one(db).await?.is_some() {
        println!("  Demo resident already exists, skipping...");
        return Ok(());
    }

    users::ActiveModel {
        id: Set(DEMO_USER_ID),
        email: Set("resident@residia.dev".to_string()),
        full_name: Set("Demo Resident".to_string()),
        created_at: NotSet,
    }
    .insert(db)
    .await?;
    println!("  Created demo resident: resident@residia.dev");
    Ok(())
}

async fn seed_maple_court(db: &DatabaseConnection) -> anyhow::Result<()> {
    if community_exists(db, MAPLE_COURT_ID).await? {
        println!("  Maple Court already exists, skipping...");
        return Ok(());
    }

    communities::ActiveModel {
        id: Set(MAPLE_COURT_ID),
        name: Set("Maple Court".to_string()),
        kind: Set(CommunityKind::RateBased),
        flat_amount: Set(Some(Decimal::new(150, 2))),
        fixed_amount: Set(None),
        opening_balance: Set(Some(Decimal::new(25_000, 0))),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(db)
    .await?;

    // 2.00 per area unit from 2023, raised to 2.50 mid-2024
    for (effective_date, rate) in [
        (date(2023, 1, 1)?, Decimal::new(200, 2)),
        (date(2024, 7, 1)?, Decimal::new(250, 2)),
    ] {
        rate_configurations::ActiveModel {
            id: Set(Uuid::now_v7()),
            community_id: Set(MAPLE_COURT_ID),
            effective_date: Set(effective_date),
            rate_per_area: Set(rate),
            fixed_amount: Set(Decimal::ZERO),
            created_at: NotSet,
        }
        .insert(db)
        .await?;
    }

    let flats = [
        ("A-101", Some(Decimal::new(850, 0)), Some(date(2023, 1, 1)?)),
        ("A-102", Some(Decimal::new(1_200, 0)), Some(date(2023, 3, 15)?)),
        ("B-201", Some(Decimal::new(975, 0)), Some(date(2024, 2, 10)?)),
        // Not handed over yet
        ("B-202", Some(Decimal::new(975, 0)), None),
    ];
    for (label, flat_size, start) in flats {
        insert_unit(db, MAPLE_COURT_ID, label, flat_size, start).await?;
    }

    insert_expense(
        db,
        MAPLE_COURT_ID,
        "Lift servicing",
        4_500,
        date(2024, 3, 5)?,
        ExpenseStatus::Approved,
    )
    .await?;
    insert_expense(
        db,
        MAPLE_COURT_ID,
        "Garden upkeep",
        1_200,
        date(2024, 3, 18)?,
        ExpenseStatus::Pending,
    )
    .await?;

    println!("  Created Maple Court with 2 rate configurations and 4 units");
    Ok(())
}

async fn seed_hilltop(db: &DatabaseConnection) -> anyhow::Result<()> {
    if community_exists(db, HILLTOP_ID).await? {
        println!("  Hilltop Towers already exists, skipping...");
        return Ok(());
    }

    // No rate configurations: billed from the legacy fixed amount
    communities::ActiveModel {
        id: Set(HILLTOP_ID),
        name: Set("Hilltop Towers".to_string()),
        kind: Set(CommunityKind::Standalone),
        flat_amount: Set(None),
        fixed_amount: Set(Some(Decimal::new(2_500, 0))),
        opening_balance: Set(None),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(db)
    .await?;

    insert_unit(db, HILLTOP_ID, "T-1", None, Some(date(2024, 1, 1)?)).await?;
    insert_unit(db, HILLTOP_ID, "T-2", None, Some(date(2024, 5, 20)?)).await?;

    insert_expense(
        db,
        HILLTOP_ID,
        "Security contract",
        9_000,
        date(2024, 6, 1)?,
        ExpenseStatus::Approved,
    )
    .await?;
    insert_expense(
        db,
        HILLTOP_ID,
        "Duplicate invoice",
        9_000,
        date(2024, 6, 2)?,
        ExpenseStatus::Rejected,
    )
    .await?;

    println!("  Created Hilltop Towers with 2 units");
    Ok(())
}

async fn insert_unit(
    db: &DatabaseConnection,
    community_id: Uuid,
    label: &str,
    flat_size: Option<Decimal>,
    maintenance_start_date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    units::ActiveModel {
        id: Set(Uuid::now_v7()),
        community_id: Set(community_id),
        user_id: Set(DEMO_USER_ID),
        label: Set(label.to_string()),
        flat_size: Set(flat_size),
        maintenance_start_date: Set(maintenance_start_date),
        created_at: NotSet,
    }
    .insert(db)
    .await?;
    Ok(())
}

async fn insert_expense(
    db: &DatabaseConnection,
    community_id: Uuid,
    description: &str,
    amount: i64,
    date: NaiveDate,
    status: ExpenseStatus,
) -> anyhow::Result<()> {
    expenses::ActiveModel {
        id: Set(Uuid::now_v7()),
        community_id: Set(community_id),
        description: Set(description.to_string()),
        amount: Set(Some(Decimal::new(amount, 0))),
        date: Set(date),
        status: Set(status),
        created_at: NotSet,
    }
    .insert(db)
    .await?;
    Ok(())
}
