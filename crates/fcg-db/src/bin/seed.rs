//! # Seed Data Generator
//!
//! Populates a development database with a published catalog.
//!
//! ## Usage
//! ```bash
//! # 30 games (default)
//! cargo run -p fcg-db --bin seed
//!
//! # Custom amount and database
//! cargo run -p fcg-db --bin seed -- --db ./fcg_dev.db --count 60
//! ```
//!
//! ## Generated Games
//! Titles are built from a word list per game type, so every type gets
//! games. Each game is:
//! - Published and active (visible in the public catalog)
//! - Priced between R$ 9.90 and R$ 199.89; every tenth game is free

use chrono::Utc;
use std::env;

use fcg_core::{Game, GameType, Money};
use fcg_db::{Database, DbConfig};

/// Title stems per game type.
const TITLES: &[(GameType, &[&str])] = &[
    (GameType::Action, &["Steel Fury", "Neon Strike", "Iron Gauntlet"]),
    (GameType::Adventure, &["Lost Harbor", "Sunken Keys", "Far Meridian"]),
    (GameType::Rpg, &["Ashen Crown", "Runebound", "Tales of Orun"]),
    (GameType::Strategy, &["Dominion Rise", "Hex Empires", "Cold Front"]),
    (GameType::Simulation, &["Harvest Lane", "Sky Port", "City Pulse"]),
    (GameType::Sports, &["Final Whistle", "Court Kings", "Open Water"]),
    (GameType::Racing, &["Drift Line", "Apex Run", "Night Circuit"]),
    (GameType::Puzzle, &["Tessellate", "Light Paths", "Quiet Blocks"]),
    (GameType::Shooter, &["Zero Hour", "Breach Point", "Red Sector"]),
    (GameType::Casual, &["Pocket Garden", "Bubble Pop", "Tiny Towns"]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 30;
    let mut db_path = String::from("./fcg_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(30);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("FCG Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of games to generate (default: 30)");
                println!("  -d, --db <PATH>    Database file path (default: ./fcg_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("FCG Seed Data Generator");
    println!("=======================");
    println!("Database: {}", db_path);
    println!("Games:    {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.games().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} games", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    for seed in 0..count {
        let game = generate_game(seed)?;

        if let Err(e) = db.games().insert(&game).await {
            eprintln!("Failed to insert {}: {}", game.name(), e);
            continue;
        }
        generated += 1;
    }

    println!();
    println!("✓ Generated {} games in {:?}", generated, start.elapsed());
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds the `seed`-th game: unique name, deterministic price.
fn generate_game(seed: usize) -> Result<Game, fcg_core::CoreError> {
    let (game_type, stems) = TITLES[seed % TITLES.len()];
    let round = seed / TITLES.len();
    let stem = stems[round % stems.len()];

    // Sequels keep names unique once the stems run out
    let name = match round / stems.len() {
        0 => stem.to_string(),
        n => format!("{} {}", stem, n + 1),
    };

    let price_cents = if seed % 10 == 9 {
        0
    } else {
        990 + ((seed * 1_337) % 19_000) as i64
    };

    let mut game = Game::register(
        &name,
        &format!("A {} game.", game_type),
        Money::from_cents(price_cents),
        game_type,
        false,
        Utc::now(),
    )?;
    game.publish()?;
    Ok(game)
}
