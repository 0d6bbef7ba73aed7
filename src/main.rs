//! Createathon CLI - a thin command-line front end over the core
//! library, for exercising the client against a running server.
//!
//! Commands: login, me, challenges, leaderboard, stats, logout.

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use createathon_core::api::ApiClient;
use createathon_core::auth::{CredentialStore, SessionController};
use createathon_core::config::Config;
use createathon_core::models::{ChallengeFilter, LoginRequest, Timeframe};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("Createathon CLI starting");

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("me");

    let mut config = Config::load()?;
    let store = CredentialStore::open(Config::storage_dir()?);
    let api = ApiClient::new(config.base_url(), store.clone())?;
    let mut session = SessionController::new(api, store);

    session.initialize().await;

    match command {
        "login" => {
            let username = prompt_username(config.last_username.as_deref())?;
            let password = rpassword::prompt_password("Password: ")?;

            let credentials = LoginRequest {
                username: username.clone(),
                password,
            };
            let user = session
                .login(&credentials)
                .await
                .context("Login failed")?;
            println!("Logged in as {} ({} points)", user.display_label(), user.total_points);

            config.last_username = Some(username);
            config.save()?;
        }
        "logout" => {
            session.logout();
            println!("Logged out");
        }
        "me" => {
            let user = session
                .user()
                .context("Not logged in. Run: createathon login")?;
            println!("{} <{}>", user.display_label(), user.email.as_deref().unwrap_or("-"));
            println!("Points: {}", user.total_points);
            if let Some(completed) = user.completed_challenges {
                println!("Completed challenges: {}", completed);
            }
            for category in &user.category_progress {
                println!(
                    "  {}: {}/{} ({}%)",
                    category.name,
                    category.completed,
                    category.total,
                    category.percent_complete()
                );
            }
        }
        "challenges" => {
            let challenges = session
                .api()
                .fetch_challenges(&ChallengeFilter::default())
                .await
                .context("Failed to fetch challenges")?;
            for challenge in &challenges {
                println!(
                    "#{:<4} [{}] {} ({} pts, {})",
                    challenge.id,
                    challenge.difficulty.map(|d| d.as_str()).unwrap_or("-"),
                    challenge.title,
                    challenge.points,
                    challenge.category_name(),
                );
            }
            println!("{} challenges", challenges.len());
        }
        "leaderboard" => {
            let timeframe = match args.get(2).map(String::as_str) {
                Some("week") => Timeframe::Week,
                Some("month") => Timeframe::Month,
                _ => Timeframe::All,
            };
            let leaders = session
                .api()
                .fetch_leaderboard(timeframe)
                .await
                .context("Failed to fetch leaderboard")?;
            for (rank, user) in leaders.iter().enumerate() {
                println!(
                    "{:>2}. {} - {} pts",
                    rank + 1,
                    user.display_label(),
                    user.calculated_points.unwrap_or(user.total_points),
                );
            }
        }
        "stats" => {
            let stats = session
                .api()
                .fetch_stats()
                .await
                .context("Failed to fetch stats")?;
            println!("Total points: {}", stats.total_points);
            println!("Completed: {}", stats.completed_challenges);
            println!("In progress: {}", stats.in_progress_challenges);
            for category in &stats.category_progress {
                println!(
                    "  {}: {}/{}",
                    category.name, category.completed_challenges, category.total_challenges
                );
            }
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Usage: createathon [login|logout|me|challenges|leaderboard|stats]");
            std::process::exit(2);
        }
    }

    Ok(())
}

fn prompt_username(last_username: Option<&str>) -> Result<String> {
    match last_username {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.is_empty() {
        last_username
            .map(str::to_string)
            .context("Username required")
    } else {
        Ok(input.to_string())
    }
}
