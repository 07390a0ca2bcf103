mod cli;
mod error;
mod logging;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use serde_json::{Map, Value, json};
use sqlx::postgres::PgPoolOptions;

use rotauth_core::auth::claims::{ClaimSet, EMAIL_CLAIM, NAME_CLAIM};
use rotauth_core::auth::jwt::{HmacJwtHandler, JwtHandler, generate_signing_secret};
use rotauth_core::auth::renewal::{DefaultRenewalTokenGenerator, RenewalTokenGenerator};
use rotauth_core::auth::result::ActionResult;
use rotauth_core::auth::service::{
    AuthenticationService, CreateAccountRequest, LoginRequest, RefreshAttempt,
};
use rotauth_core::clock::SystemClock;
use rotauth_core::config::AuthConfig;
use rotauth_core::store::memory::MemoryStore;
use rotauth_core::store::postgres::PgStore;

use crate::cli::{Cli, Commands, DbArgs};
pub use crate::error::{Error, Result};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let _logger = logging::init()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("rotauth {}", rotauth_core::version());
        }
        Commands::Secret => {
            println!("{}", generate_signing_secret());
        }
        Commands::Issue { email, name } => {
            let jwt = jwt_handler(&AuthConfig::from_env()?);
            let claims = ClaimSet::new()
                .with(EMAIL_CLAIM, email)
                .with(NAME_CLAIM, name);
            println!("{}", jwt.generate(claims)?);
        }
        Commands::Inspect { token } => {
            let jwt = jwt_handler(&AuthConfig::from_env()?);
            let claims = jwt.validate_expired(&token)?;
            let object: Map<String, Value> = claims
                .iter()
                .map(|c| (c.kind.clone(), Value::String(c.value.clone())))
                .collect();
            println!("{}", serde_json::to_string_pretty(&object)?);
        }
        Commands::Renewal => {
            let config = AuthConfig::from_env()?;
            let generator = DefaultRenewalTokenGenerator::from_config(&config, Arc::new(SystemClock));
            let token = generator.generate();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "token": token.token,
                    "expiration": token.expiration,
                }))?
            );
        }
        Commands::Demo => demo().await?,
        Commands::Migrate { db } => {
            let pool = connect(&db).await?;
            rotauth_core::migrate::migrate(&pool).await?;
            info!("Migrations applied");
        }
        Commands::Register {
            db,
            user_name,
            email,
            first_name,
            last_name,
            password,
        } => {
            let service = pg_service(&db).await?;
            let request = CreateAccountRequest {
                user_name,
                email,
                first_name,
                last_name,
                password,
            };
            print_result(&service.register(&request).await?)?;
        }
        Commands::Login {
            db,
            email,
            password,
        } => {
            let service = pg_service(&db).await?;
            print_result(&service.login(&LoginRequest { email, password }).await?)?;
        }
        Commands::Refresh {
            db,
            jwt,
            renewal_token,
        } => {
            let service = pg_service(&db).await?;
            let attempt = RefreshAttempt { jwt, renewal_token };
            print_result(&service.refresh(&attempt).await?)?;
        }
    }

    Ok(())
}

fn jwt_handler(config: &AuthConfig) -> HmacJwtHandler {
    HmacJwtHandler::from_config(config, Arc::new(SystemClock))
}

fn print_result(result: &ActionResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

async fn connect(db: &DbArgs) -> Result<sqlx::PgPool> {
    info!("Connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&db.database_url)
        .await?;
    Ok(pool)
}

async fn pg_service(db: &DbArgs) -> Result<AuthenticationService> {
    let config = AuthConfig::from_env()?;
    let pool = connect(db).await?;
    rotauth_core::migrate::migrate(&pool).await?;
    Ok(AuthenticationService::with_store(
        Arc::new(PgStore::new(pool)),
        &config,
        Arc::new(SystemClock),
    ))
}

/// Register, log in, refresh, then replay the consumed renewal token against
/// an in-memory store with a throwaway secret.
async fn demo() -> Result<()> {
    let config = AuthConfig::new(generate_signing_secret());
    let service = AuthenticationService::with_store(
        Arc::new(MemoryStore::new()),
        &config,
        Arc::new(SystemClock),
    );

    let registered = service
        .register(&CreateAccountRequest {
            user_name: "jdoe".into(),
            email: "jane@example.com".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            password: "Passw0rd".into(),
        })
        .await?;
    println!("register:");
    print_result(&registered)?;

    let logged_in = service
        .login(&LoginRequest {
            email: "jane@example.com".into(),
            password: "Passw0rd".into(),
        })
        .await?;
    println!("login:");
    print_result(&logged_in)?;

    let (jwt, renewal_token) = logged_in
        .into_tokens()
        .ok_or_else(|| Error::Custom("login did not issue tokens".into()))?;
    let attempt = RefreshAttempt { jwt, renewal_token };

    println!("refresh:");
    print_result(&service.refresh(&attempt).await?)?;

    println!("replayed refresh:");
    print_result(&service.refresh(&attempt).await?)?;

    Ok(())
}
