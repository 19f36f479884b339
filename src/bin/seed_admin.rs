use std::env;

use anyhow::{bail, Context, Result};
use diesel::prelude::*;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use jobboard::{
    auth::password,
    config::AppConfig,
    db,
    enums::Role,
    models::{NewUser, User},
    schema::users,
    validation,
};

const DEFAULT_ADMIN_PHONE: &str = "0000000000";
const DEFAULT_ADMIN_NAME: &str = "Administrator";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "seed_admin",
        database_url = %config.redacted_database_url(),
        "loaded configuration"
    );

    let email = env::var("ADMIN_EMAIL").context("ADMIN_EMAIL must be set")?;
    let email = validation::normalize_email(&email).map_err(|err| anyhow::anyhow!("{err}"))?;
    let admin_password = env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set")?;
    validation::validate_password(&admin_password).map_err(|err| anyhow::anyhow!("{err}"))?;
    let phone_number = admin_phone(env::var("ADMIN_PHONE").ok())?;
    let full_name = env::var("ADMIN_NAME").unwrap_or_else(|_| DEFAULT_ADMIN_NAME.to_string());

    let pool = db::init_pool(&config.database_url, 1)?;
    db::run_migrations(&pool)?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let existing: Option<User> = users::table
        .filter(users::email.eq(&email))
        .first(&mut conn)
        .optional()
        .context("failed to look up admin account")?;

    if let Some(user) = existing {
        if user.role != Role::Admin {
            bail!("{email} already belongs to a {} account", user.role);
        }
        println!("Admin {email} already exists.");
        return Ok(());
    }

    let phone_owner: Option<User> = users::table
        .filter(users::phone_number.eq(&phone_number))
        .first(&mut conn)
        .optional()
        .context("failed to look up admin phone number")?;
    if let Some(owner) = phone_owner {
        bail!(
            "phone number {phone_number} is already registered to {}; set ADMIN_PHONE to another number",
            owner.email
        );
    }

    let admin = NewUser {
        id: Uuid::new_v4(),
        full_name,
        email: email.clone(),
        phone_number,
        password_hash: password::hash_password(&admin_password)?,
        role: Role::Admin,
    };
    diesel::insert_into(users::table)
        .values(&admin)
        .execute(&mut conn)
        .context("failed to insert admin account")?;

    tracing::info!(user_id = %admin.id, "admin account created");
    println!("Created admin {email}.");
    Ok(())
}

/// `ADMIN_PHONE` under the same rules as registration, defaulting when unset.
fn admin_phone(raw: Option<String>) -> Result<String> {
    let raw = raw.unwrap_or_else(|| DEFAULT_ADMIN_PHONE.to_string());
    validation::normalize_phone(&raw).map_err(|err| anyhow::anyhow!("ADMIN_PHONE: {err}"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
