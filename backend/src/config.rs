use anyhow::{bail, Context};
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub bootstrap_admin: Option<AdminSeed>,
}

/// Credentials for the administrator account created on first start
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let is_production = env::var("LEAGUE_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => {
                if is_production && secret.len() < 32 {
                    bail!("JWT_SECRET must be at least 32 characters in production");
                }
                secret
            }
            Err(_) => {
                if is_production {
                    bail!("JWT_SECRET environment variable must be set in production");
                }
                tracing::warn!("Using default JWT secret. Set JWT_SECRET in production!");
                "development_secret_key_change_in_production".to_string()
            }
        };

        let bootstrap_admin = match (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(AdminSeed { username, password }),
            _ if is_production => None,
            _ => {
                tracing::warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set; seeding admin/Admin12345");
                Some(AdminSeed {
                    username: "admin".to_string(),
                    password: "Admin12345".to_string(),
                })
            }
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:league.db".to_string()),
            jwt_secret,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a number")?,
            token_ttl_hours: env::var("TOKEN_TTL_HOURS")
                .unwrap_or_else(|_| "12".to_string())
                .parse()
                .context("TOKEN_TTL_HOURS must be a number")?,
            bcrypt_cost: env::var("BCRYPT_COST")
                .map(|v| v.parse())
                .unwrap_or(Ok(bcrypt::DEFAULT_COST))
                .context("BCRYPT_COST must be a number")?,
            bootstrap_admin,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
