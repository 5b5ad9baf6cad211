use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub frontend_url: String,
    pub resend_api_key: Option<String>,
    pub production: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let production = std::env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);

        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) => s,
            Err(_) if production => {
                anyhow::bail!("JWT_SECRET must be set in production")
            }
            Err(_) => {
                tracing::warn!("JWT_SECRET not set, using dev fallback");
                "dev-secret".into()
            }
        };

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "workhours".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "workhours-users".into()),
            // One TTL for login and verification issuance; also the cookie Max-Age.
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")?,
            jwt,
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            production,
        })
    }
}
