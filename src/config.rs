use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            access_secret: std::env::var("JWT_SECRET")?,
            refresh_secret: std::env::var("JWT_REFRESH_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "authgate".into()),
            access_ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(15),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        // Access tokens must expire before their paired refresh token.
        if jwt.access_ttl_minutes >= jwt.refresh_ttl_minutes {
            anyhow::bail!(
                "access token TTL ({}m) must be shorter than refresh token TTL ({}m)",
                jwt.access_ttl_minutes,
                jwt.refresh_ttl_minutes
            );
        }
        Ok(Self { database_url, jwt })
    }
}
