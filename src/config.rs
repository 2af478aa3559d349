use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Environment defaults for the booking rules. A `SystemSetting` with the
/// same key wins over these at request time.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingDefaults {
    pub tax_rate_percent: f64,
    pub min_hours: i32,
    pub max_hours: i32,
    pub cancellation_hours: i64,
    pub currency: String,
}

impl Default for BookingDefaults {
    fn default() -> Self {
        Self {
            tax_rate_percent: 8.0,
            min_hours: 4,
            max_hours: 24,
            cancellation_hours: 24,
            currency: "USD".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub booking: BookingDefaults,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "careio".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "careio-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let defaults = BookingDefaults::default();
        let booking = BookingDefaults {
            tax_rate_percent: env_or("TAX_RATE", defaults.tax_rate_percent),
            min_hours: env_or("MIN_BOOKING_HOURS", defaults.min_hours),
            max_hours: env_or("MAX_BOOKING_HOURS", defaults.max_hours),
            cancellation_hours: env_or("CANCELLATION_HOURS", defaults.cancellation_hours),
            currency: std::env::var("CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or(defaults.currency),
        };
        anyhow::ensure!(
            booking.min_hours >= 1 && booking.min_hours <= booking.max_hours,
            "MIN_BOOKING_HOURS must be >= 1 and <= MAX_BOOKING_HOURS"
        );
        anyhow::ensure!(
            (0.0..=100.0).contains(&booking.tax_rate_percent),
            "TAX_RATE must be a percentage between 0 and 100"
        );

        Ok(Self {
            database_url,
            jwt,
            booking,
        })
    }
}
