use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    auth::repo::UserRepo, bookings::repo::BookingRepo, catalog::repo::CatalogRepo,
    notifications::repo::NotificationRepo, payments::repo::PaymentRepo,
    reviews::repo::ReviewRepo, settings::repo::SettingsRepo,
};

#[cfg(test)]
pub mod memory;

/// Everything the services need from persistence, as one object.
pub trait Store:
    UserRepo + CatalogRepo + BookingRepo + PaymentRepo + NotificationRepo + ReviewRepo + SettingsRepo
{
}

impl<T> Store for T where
    T: UserRepo
        + CatalogRepo
        + BookingRepo
        + PaymentRepo
        + NotificationRepo
        + ReviewRepo
        + SettingsRepo
{
}

/// PostgreSQL-backed store. Each domain's `repo.rs` implements its trait for it.
#[derive(Clone)]
pub struct PgStore {
    pub db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }
}

/// Text column held a value no enum variant maps to.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Maps a fieldless enum to and from its TEXT column representation.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::store::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::store::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::store::UnknownVariant;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }
    };
}

pub(crate) use text_enum;
