//! Domain entities (§3 Data Model).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Storage uses the `ROLE_` prefix; the external API never does.
    pub fn storage_name(self) -> &'static str {
        match self {
            Self::User => "ROLE_USER",
            Self::Admin => "ROLE_ADMIN",
        }
    }

    pub fn external_name(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    pub fn from_storage_name(raw: &str) -> Option<Self> {
        match raw {
            "ROLE_USER" => Some(Self::User),
            "ROLE_ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub enabled: bool,
}

impl Principal {
    pub fn role(&self) -> Role {
        Role::from_storage_name(&self.role).unwrap_or(Role::User)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalPublic {
    pub username: String,
    pub roles: Vec<String>,
}

impl From<&Principal> for PrincipalPublic {
    fn from(p: &Principal) -> Self {
        Self {
            username: p.username.clone(),
            roles: vec![p.role().external_name().to_string()],
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Archetype {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    #[sqlx(rename = "card_type")]
    #[serde(rename = "humanReadableCardType")]
    pub human_readable_card_type: String,
    pub description: Option<String>,
    pub race: Option<String>,
    pub attribute: Option<String>,
    pub archetype_id: Option<Uuid>,
    #[serde(rename = "archetypeName")]
    #[sqlx(default)]
    pub archetype_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Deck {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    pub cards: Vec<String>,
}

impl Deck {
    pub const MAX_SIZE: usize = 60;
    pub const MAX_COPIES: usize = 3;

    pub fn copies_of(&self, card_name: &str) -> usize {
        self.cards.iter().filter(|c| c.as_str() == card_name).count()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub principal_ref: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Revoked,
    Expired,
}

impl RefreshToken {
    pub fn state(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked {
            RefreshTokenState::Revoked
        } else if now > self.expires_at {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }
}
