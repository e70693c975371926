use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Closed enums stored as snake_case TEXT columns and parsed from request strings.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(rename_all = "snake_case")]
        #[sqlx(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Caller role carried in the access token
    Role {
        Admin => "admin",
        Referee => "referee",
        Delegate => "delegate",
    }
);

text_enum!(TournamentStatus {
    Active => "active",
    Inactive => "inactive",
});

text_enum!(LevelKind {
    Group => "group",
    Playoff => "playoff",
});

text_enum!(LevelStatus {
    Active => "active",
    Finalized => "finalized",
});

text_enum!(
    /// Lifecycle of a match: pending -> scheduled -> in_progress -> finalized
    MatchStatus {
        Pending => "pending",
        Scheduled => "scheduled",
        InProgress => "in_progress",
        Finalized => "finalized",
    }
);

text_enum!(
    /// One side of a match. Side A is the nominal home team.
    Side {
        A => "a",
        B => "b",
    }
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemifinalSlot {
    First,
    Second,
}

/// Role of a match inside its level.
///
/// Only the structured variants drive bracket progression; any other label is
/// kept verbatim as `Manual` and ignored by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    #[default]
    Group,
    Semifinal(SemifinalSlot),
    Final,
    Manual(String),
}

impl Stage {
    /// Parses a free-text label after trimming and lower-casing it.
    pub fn parse(label: &str) -> Self {
        let normalized = label.trim().to_lowercase();
        match normalized.as_str() {
            "" => Stage::Group,
            "semifinal 1" => Stage::Semifinal(SemifinalSlot::First),
            "semifinal 2" => Stage::Semifinal(SemifinalSlot::Second),
            "final" => Stage::Final,
            _ => Stage::Manual(normalized),
        }
    }

    /// Storage form; `None` for the group stage.
    pub fn label(&self) -> Option<&str> {
        match self {
            Stage::Group => None,
            Stage::Semifinal(SemifinalSlot::First) => Some("semifinal 1"),
            Stage::Semifinal(SemifinalSlot::Second) => Some("semifinal 2"),
            Stage::Final => Some("final"),
            Stage::Manual(label) => Some(label),
        }
    }

    pub fn is_semifinal(&self) -> bool {
        matches!(self, Stage::Semifinal(_))
    }
}

impl From<Option<String>> for Stage {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map(Stage::parse).unwrap_or_default()
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.label() {
            Some(label) => serializer.serialize_str(label),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tournament {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: TournamentStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Level {
    pub id: i64,
    pub tournament_id: i64,
    pub parent_level_id: Option<i64>,
    pub name: String,
    pub category: String,
    pub kind: LevelKind,
    pub status: LevelStatus,
    pub champion_team_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub venue_id: Option<i64>,
    pub level_id: Option<i64>,
    pub category: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Match {
    pub id: i64,
    pub tournament_id: i64,
    pub level_id: i64,
    pub team_a_id: i64,
    pub team_b_id: i64,
    #[sqlx(try_from = "Option<String>")]
    pub stage: Stage,
    pub match_date: Option<String>,
    pub match_time: Option<String>,
    pub venue_id: Option<i64>,
    pub referee_id: Option<i64>,
    pub status: MatchStatus,
    pub sets_a: i64,
    pub sets_b: i64,
    pub is_walkover: bool,
    pub match_number: i64,
    pub created_at: String,
}

impl Match {
    pub fn team(&self, side: Side) -> i64 {
        match side {
            Side::A => self.team_a_id,
            Side::B => self.team_b_id,
        }
    }

    /// Side with more set wins on the match header, if any.
    pub fn leading_side(&self) -> Option<Side> {
        match self.sets_a.cmp(&self.sets_b) {
            std::cmp::Ordering::Greater => Some(Side::A),
            std::cmp::Ordering::Less => Some(Side::B),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Winning team of a finalized match.
    pub fn winner(&self) -> Option<i64> {
        if self.status != MatchStatus::Finalized {
            return None;
        }
        self.leading_side().map(|side| self.team(side))
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MatchSet {
    pub id: i64,
    pub match_id: i64,
    pub set_number: i64,
    pub points_a: i64,
    pub points_b: i64,
    pub winner: Option<Side>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TeamLevelStats {
    pub id: i64,
    pub team_id: i64,
    pub level_id: i64,
    pub played: i64,
    pub won: i64,
    pub lost: i64,
    pub sets_won: i64,
    pub sets_lost: i64,
    pub points_for: i64,
    pub points_against: i64,
    pub table_points: i64,
}
