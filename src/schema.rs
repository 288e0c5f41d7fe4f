//! Schema description handed to the SQL generator.
//!
//! The text is maintained by hand alongside database migrations; nothing
//! checks it against the live database.

use crate::error::{IntelError, Result};
use std::path::Path;
use tracing::info;

pub const BUILTIN_SCHEMA_VERSION: &str = "2024-11-podium-v3";

const VERSION_HEADER: &str = "-- schema-version:";

const BUILTIN_SCHEMA: &str = r#"DATABASE: brand-voting platform (PostgreSQL)

TABLE users
  id              INTEGER PRIMARY KEY
  fid             BIGINT UNIQUE          -- Farcaster id of the voter
  username        VARCHAR
  photo_url       VARCHAR
  points          INTEGER                -- lifetime points earned by voting
  role            VARCHAR                -- 'user' | 'admin'
  banned          BOOLEAN
  created_at      TIMESTAMPTZ
  updated_at      TIMESTAMPTZ

TABLE categories
  id              INTEGER PRIMARY KEY
  name            VARCHAR

TABLE brands
  id              INTEGER PRIMARY KEY
  name            VARCHAR
  url             VARCHAR
  warpcast_url    VARCHAR
  description     TEXT
  category_id     INTEGER REFERENCES categories(id)
  follower_count  INTEGER
  image_url       VARCHAR
  channel         VARCHAR                -- Farcaster channel of the brand
  ranking         INTEGER                -- all-time position
  score           INTEGER                -- all-time accumulated score
  score_week      INTEGER                -- score in the current weekly round
  ranking_week    INTEGER
  score_day       INTEGER                -- score in the current daily round
  banned          BOOLEAN
  created_at      TIMESTAMPTZ
  updated_at      TIMESTAMPTZ

TABLE user_brand_votes                   -- one podium per user per day
  id                VARCHAR PRIMARY KEY
  user_id           INTEGER REFERENCES users(id)
  brand1_id         INTEGER REFERENCES brands(id)   -- 1st place, 60 points
  brand2_id         INTEGER REFERENCES brands(id)   -- 2nd place, 30 points
  brand3_id         INTEGER REFERENCES brands(id)   -- 3rd place, 10 points
  date              TIMESTAMPTZ
  shared            BOOLEAN              -- podium was shared as a cast
  cast_hash         VARCHAR
  transaction_hash  VARCHAR              -- on-chain vote transaction
  block_number      BIGINT               -- may exceed 2^53
  reward_amount     NUMERIC

RELATIONSHIPS
  brands.category_id -> categories.id
  user_brand_votes.user_id -> users.id
  user_brand_votes.brand1_id / brand2_id / brand3_id -> brands.id

EXAMPLE QUERIES
  -- Weekly leaderboard
  SELECT b.name AS brand_name, b.score_week AS weekly_score
  FROM brands b WHERE b.banned = false
  ORDER BY b.score_week DESC LIMIT 10;

  -- Votes received by a brand in any podium position over the last 7 days
  SELECT b.name AS brand_name, COUNT(*) AS total_votes
  FROM user_brand_votes v
  JOIN brands b ON b.id IN (v.brand1_id, v.brand2_id, v.brand3_id)
  WHERE v.date >= NOW() - INTERVAL '7 days'
  GROUP BY b.name ORDER BY total_votes DESC LIMIT 20;

  -- Daily active voters
  SELECT TO_CHAR(DATE_TRUNC('day', v.date), 'YYYY-MM-DD') AS vote_day,
         COUNT(DISTINCT v.user_id) AS active_voters
  FROM user_brand_votes v
  GROUP BY 1 ORDER BY 1 DESC LIMIT 30;
"#;

/// Versioned text description of the queryable tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescription {
    version: String,
    text: String,
}

impl SchemaDescription {
    pub fn new(version: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            text: text.into(),
        }
    }

    /// The schema shipped with this build
    pub fn builtin() -> Self {
        Self::new(BUILTIN_SCHEMA_VERSION, BUILTIN_SCHEMA)
    }

    /// Load an override. A first line `-- schema-version: <v>` sets the
    /// version; otherwise the file name is used.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Err(IntelError::Config(format!(
                "Schema description {} is empty",
                path.display()
            )));
        }

        let version = text
            .lines()
            .next()
            .and_then(|line| line.trim().strip_prefix(VERSION_HEADER))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "custom".to_string())
            });

        info!(%version, path = %path.display(), "Loaded schema description");
        Ok(Self::new(version, text))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
