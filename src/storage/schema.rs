//! Database schema definitions for Podium.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Point totals (Progress Store)
CREATE TABLE IF NOT EXISTS user_progress (
    user_id TEXT PRIMARY KEY,
    total_points INTEGER NOT NULL DEFAULT 0 CHECK (total_points >= 0),
    current_level INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT NOT NULL
);

-- Display data (Profile Store)
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY,
    display_name TEXT,
    avatar_url TEXT
);

-- One row per user
CREATE TABLE IF NOT EXISTS user_locations (
    user_id TEXT PRIMARY KEY,
    state TEXT NOT NULL,
    region TEXT NOT NULL,
    city_approximate TEXT,
    postal_prefix TEXT,
    latitude_approximate REAL,
    longitude_approximate REAL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_user_locations_region ON user_locations(region);
CREATE INDEX IF NOT EXISTS idx_user_locations_state ON user_locations(state);

-- Derived leaderboard rows, replaced wholesale on every recompute
CREATE TABLE IF NOT EXISTS rankings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    ranking_type TEXT NOT NULL CHECK (ranking_type IN ('national', 'regional', 'local')),
    region TEXT,
    position INTEGER NOT NULL CHECK (position >= 1),
    total_points INTEGER NOT NULL,
    period TEXT NOT NULL DEFAULT 'all_time',
    calculated_at TEXT NOT NULL,
    UNIQUE(user_id, ranking_type, period)
);

CREATE INDEX IF NOT EXISTS idx_rankings_partition ON rankings(ranking_type, region, period, position);
CREATE INDEX IF NOT EXISTS idx_rankings_user ON rankings(user_id);

-- Static achievement catalogue
CREATE TABLE IF NOT EXISTS regional_achievements (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    scope TEXT NOT NULL,
    requirement_type TEXT NOT NULL CHECK (requirement_type IN ('points', 'position')),
    requirement_value INTEGER NOT NULL,
    points_reward INTEGER NOT NULL DEFAULT 0,
    icon TEXT NOT NULL,
    rarity TEXT NOT NULL DEFAULT 'common',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_regional_achievements_scope ON regional_achievements(scope);

-- Write-once unlock records
CREATE TABLE IF NOT EXISTS user_regional_achievements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    achievement_id TEXT NOT NULL REFERENCES regional_achievements(id) ON DELETE CASCADE,
    unlocked_at TEXT NOT NULL,
    UNIQUE(user_id, achievement_id)
);

CREATE INDEX IF NOT EXISTS idx_user_regional_achievements_user ON user_regional_achievements(user_id);
"#;

/// Schema version table.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;
