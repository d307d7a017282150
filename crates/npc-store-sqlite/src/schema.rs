//! SQL schema for the npc SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id           TEXT PRIMARY KEY,
    created_at        TEXT NOT NULL,
    name              TEXT NOT NULL,
    age               INTEGER,
    pronouns          TEXT,
    interests         TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    companion_name    TEXT NOT NULL,
    companion_persona TEXT
);

CREATE TABLE IF NOT EXISTS chat_sessions (
    session_id TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    title      TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_messages (
    message_id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES chat_sessions(session_id),
    role       TEXT NOT NULL,   -- 'user' | 'assistant'
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- One check-in per user per calendar day; same-day writes replace the row.
CREATE TABLE IF NOT EXISTS daily_checkins (
    checkin_id TEXT NOT NULL,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    checked_on TEXT NOT NULL,   -- YYYY-MM-DD
    mood       TEXT NOT NULL,
    prompt     TEXT NOT NULL,
    response   TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, checked_on)
);

CREATE TABLE IF NOT EXISTS user_goals (
    goal_id      TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    title        TEXT NOT NULL,
    description  TEXT,
    completed    INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS museum_items (
    item_id    TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    title      TEXT NOT NULL,
    insight    TEXT NOT NULL,
    wing       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS worlds (
    world_id    TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL REFERENCES users(user_id),
    name        TEXT NOT NULL,
    description TEXT,
    invite_code TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS world_members (
    world_id  TEXT NOT NULL REFERENCES worlds(world_id),
    user_id   TEXT NOT NULL REFERENCES users(user_id),
    joined_at TEXT NOT NULL,
    UNIQUE (world_id, user_id)
);

CREATE TABLE IF NOT EXISTS world_elements (
    element_id  TEXT PRIMARY KEY,
    world_id    TEXT NOT NULL REFERENCES worlds(world_id),
    author_id   TEXT NOT NULL REFERENCES users(user_id),
    kind        TEXT NOT NULL,   -- 'character' | 'location' | 'lore' | ...
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- Grants are idempotent: INSERT ... ON CONFLICT DO NOTHING.
CREATE TABLE IF NOT EXISTS achievements (
    achievement_id TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL REFERENCES users(user_id),
    code           TEXT NOT NULL,
    earned_at      TEXT NOT NULL,
    UNIQUE (user_id, code)
);

CREATE TABLE IF NOT EXISTS milestones (
    milestone_id TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    label        TEXT NOT NULL,
    achieved_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS parent_connections (
    connection_id TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL REFERENCES users(user_id),
    parent_email  TEXT NOT NULL,
    token_hash    TEXT NOT NULL UNIQUE,  -- hex SHA-256; raw token never stored
    verified      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    verified_at   TEXT
);

CREATE TABLE IF NOT EXISTS parent_reports (
    report_id     TEXT PRIMARY KEY,
    connection_id TEXT NOT NULL REFERENCES parent_connections(connection_id),
    period_start  TEXT NOT NULL,  -- YYYY-MM-DD
    period_end    TEXT NOT NULL,
    summary_json  TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activity_log (
    entry_id   TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    kind       TEXT NOT NULL,
    detail     TEXT,
    created_at TEXT NOT NULL
);

-- Per-day counter; increments are ON CONFLICT upserts.
CREATE TABLE IF NOT EXISTS daily_activity (
    user_id TEXT NOT NULL REFERENCES users(user_id),
    day     TEXT NOT NULL,   -- YYYY-MM-DD
    count   INTEGER NOT NULL DEFAULT 0,
    UNIQUE (user_id, day)
);

CREATE INDEX IF NOT EXISTS chat_sessions_user_idx   ON chat_sessions(user_id);
CREATE INDEX IF NOT EXISTS chat_messages_session_idx ON chat_messages(session_id);
CREATE INDEX IF NOT EXISTS daily_checkins_user_idx  ON daily_checkins(user_id);
CREATE INDEX IF NOT EXISTS user_goals_user_idx      ON user_goals(user_id);
CREATE INDEX IF NOT EXISTS museum_items_user_idx    ON museum_items(user_id);
CREATE INDEX IF NOT EXISTS world_elements_world_idx ON world_elements(world_id);
CREATE INDEX IF NOT EXISTS world_members_user_idx   ON world_members(user_id);
CREATE INDEX IF NOT EXISTS achievements_user_idx    ON achievements(user_id);
CREATE INDEX IF NOT EXISTS milestones_user_idx      ON milestones(user_id);
CREATE INDEX IF NOT EXISTS activity_log_user_idx    ON activity_log(user_id);

PRAGMA user_version = 1;
";
