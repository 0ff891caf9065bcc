//! SQL DDL for initializing the database schema.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema includes:
/// - `pwa` table (one row per manifest URL)
/// - `lighthouse_report` table (append-only audit history per PWA)
/// - `favorite_pwa` table (one (user_id, pwa_id) per row)
/// - `task` table (pending re-validation, at most one per PWA)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Listed apps
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS pwa (
    id INTEGER PRIMARY KEY NOT NULL,
    manifest_url TEXT NOT NULL UNIQUE,
    start_url TEXT NOT NULL,
    name TEXT NULL,
    short_name TEXT NULL,
    description TEXT NULL,
    background_color TEXT NULL,
    theme_color TEXT NULL,
    icon_url TEXT NULL,
    manifest_json TEXT NOT NULL,
    lighthouse_score INTEGER NULL,
    user_id TEXT NOT NULL,
    user_email TEXT NULL,
    visible INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_pwa_visible_created ON pwa(visible, created_at);
CREATE INDEX IF NOT EXISTS idx_pwa_visible_updated ON pwa(visible, updated_at);
CREATE INDEX IF NOT EXISTS idx_pwa_visible_score ON pwa(visible, lighthouse_score);

-- ---------------------------------------------------------------------------
-- Lighthouse audit history
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS lighthouse_report (
    id INTEGER PRIMARY KEY NOT NULL,
    pwa_id INTEGER NOT NULL REFERENCES pwa(id) ON DELETE CASCADE,
    score INTEGER NOT NULL,
    report_json TEXT NOT NULL,
    created_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_lighthouse_report_pwa ON lighthouse_report(pwa_id, created_at);

-- ---------------------------------------------------------------------------
-- Favorites (one (user_id, pwa_id) per row)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS favorite_pwa (
    user_id TEXT NOT NULL,
    pwa_id INTEGER NOT NULL REFERENCES pwa(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL, -- RFC3339
    PRIMARY KEY(user_id, pwa_id)
);

-- ---------------------------------------------------------------------------
-- Re-validation queue (at most one pending task per PWA)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS task (
    id INTEGER PRIMARY KEY NOT NULL,
    pwa_id INTEGER NOT NULL UNIQUE REFERENCES pwa(id) ON DELETE CASCADE,
    attempts INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_task_created ON task(created_at);
"#;
