//! v001 -- Initial schema creation.
//!
//! Creates the three content tables: `users`, `blogs` and `projects`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,        -- trimmed, lowercase
    password_hash TEXT NOT NULL,               -- argon2id PHC string
    title         TEXT NOT NULL DEFAULT '',
    bio           TEXT NOT NULL DEFAULT '',
    avatar        TEXT NOT NULL DEFAULT '',
    social_links  TEXT NOT NULL DEFAULT '{}',  -- JSON object
    role          TEXT NOT NULL DEFAULT 'admin',
    created_at    TEXT NOT NULL,               -- RFC-3339
    updated_at    TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Blogs
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS blogs (
    id          TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    title       TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    content     TEXT NOT NULL,                 -- markdown
    excerpt     TEXT NOT NULL DEFAULT '',
    cover_image TEXT NOT NULL DEFAULT '',
    tags        TEXT NOT NULL DEFAULT '[]',    -- JSON array
    published   INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1
    views       INTEGER NOT NULL DEFAULT 0,
    author_id   TEXT,                          -- weak ref -> users(id), no cascade
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_blogs_published_created
    ON blogs(published, created_at DESC);

-- ----------------------------------------------------------------
-- Projects
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS projects (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    title         TEXT NOT NULL,
    description   TEXT NOT NULL,
    tech_stack    TEXT NOT NULL DEFAULT '[]',  -- JSON array
    thumbnail     TEXT NOT NULL DEFAULT '',
    live_demo_url TEXT NOT NULL DEFAULT '',
    github_url    TEXT NOT NULL DEFAULT '',
    featured      INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    sort_order    INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_featured_created
    ON projects(featured, created_at DESC);

CREATE INDEX IF NOT EXISTS idx_projects_order
    ON projects(sort_order ASC, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
