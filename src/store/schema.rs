//! Database schema and migrations for the SQLite store.
//!
//! Migrations are applied in order when the database is opened. The
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: folders and file metadata
    r#"
CREATE TABLE folders (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    parent_id   TEXT,                    -- NULL for top-level folders
    owner_id    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX idx_folders_owner_parent ON folders(owner_id, parent_id);

CREATE TABLE files (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    size          INTEGER NOT NULL DEFAULT 0,
    media_type    TEXT,
    storage_path  TEXT,
    folder_id     TEXT,                  -- NULL for files at the root
    owner_id      TEXT NOT NULL,
    starred       INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX idx_files_owner_folder ON files(owner_id, folder_id);
"#,
];
