//! Database schema and migrations for Folio.
//!
//! Migrations are applied in order; the `schema_version` table records which
//! ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: folders
    r#"
CREATE TABLE folders (
    id                          TEXT PRIMARY KEY NOT NULL,
    created_at                  TEXT NOT NULL,
    updated_at                  TEXT NOT NULL,
    name                        TEXT NOT NULL CHECK (length(trim(name)) > 0),
    description                 TEXT,
    parent_id                   TEXT REFERENCES folders(id) ON DELETE CASCADE,
    path                        TEXT NOT NULL,
    level                       INTEGER NOT NULL DEFAULT 0 CHECK (level >= 0),
    status                      TEXT NOT NULL DEFAULT 'active'
                                CHECK (status IN ('active', 'archived', 'deleted')),
    folder_type                 TEXT NOT NULL DEFAULT 'regular'
                                CHECK (folder_type IN ('regular', 'system', 'shared', 'favorite')),
    visibility                  TEXT NOT NULL DEFAULT 'private'
                                CHECK (visibility IN ('private', 'shared', 'public')),
    color_hex                   TEXT,
    color_name                  TEXT,
    icon                        TEXT,
    view_settings_sort_by       TEXT NOT NULL DEFAULT 'name',
    view_settings_sort_order    TEXT NOT NULL DEFAULT 'asc',
    view_settings_view_mode     TEXT NOT NULL DEFAULT 'list',
    view_settings_show_hidden   INTEGER NOT NULL DEFAULT 0,
    last_accessed_at            TEXT,
    archived_at                 TEXT,
    is_favorite                 INTEGER NOT NULL DEFAULT 0,
    is_protected                INTEGER NOT NULL DEFAULT 0,
    is_system_folder            INTEGER NOT NULL DEFAULT 0
);

-- Soft-deleted rows keep their path, so uniqueness only applies to live rows
CREATE UNIQUE INDEX idx_folders_path_live ON folders(path) WHERE status <> 'deleted';
CREATE INDEX idx_folders_parent_id ON folders(parent_id);
CREATE INDEX idx_folders_status ON folders(status);
"#,
    // v2: files
    r#"
CREATE TABLE files (
    id                          TEXT PRIMARY KEY NOT NULL,
    created_at                  TEXT NOT NULL,
    updated_at                  TEXT NOT NULL,
    name                        TEXT NOT NULL CHECK (length(trim(name)) > 0),
    original_name               TEXT NOT NULL,
    extension                   TEXT NOT NULL DEFAULT '',
    category                    TEXT NOT NULL DEFAULT 'other',
    description                 TEXT,
    folder_id                   TEXT REFERENCES folders(id) ON DELETE CASCADE,
    path                        TEXT NOT NULL,
    status                      TEXT NOT NULL DEFAULT 'active'
                                CHECK (status IN ('active', 'archived', 'deleted', 'processing')),
    visibility                  TEXT NOT NULL DEFAULT 'private'
                                CHECK (visibility IN ('private', 'shared', 'public')),
    metadata_size               INTEGER NOT NULL DEFAULT 0 CHECK (metadata_size >= 0),
    metadata_mime_type          TEXT,
    metadata_checksum           TEXT,
    metadata_image_width        INTEGER,
    metadata_image_height       INTEGER,
    metadata_video_width        INTEGER,
    metadata_video_height       INTEGER,
    metadata_video_duration     REAL,
    metadata_audio_duration     REAL,
    metadata_audio_bitrate      INTEGER,
    metadata_audio_sample_rate  INTEGER,
    color_hex                   TEXT,
    color_name                  TEXT,
    last_accessed_at            TEXT,
    archived_at                 TEXT,
    storage_url                 TEXT,
    thumbnail_url               TEXT
);

CREATE UNIQUE INDEX idx_files_path_live ON files(path) WHERE status <> 'deleted';
CREATE INDEX idx_files_folder_id ON files(folder_id);
CREATE INDEX idx_files_extension ON files(extension);
CREATE INDEX idx_files_category ON files(category);
"#,
    // v3: tags
    r#"
CREATE TABLE tags (
    id              TEXT PRIMARY KEY NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    name            TEXT NOT NULL CHECK (length(trim(name)) > 0),
    description     TEXT,
    tag_type        TEXT NOT NULL DEFAULT 'user'
                    CHECK (tag_type IN ('system', 'user', 'automatic')),
    priority        TEXT NOT NULL DEFAULT 'normal'
                    CHECK (priority IN ('low', 'normal', 'high', 'critical')),
    is_active       INTEGER NOT NULL DEFAULT 1,
    color_hex       TEXT NOT NULL,
    color_name      TEXT,
    usage_count     INTEGER NOT NULL DEFAULT 0 CHECK (usage_count >= 0),
    last_used_at    TEXT,
    parent_id       TEXT REFERENCES tags(id) ON DELETE SET NULL
);

-- Deactivated tags keep their name; only active names must be unique
CREATE UNIQUE INDEX idx_tags_name_active ON tags(name) WHERE is_active = 1;
CREATE INDEX idx_tags_parent_id ON tags(parent_id);
CREATE INDEX idx_tags_is_active ON tags(is_active);
"#,
    // v4: tag assignment relations
    r#"
CREATE TABLE file_tags (
    file_id     TEXT NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    tag_id      TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (file_id, tag_id)
);

CREATE TABLE folder_tags (
    folder_id   TEXT NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
    tag_id      TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (folder_id, tag_id)
);

CREATE INDEX idx_file_tags_tag_id ON file_tags(tag_id);
CREATE INDEX idx_folder_tags_tag_id ON folder_tags(tag_id);
"#,
];
