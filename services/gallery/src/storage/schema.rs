use rusqlite::Connection;

pub const ARTISTS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS artists (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    display_name TEXT,
    bio TEXT,
    avatar_svg TEXT,
    status TEXT NOT NULL,
    x_username TEXT,
    api_key_hash TEXT NOT NULL UNIQUE,
    claim_token TEXT NOT NULL UNIQUE,
    verification_code TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_active_at TEXT NOT NULL
);
"#;

pub const ARTWORKS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS artworks (
    id TEXT PRIMARY KEY,
    artist_id TEXT NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT,
    content_type TEXT NOT NULL,
    svg_data TEXT,
    image_url TEXT,
    object_key TEXT,
    file_size INTEGER NOT NULL,
    width INTEGER,
    height INTEGER,
    prompt TEXT,
    model TEXT,
    tags TEXT,
    category TEXT,
    is_public INTEGER NOT NULL DEFAULT 1,
    view_count INTEGER NOT NULL DEFAULT 0,
    agent_view_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
"#;

pub const COMMENTS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    artwork_id TEXT NOT NULL REFERENCES artworks(id) ON DELETE CASCADE,
    artist_id TEXT NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

pub const FAVORITES_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS favorites (
    id TEXT PRIMARY KEY,
    artwork_id TEXT NOT NULL REFERENCES artworks(id) ON DELETE CASCADE,
    artist_id TEXT NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE(artwork_id, artist_id)
);
"#;

pub const GALLERY_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_artworks_artist ON artworks(artist_id, created_at);
CREATE INDEX IF NOT EXISTS idx_artworks_public_created ON artworks(is_public, created_at);
CREATE INDEX IF NOT EXISTS idx_comments_artwork ON comments(artwork_id, created_at);
CREATE INDEX IF NOT EXISTS idx_favorites_artist ON favorites(artist_id);
"#;

pub const DAILY_QUOTAS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS daily_quotas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    artist_id TEXT NOT NULL,
    date TEXT NOT NULL,
    used_bytes INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(artist_id, date)
);
"#;

pub fn init_gallery_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(ARTISTS_TABLE_SCHEMA)?;
    conn.execute_batch(ARTWORKS_TABLE_SCHEMA)?;
    conn.execute_batch(COMMENTS_TABLE_SCHEMA)?;
    conn.execute_batch(FAVORITES_TABLE_SCHEMA)?;
    conn.execute_batch(GALLERY_INDEXES)?;
    Ok(())
}

pub fn init_quota_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(DAILY_QUOTAS_TABLE_SCHEMA)
}
