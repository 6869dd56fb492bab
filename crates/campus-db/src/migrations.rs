use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (portal schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE sectors (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                description TEXT,
                color       TEXT NOT NULL DEFAULT '#3B82F6',
                icon        TEXT,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE offers (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                type            TEXT NOT NULL CHECK (type IN ('stage', 'job', 'logement')),
                location        TEXT NOT NULL,
                description     TEXT NOT NULL DEFAULT '',
                company_name    TEXT,
                contract_type   TEXT,
                duration        TEXT,
                salary_range    TEXT,
                rent_price      INTEGER,
                housing_type    TEXT,
                surface_area    INTEGER,
                furnished       INTEGER,
                requirements    TEXT,
                contact_email   TEXT,
                contact_phone   TEXT,
                deadline        TEXT,
                sector_id       TEXT REFERENCES sectors(id),
                is_active       INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_offers_listing ON offers(type, is_active, created_at);

            CREATE TABLE events (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                type        TEXT NOT NULL CHECK (type IN ('salon', 'jpo', 'conference', 'atelier')),
                location    TEXT,
                description TEXT,
                organizer   TEXT,
                date_start  TEXT NOT NULL,
                date_end    TEXT,
                website_url TEXT,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_events_listing ON events(type, date_start);

            CREATE TABLE careers (
                id                  TEXT PRIMARY KEY,
                title               TEXT NOT NULL,
                description         TEXT,
                sector_id           TEXT REFERENCES sectors(id),
                salary_range        TEXT,
                prospects           TEXT,
                required_education  TEXT,
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE formations (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                level       TEXT NOT NULL,
                university  TEXT,
                location    TEXT,
                duration    TEXT,
                cost        INTEGER,
                description TEXT,
                sector_id   TEXT REFERENCES sectors(id),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE student_clubs (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                description     TEXT,
                campus          TEXT NOT NULL,
                type            TEXT NOT NULL,
                president       TEXT,
                email_contact   TEXT,
                is_active       INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE favorites (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                item_type   TEXT NOT NULL,
                item_id     TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                UNIQUE(user_id, item_type, item_id)
            );

            CREATE INDEX idx_favorites_user ON favorites(user_id, created_at);

            -- Leaving a club flips is_active; the row is kept for rejoining.
            CREATE TABLE club_memberships (
                id          TEXT PRIMARY KEY,
                club_id     TEXT NOT NULL REFERENCES student_clubs(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                joined_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                is_active   INTEGER NOT NULL DEFAULT 1,
                UNIQUE(club_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
