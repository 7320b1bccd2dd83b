// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::{anyhow, Result};
use cadence_domain::{sortname, AlbumId, ArtistId, Candidate, EntityKind, TrackId};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use tracing::debug;

use crate::fuzzy;
use crate::repositories::{AlbumRow, CatalogStore, FileFilter, FileRow, NewCatalogFile};

const FILE_SELECT: &str = r#"
    SELECT
        file.url AS url,
        file.mtime AS mtime,
        file.size AS size,
        file.md5 AS md5,
        file.mimetype AS mimetype,
        file.duration AS duration,
        file.bitrate AS bitrate,
        artist.id AS artist_id,
        artist.name AS artist_name,
        album.id AS album_id,
        album.name AS album_name,
        track.id AS track_id,
        track.name AS track_name,
        composer.id AS composer_id,
        composer.name AS composer_name,
        file_join.discnumber AS disc_number,
        file_join.albumpos AS album_position,
        file.source AS source_id
    FROM file
    JOIN file_join ON file.id = file_join.file
    JOIN artist ON artist.id = file_join.artist
    JOIN track ON track.id = file_join.track
    LEFT JOIN album ON album.id = file_join.album
    LEFT JOIN artist AS composer ON composer.id = file_join.composer
"#;

/// SQLx-backed catalog store
pub struct SqliteCatalogStore {
    pool: SqlitePool,
    min_score: f32,
}

impl SqliteCatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            min_score: 0.5,
        }
    }

    /// Candidates scoring below `min_score` are left out of search results.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score.clamp(0.0, 1.0);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn track_id(
        &self,
        artist: ArtistId,
        name: &str,
        auto_create: bool,
    ) -> Result<Option<TrackId>> {
        let key = sortname(name, false);
        if key.is_empty() {
            return Ok(None);
        }
        debug!(target: "repository", %artist, name, auto_create, "resolving track id");

        if auto_create {
            sqlx::query(
                "INSERT INTO track (artist, name, sortname) VALUES (?, ?, ?) \
                 ON CONFLICT(artist, sortname) DO NOTHING",
            )
            .bind(artist.0)
            .bind(name)
            .bind(&key)
            .execute(&self.pool)
            .await?;
        }

        let id: Option<u32> =
            sqlx::query_scalar("SELECT id FROM track WHERE artist = ? AND sortname = ?")
                .bind(artist.0)
                .bind(&key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id.map(TrackId))
    }

    /// Add a file to the catalog, creating its artist, track, album and
    /// composer rows as needed. Returns the new file id.
    pub async fn index_file(&self, file: &NewCatalogFile) -> Result<u32> {
        debug!(target: "repository", url = %file.url, source = %file.source, "indexing file");

        let artist = self
            .artist_id(&file.artist, true)
            .await?
            .ok_or_else(|| anyhow!("file {} has a blank artist name", file.url))?;
        let track = self
            .track_id(artist, &file.track, true)
            .await?
            .ok_or_else(|| anyhow!("file {} has a blank track name", file.url))?;
        let album = match file.album.as_deref() {
            Some(name) => self.album_id(artist, name, true).await?,
            None => None,
        };
        let composer = match file.composer.as_deref() {
            Some(name) => self.artist_id(name, true).await?,
            None => None,
        };
        let source = (!file.source.is_local()).then_some(file.source.0);

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO file (source, url, size, mtime, md5, mimetype, duration, bitrate)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(source)
        .bind(&file.url)
        .bind(file.size)
        .bind(file.mtime)
        .bind(file.md5.as_deref())
        .bind(file.mimetype.as_deref())
        .bind(file.duration)
        .bind(file.bitrate)
        .execute(&mut *tx)
        .await?;
        let file_id = u32::try_from(inserted.last_insert_rowid())?;

        sqlx::query(
            r#"
            INSERT INTO file_join (file, artist, track, album, albumpos, composer, discnumber)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(file_id)
        .bind(artist.0)
        .bind(track.0)
        .bind(album.map(|a| a.0))
        .bind(file.album_position)
        .bind(composer.map(|c| c.0))
        .bind(file.disc_number)
        .execute(&mut *tx)
        .await?;

        for (key, value) in &file.attributes {
            sqlx::query("DELETE FROM track_attributes WHERE id = ? AND k = ?")
                .bind(track.0)
                .bind(key)
                .execute(&mut *tx)
                .await?;
            sqlx::query("INSERT INTO track_attributes (id, k, v) VALUES (?, ?, ?)")
                .bind(track.0)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(file_id)
    }
}

#[async_trait::async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn search_table(
        &self,
        kind: EntityKind,
        text: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Candidate>> {
        let needle = sortname(text, kind == EntityKind::Artist);
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        debug!(target: "repository", %kind, needle = %needle, ?limit, "searching table");

        // Table names come from the enum, never from caller input.
        let sql = format!("SELECT id, sortname FROM {}", kind.table());
        let rows: Vec<(u32, String)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        let mut candidates: Vec<Candidate> = rows
            .into_iter()
            .filter_map(|(id, name)| {
                let score = fuzzy::similarity(&needle, &name);
                (score > 0.0 && score >= self.min_score).then(|| Candidate::new(id, score))
            })
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        if let Some(limit) = limit {
            candidates.truncate(limit);
        }

        debug!(target: "repository", %kind, found = candidates.len(), "search complete");
        Ok(candidates)
    }

    async fn files_matching(&self, filter: &FileFilter) -> Result<Vec<FileRow>> {
        debug!(target: "repository", ?filter, "fetching joined file rows");

        let mut builder = QueryBuilder::<Sqlite>::new(FILE_SELECT);
        builder.push(" WHERE ");
        match filter {
            FileFilter::ArtistsAndTracks { artists, tracks } => {
                builder.push("(");
                push_id_list(&mut builder, "file_join.artist", artists);
                builder.push(" AND ");
                push_id_list(&mut builder, "file_join.track", tracks);
                builder.push(")");
            }
            FileFilter::Tracks(tracks) => push_id_list(&mut builder, "file_join.track", tracks),
            FileFilter::Location { source, url } => {
                builder.push("COALESCE(file.source, 0) = ");
                builder.push_bind(source.0);
                builder.push(" AND file.url = ");
                builder.push_bind(url.clone());
            }
        }
        builder.push(" ORDER BY file.id");

        let rows = builder
            .build_query_as::<FileRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn track_attributes(&self, track_id: TrackId) -> Result<BTreeMap<String, String>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT k, v FROM track_attributes WHERE id = ? ORDER BY rowid")
                .bind(track_id.0)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    async fn artist_name(&self, id: ArtistId) -> Result<Option<String>> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM artist WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    async fn album_with_artist(&self, id: AlbumId) -> Result<Option<AlbumRow>> {
        let row = sqlx::query_as::<_, AlbumRow>(
            r#"
            SELECT album.name AS album_name, artist.id AS artist_id, artist.name AS artist_name
            FROM album
            JOIN artist ON artist.id = album.artist
            WHERE album.id = ?
        "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn artist_id(&self, name: &str, auto_create: bool) -> Result<Option<ArtistId>> {
        let key = sortname(name, true);
        if key.is_empty() {
            return Ok(None);
        }
        debug!(target: "repository", name, auto_create, "resolving artist id");

        if auto_create {
            sqlx::query(
                "INSERT INTO artist (name, sortname) VALUES (?, ?) ON CONFLICT(sortname) DO NOTHING",
            )
            .bind(name)
            .bind(&key)
            .execute(&self.pool)
            .await?;
        }

        let id: Option<u32> = sqlx::query_scalar("SELECT id FROM artist WHERE sortname = ?")
            .bind(&key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id.map(ArtistId))
    }

    async fn album_id(
        &self,
        artist: ArtistId,
        name: &str,
        auto_create: bool,
    ) -> Result<Option<AlbumId>> {
        let key = sortname(name, false);
        if key.is_empty() {
            return Ok(None);
        }
        debug!(target: "repository", %artist, name, auto_create, "resolving album id");

        if auto_create {
            sqlx::query(
                "INSERT INTO album (artist, name, sortname) VALUES (?, ?, ?) \
                 ON CONFLICT(artist, sortname) DO NOTHING",
            )
            .bind(artist.0)
            .bind(name)
            .bind(&key)
            .execute(&self.pool)
            .await?;
        }

        let id: Option<u32> =
            sqlx::query_scalar("SELECT id FROM album WHERE artist = ? AND sortname = ?")
                .bind(artist.0)
                .bind(&key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id.map(AlbumId))
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// `column IN (?, ?, ...)`, or a constant-false predicate for an empty set.
fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, ids: &[u32]) {
    if ids.is_empty() {
        builder.push("0");
        return;
    }
    builder.push(column);
    builder.push(" IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

// ============================================================================
// Tests
// ============================================================================
