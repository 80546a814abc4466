//! SQLite storage (embedded, no external dependencies)
//!
//! One table per kind plus a `place_amenity` join table. Foreign keys are
//! enforced by SQLite and cascade on delete, so removing a parent row
//! removes its dependents and links without any walk on our side.
//!
//! The session is a single open transaction. Reads and staged writes go
//! through it, `save` commits it, `close` and `reload` roll it back. A new
//! one is opened lazily by the next operation.

use async_trait::async_trait;
use hbnb_core::{
    Amenity, Base, City, Entity, HbnbError, Kind, Place, Result, Review, State, Storage,
    Timestamp, User,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type Session = Option<Transaction<'static, Sqlite>>;

pub struct DbStorage {
    pool: SqlitePool,
    session: Mutex<Session>,
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS states (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cities (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        state_id TEXT NOT NULL REFERENCES states(id) ON DELETE CASCADE,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        email TEXT NOT NULL,
        password TEXT NOT NULL,
        first_name TEXT,
        last_name TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS places (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        city_id TEXT NOT NULL REFERENCES cities(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT,
        number_rooms INTEGER NOT NULL DEFAULT 0,
        number_bathrooms INTEGER NOT NULL DEFAULT 0,
        max_guest INTEGER NOT NULL DEFAULT 0,
        price_by_night INTEGER NOT NULL DEFAULT 0,
        latitude REAL,
        longitude REAL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        place_id TEXT NOT NULL REFERENCES places(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        text TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS amenities (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS place_amenity (
        place_id TEXT NOT NULL REFERENCES places(id) ON DELETE CASCADE,
        amenity_id TEXT NOT NULL REFERENCES amenities(id) ON DELETE CASCADE,
        PRIMARY KEY (place_id, amenity_id)
    )
    "#,
];

fn columns(kind: Kind) -> &'static str {
    match kind {
        Kind::State | Kind::Amenity => "id, created_at, updated_at, name",
        Kind::City => "id, created_at, updated_at, state_id, name",
        Kind::User => "id, created_at, updated_at, email, password, first_name, last_name",
        Kind::Place => {
            "id, created_at, updated_at, city_id, user_id, name, description, \
             number_rooms, number_bathrooms, max_guest, price_by_night, latitude, longitude"
        }
        Kind::Review => "id, created_at, updated_at, place_id, user_id, text",
    }
}

fn db_error(e: sqlx::Error) -> HbnbError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() || db.message().contains("FOREIGN KEY") {
            return HbnbError::ReferentialIntegrity(db.message().to_string());
        }
    }
    HbnbError::Database(e.to_string())
}

impl DbStorage {
    pub async fn connect(database_path: &Path) -> Result<Self> {
        info!("Opening SQLite database at: {}", database_path.display());

        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        Ok(Self {
            pool,
            session: Mutex::new(None),
        })
    }

    async fn create_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }
        Ok(())
    }

    /// The open session's connection, beginning a transaction if none is open
    async fn begin<'s>(&self, session: &'s mut Session) -> Result<&'s mut SqliteConnection> {
        if session.is_none() {
            debug!("Opening database session");
            *session = Some(self.pool.begin().await.map_err(db_error)?);
        }
        match session.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(HbnbError::Database("no open session".to_string())),
        }
    }

    async fn rollback(&self, session: &mut Session) -> Result<()> {
        if let Some(tx) = session.take() {
            debug!("Rolling back database session");
            tx.rollback().await.map_err(db_error)?;
        }
        Ok(())
    }
}

async fn select<'q, R>(
    conn: &mut SqliteConnection,
    sql: &'q str,
    binds: &[&'q str],
) -> Result<Vec<R>>
where
    R: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut query = sqlx::query_as::<_, R>(sql);
    for value in binds {
        query = query.bind(*value);
    }
    query.fetch_all(&mut *conn).await.map_err(db_error)
}

/// Load every entity of `kind` matching `clause` (a `WHERE ...` or empty)
async fn load(
    conn: &mut SqliteConnection,
    kind: Kind,
    clause: &str,
    binds: &[&str],
) -> Result<Vec<Entity>> {
    let sql = format!("SELECT {} FROM {} {}", columns(kind), kind.collection(), clause);
    let entities = match kind {
        Kind::State => select::<StateRow>(conn, &sql, binds)
            .await?
            .into_iter()
            .map(|r| Entity::State(r.into()))
            .collect(),
        Kind::City => select::<CityRow>(conn, &sql, binds)
            .await?
            .into_iter()
            .map(|r| Entity::City(r.into()))
            .collect(),
        Kind::User => select::<UserRow>(conn, &sql, binds)
            .await?
            .into_iter()
            .map(|r| Entity::User(r.into()))
            .collect(),
        Kind::Review => select::<ReviewRow>(conn, &sql, binds)
            .await?
            .into_iter()
            .map(|r| Entity::Review(r.into()))
            .collect(),
        Kind::Amenity => select::<AmenityRow>(conn, &sql, binds)
            .await?
            .into_iter()
            .map(|r| Entity::Amenity(r.into()))
            .collect(),
        Kind::Place => {
            let rows = select::<PlaceRow>(conn, &sql, binds).await?;
            let link_sql = format!(
                "SELECT place_id, amenity_id FROM place_amenity \
                 WHERE place_id IN (SELECT id FROM places {}) ORDER BY rowid",
                clause
            );
            let links = select::<LinkRow>(conn, &link_sql, binds).await?;
            let mut by_place: HashMap<String, Vec<String>> = HashMap::new();
            for link in links {
                by_place.entry(link.place_id).or_default().push(link.amenity_id);
            }
            rows.into_iter()
                .map(|r| {
                    let amenity_ids = by_place.remove(&r.id).unwrap_or_default();
                    Entity::Place(r.into_place(amenity_ids))
                })
                .collect()
        }
    };
    Ok(entities)
}

/// Insert or replace the row for `entity`, without triggering cascades
async fn upsert(conn: &mut SqliteConnection, entity: &Entity) -> Result<()> {
    let base = entity.base();
    let result = match entity {
        Entity::State(s) => {
            sqlx::query(
                r#"
                INSERT INTO states (id, created_at, updated_at, name)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at, name = excluded.name
                "#,
            )
            .bind(&base.id)
            .bind(base.created_at.as_str())
            .bind(base.updated_at.as_str())
            .bind(&s.name)
            .execute(&mut *conn)
            .await
        }
        Entity::Amenity(a) => {
            sqlx::query(
                r#"
                INSERT INTO amenities (id, created_at, updated_at, name)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at, name = excluded.name
                "#,
            )
            .bind(&base.id)
            .bind(base.created_at.as_str())
            .bind(base.updated_at.as_str())
            .bind(&a.name)
            .execute(&mut *conn)
            .await
        }
        Entity::City(c) => {
            sqlx::query(
                r#"
                INSERT INTO cities (id, created_at, updated_at, state_id, name)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    state_id = excluded.state_id,
                    name = excluded.name
                "#,
            )
            .bind(&base.id)
            .bind(base.created_at.as_str())
            .bind(base.updated_at.as_str())
            .bind(&c.state_id)
            .bind(&c.name)
            .execute(&mut *conn)
            .await
        }
        Entity::User(u) => {
            sqlx::query(
                r#"
                INSERT INTO users (id, created_at, updated_at, email, password, first_name, last_name)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    email = excluded.email,
                    password = excluded.password,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name
                "#,
            )
            .bind(&base.id)
            .bind(base.created_at.as_str())
            .bind(base.updated_at.as_str())
            .bind(&u.email)
            .bind(&u.password)
            .bind(&u.first_name)
            .bind(&u.last_name)
            .execute(&mut *conn)
            .await
        }
        Entity::Review(r) => {
            sqlx::query(
                r#"
                INSERT INTO reviews (id, created_at, updated_at, place_id, user_id, text)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    place_id = excluded.place_id,
                    user_id = excluded.user_id,
                    text = excluded.text
                "#,
            )
            .bind(&base.id)
            .bind(base.created_at.as_str())
            .bind(base.updated_at.as_str())
            .bind(&r.place_id)
            .bind(&r.user_id)
            .bind(&r.text)
            .execute(&mut *conn)
            .await
        }
        Entity::Place(p) => {
            sqlx::query(
                r#"
                INSERT INTO places (id, created_at, updated_at, city_id, user_id, name,
                                    description, number_rooms, number_bathrooms, max_guest,
                                    price_by_night, latitude, longitude)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    city_id = excluded.city_id,
                    user_id = excluded.user_id,
                    name = excluded.name,
                    description = excluded.description,
                    number_rooms = excluded.number_rooms,
                    number_bathrooms = excluded.number_bathrooms,
                    max_guest = excluded.max_guest,
                    price_by_night = excluded.price_by_night,
                    latitude = excluded.latitude,
                    longitude = excluded.longitude
                "#,
            )
            .bind(&base.id)
            .bind(base.created_at.as_str())
            .bind(base.updated_at.as_str())
            .bind(&p.city_id)
            .bind(&p.user_id)
            .bind(&p.name)
            .bind(&p.description)
            .bind(p.number_rooms)
            .bind(p.number_bathrooms)
            .bind(p.max_guest)
            .bind(p.price_by_night)
            .bind(p.latitude)
            .bind(p.longitude)
            .execute(&mut *conn)
            .await
        }
    };
    result.map_err(db_error)?;

    if let Entity::Place(p) = entity {
        sync_links(conn, p).await?;
    }
    Ok(())
}

/// Make the join table match `place.amenity_ids`
async fn sync_links(conn: &mut SqliteConnection, place: &Place) -> Result<()> {
    sqlx::query("DELETE FROM place_amenity WHERE place_id = ?1")
        .bind(&place.base.id)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;

    for amenity_id in &place.amenity_ids {
        sqlx::query("INSERT OR IGNORE INTO place_amenity (place_id, amenity_id) VALUES (?1, ?2)")
            .bind(&place.base.id)
            .bind(amenity_id)
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;
    }
    Ok(())
}

/// Bump a place's `updated_at` after its links changed
async fn touch_place(conn: &mut SqliteConnection, place_id: &str, prev: &str) -> Result<()> {
    let next = Timestamp::after(&Timestamp::from(prev));
    sqlx::query("UPDATE places SET updated_at = ?1 WHERE id = ?2")
        .bind(next.as_str())
        .bind(place_id)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    Ok(())
}

async fn place_updated_at(conn: &mut SqliteConnection, place_id: &str) -> Result<Option<String>> {
    sqlx::query_scalar("SELECT updated_at FROM places WHERE id = ?1")
        .bind(place_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error)
}

#[async_trait]
impl Storage for DbStorage {
    async fn get_all(&self, kind: Option<Kind>) -> Result<HashMap<String, Entity>> {
        let mut session = self.session.lock().await;
        let conn = self.begin(&mut session).await?;
        let kinds = match kind {
            Some(k) => vec![k],
            None => Kind::ALL.to_vec(),
        };
        let mut all = HashMap::new();
        for k in kinds {
            for entity in load(conn, k, "", &[]).await? {
                all.insert(entity.key(), entity);
            }
        }
        Ok(all)
    }

    async fn get(&self, kind: Kind, id: &str) -> Result<Option<Entity>> {
        if id.is_empty() {
            return Ok(None);
        }
        let mut session = self.session.lock().await;
        let conn = self.begin(&mut session).await?;
        Ok(load(conn, kind, "WHERE id = ?1", &[id]).await?.into_iter().next())
    }

    async fn count(&self, kind: Option<Kind>) -> Result<usize> {
        let mut session = self.session.lock().await;
        let conn = self.begin(&mut session).await?;
        let kinds = match kind {
            Some(k) => vec![k],
            None => Kind::ALL.to_vec(),
        };
        let mut total = 0;
        for k in kinds {
            let sql = format!("SELECT COUNT(*) FROM {}", k.collection());
            let n: i64 = sqlx::query_scalar(&sql)
                .fetch_one(&mut *conn)
                .await
                .map_err(db_error)?;
            total += n as usize;
        }
        Ok(total)
    }

    async fn new(&self, entity: Entity) -> Result<()> {
        let mut session = self.session.lock().await;
        let conn = self.begin(&mut session).await?;
        debug!("Staging {}", entity.key());
        upsert(conn, &entity).await
    }

    async fn save(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        match session.take() {
            Some(tx) => {
                tx.commit().await.map_err(db_error)?;
                debug!("Committed database session");
            }
            None => debug!("No open session, nothing to commit"),
        }
        Ok(())
    }

    async fn delete(&self, entity: &Entity) -> Result<()> {
        let mut session = self.session.lock().await;
        let conn = self.begin(&mut session).await?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", entity.kind().collection());
        let result = sqlx::query(&sql)
            .bind(entity.id())
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;
        debug!(
            "Staged removal of {} ({} rows)",
            entity.key(),
            result.rows_affected()
        );
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        self.rollback(&mut session).await?;
        self.create_schema().await?;
        info!("Database schema ready");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            self.rollback(&mut session).await?;
        }
        Ok(())
    }

    async fn cities_of(&self, state_id: &str) -> Result<Vec<City>> {
        let mut session = self.session.lock().await;
        let conn = self.begin(&mut session).await?;
        let rows = select::<CityRow>(
            conn,
            "SELECT id, created_at, updated_at, state_id, name FROM cities WHERE state_id = ?1",
            &[state_id],
        )
        .await?;
        Ok(rows.into_iter().map(City::from).collect())
    }

    async fn places_of(&self, city_id: &str) -> Result<Vec<Place>> {
        let mut session = self.session.lock().await;
        let conn = self.begin(&mut session).await?;
        let found = load(conn, Kind::Place, "WHERE city_id = ?1", &[city_id]).await?;
        Ok(found
            .into_iter()
            .filter_map(|e| Place::try_from(e).ok())
            .collect())
    }

    async fn reviews_of(&self, place_id: &str) -> Result<Vec<Review>> {
        let mut session = self.session.lock().await;
        let conn = self.begin(&mut session).await?;
        let rows = select::<ReviewRow>(
            conn,
            "SELECT id, created_at, updated_at, place_id, user_id, text FROM reviews WHERE place_id = ?1",
            &[place_id],
        )
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn amenities_of(&self, place_id: &str) -> Result<Vec<Amenity>> {
        let mut session = self.session.lock().await;
        let conn = self.begin(&mut session).await?;
        let rows = select::<AmenityRow>(
            conn,
            r#"
            SELECT a.id, a.created_at, a.updated_at, a.name
            FROM amenities a
            JOIN place_amenity pa ON pa.amenity_id = a.id
            WHERE pa.place_id = ?1
            ORDER BY pa.rowid
            "#,
            &[place_id],
        )
        .await?;
        Ok(rows.into_iter().map(Amenity::from).collect())
    }

    async fn link_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool> {
        let mut session = self.session.lock().await;
        let conn = self.begin(&mut session).await?;
        let Some(prev) = place_updated_at(conn, place_id).await? else {
            return Ok(false);
        };
        let result =
            sqlx::query("INSERT OR IGNORE INTO place_amenity (place_id, amenity_id) VALUES (?1, ?2)")
                .bind(place_id)
                .bind(amenity_id)
                .execute(&mut *conn)
                .await
                .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        touch_place(conn, place_id, &prev).await?;
        Ok(true)
    }

    async fn unlink_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool> {
        let mut session = self.session.lock().await;
        let conn = self.begin(&mut session).await?;
        let Some(prev) = place_updated_at(conn, place_id).await? else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM place_amenity WHERE place_id = ?1 AND amenity_id = ?2")
            .bind(place_id)
            .bind(amenity_id)
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        touch_place(conn, place_id, &prev).await?;
        Ok(true)
    }
}

impl Drop for DbStorage {
    fn drop(&mut self) {
        if self.session.get_mut().is_some() {
            warn!("Dropping database storage with an open session; uncommitted changes are lost");
        }
    }
}

// Helper structs for sqlx query_as
#[derive(sqlx::FromRow)]
struct StateRow {
    id: String,
    created_at: String,
    updated_at: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct CityRow {
    id: String,
    created_at: String,
    updated_at: String,
    state_id: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    created_at: String,
    updated_at: String,
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct PlaceRow {
    id: String,
    created_at: String,
    updated_at: String,
    city_id: String,
    user_id: String,
    name: String,
    description: Option<String>,
    number_rooms: i64,
    number_bathrooms: i64,
    max_guest: i64,
    price_by_night: i64,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: String,
    created_at: String,
    updated_at: String,
    place_id: String,
    user_id: String,
    text: String,
}

#[derive(sqlx::FromRow)]
struct AmenityRow {
    id: String,
    created_at: String,
    updated_at: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    place_id: String,
    amenity_id: String,
}

fn base(id: String, created_at: String, updated_at: String) -> Base {
    Base {
        id,
        created_at: created_at.into(),
        updated_at: updated_at.into(),
    }
}

impl From<StateRow> for State {
    fn from(r: StateRow) -> Self {
        State {
            base: base(r.id, r.created_at, r.updated_at),
            name: r.name,
        }
    }
}

impl From<CityRow> for City {
    fn from(r: CityRow) -> Self {
        City {
            base: base(r.id, r.created_at, r.updated_at),
            state_id: r.state_id,
            name: r.name,
        }
    }
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            base: base(r.id, r.created_at, r.updated_at),
            email: r.email,
            password: r.password,
            first_name: r.first_name,
            last_name: r.last_name,
        }
    }
}

impl PlaceRow {
    fn into_place(self, amenity_ids: Vec<String>) -> Place {
        Place {
            base: base(self.id, self.created_at, self.updated_at),
            city_id: self.city_id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            number_rooms: self.number_rooms,
            number_bathrooms: self.number_bathrooms,
            max_guest: self.max_guest,
            price_by_night: self.price_by_night,
            latitude: self.latitude,
            longitude: self.longitude,
            amenity_ids,
        }
    }
}

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self {
        Review {
            base: base(r.id, r.created_at, r.updated_at),
            place_id: r.place_id,
            user_id: r.user_id,
            text: r.text,
        }
    }
}

impl From<AmenityRow> for Amenity {
    fn from(r: AmenityRow) -> Self {
        Amenity {
            base: base(r.id, r.created_at, r.updated_at),
            name: r.name,
        }
    }
}
