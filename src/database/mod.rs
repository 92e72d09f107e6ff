use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::models::{Bookmark, CheckPeriod, RootLocations, SiteLocation, WizardState};

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookmarks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                chat_id INTEGER NOT NULL,
                location_id TEXT NOT NULL DEFAULT '',
                max_wind_speed INTEGER NOT NULL DEFAULT 0,
                lowest_temp INTEGER NOT NULL DEFAULT 0,
                check_period INTEGER NOT NULL DEFAULT 0,
                is_ready BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // One wizard state per user; the row is dropped once the wizard finishes.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_states (
                user_id INTEGER PRIMARY KEY,
                current_state INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS locations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                region TEXT NOT NULL DEFAULT '',
                auth_area TEXT NOT NULL DEFAULT '',
                national_park TEXT NOT NULL DEFAULT '',
                latitude TEXT NOT NULL DEFAULT '',
                longitude TEXT NOT NULL DEFAULT '',
                elevation TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookmarks_user_id ON bookmarks (user_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookmarks_is_ready ON bookmarks (is_ready)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_locations_name ON locations (name)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // --- wizard state ---

    pub async fn save_user_state(
        &self,
        user_id: i64,
        state: WizardState,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_states (user_id, current_state) VALUES (?1, ?2)
            ON CONFLICT (user_id) DO UPDATE SET current_state = excluded.current_state
            "#,
        )
        .bind(user_id)
        .bind(state)
        .execute(&self.pool)
        .await?;

        log::debug!("💾 Wizard state {:?} saved for user {}", state, user_id);
        Ok(())
    }

    pub async fn user_state(&self, user_id: i64) -> Result<Option<WizardState>, sqlx::Error> {
        sqlx::query_scalar("SELECT current_state FROM user_states WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn delete_user_state(&self, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM user_states WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- bookmarks ---

    /// Creates the empty, not-yet-ready bookmark the wizard fills in.
    pub async fn create_unfinished_bookmark(
        &self,
        user_id: i64,
        chat_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO bookmarks (user_id, chat_id) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn unfinished_bookmark(
        &self,
        user_id: i64,
    ) -> Result<Option<Bookmark>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            "SELECT * FROM bookmarks WHERE user_id = ?1 AND is_ready = ?2 LIMIT 1",
        )
        .bind(user_id)
        .bind(false)
        .fetch_optional(&self.pool)
        .await
    }

    /// Keeps the invariant of at most one unfinished bookmark per user:
    /// called before a new registration starts.
    pub async fn delete_unfinished_bookmarks(&self, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM bookmarks WHERE user_id = ?1 AND is_ready = ?2")
            .bind(user_id)
            .bind(false)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_bookmark_location(
        &self,
        bookmark_id: i64,
        location_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bookmarks SET location_id = ?1 WHERE id = ?2")
            .bind(location_id)
            .bind(bookmark_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_bookmark_max_wind_speed(
        &self,
        bookmark_id: i64,
        max_wind_speed: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bookmarks SET max_wind_speed = ?1 WHERE id = ?2")
            .bind(max_wind_speed)
            .bind(bookmark_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_bookmark_lowest_temp(
        &self,
        bookmark_id: i64,
        lowest_temp: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bookmarks SET lowest_temp = ?1 WHERE id = ?2")
            .bind(lowest_temp)
            .bind(bookmark_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_bookmark_check_period(
        &self,
        bookmark_id: i64,
        check_period: CheckPeriod,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bookmarks SET check_period = ?1 WHERE id = ?2")
            .bind(check_period)
            .bind(bookmark_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_bookmark_ready(&self, bookmark_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bookmarks SET is_ready = ?1 WHERE id = ?2")
            .bind(true)
            .bind(bookmark_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All bookmarks that take part in forecast checks; restricted to one
    /// owner when `user_id` is given (the on-demand /check path).
    pub async fn ready_bookmarks(
        &self,
        user_id: Option<i64>,
    ) -> Result<Vec<Bookmark>, sqlx::Error> {
        match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, Bookmark>(
                    "SELECT * FROM bookmarks WHERE user_id = ?1 AND is_ready = ?2 ORDER BY id",
                )
                .bind(user_id)
                .bind(true)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Bookmark>(
                    "SELECT * FROM bookmarks WHERE is_ready = ?1 ORDER BY id",
                )
                .bind(true)
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    pub async fn bookmarks_for_user(&self, user_id: i64) -> Result<Vec<Bookmark>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>("SELECT * FROM bookmarks WHERE user_id = ?1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn bookmark_by_id(&self, bookmark_id: i64) -> Result<Option<Bookmark>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>("SELECT * FROM bookmarks WHERE id = ?1")
            .bind(bookmark_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn delete_bookmark(&self, bookmark_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM bookmarks WHERE id = ?1")
            .bind(bookmark_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_all_bookmarks(&self, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM bookmarks WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- location catalog ---

    pub async fn location_by_id(
        &self,
        location_id: &str,
    ) -> Result<Option<SiteLocation>, sqlx::Error> {
        sqlx::query_as::<_, SiteLocation>("SELECT * FROM locations WHERE id = ?1")
            .bind(location_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Prefix search over location names, used by the inline query answers.
    pub async fn search_locations(
        &self,
        prefix: &str,
        limit: i64,
    ) -> Result<Vec<SiteLocation>, sqlx::Error> {
        sqlx::query_as::<_, SiteLocation>(
            "SELECT * FROM locations WHERE name LIKE ?1 ORDER BY name LIMIT ?2",
        )
        .bind(format!("{}%", prefix))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_locations(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM locations")
            .fetch_one(&self.pool)
            .await
    }

    pub async fn insert_locations(&self, locations: &[SiteLocation]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for loc in locations {
            sqlx::query(
                r#"
                INSERT INTO locations (id, name, region, auth_area, national_park, latitude, longitude, elevation)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT (id) DO UPDATE SET
                    name = excluded.name,
                    region = excluded.region,
                    auth_area = excluded.auth_area,
                    national_park = excluded.national_park,
                    latitude = excluded.latitude,
                    longitude = excluded.longitude,
                    elevation = excluded.elevation
                "#,
            )
            .bind(&loc.id)
            .bind(&loc.name)
            .bind(&loc.region)
            .bind(&loc.auth_area)
            .bind(&loc.national_park)
            .bind(&loc.latitude)
            .bind(&loc.longitude)
            .bind(&loc.elevation)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Populates the location catalog from a Met Office sitelist JSON file.
    /// Skipped when the catalog already has rows.
    pub async fn seed_locations_from_file(
        &self,
        path: &Path,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        if self.count_locations().await? > 0 {
            log::debug!("Location catalog already populated, skipping seed");
            return Ok(0);
        }

        let raw = fs::read_to_string(path)?;
        let parsed: RootLocations = serde_json::from_str(&raw)?;
        let locations = parsed.locations.location;
        self.insert_locations(&locations).await?;

        Ok(locations.len())
    }
}

#[cfg(test)]
impl Database {
    /// A single-connection in-memory database for tests. One connection only,
    /// otherwise every pooled connection would see its own empty `:memory:` db.
    pub async fn open_in_memory() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let db = Database { pool };
        db.init().await.expect("schema init");
        db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_location(id: &str, name: &str) -> SiteLocation {
        SiteLocation {
            id: id.to_string(),
            name: name.to_string(),
            region: "se".to_string(),
            auth_area: "Greater London".to_string(),
            national_park: String::new(),
            latitude: "51.5".to_string(),
            longitude: "-0.1".to_string(),
            elevation: "25.0".to_string(),
        }
    }

    #[tokio::test]
    async fn ready_bookmarks_filters_by_readiness_and_owner() {
        let db = Database::open_in_memory().await;

        db.create_unfinished_bookmark(1, 10).await.unwrap();
        db.create_unfinished_bookmark(2, 20).await.unwrap();
        let b2 = db.unfinished_bookmark(2).await.unwrap().unwrap();
        db.mark_bookmark_ready(b2.id).await.unwrap();

        let all_ready = db.ready_bookmarks(None).await.unwrap();
        assert_eq!(all_ready.len(), 1);
        assert_eq!(all_ready[0].user_id, 2);

        let user1_ready = db.ready_bookmarks(Some(1)).await.unwrap();
        assert!(user1_ready.is_empty());

        let user2_ready = db.ready_bookmarks(Some(2)).await.unwrap();
        assert_eq!(user2_ready.len(), 1);
        assert!(user2_ready[0].is_ready);
    }

    #[tokio::test]
    async fn location_prefix_search_is_bounded() {
        let db = Database::open_in_memory().await;
        db.insert_locations(&[
            test_location("1", "London"),
            test_location("2", "Londonderry"),
            test_location("3", "Leeds"),
        ])
        .await
        .unwrap();

        let found = db.search_locations("Lond", 10).await.unwrap();
        assert_eq!(found.len(), 2);

        let capped = db.search_locations("L", 1).await.unwrap();
        assert_eq!(capped.len(), 1);

        assert_eq!(db.count_locations().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn user_state_roundtrip_and_delete() {
        let db = Database::open_in_memory().await;

        assert!(db.user_state(7).await.unwrap().is_none());

        db.save_user_state(7, WizardState::AwaitingWind).await.unwrap();
        assert_eq!(
            db.user_state(7).await.unwrap(),
            Some(WizardState::AwaitingWind)
        );

        // last write wins for the same user
        db.save_user_state(7, WizardState::AwaitingTemp).await.unwrap();
        assert_eq!(
            db.user_state(7).await.unwrap(),
            Some(WizardState::AwaitingTemp)
        );

        db.delete_user_state(7).await.unwrap();
        assert!(db.user_state(7).await.unwrap().is_none());
    }
}
