use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::Area;

pub struct AreaRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct AreaRow {
    area_id: i64,
    name: String,
    #[sqlx(rename = "type")]
    area_type: String,
    geom: String,
    synced_at: String,
}

impl From<AreaRow> for Area {
    fn from(row: AreaRow) -> Self {
        Area {
            area_id: row.area_id,
            name: row.name,
            area_type: row.area_type,
            geom: row.geom,
            synced_at: DateTime::parse_from_rfc3339(&row.synced_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_default(),
        }
    }
}

impl AreaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts the area, or updates the existing row with the same `area_id`.
    pub async fn upsert(&self, area: &Area) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        upsert_area(&mut conn, area).await
    }

    /// Upserts a batch in one transaction.
    ///
    /// If any row fails, nothing from the batch is kept.
    pub async fn upsert_all(&self, areas: &[Area]) -> Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for area in areas {
            upsert_area(&mut tx, area).await?;
        }

        tx.commit().await?;
        Ok(areas.len())
    }

    pub async fn get_by_id(&self, area_id: i64) -> Result<Option<Area>, sqlx::Error> {
        let row: Option<AreaRow> = sqlx::query_as("SELECT * FROM areas WHERE area_id = ?")
            .bind(area_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Area::from))
    }

    /// Lists areas ordered by name, optionally limited to one area type.
    pub async fn list(&self, area_type: Option<&str>) -> Result<Vec<Area>, sqlx::Error> {
        let rows: Vec<AreaRow> = match area_type {
            Some(area_type) => {
                sqlx::query_as("SELECT * FROM areas WHERE type = ? ORDER BY name, area_id")
                    .bind(area_type)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM areas ORDER BY name, area_id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(Area::from).collect())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM areas")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn upsert_area(conn: &mut SqliteConnection, area: &Area) -> Result<(), sqlx::Error> {
    let synced_at = area.synced_at.to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO areas (area_id, name, type, geom, synced_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(area_id) DO UPDATE SET
            name = excluded.name,
            type = excluded.type,
            geom = excluded.geom,
            synced_at = excluded.synced_at
        "#,
    )
    .bind(area.area_id)
    .bind(&area.name)
    .bind(&area.area_type)
    .bind(&area.geom)
    .bind(&synced_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
