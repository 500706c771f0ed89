use chrono::{DateTime, Utc};
use shared::DataPoint;
use tokio_postgres::Row;

use crate::db;

/// Most recent persisted datetime of one location.
#[derive(Clone, Debug)]
pub struct LatestIngest {
    pub location: String,
    pub datetime: DateTime<Utc>,
}

impl TryFrom<&Row> for LatestIngest {
    type Error = tokio_postgres::Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            location: row.try_get("location")?,
            datetime: row.try_get("datetime")?,
        })
    }
}

pub async fn latest_by_location<'a>(
    client: &db::Client<'a>,
) -> Result<Vec<LatestIngest>, tokio_postgres::Error> {
    let stmt = "SELECT location, MAX(datetime) AS datetime FROM data_points GROUP BY location";
    let rows = client.query(stmt, &[]).await?;
    super::from_rows(rows)
}

/// Insert a data point, or overwrite the values stored under its key.
pub async fn upsert<'a>(
    client: &db::Client<'a>,
    point: &DataPoint,
) -> Result<u64, tokio_postgres::Error> {
    client
        .execute(
            "INSERT INTO data_points (datetime, location, lat, long, temp, wind_dir, wind_speed) \
            VALUES ($1, $2, $3, $4, $5, $6, $7) \
            ON CONFLICT (datetime, location) DO UPDATE SET lat=excluded.lat, long=excluded.long, \
            temp=excluded.temp, wind_dir=excluded.wind_dir, wind_speed=excluded.wind_speed",
            &[
                &point.datetime,
                &point.location,
                &point.lat,
                &point.lon,
                &point.temp,
                &point.wind_dir,
                &point.wind_speed,
            ],
        )
        .await
}
