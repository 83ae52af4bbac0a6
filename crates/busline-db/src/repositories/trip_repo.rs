//! Trip queries
//!
//! Trip rows double as the per-trip reservation lock: `lock_trip` takes a row
//! lock that serializes every seat reservation on the same trip.

use busline_core::{
    models::{BookedSeat, BusType, SeatMap, Trip},
    AppError, AppResult,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, instrument};
use uuid::Uuid;

const TRIP_COLUMNS: &str = r#"
    id, company_id, departure_city, destination_city,
    departure_time, arrival_time, bus_type, capacity, price, created_at
"#;

#[instrument(skip(conn))]
pub(crate) async fn lock_trip(conn: &mut PgConnection, trip_id: Uuid) -> AppResult<Option<Trip>> {
    debug!("Locking trip {}", trip_id);

    let row = sqlx::query_as::<sqlx::Postgres, TripRow>(&format!(
        "SELECT {} FROM trips WHERE id = $1 FOR UPDATE",
        TRIP_COLUMNS
    ))
    .bind(trip_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        error!("Database error locking trip {}: {}", trip_id, e);
        AppError::Database(format!("Failed to lock trip: {}", e))
    })?;

    row.map(Trip::try_from).transpose()
}

#[instrument(skip(conn))]
pub(crate) async fn find_trip(conn: &mut PgConnection, trip_id: Uuid) -> AppResult<Option<Trip>> {
    let row = sqlx::query_as::<sqlx::Postgres, TripRow>(&format!(
        "SELECT {} FROM trips WHERE id = $1",
        TRIP_COLUMNS
    ))
    .bind(trip_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        error!("Database error finding trip {}: {}", trip_id, e);
        AppError::Database(format!("Failed to find trip: {}", e))
    })?;

    row.map(Trip::try_from).transpose()
}

/// Seats held by ACTIVE tickets; cancelled tickets' holds are ignored
#[instrument(skip(conn))]
pub(crate) async fn taken_seats(conn: &mut PgConnection, trip_id: Uuid) -> AppResult<Vec<i32>> {
    sqlx::query_scalar::<sqlx::Postgres, i32>(
        r#"
        SELECT bs.seat_number
        FROM booked_seats bs
        JOIN tickets t ON t.id = bs.ticket_id
        WHERE t.trip_id = $1 AND t.status = 'ACTIVE'
        ORDER BY bs.seat_number
        "#,
    )
    .bind(trip_id)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        error!("Database error reading seats of trip {}: {}", trip_id, e);
        AppError::Database(format!("Failed to read taken seats: {}", e))
    })
}

#[instrument(skip(conn, trip), fields(trip_id = %trip.id))]
pub(crate) async fn insert_trip(conn: &mut PgConnection, trip: &Trip) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO trips (
            id, company_id, departure_city, destination_city,
            departure_time, arrival_time, bus_type, capacity, price, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(trip.id)
    .bind(trip.company_id)
    .bind(&trip.departure_city)
    .bind(&trip.destination_city)
    .bind(trip.departure_time)
    .bind(trip.arrival_time)
    .bind(trip.bus_type.to_string())
    .bind(trip.capacity)
    .bind(trip.price)
    .bind(trip.created_at)
    .execute(conn)
    .await
    .map_err(|e| {
        error!("Database error creating trip: {}", e);
        AppError::Database(format!("Failed to create trip: {}", e))
    })?;

    Ok(())
}

#[instrument(skip(conn))]
pub(crate) async fn delete_trip(conn: &mut PgConnection, trip_id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM trips WHERE id = $1")
        .bind(trip_id)
        .execute(conn)
        .await
        .map_err(|e| {
            error!("Database error deleting trip {}: {}", trip_id, e);
            AppError::Database(format!("Failed to delete trip: {}", e))
        })?;

    Ok(())
}

#[instrument(skip(conn))]
pub(crate) async fn company_name(
    conn: &mut PgConnection,
    company_id: Uuid,
) -> AppResult<Option<String>> {
    sqlx::query_scalar::<sqlx::Postgres, String>("SELECT name FROM bus_companies WHERE id = $1")
        .bind(company_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            error!("Database error finding company {}: {}", company_id, e);
            AppError::Database(format!("Failed to find company: {}", e))
        })
}

#[instrument(skip(pool))]
pub(crate) async fn seat_map(pool: &PgPool, trip_id: Uuid) -> AppResult<Option<SeatMap>> {
    let mut conn = pool.acquire().await.map_err(|e| {
        error!("Failed to acquire connection: {}", e);
        AppError::Pool(format!("Failed to acquire connection: {}", e))
    })?;

    let Some(trip) = find_trip(&mut *conn, trip_id).await? else {
        return Ok(None);
    };

    let rows = sqlx::query_as::<sqlx::Postgres, (i32, Option<String>)>(
        r#"
        SELECT bs.seat_number, u.gender
        FROM booked_seats bs
        JOIN tickets t ON t.id = bs.ticket_id
        JOIN users u ON u.id = t.user_id
        WHERE t.trip_id = $1 AND t.status = 'ACTIVE'
        ORDER BY bs.seat_number
        "#,
    )
    .bind(trip_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        error!("Database error reading seat map of trip {}: {}", trip_id, e);
        AppError::Database(format!("Failed to read seat map: {}", e))
    })?;

    Ok(Some(SeatMap {
        trip_id,
        bus_type: trip.bus_type,
        capacity: trip.capacity,
        booked_seats: rows
            .into_iter()
            .map(|(seat_number, gender)| BookedSeat {
                seat_number,
                gender,
            })
            .collect(),
    }))
}

/// Database row for trips
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TripRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub departure_city: String,
    pub destination_city: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub bus_type: String,
    pub capacity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TripRow> for Trip {
    type Error = AppError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let bus_type = BusType::from_str(&row.bus_type).ok_or_else(|| {
            AppError::Database(format!(
                "Trip {} has unknown bus type '{}'",
                row.id, row.bus_type
            ))
        })?;

        Ok(Trip {
            id: row.id,
            company_id: row.company_id,
            departure_city: row.departure_city,
            destination_city: row.destination_city,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            bus_type,
            capacity: row.capacity,
            price: row.price,
            created_at: row.created_at,
        })
    }
}
