//! Ticket and seat hold queries

use super::trip_repo::TripRow;
use busline_core::{
    models::{RiderTicket, Ticket, TicketStatus, TicketWithTrip, Trip},
    AppError, AppResult,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// Insert the ticket row and one seat hold per seat
#[instrument(skip(conn, ticket), fields(ticket_id = %ticket.id, trip_id = %ticket.trip_id))]
pub(crate) async fn insert_ticket(conn: &mut PgConnection, ticket: &Ticket) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tickets (id, trip_id, user_id, status, total_price, discount, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(ticket.id)
    .bind(ticket.trip_id)
    .bind(ticket.rider_id)
    .bind(ticket.status.to_string())
    .bind(ticket.total_price)
    .bind(ticket.discount)
    .bind(ticket.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        error!("Failed to create ticket: {}", e);
        AppError::Database(format!("Failed to create ticket: {}", e))
    })?;

    for seat in &ticket.seats {
        sqlx::query(
            r#"
            INSERT INTO booked_seats (id, ticket_id, seat_number, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ticket.id)
        .bind(seat)
        .bind(ticket.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to hold seat {} for ticket {}: {}", seat, ticket.id, e);
            AppError::Database(format!("Failed to hold seat: {}", e))
        })?;
    }

    debug!("Inserted ticket with {} seats", ticket.seats.len());
    Ok(())
}

#[instrument(skip(conn))]
pub(crate) async fn lock_ticket(
    conn: &mut PgConnection,
    ticket_id: Uuid,
) -> AppResult<Option<TicketWithTrip>> {
    let row = sqlx::query_as::<sqlx::Postgres, TicketTripRow>(
        r#"
        SELECT t.id, t.trip_id, t.user_id, t.status, t.total_price, t.discount,
               t.created_at, t.cancelled_at, tr.company_id, tr.departure_time
        FROM tickets t
        JOIN trips tr ON tr.id = t.trip_id
        WHERE t.id = $1
        FOR UPDATE OF t
        "#,
    )
    .bind(ticket_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        error!("Failed to lock ticket {}: {}", ticket_id, e);
        AppError::Database(format!("Failed to lock ticket: {}", e))
    })?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut seats = seats_for(conn, &[ticket_id]).await?;
    let company_id = row.company_id;
    let departure_time = row.departure_time;
    let ticket = row.ticket.into_ticket(seats.remove(&ticket_id).unwrap_or_default())?;

    Ok(Some(TicketWithTrip {
        ticket,
        company_id,
        departure_time,
    }))
}

#[instrument(skip(conn))]
pub(crate) async fn cancel_ticket(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    at: DateTime<Utc>,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE tickets
        SET status = 'CANCELLED', cancelled_at = $2
        WHERE id = $1 AND status = 'ACTIVE'
        "#,
    )
    .bind(ticket_id)
    .bind(at)
    .execute(conn)
    .await
    .map_err(|e| {
        error!("Failed to cancel ticket {}: {}", ticket_id, e);
        AppError::Database(format!("Failed to cancel ticket: {}", e))
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::AlreadyCancelled);
    }

    Ok(())
}

/// ACTIVE tickets of a trip, locked in owner order
#[instrument(skip(conn))]
pub(crate) async fn lock_active_tickets(
    conn: &mut PgConnection,
    trip_id: Uuid,
) -> AppResult<Vec<Ticket>> {
    let rows = sqlx::query_as::<sqlx::Postgres, TicketRow>(
        r#"
        SELECT id, trip_id, user_id, status, total_price, discount, created_at, cancelled_at
        FROM tickets
        WHERE trip_id = $1 AND status = 'ACTIVE'
        ORDER BY user_id, id
        FOR UPDATE
        "#,
    )
    .bind(trip_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        error!("Failed to lock tickets of trip {}: {}", trip_id, e);
        AppError::Database(format!("Failed to lock trip tickets: {}", e))
    })?;

    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut seats = seats_for(conn, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let held = seats.remove(&row.id).unwrap_or_default();
            row.into_ticket(held)
        })
        .collect()
}

#[instrument(skip(pool))]
pub(crate) async fn tickets_for_rider(pool: &PgPool, rider_id: Uuid) -> AppResult<Vec<RiderTicket>> {
    let mut conn = pool.acquire().await.map_err(|e| {
        error!("Failed to acquire connection: {}", e);
        AppError::Pool(format!("Failed to acquire connection: {}", e))
    })?;

    let rows = sqlx::query_as::<sqlx::Postgres, RiderTicketRow>(
        r#"
        SELECT t.id, t.trip_id, t.user_id, t.status, t.total_price, t.discount,
               t.created_at, t.cancelled_at,
               tr.company_id AS trip_company_id,
               tr.departure_city AS trip_departure_city,
               tr.destination_city AS trip_destination_city,
               tr.departure_time AS trip_departure_time,
               tr.arrival_time AS trip_arrival_time,
               tr.bus_type AS trip_bus_type,
               tr.capacity AS trip_capacity,
               tr.price AS trip_price,
               tr.created_at AS trip_created_at,
               c.name AS company_name
        FROM tickets t
        JOIN trips tr ON tr.id = t.trip_id
        JOIN bus_companies c ON c.id = tr.company_id
        WHERE t.user_id = $1
        ORDER BY t.created_at DESC, t.id
        "#,
    )
    .bind(rider_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        error!("Failed to list tickets of rider {}: {}", rider_id, e);
        AppError::Database(format!("Failed to list tickets: {}", e))
    })?;

    let ids: Vec<Uuid> = rows.iter().map(|row| row.ticket.id).collect();
    let mut seats = seats_for(&mut conn, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let held = seats.remove(&row.ticket.id).unwrap_or_default();
            let trip = Trip::try_from(TripRow {
                id: row.ticket.trip_id,
                company_id: row.trip_company_id,
                departure_city: row.trip_departure_city,
                destination_city: row.trip_destination_city,
                departure_time: row.trip_departure_time,
                arrival_time: row.trip_arrival_time,
                bus_type: row.trip_bus_type,
                capacity: row.trip_capacity,
                price: row.trip_price,
                created_at: row.trip_created_at,
            })?;

            Ok(RiderTicket {
                ticket: row.ticket.into_ticket(held)?,
                trip,
                company_name: row.company_name,
            })
        })
        .collect()
}

/// Seat numbers of the given tickets, keyed by ticket
async fn seats_for(
    conn: &mut PgConnection,
    ticket_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<i32>>> {
    if ticket_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<sqlx::Postgres, (Uuid, i32)>(
        r#"
        SELECT ticket_id, seat_number
        FROM booked_seats
        WHERE ticket_id = ANY($1)
        ORDER BY ticket_id, seat_number
        "#,
    )
    .bind(ticket_ids)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        error!("Failed to load seat holds: {}", e);
        AppError::Database(format!("Failed to load seat holds: {}", e))
    })?;

    let mut seats: HashMap<Uuid, Vec<i32>> = HashMap::new();
    for (ticket_id, seat) in rows {
        seats.entry(ticket_id).or_default().push(seat);
    }
    Ok(seats)
}

/// Database row for tickets
#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    trip_id: Uuid,
    user_id: Uuid,
    status: String,
    total_price: Decimal,
    discount: Decimal,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TicketRow {
    fn into_ticket(self, seats: Vec<i32>) -> AppResult<Ticket> {
        let status = TicketStatus::from_str(&self.status).ok_or_else(|| {
            AppError::Database(format!(
                "Ticket {} has unknown status '{}'",
                self.id, self.status
            ))
        })?;

        Ok(Ticket {
            id: self.id,
            trip_id: self.trip_id,
            rider_id: self.user_id,
            total_price: self.total_price,
            discount: self.discount,
            status,
            seats,
            created_at: self.created_at,
            cancelled_at: self.cancelled_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TicketTripRow {
    #[sqlx(flatten)]
    ticket: TicketRow,
    company_id: Uuid,
    departure_time: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct RiderTicketRow {
    #[sqlx(flatten)]
    ticket: TicketRow,
    trip_company_id: Uuid,
    trip_departure_city: String,
    trip_destination_city: String,
    trip_departure_time: DateTime<Utc>,
    trip_arrival_time: DateTime<Utc>,
    trip_bus_type: String,
    trip_capacity: i32,
    trip_price: Decimal,
    trip_created_at: DateTime<Utc>,
    company_name: String,
}
