// src/booking_handlers.rs
//! Обработчики бронирования комнат

use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::ids::{next_id, IdEntity};
use crate::models::{Booking, BookingStatus, CreateBookingRequest, UpdateBookingRequest};
use crate::AppState;

// ==================== OVERLAP RULE ====================

/// Half-open range overlap: `[start, end)`, a missing end date means the
/// booking is open-ended and never bounds the comparison. Two ranges conflict
/// iff each starts before the other ends.
fn ranges_overlap(
    a_start: NaiveDate,
    a_end: Option<NaiveDate>,
    b_start: NaiveDate,
    b_end: Option<NaiveDate>,
) -> bool {
    let a_starts_before_b_ends = match b_end {
        Some(end) => a_start < end,
        None => true,
    };
    let b_starts_before_a_ends = match a_end {
        Some(end) => b_start < end,
        None => true,
    };
    a_starts_before_b_ends && b_starts_before_a_ends
}

// ==================== GET ALL BOOKINGS ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub student_id: Option<String>,
    pub room_id: Option<String>,
}

pub async fn get_all_bookings(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<BookingListQuery>,
) -> ApiResult<HttpResponse> {
    let mut sql = String::from("SELECT * FROM bookings WHERE 1=1");
    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if query.student_id.is_some() {
        sql.push_str(" AND student_id = ?");
    }
    if query.room_id.is_some() {
        sql.push_str(" AND room_id = ?");
    }
    sql.push_str(" ORDER BY booking_date DESC");

    let mut q = sqlx::query_as::<_, Booking>(&sql);
    if let Some(ref status) = query.status {
        q = q.bind(status);
    }
    if let Some(ref student_id) = query.student_id {
        q = q.bind(student_id);
    }
    if let Some(ref room_id) = query.room_id {
        q = q.bind(room_id);
    }

    let bookings = q.fetch_all(&app_state.db_pool).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

// ==================== GET BOOKING BY ID ====================

pub async fn get_booking(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let booking_id = path.into_inner();

    let booking: Option<Booking> = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
        .bind(&booking_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    match booking {
        Some(b) => Ok(HttpResponse::Ok().json(b)),
        None => Err(ApiError::not_found("Booking")),
    }
}

// ==================== CREATE BOOKING ====================

pub async fn create_booking(
    app_state: web::Data<Arc<AppState>>,
    booking: web::Json<CreateBookingRequest>,
) -> ApiResult<HttpResponse> {
    booking.validate()?;

    if let Some(end_date) = booking.end_date {
        if end_date <= booking.start_date {
            return Err(ApiError::bad_request("End date must be after start date"));
        }
    }

    // Проверка конфликта и вставка в одной транзакции
    let mut tx = app_state.db_pool.begin().await?;

    let student: Option<(String,)> = sqlx::query_as("SELECT id FROM students WHERE id = ?")
        .bind(&booking.student_id)
        .fetch_optional(&mut *tx)
        .await?;
    if student.is_none() {
        return Err(ApiError::student_not_found(&booking.student_id));
    }

    let room: Option<(String,)> = sqlx::query_as("SELECT id FROM rooms WHERE id = ?")
        .bind(&booking.room_id)
        .fetch_optional(&mut *tx)
        .await?;
    if room.is_none() {
        return Err(ApiError::bad_request("Room not found"));
    }

    let existing: Vec<(NaiveDate, Option<NaiveDate>)> = sqlx::query_as(
        "SELECT start_date, end_date FROM bookings WHERE room_id = ? AND status != 'cancelled'",
    )
    .bind(&booking.room_id)
    .fetch_all(&mut *tx)
    .await?;

    let conflict = existing.iter().any(|(start, end)| {
        ranges_overlap(booking.start_date, booking.end_date, *start, *end)
    });
    if conflict {
        return Err(ApiError::booking_conflict());
    }

    let id = next_id(&mut *tx, IdEntity::Booking).await?;
    let booking_date = Utc::now().date_naive();

    sqlx::query(
        r#"
        INSERT INTO bookings (id, student_id, room_id, start_date, end_date, status, booking_date, amount)
        VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&booking.student_id)
    .bind(&booking.room_id)
    .bind(booking.start_date)
    .bind(booking.end_date)
    .bind(booking_date)
    .bind(booking.amount)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let created: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
        .bind(&id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!(
        "📅 Created booking {} (student {}, room {})",
        id, created.student_id, created.room_id
    );
    Ok(HttpResponse::Created().json(created))
}

// ==================== UPDATE BOOKING ====================

pub async fn update_booking(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    update: web::Json<UpdateBookingRequest>,
) -> ApiResult<HttpResponse> {
    update.validate()?;
    let booking_id = path.into_inner();

    let existing: Option<Booking> = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
        .bind(&booking_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    let existing = existing.ok_or_else(|| ApiError::not_found("Booking"))?;

    if let Some(ref status) = update.status {
        if !BookingStatus::is_valid(status) {
            return Err(ApiError::bad_request(
                "Invalid status. Must be: pending, confirmed, cancelled, or completed",
            ));
        }
    }

    let start_date = update.start_date.unwrap_or(existing.start_date);
    let end_date = update.end_date.or(existing.end_date);
    let status = update.status.as_ref().unwrap_or(&existing.status);
    let amount = update.amount.unwrap_or(existing.amount);

    if let Some(end) = end_date {
        if end <= start_date {
            return Err(ApiError::bad_request("End date must be after start date"));
        }
    }

    sqlx::query(
        r#"
        UPDATE bookings
        SET start_date = ?, end_date = ?, status = ?, amount = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .bind(status)
    .bind(amount)
    .bind(Utc::now())
    .bind(&booking_id)
    .execute(&app_state.db_pool)
    .await?;

    let updated: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
        .bind(&booking_id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("📅 Updated booking: {}", booking_id);
    Ok(HttpResponse::Ok().json(updated))
}

// ==================== CONFIRM BOOKING ====================

pub async fn confirm_booking(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let booking_id = path.into_inner();

    let booking: Option<Booking> = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
        .bind(&booking_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    let booking = booking.ok_or_else(|| ApiError::not_found("Booking"))?;

    // Подтверждать можно только из pending
    if booking.status != BookingStatus::Pending.as_str() {
        return Err(ApiError::only_pending_confirmable());
    }

    sqlx::query("UPDATE bookings SET status = 'confirmed', updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(&booking_id)
        .execute(&app_state.db_pool)
        .await?;

    let updated: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
        .bind(&booking_id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("📅 Confirmed booking: {}", booking_id);
    Ok(HttpResponse::Ok().json(updated))
}

// ==================== CANCEL BOOKING ====================

pub async fn cancel_booking(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let booking_id = path.into_inner();

    let result = sqlx::query("UPDATE bookings SET status = 'cancelled', updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(&booking_id)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Booking"));
    }

    let updated: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
        .bind(&booking_id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("📅 Cancelled booking: {}", booking_id);
    Ok(HttpResponse::Ok().json(updated))
}

// ==================== DELETE BOOKING ====================

pub async fn delete_booking(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let booking_id = path.into_inner();

    let result = sqlx::query("DELETE FROM bookings WHERE id = ?")
        .bind(&booking_id)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Booking"));
    }

    info!("📅 Deleted booking: {}", booking_id);
    Ok(HttpResponse::NoContent().finish())
}

// ==================== BOOKING STATISTICS ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStats {
    pub total_bookings: i64,
    pub confirmed_bookings: i64,
    pub pending_bookings: i64,
    pub cancelled_bookings: i64,
    pub total_revenue: f64,
    pub confirmation_rate: i64,
}

pub async fn get_booking_stats(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
        .fetch_one(&app_state.db_pool)
        .await?;

    let confirmed: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE status = 'confirmed'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let pending: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE status = 'pending'")
        .fetch_one(&app_state.db_pool)
        .await?;

    let cancelled: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE status = 'cancelled'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let revenue: (Option<f64>,) =
        sqlx::query_as("SELECT SUM(amount) FROM bookings WHERE status = 'confirmed'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let stats = BookingStats {
        total_bookings: total.0,
        confirmed_bookings: confirmed.0,
        pending_bookings: pending.0,
        cancelled_bookings: cancelled.0,
        total_revenue: revenue.0.unwrap_or(0.0),
        confirmation_rate: if total.0 > 0 {
            ((confirmed.0 as f64 / total.0 as f64) * 100.0).round() as i64
        } else {
            0
        },
    };

    Ok(HttpResponse::Ok().json(stats))
}
