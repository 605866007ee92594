// src/handlers.rs
//! Общие обработчики: дашборд и служебные маршруты

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::models::{Booking, Visitor};
use crate::AppState;

// ==================== PING ====================

pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "NYOOTI HOSTELS API Server Running!"
    }))
}

// ==================== DASHBOARD STATISTICS ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_students: i64,
    pub total_rooms: i64,
    pub occupied_rooms: i64,
    pub total_revenue: f64,
    pub pending_payments: i64,
    pub recent_bookings: Vec<Booking>,
    pub recent_visitors: Vec<Visitor>,
}

pub async fn get_dashboard_stats(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let total_students: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students")
        .fetch_one(&app_state.db_pool)
        .await?;

    let total_rooms: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms")
        .fetch_one(&app_state.db_pool)
        .await?;

    let occupied_rooms: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM rooms WHERE status = 'occupied'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let total_revenue: (Option<f64>,) =
        sqlx::query_as("SELECT SUM(amount) FROM bookings WHERE status = 'confirmed'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let pending_payments: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM payments WHERE status = 'pending'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let recent_bookings: Vec<Booking> =
        sqlx::query_as("SELECT * FROM bookings ORDER BY booking_date DESC LIMIT 3")
            .fetch_all(&app_state.db_pool)
            .await?;

    let recent_visitors: Vec<Visitor> =
        sqlx::query_as("SELECT * FROM visitors ORDER BY check_in_time DESC LIMIT 2")
            .fetch_all(&app_state.db_pool)
            .await?;

    let stats = DashboardStats {
        total_students: total_students.0,
        total_rooms: total_rooms.0,
        occupied_rooms: occupied_rooms.0,
        total_revenue: total_revenue.0.unwrap_or(0.0),
        pending_payments: pending_payments.0,
        recent_bookings,
        recent_visitors,
    };

    Ok(HttpResponse::Ok().json(stats))
}

// ==================== SYSTEM OVERVIEW ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostelsOverview {
    pub total: i64,
    pub male_hostels: i64,
    pub female_hostels: i64,
    pub mixed_hostels: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomsOverview {
    pub total: i64,
    pub occupied: i64,
    pub available: i64,
    pub maintenance: i64,
    pub occupancy_rate: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentsOverview {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub new_this_month: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorsOverview {
    pub currently_inside: i64,
    pub today_total: i64,
    pub this_week_total: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialOverview {
    pub monthly_revenue: f64,
    pub pending_payments: i64,
    pub total_pending: f64,
    pub collection_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct SystemOverview {
    pub hostels: HostelsOverview,
    pub rooms: RoomsOverview,
    pub students: StudentsOverview,
    pub visitors: VisitorsOverview,
    pub financial: FinancialOverview,
}

pub async fn get_system_overview(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let pool = &app_state.db_pool;
    let today = Utc::now().date_naive();
    let current_month = today.format("%Y-%m").to_string();

    let hostel_counts: Vec<(String, i64)> =
        sqlx::query_as("SELECT type, COUNT(*) FROM hostels GROUP BY type")
            .fetch_all(pool)
            .await?;
    let total_hostels: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hostels")
        .fetch_one(pool)
        .await?;

    let room_counts: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM rooms GROUP BY status")
            .fetch_all(pool)
            .await?;
    let total_rooms: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms")
        .fetch_one(pool)
        .await?;

    let student_counts: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM students GROUP BY status")
            .fetch_all(pool)
            .await?;
    let total_students: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students")
        .fetch_one(pool)
        .await?;
    let new_this_month: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM students WHERE strftime('%Y-%m', join_date) = ?")
            .bind(&current_month)
            .fetch_one(pool)
            .await?;

    let currently_inside: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM visitors WHERE status = 'checked_in'")
            .fetch_one(pool)
            .await?;
    let today_visitors: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM visitors WHERE DATE(check_in_time) = ?")
            .bind(today)
            .fetch_one(pool)
            .await?;
    let week_visitors: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM visitors WHERE DATE(check_in_time) >= DATE('now', '-6 days')",
    )
    .fetch_one(pool)
    .await?;

    // Выручка за текущий календарный месяц
    let monthly_revenue: (Option<f64>,) = sqlx::query_as(
        "SELECT SUM(amount) FROM bookings WHERE status = 'confirmed' AND strftime('%Y-%m', booking_date) = ?",
    )
    .bind(&current_month)
    .fetch_one(pool)
    .await?;

    let pending: (i64, Option<f64>) =
        sqlx::query_as("SELECT COUNT(*), SUM(amount) FROM payments WHERE status = 'pending'")
            .fetch_one(pool)
            .await?;
    let paid_amount: (Option<f64>,) =
        sqlx::query_as("SELECT SUM(amount) FROM payments WHERE status = 'paid'")
            .fetch_one(pool)
            .await?;

    let count_for = |rows: &[(String, i64)], key: &str| {
        rows.iter()
            .find(|(k, _)| k == key)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };

    let occupied = count_for(&room_counts, "occupied");
    let paid_total = paid_amount.0.unwrap_or(0.0);
    let pending_total = pending.1.unwrap_or(0.0);
    let billed_total = paid_total + pending_total;

    let overview = SystemOverview {
        hostels: HostelsOverview {
            total: total_hostels.0,
            male_hostels: count_for(&hostel_counts, "male"),
            female_hostels: count_for(&hostel_counts, "female"),
            mixed_hostels: count_for(&hostel_counts, "mixed"),
        },
        rooms: RoomsOverview {
            total: total_rooms.0,
            occupied,
            available: count_for(&room_counts, "available"),
            maintenance: count_for(&room_counts, "maintenance"),
            occupancy_rate: if total_rooms.0 > 0 {
                ((occupied as f64 / total_rooms.0 as f64) * 100.0).round() as i64
            } else {
                0
            },
        },
        students: StudentsOverview {
            total: total_students.0,
            active: count_for(&student_counts, "active"),
            inactive: count_for(&student_counts, "inactive"),
            new_this_month: new_this_month.0,
        },
        visitors: VisitorsOverview {
            currently_inside: currently_inside.0,
            today_total: today_visitors.0,
            this_week_total: week_visitors.0,
        },
        financial: FinancialOverview {
            monthly_revenue: monthly_revenue.0.unwrap_or(0.0),
            pending_payments: pending.0,
            total_pending: pending_total,
            collection_rate: if billed_total > 0.0 {
                (paid_total / billed_total * 1000.0).round() / 10.0
            } else {
                0.0
            },
        },
    };

    Ok(HttpResponse::Ok().json(overview))
}

// ==================== RECENT ACTIVITY ====================

#[derive(Debug, Serialize)]
pub struct ActivityEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
    pub timestamp: String,
    pub user: String,
}

/// Static placeholder feed. There is no activity log table; a real feed would
/// need one.
pub async fn get_recent_activity() -> ApiResult<HttpResponse> {
    let now = Utc::now().to_rfc3339();

    let activities = vec![
        ActivityEntry {
            id: "1".to_string(),
            type_: "student_registration".to_string(),
            message: "New student registered".to_string(),
            timestamp: now.clone(),
            user: "Admin".to_string(),
        },
        ActivityEntry {
            id: "2".to_string(),
            type_: "room_booking".to_string(),
            message: "New room booking created".to_string(),
            timestamp: now.clone(),
            user: "Admin".to_string(),
        },
        ActivityEntry {
            id: "3".to_string(),
            type_: "visitor_checkin".to_string(),
            message: "New visitor checked in".to_string(),
            timestamp: now,
            user: "Security".to_string(),
        },
    ];

    Ok(HttpResponse::Ok().json(activities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_state;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;

    #[actix_web::test]
    async fn test_dashboard_stats_match_seeded_data() {
        let state = seeded_state().await;

        let resp = get_dashboard_stats(state).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(stats["totalStudents"].as_i64().unwrap(), 3);
        assert_eq!(stats["totalRooms"].as_i64().unwrap(), 6);
        assert_eq!(stats["occupiedRooms"].as_i64().unwrap(), 3);
        assert_eq!(stats["totalRevenue"].as_f64().unwrap(), 6000.0);
        assert_eq!(stats["pendingPayments"].as_i64().unwrap(), 3);

        let recent_bookings = stats["recentBookings"].as_array().unwrap();
        assert_eq!(recent_bookings.len(), 3);
        // Самая свежая бронь первой
        assert_eq!(recent_bookings[0]["id"].as_str().unwrap(), "B003");

        let recent_visitors = stats["recentVisitors"].as_array().unwrap();
        assert_eq!(recent_visitors.len(), 2);
        assert_eq!(recent_visitors[0]["id"].as_str().unwrap(), "V003");
    }

    #[actix_web::test]
    async fn test_system_overview_groups_by_category() {
        let state = seeded_state().await;

        let resp = get_system_overview(state).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let overview: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(overview["hostels"]["total"].as_i64().unwrap(), 3);
        assert_eq!(overview["hostels"]["mixedHostels"].as_i64().unwrap(), 1);
        assert_eq!(overview["rooms"]["occupied"].as_i64().unwrap(), 3);
        assert_eq!(overview["rooms"]["maintenance"].as_i64().unwrap(), 1);
        assert_eq!(overview["students"]["active"].as_i64().unwrap(), 3);
        assert_eq!(overview["visitors"]["currentlyInside"].as_i64().unwrap(), 2);
        // Засеянные брони не в текущем месяце
        assert_eq!(overview["financial"]["monthlyRevenue"].as_f64().unwrap(), 0.0);
        assert_eq!(overview["financial"]["totalPending"].as_f64().unwrap(), 8000.0);
    }

    #[actix_web::test]
    async fn test_recent_activity_is_placeholder() {
        let resp = get_recent_activity().await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let activities: serde_json::Value = serde_json::from_slice(&body).unwrap();

        let entries = activities.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["type"].as_str().unwrap(), "student_registration");
    }
}
