// src/room_handlers.rs
//! Обработчики для управления комнатами

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::ids::{next_id, IdEntity};
use crate::models::{
    encode_list_column, CreateRoomRequest, Room, RoomRow, RoomStatus, RoomType, UpdateRoomRequest,
};
use crate::AppState;

// ==================== GET ALL ROOMS ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub hostel_id: Option<String>,
    pub available: Option<String>,
}

pub async fn get_all_rooms(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<RoomListQuery>,
) -> ApiResult<HttpResponse> {
    let mut sql = String::from("SELECT * FROM rooms WHERE 1=1");
    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if query.type_.is_some() {
        sql.push_str(" AND type = ?");
    }
    if query.hostel_id.is_some() {
        sql.push_str(" AND hostel_id = ?");
    }
    if query.available.as_deref() == Some("true") {
        sql.push_str(" AND status = 'available' AND occupancy < capacity");
    }

    let mut q = sqlx::query_as::<_, RoomRow>(&sql);
    if let Some(ref status) = query.status {
        q = q.bind(status);
    }
    if let Some(ref type_) = query.type_ {
        q = q.bind(type_);
    }
    if let Some(ref hostel_id) = query.hostel_id {
        q = q.bind(hostel_id);
    }

    let rows = q.fetch_all(&app_state.db_pool).await?;
    let rooms: Vec<Room> = rows.into_iter().map(Room::from).collect();
    Ok(HttpResponse::Ok().json(rooms))
}

// ==================== GET ROOM BY ID ====================

pub async fn get_room(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let room_id = path.into_inner();

    let row: Option<RoomRow> = sqlx::query_as("SELECT * FROM rooms WHERE id = ?")
        .bind(&room_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    match row {
        Some(r) => Ok(HttpResponse::Ok().json(Room::from(r))),
        None => Err(ApiError::not_found("Room")),
    }
}

// ==================== CREATE ROOM ====================

pub async fn create_room(
    app_state: web::Data<Arc<AppState>>,
    room: web::Json<CreateRoomRequest>,
) -> ApiResult<HttpResponse> {
    room.validate()?;

    if !RoomType::is_valid(&room.type_) {
        return Err(ApiError::bad_request(
            "Invalid type. Must be: single, double, triple, or quad",
        ));
    }

    // Комната создаётся только в существующем общежитии
    let hostel: Option<(String,)> = sqlx::query_as("SELECT id FROM hostels WHERE id = ?")
        .bind(&room.hostel_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    if hostel.is_none() {
        return Err(ApiError::bad_request("Hostel not found"));
    }

    let amenities = encode_list_column(room.amenities.as_deref().unwrap_or(&[]));

    let mut tx = app_state.db_pool.begin().await?;
    let id = next_id(&mut *tx, IdEntity::Room).await?;

    sqlx::query(
        r#"
        INSERT INTO rooms (id, number, hostel_id, capacity, occupancy, type, monthly_fee, status, amenities, floor)
        VALUES (?, ?, ?, ?, 0, ?, ?, 'available', ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&room.number)
    .bind(&room.hostel_id)
    .bind(room.capacity)
    .bind(&room.type_)
    .bind(room.monthly_fee)
    .bind(&amenities)
    .bind(room.floor)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let created: RoomRow = sqlx::query_as("SELECT * FROM rooms WHERE id = ?")
        .bind(&id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("🚪 Created room: {} ({})", created.number, id);
    Ok(HttpResponse::Created().json(Room::from(created)))
}

// ==================== UPDATE ROOM ====================

pub async fn update_room(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    update: web::Json<UpdateRoomRequest>,
) -> ApiResult<HttpResponse> {
    update.validate()?;
    let room_id = path.into_inner();

    let existing: Option<RoomRow> = sqlx::query_as("SELECT * FROM rooms WHERE id = ?")
        .bind(&room_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    let existing = existing.ok_or_else(|| ApiError::not_found("Room"))?;

    if let Some(ref status) = update.status {
        if !RoomStatus::is_valid(status) {
            return Err(ApiError::bad_request(
                "Invalid status. Must be: available, occupied, or maintenance",
            ));
        }
    }
    if let Some(ref type_) = update.type_ {
        if !RoomType::is_valid(type_) {
            return Err(ApiError::bad_request(
                "Invalid type. Must be: single, double, triple, or quad",
            ));
        }
    }

    let number = update.number.as_ref().unwrap_or(&existing.number);
    let hostel_id = update.hostel_id.as_ref().unwrap_or(&existing.hostel_id);
    let capacity = update.capacity.unwrap_or(existing.capacity);
    let occupancy = update.occupancy.unwrap_or(existing.occupancy);
    let type_ = update.type_.as_ref().unwrap_or(&existing.type_);
    let monthly_fee = update.monthly_fee.unwrap_or(existing.monthly_fee);
    let status = update.status.as_ref().unwrap_or(&existing.status);
    let amenities = match update.amenities {
        Some(ref items) => encode_list_column(items),
        None => existing.amenities.clone().unwrap_or_else(|| "[]".to_string()),
    };
    let floor = update.floor.unwrap_or(existing.floor);

    // Заполненность не может превышать вместимость
    if occupancy > capacity {
        return Err(ApiError::occupancy_exceeds_capacity(occupancy, capacity));
    }

    sqlx::query(
        r#"
        UPDATE rooms
        SET number = ?, hostel_id = ?, capacity = ?, occupancy = ?, type = ?,
            monthly_fee = ?, status = ?, amenities = ?, floor = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(number)
    .bind(hostel_id)
    .bind(capacity)
    .bind(occupancy)
    .bind(type_)
    .bind(monthly_fee)
    .bind(status)
    .bind(&amenities)
    .bind(floor)
    .bind(Utc::now())
    .bind(&room_id)
    .execute(&app_state.db_pool)
    .await?;

    let updated: RoomRow = sqlx::query_as("SELECT * FROM rooms WHERE id = ?")
        .bind(&room_id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("🚪 Updated room: {} ({})", updated.number, room_id);
    Ok(HttpResponse::Ok().json(Room::from(updated)))
}

// ==================== DELETE ROOM ====================

pub async fn delete_room(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let room_id = path.into_inner();

    let result = sqlx::query("DELETE FROM rooms WHERE id = ?")
        .bind(&room_id)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Room"));
    }

    info!("🚪 Deleted room: {}", room_id);
    Ok(HttpResponse::NoContent().finish())
}

// ==================== ROOM STATISTICS ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub total_rooms: i64,
    pub available_rooms: i64,
    pub occupied_rooms: i64,
    pub maintenance_rooms: i64,
    pub average_fee: i64,
    pub occupancy_rate: i64,
}

pub async fn get_room_stats(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms")
        .fetch_one(&app_state.db_pool)
        .await?;

    let available: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms WHERE status = 'available'")
        .fetch_one(&app_state.db_pool)
        .await?;

    let occupied: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms WHERE status = 'occupied'")
        .fetch_one(&app_state.db_pool)
        .await?;

    let maintenance: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM rooms WHERE status = 'maintenance'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let average_fee: (Option<f64>,) = sqlx::query_as("SELECT AVG(monthly_fee) FROM rooms")
        .fetch_one(&app_state.db_pool)
        .await?;

    let stats = RoomStats {
        total_rooms: total.0,
        available_rooms: available.0,
        occupied_rooms: occupied.0,
        maintenance_rooms: maintenance.0,
        average_fee: average_fee.0.unwrap_or(0.0).round() as i64,
        occupancy_rate: if total.0 > 0 {
            ((occupied.0 as f64 / total.0 as f64) * 100.0).round() as i64
        } else {
            0
        },
    };

    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_state;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use actix_web::ResponseError;

    fn sample_request() -> CreateRoomRequest {
        CreateRoomRequest {
            number: "301".to_string(),
            hostel_id: "H1".to_string(),
            capacity: 2,
            type_: "double".to_string(),
            monthly_fee: 2600.0,
            amenities: Some(vec!["AC".to_string(), "Wi-Fi".to_string()]),
            floor: 3,
        }
    }

    #[actix_web::test]
    async fn test_create_then_get_round_trips_amenities() {
        let state = seeded_state().await;

        let resp = create_room(state.clone(), web::Json(sample_request()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let created: Room = serde_json::from_slice(&body).unwrap();

        assert_eq!(created.id, "R206");
        assert_eq!(created.status, "available");
        assert_eq!(created.occupancy, 0);

        let resp = get_room(state, web::Path::from(created.id.clone()))
            .await
            .unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let fetched: Room = serde_json::from_slice(&body).unwrap();
        // Список удобств возвращается без изменений и в том же порядке
        assert_eq!(fetched.amenities, vec!["AC".to_string(), "Wi-Fi".to_string()]);
    }

    #[actix_web::test]
    async fn test_create_rejects_unknown_hostel() {
        let state = seeded_state().await;

        let mut req = sample_request();
        req.hostel_id = "H99".to_string();

        let err = create_room(state, web::Json(req)).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_list_available_filter() {
        let state = seeded_state().await;

        let query = web::Query(RoomListQuery {
            status: None,
            type_: None,
            hostel_id: None,
            available: Some("true".to_string()),
        });
        let resp = get_all_rooms(state, query).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let rooms: Vec<Room> = serde_json::from_slice(&body).unwrap();

        assert!(!rooms.is_empty());
        for room in &rooms {
            assert_eq!(room.status, "available");
            assert!(room.occupancy < room.capacity);
        }
    }

    #[actix_web::test]
    async fn test_update_rejects_occupancy_above_capacity() {
        let state = seeded_state().await;

        let update = UpdateRoomRequest {
            occupancy: Some(5),
            ..Default::default()
        };
        // R102 - одноместная комната
        let err = update_room(state, web::Path::from("R102".to_string()), web::Json(update))
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_malformed_amenities_decode_to_empty() {
        let state = seeded_state().await;

        sqlx::query("UPDATE rooms SET amenities = 'oops' WHERE id = 'R101'")
            .execute(&state.db_pool)
            .await
            .unwrap();

        let resp = get_room(state, web::Path::from("R101".to_string()))
            .await
            .unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let room: Room = serde_json::from_slice(&body).unwrap();
        assert!(room.amenities.is_empty());
    }

    #[actix_web::test]
    async fn test_stats_match_list() {
        let state = seeded_state().await;

        let resp = get_room_stats(state.clone()).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(stats["totalRooms"].as_i64().unwrap(), 6);

        let query = web::Query(RoomListQuery {
            status: Some("occupied".to_string()),
            type_: None,
            hostel_id: None,
            available: None,
        });
        let resp = get_all_rooms(state, query).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let occupied: Vec<Room> = serde_json::from_slice(&body).unwrap();

        assert_eq!(stats["occupiedRooms"].as_i64().unwrap(), occupied.len() as i64);
    }
}
