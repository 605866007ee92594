// src/hostel_handlers.rs
//! Обработчики для управления общежитиями

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::ids::{next_id, IdEntity};
use crate::models::{
    encode_list_column, CreateHostelRequest, Hostel, HostelRow, HostelType, UpdateHostelRequest,
};
use crate::AppState;

// ==================== GET ALL HOSTELS ====================

#[derive(Debug, Deserialize)]
pub struct HostelListQuery {
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

pub async fn get_all_hostels(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<HostelListQuery>,
) -> ApiResult<HttpResponse> {
    let mut sql = String::from("SELECT * FROM hostels WHERE 1=1");
    if query.type_.is_some() {
        sql.push_str(" AND type = ?");
    }

    let mut q = sqlx::query_as::<_, HostelRow>(&sql);
    if let Some(ref type_) = query.type_ {
        q = q.bind(type_);
    }

    let rows = q.fetch_all(&app_state.db_pool).await?;
    let hostels: Vec<Hostel> = rows.into_iter().map(Hostel::from).collect();
    Ok(HttpResponse::Ok().json(hostels))
}

// ==================== GET HOSTEL BY ID ====================

pub async fn get_hostel(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let hostel_id = path.into_inner();

    let row: Option<HostelRow> = sqlx::query_as("SELECT * FROM hostels WHERE id = ?")
        .bind(&hostel_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    match row {
        Some(h) => Ok(HttpResponse::Ok().json(Hostel::from(h))),
        None => Err(ApiError::not_found("Hostel")),
    }
}

// ==================== CREATE HOSTEL ====================

pub async fn create_hostel(
    app_state: web::Data<Arc<AppState>>,
    hostel: web::Json<CreateHostelRequest>,
) -> ApiResult<HttpResponse> {
    hostel.validate()?;

    if !HostelType::is_valid(&hostel.type_) {
        return Err(ApiError::bad_request(
            "Invalid type. Must be: male, female, or mixed",
        ));
    }

    let facilities = encode_list_column(hostel.facilities.as_deref().unwrap_or(&[]));

    let mut tx = app_state.db_pool.begin().await?;
    let id = next_id(&mut *tx, IdEntity::Hostel).await?;

    sqlx::query(
        r#"
        INSERT INTO hostels (id, name, address, total_rooms, occupied_rooms, type, facilities, warden, warden_contact)
        VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&hostel.name)
    .bind(&hostel.address)
    .bind(hostel.total_rooms)
    .bind(&hostel.type_)
    .bind(&facilities)
    .bind(&hostel.warden)
    .bind(&hostel.warden_contact)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let created: HostelRow = sqlx::query_as("SELECT * FROM hostels WHERE id = ?")
        .bind(&id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("🏢 Created hostel: {} ({})", created.name, id);
    Ok(HttpResponse::Created().json(Hostel::from(created)))
}

// ==================== UPDATE HOSTEL ====================

pub async fn update_hostel(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    update: web::Json<UpdateHostelRequest>,
) -> ApiResult<HttpResponse> {
    update.validate()?;
    let hostel_id = path.into_inner();

    let existing: Option<HostelRow> = sqlx::query_as("SELECT * FROM hostels WHERE id = ?")
        .bind(&hostel_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    let existing = existing.ok_or_else(|| ApiError::not_found("Hostel"))?;

    if let Some(ref type_) = update.type_ {
        if !HostelType::is_valid(type_) {
            return Err(ApiError::bad_request(
                "Invalid type. Must be: male, female, or mixed",
            ));
        }
    }

    let name = update.name.as_ref().unwrap_or(&existing.name);
    let address = update.address.as_ref().unwrap_or(&existing.address);
    let total_rooms = update.total_rooms.unwrap_or(existing.total_rooms);
    let occupied_rooms = update.occupied_rooms.unwrap_or(existing.occupied_rooms);
    let type_ = update.type_.as_ref().unwrap_or(&existing.type_);
    let facilities = match update.facilities {
        Some(ref items) => encode_list_column(items),
        None => existing.facilities.clone().unwrap_or_else(|| "[]".to_string()),
    };
    let warden = update.warden.as_ref().unwrap_or(&existing.warden);
    let warden_contact = update
        .warden_contact
        .as_ref()
        .unwrap_or(&existing.warden_contact);

    sqlx::query(
        r#"
        UPDATE hostels
        SET name = ?, address = ?, total_rooms = ?, occupied_rooms = ?, type = ?,
            facilities = ?, warden = ?, warden_contact = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(address)
    .bind(total_rooms)
    .bind(occupied_rooms)
    .bind(type_)
    .bind(&facilities)
    .bind(warden)
    .bind(warden_contact)
    .bind(Utc::now())
    .bind(&hostel_id)
    .execute(&app_state.db_pool)
    .await?;

    let updated: HostelRow = sqlx::query_as("SELECT * FROM hostels WHERE id = ?")
        .bind(&hostel_id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("🏢 Updated hostel: {} ({})", updated.name, hostel_id);
    Ok(HttpResponse::Ok().json(Hostel::from(updated)))
}

// ==================== DELETE HOSTEL ====================

pub async fn delete_hostel(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let hostel_id = path.into_inner();

    let result = sqlx::query("DELETE FROM hostels WHERE id = ?")
        .bind(&hostel_id)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Hostel"));
    }

    info!("🏢 Deleted hostel: {}", hostel_id);
    Ok(HttpResponse::NoContent().finish())
}

// ==================== HOSTEL STATISTICS ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostelStats {
    pub total_hostels: i64,
    pub total_rooms: i64,
    pub total_occupied: i64,
    pub available_rooms: i64,
    pub occupancy_rate: i64,
    pub male_hostels: i64,
    pub female_hostels: i64,
    pub mixed_hostels: i64,
}

pub async fn get_hostel_stats(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let totals: (i64, Option<i64>, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), SUM(total_rooms), SUM(occupied_rooms) FROM hostels",
    )
    .fetch_one(&app_state.db_pool)
    .await?;

    let male: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hostels WHERE type = 'male'")
        .fetch_one(&app_state.db_pool)
        .await?;

    let female: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hostels WHERE type = 'female'")
        .fetch_one(&app_state.db_pool)
        .await?;

    let mixed: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hostels WHERE type = 'mixed'")
        .fetch_one(&app_state.db_pool)
        .await?;

    let total_rooms = totals.1.unwrap_or(0);
    let total_occupied = totals.2.unwrap_or(0);

    let stats = HostelStats {
        total_hostels: totals.0,
        total_rooms,
        total_occupied,
        available_rooms: total_rooms - total_occupied,
        occupancy_rate: if total_rooms > 0 {
            ((total_occupied as f64 / total_rooms as f64) * 100.0).round() as i64
        } else {
            0
        },
        male_hostels: male.0,
        female_hostels: female.0,
        mixed_hostels: mixed.0,
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

    fn sample_request() -> CreateHostelRequest {
        CreateHostelRequest {
            name: "NYOOTI HOSTELS - Block D".to_string(),
            address: "University Campus, Block D".to_string(),
            total_rooms: 30,
            type_: "male".to_string(),
            facilities: Some(vec!["Wi-Fi".to_string(), "Parking".to_string()]),
            warden: "Mr. Peter Otieno".to_string(),
            warden_contact: "+254 744 000 111".to_string(),
        }
    }

    #[actix_web::test]
    async fn test_create_then_get_round_trips_facilities() {
        let state = seeded_state().await;

        let resp = create_hostel(state.clone(), web::Json(sample_request()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let created: Hostel = serde_json::from_slice(&body).unwrap();

        assert_eq!(created.id, "H4");
        assert_eq!(created.occupied_rooms, 0);

        let resp = get_hostel(state, web::Path::from(created.id.clone()))
            .await
            .unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let fetched: Hostel = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            fetched.facilities,
            vec!["Wi-Fi".to_string(), "Parking".to_string()]
        );
    }

    #[actix_web::test]
    async fn test_create_rejects_unknown_type() {
        let state = seeded_state().await;

        let mut req = sample_request();
        req.type_ = "coed".to_string();

        let err = create_hostel(state, web::Json(req)).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_list_filter_by_type() {
        let state = seeded_state().await;

        let query = web::Query(HostelListQuery {
            type_: Some("female".to_string()),
        });
        let resp = get_all_hostels(state, query).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let hostels: Vec<Hostel> = serde_json::from_slice(&body).unwrap();

        assert_eq!(hostels.len(), 1);
        assert_eq!(hostels[0].id, "H2");
    }

    #[actix_web::test]
    async fn test_update_merges_fields() {
        let state = seeded_state().await;

        let update = UpdateHostelRequest {
            warden: Some("Mrs. Grace Wanjiku".to_string()),
            ..Default::default()
        };
        let resp = update_hostel(state, web::Path::from("H2".to_string()), web::Json(update))
            .await
            .unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let updated: Hostel = serde_json::from_slice(&body).unwrap();

        assert_eq!(updated.warden, "Mrs. Grace Wanjiku");
        // Остальные поля не тронуты
        assert_eq!(updated.name, "NYOOTI HOSTELS - Block B");
        assert_eq!(updated.total_rooms, 40);
    }

    #[actix_web::test]
    async fn test_delete_cascades_to_rooms() {
        let state = seeded_state().await;

        let resp = delete_hostel(state.clone(), web::Path::from("H1".to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let query = web::Query(crate::room_handlers::RoomListQuery {
            status: None,
            type_: None,
            hostel_id: Some("H1".to_string()),
            available: None,
        });
        let resp = crate::room_handlers::get_all_rooms(state, query).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let rooms: Vec<crate::models::Room> = serde_json::from_slice(&body).unwrap();
        assert!(rooms.is_empty());
    }

    #[actix_web::test]
    async fn test_stats_match_seeded_totals() {
        let state = seeded_state().await;

        let resp = get_hostel_stats(state).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(stats["totalHostels"].as_i64().unwrap(), 3);
        assert_eq!(stats["totalRooms"].as_i64().unwrap(), 150);
        assert_eq!(stats["totalOccupied"].as_i64().unwrap(), 128);
        assert_eq!(stats["maleHostels"].as_i64().unwrap(), 1);
    }
}
