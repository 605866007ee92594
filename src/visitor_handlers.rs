// src/visitor_handlers.rs
//! Обработчики регистрации посетителей

use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::ids::{next_id, IdEntity};
use crate::models::{CheckInVisitorRequest, Visitor};
use crate::AppState;

// ==================== GET ALL VISITORS ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorListQuery {
    pub status: Option<String>,
    pub student_id: Option<String>,
    /// Calendar day of check-in
    pub date: Option<NaiveDate>,
}

pub async fn get_all_visitors(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<VisitorListQuery>,
) -> ApiResult<HttpResponse> {
    let mut sql = String::from("SELECT * FROM visitors WHERE 1=1");
    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if query.student_id.is_some() {
        sql.push_str(" AND student_id = ?");
    }
    if query.date.is_some() {
        sql.push_str(" AND DATE(check_in_time) = ?");
    }
    sql.push_str(" ORDER BY check_in_time DESC");

    let mut q = sqlx::query_as::<_, Visitor>(&sql);
    if let Some(ref status) = query.status {
        q = q.bind(status);
    }
    if let Some(ref student_id) = query.student_id {
        q = q.bind(student_id);
    }
    if let Some(date) = query.date {
        q = q.bind(date);
    }

    let visitors = q.fetch_all(&app_state.db_pool).await?;
    Ok(HttpResponse::Ok().json(visitors))
}

// ==================== GET VISITOR BY ID ====================

pub async fn get_visitor(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let visitor_id = path.into_inner();

    let visitor: Option<Visitor> = sqlx::query_as("SELECT * FROM visitors WHERE id = ?")
        .bind(&visitor_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    match visitor {
        Some(v) => Ok(HttpResponse::Ok().json(v)),
        None => Err(ApiError::not_found("Visitor")),
    }
}

// ==================== CHECK IN ====================

pub async fn check_in_visitor(
    app_state: web::Data<Arc<AppState>>,
    visitor: web::Json<CheckInVisitorRequest>,
) -> ApiResult<HttpResponse> {
    visitor.validate()?;

    // Посетитель приходит к конкретному студенту
    let student: Option<(String,)> = sqlx::query_as("SELECT id FROM students WHERE id = ?")
        .bind(&visitor.student_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    if student.is_none() {
        return Err(ApiError::student_not_found(&visitor.student_id));
    }

    let mut tx = app_state.db_pool.begin().await?;
    let id = next_id(&mut *tx, IdEntity::Visitor).await?;

    sqlx::query(
        r#"
        INSERT INTO visitors (id, name, phone, purpose, student_id, id_proof, check_in_time, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'checked_in')
        "#,
    )
    .bind(&id)
    .bind(&visitor.name)
    .bind(&visitor.phone)
    .bind(&visitor.purpose)
    .bind(&visitor.student_id)
    .bind(&visitor.id_proof)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let created: Visitor = sqlx::query_as("SELECT * FROM visitors WHERE id = ?")
        .bind(&id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("🚶 Checked in visitor: {} ({})", created.name, id);
    Ok(HttpResponse::Created().json(created))
}

// ==================== CHECK OUT ====================

pub async fn check_out_visitor(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let visitor_id = path.into_inner();

    let visitor: Option<Visitor> = sqlx::query_as("SELECT * FROM visitors WHERE id = ?")
        .bind(&visitor_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    let visitor = visitor.ok_or_else(|| ApiError::not_found("Visitor"))?;

    if visitor.status == "checked_out" {
        return Err(ApiError::already_checked_out());
    }

    sqlx::query(
        "UPDATE visitors SET check_out_time = ?, status = 'checked_out', updated_at = ? WHERE id = ?",
    )
    .bind(Utc::now())
    .bind(Utc::now())
    .bind(&visitor_id)
    .execute(&app_state.db_pool)
    .await?;

    let updated: Visitor = sqlx::query_as("SELECT * FROM visitors WHERE id = ?")
        .bind(&visitor_id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("🚶 Checked out visitor: {}", visitor_id);
    Ok(HttpResponse::Ok().json(updated))
}

// ==================== DELETE VISITOR ====================

pub async fn delete_visitor(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let visitor_id = path.into_inner();

    let result = sqlx::query("DELETE FROM visitors WHERE id = ?")
        .bind(&visitor_id)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Visitor"));
    }

    info!("🚶 Deleted visitor record: {}", visitor_id);
    Ok(HttpResponse::NoContent().finish())
}

// ==================== VISITOR STATISTICS ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStats {
    pub currently_inside: i64,
    pub total_today: i64,
    pub checked_out: i64,
    pub checked_in: i64,
}

pub async fn get_visitor_stats(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let today = Utc::now().date_naive();

    let currently_inside: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM visitors WHERE status = 'checked_in'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let total_today: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM visitors WHERE DATE(check_in_time) = ?")
            .bind(today)
            .fetch_one(&app_state.db_pool)
            .await?;

    let checked_out_today: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM visitors WHERE DATE(check_in_time) = ? AND status = 'checked_out'",
    )
    .bind(today)
    .fetch_one(&app_state.db_pool)
    .await?;

    let stats = VisitorStats {
        currently_inside: currently_inside.0,
        total_today: total_today.0,
        checked_out: checked_out_today.0,
        checked_in: total_today.0 - checked_out_today.0,
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

    fn sample_request() -> CheckInVisitorRequest {
        CheckInVisitorRequest {
            name: "Grace Njeri".to_string(),
            phone: "+254 700 123 456".to_string(),
            purpose: "Family Visit".to_string(),
            student_id: "ST002".to_string(),
            id_proof: "Kenyan ID".to_string(),
        }
    }

    #[actix_web::test]
    async fn test_check_in_then_get() {
        let state = seeded_state().await;

        let resp = check_in_visitor(state.clone(), web::Json(sample_request()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let created: Visitor = serde_json::from_slice(&body).unwrap();

        assert_eq!(created.id, "V004");
        assert_eq!(created.status, "checked_in");
        assert!(created.check_out_time.is_none());

        let resp = get_visitor(state, web::Path::from(created.id.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_check_in_rejects_unknown_student() {
        let state = seeded_state().await;

        let mut req = sample_request();
        req.student_id = "ST999".to_string();

        let err = check_in_visitor(state, web::Json(req)).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_check_out_once_only() {
        let state = seeded_state().await;

        // V001 засеян как checked_in
        let resp = check_out_visitor(state.clone(), web::Path::from("V001".to_string()))
            .await
            .unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let checked_out: Visitor = serde_json::from_slice(&body).unwrap();
        assert_eq!(checked_out.status, "checked_out");
        assert!(checked_out.check_out_time.is_some());

        // Повторный check-out отклоняется, время выхода не меняется
        let err = check_out_visitor(state.clone(), web::Path::from("V001".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);

        let resp = get_visitor(state, web::Path::from("V001".to_string()))
            .await
            .unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let after: Visitor = serde_json::from_slice(&body).unwrap();
        assert_eq!(after.check_out_time, checked_out.check_out_time);
    }

    #[actix_web::test]
    async fn test_list_filter_by_student() {
        let state = seeded_state().await;

        let query = web::Query(VisitorListQuery {
            status: None,
            student_id: Some("ST001".to_string()),
            date: None,
        });
        let resp = get_all_visitors(state, query).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let visitors: Vec<Visitor> = serde_json::from_slice(&body).unwrap();

        assert_eq!(visitors.len(), 2);
        for v in &visitors {
            assert_eq!(v.student_id, "ST001");
        }
        // Сортировка: самые свежие визиты первыми
        assert!(visitors[0].check_in_time >= visitors[1].check_in_time);
    }

    #[actix_web::test]
    async fn test_stats_count_todays_check_ins() {
        let state = seeded_state().await;

        // Засеянные визиты датированы 2024 годом и в "сегодня" не попадают
        check_in_visitor(state.clone(), web::Json(sample_request()))
            .await
            .unwrap();

        let resp = get_visitor_stats(state).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(stats["totalToday"].as_i64().unwrap(), 1);
        assert_eq!(stats["checkedIn"].as_i64().unwrap(), 1);
        // Внутри: двое засеянных + новый посетитель
        assert_eq!(stats["currentlyInside"].as_i64().unwrap(), 3);
    }
}
