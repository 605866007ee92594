// src/payment_handlers.rs
//! Обработчики платежей

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::ids::{next_id, IdEntity};
use crate::models::{
    CreatePaymentRequest, Payment, PaymentStatus, PaymentType, UpdatePaymentRequest,
};
use crate::AppState;

// ==================== GET ALL PAYMENTS ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub student_id: Option<String>,
}

pub async fn get_all_payments(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaymentListQuery>,
) -> ApiResult<HttpResponse> {
    let mut sql = String::from("SELECT * FROM payments WHERE 1=1");
    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if query.type_.is_some() {
        sql.push_str(" AND type = ?");
    }
    if query.student_id.is_some() {
        sql.push_str(" AND student_id = ?");
    }
    sql.push_str(" ORDER BY due_date DESC");

    let mut q = sqlx::query_as::<_, Payment>(&sql);
    if let Some(ref status) = query.status {
        q = q.bind(status);
    }
    if let Some(ref type_) = query.type_ {
        q = q.bind(type_);
    }
    if let Some(ref student_id) = query.student_id {
        q = q.bind(student_id);
    }

    let payments = q.fetch_all(&app_state.db_pool).await?;
    Ok(HttpResponse::Ok().json(payments))
}

// ==================== GET PAYMENT BY ID ====================

pub async fn get_payment(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let payment_id = path.into_inner();

    let payment: Option<Payment> = sqlx::query_as("SELECT * FROM payments WHERE id = ?")
        .bind(&payment_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    match payment {
        Some(p) => Ok(HttpResponse::Ok().json(p)),
        None => Err(ApiError::not_found("Payment")),
    }
}

// ==================== CREATE PAYMENT ====================

pub async fn create_payment(
    app_state: web::Data<Arc<AppState>>,
    payment: web::Json<CreatePaymentRequest>,
) -> ApiResult<HttpResponse> {
    payment.validate()?;

    if !PaymentType::is_valid(&payment.type_) {
        return Err(ApiError::bad_request(
            "Invalid type. Must be: room_fee, mess_bill, maintenance, or security_deposit",
        ));
    }

    // Платёж выставляется только существующему студенту
    let student: Option<(String,)> = sqlx::query_as("SELECT id FROM students WHERE id = ?")
        .bind(&payment.student_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    if student.is_none() {
        return Err(ApiError::student_not_found(&payment.student_id));
    }

    let mut tx = app_state.db_pool.begin().await?;
    let id = next_id(&mut *tx, IdEntity::Payment).await?;

    sqlx::query(
        r#"
        INSERT INTO payments (id, student_id, type, amount, due_date, description, status)
        VALUES (?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(&id)
    .bind(&payment.student_id)
    .bind(&payment.type_)
    .bind(payment.amount)
    .bind(payment.due_date)
    .bind(payment.description.as_deref().unwrap_or(""))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let created: Payment = sqlx::query_as("SELECT * FROM payments WHERE id = ?")
        .bind(&id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("💰 Created payment {} for student {}", id, created.student_id);
    Ok(HttpResponse::Created().json(created))
}

// ==================== UPDATE PAYMENT ====================

pub async fn update_payment(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    update: web::Json<UpdatePaymentRequest>,
) -> ApiResult<HttpResponse> {
    update.validate()?;
    let payment_id = path.into_inner();

    let existing: Option<Payment> = sqlx::query_as("SELECT * FROM payments WHERE id = ?")
        .bind(&payment_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    let existing = existing.ok_or_else(|| ApiError::not_found("Payment"))?;

    if let Some(ref type_) = update.type_ {
        if !PaymentType::is_valid(type_) {
            return Err(ApiError::bad_request(
                "Invalid type. Must be: room_fee, mess_bill, maintenance, or security_deposit",
            ));
        }
    }
    if let Some(ref status) = update.status {
        if !PaymentStatus::is_valid(status) {
            return Err(ApiError::bad_request(
                "Invalid status. Must be: pending, paid, or overdue",
            ));
        }
    }
    if let Some(ref student_id) = update.student_id {
        let student: Option<(String,)> = sqlx::query_as("SELECT id FROM students WHERE id = ?")
            .bind(student_id)
            .fetch_optional(&app_state.db_pool)
            .await?;
        if student.is_none() {
            return Err(ApiError::student_not_found(student_id));
        }
    }

    let student_id = update.student_id.as_ref().unwrap_or(&existing.student_id);
    let type_ = update.type_.as_ref().unwrap_or(&existing.type_);
    let amount = update.amount.unwrap_or(existing.amount);
    let due_date = update.due_date.unwrap_or(existing.due_date);
    let paid_date = update.paid_date.or(existing.paid_date);
    let status = update.status.as_ref().unwrap_or(&existing.status);
    let description = update.description.as_ref().unwrap_or(&existing.description);

    sqlx::query(
        r#"
        UPDATE payments
        SET student_id = ?, type = ?, amount = ?, due_date = ?, paid_date = ?,
            status = ?, description = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(student_id)
    .bind(type_)
    .bind(amount)
    .bind(due_date)
    .bind(paid_date)
    .bind(status)
    .bind(description)
    .bind(Utc::now())
    .bind(&payment_id)
    .execute(&app_state.db_pool)
    .await?;

    let updated: Payment = sqlx::query_as("SELECT * FROM payments WHERE id = ?")
        .bind(&payment_id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("💰 Updated payment: {}", payment_id);
    Ok(HttpResponse::Ok().json(updated))
}

// ==================== MARK PAYMENT AS PAID ====================

pub async fn mark_payment_paid(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let payment_id = path.into_inner();

    let payment: Option<Payment> = sqlx::query_as("SELECT * FROM payments WHERE id = ?")
        .bind(&payment_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    if payment.is_none() {
        return Err(ApiError::not_found("Payment"));
    }

    // Идемпотентно: повторный вызов оставляет платёж оплаченным
    sqlx::query(
        "UPDATE payments SET status = 'paid', paid_date = ?, updated_at = ? WHERE id = ?",
    )
    .bind(Utc::now().date_naive())
    .bind(Utc::now())
    .bind(&payment_id)
    .execute(&app_state.db_pool)
    .await?;

    let updated: Payment = sqlx::query_as("SELECT * FROM payments WHERE id = ?")
        .bind(&payment_id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("💰 Marked payment as paid: {}", payment_id);
    Ok(HttpResponse::Ok().json(updated))
}

// ==================== DELETE PAYMENT ====================

pub async fn delete_payment(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let payment_id = path.into_inner();

    let result = sqlx::query("DELETE FROM payments WHERE id = ?")
        .bind(&payment_id)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Payment"));
    }

    info!("💰 Deleted payment: {}", payment_id);
    Ok(HttpResponse::NoContent().finish())
}

// ==================== PAYMENT STATISTICS ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    pub total_payments: i64,
    pub paid_payments: i64,
    pub pending_payments: i64,
    pub overdue_payments: i64,
    pub total_revenue: f64,
    pub pending_amount: f64,
}

pub async fn get_payment_stats(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments")
        .fetch_one(&app_state.db_pool)
        .await?;

    let paid: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments WHERE status = 'paid'")
        .fetch_one(&app_state.db_pool)
        .await?;

    let pending: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments WHERE status = 'pending'")
        .fetch_one(&app_state.db_pool)
        .await?;

    // Просроченные: ожидающие с датой оплаты в прошлом
    let overdue: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM payments WHERE status = 'pending' AND due_date < ?")
            .bind(Utc::now().date_naive())
            .fetch_one(&app_state.db_pool)
            .await?;

    let revenue: (Option<f64>,) =
        sqlx::query_as("SELECT SUM(amount) FROM payments WHERE status = 'paid'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let pending_amount: (Option<f64>,) =
        sqlx::query_as("SELECT SUM(amount) FROM payments WHERE status = 'pending'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let stats = PaymentStats {
        total_payments: total.0,
        paid_payments: paid.0,
        pending_payments: pending.0,
        overdue_payments: overdue.0,
        total_revenue: revenue.0.unwrap_or(0.0),
        pending_amount: pending_amount.0.unwrap_or(0.0),
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
    use chrono::NaiveDate;

    fn sample_request() -> CreatePaymentRequest {
        CreatePaymentRequest {
            student_id: "ST001".to_string(),
            type_: "maintenance".to_string(),
            amount: 750.0,
            due_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            description: Some("February repairs".to_string()),
        }
    }

    #[actix_web::test]
    async fn test_create_then_get() {
        let state = seeded_state().await;

        let resp = create_payment(state.clone(), web::Json(sample_request()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let created: Payment = serde_json::from_slice(&body).unwrap();

        assert_eq!(created.id, "P006");
        assert_eq!(created.status, "pending");
        assert!(created.paid_date.is_none());

        let resp = get_payment(state, web::Path::from(created.id.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_create_rejects_unknown_student() {
        let state = seeded_state().await;

        let mut req = sample_request();
        req.student_id = "ST999".to_string();

        let err = create_payment(state, web::Json(req)).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_mark_paid_is_idempotent() {
        let state = seeded_state().await;

        // P002 засеян как pending
        let resp = mark_payment_paid(state.clone(), web::Path::from("P002".to_string()))
            .await
            .unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let first: Payment = serde_json::from_slice(&body).unwrap();
        assert_eq!(first.status, "paid");
        assert!(first.paid_date.is_some());

        let resp = mark_payment_paid(state, web::Path::from("P002".to_string()))
            .await
            .unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let second: Payment = serde_json::from_slice(&body).unwrap();
        assert_eq!(second.status, "paid");
        assert_eq!(second.paid_date, first.paid_date);
    }

    #[actix_web::test]
    async fn test_list_filter_by_type() {
        let state = seeded_state().await;

        let query = web::Query(PaymentListQuery {
            status: None,
            type_: Some("mess_bill".to_string()),
            student_id: None,
        });
        let resp = get_all_payments(state, query).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let payments: Vec<Payment> = serde_json::from_slice(&body).unwrap();

        assert_eq!(payments.len(), 2);
        for p in &payments {
            assert_eq!(p.type_, "mess_bill");
        }
    }

    #[actix_web::test]
    async fn test_stats_match_list() {
        let state = seeded_state().await;

        let resp = get_payment_stats(state.clone()).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(stats["totalPayments"].as_i64().unwrap(), 5);
        assert_eq!(stats["paidPayments"].as_i64().unwrap(), 2);
        assert_eq!(stats["pendingPayments"].as_i64().unwrap(), 3);
        // Засеянные pending-платежи просрочены с 2024-02-01
        assert_eq!(stats["overduePayments"].as_i64().unwrap(), 3);
        assert_eq!(stats["totalRevenue"].as_f64().unwrap(), 8000.0);

        let query = web::Query(PaymentListQuery {
            status: Some("pending".to_string()),
            type_: None,
            student_id: None,
        });
        let resp = get_all_payments(state, query).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let pending: Vec<Payment> = serde_json::from_slice(&body).unwrap();
        assert_eq!(pending.len(), 3);
    }

    #[actix_web::test]
    async fn test_delete_then_missing() {
        let state = seeded_state().await;

        let resp = delete_payment(state.clone(), web::Path::from("P005".to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let err = get_payment(state, web::Path::from("P005".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::NOT_FOUND);
    }
}
