// src/student_handlers.rs
//! Обработчики для управления студентами

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::ids::{next_id, IdEntity};
use crate::models::{CreateStudentRequest, Gender, Student, StudentStatus, UpdateStudentRequest};
use crate::AppState;

// ==================== GET ALL STUDENTS ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentListQuery {
    pub status: Option<String>,
    pub course: Option<String>,
    pub year: Option<i64>,
}

pub async fn get_all_students(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<StudentListQuery>,
) -> ApiResult<HttpResponse> {
    let mut sql = String::from("SELECT * FROM students WHERE 1=1");
    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if query.course.is_some() {
        sql.push_str(" AND course LIKE ?");
    }
    if query.year.is_some() {
        sql.push_str(" AND year = ?");
    }

    let mut q = sqlx::query_as::<_, Student>(&sql);
    if let Some(ref status) = query.status {
        q = q.bind(status);
    }
    if let Some(ref course) = query.course {
        q = q.bind(format!("%{}%", course));
    }
    if let Some(year) = query.year {
        q = q.bind(year);
    }

    let students = q.fetch_all(&app_state.db_pool).await?;
    Ok(HttpResponse::Ok().json(students))
}

// ==================== GET STUDENT BY ID ====================

pub async fn get_student(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let student_id = path.into_inner();

    let student: Option<Student> = sqlx::query_as("SELECT * FROM students WHERE id = ?")
        .bind(&student_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    match student {
        Some(s) => Ok(HttpResponse::Ok().json(s)),
        None => Err(ApiError::not_found("Student")),
    }
}

// ==================== CREATE STUDENT ====================

pub async fn create_student(
    app_state: web::Data<Arc<AppState>>,
    student: web::Json<CreateStudentRequest>,
) -> ApiResult<HttpResponse> {
    student.validate()?;

    if !Gender::is_valid(&student.gender) {
        return Err(ApiError::bad_request("Gender must be: male or female"));
    }

    // Регистрационный номер и email должны быть уникальны
    let existing: Option<(String,)> = sqlx::query_as(
        "SELECT id FROM students WHERE registration_number = ? OR LOWER(email) = LOWER(?)",
    )
    .bind(&student.registration_number)
    .bind(&student.email)
    .fetch_optional(&app_state.db_pool)
    .await?;

    if existing.is_some() {
        return Err(ApiError::bad_request(
            "Student with this registration number or email already exists",
        ));
    }

    let join_date = student
        .join_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let mut tx = app_state.db_pool.begin().await?;
    let id = next_id(&mut *tx, IdEntity::Student).await?;

    sqlx::query(
        r#"
        INSERT INTO students (id, registration_number, first_name, last_name, email, phone,
                              course, year, gender, date_of_birth, address, guardian_name,
                              guardian_phone, room_id, status, join_date, profile_image)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&student.registration_number)
    .bind(&student.first_name)
    .bind(&student.last_name)
    .bind(&student.email)
    .bind(&student.phone)
    .bind(&student.course)
    .bind(student.year)
    .bind(&student.gender)
    .bind(student.date_of_birth)
    .bind(&student.address)
    .bind(&student.guardian_name)
    .bind(&student.guardian_phone)
    .bind(&student.room_id)
    .bind(join_date)
    .bind(&student.profile_image)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let created: Student = sqlx::query_as("SELECT * FROM students WHERE id = ?")
        .bind(&id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("🎓 Registered student: {} {} ({})", created.first_name, created.last_name, id);
    Ok(HttpResponse::Created().json(created))
}

// ==================== UPDATE STUDENT ====================

pub async fn update_student(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    update: web::Json<UpdateStudentRequest>,
) -> ApiResult<HttpResponse> {
    update.validate()?;
    let student_id = path.into_inner();

    let existing: Option<Student> = sqlx::query_as("SELECT * FROM students WHERE id = ?")
        .bind(&student_id)
        .fetch_optional(&app_state.db_pool)
        .await?;

    let existing = existing.ok_or_else(|| ApiError::not_found("Student"))?;

    if let Some(ref status) = update.status {
        if !StudentStatus::is_valid(status) {
            return Err(ApiError::bad_request(
                "Invalid status. Must be: active, inactive, or graduated",
            ));
        }
    }
    if let Some(ref gender) = update.gender {
        if !Gender::is_valid(gender) {
            return Err(ApiError::bad_request("Gender must be: male or female"));
        }
    }

    let registration_number = update
        .registration_number
        .as_ref()
        .unwrap_or(&existing.registration_number);
    let first_name = update.first_name.as_ref().unwrap_or(&existing.first_name);
    let last_name = update.last_name.as_ref().unwrap_or(&existing.last_name);
    let email = update.email.as_ref().unwrap_or(&existing.email);
    let phone = update.phone.as_ref().unwrap_or(&existing.phone);
    let course = update.course.as_ref().unwrap_or(&existing.course);
    let year = update.year.unwrap_or(existing.year);
    let gender = update.gender.as_ref().unwrap_or(&existing.gender);
    let date_of_birth = update.date_of_birth.unwrap_or(existing.date_of_birth);
    let address = update.address.as_ref().unwrap_or(&existing.address);
    let guardian_name = update.guardian_name.as_ref().unwrap_or(&existing.guardian_name);
    let guardian_phone = update
        .guardian_phone
        .as_ref()
        .unwrap_or(&existing.guardian_phone);
    let room_id = update.room_id.clone().or(existing.room_id);
    let status = update.status.as_ref().unwrap_or(&existing.status);
    let join_date = update.join_date.unwrap_or(existing.join_date);
    let profile_image = update.profile_image.clone().or(existing.profile_image);

    sqlx::query(
        r#"
        UPDATE students
        SET registration_number = ?, first_name = ?, last_name = ?, email = ?, phone = ?,
            course = ?, year = ?, gender = ?, date_of_birth = ?, address = ?,
            guardian_name = ?, guardian_phone = ?, room_id = ?, status = ?, join_date = ?,
            profile_image = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(registration_number)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(phone)
    .bind(course)
    .bind(year)
    .bind(gender)
    .bind(date_of_birth)
    .bind(address)
    .bind(guardian_name)
    .bind(guardian_phone)
    .bind(&room_id)
    .bind(status)
    .bind(join_date)
    .bind(&profile_image)
    .bind(Utc::now())
    .bind(&student_id)
    .execute(&app_state.db_pool)
    .await?;

    let updated: Student = sqlx::query_as("SELECT * FROM students WHERE id = ?")
        .bind(&student_id)
        .fetch_one(&app_state.db_pool)
        .await?;

    info!("🎓 Updated student: {}", student_id);
    Ok(HttpResponse::Ok().json(updated))
}

// ==================== DELETE STUDENT ====================

pub async fn delete_student(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let student_id = path.into_inner();

    let result = sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(&student_id)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Student"));
    }

    info!("🎓 Deleted student: {}", student_id);
    Ok(HttpResponse::NoContent().finish())
}

// ==================== STUDENT STATISTICS ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub total_students: i64,
    pub active_students: i64,
    pub inactive_students: i64,
    pub graduated_students: i64,
}

pub async fn get_student_stats(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students")
        .fetch_one(&app_state.db_pool)
        .await?;

    let active: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students WHERE status = 'active'")
        .fetch_one(&app_state.db_pool)
        .await?;

    let inactive: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM students WHERE status = 'inactive'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let graduated: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM students WHERE status = 'graduated'")
            .fetch_one(&app_state.db_pool)
            .await?;

    let stats = StudentStats {
        total_students: total.0,
        active_students: active.0,
        inactive_students: inactive.0,
        graduated_students: graduated.0,
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

    fn sample_request() -> CreateStudentRequest {
        CreateStudentRequest {
            registration_number: "ST2024010".to_string(),
            first_name: "Ama".to_string(),
            last_name: "Owusu".to_string(),
            email: "ama.owusu@student.edu".to_string(),
            phone: "+254 700 000 001".to_string(),
            course: "Law".to_string(),
            year: 1,
            gender: "female".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2004, 2, 11).unwrap(),
            address: "12 Harbour Road, Nairobi".to_string(),
            guardian_name: "Kofi Owusu".to_string(),
            guardian_phone: "+254 700 000 002".to_string(),
            room_id: None,
            join_date: None,
            profile_image: None,
        }
    }

    #[actix_web::test]
    async fn test_create_then_get() {
        let state = seeded_state().await;

        let resp = create_student(state.clone(), web::Json(sample_request()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let created: Student = serde_json::from_slice(&body).unwrap();
        // Три студента уже засеяны, счётчик продолжает с ST004
        assert_eq!(created.id, "ST004");
        assert_eq!(created.status, "active");

        let resp = get_student(state.clone(), web::Path::from(created.id.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let fetched: Student = serde_json::from_slice(&body).unwrap();
        assert_eq!(fetched.email, "ama.owusu@student.edu");
    }

    #[actix_web::test]
    async fn test_create_rejects_duplicate_email() {
        let state = seeded_state().await;

        let mut req = sample_request();
        req.email = "john.mensah@student.edu".to_string();

        let err = create_student(state, web::Json(req)).await.unwrap_err();
        assert_eq!(
            err.error_response().status(),
            StatusCode::BAD_REQUEST,
            "duplicate email must be rejected"
        );
    }

    #[actix_web::test]
    async fn test_list_filter_by_status() {
        let state = seeded_state().await;

        // Переводим одного студента в graduated
        let update = UpdateStudentRequest {
            status: Some("graduated".to_string()),
            ..Default::default()
        };
        update_student(state.clone(), web::Path::from("ST001".to_string()), web::Json(update))
            .await
            .unwrap();

        let query = web::Query(StudentListQuery {
            status: Some("graduated".to_string()),
            course: None,
            year: None,
        });
        let resp = get_all_students(state, query).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let students: Vec<Student> = serde_json::from_slice(&body).unwrap();

        assert_eq!(students.len(), 1);
        assert_eq!(students[0].id, "ST001");
        assert_eq!(students[0].status, "graduated");
    }

    #[actix_web::test]
    async fn test_update_rejects_unknown_status() {
        let state = seeded_state().await;

        let update = UpdateStudentRequest {
            status: Some("expelled".to_string()),
            ..Default::default()
        };
        let err = update_student(state, web::Path::from("ST001".to_string()), web::Json(update))
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_delete_then_missing() {
        let state = seeded_state().await;

        let resp = delete_student(state.clone(), web::Path::from("ST003".to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let err = get_student(state, web::Path::from("ST003".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_stats_match_list() {
        let state = seeded_state().await;

        let resp = get_student_stats(state.clone()).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();

        let query = web::Query(StudentListQuery {
            status: Some("active".to_string()),
            course: None,
            year: None,
        });
        let resp = get_all_students(state, query).await.unwrap();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let active: Vec<Student> = serde_json::from_slice(&body).unwrap();

        assert_eq!(stats["activeStudents"].as_i64().unwrap(), active.len() as i64);
        assert_eq!(stats["totalStudents"].as_i64().unwrap(), 3);
    }
}
