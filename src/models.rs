// src/models.rs
//! Модели данных для системы управления общежитием
//!
//! Внешний JSON использует camelCase (контракт панели администратора),
//! колонки хранилища - snake_case.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// ==================== СПРАВОЧНЫЕ ТИПЫ ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn is_valid(s: &str) -> bool {
        matches!(s, "male" | "female")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentStatus {
    Active,
    Inactive,
    Graduated,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
            StudentStatus::Graduated => "graduated",
        }
    }

    pub fn is_valid(s: &str) -> bool {
        matches!(s, "active" | "inactive" | "graduated")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostelType {
    Male,
    Female,
    Mixed,
}

impl HostelType {
    pub fn is_valid(s: &str) -> bool {
        matches!(s, "male" | "female" | "mixed")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomType {
    Single,
    Double,
    Triple,
    Quad,
}

impl RoomType {
    pub fn is_valid(s: &str) -> bool {
        matches!(s, "single" | "double" | "triple" | "quad")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "available",
            RoomStatus::Occupied => "occupied",
            RoomStatus::Maintenance => "maintenance",
        }
    }

    pub fn is_valid(s: &str) -> bool {
        matches!(s, "available" | "occupied" | "maintenance")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn is_valid(s: &str) -> bool {
        matches!(s, "pending" | "confirmed" | "cancelled" | "completed")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentType {
    RoomFee,
    MessBill,
    Maintenance,
    SecurityDeposit,
}

impl PaymentType {
    pub fn is_valid(s: &str) -> bool {
        matches!(s, "room_fee" | "mess_bill" | "maintenance" | "security_deposit")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
        }
    }

    pub fn is_valid(s: &str) -> bool {
        matches!(s, "pending" | "paid" | "overdue")
    }
}

// ==================== LIST COLUMNS ====================

/// Decode a JSON-array column (facilities, amenities). Absence and malformed
/// content both decode to an empty list; malformed content is logged, never
/// silently swallowed.
pub fn decode_list_column(entity: &str, id: &str, raw: Option<String>) -> Vec<String> {
    let Some(text) = raw else {
        return Vec::new();
    };
    if text.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<String>>(&text) {
        Ok(items) => items,
        Err(err) => {
            log::warn!(
                "Malformed list column on {} '{}': {} (falling back to empty list)",
                entity,
                id,
                err
            );
            Vec::new()
        }
    }
}

pub fn encode_list_column(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

// ==================== STUDENT ====================

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub registration_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub course: String,
    pub year: i64,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub room_id: Option<String>,
    pub status: String,
    pub join_date: NaiveDate,
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 20, message = "Registration number must be between 1 and 20 characters"))]
    pub registration_number: String,

    #[validate(length(min = 1, max = 50, message = "First name must be between 1 and 50 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name must be between 1 and 50 characters"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, max = 20, message = "Phone must be between 1 and 20 characters"))]
    pub phone: String,

    #[validate(length(min = 1, max = 100, message = "Course must be between 1 and 100 characters"))]
    pub course: String,

    #[validate(range(min = 1, max = 10, message = "Year must be between 1 and 10"))]
    pub year: i64,

    pub gender: String,

    pub date_of_birth: NaiveDate,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, max = 100, message = "Guardian name must be between 1 and 100 characters"))]
    pub guardian_name: String,

    #[validate(length(min = 1, max = 20, message = "Guardian phone must be between 1 and 20 characters"))]
    pub guardian_phone: String,

    pub room_id: Option<String>,

    pub join_date: Option<NaiveDate>,

    #[validate(length(max = 255, message = "Profile image path cannot exceed 255 characters"))]
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 20, message = "Registration number must be between 1 and 20 characters"))]
    pub registration_number: Option<String>,

    #[validate(length(min = 1, max = 50, message = "First name must be between 1 and 50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Last name must be between 1 and 50 characters"))]
    pub last_name: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Phone must be between 1 and 20 characters"))]
    pub phone: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Course must be between 1 and 100 characters"))]
    pub course: Option<String>,

    #[validate(range(min = 1, max = 10, message = "Year must be between 1 and 10"))]
    pub year: Option<i64>,

    pub gender: Option<String>,

    pub date_of_birth: Option<NaiveDate>,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Guardian name must be between 1 and 100 characters"))]
    pub guardian_name: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Guardian phone must be between 1 and 20 characters"))]
    pub guardian_phone: Option<String>,

    pub room_id: Option<String>,

    pub status: Option<String>,

    pub join_date: Option<NaiveDate>,

    #[validate(length(max = 255, message = "Profile image path cannot exceed 255 characters"))]
    pub profile_image: Option<String>,
}

// ==================== HOSTEL ====================

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Hostel {
    pub id: String,
    pub name: String,
    pub address: String,
    pub total_rooms: i64,
    pub occupied_rooms: i64,
    #[serde(rename = "type")]
    pub type_: String,
    pub facilities: Vec<String>,
    pub warden: String,
    pub warden_contact: String,
}

/// Raw storage row; `facilities` is decoded into the entity.
#[derive(Debug, sqlx::FromRow)]
pub struct HostelRow {
    pub id: String,
    pub name: String,
    pub address: String,
    pub total_rooms: i64,
    pub occupied_rooms: i64,
    #[sqlx(rename = "type")]
    pub type_: String,
    pub facilities: Option<String>,
    pub warden: String,
    pub warden_contact: String,
}

impl From<HostelRow> for Hostel {
    fn from(row: HostelRow) -> Self {
        let facilities = decode_list_column("hostel", &row.id, row.facilities);
        Hostel {
            id: row.id,
            name: row.name,
            address: row.address,
            total_rooms: row.total_rooms,
            occupied_rooms: row.occupied_rooms,
            type_: row.type_,
            facilities,
            warden: row.warden,
            warden_contact: row.warden_contact,
        }
    }
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateHostelRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[validate(range(min = 0, message = "Total rooms must be non-negative"))]
    pub total_rooms: i64,

    #[serde(rename = "type")]
    pub type_: String,

    pub facilities: Option<Vec<String>>,

    #[validate(length(min = 1, max = 100, message = "Warden name must be between 1 and 100 characters"))]
    pub warden: String,

    #[validate(length(min = 1, max = 20, message = "Warden contact must be between 1 and 20 characters"))]
    pub warden_contact: String,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHostelRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: Option<String>,

    #[validate(range(min = 0, message = "Total rooms must be non-negative"))]
    pub total_rooms: Option<i64>,

    #[validate(range(min = 0, message = "Occupied rooms must be non-negative"))]
    pub occupied_rooms: Option<i64>,

    #[serde(rename = "type")]
    pub type_: Option<String>,

    pub facilities: Option<Vec<String>>,

    #[validate(length(min = 1, max = 100, message = "Warden name must be between 1 and 100 characters"))]
    pub warden: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Warden contact must be between 1 and 20 characters"))]
    pub warden_contact: Option<String>,
}

// ==================== ROOM ====================

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub number: String,
    pub hostel_id: String,
    pub capacity: i64,
    pub occupancy: i64,
    #[serde(rename = "type")]
    pub type_: String,
    pub monthly_fee: f64,
    pub status: String,
    pub amenities: Vec<String>,
    pub floor: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct RoomRow {
    pub id: String,
    pub number: String,
    pub hostel_id: String,
    pub capacity: i64,
    pub occupancy: i64,
    #[sqlx(rename = "type")]
    pub type_: String,
    pub monthly_fee: f64,
    pub status: String,
    pub amenities: Option<String>,
    pub floor: i64,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        let amenities = decode_list_column("room", &row.id, row.amenities);
        Room {
            id: row.id,
            number: row.number,
            hostel_id: row.hostel_id,
            capacity: row.capacity,
            occupancy: row.occupancy,
            type_: row.type_,
            monthly_fee: row.monthly_fee,
            status: row.status,
            amenities,
            floor: row.floor,
        }
    }
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 10, message = "Room number must be between 1 and 10 characters"))]
    pub number: String,

    pub hostel_id: String,

    #[validate(range(min = 1, max = 16, message = "Capacity must be between 1 and 16"))]
    pub capacity: i64,

    #[serde(rename = "type")]
    pub type_: String,

    #[validate(range(min = 0.0, message = "Monthly fee must be non-negative"))]
    pub monthly_fee: f64,

    pub amenities: Option<Vec<String>>,

    pub floor: i64,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomRequest {
    #[validate(length(min = 1, max = 10, message = "Room number must be between 1 and 10 characters"))]
    pub number: Option<String>,

    pub hostel_id: Option<String>,

    #[validate(range(min = 1, max = 16, message = "Capacity must be between 1 and 16"))]
    pub capacity: Option<i64>,

    #[validate(range(min = 0, message = "Occupancy must be non-negative"))]
    pub occupancy: Option<i64>,

    #[serde(rename = "type")]
    pub type_: Option<String>,

    #[validate(range(min = 0.0, message = "Monthly fee must be non-negative"))]
    pub monthly_fee: Option<f64>,

    pub status: Option<String>,

    pub amenities: Option<Vec<String>>,

    pub floor: Option<i64>,
}

// ==================== BOOKING ====================

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub student_id: String,
    pub room_id: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub booking_date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub student_id: String,

    pub room_id: String,

    pub start_date: NaiveDate,

    pub end_date: Option<NaiveDate>,

    #[validate(range(min = 0.0, message = "Amount must be non-negative"))]
    pub amount: f64,
}

/// Sparse update over the allow-listed booking fields. `completed` is only
/// reachable through this generic update, there is no dedicated transition.
#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub start_date: Option<NaiveDate>,

    pub end_date: Option<NaiveDate>,

    pub status: Option<String>,

    #[validate(range(min = 0.0, message = "Amount must be non-negative"))]
    pub amount: Option<f64>,
}

// ==================== PAYMENT ====================

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub student_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub type_: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub status: String,
    pub description: String,
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub student_id: String,

    #[serde(rename = "type")]
    pub type_: String,

    #[validate(range(min = 0.0, message = "Amount must be non-negative"))]
    pub amount: f64,

    pub due_date: NaiveDate,

    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub student_id: Option<String>,

    #[serde(rename = "type")]
    pub type_: Option<String>,

    #[validate(range(min = 0.0, message = "Amount must be non-negative"))]
    pub amount: Option<f64>,

    pub due_date: Option<NaiveDate>,

    pub paid_date: Option<NaiveDate>,

    pub status: Option<String>,

    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
}

// ==================== VISITOR ====================

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub purpose: String,
    pub student_id: String,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub id_proof: String,
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CheckInVisitorRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 20, message = "Phone must be between 1 and 20 characters"))]
    pub phone: String,

    #[validate(length(min = 1, max = 200, message = "Purpose must be between 1 and 200 characters"))]
    pub purpose: String,

    pub student_id: String,

    #[validate(length(min = 1, max = 50, message = "ID proof must be between 1 and 50 characters"))]
    pub id_proof: String,
}
