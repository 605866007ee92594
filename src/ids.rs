// src/ids.rs
//! Short string ID generation (`ST003`, `R101`, `B002`, ...).
//!
//! External IDs keep the historical prefix + number format, but the number
//! comes from a per-entity counter row advanced with a single atomic
//! `UPDATE ... RETURNING` statement. Counting rows at insert time would let
//! two concurrent creates collide on the same ID; the counter cannot.

use sqlx::{Executor, Sqlite};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdEntity {
    Student,
    Hostel,
    Room,
    Booking,
    Visitor,
    Payment,
    MessBill,
}

impl IdEntity {
    pub fn key(&self) -> &'static str {
        match self {
            IdEntity::Student => "students",
            IdEntity::Hostel => "hostels",
            IdEntity::Room => "rooms",
            IdEntity::Booking => "bookings",
            IdEntity::Visitor => "visitors",
            IdEntity::Payment => "payments",
            IdEntity::MessBill => "mess_bills",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            IdEntity::Student => "ST",
            IdEntity::Hostel => "H",
            IdEntity::Room => "R",
            IdEntity::Booking => "B",
            IdEntity::Visitor => "V",
            IdEntity::Payment => "P",
            IdEntity::MessBill => "MB",
        }
    }

    /// Hostel IDs are historically unpadded (`H1`), the rest are zero-padded
    /// to three digits. Padding is presentation only; counters past 999 just
    /// widen the number.
    fn pad_width(&self) -> usize {
        match self {
            IdEntity::Hostel => 0,
            _ => 3,
        }
    }

    pub fn format(&self, n: i64) -> String {
        format!("{}{:0width$}", self.prefix(), n, width = self.pad_width())
    }
}

/// Reserve the next ID for an entity. Call inside the same transaction as the
/// INSERT so an aborted create does not leave a visible gap mid-request.
pub async fn next_id<'e, E>(executor: E, entity: IdEntity) -> Result<String, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let n: i64 = sqlx::query_scalar(
        "UPDATE id_counters SET next_value = next_value + 1 WHERE entity = ? RETURNING next_value",
    )
    .bind(entity.key())
    .fetch_one(executor)
    .await?;

    Ok(entity.format(n))
}

/// Move a counter past an externally assigned ID (used when seeding sample
/// rows with fixed IDs).
pub async fn bump_counter<'e, E>(
    executor: E,
    entity: IdEntity,
    at_least: i64,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE id_counters SET next_value = max(next_value, ?) WHERE entity = ?")
        .bind(at_least)
        .bind(entity.key())
        .execute(executor)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;

    #[test]
    fn test_id_format() {
        assert_eq!(IdEntity::Student.format(3), "ST003");
        assert_eq!(IdEntity::Room.format(101), "R101");
        assert_eq!(IdEntity::Booking.format(2), "B002");
        assert_eq!(IdEntity::Hostel.format(1), "H1");
        assert_eq!(IdEntity::MessBill.format(12), "MB012");
        // Счётчик за пределами трёх цифр просто расширяется
        assert_eq!(IdEntity::Student.format(1234), "ST1234");
    }

    #[actix_web::test]
    async fn test_next_id_strictly_increasing() {
        let pool = test_pool().await;

        let first = next_id(&pool, IdEntity::Booking).await.unwrap();
        let second = next_id(&pool, IdEntity::Booking).await.unwrap();

        assert_eq!(first, "B001");
        assert_eq!(second, "B002");
    }

    #[actix_web::test]
    async fn test_bump_counter() {
        let pool = test_pool().await;

        bump_counter(&pool, IdEntity::Student, 7).await.unwrap();
        let id = next_id(&pool, IdEntity::Student).await.unwrap();
        assert_eq!(id, "ST008");

        // Откат назад невозможен
        bump_counter(&pool, IdEntity::Student, 2).await.unwrap();
        let id = next_id(&pool, IdEntity::Student).await.unwrap();
        assert_eq!(id, "ST009");
    }
}
