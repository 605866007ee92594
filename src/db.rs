// src/db.rs - Database migrations, seeding and setup

use anyhow::Result;
use sqlx::SqlitePool;

use crate::ids::{bump_counter, IdEntity};

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys and WAL mode
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;

    // Create students table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY,
            registration_number TEXT NOT NULL UNIQUE CHECK(length(registration_number) > 0 AND length(registration_number) <= 20),
            first_name TEXT NOT NULL CHECK(length(first_name) > 0 AND length(first_name) <= 50),
            last_name TEXT NOT NULL CHECK(length(last_name) > 0 AND length(last_name) <= 50),
            email TEXT NOT NULL UNIQUE CHECK(length(email) >= 5 AND length(email) <= 100),
            phone TEXT NOT NULL CHECK(length(phone) > 0 AND length(phone) <= 20),
            course TEXT NOT NULL CHECK(length(course) > 0 AND length(course) <= 100),
            year INTEGER NOT NULL CHECK(year >= 1),
            gender TEXT NOT NULL CHECK(gender IN ('male', 'female')),
            date_of_birth DATE NOT NULL,
            address TEXT NOT NULL,
            guardian_name TEXT NOT NULL CHECK(length(guardian_name) > 0 AND length(guardian_name) <= 100),
            guardian_phone TEXT NOT NULL CHECK(length(guardian_phone) > 0 AND length(guardian_phone) <= 20),
            room_id TEXT,
            status TEXT NOT NULL DEFAULT 'active' CHECK(
                status IN ('active', 'inactive', 'graduated')
            ),
            join_date DATE NOT NULL,
            profile_image TEXT,
            created_at DATETIME NOT NULL DEFAULT (datetime('now')),
            updated_at DATETIME NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create hostels table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hostels (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 100),
            address TEXT NOT NULL,
            total_rooms INTEGER NOT NULL DEFAULT 0 CHECK(total_rooms >= 0),
            occupied_rooms INTEGER NOT NULL DEFAULT 0 CHECK(occupied_rooms >= 0),
            type TEXT NOT NULL CHECK(type IN ('male', 'female', 'mixed')),
            facilities TEXT,
            warden TEXT NOT NULL CHECK(length(warden) > 0 AND length(warden) <= 100),
            warden_contact TEXT NOT NULL CHECK(length(warden_contact) > 0 AND length(warden_contact) <= 20),
            created_at DATETIME NOT NULL DEFAULT (datetime('now')),
            updated_at DATETIME NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create rooms table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rooms (
            id TEXT PRIMARY KEY,
            number TEXT NOT NULL CHECK(length(number) > 0 AND length(number) <= 10),
            hostel_id TEXT NOT NULL,
            capacity INTEGER NOT NULL CHECK(capacity >= 1),
            occupancy INTEGER NOT NULL DEFAULT 0 CHECK(occupancy >= 0),
            type TEXT NOT NULL CHECK(type IN ('single', 'double', 'triple', 'quad')),
            monthly_fee REAL NOT NULL CHECK(monthly_fee >= 0),
            status TEXT NOT NULL DEFAULT 'available' CHECK(
                status IN ('available', 'occupied', 'maintenance')
            ),
            amenities TEXT,
            floor INTEGER NOT NULL,
            created_at DATETIME NOT NULL DEFAULT (datetime('now')),
            updated_at DATETIME NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (hostel_id) REFERENCES hostels (id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create bookings table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookings (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            room_id TEXT NOT NULL,
            start_date DATE NOT NULL,
            end_date DATE,
            status TEXT NOT NULL DEFAULT 'pending' CHECK(
                status IN ('pending', 'confirmed', 'cancelled', 'completed')
            ),
            booking_date DATE NOT NULL,
            amount REAL NOT NULL CHECK(amount >= 0),
            created_at DATETIME NOT NULL DEFAULT (datetime('now')),
            updated_at DATETIME NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (student_id) REFERENCES students (id) ON DELETE CASCADE,
            FOREIGN KEY (room_id) REFERENCES rooms (id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create visitors table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS visitors (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 100),
            phone TEXT NOT NULL CHECK(length(phone) > 0 AND length(phone) <= 20),
            purpose TEXT NOT NULL CHECK(length(purpose) > 0 AND length(purpose) <= 200),
            student_id TEXT NOT NULL,
            check_in_time DATETIME NOT NULL,
            check_out_time DATETIME,
            id_proof TEXT NOT NULL CHECK(length(id_proof) > 0 AND length(id_proof) <= 50),
            status TEXT NOT NULL DEFAULT 'checked_in' CHECK(
                status IN ('checked_in', 'checked_out')
            ),
            created_at DATETIME NOT NULL DEFAULT (datetime('now')),
            updated_at DATETIME NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (student_id) REFERENCES students (id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create payments table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            type TEXT NOT NULL CHECK(
                type IN ('room_fee', 'mess_bill', 'maintenance', 'security_deposit')
            ),
            amount REAL NOT NULL CHECK(amount >= 0),
            due_date DATE NOT NULL,
            paid_date DATE,
            status TEXT NOT NULL DEFAULT 'pending' CHECK(
                status IN ('pending', 'paid', 'overdue')
            ),
            description TEXT NOT NULL DEFAULT '',
            created_at DATETIME NOT NULL DEFAULT (datetime('now')),
            updated_at DATETIME NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (student_id) REFERENCES students (id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create mess_bills table. Storage only: no route handlers exist for
    // mess bills, billing rows are written by the mess module offline.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mess_bills (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            month TEXT NOT NULL CHECK(length(month) > 0 AND length(month) <= 20),
            year INTEGER NOT NULL,
            amount REAL NOT NULL CHECK(amount >= 0),
            days_present INTEGER NOT NULL CHECK(days_present >= 0),
            total_days INTEGER NOT NULL CHECK(total_days >= 1),
            status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending', 'paid')),
            due_date DATE NOT NULL,
            created_at DATETIME NOT NULL DEFAULT (datetime('now')),
            updated_at DATETIME NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (student_id) REFERENCES students (id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Per-entity ID counters, advanced atomically in ids::next_id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS id_counters (
            entity TEXT PRIMARY KEY,
            next_value INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO id_counters (entity, next_value) VALUES
        ('students', 0), ('hostels', 0), ('rooms', 0), ('bookings', 0),
        ('visitors', 0), ('payments', 0), ('mess_bills', 0)
        "#,
    )
    .execute(pool)
    .await?;

    // ==================== CREATE INDEXES ====================

    let index_queries = [
        "CREATE INDEX IF NOT EXISTS idx_students_status ON students(status)",
        "CREATE INDEX IF NOT EXISTS idx_students_course ON students(course)",
        "CREATE INDEX IF NOT EXISTS idx_rooms_hostel ON rooms(hostel_id)",
        "CREATE INDEX IF NOT EXISTS idx_rooms_status ON rooms(status)",
        "CREATE INDEX IF NOT EXISTS idx_rooms_type ON rooms(type)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_student ON bookings(student_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_room ON bookings(room_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_date ON bookings(booking_date)",
        "CREATE INDEX IF NOT EXISTS idx_visitors_student ON visitors(student_id)",
        "CREATE INDEX IF NOT EXISTS idx_visitors_status ON visitors(status)",
        "CREATE INDEX IF NOT EXISTS idx_visitors_checkin ON visitors(check_in_time)",
        "CREATE INDEX IF NOT EXISTS idx_payments_student ON payments(student_id)",
        "CREATE INDEX IF NOT EXISTS idx_payments_status ON payments(status)",
        "CREATE INDEX IF NOT EXISTS idx_payments_due ON payments(due_date)",
        "CREATE INDEX IF NOT EXISTS idx_mess_bills_student ON mess_bills(student_id)",
    ];

    for query in index_queries.iter() {
        let _ = sqlx::query(query).execute(pool).await;
    }

    Ok(())
}

// ==================== SAMPLE DATA ====================

/// Idempotently seed the sample data set. Rows that already exist are left
/// untouched, and the ID counters are moved past the seeded IDs so generated
/// IDs never collide with them.
pub async fn seed_database(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO hostels (id, name, address, total_rooms, occupied_rooms, type, facilities, warden, warden_contact) VALUES
        ('H1', 'NYOOTI HOSTELS - Block A', 'University Campus, Block A', 50, 42, 'mixed', '["24/7 Security", "Wi-Fi", "Laundry Room", "Common Room", "Study Hall", "Cafeteria", "Gym", "Parking"]', 'Mr. Kwame Asante', '+254 701 111 222'),
        ('H2', 'NYOOTI HOSTELS - Block B', 'University Campus, Block B', 40, 35, 'female', '["24/7 Security", "Wi-Fi", "Laundry Room", "Common Room", "Study Hall", "Beauty Salon", "Parking"]', 'Mrs. Akosua Mensah', '+254 722 333 444'),
        ('H3', 'NYOOTI HOSTELS - Block C', 'University Campus, Block C', 60, 51, 'male', '["24/7 Security", "Wi-Fi", "Laundry Room", "Common Room", "Study Hall", "Sports Facility", "Barber Shop", "Parking"]', 'Mr. Joseph Boateng', '+254 733 555 666')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO rooms (id, number, hostel_id, capacity, occupancy, type, monthly_fee, status, amenities, floor) VALUES
        ('R101', '101', 'H1', 2, 2, 'double', 2500, 'occupied', '["AC", "Wi-Fi", "Study Table", "Wardrobe"]', 1),
        ('R102', '102', 'H1', 1, 0, 'single', 3500, 'available', '["AC", "Wi-Fi", "Study Table", "Balcony", "Wardrobe"]', 1),
        ('R201', '201', 'H1', 3, 3, 'triple', 2000, 'occupied', '["Fan", "Wi-Fi", "Study Table", "Wardrobe"]', 2),
        ('R202', '202', 'H1', 2, 0, 'double', 2500, 'maintenance', '["AC", "Wi-Fi", "Study Table", "Wardrobe"]', 2),
        ('R203', '203', 'H1', 4, 1, 'quad', 1800, 'available', '["Fan", "Wi-Fi", "Study Table", "Wardrobe"]', 2),
        ('R205', '205', 'H2', 2, 1, 'double', 2800, 'occupied', '["AC", "Wi-Fi", "Study Table", "Wardrobe", "Balcony"]', 2)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO students (id, registration_number, first_name, last_name, email, phone, course, year, gender, date_of_birth, address, guardian_name, guardian_phone, room_id, status, join_date) VALUES
        ('ST001', 'ST2024001', 'John', 'Mensah', 'john.mensah@student.edu', '+254 712 345 678', 'Computer Science', 2, 'male', '2002-05-15', '123 Main Street, Nairobi', 'Mary Mensah', '+254 722 987 654', 'R101', 'active', '2024-01-15'),
        ('ST002', 'ST2024002', 'Akosua', 'Asante', 'akosua.asante@student.edu', '+254 733 555 012', 'Business Administration', 3, 'female', '2001-08-22', '456 Oak Avenue, Mombasa', 'Kwame Asante', '+254 701 111 222', 'R205', 'active', '2023-09-10'),
        ('ST003', 'ST2024003', 'David', 'Ochieng', 'david.ochieng@student.edu', '+254 744 777 888', 'Engineering', 1, 'male', '2003-03-10', '789 Pine Street, Kisumu', 'Sarah Ochieng', '+254 755 999 000', 'R102', 'active', '2024-01-20')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO bookings (id, student_id, room_id, start_date, end_date, status, booking_date, amount) VALUES
        ('B001', 'ST001', 'R101', '2024-01-15', NULL, 'confirmed', '2024-01-10', 2500),
        ('B002', 'ST002', 'R205', '2024-01-20', NULL, 'pending', '2024-01-12', 3000),
        ('B003', 'ST003', 'R102', '2024-02-01', '2024-06-30', 'confirmed', '2024-01-18', 3500)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO visitors (id, name, phone, purpose, student_id, check_in_time, check_out_time, id_proof, status) VALUES
        ('V001', 'John Doe', '+254 712 345 678', 'Parent Visit', 'ST001', '2024-01-15 10:30:00', NULL, 'Kenyan ID', 'checked_in'),
        ('V002', 'Mary Smith', '+254 722 987 654', 'Friend Visit', 'ST002', '2024-01-15 14:15:00', '2024-01-15 18:30:00', 'Passport', 'checked_out'),
        ('V003', 'David Wilson', '+254 733 555 012', 'Academic Meeting', 'ST001', '2024-01-15 16:45:00', NULL, 'Driver''s License', 'checked_in')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO payments (id, student_id, type, amount, due_date, paid_date, status, description) VALUES
        ('P001', 'ST001', 'room_fee', 3000, '2024-02-01', '2024-01-28', 'paid', 'January 2024 Room Fee'),
        ('P002', 'ST002', 'mess_bill', 2500, '2024-02-01', NULL, 'pending', 'January 2024 Mess Bill'),
        ('P003', 'ST003', 'security_deposit', 5000, '2024-01-15', '2024-01-10', 'paid', 'Security Deposit'),
        ('P004', 'ST001', 'mess_bill', 2500, '2024-02-01', NULL, 'pending', 'January 2024 Mess Bill'),
        ('P005', 'ST002', 'room_fee', 3000, '2024-02-01', NULL, 'pending', 'January 2024 Room Fee')
        "#,
    )
    .execute(pool)
    .await?;

    // Generated IDs must start after the seeded ones
    bump_counter(pool, IdEntity::Hostel, 3).await?;
    bump_counter(pool, IdEntity::Room, 205).await?;
    bump_counter(pool, IdEntity::Student, 3).await?;
    bump_counter(pool, IdEntity::Booking, 3).await?;
    bump_counter(pool, IdEntity::Visitor, 3).await?;
    bump_counter(pool, IdEntity::Payment, 5).await?;

    log::info!("🌱 Sample data seeded");
    Ok(())
}

// ==================== TEST SUPPORT ====================


#[cfg(test)]
mod tests {
    use super::test_support::test_pool;
    use super::*;

    #[actix_web::test]
    async fn test_migrations_are_idempotent() {
        let pool = test_pool().await;
        run_migrations(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        for expected in [
            "students",
            "hostels",
            "rooms",
            "bookings",
            "visitors",
            "payments",
            "mess_bills",
            "id_counters",
        ] {
            assert!(names.contains(&expected), "missing table {}", expected);
        }
    }

    #[actix_web::test]
    async fn test_seed_is_idempotent() {
        let pool = test_pool().await;
        seed_database(&pool).await.unwrap();
        seed_database(&pool).await.unwrap();

        let students: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(students.0, 3);

        let payments: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(payments.0, 5);
    }

    #[actix_web::test]
    async fn test_student_delete_cascades() {
        let pool = test_pool().await;
        seed_database(&pool).await.unwrap();

        sqlx::query("DELETE FROM students WHERE id = 'ST001'")
            .execute(&pool)
            .await
            .unwrap();

        let bookings: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE student_id = 'ST001'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(bookings.0, 0);

        let visitors: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM visitors WHERE student_id = 'ST001'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(visitors.0, 0);

        let payments: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM payments WHERE student_id = 'ST001'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(payments.0, 0);
    }

    #[actix_web::test]
    async fn test_hostel_delete_cascades_to_rooms() {
        let pool = test_pool().await;
        seed_database(&pool).await.unwrap();

        sqlx::query("DELETE FROM hostels WHERE id = 'H1'")
            .execute(&pool)
            .await
            .unwrap();

        let rooms: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms WHERE hostel_id = 'H1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rooms.0, 0);
    }
}
