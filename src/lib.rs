pub mod app;
pub mod fetch;
pub mod model;
pub mod submissions;
#[cfg(feature = "ssr")]
pub mod api;
#[cfg(feature = "ssr")]
pub mod schema;

#[cfg(feature = "ssr")]
use chrono::Utc;
#[cfg(feature = "ssr")]
use diesel::connection::SimpleConnection;
#[cfg(feature = "ssr")]
use diesel::prelude::*;
#[cfg(feature = "ssr")]
use diesel::SqliteConnection;
#[cfg(feature = "ssr")]
use dotenvy::dotenv;
#[cfg(feature = "ssr")]
use std::env;
#[cfg(feature = "ssr")]
use uuid::Uuid;

#[cfg(feature = "ssr")]
use crate::model::{NewAdminSession, NewSubmission, Submission, SubmissionRecord};
#[cfg(feature = "ssr")]
use crate::schema::admin_sessions;
#[cfg(feature = "ssr")]
use crate::schema::submissions as submissions_table;

#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    use crate::app::*;
    console_error_panic_hook::set_once();
    leptos::mount::hydrate_body(App);
}

#[cfg(feature = "ssr")]
pub fn establish_connection() -> SqliteConnection {
    dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env");
    let mut conn = SqliteConnection::establish(&database_url)
        .unwrap_or_else(|_| panic!("Error connecting to {}", database_url));

    // Enable WAL mode to allow concurrent reads during writes, and a timeout to retry locked
    // operations.
    conn.batch_execute(
        "PRAGMA foreign_keys = ON; \
        PRAGMA journal_mode = WAL; \
        PRAGMA synchronous = NORMAL; \
        PRAGMA busy_timeout = 10000;",
    )
    .expect("Failed to set SQLite PRAGMAs");

    init_schema(&mut conn).expect("Failed to create tables");

    conn
}

/// Creates the tables if they don't exist yet. Safe to run on every startup.
#[cfg(feature = "ssr")]
pub fn init_schema(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    conn.batch_execute(
        "CREATE TABLE IF NOT EXISTS submissions ( \
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \
            event_code TEXT NOT NULL, \
            name TEXT NOT NULL, \
            email TEXT, \
            status TEXT, \
            website TEXT, \
            decision_reason TEXT, \
            submitted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP \
        ); \
        CREATE INDEX IF NOT EXISTS submissions_event_code ON submissions (event_code); \
        CREATE TABLE IF NOT EXISTS admin_sessions ( \
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \
            token TEXT NOT NULL UNIQUE, \
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP \
        );",
    )
}

/// Returns every submission for an event in the order they were stored.
#[cfg(feature = "ssr")]
pub fn get_event_submissions(
    conn: &mut SqliteConnection,
    event_code: &str,
) -> Result<Vec<Submission>, diesel::result::Error> {
    submissions_table::table
        .filter(submissions_table::event_code.eq(event_code))
        .order(submissions_table::id.asc())
        .select(Submission::as_select())
        .load(conn)
}

/// Appends records to an event. Either all of them are stored or none are.
/// Returns the number of inserted rows.
#[cfg(feature = "ssr")]
pub fn insert_submissions(
    conn: &mut SqliteConnection,
    event_code: &str,
    records: &[SubmissionRecord],
) -> Result<usize, diesel::result::Error> {
    conn.transaction(|conn| {
        let now = Utc::now().naive_utc();
        let mut inserted = 0;
        for record in records {
            let new_submission = NewSubmission {
                event_code,
                name: &record.name,
                email: record.email.as_deref(),
                status: record.status.as_deref(),
                website: record.website.as_deref(),
                decision_reason: record.decision_reason.as_deref(),
                submitted_at: now,
            };
            inserted += diesel::insert_into(submissions_table::table)
                .values(&new_submission)
                .execute(conn)?;
        }
        Ok(inserted)
    })
}

/// Returns the distinct event codes that have at least one submission, sorted.
#[cfg(feature = "ssr")]
pub fn get_event_codes(conn: &mut SqliteConnection) -> Result<Vec<String>, diesel::result::Error> {
    submissions_table::table
        .select(submissions_table::event_code)
        .distinct()
        .order(submissions_table::event_code.asc())
        .load(conn)
}

/// Deletes all submissions for one event. Returns number of affected rows.
#[cfg(feature = "ssr")]
pub fn clear_event_submissions(
    conn: &mut SqliteConnection,
    event_code: &str,
) -> Result<usize, diesel::result::Error> {
    diesel::delete(submissions_table::table.filter(submissions_table::event_code.eq(event_code)))
        .execute(conn)
}

/// Creates an admin session and returns the token.
#[cfg(feature = "ssr")]
pub fn create_admin_session(conn: &mut SqliteConnection) -> Result<String, diesel::result::Error> {
    let token_str = Uuid::new_v4().to_string();
    let new_session = NewAdminSession {
        token: token_str.clone(),
    };
    diesel::insert_into(admin_sessions::table)
        .values(&new_session)
        .execute(conn)?;
    Ok(token_str)
}

/// Validates an admin token. Returns true if the provided token exists in the admin_sessions
/// table.
#[cfg(feature = "ssr")]
pub fn validate_admin_token(
    conn: &mut SqliteConnection,
    token: &str,
) -> Result<bool, diesel::result::Error> {
    if Uuid::parse_str(token).is_err() {
        return Ok(false);
    }
    let count: i64 = admin_sessions::table
        .filter(admin_sessions::token.eq(token))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// Removes a single admin session. Returns number of affected rows.
#[cfg(feature = "ssr")]
pub fn delete_admin_session(
    conn: &mut SqliteConnection,
    token: &str,
) -> Result<usize, diesel::result::Error> {
    diesel::delete(admin_sessions::table.filter(admin_sessions::token.eq(token))).execute(conn)
}

/// Wipes all submissions and admin sessions.
#[cfg(feature = "ssr")]
pub fn reset_database(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    conn.transaction(|conn| {
        diesel::delete(admin_sessions::table).execute(conn)?;
        diesel::delete(submissions_table::table).execute(conn)?;
        Ok(())
    })
}
