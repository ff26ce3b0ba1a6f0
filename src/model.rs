use chrono::NaiveDateTime;
#[cfg(feature = "ssr")]
use diesel::prelude::*;
#[cfg(feature = "ssr")]
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Deserializer, Serialize};

/// A single submission as served by `/api/websites/{eventCode}`. One email can own several of
/// these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    #[serde(default, deserialize_with = "string_or_null")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<String>,
}

impl SubmissionRecord {
    /// The grouping key for this record. Records without an email share the empty key.
    pub fn email_key(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A stored submission row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ssr", derive(Queryable, Selectable))]
#[cfg_attr(feature = "ssr", diesel(table_name = crate::schema::submissions))]
#[cfg_attr(feature = "ssr", diesel(check_for_backend(Sqlite)))]
pub struct Submission {
    pub id: i32,
    pub event_code: String,
    pub name: String,
    pub email: Option<String>,
    pub status: Option<String>,
    pub website: Option<String>,
    pub decision_reason: Option<String>,
    pub submitted_at: NaiveDateTime,
}

impl From<Submission> for SubmissionRecord {
    fn from(row: Submission) -> Self {
        SubmissionRecord {
            name: row.name,
            email: row.email,
            status: row.status,
            website: row.website,
            decision_reason: row.decision_reason,
        }
    }
}

#[cfg(feature = "ssr")]
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::submissions)]
pub struct NewSubmission<'a> {
    pub event_code: &'a str,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub status: Option<&'a str>,
    pub website: Option<&'a str>,
    pub decision_reason: Option<&'a str>,
    pub submitted_at: NaiveDateTime,
}

#[cfg(feature = "ssr")]
#[derive(Queryable, Selectable, Debug, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::admin_sessions)]
#[diesel(check_for_backend(Sqlite))]
pub struct AdminSession {
    pub id: i32,
    pub token: String,
    pub created_at: NaiveDateTime,
}

#[cfg(feature = "ssr")]
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::admin_sessions)]
pub struct NewAdminSession {
    pub token: String,
    // created_at uses default
}
