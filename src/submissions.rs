//! Status classification and filtering for an event's submissions.
//!
//! Everything here is a pure function of the record list and the selected [`FilterMode`], so the
//! same code runs during server rendering, in the hydrated client, and in tests.

use std::collections::HashMap;
use std::str::FromStr;

use thiserror::Error;

use crate::model::SubmissionRecord;

/// A submission status after lower-casing. Statuses outside the known vocabulary are kept as
/// [`NormalizedStatus::Other`] so they still show up under [`FilterMode::All`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NormalizedStatus {
    Pending,
    Approved,
    Rejected,
    Other(String),
}

impl NormalizedStatus {
    pub fn as_str(&self) -> &str {
        match self {
            NormalizedStatus::Pending => "pending",
            NormalizedStatus::Approved => "approved",
            NormalizedStatus::Rejected => "rejected",
            NormalizedStatus::Other(s) => s,
        }
    }
}

/// Normalizes a raw status. Missing and empty values count as pending; anything else is
/// lower-cased without further validation.
pub fn normalize_status(raw: Option<&str>) -> NormalizedStatus {
    let lowered = match raw {
        None | Some("") => return NormalizedStatus::Pending,
        Some(s) => s.to_lowercase(),
    };
    match lowered.as_str() {
        "pending" => NormalizedStatus::Pending,
        "approved" => NormalizedStatus::Approved,
        "rejected" => NormalizedStatus::Rejected,
        _ => NormalizedStatus::Other(lowered),
    }
}

/// Per-email list of normalized statuses, one entry per record in record order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailStatusIndex {
    by_email: HashMap<String, Vec<NormalizedStatus>>,
}

impl EmailStatusIndex {
    pub fn build(records: &[SubmissionRecord]) -> Self {
        let mut by_email: HashMap<String, Vec<NormalizedStatus>> = HashMap::new();
        for record in records {
            by_email
                .entry(record.email_key().to_string())
                .or_default()
                .push(normalize_status(record.status.as_deref()));
        }
        EmailStatusIndex { by_email }
    }

    pub fn statuses(&self, email: &str) -> Option<&[NormalizedStatus]> {
        self.by_email.get(email).map(Vec::as_slice)
    }

    /// Whether any record from `email` is approved.
    pub fn has_approval(&self, email: &str) -> bool {
        self.statuses(email)
            .is_some_and(|statuses| statuses.contains(&NormalizedStatus::Approved))
    }
}

/// The status filter offered by the event page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    #[default]
    All,
    Approved,
    Pending,
    /// Rejected submissions plus every submission from an email that was never approved.
    Rejected,
}

impl FilterMode {
    pub const ALL: [FilterMode; 4] = [
        FilterMode::All,
        FilterMode::Approved,
        FilterMode::Pending,
        FilterMode::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Approved => "approved",
            FilterMode::Pending => "pending",
            FilterMode::Rejected => "rejected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterMode::All => "All",
            FilterMode::Approved => "Approved",
            FilterMode::Pending => "Pending",
            FilterMode::Rejected => "Rejected (no approvals)",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown filter mode: {0}")]
pub struct UnknownFilterMode(pub String);

impl FromStr for FilterMode {
    type Err = UnknownFilterMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownFilterMode(s.to_string()))
    }
}

/// Decides whether a record is visible under `mode`.
pub fn matches_filter(record: &SubmissionRecord, index: &EmailStatusIndex, mode: FilterMode) -> bool {
    let own = normalize_status(record.status.as_deref());
    match mode {
        FilterMode::All => true,
        FilterMode::Approved => own == NormalizedStatus::Approved,
        FilterMode::Pending => own == NormalizedStatus::Pending,
        FilterMode::Rejected => {
            // A record the index has not seen still counts its own approval.
            let approved =
                own == NormalizedStatus::Approved || index.has_approval(record.email_key());
            own == NormalizedStatus::Rejected || !approved
        }
    }
}

/// Filters `records` against a prebuilt index, keeping the original order.
pub fn filter_with_index(
    records: &[SubmissionRecord],
    index: &EmailStatusIndex,
    mode: FilterMode,
) -> Vec<SubmissionRecord> {
    if records.is_empty() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|record| matches_filter(record, index, mode))
        .cloned()
        .collect()
}

/// Builds the email index for `records` and returns the rows visible under `mode`.
pub fn filter_submissions(records: &[SubmissionRecord], mode: FilterMode) -> Vec<SubmissionRecord> {
    let index = EmailStatusIndex::build(records);
    filter_with_index(records, &index, mode)
}

/// The status text shown in the table.
pub fn display_status(record: &SubmissionRecord) -> &str {
    match record.status.as_deref() {
        None | Some("") => "Pending",
        Some(s) => s,
    }
}

/// Text colour for a status cell. Keyed on the stored status exactly as written.
pub fn status_color(record: &SubmissionRecord) -> &'static str {
    match record.status.as_deref() {
        Some("Pending") => "yellow",
        Some("Approved") => "green",
        Some("Rejected") => "red",
        _ => "#f8fbff",
    }
}

/// Returns the value unless it is missing or empty.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str, status: Option<&str>) -> SubmissionRecord {
        SubmissionRecord {
            name: format!("{} submitter", email),
            email: Some(email.to_string()),
            status: status.map(str::to_string),
            ..Default::default()
        }
    }

    fn scenario() -> Vec<SubmissionRecord> {
        vec![
            record("a@x.com", Some("Pending")),
            record("a@x.com", Some("Approved")),
            record("b@x.com", Some("Rejected")),
        ]
    }

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status(None), NormalizedStatus::Pending);
        assert_eq!(normalize_status(Some("")), NormalizedStatus::Pending);
        assert_eq!(normalize_status(Some("APPROVED")), NormalizedStatus::Approved);
        assert_eq!(normalize_status(Some("Rejected")), NormalizedStatus::Rejected);
        assert_eq!(
            normalize_status(Some("Archived")),
            NormalizedStatus::Other("archived".to_string())
        );
        // Whitespace is not trimmed.
        assert_eq!(
            normalize_status(Some(" approved")),
            NormalizedStatus::Other(" approved".to_string())
        );
    }

    #[test]
    fn test_normalize_status_idempotent() {
        for raw in [None, Some(""), Some("Pending"), Some("APPROVED"), Some("Archived"), Some("ÄÖ")] {
            let once = normalize_status(raw);
            let twice = normalize_status(Some(once.as_str()));
            assert_eq!(once, twice, "raw status {:?}", raw);
        }
    }

    #[test]
    fn test_email_status_index() {
        let mut records = scenario();
        records.push(SubmissionRecord {
            name: "No Email".to_string(),
            ..Default::default()
        });
        records.push(record("a@x.com", Some("approved")));
        let index = EmailStatusIndex::build(&records);

        assert_eq!(
            index.statuses("a@x.com"),
            Some(
                &[
                    NormalizedStatus::Pending,
                    NormalizedStatus::Approved,
                    NormalizedStatus::Approved,
                ][..]
            )
        );
        assert_eq!(index.statuses(""), Some(&[NormalizedStatus::Pending][..]));
        assert!(index.has_approval("a@x.com"));
        assert!(!index.has_approval("b@x.com"));
        assert!(index.statuses("c@x.com").is_none());
        assert!(!index.has_approval("c@x.com"));

        // Rebuilding yields the same index.
        assert_eq!(index, EmailStatusIndex::build(&records));
    }

    #[test]
    fn test_filter_scenario() {
        let records = scenario();

        let all = filter_submissions(&records, FilterMode::All);
        assert_eq!(all, records);

        let approved = filter_submissions(&records, FilterMode::Approved);
        assert_eq!(approved, vec![record("a@x.com", Some("Approved"))]);

        let pending = filter_submissions(&records, FilterMode::Pending);
        assert_eq!(pending, vec![record("a@x.com", Some("Pending"))]);

        // The pending "a" record is hidden because "a" has an approval.
        let rejected = filter_submissions(&records, FilterMode::Rejected);
        assert_eq!(rejected, vec![record("b@x.com", Some("Rejected"))]);
    }

    #[test]
    fn test_rejected_includes_never_approved_emails() {
        let records = vec![
            record("c@x.com", None),
            record("c@x.com", Some("Archived")),
            record("d@x.com", Some("Approved")),
            record("d@x.com", Some("Rejected")),
            record("d@x.com", Some("pending")),
        ];
        let rejected = filter_submissions(&records, FilterMode::Rejected);
        assert_eq!(
            rejected,
            vec![
                record("c@x.com", None),
                record("c@x.com", Some("Archived")),
                record("d@x.com", Some("Rejected")),
            ]
        );

        // Approving one of "c"'s submissions drops its other rows from the view.
        let mut approved_later = records.clone();
        approved_later.push(record("c@x.com", Some("APPROVED")));
        let rejected = filter_submissions(&approved_later, FilterMode::Rejected);
        assert_eq!(rejected, vec![record("d@x.com", Some("Rejected"))]);
    }

    #[test]
    fn test_unknown_status_only_visible_under_all() {
        let records = vec![record("e@x.com", Some("Archived")), record("e@x.com", Some("Approved"))];
        assert_eq!(filter_submissions(&records, FilterMode::All).len(), 2);
        assert!(filter_submissions(&records, FilterMode::Pending).is_empty());
        assert_eq!(
            filter_submissions(&records, FilterMode::Approved),
            vec![record("e@x.com", Some("Approved"))]
        );
        assert!(filter_submissions(&records, FilterMode::Rejected).is_empty());
    }

    #[test]
    fn test_missing_email_groups_under_empty_key() {
        let no_email = SubmissionRecord {
            name: "Anonymous".to_string(),
            status: Some("Pending".to_string()),
            ..Default::default()
        };
        let empty_email = SubmissionRecord {
            name: "Blank".to_string(),
            email: Some(String::new()),
            status: Some("Approved".to_string()),
            ..Default::default()
        };
        let records = vec![no_email, empty_email];
        assert!(filter_submissions(&records, FilterMode::Rejected).is_empty());
    }

    #[test]
    fn test_matches_filter_without_index_entry() {
        let index = EmailStatusIndex::default();
        assert!(matches_filter(&record("f@x.com", Some("Pending")), &index, FilterMode::Rejected));
        assert!(!matches_filter(&record("f@x.com", Some("Approved")), &index, FilterMode::Rejected));
    }

    #[test]
    fn test_empty_input() {
        for mode in FilterMode::ALL {
            assert!(filter_submissions(&[], mode).is_empty());
        }
    }

    #[test]
    fn test_filter_mode_parsing() {
        for mode in FilterMode::ALL {
            assert_eq!(mode.as_str().parse::<FilterMode>(), Ok(mode));
        }
        assert_eq!(FilterMode::default(), FilterMode::All);
        assert_eq!(
            "Approved".parse::<FilterMode>(),
            Err(UnknownFilterMode("Approved".to_string()))
        );
    }

    #[test]
    fn test_presentation_helpers() {
        assert_eq!(display_status(&record("g@x.com", None)), "Pending");
        assert_eq!(display_status(&record("g@x.com", Some(""))), "Pending");
        assert_eq!(display_status(&record("g@x.com", Some("approved"))), "approved");

        assert_eq!(status_color(&record("g@x.com", Some("Approved"))), "green");
        assert_eq!(status_color(&record("g@x.com", Some("Rejected"))), "red");
        assert_eq!(status_color(&record("g@x.com", Some("Pending"))), "yellow");
        assert_eq!(status_color(&record("g@x.com", Some("approved"))), "#f8fbff");
        assert_eq!(status_color(&record("g@x.com", None)), "#f8fbff");

        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(Some("https://x.com")), Some("https://x.com"));
        assert_eq!(non_empty(None), None);
    }
}
