#[cfg(feature = "ssr")]
use event_submissions::model::SubmissionRecord;
#[cfg(feature = "ssr")]
use event_submissions::{establish_connection, insert_submissions};

/// Appends a JSON array of submission records (the same shape `/api/websites` serves) to an
/// event.
#[cfg(feature = "ssr")]
fn main() {
    let args: Vec<String> = std::env::args().collect();
    let [_, event_code, path] = args.as_slice() else {
        eprintln!("Usage: import_submissions <EVENT_CODE> <FILE.json>");
        std::process::exit(2);
    };

    let contents = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));
    let records: Vec<SubmissionRecord> = serde_json::from_str(&contents)
        .unwrap_or_else(|e| panic!("{} is not a JSON array of submissions: {}", path, e));

    let mut conn = establish_connection();
    let inserted =
        insert_submissions(&mut conn, event_code, &records).expect("Failed to insert submissions");
    println!("Imported {} submissions into event {}.", inserted, event_code);
}

#[cfg(not(feature = "ssr"))]
fn main() {
    println!("This binary requires the 'ssr' feature to be enabled.");
}
