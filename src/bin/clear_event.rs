#[cfg(feature = "ssr")]
use event_submissions::{clear_event_submissions, establish_connection};

#[cfg(feature = "ssr")]
fn main() {
    let Some(event_code) = std::env::args().nth(1) else {
        eprintln!("Usage: clear_event <EVENT_CODE>");
        std::process::exit(2);
    };
    let mut conn = establish_connection();
    let removed =
        clear_event_submissions(&mut conn, &event_code).expect("Failed to clear submissions");
    println!("Removed {} submissions for event {}.", removed, event_code);
}

#[cfg(not(feature = "ssr"))]
fn main() {
    println!("This binary requires the 'ssr' feature to be enabled.");
}
