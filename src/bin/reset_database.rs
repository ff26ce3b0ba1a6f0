#[cfg(feature = "ssr")]
use event_submissions::{establish_connection, reset_database};

#[cfg(feature = "ssr")]
fn main() {
    let mut conn = establish_connection();
    reset_database(&mut conn).expect("Failed to reset database");
    println!("All submissions and admin sessions have been removed.");
}

#[cfg(not(feature = "ssr"))]
fn main() {
    println!("This binary requires the 'ssr' feature to be enabled.");
}
