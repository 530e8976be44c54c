use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use centsible::initialize_db;

/// A utility for creating a database pre-filled with demo data for centsible.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Inserting demo data...");

    conn.execute_batch(
        "INSERT INTO category (name) VALUES ('Groceries'), ('Rent'), ('Transport'), ('Salary');
        INSERT INTO category (name, parent_id) VALUES ('Takeaways', 1);",
    )?;

    let today = OffsetDateTime::now_utc().date();
    let mut insert = conn.prepare(
        "INSERT INTO \"transaction\" (amount, kind, date, description, category_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    for months_ago in 0..6i64 {
        let payday = today - Duration::days(30 * months_ago);

        insert.execute((4200.0, "income", payday, "Monthly salary", Some(4)))?;
        insert.execute((1800.0, "expense", payday, "Rent", Some(2)))?;
        insert.execute((
            420.0 + 20.0 * months_ago as f64,
            "expense",
            payday - Duration::days(3),
            "Supermarket run",
            Some(1),
        ))?;
        insert.execute((
            35.5,
            "expense",
            payday - Duration::days(5),
            "Friday night pizza",
            Some(5),
        ))?;
        insert.execute((
            120.0,
            "expense",
            payday - Duration::days(10),
            "Bus card top-up",
            Some(3),
        ))?;
    }

    let this_month = format!("{:04}-{:02}", today.year(), today.month() as u8);
    conn.execute(
        "INSERT INTO budget (category_id, month, amount) VALUES (1, ?1, 500.0), (3, ?1, 100.0)",
        [&this_month],
    )?;

    println!("Success!");

    Ok(())
}
