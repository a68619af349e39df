//! In-memory store builders for kernel and API tests.
//!
//! Lets every test case spin up its own isolated store instead of sharing
//! a process-global fixture.

use rusqlite::Connection;

use propscope_core::schema::init_schema;

/// A transaction row under construction. Unset fields stay NULL.
#[derive(Debug, Clone, Default)]
pub struct TxRow<'a> {
    pub name: Option<&'a str>,
    pub reg_num: Option<&'a str>,
    pub date: Option<&'a str>,
    pub property_type: Option<&'a str>,
    pub transaction_type: Option<&'a str>,
    pub represented: Option<&'a str>,
    pub town: Option<&'a str>,
    pub district: Option<&'a str>,
    pub general_location: Option<&'a str>,
}

/// Open an in-memory store with the base schema.
pub fn memory_store() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory store");
    init_schema(&conn).expect("schema");
    conn
}

/// Insert one row.
pub fn insert(conn: &Connection, row: &TxRow<'_>) {
    conn.execute(
        "INSERT INTO transactions (salesperson_name, salesperson_reg_num, transaction_date,
                                   property_type, transaction_type, represented, town,
                                   district, general_location)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            row.name,
            row.reg_num,
            row.date,
            row.property_type,
            row.transaction_type,
            row.represented,
            row.town,
            row.district,
            row.general_location,
        ],
    )
    .expect("insert transaction");
}

/// The three-row corpus the end-to-end scenarios are specified against:
/// two HDB deals by agent A (JAN/FEB 2024, buyer then seller) and one
/// CONDO deal by agent B (JAN 2024, buyer).
pub fn three_row_corpus(conn: &Connection) {
    insert(
        conn,
        &TxRow {
            name: Some("Alice Tan"),
            reg_num: Some("A"),
            date: Some("JAN-2024"),
            property_type: Some("HDB"),
            transaction_type: Some("RESALE"),
            represented: Some("BUYER"),
            town: Some("Punggol"),
            district: Some("19"),
            general_location: Some("NORTH EAST"),
        },
    );
    insert(
        conn,
        &TxRow {
            name: Some("Alice Tan"),
            reg_num: Some("A"),
            date: Some("FEB-2024"),
            property_type: Some("HDB"),
            transaction_type: Some("RESALE"),
            represented: Some("SELLER"),
            town: Some("Punggol"),
            district: Some("19"),
            general_location: Some("NORTH EAST"),
        },
    );
    insert(
        conn,
        &TxRow {
            name: Some("Ben Lim"),
            reg_num: Some("B"),
            date: Some("JAN-2024"),
            property_type: Some("CONDO"),
            transaction_type: Some("NEW SALE"),
            represented: Some("BUYER"),
            town: Some("Bedok"),
            district: Some("16"),
            general_location: Some("EAST"),
        },
    );
}
