use std::env;

use diesel::{Connection, PgConnection};
use dotenvy::dotenv;

pub mod error;
pub mod events;
pub mod models;
pub mod routing;
pub mod schema;
pub mod service;
pub mod sla;
pub mod state;

/// Fan-out channel every kitchen event is delivered to.
pub const KITCHEN_ALL_CHANNEL: &str = "kitchen.all";

pub const ORDER_EVENT_CHANNEL: &str = "order.event";
pub const CATALOG_EVENT_CHANNEL: &str = "catalog.event";

pub fn establish_connection() -> PgConnection {
    dotenv().ok();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgConnection::establish(&database_url)
        .unwrap_or_else(|_| panic!("Error connecting to {}", database_url))
}
