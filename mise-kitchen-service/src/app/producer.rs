use std::env;
use std::{thread::sleep, time::Duration};

use diesel::result::Error as DieselError;
use diesel::{
    Connection, ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper,
};
use dotenvy::dotenv;
use kafka::client::RequiredAcks;
use kafka::producer::{Producer, Record};
use tracing::error;

use mise_kitchen_service::models::Outbox;
use mise_kitchen_service::{establish_connection, schema};

// Drains the transactional outbox to Kafka: one row at a time, locked
// with SKIP LOCKED so multiple relay processes can run side by side. The
// row is deleted only once the broker acknowledged the record.
struct OutboxRelay {
    kafka: Producer,
}

impl OutboxRelay {
    fn relay_next_row(&mut self, conn: &mut PgConnection) -> Result<bool, OutboxRelayError> {
        use schema::outbox::dsl::*;

        conn.transaction::<_, OutboxRelayError, _>(|conn| {
            let row = match outbox
                .select(Outbox::as_select())
                .order(schema::outbox::id.asc())
                .for_update()
                .skip_locked()
                .first::<Outbox>(conn)
            {
                Ok(row) => row,
                Err(DieselError::NotFound) => return Ok(false),
                Err(err) => return Err(OutboxRelayError::Database(err)),
            };

            self.kafka
                .send(&Record::from_key_value(
                    &row.topic,
                    row.key.clone(),
                    row.value.clone(),
                ))
                .map_err(OutboxRelayError::Kafka)?;

            diesel::delete(outbox.filter(schema::outbox::id.eq(row.id)))
                .execute(conn)
                .map_err(OutboxRelayError::Database)?;

            Ok(true)
        })
    }
}

pub fn main() {
    dotenv().ok();
    let kafka_url = env::var("KAFKA_URL").expect("KAFKA_URL must be set");

    let conn = &mut establish_connection();
    let kafka = Producer::from_hosts(vec![kafka_url])
        .with_ack_timeout(Duration::from_secs(1))
        .with_required_acks(RequiredAcks::One)
        .create()
        .unwrap();

    let mut relay = OutboxRelay { kafka };

    loop {
        match relay.relay_next_row(conn) {
            Ok(true) => {}
            Ok(false) => {
                sleep(Duration::from_secs(1));
            }
            Err(err) => {
                error!("Error relaying outbox row: {:?}", err);
                sleep(Duration::from_secs(1));
            }
        }
    }
}

#[derive(Debug)]
pub enum OutboxRelayError {
    Database(DieselError),
    Kafka(kafka::Error),
}

impl From<DieselError> for OutboxRelayError {
    fn from(err: DieselError) -> Self {
        OutboxRelayError::Database(err)
    }
}
