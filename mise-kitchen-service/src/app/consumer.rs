use std::{env, thread::sleep, time::Duration};

use diesel::{delete, dsl::insert_into, prelude::*, PgConnection};
use dotenvy::dotenv;
use kafka::{
    client::{FetchOffset, GroupOffsetStorage},
    consumer::Consumer,
};
use prost::Message;
use tracing::{error, info, warn};
use uuid::Uuid;

use mise_kitchen_service::error::TicketServiceError;
use mise_kitchen_service::{
    establish_connection, models, schema, service, sla, CATALOG_EVENT_CHANNEL, ORDER_EVENT_CHANNEL,
};
use mise_proto::catalog_service::{catalog_event, CatalogEvent};
use mise_proto::order_service::{order_event, OrderEvent};

const GROUP: &str = "kitchen-service";

enum AcceptedMessage {
    OrderEvent(OrderEvent),
    CatalogEvent(CatalogEvent),
}

impl AcceptedMessage {
    fn from(topic: &str, value: &[u8]) -> Option<Self> {
        match topic {
            ORDER_EVENT_CHANNEL => Some(AcceptedMessage::OrderEvent(
                OrderEvent::decode(value).expect("Cannot decode order event"),
            )),
            CATALOG_EVENT_CHANNEL => Some(AcceptedMessage::CatalogEvent(
                CatalogEvent::decode(value).expect("Cannot decode catalog event"),
            )),
            _ => None,
        }
    }

    fn process(self, conn: &mut PgConnection) -> Result<(), ()> {
        match self {
            AcceptedMessage::OrderEvent(order_event) => match order_event.event.unwrap() {
                order_event::Event::OrderConfirmed(event) => {
                    let order_id = event.id.parse::<Uuid>().expect("Cannot decode order id");

                    let order = models::Order {
                        id: order_id,
                        state: models::OrderState::Draft,
                        order_type: event.order_type.clone(),
                        table_id: event.table_id.clone(),
                        floor_id: event.floor_id.clone(),
                        consumer_id: event
                            .consumer_id
                            .as_ref()
                            .map(|c| c.parse().expect("Cannot decode consumer id")),
                    };
                    let line_items = event
                        .line_items
                        .iter()
                        .map(|item| models::OrderItem {
                            id: item.id.parse().expect("Cannot decode order item id"),
                            order_id,
                            product_code: item.product_code.clone(),
                            name: item.name.clone(),
                            quantity: item.quantity,
                            notes: item.notes.clone(),
                            options: item
                                .options_json
                                .as_ref()
                                .and_then(|o| serde_json::from_str(o).ok()),
                            kitchen_id: item.kitchen_id.clone(),
                            station_id: item.station_id.clone(),
                            sent_at: None,
                            preparing_at: None,
                            ready_at: None,
                            served_at: None,
                        })
                        .collect::<Vec<_>>();

                    conn.transaction(|conn| {
                        insert_into(schema::orders::table)
                            .values(&order)
                            .on_conflict_do_nothing()
                            .execute(conn)?;
                        insert_into(schema::order_items::table)
                            .values(&line_items)
                            .on_conflict_do_nothing()
                            .execute(conn)?;
                        Ok::<_, diesel::result::Error>(())
                    })
                    .map_err(|err| {
                        error!("Error while replicating order {}: {:?}", order_id, err);
                    })?;

                    match service::create_tickets(conn, order_id, None, "system") {
                        Ok(ticket_ids) => {
                            info!("Created {} ticket(s) for order {}", ticket_ids.len(), order_id);
                            Ok(())
                        }
                        // Redelivery of an already-sent order.
                        Err(TicketServiceError::Validation(_)) => Ok(()),
                        Err(err) => {
                            error!("Error creating tickets for order {}: {}", order_id, err);
                            Err(())
                        }
                    }
                }
                order_event::Event::OrderCancelled(event) => {
                    let order_id = event.id.parse::<Uuid>().expect("Cannot decode order id");
                    match service::cancel_tickets_for_order(
                        conn,
                        order_id,
                        event.reason.as_deref(),
                        "system",
                    ) {
                        Ok(cancelled) => {
                            info!(
                                "Cancelled {} ticket(s) for order {}",
                                cancelled.len(),
                                order_id
                            );
                            Ok(())
                        }
                        Err(TicketServiceError::NotFound { .. }) => {
                            warn!("Order {} unknown to the kitchen, ignoring", order_id);
                            Ok(())
                        }
                        Err(err) => {
                            error!("Error cancelling tickets for order {}: {}", order_id, err);
                            Err(())
                        }
                    }
                }
            },

            AcceptedMessage::CatalogEvent(catalog_event) => match catalog_event.event.unwrap() {
                catalog_event::Event::KitchenUpserted(event) => {
                    let kitchen = models::Kitchen {
                        id: event.id.clone(),
                        name: event.name.clone(),
                        default_station: event.default_station.clone(),
                        queue_target_secs: event.queue_target_secs,
                        prep_target_secs: event.prep_target_secs,
                    };
                    let stations = event
                        .stations
                        .iter()
                        .map(|station| models::Station {
                            id: station.id.clone(),
                            kitchen_id: event.id.clone(),
                            name: station.name.clone(),
                            queue_target_secs: station.queue_target_secs,
                            prep_target_secs: station.prep_target_secs,
                        })
                        .collect::<Vec<_>>();

                    conn.transaction(|conn| {
                        insert_into(schema::kitchens::table)
                            .values(&kitchen)
                            .on_conflict(schema::kitchens::id)
                            .do_update()
                            .set((
                                schema::kitchens::name.eq(&kitchen.name),
                                schema::kitchens::default_station
                                    .eq(kitchen.default_station.as_deref()),
                                schema::kitchens::queue_target_secs.eq(kitchen.queue_target_secs),
                                schema::kitchens::prep_target_secs.eq(kitchen.prep_target_secs),
                            ))
                            .execute(conn)?;

                        delete(
                            schema::stations::table
                                .filter(schema::stations::kitchen_id.eq(&event.id)),
                        )
                        .execute(conn)?;
                        insert_into(schema::stations::table)
                            .values(&stations)
                            .execute(conn)?;

                        Ok::<_, diesel::result::Error>(())
                    })
                    .expect("Error while upserting kitchen");

                    Ok(())
                }
                catalog_event::Event::MenuRevised(event) => {
                    let products = event
                        .products
                        .iter()
                        .map(|product| models::Product {
                            code: product.code.clone(),
                            name: product.name.clone(),
                            kitchen_id: product.kitchen_id.clone(),
                            station_id: product.station_id.clone(),
                            category: product.category.clone(),
                            is_template: product.is_template,
                        })
                        .collect::<Vec<_>>();

                    conn.transaction(|conn| {
                        delete(schema::products::table).execute(conn)?;
                        insert_into(schema::products::table)
                            .values(&products)
                            .execute(conn)?;
                        Ok::<_, diesel::result::Error>(())
                    })
                    .expect("Error while revising menu");

                    Ok(())
                }
                catalog_event::Event::CategoryRouteUpserted(event) => {
                    let route = models::CategoryRoute {
                        category: event.category.clone(),
                        kitchen_id: event.kitchen_id.clone(),
                        station_id: event.station_id.clone(),
                    };
                    insert_into(schema::category_routes::table)
                        .values(&route)
                        .on_conflict(schema::category_routes::category)
                        .do_update()
                        .set((
                            schema::category_routes::kitchen_id.eq(route.kitchen_id.as_deref()),
                            schema::category_routes::station_id.eq(&route.station_id),
                        ))
                        .execute(conn)
                        .expect("Error while upserting category route");

                    Ok(())
                }
                catalog_event::Event::RoutingSettingsUpdated(event) => {
                    let thresholds = sla::Thresholds::default();
                    let settings = models::RoutingSettings {
                        id: 1,
                        default_station: event.default_station.clone(),
                        queue_target_secs: event
                            .queue_target_secs
                            .unwrap_or(sla::DEFAULT_QUEUE_TARGET_SECS as i32),
                        prep_target_secs: event
                            .prep_target_secs
                            .unwrap_or(sla::DEFAULT_PREP_TARGET_SECS as i32),
                        warning_ratio: event.warning_ratio.unwrap_or(thresholds.warning),
                        critical_ratio: event.critical_ratio.unwrap_or(thresholds.critical),
                        expired_ratio: event.expired_ratio.unwrap_or(thresholds.expired),
                    };
                    insert_into(schema::routing_settings::table)
                        .values(&settings)
                        .on_conflict(schema::routing_settings::id)
                        .do_update()
                        .set((
                            schema::routing_settings::default_station
                                .eq(settings.default_station.as_deref()),
                            schema::routing_settings::queue_target_secs
                                .eq(settings.queue_target_secs),
                            schema::routing_settings::prep_target_secs
                                .eq(settings.prep_target_secs),
                            schema::routing_settings::warning_ratio.eq(settings.warning_ratio),
                            schema::routing_settings::critical_ratio.eq(settings.critical_ratio),
                            schema::routing_settings::expired_ratio.eq(settings.expired_ratio),
                        ))
                        .execute(conn)
                        .expect("Error while updating routing settings");

                    Ok(())
                }
            },
        }
    }
}

pub fn main() {
    dotenv().ok();
    let kafka_url = env::var("KAFKA_URL").expect("KAFKA_URL must be set");

    let mut conn = establish_connection();
    let mut consumer = Consumer::from_hosts(vec![kafka_url])
        .with_topic(ORDER_EVENT_CHANNEL.to_string())
        .with_topic(CATALOG_EVENT_CHANNEL.to_string())
        .with_group(GROUP.to_string())
        .with_fallback_offset(FetchOffset::Earliest)
        .with_offset_storage(Some(GroupOffsetStorage::Kafka))
        .create()
        .unwrap();

    loop {
        let mss = consumer.poll().expect("Cannot poll messages");
        if mss.is_empty() {
            sleep(Duration::from_secs(1));
            continue;
        }

        for ms in mss.iter() {
            for m in ms.messages() {
                if let Some(message) = AcceptedMessage::from(ms.topic(), m.value) {
                    message.process(&mut conn).unwrap_or_else(|_| {
                        panic!("Failed to process message {} {}", ms.topic(), m.offset)
                    });
                }
            }
            let _ = consumer.consume_messageset(ms);
        }
        consumer
            .commit_consumed()
            .expect("Error while commit consumed");
    }
}
