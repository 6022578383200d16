use chrono::{DateTime, Utc};
use diesel::{prelude::*, PgConnection};
use mise_proto::kitchen_service::{
    kitchen_event, ItemStateChangedEvent, KitchenEvent, Ticket, TicketCancelledEvent,
    TicketCreatedEvent, TicketItem, TicketReprintedEvent, TicketStateChangedEvent,
};
use prost::Message;
use prost_types::Timestamp;
use uuid::Uuid;

use crate::schema;
use crate::{models, models::NewOutbox, KITCHEN_ALL_CHANNEL};

pub fn proto_timestamp(t: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: t.timestamp(),
        nanos: t.timestamp_subsec_nanos() as i32,
    }
}

pub fn serialize_item(item: &models::TicketItem) -> TicketItem {
    TicketItem {
        id: item.id.to_string(),
        order_item_id: item.order_item_id.to_string(),
        product_code: item.product_code.clone(),
        name: item.name.clone(),
        quantity: item.quantity,
        notes: item.notes.clone(),
        options_json: item.options.as_ref().map(|o| o.to_string()),
        state: mise_proto::kitchen_service::TicketState::from(item.state).into(),
    }
}

pub fn serialize_ticket(ticket: &models::Ticket, items: &[models::TicketItem]) -> Ticket {
    Ticket {
        id: ticket.id.to_string(),
        order_id: ticket.order_id.to_string(),
        kitchen_id: ticket.kitchen_id.clone(),
        station_id: ticket.station_id.clone(),
        table_id: ticket.table_id.clone(),
        floor_id: ticket.floor_id.clone(),
        order_type: ticket.order_type.clone(),
        state: mise_proto::kitchen_service::TicketState::from(ticket.state).into(),
        sequence: ticket.sequence,
        queued_at: Some(proto_timestamp(ticket.queued_at)),
        preparing_at: ticket.preparing_at.map(proto_timestamp),
        ready_at: ticket.ready_at.map(proto_timestamp),
        served_at: ticket.served_at.map(proto_timestamp),
        items: items.iter().map(serialize_item).collect(),
    }
}

/// Channels a ticket's events fan out to: the kitchen-wide feed, the
/// specific kitchen and station, and the table/floor displays when the
/// ticket is bound to a table.
pub fn channels(ticket: &models::Ticket) -> Vec<String> {
    let mut topics = vec![KITCHEN_ALL_CHANNEL.to_string()];
    if let Some(kitchen_id) = &ticket.kitchen_id {
        topics.push(format!("kitchen.{}", kitchen_id));
    }
    topics.push(format!("kitchen.station.{}", ticket.station_id));
    if let Some(table_id) = &ticket.table_id {
        topics.push(format!("table.{}", table_id));
        if let Some(floor_id) = &ticket.floor_id {
            topics.push(format!("table_display.floor.{}", floor_id));
        }
    }
    topics
}

pub struct KitchenEventPublisher<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> KitchenEventPublisher<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }

    pub fn ticket_created(&mut self, ticket: &models::Ticket, items: &[models::TicketItem]) {
        self.publish(
            ticket,
            kitchen_event::Payload::TicketCreated(TicketCreatedEvent {
                ticket: Some(serialize_ticket(ticket, items)),
            }),
        );
    }

    pub fn ticket_state_changed(
        &mut self,
        ticket: &models::Ticket,
        old_state: models::TicketState,
        new_state: models::TicketState,
        changed_item_ids: &[Uuid],
    ) {
        self.publish(
            ticket,
            kitchen_event::Payload::TicketStateChanged(TicketStateChangedEvent {
                old_state: mise_proto::kitchen_service::TicketState::from(old_state).into(),
                new_state: mise_proto::kitchen_service::TicketState::from(new_state).into(),
                changed_item_ids: changed_item_ids.iter().map(|id| id.to_string()).collect(),
            }),
        );
    }

    pub fn ticket_cancelled(
        &mut self,
        ticket: &models::Ticket,
        reason: Option<&str>,
        changed_item_ids: &[Uuid],
    ) {
        self.publish(
            ticket,
            kitchen_event::Payload::TicketCancelled(TicketCancelledEvent {
                reason: reason.map(str::to_string),
                changed_item_ids: changed_item_ids.iter().map(|id| id.to_string()).collect(),
            }),
        );
    }

    pub fn item_state_changed(
        &mut self,
        ticket: &models::Ticket,
        item_id: Uuid,
        old_state: models::TicketState,
        new_state: models::TicketState,
        ticket_state: models::TicketState,
    ) {
        self.publish(
            ticket,
            kitchen_event::Payload::ItemStateChanged(ItemStateChangedEvent {
                item_id: item_id.to_string(),
                old_state: mise_proto::kitchen_service::TicketState::from(old_state).into(),
                new_state: mise_proto::kitchen_service::TicketState::from(new_state).into(),
                ticket_state: mise_proto::kitchen_service::TicketState::from(ticket_state).into(),
            }),
        );
    }

    pub fn ticket_reprinted(&mut self, ticket: &models::Ticket, reprint: &models::TicketReprint) {
        self.publish(
            ticket,
            kitchen_event::Payload::TicketReprinted(TicketReprintedEvent {
                printer: reprint.printer.clone(),
                copies: reprint.copies,
            }),
        );
    }

    // Delivery is fire-and-forget: one outbox row per channel, keyed by
    // ticket id so each channel preserves per-ticket order. Insert errors
    // never fail the surrounding mutation.
    fn publish(&mut self, ticket: &models::Ticket, payload: kitchen_event::Payload) {
        let event = KitchenEvent {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Some(proto_timestamp(Utc::now())),
            ticket_id: ticket.id.to_string(),
            kitchen_id: ticket.kitchen_id.clone(),
            station_id: ticket.station_id.clone(),
            table_id: ticket.table_id.clone(),
            floor_id: ticket.floor_id.clone(),
            payload: Some(payload),
        };
        let mut buf = Vec::new();
        event.encode(&mut buf).unwrap();

        for topic in channels(ticket) {
            let _ = diesel::insert_into(schema::outbox::table)
                .values(NewOutbox {
                    topic,
                    key: ticket.id.to_string(),
                    value: buf.clone(),
                })
                .execute(self.conn);
        }
    }
}
