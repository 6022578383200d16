use std::io::Write;

use chrono::{DateTime, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{
    category_routes, kitchens, order_items, orders, outbox, products, routing_settings, stations,
    ticket_items, ticket_reprints, tickets,
};

/// Workflow state shared by tickets and ticket items.
#[derive(FromSqlRow, AsExpression, PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[diesel(sql_type = crate::schema::sql_types::TicketState)]
pub enum TicketState {
    Queued,
    InProgress,
    Ready,
    Served,
    Cancelled,
}

impl ToSql<crate::schema::sql_types::TicketState, Pg> for TicketState {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            TicketState::Queued => out.write_all(b"QUEUED")?,
            TicketState::InProgress => out.write_all(b"IN_PROGRESS")?,
            TicketState::Ready => out.write_all(b"READY")?,
            TicketState::Served => out.write_all(b"SERVED")?,
            TicketState::Cancelled => out.write_all(b"CANCELLED")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::TicketState, Pg> for TicketState {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"QUEUED" => Ok(TicketState::Queued),
            b"IN_PROGRESS" => Ok(TicketState::InProgress),
            b"READY" => Ok(TicketState::Ready),
            b"SERVED" => Ok(TicketState::Served),
            b"CANCELLED" => Ok(TicketState::Cancelled),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl From<mise_proto::kitchen_service::TicketState> for TicketState {
    fn from(s: mise_proto::kitchen_service::TicketState) -> Self {
        match s {
            mise_proto::kitchen_service::TicketState::Queued => TicketState::Queued,
            mise_proto::kitchen_service::TicketState::InProgress => TicketState::InProgress,
            mise_proto::kitchen_service::TicketState::Ready => TicketState::Ready,
            mise_proto::kitchen_service::TicketState::Served => TicketState::Served,
            mise_proto::kitchen_service::TicketState::Cancelled => TicketState::Cancelled,
        }
    }
}

impl From<TicketState> for mise_proto::kitchen_service::TicketState {
    fn from(s: TicketState) -> Self {
        match s {
            TicketState::Queued => mise_proto::kitchen_service::TicketState::Queued,
            TicketState::InProgress => mise_proto::kitchen_service::TicketState::InProgress,
            TicketState::Ready => mise_proto::kitchen_service::TicketState::Ready,
            TicketState::Served => mise_proto::kitchen_service::TicketState::Served,
            TicketState::Cancelled => mise_proto::kitchen_service::TicketState::Cancelled,
        }
    }
}

/// Rolled-up state of the owning order, maintained from its tickets.
#[derive(FromSqlRow, AsExpression, PartialEq, Eq, Copy, Clone, Debug)]
#[diesel(sql_type = crate::schema::sql_types::OrderState)]
pub enum OrderState {
    Draft,
    InKitchen,
    InProgress,
    Ready,
    Served,
    Cancelled,
}

impl ToSql<crate::schema::sql_types::OrderState, Pg> for OrderState {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            OrderState::Draft => out.write_all(b"DRAFT")?,
            OrderState::InKitchen => out.write_all(b"IN_KITCHEN")?,
            OrderState::InProgress => out.write_all(b"IN_PROGRESS")?,
            OrderState::Ready => out.write_all(b"READY")?,
            OrderState::Served => out.write_all(b"SERVED")?,
            OrderState::Cancelled => out.write_all(b"CANCELLED")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::OrderState, Pg> for OrderState {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"DRAFT" => Ok(OrderState::Draft),
            b"IN_KITCHEN" => Ok(OrderState::InKitchen),
            b"IN_PROGRESS" => Ok(OrderState::InProgress),
            b"READY" => Ok(OrderState::Ready),
            b"SERVED" => Ok(OrderState::Served),
            b"CANCELLED" => Ok(OrderState::Cancelled),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = kitchens)]
pub struct Kitchen {
    pub id: String,
    pub name: String,
    pub default_station: Option<String>,
    pub queue_target_secs: Option<i32>,
    pub prep_target_secs: Option<i32>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq)]
#[diesel(belongs_to(Kitchen))]
#[diesel(table_name = stations)]
pub struct Station {
    pub id: String,
    pub kitchen_id: String,
    pub name: String,
    pub queue_target_secs: Option<i32>,
    pub prep_target_secs: Option<i32>,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = products, primary_key(code))]
pub struct Product {
    pub code: String,
    pub name: String,
    pub kitchen_id: Option<String>,
    pub station_id: Option<String>,
    pub category: Option<String>,
    pub is_template: bool,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = category_routes, primary_key(category))]
pub struct CategoryRoute {
    pub category: String,
    pub kitchen_id: Option<String>,
    pub station_id: String,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = routing_settings)]
pub struct RoutingSettings {
    pub id: i32,
    pub default_station: Option<String>,
    pub queue_target_secs: i32,
    pub prep_target_secs: i32,
    pub warning_ratio: f64,
    pub critical_ratio: f64,
    pub expired_ratio: f64,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = orders)]
pub struct Order {
    pub id: Uuid,
    pub state: OrderState,
    pub order_type: String,
    pub table_id: Option<String>,
    pub floor_id: Option<String>,
    pub consumer_id: Option<Uuid>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq)]
#[diesel(belongs_to(Order))]
#[diesel(table_name = order_items)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_code: String,
    pub name: String,
    pub quantity: i32,
    pub notes: Option<String>,
    pub options: Option<Value>,
    pub kitchen_id: Option<String>,
    pub station_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub served_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = tickets)]
pub struct Ticket {
    pub id: Uuid,
    pub order_id: Uuid,
    pub kitchen_id: Option<String>,
    pub station_id: String,
    pub table_id: Option<String>,
    pub floor_id: Option<String>,
    pub order_type: String,
    pub consumer_id: Option<Uuid>,
    pub state: TicketState,
    pub sequence: i64,
    pub queued_at: DateTime<Utc>,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub served_at: Option<DateTime<Utc>>,
    pub last_modified_by: String,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq)]
#[diesel(belongs_to(Ticket))]
#[diesel(table_name = ticket_items)]
pub struct TicketItem {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub order_item_id: Uuid,
    pub product_code: String,
    pub name: String,
    pub quantity: i32,
    pub notes: Option<String>,
    pub options: Option<Value>,
    pub state: TicketState,
    pub queued_at: DateTime<Utc>,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub served_at: Option<DateTime<Utc>>,
    pub last_modified_by: String,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, PartialEq)]
#[diesel(belongs_to(Ticket))]
#[diesel(table_name = ticket_reprints)]
pub struct TicketReprint {
    pub id: i32,
    pub ticket_id: Uuid,
    pub printer: Option<String>,
    pub copies: i32,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = ticket_reprints)]
pub struct NewTicketReprint {
    pub ticket_id: Uuid,
    pub printer: Option<String>,
    pub copies: i32,
    pub actor: String,
}

#[derive(Queryable, Selectable, Debug, PartialEq)]
#[diesel(table_name = outbox)]
pub struct Outbox {
    pub id: i32,
    pub topic: String,
    pub key: String,
    pub value: Vec<u8>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = outbox)]
pub struct NewOutbox {
    pub topic: String,
    pub key: String,
    pub value: Vec<u8>,
}
