use diesel::prelude::*;
use diesel::result::Error::NotFound;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use mise_proto::kitchen_service::kitchen_service_server::{KitchenService, KitchenServiceServer};
use mise_proto::kitchen_service::{
    get_sla_status_payload, BulkItemFailure, BulkUpdateItemsPayload, BulkUpdateItemsResponse,
    CancelTicketPayload, CreateTicketsPayload, CreateTicketsResponse, GetSlaStatusPayload,
    GetStationSummaryPayload, GetTicketPayload, ItemStateChange, ListTicketsPayload,
    ListTicketsResponse, ReprintEntry, ReprintTicketPayload, SlaSnapshot, StationSummary, Ticket,
    TicketEdge, TicketStateChange, UpdateItemStatePayload, UpdateTicketStatePayload,
};
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::info;
use uuid::Uuid;

use mise_kitchen_service::events::{proto_timestamp, serialize_ticket};
use mise_kitchen_service::{establish_connection, models, schema, service, sla};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

#[derive(Default)]
pub struct KitchenServiceImpl {}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid, Status> {
    value
        .parse::<Uuid>()
        .map_err(|_| Status::invalid_argument(format!("Invalid {}", field)))
}

fn parse_state(value: i32) -> Result<models::TicketState, Status> {
    mise_proto::kitchen_service::TicketState::try_from(value)
        .map(models::TicketState::from)
        .map_err(|_| Status::invalid_argument("Unknown target state"))
}

fn require_actor(actor: &str) -> Result<&str, Status> {
    if actor.is_empty() {
        return Err(Status::invalid_argument("actor is required"));
    }
    Ok(actor)
}

fn proto_level(level: sla::SlaLevel) -> mise_proto::kitchen_service::SlaLevel {
    match level {
        sla::SlaLevel::Normal => mise_proto::kitchen_service::SlaLevel::Normal,
        sla::SlaLevel::Warning => mise_proto::kitchen_service::SlaLevel::Warning,
        sla::SlaLevel::Critical => mise_proto::kitchen_service::SlaLevel::Critical,
        sla::SlaLevel::Expired => mise_proto::kitchen_service::SlaLevel::Expired,
    }
}

fn proto_status(status: sla::SlaStatus) -> mise_proto::kitchen_service::SlaStatus {
    match status {
        sla::SlaStatus::OnTime => mise_proto::kitchen_service::SlaStatus::OnTime,
        sla::SlaStatus::AtRisk => mise_proto::kitchen_service::SlaStatus::AtRisk,
        sla::SlaStatus::Delayed => mise_proto::kitchen_service::SlaStatus::Delayed,
    }
}

fn serialize_snapshot(snapshot: &sla::Snapshot) -> SlaSnapshot {
    SlaSnapshot {
        queue_secs: snapshot.queue_secs,
        prep_secs: snapshot.prep_secs,
        total_secs: snapshot.total_secs,
        queue_target_secs: snapshot.targets.queue_secs,
        prep_target_secs: snapshot.targets.prep_secs,
        queue_level: proto_level(snapshot.queue_level).into(),
        prep_level: proto_level(snapshot.prep_level).into(),
        total_level: proto_level(snapshot.total_level).into(),
        status: proto_status(snapshot.status).into(),
    }
}

fn serialize_item_change(change: &service::ItemStateChange) -> ItemStateChange {
    ItemStateChange {
        item_id: change.item_id.to_string(),
        old_state: mise_proto::kitchen_service::TicketState::from(change.old_state).into(),
        new_state: mise_proto::kitchen_service::TicketState::from(change.new_state).into(),
    }
}

fn serialize_ticket_change(change: &service::TicketStateChange) -> TicketStateChange {
    TicketStateChange {
        ticket_id: change.ticket_id.to_string(),
        old_state: mise_proto::kitchen_service::TicketState::from(change.old_state).into(),
        new_state: mise_proto::kitchen_service::TicketState::from(change.new_state).into(),
        updated_item_ids: change
            .updated_item_ids
            .iter()
            .map(|id| id.to_string())
            .collect(),
    }
}

#[tonic::async_trait]
impl KitchenService for KitchenServiceImpl {
    async fn create_tickets(
        &self,
        request: Request<CreateTicketsPayload>,
    ) -> Result<Response<CreateTicketsResponse>, Status> {
        let payload = request.into_inner();
        let order_id = parse_uuid(&payload.order_id, "order_id")?;
        let selected = payload
            .item_ids
            .iter()
            .map(|id| parse_uuid(id, "item_ids"))
            .collect::<Result<Vec<_>, _>>()?;
        let actor = require_actor(&payload.actor)?;

        let conn = &mut establish_connection();
        let ticket_ids = service::create_tickets(
            conn,
            order_id,
            (!selected.is_empty()).then_some(selected.as_slice()),
            actor,
        )?;

        Ok(Response::new(CreateTicketsResponse {
            ticket_ids: ticket_ids.iter().map(|id| id.to_string()).collect(),
        }))
    }

    async fn update_item_state(
        &self,
        request: Request<UpdateItemStatePayload>,
    ) -> Result<Response<ItemStateChange>, Status> {
        let payload = request.into_inner();
        let item_id = parse_uuid(&payload.item_id, "item_id")?;
        let target = parse_state(payload.state)?;
        let actor = require_actor(&payload.actor)?;

        let conn = &mut establish_connection();
        let change = service::update_item_state(conn, item_id, target, actor)?;

        Ok(Response::new(serialize_item_change(&change)))
    }

    async fn update_ticket_state(
        &self,
        request: Request<UpdateTicketStatePayload>,
    ) -> Result<Response<TicketStateChange>, Status> {
        let payload = request.into_inner();
        let ticket_id = parse_uuid(&payload.ticket_id, "ticket_id")?;
        let target = parse_state(payload.state)?;
        let actor = require_actor(&payload.actor)?;

        let conn = &mut establish_connection();
        let change = service::update_ticket_state(conn, ticket_id, target, actor)?;

        Ok(Response::new(serialize_ticket_change(&change)))
    }

    async fn bulk_update_items(
        &self,
        request: Request<BulkUpdateItemsPayload>,
    ) -> Result<Response<BulkUpdateItemsResponse>, Status> {
        let payload = request.into_inner();
        let target = parse_state(payload.state)?;
        let actor = require_actor(&payload.actor)?;

        // Unparseable ids join the failure list; the batch never aborts.
        let mut item_ids = Vec::new();
        let mut failed = Vec::new();
        for raw in &payload.item_ids {
            match raw.parse::<Uuid>() {
                Ok(id) => item_ids.push(id),
                Err(_) => failed.push(BulkItemFailure {
                    item_id: raw.clone(),
                    error: "Invalid item id".to_string(),
                }),
            }
        }

        let conn = &mut establish_connection();
        let outcome = service::bulk_update_items(conn, &item_ids, target, actor);

        failed.extend(outcome.failed.iter().map(|failure| BulkItemFailure {
            item_id: failure.item_id.to_string(),
            error: failure.error.to_string(),
        }));

        Ok(Response::new(BulkUpdateItemsResponse {
            updated: outcome.updated.iter().map(serialize_item_change).collect(),
            failed,
        }))
    }

    async fn cancel_ticket(
        &self,
        request: Request<CancelTicketPayload>,
    ) -> Result<Response<TicketStateChange>, Status> {
        let payload = request.into_inner();
        let ticket_id = parse_uuid(&payload.ticket_id, "ticket_id")?;
        let actor = require_actor(&payload.actor)?;

        let conn = &mut establish_connection();
        let change = service::cancel_ticket(conn, ticket_id, payload.reason.as_deref(), actor)?;

        Ok(Response::new(serialize_ticket_change(&change)))
    }

    async fn reprint_ticket(
        &self,
        request: Request<ReprintTicketPayload>,
    ) -> Result<Response<ReprintEntry>, Status> {
        let payload = request.into_inner();
        let ticket_id = parse_uuid(&payload.ticket_id, "ticket_id")?;
        let actor = require_actor(&payload.actor)?;
        let copies = payload.copies.unwrap_or(1);

        let conn = &mut establish_connection();
        let reprint =
            service::reprint_ticket(conn, ticket_id, payload.printer.as_deref(), copies, actor)?;

        Ok(Response::new(ReprintEntry {
            ticket_id: reprint.ticket_id.to_string(),
            printer: reprint.printer.clone(),
            copies: reprint.copies,
            actor: reprint.actor.clone(),
            created_at: Some(proto_timestamp(reprint.created_at)),
        }))
    }

    async fn get_ticket(
        &self,
        request: Request<GetTicketPayload>,
    ) -> Result<Response<Ticket>, Status> {
        use schema::tickets::dsl::*;

        let payload = request.into_inner();
        let tid = parse_uuid(&payload.ticket_id, "ticket_id")?;

        let conn = &mut establish_connection();
        let ticket: models::Ticket = match tickets
            .find(&tid)
            .select(models::Ticket::as_select())
            .first(conn)
        {
            Ok(ticket) => ticket,
            Err(NotFound) => return Err(Status::not_found("Ticket not found")),
            Err(_) => return Err(Status::internal("Error loading ticket")),
        };
        let items = models::TicketItem::belonging_to(&ticket)
            .select(models::TicketItem::as_select())
            .load(conn)
            .map_err(|_| Status::internal("Error loading ticket items"))?;

        Ok(Response::new(serialize_ticket(&ticket, &items)))
    }

    async fn list_tickets(
        &self,
        request: Request<ListTicketsPayload>,
    ) -> Result<Response<ListTicketsResponse>, Status> {
        use schema::tickets::dsl::*;

        let payload = request.into_inner();
        let after = payload
            .after
            .map(|s| s.parse::<i64>())
            .transpose()
            .map_err(|_| Status::invalid_argument("Invalid after"))?;
        let before = payload
            .before
            .map(|s| s.parse::<i64>())
            .transpose()
            .map_err(|_| Status::invalid_argument("Invalid before"))?;
        let first = payload.first;
        let last = payload.last;

        let base_query = tickets
            .select(models::Ticket::as_select())
            .filter(station_id.eq(&payload.station_id));
        let query = match (after, before, first, last) {
            (None, None, Some(first), None) => base_query
                .order_by(sequence.asc())
                .limit(first.into())
                .into_boxed(),
            (None, None, None, Some(last)) => base_query
                .order_by(sequence.desc())
                .limit(last.into())
                .into_boxed(),
            (Some(after), None, Some(first), None) => base_query
                .filter(sequence.gt(after))
                .order_by(sequence.asc())
                .limit(first.into())
                .into_boxed(),
            (None, Some(before), None, Some(last)) => base_query
                .filter(sequence.lt(before))
                .order_by(sequence.desc())
                .limit(last.into())
                .into_boxed(),
            (Some(_), Some(_), _, _) => {
                return Err(Status::invalid_argument(
                    "Only one of `after` or `before` can be given.",
                ))
            }
            (_, _, Some(_), Some(_)) => {
                return Err(Status::invalid_argument(
                    "Only one of `first` or `last` can be given.",
                ))
            }
            (_, _, None, None) => {
                return Err(Status::invalid_argument(
                    "One of `first` or `last` must be given.",
                ))
            }
            (Some(_), _, None, _) => {
                return Err(Status::invalid_argument(
                    "`first` required if `after` is given.",
                ))
            }
            (_, Some(_), _, None) => {
                return Err(Status::invalid_argument(
                    "`last` required if `before` is given.",
                ))
            }
        };

        let conn = &mut establish_connection();
        let results: Vec<models::Ticket> = query
            .load(conn)
            .map_err(|_| Status::internal("Error loading tickets"))?;

        let items = models::TicketItem::belonging_to(&results)
            .select(models::TicketItem::as_select())
            .load(conn)
            .map_err(|_| Status::internal("Error loading ticket items"))?
            .grouped_by(&results);

        Ok(Response::new(ListTicketsResponse {
            edges: results
                .into_iter()
                .zip(items)
                .map(|(ticket, ticket_items)| TicketEdge {
                    node: Some(serialize_ticket(&ticket, &ticket_items)),
                    cursor: ticket.sequence.to_string(),
                })
                .collect(),
        }))
    }

    async fn get_station_summary(
        &self,
        request: Request<GetStationSummaryPayload>,
    ) -> Result<Response<StationSummary>, Status> {
        let payload = request.into_inner();
        if payload.station_id.is_empty() {
            return Err(Status::invalid_argument("station_id is required"));
        }

        let conn = &mut establish_connection();
        let summary = service::station_summary(conn, &payload.station_id)?;

        Ok(Response::new(StationSummary {
            station_id: payload.station_id,
            active: summary.active,
            queued: summary.queued,
            in_progress: summary.in_progress,
            ready: summary.ready,
            on_time: summary.on_time,
            at_risk: summary.at_risk,
            delayed: summary.delayed,
            avg_queue_secs: summary.avg_queue_secs,
            avg_prep_secs: summary.avg_prep_secs,
            oldest_age_secs: summary.oldest_age_secs,
            oldest_status: summary.oldest_status.map(|s| proto_status(s).into()),
        }))
    }

    async fn get_sla_status(
        &self,
        request: Request<GetSlaStatusPayload>,
    ) -> Result<Response<SlaSnapshot>, Status> {
        let payload = request.into_inner();

        let conn = &mut establish_connection();
        let snapshot = match payload.target {
            Some(get_sla_status_payload::Target::TicketId(id)) => {
                service::ticket_sla(conn, parse_uuid(&id, "ticket_id")?)?
            }
            Some(get_sla_status_payload::Target::ItemId(id)) => {
                service::item_sla(conn, parse_uuid(&id, "item_id")?)?
            }
            None => return Err(Status::invalid_argument("target is required")),
        };

        Ok(Response::new(serialize_snapshot(&snapshot)))
    }
}

pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = establish_connection();
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");

    let addr = "0.0.0.0:8106".parse().unwrap();
    let kitchen_service = KitchenServiceImpl::default();

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<KitchenServiceServer<KitchenServiceImpl>>()
        .await;

    info!("listening on {}", addr);

    Server::builder()
        .add_service(health_service)
        .add_service(KitchenServiceServer::new(kitchen_service))
        .serve(addr)
        .await?;

    Ok(())
}
