//! Ticket orchestration: creation from order lines, validated state
//! transitions, cascades, roll-ups and the audit trail.
//!
//! Every mutating operation runs in one transaction holding a `FOR UPDATE`
//! lock on the ticket row (and the order row while its roll-up is
//! recomputed), so sibling-item writes and roll-up reads never interleave.
//! Operations on different tickets are independent.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use crate::error::TicketServiceError;
use crate::events::KitchenEventPublisher;
use crate::models::{self, OrderState, TicketState};
use crate::routing::{self, RoutingCatalog};
use crate::schema;
use crate::sla;
use crate::state;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemStateChange {
    pub item_id: Uuid,
    pub old_state: TicketState,
    pub new_state: TicketState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketStateChange {
    pub ticket_id: Uuid,
    pub old_state: TicketState,
    pub new_state: TicketState,
    pub updated_item_ids: Vec<Uuid>,
}

#[derive(Debug)]
pub struct BulkItemFailure {
    pub item_id: Uuid,
    pub error: TicketServiceError,
}

#[derive(Debug, Default)]
pub struct BulkUpdateOutcome {
    pub updated: Vec<ItemStateChange>,
    pub failed: Vec<BulkItemFailure>,
}

/// Turns an order's pending line items into one ticket per resolved
/// station. Items already sent are skipped; an explicitly selected
/// template product rejects the whole call. Returns the created ticket
/// ids in station first-appearance order.
pub fn create_tickets(
    conn: &mut PgConnection,
    order_id: Uuid,
    selected_item_ids: Option<&[Uuid]>,
    actor: &str,
) -> Result<Vec<Uuid>, TicketServiceError> {
    conn.transaction(|conn| {
        let order: models::Order = schema::orders::table
            .find(order_id)
            .select(models::Order::as_select())
            .for_update()
            .get_result(conn)
            .map_err(|err| match err {
                diesel::result::Error::NotFound => {
                    TicketServiceError::not_found("Order", order_id)
                }
                err => err.into(),
            })?;

        let mut items: Vec<models::OrderItem> = models::OrderItem::belonging_to(&order)
            .select(models::OrderItem::as_select())
            .load(conn)?;

        if let Some(selected) = selected_item_ids {
            for id in selected {
                if !items.iter().any(|item| item.id == *id) {
                    return Err(TicketServiceError::not_found("Order item", id));
                }
            }
            items.retain(|item| selected.contains(&item.id));
        }

        let catalog = RoutingCatalog::load(conn)?;

        let mut pending = Vec::new();
        for item in items {
            if item.sent_at.is_some() {
                continue;
            }
            if catalog.is_template(&item.product_code) {
                if selected_item_ids.map_or(false, |s| s.contains(&item.id)) {
                    return Err(TicketServiceError::Validation(format!(
                        "Order item {} is a template product and cannot be sent to the kitchen",
                        item.id
                    )));
                }
                continue;
            }
            pending.push(item);
        }
        if pending.is_empty() {
            return Err(TicketServiceError::Validation(
                "No pending items to send to the kitchen".to_string(),
            ));
        }

        let now = Utc::now();
        let routed = pending
            .into_iter()
            .map(|item| (catalog.resolve(&item), item))
            .collect::<Vec<_>>();

        // Bake the resolved pair back onto the source lines before
        // grouping; a repeat call re-resolves to the same station.
        for (route, item) in &routed {
            diesel::update(schema::order_items::table.find(item.id))
                .set((
                    schema::order_items::kitchen_id.eq(route.kitchen_id.as_deref()),
                    schema::order_items::station_id.eq(route.station_id.as_str()),
                ))
                .execute(conn)?;
        }

        let mut ticket_ids = Vec::new();
        for (route, group) in routing::group_by_station(routed) {
            let sequence = next_sequence(conn, &route.station_id)?;
            let ticket = models::Ticket {
                id: Uuid::new_v4(),
                order_id,
                kitchen_id: route.kitchen_id.clone(),
                station_id: route.station_id.clone(),
                table_id: order.table_id.clone(),
                floor_id: order.floor_id.clone(),
                order_type: order.order_type.clone(),
                consumer_id: order.consumer_id,
                state: TicketState::Queued,
                sequence,
                queued_at: now,
                preparing_at: None,
                ready_at: None,
                served_at: None,
                last_modified_by: actor.to_string(),
            };
            diesel::insert_into(schema::tickets::table)
                .values(&ticket)
                .execute(conn)?;

            let ticket_items: Vec<models::TicketItem> = group
                .iter()
                .map(|item| models::TicketItem {
                    id: Uuid::new_v4(),
                    ticket_id: ticket.id,
                    order_item_id: item.id,
                    product_code: item.product_code.clone(),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    notes: item.notes.clone(),
                    options: item.options.clone(),
                    state: TicketState::Queued,
                    queued_at: now,
                    preparing_at: None,
                    ready_at: None,
                    served_at: None,
                    last_modified_by: actor.to_string(),
                })
                .collect();
            diesel::insert_into(schema::ticket_items::table)
                .values(&ticket_items)
                .execute(conn)?;

            let group_ids: Vec<Uuid> = group.iter().map(|item| item.id).collect();
            diesel::update(
                schema::order_items::table.filter(schema::order_items::id.eq_any(&group_ids)),
            )
            .set(schema::order_items::sent_at.eq(now))
            .execute(conn)?;

            let mut publisher = KitchenEventPublisher::new(conn);
            publisher.ticket_created(&ticket, &ticket_items);

            ticket_ids.push(ticket.id);
        }

        if order.state == OrderState::Draft {
            diesel::update(schema::orders::table.find(order_id))
                .set(schema::orders::state.eq(OrderState::InKitchen))
                .execute(conn)?;
        }

        Ok(ticket_ids)
    })
}

/// Advances one item through the strict item edge table. A same-state
/// request is an idempotent no-op: nothing is written, nothing emitted.
pub fn update_item_state(
    conn: &mut PgConnection,
    item_id: Uuid,
    target: TicketState,
    actor: &str,
) -> Result<ItemStateChange, TicketServiceError> {
    conn.transaction(|conn| {
        let owning_ticket_id: Uuid = schema::ticket_items::table
            .find(item_id)
            .select(schema::ticket_items::ticket_id)
            .first(conn)
            .map_err(|err| match err {
                diesel::result::Error::NotFound => {
                    TicketServiceError::not_found("Ticket item", item_id)
                }
                err => err.into(),
            })?;

        let ticket: models::Ticket = schema::tickets::table
            .find(owning_ticket_id)
            .select(models::Ticket::as_select())
            .for_update()
            .get_result(conn)?;

        // Re-read under the ticket lock; a concurrent cascade may have
        // moved the item between the lookup above and here.
        let item: models::TicketItem = schema::ticket_items::table
            .find(item_id)
            .select(models::TicketItem::as_select())
            .first(conn)?;

        if ticket.state == TicketState::Cancelled {
            return Err(TicketServiceError::TicketClosed(ticket.id));
        }
        if item.state == target {
            return Ok(ItemStateChange {
                item_id,
                old_state: item.state,
                new_state: target,
            });
        }
        if !state::item_transition_allowed(item.state, target) {
            return Err(TicketServiceError::InvalidTransition {
                entity: "item",
                from: item.state,
                to: target,
            });
        }

        let now = Utc::now();
        write_item_state(conn, &item, target, actor, now)?;

        let sibling_states: Vec<TicketState> = schema::ticket_items::table
            .filter(schema::ticket_items::ticket_id.eq(ticket.id))
            .select(schema::ticket_items::state)
            .load(conn)?;
        let mut ticket_state = ticket.state;
        if let Some(next) = state::rollup_ticket(&sibling_states) {
            if next != ticket.state {
                write_ticket_state(conn, &ticket, next, actor, now)?;
                ticket_state = next;
            }
        }

        refresh_order_state(conn, ticket.order_id)?;

        let mut publisher = KitchenEventPublisher::new(conn);
        publisher.item_state_changed(&ticket, item.id, item.state, target, ticket_state);

        Ok(ItemStateChange {
            item_id,
            old_state: item.state,
            new_state: target,
        })
    })
}

/// Moves a whole ticket through the looser ticket edge table and cascades
/// the target onto every non-terminal item. Item writes happen first; the
/// ticket's own state is written only once all of them succeeded.
pub fn update_ticket_state(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    target: TicketState,
    actor: &str,
) -> Result<TicketStateChange, TicketServiceError> {
    apply_ticket_state(conn, ticket_id, target, actor, None)
}

pub fn cancel_ticket(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    reason: Option<&str>,
    actor: &str,
) -> Result<TicketStateChange, TicketServiceError> {
    apply_ticket_state(conn, ticket_id, TicketState::Cancelled, actor, reason)
}

fn apply_ticket_state(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    target: TicketState,
    actor: &str,
    reason: Option<&str>,
) -> Result<TicketStateChange, TicketServiceError> {
    conn.transaction(|conn| {
        let ticket: models::Ticket = schema::tickets::table
            .find(ticket_id)
            .select(models::Ticket::as_select())
            .for_update()
            .get_result(conn)
            .map_err(|err| match err {
                diesel::result::Error::NotFound => {
                    TicketServiceError::not_found("Ticket", ticket_id)
                }
                err => err.into(),
            })?;

        if ticket.state == target {
            return Ok(TicketStateChange {
                ticket_id,
                old_state: ticket.state,
                new_state: target,
                updated_item_ids: Vec::new(),
            });
        }
        if !state::ticket_transition_allowed(ticket.state, target) {
            return Err(TicketServiceError::InvalidTransition {
                entity: "ticket",
                from: ticket.state,
                to: target,
            });
        }

        let now = Utc::now();
        let items: Vec<models::TicketItem> = models::TicketItem::belonging_to(&ticket)
            .select(models::TicketItem::as_select())
            .load(conn)?;

        // The cascade is authoritative: terminal and already-matching
        // items are skipped, everything else is forced to the target.
        let mut updated_item_ids = Vec::new();
        for item in &items {
            if state::is_terminal(item.state) || item.state == target {
                continue;
            }
            write_item_state(conn, item, target, actor, now)?;
            updated_item_ids.push(item.id);
        }
        write_ticket_state(conn, &ticket, target, actor, now)?;

        refresh_order_state(conn, ticket.order_id)?;

        let mut publisher = KitchenEventPublisher::new(conn);
        if target == TicketState::Cancelled {
            publisher.ticket_cancelled(&ticket, reason, &updated_item_ids);
        } else {
            publisher.ticket_state_changed(&ticket, ticket.state, target, &updated_item_ids);
        }

        Ok(TicketStateChange {
            ticket_id,
            old_state: ticket.state,
            new_state: target,
            updated_item_ids,
        })
    })
}

/// Applies `update_item_state` per item, each in its own transaction.
/// Failures are collected, never raised; the batch always completes.
pub fn bulk_update_items(
    conn: &mut PgConnection,
    item_ids: &[Uuid],
    target: TicketState,
    actor: &str,
) -> BulkUpdateOutcome {
    let mut outcome = BulkUpdateOutcome::default();
    for &item_id in item_ids {
        match update_item_state(conn, item_id, target, actor) {
            Ok(change) => outcome.updated.push(change),
            Err(error) => outcome.failed.push(BulkItemFailure { item_id, error }),
        }
    }
    outcome
}

/// Cancels every open ticket of an order, e.g. when the order itself is
/// voided upstream. Tickets that raced to a terminal state are skipped.
pub fn cancel_tickets_for_order(
    conn: &mut PgConnection,
    order_id: Uuid,
    reason: Option<&str>,
    actor: &str,
) -> Result<Vec<Uuid>, TicketServiceError> {
    let open: Vec<Uuid> = schema::tickets::table
        .filter(schema::tickets::order_id.eq(order_id))
        .filter(schema::tickets::state.ne_all(vec![TicketState::Served, TicketState::Cancelled]))
        .select(schema::tickets::id)
        .load(conn)?;

    let mut cancelled = Vec::new();
    for ticket_id in open {
        match cancel_ticket(conn, ticket_id, reason, actor) {
            Ok(_) => cancelled.push(ticket_id),
            Err(TicketServiceError::InvalidTransition { .. }) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(cancelled)
}

/// Appends a reprint audit entry. Does not touch workflow state.
pub fn reprint_ticket(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    printer: Option<&str>,
    copies: i32,
    actor: &str,
) -> Result<models::TicketReprint, TicketServiceError> {
    if copies < 1 {
        return Err(TicketServiceError::Validation(
            "Reprint copies must be at least 1".to_string(),
        ));
    }
    conn.transaction(|conn| {
        let ticket: models::Ticket = schema::tickets::table
            .find(ticket_id)
            .select(models::Ticket::as_select())
            .for_update()
            .get_result(conn)
            .map_err(|err| match err {
                diesel::result::Error::NotFound => {
                    TicketServiceError::not_found("Ticket", ticket_id)
                }
                err => err.into(),
            })?;

        let reprint: models::TicketReprint = diesel::insert_into(schema::ticket_reprints::table)
            .values(models::NewTicketReprint {
                ticket_id,
                printer: printer.map(str::to_string),
                copies,
                actor: actor.to_string(),
            })
            .returning(models::TicketReprint::as_returning())
            .get_result(conn)?;

        let mut publisher = KitchenEventPublisher::new(conn);
        publisher.ticket_reprinted(&ticket, &reprint);

        Ok(reprint)
    })
}

/// Live SLA snapshot for one ticket. Read-only and lock-free.
pub fn ticket_sla(
    conn: &mut PgConnection,
    ticket_id: Uuid,
) -> Result<sla::Snapshot, TicketServiceError> {
    let ticket: models::Ticket = schema::tickets::table
        .find(ticket_id)
        .select(models::Ticket::as_select())
        .first(conn)
        .map_err(|err| match err {
            diesel::result::Error::NotFound => TicketServiceError::not_found("Ticket", ticket_id),
            err => err.into(),
        })?;

    let (targets, thresholds) = sla_config(conn, &ticket.station_id, ticket.kitchen_id.as_deref())?;
    Ok(sla::evaluate(
        &ticket_milestones(&ticket),
        &targets,
        &thresholds,
        Utc::now(),
    ))
}

/// Live SLA snapshot for one item, against its ticket's station targets.
pub fn item_sla(
    conn: &mut PgConnection,
    item_id: Uuid,
) -> Result<sla::Snapshot, TicketServiceError> {
    let item: models::TicketItem = schema::ticket_items::table
        .find(item_id)
        .select(models::TicketItem::as_select())
        .first(conn)
        .map_err(|err| match err {
            diesel::result::Error::NotFound => {
                TicketServiceError::not_found("Ticket item", item_id)
            }
            err => err.into(),
        })?;
    let ticket: models::Ticket = schema::tickets::table
        .find(item.ticket_id)
        .select(models::Ticket::as_select())
        .first(conn)?;

    let (targets, thresholds) = sla_config(conn, &ticket.station_id, ticket.kitchen_id.as_deref())?;
    Ok(sla::evaluate(
        &item_milestones(&item),
        &targets,
        &thresholds,
        Utc::now(),
    ))
}

/// Dashboard aggregate over a station's open tickets. A known but idle
/// station yields the all-zero summary.
pub fn station_summary(
    conn: &mut PgConnection,
    station_id: &str,
) -> Result<sla::StationSummary, TicketServiceError> {
    let station: Option<models::Station> = schema::stations::table
        .find(station_id)
        .select(models::Station::as_select())
        .first(conn)
        .optional()?;

    if station.is_none() {
        // Fallback stations exist only through their tickets.
        let referenced = diesel::select(diesel::dsl::exists(
            schema::tickets::table.filter(schema::tickets::station_id.eq(station_id)),
        ))
        .get_result::<bool>(conn)?;
        if !referenced {
            return Err(TicketServiceError::not_found("Station", station_id));
        }
    }

    let open: Vec<models::Ticket> = schema::tickets::table
        .filter(schema::tickets::station_id.eq(station_id))
        .filter(schema::tickets::state.ne_all(vec![TicketState::Served, TicketState::Cancelled]))
        .select(models::Ticket::as_select())
        .load(conn)?;

    let kitchen_id = station.as_ref().map(|s| s.kitchen_id.as_str());
    let (targets, thresholds) = sla_config(conn, station_id, kitchen_id)?;

    let snapshot_inputs: Vec<(TicketState, sla::Milestones)> = open
        .iter()
        .map(|t| (t.state, ticket_milestones(t)))
        .collect();
    Ok(sla::summarize(
        &snapshot_inputs,
        &targets,
        &thresholds,
        Utc::now(),
    ))
}

fn ticket_milestones(ticket: &models::Ticket) -> sla::Milestones {
    sla::Milestones {
        queued_at: ticket.queued_at,
        preparing_at: ticket.preparing_at,
        ready_at: ticket.ready_at,
    }
}

fn item_milestones(item: &models::TicketItem) -> sla::Milestones {
    sla::Milestones {
        queued_at: item.queued_at,
        preparing_at: item.preparing_at,
        ready_at: item.ready_at,
    }
}

/// Target resolution: station overrides, then the owning kitchen's
/// defaults, then the settings row, then the fixed defaults.
fn sla_config(
    conn: &mut PgConnection,
    station_id: &str,
    kitchen_id: Option<&str>,
) -> QueryResult<(sla::Targets, sla::Thresholds)> {
    let settings: Option<models::RoutingSettings> = schema::routing_settings::table
        .select(models::RoutingSettings::as_select())
        .first(conn)
        .optional()?;

    let station: Option<models::Station> = schema::stations::table
        .find(station_id)
        .select(models::Station::as_select())
        .first(conn)
        .optional()?;

    let kitchen_id = station
        .as_ref()
        .map(|s| s.kitchen_id.clone())
        .or_else(|| kitchen_id.map(str::to_string));
    let kitchen: Option<models::Kitchen> = match kitchen_id {
        Some(id) => schema::kitchens::table
            .find(id)
            .select(models::Kitchen::as_select())
            .first(conn)
            .optional()?,
        None => None,
    };

    let queue_secs = station
        .as_ref()
        .and_then(|s| s.queue_target_secs)
        .or_else(|| kitchen.as_ref().and_then(|k| k.queue_target_secs))
        .map(i64::from)
        .or_else(|| settings.as_ref().map(|s| i64::from(s.queue_target_secs)))
        .unwrap_or(sla::DEFAULT_QUEUE_TARGET_SECS);
    let prep_secs = station
        .as_ref()
        .and_then(|s| s.prep_target_secs)
        .or_else(|| kitchen.as_ref().and_then(|k| k.prep_target_secs))
        .map(i64::from)
        .or_else(|| settings.as_ref().map(|s| i64::from(s.prep_target_secs)))
        .unwrap_or(sla::DEFAULT_PREP_TARGET_SECS);

    let thresholds = settings
        .as_ref()
        .map(|s| sla::Thresholds {
            warning: s.warning_ratio,
            critical: s.critical_ratio,
            expired: s.expired_ratio,
        })
        .unwrap_or_default();

    Ok((
        sla::Targets {
            queue_secs,
            prep_secs,
        },
        thresholds,
    ))
}

fn next_sequence(conn: &mut PgConnection, station_id: &str) -> QueryResult<i64> {
    let last = schema::tickets::table
        .filter(schema::tickets::station_id.eq(station_id))
        .select(schema::tickets::sequence)
        .order(schema::tickets::sequence.desc())
        .first::<i64>(conn)
        .or_else(|err| match err {
            diesel::result::Error::NotFound => Ok(0),
            err => Err(err),
        })?;
    Ok(last + 1)
}

/// Milestone timestamps accompanying a state write. Forward transitions
/// stamp the milestones they reach for the first time; corrective
/// (backward) transitions clear the ones they rewind past so SLA
/// measurement restarts.
fn milestones_for(
    target: TicketState,
    preparing_at: Option<DateTime<Utc>>,
    ready_at: Option<DateTime<Utc>>,
    served_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
) {
    match target {
        TicketState::Queued => (None, None, served_at),
        TicketState::InProgress => (preparing_at.or(Some(now)), None, served_at),
        TicketState::Ready => (preparing_at.or(Some(now)), ready_at.or(Some(now)), served_at),
        TicketState::Served => (
            preparing_at.or(Some(now)),
            ready_at.or(Some(now)),
            served_at.or(Some(now)),
        ),
        TicketState::Cancelled => (preparing_at, ready_at, served_at),
    }
}

fn write_item_state(
    conn: &mut PgConnection,
    item: &models::TicketItem,
    target: TicketState,
    actor: &str,
    now: DateTime<Utc>,
) -> QueryResult<()> {
    let (preparing_at, ready_at, served_at) =
        milestones_for(target, item.preparing_at, item.ready_at, item.served_at, now);

    diesel::update(schema::ticket_items::table.find(item.id))
        .set((
            schema::ticket_items::state.eq(target),
            schema::ticket_items::preparing_at.eq(preparing_at),
            schema::ticket_items::ready_at.eq(ready_at),
            schema::ticket_items::served_at.eq(served_at),
            schema::ticket_items::last_modified_by.eq(actor),
        ))
        .execute(conn)?;

    // Mirror progress onto the source order line for the order-side views.
    diesel::update(schema::order_items::table.find(item.order_item_id))
        .set((
            schema::order_items::preparing_at.eq(preparing_at),
            schema::order_items::ready_at.eq(ready_at),
            schema::order_items::served_at.eq(served_at),
        ))
        .execute(conn)?;
    Ok(())
}

fn write_ticket_state(
    conn: &mut PgConnection,
    ticket: &models::Ticket,
    target: TicketState,
    actor: &str,
    now: DateTime<Utc>,
) -> QueryResult<()> {
    let (preparing_at, ready_at, served_at) = milestones_for(
        target,
        ticket.preparing_at,
        ticket.ready_at,
        ticket.served_at,
        now,
    );

    diesel::update(schema::tickets::table.find(ticket.id))
        .set((
            schema::tickets::state.eq(target),
            schema::tickets::preparing_at.eq(preparing_at),
            schema::tickets::ready_at.eq(ready_at),
            schema::tickets::served_at.eq(served_at),
            schema::tickets::last_modified_by.eq(actor),
        ))
        .execute(conn)?;
    Ok(())
}

/// Ticket(s) -> order roll-up over all tickets of the order. Holds the
/// order row lock so concurrent ticket mutations converge instead of
/// clobbering each other; re-evaluation with unchanged inputs is a no-op.
fn refresh_order_state(conn: &mut PgConnection, order_id: Uuid) -> QueryResult<()> {
    let order: models::Order = schema::orders::table
        .find(order_id)
        .select(models::Order::as_select())
        .for_update()
        .get_result(conn)?;

    let states: Vec<TicketState> = schema::tickets::table
        .filter(schema::tickets::order_id.eq(order_id))
        .select(schema::tickets::state)
        .load(conn)?;

    if let Some(next) = state::rollup_order(&states) {
        if next != order.state {
            diesel::update(schema::orders::table.find(order_id))
                .set(schema::orders::state.eq(next))
                .execute(conn)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn forward_transitions_stamp_milestones_once() {
        let now = Utc::now();
        let earlier = now - Duration::seconds(120);

        let (preparing, ready, served) = milestones_for(TicketState::InProgress, None, None, None, now);
        assert_eq!((preparing, ready, served), (Some(now), None, None));

        // Already-stamped milestones are kept on re-advance.
        let (preparing, ready, _) =
            milestones_for(TicketState::Ready, Some(earlier), None, None, now);
        assert_eq!(preparing, Some(earlier));
        assert_eq!(ready, Some(now));
    }

    #[test]
    fn skipping_ahead_fills_the_missing_milestones() {
        let now = Utc::now();
        let (preparing, ready, served) = milestones_for(TicketState::Served, None, None, None, now);
        assert_eq!(preparing, Some(now));
        assert_eq!(ready, Some(now));
        assert_eq!(served, Some(now));
    }

    #[test]
    fn requeue_rewinds_the_milestones() {
        let now = Utc::now();
        let earlier = now - Duration::seconds(60);

        let (preparing, ready, _) =
            milestones_for(TicketState::Queued, Some(earlier), Some(earlier), None, now);
        assert_eq!((preparing, ready), (None, None));

        let (preparing, ready, _) =
            milestones_for(TicketState::InProgress, Some(earlier), Some(earlier), None, now);
        assert_eq!(preparing, Some(earlier));
        assert_eq!(ready, None);
    }

    #[test]
    fn cancellation_freezes_the_milestones() {
        let now = Utc::now();
        let earlier = now - Duration::seconds(60);
        let (preparing, ready, served) =
            milestones_for(TicketState::Cancelled, Some(earlier), None, None, now);
        assert_eq!(preparing, Some(earlier));
        assert_eq!(ready, None);
        assert_eq!(served, None);
    }
}
