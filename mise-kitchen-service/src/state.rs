//! Transition tables and roll-up rules for the ticket workflow.
//!
//! Items follow a strict forward-only table; tickets get a looser table so
//! staff can pull a prematurely advanced ticket back. Roll-ups derive a
//! parent's state from its children and never consult history.

use crate::models::{OrderState, TicketState};

pub fn is_terminal(state: TicketState) -> bool {
    matches!(state, TicketState::Served | TicketState::Cancelled)
}

/// Item edge table. Same-state requests are handled by the caller as
/// idempotent no-ops and never reach this check.
pub fn item_transition_allowed(from: TicketState, to: TicketState) -> bool {
    use TicketState::*;
    match from {
        Queued => matches!(to, InProgress | Cancelled),
        InProgress => matches!(to, Ready | Cancelled),
        Ready => matches!(to, Served | Cancelled),
        Served | Cancelled => false,
    }
}

/// Ticket edge table. Backward edges (`InProgress -> Queued`,
/// `Ready -> InProgress`) model staff corrections; the cascade forces the
/// ticket's non-terminal items along.
pub fn ticket_transition_allowed(from: TicketState, to: TicketState) -> bool {
    use TicketState::*;
    match from {
        Queued => matches!(to, InProgress | Ready | Served | Cancelled),
        InProgress => matches!(to, Ready | Served | Cancelled | Queued),
        Ready => matches!(to, Served | Cancelled | InProgress),
        Served | Cancelled => false,
    }
}

/// Item -> ticket roll-up: the ticket follows its items only when they all
/// agree. Mixed states leave the ticket wherever the last explicit action
/// or roll-up put it.
pub fn rollup_ticket(item_states: &[TicketState]) -> Option<TicketState> {
    let (first, rest) = item_states.split_first()?;
    rest.iter().all(|s| s == first).then_some(*first)
}

/// Ticket(s) -> order roll-up, a pure function of the multiset of ticket
/// states. Unlisted mixes return `None` and the order is left untouched.
pub fn rollup_order(ticket_states: &[TicketState]) -> Option<OrderState> {
    use TicketState::*;
    if ticket_states.is_empty() {
        return None;
    }
    if ticket_states.iter().all(|s| *s == Cancelled) {
        return Some(OrderState::Cancelled);
    }
    if ticket_states.iter().all(|s| *s == Served) {
        return Some(OrderState::Served);
    }
    let any_open = |state: TicketState| ticket_states.iter().any(|s| *s == state);
    if any_open(Ready) && !any_open(Queued) && !any_open(InProgress) {
        return Some(OrderState::Ready);
    }
    if any_open(InProgress) {
        return Some(OrderState::InProgress);
    }
    if ticket_states.iter().all(|s| *s == Queued) {
        return Some(OrderState::Draft);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use TicketState::*;

    const ALL: [TicketState; 5] = [Queued, InProgress, Ready, Served, Cancelled];

    fn item_edges(from: TicketState) -> &'static [TicketState] {
        match from {
            Queued => &[InProgress, Cancelled],
            InProgress => &[Ready, Cancelled],
            Ready => &[Served, Cancelled],
            Served | Cancelled => &[],
        }
    }

    fn ticket_edges(from: TicketState) -> &'static [TicketState] {
        match from {
            Queued => &[InProgress, Ready, Served, Cancelled],
            InProgress => &[Ready, Served, Cancelled, Queued],
            Ready => &[Served, Cancelled, InProgress],
            Served | Cancelled => &[],
        }
    }

    #[test]
    fn item_table_accepts_exactly_the_listed_edges() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    item_transition_allowed(from, to),
                    item_edges(from).contains(&to),
                    "item {from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn ticket_table_accepts_exactly_the_listed_edges() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    ticket_transition_allowed(from, to),
                    ticket_edges(from).contains(&to),
                    "ticket {from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for state in [Served, Cancelled] {
            assert!(is_terminal(state));
            for to in ALL {
                assert!(!item_transition_allowed(state, to));
                assert!(!ticket_transition_allowed(state, to));
            }
        }
        for state in [Queued, InProgress, Ready] {
            assert!(!is_terminal(state));
        }
    }

    #[test]
    fn uniform_items_roll_the_ticket_up() {
        assert_eq!(rollup_ticket(&[Ready, Ready, Ready]), Some(Ready));
        assert_eq!(rollup_ticket(&[Cancelled, Cancelled]), Some(Cancelled));
        assert_eq!(rollup_ticket(&[Queued]), Some(Queued));
    }

    #[test]
    fn mixed_items_leave_the_ticket_alone() {
        assert_eq!(rollup_ticket(&[Ready, Queued]), None);
        assert_eq!(rollup_ticket(&[Served, Cancelled]), None);
        assert_eq!(rollup_ticket(&[]), None);
    }

    #[test]
    fn one_cancelled_item_does_not_drag_the_ticket() {
        // Sibling items still being worked keep the ticket where it is.
        assert_eq!(rollup_ticket(&[Cancelled, Queued, InProgress]), None);
    }

    #[test]
    fn three_item_ticket_rolls_up_only_once_all_agree() {
        // Advance A and B to Ready, C still queued: no roll-up.
        assert_eq!(rollup_ticket(&[Ready, Ready, Queued]), None);
        // C reaches Ready as well: the ticket follows.
        assert_eq!(rollup_ticket(&[Ready, Ready, Ready]), Some(Ready));
    }

    #[test]
    fn order_rollup_rules() {
        assert_eq!(
            rollup_order(&[Cancelled, Cancelled]),
            Some(OrderState::Cancelled)
        );
        assert_eq!(rollup_order(&[Served, Served]), Some(OrderState::Served));
        assert_eq!(rollup_order(&[Ready, Served]), Some(OrderState::Ready));
        assert_eq!(rollup_order(&[Ready, Cancelled]), Some(OrderState::Ready));
        assert_eq!(
            rollup_order(&[InProgress, Queued, Ready]),
            Some(OrderState::InProgress)
        );
        assert_eq!(rollup_order(&[Queued, Queued]), Some(OrderState::Draft));
    }

    #[test]
    fn order_rollup_leaves_unlisted_mixes_alone() {
        assert_eq!(rollup_order(&[Served, Cancelled]), None);
        assert_eq!(rollup_order(&[Queued, Ready]), None);
        assert_eq!(rollup_order(&[Queued, Served]), None);
        assert_eq!(rollup_order(&[]), None);
    }

    #[test]
    fn order_rollup_is_deterministic() {
        let inputs = [Served, InProgress, Ready, Queued, Cancelled];
        assert_eq!(rollup_order(&inputs), rollup_order(&inputs));
    }

    #[test]
    fn order_follows_its_tickets_to_served() {
        // One ticket served, one still being prepared: the order is in progress.
        assert_eq!(
            rollup_order(&[Served, InProgress]),
            Some(OrderState::InProgress)
        );
        // The second ticket completes: the order is served.
        assert_eq!(rollup_order(&[Served, Served]), Some(OrderState::Served));
    }

    #[test]
    fn requeue_correction_is_a_legal_ticket_edge() {
        assert!(ticket_transition_allowed(InProgress, Queued));
        assert!(ticket_transition_allowed(Ready, InProgress));
        assert!(!item_transition_allowed(InProgress, Queued));
    }
}
