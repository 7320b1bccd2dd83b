// SPDX-License-Identifier: GPL-3.0-or-later
use cadence_application::{ResolveEvent, ResolveEventSink};
use cadence_domain::QueryId;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{trace, warn};

/// Event channels keyed by the query they belong to.
#[derive(Default)]
pub(crate) struct RouteTable {
    routes: Mutex<HashMap<QueryId, UnboundedSender<ResolveEvent>>>,
}

impl RouteTable {
    pub(crate) fn len(&self) -> usize {
        self.routes.lock().expect("Failed to acquire lock").len()
    }

    /// Returns false, leaving the table untouched, when the query already has a route.
    fn insert(&self, query_id: QueryId, tx: UnboundedSender<ResolveEvent>) -> bool {
        match self
            .routes
            .lock()
            .expect("Failed to acquire lock")
            .entry(query_id)
        {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(tx);
                true
            }
        }
    }

    fn remove(&self, query_id: QueryId) {
        self.routes
            .lock()
            .expect("Failed to acquire lock")
            .remove(&query_id);
    }
}

impl ResolveEventSink for RouteTable {
    fn publish(&self, event: ResolveEvent) {
        let query_id = event.query_id();
        let routes = self.routes.lock().expect("Failed to acquire lock");
        let Some(tx) = routes.get(&query_id) else {
            warn!(target: "pipeline", %query_id, event = event.name(), "no route for query, dropping event");
            return;
        };
        trace!(target: "pipeline", %query_id, event = event.name(), "routing event");
        // A caller that dropped its pending query no longer wants the events.
        let _ = tx.send(event);
    }
}

/// Keeps a query's route registered until dropped.
pub(crate) struct RouteGuard {
    table: Arc<RouteTable>,
    query_id: QueryId,
}

impl RouteGuard {
    /// `None` when `query_id` is already routed to another submission.
    pub(crate) fn register(
        table: Arc<RouteTable>,
        query_id: QueryId,
        tx: UnboundedSender<ResolveEvent>,
    ) -> Option<Self> {
        table
            .insert(query_id, tx)
            .then(|| Self { table, query_id })
    }
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        self.table.remove(self.query_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn empty_results(query_id: QueryId) -> ResolveEvent {
        ResolveEvent::Results {
            query_id,
            results: Vec::new(),
        }
    }

    #[test]
    fn events_reach_only_their_own_query() {
        let table = Arc::new(RouteTable::default());
        let (first_id, second_id) = (QueryId::new(), QueryId::new());
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();
        let (second_tx, mut second_rx) = mpsc::unbounded_channel();
        let _first = RouteGuard::register(Arc::clone(&table), first_id, first_tx).expect("route");
        let _second =
            RouteGuard::register(Arc::clone(&table), second_id, second_tx).expect("route");

        table.publish(empty_results(second_id));

        assert!(first_rx.try_recv().is_err());
        let event = second_rx.try_recv().expect("routed event");
        assert_eq!(event.query_id(), second_id);
    }

    #[test]
    fn dropping_the_guard_closes_the_channel() {
        let table = Arc::new(RouteTable::default());
        let query_id = QueryId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = RouteGuard::register(Arc::clone(&table), query_id, tx).expect("route");
        assert_eq!(table.len(), 1);

        drop(guard);

        assert_eq!(table.len(), 0);
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        // Late events for an unregistered query are dropped quietly.
        table.publish(empty_results(query_id));
    }

    #[test]
    fn a_routed_query_cannot_be_registered_twice() {
        let table = Arc::new(RouteTable::default());
        let query_id = QueryId::new();
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();
        let (second_tx, _second_rx) = mpsc::unbounded_channel();

        let first = RouteGuard::register(Arc::clone(&table), query_id, first_tx).expect("route");
        assert!(RouteGuard::register(Arc::clone(&table), query_id, second_tx).is_none());

        // The rejected registration leaves the first route in place.
        table.publish(empty_results(query_id));
        assert!(first_rx.try_recv().is_ok());
        assert_eq!(table.len(), 1);

        drop(first);
        assert_eq!(table.len(), 0);
    }
}
