use crate::models::HandshakeTicket;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local table of pending handshakes, keyed by site id.
#[derive(Clone, Default)]
pub struct TicketRepository {
    tickets: Arc<RwLock<HashMap<String, HandshakeTicket>>>,
}

impl TicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `ticket`, returning the one it superseded for the same site.
    pub async fn issue(&self, ticket: HandshakeTicket) -> Option<HandshakeTicket> {
        self.tickets
            .write()
            .await
            .insert(ticket.site_id.clone(), ticket)
    }

    #[cfg(test)]
    pub async fn get(&self, site_id: &str) -> Option<HandshakeTicket> {
        self.tickets.read().await.get(site_id).cloned()
    }

    pub async fn is_pending(&self, site_id: &str) -> bool {
        self.tickets.read().await.contains_key(site_id)
    }

    /// Pending tickets for an owner, most recent first.
    pub async fn pending_for_owner(&self, owner_id: &str) -> Vec<HandshakeTicket> {
        let mut tickets: Vec<_> = self
            .tickets
            .read()
            .await
            .values()
            .filter(|ticket| ticket.owner_id == owner_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        tickets
    }

    /// Removes the ticket for `site_id` only if it is still the one that was matched.
    pub async fn consume(&self, ticket: &HandshakeTicket) -> bool {
        let mut tickets = self.tickets.write().await;
        if tickets.get(&ticket.site_id) == Some(ticket) {
            tickets.remove(&ticket.site_id);
            return true;
        }
        false
    }

    pub async fn discard(&self, site_id: &str) -> Option<HandshakeTicket> {
        self.tickets.write().await.remove(site_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issuing_again_supersedes_prior_ticket() {
        let repo = TicketRepository::new();
        let first = HandshakeTicket::issue("s1", "u1", "example.com", false);
        assert!(repo.issue(first.clone()).await.is_none());

        let second = HandshakeTicket::issue("s1", "u1", "example.com", true);
        let superseded = repo.issue(second.clone()).await;
        assert_eq!(superseded, Some(first.clone()));

        assert_eq!(repo.pending_for_owner("u1").await.len(), 1);
        assert_eq!(repo.get("s1").await, Some(second.clone()));

        // The superseded ticket can no longer be consumed.
        assert!(!repo.consume(&first).await);
        assert!(repo.consume(&second).await);
        assert!(!repo.consume(&second).await);
        assert!(!repo.is_pending("s1").await);
    }

    #[tokio::test]
    async fn pending_for_owner_filters_and_orders() {
        let repo = TicketRepository::new();
        let older = HandshakeTicket::issue("s1", "u1", "a.com", false);
        let mut newer = HandshakeTicket::issue("s2", "u1", "b.com", false);
        newer.issued_at = older.issued_at + chrono::Duration::seconds(5);
        repo.issue(older).await;
        repo.issue(newer).await;
        repo.issue(HandshakeTicket::issue("s3", "u2", "c.com", false))
            .await;

        let pending = repo.pending_for_owner("u1").await;
        let ids: Vec<_> = pending.iter().map(|t| t.site_id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s1"]);
    }
}
