// Webhook payloads: a JSON array of subscription ids, resolved to full subscriptions
use std::fmt;

use serde::Deserialize;

use crate::error::{ChargifyError, Result};
use crate::subscription::Subscription;
use crate::transport::Connection;

// Chargify sends ids as numbers, older relays as strings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum SubscriptionId {
    Number(u64),
    Text(String),
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionId::Number(id) => write!(f, "{}", id),
            SubscriptionId::Text(id) => f.write_str(id.trim()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostBack {
    pub subscriptions: Vec<Subscription>,
}

impl PostBack {
    /// Parses the webhook body and fetches every subscription it names, in order.
    pub fn from_json(connection: Connection, payload: &str) -> Result<Self> {
        let ids: Vec<SubscriptionId> = serde_json::from_str(payload)?;
        if let Some(blank) = ids.iter().find(|id| id.to_string().is_empty()) {
            return Err(ChargifyError::InvalidPostBack(format!(
                "blank subscription id {:?}",
                blank
            )));
        }
        tracing::debug!(count = ids.len(), "resolving post back subscriptions");

        let lookup = Subscription::new(connection);
        let mut subscriptions = Vec::with_capacity(ids.len());
        for id in &ids {
            subscriptions.push(lookup.get_by_subscription_id(id)?);
        }
        Ok(Self { subscriptions })
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
