// Entry point handing out resources bound to one account
use std::sync::Arc;

use crate::component::{ComponentUsage, SubscriptionComponent};
use crate::config::{ClientConfig, Credentials};
use crate::credit_card::CreditCard;
use crate::customer::{Customer, CustomerAttributes};
use crate::error::Result;
use crate::postback::PostBack;
use crate::product::{Product, ProductFamily, ProductFamilyComponent};
use crate::subscription::Subscription;
use crate::transport::{Connection, Transport};

/// Every resource created here shares the facade's credentials and transport.
///
/// ```no_run
/// use chargify::Chargify;
///
/// let chargify = Chargify::new("api-key", "acme")?;
/// for customer in chargify.customer().list_all()? {
///     println!("{}", customer.full_name());
/// }
/// # Ok::<(), chargify::ChargifyError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Chargify {
    connection: Connection,
}

impl Chargify {
    pub fn new(api_key: impl Into<String>, subdomain: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(api_key, subdomain))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            connection: Connection::new(config)?,
        })
    }

    // Custom transports, e.g. a recording one in tests
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            connection: Connection::with_transport(config, transport),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        self.connection.credentials()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn customer(&self) -> Customer {
        Customer::new(self.connection.clone())
    }

    pub fn customer_attributes(&self) -> CustomerAttributes {
        CustomerAttributes::new(self.connection.clone())
    }

    pub fn product(&self) -> Product {
        Product::new(self.connection.clone())
    }

    pub fn product_family(&self) -> ProductFamily {
        ProductFamily::new(self.connection.clone())
    }

    // Components defined on a product family
    pub fn component(&self) -> ProductFamilyComponent {
        ProductFamilyComponent::new(self.connection.clone())
    }

    pub fn subscription(&self) -> Subscription {
        Subscription::new(self.connection.clone())
    }

    pub fn subscription_component(&self) -> SubscriptionComponent {
        SubscriptionComponent::new(self.connection.clone())
    }

    pub fn component_usage(&self) -> ComponentUsage {
        ComponentUsage::new(self.connection.clone())
    }

    pub fn credit_card(&self) -> CreditCard {
        CreditCard::new(self.connection.clone())
    }

    /// Resolves a webhook payload to the subscriptions it names.
    pub fn post_back(&self, payload: &str) -> Result<PostBack> {
        PostBack::from_json(self.connection.clone(), payload)
    }
}
