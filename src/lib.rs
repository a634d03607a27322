// Blocking client for the Chargify subscription-billing XML API

pub mod chargify;
pub mod component;
pub mod config;
pub mod credit_card;
pub mod customer;
pub mod encoding;
pub mod error;
pub mod marshal;
pub mod postback;
pub mod product;
pub mod record;
pub mod resource;
pub mod schema;
pub mod subscription;
pub mod transport;
pub mod xml_tree;

// Re-export key types for convenience
pub use chargify::Chargify;
pub use component::{ComponentKind, ComponentUsage, SubscriptionComponent};
pub use config::{ClientConfig, Credentials};
pub use credit_card::CreditCard;
pub use customer::{Customer, CustomerAttributes};
pub use error::{ChargifyError, Result};
pub use marshal::MarshalError;
pub use postback::PostBack;
pub use product::{Product, ProductFamily, ProductFamilyComponent};
pub use record::{Record, Value};
pub use resource::{CompoundLookup, Kind, Resource};
pub use schema::ResourceKind;
pub use subscription::Subscription;
pub use transport::{ApiRequest, ApiResponse, Connection, HttpTransport, Transport};
