// Customers, plus the `customer_attributes` variant used when a subscription
// creates its customer inline
use crate::error::Result;
use crate::resource::{Kind, Resource};
use crate::schema::{Field, ResourceKind, Schema};
use crate::subscription::Subscription;

const CUSTOMER_FIELDS: &[Field] = &[
    Field::null("id"),
    Field::text("reference", ""),
    Field::text("first_name", ""),
    Field::text("last_name", ""),
    Field::text("email", ""),
    Field::null("phone"),
    Field::text("organization", ""),
    Field::text("address", ""),
    Field::text("address_2", ""),
    Field::text("city", ""),
    Field::text("country", ""),
    Field::text("state", ""),
    Field::text("zip", ""),
    Field::null("created_at"),
    Field::null("updated_at"),
];

pub static CUSTOMER_SCHEMA: Schema = Schema {
    kind: ResourceKind::Customer,
    root: "customer",
    listing: Some("customers"),
    compound_key: None,
    fields: CUSTOMER_FIELDS,
    nested: &[],
    encode_override: None,
};

pub static CUSTOMER_ATTRIBUTES_SCHEMA: Schema = Schema {
    kind: ResourceKind::CustomerAttributes,
    root: "customer_attributes",
    listing: Some("customers"),
    compound_key: None,
    fields: CUSTOMER_FIELDS,
    nested: &[],
    encode_override: None,
};

#[derive(Debug, Clone, Copy)]
pub struct CustomerKind;

impl Kind for CustomerKind {
    const KIND: ResourceKind = ResourceKind::Customer;
}

#[derive(Debug, Clone, Copy)]
pub struct CustomerAttributesKind;

impl Kind for CustomerAttributesKind {
    const KIND: ResourceKind = ResourceKind::CustomerAttributes;
}

pub type Customer = Resource<CustomerKind>;
pub type CustomerAttributes = Resource<CustomerAttributesKind>;

impl Resource<CustomerKind> {
    pub fn get_by_reference(&self, reference: &str) -> Result<Customer> {
        self.get_by_attribute("reference", reference)
    }

    // GET /customers/{id}/subscriptions.xml
    pub fn fetch_subscriptions(&self) -> Result<Vec<Subscription>> {
        let id = self.require_id()?;
        let subscriptions: Subscription = self.sibling();
        subscriptions.get_by_customer_id(id)
    }

    pub fn full_name(&self) -> String {
        let first = self.field("first_name").unwrap_or("");
        let last = self.field("last_name").unwrap_or("");
        format!("{} {}", first, last).trim().to_string()
    }
}
