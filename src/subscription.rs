// Subscriptions and the account actions performed on them
use std::fmt;

use crate::component::SubscriptionComponent;
use crate::credit_card::CreditCard;
use crate::customer::Customer;
use crate::error::{ChargifyError, Result};
use crate::product::Product;
use crate::resource::{Kind, Resource};
use crate::schema::{Field, ResourceKind, Schema};
use crate::xml_tree::XmlElement;

pub static SUBSCRIPTION_SCHEMA: Schema = Schema {
    kind: ResourceKind::Subscription,
    root: "subscription",
    listing: Some("subscriptions"),
    compound_key: None,
    fields: &[
        Field::null("id"),
        Field::text("state", ""),
        Field::text("balance_in_cents", "0"),
        Field::null("current_period_started_at"),
        Field::null("current_period_ends_at"),
        Field::null("trial_started_at"),
        Field::null("trial_ended_at"),
        Field::null("activated_at"),
        Field::null("expires_at"),
        Field::null("created_at"),
        Field::null("updated_at"),
        Field::null("customer"),
        Field::text("customer_reference", ""),
        Field::null("product"),
        Field::text("product_handle", ""),
        Field::null("credit_card"),
        Field::null("components"),
    ],
    nested: &[
        ("customer", ResourceKind::Customer),
        ("customer_attributes", ResourceKind::CustomerAttributes),
        ("product", ResourceKind::Product),
        ("credit_card", ResourceKind::CreditCard),
        ("credit_card_attributes", ResourceKind::CreditCard),
        ("components", ResourceKind::SubscriptionComponent),
    ],
    encode_override: None,
};

#[derive(Debug, Clone, Copy)]
pub struct SubscriptionKind;

impl Kind for SubscriptionKind {
    const KIND: ResourceKind = ResourceKind::Subscription;
}

pub type Subscription = Resource<SubscriptionKind>;

impl Resource<SubscriptionKind> {
    pub fn customer(&self) -> Option<Customer> {
        self.nested("customer")
    }

    pub fn product(&self) -> Option<Product> {
        self.nested("product")
    }

    pub fn credit_card(&self) -> Option<CreditCard> {
        self.nested("credit_card")
            .or_else(|| self.nested("credit_card_attributes"))
    }

    // Components embedded in the decoded document, not fetched
    pub fn components(&self) -> Vec<SubscriptionComponent> {
        self.nested_list("components")
    }

    pub fn get_by_customer_id(&self, customer_id: impl fmt::Display) -> Result<Vec<Subscription>> {
        self.fetch_many(&format!("/customers/{}/subscriptions.xml", customer_id))
    }

    /// Exactly one subscription; zero or several matches are decode errors.
    pub fn get_by_subscription_id(&self, subscription_id: impl fmt::Display) -> Result<Subscription> {
        self.fetch_one(&format!("/subscriptions/{}.xml", subscription_id))
    }

    pub fn fetch_components(&self) -> Result<Vec<SubscriptionComponent>> {
        let id = self.require_id()?;
        let components: SubscriptionComponent = self.sibling();
        components.get_by_subscription_id(id)
    }

    pub fn fetch_component(&self, component_id: impl fmt::Display) -> Result<SubscriptionComponent> {
        let id = self.require_id()?;
        let components: SubscriptionComponent = self.sibling();
        components
            .get_by_compound_key(id, component_id)?
            .into_one()
            .ok_or_else(|| {
                ChargifyError::Configuration("component compound key addresses a collection".into())
            })
    }

    pub fn reset_balance(&self) -> Result<()> {
        let path = format!("/subscriptions/{}/reset_balance.xml", self.require_id()?);
        self.connection().put(&path, None)?;
        Ok(())
    }

    pub fn reactivate(&self) -> Result<()> {
        let path = format!("/subscriptions/{}/reactivate.xml", self.require_id()?);
        self.connection().put(&path, None)?;
        Ok(())
    }

    /// Moves the subscription to another product and returns the updated subscription.
    pub fn upgrade(&self, product_handle: &str) -> Result<Subscription> {
        let path = format!("/subscriptions/{}.xml", self.require_id()?);
        let mut document = XmlElement::new("subscription");
        document.push(XmlElement::with_text("product_handle", product_handle));
        let response = self.connection().put(&path, Some(document.to_document()?))?;
        self.decode_one(&response)
    }

    // Cancels the subscription
    pub fn unsubscribe(&self, message: &str) -> Result<()> {
        let path = format!("/subscriptions/{}.xml", self.require_id()?);
        let mut document = XmlElement::new("subscription");
        document.push(XmlElement::with_text("cancellation_message", message));
        self.connection().delete(&path, Some(document.to_document()?))?;
        Ok(())
    }
}
