// Components attached to a subscription and the metered usage recorded against them
use std::fmt;

use crate::error::{ChargifyError, Result};
use crate::record::{Record, Value};
use crate::resource::{Kind, Resource};
use crate::schema::{Field, ResourceKind, Schema};
use crate::xml_tree::XmlElement;

pub static SUBSCRIPTION_COMPONENT_SCHEMA: Schema = Schema {
    kind: ResourceKind::SubscriptionComponent,
    root: "component",
    listing: None,
    compound_key: Some(&["subscriptions", "components"]),
    fields: &[
        Field::null("component_id"),
        Field::null("subscription_id"),
        Field::text("name", ""),
        Field::text("kind", ""),
        Field::null("unit_name"),
        Field::text("unit_balance", "0"),
        Field::text("allocated_quantity", "0"),
        Field::text("pricing_scheme", ""),
        Field::text("enabled", "false"),
    ],
    nested: &[],
    encode_override: Some(encode_component),
};

pub static COMPONENT_USAGE_SCHEMA: Schema = Schema {
    kind: ResourceKind::ComponentUsage,
    root: "usage",
    listing: None,
    compound_key: Some(&["subscriptions", "components", "usages"]),
    fields: &[
        Field::null("id"),
        Field::text("quantity", "0"),
        Field::text("memo", ""),
    ],
    nested: &[],
    encode_override: None,
};

/// The three component flavours Chargify bills differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    Metered,
    QuantityBased,
    OnOff,
    Other(String),
}

impl ComponentKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "metered_component" => ComponentKind::Metered,
            "quantity_based_component" => ComponentKind::QuantityBased,
            "on_off_component" => ComponentKind::OnOff,
            other => ComponentKind::Other(other.to_string()),
        }
    }

    // Field that can be written back for this kind; metered usage goes through usages
    pub fn writable_field(&self) -> Option<&'static str> {
        match self {
            ComponentKind::Metered => None,
            ComponentKind::OnOff => Some("enabled"),
            ComponentKind::QuantityBased | ComponentKind::Other(_) => Some("allocated_quantity"),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Metered => f.write_str("metered_component"),
            ComponentKind::QuantityBased => f.write_str("quantity_based_component"),
            ComponentKind::OnOff => f.write_str("on_off_component"),
            ComponentKind::Other(kind) => f.write_str(kind),
        }
    }
}

// `<component>` with the id and the single field its kind allows, or nothing when
// the kind is metered or the field was never set. Explicit `0` and `false` are written.
fn encode_component(record: &Record) -> Option<XmlElement> {
    let kind = ComponentKind::parse(record.text("kind").unwrap_or(""));
    let field = kind.writable_field()?;
    let value = record
        .get(field)
        .and_then(Value::as_text)
        .filter(|v| !v.is_empty())?;

    let mut element = XmlElement::new(SUBSCRIPTION_COMPONENT_SCHEMA.root);
    element.push(XmlElement::with_text(
        "component_id",
        record.text("component_id").unwrap_or(""),
    ));
    element.push(XmlElement::with_text(field, value));
    Some(element)
}

#[derive(Debug, Clone, Copy)]
pub struct SubscriptionComponentKind;

impl Kind for SubscriptionComponentKind {
    const KIND: ResourceKind = ResourceKind::SubscriptionComponent;
}

#[derive(Debug, Clone, Copy)]
pub struct ComponentUsageKind;

impl Kind for ComponentUsageKind {
    const KIND: ResourceKind = ResourceKind::ComponentUsage;
}

pub type SubscriptionComponent = Resource<SubscriptionComponentKind>;
pub type ComponentUsage = Resource<ComponentUsageKind>;

impl Resource<SubscriptionComponentKind> {
    pub fn component_kind(&self) -> ComponentKind {
        ComponentKind::parse(self.field("kind").unwrap_or(""))
    }

    pub fn get_by_subscription_id(
        &self,
        subscription_id: impl fmt::Display,
    ) -> Result<Vec<SubscriptionComponent>> {
        self.fetch_many(&format!("/subscriptions/{}/components.xml", subscription_id))
    }

    /// Sets the allocated quantity of a quantity-based component.
    pub fn update_quantity(&mut self, quantity: u64) -> Result<()> {
        let path = self.member_path(ComponentKind::QuantityBased)?;
        let mut document = XmlElement::new("component");
        document.push(
            XmlElement::with_text("allocated_quantity", quantity.to_string())
                .with_attribute("type", "integer"),
        );
        self.connection().put(&path, Some(document.to_document()?))?;
        self.set("allocated_quantity", quantity);
        Ok(())
    }

    /// Switches an on/off component.
    pub fn update_on_off(&mut self, enabled: bool) -> Result<()> {
        let path = self.member_path(ComponentKind::OnOff)?;
        let mut document = XmlElement::new("component");
        document.push(
            XmlElement::with_text("enabled", enabled.to_string()).with_attribute("type", "boolean"),
        );
        self.connection().put(&path, Some(document.to_document()?))?;
        self.set("enabled", enabled);
        Ok(())
    }

    pub fn fetch_usages(&self) -> Result<Vec<ComponentUsage>> {
        let (subscription_id, component_id) = self.require_ids(ComponentKind::Metered)?;
        let usages: ComponentUsage = self.sibling();
        Ok(usages
            .get_by_compound_key(subscription_id, component_id)?
            .into_many())
    }

    /// Records metered usage and returns the usage Chargify created.
    pub fn create_usage(&self, quantity: u64, memo: Option<&str>) -> Result<ComponentUsage> {
        let (subscription_id, component_id) = self.require_ids(ComponentKind::Metered)?;
        let path = format!(
            "/subscriptions/{}/components/{}/usages.xml",
            subscription_id, component_id
        );
        let mut document = XmlElement::new(COMPONENT_USAGE_SCHEMA.root);
        document.push(XmlElement::with_text("quantity", quantity.to_string()));
        document.push(XmlElement::with_text("memo", memo.unwrap_or("")));

        let response = self.connection().post(&path, document.to_document()?)?;
        let usages: ComponentUsage = self.sibling();
        usages.decode_one(&response)
    }

    // Both ids, provided the component is of the expected kind
    fn require_ids(&self, expected: ComponentKind) -> Result<(&str, &str)> {
        let ids = self
            .record()
            .non_empty_text("subscription_id")
            .zip(self.record().non_empty_text("component_id"))
            .ok_or_else(|| {
                ChargifyError::Domain("component needs subscription_id and component_id".into())
            })?;
        let actual = self.component_kind();
        if actual != expected {
            return Err(ChargifyError::Domain(format!(
                "operation requires a {} but component is {}",
                expected, actual
            )));
        }
        Ok(ids)
    }

    fn member_path(&self, expected: ComponentKind) -> Result<String> {
        let (subscription_id, component_id) = self.require_ids(expected)?;
        Ok(format!(
            "/subscriptions/{}/components/{}.xml",
            subscription_id, component_id
        ))
    }
}

impl fmt::Display for Resource<SubscriptionComponentKind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field("name").unwrap_or(""))
    }
}
