// Static per-resource declarations consulted by the generic marshaler
use std::fmt;

use crate::record::Record;
use crate::xml_tree::XmlElement;

// Never serialized back to the API
pub const IGNORED_FIELDS: &[&str] = &["created_at", "modified_at", "updated_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Customer,
    CustomerAttributes,
    ProductFamily,
    ProductFamilyComponent,
    Product,
    Subscription,
    CreditCard,
    SubscriptionComponent,
    ComponentUsage,
}

impl ResourceKind {
    pub fn schema(self) -> &'static Schema {
        match self {
            ResourceKind::Customer => &crate::customer::CUSTOMER_SCHEMA,
            ResourceKind::CustomerAttributes => &crate::customer::CUSTOMER_ATTRIBUTES_SCHEMA,
            ResourceKind::ProductFamily => &crate::product::PRODUCT_FAMILY_SCHEMA,
            ResourceKind::ProductFamilyComponent => &crate::product::FAMILY_COMPONENT_SCHEMA,
            ResourceKind::Product => &crate::product::PRODUCT_SCHEMA,
            ResourceKind::Subscription => &crate::subscription::SUBSCRIPTION_SCHEMA,
            ResourceKind::CreditCard => &crate::credit_card::CREDIT_CARD_SCHEMA,
            ResourceKind::SubscriptionComponent => &crate::component::SUBSCRIPTION_COMPONENT_SCHEMA,
            ResourceKind::ComponentUsage => &crate::component::COMPONENT_USAGE_SCHEMA,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A scalar field and the value it reports until something sets it.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub default: Option<&'static str>,
}

impl Field {
    pub const fn text(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }

    pub const fn null(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }
}

pub type EncodeOverride = fn(&Record) -> Option<XmlElement>;

pub struct Schema {
    pub kind: ResourceKind,
    // Element name used for decoding and encoding
    pub root: &'static str,
    // Collection path segment; resources without one are not directly listable
    pub listing: Option<&'static str>,
    // Two or three path segments for resources addressed through a parent
    pub compound_key: Option<&'static [&'static str]>,
    pub fields: &'static [Field],
    // Child element name -> resource kind used to decode/encode it
    pub nested: &'static [(&'static str, ResourceKind)],
    pub encode_override: Option<EncodeOverride>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("kind", &self.kind)
            .field("root", &self.root)
            .field("listing", &self.listing)
            .field("compound_key", &self.compound_key)
            .field("encode_override", &self.encode_override.is_some())
            .finish_non_exhaustive()
    }
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn nested_kind(&self, element: &str) -> Option<ResourceKind> {
        self.nested
            .iter()
            .find(|(name, _)| *name == element)
            .map(|(_, kind)| *kind)
    }
}
