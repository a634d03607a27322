// Products, product families and the components defined on a family
use std::fmt;

use crate::error::Result;
use crate::resource::{Kind, Resource};
use crate::schema::{Field, ResourceKind, Schema};

pub static PRODUCT_FAMILY_SCHEMA: Schema = Schema {
    kind: ResourceKind::ProductFamily,
    root: "product_family",
    listing: Some("product_families"),
    compound_key: None,
    fields: &[
        Field::null("id"),
        Field::null("accounting_code"),
        Field::text("description", ""),
        Field::text("handle", ""),
        Field::text("name", ""),
    ],
    nested: &[],
    encode_override: None,
};

pub static FAMILY_COMPONENT_SCHEMA: Schema = Schema {
    kind: ResourceKind::ProductFamilyComponent,
    root: "component",
    listing: None,
    compound_key: None,
    fields: &[
        Field::null("id"),
        Field::text("name", ""),
        Field::text("kind", ""),
        Field::text("product_family_id", "0"),
        Field::text("price_per_unit_in_cents", "0"),
        Field::text("pricing_scheme", ""),
        Field::null("unit_name"),
        Field::null("updated_at"),
        Field::null("created_at"),
    ],
    nested: &[],
    encode_override: None,
};

pub static PRODUCT_SCHEMA: Schema = Schema {
    kind: ResourceKind::Product,
    root: "product",
    listing: Some("products"),
    compound_key: None,
    fields: &[
        Field::null("id"),
        Field::text("price_in_cents", "0"),
        Field::text("name", ""),
        Field::text("handle", ""),
        Field::null("product_family"),
        Field::text("accounting_code", ""),
        Field::text("interval_unit", ""),
        Field::text("interval", "0"),
    ],
    nested: &[("product_family", ResourceKind::ProductFamily)],
    encode_override: None,
};

#[derive(Debug, Clone, Copy)]
pub struct ProductFamilyKind;

impl Kind for ProductFamilyKind {
    const KIND: ResourceKind = ResourceKind::ProductFamily;
}

#[derive(Debug, Clone, Copy)]
pub struct ProductFamilyComponentKind;

impl Kind for ProductFamilyComponentKind {
    const KIND: ResourceKind = ResourceKind::ProductFamilyComponent;
}

#[derive(Debug, Clone, Copy)]
pub struct ProductKind;

impl Kind for ProductKind {
    const KIND: ResourceKind = ResourceKind::Product;
}

pub type ProductFamily = Resource<ProductFamilyKind>;
pub type ProductFamilyComponent = Resource<ProductFamilyComponentKind>;
pub type Product = Resource<ProductKind>;

impl Resource<ProductFamilyKind> {
    pub fn fetch_components(&self) -> Result<Vec<ProductFamilyComponent>> {
        let id = self.require_id()?;
        let components: ProductFamilyComponent = self.sibling();
        components.get_by_product_family_id(id)
    }
}

impl fmt::Display for Resource<ProductFamilyKind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field("handle").unwrap_or(""))
    }
}

impl Resource<ProductFamilyComponentKind> {
    pub fn get_by_product_family_id(
        &self,
        family_id: impl fmt::Display,
    ) -> Result<Vec<ProductFamilyComponent>> {
        self.fetch_many(&format!("/product_families/{}/components.xml", family_id))
    }

    // First component of the family whose id matches, if any
    pub fn get_by_ids(
        &self,
        family_id: impl fmt::Display,
        id: impl fmt::Display,
    ) -> Result<Option<ProductFamilyComponent>> {
        let wanted = id.to_string();
        Ok(self
            .get_by_product_family_id(family_id)?
            .into_iter()
            .find(|c| c.id() == Some(wanted.as_str())))
    }

    pub fn fetch_product_family(&self) -> Result<ProductFamily> {
        let family_id = self.field("product_family_id").unwrap_or("0").to_string();
        let families: ProductFamily = self.sibling();
        families.get_by_id(family_id)
    }
}

impl fmt::Display for Resource<ProductFamilyComponentKind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field("name").unwrap_or(""))
    }
}

impl Resource<ProductKind> {
    // GET /products/handle/{handle}.xml
    pub fn get_by_handle(&self, handle: &str) -> Result<Product> {
        self.fetch_one(&format!("/products/handle/{}.xml", handle))
    }

    pub fn product_family(&self) -> Option<ProductFamily> {
        self.nested("product_family")
    }

    /// Hosted signup page for this product, `None` for a product without an id.
    pub fn payment_page_url(&self) -> Option<String> {
        self.id().map(|id| {
            format!(
                "https://{}/h/{}/subscriptions/new",
                self.connection().request_host(),
                id
            )
        })
    }

    pub fn price_in_cents(&self) -> i64 {
        self.field("price_in_cents")
            .and_then(|cents| cents.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn price_in_dollars(&self) -> f64 {
        self.price_in_cents() as f64 / 100.0
    }

    pub fn formatted_price(&self) -> String {
        format!("${:.2}", self.price_in_dollars())
    }
}

impl fmt::Display for Resource<ProductKind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field("handle").unwrap_or(""))
    }
}
