// Generic resource contract: list, fetch, lookup and save built from the transport,
// the marshaler and each type's static schema.
use std::fmt;
use std::marker::PhantomData;

use chrono::Local;
use url::form_urlencoded;

use crate::config::Credentials;
use crate::error::{ChargifyError, Result};
use crate::marshal;
use crate::record::{Record, Value};
use crate::schema::{ResourceKind, Schema};
use crate::transport::Connection;

/// Binds a marker type to the [`ResourceKind`] whose schema drives it.
pub trait Kind: Send + Sync + 'static {
    const KIND: ResourceKind;
}

/// A resource instance: its attribute bag plus the connection it was created from.
///
/// An instance is *fresh* until it carries an `id`, which is the case for anything
/// decoded from a server response.
pub struct Resource<K: Kind> {
    connection: Connection,
    record: Record,
    kind: PhantomData<fn() -> K>,
}

impl<K: Kind> Clone for Resource<K> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            record: self.record.clone(),
            kind: PhantomData,
        }
    }
}

impl<K: Kind> fmt::Debug for Resource<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("kind", &K::KIND)
            .field("record", &self.record)
            .finish()
    }
}

impl<K: Kind> PartialEq for Resource<K> {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

/// Result of a compound-key lookup: two-segment keys address one resource,
/// three-segment keys a sub-collection.
#[derive(Debug, Clone, PartialEq)]
pub enum CompoundLookup<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> CompoundLookup<T> {
    pub fn into_one(self) -> Option<T> {
        match self {
            CompoundLookup::One(item) => Some(item),
            CompoundLookup::Many(_) => None,
        }
    }

    pub fn into_many(self) -> Vec<T> {
        match self {
            CompoundLookup::One(item) => vec![item],
            CompoundLookup::Many(items) => items,
        }
    }
}

impl<K: Kind> Resource<K> {
    pub fn new(connection: Connection) -> Self {
        Self::from_record(connection, Record::new(K::KIND))
    }

    pub(crate) fn from_record(connection: Connection, record: Record) -> Self {
        debug_assert_eq!(record.kind(), K::KIND);
        Self {
            connection,
            record,
            kind: PhantomData,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        K::KIND.schema()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn credentials(&self) -> &Credentials {
        self.connection.credentials()
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    /// Text value of `field`, falling back to the declared default.
    pub fn field(&self, field: &str) -> Option<&str> {
        self.record.text(field)
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.record.set(field, value);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.record.id()
    }

    pub fn is_hydrated(&self) -> bool {
        self.id().is_some()
    }

    // New instance of the same type sharing this instance's credentials
    pub fn fresh(&self) -> Self {
        Self::new(self.connection.clone())
    }

    pub fn list_all(&self) -> Result<Vec<Self>> {
        let listing = self.listing()?;
        self.fetch_many(&format!("/{}.xml", listing))
    }

    pub fn get_by_id(&self, id: impl fmt::Display) -> Result<Self> {
        let listing = self.listing()?;
        self.fetch_one(&format!("/{}/{}.xml", listing, id))
    }

    /// Lookup by an alternate natural key, e.g. a customer's `reference`.
    pub fn get_by_attribute(&self, key: &str, value: impl fmt::Display) -> Result<Self> {
        let listing = self.listing()?;
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(key, &value.to_string())
            .finish();
        self.fetch_one(&format!("/{}/lookup.xml?{}", listing, query))
    }

    pub fn get_by_compound_key(
        &self,
        parent_id: impl fmt::Display,
        child_id: impl fmt::Display,
    ) -> Result<CompoundLookup<Self>> {
        let key = self.schema().compound_key.ok_or_else(|| {
            ChargifyError::Configuration(format!("{} declares no compound key", K::KIND))
        })?;
        match key {
            [parent, child] => {
                let path = format!("/{}/{}/{}/{}.xml", parent, parent_id, child, child_id);
                self.fetch_one(&path).map(CompoundLookup::One)
            }
            [parent, child, collection] => {
                let path = format!(
                    "/{}/{}/{}/{}/{}.xml",
                    parent, parent_id, child, child_id, collection
                );
                self.fetch_many(&path).map(CompoundLookup::Many)
            }
            _ => Err(ChargifyError::Configuration(format!(
                "{} compound key must have two or three segments, found {}",
                K::KIND,
                key.len()
            ))),
        }
    }

    /// POSTs a fresh instance or PUTs a hydrated one, then re-hydrates from the response.
    ///
    /// The flag reports whether the returned `updated_at` falls on today's date.
    pub fn save(&mut self) -> Result<(bool, Self)> {
        let listing = self.listing()?;
        let body = marshal::to_document(&self.record)?.ok_or_else(|| {
            ChargifyError::Domain(format!("{} has nothing to write", K::KIND))
        })?;
        let today = Local::now().date_naive();

        let response = match self.id() {
            Some(id) => {
                let path = format!("/{}/{}.xml", listing, id);
                self.connection.put(&path, Some(body))?
            }
            None => self.connection.post(&format!("/{}.xml", listing), body)?,
        };

        let saved = self.decode_one(&response)?;
        let committed = saved
            .record
            .datetime("updated_at")
            .is_some_and(|updated| updated.date_naive() == today);
        self.record = saved.record.clone();
        Ok((committed, saved))
    }

    pub(crate) fn listing(&self) -> Result<&'static str> {
        self.schema().listing.ok_or_else(|| {
            ChargifyError::Configuration(format!("{} has no listing endpoint", K::KIND))
        })
    }

    pub(crate) fn fetch_one(&self, path: &str) -> Result<Self> {
        let body = self.connection.get(path)?;
        self.decode_one(&body)
    }

    pub(crate) fn fetch_many(&self, path: &str) -> Result<Vec<Self>> {
        let body = self.connection.get(path)?;
        self.decode_many(&body)
    }

    pub(crate) fn decode_one(&self, body: &str) -> Result<Self> {
        let record = marshal::decode_one(body, K::KIND, self.schema().root)?;
        Ok(self.wrap(record))
    }

    pub(crate) fn decode_many(&self, body: &str) -> Result<Vec<Self>> {
        let records = marshal::decode_many(body, K::KIND, self.schema().root)?;
        Ok(records.into_iter().map(|r| self.wrap(r)).collect())
    }

    pub(crate) fn wrap(&self, record: Record) -> Self {
        Self::from_record(self.connection.clone(), record)
    }

    // Another resource type bound to the same credentials
    pub(crate) fn sibling<T: Kind>(&self) -> Resource<T> {
        Resource::new(self.connection.clone())
    }

    pub(crate) fn nested<T: Kind>(&self, field: &str) -> Option<Resource<T>> {
        self.record
            .record(field)
            .filter(|r| r.kind() == T::KIND)
            .map(|r| Resource::from_record(self.connection.clone(), r.clone()))
    }

    pub(crate) fn nested_list<T: Kind>(&self, field: &str) -> Vec<Resource<T>> {
        self.record
            .records(field)
            .iter()
            .filter(|r| r.kind() == T::KIND)
            .map(|r| Resource::from_record(self.connection.clone(), r.clone()))
            .collect()
    }

    pub(crate) fn require_id(&self) -> Result<&str> {
        self.id()
            .ok_or_else(|| ChargifyError::Domain(format!("{} has no id", K::KIND)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use reqwest::Method;

    use super::*;
    use crate::component::{ComponentUsage, SubscriptionComponent};
    use crate::credit_card::CreditCard;
    use crate::customer::Customer;
    use crate::transport::mock::MockTransport;

    fn customer_xml(id: u32, updated_at: &str) -> String {
        format!(
            r#"<customer><id>{}</id><first_name>Jane</first_name><updated_at type="datetime">{}</updated_at></customer>"#,
            id, updated_at
        )
    }

    #[test]
    fn test_list_all_gets_listing_and_decodes_many() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            r#"<customers type="array"><customer><id>1</id></customer><customer><id>2</id></customer></customers>"#,
        );
        let customers = Customer::new(mock.connection()).list_all().unwrap();

        assert_eq!(customers.len(), 2);
        assert_eq!(customers[1].id(), Some("2"));
        assert_eq!(mock.last_request().unwrap().path, "/customers.xml");
    }

    #[test]
    fn test_list_all_empty_collection() {
        let mock = MockTransport::new();
        mock.respond(200, r#"<customers type="array"></customers>"#);
        assert!(Customer::new(mock.connection()).list_all().unwrap().is_empty());
    }

    #[test]
    fn test_get_by_id() {
        let mock = MockTransport::new();
        mock.respond(200, &customer_xml(9, "2020-01-01T00:00:00Z"));
        let customer = Customer::new(mock.connection()).get_by_id(9).unwrap();

        assert!(customer.is_hydrated());
        assert_eq!(customer.field("first_name"), Some("Jane"));
        assert_eq!(mock.last_request().unwrap().path, "/customers/9.xml");
    }

    #[test]
    fn test_get_by_attribute_encodes_query() {
        let mock = MockTransport::new();
        mock.respond(200, &customer_xml(9, "2020-01-01T00:00:00Z"));
        Customer::new(mock.connection())
            .get_by_attribute("reference", "a b&c")
            .unwrap();
        assert_eq!(
            mock.last_request().unwrap().path,
            "/customers/lookup.xml?reference=a+b%26c"
        );
    }

    #[test]
    fn test_operations_without_listing_are_configuration_errors() {
        let mock = MockTransport::new();
        let component = SubscriptionComponent::new(mock.connection());
        assert!(matches!(component.list_all(), Err(ChargifyError::Configuration(_))));
        assert!(matches!(component.get_by_id(1), Err(ChargifyError::Configuration(_))));
        let mut card = CreditCard::new(mock.connection());
        assert!(matches!(card.save(), Err(ChargifyError::Configuration(_))));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_compound_key_requires_declaration() {
        let mock = MockTransport::new();
        let err = Customer::new(mock.connection())
            .get_by_compound_key(1, 2)
            .unwrap_err();
        assert!(matches!(err, ChargifyError::Configuration(_)));
    }

    #[test]
    fn test_two_segment_compound_key_returns_one() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            "<component><component_id>5</component_id><subscription_id>3</subscription_id><kind>on_off_component</kind></component>",
        );
        let found = SubscriptionComponent::new(mock.connection())
            .get_by_compound_key(3, 5)
            .unwrap();

        assert_eq!(mock.last_request().unwrap().path, "/subscriptions/3/components/5.xml");
        let component = found.into_one().expect("two-segment key yields one resource");
        assert_eq!(component.field("kind"), Some("on_off_component"));
    }

    #[test]
    fn test_three_segment_compound_key_returns_many() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            r#"<usages type="array"><usage><id>1</id><quantity>5</quantity></usage><usage><id>2</id><quantity>7</quantity></usage></usages>"#,
        );
        let found = ComponentUsage::new(mock.connection())
            .get_by_compound_key(3, 5)
            .unwrap();

        assert_eq!(
            mock.last_request().unwrap().path,
            "/subscriptions/3/components/5/usages.xml"
        );
        match found {
            CompoundLookup::Many(usages) => {
                assert_eq!(usages.len(), 2);
                assert_eq!(usages[1].field("quantity"), Some("7"));
            }
            CompoundLookup::One(_) => panic!("three-segment key should yield a collection"),
        }
    }

    #[test]
    fn test_save_fresh_posts_and_reports_commit() {
        let mock = MockTransport::new();
        let now = Local::now().to_rfc3339();
        mock.respond(201, &customer_xml(12, &now));

        let mut customer = Customer::new(mock.connection());
        customer.set("first_name", "Jane").set("email", "jane@example.com");
        let (committed, saved) = customer.save().unwrap();

        assert!(committed);
        assert_eq!(saved.id(), Some("12"));
        assert_eq!(customer.id(), Some("12"));

        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/customers.xml");
        let body = request.body.unwrap();
        assert!(body.contains("<customer><first_name>Jane</first_name><email>jane@example.com</email></customer>"));
    }

    #[test]
    fn test_save_hydrated_puts_to_id() {
        let mock = MockTransport::new();
        let stale = (Local::now() - Duration::days(3)).to_rfc3339();
        mock.respond(200, &customer_xml(12, &stale));

        let mut customer = Customer::new(mock.connection());
        customer.set("id", "12").set("last_name", "Doe");
        let (committed, saved) = customer.save().unwrap();

        assert!(!committed);
        assert_eq!(saved.field("first_name"), Some("Jane"));
        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "/customers/12.xml");
        assert!(request.body.unwrap().contains("<id>12</id>"));
    }

    #[test]
    fn test_save_propagates_validation_errors() {
        let mock = MockTransport::new();
        mock.respond(422, "<errors><error>Email can't be blank</error></errors>");
        let mut customer = Customer::new(mock.connection());
        customer.set("first_name", "Jane");
        match customer.save().unwrap_err() {
            ChargifyError::ValidationFailed { errors } => {
                assert_eq!(errors, vec!["Email can't be blank".to_string()])
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!customer.is_hydrated());
    }

    #[test]
    fn test_resources_share_credentials() {
        let mock = MockTransport::new();
        let customer = Customer::new(mock.connection());
        let usage: ComponentUsage = customer.sibling();
        assert_eq!(usage.credentials(), customer.credentials());
        assert_eq!(customer.fresh().credentials().subdomain, "acme");
    }
}
