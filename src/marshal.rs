// Object <-> XML marshaling shared by every resource type
use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::record::{Record, Value};
use crate::schema::{ResourceKind, IGNORED_FIELDS};
use crate::xml_tree::{find_all, parse_fragment, XmlElement};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarshalError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("no <{element}> element in response")]
    NotFound { element: String },

    #[error("expected one <{element}> element, found {count}")]
    Ambiguous { element: String, count: usize },

    #[error("invalid datetime in <{field}>: {value}")]
    InvalidDateTime { field: String, value: String },

    #[error("XML write error: {0}")]
    Write(String),
}

/// Decodes the single element named `root` anywhere in `xml` into a record of `kind`.
pub fn decode_one(xml: &str, kind: ResourceKind, root: &str) -> Result<Record, MarshalError> {
    let roots = parse_fragment(xml)?;
    let matches = find_all(&roots, root);
    match matches.as_slice() {
        [element] => decode_element(element, kind),
        [] => Err(MarshalError::NotFound {
            element: root.to_string(),
        }),
        many => Err(MarshalError::Ambiguous {
            element: root.to_string(),
            count: many.len(),
        }),
    }
}

/// Decodes every element named `root`, in document order. No match is an empty list.
pub fn decode_many(xml: &str, kind: ResourceKind, root: &str) -> Result<Vec<Record>, MarshalError> {
    let roots = parse_fragment(xml)?;
    let records = find_all(&roots, root)
        .into_iter()
        .map(|element| decode_element(element, kind))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::trace!(element = root, count = records.len(), "decoded records");
    Ok(records)
}

pub fn decode_element(element: &XmlElement, kind: ResourceKind) -> Result<Record, MarshalError> {
    let schema = kind.schema();
    let mut record = Record::new(kind);

    for child in &element.children {
        if child.name.is_empty() {
            continue;
        }
        let value = match schema.nested_kind(&child.name) {
            Some(nested) if child.attribute("type") == Some("array") => Value::List(
                child
                    .children
                    .iter()
                    .map(|item| decode_element(item, nested))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(nested) => Value::Record(Box::new(decode_element(child, nested)?)),
            None => decode_scalar(child)?,
        };
        record.set(child.name.clone(), value);
    }

    Ok(record)
}

fn decode_scalar(element: &XmlElement) -> Result<Value, MarshalError> {
    let text = if element.children.is_empty() {
        element.text.as_str()
    } else {
        element.text.trim()
    };
    if element.attribute("type") != Some("datetime") {
        return Ok(Value::Text(text.to_string()));
    }
    if text.trim().is_empty() || element.attribute("nil") == Some("true") {
        return Ok(Value::Null);
    }
    parse_datetime(text.trim())
        .map(Value::DateTime)
        .ok_or_else(|| MarshalError::InvalidDateTime {
            field: element.name.clone(),
            value: text.to_string(),
        })
}

// ISO-8601 with an offset, or without one (taken as UTC), converted to local time
pub fn parse_datetime(text: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Local));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc().with_timezone(&Local))
        .or_else(|| {
            text.parse::<DateTime<Utc>>()
                .ok()
                .map(|dt| dt.with_timezone(&Local))
        })
}

/// Serializes a record, honouring its type's encode override. `None` means there is
/// nothing to write.
pub fn encode(record: &Record) -> Option<XmlElement> {
    match record.schema().encode_override {
        Some(encode_override) => encode_override(record),
        None => Some(encode_fields(record)),
    }
}

fn encode_fields(record: &Record) -> XmlElement {
    let schema = record.schema();
    let mut element = XmlElement::new(schema.root);

    for (name, value) in record.iter() {
        if IGNORED_FIELDS.contains(&name) {
            continue;
        }
        match value {
            Value::Null => continue,
            Value::Text(text) => element.push(XmlElement::with_text(name, text.as_str())),
            Value::DateTime(dt) => element.push(
                XmlElement::with_text(name, dt.to_rfc3339_opts(SecondsFormat::Secs, false))
                    .with_attribute("type", "datetime"),
            ),
            Value::Record(nested) => {
                if let Some(mut child) = encode(nested) {
                    // Written back under the element it was decoded from
                    if schema.nested_kind(name).is_some() {
                        child.name = name.to_string();
                    }
                    element.push(child);
                }
            }
            Value::List(items) => {
                let mut container = XmlElement::new(name).with_attribute("type", "array");
                for child in items.iter().filter_map(encode) {
                    container.push(child);
                }
                element.push(container);
            }
        }
    }

    element
}

/// Full request body for a record, or `None` when its encoder yields nothing.
pub fn to_document(record: &Record) -> Result<Option<String>, MarshalError> {
    encode(record).map(|element| element.to_document()).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    const SUBSCRIPTION_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<subscription>
  <id>15</id>
  <state>active</state>
  <balance_in_cents>0</balance_in_cents>
  <activated_at type="datetime">2024-05-01T10:15:00Z</activated_at>
  <expires_at type="datetime" nil="true"></expires_at>
  <customer>
    <id>8</id>
    <first_name>Jane</first_name>
    <last_name>Doe</last_name>
    <reference>jd-1</reference>
    <created_at type="datetime">2024-04-30T09:00:00Z</created_at>
  </customer>
  <product>
    <id>3</id>
    <handle>gold</handle>
    <price_in_cents>2500</price_in_cents>
    <product_family>
      <id>1</id>
      <handle>plans</handle>
    </product_family>
  </product>
  <credit_card>
    <first_name>Jane</first_name>
    <masked_card_number>XXXX-1111</masked_card_number>
    <expiration_year>2030</expiration_year>
  </credit_card>
  <components type="array">
    <component>
      <component_id>11</component_id>
      <kind>quantity_based_component</kind>
      <allocated_quantity>3</allocated_quantity>
    </component>
    <component>
      <component_id>12</component_id>
      <kind>metered_component</kind>
    </component>
  </components>
</subscription>"#;

    #[test]
    fn test_decode_subscription_with_nested_resources() {
        let sub = decode_one(SUBSCRIPTION_XML, ResourceKind::Subscription, "subscription").unwrap();

        assert_eq!(sub.kind(), ResourceKind::Subscription);
        assert_eq!(sub.id(), Some("15"));
        assert_eq!(sub.text("state"), Some("active"));

        let customer = sub.record("customer").expect("customer should be a nested record");
        assert_eq!(customer.kind(), ResourceKind::Customer);
        assert_eq!(customer.text("first_name"), Some("Jane"));
        assert!(customer.datetime("created_at").is_some());

        let product = sub.record("product").expect("product should be a nested record");
        assert_eq!(product.kind(), ResourceKind::Product);
        assert_eq!(product.text("handle"), Some("gold"));
        let family = product.record("product_family").unwrap();
        assert_eq!(family.kind(), ResourceKind::ProductFamily);
        assert_eq!(family.text("handle"), Some("plans"));

        let components = sub.records("components");
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].kind(), ResourceKind::SubscriptionComponent);
        assert_eq!(components[0].text("allocated_quantity"), Some("3"));
        assert_eq!(components[1].text("allocated_quantity"), Some("0"));
    }

    #[test]
    fn test_decode_datetimes() {
        let sub = decode_one(SUBSCRIPTION_XML, ResourceKind::Subscription, "subscription").unwrap();
        let activated = sub.datetime("activated_at").unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 0).unwrap();
        assert_eq!(activated, expected.with_timezone(&Local));
        assert_eq!(sub.get("expires_at"), Some(&Value::Null));
        // Unset fields keep their declared defaults
        assert_eq!(sub.text("product_handle"), Some(""));
        assert_eq!(sub.get("trial_started_at"), None);
    }

    #[test]
    fn test_parse_datetime_formats() {
        let with_offset = parse_datetime("2009-11-20T13:04:27-05:00").unwrap();
        assert_eq!(with_offset.with_timezone(&Utc).hour(), 18);
        let naive = parse_datetime("2009-11-20T13:04:27").unwrap();
        assert_eq!(naive.with_timezone(&Utc).day(), 20);
        assert!(parse_datetime("yesterday").is_none());
    }

    #[test]
    fn test_invalid_datetime_is_an_error() {
        let err = decode_one(
            r#"<customer><created_at type="datetime">soon</created_at></customer>"#,
            ResourceKind::Customer,
            "customer",
        )
        .unwrap_err();
        assert!(matches!(err, MarshalError::InvalidDateTime { ref field, .. } if field == "created_at"));
    }

    #[test]
    fn test_decode_one_distinguishes_missing_and_ambiguous() {
        let missing = decode_one("<customers/>", ResourceKind::Customer, "customer").unwrap_err();
        assert_eq!(
            missing,
            MarshalError::NotFound {
                element: "customer".into()
            }
        );

        let two = "<customers><customer><id>1</id></customer><customer><id>2</id></customer></customers>";
        let ambiguous = decode_one(two, ResourceKind::Customer, "customer").unwrap_err();
        assert_eq!(
            ambiguous,
            MarshalError::Ambiguous {
                element: "customer".into(),
                count: 2
            }
        );
    }

    #[test]
    fn test_decode_many() {
        let two = r#"<customers type="array"><customer><id>1</id></customer><customer><id>2</id></customer></customers>"#;
        let customers = decode_many(two, ResourceKind::Customer, "customer").unwrap();
        let ids: Vec<_> = customers.iter().map(|c| c.id().unwrap()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let none = decode_many(r#"<customers type="array"></customers>"#, ResourceKind::Customer, "customer").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_decode_keeps_undeclared_elements_as_text() {
        let customer = decode_one(
            "<customer><id>1</id><vat_number>GB1</vat_number></customer>",
            ResourceKind::Customer,
            "customer",
        )
        .unwrap();
        assert_eq!(customer.text("vat_number"), Some("GB1"));
    }

    #[test]
    fn test_encode_skips_ignored_and_null_fields() {
        let mut customer = Record::new(ResourceKind::Customer);
        customer.set("first_name", "Jane");
        customer.set("phone", Value::Null);
        customer.set("updated_at", Local::now());
        let xml = to_document(&customer).unwrap().unwrap();
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?><customer><first_name>Jane</first_name></customer>"#
        );
    }

    #[test]
    fn test_encode_nested_list_skips_empty_items() {
        let mut sub = Record::new(ResourceKind::Subscription);
        let mut quantity = Record::new(ResourceKind::SubscriptionComponent);
        quantity.set("component_id", "11");
        quantity.set("kind", "quantity_based_component");
        quantity.set("allocated_quantity", "4");
        let mut metered = Record::new(ResourceKind::SubscriptionComponent);
        metered.set("component_id", "12");
        metered.set("kind", "metered_component");
        sub.set("components", vec![quantity, metered]);

        let element = encode(&sub).unwrap();
        let container = element.child("components").unwrap();
        assert_eq!(container.attribute("type"), Some("array"));
        assert_eq!(container.children.len(), 1);
        assert_eq!(
            container.children[0].child("allocated_quantity").unwrap().text,
            "4"
        );
    }

    #[test]
    fn test_round_trip_reproduces_fields() {
        let original = decode_one(SUBSCRIPTION_XML, ResourceKind::Subscription, "subscription").unwrap();
        let mut expected = original.clone();
        expected.remove("expires_at");
        // Metered components encode to nothing
        let kept: Vec<Record> = original.records("components")[..1].to_vec();
        expected.set("components", kept);

        let xml = to_document(&original).unwrap().unwrap();
        let decoded = decode_one(&xml, ResourceKind::Subscription, "subscription").unwrap();

        assert_eq!(decoded.text("state"), expected.text("state"));
        assert_eq!(decoded.datetime("activated_at"), expected.datetime("activated_at"));
        assert_eq!(decoded.records("components").len(), 1);
        assert_eq!(
            decoded.records("components")[0].text("allocated_quantity"),
            Some("3")
        );

        let mut customer = expected.record("customer").unwrap().clone();
        customer.remove("created_at");
        assert_eq!(decoded.record("customer"), Some(&customer));
        assert_eq!(decoded.record("product"), expected.record("product"));
        assert_eq!(decoded.record("credit_card"), expected.record("credit_card"));
        assert_eq!(decoded.get("credit_card_attributes"), None);
    }

    #[test]
    fn test_nested_record_is_written_under_its_field() {
        let sub = decode_one(SUBSCRIPTION_XML, ResourceKind::Subscription, "subscription").unwrap();
        let element = encode(&sub).unwrap();
        let card = element.child("credit_card").expect("card written under <credit_card>");
        assert_eq!(card.child("masked_card_number").unwrap().text, "XXXX-1111");
        assert!(element.child("credit_card_attributes").is_none());

        // A card set under the attributes key keeps that key for subscription writes
        let mut signup = Record::new(ResourceKind::Subscription);
        signup.set("credit_card_attributes", sub.record("credit_card").unwrap().clone());
        let element = encode(&signup).unwrap();
        assert!(element.child("credit_card_attributes").is_some());
    }

    #[test]
    fn test_to_document_is_none_for_empty_override() {
        let mut metered = Record::new(ResourceKind::SubscriptionComponent);
        metered.set("kind", "metered_component");
        assert_eq!(to_document(&metered).unwrap(), None);
    }

    #[test]
    fn test_encode_datetime_round_trips_as_local() {
        let mut sub = Record::new(ResourceKind::Subscription);
        let when = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        sub.set("current_period_ends_at", when);
        let xml = to_document(&sub).unwrap().unwrap();
        assert!(xml.contains(r#"<current_period_ends_at type="datetime">"#));
        let decoded = decode_one(&xml, ResourceKind::Subscription, "subscription").unwrap();
        assert_eq!(decoded.datetime("current_period_ends_at"), Some(when));
        assert_eq!(when.year(), 2024);
    }
}
