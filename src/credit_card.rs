// Card details; written through the owning subscription rather than a listing of their own
use crate::error::{ChargifyError, Result};
use crate::marshal;
use crate::resource::{Kind, Resource};
use crate::schema::{Field, ResourceKind, Schema};
use crate::subscription::Subscription;
use crate::xml_tree::XmlElement;

pub static CREDIT_CARD_SCHEMA: Schema = Schema {
    kind: ResourceKind::CreditCard,
    root: "credit_card_attributes",
    listing: None,
    compound_key: None,
    fields: &[
        Field::text("first_name", ""),
        Field::text("last_name", ""),
        Field::text("full_number", ""),
        Field::text("masked_card_number", ""),
        Field::text("expiration_month", ""),
        Field::text("expiration_year", ""),
        Field::text("cvv", ""),
        Field::text("type", ""),
        Field::text("billing_address", ""),
        Field::text("billing_city", ""),
        Field::text("billing_state", ""),
        Field::text("billing_zip", ""),
        Field::text("billing_country", ""),
    ],
    nested: &[],
    encode_override: None,
};

#[derive(Debug, Clone, Copy)]
pub struct CreditCardKind;

impl Kind for CreditCardKind {
    const KIND: ResourceKind = ResourceKind::CreditCard;
}

pub type CreditCard = Resource<CreditCardKind>;

impl Resource<CreditCardKind> {
    /// Replaces the card on `subscription` and returns the subscription as updated
    /// by Chargify.
    pub fn save_for(&self, subscription: &Subscription) -> Result<Subscription> {
        let subscription_id = subscription.id().ok_or_else(|| {
            ChargifyError::Domain("credit card can only be saved to a subscription with an id".into())
        })?;
        let card = marshal::encode(self.record()).ok_or_else(|| {
            ChargifyError::Domain("credit card has nothing to write".into())
        })?;
        let mut document = XmlElement::new("subscription");
        document.push(card);

        let path = format!("/subscriptions/{}.xml", subscription_id);
        let response = self.connection().put(&path, Some(document.to_document()?))?;
        subscription.decode_one(&response)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::transport::mock::MockTransport;

    #[test]
    fn test_save_for_nests_card_inside_subscription() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            "<subscription><id>15</id><credit_card><masked_card_number>XXXX-4242</masked_card_number></credit_card></subscription>",
        );
        let mut subscription = Subscription::new(mock.connection());
        subscription.set("id", "15");

        let mut card = CreditCard::new(mock.connection());
        card.set("full_number", "4242424242424242")
            .set("expiration_month", "12")
            .set("expiration_year", "2030");
        let updated = card.save_for(&subscription).unwrap();

        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "/subscriptions/15.xml");
        assert_eq!(
            request.body.as_deref(),
            Some(concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                "<subscription><credit_card_attributes>",
                "<full_number>4242424242424242</full_number>",
                "<expiration_month>12</expiration_month>",
                "<expiration_year>2030</expiration_year>",
                "</credit_card_attributes></subscription>"
            ))
        );
        assert_eq!(
            updated.credit_card().unwrap().field("masked_card_number"),
            Some("XXXX-4242")
        );
    }

    #[test]
    fn test_save_for_needs_subscription_id() {
        let mock = MockTransport::new();
        let card = CreditCard::new(mock.connection());
        let subscription = Subscription::new(mock.connection());
        assert!(matches!(
            card.save_for(&subscription),
            Err(ChargifyError::Domain(_))
        ));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_card_decodes_inside_subscription_attributes() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            "<subscription><id>3</id><credit_card_attributes><first_name>Jane</first_name><type>visa</type></credit_card_attributes></subscription>",
        );
        let subscription = Subscription::new(mock.connection()).get_by_id(3).unwrap();
        let card = subscription.credit_card().unwrap();
        assert_eq!(card.field("type"), Some("visa"));
        assert_eq!(card.field("billing_zip"), Some(""));
    }
}
