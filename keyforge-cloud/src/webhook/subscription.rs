//! Subscription lifecycle events

use serde_json::{Map, Value};
use shared::models::{Subscription, SubscriptionUpsert};
use shared::util::secs_to_millis;

use super::product::ProductContext;
use super::{EventOutcome, WebhookProcessor};
use crate::db::StoreError;
use crate::error::WebhookError;
use crate::stripe::types::Expandable;
use crate::stripe::{Metadata, StripeSubscription};

/// Metadata keys that may carry the purchasing user's id
const USER_ID_KEYS: &[&str] = &["userId", "user_id"];

pub(super) fn metadata_user_id(metadata: &Metadata) -> Option<&str> {
    USER_ID_KEYS
        .iter()
        .filter_map(|key| metadata.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

/// Stripe metadata as a JSON object, with `extra` entries on top
pub(super) fn metadata_value(metadata: &Metadata, extra: &[(&str, &str)]) -> Value {
    let mut map: Map<String, Value> = metadata
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    for (k, v) in extra {
        map.insert(k.to_string(), Value::String(v.to_string()));
    }
    Value::Object(map)
}

/// `incoming` keys win; keys only present in `existing` survive
fn merge_metadata(existing: &Value, incoming: &Value) -> Value {
    let mut merged = existing.as_object().cloned().unwrap_or_default();
    if let Some(incoming) = incoming.as_object() {
        for (k, v) in incoming {
            merged.insert(k.clone(), v.clone());
        }
    }
    Value::Object(merged)
}

/// Row fields derived from a processor subscription object
pub(super) fn to_upsert(
    sub: &StripeSubscription,
    user_id: Option<String>,
    metadata: Value,
) -> SubscriptionUpsert {
    let price = sub.first_price();
    SubscriptionUpsert {
        external_subscription_id: sub.id.clone(),
        user_id,
        price_id: price.map(|p| p.id.clone()),
        currency: sub
            .currency
            .clone()
            .or_else(|| price.and_then(|p| p.currency.clone())),
        interval: price
            .and_then(|p| p.recurring.as_ref())
            .map(|r| r.interval.clone()),
        status: sub.status.clone(),
        current_period_start: sub.period_start().map(secs_to_millis),
        current_period_end: sub.period_end().map(secs_to_millis),
        cancel_at_period_end: sub.cancel_at_period_end,
        amount: price.and_then(|p| p.unit_amount),
        customer_id: sub.customer_id().map(str::to_string),
        metadata,
        canceled_at: sub.canceled_at.map(secs_to_millis),
        ended_at: sub.ended_at.map(secs_to_millis),
    }
}

/// Keep the stored user and metadata keys the incoming object does not carry
fn carry_over(mut upsert: SubscriptionUpsert, existing: &Subscription) -> SubscriptionUpsert {
    if upsert.user_id.is_none() {
        upsert.user_id = existing.user_id.clone();
    }
    upsert.metadata = merge_metadata(&existing.metadata, &upsert.metadata);
    upsert
}

impl WebhookProcessor {
    /// Update the row keyed by the external id, inserting when absent.
    /// Returns the row and whether it was created.
    pub(super) async fn upsert_subscription(
        &self,
        upsert: SubscriptionUpsert,
    ) -> Result<(Subscription, bool), WebhookError> {
        let external_id = upsert.external_subscription_id.clone();

        if let Some(existing) = self.store.find_subscription(&external_id).await? {
            let upsert = carry_over(upsert, &existing);
            if let Some(row) = self.store.update_subscription(&upsert).await? {
                return Ok((row, false));
            }
            return self.insert_or_update(upsert).await;
        }
        self.insert_or_update(upsert).await
    }

    async fn insert_or_update(
        &self,
        upsert: SubscriptionUpsert,
    ) -> Result<(Subscription, bool), WebhookError> {
        match self.store.insert_subscription(&upsert).await {
            Ok(row) => Ok((row, true)),
            Err(StoreError::Duplicate(key)) => {
                // Lost an insert race with a concurrent delivery
                tracing::info!(subscription_id = %key, "Subscription inserted concurrently, updating");
                let existing = self
                    .store
                    .find_subscription(&upsert.external_subscription_id)
                    .await?;
                let upsert = match &existing {
                    Some(existing) => carry_over(upsert, existing),
                    None => upsert,
                };
                match self.store.update_subscription(&upsert).await? {
                    Some(row) => Ok((row, false)),
                    None => Err(StoreError::Duplicate(key).into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// User id from metadata, else the customer's e-mail matched against users
    async fn resolve_subscriber(
        &self,
        sub: &StripeSubscription,
    ) -> Result<Option<String>, WebhookError> {
        if let Some(user_id) = metadata_user_id(&sub.metadata) {
            return Ok(Some(user_id.to_string()));
        }

        let email = match sub.customer.as_ref() {
            Some(Expandable::Object(customer)) => customer.email.clone(),
            Some(Expandable::Id(customer_id)) => {
                self.payments.retrieve_customer(customer_id).await?.email
            }
            None => None,
        };
        let Some(email) = email.filter(|e| !e.trim().is_empty()) else {
            return Ok(None);
        };

        Ok(self
            .store
            .find_user_by_email(&email)
            .await?
            .map(|user| user.id))
    }

    async fn product_for_subscription(
        &self,
        sub: &StripeSubscription,
    ) -> Result<Option<String>, WebhookError> {
        let ctx = ProductContext {
            price_ids: sub.price_ids(),
            metadata: vec![&sub.metadata],
            checkout_session_id: None,
        };
        Ok(self.products.resolve(&ctx).await?.map(|p| p.name))
    }

    pub(super) async fn subscription_created(
        &self,
        sub: &StripeSubscription,
    ) -> Result<EventOutcome, WebhookError> {
        let user_id = self.resolve_subscriber(sub).await?;
        if user_id.is_none() {
            tracing::warn!(subscription_id = %sub.id, "No user for subscription, storing unassigned");
        }

        let product_name = self.product_for_subscription(sub).await?;
        let extra: Vec<(&str, &str)> = product_name
            .as_deref()
            .map(|name| vec![("product_name", name)])
            .unwrap_or_default();
        let upsert = to_upsert(sub, user_id, metadata_value(&sub.metadata, &extra));

        let (row, created) = self.upsert_subscription(upsert).await?;
        tracing::info!(
            subscription_id = %row.external_subscription_id,
            user_id = ?row.user_id,
            product_name = ?row.product_name(),
            created,
            "Subscription upserted"
        );

        Ok(EventOutcome::SubscriptionUpserted {
            subscription_id: row.external_subscription_id.clone(),
            product_name: row.product_name().map(str::to_string),
            user_id: row.user_id,
            created,
        })
    }

    pub(super) async fn subscription_updated(
        &self,
        sub: &StripeSubscription,
    ) -> Result<EventOutcome, WebhookError> {
        let Some(existing) = self.store.find_subscription(&sub.id).await? else {
            tracing::warn!(subscription_id = %sub.id, "Update for unknown subscription");
            return Ok(EventOutcome::SubscriptionUpdated {
                subscription_id: sub.id.clone(),
                updated: false,
                status: None,
            });
        };

        let user_id = metadata_user_id(&sub.metadata).map(str::to_string);
        let product_name = self.product_for_subscription(sub).await?;
        let extra: Vec<(&str, &str)> = product_name
            .as_deref()
            .map(|name| vec![("product_name", name)])
            .unwrap_or_default();
        let upsert = carry_over(
            to_upsert(sub, user_id, metadata_value(&sub.metadata, &extra)),
            &existing,
        );

        let row = self.store.update_subscription(&upsert).await?;
        tracing::info!(
            subscription_id = %sub.id,
            status = %sub.status,
            updated = row.is_some(),
            "Subscription updated"
        );

        Ok(EventOutcome::SubscriptionUpdated {
            subscription_id: sub.id.clone(),
            updated: row.is_some(),
            status: row.map(|r| r.status),
        })
    }

    pub(super) async fn subscription_deleted(
        &self,
        sub: &StripeSubscription,
    ) -> Result<EventOutcome, WebhookError> {
        let row = self
            .store
            .cancel_subscription(
                &sub.id,
                sub.canceled_at.map(secs_to_millis),
                sub.ended_at.map(secs_to_millis),
            )
            .await?;
        if row.is_none() {
            tracing::warn!(subscription_id = %sub.id, "Deletion for unknown subscription");
        }

        let user_id = metadata_user_id(&sub.metadata)
            .map(str::to_string)
            .or_else(|| row.as_ref().and_then(|r| r.user_id.clone()));

        let mut user_cleared = false;
        if let Some(user_id) = user_id {
            match self.store.clear_user_subscription(&user_id, &sub.id).await {
                Ok(cleared) => user_cleared = cleared,
                Err(e) => {
                    tracing::warn!(user_id = %user_id, subscription_id = %sub.id, error = %e, "Failed to clear user subscription");
                }
            }
        }

        tracing::info!(subscription_id = %sub.id, user_cleared, "Subscription canceled");
        Ok(EventOutcome::SubscriptionCanceled {
            subscription_id: sub.id.clone(),
            found: row.is_some(),
            user_cleared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subscription(value: Value) -> StripeSubscription {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn user_id_prefers_camel_case_key() {
        let metadata: Metadata = [
            ("userId".to_string(), "u1".to_string()),
            ("user_id".to_string(), "u2".to_string()),
        ]
        .into();
        assert_eq!(metadata_user_id(&metadata), Some("u1"));

        let metadata: Metadata = [
            ("userId".to_string(), " ".to_string()),
            ("user_id".to_string(), "u2".to_string()),
        ]
        .into();
        assert_eq!(metadata_user_id(&metadata), Some("u2"));
        assert_eq!(metadata_user_id(&Metadata::new()), None);
    }

    #[test]
    fn upsert_converts_seconds_and_reads_price() {
        let sub = subscription(json!({
            "id": "sub_1",
            "status": "active",
            "customer": "cus_1",
            "current_period_start": 1_700_000_000,
            "current_period_end": 1_702_592_000,
            "cancel_at_period_end": false,
            "metadata": { "userId": "u1" },
            "items": { "data": [{
                "price": {
                    "id": "price_1R1A9uGLqZ8YjU1vEkXXC79n",
                    "currency": "usd",
                    "unit_amount": 499,
                    "recurring": { "interval": "month" }
                }
            }]}
        }));

        let upsert = to_upsert(&sub, Some("u1".into()), json!({}));
        assert_eq!(upsert.current_period_start, Some(1_700_000_000_000));
        assert_eq!(upsert.current_period_end, Some(1_702_592_000_000));
        assert_eq!(upsert.price_id.as_deref(), Some("price_1R1A9uGLqZ8YjU1vEkXXC79n"));
        assert_eq!(upsert.currency.as_deref(), Some("usd"));
        assert_eq!(upsert.interval.as_deref(), Some("month"));
        assert_eq!(upsert.amount, Some(499));
        assert_eq!(upsert.customer_id.as_deref(), Some("cus_1"));
    }

    #[test]
    fn merged_metadata_keeps_derived_product_name() {
        let existing = json!({ "product_name": "Autovoter", "source": "old" });
        let incoming = json!({ "source": "new" });
        assert_eq!(
            merge_metadata(&existing, &incoming),
            json!({ "product_name": "Autovoter", "source": "new" })
        );
    }

    #[test]
    fn metadata_value_applies_extras_last() {
        let metadata: Metadata = [("product_name".to_string(), "Old".to_string())].into();
        assert_eq!(
            metadata_value(&metadata, &[("product_name", "Autovoter")]),
            json!({ "product_name": "Autovoter" })
        );
    }
}
