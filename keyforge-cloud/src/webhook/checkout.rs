//! `checkout.session.completed`: subscription sync and license provisioning

use serde::Serialize;
use shared::models::{License, LicenseCreate};

use super::license_key::product_code;
use super::product::{ProductContext, ProductSource};
use super::subscription::{metadata_user_id, metadata_value, to_upsert};
use super::{EventOutcome, WebhookProcessor};
use crate::db::StoreError;
use crate::error::WebhookError;
use crate::stripe::CheckoutSession;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutResult {
    pub license_key: String,
    /// False when the license already existed
    pub license_created: bool,
    /// Subscription row re-read after the upsert; `None` for one-off payments
    pub subscription_verified: Option<bool>,
    pub license_verified: bool,
    pub product_name: String,
    pub product_source: ProductSource,
    pub subscription_id: Option<String>,
}

impl WebhookProcessor {
    pub(super) async fn checkout_completed(
        &self,
        session: &CheckoutSession,
    ) -> Result<EventOutcome, WebhookError> {
        let subscription_id = session.subscription_id();
        if subscription_id.is_none() && session.payment_intent_id().is_none() {
            tracing::info!(session_id = %session.id, "Checkout without subscription or payment, ignoring");
            return Ok(EventOutcome::CheckoutIgnored {
                session_id: session.id.clone(),
            });
        }

        let subscription = match subscription_id {
            Some(id) => {
                let sub = self.payments.retrieve_subscription(id).await?;
                if let Err(e) = self
                    .payments
                    .update_subscription_metadata(
                        id,
                        &[("checkout_session_id", session.id.as_str())],
                    )
                    .await
                {
                    tracing::warn!(subscription_id = %id, error = %e, "Failed to tag subscription with checkout session");
                }
                Some(sub)
            }
            None => None,
        };

        let user_id = metadata_user_id(&session.metadata)
            .map(str::to_string)
            .ok_or_else(|| WebhookError::MissingUser {
                session_id: session.id.clone(),
            })?;

        // The row must exist even when product resolution fails below
        let mirrored = match &subscription {
            Some(sub) => {
                let metadata =
                    metadata_value(&sub.metadata, &[("checkout_session_id", session.id.as_str())]);
                let (row, _) = self
                    .upsert_subscription(to_upsert(sub, Some(user_id.clone()), metadata))
                    .await?;
                Some(row)
            }
            None => None,
        };

        let mut ctx = ProductContext {
            checkout_session_id: Some(session.id.as_str()),
            ..Default::default()
        };
        ctx.metadata.push(&session.metadata);
        if let Some(sub) = &subscription {
            ctx.price_ids = sub.price_ids();
            ctx.metadata.push(&sub.metadata);
        }
        let product = self
            .products
            .resolve(&ctx)
            .await?
            .ok_or_else(|| WebhookError::ProductUnresolved {
                context: format!("checkout session {}", session.id),
            })?;

        if let (Some(sub), Some(row)) = (&subscription, &mirrored) {
            if product.source == ProductSource::LineItems {
                if let Err(e) = self
                    .payments
                    .update_subscription_metadata(
                        &sub.id,
                        &[("product_name", product.name.as_str())],
                    )
                    .await
                {
                    tracing::warn!(subscription_id = %sub.id, error = %e, "Failed to write product name back");
                }
            }

            if row.product_name() != Some(product.name.as_str()) {
                let metadata = metadata_value(
                    &sub.metadata,
                    &[
                        ("product_name", product.name.as_str()),
                        ("checkout_session_id", session.id.as_str()),
                    ],
                );
                self.upsert_subscription(to_upsert(sub, Some(user_id.clone()), metadata))
                    .await?;
            }
        }

        let (license, license_created) = self.provision_license(&user_id, &product.name).await?;

        let subscription_verified = match &subscription {
            Some(sub) => Some(self.store.find_subscription(&sub.id).await?.is_some()),
            None => None,
        };
        let license_verified = self
            .store
            .find_license(&user_id, &product.name)
            .await?
            .is_some();

        tracing::info!(
            session_id = %session.id,
            user_id = %user_id,
            product_name = %product.name,
            license_created,
            "Checkout completed"
        );

        Ok(EventOutcome::LicenseProvisioned(CheckoutResult {
            license_key: license.license_key,
            license_created,
            subscription_verified,
            license_verified,
            product_name: product.name,
            product_source: product.source,
            subscription_id: subscription.map(|s| s.id),
        }))
    }

    /// Existing license for (user, product), or a new one with a fresh key
    async fn provision_license(
        &self,
        user_id: &str,
        product_name: &str,
    ) -> Result<(License, bool), WebhookError> {
        if let Some(existing) = self.store.find_license(user_id, product_name).await? {
            return Ok((existing, false));
        }

        let license_key = self
            .store
            .generate_license_key(&product_code(product_name))
            .await?;
        let create = LicenseCreate {
            user_id: user_id.to_string(),
            product_name: product_name.to_string(),
            license_key,
        };

        match self.store.insert_license(&create).await {
            Ok(license) => Ok((license, true)),
            Err(StoreError::Duplicate(key)) => {
                match self.store.find_license(user_id, product_name).await? {
                    Some(existing) => Ok((existing, false)),
                    None => Err(StoreError::Duplicate(key).into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}
