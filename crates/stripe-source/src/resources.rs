//! Catalog of syncable Stripe resources and event classification.

use crate::error::{Error, Result};
use crate::record::ChangeOp;

/// A resource the connector can sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Name used in configuration, e.g. `subscription` or `issuing.card`.
    pub name: &'static str,
    /// Path of the list endpoint below the API base, e.g. `subscriptions`.
    pub list_path: &'static str,
    /// Every event type Stripe emits for objects of this resource.
    pub events: &'static [&'static str],
}

impl ResourceSpec {
    pub fn emits(&self, event_type: &str) -> bool {
        self.events.contains(&event_type)
    }
}

const fn spec(
    name: &'static str,
    list_path: &'static str,
    events: &'static [&'static str],
) -> ResourceSpec {
    ResourceSpec {
        name,
        list_path,
        events,
    }
}

pub static RESOURCES: &[ResourceSpec] = &[
    // Core
    spec("balance_transaction", "balance_transactions", &[]),
    spec(
        "charge",
        "charges",
        &[
            "charge.captured",
            "charge.expired",
            "charge.failed",
            "charge.pending",
            "charge.refunded",
            "charge.succeeded",
            "charge.updated",
        ],
    ),
    spec(
        "customer",
        "customers",
        &["customer.created", "customer.deleted", "customer.updated"],
    ),
    spec(
        "dispute",
        "disputes",
        &[
            "charge.dispute.closed",
            "charge.dispute.created",
            "charge.dispute.funds_reinstated",
            "charge.dispute.funds_withdrawn",
            "charge.dispute.updated",
        ],
    ),
    spec("event", "events", &[]),
    spec("file", "files", &["file.created"]),
    spec("file_link", "file_links", &[]),
    spec(
        "payment_intent",
        "payment_intents",
        &[
            "payment_intent.amount_capturable_updated",
            "payment_intent.canceled",
            "payment_intent.created",
            "payment_intent.partially_funded",
            "payment_intent.payment_failed",
            "payment_intent.processing",
            "payment_intent.requires_action",
            "payment_intent.succeeded",
        ],
    ),
    spec(
        "setup_intent",
        "setup_intents",
        &[
            "setup_intent.canceled",
            "setup_intent.created",
            "setup_intent.requires_action",
            "setup_intent.setup_failed",
            "setup_intent.succeeded",
        ],
    ),
    spec("setup_attempt", "setup_attempts", &[]),
    spec(
        "payout",
        "payouts",
        &[
            "payout.canceled",
            "payout.created",
            "payout.failed",
            "payout.paid",
            "payout.updated",
        ],
    ),
    spec("refund", "refunds", &["charge.refund.updated"]),
    // Billing
    spec(
        "credit_note",
        "credit_notes",
        &[
            "credit_note.created",
            "credit_note.updated",
            "credit_note.voided",
        ],
    ),
    spec(
        "billing_portal.configuration",
        "billing_portal/configurations",
        &[
            "billing_portal.configuration.created",
            "billing_portal.configuration.updated",
        ],
    ),
    spec(
        "invoice",
        "invoices",
        &[
            "invoice.created",
            "invoice.deleted",
            "invoice.finalization_failed",
            "invoice.finalized",
            "invoice.marked_uncollectible",
            "invoice.paid",
            "invoice.payment_action_required",
            "invoice.payment_failed",
            "invoice.payment_succeeded",
            "invoice.sent",
            "invoice.upcoming",
            "invoice.updated",
            "invoice.voided",
        ],
    ),
    spec(
        "invoiceitem",
        "invoiceitems",
        &[
            "invoiceitem.created",
            "invoiceitem.deleted",
            "invoiceitem.updated",
        ],
    ),
    spec(
        "plan",
        "plans",
        &["plan.created", "plan.deleted", "plan.updated"],
    ),
    spec(
        "quote",
        "quotes",
        &[
            "quote.accepted",
            "quote.canceled",
            "quote.created",
            "quote.finalized",
        ],
    ),
    spec(
        "subscription",
        "subscriptions",
        &[
            "customer.subscription.created",
            "customer.subscription.deleted",
            "customer.subscription.pending_update_applied",
            "customer.subscription.pending_update_expired",
            "customer.subscription.trial_will_end",
            "customer.subscription.updated",
        ],
    ),
    spec("subscription_item", "subscription_items", &[]),
    spec(
        "subscription_schedule",
        "subscription_schedules",
        &[
            "subscription_schedule.aborted",
            "subscription_schedule.canceled",
            "subscription_schedule.completed",
            "subscription_schedule.created",
            "subscription_schedule.expiring",
            "subscription_schedule.released",
            "subscription_schedule.updated",
        ],
    ),
    // Products
    spec(
        "product",
        "products",
        &["product.created", "product.deleted", "product.updated"],
    ),
    spec(
        "price",
        "prices",
        &["price.created", "price.deleted", "price.updated"],
    ),
    spec(
        "coupon",
        "coupons",
        &["coupon.created", "coupon.deleted", "coupon.updated"],
    ),
    spec(
        "promotion_code",
        "promotion_codes",
        &["promotion_code.created", "promotion_code.updated"],
    ),
    spec("tax_code", "tax_codes", &[]),
    spec(
        "tax_rate",
        "tax_rates",
        &["tax_rate.created", "tax_rate.updated"],
    ),
    spec("shipping_rate", "shipping_rates", &[]),
    // Checkout
    spec(
        "checkout.session",
        "checkout/sessions",
        &[
            "checkout.session.async_payment_failed",
            "checkout.session.async_payment_succeeded",
            "checkout.session.completed",
            "checkout.session.expired",
        ],
    ),
    // Connect
    spec("account", "accounts", &["account.updated"]),
    spec(
        "application_fee",
        "application_fees",
        &["application_fee.created", "application_fee.refunded"],
    ),
    spec(
        "topup",
        "topups",
        &[
            "topup.canceled",
            "topup.created",
            "topup.failed",
            "topup.reversed",
            "topup.succeeded",
        ],
    ),
    spec(
        "transfer",
        "transfers",
        &[
            "transfer.created",
            "transfer.failed",
            "transfer.paid",
            "transfer.reversed",
            "transfer.updated",
        ],
    ),
    // Fraud
    spec(
        "radar.early_fraud_warning",
        "radar/early_fraud_warnings",
        &[
            "radar.early_fraud_warning.created",
            "radar.early_fraud_warning.updated",
        ],
    ),
    spec("review", "reviews", &["review.closed", "review.opened"]),
    spec("radar.value_list", "radar/value_lists", &[]),
    spec("radar.value_list_item", "radar/value_list_items", &[]),
    // Identity
    spec(
        "identity.verification_session",
        "identity/verification_sessions",
        &[
            "identity.verification_session.canceled",
            "identity.verification_session.created",
            "identity.verification_session.processing",
            "identity.verification_session.redacted",
            "identity.verification_session.requires_input",
            "identity.verification_session.verified",
        ],
    ),
    spec(
        "identity.verification_report",
        "identity/verification_reports",
        &[],
    ),
    // Issuing
    spec(
        "issuing.authorization",
        "issuing/authorizations",
        &[
            "issuing_authorization.created",
            "issuing_authorization.request",
            "issuing_authorization.updated",
        ],
    ),
    spec(
        "issuing.cardholder",
        "issuing/cardholders",
        &["issuing_cardholder.created", "issuing_cardholder.updated"],
    ),
    spec(
        "issuing.card",
        "issuing/cards",
        &["issuing_card.created", "issuing_card.updated"],
    ),
    spec(
        "issuing.dispute",
        "issuing/disputes",
        &[
            "issuing_dispute.closed",
            "issuing_dispute.created",
            "issuing_dispute.funds_reinstated",
            "issuing_dispute.submitted",
            "issuing_dispute.updated",
        ],
    ),
    spec("funding_instruction", "issuing/funding_instructions", &[]),
    spec(
        "issuing.transaction",
        "issuing/transactions",
        &["issuing_transaction.created", "issuing_transaction.updated"],
    ),
    // Reporting
    spec(
        "reporting.report_run",
        "reporting/report_runs",
        &[
            "reporting.report_run.failed",
            "reporting.report_run.succeeded",
        ],
    ),
    spec(
        "reporting.report_type",
        "reporting/report_types",
        &["reporting.report_type.updated"],
    ),
    // Treasury
    spec("financial_account", "treasury/financial_accounts", &[]),
    spec("transaction", "treasury/transactions", &[]),
    spec("transaction_entry", "treasury/transaction_entries", &[]),
    spec("outbound_transfer", "treasury/outbound_transfers", &[]),
    spec("outbound_payment", "treasury/outbound_payments", &[]),
    spec("inbound_transfer", "treasury/inbound_transfers", &[]),
    spec("received_credit", "treasury/received_credits", &[]),
    spec("received_debit", "treasury/received_debits", &[]),
    spec("credit_reversal", "treasury/credit_reversals", &[]),
    spec("debit_reversal", "treasury/debit_reversals", &[]),
];

pub fn lookup(name: &str) -> Option<&'static ResourceSpec> {
    RESOURCES.iter().find(|r| r.name == name)
}

/// Like [`lookup`], but an unknown name is an error.
pub fn resolve(name: &str) -> Result<&'static ResourceSpec> {
    lookup(name).ok_or_else(|| Error::UnknownResource(name.to_string()))
}

/// Map an event type to the operation it represents.
///
/// `*.created` is a create, `*.deleted` is a delete, everything else
/// (`updated`, `paid`, `voided`, ...) is an update of the object.
pub fn classify(event_type: &str) -> ChangeOp {
    if event_type.contains("created") {
        ChangeOp::Create
    } else if event_type.contains("deleted") {
        ChangeOp::Delete
    } else {
        ChangeOp::Update
    }
}

/// Classifies events for one resource.
///
/// Event types not listed for the resource are either rejected (`strict`) or
/// classified by name with a warning.
#[derive(Debug, Clone, Copy)]
pub struct EventClassifier {
    resource: &'static ResourceSpec,
    strict: bool,
}

impl EventClassifier {
    pub fn new(resource: &'static ResourceSpec, strict: bool) -> Self {
        Self { resource, strict }
    }

    pub fn resource(&self) -> &'static ResourceSpec {
        self.resource
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn classify(&self, event_type: &str) -> Result<ChangeOp> {
        if self.resource.emits(event_type) {
            return Ok(classify(event_type));
        }

        if self.strict {
            return Err(Error::UnmappedEventType {
                resource: self.resource.name.to_string(),
                event_type: event_type.to_string(),
            });
        }

        let op = classify(event_type);
        tracing::warn!(
            "Event type '{}' is not known for resource '{}', treating it as {}",
            event_type,
            self.resource.name,
            op
        );
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_and_paths_unique() {
        let names: HashSet<_> = RESOURCES.iter().map(|r| r.name).collect();
        let paths: HashSet<_> = RESOURCES.iter().map(|r| r.list_path).collect();
        assert_eq!(names.len(), RESOURCES.len());
        assert_eq!(paths.len(), RESOURCES.len());
    }

    #[test]
    fn test_lookup() {
        let sub = lookup("subscription").unwrap();
        assert_eq!(sub.list_path, "subscriptions");
        assert!(sub.emits("customer.subscription.trial_will_end"));

        assert_eq!(
            lookup("billing_portal.configuration").unwrap().list_path,
            "billing_portal/configurations"
        );
        assert!(lookup("widget").is_none());
        assert!(matches!(resolve("widget"), Err(Error::UnknownResource(_))));
    }

    #[test]
    fn test_classify_plan_events() {
        assert_eq!(classify("plan.created"), ChangeOp::Create);
        assert_eq!(classify("plan.updated"), ChangeOp::Update);
        assert_eq!(classify("plan.deleted"), ChangeOp::Delete);
    }

    #[test]
    fn test_classify_unrecognized_defaults_to_update() {
        assert_eq!(classify("plan.archived"), ChangeOp::Update);
        assert_eq!(classify(""), ChangeOp::Update);
    }

    #[test]
    fn test_every_catalog_event_classifies() {
        // Every listed event must map to exactly one operation and only the
        // names that say so are creates or deletes.
        for resource in RESOURCES {
            for event in resource.events {
                let op = classify(event);
                if event.ends_with(".created") {
                    assert_eq!(op, ChangeOp::Create, "{event}");
                } else if event.ends_with(".deleted") {
                    assert_eq!(op, ChangeOp::Delete, "{event}");
                } else {
                    assert_eq!(op, ChangeOp::Update, "{event}");
                }
            }
        }
    }

    #[test]
    fn test_lenient_classifier_falls_back() {
        let classifier = EventClassifier::new(lookup("plan").unwrap(), false);
        assert_eq!(classifier.classify("plan.deleted").unwrap(), ChangeOp::Delete);
        assert_eq!(
            classifier.classify("plan.renamed").unwrap(),
            ChangeOp::Update
        );
        assert_eq!(
            classifier.classify("product.created").unwrap(),
            ChangeOp::Create
        );
    }

    #[test]
    fn test_strict_classifier_rejects_unmapped() {
        let classifier = EventClassifier::new(lookup("plan").unwrap(), true);
        assert_eq!(classifier.classify("plan.created").unwrap(), ChangeOp::Create);

        match classifier.classify("plan.renamed") {
            Err(Error::UnmappedEventType {
                resource,
                event_type,
            }) => {
                assert_eq!(resource, "plan");
                assert_eq!(event_type, "plan.renamed");
            }
            other => panic!("expected UnmappedEventType, got {other:?}"),
        }
    }
}
