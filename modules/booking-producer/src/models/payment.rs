use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{require_non_empty, ValidationError};

// ============================================================================
// OUTGOING PAYLOAD
// ============================================================================

/// Payment event forwarded from the payment provider webhook
///
/// Nullable fields serialise as `null` rather than being omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub billing: BillingAddress,
    pub brand_id: String,
    pub business_id: String,
    pub card_issuing_country: Option<String>,
    pub card_last_four: String,
    pub card_network: String,
    pub card_type: String,
    pub created_at: DateTime<Utc>,
    pub currency: String,
    pub customer: Customer,
    pub digital_products_delivered: bool,
    pub discount_id: String,
    pub disputes: Vec<Dispute>,
    pub error_code: String,
    pub error_message: String,
    pub metadata: Option<Map<String, Value>>,
    pub payment_id: String,
    pub payment_link: String,
    pub payment_method: String,
    pub payment_method_type: String,
    pub product_cart: Vec<CartItem>,
    pub refunds: Vec<Refund>,
    pub settlement_amount: i64,
    pub settlement_currency: String,
    pub settlement_tax: i64,
    pub status: Option<String>,
    pub subscription_id: String,
    pub tax: i64,
    pub total_amount: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    pub city: String,
    pub country: String,
    pub state: String,
    pub street: String,
    pub zipcode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    // Decimal string as sent by the provider
    pub amount: String,
    pub business_id: String,
    pub created_at: DateTime<Utc>,
    pub currency: String,
    pub dispute_id: String,
    pub dispute_stage: String,
    pub dispute_status: String,
    pub payment_id: String,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub amount: i64,
    pub business_id: String,
    pub created_at: DateTime<Utc>,
    pub currency: Option<String>,
    pub is_partial: bool,
    pub payment_id: String,
    pub reason: String,
    pub refund_id: String,
    pub status: String,
}

// ============================================================================
// INBOUND REQUEST
// ============================================================================

/// Which payment queue the webhook is forwarded to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    #[default]
    Success,
    Failure,
}

/// Body of `POST /api/payments/webhook`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentWebhookRequest {
    pub payment_payload: PaymentPayloadRequest,
    #[serde(default)]
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentPayloadRequest {
    #[serde(default)]
    pub billing: BillingAddress,
    #[serde(default)]
    pub brand_id: String,
    #[serde(default)]
    pub business_id: String,
    #[serde(default)]
    pub card_issuing_country: Option<String>,
    #[serde(default)]
    pub card_last_four: String,
    #[serde(default)]
    pub card_network: String,
    #[serde(default)]
    pub card_type: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub customer: Customer,
    #[serde(default)]
    pub digital_products_delivered: bool,
    #[serde(default)]
    pub discount_id: String,
    #[serde(default)]
    pub disputes: Vec<DisputeRequest>,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    pub payment_id: String,
    #[serde(default)]
    pub payment_link: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub payment_method_type: String,
    #[serde(default)]
    pub product_cart: Vec<CartItemRequest>,
    #[serde(default)]
    pub refunds: Vec<RefundRequest>,
    #[serde(default)]
    pub settlement_amount: i64,
    #[serde(default)]
    pub settlement_currency: String,
    #[serde(default)]
    pub settlement_tax: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub tax: i64,
    #[serde(default)]
    pub total_amount: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CartItemRequest {
    pub product_id: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisputeRequest {
    pub amount: String,
    #[serde(default)]
    pub business_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub currency: String,
    pub dispute_id: String,
    #[serde(default)]
    pub dispute_stage: String,
    #[serde(default)]
    pub dispute_status: String,
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefundRequest {
    pub amount: i64,
    #[serde(default)]
    pub business_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub is_partial: bool,
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub reason: String,
    pub refund_id: String,
    #[serde(default)]
    pub status: String,
}

impl From<CartItemRequest> for CartItem {
    fn from(item: CartItemRequest) -> Self {
        Self {
            product_id: item.product_id,
            quantity: i64::from(item.quantity),
        }
    }
}

impl From<DisputeRequest> for Dispute {
    fn from(d: DisputeRequest) -> Self {
        Self {
            amount: d.amount,
            business_id: d.business_id,
            created_at: d.created_at,
            currency: d.currency,
            dispute_id: d.dispute_id,
            dispute_stage: d.dispute_stage,
            dispute_status: d.dispute_status,
            payment_id: d.payment_id,
            remarks: d.remarks,
        }
    }
}

impl From<RefundRequest> for Refund {
    fn from(r: RefundRequest) -> Self {
        Self {
            amount: r.amount,
            business_id: r.business_id,
            created_at: r.created_at,
            currency: r.currency,
            is_partial: r.is_partial,
            payment_id: r.payment_id,
            reason: r.reason,
            refund_id: r.refund_id,
            status: r.status,
        }
    }
}

impl TryFrom<PaymentPayloadRequest> for Payment {
    type Error = ValidationError;

    fn try_from(p: PaymentPayloadRequest) -> Result<Self, Self::Error> {
        require_non_empty("payment_payload.payment_id", &p.payment_id)?;

        if let Some(bad) = p.product_cart.iter().find(|item| item.quantity < 0) {
            return Err(ValidationError::Invalid {
                field: "payment_payload.product_cart",
                reason: format!("negative quantity for product {}", bad.product_id),
            });
        }

        Ok(Self {
            billing: p.billing,
            brand_id: p.brand_id,
            business_id: p.business_id,
            card_issuing_country: p.card_issuing_country,
            card_last_four: p.card_last_four,
            card_network: p.card_network,
            card_type: p.card_type,
            created_at: p.created_at,
            currency: p.currency,
            customer: p.customer,
            digital_products_delivered: p.digital_products_delivered,
            discount_id: p.discount_id,
            disputes: p.disputes.into_iter().map(Dispute::from).collect(),
            error_code: p.error_code,
            error_message: p.error_message,
            metadata: p.metadata,
            payment_id: p.payment_id,
            payment_link: p.payment_link,
            payment_method: p.payment_method,
            payment_method_type: p.payment_method_type,
            product_cart: p.product_cart.into_iter().map(CartItem::from).collect(),
            refunds: p.refunds.into_iter().map(Refund::from).collect(),
            settlement_amount: p.settlement_amount,
            settlement_currency: p.settlement_currency,
            settlement_tax: p.settlement_tax,
            status: p.status,
            subscription_id: p.subscription_id,
            tax: p.tax,
            total_amount: p.total_amount,
            updated_at: p.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_request() -> serde_json::Value {
        json!({
            "payment_payload": {
                "payment_id": "pay_123",
                "created_at": "2025-01-01T10:00:00Z",
                "updated_at": "2025-01-01T10:05:00Z",
                "total_amount": 2500,
                "currency": "INR",
                "product_cart": [{"product_id": "ticket", "quantity": 2}],
                "refunds": [{
                    "amount": 500,
                    "created_at": "2025-01-02T00:00:00Z",
                    "refund_id": "ref_1"
                }]
            }
        })
    }

    #[test]
    fn test_request_defaults_to_success_outcome() {
        let request: PaymentWebhookRequest = serde_json::from_value(minimal_request()).unwrap();
        assert_eq!(request.outcome, PaymentOutcome::Success);
    }

    #[test]
    fn test_field_mapping() {
        let request: PaymentWebhookRequest = serde_json::from_value(minimal_request()).unwrap();
        let payment = Payment::try_from(request.payment_payload).unwrap();

        assert_eq!(payment.payment_id, "pay_123");
        assert_eq!(payment.total_amount, 2500);
        assert_eq!(payment.product_cart[0].quantity, 2);
        assert_eq!(payment.refunds[0].refund_id, "ref_1");
        assert!(payment.refunds[0].currency.is_none());
        assert!(payment.card_issuing_country.is_none());
        assert!(payment.disputes.is_empty());
    }

    #[test]
    fn test_missing_payment_id_rejected() {
        let mut body = minimal_request();
        body["payment_payload"]["payment_id"] = json!("  ");
        let request: PaymentWebhookRequest = serde_json::from_value(body).unwrap();

        let err = Payment::try_from(request.payment_payload).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Missing {
                field: "payment_payload.payment_id"
            }
        );
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let mut body = minimal_request();
        body["payment_payload"]["product_cart"][0]["quantity"] = json!(-1);
        let request: PaymentWebhookRequest = serde_json::from_value(body).unwrap();

        assert!(Payment::try_from(request.payment_payload).is_err());
    }
}
