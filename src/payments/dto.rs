use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{Payment, PaymentSettlement};

#[derive(Debug, Deserialize)]
pub struct PaymentFilter {
    pub booking_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub paid: bool,
    pub external_reference: Option<String>,
    pub receipt_url: Option<String>,
    pub error_message: Option<String>,
}

impl SettleRequest {
    pub fn into_settlement(self, payment_id: Uuid) -> PaymentSettlement {
        PaymentSettlement {
            payment_id,
            paid: self.paid,
            external_reference: self.external_reference,
            receipt_url: self.receipt_url,
            error_message: self.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentsResponse {
    pub success: bool,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub success: bool,
    pub payment: Payment,
}
