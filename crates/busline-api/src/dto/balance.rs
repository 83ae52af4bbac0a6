//! Balance DTOs

use busline_core::models::PaymentMethod;
use busline_core::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::Deserialize;

/// "Add funds" request
#[derive(Debug, Clone, Deserialize)]
pub struct DepositRequest {
    /// Amount to add; bounds are checked by the balance service
    pub amount: Decimal,

    /// credit_card, paypal, bank_transfer or crypto
    #[serde(default)]
    pub payment_method: String,
}

impl DepositRequest {
    pub fn payment_method(&self) -> AppResult<PaymentMethod> {
        PaymentMethod::from_str(&self.payment_method)
            .ok_or_else(|| AppError::Validation("Invalid payment method.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_deposit_request() {
        let req: DepositRequest =
            serde_json::from_value(json!({ "amount": "25.50", "payment_method": "paypal" }))
                .unwrap();
        assert_eq!(req.amount, dec!(25.50));
        assert_eq!(req.payment_method().unwrap(), PaymentMethod::Paypal);
    }

    #[test]
    fn test_unknown_payment_method() {
        let req: DepositRequest =
            serde_json::from_value(json!({ "amount": 10, "payment_method": "cheque" })).unwrap();
        assert_eq!(
            req.payment_method().unwrap_err().to_string(),
            "Invalid payment method."
        );

        let req: DepositRequest = serde_json::from_value(json!({ "amount": 10 })).unwrap();
        assert!(req.payment_method().is_err());
    }
}
