use crate::amount::Amount;
use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum WithdrawalError {
    #[error("Minimum withdrawal is ${}.", .minimum.to_plain_string())]
    BelowMinimum { minimum: Amount },
    #[error("Please enter a valid address.")]
    MissingAddress,
    #[error("Insufficient balance.")]
    InsufficientBalance { requested: Amount, available: Amount },
}

/// A validated withdrawal, ready to be sent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawalRequest {
    amount: Amount,
    address: String,
}

impl WithdrawalRequest {
    /// Checks, in order: the amount parses and meets `minimum`, the address
    /// is not blank, and the amount does not exceed `balance`. The amount
    /// must be a number as a whole string; `"3abc"` is rejected, not read
    /// as 3.
    pub fn validate(
        amount_input: &str,
        address: &str,
        balance: Amount,
        minimum: Amount,
    ) -> Result<Self, WithdrawalError> {
        let amount = amount_input
            .parse::<Amount>()
            .ok()
            .filter(|amount| *amount >= minimum)
            .ok_or(WithdrawalError::BelowMinimum { minimum })?;
        let address = address.trim();
        if address.is_empty() {
            return Err(WithdrawalError::MissingAddress);
        }
        if amount > balance {
            return Err(WithdrawalError::InsufficientBalance {
                requested: amount,
                available: balance,
            });
        }
        Ok(WithdrawalRequest {
            amount,
            address: address.to_string(),
        })
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn pending_message(&self) -> String {
        format!(
            "Withdrawal of ${} to {} is pending.",
            self.amount.to_plain_string(),
            self.address
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::rules::MIN_WITHDRAWAL;

    fn validate(amount: &str, address: &str, balance_units: u64) -> Result<WithdrawalRequest, WithdrawalError> {
        WithdrawalRequest::validate(amount, address, Amount::from_units(balance_units), MIN_WITHDRAWAL)
    }

    #[test]
    fn validate__below_minimum__is_rejected() {
        let err = validate("2", "addr", 10).unwrap_err();
        assert_eq!(err, WithdrawalError::BelowMinimum { minimum: MIN_WITHDRAWAL });
        assert_eq!(err.to_string(), "Minimum withdrawal is $3.");
    }

    #[test]
    fn validate__not_a_number__reports_minimum() {
        assert_eq!(
            validate("three", "addr", 10),
            Err(WithdrawalError::BelowMinimum { minimum: MIN_WITHDRAWAL })
        );
        assert_eq!(
            validate("", "addr", 10),
            Err(WithdrawalError::BelowMinimum { minimum: MIN_WITHDRAWAL })
        );
    }

    #[test]
    fn validate__trailing_garbage__is_rejected() {
        assert_eq!(
            validate("3abc", "addr", 10),
            Err(WithdrawalError::BelowMinimum { minimum: MIN_WITHDRAWAL })
        );
        assert!(validate(" 3 ", "addr", 10).is_ok());
    }

    #[test]
    fn validate__blank_address__is_rejected() {
        let err = validate("3", "   ", 10).unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid address.");
    }

    #[test]
    fn validate__amount_above_balance__is_rejected() {
        let err = validate("5", "addr", 3).unwrap_err();
        assert_eq!(
            err,
            WithdrawalError::InsufficientBalance {
                requested: Amount::from_units(5),
                available: Amount::from_units(3),
            }
        );
        assert_eq!(err.to_string(), "Insufficient balance.");
    }

    #[test]
    fn validate__valid_input__trims_address_and_builds_message() {
        let request = validate("3.5", "  TQx9  ", 5).unwrap();

        assert_eq!(request.amount(), Amount::from_micros(3_500_000));
        assert_eq!(request.address(), "TQx9");
        assert_eq!(request.pending_message(), "Withdrawal of $3.5 to TQx9 is pending.");
    }

    #[test]
    fn validate__exact_balance__is_accepted() {
        assert!(validate("3", "addr", 3).is_ok());
    }
}
