//! Card input formatting and validation.
//!
//! The formatters are display helpers for clients. [`validate_payment`] is the
//! rule set the server enforces before recording a payment; clients run the
//! same check (plus the cardholder name) before submitting.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Please enter a valid card number")]
    InvalidCardNumber,
    #[error("Please enter a valid expiry date (MM/YY)")]
    InvalidExpiry,
    #[error("Please enter a valid CVV")]
    InvalidCvv,
}

/// Group the digits of `value` in blocks of four, e.g. `4111 1111 1111 1111`.
/// Non-digits are dropped and at most 16 digits are grouped; fewer than four
/// digits are returned as typed.
pub fn format_card_number(value: &str) -> String {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return digits;
    }
    let grouped: Vec<&str> = digits.as_bytes()[..digits.len().min(16)]
        .chunks(4)
        .filter_map(|c| std::str::from_utf8(c).ok())
        .collect();
    grouped.join(" ")
}

/// Turn `1229` into `12/29`.
pub fn format_expiry_date(value: &str) -> String {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.len() >= 2 {
        let end = digits.len().min(4);
        format!("{}/{}", &digits[..2], &digits[2..end])
    } else {
        digits
    }
}

/// Validate a submitted card and return its digits (spaces removed).
pub fn validate_payment(
    card_number: &str,
    expiry_date: &str,
    cvv: &str,
) -> Result<String, CardError> {
    if card_number.trim().is_empty() || expiry_date.trim().is_empty() || cvv.trim().is_empty() {
        return Err(CardError::MissingFields);
    }

    let digits: String = card_number.chars().filter(|c| !c.is_whitespace()).collect();
    if !(13..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(CardError::InvalidCardNumber);
    }

    if expiry_date.chars().count() != 5 {
        return Err(CardError::InvalidExpiry);
    }

    if !(3..=4).contains(&cvv.chars().count()) {
        return Err(CardError::InvalidCvv);
    }

    Ok(digits)
}

/// Last four characters of an already validated digit string.
pub fn last_four(digits: &str) -> &str {
    &digits[digits.len().saturating_sub(4)..]
}

/// Client-side payment form, including the cardholder name the server never sees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentForm {
    pub cardholder_name: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
}

impl PaymentForm {
    pub fn validate(&self) -> Result<(), CardError> {
        if self.cardholder_name.trim().is_empty() {
            return Err(CardError::MissingFields);
        }
        validate_payment(&self.card_number, &self.expiry_date, &self.cvv).map(|_| ())
    }
}
