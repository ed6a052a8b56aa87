use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::models::{NewPatient, NewPayment, Patient};

/// Wire format for every calendar date the service accepts
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_patient_name(name: &str) -> Result<NewPatient, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingPatientName);
    }
    Ok(NewPatient {
        name: trimmed.to_string(),
    })
}

/// Parse a user-typed amount. Only positive finite values are accepted.
pub fn parse_amount(input: &str) -> Result<f64, ValidationError> {
    let amount: f64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidAmount)?;

    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(amount)
}

pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingPaymentDate);
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(trimmed.to_string()))
}

/// Empty input means "no bound".
pub fn parse_optional_date(input: &str) -> Result<Option<NaiveDate>, ValidationError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    parse_date(input).map(Some)
}

/// Check a payment form in display order: patient, then amount, then date.
pub fn validate_payment(
    patient: Option<&Patient>,
    amount: &str,
    paid_at: &str,
) -> Result<NewPayment, ValidationError> {
    let patient = patient.ok_or(ValidationError::NoPatientSelected)?;
    let amount = parse_amount(amount)?;
    let paid_at = parse_date(paid_at).map_err(|err| match err {
        ValidationError::InvalidDate(_) => ValidationError::MissingPaymentDate,
        other => other,
    })?;

    Ok(NewPayment {
        patient_id: patient.id,
        amount,
        paid_at,
    })
}
