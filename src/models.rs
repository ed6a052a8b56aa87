use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub amount: f64,
    /// Calendar date of the payment, `YYYY-MM-DD` on the wire
    pub paid_at: NaiveDate,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Optional date bounds for the payments listing. A missing bound is unbounded on
/// that side, so the default value means "all payments".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self { start_date, end_date }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }

    /// Inclusive on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|start| date >= start)
            && self.end_date.is_none_or(|end| date <= end)
    }

    /// Query pairs for `GET /payments`; absent bounds are left out entirely.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start_date {
            pairs.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub patient_id: i64,
    pub amount: f64,
    pub paid_at: NaiveDate,
}

/// Error body returned by the payments service on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_date_range_bounds_are_inclusive() {
        let range = DateRange::new(Some(date("2024-02-01")), Some(date("2024-02-29")));

        assert!(range.contains(date("2024-02-01")));
        assert!(range.contains(date("2024-02-29")));
        assert!(!range.contains(date("2024-01-31")));
        assert!(!range.contains(date("2024-03-01")));
        assert!(DateRange::all().contains(date("1999-12-31")));
    }

    #[test]
    fn test_query_pairs_skip_missing_bounds() {
        assert!(DateRange::all().query_pairs().is_empty());

        let range = DateRange::new(None, Some(date("2024-02-10")));
        assert_eq!(range.query_pairs(), vec![("end_date", "2024-02-10".to_string())]);
    }

    #[test]
    fn test_payment_wire_format() {
        let json = r#"{
            "id": 7,
            "patient_id": 3,
            "patient_name": "Jane Doe",
            "amount": 125.5,
            "paid_at": "2024-01-05",
            "created_by": 1,
            "created_at": "2024-01-05T10:15:00Z"
        }"#;

        let payment: Payment = serde_json::from_str(json).unwrap();
        assert_eq!(payment.paid_at, date("2024-01-05"));
        assert_eq!(payment.patient_name, "Jane Doe");

        let body = serde_json::to_value(NewPayment {
            patient_id: 3,
            amount: 10.0,
            paid_at: date("2024-01-05"),
        })
        .unwrap();
        assert_eq!(body["paid_at"], "2024-01-05");
    }
}
