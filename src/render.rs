//! Plain-text rendering of payments for the terminal.

use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

use crate::models::{Patient, Payment};
use crate::payments_list::ListView;

pub const NO_PAYMENTS: &str = "No payments found.";

/// US dollar amount with thousands separators, e.g. `$1,234.50`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Long US date, e.g. `January 5, 2024`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn payments_table(payments: &[Payment]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Date"),
            Cell::new("Patient Name"),
            Cell::new("Amount").set_alignment(CellAlignment::Right),
        ]);

    if payments.is_empty() {
        table.add_row(vec![Cell::new(NO_PAYMENTS), Cell::new(""), Cell::new("")]);
    }

    for payment in payments {
        table.add_row(vec![
            Cell::new(format_date(payment.paid_at)),
            Cell::new(&payment.patient_name),
            Cell::new(format_currency(payment.amount)).set_alignment(CellAlignment::Right),
        ]);
    }

    format!("{table}\n")
}

pub fn list_view(view: ListView<'_>) -> String {
    match view {
        ListView::Loading => "Loading payments...\n".to_string(),
        ListView::Error(message) => format!("Error: {}\n", message),
        ListView::Empty => payments_table(&[]),
        ListView::Rows(payments) => payments_table(payments),
    }
}

/// Numbered suggestion list as shown under the search box
pub fn suggestions(patients: &[Patient]) -> String {
    patients
        .iter()
        .enumerate()
        .map(|(i, patient)| format!("  [{}] {}\n", i + 1, patient.name))
        .collect()
}
