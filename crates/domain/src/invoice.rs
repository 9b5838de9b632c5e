//! Invoice numbering and document type.

use chrono::{DateTime, Utc};
use common::{InvoiceId, OrderId};
use serde::{Deserialize, Serialize};

use crate::PaymentStatus;

/// Width of the per-year sequence in an invoice number.
pub const SEQUENCE_WIDTH: usize = 5;

/// Numbered billing document of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    #[serde(rename = "commande")]
    pub order_id: OrderId,
    pub numero: String,
    pub date_emission: DateTime<Utc>,
}

impl Invoice {
    pub fn issue(order_id: OrderId, numero: String, now: DateTime<Utc>) -> Self {
        Self {
            id: InvoiceId::new(),
            order_id,
            numero,
            date_emission: now,
        }
    }

    /// Document type, derived from the live payment status.
    pub fn kind(&self, payment: Option<PaymentStatus>) -> InvoiceKind {
        InvoiceKind::for_payment(payment)
    }

    /// Number shown to users, e.g. `PF-202500012`.
    pub fn display_number(&self, payment: Option<PaymentStatus>) -> String {
        format!("{}-{}", self.kind(payment).prefix(), self.numero)
    }
}

/// Proforma until the order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceKind {
    #[serde(rename = "PROFORMA")]
    Proforma,
    #[serde(rename = "FACTURE")]
    Final,
}

impl InvoiceKind {
    pub fn for_payment(payment: Option<PaymentStatus>) -> Self {
        match payment {
            Some(PaymentStatus::Paid) => InvoiceKind::Final,
            _ => InvoiceKind::Proforma,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            InvoiceKind::Proforma => "PF",
            InvoiceKind::Final => "F",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceKind::Proforma => "PROFORMA",
            InvoiceKind::Final => "FACTURE",
        }
    }
}

impl std::fmt::Display for InvoiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `YYYY` followed by the zero-padded sequence.
pub fn format_number(year: i32, sequence: u32) -> String {
    format!("{year}{sequence:0width$}", width = SEQUENCE_WIDTH)
}

/// Sequence part of `numero` when it belongs to `year`.
pub fn sequence_of(numero: &str, year: i32) -> Option<u32> {
    let rest = numero.strip_prefix(&year.to_string())?;
    if rest.len() != SEQUENCE_WIDTH {
        return None;
    }
    rest.parse().ok()
}

/// Highest sequence used in `year` among existing numbers.
pub fn last_sequence<'a>(numbers: impl IntoIterator<Item = &'a str>, year: i32) -> u32 {
    numbers
        .into_iter()
        .filter_map(|numero| sequence_of(numero, year))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_year_plus_five_digits() {
        assert_eq!(format_number(2025, 1), "202500001");
        assert_eq!(format_number(2025, 12345), "202512345");
    }

    #[test]
    fn sequence_parsing_ignores_other_years() {
        assert_eq!(sequence_of("202500042", 2025), Some(42));
        assert_eq!(sequence_of("202400042", 2025), None);
        assert_eq!(sequence_of("2025ABCDE", 2025), None);
        assert_eq!(
            last_sequence(["202400099", "202500003", "202500010"], 2025),
            10
        );
        assert_eq!(last_sequence([], 2026), 0);
    }

    #[test]
    fn kind_follows_payment() {
        let invoice = Invoice::issue(OrderId::new(), format_number(2025, 7), Utc::now());
        assert_eq!(invoice.kind(None), InvoiceKind::Proforma);
        assert_eq!(invoice.kind(Some(PaymentStatus::Pending)), InvoiceKind::Proforma);
        assert_eq!(invoice.kind(Some(PaymentStatus::Cancelled)), InvoiceKind::Proforma);
        assert_eq!(invoice.kind(Some(PaymentStatus::Paid)), InvoiceKind::Final);
        assert_eq!(invoice.display_number(None), "PF-202500007");
        assert_eq!(invoice.display_number(Some(PaymentStatus::Paid)), "F-202500007");
    }
}
