//! Invoice registry: one numbered invoice per order, issued on demand.

use std::fmt::Write as _;

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use common::OrderId;
use domain::invoice::format_number;
use domain::{Invoice, InvoiceKind, PaymentStatus};
use serde::Serialize;
use store::{Store, Transaction};

use crate::views::{OrderDetail, load_order_detail};
use crate::{Backoffice, Result, ServiceError};

/// Returns the order's invoice, issuing the next number of the year when missing.
///
/// The year is the business-timezone year of `now`. Never renumbers an
/// existing invoice.
pub(crate) async fn ensure_invoice<T: Transaction>(
    tx: &mut T,
    order_id: OrderId,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<Invoice> {
    if let Some(invoice) = tx.invoice_for_order(order_id).await? {
        return Ok(invoice);
    }
    let year = now.with_timezone(&offset).year();
    let sequence = tx.next_invoice_sequence(year).await?;
    let invoice = Invoice::issue(order_id, format_number(year, sequence), now);
    tx.insert_invoice(&invoice).await?;

    metrics::counter!("invoices_issued_total").increment(1);
    tracing::info!(order_id = %order_id, numero = %invoice.numero, "invoice issued");
    Ok(invoice)
}

/// Invoice with its live type and the order it bills.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDocument {
    pub numero: String,
    pub numero_affiche: String,
    pub type_facture: InvoiceKind,
    pub date_emission: DateTime<Utc>,
    pub paiement_statut: Option<PaymentStatus>,
    pub commande: OrderDetail,
}

impl InvoiceDocument {
    pub fn new(invoice: &Invoice, payment: Option<PaymentStatus>, commande: OrderDetail) -> Self {
        Self {
            numero: invoice.numero.clone(),
            numero_affiche: invoice.display_number(payment),
            type_facture: invoice.kind(payment),
            date_emission: invoice.date_emission,
            paiement_statut: payment,
            commande,
        }
    }
}

/// Turns an invoice document into a byte stream.
pub trait InvoiceRenderer: Send + Sync {
    /// MIME type of the rendered bytes.
    fn content_type(&self) -> &'static str;

    /// File extension, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, document: &InvoiceDocument) -> Result<Vec<u8>>;
}

/// Plain-text invoice layout.
#[derive(Debug, Clone, Default)]
pub struct TextInvoiceRenderer {
    pub company: String,
}

impl TextInvoiceRenderer {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
        }
    }

    fn write(&self, out: &mut String, document: &InvoiceDocument) -> std::fmt::Result {
        let order = &document.commande;
        if !self.company.is_empty() {
            writeln!(out, "{}", self.company)?;
        }
        writeln!(out, "{} {}", document.type_facture, document.numero_affiche)?;
        writeln!(out, "Date: {}", document.date_emission.format("%d/%m/%Y"))?;
        writeln!(out, "Client: {}", order.order.client.name)?;
        if !order.order.client.contact.is_empty() {
            writeln!(out, "Contact: {}", order.order.client.contact)?;
        }
        if let Some(lieu) = &order.lieu_detail {
            writeln!(out, "Livraison: {}", lieu.nom)?;
        }
        if let Some(date) = order.order.date_livraison {
            writeln!(out, "Date de livraison: {}", date.format("%d/%m/%Y"))?;
        }
        writeln!(out)?;
        for line in &order.lignes_detail {
            let label = line
                .article_detail
                .as_ref()
                .map(|a| a.nom_produit.as_str())
                .unwrap_or("?");
            writeln!(
                out,
                "{label:<30} {:>5} x {:>10} = {:>10}",
                line.line.quantity,
                line.line.unit_price.amount().trunc(),
                line.sous_total
            )?;
        }
        writeln!(out)?;
        writeln!(out, "Total articles: {}", order.totals.total_articles)?;
        writeln!(out, "Frais de livraison: {}", order.totals.frais_final)?;
        writeln!(out, "Total: {}", order.totals.total_commande)?;
        if let Some(status) = document.paiement_statut {
            writeln!(out, "Paiement: {status}")?;
        }
        Ok(())
    }
}

impl InvoiceRenderer for TextInvoiceRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, document: &InvoiceDocument) -> Result<Vec<u8>> {
        let mut out = String::new();
        self.write(&mut out, document)
            .map_err(|e| ServiceError::Render(e.to_string()))?;
        Ok(out.into_bytes())
    }
}

/// Rendered invoice ready to be served.
#[derive(Debug, Clone)]
pub struct RenderedInvoice {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl<S: Store> Backoffice<S> {
    /// Invoice of an order, issued first when it does not exist yet.
    #[tracing::instrument(skip(self))]
    pub async fn invoice_details(&self, order_id: OrderId) -> Result<InvoiceDocument> {
        let mut tx = self.store().begin().await?;
        let order = tx
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", order_id))?;
        let invoice = ensure_invoice(&mut tx, order_id, self.now(), self.offset()).await?;
        let payment = tx.payment_for_order(order_id).await?.map(|p| p.status);
        let detail = load_order_detail(&mut tx, order, self.offset()).await?;
        tx.commit().await?;
        Ok(InvoiceDocument::new(&invoice, payment, detail))
    }

    pub async fn render_invoice(
        &self,
        order_id: OrderId,
        renderer: &dyn InvoiceRenderer,
    ) -> Result<RenderedInvoice> {
        let document = self.invoice_details(order_id).await?;
        let bytes = renderer.render(&document)?;
        Ok(RenderedInvoice {
            filename: format!("{}.{}", document.numero_affiche, renderer.extension()),
            content_type: renderer.content_type(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use common::business_offset;
    use store::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn invoice_is_issued_once_per_order() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let mut tx = store.begin().await.unwrap();

        let order_id = OrderId::new();
        let first = ensure_invoice(&mut tx, order_id, now, business_offset()).await.unwrap();
        let again = ensure_invoice(&mut tx, order_id, now, business_offset()).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(first.numero, "202500001");

        let other = ensure_invoice(&mut tx, OrderId::new(), now, business_offset()).await.unwrap();
        assert_eq!(other.numero, "202500002");
    }

    #[tokio::test]
    async fn new_year_evening_invoice_uses_the_local_year() {
        let store = MemoryStore::new();
        let late = Utc.with_ymd_and_hms(2025, 12, 31, 21, 30, 0).unwrap();
        let mut tx = store.begin().await.unwrap();

        let invoice = ensure_invoice(&mut tx, OrderId::new(), late, business_offset())
            .await
            .unwrap();
        assert_eq!(invoice.numero, "202600001");
    }
}
