//! Billing artifact rendering for completed payments.

use crate::models::Payment;
use service_core::error::AppError;
use std::fmt::Write;

/// Rendered billing artifact: a download URL plus the document bytes.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub url: String,
    pub document: Vec<u8>,
}

pub trait InvoiceGenerator: Send + Sync {
    fn render(&self, payment: &Payment) -> Result<Invoice, AppError>;
}

/// Renders a plain-text invoice document.
pub struct TextInvoiceRenderer {
    base_url: String,
}

impl TextInvoiceRenderer {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl InvoiceGenerator for TextInvoiceRenderer {
    fn render(&self, payment: &Payment) -> Result<Invoice, AppError> {
        let url = format!("{}/{}.pdf", self.base_url, payment.id);

        let mut doc = String::new();
        let invoice_number = &payment.id.to_string()[..8];
        let line = format!("{:.2} {}", payment.amount, payment.currency);

        writeln!(doc, "SecurePayments Inc.")?;
        writeln!(doc, "200 Payment Plaza, Suite 300")?;
        writeln!(doc, "Financial District, NY 10004")?;
        writeln!(doc, "support@securepayments.com")?;
        writeln!(doc)?;
        writeln!(doc, "INVOICE")?;
        writeln!(doc, "Invoice Number: INV-{}", invoice_number)?;
        writeln!(doc, "Date: {}", payment.created_at.format("%B %-d, %Y"))?;
        writeln!(doc)?;
        writeln!(doc, "Billed To: {}", payment.customer_email)?;
        writeln!(doc)?;
        writeln!(doc, "{:<50} {:>8} {:>14} {:>14}", "Description", "Quantity", "Unit Price", "Amount")?;
        writeln!(doc, "{:<50} {:>8} {:>14} {:>14}", payment.description, 1, line, line)?;
        writeln!(doc)?;
        writeln!(doc, "{:>73} {:>14}", "Subtotal:", line)?;
        writeln!(doc, "{:>73} {:>14}", "Tax (0%):", format!("0.00 {}", payment.currency))?;
        writeln!(doc, "{:>73} {:>14}", "Total:", line)?;
        writeln!(doc)?;
        writeln!(doc, "Payment ID: {}", payment.id)?;
        writeln!(doc, "Status: {}", payment.status.as_str())?;
        writeln!(doc, "Date: {}", payment.updated_at.format("%B %-d, %Y %H:%M:%S"))?;
        writeln!(doc)?;
        writeln!(doc, "Thank you for your business!")?;

        Ok(Invoice {
            url,
            document: doc.into_bytes(),
        })
    }
}
