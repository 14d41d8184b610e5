//! Customer-facing notification mail.

use crate::config::SmtpConfig;
use crate::models::{Payment, Subscription};
use crate::services::invoice::Invoice;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::sync::Mutex;

/// One send method per notification kind the lifecycle managers dispatch.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_payment_confirmation(&self, payment: &Payment) -> Result<(), AppError>;
    async fn send_payment_receipt(&self, payment: &Payment) -> Result<(), AppError>;
    async fn send_refund_confirmation(&self, payment: &Payment) -> Result<(), AppError>;
    async fn send_payment_reminder(&self, payment: &Payment) -> Result<(), AppError>;
    async fn send_invoice(&self, payment: &Payment, invoice: &Invoice) -> Result<(), AppError>;
    async fn send_cancellation(&self, subscription: &Subscription) -> Result<(), AppError>;
    async fn send_renewal(&self, subscription: &Subscription) -> Result<(), AppError>;
}

pub struct SmtpMailer {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self, AppError> {
        if !config.enabled {
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::EmailError(format!("Failed to create SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }

    fn from_mailbox(&self) -> Result<Mailbox, AppError> {
        format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| AppError::EmailError(format!("Invalid from address: {}", e)))
    }

    async fn send(&self, message: Message) -> Result<(), AppError> {
        let transport = self.transport.as_ref().ok_or_else(|| {
            AppError::EmailError("SMTP mailer is not enabled".to_string())
        })?;
        transport.send(message).await?;
        Ok(())
    }

    async fn send_plain(&self, to: &str, subject: &str, body: String) -> Result<(), AppError> {
        let message = Message::builder()
            .from(self.from_mailbox()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.send(message).await?;
        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_payment_confirmation(&self, payment: &Payment) -> Result<(), AppError> {
        let body = format!(
            "Dear Customer,\n\n\
             Your payment of {:.2} {} has been confirmed.\n\
             Payment ID: {}\n\
             Description: {}\n\n\
             Thank you for your business!",
            payment.amount, payment.currency, payment.id, payment.description
        );
        self.send_plain(&payment.customer_email, "Payment Confirmation", body)
            .await
    }

    async fn send_payment_receipt(&self, payment: &Payment) -> Result<(), AppError> {
        let body = format!(
            "Dear Customer,\n\n\
             Here is your payment receipt:\n\n\
             Payment ID: {}\n\
             Amount: {:.2} {}\n\
             Date: {}\n\
             Description: {}\n\n\
             Thank you for your business!",
            payment.id,
            payment.amount,
            payment.currency,
            payment.created_at.format("%Y-%m-%d %H:%M:%S"),
            payment.description
        );
        self.send_plain(&payment.customer_email, "Payment Receipt", body)
            .await
    }

    async fn send_refund_confirmation(&self, payment: &Payment) -> Result<(), AppError> {
        let body = format!(
            "Dear Customer,\n\n\
             Your refund for payment {} has been processed.\n\
             Amount: {:.2} {}\n\
             Date: {}\n\n\
             The refunded amount will be credited to your original payment method.\n\n\
             Thank you for your understanding.",
            payment.id,
            payment.amount,
            payment.currency,
            payment.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
        self.send_plain(&payment.customer_email, "Payment Refund Confirmation", body)
            .await
    }

    async fn send_payment_reminder(&self, payment: &Payment) -> Result<(), AppError> {
        let body = format!(
            "Dear Customer,\n\n\
             This is a friendly reminder about your pending payment:\n\n\
             Payment ID: {}\n\
             Amount: {:.2} {}\n\
             Description: {}\n\
             Created: {}\n\n\
             Please complete this payment at your earliest convenience.\n\
             If you've already made this payment, please disregard this message.\n\n\
             Thank you for your business!",
            payment.id,
            payment.amount,
            payment.currency,
            payment.description,
            payment.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        self.send_plain(&payment.customer_email, "Payment Reminder", body)
            .await
    }

    async fn send_invoice(&self, payment: &Payment, invoice: &Invoice) -> Result<(), AppError> {
        let body = format!(
            "Dear Customer,\n\n\
             Please find your invoice attached.\n\
             You can also download it here: {}\n\n\
             Thank you for your business!",
            invoice.url
        );

        let attachment = Attachment::new(format!("invoice-{}.txt", payment.id)).body(
            invoice.document.clone(),
            ContentType::TEXT_PLAIN,
        );

        let message = Message::builder()
            .from(self.from_mailbox()?)
            .to(payment.customer_email.parse()?)
            .subject("Your Payment Invoice")
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body),
                    )
                    .singlepart(attachment),
            )?;

        self.send(message).await?;
        tracing::info!(
            to = %payment.customer_email,
            payment_id = %payment.id,
            "Invoice email sent"
        );
        Ok(())
    }

    async fn send_cancellation(&self, subscription: &Subscription) -> Result<(), AppError> {
        let body = format!(
            "Dear Customer,\n\n\
             Your subscription to {} has been cancelled.\n\
             It will remain usable until {}.\n\n\
             We're sorry to see you go.",
            subscription.plan_name,
            subscription.end_date.format("%Y-%m-%d")
        );
        self.send_plain(&subscription.customer_email, "Subscription Cancelled", body)
            .await
    }

    async fn send_renewal(&self, subscription: &Subscription) -> Result<(), AppError> {
        let body = format!(
            "Dear Customer,\n\n\
             Your subscription to {} has been renewed.\n\
             New period: {} to {}.\n\n\
             Thank you for staying with us!",
            subscription.plan_name,
            subscription.start_date.format("%Y-%m-%d"),
            subscription.end_date.format("%Y-%m-%d")
        );
        self.send_plain(&subscription.customer_email, "Subscription Renewed", body)
            .await
    }
}

/// Which notification a recorded send belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Confirmation,
    Receipt,
    RefundConfirmation,
    Reminder,
    Invoice,
    Cancellation,
    Renewal,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub kind: MailKind,
    pub to: String,
}

/// Records sends in memory instead of talking SMTP. Test double.
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails, for best-effort path tests.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn record(&self, kind: MailKind, to: &str) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::EmailError("mail transport down".to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            kind,
            to: to.to_string(),
        });
        Ok(())
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count_of(&self, kind: MailKind) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|mail| mail.kind == kind)
            .count()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_payment_confirmation(&self, payment: &Payment) -> Result<(), AppError> {
        self.record(MailKind::Confirmation, &payment.customer_email)
    }

    async fn send_payment_receipt(&self, payment: &Payment) -> Result<(), AppError> {
        self.record(MailKind::Receipt, &payment.customer_email)
    }

    async fn send_refund_confirmation(&self, payment: &Payment) -> Result<(), AppError> {
        self.record(MailKind::RefundConfirmation, &payment.customer_email)
    }

    async fn send_payment_reminder(&self, payment: &Payment) -> Result<(), AppError> {
        self.record(MailKind::Reminder, &payment.customer_email)
    }

    async fn send_invoice(&self, payment: &Payment, _invoice: &Invoice) -> Result<(), AppError> {
        self.record(MailKind::Invoice, &payment.customer_email)
    }

    async fn send_cancellation(&self, subscription: &Subscription) -> Result<(), AppError> {
        self.record(MailKind::Cancellation, &subscription.customer_email)
    }

    async fn send_renewal(&self, subscription: &Subscription) -> Result<(), AppError> {
        self.record(MailKind::Renewal, &subscription.customer_email)
    }
}
