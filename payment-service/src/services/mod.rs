pub mod cache;
pub mod email;
pub mod events;
pub mod invoice;
pub mod memory;
pub mod metrics;
pub mod payments;
pub mod repository;
pub mod subscriptions;
pub mod worker;

pub use cache::{InMemoryCache, RecordCache, RedisCache, CACHE_TTL};
pub use email::{Mailer, MockMailer, SmtpMailer};
pub use events::{EventPublisher, RecordingPublisher, RedisEventPublisher};
pub use invoice::{Invoice, InvoiceGenerator, TextInvoiceRenderer};
pub use memory::{InMemoryPaymentStore, InMemorySubscriptionStore};
pub use metrics::{get_metrics, init_metrics};
pub use payments::PaymentService;
pub use repository::{PaymentRepository, PaymentStore, SubscriptionRepository, SubscriptionStore};
pub use subscriptions::SubscriptionService;
pub use worker::{InvoiceQueue, InvoiceWorker};
