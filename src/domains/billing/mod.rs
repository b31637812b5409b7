pub mod confirmation_service;
pub mod models;
pub mod order_service;
pub mod payment_service;
pub mod subscription_service;

pub use confirmation_service::ConfirmationService;
pub use order_service::OrderService;
pub use payment_service::PaymentService;
pub use subscription_service::SubscriptionService;
