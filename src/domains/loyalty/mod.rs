pub mod card_service;
pub mod customer_service;
pub mod models;
pub mod template_service;

pub use card_service::CardService;
pub use customer_service::CustomerService;
pub use template_service::TemplateService;
