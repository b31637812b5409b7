use reqwest::Client as ReqwestClient;
use sqlx::PgPool;
use std::env;

use crate::db::create_db_pool;
use crate::domains::billing::{
    ConfirmationService, OrderService, PaymentService, SubscriptionService,
};
use crate::domains::loyalty::{CardService, CustomerService, TemplateService};
use crate::services::chip::{ChipClient, DEFAULT_BASE_URL};

/// Shared application state: the database pool, the gateway client and the
/// domain services handlers call into.
pub struct AppState {
    pub db_pool: PgPool,
    pub http_client: ReqwestClient,
    pub chip: ChipClient,
    pub app_base_url: String,

    pub template_service: TemplateService,
    pub customer_service: CustomerService,
    pub card_service: CardService,
    pub order_service: OrderService,
    pub payment_service: PaymentService,
    pub confirmation_service: ConfirmationService,
    pub subscription_service: SubscriptionService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|e| anyhow::anyhow!("DATABASE_URL must be set: {}", e))?;
        let db_pool = create_db_pool(&database_url).await?;

        let chip_brand_id = env::var("CHIP_BRAND_ID")
            .map_err(|e| anyhow::anyhow!("CHIP_BRAND_ID must be set: {}", e))?;
        let chip_secret_key = env::var("CHIP_SECRET_KEY")
            .map_err(|e| anyhow::anyhow!("CHIP_SECRET_KEY must be set: {}", e))?;
        let chip_base_url =
            env::var("CHIP_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let payment_method_whitelist = env::var("CHIP_PAYMENT_METHOD_WHITELIST")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();

        let app_base_url =
            env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

        let http_client = ReqwestClient::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        let chip = ChipClient::new(
            http_client.clone(),
            chip_base_url,
            chip_brand_id,
            chip_secret_key,
            payment_method_whitelist,
        );

        Ok(AppState {
            template_service: TemplateService::new(db_pool.clone()),
            customer_service: CustomerService::new(db_pool.clone()),
            card_service: CardService::new(db_pool.clone()),
            order_service: OrderService::new(db_pool.clone()),
            payment_service: PaymentService::new(
                db_pool.clone(),
                chip.clone(),
                app_base_url.clone(),
            ),
            confirmation_service: ConfirmationService::new(db_pool.clone(), chip.clone()),
            subscription_service: SubscriptionService::new(db_pool.clone()),
            db_pool,
            http_client,
            chip,
            app_base_url,
        })
    }
}
