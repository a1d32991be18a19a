use std::sync::Arc;
use std::{io, net, time};

use actix_web::dev::Server;
use actix_web::middleware::{DefaultHeaders, ErrorHandlers};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_actix_web::TracingLogger;

use crate::configuration::{Settings, StoreBackend};
use crate::routes::{
    envelope_framework_error, method_not_allowed, subscribe, unsubscribe, verify, ApiError,
};
use crate::store::{InMemoryStore, PostgresStore, SubscriberStore};
use crate::subscriptions::SubscriptionService;
use crate::telemetry::RedactedRootSpanBuilder;
use crate::templates::Templates;

/// Application
pub struct Application {
    server: Server,
    port: u16,
}

impl Application {
    /// Build an application based on settings
    pub async fn build(config: Settings) -> anyhow::Result<Self> {
        // Pick the subscriber record store
        let store: Arc<dyn SubscriberStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(InMemoryStore::default()),
            StoreBackend::Postgres => {
                let database = config
                    .store
                    .database
                    .as_ref()
                    .context("The postgres store requires database settings")?;
                let db_pool = PgPoolOptions::new()
                    .acquire_timeout(time::Duration::from_secs(2))
                    .connect_lazy_with(database.db_options());
                let store = PostgresStore::new(db_pool);
                store.migrate().await?;
                Arc::new(store)
            }
        };

        // Run the HTTP server and return its data
        Self::build_with_store(config, store)
    }

    /// Build an application based on settings and subscriber record store
    pub fn build_with_store(
        config: Settings,
        store: Arc<dyn SubscriberStore>,
    ) -> anyhow::Result<Self> {
        // Build the collaborators
        let email_client = config.email_client.client()?;
        let templates = match &config.application.templates_dir {
            Some(dir) => Templates::from_dir(dir)?,
            None => Templates::default(),
        };
        let subscriptions = SubscriptionService::new(
            store,
            Arc::new(email_client),
            templates,
            config.application.base_url,
        );

        // Run the HTTP server and return its data
        let listener = net::TcpListener::bind(format!(
            "{}:{}",
            config.application.app_host, config.application.app_port
        ))?;
        let port = listener.local_addr()?.port();
        let server = run_server(listener, subscriptions)?;
        Ok(Self { server, port })
    }

    /// Get application port
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Run application until it is stopped
    pub async fn run_until_stopped(self) -> io::Result<()> {
        self.server.await
    }
}

/// Run the HTTP server
pub fn run_server(
    listener: net::TcpListener,
    subscriptions: SubscriptionService,
) -> anyhow::Result<Server> {
    // Prepare data to be added the application context
    let subscriptions = web::Data::new(subscriptions);

    // Start the HTTP server
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(ErrorHandlers::new().default_handler(envelope_framework_error))
            .wrap(
                DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Credentials", "true")),
            )
            .wrap(TracingLogger::<RedactedRootSpanBuilder>::new())
            .app_data(web::QueryConfig::default().error_handler(|err, _| {
                tracing::warn!(error.message = %err, "Rejecting malformed query string");
                ApiError::ValidationError("Email and token are required").into()
            }))
            .service(
                web::resource("/subscribe")
                    .route(web::post().to(subscribe))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/verify")
                    .route(web::get().to(verify))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/unsubscribe")
                    .route(web::get().to(unsubscribe))
                    .default_service(web::to(method_not_allowed)),
            )
            .default_service(web::to(method_not_allowed))
            .app_data(subscriptions.clone())
    })
    .listen(listener)?
    .run())
}
