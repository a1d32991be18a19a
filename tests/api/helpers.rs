use std::sync::Arc;
use std::{env, io, sync};

use async_trait::async_trait;
use linkify::{LinkFinder, LinkKind};
use reqwest::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mailblog::configuration::Settings;
use mailblog::domain::{Subscriber, SubscriberEmail};
use mailblog::routes::Envelope;
use mailblog::startup::Application;
use mailblog::store::{InMemoryStore, SubscriberStore};
use mailblog::telemetry::{get_subscriber, init_subscriber};

/// Ensure the tracing stack is initialized only once
static TRACING: sync::LazyLock<()> = sync::LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if env::var("TEST_LOG").is_ok() {
        init_subscriber(get_subscriber(
            subscriber_name,
            default_filter_level,
            io::stdout,
        ));
    } else {
        init_subscriber(get_subscriber(
            subscriber_name,
            default_filter_level,
            io::sink,
        ));
    }
});

/// Links embedded in an email sent through the mock API
pub struct EmailLinks {
    pub html: Vec<Url>,
    pub text: Vec<Url>,
}

impl EmailLinks {
    /// First link of the plain text body, the primary action of the email
    pub fn primary(&self) -> Url {
        self.text[0].clone()
    }
}

/// Test application data
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub email_server: MockServer,
    pub store: Arc<dyn SubscriberStore>,
    pub api_client: reqwest::Client,
}

impl TestApp {
    /// Spin up a test application backed by an in-memory store
    pub async fn spawn() -> Self {
        Self::spawn_with_store(Arc::new(InMemoryStore::default())).await
    }

    /// Spin up a test application on top of the given store and return its data
    pub async fn spawn_with_store(store: Arc<dyn SubscriberStore>) -> Self {
        // Initialize logging
        sync::LazyLock::force(&TRACING);

        // Launch a mock server to stand in for Postmark's API
        let email_server = MockServer::start().await;

        // Get settings and modify them for testing
        let config = {
            let mut c = Settings::get_config().expect("Failed to read configuration");
            // Listen on a random TCP port
            c.application.app_port = 0;
            // Use the mock server as email API
            c.email_client.base_url = email_server.uri();
            // Fail fast if the mock server hangs
            c.email_client.timeout_millis = 2_000;
            c
        };

        // Build the application and get its address
        let app = Application::build_with_store(config, Arc::clone(&store))
            .expect("Failed to build application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{port}");

        // Build the API client
        let api_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        // Run the application and return its data
        #[allow(clippy::let_underscore_future)]
        let _ = tokio::spawn(app.run_until_stopped());
        Self {
            address,
            port,
            email_server,
            store,
            api_client,
        }
    }

    /// Accept every request to the email API
    pub async fn accept_emails(&self) {
        Mock::given(path("/email"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.email_server)
            .await;
    }

    /// Reject every request to the email API
    pub async fn reject_emails(&self) {
        Mock::given(path("/email"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.email_server)
            .await;
    }

    /// POST a JSON body to the subscribe endpoint
    pub async fn post_subscribe(&self, body: &serde_json::Value) -> reqwest::Response {
        self.post_subscribe_raw(body.to_string()).await
    }

    /// POST a raw body to the subscribe endpoint
    pub async fn post_subscribe_raw(&self, body: String) -> reqwest::Response {
        self.api_client
            .post(format!("{}/subscribe", &self.address))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// GET the verify endpoint with the given query parameters
    pub async fn get_verify(&self, query: &[(&str, &str)]) -> reqwest::Response {
        self.get_with_query("verify", query).await
    }

    /// GET the unsubscribe endpoint with the given query parameters
    pub async fn get_unsubscribe(&self, query: &[(&str, &str)]) -> reqwest::Response {
        self.get_with_query("unsubscribe", query).await
    }

    async fn get_with_query(&self, endpoint: &str, query: &[(&str, &str)]) -> reqwest::Response {
        self.api_client
            .get(format!("{}/{endpoint}", &self.address))
            .query(query)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Follow a link extracted from an email
    pub async fn follow(&self, link: Url) -> reqwest::Response {
        self.api_client
            .get(link)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Subscribe the given email and return the token that was sent to it
    pub async fn subscribe_and_get_token(&self, email: &str) -> String {
        self.post_subscribe(&serde_json::json!({ "email": email }))
            .await
            .error_for_status()
            .unwrap();
        let links = self.last_email_links().await;
        token_of(&links.primary())
    }

    /// Extract links embedded in the most recent request to the email API
    pub async fn last_email_links(&self) -> EmailLinks {
        let requests = self.email_server.received_requests().await.unwrap();
        let email_request = requests.last().expect("No email was sent");
        self.email_links(email_request)
    }

    /// Extract links embedded in a request to the email API
    pub fn email_links(&self, email_request: &wiremock::Request) -> EmailLinks {
        // Parse the request body as JSON
        let body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();

        // Extract the links, pointing them at the test instance
        let get_links = |s| {
            LinkFinder::new()
                .links(s)
                .filter(|l| *l.kind() == LinkKind::Url)
                .map(|l| {
                    let mut link = Url::parse(l.as_str()).unwrap();
                    assert_eq!(link.host_str().unwrap(), "127.0.0.1");
                    link.set_port(Some(self.port)).unwrap();
                    link
                })
                .collect::<Vec<_>>()
        };

        EmailLinks {
            html: get_links(body["HtmlBody"].as_str().unwrap()),
            text: get_links(body["TextBody"].as_str().unwrap()),
        }
    }

    /// Number of requests received by the email API so far
    pub async fn sent_emails(&self) -> usize {
        self.email_server.received_requests().await.unwrap().len()
    }

    /// Look up a subscriber record directly in the store
    pub async fn subscriber(&self, email: &str) -> Option<Subscriber> {
        let email = SubscriberEmail::parse(email.to_string()).unwrap();
        self.store.get_subscriber(&email).await.unwrap()
    }
}

/// Extract the `token` query parameter of a link
pub fn token_of(link: &Url) -> String {
    link.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .expect("Link without token")
}

/// Decode the response envelope
pub async fn message_of(response: reqwest::Response) -> String {
    response.json::<Envelope>().await.unwrap().message
}

/// Store whose backend is always unreachable
pub struct UnreachableStore;

#[async_trait]
impl SubscriberStore for UnreachableStore {
    async fn get_subscriber(&self, _email: &SubscriberEmail) -> anyhow::Result<Option<Subscriber>> {
        anyhow::bail!("connection refused")
    }

    async fn put_subscriber(&self, _subscriber: &Subscriber) -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }
}
