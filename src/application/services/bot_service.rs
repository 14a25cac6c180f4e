use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use crate::application::errors::BotError;
use crate::application::messaging::{Context, EventDispatcher, HandlerTable};
use crate::domain::traits::{MessagingClient, Store};
use crate::infrastructure::modules::{ModuleCatalog, ModuleLoader};

/// Data file section holding the Discord credentials
pub const CREDENTIALS_SECTION: &str = "discord";

/// How long a logged-out connection gets to close on its own
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Credentials passed through to the client and the data file
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub token: String,
    pub client_id: String,
    pub google_api_key: String,
}

/// How a bot run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    LoginFailed(String),
    Disconnected,
    ConnectionLost(String),
    Interrupted,
}

/// Wires discovered modules into the client and runs it
pub struct BotService {
    client: Arc<dyn MessagingClient>,
    store: Arc<dyn Store>,
    catalog: ModuleCatalog,
    modules_dir: PathBuf,
}

impl BotService {
    pub fn new(
        client: Arc<dyn MessagingClient>,
        store: Arc<dyn Store>,
        catalog: ModuleCatalog,
        modules_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            store,
            catalog,
            modules_dir: modules_dir.into(),
        }
    }

    /// Save the credentials to the data file. Empty fields keep the stored value.
    pub async fn record_credentials(&self, credentials: &Credentials) -> Result<(), BotError> {
        let fields = [
            ("token", &credentials.token),
            ("client_id", &credentials.client_id),
            ("google_api_key", &credentials.google_api_key),
        ];
        for (key, value) in fields {
            if value.is_empty() {
                continue;
            }
            self.store.set(CREDENTIALS_SECTION, key, value).await?;
        }
        self.store.flush().await?;
        Ok(())
    }

    /// Discover modules and bind their handlers
    pub fn load_handlers(&self) -> Result<HandlerTable, BotError> {
        tracing::info!("Importing event handlers");
        let table = ModuleLoader::new(&self.modules_dir).load(&self.catalog)?;
        tracing::info!("Loaded {} handlers for {} events", table.len(), table.events().len());
        Ok(table)
    }

    /// Run until the connection ends or Ctrl-C is pressed
    pub async fn run(&self, credentials: Credentials) -> Result<RunOutcome, BotError> {
        self.run_until(credentials, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until the connection ends or `interrupt` completes
    pub async fn run_until<F>(&self, credentials: Credentials, interrupt: F) -> Result<RunOutcome, BotError>
    where
        F: Future<Output = ()>,
    {
        self.record_credentials(&credentials).await?;

        tracing::debug!("Compiling event handlers");
        let table = self.load_handlers()?;
        tracing::debug!("Registering event handlers into client");
        let dispatcher = Arc::new(EventDispatcher::from_table(&table));
        let ctx = Context::new(Arc::clone(&self.client), Arc::clone(&self.store));

        tracing::debug!("Connecting to Discord");
        if let Err(e) = self.client.login(&credentials.token).await {
            tracing::error!("Could not connect to Discord: {}", e);
            return Ok(RunOutcome::LoginFailed(e.to_string()));
        }

        tracing::debug!("Running the bot");
        let connect = self.client.connect(ctx, Arc::clone(&dispatcher));
        tokio::pin!(connect);
        tokio::pin!(interrupt);

        let outcome = tokio::select! {
            result = &mut connect => match result {
                Ok(()) => RunOutcome::Disconnected,
                Err(e) => {
                    tracing::error!("Connection lost: {}", e);
                    RunOutcome::ConnectionLost(e.to_string())
                }
            },
            _ = &mut interrupt => {
                tracing::info!("Interrupted, logging out");
                self.shutdown(&mut connect, &dispatcher).await;
                RunOutcome::Interrupted
            }
        };

        tracing::error!("Bot stopped");
        Ok(outcome)
    }

    /// Log out and cancel outstanding handler tasks. Errors are only logged.
    async fn shutdown<C>(&self, connect: &mut C, dispatcher: &EventDispatcher)
    where
        C: Future<Output = Result<(), BotError>> + Unpin,
    {
        if let Err(e) = self.client.logout().await {
            tracing::debug!("Logout failed: {}", e);
        }
        match tokio::time::timeout(SHUTDOWN_GRACE, connect).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Connection closed with error: {}", e),
            Err(_) => tracing::debug!("Connection did not close within {:?}", SHUTDOWN_GRACE),
        }
        let cancelled = dispatcher.cancel_pending().await;
        tracing::debug!("Cancelled {} pending handler tasks", cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;
    use crate::application::messaging::tests::handler_fn;
    use crate::domain::entities::{Event, EventKind};
    use crate::domain::traits::BotInfo;
    use crate::infrastructure::adapters::console::ConsoleClient;
    use crate::infrastructure::storage::JsonStore;
    use crate::application::messaging::tests::MemoryStore;

    fn credentials() -> Credentials {
        Credentials {
            token: "tok".to_string(),
            client_id: "123".to_string(),
            google_api_key: "g-key".to_string(),
        }
    }

    fn modules_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let ping = dir.path().join("ping");
        std::fs::create_dir_all(&ping).unwrap();
        std::fs::write(ping.join("on_message.yaml"), "reply: pong!").unwrap();
        dir
    }

    struct RejectingClient {
        connected: AtomicBool,
    }

    #[async_trait]
    impl MessagingClient for RejectingClient {
        async fn login(&self, _token: &str) -> Result<BotInfo, BotError> {
            Err(BotError::Auth("bad token".to_string()))
        }

        async fn connect(&self, _ctx: Context, _dispatcher: Arc<EventDispatcher>) -> Result<(), BotError> {
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn logout(&self) -> Result<(), BotError> {
            Ok(())
        }

        async fn send_message(&self, _channel_id: &str, _text: &str) -> Result<String, BotError> {
            Err(BotError::NotConnected)
        }

        fn bot_info(&self) -> BotInfo {
            BotInfo::default()
        }
    }

    #[tokio::test]
    async fn test_login_failure_is_swallowed() {
        let dir = modules_dir();
        let client = Arc::new(RejectingClient { connected: AtomicBool::new(false) });
        let store = Arc::new(MemoryStore::new());
        let service = BotService::new(client.clone(), store.clone(), ModuleCatalog::with_builtin(), dir.path());

        let outcome = service.run_until(credentials(), std::future::pending()).await.unwrap();

        assert!(matches!(outcome, RunOutcome::LoginFailed(msg) if msg.contains("bad token")));
        assert!(!client.connected.load(Ordering::SeqCst));
        assert_eq!(store.get(CREDENTIALS_SECTION, "token").await.unwrap(), Some("tok".to_string()));
    }

    #[tokio::test]
    async fn test_credentials_are_recorded() {
        let dir = modules_dir();
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(ConsoleClient::with_input(&b""[..]));
        let service = BotService::new(client, store.clone(), ModuleCatalog::new(), dir.path());

        service.record_credentials(&credentials()).await.unwrap();

        assert_eq!(store.get("discord", "client_id").await.unwrap(), Some("123".to_string()));
        assert_eq!(store.get("discord", "google_api_key").await.unwrap(), Some("g-key".to_string()));
    }

    #[tokio::test]
    async fn test_run_until_input_ends() {
        let dir = modules_dir();
        let client = Arc::new(ConsoleClient::with_input(&b"!ping\n"[..]));
        let service = BotService::new(
            client.clone(),
            Arc::new(MemoryStore::new()),
            ModuleCatalog::with_builtin(),
            dir.path(),
        );

        let outcome = service.run_until(credentials(), std::future::pending()).await.unwrap();

        assert_eq!(outcome, RunOutcome::Disconnected);
        assert_eq!(client.transcript(), vec!["pong!".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_credentials_keep_stored_ones() {
        let dir = modules_dir();
        let data = dir.path().join("data.json");
        std::fs::write(
            &data,
            json!({"discord": {"token": "real-token", "client_id": "99", "google_api_key": "g"}}).to_string(),
        )
        .unwrap();

        let store = Arc::new(JsonStore::open(&data).await.unwrap());
        let service = BotService::new(
            Arc::new(ConsoleClient::with_input(&b""[..])),
            store,
            ModuleCatalog::with_builtin(),
            dir.path(),
        );
        let outcome = service.run_until(Credentials::default(), std::future::pending()).await.unwrap();
        assert_eq!(outcome, RunOutcome::Disconnected);

        let reopened = JsonStore::open(&data).await.unwrap();
        assert_eq!(reopened.get(CREDENTIALS_SECTION, "token").await.unwrap(), Some("real-token".to_string()));
        assert_eq!(reopened.get(CREDENTIALS_SECTION, "client_id").await.unwrap(), Some("99".to_string()));
        assert_eq!(reopened.get(CREDENTIALS_SECTION, "google_api_key").await.unwrap(), Some("g".to_string()));
    }

    /// Stays connected until logged out, after starting one `on_typing` dispatch
    #[derive(Default)]
    struct SessionClient {
        logged_out: AtomicBool,
        closed: Notify,
    }

    #[async_trait]
    impl MessagingClient for SessionClient {
        async fn login(&self, _token: &str) -> Result<BotInfo, BotError> {
            Ok(BotInfo::default())
        }

        async fn connect(&self, ctx: Context, dispatcher: Arc<EventDispatcher>) -> Result<(), BotError> {
            dispatcher.spawn(ctx, Event::new(EventKind::Typing, json!({})));
            self.closed.notified().await;
            Ok(())
        }

        async fn logout(&self) -> Result<(), BotError> {
            self.logged_out.store(true, Ordering::SeqCst);
            self.closed.notify_one();
            Ok(())
        }

        async fn send_message(&self, _channel_id: &str, _text: &str) -> Result<String, BotError> {
            Err(BotError::NotConnected)
        }

        fn bot_info(&self) -> BotInfo {
            BotInfo::default()
        }
    }

    /// Sets the flag when dropped, which for a never-finishing handler means it was aborted
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_interrupt_logs_out_and_cancels_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let slow = dir.path().join("slow");
        std::fs::create_dir_all(&slow).unwrap();
        std::fs::write(slow.join("on_typing"), "").unwrap();

        let started = Arc::new(Notify::new());
        let aborted = Arc::new(AtomicBool::new(false));
        let mut catalog = ModuleCatalog::new();
        {
            let started = Arc::clone(&started);
            let aborted = Arc::clone(&aborted);
            catalog.register("slow", move |_kind, _settings| {
                let started = Arc::clone(&started);
                let aborted = Arc::clone(&aborted);
                Some(handler_fn(move |_ctx, _event| {
                    let guard = DropFlag(Arc::clone(&aborted));
                    let started = Arc::clone(&started);
                    Box::pin(async move {
                        let _guard = guard;
                        started.notify_one();
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(())
                    })
                }))
            });
        }

        let client = Arc::new(SessionClient::default());
        let service = BotService::new(client.clone(), Arc::new(MemoryStore::new()), catalog, dir.path());

        let interrupt = {
            let started = Arc::clone(&started);
            async move { started.notified().await }
        };
        let outcome = tokio::time::timeout(Duration::from_secs(10), service.run_until(credentials(), interrupt))
            .await
            .expect("interrupt should stop the bot")
            .unwrap();

        assert_eq!(outcome, RunOutcome::Interrupted);
        assert!(client.logged_out.load(Ordering::SeqCst));
        assert!(aborted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_interrupt_stops_console_session() {
        let dir = modules_dir();
        // The writer half stays open so the console never sees end of input
        let (_writer, reader) = tokio::io::duplex(64);
        let client = Arc::new(ConsoleClient::with_input(tokio::io::BufReader::new(reader)));
        let service = BotService::new(
            client,
            Arc::new(MemoryStore::new()),
            ModuleCatalog::with_builtin(),
            dir.path(),
        );

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            service.run_until(credentials(), tokio::time::sleep(Duration::from_millis(50))),
        )
        .await
        .expect("interrupt should stop the bot");

        assert_eq!(outcome.unwrap(), RunOutcome::Interrupted);
    }

    #[test]
    fn test_load_handlers_uses_catalog() {
        let dir = modules_dir();
        let service = BotService::new(
            Arc::new(ConsoleClient::with_input(&b""[..])),
            Arc::new(MemoryStore::new()),
            ModuleCatalog::with_builtin(),
            dir.path(),
        );

        let table = service.load_handlers().unwrap();
        assert_eq!(table.summary().len(), 1);
    }
}
