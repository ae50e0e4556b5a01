use async_trait::async_trait;
use modkit::eventing::{
    Event, EventConfig, EventFilter, EventHandler, EventManager, EventPriority, LoggingMiddleware,
    ValidationMiddleware,
};
use modkit::module::{LifecycleHook, Module, ModuleCore, ModuleExt};
use modkit::persist::{EventQuery, FileEventStore, PersistenceManager};
use modkit::validation::{ValidationLevel, ValidationResult, Validator};
use modkit::{ModkitError, ModkitResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AccountEvent {
    Opened { account: String, initial_balance: i64 },
    Deposited { account: String, amount: i64 },
    Withdrawn { account: String, amount: i64 },
}

impl AccountEvent {
    fn name(&self) -> &'static str {
        match self {
            AccountEvent::Opened { .. } => "account.opened",
            AccountEvent::Deposited { .. } => "account.deposited",
            AccountEvent::Withdrawn { .. } => "account.withdrawn",
        }
    }

    fn amount(&self) -> i64 {
        match self {
            AccountEvent::Opened {
                initial_balance, ..
            } => *initial_balance,
            AccountEvent::Deposited { amount, .. } | AccountEvent::Withdrawn { amount, .. } => {
                *amount
            }
        }
    }
}

/// 余额投影：作为模块持有读模型
struct Ledger {
    core: ModuleCore,
    balances: Mutex<HashMap<String, i64>>,
}

impl Ledger {
    fn new() -> ModkitResult<Self> {
        Ok(Self {
            core: ModuleCore::named("ledger")?,
            balances: Mutex::new(HashMap::new()),
        })
    }

    fn apply(&self, event: &AccountEvent) -> ModkitResult<()> {
        self.core.ensure_initialized()?;
        let mut balances = self
            .balances
            .lock()
            .map_err(|_| ModkitError::module("ledger", "balances lock poisoned"))?;
        match event {
            AccountEvent::Opened {
                account,
                initial_balance,
            } => {
                balances.insert(account.clone(), *initial_balance);
            }
            AccountEvent::Deposited { account, amount } => {
                *balances.entry(account.clone()).or_default() += amount;
            }
            AccountEvent::Withdrawn { account, amount } => {
                *balances.entry(account.clone()).or_default() -= amount;
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> HashMap<String, i64> {
        self.balances
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Module for Ledger {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    async fn teardown(&self) -> ModkitResult<()> {
        info!(accounts = self.snapshot().len(), "ledger closed");
        Ok(())
    }
}

struct LedgerProjector {
    ledger: Arc<Ledger>,
}

#[async_trait]
impl EventHandler<AccountEvent> for LedgerProjector {
    fn handler_name(&self) -> &str {
        "ledger-projector"
    }

    async fn handle(&self, event: &Event<AccountEvent>) -> anyhow::Result<()> {
        self.ledger.apply(event.payload())?;
        Ok(())
    }
}

struct LargeWithdrawalAlert;

#[async_trait]
impl EventHandler<AccountEvent> for LargeWithdrawalAlert {
    fn handler_name(&self) -> &str {
        "large-withdrawal-alert"
    }

    async fn handle(&self, event: &Event<AccountEvent>) -> anyhow::Result<()> {
        warn!(
            correlation_id = %event.metadata().correlation_id(),
            amount = event.payload().amount(),
            "large withdrawal"
        );
        Ok(())
    }
}

struct Announce;

#[async_trait]
impl LifecycleHook for Announce {
    fn hook_name(&self) -> &'static str {
        "announce"
    }

    async fn after_setup(&self, module: &str) -> ModkitResult<()> {
        info!(module, "module ready");
        Ok(())
    }

    async fn before_cleanup(&self, module: &str) -> ModkitResult<()> {
        info!(module, "module stopping");
        Ok(())
    }
}

fn load_config() -> anyhow::Result<EventConfig> {
    match std::env::var("MODKIT_EVENT_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)?;
            let config = EventConfig::from_json_str(&raw)?;
            info!(%path, "event config loaded");
            Ok(config)
        }
        Err(_) => Ok(EventConfig::builder()
            .max_queue_size(64)
            .batch_size(8)
            .batch_timeout(Duration::from_millis(50))
            .build()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let store_path = std::env::temp_dir()
        .join("modkit-demo")
        .join("account-events.jsonl");

    let ledger = Arc::new(Ledger::new()?);
    let store = Arc::new(FileEventStore::<AccountEvent>::new(&store_path));
    let persistence: Arc<PersistenceManager<AccountEvent>> =
        Arc::new(PersistenceManager::new("account-store", store, true)?);

    let manager: EventManager<AccountEvent> = EventManager::new("accounts", config)?;
    manager.core().add_hook(Arc::new(Announce));
    manager.add_dependency("ledger", ledger.clone(), false, false)?;
    manager.with_persistence(persistence)?;

    let positive_amounts: Arc<dyn Validator<Event<AccountEvent>>> =
        Arc::new(|event: &Event<AccountEvent>| {
            if event.payload().amount() < 0 {
                ValidationResult::invalid(ValidationLevel::Critical, "amount must not be negative")
            } else {
                ValidationResult::ok()
            }
        });
    manager.add_middleware(Arc::new(ValidationMiddleware::new(positive_amounts)));
    manager.add_middleware(Arc::new(LoggingMiddleware::new(Level::DEBUG)));

    let projector: Arc<dyn EventHandler<AccountEvent>> = Arc::new(LedgerProjector {
        ledger: ledger.clone(),
    });
    for name in ["account.opened", "account.deposited", "account.withdrawn"] {
        manager.subscribe(name, projector.clone(), EventPriority::High, None, None)?;
    }
    let large_only: EventFilter<AccountEvent> =
        Arc::new(|event: &Event<AccountEvent>| event.payload().amount() >= 500);
    manager.subscribe(
        "account.withdrawn",
        Arc::new(LargeWithdrawalAlert),
        EventPriority::Low,
        Some(large_only),
        None,
    )?;

    let mut failures = manager.failures();
    tokio::spawn(async move {
        while let Ok(failure) = failures.recv().await {
            warn!(event = %failure.event_name, stage = ?failure.stage, message = %failure.message, "pipeline failure");
        }
    });

    manager.initialize().await?;

    let commands = vec![
        AccountEvent::Opened {
            account: "alice".into(),
            initial_balance: 1_000,
        },
        AccountEvent::Deposited {
            account: "alice".into(),
            amount: 250,
        },
        AccountEvent::Withdrawn {
            account: "alice".into(),
            amount: 700,
        },
        AccountEvent::Deposited {
            account: "alice".into(),
            amount: -5,
        },
    ];
    for payload in commands {
        let event = Event::new(payload.name(), payload)?.with_source("demo");
        if let Err(err) = manager.emit(event) {
            warn!(error = %err, "emit rejected");
        }
    }

    tokio::time::sleep(Duration::from_millis(300)).await;
    info!(balances = ?ledger.snapshot(), "ledger state");

    let replayed = manager
        .replay(
            &EventQuery::builder().event_name("account.withdrawn").build(),
            Some(Arc::new(LargeWithdrawalAlert)),
        )
        .await?;
    info!(replayed, "withdrawals replayed from store");

    println!("{}", serde_json::to_string_pretty(&manager.stats())?);

    manager.cleanup().await?;
    Ok(())
}
