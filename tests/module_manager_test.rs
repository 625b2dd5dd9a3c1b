//! Module manager integration tests
//! Run with: cargo test --test module_manager_test

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, Once};
use std::thread;
use std::time::Duration;

use serde_json::json;

use brunobot::application::errors::{ApiError, ModuleError, RecentDataError};
use brunobot::domain::entities::{keywords, CommandEntry, Message};
use brunobot::domain::traits::{Connection, EventSource, Listener};
use brunobot::infrastructure::adapters::MemoryConnection;
use brunobot::infrastructure::config::Config;
use brunobot::infrastructure::plugins::{BuiltinLoader, LoadedModule, ModuleLoader, ModuleSource};
use brunobot::plugins::{core_keys, ExtensionModule, Lifecycle, ModuleApi, ModuleManager};

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Module whose declarations are set per test
#[derive(Clone, Default)]
struct Stub {
    name: &'static str,
    listen: Vec<&'static str>,
    require: Vec<&'static str>,
    commands: Vec<&'static str>,
    listener_on: Option<&'static str>,
    duplicate_export: bool,
}

impl Stub {
    fn named(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn listening_to(mut self, keyword: &'static str) -> Self {
        self.listen.push(keyword);
        self
    }

    fn requiring(mut self, key: &'static str) -> Self {
        self.require.push(key);
        self
    }

    fn with_command(mut self, cmd: &'static str) -> Self {
        self.commands.push(cmd);
        self
    }
}

impl ExtensionModule for Stub {
    fn name(&self) -> &str {
        self.name
    }

    fn listen(&self) -> Vec<String> {
        self.listen.iter().map(|s| s.to_string()).collect()
    }

    fn require(&self) -> Vec<String> {
        self.require.iter().map(|s| s.to_string()).collect()
    }

    fn commands(&self) -> Vec<CommandEntry> {
        self.commands
            .iter()
            .map(|cmd| CommandEntry::new(*cmd, |_, _| Ok(())))
            .collect()
    }

    fn expose(&self, api: &mut ModuleApi) -> Result<(), ApiError> {
        if let Some(event) = self.listener_on {
            let listener: Listener = Arc::new(|_: &Message| {});
            api.add_listener(event, listener);
        }
        api.exports().constant("owner", self.name)?;
        if self.duplicate_export {
            api.exports().constant("owner", "again")?;
        }
        Ok(())
    }
}

fn stub_loader(stubs: Vec<Stub>) -> BuiltinLoader {
    let loader = BuiltinLoader::with_defaults();
    for stub in stubs {
        loader.register(stub.name, move || Ok(Arc::new(stub.clone()) as Arc<dyn ExtensionModule>));
    }
    loader
}

fn manager_with(loader: Arc<dyn ModuleLoader>) -> (Arc<ModuleManager>, Arc<MemoryConnection>) {
    manager_with_config(Config::default(), loader)
}

fn manager_with_config(config: Config, loader: Arc<dyn ModuleLoader>) -> (Arc<ModuleManager>, Arc<MemoryConnection>) {
    ensure_init();
    let connection = Arc::new(MemoryConnection::new());
    let manager = ModuleManager::initialize(config, connection.clone() as Arc<dyn Connection>, loader)
        .expect("core should initialize");
    (manager, connection)
}

fn names(manager: &ModuleManager, keyword: &str) -> Vec<String> {
    manager
        .listening(keyword)
        .iter()
        .map(|m| m.name().to_string())
        .collect()
}

#[tokio::test]
async fn test_core_components_present() {
    let (manager, _) = manager_with(Arc::new(BuiltinLoader::new()));

    for key in [
        core_keys::CONNECTION,
        core_keys::AUTH,
        core_keys::COMMUNICATION,
        core_keys::RECENTDATA,
        core_keys::THREADMANAGER,
        core_keys::PARSER,
        core_keys::CORECMD,
        core_keys::CFG,
        core_keys::PRESIST,
    ] {
        assert!(manager.core(key).is_some(), "missing core component {}", key);
    }
    assert!(manager.core("nonexistent").is_none());
    assert_eq!(manager.phase(), Lifecycle::Running);
    assert!(manager.modules().is_empty());
    assert!(manager.plugins().is_empty());
}

#[tokio::test]
async fn test_invalid_config_is_fatal() {
    ensure_init();
    let mut config = Config::default();
    config.bot.prefix = String::new();

    let result = ModuleManager::initialize(
        config,
        Arc::new(MemoryConnection::new()),
        Arc::new(BuiltinLoader::new()),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_recent_data_through_core() {
    let (manager, _) = manager_with(Arc::new(BuiltinLoader::new()));
    let recent = manager.recent_data().unwrap();

    recent.store("bruno", "veiset", "host", "#chan", "hello");
    let user = recent.user("bruno", "veiset", "host").unwrap();
    assert_eq!(user.last_msg().unwrap().message, "hello");

    assert_eq!(
        recent.user("ghost", "x", "y").unwrap_err(),
        RecentDataError::NotFound("ghost!x@y".to_string())
    );
}

#[tokio::test]
async fn test_listening_preserves_load_order_across_reload() {
    let loader = stub_loader(vec![
        Stub::named("a").listening_to(keywords::PRIVMSG),
        Stub::named("b").listening_to(keywords::PRIVMSG),
        Stub::named("c").listening_to(keywords::CMD),
    ]);
    let (manager, _) = manager_with(Arc::new(loader));

    for name in ["a", "b", "c"] {
        manager.load_module(name).unwrap();
    }
    assert_eq!(names(&manager, keywords::PRIVMSG), vec!["a", "b"]);

    let before = manager.extra("a").unwrap();
    manager.reload("a").unwrap();
    let after = manager.extra("a").unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(names(&manager, keywords::PRIVMSG), vec!["a", "b"]);
    assert_eq!(names(&manager, keywords::CMD), vec!["c"]);
}

#[tokio::test]
async fn test_listening_ignores_required_keywords() {
    let loader = stub_loader(vec![
        Stub::named("listener").listening_to(keywords::PRIVMSG),
        Stub::named("requirer").requiring(core_keys::RECENTDATA),
    ]);
    let (manager, _) = manager_with(Arc::new(loader));
    manager.load_module("listener").unwrap();
    manager.load_module("requirer").unwrap();

    assert_eq!(names(&manager, keywords::PRIVMSG), vec!["listener"]);
    assert!(names(&manager, core_keys::RECENTDATA).is_empty());

    let requirer = manager.extra("requirer").unwrap();
    assert!(manager.requires(&requirer, core_keys::RECENTDATA));
    assert!(!manager.requires("requirer", core_keys::RECENTDATA));
    assert!(manager.is_listening("listener", keywords::PRIVMSG));
    assert!(!manager.is_listening("nonexistent", keywords::PRIVMSG));
    assert!(!manager.is_cmd("listener"));
}

#[tokio::test]
async fn test_reload_unknown_module_fails() {
    let (manager, _) = manager_with(Arc::new(BuiltinLoader::with_defaults()));

    assert!(matches!(manager.reload("ghost"), Err(ModuleError::NotLoaded(_))));
    assert!(manager.extra("ghost").is_none());
    assert!(manager.modules().is_empty());
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_entry() {
    let broken = Arc::new(AtomicBool::new(false));
    let flag = broken.clone();
    let loader = BuiltinLoader::new().with_module("flaky", move || {
        if flag.load(Ordering::SeqCst) {
            return Err(ModuleError::load_failed("flaky", "syntax error"));
        }
        Ok(Arc::new(Stub::named("flaky").with_command("flake")) as Arc<dyn ExtensionModule>)
    });
    let (manager, _) = manager_with(Arc::new(loader));

    manager.load_module("flaky").unwrap();
    let before = manager.extra("flaky").unwrap();

    broken.store(true, Ordering::SeqCst);
    let err = manager.reload("flaky").unwrap_err();
    assert!(matches!(err, ModuleError::LoadFailed { .. }));

    let after = manager.extra("flaky").unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(manager.modules().len(), 1);
}

#[tokio::test]
async fn test_missing_requirement_is_rejected() {
    let loader = stub_loader(vec![Stub::named("needy").requiring("database")]);
    let (manager, _) = manager_with(Arc::new(loader));

    let err = manager.load_module("needy").unwrap_err();
    assert!(matches!(
        err,
        ModuleError::MissingRequirement { ref requirement, .. } if requirement == "database"
    ));
    assert!(manager.extra("needy").is_none());
}

#[tokio::test]
async fn test_duplicate_export_fails_load_without_leaking_listeners() {
    let mut stub = Stub::named("dup").listening_to(keywords::PRIVMSG);
    stub.listener_on = Some(keywords::PRIVMSG);
    stub.duplicate_export = true;
    let (manager, connection) = manager_with(Arc::new(stub_loader(vec![stub])));

    let err = manager.load_module("dup").unwrap_err();
    assert!(matches!(err, ModuleError::Api(ApiError::DuplicateName(_))));
    assert_eq!(connection.bus().listener_count(keywords::PRIVMSG), 0);
    assert!(manager.extra("dup").is_none());
}

#[tokio::test]
async fn test_listeners_follow_module_lifecycle() {
    let mut stub = Stub::named("watcher").listening_to(keywords::PRIVMSG);
    stub.listener_on = Some(keywords::PRIVMSG);
    let (manager, connection) = manager_with(Arc::new(stub_loader(vec![stub])));
    let bus = connection.bus();

    manager.load_module("watcher").unwrap();
    assert_eq!(bus.listener_count(keywords::PRIVMSG), 1);
    assert_eq!(manager.extra("watcher").unwrap().listener_count(), 1);

    manager.reload("watcher").unwrap();
    assert_eq!(bus.listener_count(keywords::PRIVMSG), 1);

    manager.unload_module("watcher").unwrap();
    assert_eq!(bus.listener_count(keywords::PRIVMSG), 0);
    assert!(manager.extra("watcher").is_none());
}

#[tokio::test]
async fn test_commands_only_from_cmd_listeners() {
    let loader = stub_loader(vec![
        Stub::named("talker").listening_to(keywords::CMD).with_command("talk"),
        Stub::named("silent").with_command("hush"),
    ]);
    let (manager, _) = manager_with(Arc::new(loader));
    manager.load_module("talker").unwrap();
    manager.load_module("silent").unwrap();

    assert_eq!(manager.command("talk").unwrap().owner.as_deref(), Some("talker"));
    assert!(manager.command("hush").is_none());

    manager.unload_module("talker").unwrap();
    assert!(manager.command("talk").is_none());
    assert!(manager.command("help").is_some());
}

#[tokio::test]
async fn test_command_keyword_last_writer_wins() {
    let loader = stub_loader(vec![
        Stub::named("first").listening_to(keywords::CMD).with_command("dup"),
        Stub::named("second").listening_to(keywords::CMD).with_command("dup"),
    ]);
    let (manager, _) = manager_with(Arc::new(loader));
    manager.load_module("first").unwrap();
    manager.load_module("second").unwrap();

    assert_eq!(manager.command("dup").unwrap().owner.as_deref(), Some("second"));
}

#[tokio::test]
async fn test_typofixer_capabilities() {
    let (manager, _) = manager_with(Arc::new(BuiltinLoader::with_defaults()));
    manager.load_module("typofixer").unwrap();

    let caps = manager.capabilities("typofixer").unwrap();
    assert_eq!(caps.names(), vec!["fix", "pattern"]);
    assert_eq!(
        caps.call("fix", &[json!("teh cat"), json!("teh"), json!("the")]).unwrap(),
        json!("the cat")
    );
    assert!(matches!(caps.call("pattern", &[]), Err(ApiError::NotAFunction(_))));
    assert!(matches!(caps.call("missing", &[]), Err(ApiError::UnknownCapability(_))));
    assert!(matches!(
        caps.call("fix", &[json!("only one")]),
        Err(ApiError::ArgumentCount { expected: 3, got: 1, .. })
    ));

    assert!(manager.capabilities("nonexistent").is_none());
}

#[tokio::test]
async fn test_double_shutdown_is_an_error() {
    let (manager, connection) = manager_with(Arc::new(BuiltinLoader::with_defaults()));
    manager.load_module("seen").unwrap();

    manager.shutdown(Some("bye")).unwrap();
    assert_eq!(manager.phase(), Lifecycle::Stopped);
    assert!(!manager.enabled());
    assert!(connection.is_closed());
    assert_eq!(connection.quit_message().as_deref(), Some("bye"));
    assert!(manager.modules().is_empty());

    assert!(manager.shutdown(None).is_err());
    assert!(manager.load_module("seen").is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_configured_runs_every_entry() {
    let mut config = Config::default();
    config.modules.autoload = vec!["typofixer".into(), "seen".into(), "nonexistent".into()];
    let (manager, _) = manager_with_config(config, Arc::new(BuiltinLoader::with_defaults()));

    let mut failures = 0;
    for handle in manager.load_configured() {
        if handle.await.unwrap().is_err() {
            failures += 1;
        }
    }
    assert_eq!(failures, 1);
    assert!(manager.extra("typofixer").is_some());
    assert!(manager.extra("seen").is_some());
}

/// Loader that records how many loads of the same name overlap
struct Counting {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ModuleLoader for Counting {
    fn load(&self, name: &str) -> Result<LoadedModule, ModuleError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let name: &'static str = if name == "slow" { "slow" } else { "other" };
        Ok(LoadedModule {
            module: Arc::new(Stub::named(name)),
            source: ModuleSource::Builtin,
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_same_name_loads_are_serialized() {
    let loader = Arc::new(Counting {
        in_flight: AtomicUsize::new(0),
        max_in_flight: AtomicUsize::new(0),
    });
    let (manager, _) = manager_with(loader.clone());

    thread::scope(|scope| {
        for _ in 0..4 {
            let manager = manager.clone();
            scope.spawn(move || manager.load_module("slow").unwrap());
        }
    });

    assert_eq!(loader.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(manager.modules().len(), 1);
}

#[tokio::test]
async fn test_persist_survives_reload() {
    let (manager, _) = manager_with(Arc::new(BuiltinLoader::with_defaults()));
    manager.load_module("seen").unwrap();

    let persist = manager.persist().unwrap();
    assert!(persist.set("seen.greeting", json!("hi")).is_none());
    manager.reload("seen").unwrap();

    assert_eq!(manager.persist().unwrap().get("seen.greeting"), Some(json!("hi")));
    assert_eq!(persist.remove("seen.greeting"), Some(json!("hi")));
    assert!(persist.is_empty());
}

/// Loader that parks inside `load` until released
struct Gated {
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl ModuleLoader for Gated {
    fn load(&self, name: &str) -> Result<LoadedModule, ModuleError> {
        let _ = self.started.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv();

        let mut stub = Stub::named("gated").listening_to(keywords::CMD).with_command("gatedcmd");
        stub.listener_on = Some(keywords::PRIVMSG);
        assert_eq!(name, "gated");
        Ok(LoadedModule {
            module: Arc::new(stub),
            source: ModuleSource::Builtin,
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_finishing_after_shutdown_is_discarded() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let loader = Arc::new(Gated {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    });
    let (manager, connection) = manager_with(loader);

    let loading = {
        let manager = manager.clone();
        thread::spawn(move || manager.load_module("gated"))
    };
    started_rx.recv().unwrap();

    manager.shutdown(None).unwrap();
    release_tx.send(()).unwrap();
    let result = loading.join().unwrap();

    assert!(result.is_err());
    assert_eq!(manager.phase(), Lifecycle::Stopped);
    assert!(manager.modules().is_empty());
    assert!(manager.command("gatedcmd").is_none());
    assert_eq!(connection.bus().listener_count(keywords::PRIVMSG), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reload_swaps_command_set_in_one_step() {
    let generation = Arc::new(AtomicUsize::new(0));
    let counter = generation.clone();
    let loader = BuiltinLoader::new().with_module("shifty", move || {
        let cmd = if counter.fetch_add(1, Ordering::SeqCst) % 2 == 0 { "alpha" } else { "beta" };
        Ok(Arc::new(Stub::named("shifty").listening_to(keywords::CMD).with_command(cmd))
            as Arc<dyn ExtensionModule>)
    });
    let (manager, _) = manager_with(Arc::new(loader));
    manager.load_module("shifty").unwrap();
    assert!(manager.command("alpha").is_some());

    let done = AtomicBool::new(false);
    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..50 {
                manager.reload("shifty").unwrap();
            }
            done.store(true, Ordering::SeqCst);
        });
        scope.spawn(|| {
            while !done.load(Ordering::SeqCst) {
                let owned: Vec<String> = manager
                    .commands()
                    .into_iter()
                    .filter(|c| c.owner.as_deref() == Some("shifty"))
                    .map(|c| c.cmd)
                    .collect();
                assert_eq!(owned.len(), 1, "saw {:?}", owned);
            }
        });
    });

    // 51 constructions: the last one is even-indexed
    assert!(manager.command("alpha").is_some());
    assert!(manager.command("beta").is_none());
    assert_eq!(manager.modules().len(), 1);
}
