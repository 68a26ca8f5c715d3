//! 字段注入、生命周期钩子与容器关闭测试
use di_abstractions::{BeanContainer, BeanSpec, LifecycleHooks};
use di_impl::BeanManager;
use infrastructure_common::{ContainerConfig, DependencyError, LifecycleError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

type Journal = Arc<Mutex<Vec<String>>>;

fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(journal: &Journal, entry: &str) {
    journal.lock().push(entry.to_string());
}

struct Connection {
    journal: Journal,
}

fn connection_hooks() -> LifecycleHooks<Connection> {
    LifecycleHooks::new()
        .post_construct("init", |c: &Connection| {
            record(&c.journal, "Connection.init");
            Ok(())
        })
        .pre_destroy("close", |c: &Connection| {
            record(&c.journal, "Connection.close");
            Ok(())
        })
}

struct PooledConnection {
    connection: Connection,
}

fn pooled_spec(journal: &Journal) -> BeanSpec<PooledConnection> {
    let journal = Arc::clone(journal);
    BeanSpec::new(move |_ctx| {
        Ok(PooledConnection {
            connection: Connection {
                journal: Arc::clone(&journal),
            },
        })
    })
    .singleton()
    .post_construct("init", |p: &PooledConnection| {
        record(&p.connection.journal, "PooledConnection.init");
        Ok(())
    })
    .post_construct("warmup", |p: &PooledConnection| {
        record(&p.connection.journal, "PooledConnection.warmup");
        Ok(())
    })
    .pre_destroy("release", |p: &PooledConnection| {
        record(&p.connection.journal, "PooledConnection.release");
        Ok(())
    })
    .inherit_hooks(&connection_hooks(), |p: &PooledConnection| &p.connection)
}

#[test]
fn test_hooks_run_base_before_subtype() {
    let log = journal();
    let manager = BeanManager::new();
    manager.register(pooled_spec(&log)).unwrap();

    manager.get::<PooledConnection>().unwrap();
    manager.get::<PooledConnection>().unwrap();
    assert_eq!(
        *log.lock(),
        vec!["Connection.init", "PooledConnection.init", "PooledConnection.warmup"]
    );

    log.lock().clear();
    let report = manager.shutdown();
    assert!(report.is_clean());
    assert_eq!(report.destroyed, vec!["PooledConnection".to_string()]);
    assert_eq!(*log.lock(), vec!["Connection.close", "PooledConnection.release"]);
}

#[test]
fn test_untouched_singleton_gets_no_predestroy() {
    let log = journal();
    let manager = BeanManager::new();
    manager.register(pooled_spec(&log)).unwrap();

    let report = manager.shutdown();
    assert!(report.destroyed.is_empty());
    assert!(log.lock().is_empty());
}

#[test]
fn test_shutdown_is_idempotent() {
    let log = journal();
    let manager = BeanManager::new();
    manager.register(pooled_spec(&log)).unwrap();
    manager.get::<PooledConnection>().unwrap();

    assert_eq!(manager.shutdown().destroyed.len(), 1);
    assert!(manager.shutdown().destroyed.is_empty());
    assert_eq!(
        log.lock()
            .iter()
            .filter(|entry| entry.ends_with("close"))
            .count(),
        1
    );
}

struct Cache {
    journal: Journal,
}

struct Repository {
    _cache: Arc<Cache>,
    journal: Journal,
}

#[test]
fn test_shutdown_runs_in_reverse_creation_order_and_survives_failures() {
    let log = journal();
    let manager = BeanManager::new();

    let cache_log = Arc::clone(&log);
    manager
        .register(
            BeanSpec::new(move |_ctx| {
                Ok(Cache {
                    journal: Arc::clone(&cache_log),
                })
            })
            .singleton()
            .pre_destroy("flush", |c: &Cache| {
                record(&c.journal, "Cache.flush");
                anyhow::bail!("磁盘已满")
            })
            .pre_destroy("evict", |c: &Cache| {
                record(&c.journal, "Cache.evict");
                Ok(())
            }),
        )
        .unwrap();

    let repo_log = Arc::clone(&log);
    manager
        .register(
            BeanSpec::new(move |ctx| {
                Ok(Repository {
                    _cache: ctx.get::<Cache>()?,
                    journal: Arc::clone(&repo_log),
                })
            })
            .singleton()
            .pre_destroy("close", |r: &Repository| {
                record(&r.journal, "Repository.close");
                Ok(())
            }),
        )
        .unwrap();

    manager.get::<Repository>().unwrap();
    let report = manager.shutdown();

    assert_eq!(report.destroyed, vec!["Repository".to_string(), "Cache".to_string()]);
    assert_eq!(*log.lock(), vec!["Repository.close", "Cache.flush", "Cache.evict"]);
    assert_eq!(report.failures.len(), 1);
    match &report.failures[0] {
        LifecycleError::PreDestroyFailed { bean, hook, message } => {
            assert_eq!(bean, "Cache");
            assert!(hook.ends_with("::flush"));
            assert!(message.contains("磁盘已满"));
        }
        other => panic!("期望 predestroy 失败, 实际: {:?}", other),
    }
}

#[test]
fn test_prebuilt_transient_and_unregistered_beans_are_not_destroyed() {
    let destroyed = Arc::new(AtomicUsize::new(0));
    let manager = BeanManager::new();

    let counter = Arc::clone(&destroyed);
    manager
        .register(
            BeanSpec::instance(Arc::new(Cache { journal: journal() })).pre_destroy("flush", move |_c: &Cache| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();

    let counter = Arc::clone(&destroyed);
    manager
        .register(
            BeanSpec::new(|_ctx| Ok(Connection { journal: journal() }))
                .transient()
                .pre_destroy("close", move |_c: &Connection| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
        .unwrap();

    let log = journal();
    let handle = manager.register(pooled_spec(&log)).unwrap();

    manager.get::<Cache>().unwrap();
    manager.get::<Connection>().unwrap();
    manager.get::<PooledConnection>().unwrap();
    manager.unregister(&handle).unwrap();

    let report = manager.shutdown();
    assert!(report.destroyed.is_empty());
    assert_eq!(destroyed.load(Ordering::SeqCst), 0);
    assert!(!log.lock().iter().any(|entry| entry.ends_with("close")));
}

struct Warehouse {
    journal: Journal,
}

fn warehouse_spec(journal: &Journal, entered: &Arc<Barrier>, build_time: Duration) -> BeanSpec<Warehouse> {
    let journal = Arc::clone(journal);
    let entered = Arc::clone(entered);
    BeanSpec::new(move |_ctx| {
        entered.wait();
        thread::sleep(build_time);
        Ok(Warehouse {
            journal: Arc::clone(&journal),
        })
    })
    .singleton()
    .pre_destroy("close", |w: &Warehouse| {
        record(&w.journal, "Warehouse.close");
        Ok(())
    })
}

#[test]
fn test_shutdown_tears_down_singleton_finishing_creation() {
    let log = journal();
    let entered = Arc::new(Barrier::new(2));
    let manager = Arc::new(BeanManager::new());
    manager
        .register(warehouse_spec(&log, &entered, Duration::from_millis(100)))
        .unwrap();

    let creator = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.get::<Warehouse>().map(|_| ()))
    };

    entered.wait();
    let report = manager.shutdown();

    assert!(creator.join().unwrap().is_ok());
    assert_eq!(report.destroyed, vec!["Warehouse".to_string()]);
    assert_eq!(*log.lock(), vec!["Warehouse.close"]);
}

#[test]
fn test_creation_outliving_shutdown_is_not_published() {
    let log = journal();
    let entered = Arc::new(Barrier::new(2));
    let manager = Arc::new(BeanManager::with_config(
        ContainerConfig::default().with_creation_timeout(Duration::from_millis(20)),
    ));
    manager
        .register(warehouse_spec(&log, &entered, Duration::from_millis(300)))
        .unwrap();

    let creator = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.get::<Warehouse>().map(|_| ()))
    };

    entered.wait();
    let report = manager.shutdown();
    assert!(report.destroyed.is_empty());

    assert!(matches!(
        creator.join().unwrap(),
        Err(DependencyError::ContainerShutDown)
    ));
    assert!(log.lock().is_empty());
}

trait Formatter: Send + Sync {
    fn format(&self, value: &str) -> String;
}

struct Upper;

impl Formatter for Upper {
    fn format(&self, value: &str) -> String {
        value.to_uppercase()
    }
}

struct Quoted;

impl Formatter for Quoted {
    fn format(&self, value: &str) -> String {
        format!("\"{value}\"")
    }
}

trait Auditor: Send + Sync {}

#[derive(Default)]
struct Printer {
    primary: Option<Arc<dyn Formatter>>,
    all: Vec<Arc<dyn Formatter>>,
    auditor: Option<Arc<dyn Auditor>>,
}

#[test]
fn test_field_injection_resolves_single_optional_and_collections() {
    let manager = BeanManager::new();
    manager
        .register(
            BeanSpec::new(|_ctx| Ok(Upper))
                .singleton()
                .rank(1)
                .exposes::<dyn Formatter, _>(|bean| bean as Arc<dyn Formatter>),
        )
        .unwrap();
    manager
        .register(
            BeanSpec::new(|_ctx| Ok(Quoted))
                .singleton()
                .rank(2)
                .exposes::<dyn Formatter, _>(|bean| bean as Arc<dyn Formatter>),
        )
        .unwrap();

    let post_constructed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&post_constructed);
    manager
        .register(
            BeanSpec::<Printer>::default_constructed()
                .inject_one::<dyn Formatter, _>("primary", |p, f| p.primary = Some(f))
                .inject_all::<dyn Formatter, _>("all", |p, fs| p.all = fs)
                .inject_opt::<dyn Auditor, _>("auditor", |p, a| p.auditor = a)
                .post_construct("check", move |p: &Printer| {
                    anyhow::ensure!(p.primary.is_some(), "primary 未注入");
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
        .unwrap();

    let printer = manager.get::<Printer>().unwrap();
    let primary = printer.primary.as_ref().unwrap();
    assert_eq!(primary.format("x"), "X");
    let formatted: Vec<String> = printer.all.iter().map(|f| f.format("x")).collect();
    assert_eq!(formatted, vec!["X".to_string(), "\"x\"".to_string()]);
    assert!(printer.auditor.is_none());
    assert_eq!(post_constructed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_field_injection_names_the_field() {
    let manager = BeanManager::new();
    manager
        .register(
            BeanSpec::<Printer>::default_constructed()
                .inject_one::<dyn Formatter, _>("primary", |p, f| p.primary = Some(f)),
        )
        .unwrap();

    let error = manager.get::<Printer>().map(|_| ()).unwrap_err();
    assert!(error.to_string().contains("primary"));
    let not_found = error
        .chain()
        .filter_map(|e| e.downcast_ref::<infrastructure_common::DependencyError>())
        .any(|e| e.is_resolution_error());
    assert!(not_found);
}

#[test]
fn test_eager_singletons_are_created_unless_shadowed() {
    let created = Arc::new(Mutex::new(Vec::new()));
    let manager = BeanManager::new();

    let log = Arc::clone(&created);
    manager
        .register(
            BeanSpec::new(move |_ctx| {
                log.lock().push("Upper");
                Ok(Upper)
            })
            .singleton()
            .create_immediately(),
        )
        .unwrap();
    let log = Arc::clone(&created);
    manager
        .register(
            BeanSpec::new(move |_ctx| {
                log.lock().push("Quoted");
                Ok(Quoted)
            })
            .singleton()
            .create_immediately()
            .overrides::<Upper>(),
        )
        .unwrap();

    assert_eq!(manager.validate().warnings.len(), 1);
    assert_eq!(manager.instantiate_eager().unwrap(), 1);
    assert_eq!(*created.lock(), vec!["Quoted"]);
}
