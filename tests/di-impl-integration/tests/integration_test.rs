//! 平台与 Bean 容器端到端测试
use di_abstractions::{BeanContainer, BeanSpec};
use infrastructure_common::{DependencyError, InfrastructureError, PlatformState};
use infrastructure_platform::{Platform, PlatformBuilder, PlatformConfig, PlatformEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Once};
use std::thread;
use std::time::Duration;

static INIT_LOGGER: Once = Once::new();

/// 初始化测试日志系统（只初始化一次）
fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .try_init()
            .ok(); // 忽略初始化失败的错误
    });
}

trait Greeting: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct DefaultGreeting;

impl Greeting for DefaultGreeting {
    fn greet(&self, name: &str) -> String {
        format!("Hello {name}")
    }
}

struct FriendlyGreeting;

impl Greeting for FriendlyGreeting {
    fn greet(&self, name: &str) -> String {
        format!("Hi {name}, welcome back!")
    }
}

struct AuditLog {
    entries: Mutex<Vec<String>>,
}

struct Greeter {
    greeting: Arc<dyn Greeting>,
    audit: Arc<AuditLog>,
}

impl Greeter {
    fn welcome(&self, name: &str) -> String {
        let message = self.greeting.greet(name);
        self.audit.entries.lock().push(message.clone());
        message
    }
}

/// 在准备阶段注册默认 Bean 的"库"
fn library_defaults(constructions: Arc<AtomicUsize>) -> impl Fn(&PlatformEvent, &Platform) -> anyhow::Result<()> {
    move |event: &PlatformEvent, platform: &Platform| -> anyhow::Result<()> {
        if event.state != PlatformState::Preparing {
            return Ok(());
        }
        let beans = platform.beans();
        beans.register(
            BeanSpec::new(|_ctx| Ok(DefaultGreeting))
                .singleton()
                .exposes::<dyn Greeting, _>(|bean| bean as Arc<dyn Greeting>),
        )?;
        beans.register(
            BeanSpec::new(|_ctx| {
                Ok(AuditLog {
                    entries: Mutex::new(Vec::new()),
                })
            })
            .singleton()
            .create_immediately()
            .pre_destroy("flush", |log: &AuditLog| {
                log.entries.lock().clear();
                Ok(())
            }),
        )?;

        let counter = Arc::clone(&constructions);
        beans.register(
            BeanSpec::new(move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                Ok(Greeter {
                    greeting: ctx.get::<dyn Greeting>()?,
                    audit: ctx.get::<AuditLog>()?,
                })
            })
            .singleton(),
        )?;
        Ok(())
    }
}

#[test]
fn test_application_replaces_library_default_and_shares_singletons() {
    init_test_logger();
    let constructions = Arc::new(AtomicUsize::new(0));
    let platform = Arc::new(
        PlatformBuilder::new()
            .with_config(PlatformConfig::default())
            .with_listener(library_defaults(Arc::clone(&constructions)))
            .build()
            .unwrap(),
    );

    // 应用在默认 Bean 注册之前就声明替换
    platform
        .beans()
        .register(
            BeanSpec::new(|_ctx| Ok(FriendlyGreeting))
                .singleton()
                .overrides::<DefaultGreeting>()
                .exposes::<dyn Greeting, _>(|bean| bean as Arc<dyn Greeting>),
        )
        .unwrap();

    platform.start().unwrap();
    platform.await_started(Duration::from_secs(1)).unwrap();

    const THREADS: usize = 8;
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let platform = Arc::clone(&platform);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                platform.beans().get::<Greeter>().unwrap()
            })
        })
        .collect();
    let greeters: Vec<Arc<Greeter>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert!(greeters.iter().all(|g| Arc::ptr_eq(g, &greeters[0])));
    assert_eq!(greeters[0].welcome("Ada"), "Hi Ada, welcome back!");

    let greetings = platform.beans().all::<dyn Greeting>().unwrap();
    assert_eq!(greetings.len(), 1);
    assert_eq!(platform.beans().validate().warnings.len(), 0);

    let audit = platform.beans().get::<AuditLog>().unwrap();
    assert_eq!(audit.entries.lock().len(), 1);

    let report = platform.stop().unwrap();
    assert!(report.is_clean());
    assert_eq!(
        report.destroyed,
        vec![
            "Greeter".to_string(),
            "FriendlyGreeting".to_string(),
            "AuditLog".to_string()
        ]
    );
    assert!(audit.entries.lock().is_empty());

    assert!(matches!(
        platform.beans().get::<Greeter>().map(|_| ()),
        Err(DependencyError::ContainerShutDown)
    ));
}

trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
}

macro_rules! plugin {
    ($name:ident) => {
        struct $name;

        impl Plugin for $name {
            fn id(&self) -> &'static str {
                stringify!($name)
            }
        }
    };
}

plugin!(OrigBean);
plugin!(ReplacingBean);
plugin!(OtherReplacingBean);

fn plugin_spec<T: Plugin + 'static>(build: fn() -> T) -> BeanSpec<T> {
    BeanSpec::new(move |_ctx| Ok(build()))
        .singleton()
        .exposes::<dyn Plugin, _>(|bean| bean as Arc<dyn Plugin>)
}

#[tokio::test]
async fn test_replacements_resolve_by_rank_after_async_start() {
    init_test_logger();
    let platform = Arc::new(Platform::new(PlatformConfig::default()));
    let beans = platform.beans();

    beans.register(plugin_spec(|| OrigBean).rank(11)).unwrap();
    beans
        .register(plugin_spec(|| ReplacingBean).overrides::<OrigBean>())
        .unwrap();
    assert_eq!(beans.get::<dyn Plugin>().unwrap().id(), "ReplacingBean");

    beans
        .register(
            plugin_spec(|| OtherReplacingBean)
                .overrides::<OrigBean>()
                .rank(15),
        )
        .unwrap();

    let starter = Arc::clone(&platform);
    let handle = thread::spawn(move || starter.start());
    tokio::time::timeout(Duration::from_secs(5), platform.wait_started())
        .await
        .expect("等待启动不应超时")
        .unwrap();
    handle.join().unwrap().unwrap();

    let beans = platform.beans();
    // 继承的排序值 11 小于 15，优先
    assert_eq!(beans.get::<dyn Plugin>().unwrap().id(), "ReplacingBean");
    let ids: Vec<&str> = beans
        .all::<dyn Plugin>()
        .unwrap()
        .iter()
        .map(|p| p.id())
        .collect();
    assert_eq!(ids, vec!["ReplacingBean", "OtherReplacingBean"]);

    let ranks: Vec<i32> = beans
        .descriptors::<dyn Plugin>()
        .unwrap()
        .iter()
        .map(|bean| bean.rank)
        .collect();
    assert_eq!(ranks, vec![11, 15]);

    platform.stop().unwrap();
    assert_eq!(platform.state(), PlatformState::Stopped);
}

struct Left {
    _right: Arc<Right>,
}

struct Right {
    _left: Arc<Left>,
}

#[test]
fn test_eager_cycle_fails_start_with_circular_dependency() {
    init_test_logger();
    let platform = PlatformBuilder::new()
        .with_config(PlatformConfig::default())
        .build()
        .unwrap();
    let beans = platform.beans();
    beans
        .register(
            BeanSpec::new(|ctx| {
                Ok(Left {
                    _right: ctx.get::<Right>()?,
                })
            })
            .singleton()
            .create_immediately(),
        )
        .unwrap();
    beans
        .register(
            BeanSpec::new(|ctx| {
                Ok(Right {
                    _left: ctx.get::<Left>()?,
                })
            })
            .singleton(),
        )
        .unwrap();

    match platform.start() {
        Err(InfrastructureError::DependencyError { source }) => {
            assert!(source.is_circular_dependency());
        }
        other => panic!("期望循环依赖导致启动失败, 实际: {:?}", other),
    }
    assert_eq!(platform.state(), PlatformState::Stopped);
    assert!(platform.await_started(Duration::from_millis(10)).is_err());
}
