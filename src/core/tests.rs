use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::sleep;

use crate::{
    Config, Event, EventKind, GeneratorSpec, InlineRunner, LifecycleState, LoadShape, LoadVisor,
    RegistryError, RuntimeError, Subscribe, Target,
};

fn visor() -> Arc<LoadVisor> {
    LoadVisor::builder(Config::default()).build()
}

/// Spec whose task bumps `hits` and then sleeps for `busy`.
fn counting(name: &str, load: LoadShape, hits: &Arc<AtomicUsize>, busy: Duration) -> GeneratorSpec {
    let hits = Arc::clone(hits);
    GeneratorSpec::builder(name, load).seed(7).build(move || {
        let hits = Arc::clone(&hits);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            sleep(busy).await;
            Ok(())
        }
    })
}

/// Spec whose task tracks the current and peak number of running instances.
fn tracking(
    name: &str,
    load: LoadShape,
    current: &Arc<AtomicUsize>,
    peak: &Arc<AtomicUsize>,
    busy: Duration,
) -> GeneratorSpec {
    let (c, p) = (Arc::clone(current), Arc::clone(peak));
    GeneratorSpec::builder(name, load).seed(3).build(move || {
        let (c, p) = (Arc::clone(&c), Arc::clone(&p));
        async move {
            let now = c.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            sleep(busy).await;
            c.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

fn idle(name: &str) -> GeneratorSpec {
    GeneratorSpec::builder(name, LoadShape::Constant(0.0)).build(|| async { Ok(()) })
}

async fn wait_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    loop {
        match rx.recv().await {
            Ok(ev) if ev.kind == kind => return ev,
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => panic!("bus closed while waiting for {kind:?}"),
        }
    }
}

fn ok(name: &str) -> (String, Result<(), RegistryError>) {
    (name.to_string(), Ok(()))
}

#[tokio::test(start_paused = true)]
async fn duplicate_add_keeps_the_original() {
    let v = visor();
    let first = GeneratorSpec::builder("g1", LoadShape::Constant(0.0))
        .max_concurrent(3)
        .build(|| async { Ok(()) });
    let second = GeneratorSpec::builder("g1", LoadShape::Constant(0.0))
        .max_concurrent(7)
        .build(|| async { Ok(()) });

    assert_eq!(v.add(first).await, Ok(()));
    assert_eq!(
        v.add(second).await,
        Err(RegistryError::Duplicated { name: "g1".into() })
    );
    assert_eq!(v.get_max_concurrent("g1").await, Ok(3));
    assert_eq!(v.list().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_names_are_reported() {
    let v = visor();
    let missing = || Err(RegistryError::NonExisting { name: "ghost".into() });

    assert_eq!(v.init("ghost").await, vec![("ghost".to_string(), missing())]);
    assert_eq!(v.pause("ghost").await, vec![("ghost".to_string(), missing())]);
    assert_eq!(v.remove("ghost").await, vec![("ghost".to_string(), missing())]);
    assert_eq!(v.set_max_concurrent("ghost", 4).await, missing());
    assert_eq!(
        v.get_max_concurrent("ghost").await,
        Err(RegistryError::NonExisting { name: "ghost".into() })
    );
    assert!(!v.is_running("ghost").await);
}

#[tokio::test(start_paused = true)]
async fn init_starts_once() {
    let v = visor();
    v.add(idle("g")).await.unwrap();
    assert!(!v.is_running("g").await);
    assert_eq!(v.list().await[0].state, LifecycleState::Uninitialized);

    assert_eq!(v.init("g").await, vec![ok("g")]);
    assert!(v.is_running("g").await);

    assert_eq!(
        v.init("g").await,
        vec![(
            "g".to_string(),
            Err(RegistryError::AlreadyStarted { name: "g".into() })
        )]
    );
    assert_eq!(v.list().await[0].state, LifecycleState::Running);
}

#[tokio::test(start_paused = true)]
async fn add_batch_reports_each_element() {
    let v = visor();
    let out = v.add_batch(vec![idle("a"), idle("a"), idle("b")]).await;
    assert_eq!(
        out,
        vec![
            ok("a"),
            (
                "a".to_string(),
                Err(RegistryError::Duplicated { name: "a".into() })
            ),
            ok("b"),
        ]
    );
    let names: Vec<String> = v.list().await.iter().map(|g| g.name.to_string()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn target_all_is_sorted_and_empty_registry_is_empty() {
    let v = visor();
    assert!(v.pause(Target::All).await.is_empty());

    v.add_batch(vec![idle("c"), idle("a"), idle("b")]).await;
    assert_eq!(v.init(Target::All).await, vec![ok("a"), ok("b"), ok("c")]);
    assert_eq!(v.pause(["c", "a"]).await, vec![ok("c"), ok("a")]);
    assert!(v.is_running("b").await);
}

#[tokio::test(start_paused = true)]
async fn pause_is_idempotent_and_remove_frees_the_name() {
    let v = visor();
    v.add(idle("g")).await.unwrap();

    // Never started: pause is a no-op.
    assert_eq!(v.pause("g").await, vec![ok("g")]);

    v.init("g").await;
    assert_eq!(v.pause("g").await, vec![ok("g")]);
    assert_eq!(v.pause("g").await, vec![ok("g")]);
    assert_eq!(v.list().await[0].state, LifecycleState::Paused);

    assert_eq!(v.remove("g").await, vec![ok("g")]);
    assert_eq!(
        v.remove("g").await,
        vec![(
            "g".to_string(),
            Err(RegistryError::NonExisting { name: "g".into() })
        )]
    );
    assert!(v.list().await.is_empty());
    assert_eq!(v.add(idle("g")).await, Ok(()));
}

#[tokio::test(start_paused = true)]
async fn ceiling_is_never_exceeded() {
    let v = visor();
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let spec = tracking(
        "capped",
        LoadShape::Constant(200.0),
        &current,
        &peak,
        Duration::from_millis(100),
    );
    v.add(spec).await.unwrap();
    v.set_max_concurrent("capped", 3).await.unwrap();
    v.init("capped").await;

    sleep(Duration::from_secs(2)).await;

    let status = &v.top().await[0];
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(status.in_flight <= 3);
    assert!(status.stats.dispatched > 0);
    assert!(status.stats.skipped > 0, "200/s against 3 slots must skip");
}

#[tokio::test(start_paused = true)]
async fn unlimited_concurrency_grows_past_any_bound() {
    let v = visor();
    let hits = Arc::new(AtomicUsize::new(0));
    let spec = counting("open", LoadShape::Constant(100.0), &hits, Duration::from_secs(30));
    v.add(spec).await.unwrap();
    v.init("open").await;

    sleep(Duration::from_secs(1)).await;

    let status = &v.top().await[0];
    assert_eq!(status.max_concurrent, 0);
    assert!(status.in_flight > 50, "in flight {}", status.in_flight);
    assert_eq!(status.stats.skipped, 0);
    assert_eq!(status.in_flight as u64, status.stats.dispatched);
}

#[tokio::test(start_paused = true)]
async fn dispatch_count_follows_rate_under_ceiling() {
    let v = visor();
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let spec = tracking(
        "g1",
        LoadShape::Constant(10.0),
        &current,
        &peak,
        Duration::from_millis(100),
    );
    v.add(spec).await.unwrap();
    v.set_max_concurrent("g1", 5).await.unwrap();
    v.init("g1").await;

    sleep(Duration::from_secs(2)).await;
    let early = v.top().await[0].stats;
    assert!((5..=45).contains(&early.dispatched), "after 2s: {early:?}");

    // 20 more windows of 2s: arrivals must average out to 10/s.
    sleep(Duration::from_secs(38)).await;
    v.pause("g1").await;

    let stats = v.top().await[0].stats;
    let arrivals = stats.dispatched + stats.skipped;
    assert!((340..=460).contains(&arrivals), "arrivals over 40s: {stats:?}");
    assert!(peak.load(Ordering::SeqCst) <= 5, "peak {}", peak.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn high_rate_dispatches_track_the_integral() {
    let v = visor();
    let hits = Arc::new(AtomicUsize::new(0));
    v.add(counting("fast", LoadShape::Constant(500.0), &hits, Duration::ZERO))
        .await
        .unwrap();
    v.init("fast").await;

    sleep(Duration::from_secs(10)).await;
    v.pause("fast").await;

    let dispatched = v.top().await[0].stats.dispatched;
    assert!(
        (4750..=5250).contains(&dispatched),
        "expected ~5000 dispatches at 500/s over 10s, got {dispatched}"
    );
}

#[tokio::test(start_paused = true)]
async fn ramp_dispatches_track_the_integral() {
    let v = visor();
    let hits = Arc::new(AtomicUsize::new(0));
    let ramp = LoadShape::Ramp {
        from: 0.0,
        to: 400.0,
        over: Duration::from_secs(10),
    };
    v.add(counting("ramp", ramp, &hits, Duration::ZERO)).await.unwrap();
    v.init("ramp").await;

    // Integral of 0 → 400/s over 10s is 2000.
    sleep(Duration::from_secs(10)).await;
    v.pause("ramp").await;

    let dispatched = v.top().await[0].stats.dispatched;
    assert!((1850..=2150).contains(&dispatched), "dispatched {dispatched}");
}

#[tokio::test(start_paused = true)]
async fn repeated_init_keeps_elapsed_and_in_flight() {
    let v = visor();
    let hits = Arc::new(AtomicUsize::new(0));
    let spec = counting("busy", LoadShape::Constant(100.0), &hits, Duration::from_secs(600));
    v.add(spec).await.unwrap();
    v.set_max_concurrent("busy", 3).await.unwrap();
    v.init("busy").await;

    sleep(Duration::from_secs(1)).await;
    let before = v.top().await.remove(0);
    assert_eq!(before.in_flight, 3);
    assert_eq!(before.stats.dispatched, 3);

    assert_eq!(
        v.init("busy").await,
        vec![(
            "busy".to_string(),
            Err(RegistryError::AlreadyStarted { name: "busy".into() })
        )]
    );
    let same = v.top().await.remove(0);
    assert_eq!(same.in_flight, before.in_flight);
    assert_eq!(same.stats.dispatched, before.stats.dispatched);
    assert!(same.elapsed >= before.elapsed);

    sleep(Duration::from_secs(1)).await;
    let after = v.top().await.remove(0);
    assert!(
        after.elapsed >= before.elapsed + Duration::from_secs(1),
        "elapsed went from {:?} to {:?}",
        before.elapsed,
        after.elapsed
    );
    assert_eq!(after.in_flight, 3);
    assert_eq!(after.stats.dispatched, 3);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn saturated_generator_announces_skips_once() {
    let v = visor();
    let mut rx = v.subscribe();
    let hits = Arc::new(AtomicUsize::new(0));
    let spec = counting("full", LoadShape::Constant(200.0), &hits, Duration::from_secs(600));
    v.add(spec).await.unwrap();
    v.set_max_concurrent("full", 1).await.unwrap();
    v.init("full").await;

    sleep(Duration::from_secs(2)).await;
    v.pause("full").await;

    let mut announced = 0;
    loop {
        match rx.try_recv() {
            Ok(ev) if ev.kind == EventKind::TaskSkipped => {
                assert_eq!(ev.in_flight, Some(1));
                announced += 1;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    let stats = v.top().await[0].stats;
    assert_eq!(announced, 1);
    assert!(stats.skipped > 100, "skipped {}", stats.skipped);
}

#[tokio::test(start_paused = true)]
async fn zero_rate_generator_stays_responsive() {
    let v = visor();
    let hits = Arc::new(AtomicUsize::new(0));
    v.add(counting("quiet", LoadShape::Constant(0.0), &hits, Duration::ZERO))
        .await
        .unwrap();
    v.init("quiet").await;

    sleep(Duration::from_secs(5)).await;
    assert!(v.is_running("quiet").await);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    assert_eq!(v.pause("quiet").await, vec![ok("quiet")]);
    assert!(!v.is_running("quiet").await);
}

#[tokio::test(start_paused = true)]
async fn set_max_concurrent_is_visible() {
    let v = visor();
    v.add(idle("g")).await.unwrap();
    v.set_max_concurrent("g", 2).await.unwrap();
    assert_eq!(v.get_max_concurrent("g").await, Ok(2));
    assert_eq!(v.list().await[0].max_concurrent, 2);
}

#[tokio::test(start_paused = true)]
async fn remove_leaves_in_flight_tasks_running() {
    let v = visor();
    let finished = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&finished);
    let spec = GeneratorSpec::builder("busy", LoadShape::Constant(100.0))
        .max_concurrent(1)
        .auto_init(true)
        .build(move || {
            let f = Arc::clone(&f);
            async move {
                sleep(Duration::from_secs(5)).await;
                f.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
    v.add(spec).await.unwrap();

    sleep(Duration::from_millis(500)).await;
    assert_eq!(v.top().await[0].in_flight, 1);
    v.remove("busy").await;

    sleep(Duration::from_secs(6)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn elapsed_time_excludes_pauses() {
    let v = visor();
    let seen = Arc::new(Mutex::new(Vec::<Duration>::new()));
    let s = Arc::clone(&seen);
    let load = move |elapsed: Duration| {
        s.lock().unwrap().push(elapsed);
        0.0
    };
    let spec = GeneratorSpec::builder("curve", load)
        .auto_init(true)
        .build(|| async { Ok(()) });
    v.add(spec).await.unwrap();

    sleep(Duration::from_secs(3)).await;
    v.pause("curve").await;
    let at_pause = v.top().await[0].elapsed;
    assert!(at_pause >= Duration::from_secs(3) && at_pause < Duration::from_millis(3200));

    sleep(Duration::from_secs(10)).await;
    assert_eq!(v.top().await[0].elapsed, at_pause);

    seen.lock().unwrap().clear();
    v.init("curve").await;
    sleep(Duration::from_secs(1)).await;

    let first = seen.lock().unwrap()[0];
    assert!(first >= at_pause && first < at_pause + Duration::from_millis(200));
    let now = v.top().await[0].elapsed;
    assert!(now >= Duration::from_secs(4) && now < Duration::from_secs(5), "{now:?}");
}

#[tokio::test(start_paused = true)]
async fn duration_completes_and_restarts_from_zero() {
    let v = visor();
    let mut rx = v.subscribe();
    let hits = Arc::new(AtomicUsize::new(0));
    let spec = GeneratorSpec::builder("short", LoadShape::Constant(50.0))
        .duration(Duration::from_secs(1))
        .auto_init(true)
        .seed(5)
        .build({
            let hits = Arc::clone(&hits);
            move || {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }
        });
    v.add(spec).await.unwrap();

    let done = wait_for(&mut rx, EventKind::GeneratorCompleted).await;
    assert_eq!(done.generator.as_deref(), Some("short"));
    assert!(done.elapsed_ms >= Some(1000));

    sleep(Duration::from_millis(100)).await;
    assert!(!v.is_running("short").await);
    let status = &v.top().await[0];
    assert_eq!(status.state, LifecycleState::Paused);
    assert_eq!(status.elapsed, Duration::from_secs(1));

    let n = hits.load(Ordering::SeqCst);
    assert!((20..=90).contains(&n), "dispatched {n}");
    sleep(Duration::from_secs(2)).await;
    assert_eq!(hits.load(Ordering::SeqCst), n);

    assert_eq!(v.init("short").await, vec![ok("short")]);
    sleep(Duration::from_millis(200)).await;
    assert!(v.is_running("short").await);
    assert!(v.top().await[0].elapsed < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn invalid_intensity_skips_ticks_without_stopping() {
    let v = visor();
    let mut rx = v.subscribe();
    let spec = GeneratorSpec::builder("broken", |_: Duration| -1.0)
        .auto_init(true)
        .build(|| async { Ok(()) });
    v.add(spec).await.unwrap();

    let ev = wait_for(&mut rx, EventKind::InvalidRate).await;
    assert_eq!(ev.generator.as_deref(), Some("broken"));

    sleep(Duration::from_secs(1)).await;
    assert!(v.is_running("broken").await);
    let stats = v.top().await[0].stats;
    assert!(stats.invalid_rate > 1);
    assert_eq!(stats.dispatched, 0);
}

#[tokio::test(start_paused = true)]
async fn panicking_load_spec_pauses_the_generator() {
    let v = visor();
    let mut rx = v.subscribe();
    let spec = GeneratorSpec::builder("fragile", |elapsed: Duration| {
        if elapsed >= Duration::from_millis(500) {
            panic!("curve exploded");
        }
        0.0
    })
    .auto_init(true)
    .build(|| async { Ok(()) });
    v.add(spec).await.unwrap();

    let ev = wait_for(&mut rx, EventKind::GeneratorPaused).await;
    assert_eq!(ev.generator.as_deref(), Some("fragile"));
    assert!(ev.reason.as_deref().is_some_and(|r| r.contains("curve exploded")));

    assert!(!v.is_running("fragile").await);
    v.add(idle("other")).await.unwrap();
    assert_eq!(v.list().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn task_failures_are_counted() {
    let v = visor();
    let spec = GeneratorSpec::builder("flaky", LoadShape::Constant(20.0))
        .auto_init(true)
        .seed(2)
        .build(|| async { Err(crate::TaskError::fail("boom")) });
    v.add(spec).await.unwrap();

    sleep(Duration::from_secs(1)).await;
    v.pause("flaky").await;
    sleep(Duration::from_millis(10)).await;

    let stats = v.top().await[0].stats;
    assert!(stats.failed > 0);
    assert_eq!(stats.failed, stats.dispatched);
    assert_eq!(stats.completed, 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_the_registry() {
    let v = visor();
    v.add(idle("g")).await.unwrap();
    v.init("g").await;

    assert_eq!(v.shutdown().await, Ok(()));
    assert_eq!(v.add(idle("h")).await, Err(RegistryError::Closed));
    assert_eq!(
        v.init("g").await,
        vec![("g".to_string(), Err(RegistryError::Closed))]
    );
    assert!(!v.is_running("g").await);
    assert!(v.list().await.is_empty());
    assert_eq!(v.shutdown().await, Ok(()));
}

#[tokio::test(start_paused = true)]
async fn shutdown_reports_schedulers_stuck_past_grace() {
    let cfg = Config {
        grace: Duration::from_secs(1),
        ..Config::default()
    };
    let v = LoadVisor::builder(cfg).build();
    let spec = GeneratorSpec::builder("slow", LoadShape::Constant(100.0))
        .runner(InlineRunner::default())
        .auto_init(true)
        .build(|| async {
            sleep(Duration::from_secs(60)).await;
            Ok(())
        });
    v.add(spec).await.unwrap();
    sleep(Duration::from_millis(500)).await;

    assert_eq!(
        v.shutdown().await,
        Err(RuntimeError::GraceExceeded {
            grace: Duration::from_secs(1),
            stuck: vec!["slow".into()],
        })
    );
}

struct Recorder {
    seen: Arc<Mutex<Vec<EventKind>>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.seen.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_lifecycle_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let v = LoadVisor::builder(Config::default())
        .with_subscribers(vec![Arc::new(Recorder { seen: seen.clone() })])
        .build();

    v.add(idle("g")).await.unwrap();
    v.init("g").await;
    v.pause("g").await;
    v.remove("g").await;
    v.shutdown().await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            EventKind::GeneratorAdded,
            EventKind::GeneratorStarted,
            EventKind::GeneratorPaused,
            EventKind::GeneratorRemoved,
            EventKind::ShutdownRequested,
        ]
    );
}
