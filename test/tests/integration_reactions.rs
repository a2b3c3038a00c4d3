/// INTEGRATION TESTS: Reactions driven by the node pump
///
/// Reactions are callbacks attached to tokens. A validity reaction fires once
/// when its token becomes usable; a data reaction fires whenever the token's
/// end stores data at or after the tick it was armed at.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use chanmesh_shared::{ReadToken, ReaderConfig, TimeWindow, WriteToken, WriterConfig};
use chanmesh_test::TestCluster;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn valid_reaction_fires_once_after_linking() {
    init();
    let mut cluster = TestCluster::new(3);
    let context = cluster.context(2);
    let reader = ReadToken::open(&context, "demo", ReaderConfig::default()).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    context.on_valid(&reader, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    cluster.settle();
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    let _writer = WriteToken::open(
        &cluster.context(1),
        "demo",
        WriterConfig::new("speed", "telemetry"),
    )
    .unwrap();
    cluster.settle();
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    cluster.settle();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn data_reaction_sees_remote_ticks() {
    init();
    let mut cluster = TestCluster::new(3);
    let mut writer = WriteToken::open(
        &cluster.context(1),
        "demo",
        WriterConfig::new("speed", "telemetry"),
    )
    .unwrap();
    let context = cluster.context(2);
    let reader = ReadToken::open(&context, "demo", ReaderConfig::default()).unwrap();
    cluster.settle();

    let ticks = Arc::new(Mutex::new(Vec::new()));
    let seen = ticks.clone();
    let key = context.on_data(&reader, move |tick| {
        seen.lock().unwrap().push(tick);
    });

    writer.write(TimeWindow::stream(10, 20), &1_u32).unwrap();
    cluster.settle();
    writer.write(TimeWindow::stream(20, 30), &2_u32).unwrap();
    cluster.settle();
    assert_eq!(*ticks.lock().unwrap(), vec![10, 20]);

    // data before the arming tick is ignored
    assert!(context.switch_on(&key, 100));
    writer.write(TimeWindow::stream(30, 40), &3_u32).unwrap();
    cluster.settle();
    assert_eq!(ticks.lock().unwrap().len(), 2);

    assert!(context.switch_off(&key, 0));
    writer.write(TimeWindow::stream(100, 110), &4_u32).unwrap();
    cluster.settle();
    assert_eq!(ticks.lock().unwrap().len(), 2);

    assert!(context.switch_on(&key, 0));
    writer.write(TimeWindow::stream(110, 120), &5_u32).unwrap();
    cluster.settle();
    assert_eq!(*ticks.lock().unwrap(), vec![10, 20, 110]);

    assert!(context.remove_reaction(&key));
    assert_eq!(context.reaction_count(), 0);
}

/// A callback may open tokens of its own: reactions run with no lock held.
#[test]
fn callback_can_open_tokens() {
    init();
    let mut cluster = TestCluster::new(2);
    let context = cluster.context(1);
    let writer = WriteToken::open(&context, "demo", WriterConfig::new("a", "telemetry")).unwrap();

    let opened = Arc::new(Mutex::new(Vec::new()));
    let slot = opened.clone();
    let inner = context.clone();
    context.on_valid(&writer, move || {
        let token = ReadToken::open(&inner, "follow-up", ReaderConfig::default()).unwrap();
        slot.lock().unwrap().push(token);
    });
    cluster.settle();

    assert_eq!(opened.lock().unwrap().len(), 1);
    let issued = cluster
        .with_end(1, &"follow-up".into(), |end| end.is_issued())
        .unwrap();
    assert!(issued);
}

/// Dropping a token takes its reactions with it; other tokens on the same
/// end keep theirs.
#[test]
fn dropped_token_takes_its_reactions() {
    init();
    let mut cluster = TestCluster::new(2);
    let context = cluster.context(1);
    let mut writer =
        WriteToken::open(&context, "demo", WriterConfig::new("a", "telemetry")).unwrap();
    let gone = ReadToken::open(&context, "demo", ReaderConfig::default()).unwrap();
    let kept = ReadToken::open(&context, "demo", ReaderConfig::default()).unwrap();
    cluster.settle();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    context.on_data(&gone, |_| {});
    context.on_valid(&gone, || {});
    context.on_data(&kept, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(context.reaction_count(), 3);

    drop(gone);
    assert_eq!(context.reaction_count(), 1);

    writer.write(TimeWindow::stream(0, 10), &1_u32).unwrap();
    cluster.settle();
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    drop(kept);
    drop(writer);
    assert_eq!(context.reaction_count(), 0);
}
