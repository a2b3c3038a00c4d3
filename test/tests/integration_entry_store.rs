/// INTEGRATION TESTS: Reading values written on another node
///
/// Values travel as frames from the writing end to every meshed end and land
/// in each node's entry store. These tests check the selectors, sequential
/// reading, late joiners and the virtual join across node boundaries.
use chanmesh_shared::{
    AccessError, ChannelName, ReadToken, ReaderConfig, RetentionPolicy, Selection,
    Selector, Tick, TimeAspect, TimeWindow, WriteToken, WriterConfig,
};
use chanmesh_test::TestCluster;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn linked_pair(
    cluster: &mut TestCluster,
    name: &str,
    writer: WriterConfig,
    reader: ReaderConfig,
) -> (WriteToken, ReadToken) {
    let writer = WriteToken::open(&cluster.context(1), name, writer).unwrap();
    let reader = ReadToken::open(&cluster.context(2), name, reader).unwrap();
    cluster.settle();
    assert!(writer.is_valid());
    assert!(reader.is_valid());
    (writer, reader)
}

/// Interval-start finds a stream value only inside its window, the
/// or-earlier selector keeps answering after it ends.
#[test]
fn interval_start_round_trip_across_nodes() {
    init();
    let mut cluster = TestCluster::new(3);
    let (mut writer, mut recent) = linked_pair(
        &mut cluster,
        "demo",
        WriterConfig::new("speed", "telemetry"),
        ReaderConfig::default(),
    );
    let mut exact = ReadToken::open(
        &cluster.context(2),
        "demo",
        ReaderConfig::default().with_selector(Selector::IntervalStart),
    )
    .unwrap();

    writer.write(TimeWindow::stream(10, 20), &42_u32).unwrap();
    cluster.settle();

    let access = exact.acquire(15).unwrap();
    assert_eq!(access.value::<u32>(), Ok(42));
    exact.release().unwrap();
    assert_eq!(exact.acquire(25), Err(AccessError::NoDataAvailable));
    assert_eq!(exact.acquire(5), Err(AccessError::NoDataAvailable));

    let access = recent.acquire(25).unwrap();
    assert_eq!(access.window, TimeWindow::stream(10, 20));
    recent.release().unwrap();
}

/// A sequential reader sees three events in order, then nothing.
#[test]
fn sequential_reader_exhausts_remote_events() {
    init();
    let mut cluster = TestCluster::new(3);
    let (mut writer, mut reader) = linked_pair(
        &mut cluster,
        "ticks",
        WriterConfig::new("tick", "events").with_aspect(TimeAspect::Event),
        ReaderConfig::sequential(),
    );

    for tick in 1..=3_u64 {
        writer.write(TimeWindow::event(tick), &(tick * 10)).unwrap();
    }
    cluster.settle();

    for tick in 1..=3_u64 {
        let access = reader.acquire(Tick::MAX).unwrap();
        assert_eq!(access.window, TimeWindow::event(tick));
        assert_eq!(access.value::<u64>(), Ok(tick * 10));
        reader.release_consuming().unwrap();
    }
    assert_eq!(reader.acquire(Tick::MAX), Err(AccessError::NoDataAvailable));
}

/// Releasing without consuming leaves the value for the next acquire.
#[test]
fn plain_release_does_not_advance() {
    init();
    let mut cluster = TestCluster::new(3);
    let (mut writer, mut reader) = linked_pair(
        &mut cluster,
        "ticks",
        WriterConfig::new("tick", "events").with_aspect(TimeAspect::Event),
        ReaderConfig::sequential(),
    );
    writer.write(TimeWindow::event(4), &1_u8).unwrap();
    writer.write(TimeWindow::event(5), &2_u8).unwrap();
    cluster.settle();

    let first = reader.acquire(Tick::MAX).unwrap();
    reader.release().unwrap();
    let again = reader.acquire(Tick::MAX).unwrap();
    assert_eq!(first, again);
    reader.release_consuming().unwrap();

    let next = reader.acquire(Tick::MAX).unwrap();
    assert_eq!(next.value::<u8>(), Ok(2));
    reader.release_consuming().unwrap();
}

/// An end that joins after a value was written receives the newest value on
/// linking.
#[test]
fn late_reader_receives_latest_value() {
    init();
    let mut cluster = TestCluster::new(3);
    let mut writer = WriteToken::open(
        &cluster.context(1),
        "demo",
        WriterConfig::new("speed", "telemetry"),
    )
    .unwrap();
    cluster.settle();
    writer.write(TimeWindow::stream(0, 10), &1_u32).unwrap();
    writer.write(TimeWindow::stream(10, 20), &2_u32).unwrap();
    cluster.settle();

    let mut reader = ReadToken::open(&cluster.context(2), "demo", ReaderConfig::default()).unwrap();
    cluster.settle();

    let access = reader.acquire(15).unwrap();
    assert_eq!(access.value::<u32>(), Ok(2));
    reader.release().unwrap();
}

/// The virtual join probes every entry and returns the one whose event sits
/// exactly at the request time.
#[test]
fn virtual_join_merges_writers_on_different_nodes() {
    init();
    let mut cluster = TestCluster::new(3);
    let events = |label: &str| WriterConfig::new(label, "events").with_aspect(TimeAspect::Event);
    let mut left = WriteToken::open(&cluster.context(1), "merged", events("left")).unwrap();
    let mut right = WriteToken::open(&cluster.context(2), "merged", events("right")).unwrap();
    let mut reader = ReadToken::open(
        &cluster.context(0),
        "merged",
        ReaderConfig::default().with_selector(Selector::VirtualJoin),
    )
    .unwrap();
    cluster.settle();
    assert!(left.is_valid() && right.is_valid() && reader.is_valid());

    left.write(TimeWindow::event(5), &"left".to_string()).unwrap();
    right.write(TimeWindow::event(7), &"right".to_string()).unwrap();
    cluster.settle();

    let access = reader.acquire(7).unwrap();
    assert_eq!(access.value::<String>(), Ok("right".to_string()));
    reader.release().unwrap();
    let access = reader.acquire(5).unwrap();
    assert_eq!(access.value::<String>(), Ok("left".to_string()));
    reader.release().unwrap();
    assert_eq!(reader.acquire(6), Err(AccessError::NoDataAvailable));
}

/// Selecting by label pins the token to one writer's entry.
#[test]
fn label_selection_ignores_other_writers() {
    init();
    let mut cluster = TestCluster::new(3);
    let mut speed =
        WriteToken::open(&cluster.context(1), "car", WriterConfig::new("speed", "telemetry")).unwrap();
    let mut heading =
        WriteToken::open(&cluster.context(2), "car", WriterConfig::new("heading", "telemetry"))
            .unwrap();
    let mut reader = ReadToken::open_with(
        &cluster.context(0),
        "car",
        ReaderConfig::default(),
        Selection::ByLabel("heading".to_string()),
    )
    .unwrap();
    cluster.settle();

    speed.write(TimeWindow::stream(0, 10), &88_u32).unwrap();
    heading.write(TimeWindow::stream(0, 10), &270_u32).unwrap();
    cluster.settle();

    let access = reader.acquire(3).unwrap();
    assert_eq!(access.value::<u32>(), Ok(270));
    reader.release().unwrap();
}

/// A span retention keeps history back to `newest - span`.
#[test]
fn retention_span_keeps_recent_history() {
    init();
    let mut cluster = TestCluster::new(3);
    let (mut writer, mut reader) = linked_pair(
        &mut cluster,
        "history",
        WriterConfig::new("level", "telemetry"),
        ReaderConfig::default()
            .with_selector(Selector::IntervalStart)
            .with_retention(RetentionPolicy::Span(20)),
    );

    for start in (0..50_u64).step_by(10) {
        writer
            .write(TimeWindow::stream(start, start + 10), &start)
            .unwrap();
    }
    cluster.settle();

    // newest window ends at 50, so anything ending before 30 is gone
    assert_eq!(reader.acquire(15), Err(AccessError::NoDataAvailable));
    let access = reader.acquire(25).unwrap();
    assert_eq!(access.value::<u64>(), Ok(20));
    reader.release().unwrap();
    let access = reader.acquire(35).unwrap();
    assert_eq!(access.value::<u64>(), Ok(30));
    reader.release().unwrap();
}

/// Flushing moves a sequential cursor forward without handing out values.
#[test]
fn flushes_skip_unread_events() {
    init();
    let mut cluster = TestCluster::new(3);
    let (mut writer, mut reader) = linked_pair(
        &mut cluster,
        "ticks",
        WriterConfig::new("tick", "events").with_aspect(TimeAspect::Event),
        ReaderConfig::sequential(),
    );
    for tick in 1..=5_u64 {
        writer.write(TimeWindow::event(tick), &tick).unwrap();
    }
    cluster.settle();

    assert_eq!(reader.flush_older_than(3), Ok(2));
    let access = reader.acquire(Tick::MAX).unwrap();
    assert_eq!(access.value::<u64>(), Ok(3));
    reader.release_consuming().unwrap();

    assert_eq!(reader.flush_one(), Ok(1));
    let access = reader.acquire(Tick::MAX).unwrap();
    assert_eq!(access.value::<u64>(), Ok(5));
    reader.release().unwrap();

    assert_eq!(reader.flush_all(), Ok(1));
    assert_eq!(reader.acquire(Tick::MAX), Err(AccessError::NoDataAvailable));
}

/// Class iteration walks every writer's entry, one sequential cursor each.
#[test]
fn sequential_class_iteration_across_writers() {
    init();
    let mut cluster = TestCluster::new(3);
    let events = |label: &str| WriterConfig::new(label, "alarms").with_aspect(TimeAspect::Event);
    let mut north = WriteToken::open(&cluster.context(1), "alarms", events("north")).unwrap();
    let mut south = WriteToken::open(&cluster.context(2), "alarms", events("south")).unwrap();
    let mut reader = ReadToken::open(
        &cluster.context(0),
        "alarms",
        ReaderConfig::sequential(),
    )
    .unwrap();
    cluster.settle();

    north.write(TimeWindow::event(1), &1_u8).unwrap();
    north.write(TimeWindow::event(2), &2_u8).unwrap();
    south.write(TimeWindow::event(1), &3_u8).unwrap();
    cluster.settle();

    let mut seen = Vec::new();
    let mut selected = reader.select_first("alarms");
    while selected {
        while let Ok(access) = reader.acquire(Tick::MAX) {
            seen.push(access.value::<u8>().unwrap());
            reader.release_consuming().unwrap();
        }
        selected = reader.select_next();
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3]);

    let name = ChannelName::from("alarms");
    let entries = cluster.with_end(0, &name, |end| end.entries_of_class("alarms").len());
    assert_eq!(entries, Some(2));
}
