/// INTEGRATION TESTS: Closing, removing and reopening channel ends
///
/// An end closes when its last token goes away or when the node removes it.
/// Node 0 deletes it from the channel record and every peer forgets it; the
/// slot is freed locally once the deletion comes back on the update channel.
use chanmesh_shared::{
    AccessError, ChannelName, ReadToken, ReaderConfig, TimeWindow, WriteToken, WriterConfig,
};
use chanmesh_test::{assert_mesh_symmetric, assert_unique_ids, TestCluster};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn demo() -> ChannelName {
    ChannelName::from("demo")
}

/// Removing an end invalidates its tokens at once and strips its entries
/// from every peer after the round trip through node 0.
#[test]
fn removed_end_reports_missing_everywhere() {
    init();
    let mut cluster = TestCluster::new(3);
    let mut writer = WriteToken::open(
        &cluster.context(1),
        demo(),
        WriterConfig::new("speed", "telemetry"),
    )
    .unwrap();
    let mut local_reader =
        ReadToken::open(&cluster.context(1), demo(), ReaderConfig::default()).unwrap();
    let mut remote_reader =
        ReadToken::open(&cluster.context(2), demo(), ReaderConfig::default()).unwrap();
    cluster.settle();
    writer.write(TimeWindow::stream(0, 10), &5_u32).unwrap();
    cluster.settle();

    let removed = cluster.with_end(1, &demo(), |end| end.id()).unwrap();
    assert!(cluster.context(1).remove_end(&demo()));

    assert_eq!(writer.acquire().err(), Some(AccessError::MissingChannelEnd));
    assert_eq!(local_reader.acquire(3), Err(AccessError::MissingChannelEnd));
    assert!(!writer.is_valid());
    assert!(!local_reader.is_valid());

    cluster.settle();

    let context = cluster.context(1);
    assert!(!context.coordinator().has_local_end(&removed));
    let peer_view = cluster
        .with_end(2, &demo(), |end| {
            (end.destinations().contains(&removed), end.entry_keys().len())
        })
        .unwrap();
    assert_eq!(peer_view, (false, 0));
    assert_eq!(remote_reader.acquire(3), Err(AccessError::NoDataAvailable));
}

/// Dropping every token closes the end and, once no end is left, node 0
/// forgets the channel.
#[test]
fn last_token_dropped_closes_channel() {
    init();
    let mut cluster = TestCluster::new(2);
    let writer = WriteToken::open(
        &cluster.context(1),
        demo(),
        WriterConfig::new("speed", "telemetry"),
    )
    .unwrap();
    let reader = ReadToken::open(&cluster.context(1), demo(), ReaderConfig::default()).unwrap();
    cluster.settle();
    assert!(cluster.context(0).coordinator().organiser(&demo()).is_some());

    drop(writer);
    cluster.settle();
    assert!(cluster.with_end(1, &demo(), |_| ()).is_some());

    drop(reader);
    cluster.settle();
    assert!(cluster.with_end(1, &demo(), |_| ()).is_none());
    assert!(cluster.context(0).coordinator().organiser(&demo()).is_none());
}

/// A closed writer retracts its entry on the peers that still read.
#[test]
fn dropped_writer_retracts_entry() {
    init();
    let mut cluster = TestCluster::new(3);
    let mut writer = WriteToken::open(
        &cluster.context(1),
        demo(),
        WriterConfig::new("speed", "telemetry"),
    )
    .unwrap();
    let _keep_end = ReadToken::open(&cluster.context(1), demo(), ReaderConfig::default()).unwrap();
    let mut reader = ReadToken::open(&cluster.context(2), demo(), ReaderConfig::default()).unwrap();
    cluster.settle();
    writer.write(TimeWindow::stream(0, 10), &1_u32).unwrap();
    cluster.settle();
    assert!(reader.acquire(5).is_ok());
    reader.release().unwrap();

    drop(writer);
    cluster.settle();

    let entries = cluster.with_end(2, &demo(), |end| end.entry_keys().len());
    assert_eq!(entries, Some(0));
    assert_eq!(reader.acquire(5), Err(AccessError::NoDataAvailable));
}

/// A token opened before its end's id is issued, then dropped, is cleaned
/// up once the id arrives.
#[test]
fn end_closed_while_waiting_for_id() {
    init();
    let mut cluster = TestCluster::new(2);
    let reader = ReadToken::open(&cluster.context(1), demo(), ReaderConfig::default()).unwrap();
    drop(reader);
    cluster.settle();

    let context = cluster.context(1);
    let coordinator = context.coordinator();
    assert!(coordinator.find_end(&demo()).is_none());
    assert!(coordinator.registry().wait_room().is_empty());
    drop(coordinator);
    assert!(cluster.context(0).coordinator().organiser(&demo()).is_none());
}

/// Reopening a removed channel gets a fresh end that links like any other.
#[test]
fn reopen_after_removal_links_again() {
    init();
    let mut cluster = TestCluster::new(3);
    let _writer = WriteToken::open(
        &cluster.context(2),
        demo(),
        WriterConfig::new("speed", "telemetry"),
    )
    .unwrap();
    let stale = ReadToken::open(&cluster.context(1), demo(), ReaderConfig::default()).unwrap();
    cluster.settle();

    assert!(cluster.context(1).remove_end(&demo()));
    cluster.settle();
    drop(stale);

    let fresh = ReadToken::open(&cluster.context(1), demo(), ReaderConfig::default()).unwrap();
    cluster.settle();
    assert!(fresh.is_valid());
    assert_mesh_symmetric(&cluster, &demo());
    assert_unique_ids(&cluster);
}
