/// INTEGRATION TESTS: Linking channel ends across a cluster
///
/// Every node opens tokens locally; node 0's organisers issue ids, pick the
/// master and mesh the ends. These tests drive whole clusters over the local
/// hub and check the resulting link state on every node.
///
/// Key invariants:
/// 1. Issued ids are unique and name the hosting node
/// 2. Destination sets are symmetric and complete once a master exists
/// 3. Every end of a channel agrees on one master, the first writer
use chanmesh_shared::{
    ChannelEndId, ChannelName, ReadToken, ReaderConfig, TimeWindow, WriteToken, WriterConfig,
};
use chanmesh_test::{assert_mesh_symmetric, assert_single_master, assert_unique_ids, TestCluster};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn demo() -> ChannelName {
    ChannelName::from("demo")
}

/// Control ends take objects 0 and 1 on every node, whatever user code does
/// before the first pump.
#[test]
fn bootstrap_assigns_control_objects_first() {
    init();
    let mut cluster = TestCluster::new(3);
    let _early = ReadToken::open(&cluster.context(2), "early", ReaderConfig::default()).unwrap();
    cluster.settle();

    for node in 0..3_u16 {
        let context = cluster.context(node);
        let coordinator = context.coordinator();
        let request = coordinator.find_end(&ChannelName::request()).unwrap();
        let update = coordinator.find_end(&ChannelName::update()).unwrap();
        assert_eq!(request.id(), ChannelEndId::new(node, 0));
        assert_eq!(update.id(), ChannelEndId::new(node, 1));
    }
    assert_unique_ids(&cluster);
}

/// A reader opened before any writer stays invalid until a writer reports,
/// then both sides link and data flows from A to B.
#[test]
fn reader_links_once_a_remote_writer_reports() {
    init();
    let mut cluster = TestCluster::new(3);
    cluster.settle();

    let mut reader = ReadToken::open(&cluster.context(2), demo(), ReaderConfig::default()).unwrap();
    assert!(!reader.is_valid());
    cluster.settle();

    // issued, but no master yet
    let issued = cluster
        .with_end(2, &demo(), |end| end.is_issued() && !end.is_linked())
        .unwrap();
    assert!(issued);
    assert!(!reader.is_valid());

    let mut writer = WriteToken::open(
        &cluster.context(1),
        demo(),
        WriterConfig::new("speed", "telemetry"),
    )
    .unwrap();
    assert!(!writer.is_valid());
    cluster.settle();

    assert!(writer.is_valid());
    assert!(reader.is_valid());

    writer.write(TimeWindow::stream(10, 20), &42_u32).unwrap();
    cluster.settle();

    let access = reader.acquire(15).unwrap();
    assert_eq!(access.value::<u32>(), Ok(42));
    assert_eq!(access.window, TimeWindow::stream(10, 20));
    reader.release().unwrap();

    assert_mesh_symmetric(&cluster, &demo());
    let writer_id = cluster.with_end(1, &demo(), |end| end.id()).unwrap();
    assert_eq!(assert_single_master(&cluster, &demo()), Some(writer_id));
}

/// The first writer to report becomes master, later writers only join.
#[test]
fn first_writer_stays_master() {
    init();
    let mut cluster = TestCluster::new(4);
    cluster.settle();

    let _first = WriteToken::open(
        &cluster.context(3),
        demo(),
        WriterConfig::new("a", "telemetry"),
    )
    .unwrap();
    cluster.settle();
    let master = cluster.with_end(3, &demo(), |end| end.id()).unwrap();

    let _second = WriteToken::open(
        &cluster.context(1),
        demo(),
        WriterConfig::new("b", "telemetry"),
    )
    .unwrap();
    let _reader = ReadToken::open(&cluster.context(0), demo(), ReaderConfig::default()).unwrap();
    cluster.settle();

    assert_eq!(assert_single_master(&cluster, &demo()), Some(master));
    let recorded = cluster
        .context(0)
        .coordinator()
        .organiser(&demo())
        .and_then(|organiser| organiser.record().master);
    assert_eq!(recorded, Some(master));
    assert_mesh_symmetric(&cluster, &demo());
    assert_unique_ids(&cluster);
}

/// Ends joining after the master is known are linked to every earlier end.
#[test]
fn late_ends_join_the_full_mesh() {
    init();
    let mut cluster = TestCluster::new(4);
    let _writer = WriteToken::open(
        &cluster.context(0),
        demo(),
        WriterConfig::new("speed", "telemetry"),
    )
    .unwrap();
    cluster.settle();

    let mut readers = Vec::new();
    for node in 1..4_u16 {
        readers.push(ReadToken::open(&cluster.context(node), demo(), ReaderConfig::default()).unwrap());
        cluster.settle();
        assert_mesh_symmetric(&cluster, &demo());
    }

    assert!(readers.iter().all(ReadToken::is_valid));
    let destinations = cluster
        .with_end(0, &demo(), |end| end.destinations().len())
        .unwrap();
    assert_eq!(destinations, 3);
}

/// Several tokens on one node share a single end.
#[test]
fn one_end_per_channel_per_node() {
    init();
    let mut cluster = TestCluster::new(2);
    let context = cluster.context(1);
    let _writer = WriteToken::open(&context, demo(), WriterConfig::new("a", "telemetry")).unwrap();
    let _reader_one = ReadToken::open(&context, demo(), ReaderConfig::default()).unwrap();
    let _reader_two = ReadToken::open(&context, demo(), ReaderConfig::sequential()).unwrap();
    cluster.settle();

    let attachments = cluster.with_end(1, &demo(), |end| end.attachments()).unwrap();
    assert_eq!(attachments, 3);

    let organiser_ends = cluster
        .context(0)
        .coordinator()
        .organiser(&demo())
        .map(|organiser| organiser.record().ends.len());
    assert_eq!(organiser_ends, Some(1));
}
