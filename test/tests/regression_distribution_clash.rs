/// REGRESSION TESTS: Writers that clash with the channel's distribution
///
/// A writer whose transport class differs from the master's, or that joins
/// a channel where either side allows only one writer, must be refused
/// without disturbing the channel. Node 0 logs the clash and drops the
/// request; it is never treated as a corrupted organiser.
use chanmesh_shared::{
    AccessError, Arity, ChannelName, ReadToken, ReaderConfig, TimeAspect, TimeWindow,
    TransportClass, WriteToken, WriterConfig,
};
use chanmesh_test::{assert_single_master, TestCluster};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn solo() -> ChannelName {
    ChannelName::from("solo")
}

/// Second writer on an only-one channel stays invalid, the master keeps
/// writing and readers keep reading.
#[test]
fn second_writer_on_only_one_channel_is_refused() {
    init();
    let mut cluster = TestCluster::new(3);
    let only_one = WriterConfig::new("cmd", "commands")
        .with_aspect(TimeAspect::Event)
        .with_arity(Arity::OnlyOne);

    let mut master = WriteToken::open(&cluster.context(1), solo(), only_one).unwrap();
    let mut reader = ReadToken::open(&cluster.context(0), solo(), ReaderConfig::sequential()).unwrap();
    cluster.settle();
    assert!(master.is_valid());

    let mut intruder = WriteToken::open(
        &cluster.context(2),
        solo(),
        WriterConfig::new("cmd", "commands").with_aspect(TimeAspect::Event),
    )
    .unwrap();
    cluster.settle();

    assert!(!intruder.is_valid());
    assert_eq!(intruder.acquire().err(), Some(AccessError::InvalidToken));
    assert!(cluster.context(0).coordinator().fatal().is_none());
    assert!(!cluster.node(0).is_stopped());

    let master_id = cluster.with_end(1, &solo(), |end| end.id());
    assert_eq!(assert_single_master(&cluster, &solo()), master_id);

    master.write(TimeWindow::event(1), &9_u8).unwrap();
    cluster.settle();
    let access = reader.acquire(u64::MAX).unwrap();
    assert_eq!(access.value::<u8>(), Ok(9));
    reader.release_consuming().unwrap();
}

/// The same clash on one node is caught when the token is opened.
#[test]
fn local_only_one_clash_fails_on_open() {
    init();
    let mut cluster = TestCluster::new(2);
    let only_one = WriterConfig::new("cmd", "commands")
        .with_aspect(TimeAspect::Event)
        .with_arity(Arity::OnlyOne);
    let _master = WriteToken::open(&cluster.context(1), solo(), only_one.clone()).unwrap();
    cluster.settle();

    assert!(matches!(
        WriteToken::open(&cluster.context(1), solo(), only_one),
        Err(AccessError::DistributionClash { .. })
    ));
}

/// A writer asking for another transport than the master's never validates.
#[test]
fn transport_class_mismatch_is_refused() {
    init();
    let mut cluster = TestCluster::new(3);
    let _master = WriteToken::open(
        &cluster.context(1),
        "mixed",
        WriterConfig::new("a", "telemetry"),
    )
    .unwrap();
    cluster.settle();

    let reflective = WriteToken::open(
        &cluster.context(2),
        "mixed",
        WriterConfig::new("b", "telemetry").with_transport_class(TransportClass::Reflective),
    )
    .unwrap();
    cluster.settle();

    assert!(!reflective.is_valid());
    assert!(cluster.try_settle().is_ok());
    let master = cluster
        .context(0)
        .coordinator()
        .organiser(&ChannelName::from("mixed"))
        .map(|organiser| organiser.record().transport_class);
    assert_eq!(master, Some(TransportClass::Socket));
}
