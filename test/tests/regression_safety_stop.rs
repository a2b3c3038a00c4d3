/// REGRESSION TESTS: Safety stop on a corrupted control plane
///
/// A control message that cannot be decoded, or a removal node 0 has no
/// record of, means the registry can no longer be trusted. The node latches
/// the fault, calls its safe-mode callback exactly once and refuses to pump
/// from then on.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chanmesh_node::NodeError;
use chanmesh_shared::{
    encode_control, AccessError, ChangeNotification, ChannelEndId, ChannelName, FatalError, Frame,
    FrameBody, OrganiserError, ReadToken, ReaderConfig, TimeWindow, WriteToken, WriterConfig,
};
use chanmesh_test::TestCluster;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Injects `payload` into node 0's request channel as if node 1 had written
/// it.
fn inject_request(cluster: &TestCluster, payload: Box<[u8]>) {
    let sender = ChannelEndId::new(1, 0);
    let entry = cluster
        .with_end(1, &ChannelName::request(), |end| {
            end.entry_keys()
                .into_iter()
                .find(|key| key.origin == sender)
                .map(|key| key.index)
        })
        .flatten()
        .expect("node 1 has no request writer");

    let frame = Frame {
        sender,
        destination: ChannelEndId::new(0, 0),
        body: FrameBody::Value {
            entry,
            window: TimeWindow::event(1_000),
            payload,
        },
    };
    cluster
        .context(0)
        .coordinator()
        .receive_frame(&frame.to_bytes());
}

fn count_safe_mode(cluster: &mut TestCluster) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    cluster.node_mut(0).on_safe_mode(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    calls
}

/// Garbage on the request channel stops node 0 and calls the callback once.
#[test]
fn undecodable_change_notification_stops_node_zero() {
    init();
    let mut cluster = TestCluster::new(2);
    cluster.settle();
    let calls = count_safe_mode(&mut cluster);

    inject_request(&cluster, vec![0xff].into_boxed_slice());

    let result = cluster.node_mut(0).pump();
    assert!(matches!(
        result,
        Err(NodeError::SafetyStop(FatalError::CorruptControlMessage { .. }))
    ));
    assert!(cluster.node(0).is_stopped());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(matches!(
        cluster.node_mut(0).pump(),
        Err(NodeError::SafetyStop(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // other nodes keep pumping
    assert!(cluster.node_mut(1).pump().is_ok());
}

/// Removing an end the organiser never recorded is a corrupted organiser.
#[test]
fn removal_of_unknown_end_stops_node_zero() {
    init();
    let mut cluster = TestCluster::new(2);
    cluster.settle();
    let calls = count_safe_mode(&mut cluster);

    let note = ChangeNotification::RemoveEnd {
        name: ChannelName::from("ghost"),
        end_id: ChannelEndId::new(1, 40),
    };
    inject_request(&cluster, encode_control(&note));

    let result = cluster.node_mut(0).pump();
    assert!(matches!(
        result,
        Err(NodeError::SafetyStop(FatalError::CorruptedOrganiserState(
            OrganiserError::UnknownEnd { .. }
        )))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cluster.try_settle().is_err());
}

/// The pump that latches the fault runs no reactions, and tokens refuse
/// access from then on.
#[test]
fn stopping_pump_runs_no_reactions() {
    init();
    let mut cluster = TestCluster::new(2);
    let context = cluster.context(0);
    let mut writer =
        WriteToken::open(&context, "demo", WriterConfig::new("speed", "telemetry")).unwrap();
    let mut reader = ReadToken::open(&context, "demo", ReaderConfig::default()).unwrap();
    cluster.settle();
    assert!(writer.is_valid());

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    context.on_data(&reader, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let calls = count_safe_mode(&mut cluster);

    writer.write(TimeWindow::stream(0, 10), &1_u32).unwrap();
    inject_request(&cluster, vec![0xff].into_boxed_slice());

    assert!(matches!(
        cluster.node_mut(0).pump(),
        Err(NodeError::SafetyStop(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(context.dispatch_reactions(), 0);

    assert!(!writer.is_valid());
    assert_eq!(
        writer.write(TimeWindow::stream(10, 20), &2_u32),
        Err(AccessError::SafetyStop)
    );
    assert_eq!(reader.acquire(5).err(), Some(AccessError::SafetyStop));
}
