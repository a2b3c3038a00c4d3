/// INTEGRATION TESTS: Count and monitor requests
///
/// Every node runs a diagnostic service. A client on any node writes a
/// request naming a channel end; the node hosting that end answers on the
/// result channel and the client collects the answer.
use chanmesh_node::diagnostics::{DiagnosticClient, Rendering};
use chanmesh_shared::{
    ChannelEndId, ChannelName, PackingMode, ReadToken, ReaderConfig, TimeWindow, WriteToken,
    WriterConfig,
};
use chanmesh_test::TestCluster;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn linked_client(cluster: &mut TestCluster) -> DiagnosticClient {
    let client = DiagnosticClient::open(&cluster.context(0)).unwrap();
    cluster.settle();
    assert!(client.is_valid());
    client
}

fn end_id(cluster: &TestCluster, node: u16, name: &str) -> ChannelEndId {
    cluster
        .with_end(node, &ChannelName::from(name), |end| end.id())
        .unwrap()
}

#[test]
fn count_reports_buffered_values_of_remote_end() {
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

    let mut client = linked_client(&mut cluster);
    let id = end_id(&cluster, 1, "demo");
    client.request_count(id).unwrap();
    cluster.settle();

    assert_eq!(client.poll(), 1);
    assert_eq!(client.count(&id), Some(1));
}

#[test]
fn monitor_renders_text_payload() {
    init();
    let mut cluster = TestCluster::new(3);
    let mut writer = WriteToken::open(
        &cluster.context(2),
        "status",
        WriterConfig::new("banner", "text").with_packing(PackingMode::Text),
    )
    .unwrap();
    cluster.settle();
    writer.acquire().unwrap().put_bytes(b"hello");
    writer.release(TimeWindow::stream(5, 6)).unwrap();

    let mut client = linked_client(&mut cluster);
    let id = end_id(&cluster, 2, "status");
    client.request_monitor(id).unwrap();
    cluster.settle();
    client.poll();

    let sample = client
        .monitor(&id)
        .and_then(|result| result.sample.clone())
        .unwrap();
    assert_eq!(sample.label, "banner");
    assert_eq!(sample.window, TimeWindow::stream(5, 6));
    assert_eq!(sample.rendering, Rendering::Text("hello".to_string()));
}

/// An end with nothing stored still gets an answer, just without a sample.
#[test]
fn monitor_of_empty_end_has_no_sample() {
    init();
    let mut cluster = TestCluster::new(2);
    let _reader = ReadToken::open(&cluster.context(1), "quiet", ReaderConfig::default()).unwrap();
    cluster.settle();

    let mut client = linked_client(&mut cluster);
    let id = end_id(&cluster, 1, "quiet");
    client.request_monitor(id).unwrap();
    cluster.settle();

    assert_eq!(client.poll(), 1);
    let result = client.monitor(&id).unwrap();
    assert_eq!(result.sample, None);
}

/// Requests for ends nobody hosts are never answered.
#[test]
fn unknown_end_gets_no_answer() {
    init();
    let mut cluster = TestCluster::new(2);
    let mut client = linked_client(&mut cluster);
    let id = ChannelEndId::new(1, 99);
    client.request_count(id).unwrap();
    cluster.settle();

    assert_eq!(client.poll(), 0);
    assert_eq!(client.count(&id), None);
}

/// With diagnostics turned off no service channels are opened.
#[test]
fn disabled_diagnostics_open_no_channels() {
    init();
    let mut cluster = TestCluster::with_config(2, |config| config.diagnostics = false);
    cluster.settle();

    for node in 0..2_u16 {
        let context = cluster.context(node);
        let ends = context.coordinator().registry().len();
        assert_eq!(ends, 2);
    }
}
