use std::collections::HashMap;

use log::warn;

use chanmesh_shared::{
    AccessError, ChannelContext, ChannelEndId, ReadToken, ReaderConfig, Tick, TimeWindow,
    WriteToken,
};

use super::{
    drain_class, event_writer,
    messages::{
        count_request_channel, count_result_channel, monitor_request_channel,
        monitor_result_channel, CountRequest, CountResult, MonitorRequest, MonitorResult,
    },
    REQUEST_CLASS, RESULT_CLASS,
};

/// Issues diagnostic requests and collects the answers.
pub struct DiagnosticClient {
    count_requests: WriteToken,
    count_results: ReadToken,
    monitor_requests: WriteToken,
    monitor_results: ReadToken,
    tick: Tick,
    counts: HashMap<ChannelEndId, u64>,
    monitors: HashMap<ChannelEndId, MonitorResult>,
}

impl DiagnosticClient {
    pub fn open(context: &ChannelContext) -> Result<Self, AccessError> {
        let label = format!("client-{}", context.location());
        Ok(Self {
            count_requests: WriteToken::open(
                context,
                count_request_channel(),
                event_writer(label.clone(), REQUEST_CLASS),
            )?,
            count_results: ReadToken::open(
                context,
                count_result_channel(),
                ReaderConfig::sequential(),
            )?,
            monitor_requests: WriteToken::open(
                context,
                monitor_request_channel(),
                event_writer(label, REQUEST_CLASS),
            )?,
            monitor_results: ReadToken::open(
                context,
                monitor_result_channel(),
                ReaderConfig::sequential(),
            )?,
            tick: 0,
            counts: HashMap::new(),
            monitors: HashMap::new(),
        })
    }

    pub fn is_valid(&self) -> bool {
        self.count_requests.is_valid() && self.monitor_requests.is_valid()
    }

    pub fn request_count(&mut self, id: ChannelEndId) -> Result<(), AccessError> {
        let window = self.next_window();
        self.count_requests.write(window, &CountRequest { id })
    }

    pub fn request_monitor(&mut self, id: ChannelEndId) -> Result<(), AccessError> {
        let window = self.next_window();
        self.monitor_requests.write(window, &MonitorRequest { id })
    }

    /// Collects every answer received so far. Returns how many arrived.
    pub fn poll(&mut self) -> usize {
        let mut received = 0;
        for access in drain_class(&mut self.count_results, RESULT_CLASS) {
            match access.value::<CountResult>() {
                Ok(result) => {
                    self.counts.insert(result.id, result.buffered);
                    received += 1;
                }
                Err(error) => warn!("Dropped count result: {}", error),
            }
        }
        for access in drain_class(&mut self.monitor_results, RESULT_CLASS) {
            match access.value::<MonitorResult>() {
                Ok(result) => {
                    self.monitors.insert(result.id, result);
                    received += 1;
                }
                Err(error) => warn!("Dropped monitor result: {}", error),
            }
        }
        received
    }

    pub fn count(&self, id: &ChannelEndId) -> Option<u64> {
        self.counts.get(id).copied()
    }

    pub fn monitor(&self, id: &ChannelEndId) -> Option<&MonitorResult> {
        self.monitors.get(id)
    }

    fn next_window(&mut self) -> TimeWindow {
        self.tick += 1;
        TimeWindow::event(self.tick)
    }
}
