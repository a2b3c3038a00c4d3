use log::{debug, warn};

use chanmesh_shared::{
    AccessError, ChannelContext, ReadToken, ReaderConfig, Serde, Tick, TimeWindow, WriteToken,
};

use super::{
    drain_class, event_writer,
    messages::{
        count_request_channel, count_result_channel, monitor_request_channel,
        monitor_result_channel, CountRequest, CountResult, MonitorRequest, MonitorResult,
        MonitorSample, Rendering,
    },
    REQUEST_CLASS, RESULT_CLASS,
};

/// Answers diagnostic requests for ends hosted on this node.
pub struct DiagnosticService {
    count_requests: ReadToken,
    count_results: WriteToken,
    monitor_requests: ReadToken,
    monitor_results: WriteToken,
    tick: Tick,
}

impl DiagnosticService {
    pub fn open(context: &ChannelContext) -> Result<Self, AccessError> {
        let label = format!("service-{}", context.location());
        Ok(Self {
            count_requests: ReadToken::open(
                context,
                count_request_channel(),
                ReaderConfig::sequential(),
            )?,
            count_results: WriteToken::open(
                context,
                count_result_channel(),
                event_writer(label.clone(), RESULT_CLASS),
            )?,
            monitor_requests: ReadToken::open(
                context,
                monitor_request_channel(),
                ReaderConfig::sequential(),
            )?,
            monitor_results: WriteToken::open(
                context,
                monitor_result_channel(),
                event_writer(label, RESULT_CLASS),
            )?,
            tick: 0,
        })
    }

    /// Answers every pending request. Requests stay queued until the matching
    /// result channel is linked. Returns the number of answers written.
    pub fn poll(&mut self, context: &ChannelContext) -> usize {
        let mut answered = 0;

        if self.count_results.is_valid() {
            for access in drain_class(&mut self.count_requests, REQUEST_CLASS) {
                let Ok(request) = access.value::<CountRequest>() else {
                    warn!("Dropped undecodable count request");
                    continue;
                };
                let buffered = {
                    let coordinator = context.coordinator();
                    if !coordinator.has_local_end(&request.id) {
                        continue;
                    }
                    coordinator.buffered_count(&request.id).unwrap_or(0)
                };
                let result = CountResult {
                    id: request.id,
                    buffered: buffered as u64,
                };
                if self.answer_count(&result) {
                    answered += 1;
                }
            }
        }

        if self.monitor_results.is_valid() {
            for access in drain_class(&mut self.monitor_requests, REQUEST_CLASS) {
                let Ok(request) = access.value::<MonitorRequest>() else {
                    warn!("Dropped undecodable monitor request");
                    continue;
                };
                let snapshot = {
                    let coordinator = context.coordinator();
                    if !coordinator.has_local_end(&request.id) {
                        continue;
                    }
                    coordinator.latest_value(&request.id)
                };
                let result = MonitorResult {
                    id: request.id,
                    sample: snapshot.map(|snapshot| MonitorSample {
                        entry: snapshot.entry,
                        label: snapshot.descriptor.label,
                        window: snapshot.value.window,
                        rendering: Rendering::of(
                            snapshot.descriptor.packing,
                            &snapshot.value.payload,
                        ),
                    }),
                };
                if self.answer_monitor(&result) {
                    answered += 1;
                }
            }
        }

        answered
    }

    fn next_window(&mut self) -> TimeWindow {
        self.tick += 1;
        TimeWindow::event(self.tick)
    }

    fn answer_count(&mut self, result: &CountResult) -> bool {
        let window = self.next_window();
        write_result(&mut self.count_results, window, result)
    }

    fn answer_monitor(&mut self, result: &MonitorResult) -> bool {
        let window = self.next_window();
        write_result(&mut self.monitor_results, window, result)
    }
}

fn write_result<T: Serde>(token: &mut WriteToken, window: TimeWindow, result: &T) -> bool {
    match token.write(window, result) {
        Ok(()) => {
            debug!("Answered diagnostic request on {}", token.name());
            true
        }
        Err(error) => {
            warn!("Diagnostic answer on {} failed: {}", token.name(), error);
            false
        }
    }
}
