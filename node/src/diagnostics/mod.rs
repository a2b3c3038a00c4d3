//! Count and monitor requests answered over four well-known channels.
//!
//! Requests and results are ordinary channel values: clients write requests
//! as Event values, every node's `DiagnosticService` reads them and answers
//! the ones naming an end hosted on its own node.

mod client;
mod messages;
mod service;

pub use client::DiagnosticClient;
pub use messages::{
    count_request_channel, count_result_channel, monitor_request_channel,
    monitor_result_channel, CountRequest, CountResult, MonitorRequest, MonitorResult,
    MonitorSample, Rendering,
};
pub use service::DiagnosticService;

use chanmesh_shared::{ReadAccess, ReadToken, Tick, TimeAspect, WriterConfig};

const REQUEST_CLASS: &str = "diag.request";
const RESULT_CLASS: &str = "diag.result";

fn event_writer(label: String, data_class: &str) -> WriterConfig {
    WriterConfig::new(label, data_class).with_aspect(TimeAspect::Event)
}

/// Reads and consumes every pending value of `data_class`, entry by entry.
fn drain_class(token: &mut ReadToken, data_class: &str) -> Vec<ReadAccess> {
    let mut output = Vec::new();
    if !token.is_valid() {
        return output;
    }

    let mut selected = token.select_first(data_class);
    while selected {
        while let Ok(access) = token.acquire(Tick::MAX) {
            output.push(access);
            if token.release_consuming().is_err() {
                break;
            }
        }
        selected = token.select_next();
    }
    output
}
