use log::{info, warn};

use chanmesh_shared::{ChannelContext, FatalError, NodeIndex};

use crate::{
    diagnostics::DiagnosticService,
    error::NodeError,
    node_config::NodeConfig,
    transport::{PacketReceiver, PacketSender},
};

/// What one call to `Node::pump` did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub received: usize,
    pub control: usize,
    pub answered: usize,
    pub sent: usize,
    pub reactions: usize,
}

impl PumpReport {
    /// Whether the pump moved nothing at all.
    pub fn is_idle(&self) -> bool {
        self.received == 0
            && self.control == 0
            && self.answered == 0
            && self.sent == 0
            && self.reactions == 0
    }
}

/// One node of a chanmesh cluster.
///
/// Owns the node's `ChannelContext` and moves frames between it and the
/// transport. The node makes progress only when `pump` is called.
pub struct Node {
    config: NodeConfig,
    context: ChannelContext,
    sender: Box<dyn PacketSender>,
    receiver: Box<dyn PacketReceiver>,
    diagnostics: Option<DiagnosticService>,
    safe_mode: Option<Box<dyn FnMut(&FatalError) + Send>>,
    stopped: Option<FatalError>,
}

impl Node {
    pub fn new(
        config: NodeConfig,
        sender: Box<dyn PacketSender>,
        receiver: Box<dyn PacketReceiver>,
    ) -> Result<Self, NodeError> {
        let context =
            ChannelContext::new(config.coordinator.clone()).map_err(NodeError::Bootstrap)?;
        let diagnostics = if config.diagnostics {
            Some(DiagnosticService::open(&context)?)
        } else {
            None
        };

        info!(
            "Node {} started (diagnostics {})",
            config.coordinator.location,
            if config.diagnostics { "on" } else { "off" }
        );

        Ok(Self {
            config,
            context,
            sender,
            receiver,
            diagnostics,
            safe_mode: None,
            stopped: None,
        })
    }

    pub fn location(&self) -> NodeIndex {
        self.config.coordinator.location
    }

    pub fn context(&self) -> &ChannelContext {
        &self.context
    }

    /// Called once, with the fatal condition, when the node stops.
    pub fn on_safe_mode<F>(&mut self, callback: F)
    where
        F: FnMut(&FatalError) + Send + 'static,
    {
        self.safe_mode = Some(Box::new(callback));
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }

    /// Receives pending frames, runs the control protocol, answers
    /// diagnostics, sends queued frames and fires due reactions.
    pub fn pump(&mut self) -> Result<PumpReport, NodeError> {
        if let Some(fatal) = &self.stopped {
            return Err(NodeError::SafetyStop(fatal.clone()));
        }

        let mut report = PumpReport::default();

        {
            let mut coordinator = self.context.coordinator();
            for _ in 0..self.config.max_frames_per_pump {
                match self.receiver.receive() {
                    Ok(Some((_, payload))) => {
                        coordinator.receive_frame(payload);
                        report.received += 1;
                    }
                    Ok(None) => break,
                    Err(_) => return Err(NodeError::Receive),
                }
            }
            report.control = coordinator.process_control();
        }
        self.check_fatal()?;

        if let Some(service) = &mut self.diagnostics {
            report.answered = service.poll(&self.context);
        }
        self.check_fatal()?;

        let outgoing = self.context.coordinator().take_outgoing();
        for (node, payload) in outgoing {
            if self.sender.send(node, &payload).is_err() {
                warn!("Node {} could not reach node {}", self.location(), node);
                return Err(NodeError::Send { node });
            }
            report.sent += 1;
        }

        report.reactions = self.context.dispatch_reactions();
        self.check_fatal()?;
        Ok(report)
    }

    /// Stops the node as soon as the coordinator has latched a fatal error,
    /// before anything else runs.
    fn check_fatal(&mut self) -> Result<(), NodeError> {
        let fatal = self.context.coordinator().fatal().cloned();
        match fatal {
            Some(fatal) => {
                self.stop(fatal.clone());
                Err(NodeError::SafetyStop(fatal))
            }
            None => Ok(()),
        }
    }

    fn stop(&mut self, fatal: FatalError) {
        if let Some(callback) = &mut self.safe_mode {
            callback(&fatal);
        }
        self.stopped = Some(fatal);
    }
}
