use std::collections::HashMap;

use log::{debug, error, info, trace, warn};

use crate::{
    channel::{
        channel_end::ChannelEnd,
        frame::Frame,
        reader::{ReaderConfig, ReaderId},
        writer::WriterConfig,
    },
    control::{self, change_notification::ChangeNotification, link_update::LinkUpdate},
    coordinator::config::CoordinatorConfig,
    end_arena::EndHandle,
    error::{AccessError, FatalError, OrganiserError, RegistryError},
    identity::{channel_end_id::ChannelEndId, channel_name::ChannelName},
    organiser::ChannelOrganiser,
    registry::LocalRegistry,
    store::{
        entry::{EntryKey, StoredValue},
        entry_descriptor::{Arity, EntryDescriptor, TimeAspect, TransportClass},
        time_window::TimeWindow,
    },
    types::{EntryIndex, NodeIndex, ObjectIndex, Tick},
};

const REQUEST_OBJECT: ObjectIndex = 0;
const UPDATE_OBJECT: ObjectIndex = 1;

#[derive(Clone, Copy)]
struct ControlEnds {
    request: EndHandle,
    update: EndHandle,
    request_writer: EntryIndex,
    update_writer: Option<EntryIndex>,
    request_reader: Option<ReaderId>,
    update_reader: ReaderId,
}

/// A copy of the newest value held by an end, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueSnapshot {
    pub entry: EntryKey,
    pub descriptor: EntryDescriptor,
    pub value: StoredValue,
}

/// Per-node mediator between the local registry and the channel organisers.
///
/// Ends ask for an id with `NewEnd` on the request channel and wait in the
/// wait room until node 0 answers with `IdIssued` on the update channel. Both
/// control channels are ordinary Event channels of this same core, created
/// during bootstrap with local ids: the request channel always gets object 0
/// and the update channel object 1.
///
/// Node 0 additionally owns one `ChannelOrganiser` per channel.
pub struct RegistryCoordinator {
    config: CoordinatorConfig,
    registry: LocalRegistry,
    organisers: Option<HashMap<ChannelName, ChannelOrganiser>>,
    bootstrapping: bool,
    control: Option<ControlEnds>,
    control_tick: Tick,
    fatal: Option<FatalError>,
}

impl RegistryCoordinator {
    pub fn new(config: CoordinatorConfig) -> Result<Self, FatalError> {
        let location = config.location;
        let organisers = if location == 0 {
            Some(HashMap::new())
        } else {
            None
        };

        let mut coordinator = Self {
            config,
            registry: LocalRegistry::new(location),
            organisers,
            bootstrapping: true,
            control: None,
            control_tick: 0,
            fatal: None,
        };

        let request = coordinator.request_link(&ChannelName::request())?;
        let update = coordinator.request_link(&ChannelName::update())?;
        coordinator.bootstrapping = false;
        if let Some(fatal) = coordinator.fatal.take() {
            return Err(fatal);
        }

        let control_writer = WriterConfig::new("control", "chanmesh.control")
            .with_aspect(TimeAspect::Event);

        let request_writer = coordinator
            .control_end_mut(&request, ChannelName::request())?
            .open_write_entry(&control_writer)
            .map_err(|source| FatalError::IrregularControlWrite {
                channel: ChannelName::request(),
                source,
            })?;
        let request_reader = if location == 0 {
            Some(
                coordinator
                    .control_end_mut(&request, ChannelName::request())?
                    .attach_reader(ReaderConfig::sequential()),
            )
        } else {
            None
        };

        let update_end = coordinator.control_end_mut(&update, ChannelName::update())?;
        let update_writer = if location == 0 {
            Some(
                update_end
                    .open_write_entry(&control_writer)
                    .map_err(|source| FatalError::IrregularControlWrite {
                        channel: ChannelName::update(),
                        source,
                    })?,
            )
        } else {
            None
        };
        let update_reader = update_end.attach_reader(ReaderConfig::sequential());

        coordinator.control = Some(ControlEnds {
            request,
            update,
            request_writer,
            update_writer,
            request_reader,
            update_reader,
        });

        info!(
            "Node {} of {} bootstrapped control channels",
            location, coordinator.config.node_count
        );
        Ok(coordinator)
    }

    pub fn location(&self) -> NodeIndex {
        self.config.location
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &LocalRegistry {
        &self.registry
    }

    /// The organiser of `name`, on node 0 only.
    pub fn organiser(&self, name: &ChannelName) -> Option<&ChannelOrganiser> {
        self.organisers.as_ref()?.get(name)
    }

    /// The condition that stopped this node, if any.
    pub fn fatal(&self) -> Option<&FatalError> {
        self.fatal.as_ref()
    }

    fn control_end_mut(
        &mut self,
        handle: &EndHandle,
        channel: ChannelName,
    ) -> Result<&mut ChannelEnd, FatalError> {
        self.registry
            .get_mut(handle)
            .map(|entry| &mut entry.end)
            .ok_or(FatalError::IrregularControlWrite {
                channel,
                source: AccessError::MissingChannelEnd,
            })
    }

    fn latch(&mut self, fatal: FatalError) {
        if self.fatal.is_none() {
            error!("Node {} safety stop: {}", self.config.location, fatal);
            self.fatal = Some(fatal);
        }
    }

    // Linking protocol

    /// Returns the end for `name`, creating it and requesting its id if the
    /// node has none yet. Linkage completes later, when the updates arrive.
    pub fn request_link(&mut self, name: &ChannelName) -> Result<EndHandle, RegistryError> {
        if let Some(handle) = self.registry.find(name) {
            return Ok(handle);
        }

        if let Some(handle) = self.registry.wait_room().get(name) {
            let idle = self
                .registry
                .get(&handle)
                .map(|entry| entry.end.is_closing() && entry.end.attachments() == 0)
                .unwrap_or(false);
            if idle {
                debug!("Channel {} reopened while waiting for its id", name);
                self.registry.revive(&handle)?;
                return Ok(handle);
            }
        }

        let handle = self.registry.reserve(name)?;
        let id = ChannelEndId::new(self.config.location, handle.object());

        if self.bootstrapping {
            for update in self.bootstrap_updates(name, id) {
                self.on_update(&update);
            }
        } else {
            self.registry.wait_room_mut().stage(name.clone(), handle);
            self.send_notification(ChangeNotification::NewEnd {
                name: name.clone(),
                requester_id: id,
            });
        }
        Ok(handle)
    }

    /// The updates node 0 would have issued for a control channel end.
    fn bootstrap_updates(&self, name: &ChannelName, id: ChannelEndId) -> Vec<LinkUpdate> {
        let location = self.config.location;
        let mut updates = vec![LinkUpdate::IdIssued {
            name: name.clone(),
            id,
        }];

        let master = if *name == ChannelName::update() {
            ChannelEndId::new(0, UPDATE_OBJECT)
        } else {
            id
        };
        updates.push(LinkUpdate::SetMaster {
            end: id,
            master,
            transport_class: TransportClass::Socket,
            arity: Arity::OneOrMore,
        });

        if *name == ChannelName::request() && location != 0 {
            updates.push(LinkUpdate::AddDestination {
                end: id,
                destination: ChannelEndId::new(0, REQUEST_OBJECT),
            });
        }
        if *name == ChannelName::update() && location == 0 {
            for node in 1..self.config.node_count {
                updates.push(LinkUpdate::AddDestination {
                    end: id,
                    destination: ChannelEndId::new(node, UPDATE_OBJECT),
                });
            }
        }
        updates
    }

    /// Tells node 0 that `end_id` writes to `name`. Ignored while
    /// bootstrapping.
    pub fn report_writer(
        &mut self,
        end_id: ChannelEndId,
        name: &ChannelName,
        transport_class: TransportClass,
        arity: Arity,
    ) {
        if self.bootstrapping {
            return;
        }
        self.send_notification(ChangeNotification::IsWritingEnd {
            name: name.clone(),
            end_id,
            transport_class,
            arity,
        });
    }

    /// Applies one update delivered by the update channel. A contradiction
    /// with local state stops the node.
    pub fn on_update(&mut self, update: &LinkUpdate) {
        if let Err(fatal) = self.apply_update(update) {
            self.latch(fatal);
        }
    }

    fn apply_update(&mut self, update: &LinkUpdate) -> Result<(), FatalError> {
        let target = update.target();

        if target.location != self.config.location {
            if let LinkUpdate::DeleteEnd { end } = update {
                for (_, entry) in self.registry.iter_mut() {
                    if entry.end.forget_peer(end) {
                        trace!("End {} dropped deleted peer {}", entry.end.id(), end);
                    }
                }
            }
            return Ok(());
        }

        match update {
            LinkUpdate::IdIssued { name, id } => {
                let handle = self.registry.issue(name, *id)?;
                let entry = self
                    .registry
                    .get_mut(&handle)
                    .ok_or(RegistryError::StaleHandle {
                        object: handle.object(),
                    })?;
                entry.end.apply(update)?;

                if entry.end.is_closing() {
                    debug!("End {} of {} was closed before its id arrived", id, name);
                    self.send_notification(ChangeNotification::RemoveEnd {
                        name: name.clone(),
                        end_id: *id,
                    });
                } else {
                    let writers = entry.end.take_unreported_writers();
                    for (transport_class, arity) in writers {
                        self.report_writer(*id, name, transport_class, arity);
                    }
                }
            }
            LinkUpdate::DeleteEnd { end } => match self.registry.handle_for_id(end) {
                Some(handle) => {
                    self.registry.free(&handle);
                }
                None => debug!("End {} already freed", end),
            },
            LinkUpdate::SetMaster { .. } | LinkUpdate::AddDestination { .. } => {
                let handle = self.registry.handle_for_id(&target).ok_or_else(|| {
                    FatalError::AcknowledgementMismatch {
                        name: ChannelName::update(),
                        details: format!("update addressed to unknown end {}", target),
                    }
                })?;
                if let Some(entry) = self.registry.get_mut(&handle) {
                    entry.end.apply(update)?;
                }
            }
        }
        Ok(())
    }

    /// Runs one change notification through the organiser of its channel.
    /// Only node 0 hosts organisers.
    pub fn on_change_request(&mut self, note: &ChangeNotification) -> Result<(), RegistryError> {
        let Some(organisers) = self.organisers.as_mut() else {
            return Err(RegistryError::NotNodeZero);
        };

        let name = note.name().clone();
        let organiser = organisers
            .entry(name.clone())
            .or_insert_with(|| ChannelOrganiser::new(name.clone()));
        let result = organiser.handle(note);
        if organiser.is_empty() {
            organisers.remove(&name);
        }

        match result {
            Ok(updates) => {
                for update in updates {
                    self.publish_update(&update);
                }
            }
            Err(OrganiserError::DistributionClash { name, reason }) => {
                warn!("Dropped writer request on {}: {}", name, reason);
            }
            Err(other) => self.latch(FatalError::CorruptedOrganiserState(other)),
        }
        Ok(())
    }

    fn send_notification(&mut self, note: ChangeNotification) {
        let Some(control) = self.control else {
            self.latch(FatalError::IrregularControlWrite {
                channel: ChannelName::request(),
                source: AccessError::MissingChannelEnd,
            });
            return;
        };
        let payload = control::encode(&note);
        self.write_control(
            control.request,
            control.request_writer,
            ChannelName::request(),
            payload,
        );
    }

    fn publish_update(&mut self, update: &LinkUpdate) {
        let Some((handle, writer)) = self
            .control
            .and_then(|control| control.update_writer.map(|writer| (control.update, writer)))
        else {
            self.latch(FatalError::IrregularControlWrite {
                channel: ChannelName::update(),
                source: AccessError::MissingChannelEnd,
            });
            return;
        };
        trace!("Publishing {:?}", update);
        let payload = control::encode(update);
        self.write_control(handle, writer, ChannelName::update(), payload);
    }

    fn write_control(
        &mut self,
        handle: EndHandle,
        writer: EntryIndex,
        channel: ChannelName,
        payload: Box<[u8]>,
    ) {
        self.control_tick += 1;
        let window = TimeWindow::event(self.control_tick);
        let result = match self.registry.get_mut(&handle) {
            Some(entry) => entry.end.commit(writer, window, payload).map(|_| ()),
            None => Err(AccessError::MissingChannelEnd),
        };
        if let Err(source) = result {
            self.latch(FatalError::IrregularControlWrite { channel, source });
        }
    }

    /// Drains both control channels until neither yields anything new, or
    /// the batch limit is hit. Returns the number of control messages
    /// handled.
    pub fn process_control(&mut self) -> usize {
        let Some(control) = self.control else {
            return 0;
        };

        let mut handled = 0;
        for _ in 0..self.config.control_batch_limit {
            if self.fatal.is_some() {
                break;
            }
            let mut progress = false;

            if let Some(reader) = control.request_reader {
                for (_, value) in self.drain(&control.request, reader) {
                    progress = true;
                    handled += 1;
                    match control::decode::<ChangeNotification>(&value.payload) {
                        Ok(note) => {
                            if let Err(refused) = self.on_change_request(&note) {
                                warn!("Change request refused: {}", refused);
                            }
                        }
                        Err(_) => self.latch(FatalError::CorruptControlMessage {
                            channel: ChannelName::request(),
                            reason: "undecodable change notification",
                        }),
                    }
                    if self.fatal.is_some() {
                        return handled;
                    }
                }
            }

            for (_, value) in self.drain(&control.update, control.update_reader) {
                progress = true;
                handled += 1;
                match control::decode::<LinkUpdate>(&value.payload) {
                    Ok(update) => self.on_update(&update),
                    Err(_) => self.latch(FatalError::CorruptControlMessage {
                        channel: ChannelName::update(),
                        reason: "undecodable link update",
                    }),
                }
                if self.fatal.is_some() {
                    return handled;
                }
            }

            if !progress {
                break;
            }
        }
        handled
    }

    fn drain(&mut self, handle: &EndHandle, reader: ReaderId) -> Vec<(EntryKey, StoredValue)> {
        match self.registry.get_mut(handle) {
            Some(entry) => entry.end.drain_sequential(reader),
            None => Vec::new(),
        }
    }

    // Data plane

    /// Stores one frame received from the transport.
    pub fn receive_frame(&mut self, bytes: &[u8]) {
        let frame = match Frame::from_bytes(bytes) {
            Ok(frame) => frame,
            Err(_) => {
                warn!("Dropped malformed frame of {} bytes", bytes.len());
                return;
            }
        };

        let Some(handle) = self.registry.handle_for_id(&frame.destination) else {
            trace!("Dropped frame for missing end {}", frame.destination);
            return;
        };
        if let Some(entry) = self.registry.get_mut(&handle) {
            entry.end.receive(frame);
        }
    }

    /// Every frame queued by local ends, addressed by destination node.
    pub fn take_outgoing(&mut self) -> Vec<(NodeIndex, Box<[u8]>)> {
        let mut output = Vec::new();
        for (_, entry) in self.registry.iter_mut() {
            for frame in entry.end.take_outgoing() {
                output.push((frame.destination.location, frame.to_bytes()));
            }
        }
        output
    }

    /// Ends that stored new data since the last call, with the newest tick
    /// seen. Control channels are left out.
    pub fn take_data_events(&mut self) -> Vec<(EndHandle, Tick)> {
        let mut output = Vec::new();
        for (handle, entry) in self.registry.iter_mut() {
            let latest = entry.end.take_latest_data();
            if entry.name.is_control() {
                continue;
            }
            if let Some(tick) = latest {
                output.push((handle, tick));
            }
        }
        output
    }

    // Token surface

    pub(crate) fn open_writer(
        &mut self,
        name: &ChannelName,
        config: &WriterConfig,
    ) -> Result<(EndHandle, EntryIndex), AccessError> {
        let handle = self.attach(name)?;
        let entry = self
            .registry
            .get_mut(&handle)
            .ok_or(AccessError::MissingChannelEnd)?;

        let index = match entry.end.open_write_entry(config) {
            Ok(index) => index,
            Err(refused) => {
                self.maybe_close(handle);
                return Err(refused);
            }
        };

        if let Some(id) = entry.id {
            let writers = entry.end.take_unreported_writers();
            for (transport_class, arity) in writers {
                self.report_writer(id, name, transport_class, arity);
            }
        }
        Ok((handle, index))
    }

    pub(crate) fn close_writer(&mut self, handle: EndHandle, index: EntryIndex) {
        if let Some(entry) = self.registry.get_mut(&handle) {
            entry.end.close_write_entry(index);
            self.maybe_close(handle);
        }
    }

    pub(crate) fn open_reader(
        &mut self,
        name: &ChannelName,
        config: ReaderConfig,
    ) -> Result<(EndHandle, ReaderId), AccessError> {
        let handle = self.attach(name)?;
        let entry = self
            .registry
            .get_mut(&handle)
            .ok_or(AccessError::MissingChannelEnd)?;
        Ok((handle, entry.end.attach_reader(config)))
    }

    pub(crate) fn close_reader(&mut self, handle: EndHandle, reader: ReaderId) {
        if let Some(entry) = self.registry.get_mut(&handle) {
            entry.end.detach_reader(reader);
            self.maybe_close(handle);
        }
    }

    fn attach(&mut self, name: &ChannelName) -> Result<EndHandle, AccessError> {
        if name.is_control() {
            return Err(AccessError::DistributionClash {
                reason: "control channels are reserved",
            });
        }
        self.request_link(name).map_err(|refused| {
            warn!("Could not link {}: {}", name, refused);
            AccessError::MissingChannelEnd
        })
    }

    pub(crate) fn live_end(&self, handle: &EndHandle) -> Result<&ChannelEnd, AccessError> {
        if self.fatal.is_some() {
            return Err(AccessError::SafetyStop);
        }
        match self.registry.get(handle) {
            Some(entry) if !entry.end.is_closing() => Ok(&entry.end),
            _ => Err(AccessError::MissingChannelEnd),
        }
    }

    pub(crate) fn live_end_mut(&mut self, handle: &EndHandle) -> Result<&mut ChannelEnd, AccessError> {
        if self.fatal.is_some() {
            return Err(AccessError::SafetyStop);
        }
        match self.registry.get_mut(handle) {
            Some(entry) if !entry.end.is_closing() => Ok(&mut entry.end),
            _ => Err(AccessError::MissingChannelEnd),
        }
    }

    pub(crate) fn write_valid(&self, handle: &EndHandle, index: EntryIndex) -> bool {
        self.live_end(handle)
            .map(|end| end.write_entry_valid(index))
            .unwrap_or(false)
    }

    pub(crate) fn read_valid(&self, handle: &EndHandle) -> bool {
        self.live_end(handle)
            .map(|end| end.is_linked())
            .unwrap_or(false)
    }

    fn maybe_close(&mut self, handle: EndHandle) {
        let idle = self
            .registry
            .get(&handle)
            .map(|entry| {
                !entry.name.is_control() && !entry.end.is_closing() && entry.end.attachments() == 0
            })
            .unwrap_or(false);
        if idle {
            self.close_end(handle);
        }
    }

    fn close_end(&mut self, handle: EndHandle) {
        self.registry.detach_name(&handle);
        let Some(entry) = self.registry.get(&handle) else {
            return;
        };
        match entry.id {
            Some(id) => {
                let name = entry.name.clone();
                debug!("Removing end {} of {}", id, name);
                self.send_notification(ChangeNotification::RemoveEnd { name, end_id: id });
            }
            None => debug!("End of {} closes before its id was issued", entry.name),
        }
    }

    /// Closes this node's end of `name`. Tokens still attached to it observe
    /// `MissingChannelEnd` from now on.
    pub fn remove_end(&mut self, name: &ChannelName) -> bool {
        if name.is_control() {
            return false;
        }
        match self.registry.find(name) {
            Some(handle) => {
                self.close_end(handle);
                true
            }
            None => false,
        }
    }

    // Lookups

    pub fn find_end(&self, name: &ChannelName) -> Option<&ChannelEnd> {
        let handle = self.registry.find(name)?;
        self.registry.get(&handle).map(|entry| &entry.end)
    }

    pub fn end_for_id(&self, id: &ChannelEndId) -> Option<&ChannelEnd> {
        let handle = self.registry.handle_for_id(id)?;
        self.registry.get(&handle).map(|entry| &entry.end)
    }

    /// The channel of `id`. Node 0 also knows every remote end through its
    /// organisers.
    pub fn name_for_id(&self, id: &ChannelEndId) -> Option<ChannelName> {
        if let Some(end) = self.end_for_id(id) {
            return Some(end.name().clone());
        }
        self.organisers
            .as_ref()?
            .values()
            .find(|organiser| organiser.record().contains(id))
            .map(|organiser| organiser.record().name.clone())
    }

    pub fn has_local_end(&self, id: &ChannelEndId) -> bool {
        self.registry.handle_for_id(id).is_some()
    }

    pub fn buffered_count(&self, id: &ChannelEndId) -> Option<usize> {
        self.end_for_id(id).map(|end| end.buffered_count())
    }

    pub fn latest_value(&self, id: &ChannelEndId) -> Option<ValueSnapshot> {
        let (entry, descriptor, value) = self.end_for_id(id)?.latest_value()?;
        Some(ValueSnapshot {
            entry,
            descriptor: descriptor.clone(),
            value: value.clone(),
        })
    }
}
