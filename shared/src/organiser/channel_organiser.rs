use log::{debug, info};

use crate::{
    control::{change_notification::ChangeNotification, link_update::LinkUpdate},
    error::OrganiserError,
    identity::{channel_end_id::ChannelEndId, channel_name::ChannelName},
    organiser::organiser_record::{EndSpec, OrganiserRecord},
    store::entry_descriptor::{Arity, TransportClass},
};

/// Turns the change notifications of one channel into link updates.
///
/// The master is the first end to report a writer and stays master for as
/// long as the record exists. Once a master is known every end of the channel
/// is linked to every other end, and links are always issued as a pair
/// (`a -> b` immediately followed by `b -> a`), walking ends in arrival order.
pub struct ChannelOrganiser {
    record: OrganiserRecord,
}

impl ChannelOrganiser {
    pub fn new(name: ChannelName) -> Self {
        Self {
            record: OrganiserRecord::new(name),
        }
    }

    pub fn record(&self) -> &OrganiserRecord {
        &self.record
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    pub fn handle(&mut self, note: &ChangeNotification) -> Result<Vec<LinkUpdate>, OrganiserError> {
        if *note.name() != self.record.name {
            return Err(OrganiserError::WrongChannel {
                expected: self.record.name.clone(),
                received: note.name().clone(),
            });
        }

        match note {
            ChangeNotification::NewEnd { requester_id, .. } => Ok(self.new_end(*requester_id)),
            ChangeNotification::IsWritingEnd {
                end_id,
                transport_class,
                arity,
                ..
            } => self.writing_end(*end_id, *transport_class, *arity),
            ChangeNotification::RemoveEnd { end_id, .. } => self.remove_end(*end_id),
        }
    }

    fn new_end(&mut self, id: ChannelEndId) -> Vec<LinkUpdate> {
        let mut updates = vec![LinkUpdate::IdIssued {
            name: self.record.name.clone(),
            id,
        }];

        if self.record.contains(&id) {
            // re-delivered request: confirm again without touching the mesh
            if let Some(master) = self.record.master {
                updates.push(self.set_master(id, master));
            }
            return updates;
        }

        debug!("Channel {} gains end {}", self.record.name, id);
        self.record.ends.push(EndSpec { id });

        if let Some(master) = self.record.master {
            updates.push(self.set_master(id, master));
            for existing in &self.record.ends {
                if existing.id == id {
                    continue;
                }
                push_pair(&mut updates, existing.id, id);
            }
        }
        updates
    }

    fn writing_end(
        &mut self,
        id: ChannelEndId,
        transport_class: TransportClass,
        arity: Arity,
    ) -> Result<Vec<LinkUpdate>, OrganiserError> {
        if !self.record.contains(&id) {
            return Err(OrganiserError::UnknownEnd {
                name: self.record.name.clone(),
                id,
            });
        }

        let Some(master) = self.record.master else {
            info!("Channel {} master is {}", self.record.name, id);
            self.record.master = Some(id);
            self.record.transport_class = transport_class;
            self.record.arity = arity;

            let mut updates: Vec<LinkUpdate> = self
                .record
                .ends
                .iter()
                .map(|spec| self.set_master(spec.id, id))
                .collect();
            let ends = &self.record.ends;
            for (index, first) in ends.iter().enumerate() {
                for second in &ends[index + 1..] {
                    push_pair(&mut updates, first.id, second.id);
                }
            }
            return Ok(updates);
        };

        if transport_class != self.record.transport_class {
            return Err(OrganiserError::DistributionClash {
                name: self.record.name.clone(),
                reason: "writer transport class differs from the master's",
            });
        }
        if id != master && (arity == Arity::OnlyOne || self.record.arity == Arity::OnlyOne) {
            return Err(OrganiserError::DistributionClash {
                name: self.record.name.clone(),
                reason: "channel accepts only one writer",
            });
        }
        Ok(Vec::new())
    }

    fn remove_end(&mut self, id: ChannelEndId) -> Result<Vec<LinkUpdate>, OrganiserError> {
        let position = self
            .record
            .position_of(&id)
            .ok_or_else(|| OrganiserError::UnknownEnd {
                name: self.record.name.clone(),
                id,
            })?;
        self.record.ends.remove(position);
        debug!("Channel {} loses end {}", self.record.name, id);
        Ok(vec![LinkUpdate::DeleteEnd { end: id }])
    }

    fn set_master(&self, end: ChannelEndId, master: ChannelEndId) -> LinkUpdate {
        LinkUpdate::SetMaster {
            end,
            master,
            transport_class: self.record.transport_class,
            arity: self.record.arity,
        }
    }
}

fn push_pair(updates: &mut Vec<LinkUpdate>, a: ChannelEndId, b: ChannelEndId) {
    updates.push(LinkUpdate::AddDestination {
        end: a,
        destination: b,
    });
    updates.push(LinkUpdate::AddDestination {
        end: b,
        destination: a,
    });
}
