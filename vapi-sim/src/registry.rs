//! Message ids handed out at registration

use std::collections::HashMap;

use vapi_binapi::{
    Message, MessageDef, interface,
    memclnt::{
        self, MessageTableEntry, SOCKCLNT_CREATE_MSG_ID, SOCKCLNT_CREATE_REPLY_MSG_ID,
        SockclntCreate, SockclntCreateReply,
    },
    sr_pt, vpe,
};

use crate::SimConfig;

/// First id given to a message without a fixed id
const FIRST_DYNAMIC_ID: u16 = 17;

/// The simulator's message table
#[derive(Debug)]
pub struct MessageRegistry {
    by_id: HashMap<u16, MessageDef>,
    by_name: HashMap<&'static str, u16>,
}

impl MessageRegistry {
    /// Every known message except those hidden by `config`
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        let mut registry = Self {
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        };
        registry.insert(SOCKCLNT_CREATE_MSG_ID, MessageDef::of::<SockclntCreate>());
        registry.insert(SOCKCLNT_CREATE_REPLY_MSG_ID, MessageDef::of::<SockclntCreateReply>());

        let dynamic = memclnt::all_messages()
            .into_iter()
            .chain(vpe::all_messages())
            .chain(interface::all_messages())
            .chain(sr_pt::all_messages())
            .filter(|def| !registry.by_name.contains_key(def.name))
            .filter(|def| !config.is_hidden(def.name))
            .collect::<Vec<_>>();

        for (id, def) in (FIRST_DYNAMIC_ID..).zip(dynamic) {
            registry.insert(id, def);
        }
        registry
    }

    fn insert(&mut self, id: u16, def: MessageDef) {
        self.by_id.insert(id, def);
        self.by_name.insert(def.name, id);
    }

    #[must_use]
    pub fn get(&self, id: u16) -> Option<&MessageDef> {
        self.by_id.get(&id)
    }

    /// Id assigned to `M`, `None` if it is hidden
    #[must_use]
    pub fn id_of<M: Message>(&self) -> Option<u16> {
        self.by_name.get(M::NAME).copied()
    }

    /// Entries for `sockclnt_create_reply`, ordered by id
    #[must_use]
    pub fn table(&self) -> Vec<MessageTableEntry> {
        let mut table: Vec<_> = self
            .by_id
            .iter()
            .map(|(&index, def)| MessageTableEntry {
                index,
                name: def.name_crc(),
            })
            .collect();
        table.sort_by_key(|entry| entry.index);
        table
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use vapi_binapi::{memclnt::ControlPing, vpe::ShowVersion};

    use super::*;

    #[test]
    fn handshake_ids_are_fixed() {
        let registry = MessageRegistry::new(&SimConfig::default());
        assert_eq!(registry.id_of::<SockclntCreate>(), Some(15));
        assert_eq!(registry.id_of::<SockclntCreateReply>(), Some(16));

        let table = registry.table();
        assert_eq!(table[0].index, 15);
        assert_eq!(table[2].index, FIRST_DYNAMIC_ID);
        assert_eq!(table.len(), registry.len());
    }

    #[test]
    fn hidden_messages_are_left_out() {
        let registry = MessageRegistry::new(&SimConfig::default().hide_message("show_version"));
        assert_eq!(registry.id_of::<ShowVersion>(), None);
        assert!(registry.id_of::<ControlPing>().is_some());
        assert!(
            !registry
                .table()
                .iter()
                .any(|entry| entry.name == ShowVersion::name_crc())
        );
    }
}
