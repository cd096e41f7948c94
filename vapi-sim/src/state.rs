//! In-memory interface and path tracing state

use std::collections::BTreeMap;

use vapi_binapi::{
    IfStatusFlags, InterfaceIndex, MacAddress,
    interface::SwInterfaceDetails,
    sr_pt::{SrPtIfaceAdd, SrPtIfaceDetails},
};

pub const INVALID_SW_IF_INDEX: i32 = -2;
pub const NO_SUCH_ENTRY: i32 = -6;
pub const ENTRY_ALREADY_EXISTS: i32 = -81;

const LOCAL0: u32 = 0;

#[derive(Debug, Clone)]
struct Interface {
    name: String,
    mac: MacAddress,
    flags: IfStatusFlags,
}

/// Interfaces and path tracing records, keyed by interface index
#[derive(Debug)]
pub struct Dataplane {
    interfaces: BTreeMap<u32, Interface>,
    pt_ifaces: BTreeMap<u32, SrPtIfaceDetails>,
    next_loopback: u32,
}

impl Default for Dataplane {
    fn default() -> Self {
        let mut interfaces = BTreeMap::new();
        interfaces.insert(
            LOCAL0,
            Interface {
                name: "local0".to_string(),
                mac: MacAddress::default(),
                flags: IfStatusFlags::default(),
            },
        );
        Self {
            interfaces,
            pt_ifaces: BTreeMap::new(),
            next_loopback: 0,
        }
    }
}

impl Dataplane {
    /// State seeded with `records`, each on a fresh loopback
    ///
    /// The records' own `sw_if_index` is replaced by the loopback's index.
    #[must_use]
    pub fn with_pt_ifaces(records: &[SrPtIfaceDetails]) -> Self {
        let mut dataplane = Self::default();
        for record in records {
            let sw_if_index = dataplane.create_loopback(MacAddress::default());
            dataplane.pt_ifaces.insert(
                sw_if_index.0,
                SrPtIfaceDetails {
                    sw_if_index,
                    ..record.clone()
                },
            );
        }
        dataplane
    }

    /// Create `loopN`; a zero MAC is replaced by a generated one
    pub fn create_loopback(&mut self, mac: MacAddress) -> InterfaceIndex {
        let instance = self.next_loopback;
        self.next_loopback += 1;

        let index = self.interfaces.keys().next_back().map_or(1, |last| last + 1);
        let mac = if mac == MacAddress::default() {
            let [a, b, c, d] = instance.to_be_bytes();
            MacAddress([0xde, 0xad, a, b, c, d])
        } else {
            mac
        };
        self.interfaces.insert(
            index,
            Interface {
                name: format!("loop{instance}"),
                mac,
                flags: IfStatusFlags::default(),
            },
        );
        InterfaceIndex(index)
    }

    /// Remove a loopback and any path tracing record on it
    ///
    /// # Errors
    ///
    /// Returns [`INVALID_SW_IF_INDEX`] for unknown indexes and for `local0`
    pub fn delete_loopback(&mut self, sw_if_index: InterfaceIndex) -> Result<(), i32> {
        if sw_if_index.0 == LOCAL0 || self.interfaces.remove(&sw_if_index.0).is_none() {
            return Err(INVALID_SW_IF_INDEX);
        }
        self.pt_ifaces.remove(&sw_if_index.0);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`INVALID_SW_IF_INDEX`] for unknown indexes
    pub fn set_flags(&mut self, sw_if_index: InterfaceIndex, flags: IfStatusFlags) -> Result<(), i32> {
        let interface = self
            .interfaces
            .get_mut(&sw_if_index.0)
            .ok_or(INVALID_SW_IF_INDEX)?;
        // Link follows admin state on a loopback
        interface.flags = if flags.contains(IfStatusFlags::ADMIN_UP) {
            IfStatusFlags::ADMIN_UP.union(IfStatusFlags::LINK_UP)
        } else {
            IfStatusFlags::default()
        };
        Ok(())
    }

    /// Details of one interface, or all of them for [`InterfaceIndex::ANY`]
    #[must_use]
    pub fn interfaces(&self, filter: InterfaceIndex) -> Vec<SwInterfaceDetails> {
        self.interfaces
            .iter()
            .filter(|&(&index, _)| filter == InterfaceIndex::ANY || filter.0 == index)
            .map(|(&index, interface)| SwInterfaceDetails {
                sw_if_index: InterfaceIndex(index),
                sup_sw_if_index: InterfaceIndex(index),
                l2_address: interface.mac,
                flags: interface.flags,
                interface_name: interface.name.clone(),
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`INVALID_SW_IF_INDEX`] for unknown indexes and
    /// [`ENTRY_ALREADY_EXISTS`] if the interface already has a record
    pub fn add_pt_iface(&mut self, request: &SrPtIfaceAdd) -> Result<(), i32> {
        let index = request.sw_if_index.0;
        if !self.interfaces.contains_key(&index) {
            return Err(INVALID_SW_IF_INDEX);
        }
        if self.pt_ifaces.contains_key(&index) {
            return Err(ENTRY_ALREADY_EXISTS);
        }
        self.pt_ifaces.insert(
            index,
            SrPtIfaceDetails {
                sw_if_index: request.sw_if_index,
                id: request.id,
                ingress_load: request.ingress_load,
                egress_load: request.egress_load,
                tts_template: request.tts_template,
            },
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`NO_SUCH_ENTRY`] if the interface has no record
    pub fn del_pt_iface(&mut self, sw_if_index: InterfaceIndex) -> Result<(), i32> {
        self.pt_ifaces
            .remove(&sw_if_index.0)
            .map(|_| ())
            .ok_or(NO_SUCH_ENTRY)
    }

    /// All records, ordered by interface index
    #[must_use]
    pub fn pt_ifaces(&self) -> Vec<SrPtIfaceDetails> {
        self.pt_ifaces.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_request(index: u32) -> SrPtIfaceAdd {
        SrPtIfaceAdd {
            sw_if_index: InterfaceIndex(index),
            id: 400,
            ingress_load: 1,
            egress_load: 1,
            tts_template: 2,
        }
    }

    #[test]
    fn loopbacks_are_numbered_after_local0() {
        let mut dataplane = Dataplane::default();
        assert_eq!(dataplane.create_loopback(MacAddress::default()), InterfaceIndex(1));
        assert_eq!(dataplane.create_loopback(MacAddress::default()), InterfaceIndex(2));

        let names: Vec<_> = dataplane
            .interfaces(InterfaceIndex::ANY)
            .into_iter()
            .map(|details| details.interface_name)
            .collect();
        assert_eq!(names, ["local0", "loop0", "loop1"]);
        assert_eq!(dataplane.interfaces(InterfaceIndex(2)).len(), 1);
    }

    #[test]
    fn pt_record_lifecycle() {
        let mut dataplane = Dataplane::default();
        let index = dataplane.create_loopback(MacAddress::default());

        assert_eq!(dataplane.add_pt_iface(&add_request(index.0)), Ok(()));
        assert_eq!(
            dataplane.add_pt_iface(&add_request(index.0)),
            Err(ENTRY_ALREADY_EXISTS)
        );
        assert_eq!(dataplane.pt_ifaces().len(), 1);

        assert_eq!(dataplane.del_pt_iface(index), Ok(()));
        assert_eq!(dataplane.del_pt_iface(index), Err(NO_SUCH_ENTRY));
        assert!(dataplane.pt_ifaces().is_empty());
    }

    #[test]
    fn pt_record_needs_an_interface() {
        let mut dataplane = Dataplane::default();
        assert_eq!(dataplane.add_pt_iface(&add_request(7)), Err(INVALID_SW_IF_INDEX));
    }

    #[test]
    fn deleting_a_loopback_drops_its_record() {
        let mut dataplane = Dataplane::default();
        let index = dataplane.create_loopback(MacAddress::default());
        dataplane.add_pt_iface(&add_request(index.0)).unwrap();

        assert_eq!(dataplane.delete_loopback(index), Ok(()));
        assert!(dataplane.pt_ifaces().is_empty());
        assert_eq!(
            dataplane.delete_loopback(InterfaceIndex(0)),
            Err(INVALID_SW_IF_INDEX)
        );
    }

    #[test]
    fn seeded_records_get_their_own_loopback() {
        let seed = SrPtIfaceDetails {
            sw_if_index: InterfaceIndex(99),
            id: 7,
            ingress_load: 3,
            egress_load: 4,
            tts_template: 1,
        };
        let dataplane = Dataplane::with_pt_ifaces(&[seed]);
        let records = dataplane.pt_ifaces();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sw_if_index, InterfaceIndex(1));
        assert_eq!(records[0].id, 7);
    }
}
