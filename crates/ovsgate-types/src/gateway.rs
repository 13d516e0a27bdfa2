//! Gateway configuration rows and their interface enumerations.

use std::fmt;

/// Default maximum transmission unit for a configured interface.
pub const DEFAULT_MTU: i64 = 1500;

/// Default VLAN identifier (no VLAN tagging).
pub const DEFAULT_VLAN_ID: i64 = 0;

/// Kind of network interface a configuration row describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    /// Some other interface type.
    #[default]
    Other,
    /// Network bridge.
    Bridge,
    /// Ethernet interface.
    Ethernet,
    /// GRE tunnel interface.
    Gre,
    /// VLAN interface.
    Vlan,
}

impl InterfaceType {
    /// Wire code carried in `Gateway_Config` rows.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Other => 0,
            Self::Bridge => 1,
            Self::Ethernet => 2,
            Self::Gre => 3,
            Self::Vlan => 4,
        }
    }

    /// Decodes a wire code; unrecognised codes map to [`InterfaceType::Other`].
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Bridge,
            2 => Self::Ethernet,
            3 => Self::Gre,
            4 => Self::Vlan,
            _ => Self::Other,
        }
    }
}

/// Command applied to the interface or bridge named by a configuration row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InterfaceCommand {
    /// Bring the interface up.
    #[default]
    Up,
    /// Bring the interface down.
    Down,
    /// Delete the interface.
    Delete,
    /// Remove the bridge.
    BridgeRemove,
}

impl InterfaceCommand {
    /// Wire code carried in `Gateway_Config` rows.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Delete => 2,
            Self::BridgeRemove => 3,
        }
    }

    /// Decodes a wire code; unrecognised codes map to [`InterfaceCommand::Up`].
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Down,
            2 => Self::Delete,
            3 => Self::BridgeRemove,
            _ => Self::Up,
        }
    }
}

impl fmt::Display for InterfaceCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Delete => "delete",
            Self::BridgeRemove => "bridge-remove",
        };
        formatter.write_str(label)
    }
}

/// A `Gateway_Config` row: one interface the gateway should realise.
///
/// Field names mirror the wire column names. String fields left empty and
/// integer fields left at their defaults encode as-is; the codec fills the
/// same defaults back in when the database omits a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Network interface name.
    pub if_name: String,
    /// IPv4 address assigned to the interface.
    pub inet_addr: String,
    /// Netmask for [`GatewayConfig::inet_addr`].
    pub netmask: String,
    /// Remote endpoint address for GRE interfaces.
    pub gre_remote_inet_addr: String,
    /// Local endpoint address for GRE interfaces.
    pub gre_local_inet_addr: String,
    /// Parent interface name.
    pub parent_ifname: String,
    /// Parent bridge name.
    pub parent_bridge: String,
    /// Maximum transmission unit in bytes.
    pub mtu: i64,
    /// VLAN identifier.
    pub vlan_id: i64,
    /// Interface type.
    pub if_type: InterfaceType,
    /// Command to apply.
    pub if_cmd: InterfaceCommand,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            if_name: String::new(),
            inet_addr: String::new(),
            netmask: String::new(),
            gre_remote_inet_addr: String::new(),
            gre_local_inet_addr: String::new(),
            parent_ifname: String::new(),
            parent_bridge: String::new(),
            mtu: DEFAULT_MTU,
            vlan_id: DEFAULT_VLAN_ID,
            if_type: InterfaceType::default(),
            if_cmd: InterfaceCommand::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_wire_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.mtu, 1500);
        assert_eq!(config.vlan_id, 0);
        assert_eq!(config.if_type, InterfaceType::Other);
        assert_eq!(config.if_cmd, InterfaceCommand::Up);
    }

    #[test]
    fn interface_codes_round_trip() {
        for if_type in [
            InterfaceType::Other,
            InterfaceType::Bridge,
            InterfaceType::Ethernet,
            InterfaceType::Gre,
            InterfaceType::Vlan,
        ] {
            assert_eq!(InterfaceType::from_code(if_type.code()), if_type);
        }
        for command in [
            InterfaceCommand::Up,
            InterfaceCommand::Down,
            InterfaceCommand::Delete,
            InterfaceCommand::BridgeRemove,
        ] {
            assert_eq!(InterfaceCommand::from_code(command.code()), command);
        }
    }
}
