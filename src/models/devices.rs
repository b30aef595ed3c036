use serde::{Deserialize, Serialize};

/// Canonical vendor tag values
pub mod vendor {
    pub const CISCO: &str = "cisco";
    pub const JUNIPER: &str = "juniper";
}

/// Device represents a network device and the configuration it should carry.
///
/// Strategies only ever borrow a `Device`; decomposition and deployment never
/// write back into the caller's record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub hostname: String,
    #[serde(default)]
    pub device_type: String, // router, switch, firewall
    pub vendor: String,
    #[serde(default)]
    pub model: String,
    pub management_ip: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<Routing>,
    #[serde(default)]
    pub services: Services,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vlans: Vec<Vlan>,
}

/// Physical placement of a device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub datacenter: String,
    #[serde(default)]
    pub rack: String,
    #[serde(default)]
    pub position: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subnet_mask: String,
    #[serde(default)]
    pub enabled: bool,
    /// 0 means "leave the device default"
    #[serde(default)]
    pub mtu: u32,
    #[serde(default)]
    pub speed: String,
    #[serde(default)]
    pub duplex: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticRoute {
    pub destination: String,
    pub next_hop: String,
    #[serde(default)]
    pub administrative_distance: u32,
}

/// Routing block. Absent on devices that carry no routing intent at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Routing {
    #[serde(default)]
    pub static_routes: Vec<StaticRoute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NtpService {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnmpService {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub community: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub contact: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Services {
    #[serde(default)]
    pub ntp: NtpService,
    #[serde(default)]
    pub snmp: SnmpService,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vlan {
    pub id: u16,
    pub name: String,
    #[serde(default)]
    pub description: String,
}
