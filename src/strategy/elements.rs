use crate::models::{ConfigElement, Device, ElementOperation, ElementType};

/// Convert a dotted subnet mask to a prefix length.
/// Only the common masks are known; anything else is treated as a host route (/32).
pub fn mask_to_prefix_len(mask: &str) -> u8 {
    match mask {
        "255.255.255.252" => 30,
        "255.255.255.0" => 24,
        "255.255.0.0" => 16,
        "255.0.0.0" => 8,
        _ => 32,
    }
}

fn element(element_type: ElementType, path: String, value: String, description: String) -> ConfigElement {
    ConfigElement {
        element_type,
        path,
        operation: ElementOperation::Set,
        value,
        description,
    }
}

/// Break a device's desired state into atomic elements.
///
/// Emission order is interfaces, services, VLANs, then static routes. Enabled
/// interfaces emit nothing for their admin state.
pub fn derive_elements(device: &Device) -> Vec<ConfigElement> {
    let mut elements = Vec::new();

    for iface in &device.interfaces {
        let path = format!("interfaces {}", iface.name);

        if !iface.description.is_empty() {
            elements.push(element(
                ElementType::Interface,
                path.clone(),
                format!("description \"{}\"", iface.description),
                format!("Set description for {}", iface.name),
            ));
        }

        if !iface.ip_address.is_empty() {
            elements.push(element(
                ElementType::Interface,
                format!("interfaces {} unit 0 family inet", iface.name),
                format!("address {}/{}", iface.ip_address, mask_to_prefix_len(&iface.subnet_mask)),
                format!("Set IP address for {}", iface.name),
            ));
        }

        if iface.mtu > 0 {
            elements.push(element(
                ElementType::Interface,
                path.clone(),
                format!("mtu {}", iface.mtu),
                format!("Set MTU for {}", iface.name),
            ));
        }

        if !iface.enabled {
            elements.push(element(
                ElementType::Interface,
                path,
                "disable".to_string(),
                format!("Disable {}", iface.name),
            ));
        }
    }

    let ntp = &device.services.ntp;
    if ntp.enabled {
        for server in &ntp.servers {
            elements.push(element(
                ElementType::Service,
                "system ntp".to_string(),
                format!("server {}", server),
                format!("Add NTP server {}", server),
            ));
        }
    }

    let snmp = &device.services.snmp;
    if snmp.enabled {
        elements.push(element(
            ElementType::Service,
            format!("snmp community {}", snmp.community),
            "authorization read-only".to_string(),
            "Configure SNMP community".to_string(),
        ));
        elements.push(element(
            ElementType::Service,
            "snmp".to_string(),
            format!("location \"{}\"", snmp.location),
            "Set SNMP location".to_string(),
        ));
        elements.push(element(
            ElementType::Service,
            "snmp".to_string(),
            format!("contact \"{}\"", snmp.contact),
            "Set SNMP contact".to_string(),
        ));
    }

    for vlan in &device.vlans {
        let path = format!("vlans {}", vlan.name);
        elements.push(element(
            ElementType::Vlan,
            path.clone(),
            format!("vlan-id {}", vlan.id),
            format!("Configure VLAN {}", vlan.name),
        ));

        if !vlan.description.is_empty() {
            elements.push(element(
                ElementType::Vlan,
                path,
                format!("description \"{}\"", vlan.description),
                format!("Set VLAN {} description", vlan.name),
            ));
        }
    }

    if let Some(routing) = &device.routing {
        for route in &routing.static_routes {
            elements.push(element(
                ElementType::Routing,
                "routing-options static".to_string(),
                format!("route {} next-hop {}", route.destination, route.next_hop),
                format!("Add static route to {}", route.destination),
            ));
        }
    }

    elements
}

/// Targeted change to a single interface
#[derive(Debug, Clone, Default)]
pub struct InterfaceUpdate {
    pub description: Option<String>,
    pub mtu: Option<u32>,
    pub enabled: Option<bool>,
}

pub fn interface_update_elements(interface_name: &str, update: &InterfaceUpdate) -> Vec<ConfigElement> {
    let path = format!("interfaces {}", interface_name);
    let mut elements = Vec::new();

    if let Some(description) = &update.description {
        elements.push(element(
            ElementType::Interface,
            path.clone(),
            format!("description \"{}\"", description),
            "Update interface description".to_string(),
        ));
    }

    if let Some(mtu) = update.mtu {
        elements.push(element(
            ElementType::Interface,
            path.clone(),
            format!("mtu {}", mtu),
            "Update interface MTU".to_string(),
        ));
    }

    match update.enabled {
        Some(false) => elements.push(element(
            ElementType::Interface,
            path,
            "disable".to_string(),
            "Disable interface".to_string(),
        )),
        Some(true) => elements.push(ConfigElement {
            element_type: ElementType::Interface,
            path: format!("{} disable", path),
            operation: ElementOperation::Delete,
            value: String::new(),
            description: "Enable interface".to_string(),
        }),
        None => {}
    }

    elements
}

/// Single-shot command that stages one element and validates it without committing
pub fn element_command(element: &ConfigElement) -> String {
    match element.operation {
        ElementOperation::Set => {
            format!("configure; set {} {}; commit check; exit", element.path, element.value)
        }
        ElementOperation::Delete => format!("configure; delete {}; commit check; exit", element.path),
        ElementOperation::Edit => format!(
            "configure; edit {}; set {}; top; commit check; exit",
            element.path, element.value
        ),
    }
}

/// Whole batch as one interactive script, ending in a commit
pub fn build_command_script(elements: &[ConfigElement]) -> Vec<String> {
    let mut commands = vec!["configure".to_string()];

    for element in elements {
        match element.operation {
            ElementOperation::Set => commands.push(format!("set {} {}", element.path, element.value)),
            ElementOperation::Delete => commands.push(format!("delete {}", element.path)),
            ElementOperation::Edit => {
                commands.push(format!("edit {}", element.path));
                commands.push(format!("set {}", element.value));
                commands.push("up".to_string());
            }
        }
    }

    commands.push("commit and-quit".to_string());
    commands
}
