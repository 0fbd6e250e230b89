//! Description de device UPnP.
//!
//! Le descripteur racine est assemblé par requête : l'UDN dépend du GUID
//! attribué à l'adresse appelante et les URLs de services sont préfixées
//! par le montage. Les trois descriptions de services (SCPD) sont des
//! documents statiques embarqués à la compilation.

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::errors::HandlerError;

/// SCPD du service ContentDirectory:1.
pub const CONTENT_DIRECTORY_SCPD: &str = include_str!("scpd/contentDirectory.xml");

/// SCPD du service ConnectionManager:1.
pub const CONNECTION_MANAGER_SCPD: &str = include_str!("scpd/connectionManager.xml");

/// SCPD du service X_MS_MediaReceiverRegistrar:1 (consoles et TV Microsoft).
pub const MEDIA_RECEIVER_REGISTRAR_SCPD: &str = include_str!("scpd/MSMediaReceiverRegistrar.xml");

/// Les trois services déclarés par un montage : (type, id, document SCPD).
pub const SERVICES: &[(&str, &str, &str)] = &[
    (
        "urn:schemas-upnp-org:service:ContentDirectory:1",
        "urn:upnp-org:serviceId:ContentDirectory",
        "contentDirectory.xml",
    ),
    (
        "urn:schemas-upnp-org:service:ConnectionManager:1",
        "urn:upnp-org:serviceId:ConnectionManager",
        "connectionManager.xml",
    ),
    (
        "urn:microsoft.com:service:X_MS_MediaReceiverRegistrar:1",
        "urn:microsoft.com:serviceId:X_MS_MediaReceiverRegistrar",
        "MSMediaReceiverRegistrar.xml",
    ),
];

/// Retrouve un document SCPD embarqué par nom de fichier.
pub fn scpd_document(name: &str) -> Option<&'static str> {
    match name {
        "contentDirectory.xml" => Some(CONTENT_DIRECTORY_SCPD),
        "connectionManager.xml" => Some(CONNECTION_MANAGER_SCPD),
        "MSMediaReceiverRegistrar.xml" => Some(MEDIA_RECEIVER_REGISTRAR_SCPD),
        _ => None,
    }
}

fn text_element(name: &str, text: impl Into<String>) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.into()));
    elem
}

/// Génère le document de description du device d'un montage.
///
/// # Arguments
///
/// * `prefix` - Préfixe d'URL du montage (ex: "/dms/0")
/// * `friendly_name` - Nom affiché chez les clients
/// * `device_guid` - GUID attribué à l'adresse appelante, vide si inconnue
pub fn description_xml(
    prefix: &str,
    friendly_name: &str,
    device_guid: &str,
) -> Result<String, HandlerError> {
    let mut device = Element::new("device");
    device.children.push(XMLNode::Element(text_element(
        "deviceType",
        "urn:schemas-upnp-org:device:MediaServer:1",
    )));
    device
        .children
        .push(XMLNode::Element(text_element("friendlyName", friendly_name)));
    device
        .children
        .push(XMLNode::Element(text_element("manufacturer", "DMSCast")));
    device.children.push(XMLNode::Element(text_element(
        "modelName",
        "DMSCast Media Server",
    )));
    device.children.push(XMLNode::Element(text_element(
        "modelNumber",
        env!("CARGO_PKG_VERSION"),
    )));
    let udn = if device_guid.is_empty() {
        String::new()
    } else {
        format!("uuid:{}", device_guid)
    };
    device
        .children
        .push(XMLNode::Element(text_element("UDN", udn)));

    let mut service_list = Element::new("serviceList");
    for (service_type, service_id, scpd) in SERVICES {
        let mut service = Element::new("service");
        service
            .children
            .push(XMLNode::Element(text_element("serviceType", *service_type)));
        service
            .children
            .push(XMLNode::Element(text_element("serviceId", *service_id)));
        service.children.push(XMLNode::Element(text_element(
            "SCPDURL",
            format!("{}/{}", prefix, scpd),
        )));
        service.children.push(XMLNode::Element(text_element(
            "controlURL",
            format!("{}/control", prefix),
        )));
        service.children.push(XMLNode::Element(text_element(
            "eventSubURL",
            format!("{}/events", prefix),
        )));
        service_list.children.push(XMLNode::Element(service));
    }
    device.children.push(XMLNode::Element(service_list));

    let mut spec = Element::new("specVersion");
    spec.children.push(XMLNode::Element(text_element("major", "1")));
    spec.children.push(XMLNode::Element(text_element("minor", "0")));

    let mut root = Element::new("root");
    root.attributes.insert(
        "xmlns".to_string(),
        "urn:schemas-upnp-org:device-1-0".to_string(),
    );
    root.children.push(XMLNode::Element(spec));
    root.children.push(XMLNode::Element(device));

    let config = EmitterConfig::new().perform_indent(true).indent_string("  ");
    let mut buf = Vec::new();
    root.write_with_config(&mut buf, config)
        .map_err(|e| HandlerError::Internal(anyhow::anyhow!("descriptor emit failed: {}", e)))?;

    let mut xml = String::from_utf8_lossy(&buf).into_owned();
    xml.insert_str(0, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    Ok(xml)
}
