//! Construction des réponses SOAP et des faults.

use xmltree::{Element, EmitterConfig, XMLNode};

fn text_element(name: &str, text: impl Into<String>) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.into()));
    elem
}

fn envelope_with_body(body_child: Element) -> Result<String, xmltree::Error> {
    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(body_child));

    let mut envelope = Element::new("s:Envelope");
    envelope.attributes.insert(
        "xmlns:s".to_string(),
        "http://schemas.xmlsoap.org/soap/envelope/".to_string(),
    );
    envelope.attributes.insert(
        "s:encodingStyle".to_string(),
        "http://schemas.xmlsoap.org/soap/encoding/".to_string(),
    );
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(true)
        .indent_string("  ");
    envelope.write_with_config(&mut buf, config)?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Construit la réponse SOAP d'une action réussie.
///
/// # Arguments
///
/// * `service_urn` - URN du service ayant traité l'action
/// * `action` - Nom de l'action (la réponse est `<u:{action}Response>`)
/// * `values` - Paires (argument de sortie, valeur)
pub fn build_soap_response(
    service_urn: &str,
    action: &str,
    values: &[(String, String)],
) -> Result<String, xmltree::Error> {
    let mut response = Element::new(&format!("u:{}Response", action));
    response
        .attributes
        .insert("xmlns:u".to_string(), service_urn.to_string());

    for (name, value) in values {
        response
            .children
            .push(XMLNode::Element(text_element(name, value.clone())));
    }

    envelope_with_body(response)
}

/// Construit un SOAP Fault portant une erreur UPnP.
///
/// Le faultcode est toujours `s:Client` avec le faultstring conventionnel
/// `UPnPError`, le détail portant le code et la description réels.
pub fn build_soap_fault(
    error_code: &str,
    error_description: &str,
) -> Result<String, xmltree::Error> {
    let mut fault = Element::new("s:Fault");
    fault
        .children
        .push(XMLNode::Element(text_element("faultcode", "s:Client")));
    fault
        .children
        .push(XMLNode::Element(text_element("faultstring", "UPnPError")));

    let mut upnp_error = Element::new("UPnPError");
    upnp_error.attributes.insert(
        "xmlns".to_string(),
        "urn:schemas-upnp-org:control-1-0".to_string(),
    );
    upnp_error
        .children
        .push(XMLNode::Element(text_element("errorCode", error_code)));
    upnp_error.children.push(XMLNode::Element(text_element(
        "errorDescription",
        error_description,
    )));

    let mut detail = Element::new("detail");
    detail.children.push(XMLNode::Element(upnp_error));
    fault.children.push(XMLNode::Element(detail));

    envelope_with_body(fault)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_response() {
        let values = vec![
            ("Id".to_string(), "42".to_string()),
            ("Result".to_string(), "<DIDL-Lite/>".to_string()),
        ];
        let xml = build_soap_response(
            "urn:schemas-upnp-org:service:ContentDirectory:1",
            "GetSystemUpdateID",
            &values,
        )
        .unwrap();

        assert!(xml.contains("GetSystemUpdateIDResponse"));
        assert!(xml.contains("<Id>42</Id>"));
        assert!(xml.contains("xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\""));
        // Le XML imbriqué dans Result est échappé par l'émetteur.
        assert!(xml.contains("&lt;DIDL-Lite/&gt;"));
    }

    #[test]
    fn test_build_empty_response() {
        let xml = build_soap_response(
            "urn:schemas-upnp-org:service:ConnectionManager:1",
            "GetCurrentConnectionIDs",
            &[],
        )
        .unwrap();
        assert!(xml.contains("GetCurrentConnectionIDsResponse"));
    }

    #[test]
    fn test_build_fault() {
        let xml = build_soap_fault("401", "Invalid Action").unwrap();

        assert!(xml.contains("<faultcode>s:Client</faultcode>"));
        assert!(xml.contains("<faultstring>UPnPError</faultstring>"));
        assert!(xml.contains("<errorCode>401</errorCode>"));
        assert!(xml.contains("<errorDescription>Invalid Action</errorDescription>"));
    }
}
