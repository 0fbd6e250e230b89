//! Déballage des enveloppes SOAP de contrôle.

use std::collections::HashMap;
use std::io::BufReader;
use xmltree::Element;

/// Action UPnP extraite d'une enveloppe SOAP.
#[derive(Debug, Clone)]
pub struct SoapAction {
    /// Nom de l'action (ex: "Browse", "GetSystemUpdateID")
    pub name: String,

    /// Namespace du service (ex: "urn:schemas-upnp-org:service:ContentDirectory:1")
    pub namespace: Option<String>,

    /// Arguments de l'action
    pub args: HashMap<String, String>,
}

impl SoapAction {
    /// Argument sous forme de chaîne, vide si absent.
    pub fn arg(&self, name: &str) -> &str {
        self.args.get(name).map(String::as_str).unwrap_or("")
    }

    /// Argument numérique, `default` si absent ou invalide.
    pub fn arg_u32(&self, name: &str, default: u32) -> u32 {
        self.args
            .get(name)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

/// Erreur de déballage SOAP.
#[derive(Debug, thiserror::Error)]
pub enum SoapParseError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] xmltree::ParseError),

    #[error("missing SOAP Envelope")]
    MissingEnvelope,

    #[error("missing SOAP Body")]
    MissingBody,

    #[error("no action found in SOAP Body")]
    NoAction,
}

/// Extrait l'action UPnP d'une requête de contrôle.
///
/// Le corps SOAP contient un unique élément enfant de la forme
/// `<u:ActionName xmlns:u="service-urn">...</u:ActionName>`, dont les
/// enfants directs sont les arguments.
pub fn parse_soap_action(xml: &[u8]) -> Result<SoapAction, SoapParseError> {
    let root = Element::parse(BufReader::new(xml))?;
    if !root.name.ends_with("Envelope") {
        return Err(SoapParseError::MissingEnvelope);
    }

    let body = root
        .get_child("Body")
        .or_else(|| {
            root.children
                .iter()
                .find_map(|n| n.as_element().filter(|e| e.name.ends_with("Body")))
        })
        .ok_or(SoapParseError::MissingBody)?;

    let action_elem = body
        .children
        .iter()
        .find_map(|n| n.as_element())
        .ok_or(SoapParseError::NoAction)?;

    let mut args = HashMap::new();
    for child in &action_elem.children {
        if let Some(elem) = child.as_element() {
            let value = elem.get_text().unwrap_or_default().to_string();
            args.insert(elem.name.clone(), value);
        }
    }

    Ok(SoapAction {
        name: action_elem.name.clone(),
        namespace: action_elem.namespace.clone(),
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_browse_action() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:Browse xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">
      <ObjectID>0</ObjectID>
      <BrowseFlag>BrowseDirectChildren</BrowseFlag>
      <StartingIndex>0</StartingIndex>
      <RequestedCount>25</RequestedCount>
    </u:Browse>
  </s:Body>
</s:Envelope>"#;

        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "Browse");
        assert_eq!(
            action.namespace.as_deref(),
            Some("urn:schemas-upnp-org:service:ContentDirectory:1")
        );
        assert_eq!(action.arg("ObjectID"), "0");
        assert_eq!(action.arg_u32("RequestedCount", 0), 25);
        assert_eq!(action.arg_u32("Missing", 7), 7);
    }

    #[test]
    fn test_parse_action_no_args() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:GetSystemUpdateID xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1"/>
  </s:Body>
</s:Envelope>"#;

        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "GetSystemUpdateID");
        assert!(action.args.is_empty());
    }

    #[test]
    fn test_missing_body_is_rejected() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"/>"#;
        assert!(matches!(
            parse_soap_action(xml.as_bytes()),
            Err(SoapParseError::MissingBody)
        ));
    }

    #[test]
    fn test_not_an_envelope() {
        let xml = r#"<root><Body/></root>"#;
        assert!(matches!(
            parse_soap_action(xml.as_bytes()),
            Err(SoapParseError::MissingEnvelope)
        ));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(matches!(
            parse_soap_action(b"this is not xml"),
            Err(SoapParseError::XmlError(_))
        ));
    }
}
