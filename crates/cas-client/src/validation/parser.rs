//! Validation response parsing.
//!
//! Two formats are understood:
//!
//! - CAS 1.0 plain text: `yes\n<user>\n` or `no\n\n`
//! - CAS 2.0/3.0 XML:
//!
//! ```text
//! <cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
//!   <cas:authenticationSuccess>
//!     <cas:user>username</cas:user>
//!     <cas:attributes>
//!       <cas:eduPersonId>id</cas:eduPersonId>
//!     </cas:attributes>
//!     <cas:proxyGrantingTicket>PGTIOU-...</cas:proxyGrantingTicket>
//!     <cas:proxies>
//!       <cas:proxy>https://proxy2/pgtUrl</cas:proxy>
//!       <cas:proxy>https://proxy1/pgtUrl</cas:proxy>
//!     </cas:proxies>
//!   </cas:authenticationSuccess>
//! </cas:serviceResponse>
//! ```
//!
//! A payload that cannot be read as a document at all is a
//! [`MalformedResponseError`]. A well-formed document whose root is not a
//! recognized envelope is a `Failure` with code `INVALID_RESPONSE`, so the
//! caller can tell "server is misbehaving" apart from "could not parse".
//!
//! Elements are matched by local name; the `cas:` prefix must still be
//! declared for the document to be well-formed.
//!
//! Payloads must be UTF-8. A body in any other encoding, including one
//! whose XML declaration names it (`encoding="ISO-8859-1"`), is rejected
//! as [`MalformedResponseError::InvalidEncoding`]; CAS servers emit UTF-8.

use crate::assertion::{insert_attribute, Attributes};
use crate::error::{MalformedResponseError, INVALID_RESPONSE};
use crate::validation::ValidationOutcome;
use roxmltree::{Document, Node};
use tracing::debug;

/// Failure code for a CAS 1.0 `no` answer.
const CAS10_REJECTED_CODE: &str = "INVALID_TICKET";

/// Response format variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseParser {
    /// Plain-text `validate` response.
    Cas10,
    /// XML `serviceValidate` / `proxyValidate` response.
    Xml,
}

impl ResponseParser {
    /// Parse a raw validation response.
    ///
    /// # Errors
    ///
    /// Returns `MalformedResponseError` if the payload is not UTF-8, not a
    /// well-formed document, or a success response without a principal.
    pub fn parse(self, raw: &[u8]) -> Result<ValidationOutcome, MalformedResponseError> {
        let text = std::str::from_utf8(raw).map_err(|_| MalformedResponseError::InvalidEncoding)?;

        let outcome = match self {
            ResponseParser::Cas10 => parse_cas10(text),
            ResponseParser::Xml => parse_xml(text),
        }?;

        if let ValidationOutcome::Failure { code, .. } = &outcome {
            debug!(target: "cas.validation.parser", code = %code, "Parsed failure response");
        }

        Ok(outcome)
    }
}

fn parse_cas10(text: &str) -> Result<ValidationOutcome, MalformedResponseError> {
    let mut lines = text.lines().map(str::trim);

    match lines.next() {
        Some("yes") => {
            let principal_name = lines
                .next()
                .filter(|name| !name.is_empty())
                .ok_or(MalformedResponseError::MissingPrincipal)?;

            Ok(ValidationOutcome::Success {
                principal_name: principal_name.to_string(),
                attributes: Attributes::new(),
                pgt_iou: None,
                proxies: None,
            })
        }
        Some("no") => Ok(ValidationOutcome::Failure {
            code: CAS10_REJECTED_CODE.to_string(),
            message: "CAS server could not validate ticket".to_string(),
        }),
        _ => Ok(unrecognized("response is neither 'yes' nor 'no'")),
    }
}

fn parse_xml(text: &str) -> Result<ValidationOutcome, MalformedResponseError> {
    let doc = parse_document(text)?;

    let Some(envelope) = envelope(&doc) else {
        return Ok(unrecognized("empty service response"));
    };

    match envelope.tag_name().name() {
        "authenticationSuccess" => parse_success(envelope),
        "authenticationFailure" => Ok(parse_failure(envelope)),
        other => Ok(unrecognized(&format!("unexpected root element '{other}'"))),
    }
}

fn parse_success(envelope: Node<'_, '_>) -> Result<ValidationOutcome, MalformedResponseError> {
    let principal_name = child_element(envelope, "user")
        .map(element_text)
        .filter(|name| !name.is_empty())
        .ok_or(MalformedResponseError::MissingPrincipal)?;

    let pgt_iou = child_element(envelope, "proxyGrantingTicket")
        .map(element_text)
        .filter(|iou| !iou.is_empty());

    // Blank entries stay so the chain length matches what the server sent
    let proxies = child_element(envelope, "proxies").map(|list| {
        list.children()
            .filter(|node| is_element_named(*node, "proxy"))
            .map(element_text)
            .collect::<Vec<_>>()
    });

    let attributes = child_element(envelope, "attributes")
        .map(parse_attributes)
        .unwrap_or_default();

    debug!(
        target: "cas.validation.parser",
        attribute_count = attributes.len(),
        has_pgt_iou = pgt_iou.is_some(),
        proxy_count = proxies.as_ref().map_or(0, Vec::len),
        "Parsed success response"
    );

    Ok(ValidationOutcome::Success {
        principal_name,
        attributes,
        pgt_iou,
        proxies,
    })
}

fn parse_failure(envelope: Node<'_, '_>) -> ValidationOutcome {
    let code = envelope
        .attribute("code")
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .unwrap_or(INVALID_RESPONSE);

    ValidationOutcome::Failure {
        code: code.to_string(),
        message: element_text(envelope),
    }
}

/// Collect `<cas:attributes>` children.
///
/// Both the leaf-element form (`<cas:mail>a@b</cas:mail>`) and the
/// name/value form (`<cas:attribute name="mail" value="a@b"/>`) are read.
fn parse_attributes(block: Node<'_, '_>) -> Attributes {
    let mut attributes = Attributes::new();

    for node in block.children().filter(Node::is_element) {
        let local_name = node.tag_name().name();

        if local_name == "attribute" {
            if let Some(name) = node.attribute("name") {
                let value = node
                    .attribute("value")
                    .map_or_else(|| element_text(node), str::to_string);
                insert_attribute(&mut attributes, name.to_string(), value);
                continue;
            }
        }

        insert_attribute(&mut attributes, local_name.to_string(), element_text(node));
    }

    attributes
}

fn unrecognized(detail: &str) -> ValidationOutcome {
    ValidationOutcome::Failure {
        code: INVALID_RESPONSE.to_string(),
        message: format!("Unrecognized CAS response: {detail}"),
    }
}

// Helpers shared with the proxy ticket retriever, which parses the
// `proxySuccess` / `proxyFailure` envelopes of the same format.

pub(crate) fn parse_document(text: &str) -> Result<Document<'_>, MalformedResponseError> {
    Document::parse(text).map_err(|e| MalformedResponseError::InvalidDocument(e.to_string()))
}

/// The envelope element: the first element inside `serviceResponse`, or the
/// root itself when the response is not wrapped.
pub(crate) fn envelope<'a, 'input>(doc: &'a Document<'input>) -> Option<Node<'a, 'input>> {
    let root = doc.root_element();
    if root.tag_name().name() == "serviceResponse" {
        root.children().find(Node::is_element)
    } else {
        Some(root)
    }
}

pub(crate) fn child_element<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.children().find(|child| is_element_named(*child, name))
}

fn is_element_named(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// Trimmed concatenation of all text beneath `node` (CDATA included).
pub(crate) fn element_text(node: Node<'_, '_>) -> String {
    let text: String = node
        .descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect();
    text.trim().to_string()
}
