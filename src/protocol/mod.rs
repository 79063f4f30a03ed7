//! YNC request envelope and response handling.
//!
//! Every request is an XML document POSTed to the receiver's control URL:
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?><YAMAHA_AV cmd="GET">...</YAMAHA_AV>
//! ```
//!
//! GET and PUT differ only in the `cmd` attribute. Responses echo the
//! structure of the request inside `<YAMAHA_AV rsp=".." RC="..">`.

pub mod transport;
pub mod xml;

pub use transport::{DeviceEndpoint, HttpTransport, Transport, DEFAULT_TIMEOUT};
pub use xml::XmlElement;

use quick_xml::escape::escape;

pub const CONTROL_PATH: &str = "/YamahaRemoteControl/ctrl";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Leaf value the device expects in GET requests.
pub const GET_PARAM: &str = "GetParam";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Put,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        }
    }
}

pub fn build_request(verb: Verb, body: &str) -> String {
    format!(
        "{}<YAMAHA_AV cmd=\"{}\">{}</YAMAHA_AV>",
        XML_DECLARATION,
        verb.as_str(),
        body
    )
}

pub fn build_get(body: &str) -> String {
    build_request(Verb::Get, body)
}

pub fn build_put(body: &str) -> String {
    build_request(Verb::Put, body)
}

/// Wrap already-serialized XML in nested elements, outermost first.
///
/// `nest(&["Main_Zone", "Volume"], "<Mute>On</Mute>")` gives
/// `<Main_Zone><Volume><Mute>On</Mute></Volume></Main_Zone>`.
pub fn nest(path: &[&str], inner: &str) -> String {
    let mut xml = inner.to_string();
    for tag in path.iter().rev() {
        xml = format!("<{tag}>{xml}</{tag}>");
    }
    xml
}

/// Like [`nest`] but escapes `value` as element text.
pub fn nest_text(path: &[&str], value: &str) -> String {
    nest(path, &escape(value))
}

/// GET body querying `<section><block>GetParam</block></section>`.
pub fn query(section: &str, block: &str) -> String {
    nest(&[section, block], GET_PARAM)
}

/// RC attribute of a response envelope. `"0"` means success.
pub fn response_code(doc: &XmlElement) -> Option<&str> {
    doc.attr("RC")
}
