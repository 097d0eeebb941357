//! Contains structures needed to describe network requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain;

/// The type of resource requested from the URL endpoint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum RequestType {
    Document,
    Subdocument,
    Script,
    Stylesheet,
    Object,
    Image,
    Xmlhttprequest,
    ObjectSubrequest,
    Media,
    Font,
    Websocket,
    Other,
    Popup,
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum RequestError {
    #[error("unknown request type: {0}")]
    UnknownRequestType(String),
}

impl FromStr for RequestType {
    type Err = RequestError;

    /// Accepts both the rule-option spelling (`OBJECT-SUBREQUEST`) and the web request API
    /// spelling (`main_frame`, `sub_frame`, `xhr`), case-insensitively.
    fn from_str(cpt: &str) -> Result<Self, Self::Err> {
        Ok(match cpt.to_ascii_lowercase().as_str() {
            "document" | "main_frame" => RequestType::Document,
            "subdocument" | "sub_frame" => RequestType::Subdocument,
            "script" => RequestType::Script,
            "stylesheet" => RequestType::Stylesheet,
            "object" => RequestType::Object,
            "image" | "imageset" => RequestType::Image,
            "xmlhttprequest" | "xhr" => RequestType::Xmlhttprequest,
            "object-subrequest" | "object_subrequest" => RequestType::ObjectSubrequest,
            "media" => RequestType::Media,
            "font" => RequestType::Font,
            "websocket" => RequestType::Websocket,
            "other" => RequestType::Other,
            "popup" => RequestType::Popup,
            _ => return Err(RequestError::UnknownRequestType(cpt.to_string())),
        })
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            RequestType::Document => "DOCUMENT",
            RequestType::Subdocument => "SUBDOCUMENT",
            RequestType::Script => "SCRIPT",
            RequestType::Stylesheet => "STYLESHEET",
            RequestType::Object => "OBJECT",
            RequestType::Image => "IMAGE",
            RequestType::Xmlhttprequest => "XMLHTTPREQUEST",
            RequestType::ObjectSubrequest => "OBJECT-SUBREQUEST",
            RequestType::Media => "MEDIA",
            RequestType::Font => "FONT",
            RequestType::Websocket => "WEBSOCKET",
            RequestType::Other => "OTHER",
            RequestType::Popup => "POPUP",
        };
        f.write_str(name)
    }
}

/// A network request as seen by the URL rule indices: the request URL (and its lower-cased
/// form, computed once), the host of the document that issued it and whether it crosses a
/// registrable-domain boundary.
#[derive(Clone, Debug)]
pub struct Request {
    pub url: String,
    pub url_lower_cased: String,
    pub source_host: Option<String>,
    pub request_type: RequestType,
    pub is_third_party: bool,
}

impl Request {
    /// Construct a new [`Request`] from the request URL and the URL of the document issuing it.
    pub fn new(url: &str, document_url: &str, request_type: RequestType) -> Request {
        let source_host = domain::get_host(document_url).map(|h| h.into_owned());
        let is_third_party = domain::is_third_party_request(url, document_url);
        Request::preparsed(url, source_host, request_type, is_third_party)
    }

    /// If the caller already knows the document host and the third-party flag, this avoids
    /// extra public suffix lookups. Take care to pass data correctly.
    pub fn preparsed(
        url: &str,
        source_host: Option<String>,
        request_type: RequestType,
        is_third_party: bool,
    ) -> Request {
        Request {
            url: url.to_owned(),
            url_lower_cased: url.to_lowercase(),
            source_host: source_host.filter(|h| !h.is_empty()),
            request_type,
            is_third_party,
        }
    }

    pub fn source_host(&self) -> Option<&str> {
        self.source_host.as_deref()
    }
}

#[cfg(test)]
#[path = "../tests/unit/request.rs"]
mod unit_tests;
