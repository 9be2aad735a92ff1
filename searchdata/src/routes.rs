//! Document URL grammar
//!
//! Callers address documents as
//! `services/search-data-service/v1/search/indexes/{index}/documents/{id}`.
//! Bulk requests carry these URLs, so index and id are recovered from them.

use crate::error::{Error, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

pub const INDEXES_SEGMENT: &str = "indexes";
pub const DOCUMENTS_SEGMENT: &str = "documents";

/// Index and optional document id parsed from a document URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    pub index: String,
    pub id: Option<String>,
}

impl DocumentPath {
    /// Parse `.../indexes/{index}[/documents[/{id}]]`.
    ///
    /// Absolute URLs are accepted (only the path is used) and a query string
    /// is ignored. The first `indexes` segment anchors the match, so ids and
    /// index names may themselves be `indexes`. Segments are percent-decoded.
    /// Any other shape is rejected.
    pub fn parse(url: &str) -> Result<Self> {
        let malformed = || Error::InvalidRequest(format!("malformed document URL '{}'", url));
        let segments = segments(url).ok_or_else(malformed)?;

        let pos = segments
            .iter()
            .position(|s| s == INDEXES_SEGMENT)
            .ok_or_else(malformed)?;
        let index = segments.get(pos + 1).ok_or_else(malformed)?;
        if index == DOCUMENTS_SEGMENT {
            return Err(malformed());
        }

        let id = match &segments[pos + 2..] {
            [] => None,
            [marker] if marker == DOCUMENTS_SEGMENT => None,
            [marker, id] if marker == DOCUMENTS_SEGMENT => Some(id.clone()),
            _ => return Err(malformed()),
        };

        Ok(Self {
            index: index.clone(),
            id,
        })
    }

    /// Render back to a document URL under `prefix`.
    pub fn to_url(&self, prefix: &str) -> String {
        let prefix = prefix.trim_end_matches('/');
        match &self.id {
            Some(id) => format!(
                "{}/{}/{}/{}/{}",
                prefix,
                INDEXES_SEGMENT,
                encode(&self.index),
                DOCUMENTS_SEGMENT,
                encode(id)
            ),
            None => format!("{}/{}/{}", prefix, INDEXES_SEGMENT, encode(&self.index)),
        }
    }
}

/// Index token of a URL: the segment following `indexes`.
pub fn index_token(url: &str) -> Option<String> {
    match DocumentPath::parse(url) {
        Ok(path) => Some(path.index),
        Err(_) => token_after(url, INDEXES_SEGMENT),
    }
}

/// Document id token of a URL: the segment following `documents`.
pub fn id_token(url: &str) -> Option<String> {
    match DocumentPath::parse(url) {
        Ok(path) => path.id,
        Err(_) => token_after(url, DOCUMENTS_SEGMENT),
    }
}

/// Fallback for URLs outside the document grammar.
fn token_after(url: &str, marker: &str) -> Option<String> {
    let segments = segments(url)?;
    let pos = segments.iter().position(|s| s == marker)?;
    segments.get(pos + 1).cloned()
}

/// Decoded, non-empty path segments. `None` when a segment does not decode
/// to UTF-8.
fn segments(url: &str) -> Option<Vec<String>> {
    let path = match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            rest.find('/').map(|p| &rest[p..]).unwrap_or("")
        }
        None => url,
    };
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            percent_decode_str(s)
                .decode_utf8()
                .ok()
                .map(|decoded| decoded.into_owned())
        })
        .collect()
}

/// Characters escaped when rendering a segment back into a URL.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'<')
    .add(b'>');

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}
