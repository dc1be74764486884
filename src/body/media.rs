//! Media type parsing and negotiation.

use crate::spec::{ContentMap, MediaTypeMeta};

/// Lowercased `type/subtype` of a content-type header, parameters dropped.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Picks the declared entry for `media_type`: exact, then `type/*`, then `*/*`.
pub fn negotiate<'c>(content: &'c ContentMap, media_type: &str) -> Option<&'c MediaTypeMeta> {
    let exact = content.iter().find(|m| essence(&m.media_type) == media_type);
    exact
        .or_else(|| {
            let (top, _) = media_type.split_once('/')?;
            let wildcard = format!("{top}/*");
            content.iter().find(|m| essence(&m.media_type) == wildcard)
        })
        .or_else(|| content.iter().find(|m| essence(&m.media_type) == "*/*"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decoder {
    Json,
    Form,
    Text,
    Opaque,
}

impl Decoder {
    pub(crate) fn for_media_type(media_type: &str) -> Self {
        let Some((top, sub)) = media_type.split_once('/') else {
            return Decoder::Opaque;
        };
        if sub == "json" || sub.ends_with("+json") {
            Decoder::Json
        } else if media_type == "application/x-www-form-urlencoded" {
            Decoder::Form
        } else if top == "text" {
            Decoder::Text
        } else {
            Decoder::Opaque
        }
    }
}
