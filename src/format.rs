//! Wire formats for accounts and the content negotiation that picks between them.
//!
//! Both formats carry the same fields. A single account is encoded in XML under
//! a `<compte>` root, and a list as `<List><item>...</item></List>`.

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{
        StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
        request::Parts,
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Compte, ComptePayload, Error};

/// The media type for JSON bodies.
pub const APPLICATION_JSON: &str = "application/json";
/// The media type for XML bodies.
pub const APPLICATION_XML: &str = "application/xml";

const COMPTE_ROOT: &str = "compte";
const LIST_ROOT: &str = "List";

/// The encoding used for request and response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// `application/json`
    #[default]
    Json,
    /// `application/xml`
    Xml,
}

/// A body could not be encoded or decoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// The JSON library rejected the value or the text.
    #[error("invalid JSON: {0}")]
    Json(String),

    /// The XML library rejected the value or the text.
    #[error("invalid XML: {0}")]
    Xml(String),
}

#[derive(Serialize)]
struct CompteListRef<'a> {
    #[serde(rename = "item")]
    items: &'a [Compte],
}

#[derive(Deserialize)]
struct CompteList {
    #[serde(rename = "item", default)]
    items: Vec<Compte>,
}

impl Format {
    /// Every format, JSON first.
    pub const ALL: [Format; 2] = [Format::Json, Format::Xml];

    /// The media type sent in `Accept` and `Content-Type` headers.
    pub fn mime(self) -> &'static str {
        match self {
            Format::Json => APPLICATION_JSON,
            Format::Xml => APPLICATION_XML,
        }
    }

    /// Pick the response format for the value of an `Accept` header.
    ///
    /// Each format takes the quality of the most specific media range that
    /// matches it, and the format with the highest non-zero quality wins.
    /// Ties go to the format whose range is listed first, then to JSON.
    /// An empty header means the client accepts anything, which is JSON.
    pub fn from_accept(accept: &str) -> Option<Format> {
        if accept.trim().is_empty() {
            return Some(Format::Json);
        }

        let ranges: Vec<MediaRange> = accept
            .split(',')
            .filter(|range| !range.trim().is_empty())
            .map(MediaRange::parse)
            .collect();

        let mut best: Option<(Format, f32, usize)> = None;
        for format in Format::ALL {
            let Some((quality, position)) = format.preference(&ranges) else {
                continue;
            };
            if quality <= 0.0 {
                continue;
            }

            let is_better = match best {
                None => true,
                Some((_, best_quality, best_position)) => {
                    quality > best_quality
                        || (quality == best_quality && position < best_position)
                }
            };
            if is_better {
                best = Some((format, quality, position));
            }
        }

        best.map(|(format, _, _)| format)
    }

    /// The quality the client gave this format and the position of the range
    /// that gave it, or `None` if no range matches.
    fn preference(self, ranges: &[MediaRange]) -> Option<(f32, usize)> {
        let specificity = |range: &MediaRange| -> Option<u8> {
            if range.media_type == "*/*" {
                Some(0)
            } else if let Some(top_level) = range.media_type.strip_suffix("/*") {
                self.media_types()
                    .iter()
                    .any(|media_type| media_type.split('/').next() == Some(top_level))
                    .then_some(1)
            } else {
                self.media_types()
                    .iter()
                    .any(|media_type| *media_type == range.media_type)
                    .then_some(2)
            }
        };

        let matches: Vec<(u8, usize, &MediaRange)> = ranges
            .iter()
            .enumerate()
            .filter_map(|(position, range)| {
                specificity(range).map(|level| (level, position, range))
            })
            .collect();
        let most_specific = matches.iter().map(|(level, _, _)| *level).max()?;

        matches
            .iter()
            .filter(|(level, _, _)| *level == most_specific)
            .map(|(_, position, range)| (range.quality, *position))
            .reduce(|best, candidate| {
                if candidate.0 > best.0 {
                    candidate
                } else {
                    best
                }
            })
    }

    /// The media types a body in this format may be labelled with.
    fn media_types(self) -> &'static [&'static str] {
        match self {
            Format::Json => &[APPLICATION_JSON],
            Format::Xml => &[APPLICATION_XML, "text/xml"],
        }
    }

    /// Get the format of a body from the value of its `Content-Type` header.
    pub fn from_content_type(content_type: &str) -> Option<Format> {
        Format::from_media_type(&media_type(content_type))
    }

    fn from_media_type(media_type: &str) -> Option<Format> {
        match media_type {
            APPLICATION_JSON => Some(Format::Json),
            APPLICATION_XML | "text/xml" => Some(Format::Xml),
            _ => None,
        }
    }

    /// Encode a single account.
    pub fn encode_compte(self, compte: &Compte) -> Result<String, CodecError> {
        self.encode(COMPTE_ROOT, compte)
    }

    /// Encode a create or update request body.
    pub fn encode_payload(self, payload: &ComptePayload) -> Result<String, CodecError> {
        self.encode(COMPTE_ROOT, payload)
    }

    /// Encode a list of accounts, keeping their order.
    pub fn encode_comptes(self, comptes: &[Compte]) -> Result<String, CodecError> {
        match self {
            Format::Json => self.encode(LIST_ROOT, &comptes),
            Format::Xml => self.encode(LIST_ROOT, &CompteListRef { items: comptes }),
        }
    }

    /// Decode a single account.
    pub fn decode_compte(self, body: &str) -> Result<Compte, CodecError> {
        self.decode(body)
    }

    /// Decode a create or update request body.
    pub fn decode_payload(self, body: &str) -> Result<ComptePayload, CodecError> {
        self.decode(body)
    }

    /// Decode a list of accounts, keeping their order.
    pub fn decode_comptes(self, body: &str) -> Result<Vec<Compte>, CodecError> {
        match self {
            Format::Json => self.decode(body),
            Format::Xml => self.decode::<CompteList>(body).map(|list| list.items),
        }
    }

    fn encode<T: Serialize + ?Sized>(self, xml_root: &str, value: &T) -> Result<String, CodecError> {
        match self {
            Format::Json => {
                serde_json::to_string(value).map_err(|error| CodecError::Json(error.to_string()))
            }
            Format::Xml => quick_xml::se::to_string_with_root(xml_root, value)
                .map_err(|error| CodecError::Xml(error.to_string())),
        }
    }

    fn decode<T: DeserializeOwned>(self, body: &str) -> Result<T, CodecError> {
        match self {
            Format::Json => {
                serde_json::from_str(body).map_err(|error| CodecError::Json(error.to_string()))
            }
            Format::Xml => {
                quick_xml::de::from_str(body).map_err(|error| CodecError::Xml(error.to_string()))
            }
        }
    }

    /// Build a response with `body`, which must already be encoded in this format.
    pub(crate) fn respond(self, status: StatusCode, body: String) -> Response {
        (status, [(CONTENT_TYPE, self.mime())], body).into_response()
    }
}

/// The media type of a header value, without parameters and in lower case.
fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// One entry of an `Accept` header.
struct MediaRange {
    media_type: String,
    quality: f32,
}

impl MediaRange {
    /// Parse a media range such as `application/xml;q=0.5`.
    ///
    /// A missing or unreadable `q` parameter counts as `1`.
    fn parse(range: &str) -> Self {
        let quality = range
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
            .and_then(|(_, value)| value.trim().parse::<f32>().ok())
            .filter(|quality| quality.is_finite())
            .map_or(1.0, |quality| quality.clamp(0.0, 1.0));

        Self {
            media_type: media_type(range),
            quality,
        }
    }
}

/// Extracts the response [Format] from the `Accept` header.
///
/// Rejects the request with `406 Not Acceptable` if no listed media type can
/// be produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptFormat(pub Format);

impl<S> FromRequestParts<S> for AcceptFormat
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let accept = match parts.headers.get(ACCEPT) {
            Some(value) => value
                .to_str()
                .map_err(|_| {
                    Error::NotAcceptable(String::from_utf8_lossy(value.as_bytes()).into_owned())
                })?
                .to_owned(),
            None => String::new(),
        };

        Format::from_accept(&accept)
            .map(AcceptFormat)
            .ok_or(Error::NotAcceptable(accept))
    }
}

/// Extracts a [ComptePayload] from a JSON or XML body, chosen by `Content-Type`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompteBody(pub ComptePayload);

impl<S> FromRequest<S> for CompteBody
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();

        let format = Format::from_content_type(&content_type)
            .ok_or(Error::UnsupportedMediaType(content_type))?;

        let body = String::from_request(request, state)
            .await
            .map_err(|rejection| Error::InvalidBody(rejection.body_text()))?;

        format
            .decode_payload(&body)
            .map(CompteBody)
            .map_err(|error| Error::InvalidBody(error.to_string()))
    }
}

#[cfg(test)]
mod negotiation_tests {
    use super::Format;

    #[test]
    fn missing_accept_defaults_to_json() {
        assert_eq!(Format::from_accept(""), Some(Format::Json));
    }

    #[test]
    fn picks_producible_media_type() {
        assert_eq!(Format::from_accept("application/xml"), Some(Format::Xml));
        assert_eq!(Format::from_accept("text/html, text/xml"), Some(Format::Xml));
        assert_eq!(Format::from_accept("*/*"), Some(Format::Json));
        assert_eq!(Format::from_accept("application/*"), Some(Format::Json));
        assert_eq!(Format::from_accept("text/*"), Some(Format::Xml));
    }

    #[test]
    fn highest_quality_wins() {
        assert_eq!(
            Format::from_accept("application/json;q=0.1, application/xml"),
            Some(Format::Xml)
        );
        assert_eq!(
            Format::from_accept("text/html, text/xml;q=0.9, application/json"),
            Some(Format::Json)
        );
        assert_eq!(
            Format::from_accept("application/xml; q=0.8, application/json; q=0.5"),
            Some(Format::Xml)
        );
    }

    #[test]
    fn equal_quality_goes_to_first_listed() {
        assert_eq!(
            Format::from_accept("application/xml, application/json"),
            Some(Format::Xml)
        );
        assert_eq!(
            Format::from_accept("application/json, application/xml"),
            Some(Format::Json)
        );
    }

    #[test]
    fn skips_refused_media_types() {
        assert_eq!(
            Format::from_accept("application/xml;q=0, application/json"),
            Some(Format::Json)
        );
        assert_eq!(
            Format::from_accept("application/json;q=0, */*"),
            Some(Format::Xml)
        );
        assert_eq!(Format::from_accept("application/json;q=0"), None);
    }

    #[test]
    fn unknown_media_types_are_not_acceptable() {
        assert_eq!(Format::from_accept("text/html"), None);
    }

    #[test]
    fn content_type_ignores_parameters_and_case() {
        assert_eq!(
            Format::from_content_type("Application/JSON; charset=utf-8"),
            Some(Format::Json)
        );
        assert_eq!(Format::from_content_type("text/plain"), None);
        assert_eq!(Format::from_content_type(""), None);
    }
}
