//! Domain data structures for plates, classifications, and verification results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Backend strategies known to patentes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Scrape of the MTT government query page.
    #[serde(rename = "html-fetch")]
    HtmlFetch,
    /// Google Apps Script proxy returning ready-made JSON.
    #[serde(rename = "google-apps-script")]
    GoogleAppsScript,
    /// Boostr commercial vehicle API.
    #[serde(rename = "boostr-api")]
    BoostrApi,
}

impl Source {
    /// Stable identifier reported to callers as `source`.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Source::HtmlFetch => "html-fetch",
            Source::GoogleAppsScript => "google-apps-script",
            Source::BoostrApi => "boostr-api",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.slug())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown lookup strategy: {0}")]
/// Returned when a strategy identifier does not name a known [`Source`].
pub struct UnknownSource(pub String);

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "html-fetch" => Ok(Source::HtmlFetch),
            "google-apps-script" => Ok(Source::GoogleAppsScript),
            "boostr-api" => Ok(Source::BoostrApi),
            other => Err(UnknownSource(other.to_owned())),
        }
    }
}

/// Canonical plate: uppercase ASCII letters and digits matching an accepted shape.
///
/// Only [`crate::normalize::normalize`] produces values of this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Plate(String);

impl Plate {
    pub(crate) fn from_canonical(canonical: String) -> Self {
        Self(canonical)
    }

    /// Borrow the canonical string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the plate and return the canonical string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<str> for Plate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What kind of vehicle a lookup decided the plate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Shared-ride taxi.
    #[serde(rename = "colectivo")]
    Colectivo,
    /// Regular taxi.
    #[serde(rename = "taxi")]
    Taxi,
    /// School transport.
    #[serde(rename = "escolar")]
    SchoolTransport,
    /// Registered, but not one of the public-transport kinds above.
    #[serde(rename = "otro")]
    Other,
    /// The backend reports no record for the plate.
    #[serde(rename = "no-encontrado")]
    NotFound,
    /// The input never matched an accepted plate shape.
    #[serde(rename = "invalida")]
    Invalid,
    /// The lookup failed.
    #[serde(rename = "error")]
    Error,
}

impl Classification {
    /// Wire value used for the `tipo` field.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Classification::Colectivo => "colectivo",
            Classification::Taxi => "taxi",
            Classification::SchoolTransport => "escolar",
            Classification::Other => "otro",
            Classification::NotFound => "no-encontrado",
            Classification::Invalid => "invalida",
            Classification::Error => "error",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.slug())
    }
}

/// Strategy answer before the service attaches plate, timing, and provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the query succeeded with a meaningful answer.
    pub ok: bool,
    /// Vehicle classification.
    #[serde(rename = "tipo")]
    pub classification: Classification,
    /// Optional diagnostic text.
    #[serde(rename = "detalle", default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Public-transport flag, when the backend reports one.
    #[serde(
        rename = "esTransportePublico",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_public_transport: Option<bool>,
    /// School-transport flag, when the backend reports one.
    #[serde(
        rename = "esTransporteEscolar",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_school_transport: Option<bool>,
}

impl Verdict {
    /// Build a verdict without diagnostic text or transport flags.
    #[must_use]
    pub fn new(ok: bool, classification: Classification) -> Self {
        Self {
            ok,
            classification,
            detail: None,
            is_public_transport: None,
            is_school_transport: None,
        }
    }

    /// Attach the public/school transport flags reported by the backend.
    #[must_use]
    pub fn with_transport_flags(mut self, public: bool, school: bool) -> Self {
        self.is_public_transport = Some(public);
        self.is_school_transport = Some(school);
        self
    }
}

/// Uniform answer returned to callers for every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// True only when the query produced a meaningful answer.
    pub ok: bool,
    /// Vehicle classification.
    #[serde(rename = "tipo")]
    pub classification: Classification,
    /// Canonical plate, or the raw input when it was rejected.
    #[serde(rename = "patente")]
    pub plate: String,
    /// Milliseconds spent in the lookup; absent for rejected input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms: Option<u64>,
    /// Strategy that produced the answer; absent for rejected input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Diagnostic text, present on errors.
    #[serde(rename = "detalle", default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Public-transport flag, when the backend reports one.
    #[serde(
        rename = "esTransportePublico",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_public_transport: Option<bool>,
    /// School-transport flag, when the backend reports one.
    #[serde(
        rename = "esTransporteEscolar",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_school_transport: Option<bool>,
}

impl VerificationResult {
    /// Result for input that matched no accepted plate shape. Echoes the raw input.
    #[must_use]
    pub fn invalid(raw: &str) -> Self {
        Self {
            ok: false,
            classification: Classification::Invalid,
            plate: raw.to_owned(),
            ms: None,
            source: None,
            detail: None,
            is_public_transport: None,
            is_school_transport: None,
        }
    }

    /// Merge a strategy verdict with plate, provenance, and elapsed time.
    #[must_use]
    pub fn answered(plate: Plate, source: Source, ms: u64, verdict: Verdict) -> Self {
        Self {
            ok: verdict.ok,
            classification: verdict.classification,
            plate: plate.into_string(),
            ms: Some(ms),
            source: Some(source),
            detail: verdict.detail,
            is_public_transport: verdict.is_public_transport,
            is_school_transport: verdict.is_school_transport,
        }
    }

    /// Result for a lookup that failed.
    #[must_use]
    pub fn failed(plate: Plate, source: Source, ms: u64, detail: String) -> Self {
        Self {
            ok: false,
            classification: Classification::Error,
            plate: plate.into_string(),
            ms: Some(ms),
            source: Some(source),
            detail: Some(detail),
            is_public_transport: None,
            is_school_transport: None,
        }
    }
}
