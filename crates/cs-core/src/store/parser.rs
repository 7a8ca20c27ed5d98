//! The contract between the store and the external document parsers.
//!
//! The store never reads bytes itself. It builds a [`LoadRequest`] and hands
//! it to a [`DocumentParser`], which fetches from the locator and returns a
//! finished [`Document`].

use std::fmt;

use cs_common::{Result, Version};
use cs_tree::{Document, Settings};
use serde::{Deserialize, Serialize};

/// Wire format the parser is expected to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Xml,
    Json,
    Yaml,
    Other,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Xml => write!(f, "xml"),
            DocumentFormat::Json => write!(f, "json"),
            DocumentFormat::Yaml => write!(f, "yaml"),
            DocumentFormat::Other => write!(f, "other"),
        }
    }
}

/// Key material passed through to parsers that decrypt sections.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Everything a parser needs to produce one document.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Cache key; the parsed header must carry the same name.
    pub name: String,
    /// URI or path, interpreted by the parser.
    pub locator: String,
    pub format: DocumentFormat,
    pub version: Version,
    pub settings: Settings,
    pub secret: Option<Secret>,
}

impl LoadRequest {
    pub fn new(name: impl Into<String>, locator: impl Into<String>, version: Version) -> Self {
        LoadRequest {
            name: name.into(),
            locator: locator.into(),
            format: DocumentFormat::default(),
            version,
            settings: Settings::default(),
            secret: None,
        }
    }

    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.secret = Some(secret);
        self
    }
}

/// Turns a load request into a document.
///
/// Errors should be reported as [`cs_common::Error::Load`]; the store
/// passes them through unchanged.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, request: &LoadRequest) -> Result<Document>;
}

impl<F> DocumentParser for F
where
    F: Fn(&LoadRequest) -> Result<Document> + Send + Sync,
{
    fn parse(&self, request: &LoadRequest) -> Result<Document> {
        self(request)
    }
}
