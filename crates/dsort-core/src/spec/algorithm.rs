//! Sort algorithms and key extraction rules.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{Error, Result};

/// Default extension of the per-record file a content sort reads keys from.
pub const DEFAULT_CONTENT_KEY_EXTENSION: &str = ".key";

/// Recognized sort algorithm identifiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlgorithmKind {
    /// Orders records by name.
    Alphanumeric,
    /// Orders records by a seeded pseudo-random permutation.
    Shuffle,
    /// Orders records by a key stored alongside each record.
    Content,
}

/// How a content key is interpreted when compared.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentKeyType {
    Int,
    Float,
    #[default]
    String,
}

/// Rule that derives the sort key of every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRule {
    /// The record name is the key.
    RecordName,
    /// Keys are drawn from a generator seeded with `seed`, which is set from
    /// the creation time when the job is created without one.
    Random { seed: Option<u64> },
    /// The key is the content of the record file with the given extension.
    Content {
        extension: String,
        format: ContentKeyType,
    },
}

/// A validated sort algorithm together with its key extraction rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortAlgorithm {
    kind: AlgorithmKind,
    decreasing: bool,
    key: KeyRule,
}

impl SortAlgorithm {
    /// Creates an algorithm with the default key rule for `kind`.
    pub fn new(kind: AlgorithmKind) -> Self {
        let key = match kind {
            AlgorithmKind::Alphanumeric => KeyRule::RecordName,
            AlgorithmKind::Shuffle => KeyRule::Random { seed: None },
            AlgorithmKind::Content => KeyRule::Content {
                extension: DEFAULT_CONTENT_KEY_EXTENSION.to_owned(),
                format: ContentKeyType::default(),
            },
        };

        Self {
            kind,
            decreasing: false,
            key,
        }
    }

    pub fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    pub fn decreasing(&self) -> bool {
        self.decreasing
    }

    pub fn key(&self) -> &KeyRule {
        &self.key
    }

    /// Fills in a missing shuffle seed.
    pub(crate) fn seed_if_unset(&mut self, seed: u64) {
        if let KeyRule::Random { seed: current @ None } = &mut self.key {
            *current = Some(seed);
        }
    }
}

/// Algorithm as accepted on the wire: a bare identifier or a detailed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub enum AlgorithmRequest {
    /// Algorithm identifier with default key rule, e.g. `"content"`.
    Kind(String),
    /// Algorithm with explicit options.
    Detailed(AlgorithmOptions),
}

/// Detailed algorithm options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct AlgorithmOptions {
    /// One of `alphanumeric`, `shuffle`, `content`.
    pub kind: String,
    /// Sort in decreasing order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decreasing: Option<bool>,
    /// Decimal seed for `shuffle`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    /// Key file extension for `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Key type for `content`: `int`, `float` or `string`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_type: Option<String>,
}

impl From<AlgorithmKind> for AlgorithmRequest {
    fn from(kind: AlgorithmKind) -> Self {
        Self::Kind(kind.to_string())
    }
}

impl From<&str> for AlgorithmRequest {
    fn from(kind: &str) -> Self {
        Self::Kind(kind.to_owned())
    }
}

fn parse_kind(identifier: &str) -> Result<AlgorithmKind> {
    AlgorithmKind::from_str(identifier).map_err(|source| {
        Error::invalid_spec(format!("unrecognized sort algorithm `{identifier}`"))
            .with_source(source)
    })
}

impl TryFrom<AlgorithmRequest> for SortAlgorithm {
    type Error = Error;

    fn try_from(request: AlgorithmRequest) -> Result<Self> {
        let options = match request {
            AlgorithmRequest::Kind(kind) => return Ok(Self::new(parse_kind(&kind)?)),
            AlgorithmRequest::Detailed(options) => options,
        };

        let mut algorithm = Self::new(parse_kind(&options.kind)?);
        algorithm.decreasing = options.decreasing.unwrap_or_default();

        match &mut algorithm.key {
            KeyRule::RecordName => {}
            KeyRule::Random { seed } => {
                *seed = options
                    .seed
                    .as_deref()
                    .map(|text| {
                        text.parse::<u64>().map_err(|_| {
                            Error::invalid_spec(format!(
                                "shuffle seed `{text}` is not a decimal number"
                            ))
                        })
                    })
                    .transpose()?;
            }
            KeyRule::Content { extension, format } => {
                if let Some(requested) = options.extension {
                    if requested.is_empty() {
                        return Err(Error::invalid_spec(
                            "content sort key extension must not be empty",
                        ));
                    }
                    *extension = requested;
                }
                if let Some(requested) = options.format_type.as_deref() {
                    *format = ContentKeyType::from_str(requested).map_err(|_| {
                        Error::invalid_spec(format!(
                            "unrecognized content key type `{requested}`"
                        ))
                    })?;
                }
            }
        }

        Ok(algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn detailed(kind: &str) -> AlgorithmOptions {
        AlgorithmOptions {
            kind: kind.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn bare_identifier_uses_default_key_rule() {
        let algorithm = SortAlgorithm::try_from(AlgorithmRequest::Kind("content".into())).unwrap();
        assert_eq!(algorithm.kind(), AlgorithmKind::Content);
        assert_eq!(
            algorithm.key(),
            &KeyRule::Content {
                extension: ".key".into(),
                format: ContentKeyType::String,
            }
        );
        assert!(!algorithm.decreasing());
    }

    #[test]
    fn unknown_identifier_is_invalid() {
        let error = SortAlgorithm::try_from(AlgorithmRequest::Kind("bogosort".into())).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidSpec);
    }

    #[test]
    fn detailed_content_options_are_applied() {
        let request = AlgorithmRequest::Detailed(AlgorithmOptions {
            extension: Some(".cls".into()),
            format_type: Some("int".into()),
            decreasing: Some(true),
            ..detailed("content")
        });

        let algorithm = SortAlgorithm::try_from(request).unwrap();
        assert!(algorithm.decreasing());
        assert_eq!(
            algorithm.key(),
            &KeyRule::Content {
                extension: ".cls".into(),
                format: ContentKeyType::Int,
            }
        );
    }

    #[test]
    fn malformed_key_rules_are_invalid() {
        let empty_extension = AlgorithmOptions {
            extension: Some(String::new()),
            ..detailed("content")
        };
        let bad_format = AlgorithmOptions {
            format_type: Some("date".into()),
            ..detailed("content")
        };
        let bad_seed = AlgorithmOptions {
            seed: Some("abc".into()),
            ..detailed("shuffle")
        };

        for options in [empty_extension, bad_format, bad_seed] {
            let error = SortAlgorithm::try_from(AlgorithmRequest::Detailed(options)).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InvalidSpec);
        }
    }

    #[test]
    fn shuffle_seed_is_parsed() {
        let options = AlgorithmOptions {
            seed: Some("42".into()),
            ..detailed("shuffle")
        };
        let algorithm = SortAlgorithm::try_from(AlgorithmRequest::Detailed(options)).unwrap();
        assert_eq!(algorithm.key(), &KeyRule::Random { seed: Some(42) });
    }

    #[test]
    fn wire_accepts_string_or_object() {
        let bare: AlgorithmRequest = serde_json::from_str(r#""shuffle""#).unwrap();
        assert_eq!(bare, AlgorithmRequest::Kind("shuffle".into()));

        let object: AlgorithmRequest =
            serde_json::from_str(r#"{"kind":"alphanumeric","decreasing":true}"#).unwrap();
        assert!(matches!(object, AlgorithmRequest::Detailed(ref o) if o.kind == "alphanumeric"));
    }
}
