//! Sort job specifications.
//!
//! [`SortSpecRequest`] is the loosely typed payload accepted from clients.
//! Converting it into a [`SortSpec`] is the only place a specification is
//! validated; a `SortSpec` value is always structurally complete.

mod algorithm;
mod template;

use std::num::NonZeroU64;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::algorithm::{
    AlgorithmKind, AlgorithmOptions, AlgorithmRequest, ContentKeyType, KeyRule, SortAlgorithm,
    DEFAULT_CONTENT_KEY_EXTENSION,
};
pub use self::template::{MAX_TEMPLATE_EXPANSION, ShardTemplate};
use crate::error::{Error, Result};

/// Shard extension assumed when a request does not name one.
pub const DEFAULT_SHARD_EXTENSION: &str = ".tar";

/// Sort specification as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct SortSpecRequest {
    /// Bucket holding the input shards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub bucket: Option<String>,
    /// Shard file extension, `.tar` by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub extension: Option<String>,
    /// Explicit list of input shard names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "must name at least one shard"))]
    pub shards: Option<Vec<String>>,
    /// Input shard name template, e.g. `shard-{0..9}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,
    /// Output shard name template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    /// Target size of every output shard in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "must be positive"))]
    pub output_shard_size: Option<u64>,
    /// Sort algorithm identifier or detailed options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<AlgorithmRequest>,
}

impl SortSpecRequest {
    /// Creates a request over an explicit shard list.
    pub fn with_shards<I, S>(shards: I, algorithm: impl Into<AlgorithmRequest>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shards: Some(shards.into_iter().map(Into::into).collect()),
            algorithm: Some(algorithm.into()),
            ..Default::default()
        }
    }

    /// Creates a request over a shard name template.
    pub fn with_input_format(
        input_format: impl Into<String>,
        algorithm: impl Into<AlgorithmRequest>,
    ) -> Self {
        Self {
            input_format: Some(input_format.into()),
            algorithm: Some(algorithm.into()),
            ..Default::default()
        }
    }
}

/// Selection of the input shards of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardSelection {
    /// Explicit, non-empty list of names.
    List(Vec<String>),
    /// Names produced by a template.
    Template(ShardTemplate),
}

impl ShardSelection {
    /// Number of selected shards.
    pub fn len(&self) -> u64 {
        match self {
            Self::List(names) => names.len() as u64,
            Self::Template(template) => template.len(),
        }
    }

    /// Selections are never empty once validated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every selected shard name.
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::List(names) => names.clone(),
            Self::Template(template) => template.expand(),
        }
    }
}

/// A validated sort specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    bucket: Option<String>,
    extension: String,
    input: ShardSelection,
    output_format: Option<ShardTemplate>,
    output_shard_size: Option<NonZeroU64>,
    algorithm: SortAlgorithm,
}

impl SortSpec {
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn input(&self) -> &ShardSelection {
        &self.input
    }

    pub fn output_format(&self) -> Option<&ShardTemplate> {
        self.output_format.as_ref()
    }

    pub fn output_shard_size(&self) -> Option<NonZeroU64> {
        self.output_shard_size
    }

    pub fn algorithm(&self) -> &SortAlgorithm {
        &self.algorithm
    }

    /// Derives a missing shuffle seed from the job creation time.
    pub(crate) fn seeded_at(mut self, created_at: Timestamp) -> Self {
        // Low 64 bits of the nanosecond timestamp.
        self.algorithm.seed_if_unset(created_at.as_nanosecond() as u64);
        self
    }
}

impl TryFrom<SortSpecRequest> for SortSpec {
    type Error = Error;

    fn try_from(request: SortSpecRequest) -> Result<Self> {
        request.validate().map_err(|errors| {
            Error::invalid_spec(format!("invalid sort specification: {errors}"))
                .with_source(errors)
        })?;

        let input = match (request.shards, request.input_format) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_spec(
                    "`shards` and `input_format` are mutually exclusive",
                ));
            }
            (None, None) => {
                return Err(Error::invalid_spec(
                    "missing shard selection: set `shards` or `input_format`",
                ));
            }
            (Some(names), None) => {
                if names.iter().any(String::is_empty) {
                    return Err(Error::invalid_spec("shard names must not be empty"));
                }
                ShardSelection::List(names)
            }
            (None, Some(format)) => ShardSelection::Template(ShardTemplate::parse(&format)?),
        };

        let algorithm: SortAlgorithm = request
            .algorithm
            .ok_or_else(|| Error::invalid_spec("missing sort algorithm"))?
            .try_into()?;

        let output_format = request
            .output_format
            .as_deref()
            .map(ShardTemplate::parse)
            .transpose()?;

        Ok(Self {
            bucket: request.bucket,
            extension: request
                .extension
                .unwrap_or_else(|| DEFAULT_SHARD_EXTENSION.to_owned()),
            input,
            output_format,
            output_shard_size: request.output_shard_size.and_then(NonZeroU64::new),
            algorithm,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    /// Two explicit shards sorted by content keys.
    pub(crate) fn content_spec() -> SortSpec {
        SortSpecRequest::with_shards(["a", "b"], "content")
            .try_into()
            .unwrap()
    }

    fn invalid(request: SortSpecRequest) -> Error {
        SortSpec::try_from(request).unwrap_err()
    }

    #[test]
    fn minimal_request_is_accepted() {
        let spec = content_spec();
        assert_eq!(spec.input().names(), vec!["a", "b"]);
        assert_eq!(spec.extension(), DEFAULT_SHARD_EXTENSION);
        assert_eq!(spec.algorithm().kind(), AlgorithmKind::Content);
    }

    #[test]
    fn empty_request_is_invalid() {
        let error = invalid(SortSpecRequest::default());
        assert_eq!(error.kind(), ErrorKind::InvalidSpec);
        assert!(error.to_string().contains("shard selection"));
    }

    #[test]
    fn empty_shard_list_is_invalid() {
        let error = invalid(SortSpecRequest::with_shards(Vec::<String>::new(), "content"));
        assert_eq!(error.kind(), ErrorKind::InvalidSpec);

        let error = invalid(SortSpecRequest::with_shards([""], "content"));
        assert_eq!(error.kind(), ErrorKind::InvalidSpec);
    }

    #[test]
    fn missing_or_unknown_algorithm_is_invalid() {
        let mut request = SortSpecRequest::with_shards(["a"], "content");
        request.algorithm = None;
        assert_eq!(invalid(request).kind(), ErrorKind::InvalidSpec);

        let request = SortSpecRequest::with_shards(["a"], "quicksort");
        assert_eq!(invalid(request).kind(), ErrorKind::InvalidSpec);
    }

    #[test]
    fn both_selections_are_rejected() {
        let mut request = SortSpecRequest::with_shards(["a"], "alphanumeric");
        request.input_format = Some("shard-{0..3}".into());
        assert_eq!(invalid(request).kind(), ErrorKind::InvalidSpec);
    }

    #[test]
    fn template_selection_expands() {
        let spec: SortSpec = SortSpecRequest::with_input_format("shard-{0..9}", "shuffle")
            .try_into()
            .unwrap();
        assert_eq!(spec.input().len(), 10);
        assert_eq!(spec.input().names()[9], "shard-9");
    }

    #[test]
    fn zero_output_shard_size_is_invalid() {
        let mut request = SortSpecRequest::with_shards(["a"], "alphanumeric");
        request.output_shard_size = Some(0);
        assert_eq!(invalid(request).kind(), ErrorKind::InvalidSpec);
    }

    #[test]
    fn malformed_output_format_is_invalid() {
        let mut request = SortSpecRequest::with_shards(["a"], "alphanumeric");
        request.output_format = Some("out-{0..".into());
        assert_eq!(invalid(request).kind(), ErrorKind::InvalidSpec);
    }

    #[test]
    fn deserializes_wire_payload() {
        let request: SortSpecRequest = serde_json::from_value(json!({
            "bucket": "src",
            "extension": ".tgz",
            "input_format": "shard-{00..19}",
            "output_format": "out-{000..9}",
            "output_shard_size": 1048576,
            "algorithm": { "kind": "content", "extension": ".cls", "format_type": "int" }
        }))
        .unwrap();

        let spec = SortSpec::try_from(request).unwrap();
        assert_eq!(spec.bucket(), Some("src"));
        assert_eq!(spec.extension(), ".tgz");
        assert_eq!(spec.input().len(), 20);
        assert_eq!(spec.output_shard_size().map(NonZeroU64::get), Some(1048576));
    }
}
