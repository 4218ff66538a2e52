//! Shard name templates with brace ranges.
//!
//! A template such as `shard-{000..120..10}.tar` names every shard produced by
//! substituting the range values. Ranges are inclusive, zero padded to the
//! width of their start bound, and a template may contain several of them, in
//! which case the names are the cartesian product in left-to-right order.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Upper bound on the number of names a single template may expand to.
pub const MAX_TEMPLATE_EXPANSION: u64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Range {
        start: u64,
        end: u64,
        step: u64,
        width: usize,
        count: u64,
    },
}

impl Segment {
    fn len(&self) -> u64 {
        match self {
            Self::Literal(_) => 1,
            Self::Range { count, .. } => *count,
        }
    }

    fn value(&self, index: u64) -> String {
        match self {
            Self::Literal(text) => text.clone(),
            Self::Range { start, step, width, .. } => {
                format!("{:0width$}", start + index * step, width = *width)
            }
        }
    }
}

/// A parsed shard name template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl ShardTemplate {
    /// Parses and validates a template.
    pub fn parse(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(Error::invalid_spec("shard template must not be empty"));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find(['{', '}']) {
            if rest[open..].starts_with('}') {
                return Err(unbalanced(source));
            }

            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| unbalanced(source))?;
            let body = &after[..close];
            if body.contains('{') {
                return Err(unbalanced(source));
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(parse_range(source, body)?);
            rest = &after[close + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let template = Self {
            source: source.to_owned(),
            segments,
        };

        let len = template.len();
        if len == 0 || len > MAX_TEMPLATE_EXPANSION {
            return Err(Error::invalid_spec(format!(
                "template `{source}` expands to more than {MAX_TEMPLATE_EXPANSION} names"
            )));
        }

        Ok(template)
    }

    /// Number of names the template expands to, saturating at `u64::MAX`.
    pub fn len(&self) -> u64 {
        self.segments
            .iter()
            .fold(1u64, |acc, segment| acc.saturating_mul(segment.len()))
    }

    /// Templates always expand to at least one name.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if the template contains at least one range.
    pub fn has_ranges(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Range { .. }))
    }

    /// Expands the template into every name it denotes.
    pub fn expand(&self) -> Vec<String> {
        let mut names = vec![String::new()];
        for segment in &self.segments {
            let count = segment.len();
            names = names
                .into_iter()
                .flat_map(|prefix| {
                    (0..count).map(move |index| format!("{prefix}{}", segment.value(index)))
                })
                .collect();
        }

        names
    }

    /// Returns the template as it was written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for ShardTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ShardTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn unbalanced(source: &str) -> Error {
    Error::invalid_spec(format!("unbalanced braces in template `{source}`"))
}

fn parse_range(source: &str, body: &str) -> Result<Segment> {
    let parts: Vec<&str> = body.split("..").collect();
    let (start_text, end_text, step_text) = match parts.as_slice() {
        [start, end] => (*start, *end, None),
        [start, end, step] => (*start, *end, Some(*step)),
        _ => {
            return Err(Error::invalid_spec(format!(
                "range `{{{body}}}` in template `{source}` must look like {{start..end}} or {{start..end..step}}"
            )));
        }
    };

    let number = |text: &str| -> Result<u64> {
        let digits = !text.is_empty() && text.bytes().all(|byte| byte.is_ascii_digit());
        digits.then(|| text.parse::<u64>().ok()).flatten().ok_or_else(|| {
            Error::invalid_spec(format!(
                "range bound `{text}` in template `{source}` is not a non-negative integer"
            ))
        })
    };

    let start = number(start_text)?;
    let end = number(end_text)?;
    let step = step_text.map(number).transpose()?.unwrap_or(1);

    if step == 0 {
        return Err(Error::invalid_spec(format!(
            "range step in template `{source}` must be positive"
        )));
    }
    if start > end {
        return Err(Error::invalid_spec(format!(
            "range start {start} exceeds end {end} in template `{source}`"
        )));
    }

    let count = ((end - start) / step).checked_add(1).ok_or_else(|| {
        Error::invalid_spec(format!(
            "range `{{{body}}}` in template `{source}` has too many values"
        ))
    })?;

    Ok(Segment::Range {
        start,
        end,
        step,
        width: start_text.len(),
        count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn expands_simple_range() {
        let template = ShardTemplate::parse("shard-{0..3}.tar").unwrap();
        assert_eq!(
            template.expand(),
            vec!["shard-0.tar", "shard-1.tar", "shard-2.tar", "shard-3.tar"]
        );
        assert_eq!(template.len(), 4);
    }

    #[test]
    fn pads_to_start_width_and_honors_step() {
        let template = ShardTemplate::parse("out-{000..020..10}").unwrap();
        assert_eq!(template.expand(), vec!["out-000", "out-010", "out-020"]);
    }

    #[test]
    fn multiple_ranges_form_a_product() {
        let template = ShardTemplate::parse("t{1..2}-s{0..1}").unwrap();
        assert_eq!(template.expand(), vec!["t1-s0", "t1-s1", "t2-s0", "t2-s1"]);
    }

    #[test]
    fn template_without_ranges_is_a_single_name() {
        let template = ShardTemplate::parse("single.tar").unwrap();
        assert!(!template.has_ranges());
        assert_eq!(template.expand(), vec!["single.tar"]);
    }

    #[test]
    fn rejects_malformed_templates() {
        for source in [
            "",
            "a-{0..3",
            "a-0..3}",
            "a-{{0..3}}",
            "a-{3..0}",
            "a-{0..3..0}",
            "a-{0}",
            "{a..b}",
            "s-{0..18446744073709551615}",
            "a-{+5..10}",
            "a-{0..+3}",
            "a-{0..9..+1}",
            "a-{..3}",
        ] {
            let error = ShardTemplate::parse(source).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InvalidSpec, "{source}");
        }
    }

    #[test]
    fn largest_single_range_is_rejected_without_overflow() {
        let error = ShardTemplate::parse("s-{0..18446744073709551615}").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidSpec);

        let wide_step = ShardTemplate::parse("s-{0..18446744073709551615..9223372036854775808}")
            .unwrap();
        assert_eq!(wide_step.len(), 2);
        assert_eq!(wide_step.expand(), vec!["s-0", "s-9223372036854775808"]);
    }

    #[test]
    fn rejects_oversized_expansion() {
        let error = ShardTemplate::parse("{0..9999}-{0..9999}").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidSpec);
    }
}
