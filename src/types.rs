//! Core types shared across the pipeline

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Minimum width of the zero-padded ordinal in an article id
const ORDINAL_WIDTH: usize = 3;

/// Error returned when a string is not of the shape `prefix-NNN`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid article id '{0}': expected <prefix>-<number>")]
pub struct ParseArticleIdError(pub String);

/// Article identifier of the shape `prefix-NNN`.
///
/// Built from an ordinal, the id is rendered zero-padded to at least three
/// digits, so `ArticleId::new("scp", 7)` displays as `scp-007` while ordinal
/// 1234 displays as `scp-1234`. A parsed id keeps the digits as written:
/// `scp-0173` stays `scp-0173` and `scp-7` stays `scp-7`. Ids order by
/// ordinal first, then by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArticleId {
    prefix: String,
    ordinal: u64,
    /// Minimum digit count when rendered
    width: usize,
}

impl ArticleId {
    /// Create an id from a prefix and ordinal
    pub fn new(prefix: impl Into<String>, ordinal: u64) -> Self {
        Self {
            prefix: prefix.into(),
            ordinal,
            width: ORDINAL_WIDTH,
        }
    }

    /// Parse an id such as `scp-173`
    pub fn parse(s: &str) -> Result<Self, ParseArticleIdError> {
        let (prefix, digits) = s
            .rsplit_once('-')
            .ok_or_else(|| ParseArticleIdError(s.to_string()))?;

        if prefix.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseArticleIdError(s.to_string()));
        }

        let ordinal = digits
            .parse::<u64>()
            .map_err(|_| ParseArticleIdError(s.to_string()))?;

        let mut id = Self::new(prefix, ordinal);
        // Canonical spellings compare equal to ids built with `new`
        if format!("{:0width$}", ordinal, width = ORDINAL_WIDTH) != digits {
            id.width = digits.len();
        }
        Ok(id)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:0width$}",
            self.prefix,
            self.ordinal,
            width = self.width
        )
    }
}

impl FromStr for ArticleId {
    type Err = ParseArticleIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ArticleId {
    type Error = ParseArticleIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ArticleId> for String {
    fn from(id: ArticleId) -> Self {
        id.to_string()
    }
}

impl Ord for ArticleId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal
            .cmp(&other.ordinal)
            .then_with(|| self.prefix.cmp(&other.prefix))
            .then_with(|| self.width.cmp(&other.width))
    }
}

impl PartialOrd for ArticleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Generate ids for an inclusive ordinal range, ascending
pub fn id_range(prefix: &str, start: u64, end: u64) -> impl Iterator<Item = ArticleId> + '_ {
    (start..=end).map(move |ordinal| ArticleId::new(prefix, ordinal))
}
