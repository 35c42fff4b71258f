// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Absolute paths as segment lists
//!
//! Shared-path bookkeeping compares paths segment by segment, so `/a/bc` is
//! never mistaken for a descendant of `/a/b`, and redundant or trailing
//! separators do not create distinct keys.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Normalized absolute path. The empty segment list is the root `/`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SharePath {
    segments: Vec<String>,
}

impl SharePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path, ignoring empty and `.` segments. Leading `/` is optional.
    ///
    /// `..` removes the previous segment and never climbs above `/`.
    pub fn parse(path: &str) -> Self {
        let mut parsed = Self::root();
        parsed.push_components(path);
        parsed
    }

    fn push_components(&mut self, path: &str) {
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    self.segments.pop();
                }
                name => self.segments.push(name.to_string()),
            }
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<SharePath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append `relative`; its `..` segments climb from `self`, clamped at `/`
    pub fn join(&self, relative: &str) -> SharePath {
        let mut joined = self.clone();
        joined.push_components(relative);
        joined
    }

    /// True when `self` equals `base` or lies below it
    pub fn starts_with(&self, base: &SharePath) -> bool {
        self.segments.len() >= base.segments.len()
            && self.segments[..base.segments.len()] == base.segments[..]
    }

    pub fn is_strict_descendant_of(&self, base: &SharePath) -> bool {
        self.segments.len() > base.segments.len() && self.starts_with(base)
    }

    /// Path of `self` relative to `base`, as an absolute path rooted at `base`
    pub fn strip_prefix(&self, base: &SharePath) -> Option<SharePath> {
        if !self.starts_with(base) {
            return None;
        }
        Some(Self {
            segments: self.segments[base.segments.len()..].to_vec(),
        })
    }

    /// `self`, then each ancestor in turn, ending with `/`
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            segments: &self.segments,
            remaining: Some(self.segments.len()),
        }
    }
}

/// Iterator returned by [`SharePath::ancestors`]
pub struct Ancestors<'a> {
    segments: &'a [String],
    remaining: Option<usize>,
}

impl Iterator for Ancestors<'_> {
    type Item = SharePath;

    fn next(&mut self) -> Option<SharePath> {
        let len = self.remaining?;
        self.remaining = len.checked_sub(1);
        Some(SharePath {
            segments: self.segments[..len].to_vec(),
        })
    }
}

impl fmt::Display for SharePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for SharePath {
    type Err = ConfigError;

    /// Strict parse used for configuration input: the path must be absolute.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with('/') {
            return Err(ConfigError::RelativePath(s.to_string()));
        }
        Ok(Self::parse(s))
    }
}

impl From<&str> for SharePath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl Serialize for SharePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SharePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
