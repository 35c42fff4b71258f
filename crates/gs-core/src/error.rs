// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for guest-share core

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Filesystem entry error, as reported by an [`crate::resolver::EntryProvider`]
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("name not allowed")]
    InvalidName,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported")]
    Unsupported,
}

impl FsError {
    pub fn is_not_found(&self) -> bool {
        match self {
            FsError::NotFound => true,
            FsError::Io(err) => err.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;

/// Singleton initialization failure
///
/// Shared between every caller waiting on the same initialization, so the
/// underlying error sits behind an `Arc`.
#[derive(thiserror::Error, Debug, Clone)]
#[error("initialization failed: {0}")]
pub struct InitError(pub Arc<dyn std::error::Error + Send + Sync>);

impl InitError {
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }
}

impl From<FsError> for InitError {
    fn from(err: FsError) -> Self {
        Self::new(err)
    }
}

/// Configuration loading errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid path '{0}': paths must be absolute")]
    RelativePath(String),

    #[error("Could not determine config directory")]
    NoConfigDir,
}
