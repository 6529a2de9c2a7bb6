////////////////////////////////////////////////////////////////////////////////////
// Copyright (c) 2020 DasEtwas - All Rights Reserved                               /
//      Unauthorized copying of this file, via any medium is strictly prohibited   /
//      Proprietary and confidential                                               /
////////////////////////////////////////////////////////////////////////////////////

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::Platform;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The registry could not be read, is not well formed, or references a symbol it never
    ///  defines.
    #[error("failed to load registry {origin}: {reason}")]
    Load { origin: String, reason: String },

    #[error("unknown extension `{name}`")]
    UnknownExtension { name: String },

    #[error("extension `{extension}` is not supported on {platform}")]
    UnsupportedPlatform { extension: String, platform: Platform },

    /// The resolved interface names something the registry cannot describe.
    #[error("cannot generate `{symbol}`: {reason}")]
    Generation { symbol: String, reason: String },

    #[error("invalid {kind} `{value}`")]
    InvalidValue { kind: &'static str, value: String },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn load<O, R>(origin: O, reason: R) -> Error
    where
        O: Into<String>,
        R: Into<String>,
    {
        Error::Load { origin: origin.into(), reason: reason.into() }
    }

    pub(crate) fn generation<S, R>(symbol: S, reason: R) -> Error
    where
        S: Into<String>,
        R: Into<String>,
    {
        Error::Generation { symbol: symbol.into(), reason: reason.into() }
    }
}
