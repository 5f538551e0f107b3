//! Deep links handed to the binary on the command line.

use eyre::WrapErr;
use url::Url;

use crate::routes::Route;

/// Query and optional route of the link the app was opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLink {
    pub query: String,
    pub route: Option<Route>,
}

impl DeepLink {
    /// Accepts a full URL (any scheme), a `/path?query` pair or a bare query
    /// string.
    pub fn parse(raw: &str) -> eyre::Result<Self> {
        let raw = raw.trim();
        if raw.contains("://") {
            let url = Url::parse(raw).wrap_err_with(|| format!("invalid deep link: {raw}"))?;
            return Ok(Self {
                query: url.query().unwrap_or_default().to_owned(),
                route: Route::parse(url.path()),
            });
        }

        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, query),
            None if raw.starts_with('/') => (raw, ""),
            None => ("", raw),
        };
        Ok(Self {
            query: query.to_owned(),
            route: if path.is_empty() {
                None
            } else {
                Route::parse(path)
            },
        })
    }

    /// First positional argument, or an empty link.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> eyre::Result<Self> {
        match args.nth(1) {
            Some(raw) => Self::parse(&raw),
            None => Ok(Self::default()),
        }
    }
}
