//! # Mapping context
//!
//! Per-call state handed through tree construction and materialization.

use std::fmt::{self, Display};
use std::rc::Rc;

use crate::collection::Include;
use crate::path::SEPARATOR;

/// Non-fatal findings raised while building a mapping tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A column has no matching member and is ignored.
    UnresolvedColumn {
        /// Type (or dynamic object path) the column was resolved against.
        container: String,
        /// Full column name.
        column: String,
    },

    /// A column group has no matching nested member and is ignored, along with every column
    /// below it.
    UnresolvedGroup {
        /// Type the group was resolved against.
        container: String,
        /// Group path.
        group: String,
    },

    /// A deferred collection include matched no node of the tree.
    UnmatchedInclude {
        /// Include path, dot separated.
        path: String,
    },
}

impl Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedColumn { container, column } => {
                write!(f, "column `{column}` has no member on `{container}`, ignored")
            }
            Self::UnresolvedGroup { container, group } => {
                write!(f, "column group `{group}` has no member on `{container}`, ignored")
            }
            Self::UnmatchedInclude { path } => {
                write!(f, "include `{path}` matched no mapped object")
            }
        }
    }
}

/// Receives mapping warnings.
pub trait LogSink {
    /// Called once per warning.
    fn warning(&self, warning: &Warning);
}

impl<F: Fn(&Warning)> LogSink for F {
    fn warning(&self, warning: &Warning) {
        self(warning);
    }
}

/// Mapper configuration.
pub(crate) struct Settings {
    pub(crate) separator: String,
    pub(crate) single_result: bool,
    pub(crate) includes: Vec<Include>,
    pub(crate) log: Option<Rc<dyn LogSink>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            separator: SEPARATOR.to_string(),
            single_result: false,
            includes: Vec::new(),
            log: None,
        }
    }
}

/// State for one `map`/`load` call.
pub(crate) struct MappingContext<'a> {
    pub(crate) separator: &'a str,
    pub(crate) single_result: bool,
    pub(crate) includes: &'a [Include],
    log: Option<&'a dyn LogSink>,
}

impl<'a> MappingContext<'a> {
    pub(crate) fn new(settings: &'a Settings) -> Self {
        Self {
            separator: &settings.separator,
            single_result: settings.single_result,
            includes: &settings.includes,
            log: settings.log.as_deref(),
        }
    }

    /// Report a warning to `tracing` and the configured sink.
    pub(crate) fn warn(&self, warning: &Warning) {
        tracing::warn!(%warning, "mapping");
        if let Some(log) = self.log {
            log.warning(warning);
        }
    }
}
