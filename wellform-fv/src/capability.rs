//! Analyzer capability declarations and the capability registry
//!
//! Every analyzer declares, up front, the set of (MIME type, version) pairs
//! it handles. The same declaration answers two questions: which analyzers
//! should run for a detected type, and, after reconciliation, whether an
//! analyzer that ran actually covered the type the file turned out to be.
//!
//! Declarations are plain constructed-once values owned by the analyzer;
//! there is no global registry and nothing is mutated after startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::Analyzer;

/// One capability declaration: a MIME-to-versions table plus matching flags
///
/// An analyzer that emits more than one kind of stream record carries one
/// declaration per kind in its [`SupportMatrix`].
#[derive(Debug, Clone, Default)]
pub struct SupportDecl {
    mimetypes: BTreeMap<String, Vec<String>>,
    any_version: bool,
    full_only: bool,
}

impl SupportDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare support for a MIME type with an explicit version list
    ///
    /// An empty list means only an unset version matches (unless
    /// [`any_version`](Self::any_version) is set).
    pub fn mimetype(mut self, mimetype: impl Into<String>, versions: &[&str]) -> Self {
        self.mimetypes.insert(
            mimetype.into(),
            versions.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Accept every version of the declared MIME types
    pub fn any_version(mut self) -> Self {
        self.any_version = true;
        self
    }

    /// Only match when the caller requests full verification
    pub fn full_only(mut self) -> Self {
        self.full_only = true;
        self
    }

    /// Does this declaration cover `(mimetype, version)`?
    ///
    /// The MIME type must be a declared key. An unset version always matches
    /// a declared key: not knowing the version is not evidence of mismatch.
    pub fn supports(&self, mimetype: &str, version: Option<&str>, full_requested: bool) -> bool {
        if self.full_only && !full_requested {
            return false;
        }
        let Some(versions) = self.mimetypes.get(mimetype) else {
            return false;
        };
        match version {
            None => true,
            Some(v) => self.any_version || versions.iter().any(|known| known == v),
        }
    }
}

/// Full capability declaration of one analyzer
///
/// A composite analyzer supports a pair iff any of its declarations does.
#[derive(Debug, Clone, Default)]
pub struct SupportMatrix {
    decls: Vec<SupportDecl>,
}

impl SupportMatrix {
    pub fn new(decls: Vec<SupportDecl>) -> Self {
        Self { decls }
    }

    /// Single-declaration matrix, the common case
    pub fn single(decl: SupportDecl) -> Self {
        Self { decls: vec![decl] }
    }

    pub fn supports(&self, mimetype: &str, version: Option<&str>, full_requested: bool) -> bool {
        self.decls
            .iter()
            .any(|d| d.supports(mimetype, version, full_requested))
    }
}

/// The constructed-once set of analyzers known to the engine
///
/// Selection before a scan and the post-reconciliation support check both go
/// through this registry, so the two answers can never drift apart.
pub struct CapabilityRegistry {
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl CapabilityRegistry {
    pub fn new(analyzers: Vec<Arc<dyn Analyzer>>) -> Self {
        Self { analyzers }
    }

    /// Analyzers applicable to the detected candidate type
    pub fn select(
        &self,
        mimetype: &str,
        version: Option<&str>,
        full_requested: bool,
    ) -> Vec<Arc<dyn Analyzer>> {
        self.analyzers
            .iter()
            .filter(|a| a.capabilities().supports(mimetype, version, full_requested))
            .cloned()
            .collect()
    }

    /// Is the pair supported by at least one registered analyzer?
    ///
    /// Evaluated against the *full-verification* capability set: a type only
    /// coverable in full mode is still a supported type.
    pub fn any_supports(&self, mimetype: &str, version: Option<&str>) -> bool {
        self.analyzers
            .iter()
            .any(|a| a.capabilities().supports(mimetype, version, true))
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}
