//! Projection policies: which elements are skipped, and which are replaced by
//! a fixed placeholder string instead of being descended into.
//!
//! Policies can be built in code or loaded as a named set from TOML:
//!
//! ```toml
//! [policies.default]
//! skip_tags = ["head"]
//! skip_classes = ["ltx_bibliography"]
//!
//! [policies.default.replace_tags]
//! math = "MathNode"
//! ```

use crate::error::{DnmError, DnmResult};
use crate::tree::{NodeId, Tree};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Policy used for arXiv-style documents (see [`ProjectionPolicy::arxiv`]).
pub static DEFAULT_POLICY: Lazy<ProjectionPolicy> = Lazy::new(ProjectionPolicy::arxiv);

/// Name under which [`PolicySet`] stores the default policy.
pub const DEFAULT_POLICY_NAME: &str = "default";
/// Name under which [`PolicySet`] stores the no-op policy.
pub const EMPTY_POLICY_NAME: &str = "empty";

/// What a projection does with a single element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision<'p> {
    /// Emit its text and recurse into its children
    Descend,
    /// Omit the element and its whole subtree
    Skip,
    /// Stand in for the whole element with a placeholder string
    Replace(&'p str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionPolicy {
    pub skip_tags: BTreeSet<String>,
    pub skip_classes: BTreeSet<String>,
    pub replace_tags: BTreeMap<String, String>,
    pub replace_classes: BTreeMap<String, String>,
}

impl ProjectionPolicy {
    /// A policy that descends into everything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Skips document heads, scripts, styles, bibliographies and page footers,
    /// and replaces every `<math>` element with `MathNode`.
    pub fn arxiv() -> Self {
        Self::empty()
            .skip_tag("head")
            .skip_tag("script")
            .skip_tag("style")
            .skip_class("ltx_bibliography")
            .skip_class("ltx_page_footer")
            .replace_tag("math", "MathNode")
    }

    pub fn skip_tag(mut self, tag: impl Into<String>) -> Self {
        self.skip_tags.insert(tag.into());
        self
    }

    pub fn skip_class(mut self, class: impl Into<String>) -> Self {
        self.skip_classes.insert(class.into());
        self
    }

    pub fn replace_tag(mut self, tag: impl Into<String>, placeholder: impl Into<String>) -> Self {
        self.replace_tags.insert(tag.into(), placeholder.into());
        self
    }

    pub fn replace_class(
        mut self,
        class: impl Into<String>,
        placeholder: impl Into<String>,
    ) -> Self {
        self.replace_classes
            .insert(class.into(), placeholder.into());
        self
    }

    /// Decide how `node` is projected. Skipping wins over replacing, and a
    /// tag replacement wins over a class replacement.
    pub fn decide(&self, tree: &Tree, node: NodeId) -> Decision<'_> {
        let tag = tree.tag(node);
        if self.skip_tags.contains(tag) || tree.classes(node).any(|c| self.skip_classes.contains(c))
        {
            return Decision::Skip;
        }
        if let Some(placeholder) = self.replace_tags.get(tag) {
            return Decision::Replace(placeholder.as_str());
        }
        tree.classes(node)
            .find_map(|c| self.replace_classes.get(c))
            .map_or(Decision::Descend, |placeholder| {
                Decision::Replace(placeholder.as_str())
            })
    }
}

#[derive(Debug, Default, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    policies: BTreeMap<String, ProjectionPolicy>,
}

/// A set of named policies. Always contains `default` and `empty`; entries
/// loaded from TOML override the built-in ones of the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicySet {
    policies: BTreeMap<String, ProjectionPolicy>,
}

impl PolicySet {
    pub fn builtin() -> Self {
        let mut policies = BTreeMap::new();
        policies.insert(DEFAULT_POLICY_NAME.to_string(), DEFAULT_POLICY.clone());
        policies.insert(EMPTY_POLICY_NAME.to_string(), ProjectionPolicy::empty());
        PolicySet { policies }
    }

    /// Load from a TOML file. A missing file yields the built-in set.
    pub fn load(path: &Path) -> DnmResult<Self> {
        if !path.exists() {
            tracing::warn!(
                "Policy file {} not found, using built-in policies",
                path.display()
            );
            return Ok(Self::builtin());
        }

        let content = fs::read_to_string(path).map_err(|e| DnmError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str) -> DnmResult<Self> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, origin: &str) -> DnmResult<Self> {
        let file: PolicyFile = toml::from_str(content).map_err(|e| DnmError::Config {
            path: origin.to_string(),
            message: e.to_string(),
        })?;

        let mut set = Self::builtin();
        for (name, policy) in file.policies {
            tracing::debug!("Loaded projection policy '{}' from {}", name, origin);
            set.policies.insert(name, policy);
        }
        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<&ProjectionPolicy> {
        self.policies.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, policy: ProjectionPolicy) {
        self.policies.insert(name.into(), policy);
    }

    pub fn default_policy(&self) -> &ProjectionPolicy {
        self.policies
            .get(DEFAULT_POLICY_NAME)
            .unwrap_or(&*DEFAULT_POLICY)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }
}

impl Default for PolicySet {
    fn default() -> Self {
        Self::builtin()
    }
}
