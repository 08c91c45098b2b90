//! Statement-node extraction
//!
//! Walks a node tree depth-first, pre-order, collecting every node whose
//! type tag passes the filter. A matching node is collected before its
//! children are visited, and matching ancestors do not hide matching
//! descendants.

use std::collections::BTreeSet;

use sqlgate_core::{node_type, Node};

/// Which type tags the extractor collects
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeFilter {
    /// `use select replace insert update delete alter`
    #[default]
    Known,

    /// Every statement-level node
    Any,

    /// Only the listed tags
    Only(BTreeSet<String>),
}

impl TypeFilter {
    pub fn only<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(tags.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, tag: &str) -> bool {
        match self {
            Self::Known => node_type::KNOWN.contains(&tag),
            Self::Any => true,
            Self::Only(tags) => tags.contains(tag),
        }
    }
}

/// Collect matching nodes from `root`, root included
pub fn extract<'a>(root: &'a Node, filter: &TypeFilter) -> Vec<&'a Node> {
    let mut extracted = Vec::new();
    walk(root, filter, &mut extracted);
    extracted
}

/// Collect matching nodes from a sequence of roots, in order
pub fn extract_all<'a>(roots: &'a [Node], filter: &TypeFilter) -> Vec<&'a Node> {
    let mut extracted = Vec::new();
    for root in roots {
        walk(root, filter, &mut extracted);
    }
    extracted
}

/// Like [`extract`], but gives up once nesting exceeds `max_depth`
pub fn extract_with_limit<'a>(
    root: &'a Node,
    filter: &TypeFilter,
    max_depth: usize,
) -> Result<Vec<&'a Node>, ExtractError> {
    let mut extracted = Vec::new();
    walk_bounded(root, filter, 0, max_depth, &mut extracted)?;
    Ok(extracted)
}

fn walk<'a>(node: &'a Node, filter: &TypeFilter, extracted: &mut Vec<&'a Node>) {
    if filter.matches(node.type_tag()) {
        extracted.push(node);
    }
    for child in node.children() {
        walk(child, filter, extracted);
    }
}

fn walk_bounded<'a>(
    node: &'a Node,
    filter: &TypeFilter,
    depth: usize,
    max_depth: usize,
    extracted: &mut Vec<&'a Node>,
) -> Result<(), ExtractError> {
    if depth > max_depth {
        return Err(ExtractError::TooDeep { max_depth });
    }
    if filter.matches(node.type_tag()) {
        extracted.push(node);
    }
    for child in node.children() {
        walk_bounded(child, filter, depth + 1, max_depth, extracted)?;
    }
    Ok(())
}

/// Extraction error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("statement nesting exceeds {max_depth} levels")]
    TooDeep { max_depth: usize },
}
