//! Radix tree over path-template segments
//!
//! Templates are split on `/` and stored as a tree where:
//! - Static segments (e.g., `pets`) match exactly and case-sensitively
//! - Parameter segments (e.g., `{id}`) match any non-empty segment
//! - Mixed segments (e.g., `{name}.json`, `v{major}`) match through an anchored regex
//!
//! Unlike a dispatching router, resolution needs every template that could
//! match a concrete path, so [`RadixNode::search_all`] backtracks through all
//! branches and reports each terminal it reaches together with the kind of
//! every segment on the way. Ranking happens in the caller.

use super::core::ParamVec;
use regex::Regex;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::warn;

/// How a template segment matched, ordered from least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum SegmentKind {
    Param,
    Pattern,
    Literal,
}

pub(crate) type KindVec = SmallVec<[SegmentKind; 8]>;

/// A template that matched a concrete path.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    /// Index into the contract's path list
    pub path_index: usize,
    pub params: ParamVec,
    pub kinds: KindVec,
}

impl Candidate {
    fn count(&self, kind: SegmentKind) -> usize {
        self.kinds.iter().filter(|k| **k == kind).count()
    }

    /// Sort key; greater is more specific.
    pub(crate) fn specificity(&self) -> (usize, usize, &[SegmentKind]) {
        (
            self.count(SegmentKind::Literal),
            self.count(SegmentKind::Pattern),
            self.kinds.as_slice(),
        )
    }
}

#[derive(Debug, Clone)]
struct SegmentPattern {
    regex: Regex,
    names: Vec<Arc<str>>,
    source: String,
}

impl SegmentPattern {
    /// Compiles a segment such as `{name}.json` into `^(.+?)\.json$`.
    fn compile(segment: &str) -> Option<Self> {
        let mut pattern = String::from("^");
        let mut names = Vec::new();
        let mut rest = segment;
        while let Some(start) = rest.find('{') {
            let len = rest[start..].find('}')?;
            pattern.push_str(&regex::escape(&rest[..start]));
            pattern.push_str("(.+?)");
            names.push(Arc::from(&rest[start + 1..start + len]));
            rest = &rest[start + len + 1..];
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');
        match Regex::new(&pattern) {
            Ok(regex) => Some(Self {
                regex,
                names,
                source: segment.to_string(),
            }),
            Err(e) => {
                warn!(segment, error = %e, "Path segment pattern rejected; matching it literally");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RadixNode {
    /// The literal segment this node represents (without leading /)
    segment: Cow<'static, str>,
    /// Parameter name for `{name}` nodes
    param_name: Option<Arc<str>>,
    pattern: Option<SegmentPattern>,
    /// Paths whose template ends at this node
    terminals: Vec<usize>,
    children: Vec<RadixNode>,
    param_children: Vec<RadixNode>,
    pattern_children: Vec<RadixNode>,
}

impl RadixNode {
    pub(crate) fn root() -> Self {
        Self::new(Cow::Borrowed(""))
    }

    fn new(segment: Cow<'static, str>) -> Self {
        Self {
            segment,
            param_name: None,
            pattern: None,
            terminals: Vec::new(),
            children: Vec::new(),
            param_children: Vec::new(),
            pattern_children: Vec::new(),
        }
    }

    fn new_param(name: &str) -> Self {
        let mut node = Self::new(Cow::Borrowed(""));
        node.param_name = Some(Arc::from(name));
        node
    }

    fn new_pattern(pattern: SegmentPattern) -> Self {
        let mut node = Self::new(Cow::Borrowed(""));
        node.pattern = Some(pattern);
        node
    }

    pub(crate) fn insert(&mut self, segments: &[&str], path_index: usize) {
        let Some((segment, remaining)) = segments.split_first() else {
            self.terminals.push(path_index);
            return;
        };

        let is_plain_param = segment.starts_with('{')
            && segment.ends_with('}')
            && segment.matches('{').count() == 1;

        if is_plain_param {
            let name = &segment[1..segment.len() - 1];
            if let Some(child) = self
                .param_children
                .iter_mut()
                .find(|c| c.param_name.as_deref() == Some(name))
            {
                child.insert(remaining, path_index);
                return;
            }
            let mut child = RadixNode::new_param(name);
            child.insert(remaining, path_index);
            self.param_children.push(child);
            return;
        }

        if segment.contains('{') {
            if let Some(child) = self
                .pattern_children
                .iter_mut()
                .find(|c| c.pattern.as_ref().is_some_and(|p| p.source == *segment))
            {
                child.insert(remaining, path_index);
                return;
            }
            if let Some(pattern) = SegmentPattern::compile(segment) {
                let mut child = RadixNode::new_pattern(pattern);
                child.insert(remaining, path_index);
                self.pattern_children.push(child);
                return;
            }
        }

        if let Some(child) = self.children.iter_mut().find(|c| c.segment == *segment) {
            child.insert(remaining, path_index);
            return;
        }
        let mut child = RadixNode::new(Cow::Owned((*segment).to_string()));
        child.insert(remaining, path_index);
        self.children.push(child);
    }

    /// Collects every template that matches `segments`.
    pub(crate) fn search_all(
        &self,
        segments: &[&str],
        params: &mut ParamVec,
        kinds: &mut KindVec,
        out: &mut Vec<Candidate>,
    ) {
        let Some((segment, remaining)) = segments.split_first() else {
            for index in &self.terminals {
                out.push(Candidate {
                    path_index: *index,
                    params: params.clone(),
                    kinds: kinds.clone(),
                });
            }
            return;
        };

        for child in &self.children {
            if child.segment == *segment {
                kinds.push(SegmentKind::Literal);
                child.search_all(remaining, params, kinds, out);
                kinds.pop();
            }
        }

        for child in &self.pattern_children {
            let Some(pattern) = &child.pattern else {
                continue;
            };
            let Some(caps) = pattern.regex.captures(segment) else {
                continue;
            };
            let mark = params.len();
            for (i, name) in pattern.names.iter().enumerate() {
                let value = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                params.push((Arc::clone(name), value.to_string()));
            }
            kinds.push(SegmentKind::Pattern);
            child.search_all(remaining, params, kinds, out);
            kinds.pop();
            params.truncate(mark);
        }

        for child in &self.param_children {
            if let Some(name) = &child.param_name {
                params.push((Arc::clone(name), (*segment).to_string()));
                kinds.push(SegmentKind::Param);
                child.search_all(remaining, params, kinds, out);
                kinds.pop();
                params.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(path: &str) -> Vec<&str> {
        path.split('/').filter(|s| !s.is_empty()).collect()
    }

    fn search(root: &RadixNode, path: &str) -> Vec<Candidate> {
        let mut out = Vec::new();
        root.search_all(&split(path), &mut ParamVec::new(), &mut KindVec::new(), &mut out);
        out
    }

    #[test]
    fn test_collects_every_matching_template() {
        let mut root = RadixNode::root();
        root.insert(&split("/pets/{id}"), 0);
        root.insert(&split("/pets/mine"), 1);
        root.insert(&split("/{kind}/mine"), 2);

        let mut found: Vec<usize> = search(&root, "/pets/mine")
            .iter()
            .map(|c| c.path_index)
            .collect();
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2]);
        assert_eq!(search(&root, "/pets/7").len(), 1);
        assert!(search(&root, "/pets").is_empty());
    }

    #[test]
    fn test_mixed_segment_captures() {
        let mut root = RadixNode::root();
        root.insert(&split("/files/{name}.{ext}"), 0);
        let found = search(&root, "/files/report.final.pdf");
        assert_eq!(found.len(), 1);
        assert_eq!(&*found[0].params[0].0, "name");
        assert_eq!(found[0].params[0].1, "report");
        assert_eq!(found[0].params[1].1, "final.pdf");
        assert_eq!(found[0].kinds.as_slice(), &[SegmentKind::Literal, SegmentKind::Pattern]);
        assert!(search(&root, "/files/report").is_empty());
    }

    #[test]
    fn test_root_template() {
        let mut root = RadixNode::root();
        root.insert(&split("/"), 4);
        let found = search(&root, "/");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path_index, 4);
    }

    #[test]
    fn test_specificity_prefers_literals() {
        let mut root = RadixNode::root();
        root.insert(&split("/{a}/{b}"), 0);
        root.insert(&split("/x/{b}"), 1);
        root.insert(&split("/{a}/y"), 2);
        let mut found = search(&root, "/x/y");
        found.sort_by(|l, r| r.specificity().cmp(&l.specificity()));
        // Equal literal counts fall back to the leftmost literal
        assert_eq!(found[0].path_index, 1);
        assert_eq!(found[1].path_index, 2);
        assert_eq!(found[2].path_index, 0);
    }
}
