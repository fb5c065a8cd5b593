//! Repository hierarchy discovery and the arena it produces.
//!
//! The hierarchy is a rooted tree of repositories linked by submodule
//! pointers. Nodes live in a flat arena and edges are indices, which keeps
//! ownership acyclic and makes the execution order an explicit vector.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use lockstep_git::{GitGateway, Sha};

use crate::error::{Error, Result};
use crate::gateway::GatewayFactory;

/// Index of a repository in the [`Hierarchy`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId(usize);

impl RepoId {
    /// Arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index)
    }
}

/// A submodule edge from a parent repository to a child.
#[derive(Debug, Clone)]
pub struct SubmoduleLink {
    /// The child repository.
    pub child: RepoId,
    /// Submodule path relative to the parent's worktree.
    pub path_in_parent: String,
    /// The gitlink SHA recorded in the parent's HEAD tree at discovery.
    pub recorded_sha: Sha,
}

/// One repository in the hierarchy.
#[derive(Debug, Clone)]
pub struct RepoNode {
    /// Absolute worktree path.
    pub path: PathBuf,
    /// Path relative to the hierarchy root ("" for the root itself).
    pub rel_path: String,
    /// Short display name (last path component).
    pub name: String,
    /// Parent repository, if any.
    pub parent: Option<RepoId>,
    /// Nesting depth (0 for the root).
    pub depth: usize,
    /// Submodule edges, sorted by path.
    pub links: Vec<SubmoduleLink>,
    /// HEAD commit at discovery time.
    pub head_before: Sha,
    /// Checked-out branch at discovery time, if not detached.
    pub current_branch: Option<String>,
}

impl RepoNode {
    /// Display label: the relative path, or the name for the root.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.rel_path.is_empty() {
            &self.name
        } else {
            &self.rel_path
        }
    }
}

/// A rooted tree of repositories with a total execution order.
#[derive(Debug)]
pub struct Hierarchy {
    repos: Vec<RepoNode>,
    root: RepoId,
    /// Post-order traversal: every child strictly precedes its ancestors,
    /// siblings ordered lexicographically by relative path.
    order: Vec<RepoId>,
    /// Submodule paths recorded in some parent but lacking a worktree,
    /// as (parent, path-in-parent) pairs. Reported, not fatal.
    uninitialized: Vec<(RepoId, String)>,
}

impl Hierarchy {
    /// The hierarchy root.
    #[must_use]
    pub fn root(&self) -> RepoId {
        self.root
    }

    /// Node lookup.
    #[must_use]
    pub fn node(&self, id: RepoId) -> &RepoNode {
        &self.repos[id.0]
    }

    /// Number of repositories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    /// True when the hierarchy is a single repository.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Execution order (children before ancestors).
    #[must_use]
    pub fn order(&self) -> &[RepoId] {
        &self.order
    }

    /// All ids in arena order.
    pub fn ids(&self) -> impl Iterator<Item = RepoId> + '_ {
        (0..self.repos.len()).map(RepoId)
    }

    /// Uninitialized submodules as (parent, path-in-parent) pairs.
    #[must_use]
    pub fn uninitialized(&self) -> &[(RepoId, String)] {
        &self.uninitialized
    }

    /// The link from `parent` at submodule path `path`, if any.
    #[must_use]
    pub fn link_at(&self, parent: RepoId, path: &str) -> Option<&SubmoduleLink> {
        self.node(parent)
            .links
            .iter()
            .find(|l| l.path_in_parent == path)
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: RepoId) -> impl Iterator<Item = RepoId> + '_ {
        std::iter::successors(self.node(id).parent, |&p| self.node(p).parent)
    }

    /// Resolve a user-supplied repository reference.
    ///
    /// A reference matches a repository by name, by path relative to the
    /// hierarchy root, or by absolute path.
    ///
    /// # Errors
    /// [`Error::UnknownRepoRef`] when nothing matches,
    /// [`Error::AmbiguousRepoRef`] when more than one repository matches.
    pub fn resolve_ref(&self, token: &str) -> Result<RepoId> {
        let token_path = Path::new(token);
        let matches: Vec<RepoId> = self
            .ids()
            .filter(|&id| {
                let node = self.node(id);
                node.name == token || node.rel_path == token || node.path == token_path
            })
            .collect();

        match matches.as_slice() {
            [] => Err(Error::UnknownRepoRef(token.to_string())),
            [one] => Ok(*one),
            many => Err(Error::AmbiguousRepoRef {
                token: token.to_string(),
                matches: many
                    .iter()
                    .map(|&id| self.node(id).label().to_string())
                    .collect(),
            }),
        }
    }

    /// Structured entries for UI rendering, in arena (pre-order) order.
    #[must_use]
    pub fn entries(&self) -> Vec<HierarchyEntry> {
        self.ids()
            .map(|id| {
                let node = self.node(id);
                HierarchyEntry {
                    name: node.name.clone(),
                    rel_path: node.rel_path.clone(),
                    depth: node.depth,
                    is_submodule: node.parent.is_some(),
                    parent: node.parent.map(|p| self.node(p).name.clone()),
                }
            })
            .collect()
    }
}

/// Flattened hierarchy row for display.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyEntry {
    pub name: String,
    pub rel_path: String,
    pub depth: usize,
    pub is_submodule: bool,
    pub parent: Option<String>,
}

/// Discover the hierarchy containing `start`.
///
/// Walks up from `start` to the highest repository that is still recorded as
/// a submodule of something above it, then recursively enumerates initialized
/// submodules. Uninitialized submodules are recorded and skipped.
///
/// # Errors
/// Fails when `start` is not inside a repository, when any repository cannot
/// be read, or when a submodule resolves to one of its own ancestors.
pub fn discover<F: GatewayFactory>(factory: &F, start: &Path) -> Result<Hierarchy> {
    let root_path = find_root(factory, start)?;
    info!(root = %root_path.display(), "discovering repository hierarchy");

    let mut builder = Builder {
        factory,
        repos: Vec::new(),
        uninitialized: Vec::new(),
    };
    let root = builder.add_repo(&root_path, String::new(), None, 0)?;

    let mut order = Vec::with_capacity(builder.repos.len());
    post_order(&builder.repos, root, &mut order);

    info!(repos = builder.repos.len(), "hierarchy discovered");
    Ok(Hierarchy {
        repos: builder.repos,
        root,
        order,
        uninitialized: builder.uninitialized,
    })
}

/// Walk upward from `start` to the top of the submodule chain.
fn find_root<F: GatewayFactory>(factory: &F, start: &Path) -> Result<PathBuf> {
    let mut gateway = factory
        .discover(start)
        .map_err(|_| Error::NotAGitRepo(start.display().to_string()))?;

    loop {
        if !gateway.is_submodule_worktree() {
            break;
        }
        let workdir = gateway.workdir().to_path_buf();
        let Some(above) = workdir.parent() else {
            break;
        };
        let Ok(parent) = factory.discover(above) else {
            break;
        };
        let Ok(rel) = workdir.strip_prefix(parent.workdir()) else {
            break;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        let records_child = parent
            .submodule_entries("HEAD")
            .map(|entries| entries.iter().any(|e| e.path == rel))
            .unwrap_or(false);
        if !records_child {
            break;
        }
        debug!(parent = %parent.workdir().display(), "ascending to parent repository");
        gateway = parent;
    }

    Ok(gateway.workdir().to_path_buf())
}

struct Builder<'a, F: GatewayFactory> {
    factory: &'a F,
    repos: Vec<RepoNode>,
    uninitialized: Vec<(RepoId, String)>,
}

impl<F: GatewayFactory> Builder<'_, F> {
    fn add_repo(
        &mut self,
        path: &Path,
        rel_path: String,
        parent: Option<RepoId>,
        depth: usize,
    ) -> Result<RepoId> {
        let gateway = self
            .factory
            .open(path)
            .map_err(|_| Error::NotAGitRepo(path.display().to_string()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let id = RepoId(self.repos.len());
        self.repos.push(RepoNode {
            path: path.to_path_buf(),
            rel_path,
            name,
            parent,
            depth,
            links: Vec::new(),
            head_before: gateway.rev_parse("HEAD")?,
            current_branch: gateway.current_branch().ok(),
        });

        let mut entries = gateway.submodule_entries("HEAD")?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        let mut links = Vec::new();
        for entry in entries {
            let child_path = path.join(&entry.path);
            self.check_cycle(id, &child_path, &entry.path)?;

            if self.factory.open(&child_path).is_err() {
                warn!(
                    submodule = %entry.path,
                    parent = %path.display(),
                    "submodule is not initialized, skipping"
                );
                self.uninitialized.push((id, entry.path));
                continue;
            }

            let child_rel = join_rel(&self.repos[id.0].rel_path, &entry.path);
            let child = self.add_repo(&child_path, child_rel, Some(id), depth + 1)?;
            links.push(SubmoduleLink {
                child,
                path_in_parent: entry.path,
                recorded_sha: entry.recorded_sha,
            });
        }

        self.repos[id.0].links = links;
        Ok(id)
    }

    /// A gitlink resolving to an ancestor worktree is malformed.
    fn check_cycle(&self, parent: RepoId, child_path: &Path, link_path: &str) -> Result<()> {
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if self.repos[id.0].path == child_path {
                return Err(Error::CycleDetected {
                    path: link_path.to_string(),
                });
            }
            cursor = self.repos[id.0].parent;
        }
        Ok(())
    }
}

fn join_rel(parent_rel: &str, child: &str) -> String {
    if parent_rel.is_empty() {
        child.to_string()
    } else {
        format!("{parent_rel}/{child}")
    }
}

fn post_order(repos: &[RepoNode], id: RepoId, out: &mut Vec<RepoId>) {
    for link in &repos[id.0].links {
        post_order(repos, link.child, out);
    }
    out.push(id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha(c: char) -> Sha {
        Sha::parse(c.to_string().repeat(40)).unwrap()
    }

    fn node(name: &str, rel: &str, parent: Option<RepoId>, depth: usize) -> RepoNode {
        RepoNode {
            path: PathBuf::from(format!("/work/{rel}")),
            rel_path: rel.to_string(),
            name: name.to_string(),
            parent,
            depth,
            links: Vec::new(),
            head_before: sha('a'),
            current_branch: Some("feat".to_string()),
        }
    }

    /// root -> {libs/a -> {vendor/x}, libs/b}
    fn sample() -> Hierarchy {
        let mut root = node("root", "", None, 0);
        let mut a = node("a", "libs/a", Some(RepoId(0)), 1);
        let x = node("x", "libs/a/vendor/x", Some(RepoId(1)), 2);
        let b = node("b", "libs/b", Some(RepoId(0)), 1);

        a.links = vec![SubmoduleLink {
            child: RepoId(2),
            path_in_parent: "vendor/x".into(),
            recorded_sha: sha('b'),
        }];
        root.links = vec![
            SubmoduleLink {
                child: RepoId(1),
                path_in_parent: "libs/a".into(),
                recorded_sha: sha('c'),
            },
            SubmoduleLink {
                child: RepoId(3),
                path_in_parent: "libs/b".into(),
                recorded_sha: sha('d'),
            },
        ];

        let repos = vec![root, a, x, b];
        let mut order = Vec::new();
        post_order(&repos, RepoId(0), &mut order);
        Hierarchy {
            repos,
            root: RepoId(0),
            order,
            uninitialized: Vec::new(),
        }
    }

    #[test]
    fn test_post_order_children_before_ancestors() {
        let h = sample();
        let labels: Vec<&str> = h.order().iter().map(|&id| h.node(id).label()).collect();
        assert_eq!(labels, vec!["libs/a/vendor/x", "libs/a", "libs/b", "root"]);

        for (pos, &id) in h.order().iter().enumerate() {
            for ancestor in h.ancestors(id) {
                let anc_pos = h.order().iter().position(|&o| o == ancestor).unwrap();
                assert!(pos < anc_pos, "{:?} must precede its ancestors", id);
            }
        }
    }

    #[test]
    fn test_resolve_ref_by_name_rel_and_abs() {
        let h = sample();
        assert_eq!(h.resolve_ref("a").unwrap(), RepoId(1));
        assert_eq!(h.resolve_ref("libs/b").unwrap(), RepoId(3));
        assert_eq!(h.resolve_ref("/work/libs/a/vendor/x").unwrap(), RepoId(2));
        assert_eq!(h.resolve_ref("root").unwrap(), RepoId(0));
    }

    #[test]
    fn test_resolve_ref_unknown() {
        let h = sample();
        assert!(matches!(
            h.resolve_ref("nope"),
            Err(Error::UnknownRepoRef(_))
        ));
    }

    #[test]
    fn test_resolve_ref_ambiguous() {
        let mut h = sample();
        // Two repos with the same short name.
        h.repos[3].name = "a".to_string();
        match h.resolve_ref("a") {
            Err(Error::AmbiguousRepoRef { matches, .. }) => assert_eq!(matches.len(), 2),
            other => panic!("expected AmbiguousRepoRef, got {other:?}"),
        }
    }

    #[test]
    fn test_link_at() {
        let h = sample();
        let link = h.link_at(RepoId(0), "libs/a").unwrap();
        assert_eq!(link.child, RepoId(1));
        assert!(h.link_at(RepoId(0), "libs/z").is_none());
    }

    #[test]
    fn test_entries_shape() {
        let h = sample();
        let entries = h.entries();
        assert_eq!(entries.len(), 4);
        assert!(!entries[0].is_submodule);
        assert_eq!(entries[1].parent.as_deref(), Some("root"));
    }
}
