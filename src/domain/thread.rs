use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{AuthorProfile, CommentRecord, ThreadedComment};

/// What to do with a comment whose parent is not part of the records being built.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Leave the orphan and its subtree out of the thread.
    #[default]
    Drop,
    /// Show the orphan as an extra root, after the real roots.
    Promote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub record: CommentRecord,
    pub replies: Vec<Arc<CommentNode>>,
}

impl CommentNode {
    pub fn leaf(record: CommentRecord) -> Self {
        Self {
            record,
            replies: Vec::new(),
        }
    }
}

// Reply chains can be arbitrarily long, so subtrees are released with an
// explicit stack instead of nested drop calls.
impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(node) = pending.pop() {
            if let Some(mut node) = Arc::into_inner(node) {
                pending.append(&mut node.replies);
            }
        }
    }
}

/// Root comments of one post, each carrying its replies.
///
/// Nodes are shared between successive versions of a thread, so a patched
/// thread only allocates the nodes on the path to the new reply. Every walk
/// over the tree uses an explicit stack; nesting depth is unbounded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thread {
    roots: Vec<Arc<CommentNode>>,
}

impl Thread {
    pub fn roots(&self) -> &[Arc<CommentNode>] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn find(&self, id: Uuid) -> Option<&Arc<CommentNode>> {
        self.nodes().find(|node| node.record.id == id)
    }

    /// Every node in the thread, in pre-order.
    pub fn nodes(&self) -> PreOrder<'_> {
        PreOrder {
            stack: self.roots.iter().rev().collect(),
        }
    }

    /// Every record in the thread, without replies, in pre-order.
    pub fn flatten(&self) -> Vec<CommentRecord> {
        self.nodes().map(|node| node.record.clone()).collect()
    }

    pub fn author_ids(&self) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        self.nodes()
            .map(|node| node.record.author_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn decorate(&self, profiles: &HashMap<Uuid, AuthorProfile>) -> Vec<ThreadedComment> {
        let mut decorated = Vec::with_capacity(self.roots.len());
        // Each entry is a node plus the replies decorated so far; the count
        // of finished replies is the index of the next one to visit.
        let mut stack: Vec<(&CommentNode, Vec<ThreadedComment>)> = Vec::new();

        for root in &self.roots {
            stack.push((root.as_ref(), Vec::with_capacity(root.replies.len())));

            while let Some((node, replies)) = stack.last_mut() {
                let node = *node;
                if let Some(reply) = node.replies.get(replies.len()) {
                    stack.push((reply.as_ref(), Vec::with_capacity(reply.replies.len())));
                    continue;
                }

                let replies = std::mem::take(replies);
                stack.pop();
                let comment = ThreadedComment::new(&node.record, profiles, replies);
                match stack.last_mut() {
                    Some((_, siblings)) => siblings.push(comment),
                    None => decorated.push(comment),
                }
            }
        }

        decorated
    }
}

pub struct PreOrder<'a> {
    stack: Vec<&'a Arc<CommentNode>>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Arc<CommentNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.replies.iter().rev());
        Some(node)
    }
}

/// Builds the reply tree of one post from its flat records.
///
/// Roots keep the order they were given in, and so do siblings at every
/// level. A record is placed at most once, which keeps duplicated ids and
/// parent cycles from looping: records on a cycle are never reachable from
/// a root and are left out.
pub fn build_thread(records: Vec<CommentRecord>, policy: OrphanPolicy) -> Thread {
    let total = records.len();
    let known: HashSet<Uuid> = records.iter().map(|r| r.id).collect();

    let mut roots = Vec::new();
    let mut orphans = Vec::new();
    let mut children: HashMap<Uuid, Vec<CommentRecord>> = HashMap::new();

    for record in records {
        match record.parent_id {
            None => roots.push(record),
            Some(parent_id) if !known.contains(&parent_id) => orphans.push(record),
            Some(parent_id) => children.entry(parent_id).or_default().push(record),
        }
    }

    let orphan_count = orphans.len();
    if policy == OrphanPolicy::Promote {
        roots.append(&mut orphans);
    }

    let mut placed = HashSet::with_capacity(total);
    let roots: Vec<_> = roots
        .into_iter()
        .filter_map(|root| expand(root, &mut children, &mut placed))
        .collect();

    let excluded = total - placed.len();
    if excluded > 0 {
        tracing::debug!(
            excluded,
            orphans = orphan_count,
            ?policy,
            "Left comments out of thread"
        );
    }

    Thread { roots }
}

struct Expansion {
    record: CommentRecord,
    unvisited: std::vec::IntoIter<CommentRecord>,
    replies: Vec<Arc<CommentNode>>,
}

impl Expansion {
    fn start(record: CommentRecord, children: &mut HashMap<Uuid, Vec<CommentRecord>>) -> Self {
        let unvisited = children.remove(&record.id).unwrap_or_default();
        Self {
            record,
            replies: Vec::with_capacity(unvisited.len()),
            unvisited: unvisited.into_iter(),
        }
    }
}

fn expand(
    root: CommentRecord,
    children: &mut HashMap<Uuid, Vec<CommentRecord>>,
    placed: &mut HashSet<Uuid>,
) -> Option<Arc<CommentNode>> {
    if !placed.insert(root.id) {
        return None;
    }

    let mut stack = vec![Expansion::start(root, children)];
    while let Some(top) = stack.last_mut() {
        if let Some(child) = top.unvisited.next() {
            if placed.insert(child.id) {
                stack.push(Expansion::start(child, children));
            }
            continue;
        }

        let finished = stack.pop()?;
        let node = Arc::new(CommentNode {
            record: finished.record,
            replies: finished.replies,
        });
        match stack.last_mut() {
            Some(parent) => parent.replies.push(node),
            None => return Some(node),
        }
    }

    None
}

#[derive(Debug)]
pub enum PatchOutcome {
    Attached(Thread),
    /// The parent is not in the thread. The record is handed back untouched.
    Orphaned(CommentRecord),
}

impl PatchOutcome {
    /// The thread after the patch; an orphaned record leaves `current` as it was.
    pub fn into_thread(self, current: &Thread) -> Thread {
        match self {
            PatchOutcome::Attached(thread) => thread,
            PatchOutcome::Orphaned(_) => current.clone(),
        }
    }
}

/// Inserts one newly delivered record into an existing thread.
///
/// A root goes first (newest first). A reply is appended to its parent's
/// replies wherever that parent sits in the tree. Only the nodes between
/// the parent and its root are copied; every other node is shared with
/// `thread`.
pub fn patch_thread(thread: &Thread, record: CommentRecord) -> PatchOutcome {
    let Some(parent_id) = record.parent_id else {
        let mut roots = Vec::with_capacity(thread.roots.len() + 1);
        roots.push(Arc::new(CommentNode::leaf(record)));
        roots.extend(thread.roots.iter().cloned());
        return PatchOutcome::Attached(Thread { roots });
    };

    match path_to(&thread.roots, parent_id) {
        Some(path) => PatchOutcome::Attached(Thread {
            roots: attach(&thread.roots, &path, CommentNode::leaf(record)),
        }),
        None => PatchOutcome::Orphaned(record),
    }
}

/// Sibling indices leading from the roots to the node with `id`, found
/// depth-first.
fn path_to(roots: &[Arc<CommentNode>], id: Uuid) -> Option<Vec<usize>> {
    let mut stack: Vec<(&[Arc<CommentNode>], usize)> = vec![(roots, 0)];

    while let Some(&(siblings, index)) = stack.last() {
        match siblings.get(index) {
            Some(node) if node.record.id == id => {
                return Some(stack.iter().map(|&(_, index)| index).collect());
            }
            Some(node) => stack.push((node.replies.as_slice(), 0)),
            None => {
                stack.pop();
                if let Some((_, next)) = stack.last_mut() {
                    *next += 1;
                }
            }
        }
    }

    None
}

fn attach(roots: &[Arc<CommentNode>], path: &[usize], reply: CommentNode) -> Vec<Arc<CommentNode>> {
    let mut levels = Vec::with_capacity(path.len());
    let mut siblings = roots;
    for &index in path {
        levels.push(siblings);
        siblings = &siblings[index].replies;
    }

    let mut replies = siblings.to_vec();
    replies.push(Arc::new(reply));

    for (level, &index) in levels.into_iter().zip(path).rev() {
        let mut copied = level.to_vec();
        copied[index] = Arc::new(CommentNode {
            record: level[index].record.clone(),
            replies,
        });
        replies = copied;
    }

    replies
}
