//! The 13 axes as closed functions over node-sets.
//!
//! Every axis walks from each input cursor, then normalizes: forward axes
//! sort ascending by document position, reverse axes descending, and both
//! de-duplicate adjacent positions. The one exception is `attribute`, which
//! preserves attribute declaration order and is never sorted.

use smallvec::SmallVec;

use crate::grammar::ast::Axis;
use crate::store::Cursor;
use crate::value::NodeSet;

pub(crate) fn apply(axis: Axis, input: &NodeSet) -> NodeSet {
    match axis {
        Axis::SelfAxis => input.clone(),
        Axis::Child => cleanup_forward(collect(input, push_children)),
        Axis::Parent => cleanup_forward(collect(input, push_parent)),
        Axis::Attribute => collect(input, push_attributes),
        Axis::Namespace => cleanup_forward(collect(input, push_namespaces)),
        Axis::Descendant => cleanup_forward(collect(input, push_descendants)),
        Axis::DescendantOrSelf => cleanup_forward(collect(input, |c, out| {
            out.push(c.clone());
            push_descendants(c, out);
        })),
        Axis::Ancestor => cleanup_backward(collect(input, |c, out| {
            push_ancestors(&c.parent(), out);
        })),
        Axis::AncestorOrSelf => cleanup_backward(collect(input, push_ancestors)),
        Axis::FollowingSibling => cleanup_forward(collect(input, push_following_siblings)),
        Axis::Following => cleanup_forward(collect(input, push_following)),
        Axis::PrecedingSibling => cleanup_backward(collect(input, push_preceding_siblings)),
        Axis::Preceding => cleanup_backward(collect(input, push_preceding)),
    }
}

fn collect(input: &NodeSet, walk: impl Fn(&Cursor, &mut NodeSet)) -> NodeSet {
    let mut out = NodeSet::new();
    for cursor in input {
        walk(cursor, &mut out);
    }
    out
}

fn push_children(cursor: &Cursor, out: &mut NodeSet) {
    out.extend(cursor.children());
}

fn push_parent(cursor: &Cursor, out: &mut NodeSet) {
    if !cursor.is_root() {
        out.push(cursor.parent());
    }
}

fn push_attributes(cursor: &Cursor, out: &mut NodeSet) {
    out.extend(cursor.attributes());
}

fn push_namespaces(cursor: &Cursor, out: &mut NodeSet) {
    out.extend(cursor.namespaces());
}

fn push_descendants(cursor: &Cursor, out: &mut NodeSet) {
    let mut stack: SmallVec<[Cursor; 16]> = SmallVec::new();
    stack.extend(cursor.children().into_iter().rev());
    while let Some(next) = stack.pop() {
        out.push(next.clone());
        stack.extend(next.children().into_iter().rev());
    }
}

/// Parent chain up to, but not including, the root sentinel.
fn push_ancestors(cursor: &Cursor, out: &mut NodeSet) {
    let mut cur = cursor.clone();
    while !cur.is_root() {
        out.push(cur.clone());
        cur = cur.parent();
    }
}

fn push_following_siblings(cursor: &Cursor, out: &mut NodeSet) {
    if cursor.is_root() {
        return;
    }
    let siblings = cursor.parent().children();
    if let Some(at) = siblings.iter().position(|s| s == cursor) {
        out.extend(siblings.into_iter().skip(at + 1));
    }
}

fn push_preceding_siblings(cursor: &Cursor, out: &mut NodeSet) {
    if cursor.is_root() {
        return;
    }
    let siblings = cursor.parent().children();
    if let Some(at) = siblings.iter().position(|s| s == cursor) {
        out.extend(siblings.into_iter().take(at));
    }
}

/// Everything after the node in document order, excluding its descendants:
/// at each ancestor level, the later siblings and their subtrees.
fn push_following(cursor: &Cursor, out: &mut NodeSet) {
    let mut cur = cursor.clone();
    while !cur.is_root() {
        let parent = cur.parent();
        let mut seen = false;
        for sibling in parent.children() {
            if sibling == cur {
                seen = true;
                continue;
            }
            if seen {
                out.push(sibling.clone());
                push_descendants(&sibling, out);
            }
        }
        cur = parent;
    }
}

/// Everything before the node in document order, excluding its ancestors.
fn push_preceding(cursor: &Cursor, out: &mut NodeSet) {
    let mut cur = cursor.clone();
    while !cur.is_root() {
        let parent = cur.parent();
        for sibling in parent.children() {
            if sibling == cur {
                break;
            }
            out.push(sibling.clone());
            push_descendants(&sibling, out);
        }
        cur = parent;
    }
}

/// Sort ascending by document position, drop duplicate positions.
pub(crate) fn cleanup_forward(mut set: NodeSet) -> NodeSet {
    set.sort_unstable_by_key(Cursor::pos);
    set.dedup_by_key(|c| c.pos());
    set
}

/// Sort descending by document position, drop duplicate positions.
pub(crate) fn cleanup_backward(mut set: NodeSet) -> NodeSet {
    set.sort_unstable_by_key(|c| core::cmp::Reverse(c.pos()));
    set.dedup_by_key(|c| c.pos());
    set
}
