//! The reverse-dependency IR (§3.2).

use std::cell::RefCell;
use std::rc::Rc;

use ecow::EcoString;

use crate::ty::{Name, Ty};

/// A file path or URI, used as the key into every process-wide registry.
pub type FileId = EcoString;

/// The index of a node within one file's [`FileArena`].
///
/// `tinymist-analysis/src/cfg/ir.rs` models a similar arena-of-indices
/// scheme with `BodyId`/`BlockId`; this is the same idea applied to
/// individual IR nodes instead of basic blocks, so cross-node references
/// are plain indices rather than pointers that could dangle or cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// A node reference that also identifies the owning file, used wherever a
/// dependency may cross file boundaries (method registry entries, constant
/// bindings resolved through `require`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalNodeId {
    pub file: FileId,
    pub node: NodeId,
}

/// A shared, mutable list of method names observed to be called on a
/// binding. `LocalRead` and its `LocalWrite` hold the *same* `Rc<RefCell<_>>`
/// so that recording a call site on either end is immediately visible to all
/// readers in the scope (§3.2 invariant 2). Kept as `Rc`/`RefCell` rather
/// than `Arc`/`Mutex` because a file's lowering context is stack-local and
/// single-threaded (§5: "Lowering contexts are stack-local and never
/// shared").
pub type CalledMethods = Rc<RefCell<Vec<Name>>>;

/// Whether a `Narrow` removes falsy or truthy components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NarrowKind {
    Truthy,
    Falsy,
}

/// The kind of a `Param` node (mirrors `ty::ParamKind`, kept separate because
/// a `Param` node also carries lowering-only state like its default value).
pub use crate::ty::ParamKind;

/// One IR node (§3.2 table). Carries its byte offset for lookup/stable
/// identity and its list of dependency nodes (inputs) for demand-driven
/// resolution.
#[derive(Debug, Clone)]
pub struct Node {
    pub offset: u32,
    pub kind: NodeKind,
}

/// The closed sum of IR node kinds. A new variant here must also gain an
/// arm in `resolver::infer_node` (§9: "add a new case only when a new
/// variant is added to §3.2").
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A literal with its shape/tuple type precomputed during lowering.
    Literal { ty: Ty, children: Vec<NodeId> },
    LocalWrite {
        name: Name,
        value: NodeId,
        called_methods: CalledMethods,
    },
    LocalRead {
        name: Name,
        /// Absent for a read with no reachable write (e.g. a forward
        /// reference); the resolver then falls back to the method-call-set
        /// heuristic over `called_methods` (§4.2).
        write: Option<NodeId>,
        called_methods: CalledMethods,
    },
    IvarWrite {
        class: Name,
        name: Name,
        value: NodeId,
    },
    IvarRead {
        class: Name,
        name: Name,
        write: Option<NodeId>,
    },
    CvarWrite {
        name: Name,
        value: NodeId,
    },
    CvarRead {
        name: Name,
        write: Option<NodeId>,
    },
    Param {
        name: Name,
        kind: ParamKind,
        default: Option<NodeId>,
        called_methods: CalledMethods,
    },
    BlockParamSlot {
        index: usize,
        call: NodeId,
    },
    Call {
        method: Name,
        receiver: Option<NodeId>,
        args: Vec<NodeId>,
        block_body: Option<NodeId>,
        has_block: bool,
        /// Set when the receiver is implicit (a bare method call inside a
        /// class body resolves against `self`).
        implicit_self: bool,
    },
    Def {
        name: Name,
        class: Name,
        params: Vec<NodeId>,
        /// The synthesized return node: the single explicit `Return`, or a
        /// `Merge` of every explicit return plus the implicit last
        /// expression (§4.1 "Return assembly").
        return_node: Option<NodeId>,
        body: NodeId,
        singleton: bool,
        module_function: bool,
    },
    Return {
        value: Option<NodeId>,
    },
    ClassModule {
        name: Name,
        superclass: Option<Name>,
        members: Vec<NodeId>,
    },
    Constant {
        name: Name,
        binding: Option<NodeId>,
    },
    SelfNode {
        class: Name,
        in_singleton: bool,
    },
    Merge {
        branches: Vec<NodeId>,
    },
    Or {
        lhs: NodeId,
        rhs: NodeId,
    },
    And {
        lhs: NodeId,
        rhs: NodeId,
    },
    Narrow {
        source: NodeId,
        kind: NarrowKind,
    },
}

impl NodeKind {
    /// The node's dependencies, i.e. the other nodes in the same file it
    /// reads from when resolving its type. This is the reverse-dependency
    /// edge list of §3.2.
    pub fn dependencies(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Literal { children, .. } => children.clone(),
            NodeKind::LocalWrite { value, .. } => vec![*value],
            NodeKind::LocalRead { write, .. } => write.iter().copied().collect(),
            NodeKind::IvarWrite { value, .. } => vec![*value],
            NodeKind::IvarRead { write, .. } => write.iter().copied().collect(),
            NodeKind::CvarWrite { value, .. } => vec![*value],
            NodeKind::CvarRead { write, .. } => write.iter().copied().collect(),
            NodeKind::Param { default, .. } => default.iter().copied().collect(),
            NodeKind::BlockParamSlot { call, .. } => vec![*call],
            NodeKind::Call {
                receiver,
                args,
                block_body,
                ..
            } => receiver
                .iter()
                .chain(args.iter())
                .chain(block_body.iter())
                .copied()
                .collect(),
            NodeKind::Def {
                params,
                return_node,
                body,
                ..
            } => params
                .iter()
                .copied()
                .chain(return_node.iter().copied())
                .chain(std::iter::once(*body))
                .collect(),
            NodeKind::Return { value } => value.iter().copied().collect(),
            NodeKind::ClassModule { members, .. } => members.clone(),
            NodeKind::Constant { binding, .. } => binding.iter().copied().collect(),
            NodeKind::SelfNode { .. } => vec![],
            NodeKind::Merge { branches } => branches.clone(),
            NodeKind::Or { lhs, rhs } | NodeKind::And { lhs, rhs } => vec![*lhs, *rhs],
            NodeKind::Narrow { source, .. } => vec![*source],
        }
    }

    /// `kind:discriminator` half of the node hash (§3.2): a short tag plus
    /// whatever further distinguishes same-kind nodes at the same offset
    /// (there normally is none, but compound-assignment desugaring can
    /// produce a synthetic `Call`/`Merge` at the same offset as its source
    /// expression).
    pub fn discriminator(&self) -> &'static str {
        match self {
            NodeKind::Literal { .. } => "literal",
            NodeKind::LocalWrite { .. } => "local_write",
            NodeKind::LocalRead { .. } => "local_read",
            NodeKind::IvarWrite { .. } => "ivar_write",
            NodeKind::IvarRead { .. } => "ivar_read",
            NodeKind::CvarWrite { .. } => "cvar_write",
            NodeKind::CvarRead { .. } => "cvar_read",
            NodeKind::Param { .. } => "param",
            NodeKind::BlockParamSlot { .. } => "block_param_slot",
            NodeKind::Call { .. } => "call",
            NodeKind::Def { .. } => "def",
            NodeKind::Return { .. } => "return",
            NodeKind::ClassModule { .. } => "class_module",
            NodeKind::Constant { .. } => "constant",
            NodeKind::SelfNode { .. } => "self",
            NodeKind::Merge { .. } => "merge",
            NodeKind::Or { .. } => "or",
            NodeKind::And { .. } => "and",
            NodeKind::Narrow { .. } => "narrow",
        }
    }
}

/// A file's IR subtree: created during lowering, destroyed on file
/// re-lowering (§3.2 "Ownership").
#[derive(Debug, Clone, Default)]
pub struct FileArena {
    nodes: Vec<Node>,
}

impl FileArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, offset: u32, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { offset, kind });
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Used to patch a forward reference (`BlockParamSlot.call`) once the
    /// node it points at has been pushed.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// The `node_hash = kind:discriminator:offset` half of the node key
    /// (§3.2); combined with the enclosing scope id by the location index
    /// to form the full `node_key`.
    pub fn node_hash(&self, id: NodeId) -> String {
        let node = self.get(id);
        format!("{}:{}", node.kind.discriminator(), node.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_cover_merge_branches() {
        let mut arena = FileArena::new();
        let a = arena.push(0, NodeKind::Literal { ty: Ty::Unknown, children: vec![] });
        let b = arena.push(1, NodeKind::Literal { ty: Ty::Unknown, children: vec![] });
        let merge = arena.push(2, NodeKind::Merge { branches: vec![a, b] });
        assert_eq!(arena.get(merge).kind.dependencies(), vec![a, b]);
    }

    #[test]
    fn local_read_and_write_share_called_methods() {
        let mut arena = FileArena::new();
        let value = arena.push(0, NodeKind::Literal { ty: Ty::Unknown, children: vec![] });
        let shared: CalledMethods = Rc::new(RefCell::new(vec![]));
        let write = arena.push(
            1,
            NodeKind::LocalWrite {
                name: "x".into(),
                value,
                called_methods: shared.clone(),
            },
        );
        let read = arena.push(
            2,
            NodeKind::LocalRead {
                name: "x".into(),
                write: Some(write),
                called_methods: shared.clone(),
            },
        );
        shared.borrow_mut().push("upcase".into());
        let NodeKind::LocalRead { called_methods, .. } = &arena.get(read).kind else {
            unreachable!()
        };
        assert_eq!(called_methods.borrow().as_slice(), ["upcase"]);
    }
}
