//! IR nodes: the reverse-dependency graph (§3.2).

mod node;

pub use node::{
    CalledMethods, FileArena, FileId, GlobalNodeId, NarrowKind, Node, NodeId, NodeKind, ParamKind,
};
