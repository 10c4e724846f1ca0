//! The AST contract lowering consumes (§1 "Source parser", §4.5).
//!
//! Not a parser: this crate never turns source text into these types. A
//! concrete `adapter::SourceParser` implementation is expected to produce
//! them; this module only fixes the shape lowering depends on, matching the
//! node kinds §4.1 enumerates (literals, assignment forms, calls, control
//! flow, classes/modules, rescue).

use crate::ty::Name;

/// One syntactic expression, carrying the byte offset used for the IR
/// node's location (§3.2).
#[derive(Debug, Clone)]
pub struct Expr {
    pub offset: u32,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(offset: u32, kind: ExprKind) -> Self {
        Self { offset, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// A hash literal's key: a bare `symbol:` key stays structural
/// (`HashShape`); anything else forces the `Hash` widening on first
/// non-symbol key (§3.1, §4.1 container mutation rules).
#[derive(Debug, Clone)]
pub enum HashKey {
    Symbol(Name),
    Other(Box<Expr>),
}

/// One assignment target of a multiple assignment `a, *b, c = expr`.
#[derive(Debug, Clone)]
pub enum MultiTarget {
    /// A plain target; `index` counts from the front if before the rest
    /// target, or is a negative offset from the end if after it.
    Plain { name: Name, index: i64 },
    Rest { name: Name },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignTarget {
    Local,
    Ivar,
    Cvar,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: Name,
    pub kind: crate::ty::ParamKind,
    pub default: Option<Box<Expr>>,
}

/// A block literal passed to a call (`{ |n| ... }` / `do |n| ... end`).
#[derive(Debug, Clone)]
pub struct Block {
    pub params: Vec<Name>,
    pub body: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct RescueClause {
    pub exception_class: Option<Name>,
    pub binding: Option<Name>,
    pub body: Vec<Expr>,
}

/// One `when` clause of a `case` expression: its (possibly multiple,
/// comma-separated) test values and its branch body.
#[derive(Debug, Clone)]
pub struct WhenClause {
    pub values: Vec<Expr>,
    pub body: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLit,
    FloatLit,
    StringLit,
    SymbolLit(Name),
    NilLit,
    BoolLit(bool),
    ArrayLit(Vec<Expr>),
    HashLit(Vec<(HashKey, Expr)>),

    LocalRef(Name),
    IvarRef(Name),
    CvarRef(Name),
    ConstRef(Name),
    SelfExpr,

    Assign {
        target: AssignTarget,
        name: Name,
        value: Box<Expr>,
    },
    /// `x OP= v`. `op` is `None` for `||=`/`&&=` and `Some(method)` for an
    /// arbitrary operator (`+=` desugars to `op: Some("+")`).
    OpAssign {
        target: AssignTarget,
        name: Name,
        op: Option<Name>,
        logical_and: bool,
        value: Box<Expr>,
    },
    MultipleAssign {
        targets: Vec<MultiTarget>,
        value: Box<Expr>,
    },
    /// `h[k] = v` / `a[i] = v`, on a receiver that is itself an
    /// expression (only container-mutation widening applies when that
    /// receiver is a bare local read, §4.1).
    IndexAssign {
        receiver: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },
    /// `a << v`.
    ShovelAssign {
        receiver: Box<Expr>,
        value: Box<Expr>,
    },

    Call {
        receiver: Option<Box<Expr>>,
        method: Name,
        args: Vec<Expr>,
        block: Option<Block>,
    },

    If {
        cond: Box<Expr>,
        then_body: Vec<Expr>,
        else_body: Option<Vec<Expr>>,
    },
    /// `case subject; when v1, v2; ...; else; ...; end` (§4.1 "case/when"):
    /// one branch context per `when`, merged the same way as `if`/`unless`.
    /// `subject` is absent for a subject-less `case` (`case; when cond;
    /// ...; end`).
    Case {
        subject: Option<Box<Expr>>,
        whens: Vec<WhenClause>,
        else_body: Option<Vec<Expr>>,
    },
    /// `return/raise unless V` at statement level (§3.2 invariant 4).
    GuardUnless {
        cond: Box<Expr>,
        raising: bool,
    },
    /// `raise`/`fail`/`exit`/`abort` and similar non-returning calls,
    /// elided from `Merge` branches (§3.2 invariant 3).
    NonReturning,
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),

    Return(Option<Box<Expr>>),

    Def {
        name: Name,
        params: Vec<ParamSpec>,
        body: Vec<Expr>,
        singleton: bool,
        visibility: Visibility,
    },
    ModuleFunction(Box<Expr>),
    ClassDef {
        name: Name,
        superclass: Option<Name>,
        members: Vec<Expr>,
    },
    ModuleDef {
        name: Name,
        members: Vec<Expr>,
    },

    Rescue {
        body: Vec<Expr>,
        clauses: Vec<RescueClause>,
    },
}
