// AST (Abstract Syntax Tree) definitions for snippets

use std::rc::Rc;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Binary operators (arithmetic and bitwise)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    /// Operator symbol as written in source, used in error messages
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,    // -x
    Pos,    // +x
    Not,    // not x
    Invert, // ~x
}

/// Short-circuiting boolean operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// Comparison operators; several may be chained (`a < b <= c`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        }
    }
}

/// Function parameter with optional default value
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub location: SourceLocation,
}

/// A `def` or `lambda`. Lambdas are stored with a single `return` statement body.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// Keyword argument at a call site: `f(x=1)`
#[derive(Debug, Clone)]
pub struct Keyword {
    pub name: String,
    pub value: Expr,
}

/// One `for ... in ... if ...` clause of a comprehension
#[derive(Debug, Clone)]
pub struct Comprehension {
    pub target: Expr,
    pub iter: Expr,
    pub conditions: Vec<Expr>,
}

/// A piece of an f-string
#[derive(Debug, Clone)]
pub enum FStringPart {
    Literal(String),
    Field {
        expr: Box<Expr>,
        conversion: Option<char>,
        spec: Option<String>,
    },
}

/// `except [type] [as name]:` clause
#[derive(Debug, Clone)]
pub struct ExceptHandler {
    pub exception_type: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// `name [as alias]` in import statements
#[derive(Debug, Clone)]
pub struct Alias {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: SourceLocation,
    /// Levels in the tree rooted here; a leaf is 1
    pub height: u32,
}

impl Expr {
    pub fn new(kind: ExprKind, location: SourceLocation) -> Self {
        let height = kind.child_height().saturating_add(1);
        Self {
            kind,
            location,
            height,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    NoneLiteral,
    FString(Vec<FStringPart>),

    Name(String),
    /// Write-only binding that receives the value of a captured tail expression.
    /// Never produced by the parser.
    ResultSlot,

    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),

    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<Expr>,
    },
    BoolOp {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    IfExp {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    Attribute {
        object: Box<Expr>,
        name: String,
    },
    Subscript {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Lambda(Rc<FunctionDef>),
    ListComp {
        element: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        generators: Vec<Comprehension>,
    },
}

impl ExprKind {
    /// Height of the tallest direct subexpression, 0 for leaves
    fn child_height(&self) -> u32 {
        fn tallest<'a>(exprs: impl IntoIterator<Item = &'a Expr>) -> u32 {
            exprs.into_iter().map(|expr| expr.height).max().unwrap_or(0)
        }
        fn clauses(generators: &[Comprehension]) -> u32 {
            tallest(generators.iter().flat_map(|clause| {
                std::iter::once(&clause.target)
                    .chain(std::iter::once(&clause.iter))
                    .chain(&clause.conditions)
            }))
        }

        match self {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::NoneLiteral
            | ExprKind::Name(_)
            | ExprKind::ResultSlot => 0,
            ExprKind::FString(parts) => tallest(parts.iter().filter_map(|part| match part {
                FStringPart::Field { expr, .. } => Some(&**expr),
                FStringPart::Literal(_) => None,
            })),
            ExprKind::List(items) | ExprKind::Tuple(items) => tallest(items),
            ExprKind::Dict(entries) => tallest(entries.iter().flat_map(|(k, v)| [k, v])),
            ExprKind::BinaryOp { left, right, .. } | ExprKind::BoolOp { left, right, .. } => {
                left.height.max(right.height)
            }
            ExprKind::UnaryOp { operand, .. } => operand.height,
            ExprKind::Compare {
                left, comparators, ..
            } => left.height.max(tallest(comparators)),
            ExprKind::IfExp {
                condition,
                then_expr,
                else_expr,
            } => condition.height.max(then_expr.height).max(else_expr.height),
            ExprKind::Call { func, args, keywords } => func
                .height
                .max(tallest(args))
                .max(tallest(keywords.iter().map(|keyword| &keyword.value))),
            ExprKind::Attribute { object, .. } => object.height,
            ExprKind::Subscript { object, index } => object.height.max(index.height),
            ExprKind::Slice { lower, upper, step } => {
                tallest([lower, upper, step].into_iter().flatten().map(|bound| &**bound))
            }
            ExprKind::Lambda(def) => {
                let defaults = def.params.iter().filter_map(|param| param.default.as_ref());
                let body = def.body.iter().filter_map(|stmt| match &stmt.kind {
                    StmtKind::Return(Some(expr)) => Some(expr),
                    _ => None,
                });
                tallest(defaults.chain(body))
            }
            ExprKind::ListComp {
                element,
                generators,
            } => element.height.max(clauses(generators)),
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => key.height.max(value.height).max(clauses(generators)),
        }
    }

    /// Short description used by "cannot assign to ..." diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::NoneLiteral => "literal",
            ExprKind::FString(_) => "f-string expression",
            ExprKind::Name(_) | ExprKind::ResultSlot => "name",
            ExprKind::List(_) => "list",
            ExprKind::Tuple(_) => "tuple",
            ExprKind::Dict(_) => "dict literal",
            ExprKind::BinaryOp { .. } | ExprKind::UnaryOp { .. } => "expression",
            ExprKind::BoolOp { .. } => "expression",
            ExprKind::Compare { .. } => "comparison",
            ExprKind::IfExp { .. } => "conditional expression",
            ExprKind::Call { .. } => "function call",
            ExprKind::Attribute { .. } => "attribute",
            ExprKind::Subscript { .. } => "subscript",
            ExprKind::Slice { .. } => "slice",
            ExprKind::Lambda(_) => "lambda",
            ExprKind::ListComp { .. } => "list comprehension",
            ExprKind::DictComp { .. } => "dict comprehension",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: SourceLocation,
}

impl Stmt {
    pub fn new(kind: StmtKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Bare expression whose value is discarded
    Expr(Expr),
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    If {
        condition: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    FunctionDef(Rc<FunctionDef>),
    Return(Option<Expr>),
    Break,
    Continue,
    Pass,
    Raise(Option<Expr>),
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    Assert {
        test: Expr,
        message: Option<Expr>,
    },
    Global(Vec<String>),
    Delete(Vec<Expr>),
    Import(Vec<Alias>),
    ImportFrom {
        module: String,
        names: Vec<Alias>,
    },
}

/// Top-level snippet structure
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}
