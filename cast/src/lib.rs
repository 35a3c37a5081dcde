//! An abstract syntax tree for C source, loosely based on the ANSI C grammar,
//! used to emit eBPF C programs together with a deterministic pretty-printer.
//!
//! The rendered text is a contract: the same tree always renders to the same
//! bytes (2-space indentation, braces on the declaration line, one aggregate
//! member per line), so generated programs are stable and golden tests can
//! compare output verbatim.


use serde::{Deserialize, Serialize};
use std::fmt;

/// The indentation increment of the canonical rendering.
pub const INDENT: &str = "  ";

/// Escapes a string into a C string literal, including the surrounding quotes.
pub fn string_literal(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Attribute-style annotation appended after a variable name, such as
/// `SEC("kprobe/do_sys_openat2")`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CAnnotation {
    pub name: String,
    pub value: String,
}

impl CAnnotation {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> CAnnotation {
        CAnnotation {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The `SEC("...")` linkage/section marker.
    pub fn sec(value: impl Into<String>) -> CAnnotation {
        CAnnotation::new("SEC", value)
    }

    pub fn pretty(&self) -> String {
        format!("{}({})", self.name, string_literal(&self.value))
    }
}

/// A variable name, optionally carrying annotations that render after the
/// name (`myVar SEC("a")`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub annotations: Vec<CAnnotation>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Variable {
        Variable {
            name: name.into(),
            annotations: Vec::new(),
        }
    }

    pub fn annotated(name: impl Into<String>, annotations: Vec<CAnnotation>) -> Variable {
        Variable {
            name: name.into(),
            annotations,
        }
    }

    /// The space-separated annotation list, empty when there are none.
    pub fn annotations_string(&self) -> String {
        self.annotations
            .iter()
            .map(CAnnotation::pretty)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn pretty(&self) -> String {
        if self.annotations.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.annotations_string())
        }
    }
}

/// A literal constant. Strings are escaped on rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int(i64),
    UInt(u64),
    Str(String),
    Char(char),
}

impl Constant {
    pub fn pretty(&self) -> String {
        match self {
            Constant::Int(v) => v.to_string(),
            Constant::UInt(v) => v.to_string(),
            Constant::Str(s) => string_literal(s),
            Constant::Char(c) => match c {
                '\'' => "'\\''".to_string(),
                '\\' => "'\\\\'".to_string(),
                '\n' => "'\\n'".to_string(),
                '\0' => "'\\0'".to_string(),
                c => format!("'{c}'"),
            },
        }
    }
}

/// Operator associativity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Associativity {
    Left,
    Right,
}

/// C operators with their cppreference precedence numbers (smaller binds
/// tighter). Postfix operators have precedence 2, unary operators 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    // postfix, precedence 2
    PostfixInc,
    PostfixDec,
    Call,
    Subscript,
    MemberAccess,
    // unary, precedence 3
    PrefixInc,
    PrefixDec,
    Plus,
    Minus,
    Not,
    BitNot,
    Deref,
    AddressOf,
    SizeOf,
    Cast,
    // binary
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
    // ternary and assignments, precedence 16
    Conditional,
    Assign,
    MulAssign,
    DivAssign,
    ModAssign,
    AddAssign,
    SubAssign,
    ShlAssign,
    ShrAssign,
    BitAndAssign,
    BitXorAssign,
    BitOrAssign,
    Comma,
}

impl Operator {
    /// The operator's token as written in C.
    pub fn token(self) -> &'static str {
        match self {
            Operator::PostfixInc | Operator::PrefixInc => "++",
            Operator::PostfixDec | Operator::PrefixDec => "--",
            Operator::Call => "()",
            Operator::Subscript => "[]",
            Operator::MemberAccess => ".",
            Operator::Plus | Operator::Add => "+",
            Operator::Minus | Operator::Sub => "-",
            Operator::Not => "!",
            Operator::BitNot => "~",
            Operator::Deref | Operator::Mul => "*",
            Operator::AddressOf | Operator::BitAnd => "&",
            Operator::SizeOf => "sizeof",
            Operator::Cast => "cast",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Shl => "<<",
            Operator::Shr => ">>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::BitXor => "^",
            Operator::BitOr => "|",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Conditional => "?",
            Operator::Assign => "=",
            Operator::MulAssign => "*=",
            Operator::DivAssign => "/=",
            Operator::ModAssign => "%=",
            Operator::AddAssign => "+=",
            Operator::SubAssign => "-=",
            Operator::ShlAssign => "<<=",
            Operator::ShrAssign => ">>=",
            Operator::BitAndAssign => "&=",
            Operator::BitXorAssign => "^=",
            Operator::BitOrAssign => "|=",
            Operator::Comma => ",",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            Operator::PostfixInc
            | Operator::PostfixDec
            | Operator::Call
            | Operator::Subscript
            | Operator::MemberAccess => 2,
            Operator::PrefixInc
            | Operator::PrefixDec
            | Operator::Plus
            | Operator::Minus
            | Operator::Not
            | Operator::BitNot
            | Operator::Deref
            | Operator::AddressOf
            | Operator::SizeOf
            | Operator::Cast => 3,
            Operator::Mul | Operator::Div | Operator::Mod => 5,
            Operator::Add | Operator::Sub => 6,
            Operator::Shl | Operator::Shr => 7,
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => 9,
            Operator::Eq | Operator::Ne => 10,
            Operator::BitAnd => 11,
            Operator::BitXor => 12,
            Operator::BitOr => 13,
            Operator::And => 14,
            Operator::Or => 15,
            Operator::Conditional
            | Operator::Assign
            | Operator::MulAssign
            | Operator::DivAssign
            | Operator::ModAssign
            | Operator::AddAssign
            | Operator::SubAssign
            | Operator::ShlAssign
            | Operator::ShrAssign
            | Operator::BitAndAssign
            | Operator::BitXorAssign
            | Operator::BitOrAssign => 16,
            Operator::Comma => 17,
        }
    }

    /// Unary and assignment operators group right-to-left, everything else
    /// left-to-right.
    pub fn associativity(self) -> Associativity {
        match self.precedence() {
            3 | 16 => Associativity::Right,
            _ => Associativity::Left,
        }
    }

    /// Looks up a binary operator by its token.
    pub fn binary_from(token: &str) -> Option<Operator> {
        Some(match token {
            "*" => Operator::Mul,
            "/" => Operator::Div,
            "%" => Operator::Mod,
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "<<" => Operator::Shl,
            ">>" => Operator::Shr,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "==" => Operator::Eq,
            "!=" => Operator::Ne,
            "&" => Operator::BitAnd,
            "^" => Operator::BitXor,
            "|" => Operator::BitOr,
            "&&" => Operator::And,
            "||" => Operator::Or,
            "," => Operator::Comma,
            _ => return None,
        })
    }

    /// Looks up a unary (prefix) operator by its token.
    pub fn unary_from(token: &str) -> Option<Operator> {
        Some(match token {
            "++" => Operator::PrefixInc,
            "--" => Operator::PrefixDec,
            "+" => Operator::Plus,
            "-" => Operator::Minus,
            "!" => Operator::Not,
            "~" => Operator::BitNot,
            "*" => Operator::Deref,
            "&" => Operator::AddressOf,
            _ => return None,
        })
    }

    /// Looks up an assignment operator by its token.
    pub fn assignment_from(token: &str) -> Option<Operator> {
        Some(match token {
            "=" => Operator::Assign,
            "*=" => Operator::MulAssign,
            "/=" => Operator::DivAssign,
            "%=" => Operator::ModAssign,
            "+=" => Operator::AddAssign,
            "-=" => Operator::SubAssign,
            "<<=" => Operator::ShlAssign,
            ">>=" => Operator::ShrAssign,
            "&=" => Operator::BitAndAssign,
            "^=" => Operator::BitXorAssign,
            "|=" => Operator::BitOrAssign,
            _ => return None,
        })
    }
}

/// A C expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Constant(Constant),
    Variable(Variable),
    EnumConstant(String),
    /// An explicitly parenthesized expression.
    Parenthesized(Box<Expr>),
    /// Raw code spliced into the output unchanged.
    Verbatim(String),
    /// An operator applied to its operands. `Call` takes the callee first,
    /// `Cast` takes the target type expression first.
    Op { op: Operator, args: Vec<Expr> },
    /// `name = value` inside an initializer list, or a bare value.
    InitDeclarator {
        name: Option<Variable>,
        value: Box<Expr>,
    },
    /// `{a, b, c}`
    InitializerList(Vec<Expr>),
}

impl Expr {
    pub fn constant(value: i64) -> Expr {
        Expr::Constant(Constant::Int(value))
    }

    pub fn uconst(value: u64) -> Expr {
        Expr::Constant(Constant::UInt(value))
    }

    pub fn str(value: impl Into<String>) -> Expr {
        Expr::Constant(Constant::Str(value.into()))
    }

    pub fn variable(name: impl Into<String>) -> Expr {
        Expr::Variable(Variable::new(name))
    }

    pub fn verbatim(code: impl Into<String>) -> Expr {
        Expr::Verbatim(code.into())
    }

    pub fn binary(op: Operator, left: Expr, right: Expr) -> Expr {
        Expr::Op {
            op,
            args: vec![left, right],
        }
    }

    pub fn unary(op: Operator, arg: Expr) -> Expr {
        Expr::Op {
            op,
            args: vec![arg],
        }
    }

    pub fn assignment(op: Operator, target: Expr, value: Expr) -> Expr {
        Expr::Op {
            op,
            args: vec![target, value],
        }
    }

    pub fn ternary(cond: Expr, then_value: Expr, else_value: Expr) -> Expr {
        Expr::Op {
            op: Operator::Conditional,
            args: vec![cond, then_value, else_value],
        }
    }

    pub fn member_access(object: Expr, field: Expr) -> Expr {
        Expr::Op {
            op: Operator::MemberAccess,
            args: vec![object, field],
        }
    }

    pub fn array_access(array: Expr, index: Expr) -> Expr {
        Expr::Op {
            op: Operator::Subscript,
            args: vec![array, index],
        }
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Expr {
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(func);
        all.extend(args);
        Expr::Op {
            op: Operator::Call,
            args: all,
        }
    }

    pub fn cast(type_name: impl Into<String>, value: Expr) -> Expr {
        Expr::Op {
            op: Operator::Cast,
            args: vec![Expr::variable(type_name), value],
        }
    }

    pub fn sizeof(arg: Expr) -> Expr {
        Expr::Op {
            op: Operator::SizeOf,
            args: vec![arg],
        }
    }

    /// Wraps this expression into an expression statement.
    pub fn into_statement(self) -> Statement {
        Statement::Expression(self)
    }

    pub fn pretty(&self) -> String {
        self.pretty_indented("", INDENT)
    }

    pub fn pretty_indented(&self, indent: &str, _increment: &str) -> String {
        match self {
            Expr::Constant(c) => format!("{indent}{}", c.pretty()),
            Expr::Variable(v) => format!("{indent}{}", v.pretty()),
            Expr::EnumConstant(name) => format!("{indent}{name}"),
            Expr::Parenthesized(inner) => format!("{indent}({})", inner.pretty()),
            Expr::Verbatim(code) => format!("{indent}{code}"),
            Expr::Op { op, args } => format!("{indent}{}", render_op(*op, args)),
            Expr::InitDeclarator { name, value } => match name {
                Some(name) => format!("{indent}{} = {}", name.pretty(), value.pretty()),
                None => format!("{indent}{}", value.pretty()),
            },
            Expr::InitializerList(values) => {
                let inner = values
                    .iter()
                    .map(Expr::pretty)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{indent}{{{inner}}}")
            }
        }
    }

    /// The precedence of this node when it participates as an operand, if it
    /// is an operator application.
    fn op_precedence(&self) -> Option<u8> {
        match self {
            Expr::Op { op, .. } => Some(op.precedence()),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

/// Parenthesizes `rendered` when `wrap` is set.
fn maybe_wrap(rendered: String, wrap: bool) -> String {
    if wrap { format!("({rendered})") } else { rendered }
}

/// Renders an operator application with grammar-minimal parentheses: an
/// operand is parenthesized exactly when it binds looser than its position
/// requires, or equally tight against the operator's associativity.
fn render_op(op: Operator, args: &[Expr]) -> String {
    let p = op.precedence();
    let wrap_if_looser = |arg: &Expr| {
        let rendered = arg.pretty();
        maybe_wrap(rendered, arg.op_precedence().is_some_and(|q| q > p))
    };
    match op {
        Operator::Call => {
            let callee = wrap_if_looser(&args[0]);
            let rest = args[1..]
                .iter()
                .map(Expr::pretty)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{callee}({rest})")
        }
        Operator::Subscript => {
            format!("{}[{}]", wrap_if_looser(&args[0]), args[1].pretty())
        }
        Operator::MemberAccess => {
            format!("{}.{}", wrap_if_looser(&args[0]), wrap_if_looser(&args[1]))
        }
        Operator::SizeOf => format!("sizeof({})", args[0].pretty()),
        Operator::Cast => {
            format!("({}){}", args[0].pretty(), wrap_if_looser(&args[1]))
        }
        Operator::Conditional => {
            let wrap = |arg: &Expr| {
                maybe_wrap(arg.pretty(), arg.op_precedence().is_some_and(|q| q >= 16))
            };
            format!(
                "{} ? {} : {}",
                wrap(&args[0]),
                wrap(&args[1]),
                wrap(&args[2])
            )
        }
        Operator::PostfixInc | Operator::PostfixDec => {
            format!("{}{}", wrap_if_looser(&args[0]), op.token())
        }
        _ if p == 3 => {
            // An equal-precedence prefix operand must keep its parentheses:
            // without them `-(-x)` prints as `--x` and the tokens merge into
            // a predecrement.
            let wrap = args[0].op_precedence().is_some_and(|q| q >= p);
            format!("{}{}", op.token(), maybe_wrap(args[0].pretty(), wrap))
        }
        _ => {
            // Binary, assignment, and comma operators. On equal precedence the
            // operand on the non-associative side keeps its parentheses.
            let wrap_side = |arg: &Expr, assoc_side: Associativity| {
                let wrap = arg.op_precedence().is_some_and(|q| {
                    q > p || (q == p && op.associativity() != assoc_side)
                });
                maybe_wrap(arg.pretty(), wrap)
            };
            format!(
                "{} {} {}",
                wrap_side(&args[0], Associativity::Left),
                op.token(),
                wrap_side(&args[1], Associativity::Right)
            )
        }
    }
}

/// One enumerator inside an `enum` declarator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumerator {
    pub name: String,
    pub value: Option<i64>,
}

impl Enumerator {
    pub fn new(name: impl Into<String>, value: i64) -> Enumerator {
        Enumerator {
            name: name.into(),
            value: Some(value),
        }
    }

    pub fn auto(name: impl Into<String>) -> Enumerator {
        Enumerator {
            name: name.into(),
            value: None,
        }
    }
}

/// A member of a struct or union declarator. The optional `bpf_size` renders
/// the eBPF member-size form `type (name, size);`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructMember {
    pub decl: Declarator,
    pub name: Variable,
    pub bpf_size: Option<Expr>,
}

impl StructMember {
    pub fn new(decl: Declarator, name: Variable) -> StructMember {
        StructMember {
            decl,
            name,
            bpf_size: None,
        }
    }

    pub fn sized(decl: Declarator, name: Variable, bpf_size: Expr) -> StructMember {
        StructMember {
            decl,
            name,
            bpf_size: Some(bpf_size),
        }
    }

    fn pretty_indented(&self, indent: &str, increment: &str) -> String {
        if let Some(size) = &self.bpf_size {
            return format!(
                "{indent}{} ({}, {});",
                self.decl.pretty(),
                self.name.pretty(),
                size.pretty()
            );
        }
        if matches!(self.decl, Declarator::Array { .. }) {
            format!(
                "{};",
                self.decl.pretty_with_name(Some(&self.name), indent, increment)
            )
        } else {
            format!(
                "{} {};",
                self.decl.pretty_indented(indent, increment),
                self.name.pretty()
            )
        }
    }
}

/// A C declarator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Declarator {
    /// A plain type name such as `int` or `u64`.
    Identifier(Variable),
    /// `struct name`
    StructRef(Variable),
    /// `union name`
    UnionRef(Variable),
    /// `enum name`
    EnumRef(Variable),
    Pointer(Box<Declarator>),
    Array {
        decl: Box<Declarator>,
        size: Option<Expr>,
    },
    Function {
        decl: Box<Declarator>,
        params: Vec<Declarator>,
    },
    Struct {
        name: Option<Variable>,
        members: Vec<StructMember>,
    },
    Union {
        name: Option<Variable>,
        members: Vec<StructMember>,
    },
    Enum {
        name: Option<Variable>,
        enumerators: Vec<Enumerator>,
    },
}

impl Declarator {
    pub fn identifier(name: impl Into<String>) -> Declarator {
        Declarator::Identifier(Variable::new(name))
    }

    pub fn struct_ref(name: impl Into<String>) -> Declarator {
        Declarator::StructRef(Variable::new(name))
    }

    pub fn union_ref(name: impl Into<String>) -> Declarator {
        Declarator::UnionRef(Variable::new(name))
    }

    pub fn enum_ref(name: impl Into<String>) -> Declarator {
        Declarator::EnumRef(Variable::new(name))
    }

    pub fn pointer(decl: Declarator) -> Declarator {
        Declarator::Pointer(Box::new(decl))
    }

    pub fn array(decl: Declarator, size: Option<Expr>) -> Declarator {
        Declarator::Array {
            decl: Box::new(decl),
            size,
        }
    }

    pub fn function(decl: Declarator, params: Vec<Declarator>) -> Declarator {
        Declarator::Function {
            decl: Box::new(decl),
            params,
        }
    }

    pub fn pretty(&self) -> String {
        self.pretty_indented("", INDENT)
    }

    pub fn pretty_indented(&self, indent: &str, increment: &str) -> String {
        match self {
            Declarator::Identifier(name) => format!("{indent}{}", name.pretty()),
            Declarator::StructRef(name) => format!("{indent}struct {}", name.pretty()),
            Declarator::UnionRef(name) => format!("{indent}union {}", name.pretty()),
            Declarator::EnumRef(name) => format!("{indent}enum {}", name.pretty()),
            Declarator::Pointer(decl) => format!("{indent}*{}", decl.pretty()),
            Declarator::Array { .. } => self.pretty_with_name(None, indent, increment),
            Declarator::Function { decl, params } => {
                let params = params
                    .iter()
                    .map(Declarator::pretty)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({params})", decl.pretty_indented(indent, increment))
            }
            Declarator::Struct { name, members } => {
                aggregate_pretty("struct", name, members, indent, increment)
            }
            Declarator::Union { name, members } => {
                aggregate_pretty("union", name, members, indent, increment)
            }
            Declarator::Enum { name, enumerators } => {
                let name = match name {
                    Some(name) => format!("{} ", name.pretty()),
                    None => String::new(),
                };
                let inner = format!("{indent}{increment}");
                let body = enumerators
                    .iter()
                    .map(|e| match e.value {
                        Some(v) => format!("{inner}{} = {v}", e.name),
                        None => format!("{inner}{}", e.name),
                    })
                    .collect::<Vec<_>>()
                    .join(",\n");
                format!("{indent}enum {name}{{\n{body}\n{indent}}}")
            }
        }
    }

    /// Renders this declarator with a declared name in place, flattening
    /// nested array declarators into `base name[a][b]` form.
    pub fn pretty_with_name(
        &self,
        name: Option<&Variable>,
        indent: &str,
        increment: &str,
    ) -> String {
        let mut brackets = Vec::new();
        let mut base = self;
        while let Declarator::Array { decl, size } = base {
            brackets.push(match size {
                Some(size) => format!("[{}]", size.pretty()),
                None => "[]".to_string(),
            });
            base = decl;
        }
        let name = match name {
            Some(name) => format!(" {}", name.pretty()),
            None => String::new(),
        };
        format!(
            "{}{name}{}",
            base.pretty_indented(indent, increment),
            brackets.concat()
        )
    }

    /// Wraps this declarator into a declaration statement.
    pub fn into_statement(self) -> Statement {
        Statement::StructDeclaration(self)
    }
}

impl fmt::Display for Declarator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

fn aggregate_pretty(
    keyword: &str,
    name: &Option<Variable>,
    members: &[StructMember],
    indent: &str,
    increment: &str,
) -> String {
    let name = match name {
        Some(name) => format!("{} ", name.pretty()),
        None => String::new(),
    };
    let inner = format!("{indent}{increment}");
    let body = members
        .iter()
        .map(|m| m.pretty_indented(&inner, increment))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{indent}{keyword} {name}{{\n{body}\n{indent}}}")
}

/// A C statement or top-level construct.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Expression(Expr),
    /// `<type> <name> [= value];` including aggregate types:
    /// `struct s {...} name SEC("...");`
    VariableDefinition {
        ty: Declarator,
        name: Variable,
        value: Option<Expr>,
    },
    /// `<declarator> [= init];`
    Declaration {
        decl: Declarator,
        init: Option<Expr>,
    },
    /// An aggregate or enum declaration terminated by `;`.
    StructDeclaration(Declarator),
    FunctionDeclaration {
        decl: Declarator,
        body: Box<Statement>,
    },
    Compound(Vec<Statement>),
    If {
        cond: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    While {
        cond: Expr,
        body: Box<Statement>,
    },
    For {
        init: Option<Expr>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Statement>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Empty,
    Switch {
        expr: Expr,
        body: Box<Statement>,
    },
    Case {
        expr: Expr,
        body: Box<Statement>,
    },
    Default(Box<Statement>),
    Typedef {
        decl: Declarator,
        name: Variable,
    },
    Define {
        name: String,
        value: Constant,
    },
    Include(String),
    Verbatim(String),
}

impl Statement {
    pub fn compound(statements: Vec<Statement>) -> Statement {
        Statement::Compound(statements)
    }

    pub fn variable_definition(ty: Declarator, name: Variable) -> Statement {
        Statement::VariableDefinition {
            ty,
            name,
            value: None,
        }
    }

    pub fn pretty(&self) -> String {
        self.pretty_indented("", INDENT)
    }

    pub fn pretty_indented(&self, indent: &str, increment: &str) -> String {
        let inner = format!("{indent}{increment}");
        match self {
            Statement::Expression(expr) => {
                format!("{};", expr.pretty_indented(indent, increment))
            }
            Statement::VariableDefinition { ty, name, value } => {
                let init = match value {
                    Some(value) => format!(" = {}", value.pretty()),
                    None => String::new(),
                };
                if matches!(ty, Declarator::Array { .. }) {
                    let plain = Variable::new(&name.name);
                    let anns = if name.annotations.is_empty() {
                        String::new()
                    } else {
                        format!(" {}", name.annotations_string())
                    };
                    format!(
                        "{}{anns}{init};",
                        ty.pretty_with_name(Some(&plain), indent, increment)
                    )
                } else {
                    format!(
                        "{} {}{init};",
                        ty.pretty_indented(indent, increment),
                        name.pretty()
                    )
                }
            }
            Statement::Declaration { decl, init } => {
                let init = match init {
                    Some(init) => format!(" = {}", init.pretty()),
                    None => String::new(),
                };
                format!("{indent}{}{init};", decl.pretty())
            }
            Statement::StructDeclaration(decl) => {
                format!("{};", decl.pretty_indented(indent, increment))
            }
            Statement::FunctionDeclaration { decl, body } => {
                format!(
                    "{}\n{}",
                    decl.pretty_indented(indent, increment),
                    body.pretty_indented(indent, increment)
                )
            }
            Statement::Compound(statements) => {
                let body = statements
                    .iter()
                    .map(|s| s.pretty_indented(&inner, increment))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{indent}{{\n{body}\n{indent}}}")
            }
            Statement::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut out = format!(
                    "{indent}if ({})\n{}",
                    cond.pretty(),
                    then_branch.pretty_indented(&inner, increment)
                );
                if let Some(else_branch) = else_branch {
                    out.push_str(&format!(
                        " else\n{}",
                        else_branch.pretty_indented(&inner, increment)
                    ));
                }
                out
            }
            Statement::While { cond, body } => {
                format!(
                    "{indent}while ({})\n{}",
                    cond.pretty(),
                    body.pretty_indented(&inner, increment)
                )
            }
            Statement::For {
                init,
                cond,
                step,
                body,
            } => {
                let part = |e: &Option<Expr>| e.as_ref().map(Expr::pretty).unwrap_or_default();
                format!(
                    "{indent}for ({}; {}; {})\n{}",
                    part(init),
                    part(cond),
                    part(step),
                    body.pretty_indented(&inner, increment)
                )
            }
            Statement::Return(expr) => match expr {
                Some(expr) => format!("{indent}return {};", expr.pretty()),
                None => format!("{indent}return;"),
            },
            Statement::Break => format!("{indent}break;"),
            Statement::Continue => format!("{indent}continue;"),
            Statement::Empty => format!("{indent};"),
            Statement::Switch { expr, body } => {
                format!(
                    "{indent}switch ({})\n{}",
                    expr.pretty(),
                    body.pretty_indented(&inner, increment)
                )
            }
            Statement::Case { expr, body } => {
                format!(
                    "{indent}case {}:\n{}",
                    expr.pretty(),
                    body.pretty_indented(&inner, increment)
                )
            }
            Statement::Default(body) => {
                format!("{indent}default:\n{}", body.pretty_indented(&inner, increment))
            }
            Statement::Typedef { decl, name } => {
                if matches!(decl, Declarator::Array { .. }) {
                    format!(
                        "{indent}typedef {};",
                        decl.pretty_with_name(Some(name), "", increment)
                    )
                } else {
                    format!("{indent}typedef {} {};", decl.pretty(), name.pretty())
                }
            }
            Statement::Define { name, value } => {
                format!("{indent}#define {name} {}", value.pretty())
            }
            Statement::Include(file) => format!("{indent}#include {file}"),
            Statement::Verbatim(code) => code
                .lines()
                .map(|l| format!("{indent}{l}"))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}
