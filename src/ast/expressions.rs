use crate::{
    ast::{BinaryOp, Predicate, UnaryOp},
    datetime::DatetimeTemplate,
    value::Value,
};

/// Expression node of a compiled path.
///
/// Evaluating an expression yields an ordered sequence of items. The tree is
/// immutable once parsed and may be shared between threads.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Primaries
    /// Context variable (`$`), the document being queried
    ContextVariable,

    /// Current item (`@`), only bound inside a filter
    CurrentItem,

    /// Named parameter (`$name`), stored without the `$`
    NamedVariable(String),

    /// Literal scalar
    ///
    /// # Examples
    /// ```text
    /// true  null  "abc"  42  1.5e3
    /// ```
    Literal(Value),

    /// `last`, the index of the final element of the array being subscripted
    LastSubscript,

    // Accessors
    /// Member accessor; `key == None` is the wildcard `.*`
    ///
    /// # Examples
    /// ```text
    /// $.name
    /// $."first name"
    /// $.*
    /// ```
    MemberAccessor {
        base: Box<Expr>,
        key: Option<String>,
    },

    /// Array accessor; `subscripts == None` is the wildcard `[*]`
    ///
    /// # Examples
    /// ```text
    /// $[0]
    /// $[1 to 3, last]
    /// $[*]
    /// ```
    ArrayAccessor {
        base: Box<Expr>,
        subscripts: Option<Vec<Subscript>>,
    },

    /// Filter (`?( predicate )`) keeping the items whose predicate is true
    Filter {
        base: Box<Expr>,
        predicate: Box<Predicate>,
    },

    // Arithmetic
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    // Item methods
    /// Zero-argument item method
    ///
    /// # Examples
    /// ```text
    /// $.items.size()
    /// $.price.floor()
    /// ```
    SimpleMethod {
        base: Box<Expr>,
        method: Method,
    },

    /// `.datetime()` or `.datetime("template")`
    DatetimeMethod {
        base: Box<Expr>,
        template: Option<DatetimeTemplate>,
    },
}

/// One entry of an array accessor's subscript list.
#[derive(Debug, Clone, PartialEq)]
pub enum Subscript {
    /// Single index
    Index(Expr),
    /// Inclusive range (`from to to`)
    Range { from: Expr, to: Expr },
}

/// Item methods taking no arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Type,
    Size,
    Double,
    Ceiling,
    Floor,
    Abs,
    KeyValue,
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Type => "type",
            Method::Size => "size",
            Method::Double => "double",
            Method::Ceiling => "ceiling",
            Method::Floor => "floor",
            Method::Abs => "abs",
            Method::KeyValue => "keyvalue",
        }
    }
}

impl Expr {
    /// `$."name"`, the shape of the member accessor fast path.
    pub fn root_member(name: &str) -> Expr {
        Expr::MemberAccessor {
            base: Box::new(Expr::ContextVariable),
            key: Some(name.to_string()),
        }
    }
}
