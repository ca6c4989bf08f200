use std::{fmt, mem};

/// The operator of a non-leaf node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Add,
    Negate,
    Transpose,
    Multiply,
}

impl OpKind {
    /// The exact amount of operands the operator takes.
    pub fn arity(self) -> usize {
        match self {
            OpKind::Negate | OpKind::Transpose => 1,
            OpKind::Add | OpKind::Multiply => 2,
        }
    }

    /// Whether a chain of operands can be regrouped freely.
    pub fn is_associative(self) -> bool {
        matches!(self, OpKind::Add | OpKind::Multiply)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Negate => "negate",
            OpKind::Transpose => "transpose",
            OpKind::Multiply => "multiply",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of a matrix expression tree.
///
/// Leaves hold concrete row-major matrices. A resolved operator is replaced
/// by a leaf in place and its former children are dropped, so a node never
/// goes back from `Matrix` to `Op`.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Matrix(Vec<Vec<f64>>),
    Op { kind: OpKind, children: Vec<Node> },
}

impl Node {
    pub fn matrix(rows: Vec<Vec<f64>>) -> Self {
        Node::Matrix(rows)
    }

    pub fn op(kind: OpKind, children: Vec<Node>) -> Self {
        Node::Op { kind, children }
    }

    pub fn add(lhs: Node, rhs: Node) -> Self {
        Node::op(OpKind::Add, vec![lhs, rhs])
    }

    pub fn multiply(lhs: Node, rhs: Node) -> Self {
        Node::op(OpKind::Multiply, vec![lhs, rhs])
    }

    pub fn negate(operand: Node) -> Self {
        Node::op(OpKind::Negate, vec![operand])
    }

    pub fn transpose(operand: Node) -> Self {
        Node::op(OpKind::Transpose, vec![operand])
    }

    /// Returns the operator, `None` for a concrete matrix.
    pub fn kind(&self) -> Option<OpKind> {
        match self {
            Node::Matrix(_) => None,
            Node::Op { kind, .. } => Some(*kind),
        }
    }

    /// Returns the operands, empty for a concrete matrix.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Matrix(_) => &[],
            Node::Op { children, .. } => children,
        }
    }

    pub fn as_matrix(&self) -> Option<&[Vec<f64>]> {
        match self {
            Node::Matrix(rows) => Some(rows),
            Node::Op { .. } => None,
        }
    }

    pub fn into_matrix(self) -> Option<Vec<Vec<f64>>> {
        match self {
            Node::Matrix(rows) => Some(rows),
            Node::Op { .. } => None,
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, Node::Matrix(_))
    }

    /// Whether this is an operator whose operands are all concrete.
    pub fn is_resolvable(&self) -> bool {
        match self {
            Node::Matrix(_) => false,
            Node::Op { children, .. } => children.iter().all(Node::is_concrete),
        }
    }

    /// Finds the first resolvable node in pre-order, operands left to right.
    ///
    /// # Returns
    /// `None` if this node is concrete or no operator has only concrete operands.
    pub fn find_resolvable_mut(&mut self) -> Option<&mut Node> {
        if self.is_resolvable() {
            return Some(self);
        }

        match self {
            Node::Matrix(_) => None,
            Node::Op { children, .. } => children.iter_mut().find_map(Node::find_resolvable_mut),
        }
    }

    /// Turns this node into a concrete matrix, dropping its operands.
    ///
    /// # Arguments
    /// * `rows` - The computed value of this node.
    pub fn resolve(&mut self, rows: Vec<Vec<f64>>) {
        *self = Node::Matrix(rows);
    }

    /// Rewrites every `Add`/`Multiply` with more than two operands into a
    /// left-nested chain of binary nodes, recursively.
    ///
    /// Operators with the wrong amount of operands otherwise are left as
    /// they are.
    pub fn associative_nesting(&mut self) {
        let Node::Op { kind, children } = self else {
            return;
        };

        children.iter_mut().for_each(Node::associative_nesting);

        if !kind.is_associative() || children.len() <= 2 {
            return;
        }

        let kind = *kind;
        let nested = mem::take(children)
            .into_iter()
            .reduce(|lhs, rhs| Node::op(kind, vec![lhs, rhs]));

        if let Some(nested) = nested {
            *self = nested;
        }
    }
}

impl From<Vec<Vec<f64>>> for Node {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        Node::Matrix(rows)
    }
}
