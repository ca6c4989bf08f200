use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;

use super::{FormatErr, Result};
use crate::engine::{Node, OpKind};

/// An expression document as it's stored on disk.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Document {
    Matrix(Vec<Vec<f64>>),
    Op {
        operator: String,
        operands: Vec<Document>,
    },
}

impl Document {
    fn into_node(self) -> Result<Node> {
        let (operator, operands) = match self {
            Document::Matrix(rows) => return Ok(Node::Matrix(rows)),
            Document::Op { operator, operands } => (operator, operands),
        };

        let kind = parse_operator(&operator)?;
        if operands.is_empty() {
            return Err(FormatErr::NoOperands { operator });
        }

        let children = operands
            .into_iter()
            .map(Document::into_node)
            .collect::<Result<_>>()?;

        Ok(Node::op(kind, children))
    }
}

fn parse_operator(operator: &str) -> Result<OpKind> {
    match operator {
        "+" => Ok(OpKind::Add),
        "*" => Ok(OpKind::Multiply),
        "-" => Ok(OpKind::Negate),
        "T" => Ok(OpKind::Transpose),
        other => Err(FormatErr::UnknownOperator(other.to_string())),
    }
}

/// Parses an expression tree from a JSON document.
///
/// # Arguments
/// * `s` - The document, either a matrix or an `operator`/`operands` object.
///
/// # Returns
/// The expression tree, operand counts are not checked here.
pub fn parse_str(s: &str) -> Result<Node> {
    let document: Document = serde_json::from_str(s)?;
    document.into_node()
}

/// Reads an expression tree from the JSON document at `path`.
///
/// # Arguments
/// * `path` - The input document's path.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Node> {
    let reader = BufReader::new(File::open(path)?);
    let document: Document = serde_json::from_reader(reader)?;
    document.into_node()
}
