use std::{
    fs,
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicUsize, Ordering::SeqCst},
};

use lae::{
    engine::{LinearAlgebraEngine, Node},
    format::{self, FormatErr},
    scheduling::RandFatigue,
};
use serde_json::{Value, json};

fn temp_path(name: &str) -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);

    let unique = NEXT.fetch_add(1, SeqCst);
    std::env::temp_dir().join(format!("lae-{}-{unique}-{name}", process::id()))
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn reads_an_expression_file() {
    let input = temp_path("input.json");
    fs::write(
        &input,
        r#"{"operator": "*", "operands": [[[1, 0], [0, 1]], [[1, 2], [3, 4]]]}"#,
    )
    .unwrap();

    let node = format::read_file(&input).unwrap();
    assert_eq!(
        node,
        Node::multiply(
            Node::matrix(vec![vec![1., 0.], vec![0., 1.]]),
            Node::matrix(vec![vec![1., 2.], vec![3., 4.]]),
        )
    );

    fs::remove_file(input).unwrap();
}

#[test]
fn missing_input_is_an_io_error() {
    let input = temp_path("missing.json");
    assert!(matches!(format::read_file(&input), Err(FormatErr::Io(_))));
}

#[test]
fn writes_result_documents() {
    let output = temp_path("result.json");
    format::write_result(&output, &[vec![4., 6.]]).unwrap();

    assert_eq!(read_json(&output), json!({ "result": [[4.0, 6.0]] }));
    fs::remove_file(output).unwrap();
}

#[test]
fn writes_error_documents() {
    let output = temp_path("error.json");
    format::write_result(&output, &[vec![1.]]).unwrap();
    format::write_error(&output, "invalid number of threads: 0").unwrap();

    assert_eq!(
        read_json(&output),
        json!({ "error": "invalid number of threads: 0" })
    );
    fs::remove_file(output).unwrap();
}

#[test]
fn file_to_file_resolution() {
    let input = temp_path("chain.json");
    let output = temp_path("chain-out.json");
    fs::write(
        &input,
        r#"{"operator": "+", "operands": [
            [[1, 2]],
            {"operator": "-", "operands": [[[3, 4]]]},
            {"operator": "T", "operands": [[[5], [6]]]}
        ]}"#,
    )
    .unwrap();

    let mut root = format::read_file(&input).unwrap();
    root.associative_nesting();

    let mut engine = LinearAlgebraEngine::with_fatigue(2, RandFatigue::seeded(1)).unwrap();
    let rows = engine.run(root).unwrap().into_matrix().unwrap();
    format::write_result(&output, &rows).unwrap();

    assert_eq!(read_json(&output), json!({ "result": [[3.0, 4.0]] }));

    fs::remove_file(input).unwrap();
    fs::remove_file(output).unwrap();
}
