//! End-to-end pipeline tests against the scripted engine.

use std::path::PathBuf;
use tempfile::TempDir;

use terse_core::{run, EvidenceSource, RunOptions, ScriptedEngine};

fn opts_with_subject(subject: &str) -> RunOptions {
    RunOptions {
        subject: Some(subject.to_string()),
        ..RunOptions::default()
    }
}

fn seed_store(dir: &TempDir) -> PathBuf {
    let db_path = dir.path().join("chunks.db");
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    conn.execute(
        "CREATE TABLE chunks (id INTEGER PRIMARY KEY, content TEXT NOT NULL)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO chunks (id, content) VALUES
             (1, 'An LR(0) item is a production with a dot position.'),
             (2, 'An item set groups items reachable by the same viable prefix.'),
             (3, 'Item sets are the states of the LR(0) automaton.')",
        [],
    )
    .unwrap();
    db_path
}

#[test]
fn ungrounded_run_yields_one_salvaged_sentence() {
    let mut engine = ScriptedEngine::new([
        "Sure, here: ",
        "LR(0) item sets ",
        "are the canonical states.",
    ]);

    let answer = run(
        &mut engine,
        "explain LR(0) item sets in one sentence",
        None,
        &opts_with_subject("LR(0)"),
    )
    .unwrap();

    assert_eq!(answer, "LR(0) item sets are the canonical states.");
}

#[test]
fn chat_leakage_after_the_answer_is_trimmed() {
    let mut engine = ScriptedEngine::new(["X is a Y", ".\nHuman: and", " now what"]);

    let answer = run(&mut engine, "define X", None, &RunOptions::default()).unwrap();
    assert_eq!(answer, "X is a Y.");
}

#[test]
fn file_evidence_is_injected_into_the_prompt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("evidence.txt");
    std::fs::write(&path, "item sets are automaton states").unwrap();

    let mut bare = ScriptedEngine::new(["x."]);
    run(&mut bare, "define X", None, &RunOptions::default()).unwrap();
    let bare_prompt_tokens = bare.decoded_batches()[0].len();

    let mut grounded = ScriptedEngine::new(["x."]);
    let source = EvidenceSource::File(path);
    run(&mut grounded, "define X", Some(&source), &RunOptions::default()).unwrap();
    let grounded_prompt_tokens = grounded.decoded_batches()[0].len();

    assert!(grounded_prompt_tokens > bare_prompt_tokens);
}

#[test]
fn missing_evidence_file_degrades_to_the_ungrounded_prompt() {
    let mut bare = ScriptedEngine::new(["x."]);
    run(&mut bare, "define X", None, &RunOptions::default()).unwrap();
    let bare_prompt_tokens = bare.decoded_batches()[0].len();

    let mut degraded = ScriptedEngine::new(["x."]);
    let source = EvidenceSource::File(PathBuf::from("/nonexistent/evidence.txt"));
    run(&mut degraded, "define X", Some(&source), &RunOptions::default()).unwrap();

    assert_eq!(degraded.decoded_batches()[0].len(), bare_prompt_tokens);
}

#[test]
fn store_evidence_rows_reach_the_prompt() {
    let dir = TempDir::new().unwrap();
    let source = EvidenceSource::Store {
        db_path: seed_store(&dir),
        table: "chunks".to_string(),
        column: "content".to_string(),
        ids: "1, 2;3".parse().unwrap(),
    };

    let mut bare = ScriptedEngine::new(["x."]);
    run(&mut bare, "define item sets", None, &RunOptions::default()).unwrap();
    let bare_prompt_tokens = bare.decoded_batches()[0].len();

    let mut grounded = ScriptedEngine::new(["x."]);
    run(
        &mut grounded,
        "define item sets",
        Some(&source),
        &RunOptions::default(),
    )
    .unwrap();

    assert!(grounded.decoded_batches()[0].len() > bare_prompt_tokens);
}

#[test]
fn zero_row_store_query_degrades_to_the_ungrounded_prompt() {
    let dir = TempDir::new().unwrap();
    let source = EvidenceSource::Store {
        db_path: seed_store(&dir),
        table: "chunks".to_string(),
        column: "content".to_string(),
        ids: "901,902".parse().unwrap(),
    };

    let mut bare = ScriptedEngine::new(["x."]);
    run(&mut bare, "define X", None, &RunOptions::default()).unwrap();
    let bare_prompt_tokens = bare.decoded_batches()[0].len();

    let mut degraded = ScriptedEngine::new(["x."]);
    run(&mut degraded, "define X", Some(&source), &RunOptions::default()).unwrap();

    assert_eq!(degraded.decoded_batches()[0].len(), bare_prompt_tokens);
}

#[test]
fn cjk_answer_keeps_its_terminator() {
    let mut engine = ScriptedEngine::new(["LR(0)项目集", "是自动机的一个状态", "。继续废话"]);

    let answer = run(
        &mut engine,
        "用一句话解释 LR(0) 项目集",
        None,
        &opts_with_subject("LR(0)"),
    )
    .unwrap();

    assert_eq!(answer, "LR(0)项目集是自动机的一个状态。");
}

#[test]
fn mid_run_decode_failure_still_produces_a_normalized_answer() {
    // Decode call 0 is the prompt; call 1 feeds back the first token.
    let mut engine = ScriptedEngine::new(["Partial answer ", "never seen"]).fail_decode_at(1);

    let answer = run(&mut engine, "define X", None, &RunOptions::default()).unwrap();
    assert_eq!(answer, "Partial answer");
}

#[test]
fn empty_script_yields_an_empty_answer_without_error() {
    let mut engine = ScriptedEngine::new(Vec::<String>::new());
    let answer = run(&mut engine, "define X", None, &RunOptions::default()).unwrap();
    assert_eq!(answer, "");
}
