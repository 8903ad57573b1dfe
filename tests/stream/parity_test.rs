//! Blocking and cooperative streams must agree on every outcome.

use json_lineage::{AsyncLineStream, Error, LineRecord, SyncLineStream};

use super::FakeConverter;

/// Comparable summary of one stream item.
#[derive(Debug, PartialEq)]
enum Outcome {
    Line(String),
    Failed { exit_code: i32, message: String },
    Io,
    Launch,
}

fn outcome(item: Result<LineRecord, Error>) -> Outcome {
    match item {
        Ok(line) => Outcome::Line(line.into_string()),
        Err(Error::Execution(failure)) => Outcome::Failed {
            exit_code: failure.exit_code(),
            message: failure.message(),
        },
        Err(Error::Io(_)) => Outcome::Io,
        Err(Error::Launch(_)) => Outcome::Launch,
    }
}

async fn assert_parity(body: &str) -> Vec<Outcome> {
    let converter = FakeConverter::new(body);

    let blocking: Vec<Outcome> = SyncLineStream::new(converter.command())
        .map(outcome)
        .collect();

    let mut stream = AsyncLineStream::new(converter.command());
    let mut cooperative = Vec::new();
    while let Some(item) = stream.next_line().await {
        cooperative.push(outcome(item));
    }

    assert_eq!(blocking, cooperative, "streams disagree for script {body:?}");
    blocking
}

#[tokio::test]
async fn parity_on_success() {
    let outcomes = assert_parity("printf '%s\\n' '{\"a\": {\"B\": 1},\"b\": 2}' '{\"a\": 1,\"b\": 2}'\n").await;
    assert_eq!(
        outcomes,
        vec![
            Outcome::Line(r#"{"a": {"B": 1},"b": 2}"#.to_string()),
            Outcome::Line(r#"{"a": 1,"b": 2}"#.to_string()),
        ]
    );
}

#[tokio::test]
async fn parity_on_empty_output() {
    assert!(assert_parity("exit 0\n").await.is_empty());
}

#[tokio::test]
async fn parity_on_failure_with_stderr() {
    let outcomes = assert_parity("echo '[1]'\necho '[2]'\necho 'trailing garbage' >&2\nexit 2\n").await;
    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes[2],
        Outcome::Failed {
            exit_code: 2,
            message: "trailing garbage\n".to_string(),
        }
    );
}

#[tokio::test]
async fn parity_on_failure_without_stderr() {
    let outcomes = assert_parity("exit 12\n").await;
    assert_eq!(
        outcomes,
        vec![Outcome::Failed {
            exit_code: 12,
            message: "Process exited with code 12".to_string(),
        }]
    );
}

#[tokio::test]
async fn parity_on_blank_and_padded_lines() {
    let outcomes = assert_parity("printf '\\n  [1]\\n\\n[2]  \\n'\n").await;
    assert_eq!(
        outcomes,
        vec![Outcome::Line("[1]".to_string()), Outcome::Line("[2]".to_string())]
    );
}

#[tokio::test]
async fn parity_on_invalid_utf8() {
    let outcomes = assert_parity("echo '[0]'\nprintf '\\377\\n'\n").await;
    assert_eq!(outcomes, vec![Outcome::Line("[0]".to_string()), Outcome::Io]);
}
