//! Result parser behavior on the two justification shapes.

use querypack_core::ResultParser;

#[test]
fn structured_justification() {
    let bytes = br#"{"scores":[{"outcome":"Yes","score":700000},{"outcome":"No","score":300000}],"justification":"because","timestamp":"2024-01-01T00:00:00Z"}"#;

    let result = ResultParser::new().parse(bytes);

    assert_eq!(result.outcome_scores, vec![700000.0, 300000.0]);
    assert_eq!(result.outcome_labels, vec!["Yes", "No"]);
    assert_eq!(result.justification_text, "because");
    assert_eq!(result.timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
    assert_eq!(
        result.timestamp_utc().map(|t| t.timestamp()),
        Some(1_704_067_200)
    );
}

#[test]
fn plain_text_justification() {
    let result = ResultParser::new().parse(b"plain text result");

    assert_eq!(result.justification_text, "plain text result");
    assert!(result.outcome_scores.is_empty());
    assert!(result.outcome_labels.is_empty());
    assert!(result.timestamp.is_none());
}

#[test]
fn object_without_scores_keeps_text_and_no_timestamp() {
    let result = ResultParser::new().parse(br#"{"justification":"the panel agreed"}"#);

    assert_eq!(result.justification_text, "the panel agreed");
    assert!(result.outcome_scores.is_empty());
    assert!(result.timestamp.is_none());
}

#[test]
fn result_serializes_with_camel_case_keys() {
    let result = ResultParser::new().parse(br#"{"scores":[{"outcome":"A","score":1}],"justification":"j"}"#);
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["outcomeLabels"][0], "A");
    assert_eq!(json["justificationText"], "j");
    assert!(json.get("timestamp").is_none());
}
