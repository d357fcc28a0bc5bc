//! Manifest validator rules.

use querypack_core::{
    JuryNode, JuryParameters, Manifest, ManifestError, ManifestValidator, PrimaryRef,
};

fn manifest_with_primary(primary: PrimaryRef) -> Manifest {
    Manifest {
        version: Some("1.0".into()),
        primary: Some(primary),
        ..Manifest::default()
    }
}

fn manifest_with_weights(weights: &[f64]) -> Manifest {
    let nodes = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| JuryNode::new("OpenAI", format!("model-{i}"), 1, w))
        .collect();
    Manifest {
        jury_parameters: Some(JuryParameters::new(2, nodes, 1)),
        ..manifest_with_primary(PrimaryRef::file("primary_query.json"))
    }
}

#[test]
fn rejects_primary_with_both_filename_and_hash() {
    let m = manifest_with_primary(PrimaryRef {
        filename: Some("primary_query.json".into()),
        hash: Some("QmPrimary".into()),
    });
    assert_eq!(
        ManifestValidator::default().validate(&m),
        Err(ManifestError::AmbiguousPrimary)
    );
}

#[test]
fn rejects_primary_with_neither_filename_nor_hash() {
    let m = manifest_with_primary(PrimaryRef::default());
    assert_eq!(
        ManifestValidator::default().validate(&m),
        Err(ManifestError::UnresolvedPrimary)
    );
}

#[test]
fn accepts_hash_only_primary() {
    let m = manifest_with_primary(PrimaryRef::hash("QmPrimary"));
    assert!(ManifestValidator::default().validate(&m).is_ok());
}

#[test]
fn missing_primary_is_a_missing_field() {
    let m = Manifest {
        version: Some("1.0".into()),
        ..Manifest::default()
    };
    assert_eq!(
        ManifestValidator::default().validate(&m),
        Err(ManifestError::MissingField { field: "primary" })
    );
}

#[test]
fn weight_sum_just_below_tolerance_is_rejected() {
    let err = ManifestValidator::default()
        .validate(&manifest_with_weights(&[0.5, 0.497]))
        .unwrap_err();
    assert!(matches!(err, ManifestError::WeightSum { .. }), "got {err:?}");
}

#[test]
fn weight_sum_just_above_tolerance_is_rejected() {
    let err = ManifestValidator::default()
        .validate(&manifest_with_weights(&[0.5, 0.503]))
        .unwrap_err();
    assert!(matches!(err, ManifestError::WeightSum { .. }), "got {err:?}");
}

#[test]
fn weight_sum_within_tolerance_is_accepted() {
    assert!(ManifestValidator::default()
        .validate(&manifest_with_weights(&[0.5, 0.50005]))
        .is_ok());
    assert!(ManifestValidator::default()
        .validate(&manifest_with_weights(&[0.2, 0.3, 0.5]))
        .is_ok());
}

#[test]
fn weight_out_of_range_is_rejected() {
    let err = ManifestValidator::default()
        .validate(&manifest_with_weights(&[1.5, -0.5]))
        .unwrap_err();
    assert!(matches!(err, ManifestError::InvalidNode { index: 0, .. }), "got {err:?}");
}

#[test]
fn incomplete_jury_parameters_name_the_field() {
    let m = Manifest {
        jury_parameters: Some(JuryParameters {
            number_of_outcomes: None,
            ai_nodes: Some(vec![JuryNode::default()]),
            iterations: Some(1),
        }),
        ..manifest_with_primary(PrimaryRef::file("primary_query.json"))
    };
    let err = ManifestValidator::default().validate(&m).unwrap_err();
    assert_eq!(
        err,
        ManifestError::IncompleteJuryParameters {
            field: "NUMBER_OF_OUTCOMES"
        }
    );
    assert!(err.to_string().contains("NUMBER_OF_OUTCOMES"));
}

#[test]
fn primary_checked_before_jury() {
    let m = Manifest {
        jury_parameters: Some(JuryParameters::default()),
        ..manifest_with_primary(PrimaryRef::default())
    };
    assert_eq!(
        ManifestValidator::default().validate(&m),
        Err(ManifestError::UnresolvedPrimary)
    );
}

#[test]
fn parsed_manifest_json_validates() {
    let json = br#"{
        "version": "1.0",
        "primary": {"hash": "QmPrimary"},
        "juryParameters": {
            "NUMBER_OF_OUTCOMES": 2,
            "AI_NODES": [{"AI_PROVIDER": "OpenAI", "AI_MODEL": "gpt-4o", "NO_COUNTS": 1, "WEIGHT": 1.0}],
            "ITERATIONS": 1
        }
    }"#;
    let m = Manifest::from_json(json).unwrap();
    assert!(ManifestValidator::default().validate(&m).is_ok());
}
