use super::*;

#[test]
fn empty_object_is_all_defaults() {
    assert_eq!(SurferOpts::from_json_str("{}").unwrap(), SurferOpts::default());
}

#[test]
fn nested_fields_override_defaults() {
    let opts = SurferOpts::from_json_str(
        r#"{"scheduler": {"target_fps": 10}, "evaluator": {"parallel": true, "threads": 3}}"#,
    )
    .unwrap();
    assert_eq!(opts.scheduler.target_fps, 10.0);
    assert_eq!(opts.scheduler.min_render_size, 100);
    assert!(opts.evaluator.parallel);
    assert_eq!(opts.evaluator.threads, Some(3));
}

#[test]
fn invalid_json_and_values_are_rejected() {
    assert!(SurferOpts::from_json_str("{").is_err());
    assert!(SurferOpts::from_json_str(r#"{"scheduler": {"target_fps": -1}}"#).is_err());
}

#[test]
fn options_survive_json() {
    let mut opts = SurferOpts::default();
    opts.evaluator.ray_steps = 7;
    let text = serde_json::to_string(&opts).unwrap();
    assert_eq!(SurferOpts::from_json_str(&text).unwrap(), opts);
}
