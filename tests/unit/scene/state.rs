use super::*;

const SCENE: &str = "\
surface_equation=x^2+y^2+z^2-a
surface_parameter_a=1
front_material_color=1 0.5 0
back_material_color=0 0.5 1
background_color=0 0 0
scale_factor=-0.5
rotation_matrix=1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1
camera_type=PERSPECTIVE_CAMERA
camera_fov_y=60
";

#[test]
fn empty_scene_is_not_valid() {
    let mut s = SceneState::new();
    assert!(!s.is_valid());
    s.set_formula("x^2+y^2+z^2-1");
    s.set_front_color(Some(Rgb::WHITE));
    assert!(!s.is_valid());
    s.set_back_color(Some(Rgb::BLACK));
    assert!(s.is_valid());
    assert_eq!(s.error_message(), "");
}

#[test]
fn setters_record_coalesced_invalidations() {
    let mut s = SceneState::new();
    s.set_parameter("a", 1.0).unwrap();
    s.set_parameter("a", 2.0).unwrap();
    s.set_background(Rgb::BLACK);
    // unchanged values are not changes
    s.set_parameter("b", 0.0).unwrap();
    s.set_parameter("b", 0.0).unwrap();
    assert_eq!(
        s.take_invalidations(),
        vec![
            Invalidation::Parameter("a".to_owned()),
            Invalidation::Background,
            Invalidation::Parameter("b".to_owned()),
        ]
    );
    assert!(!s.has_pending_invalidations());

    s.set_background(Rgb::BLACK);
    assert!(!s.has_pending_invalidations());
}

#[test]
fn unknown_parameters_are_rejected() {
    let mut s = SceneState::new();
    assert!(s.set_parameter("e", 1.0).is_err());
    assert!(s.set_parameter(SCALE_FACTOR, 1.0).is_ok());
    assert_eq!(s.scale_transform(), Mat4::uniform_scale(10.0));
}

#[test]
fn formula_error_invalidates_until_formula_changes() {
    let mut s = SceneState::new();
    s.set_formula("x+q");
    s.set_front_color(Some(Rgb::WHITE));
    s.set_back_color(Some(Rgb::WHITE));
    s.mark_invalid(&SurferError::formula("undefined parameter 'q'"));
    assert!(!s.is_valid());
    assert!(s.error_message().contains("undefined parameter"));

    s.take_invalidations();
    s.set_formula("x+a");
    assert!(s.is_valid());
    assert_eq!(s.error_message(), "");
    assert_eq!(s.take_invalidations(), vec![Invalidation::Formula]);
}

#[test]
fn pass_error_message_keeps_scene_valid() {
    let mut s = SceneState::new();
    s.load_config_str(SCENE).unwrap();
    s.set_error_message("pass execution error: boom");
    assert!(s.is_valid());
    assert_eq!(s.error_message(), "pass execution error: boom");
}

#[test]
fn load_records_a_single_invalidation() {
    let mut s = SceneState::new();
    s.load_config_str(SCENE).unwrap();
    assert!(s.is_valid());
    assert!(!s.is_repaint_suppressed());
    assert_eq!(s.take_invalidations(), vec![Invalidation::Loaded]);
    assert_eq!(s.parameter("a"), Some(1.0));
    assert_eq!(s.scale_factor(), -0.5);
    assert_eq!(s.camera().kind, CameraKind::Perspective);
    assert!((s.camera().eye().z - 2.0).abs() < 1e-12);
}

#[test]
fn failed_load_marks_invalid() {
    let mut s = SceneState::new();
    let err = s.load_config_str("surface_equation=x\n").unwrap_err();
    assert!(matches!(err, SurferError::ConfigLoad(_)));
    assert!(!s.is_valid());
    assert!(s.error_message().starts_with("config load error"));
    assert_eq!(s.take_invalidations(), vec![Invalidation::Loaded]);
}

#[test]
fn drag_records_rotation() {
    let mut s = SceneState::new();
    s.start_drag(0.0, 0.0);
    s.drag_to(0.0, 0.0);
    assert!(!s.has_pending_invalidations());
    s.drag_to(3.0, 4.0);
    s.end_drag();
    assert_eq!(s.take_invalidations(), vec![Invalidation::Rotation]);
    assert_ne!(s.rotation(), Mat4::IDENTITY);
}

#[test]
fn config_round_trip_through_state() {
    let mut s = SceneState::new();
    s.load_config_str(SCENE).unwrap();
    s.set_rotation(Mat4::rotation_x(0.25));
    s.set_parameter("c", -3.75).unwrap();

    let cfg = s.to_config().unwrap();
    let mut t = SceneState::new();
    t.load_config_str(&cfg.to_properties_string()).unwrap();

    assert_eq!(t.formula(), s.formula());
    assert_eq!(t.parameters(), s.parameters());
    assert_eq!(t.front_color(), s.front_color());
    assert_eq!(t.back_color(), s.back_color());
    assert_eq!(t.rotation(), s.rotation());
    assert_eq!(t.camera(), s.camera());
}

#[test]
fn bad_light_index_is_rejected() {
    let mut s = SceneState::new();
    assert!(s.set_light(MAX_LIGHTS, LightSource::default()).is_err());
    assert!(s.set_light(MAX_LIGHTS - 1, LightSource::default()).is_ok());
}
