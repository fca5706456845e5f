use super::*;

#[test]
fn orthographic_distance_is_one() {
    assert_eq!(optimal_distance(CameraKind::Orthographic, 60.0).unwrap(), 1.0);
    // fov is irrelevant for orthographic cameras
    assert_eq!(optimal_distance(CameraKind::Orthographic, 0.0).unwrap(), 1.0);
}

#[test]
fn perspective_distance_fits_unit_sphere() {
    let d = optimal_distance(CameraKind::Perspective, 60.0).unwrap();
    assert!((d - 2.0).abs() < 1e-12, "sin(30deg) = 0.5, got {d}");

    let d = optimal_distance(CameraKind::Perspective, 90.0).unwrap();
    assert!((d - std::f64::consts::SQRT_2).abs() < 1e-12);
}

#[test]
fn perspective_rejects_degenerate_fov() {
    assert!(optimal_distance(CameraKind::Perspective, 0.0).is_err());
    assert!(optimal_distance(CameraKind::Perspective, 180.0).is_err());
    assert!(optimal_distance(CameraKind::Perspective, f64::NAN).is_err());
}

#[test]
fn camera_sits_on_positive_z_axis() {
    let cam = Camera::new(CameraKind::Perspective, 60.0).unwrap();
    let eye = cam.eye();
    assert!(eye.x.abs() < 1e-12 && eye.y.abs() < 1e-12);
    assert!((eye.z - 2.0).abs() < 1e-12);
}

#[test]
fn parses_config_spellings() {
    assert_eq!(
        CameraKind::from_config_str("PERSPECTIVE_CAMERA").unwrap(),
        CameraKind::Perspective
    );
    assert_eq!(
        CameraKind::from_config_str(" orthographic ").unwrap(),
        CameraKind::Orthographic
    );
    let err = CameraKind::from_config_str("FISHEYE_CAMERA").unwrap_err();
    assert!(matches!(err, SurferError::UnknownCameraType(ref s) if s == "FISHEYE_CAMERA"));
}
