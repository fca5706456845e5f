use super::*;

const MINIMAL: &str = "\
surface_equation=x^2+y^2+z^2-a
surface_parameter_a=0.5
front_material_color=1.0 0.8 0.2
back_material_color=0.2 0.4 1.0
background_color=1 1 1
scale_factor=0.0
rotation_matrix=1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1
";

#[test]
fn properties_syntax_variants() {
    let text = "\
# comment
! also a comment
   
a=1
b : 2
c 3
d\\ e=4
long=first \\
    second
uni=\\u00e9\\t\\=
";
    let pairs = parse_properties(text).unwrap();
    let expect = [
        ("a", "1"),
        ("b", "2"),
        ("c", "3"),
        ("d e", "4"),
        ("long", "first second"),
        ("uni", "\u{e9}\t="),
    ];
    assert_eq!(pairs.len(), expect.len());
    for ((k, v), (ek, ev)) in pairs.iter().zip(expect) {
        assert_eq!(k, ek);
        assert_eq!(v, ev);
    }
}

#[test]
fn even_backslashes_do_not_continue() {
    let pairs = parse_properties("path=c:\\\\\nnext=1\n").unwrap();
    assert_eq!(pairs[0], ("path".to_owned(), "c:\\".to_owned()));
    assert_eq!(pairs[1], ("next".to_owned(), "1".to_owned()));
}

#[test]
fn surrogate_pairs_and_bad_escapes() {
    let pairs = parse_properties("k=\\uD83D\\uDE00\n").unwrap();
    assert_eq!(pairs[0].1, "\u{1F600}");
    assert!(parse_properties("k=\\u12\n").is_err());
    assert!(parse_properties("k=\\uD83D\n").is_err());
}

#[test]
fn minimal_scene_gets_defaults() {
    let cfg = SceneConfig::from_properties_str(MINIMAL).unwrap();
    assert_eq!(cfg.surface_equation, "x^2+y^2+z^2-a");
    assert_eq!(cfg.parameters.get("a"), Some(&0.5));
    assert_eq!(cfg.camera_kind, CameraKind::Orthographic);
    assert_eq!(cfg.front_color, Rgb::new(1.0, 0.8, 0.2));
    assert_eq!(cfg.background_color, Rgb::WHITE);
    assert_eq!(cfg.rotation_matrix, Mat4::IDENTITY);
    assert_eq!(cfg.lights, default_lights());
    assert!(cfg.extra.is_empty());
}

#[test]
fn missing_required_key_is_a_load_error() {
    let text = MINIMAL.replace("scale_factor=0.0\n", "");
    let err = SceneConfig::from_properties_str(&text).unwrap_err();
    assert!(matches!(err, SurferError::ConfigLoad(ref m) if m.contains("scale_factor")));
}

#[test]
fn malformed_values_are_load_errors() {
    let short_rotation = MINIMAL.replace("0 0 0 1\n", "0 0 0\n");
    assert!(matches!(
        SceneConfig::from_properties_str(&short_rotation),
        Err(SurferError::ConfigLoad(_))
    ));
    let bad_color = MINIMAL.replace("background_color=1 1 1", "background_color=1,1,1");
    assert!(matches!(
        SceneConfig::from_properties_str(&bad_color),
        Err(SurferError::ConfigLoad(_))
    ));
    let bad_param = format!("{MINIMAL}surface_parameter_q=1\n");
    assert!(matches!(
        SceneConfig::from_properties_str(&bad_param),
        Err(SurferError::ConfigLoad(_))
    ));
}

#[test]
fn unknown_camera_type_is_reported_as_such() {
    let text = format!("{MINIMAL}camera_type=FISHEYE_CAMERA\n");
    assert!(matches!(
        SceneConfig::from_properties_str(&text),
        Err(SurferError::UnknownCameraType(_))
    ));
}

#[test]
fn save_then_load_reproduces_every_field() {
    let text = format!(
        "{MINIMAL}camera_type=PERSPECTIVE_CAMERA\ncamera_fov_y=45.5\n\
         front_material_shininess=12.25\nlight_status_4=ON\nlight_position_4=1 -2 3.5\n\
         light_color_4=0.1 0.2 0.3\nlight_intensity_4=0.75\ncustom\\ key=keep me\n"
    );
    let mut cfg = SceneConfig::from_properties_str(&text).unwrap();
    cfg.rotation_matrix = Mat4::rotation_x(0.3).mul(&Mat4::rotation_y(-1.1));
    cfg.parameters.insert("d".to_owned(), 1.0 / 3.0);
    cfg.surface_equation = "  x = y:z # not a comment".to_owned();

    let saved = cfg.to_properties_string();
    let back = SceneConfig::from_properties_str(&saved).unwrap();
    assert_eq!(back, cfg);
    assert_eq!(back.extra.get("custom key").map(String::as_str), Some("keep me"));
    assert_eq!(back.lights[4].position, Vec3::new(1.0, -2.0, 3.5));
    assert_eq!(back.lights[0].status, LightStatus::Off);
}
