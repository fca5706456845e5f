use super::*;
use crate::foundation::core::Rgb;
use crate::render::cpu::{CpuEvaluator, CpuEvaluatorOpts};
use crate::session::display::MemoryDisplay;
use crate::session::scheduler::SchedulerState;

const SPHERE: &str = "\
surface_equation=x^2+y^2+z^2-a
surface_parameter_a=0.5
front_material_color=1.0 0.8 0.2
back_material_color=0.2 0.4 1.0
background_color=1 1 1
scale_factor=0.0
rotation_matrix=1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1
gallery_title=Sphere
";

fn view(size: u32) -> SurfaceView<MemoryDisplay> {
    let ev = CpuEvaluator::new(CpuEvaluatorOpts {
        ray_steps: 24,
        ..CpuEvaluatorOpts::default()
    })
    .unwrap();
    SurfaceView::new(
        Box::new(ev),
        MemoryDisplay::new(size, size),
        SchedulerOpts::default(),
    )
    .unwrap()
}

#[test]
fn setters_coalesce_into_one_chain() {
    let mut v = view(12);
    let s = v.scene_mut();
    s.set_formula("x^2+y^2+z^2-0.3");
    s.set_front_color(Some(Rgb::new(1.0, 0.0, 0.0)));
    s.set_back_color(Some(Rgb::new(0.0, 0.0, 1.0)));
    s.set_parameter("a", 1.0).unwrap();
    s.set_parameter("a", 2.0).unwrap();

    assert!(v.process().unwrap());
    assert!(!v.process().unwrap());
    v.run_until_idle().unwrap();

    assert_eq!(v.scheduler().generation(), 1);
    assert_eq!(v.scheduler().state(), SchedulerState::Idle);
    let frame = v.display().frame().unwrap();
    assert_eq!(frame.width, 12);
    // sphere of radius ~0.55 covers the center
    assert_ne!(frame.get(6, 6), Some(Rgb::WHITE.to_argb()));
}

#[test]
fn load_triggers_a_single_chain() {
    let mut v = view(10);
    v.load_from_str(SPHERE).unwrap();
    assert_eq!(v.scheduler().generation(), 1);
    assert!(!v.scene().has_pending_invalidations());
    v.run_until_idle().unwrap();
    assert!(v.is_valid());
    assert_eq!(v.scheduler().evaluator().current_formula(), Some("x^2+y^2+z^2-a"));

    let saved = v.save_to_string().unwrap();
    assert!(saved.contains("gallery_title=Sphere"));
    assert!(saved.contains("surface_parameter_a=0.5"));
}

#[test]
fn failed_load_invalidates_and_does_not_render() {
    let mut v = view(10);
    let err = v.load_from_str("surface_equation=x\n").unwrap_err();
    assert!(matches!(err, SurferError::ConfigLoad(_)));
    assert!(!v.is_valid());
    assert!(v.error_message().contains("front_material_color"));
    v.run_until_idle().unwrap();
    assert_eq!(v.scheduler().generation(), 0);
    assert_eq!(v.display().blit_count(), 0);
}

#[test]
fn missing_file_is_a_load_error() {
    let mut v = view(10);
    let err = v
        .load_from_path("/definitely/not/here.jsurf")
        .unwrap_err();
    assert!(matches!(err, SurferError::ConfigLoad(_)));
    assert!(!v.is_valid());
}

#[test]
fn attaching_after_load_starts_a_chain() {
    let ev = CpuEvaluator::new(CpuEvaluatorOpts {
        ray_steps: 24,
        ..CpuEvaluatorOpts::default()
    })
    .unwrap();
    let mut v =
        SurfaceView::new(Box::new(ev), MemoryDisplay::detached(), SchedulerOpts::default())
            .unwrap();
    v.load_from_str(SPHERE).unwrap();
    assert_eq!(v.scheduler().generation(), 0);
    assert!(!v.scene().has_pending_invalidations());

    v.display_mut()
        .set_layout_bounds(Some(crate::foundation::core::Rect::new(0.0, 0.0, 8.0, 8.0)));
    v.run_until_idle().unwrap();
    assert_eq!(v.scheduler().generation(), 1);
    assert_eq!(v.display().frame().unwrap().width, 8);
}

#[test]
fn resizing_the_display_rerenders_at_the_new_size() {
    let mut v = view(8);
    v.load_from_str(SPHERE).unwrap();
    v.run_until_idle().unwrap();
    assert_eq!(v.display().frame().unwrap().width, 8);

    v.display_mut()
        .set_layout_bounds(Some(crate::foundation::core::Rect::new(0.0, 0.0, 16.0, 16.0)));
    v.run_until_idle().unwrap();
    assert_eq!(v.scheduler().generation(), 2);
    assert_eq!(v.display().frame().unwrap().width, 16);

    // same size again is not a change
    v.display_mut()
        .set_layout_bounds(Some(crate::foundation::core::Rect::new(4.0, 4.0, 20.0, 20.0)));
    assert!(!v.process().unwrap());
}

#[test]
fn shutdown_cancel_then_process_fails() {
    let mut v = view(10);
    v.shutdown(ShutdownMode::Cancel).unwrap();
    v.scene_mut().set_formula("x");
    v.scene_mut().set_front_color(Some(Rgb::WHITE));
    v.scene_mut().set_back_color(Some(Rgb::WHITE));
    assert!(v.process().is_err());
    // invalidations are consumed even when the trigger fails
    assert!(!v.scene().has_pending_invalidations());
}
