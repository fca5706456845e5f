use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::expression::SurfaceProgram;
use crate::expression::vm::VmStack;
use crate::foundation::core::{PixelBuffer, Rgb};
use crate::foundation::error::{SurferError, SurferResult};
use crate::foundation::math::{Mat4, Vec3};
use crate::render::evaluator::{RenderJob, SurfaceEvaluator};
use crate::render::spec::{AntiAliasing, AntiAliasingMode, Sample};
use crate::scene::camera::{Camera, CameraKind};
use crate::scene::material::{LightSource, Material};
use crate::scene::state::SceneState;

/// Options for the reference CPU evaluator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuEvaluatorOpts {
    /// Split each pass into rows rendered on a dedicated rayon pool.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Samples along each clipped ray when looking for a sign change.
    pub ray_steps: u32,
    /// Bisection iterations refining a bracketed root.
    pub bisection_steps: u32,
    /// Channel difference above which adaptive supersampling refines a pixel.
    pub adaptive_threshold: f32,
}

impl Default for CpuEvaluatorOpts {
    fn default() -> Self {
        Self {
            parallel: false,
            threads: None,
            ray_steps: 96,
            bisection_steps: 40,
            adaptive_threshold: 0.1,
        }
    }
}

/// Ray-casting evaluator for implicit surfaces `f(x, y, z) = 0` inside the unit sphere.
pub struct CpuEvaluator {
    opts: CpuEvaluatorOpts,
    pool: Option<Arc<rayon::ThreadPool>>,
    program: Option<Arc<SurfaceProgram>>,
    snapshot: Option<Arc<SurfaceSnapshot>>,
    parameters: BTreeMap<String, f64>,
}

impl std::fmt::Debug for CpuEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuEvaluator")
            .field("opts", &self.opts)
            .field("formula", &self.current_formula())
            .finish_non_exhaustive()
    }
}

impl CpuEvaluator {
    /// Validate `opts` and build the row pool when `parallel` is set.
    pub fn new(opts: CpuEvaluatorOpts) -> SurferResult<Self> {
        if opts.ray_steps == 0 {
            return Err(SurferError::validation("cpu evaluator 'ray_steps' must be >= 1"));
        }
        if opts.adaptive_threshold.is_nan() || opts.adaptive_threshold < 0.0 {
            return Err(SurferError::validation(
                "cpu evaluator 'adaptive_threshold' must be >= 0",
            ));
        }
        let pool = if opts.parallel {
            Some(Arc::new(build_thread_pool(opts.threads)?))
        } else {
            None
        };
        Ok(Self {
            opts,
            pool,
            program: None,
            snapshot: None,
            parameters: BTreeMap::new(),
        })
    }

    /// Options this evaluator was built with.
    pub fn opts(&self) -> &CpuEvaluatorOpts {
        &self.opts
    }
}

fn build_thread_pool(threads: Option<usize>) -> SurferResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(SurferError::validation(
            "cpu evaluator 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| SurferError::validation(format!("failed to build rayon thread pool: {e}")))
}

impl SurfaceEvaluator for CpuEvaluator {
    fn configure(&mut self, scene: &SceneState) -> SurferResult<()> {
        let formula = scene
            .formula()
            .ok_or_else(|| SurferError::formula("no surface equation set"))?;
        let cached = self
            .program
            .as_ref()
            .filter(|p| p.source() == formula)
            .cloned();
        let program = match cached {
            Some(p) => p,
            None => {
                let p = Arc::new(SurfaceProgram::compile(formula)?);
                self.program = Some(p.clone());
                p
            }
        };
        let params = program.bind_parameters(scene.parameters())?;

        let front_color = scene
            .front_color()
            .ok_or_else(|| SurferError::validation("front color is not set"))?;
        let back_color = scene
            .back_color()
            .ok_or_else(|| SurferError::validation("back color is not set"))?;
        let world_from_surface_rotation = scene
            .rotation()
            .inverse_affine()
            .ok_or_else(|| SurferError::validation("rotation matrix is singular"))?;
        let surface_from_world = scene.scale_transform().mul(&world_from_surface_rotation);

        self.snapshot = Some(Arc::new(SurfaceSnapshot {
            program,
            params,
            camera: *scene.camera(),
            surface_from_world,
            normal_to_world: surface_from_world.transpose(),
            front: Side {
                color: front_color,
                material: *scene.front_material(),
            },
            back: Side {
                color: back_color,
                material: *scene.back_material(),
            },
            lights: scene.lights().iter().filter(|l| l.is_on()).copied().collect(),
            background: scene.background(),
        }));
        self.parameters = scene.parameters().clone();
        Ok(())
    }

    fn snapshot(
        &mut self,
        aa: AntiAliasing,
        buffer: PixelBuffer,
    ) -> SurferResult<Box<dyn RenderJob>> {
        let snap = self
            .snapshot
            .clone()
            .ok_or_else(|| SurferError::validation("cpu evaluator is not configured"))?;
        Ok(Box::new(CpuRenderJob {
            snap,
            aa,
            buffer,
            pool: self.pool.clone(),
            ray_steps: self.opts.ray_steps,
            bisection_steps: self.opts.bisection_steps,
            adaptive_threshold: self.opts.adaptive_threshold,
        }))
    }

    fn current_formula(&self) -> Option<&str> {
        self.snapshot.as_ref().map(|s| s.program.source())
    }

    fn current_parameters(&self) -> BTreeMap<String, f64> {
        self.parameters.clone()
    }
}

#[derive(Clone, Copy, Debug)]
struct Side {
    color: Rgb,
    material: Material,
}

/// Immutable copy of everything a pass reads, shared between jobs of one configuration.
#[derive(Debug)]
struct SurfaceSnapshot {
    program: Arc<SurfaceProgram>,
    params: Vec<f64>,
    camera: Camera,
    surface_from_world: Mat4,
    normal_to_world: Mat4,
    front: Side,
    back: Side,
    lights: Vec<LightSource>,
    background: Rgb,
}

struct CpuRenderJob {
    snap: Arc<SurfaceSnapshot>,
    aa: AntiAliasing,
    buffer: PixelBuffer,
    pool: Option<Arc<rayon::ThreadPool>>,
    ray_steps: u32,
    bisection_steps: u32,
    adaptive_threshold: f32,
}

impl RenderJob for CpuRenderJob {
    #[tracing::instrument(
        level = "debug",
        skip(self),
        fields(w = self.buffer.width, h = self.buffer.height, mode = ?self.aa.mode)
    )]
    fn execute(&mut self) -> SurferResult<f64> {
        let start = Instant::now();
        let (w, h) = (self.buffer.width, self.buffer.height);
        if w == 0 || h == 0 {
            return Ok(0.0);
        }
        let tracer = Tracer {
            snap: &self.snap,
            width: f64::from(w),
            height: f64::from(h),
            ray_steps: self.ray_steps,
            bisection_steps: self.bisection_steps,
        };
        let pattern = self.aa.pattern.samples();
        let center = [Sample {
            dx: 0.0,
            dy: 0.0,
            weight: 1.0,
        }];
        let width = w as usize;
        let pool = self.pool.as_deref();

        let mut colors = vec![tracer.snap.background; width * h as usize];
        let first: &[Sample] = match self.aa.mode {
            AntiAliasingMode::Supersampling => &pattern,
            AntiAliasingMode::None | AntiAliasingMode::AdaptiveSupersampling => &center,
        };
        for_each_row(pool, &mut colors, width, |y, row, stack| {
            for (x, c) in row.iter_mut().enumerate() {
                *c = tracer.pixel(x as u32, y, first, stack);
            }
        });

        if self.aa.mode == AntiAliasingMode::AdaptiveSupersampling {
            let centers = colors.clone();
            let threshold = self.adaptive_threshold;
            let height = h as usize;
            for_each_row(pool, &mut colors, width, |y, row, stack| {
                let yi = y as usize;
                for (x, c) in row.iter_mut().enumerate() {
                    let here = centers[yi * width + x];
                    let differs = |nx: usize, ny: usize| {
                        here.max_channel_delta(centers[ny * width + nx]) > threshold
                    };
                    let edge = (x > 0 && differs(x - 1, yi))
                        || (x + 1 < width && differs(x + 1, yi))
                        || (yi > 0 && differs(x, yi - 1))
                        || (yi + 1 < height && differs(x, yi + 1));
                    if edge {
                        *c = tracer.pixel(x as u32, y, &pattern, stack);
                    }
                }
            });
        }

        for (dst, c) in self.buffer.data.iter_mut().zip(&colors) {
            *dst = c.to_argb();
        }
        Ok(start.elapsed().as_secs_f64())
    }

    fn into_pixels(self: Box<Self>) -> PixelBuffer {
        self.buffer
    }
}

fn for_each_row<F>(pool: Option<&rayon::ThreadPool>, out: &mut [Rgb], width: usize, f: F)
where
    F: Fn(u32, &mut [Rgb], &mut VmStack) + Send + Sync,
{
    match pool {
        Some(pool) => pool.install(|| {
            out.par_chunks_mut(width)
                .enumerate()
                .for_each_init(VmStack::new, |stack, (y, row)| f(y as u32, row, stack));
        }),
        None => {
            let mut stack = VmStack::new();
            for (y, row) in out.chunks_mut(width).enumerate() {
                f(y as u32, row, &mut stack);
            }
        }
    }
}

struct Tracer<'a> {
    snap: &'a SurfaceSnapshot,
    width: f64,
    height: f64,
    ray_steps: u32,
    bisection_steps: u32,
}

impl Tracer<'_> {
    fn pixel(&self, px: u32, py: u32, samples: &[Sample], stack: &mut VmStack) -> Rgb {
        let mut acc = Rgb::BLACK;
        for s in samples {
            let x = f64::from(px) + 0.5 + s.dx;
            let y = f64::from(py) + 0.5 + s.dy;
            acc = acc.add(self.sample(x, y, stack).scale(s.weight as f32));
        }
        acc
    }

    /// Shade the ray through continuous pixel coordinate `(x, y)` (origin top-left).
    fn sample(&self, x: f64, y: f64, stack: &mut VmStack) -> Rgb {
        let snap = self.snap;
        let aspect = self.width / self.height;
        let u = (2.0 * x / self.width - 1.0) * aspect.max(1.0);
        let v = (1.0 - 2.0 * y / self.height) * (1.0 / aspect).max(1.0);

        let cam = &snap.camera;
        let (origin, dir) = match cam.kind {
            CameraKind::Orthographic => (Vec3::new(u, v, 0.0), Vec3::new(0.0, 0.0, -1.0)),
            CameraKind::Perspective => {
                let t = (cam.fov_y.to_radians() * 0.5).tan();
                (Vec3::ZERO, Vec3::new(u * t, v * t, -1.0))
            }
        };
        let o = cam.transform.transform_point(origin);
        let d = cam.transform.transform_vector(dir).normalize();

        let Some((t0, t1)) = clip_unit_sphere(o, d) else {
            return snap.background;
        };
        let os = snap.surface_from_world.transform_point(o);
        let ds = snap.surface_from_world.transform_vector(d);
        let mut f = |t: f64| {
            snap.program
                .eval_with_stack(os + ds * t, &snap.params, stack)
        };
        let Some(t) = self.find_root(&mut f, t0, t1) else {
            return snap.background;
        };
        let normal = self.normal(os + ds * t, stack).unwrap_or(-d);
        shade(snap, o + d * t, normal, -d)
    }

    fn find_root(&self, f: &mut impl FnMut(f64) -> f64, t0: f64, t1: f64) -> Option<f64> {
        let n = self.ray_steps.max(1);
        let dt = (t1 - t0) / f64::from(n);
        let mut ta = t0;
        let mut fa = f(ta);
        for i in 1..=n {
            if fa == 0.0 {
                return Some(ta);
            }
            let tb = t0 + dt * f64::from(i);
            let fb = f(tb);
            if fa.is_finite() && fb.is_finite() && (fa < 0.0) != (fb < 0.0) {
                return Some(self.bisect(f, ta, fa, tb));
            }
            ta = tb;
            fa = fb;
        }
        (fa == 0.0).then_some(ta)
    }

    fn bisect(&self, f: &mut impl FnMut(f64) -> f64, mut ta: f64, mut fa: f64, mut tb: f64) -> f64 {
        for _ in 0..self.bisection_steps {
            let tm = 0.5 * (ta + tb);
            let fm = f(tm);
            if fm == 0.0 {
                return tm;
            }
            if (fm < 0.0) == (fa < 0.0) {
                ta = tm;
                fa = fm;
            } else {
                tb = tm;
            }
        }
        0.5 * (ta + tb)
    }

    /// World-space unit normal from the surface-space gradient, `None` at singular points.
    fn normal(&self, ps: Vec3, stack: &mut VmStack) -> Option<Vec3> {
        const H: f64 = 1e-6;
        let snap = self.snap;
        let mut f = |p: Vec3| snap.program.eval_with_stack(p, &snap.params, stack);
        let gx = f(ps + Vec3::new(H, 0.0, 0.0)) - f(ps - Vec3::new(H, 0.0, 0.0));
        let gy = f(ps + Vec3::new(0.0, H, 0.0)) - f(ps - Vec3::new(0.0, H, 0.0));
        let gz = f(ps + Vec3::new(0.0, 0.0, H)) - f(ps - Vec3::new(0.0, 0.0, H));
        let n = snap.normal_to_world.transform_vector(Vec3::new(gx, gy, gz));
        let len = n.length();
        (len > 0.0 && len.is_finite()).then(|| n * (1.0 / len))
    }
}

/// Parameter interval `[t0, t1]` (with `t0 >= 0`) where `o + t d` lies inside the unit sphere.
fn clip_unit_sphere(o: Vec3, d: Vec3) -> Option<(f64, f64)> {
    let b = o.dot(d);
    let c = o.dot(o) - 1.0;
    let disc = b * b - c;
    if disc.is_nan() || disc <= 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let t0 = (-b - root).max(0.0);
    let t1 = -b + root;
    (t1 > t0).then_some((t0, t1))
}

fn shade(snap: &SurfaceSnapshot, p: Vec3, normal: Vec3, view: Vec3) -> Rgb {
    let (side, n) = if normal.dot(view) >= 0.0 {
        (snap.front, normal)
    } else {
        (snap.back, -normal)
    };
    let m = side.material;
    let mut c = side.color.scale(m.ambient_intensity);
    for light in &snap.lights {
        let l = (light.position - p).normalize();
        let ndl = n.dot(l);
        if ndl <= 0.0 {
            continue;
        }
        let lc = light.color.scale(light.intensity);
        c = c.add(side.color.modulate(lc).scale(ndl as f32 * m.diffuse_intensity));
        let r = n * (2.0 * ndl) - l;
        let rv = r.dot(view);
        if rv > 0.0 {
            let highlight = rv.powf(f64::from(m.shininess)) as f32;
            c = c.add(lc.scale(highlight * m.specular_intensity));
        }
    }
    c
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
