//! Key/value scene description files.
//!
//! The on-disk format is Java-properties compatible so existing scene files load unchanged:
//! `key=value`, `key:value` or `key value` pairs, `#`/`!` comment lines, backslash line
//! continuation and `\t \n \r \f \uXXXX` escapes. Numbers always use `.` as decimal point.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::expression::FORMULA_PARAMETERS;
use crate::foundation::core::Rgb;
use crate::foundation::error::{SurferError, SurferResult};
use crate::foundation::math::{Mat4, Vec3};
use crate::scene::camera::CameraKind;
use crate::scene::material::{LightSource, LightStatus, MAX_LIGHTS, Material, default_lights};

const PARAMETER_PREFIX: &str = "surface_parameter_";
const LIGHT_FIELDS: [&str; 4] = ["status", "position", "color", "intensity"];
const MATERIAL_FIELDS: [&str; 5] = [
    "color",
    "ambient_intensity",
    "diffuse_intensity",
    "specular_intensity",
    "shininess",
];

/// Everything a scene file describes, fully parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    /// Surface equation text (`surface_equation`).
    pub surface_equation: String,
    /// Formula parameter values by name (`surface_parameter_<name>`).
    pub parameters: BTreeMap<String, f64>,
    /// Projection (`camera_type`).
    pub camera_kind: CameraKind,
    /// Vertical field of view in degrees (`camera_fov_y`).
    pub camera_fov_y: f64,
    /// `front_material_color`.
    pub front_color: Rgb,
    /// `back_material_color`.
    pub back_color: Rgb,
    /// Remaining `front_material_*` keys.
    pub front_material: Material,
    /// Remaining `back_material_*` keys.
    pub back_material: Material,
    /// `light_*_<i>` for `i < MAX_LIGHTS`; always `MAX_LIGHTS` entries.
    pub lights: Vec<LightSource>,
    /// `background_color`.
    pub background_color: Rgb,
    /// Base-10 exponent of the uniform surface scale (`scale_factor`).
    pub scale_factor: f64,
    /// Surface orientation (`rotation_matrix`, row-major).
    pub rotation_matrix: Mat4,
    /// Keys this crate does not interpret, written back verbatim on save.
    pub extra: BTreeMap<String, String>,
}

impl SceneConfig {
    /// Parse a scene description.
    pub fn from_properties_str(text: &str) -> SurferResult<Self> {
        let mut map: BTreeMap<String, String> = parse_properties(text)?.into_iter().collect();

        let surface_equation = take_required(&mut map, "surface_equation")?;
        let front_color = required(&mut map, "front_material_color", parse_rgb)?;
        let back_color = required(&mut map, "back_material_color", parse_rgb)?;
        let background_color = required(&mut map, "background_color", parse_rgb)?;
        let scale_factor = required(&mut map, "scale_factor", parse_f64)?;
        let rotation_matrix =
            Mat4::from_row_major(required(&mut map, "rotation_matrix", parse_floats::<16>)?);

        let mut parameters = BTreeMap::new();
        let param_keys: Vec<String> = map
            .keys()
            .filter(|k| k.starts_with(PARAMETER_PREFIX))
            .cloned()
            .collect();
        for key in param_keys {
            let name = &key[PARAMETER_PREFIX.len()..];
            if !FORMULA_PARAMETERS.contains(&name) {
                return Err(SurferError::config_load(format!(
                    "{key}: unknown surface parameter '{name}'"
                )));
            }
            let value = map.remove(&key).unwrap_or_default();
            parameters.insert(name.to_owned(), parse_f64(&key, &value)?);
        }

        let camera_kind = match map.remove("camera_type") {
            Some(v) => CameraKind::from_config_str(&v)?,
            None => CameraKind::Orthographic,
        };
        let camera_fov_y = match map.remove("camera_fov_y") {
            Some(v) => parse_f64("camera_fov_y", &v)?,
            None => 60.0,
        };

        let front_material = take_material(&mut map, "front")?;
        let back_material = take_material(&mut map, "back")?;
        let lights = take_lights(&mut map)?;

        Ok(Self {
            surface_equation,
            parameters,
            camera_kind,
            camera_fov_y,
            front_color,
            back_color,
            front_material,
            back_material,
            lights,
            background_color,
            scale_factor,
            rotation_matrix,
            extra: map,
        })
    }

    /// Read and parse a scene file.
    pub fn from_path(path: impl AsRef<Path>) -> SurferResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SurferError::config_load(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_properties_str(&text)
    }

    /// Serialize to a file [`from_properties_str`](Self::from_properties_str) reads back
    /// field-for-field.
    pub fn to_properties_string(&self) -> String {
        let mut out = String::from("# surfer scene description\n");
        let mut put = |key: &str, value: String| {
            let _ = writeln!(out, "{}={}", escape(key, true), escape(&value, false));
        };

        put("surface_equation", self.surface_equation.clone());
        for (name, v) in &self.parameters {
            put(&format!("{PARAMETER_PREFIX}{name}"), v.to_string());
        }
        put("scale_factor", self.scale_factor.to_string());
        put("rotation_matrix", join_floats(&self.rotation_matrix.to_row_major()));
        put("camera_type", self.camera_kind.as_config_str().to_owned());
        put("camera_fov_y", self.camera_fov_y.to_string());
        for (side, color, m) in [
            ("front", self.front_color, &self.front_material),
            ("back", self.back_color, &self.back_material),
        ] {
            put(&format!("{side}_material_color"), rgb_string(color));
            put(&format!("{side}_material_ambient_intensity"), m.ambient_intensity.to_string());
            put(&format!("{side}_material_diffuse_intensity"), m.diffuse_intensity.to_string());
            put(&format!("{side}_material_specular_intensity"), m.specular_intensity.to_string());
            put(&format!("{side}_material_shininess"), m.shininess.to_string());
        }
        for (i, l) in self.lights.iter().enumerate() {
            put(&format!("light_status_{i}"), l.status.as_config_str().to_owned());
            put(
                &format!("light_position_{i}"),
                join_floats(&[l.position.x, l.position.y, l.position.z]),
            );
            put(&format!("light_color_{i}"), rgb_string(l.color));
            put(&format!("light_intensity_{i}"), l.intensity.to_string());
        }
        put("background_color", rgb_string(self.background_color));
        for (k, v) in &self.extra {
            put(k, v.clone());
        }
        out
    }
}

fn take_required(map: &mut BTreeMap<String, String>, key: &str) -> SurferResult<String> {
    map.remove(key)
        .ok_or_else(|| SurferError::config_load(format!("missing required key '{key}'")))
}

fn required<T>(
    map: &mut BTreeMap<String, String>,
    key: &str,
    parse: fn(&str, &str) -> SurferResult<T>,
) -> SurferResult<T> {
    let v = take_required(map, key)?;
    parse(key, &v)
}

fn parse_f64(key: &str, v: &str) -> SurferResult<f64> {
    v.trim()
        .parse::<f64>()
        .map_err(|_| SurferError::config_load(format!("{key}: expected a number, got '{v}'")))
}

fn parse_f32(key: &str, v: &str) -> SurferResult<f32> {
    v.trim()
        .parse::<f32>()
        .map_err(|_| SurferError::config_load(format!("{key}: expected a number, got '{v}'")))
}

fn parse_floats<const N: usize>(key: &str, v: &str) -> SurferResult<[f64; N]> {
    let values = v
        .split_whitespace()
        .map(|t| parse_f64(key, t))
        .collect::<SurferResult<Vec<_>>>()?;
    let got = values.len();
    values.try_into().map_err(|_| {
        SurferError::config_load(format!("{key}: expected {N} numbers, got {got}"))
    })
}

fn parse_rgb(key: &str, v: &str) -> SurferResult<Rgb> {
    let values = v
        .split_whitespace()
        .map(|t| parse_f32(key, t))
        .collect::<SurferResult<Vec<_>>>()?;
    match values[..] {
        [r, g, b] => Ok(Rgb::new(r, g, b)),
        _ => Err(SurferError::config_load(format!(
            "{key}: expected 3 numbers, got {}",
            values.len()
        ))),
    }
}

fn take_material(map: &mut BTreeMap<String, String>, side: &str) -> SurferResult<Material> {
    let mut m = Material::default();
    // color is required and consumed by the caller
    for field in &MATERIAL_FIELDS[1..] {
        let key = format!("{side}_material_{field}");
        let Some(v) = map.remove(&key) else {
            continue;
        };
        let value = parse_f32(&key, &v)?;
        match *field {
            "ambient_intensity" => m.ambient_intensity = value,
            "diffuse_intensity" => m.diffuse_intensity = value,
            "specular_intensity" => m.specular_intensity = value,
            _ => m.shininess = value,
        }
    }
    Ok(m)
}

fn take_lights(map: &mut BTreeMap<String, String>) -> SurferResult<Vec<LightSource>> {
    let any_light = (0..MAX_LIGHTS)
        .any(|i| LIGHT_FIELDS.iter().any(|f| map.contains_key(&format!("light_{f}_{i}"))));
    if !any_light {
        return Ok(default_lights());
    }

    let mut lights = vec![LightSource::default(); MAX_LIGHTS];
    for (i, light) in lights.iter_mut().enumerate() {
        if let Some(v) = map.remove(&format!("light_status_{i}")) {
            light.status = LightStatus::from_config_str(&v)?;
        }
        let key = format!("light_position_{i}");
        if let Some(v) = map.remove(&key) {
            let [x, y, z] = parse_floats::<3>(&key, &v)?;
            light.position = Vec3::new(x, y, z);
        }
        let key = format!("light_color_{i}");
        if let Some(v) = map.remove(&key) {
            light.color = parse_rgb(&key, &v)?;
        }
        let key = format!("light_intensity_{i}");
        if let Some(v) = map.remove(&key) {
            light.intensity = parse_f32(&key, &v)?;
        }
    }
    Ok(lights)
}

fn join_floats(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn rgb_string(c: Rgb) -> String {
    format!("{} {} {}", c.r, c.g, c.b)
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// Split properties text into raw `(key, value)` pairs in file order.
pub(crate) fn parse_properties(text: &str) -> SurferResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let trimmed = line.trim_start_matches(is_blank);
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let mut logical = trimmed.to_owned();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start_matches(is_blank)),
                None => break,
            }
        }
        let (key, value) = split_key_value(&logical);
        out.push((unescape(key)?, unescape(value)?));
    }
    Ok(out)
}

fn ends_with_continuation(line: &str) -> bool {
    line.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

fn split_key_value(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut end = 0;
    let mut escaped = false;
    while end < bytes.len() {
        let b = bytes[end];
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if matches!(b, b'=' | b':' | b' ' | b'\t' | 0x0c) {
            break;
        }
        end += 1;
    }
    let mut rest = line[end..].trim_start_matches(is_blank);
    if let Some(r) = rest.strip_prefix(['=', ':']) {
        rest = r.trim_start_matches(is_blank);
    }
    (&line[..end], rest)
}

fn unescape(raw: &str) -> SurferResult<String> {
    let mut out = String::with_capacity(raw.len());
    // `\uXXXX` escapes are UTF-16 code units; surrogate pairs span two escapes
    let mut units: Vec<u16> = Vec::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.as_str().starts_with('u') {
            chars.next();
            let hex: String = chars.by_ref().take(4).collect();
            let unit = (hex.len() == 4)
                .then(|| u16::from_str_radix(&hex, 16).ok())
                .flatten()
                .ok_or_else(|| SurferError::config_load(format!("malformed \\u escape in '{raw}'")))?;
            units.push(unit);
            continue;
        }
        flush_units(&mut units, &mut out, raw)?;
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    flush_units(&mut units, &mut out, raw)?;
    Ok(out)
}

fn flush_units(units: &mut Vec<u16>, out: &mut String, raw: &str) -> SurferResult<()> {
    if units.is_empty() {
        return Ok(());
    }
    for c in char::decode_utf16(units.drain(..)) {
        let c = c.map_err(|_| {
            SurferError::config_load(format!("unpaired surrogate escape in '{raw}'"))
        })?;
        out.push(c);
    }
    Ok(())
}

fn escape(s: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    let _ = write!(out, "\\u{unit:04X}");
                }
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/scene/config.rs"]
mod tests;
