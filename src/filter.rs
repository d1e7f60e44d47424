use crate::error::{PinreelError, PinreelResult};

/// One color operation parsed from a filter expression.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOp {
    Brightness(f32),
    Contrast(f32),
    Saturate(f32),
    Grayscale(f32),
}

/// Section-level color filter over the frame surface.
///
/// Parsed from a CSS-filter-like expression such as
/// `"contrast(1.05) brightness(1.15) saturate(1.1)"`; `"none"` (or an empty
/// string) is the identity. Ops apply in declaration order to the color
/// channels only; alpha is left untouched. Frame sequences are photographic
/// and effectively opaque, so channels are treated as straight values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisualFilter {
    ops: Vec<FilterOp>,
}

impl VisualFilter {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[FilterOp] {
        &self.ops
    }

    pub fn parse(expr: &str) -> PinreelResult<Self> {
        let expr = expr.trim();
        if expr.is_empty() || expr.eq_ignore_ascii_case("none") {
            return Ok(Self::identity());
        }

        let mut ops = Vec::new();
        for token in expr.split_whitespace() {
            ops.push(parse_op(token)?);
        }
        Ok(Self { ops })
    }

    /// Apply every op to a premultiplied RGBA8 buffer in place.
    pub fn apply_in_place(&self, rgba8: &mut [u8]) -> PinreelResult<()> {
        if !rgba8.len().is_multiple_of(4) {
            return Err(PinreelError::render(
                "filter expects a tightly packed rgba8 buffer",
            ));
        }
        if self.is_identity() {
            return Ok(());
        }

        for px in rgba8.chunks_exact_mut(4) {
            let mut c = [
                f32::from(px[0]) / 255.0,
                f32::from(px[1]) / 255.0,
                f32::from(px[2]) / 255.0,
            ];
            for op in &self.ops {
                c = apply_op(*op, c);
            }
            for (dst, v) in px[..3].iter_mut().zip(c) {
                *dst = (v * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
        Ok(())
    }
}

fn parse_op(token: &str) -> PinreelResult<FilterOp> {
    let token = token.trim();
    let Some(open) = token.find('(') else {
        return Err(PinreelError::validation(format!(
            "filter function '{token}' is missing an argument list"
        )));
    };
    if !token.ends_with(')') {
        return Err(PinreelError::validation(format!(
            "filter function '{token}' is missing a closing ')'"
        )));
    }

    let name = token[..open].trim().to_ascii_lowercase();
    let arg = token[open + 1..token.len() - 1].trim();
    let value: f32 = arg.parse().map_err(|_| {
        PinreelError::validation(format!("filter argument '{arg}' must be a number"))
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(PinreelError::validation(format!(
            "filter argument for '{name}' must be finite and >= 0"
        )));
    }

    match name.as_str() {
        "brightness" => Ok(FilterOp::Brightness(value)),
        "contrast" => Ok(FilterOp::Contrast(value)),
        "saturate" => Ok(FilterOp::Saturate(value)),
        "grayscale" => Ok(FilterOp::Grayscale(value.min(1.0))),
        _ => Err(PinreelError::validation(format!(
            "unknown filter function '{name}'"
        ))),
    }
}

// Luminance weights from the CSS filter effects matrices.
const LUMA_R: f32 = 0.213;
const LUMA_G: f32 = 0.715;
const LUMA_B: f32 = 0.072;

fn apply_op(op: FilterOp, [r, g, b]: [f32; 3]) -> [f32; 3] {
    match op {
        FilterOp::Brightness(k) => [r * k, g * k, b * k],
        FilterOp::Contrast(k) => [
            (r - 0.5) * k + 0.5,
            (g - 0.5) * k + 0.5,
            (b - 0.5) * k + 0.5,
        ],
        FilterOp::Saturate(s) => {
            let l = LUMA_R * r + LUMA_G * g + LUMA_B * b;
            [l + (r - l) * s, l + (g - l) * s, l + (b - l) * s]
        }
        FilterOp::Grayscale(t) => {
            let l = LUMA_R * r + LUMA_G * g + LUMA_B * b;
            [r + (l - r) * t, g + (l - g) * t, b + (l - b) * t]
        }
    }
}
