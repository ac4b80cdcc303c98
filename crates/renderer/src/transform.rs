//! Model-view-projection math for placing a picture on the surface.
//!
//! The picture is drawn as the unit quad from [`crate::geometry`], scaled to
//! its on-screen size, translated for parallax, then projected with an
//! orthographic projection centred on the surface.

use crate::types::{ScalingMode, SurfaceSize};

/// Minimum overscan, as a fraction of surface width, at full parallax intensity.
pub const PARALLAX_OVERSCAN: f32 = 0.2;

/// Column-major 4x4 matrix laid out the way std140 expects a `mat4`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4(pub [[f32; 4]; 4]);

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    /// Orthographic projection mapping depth into wgpu's `0..=1` clip range.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let width = right - left;
        let height = top - bottom;
        let depth = far - near;
        Mat4([
            [2.0 / width, 0.0, 0.0, 0.0],
            [0.0, 2.0 / height, 0.0, 0.0],
            [0.0, 0.0, 1.0 / depth, 0.0],
            [
                -(right + left) / width,
                -(top + bottom) / height,
                -near / depth,
                1.0,
            ],
        ])
    }

    pub fn translation(x: f32, y: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.0[3][0] = x;
        m.0[3][1] = y;
        m
    }

    pub fn scale(x: f32, y: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.0[0][0] = x;
        m.0[1][1] = y;
        m
    }

    pub fn mul(&self, rhs: &Mat4) -> Mat4 {
        let mut out = [[0.0f32; 4]; 4];
        for (col, out_col) in out.iter_mut().enumerate() {
            for (row, cell) in out_col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.0[k][row] * rhs.0[col][k]).sum();
            }
        }
        Mat4(out)
    }

    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        let m = &self.0;
        (
            m[0][0] * x + m[1][0] * y + m[3][0],
            m[0][1] * x + m[1][1] * y + m[3][1],
        )
    }

    pub fn to_cols_array(&self) -> [[f32; 4]; 4] {
        self.0
    }
}

/// Per-axis scale that maps image pixels onto surface pixels.
pub fn scale_factors(mode: ScalingMode, surface: SurfaceSize, image: (u32, u32)) -> (f32, f32) {
    let (w, h) = image;
    if w == 0 || h == 0 || !surface.is_known() {
        return (1.0, 1.0);
    }
    let sx = surface.width as f32 / w as f32;
    let sy = surface.height as f32 / h as f32;
    match mode {
        ScalingMode::Fill => {
            let s = sx.max(sy);
            (s, s)
        }
        ScalingMode::Fit => {
            let s = sx.min(sy);
            (s, s)
        }
        ScalingMode::Stretch => (sx, sy),
        ScalingMode::None => (1.0, 1.0),
    }
}

/// Parallax inputs for one frame: `intensity` in `0..=1`, `offset` in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parallax {
    pub intensity: f32,
    pub offset: f32,
}

impl Parallax {
    pub const NONE: Parallax = Parallax {
        intensity: 0.0,
        offset: 0.5,
    };

    fn active(self) -> bool {
        self.intensity > 0.0
    }
}

/// Where a picture lands on screen, before projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scaled_width: f32,
    pub scaled_height: f32,
    pub translate_x: f32,
}

pub fn placement(
    mode: ScalingMode,
    surface: SurfaceSize,
    image: (u32, u32),
    parallax: Parallax,
) -> Placement {
    let (sx, sy) = scale_factors(mode, surface, image);
    let mut scaled_width = image.0 as f32 * sx;
    let mut scaled_height = image.1 as f32 * sy;
    let surface_width = surface.width as f32;

    if !parallax.active() || scaled_width <= 0.0 {
        return Placement {
            scaled_width,
            scaled_height,
            translate_x: 0.0,
        };
    }

    let required = surface_width * (1.0 + parallax.intensity * PARALLAX_OVERSCAN);
    if scaled_width < required {
        let zoom = required / scaled_width;
        scaled_width *= zoom;
        scaled_height *= zoom;
    }
    let translate_x = parallax_translation(scaled_width, surface_width, parallax.offset);

    Placement {
        scaled_width,
        scaled_height,
        translate_x,
    }
}

/// Horizontal pan for a scaled image; exactly zero at offset 0.5.
pub fn parallax_translation(scaled_width: f32, surface_width: f32, offset: f32) -> f32 {
    (scaled_width - surface_width).max(0.0) * (0.5 - offset)
}

/// Final transform handed to the vertex stage for a picture draw.
pub fn picture_transform(
    mode: ScalingMode,
    surface: SurfaceSize,
    image: (u32, u32),
    parallax: Parallax,
) -> Mat4 {
    let place = placement(mode, surface, image, parallax);
    projection(surface)
        .mul(&Mat4::translation(place.translate_x, 0.0))
        .mul(&Mat4::scale(place.scaled_width, place.scaled_height))
}

/// Transform that stretches the unit quad over the whole surface.
pub fn fullscreen_transform() -> Mat4 {
    Mat4::scale(2.0, 2.0)
}

fn projection(surface: SurfaceSize) -> Mat4 {
    let half_w = surface.width.max(1) as f32 / 2.0;
    let half_h = surface.height.max(1) as f32 / 2.0;
    Mat4::orthographic(-half_w, half_w, -half_h, half_h, -1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTRAIT: SurfaceSize = SurfaceSize::new(1080, 1920);

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn scale_factors_follow_mode() {
        let image = (2000, 1000);
        let sx = 1080.0 / 2000.0;
        let sy = 1920.0 / 1000.0;
        assert_eq!(scale_factors(ScalingMode::Fill, PORTRAIT, image), (sy, sy));
        assert_eq!(scale_factors(ScalingMode::Fit, PORTRAIT, image), (sx, sx));
        assert_eq!(scale_factors(ScalingMode::Stretch, PORTRAIT, image), (sx, sy));
        assert_eq!(scale_factors(ScalingMode::None, PORTRAIT, image), (1.0, 1.0));
    }

    #[test]
    fn centred_offset_never_translates() {
        for &(w, h) in &[(4000, 3000), (500, 500), (1080, 1920), (10, 9000)] {
            for mode in [ScalingMode::Fill, ScalingMode::Fit, ScalingMode::None] {
                let place = placement(
                    mode,
                    PORTRAIT,
                    (w, h),
                    Parallax {
                        intensity: 1.0,
                        offset: 0.5,
                    },
                );
                assert_eq!(place.translate_x, 0.0);
            }
        }
    }

    #[test]
    fn zero_intensity_never_translates() {
        for offset in [0.0, 0.25, 1.0] {
            let place = placement(
                ScalingMode::Fill,
                PORTRAIT,
                (4000, 1000),
                Parallax {
                    intensity: 0.0,
                    offset,
                },
            );
            assert_eq!(place.translate_x, 0.0);
        }
    }

    #[test]
    fn parallax_zooms_until_overscan_is_available() {
        // Fill on a portrait surface: 1000x1000 becomes 1920 wide, plenty of overscan.
        let wide = placement(
            ScalingMode::Fill,
            PORTRAIT,
            (1000, 1000),
            Parallax {
                intensity: 1.0,
                offset: 0.0,
            },
        );
        assert!(approx(wide.scaled_width, 1920.0));
        assert!(approx(wide.translate_x, (1920.0 - 1080.0) * 0.5));

        // Stretch gives no overscan, so an extra zoom of 1 + 0.2 * intensity is applied.
        let stretched = placement(
            ScalingMode::Stretch,
            PORTRAIT,
            (1000, 1000),
            Parallax {
                intensity: 0.5,
                offset: 1.0,
            },
        );
        assert!(approx(stretched.scaled_width, 1080.0 * 1.1));
        assert!(approx(stretched.scaled_height, 1920.0 * 1.1));
        assert!(approx(stretched.translate_x, -(1080.0 * 0.1) * 0.5));
    }

    #[test]
    fn transform_maps_image_edges_to_clip_space() {
        let surface = SurfaceSize::new(800, 600);
        let m = picture_transform(ScalingMode::Stretch, surface, (400, 300), Parallax::NONE);
        let (x, y) = m.transform_point(0.5, 0.5);
        assert!(approx(x, 1.0) && approx(y, 1.0));
        let (x, y) = m.transform_point(-0.5, -0.5);
        assert!(approx(x, -1.0) && approx(y, -1.0));
    }

    #[test]
    fn fit_letterboxes_inside_clip_space() {
        let m = picture_transform(ScalingMode::Fit, PORTRAIT, (1000, 1000), Parallax::NONE);
        let (x, y) = m.transform_point(0.5, 0.5);
        assert!(approx(x, 1.0));
        assert!(y < 1.0);
    }

    #[test]
    fn fullscreen_quad_spans_clip_space() {
        let (x, y) = fullscreen_transform().transform_point(0.5, -0.5);
        assert_eq!((x, y), (1.0, -1.0));
    }

    #[test]
    fn degenerate_inputs_fall_back_to_identity_scale() {
        assert_eq!(
            scale_factors(ScalingMode::Fill, SurfaceSize::default(), (10, 10)),
            (1.0, 1.0)
        );
        assert_eq!(scale_factors(ScalingMode::Fit, PORTRAIT, (0, 10)), (1.0, 1.0));
    }
}
