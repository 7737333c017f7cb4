//=========================================================================
// Coordinate Mapper
//
// Computes the fit/alignment transform between render-surface space and
// artboard space.
//
// The same transform is used to draw the artboard and to map pointer
// input back into it; if the two ever diverge, hit-testing drifts away
// from what is on screen. Both paths therefore go through `transform()`.
//
// Caching:
// ```text
//   set_render_size() / bind_artboard()  → stale
//   transform() / to_scene_space()       → recompute if stale, then reuse
// ```
//
//=========================================================================

//=== External Crates =====================================================

use kurbo::{Affine, Point, Rect};
use log::trace;

//=== Free Functions ======================================================

/// "Contain" fit, centre aligned.
///
/// Scales `artboard` uniformly so all of it fits inside `renderer`, then
/// centres it. Returns `None` for an empty artboard, which has no
/// meaningful scale.
pub fn compute_transform(renderer: Rect, artboard: Rect) -> Option<Affine> {
    let artboard = artboard.abs();
    let renderer = renderer.abs();
    if artboard.width() <= 0.0 || artboard.height() <= 0.0 {
        return None;
    }
    let scale = (renderer.width() / artboard.width()).min(renderer.height() / artboard.height());

    Some(
        Affine::translate(renderer.center().to_vec2())
            * Affine::scale(scale)
            * Affine::translate(-artboard.center().to_vec2()),
    )
}

//=== CoordinateMapper ====================================================

#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    render_size: (u32, u32),
    artboard: Option<Rect>,
    cached: Option<Affine>,
    stale: bool,
}

impl CoordinateMapper {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            render_size: (width, height),
            artboard: None,
            cached: None,
            stale: true,
        }
    }

    //--- Invalidation -----------------------------------------------------

    /// Records new render dimensions; the transform is recomputed lazily.
    pub fn set_render_size(&mut self, width: u32, height: u32) {
        if self.render_size != (width, height) {
            self.render_size = (width, height);
            self.stale = true;
        }
    }

    /// Binds (or with `None`, unbinds) the artboard bounds.
    pub fn bind_artboard(&mut self, bounds: Option<Rect>) {
        self.artboard = bounds;
        self.stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn render_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.render_size.0), f64::from(self.render_size.1))
    }

    //--- Mapping ----------------------------------------------------------

    /// Render ← artboard transform, or `None` when no artboard is bound.
    pub fn transform(&mut self) -> Option<Affine> {
        if self.stale {
            self.cached = self
                .artboard
                .and_then(|artboard| compute_transform(self.render_bounds(), artboard));
            self.stale = false;
            trace!(target: "render", "Alignment transform recomputed: {:?}", self.cached);
        }
        self.cached
    }

    /// Maps a render-surface point into artboard space.
    ///
    /// Fails (returns `None`) when nothing is bound or the transform is
    /// degenerate, e.g. a zero-sized render surface.
    pub fn to_scene_space(&mut self, point: Point) -> Option<Point> {
        let transform = self.transform()?;
        if transform.determinant().abs() <= f64::EPSILON {
            return None;
        }
        Some(transform.inverse() * point)
    }

    /// Maps an artboard point onto the render surface.
    pub fn to_render_space(&mut self, point: Point) -> Option<Point> {
        self.transform().map(|transform| transform * point)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    //=====================================================================
    // compute_transform
    //=====================================================================

    #[test]
    fn contain_letterboxes_wide_surface() {
        // 800x600 surface, 100x100 artboard → scale 6, centred horizontally.
        let t = compute_transform(
            Rect::new(0.0, 0.0, 800.0, 600.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        )
        .unwrap();
        assert!(close(t * Point::new(0.0, 0.0), Point::new(100.0, 0.0)));
        assert!(close(t * Point::new(100.0, 100.0), Point::new(700.0, 600.0)));
    }

    #[test]
    fn contain_handles_offset_artboard() {
        let t = compute_transform(
            Rect::new(0.0, 0.0, 200.0, 400.0),
            Rect::new(50.0, 50.0, 150.0, 100.0),
        )
        .unwrap();
        // Width-bound: scale 2, centre (100, 75) → (100, 200).
        assert!(close(t * Point::new(100.0, 75.0), Point::new(100.0, 200.0)));
        assert!(close(t * Point::new(50.0, 50.0), Point::new(0.0, 150.0)));
    }

    #[test]
    fn empty_artboard_has_no_transform() {
        assert!(compute_transform(Rect::new(0.0, 0.0, 10.0, 10.0), Rect::ZERO).is_none());
    }

    //=====================================================================
    // CoordinateMapper
    //=====================================================================

    #[test]
    fn unbound_mapper_reports_failure() {
        let mut mapper = CoordinateMapper::new(800, 600);
        assert!(mapper.to_scene_space(Point::new(1.0, 1.0)).is_none());
        assert!(mapper.transform().is_none());
    }

    #[test]
    fn round_trip_is_identity_inside_artboard() {
        let sizes = [(800, 600), (37, 1024), (1, 1), (1920, 1080)];
        let artboards = [
            Rect::new(0.0, 0.0, 500.0, 500.0),
            Rect::new(-20.0, 10.0, 80.0, 30.0),
            Rect::new(0.0, 0.0, 1.5, 900.0),
        ];
        for &(w, h) in &sizes {
            for &artboard in &artboards {
                let mut mapper = CoordinateMapper::new(w, h);
                mapper.bind_artboard(Some(artboard));
                for (fx, fy) in [(0.0, 0.0), (0.25, 0.75), (0.5, 0.5), (1.0, 1.0)] {
                    let p = Point::new(
                        artboard.x0 + artboard.width() * fx,
                        artboard.y0 + artboard.height() * fy,
                    );
                    let render = mapper.to_render_space(p).unwrap();
                    let back = mapper.to_scene_space(render).unwrap();
                    assert!((back.x - p.x).abs() < 1e-6 && (back.y - p.y).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn invalidation_is_lazy() {
        let mut mapper = CoordinateMapper::new(100, 100);
        mapper.bind_artboard(Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(mapper.is_stale());
        assert_eq!(mapper.transform(), Some(Affine::IDENTITY));
        assert!(!mapper.is_stale());

        mapper.set_render_size(200, 200);
        assert!(mapper.is_stale());
        assert_eq!(mapper.transform(), Some(Affine::scale(2.0)));
    }

    #[test]
    fn same_size_does_not_invalidate() {
        let mut mapper = CoordinateMapper::new(100, 100);
        mapper.bind_artboard(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        mapper.transform();
        mapper.set_render_size(100, 100);
        assert!(!mapper.is_stale());
    }

    #[test]
    fn zero_sized_surface_cannot_map_input() {
        let mut mapper = CoordinateMapper::new(0, 0);
        mapper.bind_artboard(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert!(mapper.to_scene_space(Point::new(0.0, 0.0)).is_none());
    }
}
