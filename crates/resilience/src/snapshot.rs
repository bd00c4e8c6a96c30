use drawguard_render::GraphicsContext;

/// Graphics state captured on entry to a guarded render call.
///
/// Restoring only releases what the failed call over-held: transforms pushed
/// past the captured depth and a geometry build it left open. Nothing is
/// replayed or refilled, so the failed object is simply absent from the frame.
/// State kept inside third-party renderers (their own buffers or stacks) is out
/// of reach and may still leak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsStateSnapshot {
    depth: usize,
    building: bool,
}

/// What a restore had to release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Transforms popped to get back to the captured depth.
    pub popped: usize,
    /// Whether an open geometry build was ended.
    pub ended_build: bool,
}

impl RestoreReport {
    /// Nothing needed releasing.
    pub fn is_clean(&self) -> bool {
        self.popped == 0 && !self.ended_build
    }
}

impl GraphicsStateSnapshot {
    pub fn capture(gfx: &GraphicsContext) -> Self {
        Self {
            depth: gfx.transforms().depth(),
            building: gfx.buffer().is_building(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn was_building(&self) -> bool {
        self.building
    }

    /// Release state over-held since capture. Never pushes; safe to call repeatedly.
    pub fn restore(&self, gfx: &mut GraphicsContext) -> RestoreReport {
        let mut report = RestoreReport::default();

        while gfx.transforms().depth() > self.depth {
            if let Err(e) = gfx.transforms_mut().pop() {
                tracing::warn!(
                    error = %e,
                    depth = gfx.transforms().depth(),
                    "transform stack refused pop during restore"
                );
                break;
            }
            report.popped += 1;
        }

        if !self.building && gfx.buffer().is_building() {
            match gfx.buffer_mut().end_build() {
                Ok(vertices) => {
                    tracing::trace!(vertices, "released geometry buffer left building");
                    report.ended_build = true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "geometry buffer refused end_build during restore")
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_records_depth_and_build_state() {
        let mut gfx = GraphicsContext::default();
        gfx.transforms_mut().push();
        gfx.buffer_mut().begin().unwrap();

        let snap = GraphicsStateSnapshot::capture(&gfx);
        assert_eq!(snap.depth(), 2);
        assert!(snap.was_building());
    }

    #[test]
    fn restore_pops_to_captured_depth() {
        let mut gfx = GraphicsContext::default();
        gfx.transforms_mut().push();
        let snap = GraphicsStateSnapshot::capture(&gfx);

        for _ in 0..3 {
            gfx.transforms_mut().push();
        }
        let report = snap.restore(&mut gfx);

        assert_eq!(gfx.transforms().depth(), 2);
        assert_eq!(report.popped, 3);
        assert!(!report.ended_build);
    }

    #[test]
    fn restore_never_pushes() {
        let mut gfx = GraphicsContext::default();
        gfx.transforms_mut().push();
        gfx.transforms_mut().push();
        let snap = GraphicsStateSnapshot::capture(&gfx);

        // The failed call popped more than it pushed.
        gfx.transforms_mut().pop().unwrap();
        let report = snap.restore(&mut gfx);

        assert_eq!(gfx.transforms().depth(), 2);
        assert!(report.is_clean());
    }

    #[test]
    fn restore_ends_build_left_open() {
        let mut gfx = GraphicsContext::default();
        let snap = GraphicsStateSnapshot::capture(&gfx);

        gfx.buffer_mut().begin().unwrap();
        let report = snap.restore(&mut gfx);

        assert!(report.ended_build);
        assert!(!gfx.buffer().is_building());
        gfx.buffer_mut().begin().unwrap();
    }

    #[test]
    fn restore_keeps_build_that_was_already_open() {
        let mut gfx = GraphicsContext::default();
        gfx.buffer_mut().begin().unwrap();
        let snap = GraphicsStateSnapshot::capture(&gfx);

        let report = snap.restore(&mut gfx);
        assert!(!report.ended_build);
        assert!(gfx.buffer().is_building());
    }

    #[test]
    fn restore_twice_matches_restore_once() {
        let mut gfx = GraphicsContext::default();
        let snap = GraphicsStateSnapshot::capture(&gfx);
        gfx.transforms_mut().push();
        gfx.transforms_mut().push();
        gfx.buffer_mut().begin().unwrap();

        let first = snap.restore(&mut gfx);
        let after_once = (gfx.transforms().depth(), gfx.buffer().is_building());
        let second = snap.restore(&mut gfx);
        let after_twice = (gfx.transforms().depth(), gfx.buffer().is_building());

        assert_eq!(after_once, after_twice);
        assert_eq!(first.popped, 2);
        assert!(second.is_clean());
    }
}
