use glam::{Quat, Vec3, Vec4};

/// Values a keyframe track can blend between.
///
/// `interpolate_catmull_rom` blends between `p1` and `p2`, using `p0` and `p3`
/// only to estimate the tangents at the bracket ends.
pub trait Interpolatable: Copy + std::fmt::Debug + Default {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;

    fn interpolate_catmull_rom(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self;
}

/// Catmull-Rom basis weights for `(p0, p1, p2, p3)` at `t`.
#[inline]
fn catmull_rom_weights(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

impl Interpolatable for f32 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start + (end - start) * t
    }

    fn interpolate_catmull_rom(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self {
        let [w0, w1, w2, w3] = catmull_rom_weights(t);
        p0 * w0 + p1 * w1 + p2 * w2 + p3 * w3
    }
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }

    fn interpolate_catmull_rom(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self {
        let [w0, w1, w2, w3] = catmull_rom_weights(t);
        p0 * w0 + p1 * w1 + p2 * w2 + p3 * w3
    }
}

impl Interpolatable for Quat {
    /// Shortest-arc slerp, renormalized.
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.slerp(end, t).normalize()
    }

    /// Blends the quaternions as 4-vectors after flipping every neighbour into
    /// `p1`'s hemisphere, then renormalizes.
    fn interpolate_catmull_rom(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self {
        let v1 = Vec4::from(p1);
        let align = |q: Quat| {
            let v = Vec4::from(q);
            if v.dot(v1) < 0.0 { -v } else { v }
        };
        let v0 = align(p0);
        let v2 = align(p2);
        let v3 = align(p3);

        let [w0, w1, w2, w3] = catmull_rom_weights(t);
        let blended = v0 * w0 + v1 * w1 + v2 * w2 + v3 * w3;

        Quat::from_vec4(blended).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catmull_rom_weights_partition_unity() {
        for i in 0..=10 {
            let w = catmull_rom_weights(i as f32 / 10.0);
            assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn catmull_rom_on_a_line_is_linear() {
        let v = Vec3::interpolate_catmull_rom(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            0.5,
        );
        assert!((v.x - 1.5).abs() < 1e-6);
    }

    #[test]
    fn quat_catmull_rom_handles_flipped_neighbours() {
        let a = Quat::from_rotation_y(0.0);
        let b = Quat::from_rotation_y(0.2);
        let c = Quat::from_rotation_y(0.4);
        let d = Quat::from_rotation_y(0.6);
        let plain = Quat::interpolate_catmull_rom(a, b, c, d, 0.5);
        let flipped = Quat::interpolate_catmull_rom(-a, b, -c, d, 0.5);
        assert!(plain.dot(flipped).abs() > 1.0 - 1e-5);
        assert!((plain.length() - 1.0).abs() < 1e-5);
    }
}
