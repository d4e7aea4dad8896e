use cgmath::{Matrix4, Rad};

/// Maps OpenGL clip space (z in [-1, 1]) to wgpu clip space (z in [0, 1])
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Mirrors clip-space Y. Cube faces are rendered through it so the face
/// images land in memory the way cube sampling expects them.
#[rustfmt::skip]
pub const FLIP_Y_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0,  0.0, 0.0, 0.0,
    0.0, -1.0, 0.0, 0.0,
    0.0,  0.0, 1.0, 0.0,
    0.0,  0.0, 0.0, 1.0,
);

/// Perspective projection for the window camera
pub fn camera_projection(fov_y: f32, width: u32, height: u32, near: f32, far: f32) -> Matrix4<f32> {
    let aspect = width.max(1) as f32 / height.max(1) as f32;
    OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Rad(fov_y), aspect, near, far)
}

/// 90° square projection shared by the six cube faces
pub fn cube_face_projection(near: f32, far: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX
        * FLIP_Y_MATRIX
        * cgmath::perspective(Rad(std::f32::consts::FRAC_PI_2), 1.0, near, far)
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    let mut result = [[0.0; 4]; 4];

    for i in 0..4 {
        for j in 0..4 {
            result[i][j] = matrix4[i][j];
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Vector4, Zero};

    #[test]
    fn test_depth_range_is_remapped() {
        let projection = camera_projection(std::f32::consts::FRAC_PI_2, 800, 600, 0.01, 10.0);

        let near = projection * Vector4::new(0.0, 0.0, -0.01, 1.0);
        let far = projection * Vector4::new(0.0, 0.0, -10.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_cube_projection_flips_y_only() {
        let cube = cube_face_projection(0.01, 10.0);
        let plain = camera_projection(std::f32::consts::FRAC_PI_2, 1, 1, 0.01, 10.0);
        let point = Vector4::new(0.3, 0.2, -1.0, 1.0);

        let a = cube * point;
        let b = plain * point;
        assert!((a.x - b.x).abs() < 1e-5);
        assert!((a.y + b.y).abs() < 1e-5);
        assert!((a.z - b.z).abs() < 1e-5);
    }

    #[test]
    fn test_zero_height_does_not_divide_by_zero() {
        let projection = camera_projection(1.0, 100, 0, 0.01, 10.0);
        assert!(projection.x.x.is_finite());
        assert!(!projection.x.is_zero());
    }
}
