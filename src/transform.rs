//! Chainable 4x4 affine transform used to move a virtual camera over an image.

pub type Vec3 = [f64; 3];
pub type Matrix4 = [[f64; 4]; 4];

const IDENTITY: Matrix4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

fn multiply(a: &Matrix4, b: &Matrix4) -> Matrix4 {
    let mut out = [[0.0; 4]; 4];
    for (row, out_row) in out.iter_mut().enumerate() {
        for (col, cell) in out_row.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[row][k] * b[k][col]).sum();
        }
    }
    out
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    matrix: Matrix4,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

impl Transform {
    pub fn identity() -> Transform {
        Transform { matrix: IDENTITY }
    }

    #[cfg(test)]
    pub fn matrix(&self) -> &Matrix4 {
        &self.matrix
    }

    /// Counterclockwise rotation by `theta` radians about `axis`. The axis is
    /// normalized first; a zero-length axis leaves the transform unchanged.
    pub fn rotate(mut self, axis: Vec3, theta: f64) -> Transform {
        if let Some(rotation) = Transform::rotation_matrix(axis, theta) {
            self.matrix = multiply(&self.matrix, &rotation);
        }
        self
    }

    pub fn translate(mut self, translation: Vec3) -> Transform {
        self.matrix = multiply(&self.matrix, &Transform::translation_matrix(translation));
        self
    }

    /// Multiplies every matrix entry by `scale`, the homogeneous row included.
    /// This is not a scale matrix: any translation composed afterwards is
    /// scaled as well, and `apply` never divides by the homogeneous component.
    pub fn scale(mut self, scale: f64) -> Transform {
        for row in self.matrix.iter_mut() {
            for cell in row.iter_mut() {
                *cell *= scale;
            }
        }
        self
    }

    /// Applies the transform to `point` extended with a homogeneous 1 and
    /// returns the first three components without a perspective divide.
    pub fn apply(&self, point: Vec3) -> Vec3 {
        let homogeneous = [point[0], point[1], point[2], 1.0];
        let mut out = [0.0; 3];
        for (row, value) in out.iter_mut().enumerate() {
            *value = (0..4).map(|k| self.matrix[row][k] * homogeneous[k]).sum();
        }
        out
    }

    fn translation_matrix(translation: Vec3) -> Matrix4 {
        [
            [1.0, 0.0, 0.0, translation[0]],
            [0.0, 1.0, 0.0, translation[1]],
            [0.0, 0.0, 1.0, translation[2]],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    fn rotation_matrix(axis: Vec3, theta: f64) -> Option<Matrix4> {
        let length = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        if length == 0.0 || !length.is_finite() {
            return None;
        }

        // Euler-Rodrigues parameters
        let half_sin = (theta / 2.0).sin();
        let a = (theta / 2.0).cos();
        let b = -axis[0] / length * half_sin;
        let c = -axis[1] / length * half_sin;
        let d = -axis[2] / length * half_sin;
        let (aa, bb, cc, dd) = (a * a, b * b, c * c, d * d);
        let (bc, ad, ac, ab, bd, cd) = (b * c, a * d, a * c, a * b, b * d, c * d);

        Some([
            [aa + bb - cc - dd, 2.0 * (bc + ad), 2.0 * (bd - ac), 0.0],
            [2.0 * (bc - ad), aa + cc - bb - dd, 2.0 * (cd + ab), 0.0],
            [2.0 * (bd + ac), 2.0 * (cd - ab), aa + dd - bb - cc, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }
}
