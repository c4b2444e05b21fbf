use serde::{Deserialize, Serialize};
use ultraviolet::{Isometry3, Mat3, Mat4, Rotor3, Vec3, Vec4};

/// Below this, an axis is treated as collapsed and keeps its unit basis vector.
const DEGENERATE_SCALE: f32 = 1e-12;

/// Translation, rotation and per-axis scale of a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Rotor3,
    pub scale: Vec3,
}

impl Transform {
    /// `rotation` is a quaternion in `(x, y, z, w)` order.
    pub fn from_arrays(position: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        Self {
            position: Vec3::from(position),
            rotation: Rotor3::from_quaternion_array(rotation),
            scale: Vec3::from(scale),
        }
    }

    /// Splits an affine matrix into translation, rotation and scale.
    ///
    /// Scale is the length of each basis column. A matrix with a negative determinant
    /// gets its x scale negated, which keeps mirrored nodes representable while the
    /// remaining rotation stays proper. Sheared input is not rejected, the extracted
    /// rotation is simply normalized.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let linear = upper_left(matrix);
        let [x_axis, y_axis, z_axis] = linear.cols;

        let mut scale = Vec3::new(x_axis.mag(), y_axis.mag(), z_axis.mag());
        if linear.determinant() < 0.0 {
            scale.x = -scale.x;
        }

        let basis = Mat3::new(
            unscaled_axis(x_axis, scale.x, Vec3::unit_x()),
            unscaled_axis(y_axis, scale.y, Vec3::unit_y()),
            unscaled_axis(z_axis, scale.z, Vec3::unit_z()),
        );

        Self {
            position: matrix.cols[3].truncated(),
            rotation: canonical_rotation(basis.into_rotor3()),
            scale,
        }
    }

    pub fn position_array(&self) -> [f32; 3] {
        [self.position.x, self.position.y, self.position.z]
    }

    /// The rotation as an `(x, y, z, w)` quaternion.
    pub fn rotation_array(&self) -> [f32; 4] {
        self.rotation.into_quaternion_array()
    }

    pub fn scale_array(&self) -> [f32; 3] {
        [self.scale.x, self.scale.y, self.scale.z]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zero(),
            rotation: Rotor3::identity(),
            scale: Vec3::one(),
        }
    }
}

impl From<Transform> for Mat4 {
    fn from(transform: Transform) -> Self {
        let isometry = Isometry3::new(transform.position, transform.rotation);
        isometry.into_homogeneous_matrix() * Mat4::from_nonuniform_scale(transform.scale)
    }
}

/// Which axis points up in the coordinate system a scene was authored in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpAxis {
    /// +Z up, +Y forward. What DCC tools like Blender use.
    #[default]
    Z,
    /// +Y up, -Z forward. Already the archive convention.
    Y,
}

/// The fixed change of basis into the archive convention: right-handed, -Z forward, +Y up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisConversion {
    matrix: Mat4,
}

impl AxisConversion {
    pub fn from_up_axis(up_axis: UpAxis) -> Self {
        let matrix = match up_axis {
            // (x, y, z) -> (x, z, -y)
            UpAxis::Z => Mat4::new(
                Vec4::new(1.0, 0.0, 0.0, 0.0),
                Vec4::new(0.0, 0.0, -1.0, 0.0),
                Vec4::new(0.0, 1.0, 0.0, 0.0),
                Vec4::new(0.0, 0.0, 0.0, 1.0),
            ),
            UpAxis::Y => Mat4::identity(),
        };
        Self { matrix }
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// `G · M · Gᵗ`, expressing a host space transform in archive space.
    /// `G` is a signed permutation, so its transpose is its inverse.
    pub fn convert(&self, transform: &Mat4) -> Mat4 {
        self.matrix * *transform * self.matrix.transposed()
    }

    /// Converts and decomposes in one step.
    pub fn decompose(&self, transform: &Mat4) -> Transform {
        Transform::from_matrix(&self.convert(transform))
    }
}

/// Transforms a surface normal by the cofactor matrix of the upper 3x3 part.
/// That is the inverse transpose up to a scalar, so no inversion is needed.
pub fn transform_normal(matrix: &Mat4, normal: Vec3) -> Vec3 {
    let linear = upper_left(matrix);
    let [a, b, c] = linear.cols;
    let cofactor = Mat3::new(b.cross(c), c.cross(a), a.cross(b));
    let mut transformed = cofactor * normal;
    if linear.determinant() < 0.0 {
        transformed = -transformed;
    }
    let length = transformed.mag();
    if length > DEGENERATE_SCALE {
        transformed / length
    } else {
        transformed
    }
}

fn upper_left(matrix: &Mat4) -> Mat3 {
    let [x_axis, y_axis, z_axis, _] = matrix.cols;
    Mat3::new(x_axis.truncated(), y_axis.truncated(), z_axis.truncated())
}

fn unscaled_axis(axis: Vec3, scale: f32, fallback: Vec3) -> Vec3 {
    if scale.abs() > DEGENERATE_SCALE {
        axis / scale
    } else {
        fallback
    }
}

/// Normalizes the rotor and picks the sign with a non-negative quaternion w,
/// since q and -q are the same rotation.
fn canonical_rotation(rotor: Rotor3) -> Rotor3 {
    let length_sq = rotor.mag_sq();
    if !length_sq.is_finite() || length_sq <= DEGENERATE_SCALE {
        return Rotor3::identity();
    }
    let rotor = rotor.normalized();
    let [x, y, z, w] = rotor.into_quaternion_array();
    if w < 0.0 {
        Rotor3::from_quaternion_array([-x, -y, -z, -w])
    } else {
        rotor
    }
}
