use nalgebra::{Point3, Scalar, Vector3};

/// A range return in the vehicle frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LidarPoint<T: Scalar> {
    pub position: Point3<T>,
    pub intensity: T,
}

pub type PointCloud<T> = Vec<LidarPoint<T>>;

impl<T: Scalar> LidarPoint<T> {
    pub fn new(position: Point3<T>, intensity: T) -> Self {
        Self {
            position,
            intensity,
        }
    }

    /// Applies `f` to the position and keeps the intensity.
    pub fn map_position(self, f: impl FnOnce(Point3<T>) -> Point3<T>) -> Self {
        Self {
            position: f(self.position),
            intensity: self.intensity,
        }
    }
}

impl<T: Scalar + num_traits::Zero> From<[T; 3]> for LidarPoint<T> {
    #[inline]
    fn from(value: [T; 3]) -> Self {
        Self::new(Point3::from(value), T::zero())
    }
}

impl<T: Scalar + num_traits::Zero> From<(T, T, T)> for LidarPoint<T> {
    #[inline]
    fn from((x, y, z): (T, T, T)) -> Self {
        Self::new(Point3::new(x, y, z), T::zero())
    }
}

impl<T: Scalar + num_traits::Zero> From<Vector3<T>> for LidarPoint<T> {
    #[inline]
    fn from(value: Vector3<T>) -> Self {
        Self::new(Point3::from(value), T::zero())
    }
}

/// Segmentation metadata accompanying a scan.
///
/// The per-point vectors are indexed like the points of the scan they describe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanInfo<T> {
    pub start_ring_index: Vec<usize>,
    pub end_ring_index: Vec<usize>,
    pub ground_flag: Vec<bool>,
    pub column_index: Vec<u32>,
    pub range: Vec<T>,
}

impl<T> ScanInfo<T> {
    /// Points without a flag are not ground.
    #[inline]
    pub fn is_ground(&self, index: usize) -> bool {
        self.ground_flag.get(index).copied().unwrap_or(false)
    }

    pub fn rings(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.start_ring_index
            .iter()
            .copied()
            .zip(self.end_ring_index.iter().copied())
    }
}
