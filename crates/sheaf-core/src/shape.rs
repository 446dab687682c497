use std::fmt;

// Shape — per-element structural metadata
//
// A Shape describes a single element of a dataset, not the dataset itself.
// For example:
//   - Scalar labels:       Shape([])        — 1 value per element
//   - Feature vectors:     Shape([784])     — 784 values per element
//   - Images:              Shape([3, 32, 32])
//
// Containers carry the shape alongside their batches. It is copied into every
// container derived from another one (subsets, splices, resamples) but never
// recomputed from the stored elements.

/// Shape of one element of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a new shape from a vector of dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The shape of a scalar element.
    pub fn scalar() -> Self {
        Shape(Vec::new())
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions (0 for scalar, 1 for vector, ...).
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Whether this describes a scalar element.
    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of values in one element (product of all dimensions).
    /// A scalar shape [] has 1 value.
    pub fn elem_count(&self) -> usize {
        self.0.iter().product::<usize>().max(1)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<()> for Shape {
    /// Scalar shape (0 dimensions).
    fn from(_: ()) -> Self {
        Shape(vec![])
    }
}

impl From<usize> for Shape {
    /// 1-D shape.
    fn from(d: usize) -> Self {
        Shape(vec![d])
    }
}

impl From<(usize, usize)> for Shape {
    fn from((d0, d1): (usize, usize)) -> Self {
        Shape(vec![d0, d1])
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((d0, d1, d2): (usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2])
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::from(());
        assert!(s.is_scalar());
        assert_eq!(s.rank(), 0);
        assert_eq!(s.elem_count(), 1);
        assert_eq!(s, Shape::default());
    }

    #[test]
    fn test_image_shape() {
        let s = Shape::from((3, 32, 32));
        assert_eq!(s.rank(), 3);
        assert_eq!(s.elem_count(), 3 * 32 * 32);
        assert_eq!(s.dims(), &[3, 32, 32]);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Shape::from((3, 4))), "[3, 4]");
        assert_eq!(format!("{}", Shape::scalar()), "[]");
    }
}
