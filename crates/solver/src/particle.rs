//! Particle state storage using struct-of-arrays layout for SIMD-friendly bulk passes.

/// Struct-of-arrays particle storage.
///
/// All arrays are parallel: index `i` across every array refers to the same
/// particle. Separate x/y arrays (rather than a vector type) are used
/// deliberately so each bulk pass streams through contiguous scalar lanes.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleBuffers {
    /// X positions (meters)
    pub x: Vec<f32>,
    /// Y positions (meters)
    pub y: Vec<f32>,
    /// X velocities (m/s)
    pub vx: Vec<f32>,
    /// Y velocities (m/s)
    pub vy: Vec<f32>,
}

impl ParticleBuffers {
    /// Create `n` particles with all positions and velocities zeroed.
    pub fn zeroed(n: usize) -> Self {
        Self {
            x: vec![0.0; n],
            y: vec![0.0; n],
            vx: vec![0.0; n],
            vy: vec![0.0; n],
        }
    }

    /// Create particles at the given positions with zero initial velocity.
    pub fn from_positions(positions: &[[f32; 2]]) -> Self {
        Self {
            x: positions.iter().map(|p| p[0]).collect(),
            y: positions.iter().map(|p| p[1]).collect(),
            vx: vec![0.0; positions.len()],
            vy: vec![0.0; positions.len()],
        }
    }

    /// Return the number of particles stored.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Return `true` if there are no particles.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_buffers() {
        let pb = ParticleBuffers::zeroed(4);
        assert_eq!(pb.len(), 4);
        assert!(!pb.is_empty());
        assert!(pb.x.iter().all(|&v| v == 0.0));
        assert!(pb.vy.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn from_positions_keeps_order_and_zeroes_velocity() {
        let pb = ParticleBuffers::from_positions(&[[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(pb.len(), 2);
        assert_eq!(pb.x, vec![1.0, 3.0]);
        assert_eq!(pb.y, vec![2.0, 4.0]);
        assert_eq!(pb.vx, vec![0.0, 0.0]);
        assert_eq!(pb.vy, vec![0.0, 0.0]);
    }

    #[test]
    fn empty_buffers() {
        let pb = ParticleBuffers::from_positions(&[]);
        assert_eq!(pb.len(), 0);
        assert!(pb.is_empty());
    }
}
