//! Three component vector
use std::ops::{Add, Index, IndexMut, Mul, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use nalgebra::Vector3;

/// [Triple] is a 3D vector, used for positions, velocities
/// and accelerations.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triple([f64; 3]);

impl Triple {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }
    pub const fn x(&self) -> f64 {
        self.0[0]
    }
    pub const fn y(&self) -> f64 {
        self.0[1]
    }
    pub const fn z(&self) -> f64 {
        self.0[2]
    }
    /// Returns this [Triple] as a nalgebra [Vector3]
    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::from(self.0)
    }
    /// Euclidean norm
    pub fn mag(&self) -> f64 {
        self.to_vector().norm()
    }
    pub fn dot(&self, rhs: &Self) -> f64 {
        self.to_vector().dot(&rhs.to_vector())
    }
    pub fn cross(&self, rhs: &Self) -> Self {
        self.to_vector().cross(&rhs.to_vector()).into()
    }
    /// Returns a copy with every component multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        (self.to_vector() * factor).into()
    }
    pub fn as_array(&self) -> &[f64; 3] {
        &self.0
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

impl Index<usize> for Triple {
    type Output = f64;
    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl IndexMut<usize> for Triple {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

impl Add for Triple {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        (self.to_vector() + rhs.to_vector()).into()
    }
}

impl Sub for Triple {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        (self.to_vector() - rhs.to_vector()).into()
    }
}

impl Mul<f64> for Triple {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        self.scaled(rhs)
    }
}

impl Neg for Triple {
    type Output = Self;
    fn neg(self) -> Self {
        self.scaled(-1.0)
    }
}

impl From<(f64, f64, f64)> for Triple {
    fn from(xyz: (f64, f64, f64)) -> Self {
        Self::new(xyz.0, xyz.1, xyz.2)
    }
}

impl From<[f64; 3]> for Triple {
    fn from(xyz: [f64; 3]) -> Self {
        Self(xyz)
    }
}

impl From<Vector3<f64>> for Triple {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Triple> for Vector3<f64> {
    fn from(t: Triple) -> Self {
        t.to_vector()
    }
}
