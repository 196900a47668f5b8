use std::{collections::HashMap, fmt::Display};

use nalgebra::{Matrix3, SymmetricEigen, Vector3};

use super::EfgMatrix;

/// right-handed orthonormal frame derived from an EFG tensor. the `Display`
/// impl is the on-disk cell format:
/// `X(x1,x2,x3);Y(y1,y2,y3);Z(z1,z2,z3)`, every component to 6 decimals
#[derive(Debug, Clone, PartialEq)]
pub struct Orientation {
    pub x: Vector3<f64>,
    pub y: Vector3<f64>,
    pub z: Vector3<f64>,
}

impl Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "X({:.6},{:.6},{:.6});Y({:.6},{:.6},{:.6});Z({:.6},{:.6},{:.6})",
            self.x[0],
            self.x[1],
            self.x[2],
            self.y[0],
            self.y[1],
            self.y[2],
            self.z[0],
            self.z[1],
            self.z[2],
        )
    }
}

impl EfgMatrix {
    /// the canonical orientation of `self`:
    ///
    /// 1. eigendecompose and sort the eigenpairs by ascending eigenvalue;
    /// 2. Z = the eigenvector whose eigenvalue has the largest absolute
    ///    value, the lowest index winning ties;
    /// 3. X = the lower-indexed of the two remaining eigenvectors;
    /// 4. Y = Z x X; when Y points away from the last eigenvector, X and Y
    ///    are negated together, which lines Y up without leaving the frame
    ///    left-handed.
    ///
    /// total for any symmetric input, so the only unavailable orientation is
    /// a missing tensor
    pub fn orientation(&self) -> Orientation {
        let (vals, vecs) = symm_eigen(&self.0);
        let mut max_i = 0;
        for (i, val) in vals.iter().enumerate() {
            if val.abs() > vals[max_i].abs() {
                max_i = i;
            }
        }
        let z = vecs[max_i];
        let rest: Vec<usize> = (0..3).filter(|&i| i != max_i).collect();
        let v1 = vecs[rest[0]];
        let v2 = vecs[rest[1]];
        let mut x = v1;
        let mut y = z.cross(&x);
        if y.dot(&v2) < 0.0 {
            x = -x;
            y = -y;
        }
        Orientation { x, y, z }
    }
}

/// eigendecomposition of a symmetric 3x3 matrix, eigenpairs sorted by
/// ascending eigenvalue
fn symm_eigen(mat: &Matrix3<f64>) -> ([f64; 3], [Vector3<f64>; 3]) {
    let SymmetricEigen {
        eigenvectors,
        eigenvalues,
    } = SymmetricEigen::new(*mat);
    let mut pairs: Vec<(f64, Vector3<f64>)> = eigenvalues
        .iter()
        .zip(eigenvectors.column_iter())
        .map(|(&val, vec)| (val, vec.into_owned()))
        .collect();
    pairs.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap());
    (
        [pairs[0].0, pairs[1].0, pairs[2].0],
        [pairs[0].1, pairs[1].1, pairs[2].1],
    )
}

/// the formatted orientation cell for `nucleus`, `N/A` when no tensor was
/// collected for it
pub fn orientation_cell(
    map: &HashMap<usize, EfgMatrix>,
    nucleus: usize,
) -> String {
    match map.get(&nucleus) {
        Some(mat) => mat.orientation().to_string(),
        None => String::from("N/A"),
    }
}
