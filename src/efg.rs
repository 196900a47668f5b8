use std::{collections::HashMap, sync::OnceLock};

use nalgebra::Matrix3;
use regex::Regex;

pub mod orient;


pub use orient::{orientation_cell, Orientation};

/// one raw electric field gradient tensor, assembled row-major from the three
/// lines printed under a `Raw EFG matrix` marker
#[derive(Debug, Clone, PartialEq)]
pub struct EfgMatrix(pub Matrix3<f64>);

/// quadrupole coupling constant (absolute value, MHz) and asymmetry parameter
/// for one nucleus
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coupling {
    pub e2qq: f64,
    pub eta: f64,
}

static NUCLEUS: OnceLock<Regex> = OnceLock::new();

/// the index of the hydrogen nucleus named on `line`, if any. these are the
/// output program's own numbers, which start at zero
fn nucleus_marker(line: &str) -> Option<usize> {
    let re = NUCLEUS.get_or_init(|| Regex::new(r"Nucleus\s+(\d+)H").unwrap());
    re.captures(line).and_then(|cap| cap[1].parse().ok())
}

static ROW: OnceLock<Regex> = OnceLock::new();

/// scan `contents` for per-nucleus raw EFG tensors.
///
/// a nucleus marker opens a candidate, a later `Raw EFG matrix` line starts
/// collection, and the next three lines holding exactly three float tokens
/// each become the rows of the tensor. a fresh nucleus marker mid-block
/// abandons the unfinished block, and a block still open at EOF is dropped,
/// so a nucleus whose tensor can't be assembled is simply missing from the
/// map. never fails, whatever the input looks like
pub fn raw_matrices(contents: &str) -> HashMap<usize, EfgMatrix> {
    let float = ROW.get_or_init(|| Regex::new(r"([-]?\d+\.\d+)").unwrap());

    enum State {
        Idle,
        Armed { nucleus: usize },
        Collecting { nucleus: usize, rows: Vec<[f64; 3]> },
    }

    let mut ret = HashMap::new();
    let mut state = State::Idle;
    for line in contents.lines() {
        if let Some(n) = nucleus_marker(line) {
            // any in-progress block never finished
            state = State::Armed { nucleus: n };
            continue;
        }
        match &mut state {
            State::Idle => {}
            State::Armed { nucleus } => {
                if line.contains("Raw EFG matrix") {
                    let nucleus = *nucleus;
                    state = State::Collecting {
                        nucleus,
                        rows: Vec::new(),
                    };
                }
            }
            State::Collecting { nucleus, rows } => {
                if line.contains("Raw EFG matrix") {
                    rows.clear();
                    continue;
                }
                let toks: Vec<f64> = float
                    .captures_iter(line)
                    .filter_map(|cap| cap[1].parse().ok())
                    .collect();
                if toks.len() == 3 {
                    rows.push([toks[0], toks[1], toks[2]]);
                }
                if rows.len() == 3 {
                    #[rustfmt::skip]
                    let mat = Matrix3::new(
                        rows[0][0], rows[0][1], rows[0][2],
                        rows[1][0], rows[1][1], rows[1][2],
                        rows[2][0], rows[2][1], rows[2][2],
                    );
                    ret.insert(*nucleus, EfgMatrix(mat));
                    state = State::Idle;
                }
            }
        }
    }
    ret
}

static COUPLING: OnceLock<[Regex; 2]> = OnceLock::new();

/// scan `contents` for (e**2qQ, eta) pairs per hydrogen nucleus. the coupling
/// constant has to come before eta under the same nucleus, and a new nucleus
/// marker throws away a half-collected pair. the sign of e**2qQ is dropped
pub fn couplings(contents: &str) -> HashMap<usize, Coupling> {
    let [eqq_re, eta_re] = COUPLING.get_or_init(|| {
        [
            Regex::new(r"e\*\*2qQ\s+=\s+([-\d.]+)\s+MHz").unwrap(),
            Regex::new(r"eta\s+=\s+([-\d.]+)").unwrap(),
        ]
    });
    let mut ret = HashMap::new();
    let mut nucleus = None;
    let mut e2qq = None;
    for line in contents.lines() {
        if let Some(n) = nucleus_marker(line) {
            nucleus = Some(n);
            e2qq = None;
            continue;
        }
        let Some(n) = nucleus else {
            continue;
        };
        if let Some(cap) = eqq_re.captures(line) {
            e2qq = cap[1].parse::<f64>().ok().map(f64::abs);
        } else if let Some(cap) = eta_re.captures(line) {
            let (Some(e2qq_val), Ok(eta)) = (e2qq, cap[1].parse()) else {
                continue;
            };
            ret.insert(
                n,
                Coupling {
                    e2qq: e2qq_val,
                    eta,
                },
            );
            nucleus = None;
            e2qq = None;
        }
    }
    ret
}
