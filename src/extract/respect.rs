use std::{path::Path, sync::OnceLock};

use regex::Regex;
use serde::Serialize;

use super::{basename, files_in, read_out, ExtractError};
use crate::table::{cell, Record};

/// principal values and tensor rows from one relativistic shielding output.
/// `sigma` holds SIGMA_11/22/33 in order; each row array is iso, x, y, z
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shielding {
    pub filename: String,
    pub sigma: [Option<f64>; 3],
    pub dia: Option<[f64; 4]>,
    pub para: Option<[f64; 4]>,
    pub sum: Option<[f64; 4]>,
}

static SHIELDING: OnceLock<([Regex; 3], [Regex; 3])> = OnceLock::new();

fn shielding_res() -> &'static ([Regex; 3], [Regex; 3]) {
    SHIELDING.get_or_init(|| {
        // looser than the orca float: bare leading dots and scientific
        // notation both appear in these tables
        const FLOAT: &str = r"([-+]?\d*\.?\d+(?:[eE][-+]?\d+)?)";
        let sigma = |name: &str| {
            Regex::new(&format!(r"{name}\s+{FLOAT}")).unwrap()
        };
        let row = |name: &str| {
            Regex::new(&format!(
                r"(?m)^\s*{name}\s+{FLOAT}\s+{FLOAT}\s+{FLOAT}\s+{FLOAT}"
            ))
            .unwrap()
        };
        (
            [sigma("SIGMA_11"), sigma("SIGMA_22"), sigma("SIGMA_33")],
            [row("DIA"), row("PARA"), row("SUM")],
        )
    })
}

/// shielding data for every file under `dir` whose name ends in `cs`.
/// restarted runs repeat the principal values, so the last SIGMA match
/// wins; the row table is printed once and the first match wins
pub fn shieldings(
    dir: impl AsRef<Path>,
) -> Result<Vec<Shielding>, ExtractError> {
    let (sigma_res, row_res) = shielding_res();
    let mut ret = Vec::new();
    for path in files_in(dir, |name| name.ends_with("cs"))? {
        let contents = read_out(&path)?;
        let last = |re: &Regex| {
            re.captures_iter(&contents)
                .last()
                .and_then(|cap| cap[1].parse().ok())
        };
        let first = |re: &Regex| -> Option<[f64; 4]> {
            let cap = re.captures(&contents)?;
            let mut vals = [0.0; 4];
            for (k, slot) in vals.iter_mut().enumerate() {
                *slot = cap[k + 1].parse().ok()?;
            }
            Some(vals)
        };
        ret.push(Shielding {
            filename: basename(&path),
            sigma: [
                last(&sigma_res[0]),
                last(&sigma_res[1]),
                last(&sigma_res[2]),
            ],
            dia: first(&row_res[0]),
            para: first(&row_res[1]),
            sum: first(&row_res[2]),
        });
    }
    Ok(ret)
}

impl Record for Shielding {
    fn headers() -> Vec<String> {
        crate::string![
            "Filename", "SIGMA_11", "SIGMA_22", "SIGMA_33", "DIA_iso",
            "DIA_x", "DIA_y", "DIA_z", "PARA_iso", "PARA_x", "PARA_y",
            "PARA_z", "SUM_iso", "SUM_x", "SUM_y", "SUM_z"
        ]
    }

    fn row(&self) -> Vec<String> {
        let mut ret = vec![self.filename.clone()];
        ret.extend(self.sigma.iter().map(|&s| cell(s)));
        for vals in [self.dia, self.para, self.sum] {
            match vals {
                Some(vals) => {
                    ret.extend(vals.iter().map(|v| v.to_string()));
                }
                None => {
                    ret.extend(std::iter::repeat(String::new()).take(4));
                }
            }
        }
        ret
    }
}
