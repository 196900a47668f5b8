use std::{path::Path, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{basename, files_in, read_out, ExtractError};
use crate::table::{cell, Record};

/// last-printed electronic and Gibbs energies of one output file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Energy {
    pub filename: String,
    pub electronic: Option<f64>,
    pub gibbs: Option<f64>,
}

static ENERGY: OnceLock<[Regex; 2]> = OnceLock::new();

/// the last `FINAL SINGLE POINT ENERGY` and `Final Gibbs free energy` in
/// every `.out` file under `dir`. restarted or composite jobs print several,
/// and the last one is the converged result
pub fn energies(dir: impl AsRef<Path>) -> Result<Vec<Energy>, ExtractError> {
    let [elec_re, gibbs_re] = ENERGY.get_or_init(|| {
        [
            Regex::new(r"FINAL SINGLE POINT ENERGY\s+(-?\d+\.\d+)").unwrap(),
            Regex::new(r"Final Gibbs free energy\s+.*?(-?\d+\.\d+)\s+Eh")
                .unwrap(),
        ]
    });
    let mut ret = Vec::new();
    for path in files_in(dir, |name| name.ends_with(".out"))? {
        let contents = read_out(&path)?;
        let last = |re: &Regex| {
            re.captures_iter(&contents)
                .last()
                .and_then(|cap| cap[1].parse().ok())
        };
        ret.push(Energy {
            filename: basename(&path),
            electronic: last(elec_re),
            gibbs: last(gibbs_re),
        });
    }
    Ok(ret)
}

impl Record for Energy {
    fn headers() -> Vec<String> {
        crate::string!["Filename", "Electronic Energy", "Free Energy"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.filename.clone(),
            cell(self.electronic),
            cell(self.gibbs),
        ]
    }
}

/// frontier orbital energies (eV) from the last ORBITAL ENERGIES section of
/// one output file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gap {
    pub filename: String,
    pub homo: Option<f64>,
    pub lumo: Option<f64>,
    pub gap: Option<f64>,
}

/// HOMO/LUMO/gap for every `.out` file under `dir`. only the last ORBITAL
/// ENERGIES section counts, occupations are matched literally (`1.0000`
/// occupied, `0.0000` empty), and scanning stops at `SPIN DOWN ORBITALS` so
/// unrestricted outputs use the spin-up block
pub fn gaps(dir: impl AsRef<Path>) -> Result<Vec<Gap>, ExtractError> {
    let mut ret = Vec::new();
    for path in files_in(dir, |name| name.ends_with(".out"))? {
        let contents = read_out(&path)?;
        let (homo, lumo) = homo_lumo(&contents);
        ret.push(Gap {
            filename: basename(&path),
            homo,
            lumo,
            gap: homo.zip(lumo).map(|(h, l)| l - h),
        });
    }
    Ok(ret)
}

static ORBITAL: OnceLock<Regex> = OnceLock::new();

fn homo_lumo(contents: &str) -> (Option<f64>, Option<f64>) {
    let orbital_re = ORBITAL.get_or_init(|| {
        Regex::new(r"^\s*\d+\s+([01]\.0000)\s+-?\d+\.\d+\s+(-?\d+\.\d+)")
            .unwrap()
    });
    let lines: Vec<&str> = contents.lines().collect();
    let Some(last) =
        lines.iter().rposition(|l| l.contains("ORBITAL ENERGIES"))
    else {
        return (None, None);
    };
    let mut j = last + 1;
    while j < lines.len() && lines[j].trim().is_empty() {
        j += 1;
    }
    // the header's own closing dashes
    if j < lines.len() && lines[j].contains("----------") {
        j += 1;
    }
    let mut homo = None;
    let mut lumo = None;
    for line in &lines[j..] {
        if line.contains("SPIN DOWN ORBITALS") || line.contains("----------")
        {
            break;
        }
        let Some(cap) = orbital_re.captures(line) else {
            continue;
        };
        let Ok(energy) = cap[2].parse::<f64>() else {
            continue;
        };
        if &cap[1] == "1.0000" {
            homo = Some(energy);
        } else if homo.is_some() {
            lumo = Some(energy);
            break;
        }
    }
    (homo, lumo)
}

impl Record for Gap {
    fn headers() -> Vec<String> {
        crate::string![
            "Filename",
            "HOMO (eV)",
            "LUMO (eV)",
            "HOMO-LUMO Gap (eV)"
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.filename.clone(),
            cell(self.homo),
            cell(self.lumo),
            cell(self.gap),
        ]
    }
}

/// reference shielding values subtracted from one matrix row kind, in the
/// printed order v1, v2, v3, iso
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRefs {
    #[serde(rename = "sDSO")]
    pub sdso: [f64; 4],
    #[serde(rename = "sPSO")]
    pub spso: [f64; 4],
    #[serde(rename = "Total")]
    pub total: [f64; 4],
}

impl Default for ShiftRefs {
    /// the phosphine standards the group measured against
    fn default() -> Self {
        Self {
            sdso: [962.856, 965.926, 971.039, 966.607],
            spso: [-758.375, -760.021, -551.868, -690.088],
            total: [204.480, 205.905, 419.171, 276.519],
        }
    }
}

/// which reference table applies: `bea` for filenames containing `bea` in
/// any case, `std` for the rest. both default to the same standard set; a
/// toml file can override either
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftRefConfig {
    pub std: ShiftRefs,
    pub bea: ShiftRefs,
}

impl ShiftRefConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let contents = read_out(path)?;
        toml::from_str(&contents).map_err(|e| {
            ExtractError::BadConfig(format!("{}: {e}", path.display()))
        })
    }
}

/// reference-minus-observed shielding differences for one phosphorus nucleus
/// block, one array per matrix row kind, `None` when the row never appeared
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shift {
    pub filename: String,
    pub sdso: Option<[f64; 4]>,
    pub spso: Option<[f64; 4]>,
    pub total: Option<[f64; 4]>,
}

static SHIFT: OnceLock<(Regex, [Regex; 3])> = OnceLock::new();

fn shift_res() -> &'static (Regex, [Regex; 3]) {
    SHIFT.get_or_init(|| {
        const FLOAT: &str = r"([-+]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)";
        let row = |name: &str| {
            Regex::new(&format!(
                r"{name}\s+{FLOAT}\s+{FLOAT}\s+{FLOAT}\s+iso=\s+{FLOAT}"
            ))
            .unwrap()
        };
        (
            Regex::new(r"(?m)^\s*-+\s*\n\s*Nucleus\s+\d{1,3}P\s*:\s*\n\s*-+")
                .unwrap(),
            [row("sDSO"), row("sPSO"), row("Total")],
        )
    })
}

/// phosphorus shift differences for every `.out` file under `dir`, one
/// record per `Nucleus NP` block. files without phosphorus are skipped
pub fn shifts(
    dir: impl AsRef<Path>,
    config: &ShiftRefConfig,
) -> Result<Vec<Shift>, ExtractError> {
    let (header_re, row_res) = shift_res();
    let mut ret = Vec::new();
    for path in files_in(dir, |name| name.ends_with(".out"))? {
        let contents = read_out(&path)?;
        let starts: Vec<usize> =
            header_re.find_iter(&contents).map(|m| m.start()).collect();
        if starts.is_empty() {
            continue;
        }
        let name = basename(&path);
        let refs = if name.to_lowercase().contains("bea") {
            &config.bea
        } else {
            &config.std
        };
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(contents.len());
            let chunk = &contents[start..end];
            let diff = |re: &Regex, refs: &[f64; 4]| -> Option<[f64; 4]> {
                let cap = re.captures(chunk)?;
                let mut vals = [0.0; 4];
                for (k, slot) in vals.iter_mut().enumerate() {
                    *slot = refs[k] - cap[k + 1].parse::<f64>().ok()?;
                }
                Some(vals)
            };
            ret.push(Shift {
                filename: name.clone(),
                sdso: diff(&row_res[0], &refs.sdso),
                spso: diff(&row_res[1], &refs.spso),
                total: diff(&row_res[2], &refs.total),
            });
        }
    }
    Ok(ret)
}

impl Record for Shift {
    fn headers() -> Vec<String> {
        crate::string![
            "Filename",
            "d_sDSO_v1",
            "d_sDSO_v2",
            "d_sDSO_v3",
            "d_sDSO_iso",
            "d_sPSO_v1",
            "d_sPSO_v2",
            "d_sPSO_v3",
            "d_sPSO_iso",
            "d_Total_v1",
            "d_Total_v2",
            "d_Total_v3",
            "d_Total_iso"
        ]
    }

    fn row(&self) -> Vec<String> {
        let mut ret = vec![self.filename.clone()];
        for vals in [self.sdso, self.spso, self.total] {
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

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn energies_take_the_last_match() {
        let got = energies("testfiles/outs").unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].filename, "acid1_input.inp.out");
        assert_eq!(got[0].electronic, Some(-152.234567));
        assert_eq!(got[0].gibbs, Some(-152.123456));
        assert_eq!(got[1].filename, "acid2_input.inp.out");
        assert_eq!(got[1].electronic, Some(-76.4));
        assert_eq!(got[1].gibbs, None);
    }

    #[test]
    fn gaps_use_the_last_orbital_section() {
        let got = gaps("testfiles/outs").unwrap();
        let acid1 = &got[0];
        assert_abs_diff_eq!(acid1.homo.unwrap(), -28.4033);
        assert_abs_diff_eq!(acid1.lumo.unwrap(), 3.2654);
        assert_abs_diff_eq!(acid1.gap.unwrap(), 31.6687, epsilon = 1e-9);
        // closed-shell occupations (2.0000) never match
        let acid2 = &got[1];
        assert_eq!(acid2.homo, None);
        assert_eq!(acid2.gap, None);
    }

    #[test]
    fn shifts_subtract_the_matching_reference() {
        let config = ShiftRefConfig {
            bea: ShiftRefs {
                sdso: [1.0, 2.0, 3.0, 4.0],
                spso: [5.0, 6.0, 7.0, 8.0],
                total: [9.0, 10.0, 11.0, 12.0],
            },
            ..Default::default()
        };
        let got = shifts("testfiles/nmr", &config).unwrap();
        assert_eq!(got.len(), 2);
        // adduct_BEA.out picks the bea table; its rows are all zeros, so the
        // differences are the references themselves. sPSO is absent
        assert_eq!(got[0].filename, "adduct_BEA.out");
        assert_eq!(got[0].sdso, Some([1.0, 2.0, 3.0, 4.0]));
        assert_eq!(got[0].spso, None);
        assert_eq!(got[0].total, Some([9.0, 10.0, 11.0, 12.0]));
        // sample.out's values equal the std references exactly
        assert_eq!(got[1].filename, "sample.out");
        assert_eq!(got[1].sdso, Some([0.0; 4]));
        assert_eq!(got[1].spso, Some([0.0; 4]));
        assert_eq!(got[1].total, Some([0.0; 4]));
    }

    #[test]
    fn shift_refs_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.toml");
        std::fs::write(
            &path,
            "[bea]\n\
	     sDSO = [1.0, 2.0, 3.0, 4.0]\n\
	     sPSO = [5.0, 6.0, 7.0, 8.0]\n\
	     Total = [9.0, 10.0, 11.0, 12.0]\n",
        )
        .unwrap();
        let config = ShiftRefConfig::load(&path).unwrap();
        assert_eq!(config.std, ShiftRefs::default());
        assert_eq!(config.bea.sdso, [1.0, 2.0, 3.0, 4.0]);
    }
}
