use std::{path::Path, sync::OnceLock};

use nalgebra::DMatrix;
use regex::Regex;

use crate::extract::ExtractError;

/// vibrational frequencies and the normal-mode displacement matrix (3N rows,
/// one column per mode) from one frequency calculation
#[derive(Debug, Clone, PartialEq)]
pub struct Vibrations {
    pub freqs: Vec<f64>,
    pub displacements: DMatrix<f64>,
}

/// the frequency window treated as IR-active when ranking modes, in cm**-1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ModeRange {
    fn default() -> Self {
        Self {
            min: 800.0,
            max: 2700.0,
        }
    }
}

static FREQ: OnceLock<Regex> = OnceLock::new();

impl Vibrations {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let contents = crate::extract::read_out(path)?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// parse the `VIBRATIONAL FREQUENCIES` and `NORMAL MODES` sections of
    /// `contents`. `name` labels the errors
    pub fn parse(contents: &str, name: &str) -> Result<Self, ExtractError> {
        let freq_re = FREQ
            .get_or_init(|| Regex::new(r"^\s*(\d+):\s*([-\d.Ee]+)").unwrap());

        let mut freqs = Vec::new();
        let mut in_freqs = false;
        for line in contents.lines() {
            if line.contains("VIBRATIONAL FREQUENCIES") {
                in_freqs = true;
                continue;
            }
            if !in_freqs {
                continue;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.chars().all(|c| c == '-') {
                continue;
            }
            if let Some(cap) = freq_re.captures(line) {
                if let Ok(v) = cap[2].parse() {
                    freqs.push(v);
                }
            } else if !freqs.is_empty() {
                in_freqs = false;
            }
        }
        if freqs.is_empty() {
            return Err(ExtractError::MissingSection(
                name.to_owned(),
                "VIBRATIONAL FREQUENCIES",
            ));
        }

        let lines: Vec<&str> = contents.lines().collect();
        let n = lines.len();
        let mut i = 0;
        while i < n && !lines[i].contains("NORMAL MODES") {
            i += 1;
        }
        if i == n {
            return Err(ExtractError::MissingSection(
                name.to_owned(),
                "NORMAL MODES",
            ));
        }
        i += 1;
        // skip to the first column-header line
        while i < n && !starts_with_digit(lines[i]) {
            i += 1;
        }
        let mut blocks: Vec<Vec<Vec<f64>>> = Vec::new();
        let mut block_rows = None;
        while i < n && starts_with_digit(lines[i]) {
            // the column-header line itself
            i += 1;
            let mut data = Vec::new();
            while i < n && !lines[i].trim().is_empty() {
                let toks: Vec<&str> =
                    lines[i].split_whitespace().collect();
                // a line of bare integers is the next block's header
                if !data.is_empty()
                    && toks
                        .iter()
                        .all(|t| t.chars().all(|c| c.is_ascii_digit()))
                {
                    break;
                }
                data.push(lines[i]);
                i += 1;
            }
            let mut block = Vec::new();
            for line in data {
                let toks: Vec<&str> = line.split_whitespace().collect();
                if toks.len() < 2 {
                    continue;
                }
                // drop the row index
                let row: Vec<f64> =
                    toks[1..].iter().filter_map(|t| t.parse().ok()).collect();
                block.push(row);
            }
            if !block.is_empty() {
                match block_rows {
                    None => block_rows = Some(block.len()),
                    Some(r) if r != block.len() => {
                        return Err(ExtractError::InconsistentModes(
                            name.to_owned(),
                        ));
                    }
                    Some(_) => {}
                }
                blocks.push(block);
            }
            while i < n && lines[i].trim().is_empty() {
                i += 1;
            }
        }
        let Some(nrows) = block_rows else {
            return Err(ExtractError::MissingSection(
                name.to_owned(),
                "NORMAL MODES",
            ));
        };

        // stack the blocks side by side
        let mut cols: Vec<Vec<f64>> = Vec::new();
        for block in &blocks {
            let width = block[0].len();
            if block.iter().any(|row| row.len() != width) {
                return Err(ExtractError::InconsistentModes(name.to_owned()));
            }
            for c in 0..width {
                cols.push(block.iter().map(|row| row[c]).collect());
            }
        }
        let displacements =
            DMatrix::from_fn(nrows, cols.len(), |r, c| cols[c][r]);

        Ok(Self {
            freqs,
            displacements,
        })
    }

    /// the frequency of the dominant mode for 1-based `atom`: per-mode
    /// amplitude is the sum of squares of the atom's three displacement rows,
    /// modes are ranked by amplitude, and the best one inside `range` wins,
    /// falling back to the top of the ranking when none lands inside. `None`
    /// when the matrix has no rows for `atom`
    pub fn best_mode(&self, atom: usize, range: ModeRange) -> Option<f64> {
        let start = atom.checked_sub(1)? * 3;
        if start + 3 > self.displacements.nrows() {
            return None;
        }
        let nmodes = self.displacements.ncols().min(self.freqs.len());
        let mut amps: Vec<(usize, f64)> = (0..nmodes)
            .map(|j| {
                let amp = (start..start + 3)
                    .map(|r| self.displacements[(r, j)].powi(2))
                    .sum();
                (j, amp)
            })
            .collect();
        amps.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap());
        for &(j, _) in &amps {
            let freq = self.freqs[j];
            if range.min <= freq && freq <= range.max {
                return Some(freq);
            }
        }
        amps.first().map(|&(j, _)| self.freqs[j])
    }
}

fn starts_with_digit(line: &str) -> bool {
    line.trim_start().starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUT: &str = "\
-----------------------
VIBRATIONAL FREQUENCIES
-----------------------

Scaling factor for frequencies =  1.000000000

     0:         0.00 cm**-1
     1:         0.00 cm**-1
     2:       123.45 cm**-1
     3:       900.00 cm**-1
     4:      1500.50 cm**-1
     5:      3100.00 cm**-1

------------
NORMAL MODES
------------

These modes are in Cartesian coordinates

                  0          1          2
      0       0.100000   0.000000   0.000000
      1       0.000000   0.100000   0.000000
      2       0.000000   0.000000   0.100000
      3       0.000000   0.200000   0.000000
      4       0.000000   0.000000   0.900000
      5       0.300000   0.000000   0.000000
                  3          4          5
      0       0.000000   0.500000   0.000000
      1       0.000000   0.000000   0.000000
      2       0.400000   0.000000   0.000000
      3       0.000000   0.000000   0.800000
      4       0.700000   0.000000   0.000000
      5       0.000000   0.600000   0.000000

IR SPECTRUM
";

    #[test]
    fn blocks_stack_into_one_matrix() {
        let got = Vibrations::parse(OUT, "test").unwrap();
        assert_eq!(got.freqs.len(), 6);
        assert_eq!(got.displacements.nrows(), 6);
        assert_eq!(got.displacements.ncols(), 6);
        assert_eq!(got.displacements[(4, 2)], 0.9);
        assert_eq!(got.displacements[(0, 4)], 0.5);
        assert_eq!(got.freqs[3], 900.0);
    }

    #[test]
    fn best_mode_prefers_the_active_window() {
        let vibs = Vibrations::parse(OUT, "test").unwrap();
        let range = ModeRange::default();
        // atom 1's biggest amplitude is already in range
        assert_eq!(vibs.best_mode(1, range), Some(1500.5));
        // atom 2's two biggest sit outside the window
        assert_eq!(vibs.best_mode(2, range), Some(900.0));
    }

    #[test]
    fn best_mode_falls_back_to_the_top_amplitude() {
        let vibs = Vibrations::parse(OUT, "test").unwrap();
        let range = ModeRange {
            min: 4000.0,
            max: 5000.0,
        };
        assert_eq!(vibs.best_mode(1, range), Some(1500.5));
    }

    #[test]
    fn out_of_range_atoms_resolve_to_none() {
        let vibs = Vibrations::parse(OUT, "test").unwrap();
        assert_eq!(vibs.best_mode(0, ModeRange::default()), None);
        assert_eq!(vibs.best_mode(3, ModeRange::default()), None);
    }

    #[test]
    fn missing_sections_are_errors() {
        let text = "FINAL SINGLE POINT ENERGY      -76.0\n";
        assert_eq!(
            Vibrations::parse(text, "x"),
            Err(ExtractError::MissingSection("x".into(), "VIBRATIONAL FREQUENCIES"))
        );
        let text = "\
VIBRATIONAL FREQUENCIES
     0:       100.00 cm**-1
";
        assert_eq!(
            Vibrations::parse(text, "x"),
            Err(ExtractError::MissingSection("x".into(), "NORMAL MODES"))
        );
    }
}
