use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use log::{info, warn};
use rayon::prelude::*;

use crate::{
    efg::{self, Coupling, EfgMatrix},
    extract::{files_in, read_out, ExtractError},
    freq::{ModeRange, Vibrations},
    hydride::HydrideGroups,
    table::Table,
};

/// the seam between the row driver and one per-hydride data source: how to
/// load a whole output file once, and how to answer for a single nucleus out
/// of the loaded data
pub trait HydrideResolver: Sync {
    type Data: Send;

    fn load(&self, path: &Path) -> Result<Self::Data, ExtractError>;

    /// the formatted value for `nucleus` in the output program's own
    /// numbering, `None` when the data holds nothing for it
    fn resolve(&self, data: &Self::Data, nucleus: usize) -> Option<String>;

    /// appended to the source column name to name the output column
    fn suffix(&self) -> &str;

    /// the sentinel written for an unresolvable index
    fn absent(&self) -> &str {
        "N/A"
    }
}

/// canonical EFG orientations per nucleus
pub struct Orientations;

impl HydrideResolver for Orientations {
    type Data = HashMap<usize, EfgMatrix>;

    fn load(&self, path: &Path) -> Result<Self::Data, ExtractError> {
        Ok(efg::raw_matrices(&read_out(path)?))
    }

    fn resolve(&self, data: &Self::Data, nucleus: usize) -> Option<String> {
        data.get(&nucleus).map(|mat| mat.orientation().to_string())
    }

    fn suffix(&self) -> &str {
        "orientations"
    }
}

/// quadrupole coupling constants per nucleus, paired with eta on request
pub struct Couplings {
    pub with_eta: bool,
}

impl HydrideResolver for Couplings {
    type Data = HashMap<usize, Coupling>;

    fn load(&self, path: &Path) -> Result<Self::Data, ExtractError> {
        Ok(efg::couplings(&read_out(path)?))
    }

    fn resolve(&self, data: &Self::Data, nucleus: usize) -> Option<String> {
        data.get(&nucleus).map(|c| {
            if self.with_eta {
                format!("({:.6},{:.6})", c.e2qq, c.eta)
            } else {
                format!("{:.6}", c.e2qq)
            }
        })
    }

    fn suffix(&self) -> &str {
        if self.with_eta {
            "e2qQ_eta"
        } else {
            "e2qQ"
        }
    }

    fn absent(&self) -> &str {
        if self.with_eta {
            "(N/A,N/A)"
        } else {
            "N/A"
        }
    }
}

/// dominant vibrational-mode frequencies per nucleus
pub struct BestModes {
    pub range: ModeRange,
}

impl HydrideResolver for BestModes {
    type Data = Vibrations;

    fn load(&self, path: &Path) -> Result<Self::Data, ExtractError> {
        Vibrations::load(path)
    }

    fn resolve(&self, data: &Self::Data, nucleus: usize) -> Option<String> {
        // best_mode counts atoms from one; the driver already shifted
        // `nucleus` down to the program's zero-based numbering
        data.best_mode(nucleus + 1, self.range)
            .map(|f| format!("{f:.2}"))
    }

    fn suffix(&self) -> &str {
        "modes"
    }
}

/// the output file backing structure file `xyz_name` in `folder`: first the
/// exact `stem_input.inp.out` transform, then the first `.out` file whose
/// name starts with the stem. older runs named their outputs loosely, so
/// both layouts have to keep working
pub fn out_file_for(folder: &Path, xyz_name: &str) -> Option<PathBuf> {
    let stem = xyz_name.strip_suffix(".xyz").unwrap_or(xyz_name);
    let exact = folder.join(format!("{stem}_input.inp.out"));
    if exact.is_file() {
        return Some(exact);
    }
    files_in(folder, |name| {
        name.starts_with(stem) && name.ends_with(".out")
    })
    .ok()?
    .into_iter()
    .next()
}

/// the hydride columns processed when the caller names none
pub fn default_hydride_cols(table: &Table) -> Vec<String> {
    table
        .headers
        .iter()
        .filter(|h| h.contains("Hydrides"))
        .cloned()
        .collect()
}

/// apply `resolver` to every hydride column of `table`, one output file per
/// row, and return the table with one new column per processed hydride
/// column.
///
/// the filename column is `Filename`, or `Basename` when the table has no
/// `Filename` header. rows whose output file is missing or unloadable are
/// warned about and keep empty new cells, as do unparseable hydride cells.
/// table indices are 1-based and the output program numbers nuclei from
/// zero, so every index is shifted down by one before resolution. rows are
/// independent and run in parallel; the output keeps the input row order
pub fn resolve_table<R: HydrideResolver>(
    table: &Table,
    hydride_cols: &[String],
    folder: impl AsRef<Path>,
    resolver: &R,
) -> Result<Table, ExtractError> {
    let folder = folder.as_ref();
    let name_col = table
        .column("Filename")
        .or_else(|| table.column("Basename"))
        .ok_or_else(|| {
            ExtractError::BadTable(String::from(
                "no Filename or Basename column",
            ))
        })?;
    let mut cols = Vec::new();
    for name in hydride_cols {
        match table.column(name) {
            Some(c) => cols.push((name.as_str(), c)),
            None => warn!("no column named {name}, skipping"),
        }
    }

    let new_cells: Vec<Vec<String>> = table
        .rows
        .par_iter()
        .map(|row| {
            let empty = || vec![String::new(); cols.len()];
            let fname = row[name_col].trim();
            if fname.is_empty() {
                return empty();
            }
            let Some(path) = out_file_for(folder, fname) else {
                warn!("no output file for {fname}, skipping");
                return empty();
            };
            let data = match resolver.load(&path) {
                Ok(data) => data,
                Err(e) => {
                    warn!("failed to load {}: {e}", path.display());
                    return empty();
                }
            };
            cols.iter()
                .map(|&(name, c)| {
                    match HydrideGroups::parse_cell(&row[c]) {
                        Ok(Some(groups)) => groups.render(|i| {
                            i.checked_sub(1)
                                .and_then(|n| resolver.resolve(&data, n))
                                .unwrap_or_else(|| {
                                    resolver.absent().to_owned()
                                })
                        }),
                        Ok(None) => String::new(),
                        Err(e) => {
                            warn!("{fname}, column {name}: {e}");
                            String::new()
                        }
                    }
                })
                .collect()
        })
        .collect();

    info!(
        "resolved {} columns over {} rows",
        cols.len(),
        table.rows.len()
    );
    let mut ret = table.clone();
    for (k, &(name, _)) in cols.iter().enumerate() {
        ret.push_column(
            format!("{name}_{}", resolver.suffix()),
            new_cells.iter().map(|row| row[k].clone()).collect(),
        );
    }
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_files_match_exactly_then_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        for name in
            ["mu1_input.inp.out", "mu2_restart.out", "mu2_scan.out", "mu2.xyz"]
        {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        assert_eq!(
            out_file_for(dir.path(), "mu1.xyz"),
            Some(dir.path().join("mu1_input.inp.out"))
        );
        // no exact transform for mu2, so the first matching .out wins
        assert_eq!(
            out_file_for(dir.path(), "mu2.xyz"),
            Some(dir.path().join("mu2_restart.out"))
        );
        assert_eq!(out_file_for(dir.path(), "mu3.xyz"), None);
    }

    #[test]
    fn coupling_cells_format_with_and_without_eta() {
        let data = HashMap::from([(
            3,
            Coupling {
                e2qq: 0.168,
                eta: 0.9398,
            },
        )]);
        let plain = Couplings { with_eta: false };
        assert_eq!(plain.resolve(&data, 3), Some("0.168000".to_owned()));
        assert_eq!(plain.resolve(&data, 4), None);
        assert_eq!(plain.absent(), "N/A");
        let eta = Couplings { with_eta: true };
        assert_eq!(
            eta.resolve(&data, 3),
            Some("(0.168000,0.939800)".to_owned())
        );
        assert_eq!(eta.absent(), "(N/A,N/A)");
    }

    #[test]
    fn best_mode_cells_shift_back_to_one_based_atoms() {
        let out = "\
VIBRATIONAL FREQUENCIES
     0:       900.00 cm**-1
     1:      3100.00 cm**-1

NORMAL MODES
                  0          1
      0       0.100000   0.900000
      1       0.000000   0.000000
      2       0.000000   0.000000

done
";
        let vibs = Vibrations::parse(out, "test").unwrap();
        let modes = BestModes {
            range: ModeRange::default(),
        };
        // nucleus 0 is atom 1
        assert_eq!(modes.resolve(&vibs, 0), Some("900.00".to_owned()));
        assert_eq!(modes.resolve(&vibs, 1), None);
    }
}
