use std::{path::Path, sync::OnceLock};

use regex::Regex;
use serde::Serialize;

use super::{files_in, read_out, ExtractError};
use crate::table::Record;

/// one LP(O) -> BD*(C-P) donor-acceptor entry from the second order
/// perturbation theory analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Perturbation {
    pub filename: String,
    pub lp: usize,
    pub o: usize,
    pub c: usize,
    pub p: usize,
    pub e2: f64,
}

static ENTRY: OnceLock<Regex> = OnceLock::new();

fn entry_re() -> &'static Regex {
    ENTRY.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^\s*\d+\.\s+LP\s*\(\s*(?P<lp>\d+)\)\s*O\s*(?P<o>\d+)
            \s+\d+\.\s+BD\*\(\s*1\)\s*
            (?: # the printed bond can carry its atoms in either order
              C\s*(?P<c1>\d+)-\s*P\s*(?P<p1>\d+)
              | P\s*(?P<p2>\d+)-\s*C\s*(?P<c2>\d+)
            )
            \s+(?P<e2>[0-9]+\.?[0-9]*)\s+[0-9]+\.?[0-9]*\s+[0-9]+\.?[0-9]*
            ",
        )
        .unwrap()
    })
}

/// parse one NBO output for LP(O) -> BD*(C-P) entries, in file order. only
/// the first perturbation section is read; a trimmed line starting with
/// `---` or `Total` closes it
pub fn perturbations(
    path: impl AsRef<Path>,
) -> Result<Vec<Perturbation>, ExtractError> {
    let path = path.as_ref();
    let contents = read_out(path)?;
    let filename = path
        .file_stem()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();
    let re = entry_re();
    let mut ret = Vec::new();
    let mut in_section = false;
    for line in contents.lines() {
        if line.contains("SECOND ORDER PERTURBATION THEORY ANALYSIS") {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        if line.trim().is_empty() || line.starts_with(" within unit") {
            continue;
        }
        let trimmed = line.trim_start();
        if trimmed.starts_with("---") || trimmed.starts_with("Total") {
            break;
        }
        let Some(cap) = re.captures(line) else {
            continue;
        };
        let grab = |name: &str| {
            cap.name(name)
                .and_then(|m| m.as_str().parse::<usize>().ok())
        };
        let (Some(lp), Some(o)) = (grab("lp"), grab("o")) else {
            continue;
        };
        let (c, p) = match (grab("c1"), grab("p1")) {
            (Some(c), Some(p)) => (c, p),
            _ => match (grab("p2"), grab("c2")) {
                (Some(p), Some(c)) => (c, p),
                _ => continue,
            },
        };
        let Some(e2) =
            cap.name("e2").and_then(|m| m.as_str().parse().ok())
        else {
            continue;
        };
        ret.push(Perturbation {
            filename: filename.clone(),
            lp,
            o,
            c,
            p,
            e2,
        });
    }
    Ok(ret)
}

/// [`perturbations`] over every `.out` file under `dir`, concatenated in
/// filename order
pub fn all_perturbations(
    dir: impl AsRef<Path>,
) -> Result<Vec<Perturbation>, ExtractError> {
    let mut ret = Vec::new();
    for path in files_in(dir, |name| name.ends_with(".out"))? {
        ret.extend(perturbations(&path)?);
    }
    Ok(ret)
}

impl Record for Perturbation {
    fn headers() -> Vec<String> {
        crate::string!["Filename", "lp_num", "o_idx", "c_idx", "p_idx", "E2"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.filename.clone(),
            self.lp.to_string(),
            self.o.to_string(),
            self.c.to_string(),
            self.p.to_string(),
            self.e2.to_string(),
        ]
    }
}
