use std::{fs, path::Path};

use crate::extract::{basename, files_in, ExtractError};

/// SLURM script written into each job folder, with `{{.filename}}` and
/// `{{.charge}}` substituted per structure: xtb preoptimization, then the
/// conformer search on the optimized geometry
pub const DEFAULT_TEMPLATE: &str = "#!/bin/bash
#SBATCH --nodes=1
#SBATCH --mem=24GB
#SBATCH --ntasks=1
#SBATCH --cpus-per-task 48
#SBATCH --partition=genoa
#SBATCH --time=48:00:00
#SBATCH -J CREST

~/bin/xtb {{.filename}} --gfn2 --chrg {{.charge}} --opt -T 48 > xtb_output.log
~/bin/crest xtbopt.xyz --gfn2 --chrg {{.charge}} -T 48 > crest_output.log
";

fn write_err(path: &Path, e: std::io::Error) -> ExtractError {
    ExtractError::WriteFileError(path.display().to_string(), e.kind())
}

/// turn every `.xyz` in `folder` into a submittable job folder: a
/// subdirectory named after the stem, holding `run_crest.sh` rendered from
/// `template` and the structure file itself. returns the number of jobs
/// prepared
pub fn prep(
    folder: impl AsRef<Path>,
    charge: isize,
    template: &str,
) -> Result<usize, ExtractError> {
    let folder = folder.as_ref();
    let xyzs = files_in(folder, |name| name.ends_with(".xyz"))?;
    for path in &xyzs {
        let name = basename(path);
        let stem = name.strip_suffix(".xyz").unwrap_or(&name);
        let job_dir = folder.join(stem);
        fs::create_dir_all(&job_dir).map_err(|e| write_err(&job_dir, e))?;
        let script = template
            .replace("{{.filename}}", &name)
            .replace("{{.charge}}", &charge.to_string());
        let script_path = job_dir.join("run_crest.sh");
        fs::write(&script_path, script)
            .map_err(|e| write_err(&script_path, e))?;
        let new_path = job_dir.join(&name);
        fs::rename(path, &new_path).map_err(|e| write_err(&new_path, e))?;
    }
    Ok(xyzs.len())
}

/// copy each finished job's `crest_best.xyz` out of `crest_folder` into
/// `dest` as `{job}.xyz`. jobs without a best conformer yet are skipped.
/// returns the number collected
pub fn collect(
    crest_folder: impl AsRef<Path>,
    dest: impl AsRef<Path>,
) -> Result<usize, ExtractError> {
    let crest_folder = crest_folder.as_ref();
    let dest = dest.as_ref();
    fs::create_dir_all(dest).map_err(|e| write_err(dest, e))?;
    let entries = fs::read_dir(crest_folder).map_err(|e| {
        let name = crest_folder.display().to_string();
        match e.kind() {
            std::io::ErrorKind::NotFound => ExtractError::FileNotFound(name),
            k => ExtractError::ReadFileError(name, k),
        }
    })?;
    let mut dirs: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    let mut collected = 0;
    for dir in dirs {
        let best = dir.join("crest_best.xyz");
        if !best.is_file() {
            continue;
        }
        let target = dest.join(format!("{}.xyz", basename(&dir)));
        fs::copy(&best, &target).map_err(|e| write_err(&target, e))?;
        collected += 1;
    }
    Ok(collected)
}
