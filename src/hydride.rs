use std::{error::Error, fmt::Display};

/// a hydride-index table cell: groups of 1-based nucleus indices, `;` between
/// groups and `,` within one, or `,` for both levels when no `;` appears
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrideGroups {
    pub groups: Vec<Vec<usize>>,
    sep: char,
}

/// a cell that should have held hydride indices but didn't parse
#[derive(Debug, PartialEq, Eq)]
pub struct BadHydrideCell(pub String);

impl Display for BadHydrideCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for BadHydrideCell {}

impl HydrideGroups {
    /// parse one table cell. empty and `n/a` cells are `Ok(None)`; the group
    /// separator is `;` when the cell contains one and `,` otherwise, and
    /// empty tokens between separators are skipped
    pub fn parse_cell(cell: &str) -> Result<Option<Self>, BadHydrideCell> {
        let cell = cell.trim();
        if cell.is_empty() || cell.eq_ignore_ascii_case("n/a") {
            return Ok(None);
        }
        let sep = if cell.contains(';') { ';' } else { ',' };
        let mut groups = Vec::new();
        for group in cell.split(sep) {
            let mut indices = Vec::new();
            for tok in group.split(',') {
                let tok = tok.trim();
                if tok.is_empty() {
                    continue;
                }
                match tok.parse() {
                    Ok(i) => indices.push(i),
                    Err(_) => {
                        return Err(BadHydrideCell(cell.to_owned()));
                    }
                }
            }
            if !indices.is_empty() {
                groups.push(indices);
            }
        }
        Ok(Some(Self { groups, sep }))
    }

    /// map every index through `f` and rebuild the cell with the separators
    /// it came with
    pub fn render(&self, mut f: impl FnMut(usize) -> String) -> String {
        let groups: Vec<String> = self
            .groups
            .iter()
            .map(|g| g.iter().map(|&i| f(i)).collect::<Vec<_>>().join(","))
            .collect();
        groups.join(&self.sep.to_string())
    }
}
