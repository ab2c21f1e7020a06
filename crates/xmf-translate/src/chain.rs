//! MCMC chain and chi-squared readers.
//!
//! Chain files are whitespace (or comma) delimited with five parameter columns:
//! `mhalo_c mstellar_c lowmass_slope highmass_slope scatter`. Some runs wrote
//! a NaN scatter and spilled the real value onto the first field of the next
//! line, followed by four NaNs. [`parse_chain`] repairs that pattern before
//! dropping incomplete rows.

use std::path::Path;

use xmf_core::{Chain, Chi2Layout, Error, Result};

/// Parameter columns per chain row.
pub const CHAIN_COLUMNS: usize = 5;

/// Chain rows after repair, with bookkeeping for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChain {
    /// Complete rows in file order.
    pub rows: Vec<[f64; CHAIN_COLUMNS]>,
    /// Rows whose scatter was recovered from the following line.
    pub repaired: usize,
    /// Rows dropped because a field was still missing after repair.
    pub dropped: usize,
}

fn parse_field(token: Option<&str>) -> Option<f64> {
    token.and_then(|t| t.parse::<f64>().ok()).filter(|v| !v.is_nan())
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty())
}

/// Parse chain text, repairing spilled scatter values.
pub fn parse_chain(text: &str) -> Result<RawChain> {
    let mut rows: Vec<[Option<f64>; CHAIN_COLUMNS]> = Vec::new();
    for line in text.lines() {
        let mut tokens = split_fields(line).peekable();
        match tokens.peek() {
            None => continue,
            Some(t) if t.starts_with('#') => continue,
            Some(_) => {}
        }
        let row: [Option<f64>; CHAIN_COLUMNS] = std::array::from_fn(|_| parse_field(tokens.next()));
        rows.push(row);
    }

    let mut repaired = 0;
    for idx in 0..rows.len() {
        if rows[idx][4].is_none() && rows[idx][3].is_some() {
            let spilled = rows.get(idx + 1).ok_or_else(|| {
                Error::MalformedChain(format!(
                    "row {idx} is missing its scatter value and has no following row"
                ))
            })?[0];
            rows[idx][4] = spilled;
            repaired += 1;
        }
    }

    let total = rows.len();
    let complete: Vec<[f64; CHAIN_COLUMNS]> = rows
        .into_iter()
        .filter_map(|r| {
            let mut out = [0.0; CHAIN_COLUMNS];
            for (dst, src) in out.iter_mut().zip(r) {
                *dst = src?;
            }
            Some(out)
        })
        .collect();

    if complete.is_empty() {
        return Err(Error::MalformedChain(format!(
            "no complete rows left after repair ({total} rows read)"
        )));
    }

    Ok(RawChain { dropped: total - complete.len(), rows: complete, repaired })
}

/// Read and repair a chain file.
pub fn read_chain(path: impl AsRef<Path>) -> Result<RawChain> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::CatalogNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    let raw = parse_chain(&text)?;
    log::info!(
        "read chain {}: {} rows ({} repaired, {} dropped)",
        path.display(),
        raw.rows.len(),
        raw.repaired,
        raw.dropped
    );
    Ok(raw)
}

/// Parse chi-squared text: the first field of every non-empty line.
pub fn parse_chi2(text: &str) -> Result<Vec<f64>> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| split_fields(line).next().map(|t| (i, t)))
        .map(|(i, t)| {
            t.parse::<f64>().map_err(|_| {
                Error::Validation(format!("chi-squared line {}: cannot parse '{t}'", i + 1))
            })
        })
        .collect()
}

/// Re-order chi-squared values into chain-row order.
pub fn reorder_chi2(values: Vec<f64>, layout: Chi2Layout) -> Result<Vec<f64>> {
    match layout {
        Chi2Layout::RowOrder => Ok(values),
        Chi2Layout::ColumnMajor { rows, cols } => {
            if rows * cols != values.len() {
                return Err(Error::DimensionMismatch {
                    context: format!("chi-squared reshape to {rows}x{cols}"),
                    expected: rows * cols,
                    actual: values.len(),
                });
            }
            let mut out = Vec::with_capacity(values.len());
            for c in 0..cols {
                for r in 0..rows {
                    out.push(values[r * cols + c]);
                }
            }
            Ok(out)
        }
    }
}

/// Read a chi-squared file and put it in chain-row order.
pub fn read_chi2(path: impl AsRef<Path>, layout: Chi2Layout) -> Result<Vec<f64>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::CatalogNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    let values = reorder_chi2(parse_chi2(&text)?, layout)?;
    log::info!("read {} chi-squared values from {}", values.len(), path.display());
    Ok(values)
}

/// Read a chain and its chi-squared file into a [`Chain`].
pub fn read_chain_with_chi2(
    chain_path: impl AsRef<Path>,
    chi2_path: impl AsRef<Path>,
    layout: Chi2Layout,
) -> Result<Chain> {
    let raw = read_chain(chain_path)?;
    let chi2 = read_chi2(chi2_path, layout)?;
    let chain = Chain::from_parts(&raw.rows, &chi2)?;
    if chain.len() < raw.rows.len() {
        log::warn!("dropped {} draws with invalid chi-squared", raw.rows.len() - chain.len());
    }
    if chain.is_empty() {
        return Err(Error::MalformedChain("no valid draws after pairing with chi-squared".into()));
    }
    Ok(chain)
}
