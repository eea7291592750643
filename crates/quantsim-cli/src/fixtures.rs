//! Local CSV fixture loading for the CLI's `MarketDataProvider`.

use anyhow::{bail, Context, Result};
use quantsim_core::bar::Bar;
use quantsim_core::data::InMemoryProvider;
use std::path::Path;

/// Load one `InMemoryProvider` from a directory of `<SYMBOL>.csv` files,
/// each with a header row and `ts,open,high,low,close,volume` columns
/// (`ts`: Unix seconds).
pub fn load_fixture_dir(dir: &Path) -> Result<InMemoryProvider> {
    let mut provider = InMemoryProvider::default();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading fixture directory {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let symbol = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let bars =
            load_bar_csv(&path).with_context(|| format!("parsing fixture {}", path.display()))?;
        provider.insert(symbol, bars);
    }

    Ok(provider)
}

fn load_bar_csv(path: &Path) -> Result<Vec<Bar>> {
    let contents = std::fs::read_to_string(path)?;
    let mut bars = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        if line_no == 0 || line.trim().is_empty() {
            continue; // header row
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 6 {
            bail!(
                "line {} has {} fields, expected 6 (ts,open,high,low,close,volume)",
                line_no + 1,
                fields.len()
            );
        }
        let ts: i64 = fields[0].trim().parse()?;
        let open: f64 = fields[1].trim().parse()?;
        let high: f64 = fields[2].trim().parse()?;
        let low: f64 = fields[3].trim().parse()?;
        let close: f64 = fields[4].trim().parse()?;
        let volume: f64 = fields[5].trim().parse()?;
        bars.push(Bar::new(ts, open, high, low, close, volume));
    }

    bars.sort_by_key(|b| b.ts);
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantsim_core::data::MarketDataProvider;
    use std::io::Write;

    #[test]
    fn loads_a_single_symbol_csv() {
        let dir =
            std::env::temp_dir().join(format!("quantsim-fixture-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut file = std::fs::File::create(dir.join("AAA.csv")).unwrap();
        writeln!(file, "ts,open,high,low,close,volume").unwrap();
        writeln!(file, "0,100,101,99,100,1000").unwrap();
        writeln!(file, "1,100,106,99,105,1200").unwrap();
        drop(file);

        let provider = load_fixture_dir(&dir).unwrap();
        let bars = provider
            .load_bars(
                &["AAA".to_string()],
                chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
                chrono::NaiveDate::from_ymd_opt(1970, 1, 2).unwrap(),
                "1d",
            )
            .unwrap();
        assert_eq!(bars["AAA"].len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_row_reports_a_readable_error() {
        let dir = std::env::temp_dir()
            .join(format!("quantsim-fixture-test-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut file = std::fs::File::create(dir.join("BAD.csv")).unwrap();
        writeln!(file, "ts,open,high,low,close,volume").unwrap();
        writeln!(file, "0,100,101").unwrap();
        drop(file);

        let result = load_fixture_dir(&dir);
        assert!(result.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
