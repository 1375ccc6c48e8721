//! `section.key=value` overrides applied to the raw TOML before it is
//! deserialized.

use toml::{value::Table, Value};

use crate::config::ConfigError;

/// Splits `a.b.c=value` into its key path and value.  The value is read as a
/// TOML scalar when it parses as one and as a plain string otherwise.
pub(crate) fn parse_override(s: &str) -> Result<(Vec<String>, Value), ConfigError> {
    let (path, raw) = s
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidOverride(s.to_owned()))?;
    let path: Vec<String> = path.trim().split('.').map(str::to_owned).collect();
    if path.iter().any(String::is_empty) {
        return Err(ConfigError::InvalidOverride(s.to_owned()));
    }

    let raw = raw.trim();
    let value = toml::from_str::<Table>(&format!("v = {raw}"))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| Value::String(raw.to_owned()));
    Ok((path, value))
}

/// Sets `value` at `path`, creating intermediate tables as needed.
pub(crate) fn apply_override(
    path: &[String],
    value: Value,
    table: &mut Table,
) -> Result<(), ConfigError> {
    let Some((key, parents)) = path.split_last() else {
        return Err(ConfigError::InvalidOverride(String::new()));
    };

    let mut cur = table;
    for (i, seg) in parents.iter().enumerate() {
        let next = cur
            .entry(seg.clone())
            .or_insert(Value::Table(Table::new()));
        cur = next
            .as_table_mut()
            .ok_or_else(|| ConfigError::TraverseNonTable(path[..=i].join(".")))?;
    }
    cur.insert(key.clone(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override_values() {
        let (path, v) = parse_override("chain.num_delegates=5").unwrap();
        assert_eq!(path, vec!["chain", "num_delegates"]);
        assert_eq!(v, Value::Integer(5));

        let (_, v) = parse_override("logging.json_format = true").unwrap();
        assert_eq!(v, Value::Boolean(true));

        let (_, v) = parse_override("client.datadir=/var/lib/dexchain").unwrap();
        assert_eq!(v, Value::String("/var/lib/dexchain".to_owned()));

        assert!(parse_override("no-equals-sign").is_err());
        assert!(parse_override("chain..x=1").is_err());
    }

    #[test]
    fn test_apply_override_nested() {
        let mut table: Table = toml::from_str("[chain]\nnum_delegates = 3\nname = 1").unwrap();
        let (path, v) = parse_override("chain.forks.market_v2=100").unwrap();
        apply_override(&path, v, &mut table).unwrap();
        let (path, v) = parse_override("chain.num_delegates=9").unwrap();
        apply_override(&path, v, &mut table).unwrap();

        let chain = table["chain"].as_table().unwrap();
        assert_eq!(chain["num_delegates"], Value::Integer(9));
        assert_eq!(chain["forks"]["market_v2"], Value::Integer(100));

        let (path, v) = parse_override("chain.name.x=1").unwrap();
        assert!(matches!(
            apply_override(&path, v, &mut table),
            Err(ConfigError::TraverseNonTable(p)) if p == "chain.name"
        ));
    }
}
