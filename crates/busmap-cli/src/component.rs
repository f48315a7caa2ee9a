//! Loads a `component.json5`'s flat port list (spec §6 input port format).
//!
//! A port is encoded as a name mapped to a signed integer `pw`: `|pw|` is
//! the width, `sign(pw)` is the direction (`+1` input, `-1` output). Width
//! may be `None` when a parametric port's value isn't a plain integer (e.g.
//! a `WIDTH-1`-style expression string); direction is still recovered from
//! a leading `-` in that case.
//!
//! The original tool nests the port map under `definitions.ports`; we also
//! accept a bare top-level `ports` key since spec §6 doesn't commit to one
//! shape and both are easy to support.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use busmap_core::{Direction, Port};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, Default)]
struct ComponentDoc {
    #[serde(default)]
    definitions: Option<Definitions>,
    #[serde(default)]
    ports: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Deserialize, Default)]
struct Definitions {
    #[serde(default)]
    ports: Option<BTreeMap<String, Value>>,
}

/// Read and parse a `component.json5` file into the flat [`Port`] list the
/// inference engine consumes.
pub fn load_ports(path: &Path) -> Result<Vec<Port>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading component file `{}`", path.display()))?;
    let doc: ComponentDoc = json5::from_str(&text)
        .with_context(|| format!("parsing component file `{}` as JSON5", path.display()))?;
    let raw_ports = doc.definitions.and_then(|d| d.ports).or(doc.ports).with_context(|| {
        format!("`{}` has no top-level `ports` or `definitions.ports` key", path.display())
    })?;

    let mut ports = Vec::with_capacity(raw_ports.len());
    for (name, value) in raw_ports {
        let (width, direction) = parse_signed_width(&value);
        ports.push(Port::new(name, width, direction));
    }
    Ok(ports)
}

fn parse_signed_width(value: &Value) -> (Option<u32>, Direction) {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(pw) => Direction::from_signed_width(pw),
            None => (None, Direction::In),
        },
        Value::String(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<i64>() {
                Ok(pw) => Direction::from_signed_width(pw),
                Err(_) => {
                    let direction = if trimmed.starts_with('-') { Direction::Out } else { Direction::In };
                    (None, direction)
                }
            }
        }
        _ => (None, Direction::In),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".json5").tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_top_level_ports_key() {
        let f = write_temp(r#"{ ports: { axi0_awvalid: 1, axi0_awready: -1 } }"#);
        let ports = load_ports(f.path()).unwrap();
        assert_eq!(ports.len(), 2);
        let awvalid = ports.iter().find(|p| p.name == "axi0_awvalid").unwrap();
        assert_eq!(awvalid.direction, Direction::In);
        assert_eq!(awvalid.width, Some(1));
    }

    #[test]
    fn loads_nested_definitions_ports() {
        let f = write_temp(r#"{ definitions: { ports: { clk: 1 } } }"#);
        let ports = load_ports(f.path()).unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].name, "clk");
    }

    #[test]
    fn parametric_width_expression_keeps_direction_sign() {
        let f = write_temp(r#"{ ports: { data: "-WIDTH" } }"#);
        let ports = load_ports(f.path()).unwrap();
        assert_eq!(ports[0].width, None);
        assert_eq!(ports[0].direction, Direction::Out);
    }

    #[test]
    fn missing_ports_key_is_an_error() {
        let f = write_temp(r#"{ foo: 1 }"#);
        assert!(load_ports(f.path()).is_err());
    }
}
