//! Discovers and parses `abstractionDefinition` bus-spec files (IP-XACT
//! style JSON5, the format the teacher's retrieval pack's reference tool
//! reads) into [`BusDef`]s.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use busmap_core::{BusDef, BusSignal, BusType, Direction, DriverType, Presence};
use serde::Deserialize;
use serde_json::Value;
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct SpecFile {
    #[serde(rename = "abstractionDefinition")]
    abstraction_definition: AbstractionDefinition,
}

#[derive(Debug, Deserialize)]
struct AbstractionDefinition {
    #[serde(rename = "busType")]
    bus_type: BusTypeSpec,
    vendor: String,
    library: String,
    name: String,
    version: String,
    ports: HashMap<String, PortSpec>,
}

#[derive(Debug, Deserialize)]
struct BusTypeSpec {
    vendor: String,
    library: String,
    name: String,
    version: String,
}

impl From<BusTypeSpec> for BusType {
    fn from(s: BusTypeSpec) -> Self {
        BusType { vendor: s.vendor, library: s.library, name: s.name, version: s.version }
    }
}

#[derive(Debug, Deserialize)]
struct PortSpec {
    #[serde(default, rename = "isUser")]
    is_user: bool,
    #[serde(default)]
    group: Option<String>,
    wire: WireSpec,
}

#[derive(Debug, Deserialize)]
struct WireSpec {
    #[serde(rename = "onMaster", default)]
    on_master: Option<SideSpec>,
    #[serde(rename = "onSlave", default)]
    on_slave: Option<SideSpec>,
}

#[derive(Debug, Deserialize)]
struct SideSpec {
    #[serde(default)]
    presence: Option<String>,
    direction: String,
    #[serde(default)]
    width: Option<Value>,
}

/// Returns `true` if `path` is a JSON5 file that parses with a top-level
/// `abstractionDefinition` key, i.e. is actually a bus-def spec and not
/// some unrelated `.json5` file sitting in the same directory tree.
pub fn is_spec_bus_def(path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("json5") {
        return false;
    }
    let Ok(text) = std::fs::read_to_string(path) else { return false };
    let Ok(value) = json5::from_str::<Value>(&text) else { return false };
    value.get("abstractionDefinition").is_some()
}

/// Walk `dir` recursively and parse every bus-def spec file found into its
/// master and/or slave [`BusDef`]s.
pub fn load_bus_def_library(dir: &Path) -> Result<Vec<Arc<BusDef>>> {
    let mut bus_defs = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !is_spec_bus_def(path) {
            continue;
        }
        bus_defs.extend(bus_defs_from_spec(path)?);
    }
    Ok(bus_defs)
}

/// Parse one bus-def spec file into the slave and/or master [`BusDef`]s it
/// describes (a spec may define only one side).
pub fn bus_defs_from_spec(path: &Path) -> Result<Vec<Arc<BusDef>>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading bus-def spec `{}`", path.display()))?;
    let spec: SpecFile = json5::from_str(&text)
        .with_context(|| format!("parsing bus-def spec `{}`", path.display()))?;
    let ad = spec.abstraction_definition;
    let bus_type: BusType = ad.bus_type.into();
    let abstract_type =
        BusType { vendor: ad.vendor, library: ad.library, name: ad.name, version: ad.version };

    let mut master_req = Vec::new();
    let mut master_opt = Vec::new();
    let mut master_groups = Vec::new();
    let mut slave_req = Vec::new();
    let mut slave_opt = Vec::new();
    let mut slave_groups = Vec::new();
    let mut user_group_names: Vec<String> = Vec::new();

    for (port_name, port_def) in &ad.ports {
        let is_user = port_def.is_user;
        let group = port_def.group.as_deref().unwrap_or("").to_lowercase();
        if is_user {
            user_group_names.push(group.clone());
        }

        if let Some(side) = &port_def.wire.on_master {
            if let Some((presence, signal)) = parse_side(port_name, side)? {
                let signal = BusSignal { user_group: is_user.then(|| group.clone()), ..signal };
                route_signal(presence, signal, is_user, &mut master_req, &mut master_opt, &mut master_groups, &group);
            }
        }
        if let Some(side) = &port_def.wire.on_slave {
            if let Some((presence, signal)) = parse_side(port_name, side)? {
                let signal = BusSignal { user_group: is_user.then(|| group.clone()), ..signal };
                route_signal(presence, signal, is_user, &mut slave_req, &mut slave_opt, &mut slave_groups, &group);
            }
        }
    }

    if user_group_names.len() > 1 {
        let anonymous = user_group_names.iter().any(|g| g.is_empty());
        if anonymous {
            bail!(
                "bus-def `{}` mixes an anonymous user group with named groups",
                path.display()
            );
        }
    }

    let mut bus_defs = Vec::new();
    if !master_req.is_empty() {
        bus_defs.push(Arc::new(BusDef::new(
            bus_type.clone(),
            abstract_type.clone(),
            DriverType::Master,
            master_req,
            master_opt,
            master_groups,
        )?));
    }
    if !slave_req.is_empty() {
        bus_defs.push(Arc::new(BusDef::new(
            bus_type,
            abstract_type,
            DriverType::Slave,
            slave_req,
            slave_opt,
            slave_groups,
        )?));
    }
    Ok(bus_defs)
}

#[allow(clippy::too_many_arguments)]
fn route_signal(
    presence: Presence,
    signal: BusSignal,
    is_user: bool,
    req: &mut Vec<BusSignal>,
    opt: &mut Vec<BusSignal>,
    groups: &mut Vec<(String, BusSignal)>,
    group: &str,
) {
    match presence {
        Presence::Required => req.push(signal),
        Presence::Optional => {
            if is_user {
                groups.push((group.to_string(), signal));
            } else {
                opt.push(signal);
            }
        }
    }
}

/// Parse one `onMaster`/`onSlave` side of a port definition. Returns `None`
/// for a side explicitly marked `"illegal"`.
fn parse_side(port_name: &str, side: &SideSpec) -> Result<Option<(Presence, BusSignal)>> {
    if side.presence.as_deref() == Some("illegal") {
        return Ok(None);
    }
    let presence = match side.presence.as_deref() {
        None | Some("required") => Presence::Required,
        Some("optional") => Presence::Optional,
        Some(other) => bail!("port `{port_name}` has unrecognized presence `{other}`"),
    };
    let direction = Direction::from_bus_def_str(&side.direction);
    let width = side.width.as_ref().and_then(|v| v.as_u64()).map(|w| w as u32);
    let signal = BusSignal {
        name: port_name.to_string(),
        width,
        direction,
        presence,
        user_group: None,
    };
    Ok(Some((presence, signal)))
}

/// Absolute paths to every bus-def spec file found under `dir`, without
/// parsing them (used to drive a progress bar with a known total).
pub fn discover_spec_paths(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_spec_bus_def(p))
        .collect()
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

    const AXI_LITE_SLAVE: &str = r#"{
        abstractionDefinition: {
            busType: { vendor: "amba.com", library: "AMBA4", name: "AXI4Lite", version: "r0p0" },
            vendor: "amba.com", library: "AMBA4", name: "AXI4Lite_rtl", version: "r0p0",
            ports: {
                AWVALID: { wire: { onMaster: { presence: "required", direction: "out" }, onSlave: { presence: "required", direction: "in" } } },
                AWREADY: { wire: { onMaster: { presence: "required", direction: "in" }, onSlave: { presence: "required", direction: "out" } } },
                AWPROT: { wire: { onMaster: { presence: "optional", direction: "out", width: 3 }, onSlave: { presence: "optional", direction: "in", width: 3 } } },
            },
        },
    }"#;

    #[test]
    fn recognizes_spec_bus_def_files() {
        let f = write_temp(AXI_LITE_SLAVE);
        assert!(is_spec_bus_def(f.path()));
    }

    #[test]
    fn non_spec_json5_is_rejected() {
        let f = write_temp(r#"{ foo: 1 }"#);
        assert!(!is_spec_bus_def(f.path()));
    }

    #[test]
    fn parses_master_and_slave_sides() {
        let f = write_temp(AXI_LITE_SLAVE);
        let defs = bus_defs_from_spec(f.path()).unwrap();
        assert_eq!(defs.len(), 2);
        let slave = defs.iter().find(|d| d.driver_type == DriverType::Slave).unwrap();
        assert_eq!(slave.required_signals.len(), 2);
        assert_eq!(slave.optional_signals.len(), 1);
        let awvalid = slave.required_signals.iter().find(|s| s.name == "AWVALID").unwrap();
        assert_eq!(awvalid.direction, Direction::In);
    }

    #[test]
    fn rejects_mixed_anonymous_and_named_user_groups() {
        let spec = r#"{
            abstractionDefinition: {
                busType: { vendor: "a", library: "b", name: "c", version: "1" },
                vendor: "a", library: "b", name: "c", version: "1",
                ports: {
                    REQ: { wire: { onSlave: { presence: "required", direction: "in" } } },
                    IRQ0: { isUser: true, wire: { onSlave: { presence: "optional", direction: "in" } } },
                    IRQ1: { isUser: true, group: "irq", wire: { onSlave: { presence: "optional", direction: "in" } } },
                },
            },
        }"#;
        let f = write_temp(spec);
        assert!(bus_defs_from_spec(f.path()).is_err());
    }
}
