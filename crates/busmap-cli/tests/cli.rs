use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const COMPONENT_JSON5: &str = r#"{
    ports: {
        axi0_awvalid: 1,
        axi0_awready: -1,
        axi0_awaddr: 32,
        axi0_awlen: 8,
        axi0_wvalid: 1,
        axi0_wready: -1,
        axi0_wdata: 32,
        irq_line0: 1,
        irq_line1: 1,
        irq_line2: 1,
    },
}"#;

const AXI_BUS_DEF_JSON5: &str = r#"{
    abstractionDefinition: {
        busType: { vendor: "amba.com", library: "AMBA4", name: "AXI4", version: "r0p0" },
        vendor: "amba.com", library: "AMBA4", name: "AXI4_rtl", version: "r0p0",
        ports: {
            AWVALID: { wire: {
                onMaster: { presence: "required", direction: "out" },
                onSlave: { presence: "required", direction: "in" },
            } },
            AWREADY: { wire: {
                onMaster: { presence: "required", direction: "in" },
                onSlave: { presence: "required", direction: "out" },
            } },
            AWADDR: { wire: {
                onMaster: { presence: "required", direction: "out", width: 32 },
                onSlave: { presence: "required", direction: "in", width: 32 },
            } },
            AWLEN: { wire: {
                onMaster: { presence: "optional", direction: "out", width: 8 },
                onSlave: { presence: "optional", direction: "in", width: 8 },
            } },
            WVALID: { wire: {
                onMaster: { presence: "required", direction: "out" },
                onSlave: { presence: "required", direction: "in" },
            } },
            WREADY: { wire: {
                onMaster: { presence: "required", direction: "in" },
                onSlave: { presence: "required", direction: "out" },
            } },
            WDATA: { wire: {
                onMaster: { presence: "required", direction: "out", width: 32 },
                onSlave: { presence: "required", direction: "in", width: 32 },
            } },
        },
    },
}"#;

#[test]
fn bundle_command_writes_json_for_flat_ports() {
    let dir = tempdir().unwrap();
    let component_path = dir.path().join("component.json5");
    fs::write(&component_path, COMPONENT_JSON5).unwrap();
    let out = dir.path().join("bundle.json");

    Command::cargo_bin("busmap")
        .unwrap()
        .args(["bundle", component_path.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .assert()
        .success();

    assert!(out.exists());
    let contents = fs::read_to_string(&out).unwrap();
    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert!(value.is_object() || value.is_array());
}

#[test]
fn map_command_proposes_axi_interface() {
    let dir = tempdir().unwrap();
    let component_path = dir.path().join("component.json5");
    fs::write(&component_path, COMPONENT_JSON5).unwrap();
    let bus_def_dir = dir.path().join("bus_defs");
    fs::create_dir(&bus_def_dir).unwrap();
    fs::write(bus_def_dir.join("axi4.json5"), AXI_BUS_DEF_JSON5).unwrap();
    let out = dir.path().join("candidates.json");

    Command::cargo_bin("busmap")
        .unwrap()
        .args([
            "propose",
            component_path.to_str().unwrap(),
            "-b",
            bus_def_dir.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--no-progress",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("inferred"));

    let contents = fs::read_to_string(&out).unwrap();
    assert!(contents.contains("axi4"));
    assert!(contents.contains("portMaps"));
}

#[test]
fn map_command_fails_on_missing_bus_def_dir() {
    let dir = tempdir().unwrap();
    let component_path = dir.path().join("component.json5");
    fs::write(&component_path, COMPONENT_JSON5).unwrap();

    Command::cargo_bin("busmap")
        .unwrap()
        .args(["propose", component_path.to_str().unwrap(), "-b", dir.path().join("nope").to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn map_command_fails_on_missing_component_file() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("busmap")
        .unwrap()
        .args([
            "propose",
            dir.path().join("nope.json5").to_str().unwrap(),
            "-b",
            dir.path().to_str().unwrap(),
        ])
        .assert()
        .failure();
}
