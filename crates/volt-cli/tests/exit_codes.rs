mod common;

use common::Sandbox;
use predicates::prelude::*;

#[test]
fn unknown_flag_exits_10() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["get", "--definitely-not-a-flag"])
        .assert()
        .failure()
        .code(10);
}

#[test]
fn unknown_subcommand_exits_10() {
    let sandbox = Sandbox::new();
    sandbox.cmd().arg("frobnicate").assert().failure().code(10);
}

#[test]
fn corrupt_lock_exits_11() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.volt_root().join("lock.json"), "][").unwrap();
    sandbox
        .cmd()
        .args(["get", "tyru/caw.vim"])
        .assert()
        .failure()
        .code(11)
        .stderr(predicate::str::contains("lock.json"));
}

#[test]
fn help_exits_0() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("package manager for Vim plugins"));
}

#[test]
fn version_exits_0() {
    let sandbox = Sandbox::new();
    sandbox.cmd().arg("--version").assert().success();
}

#[test]
fn self_upgrade_reports_missing_network_support() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["self-upgrade", "--check"])
        .assert()
        .failure()
        .code(20)
        .stderr(predicate::str::contains("current version is"));
}

#[test]
fn list_on_fresh_root_prints_nothing() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
