mod common;

use common::Sandbox;
use predicates::prelude::*;

#[test]
fn new_list_set_roundtrip() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["profile", "new", "spare"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created new profile 'spare'"));

    sandbox
        .cmd()
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* default").and(predicate::str::contains("  spare")));

    sandbox.cmd().args(["profile", "set", "spare"]).assert().success();
    sandbox
        .cmd()
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* spare"));
    assert_eq!(sandbox.lock_json()["current_profile_name"], "spare");
}

#[test]
fn set_rejects_current_or_unknown_profile() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["profile", "set", "default"])
        .assert()
        .failure()
        .code(20)
        .stderr(predicate::str::contains("is current profile"));
    sandbox
        .cmd()
        .args(["profile", "set", "ghost"])
        .assert()
        .failure()
        .code(20);
}

#[test]
fn destroy_refuses_current_profile() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["profile", "destroy", "default"])
        .assert()
        .failure()
        .code(20);

    sandbox.cmd().args(["profile", "new", "spare"]).assert().success();
    sandbox
        .cmd()
        .args(["profile", "destroy", "spare"])
        .assert()
        .success();
    assert_eq!(sandbox.lock_json()["profiles"].as_array().unwrap().len(), 1);
}

#[test]
fn show_prints_profile_details() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["profile", "show", "-current"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("name: default")
                .and(predicate::str::contains("use vimrc: true")),
        );
}

#[test]
fn disable_removes_materialized_dir_and_enable_restores_it() {
    let sandbox = Sandbox::new();
    let id = sandbox.seed_git_repo("tyru/caw.vim", &[("plugin/caw.vim", "\" caw")]);
    sandbox.cmd().args(["get", "tyru/caw.vim"]).assert().success();
    assert!(sandbox.pack_path(&id).exists());

    sandbox
        .cmd()
        .args(["disable", "tyru/caw.vim"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "- {id} > disabled in profile 'default'"
        )));
    assert!(!sandbox.pack_path(&id).exists());
    assert_eq!(
        sandbox.lock_json()["profiles"][0]["repos_path"]
            .as_array()
            .unwrap()
            .len(),
        0
    );

    sandbox
        .cmd()
        .args(["enable", "tyru/caw.vim"])
        .assert()
        .success();
    assert!(sandbox.pack_path(&id).exists());
}

#[test]
fn enable_requires_installed_repository() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["enable", "ghost/plugin"])
        .assert()
        .failure()
        .code(12)
        .stderr(predicate::str::contains("is not installed"));
}

#[test]
fn profile_use_toggles_rc_flag() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["profile", "use", "-current", "vimrc", "false"])
        .assert()
        .success();
    assert_eq!(sandbox.lock_json()["profiles"][0]["use_vimrc"], false);
}
