mod common;

use common::Sandbox;
use predicates::prelude::*;

#[test]
fn rm_deletes_source_and_lock_entry() {
    let sandbox = Sandbox::new();
    let id = sandbox.seed_git_repo("tyru/caw.vim", &[("plugin/caw.vim", "\" caw")]);
    sandbox.cmd().args(["get", "tyru/caw.vim"]).assert().success();

    sandbox
        .cmd()
        .args(["rm", "tyru/caw.vim"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("- {id} > removed")));

    assert!(!sandbox.repos_path(&id).exists());
    // Empty site/user parents are pruned, the repos root survives.
    assert!(!sandbox.volt_root().join("repos/github.com").exists());
    assert!(sandbox.volt_root().join("repos").exists());

    let lock = sandbox.lock_json();
    assert_eq!(lock["trx_id"], 2);
    assert_eq!(lock["repos"].as_array().unwrap().len(), 0);
    assert_eq!(lock["profiles"][0]["repos_path"].as_array().unwrap().len(), 0);
}

#[test]
fn rm_unknown_repository_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["rm", "tyru/caw.vim"])
        .assert()
        .failure()
        .code(20)
        .stderr(predicate::str::contains("no repository was installed"));
}

#[test]
fn rm_p_removes_plugconf_too() {
    let sandbox = Sandbox::new();
    let id = sandbox.seed_git_repo("tyru/caw.vim", &[("plugin/caw.vim", "\" caw")]);
    sandbox.cmd().args(["get", "tyru/caw.vim"]).assert().success();

    let plugconf = sandbox
        .volt_root()
        .join("plugconf/user/github.com/tyru/caw.vim.vim");
    assert!(plugconf.exists());

    sandbox.cmd().args(["rm", "-p", "tyru/caw.vim"]).assert().success();
    assert!(!plugconf.exists());
    assert!(!sandbox.repos_path(&id).exists());
}

#[test]
fn rm_without_p_keeps_plugconf() {
    let sandbox = Sandbox::new();
    sandbox.seed_git_repo("tyru/caw.vim", &[("plugin/caw.vim", "\" caw")]);
    sandbox.cmd().args(["get", "tyru/caw.vim"]).assert().success();
    sandbox.cmd().args(["rm", "tyru/caw.vim"]).assert().success();

    assert!(sandbox
        .volt_root()
        .join("plugconf/user/github.com/tyru/caw.vim.vim")
        .exists());
}
