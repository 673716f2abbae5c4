mod common;

use common::Sandbox;

#[test]
fn dirty_worktree_is_rematerialized_and_flagged() {
    let sandbox = Sandbox::new();
    let id = sandbox.seed_git_repo("tyru/caw.vim", &[("plugin/caw.vim", "\" caw")]);
    sandbox.cmd().args(["get", "tyru/caw.vim"]).assert().success();
    assert_eq!(sandbox.manifest_entry(&id)["dirty_worktree"], serde_json::json!(null));

    // An untracked file makes the worktree dirty.
    common::touch(&sandbox.repos_path(&id).join("scratch.txt"));
    sandbox.cmd().arg("build").assert().success();

    assert_eq!(sandbox.manifest_entry(&id)["dirty_worktree"], true);
}

#[test]
fn copy_strategy_reproduces_pinned_commit_with_file_hashes() {
    let sandbox = Sandbox::new();
    sandbox.write_config("[build]\nstrategy = \"copy\"\n");
    let id = sandbox.seed_git_repo(
        "tyru/caw.vim",
        &[("plugin/caw.vim", "\" caw"), ("doc/caw.txt", "*caw*")],
    );
    sandbox.cmd().args(["get", "tyru/caw.vim"]).assert().success();

    let pack = sandbox.pack_path(&id);
    assert!(pack.join("plugin/caw.vim").exists());
    assert!(!pack.join(".git").exists());
    #[cfg(unix)]
    assert!(
        !std::fs::symlink_metadata(&pack).unwrap().file_type().is_symlink(),
        "copy strategy materializes real files"
    );

    let entry = sandbox.manifest_entry(&id);
    let files = entry["files"].as_object().expect("file map");
    assert!(files.contains_key("plugin/caw.vim"));
    assert_eq!(files["plugin/caw.vim"].as_str().unwrap().len(), 40);
}

#[test]
fn unchanged_repo_is_skipped_but_rebuild_forces_it() {
    let sandbox = Sandbox::new();
    sandbox.write_config("[build]\nstrategy = \"copy\"\n");
    let id = sandbox.seed_git_repo("tyru/caw.vim", &[("plugin/caw.vim", "\" caw")]);
    sandbox.cmd().args(["get", "tyru/caw.vim"]).assert().success();

    // Delete one materialized file behind volt's back; an incremental build
    // sees no change and leaves it alone, a rebuild restores it.
    let file = sandbox.pack_path(&id).join("plugin/caw.vim");
    std::fs::remove_file(&file).unwrap();

    sandbox.cmd().arg("build").assert().success();
    assert!(!file.exists());

    sandbox.cmd().arg("rebuild").assert().success();
    assert!(file.exists());
}

#[test]
fn orphan_directories_are_removed() {
    let sandbox = Sandbox::new();
    let id = sandbox.seed_git_repo("tyru/caw.vim", &[("plugin/caw.vim", "\" caw")]);
    sandbox.cmd().args(["get", "tyru/caw.vim"]).assert().success();
    assert!(sandbox.pack_path(&id).exists());

    sandbox.cmd().args(["rm", "tyru/caw.vim"]).assert().success();
    // rm leaves the materialized tree for the next build to collect.
    assert!(sandbox.pack_path(&id).exists());

    sandbox.cmd().arg("rebuild").assert().success();
    assert!(!sandbox.pack_path(&id).exists());
    assert!(sandbox.build_info()["repos"]
        .as_array()
        .unwrap()
        .iter()
        .all(|entry| entry["path"] != id.as_str()));
}

#[test]
fn bundled_plugconf_is_regenerated() {
    let sandbox = Sandbox::new();
    sandbox.seed_git_repo("tyru/caw.vim", &[("plugin/caw.vim", "\" caw")]);
    sandbox.cmd().args(["get", "tyru/caw.vim"]).assert().success();

    let plugconf = sandbox
        .volt_root()
        .join("plugconf/user/github.com/tyru/caw.vim.vim");
    std::fs::write(
        plugconf,
        "function! s:config()\n  let g:caw_enabled = 1\nendfunction\n",
    )
    .unwrap();

    sandbox.cmd().arg("rebuild").assert().success();
    let bundle = std::fs::read_to_string(
        sandbox
            .home()
            .join(".vim/pack/volt/start/system/plugin/bundled_plugconf.vim"),
    )
    .unwrap();
    assert!(bundle.contains("let g:caw_enabled = 1"));
    assert!(bundle.contains("s:config_github_com_tyru_caw_vim"));
}

#[test]
fn broken_plugconf_fails_the_build() {
    let sandbox = Sandbox::new();
    sandbox.seed_git_repo("tyru/caw.vim", &[("plugin/caw.vim", "\" caw")]);
    sandbox.cmd().args(["get", "tyru/caw.vim"]).assert().success();

    let plugconf = sandbox
        .volt_root()
        .join("plugconf/user/github.com/tyru/caw.vim.vim");
    std::fs::write(plugconf, "function! s:config()\n\" no endfunction\n").unwrap();

    sandbox.cmd().arg("rebuild").assert().failure().code(20);
}

#[test]
fn build_without_vim_on_path_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .env("PATH", sandbox.home())
        .arg("build")
        .assert()
        .failure()
        .code(20);
}

#[test]
fn ftdetect_files_are_aggregated() {
    let sandbox = Sandbox::new();
    sandbox.seed_git_repo(
        "tyru/detect.vim",
        &[
            ("plugin/detect.vim", "\" d"),
            ("ftdetect/mylang.vim", "au BufRead *.myl setf mylang"),
        ],
    );
    sandbox.cmd().args(["get", "tyru/detect.vim"]).assert().success();

    let aggregated = sandbox
        .home()
        .join(".vim/pack/volt/start/system/ftdetect/mylang.vim");
    assert!(aggregated.exists());
}
