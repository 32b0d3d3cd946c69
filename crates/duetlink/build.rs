// Renders man pages for `duetlink` and every visible subcommand into
// $OUT_DIR/man. Packagers pick them up from there.

use std::fs;
use std::path::Path;

use clap::CommandFactory;

#[path = "src/cli.rs"]
#[allow(dead_code)]
mod cli;

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR") else {
        panic!("OUT_DIR is set by Cargo for build scripts");
    };
    let man_dir = Path::new(&out_dir).join("man");
    if let Err(e) = fs::create_dir_all(&man_dir) {
        panic!("cannot create {}: {e}", man_dir.display());
    }

    render(cli::Cli::command(), &man_dir);
}

fn render(cmd: clap::Command, dir: &Path) {
    let page = dir.join(format!("{}.1", cmd.get_name()));
    let mut buf = Vec::new();
    if let Err(e) = clap_mangen::Man::new(cmd.clone()).render(&mut buf) {
        panic!("cannot render {}: {e}", page.display());
    }
    if let Err(e) = fs::write(&page, buf) {
        panic!("cannot write {}: {e}", page.display());
    }

    let parent = cmd.get_name().to_owned();
    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        let qualified = format!("{parent}-{}", sub.get_name());
        render(sub.clone().name(qualified), dir);
    }
}
