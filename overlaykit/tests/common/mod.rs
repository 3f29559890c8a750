//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use overlaykit::BuildOptions;
use std::path::Path;

pub const DOCUMENT: &str = "<?xml version=\"1.0\"?>\n<html>\n<head>\n  <title>Browser</title>\n</head>\n<body/>\n</html>\n";

pub const DOCUMENT_PATH: &str = "browser/chrome/browser/content/browser/browser.xhtml";

pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

pub fn write_tar_zst(path: &Path, files: &[(&str, &str)]) {
    let file = std::fs::File::create(path).unwrap();
    let encoder = zstd::stream::write::Encoder::new(file, 3).unwrap();
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Runtime archive whose host executable runs `host_script`.
pub fn write_runtime(root: &Path, host_script: &str) {
    let host = format!("#!/bin/sh\n{}\n", host_script);
    write_tar_zst(
        &root.join("bin.tar.zst"),
        &[
            ("firefox", host.as_str()),
            ("browser/chrome.manifest", "manifest browser.manifest\n"),
            (DOCUMENT_PATH, DOCUMENT),
        ],
    );
}

/// A project with every default subtree populated.
pub fn write_project(root: &Path) -> BuildOptions {
    write(root, "src/content/index.ts", "export {};\n");
    write(root, "src/skin/theme.pcss", ":root { --accent: red; }\n");
    write(root, "src/skin/icons/tab.svg", "<svg/>\n");
    write(root, "src/modules/c.ts", "export const c = 3;\n");
    write(root, "src/modules/lib/util.mts", "export const u = 1;\n");
    write(root, "src/modules/data.json", "{}\n");
    write(root, "src/private/browser/components/panel.ts", "export class Panel {}\n");
    write(root, "public/robots.txt", "noindex\n");
    write_runtime(root, "exec sleep 30");

    BuildOptions::with_root(root)
}
