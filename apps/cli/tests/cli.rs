//! End-to-end tests for the stage CLI over a temporary library root.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

const NS: &str = "us/nsn/san-ildefonso/council";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&path, content).expect("write");
}

/// Lay out a one-jurisdiction library root with a local skeleton and a
/// config file pointing the CLI at it.
fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();

    write(root, "dependencies.json", r#"{"dependencies": {"sanipueblo": {}}}"#);
    write(root, "sanipueblo/law/namespace", NS);
    write(
        root,
        "sanipueblo/law/meta.json",
        r#"{"canonical-urls": {"html": "https://sanipueblo.example/"}}"#,
    );
    write(
        root,
        "sanipueblo/law/targets/law-html.json",
        r#"{"commit": "abc"}"#,
    );
    write(
        root,
        "tribes.json",
        r#"{"sanipueblo.example": {
            "official-site": "https://sanipueblo.example",
            "tribes-nill-page": "https://narf.example/nill/tribes/sanipueblo.html",
            "tribe-full-name": "Pueblo de San Ildefonso",
            "tribe": "San Ildefonso"
        }}"#,
    );
    write(
        root,
        &format!("templates/{NS}/template.html"),
        r#"<html><head><title>NILL</title></head><body>
           <h1><replace name="tribe-name"></replace></h1>
           <nav><replace name="breadcrumbs"></replace></nav>
           <article><replace name="content"></replace></article>
           <footer><replace name="footer"></replace></footer>
           </body></html>"#,
    );
    write(
        root,
        "sanipueblo/law-html/index.html",
        r#"<html><head>
           <meta property="og:url" content="https://sanipueblo.example/">
           </head><body>
           <nav aria-label="Breadcrumb navigation"><ul>
           <li><a href="/" title="Home">Home</a></li>
           <li><a href="/code" title="Code">Code</a></li>
           </ul></nav>
           <div class="tuf-authenticate"></div>
           <main><h1>The Code</h1></main>
           </body></html>"#,
    );
    write(root, "sanipueblo/law-html/style.css", "body {}");

    write(
        root,
        "lawsite.toml",
        &format!(
            r#"[paths]
library_root = "{root}"

[template]
local_dir = "{templates}"
"#,
            root = root.display(),
            templates = root.join("templates").display(),
        ),
    );

    dir
}

fn lawsite(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lawsite").expect("binary");
    cmd.current_dir(dir.path());
    cmd
}

#[test]
fn template_stage_echoes_state_and_writes_pages() {
    let dir = fixture();

    lawsite(&dir)
        .arg("template")
        .write_stdin(r#"{"state": {"cycle": 1}, "config": {}}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"cycle":1}"#));

    let page = dir
        .path()
        .join("narf-nill/law-html/triballaw")
        .join(NS)
        .join("index.html");
    let html = std::fs::read_to_string(&page).expect("templated page");
    assert!(html.contains("Collection"));
    assert!(html.contains("LG-246285-OLS-20"));
    assert!(html.contains("<h3>The Code</h3>"));
    assert!(html.contains("Pueblo de San Ildefonso"));
    assert!(!html.contains("<replace"));
}

#[test]
fn second_run_is_gated_by_the_ledger() {
    let dir = fixture();

    lawsite(&dir)
        .arg("template")
        .write_stdin("{}")
        .assert()
        .success();

    // Remove the output; an incremental (skipped) run must not recreate it
    let site = dir.path().join("narf-nill/law-html/triballaw");
    std::fs::remove_dir_all(&site).expect("remove");

    lawsite(&dir)
        .arg("template")
        .write_stdin("{}")
        .assert()
        .success();
    assert!(!site.exists());
}

#[test]
fn empty_stdin_is_a_null_state() {
    let dir = fixture();

    lawsite(&dir)
        .arg("template")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}

#[test]
fn malformed_stdin_reports_an_error_envelope() {
    let dir = fixture();

    lawsite(&dir)
        .arg("template")
        .write_stdin("this is not json")
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#"{"error":"#));
}

#[test]
fn missing_library_root_fails_with_error_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "lawsite.toml",
        r#"[paths]
library_root = "/nonexistent/lawsite-library"
"#,
    );

    lawsite(&dir)
        .arg("template")
        .write_stdin("{}")
        .assert()
        .failure()
        .stdout(predicate::str::contains("does not exist"));
}

#[test]
fn config_show_prints_resolved_toml() {
    let dir = fixture();

    lawsite(&dir)
        .arg("config")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("url_prefix"))
        .stdout(predicate::str::contains("tracked_content_types"));
}
