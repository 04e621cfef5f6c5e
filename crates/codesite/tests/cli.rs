//! Command tests against fixture files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use codesite::{run, Cli};
use tempfile::TempDir;

const SITE: &str = r#"
settings:
  global_css: "body { margin: 0 }"
  default_footer: 3
blocks:
  - id: 7
    name: Title
    html: '<h1 class="title">{{post_title}}</h1>'
    css: '.title { color: blue }'
    js: 'console.log("title");'
layouts:
  - id: 3
    type: footer
    use_blocks: false
    custom_html: '<footer>&copy; {{site_name}}</footer>'
templates:
  - id: 1
    name: Single post
    template_type: single-post
    content_blocks: [7, '<p>{% if post %}{{ post.excerpt }}{% endif %}</p>']
    footer_layout_id: 3
"#;

const REQUEST: &str = r#"
kind: single
site:
  name: Acme
post:
  id: 12
  title: Launch day
  excerpt: We shipped.
"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn exec(args: &[&str]) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(args)?;
    let mut out = Vec::new();
    run(cli, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn render_fragment() {
    let dir = TempDir::new().unwrap();
    let site = write(&dir, "site.yaml", SITE);
    let request = write(&dir, "request.yaml", REQUEST);

    let out = exec(&[
        "codesite",
        "render",
        "--site",
        path_str(&site),
        "--request",
        path_str(&request),
        "--fragment",
    ])
    .unwrap();
    assert_eq!(
        out,
        "<main class=\"codesite-content codesite-template-1\">\
         <div class=\"codesite-block codesite-block-7\"><h1 class=\"title\">Launch day</h1></div>\
         <p>We shipped.</p></main><footer>&copy; Acme</footer>\n"
    );
}

#[test]
fn render_full_page() {
    let dir = TempDir::new().unwrap();
    let site = write(&dir, "site.yaml", SITE);
    let request = write(&dir, "request.yaml", REQUEST);

    let out = exec(&[
        "codesite",
        "render",
        "-s",
        path_str(&site),
        "-r",
        path_str(&request),
    ])
    .unwrap();
    assert!(out.starts_with("<!DOCTYPE html>\n<html lang=\"en-US\">"));
    assert!(out.contains("<title>Launch day - Acme</title>"));
    assert!(out.contains("<style id=\"codesite-global-css\">\nbody { margin: 0 }\n</style>"));
    assert!(out.contains(".codesite-block-7 .title{color: blue}"));
    assert!(out.contains("<script id='codesite-js'>\nconsole.log(\"title\");\n</script>"));
    assert!(out.find("</head>").unwrap() < out.find("<main").unwrap());
}

#[test]
fn render_refuses_unhandled_requests() {
    let dir = TempDir::new().unwrap();
    let site = write(&dir, "site.yaml", SITE);

    let err = exec(&["codesite", "render", "--site", path_str(&site)]).unwrap_err();
    assert!(err.to_string().contains("--force"));

    let out = exec(&["codesite", "render", "--site", path_str(&site), "--fragment", "--force"])
        .unwrap();
    assert_eq!(
        out,
        "<main class=\"codesite-content codesite-default\"></main><footer>&copy; </footer>\n"
    );
}

#[test]
fn resolve_reports_template() {
    let dir = TempDir::new().unwrap();
    let site = write(&dir, "site.yaml", SITE);
    let request = write(&dir, "request.yaml", REQUEST);

    let out = exec(&[
        "codesite",
        "resolve",
        "--site",
        path_str(&site),
        "--request",
        path_str(&request),
    ])
    .unwrap();
    assert_eq!(out, "single-post: template 1 \"Single post\" (priority 10)\n");

    let out = exec(&["codesite", "resolve", "--site", path_str(&site)]).unwrap();
    assert_eq!(out, "home: no template\n");
}

#[test]
fn scope_and_minify_files() {
    let dir = TempDir::new().unwrap();
    let sheet = write(
        &dir,
        "hero.css",
        "/* hero */\n.hero, :root { color : red ; }\n@keyframes pulse { from { opacity: 0 } }\n",
    );

    let out = exec(&[
        "codesite",
        "scope",
        path_str(&sheet),
        "--prefix",
        "codesite-block-3",
    ])
    .unwrap();
    assert_eq!(
        out,
        ".codesite-block-3 .hero, .codesite-block-3{color : red ;}\n\
         @keyframes pulse { from { opacity: 0 } }\n"
    );

    let out = exec(&["codesite", "minify", path_str(&sheet)]).unwrap();
    assert_eq!(out, ".hero,:root{color:red}@keyframes pulse{from{opacity:0}}\n");
}

#[test]
fn missing_fixture_is_an_error() {
    let err = exec(&["codesite", "render", "--site", "/nonexistent/site.yaml"]).unwrap_err();
    assert!(format!("{:#}", err).contains("failed to load site fixture"));
}
