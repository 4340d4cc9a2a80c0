use std::fs;
use std::path::Path;

use kiln_config::{
    BuildMode, Error, LoaderStep, PluginDescriptor, PostcssPlugin, ProjectSettings, RuleCategory,
    resolve,
};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "src/index.js", b"console.log('hi');\n");
    write(root, "src/index.html", b"<html><head></head><body></body></html>");
    write(root, "src/about.html", b"<html><head></head><body></body></html>");
    write(root, "src/images/icon.png", b"not really a png");
    dir
}

#[test]
fn resolving_twice_is_byte_identical() {
    let dir = sample_project();
    let settings = ProjectSettings::default();

    for mode in [BuildMode::Development, BuildMode::Production] {
        let first = resolve(mode, dir.path(), &settings).unwrap().to_json().unwrap();
        let second = resolve(mode, dir.path(), &settings).unwrap().to_json().unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn one_html_plugin_per_template() {
    let dir = sample_project();
    let config = resolve(BuildMode::Production, dir.path(), &ProjectSettings::default()).unwrap();

    let pages: Vec<_> = config
        .html_pages()
        .map(|(filename, _)| filename.to_string())
        .collect();
    assert_eq!(pages, vec!["about.html", "index.html"]);

    write(dir.path(), "src/contact.html", b"<html></html>");
    let config = resolve(BuildMode::Production, dir.path(), &ProjectSettings::default()).unwrap();
    assert_eq!(config.html_pages().count(), 3);
}

#[test]
fn plugin_order_is_extract_pages_favicons() {
    let dir = sample_project();
    let config = resolve(BuildMode::Development, dir.path(), &ProjectSettings::default()).unwrap();

    assert!(matches!(config.plugins.first(), Some(PluginDescriptor::CssExtract { .. })));
    assert!(matches!(config.plugins.last(), Some(PluginDescriptor::Favicons { .. })));
    assert_eq!(config.plugins.len(), 4);
}

#[test]
fn development_and_production_differ_only_where_expected() {
    let dir = sample_project();
    let settings = ProjectSettings::default();
    let dev = resolve(BuildMode::Development, dir.path(), &settings).unwrap();
    let prod = resolve(BuildMode::Production, dir.path(), &settings).unwrap();

    assert!(!dev.optimization.is_enabled());
    assert!(prod.optimization.is_enabled());

    let style = |config: &kiln_config::BuildConfig| {
        config
            .module
            .rules
            .iter()
            .find(|rule| rule.category == RuleCategory::Style)
            .unwrap()
            .steps
            .clone()
    };
    let dev_style = style(&dev);
    let prod_style = style(&prod);
    assert_eq!(dev_style[0], LoaderStep::StyleInject);
    assert_eq!(prod_style[0], LoaderStep::CssExtract);
    assert_eq!(dev_style[1..2], prod_style[1..2]);
    assert_eq!(dev_style[3], prod_style[3]);

    let LoaderStep::Postcss { plugins } = &prod_style[2] else {
        panic!("expected postcss step");
    };
    assert_eq!(plugins[0], PostcssPlugin::Cssnano);

    assert_eq!(dev.plugins, prod.plugins);
    assert_eq!(dev.dev_server, prod.dev_server);
}

#[test]
fn missing_favicon_fails_resolution() {
    let dir = sample_project();
    fs::remove_file(dir.path().join("src/images/icon.png")).unwrap();

    let err = resolve(BuildMode::Production, dir.path(), &ProjectSettings::default()).unwrap_err();
    assert!(matches!(err, Error::FaviconNotFound(_)));
}

#[test]
fn malformed_template_glob_fails_resolution() {
    let dir = sample_project();
    let settings = ProjectSettings {
        templates: "./src/[.html".to_string(),
        ..ProjectSettings::default()
    };

    let err = resolve(BuildMode::Production, dir.path(), &settings).unwrap_err();
    assert!(matches!(err, Error::InvalidGlob { .. }));
}

#[test]
fn serialized_config_uses_camel_case_keys() {
    let dir = sample_project();
    let config = resolve(BuildMode::Production, dir.path(), &ProjectSettings::default()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();

    assert_eq!(json["mode"], "production");
    assert_eq!(json["devServer"]["port"], 9001);
    assert_eq!(json["devServer"]["watch"]["notification"], "content-changed");
    assert_eq!(json["output"]["filename"], "bundle.js");
    assert_eq!(json["module"]["rules"][3]["caseInsensitive"], true);
    assert_eq!(json["module"]["rules"][1]["exclude"], "node_modules");
}

#[test]
fn pipeline_reverses_declaration_for_styles() {
    let dir = sample_project();
    let config = resolve(BuildMode::Development, dir.path(), &ProjectSettings::default()).unwrap();
    let rules = config.rule_set().unwrap();

    let names: Vec<_> = rules
        .pipeline("src/styles/main.scss")
        .iter()
        .map(LoaderStep::name)
        .collect();
    assert_eq!(names, vec!["sass", "postcss", "css", "style-inject"]);
}
