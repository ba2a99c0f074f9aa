use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use widget_bundler::discovery::discover_widgets;
use widget_bundler::{build_widgets, ScriptDialect, WidgetBuildOptions, WidgetError};

fn write_widget(root: &Path, dir: &str, files: &[(&str, &str)]) {
    let path = root.join(dir);
    fs::create_dir_all(&path).expect("Failed to create widget dir");
    for (name, contents) in files {
        fs::write(path.join(name), contents).expect("Failed to write widget file");
    }
}

const WIDGET_TSX: &str = "function Widget() {\n  return <p>hi</p>;\n}\n";

#[test]
fn discovers_in_name_order() {
    let root = tempfile::tempdir().unwrap();
    for name in ["zeta", "alpha", "mid"] {
        write_widget(
            root.path(),
            name,
            &[
                ("data.json", &format!(r#"{{ "name": "{name}" }}"#)),
                ("index.tsx", WIDGET_TSX),
            ],
        );
    }

    let sources = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap();
    let dirs: Vec<_> = sources.iter().map(|s| s.directory_name.as_str()).collect();
    assert_eq!(dirs, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn source_carries_synthesized_entry_and_stylesheet() {
    let root = tempfile::tempdir().unwrap();
    write_widget(
        root.path(),
        "greeting",
        &[
            ("data.json", r#"{ "name": "greeting" }"#),
            ("index.tsx", WIDGET_TSX),
            ("index.css", "p { color: red; }"),
        ],
    );

    let sources = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap();
    let source = &sources[0];

    assert_eq!(source.name(), "greeting");
    assert_eq!(
        source.description_path,
        root.path().join("greeting").join("data.json")
    );
    assert_eq!(source.script_dialect, ScriptDialect::Tsx);
    assert_eq!(source.root_component_name, "Widget");
    assert_eq!(source.stylesheet_text.as_deref(), Some("p { color: red; }"));
    assert!(source.entry_script_text.starts_with(WIDGET_TSX));
    assert!(source
        .entry_script_text
        .ends_with("createRoot(document.getElementById('widget-root-greeting')).render(<Widget />);\n"));
}

#[test]
fn skips_directories_without_files() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("components").join("buttons")).unwrap();
    fs::create_dir_all(root.path().join("empty")).unwrap();
    write_widget(
        root.path(),
        "greeting",
        &[
            ("data.json", r#"{ "name": "greeting" }"#),
            ("index.tsx", WIDGET_TSX),
        ],
    );

    let sources = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].directory_name, "greeting");
}

#[test]
fn skips_staging_directory_and_root_files() {
    let root = tempfile::tempdir().unwrap();
    write_widget(root.path(), "dist", &[("stale.js", "x")]);
    fs::write(root.path().join("README.md"), "# widgets").unwrap();

    let sources = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap();
    assert!(sources.is_empty());
}

#[cfg(unix)]
#[test]
fn follows_symlinked_widget_directories() {
    let root = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    write_widget(
        elsewhere.path(),
        "linked",
        &[
            ("data.json", r#"{ "name": "linked" }"#),
            ("index.tsx", WIDGET_TSX),
        ],
    );
    std::os::unix::fs::symlink(elsewhere.path().join("linked"), root.path().join("linked"))
        .unwrap();

    let sources = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].directory_name, "linked");
    assert_eq!(sources[0].name(), "linked");
}

#[test]
fn duplicate_declared_names_fail_naming_both_descriptions() {
    let root = tempfile::tempdir().unwrap();
    for dir in ["first", "second"] {
        write_widget(
            root.path(),
            dir,
            &[("data.json", r#"{ "name": "same" }"#), ("index.tsx", WIDGET_TSX)],
        );
    }

    let err = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap_err();
    match &err {
        WidgetError::DuplicateWidget {
            name,
            first,
            second,
        } => {
            assert_eq!(name, "same");
            assert_eq!(first, &root.path().join("first").join("data.json"));
            assert_eq!(second, &root.path().join("second").join("data.json"));
        }
        e => panic!("Expected DuplicateWidget, got: {:?}", e),
    }
    assert!(err.to_string().contains("`same`"));
}

#[test]
fn missing_description_names_both_candidates() {
    let root = tempfile::tempdir().unwrap();
    write_widget(root.path(), "greeting", &[("index.tsx", WIDGET_TSX)]);

    let err = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap_err();
    match &err {
        WidgetError::MissingFile { primary, secondary } => {
            assert_eq!(primary, &root.path().join("greeting").join("data.json"));
            assert_eq!(secondary, &root.path().join("greeting").join("data.toml"));
        }
        e => panic!("Expected MissingFile, got: {:?}", e),
    }
    let message = err.to_string();
    assert!(message.contains("data.json"));
    assert!(message.contains("data.toml"));
    assert!(message.ends_with("does not exist"));
}

#[test]
fn missing_entry_names_both_candidates() {
    let root = tempfile::tempdir().unwrap();
    write_widget(root.path(), "greeting", &[("data.json", r#"{ "name": "greeting" }"#)]);

    let err = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap_err();
    match err {
        WidgetError::MissingFile { primary, secondary } => {
            assert!(primary.ends_with("greeting/index.jsx"));
            assert!(secondary.ends_with("greeting/index.tsx"));
        }
        e => panic!("Expected MissingFile, got: {:?}", e),
    }
}

#[test]
fn empty_entry_fails() {
    let root = tempfile::tempdir().unwrap();
    write_widget(
        root.path(),
        "greeting",
        &[("data.json", r#"{ "name": "greeting" }"#), ("index.jsx", "  \n")],
    );

    let err = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap_err();
    match err {
        WidgetError::EmptyEntry(path) => assert!(path.ends_with("greeting/index.jsx")),
        e => panic!("Expected EmptyEntry, got: {:?}", e),
    }
}

#[test]
fn description_precedence_json_first() {
    let root = tempfile::tempdir().unwrap();
    write_widget(
        root.path(),
        "greeting",
        &[
            ("data.json", r#"{ "name": "from-json" }"#),
            ("data.toml", "name = \"from-toml\"\n"),
            ("index.tsx", WIDGET_TSX),
        ],
    );

    let sources = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap();
    assert_eq!(sources[0].name(), "from-json");
}

#[test]
fn entry_precedence_jsx_first() {
    let root = tempfile::tempdir().unwrap();
    write_widget(
        root.path(),
        "greeting",
        &[
            ("data.json", r#"{ "name": "greeting" }"#),
            ("index.jsx", "function Widget() { return <i>jsx</i>; }\n"),
            ("index.tsx", WIDGET_TSX),
        ],
    );

    let sources = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap();
    assert_eq!(sources[0].script_dialect, ScriptDialect::Jsx);
    assert!(sources[0].entry_script_text.contains("<i>jsx</i>"));
}

#[test]
fn invalid_description_shape_fails() {
    let root = tempfile::tempdir().unwrap();
    write_widget(
        root.path(),
        "greeting",
        &[("data.json", r#""just a string""#), ("index.tsx", WIDGET_TSX)],
    );

    let err = discover_widgets(&WidgetBuildOptions::new(root.path())).unwrap_err();
    match err {
        WidgetError::InvalidDescription { path, .. } => {
            assert!(path.ends_with("greeting/data.json"))
        }
        e => panic!("Expected InvalidDescription, got: {:?}", e),
    }
}

#[tokio::test]
async fn missing_widgets_root_fails_run() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("nope");

    let err = build_widgets(&WidgetBuildOptions::new(&missing))
        .await
        .unwrap_err();
    match err {
        WidgetError::MissingWidgetsDir(path) => assert_eq!(path, missing),
        e => panic!("Expected MissingWidgetsDir, got: {:?}", e),
    }
}

#[tokio::test]
async fn configuration_error_aborts_before_bundling() {
    let root = tempfile::tempdir().unwrap();
    write_widget(
        root.path(),
        "good",
        &[("data.json", r#"{ "name": "good" }"#), ("index.tsx", WIDGET_TSX)],
    );
    write_widget(root.path(), "bad", &[("index.tsx", WIDGET_TSX)]);

    let opts = WidgetBuildOptions::new(root.path()).with_debug(true);
    let err = build_widgets(&opts).await.unwrap_err();

    assert!(matches!(err, WidgetError::MissingFile { .. }));
    assert!(!root.path().join("good").join("index.debug.html").exists());
}
