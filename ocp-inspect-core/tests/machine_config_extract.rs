use ocp_inspect_core::config::{MachineConfigSettings, MissingConfigPolicy, Sections};
use ocp_inspect_core::contract::{MockDocumentSource, RawDocument};
use ocp_inspect_core::machine_config::{
    dispatch, extract, extract_all, extract_from_source, extract_from_str, extract_systemd_units,
    parse_documents, Extraction, UnitInfo,
};
use ocp_inspect_core::source::{FileSource, InputLocation};
use ocp_inspect_core::InspectError;
use std::collections::BTreeMap;
use std::path::Path;

const SINGLE_FILE_MC: &str = r#"
apiVersion: machineconfiguration.openshift.io/v1
kind: MachineConfig
metadata:
  name: 99-worker-foo
spec:
  config:
    ignition:
      version: 3.2.0
    storage:
      files:
        - path: /etc/foo.conf
          mode: 420
          contents:
            source: data:,hello%20world%0A
"#;

const UNITS_MC: &str = r#"
kind: MachineConfig
metadata:
  name: 99-worker-units
spec:
  config:
    storage:
      files:
        - path: /etc/no-contents
        - path: /etc/no-source
          contents:
            compression: ""
        - path: /etc/empty-source
          contents:
            source: "data:,"
        - path: /etc/kubelet.json
          contents:
            source: data:,%7B%22b%22%3A2%2C%22a%22%3A1%7D
    systemd:
      units:
        - name: kubelet.service
          enabled: true
          contents: |
            [Unit]
            Description=Kubelet
          dropins:
            - name: 10-env.conf
              contents: |
                [Service]
                Environment=FOO=bar%20baz
            - name: 20-empty.conf
        - name: crio.service
          dropins:
            - name: 10-mco-default-env.conf
              contents: "[Service]\n"
        - name: bare.service
"#;

fn settings() -> MachineConfigSettings {
    MachineConfigSettings::default()
}

fn parse_one(text: &str) -> ocp_inspect_core::machine_config::MachineConfig {
    let mut docs = parse_documents(text, Path::new("test.yaml")).expect("documents should parse");
    assert_eq!(docs.len(), 1);
    docs.remove(0)
}

#[test]
fn single_file_without_units() {
    let doc = parse_one(SINGLE_FILE_MC);
    let out = extract_all(&doc, &settings()).unwrap();

    let mut expected = BTreeMap::new();
    expected.insert("/etc/foo.conf".to_string(), "hello world\n".to_string());
    assert_eq!(out.files, Some(expected));
    assert_eq!(out.systemd_units, Some(BTreeMap::new()));
}

#[test]
fn files_without_source_are_skipped_and_json_is_pretty_printed() {
    let doc = parse_one(UNITS_MC);
    let files = extract_all(&doc, &settings()).unwrap().files.unwrap();

    assert_eq!(files.len(), 2, "got {files:?}");
    assert!(!files.contains_key("/etc/no-contents"));
    assert!(!files.contains_key("/etc/no-source"));
    assert_eq!(files["/etc/empty-source"], "");
    assert_eq!(files["/etc/kubelet.json"], "{\n    \"a\": 1,\n    \"b\": 2\n}");
}

#[test]
fn systemd_units_map_to_target_paths_with_dropins() {
    let doc = parse_one(UNITS_MC);
    let units = extract_systemd_units(&doc, &settings()).unwrap();

    let kubelet = &units["/etc/systemd/system/kubelet.service"];
    assert_eq!(
        kubelet.contents.as_deref(),
        Some("[Unit]\nDescription=Kubelet\n")
    );
    assert_eq!(
        kubelet.dropins["/etc/systemd/system/kubelet.service.d/10-env.conf"],
        "[Service]\nEnvironment=FOO=bar baz\n"
    );
    assert_eq!(
        kubelet.dropins["/etc/systemd/system/kubelet.service.d/20-empty.conf"],
        ""
    );

    let crio = &units["/etc/systemd/system/crio.service"];
    assert_eq!(crio.contents, None);
    assert_eq!(crio.dropins.len(), 1);

    assert_eq!(
        units["/etc/systemd/system/bare.service"],
        UnitInfo {
            contents: None,
            dropins: BTreeMap::new(),
        }
    );
}

#[test]
fn systemd_root_is_configurable() {
    let doc = parse_one(UNITS_MC);
    let settings = MachineConfigSettings {
        systemd_root: "/run/systemd/system".into(),
        ..settings()
    };
    let units = extract_systemd_units(&doc, &settings).unwrap();
    assert!(units.contains_key("/run/systemd/system/bare.service"));
}

#[test]
fn two_documents_are_keyed_by_name() {
    let stream = r#"
metadata:
  name: mc-a
spec:
  config:
    storage:
      files:
        - path: /etc/a
          contents:
            source: data:,a
---
metadata:
  name: mc-b
spec:
  config:
    systemd:
      units:
        - name: b.service
---
"#;
    let out = extract_from_str(stream, Path::new("stream.yaml"), &settings()).unwrap();
    let Extraction::ByName(by_name) = out else {
        panic!("expected keyed output, got {out:?}");
    };
    assert_eq!(by_name.keys().collect::<Vec<_>>(), vec!["mc-a", "mc-b"]);
    assert_eq!(by_name["mc-a"].files.as_ref().unwrap()["/etc/a"], "a");
    assert!(by_name["mc-b"]
        .systemd_units
        .as_ref()
        .unwrap()
        .contains_key("/etc/systemd/system/b.service"));
}

#[test]
fn single_document_output_is_unkeyed() {
    let out = extract_from_str(SINGLE_FILE_MC, Path::new("mc.yaml"), &settings()).unwrap();
    assert!(matches!(out, Extraction::Single(_)));

    let rendered = ocp_inspect_core::yaml::to_yaml(&out).unwrap();
    assert!(rendered.starts_with("files:"), "got:\n{rendered}");
    assert!(!rendered.contains("99-worker-foo"));
}

#[test]
fn list_document_is_flattened_to_items() {
    let list = r#"
apiVersion: v1
kind: List
items:
  - kind: MachineConfig
    metadata:
      name: mc-a
    spec:
      config: {}
  - kind: MachineConfig
    metadata:
      name: mc-b
    spec:
      config: {}
"#;
    let out = extract_from_str(list, Path::new("list.yaml"), &settings()).unwrap();
    let Extraction::ByName(by_name) = out else {
        panic!("expected keyed output");
    };
    assert_eq!(by_name.len(), 2);
    assert_eq!(by_name["mc-a"].files, Some(BTreeMap::new()));
}

#[test]
fn configmap_embedded_machine_config_is_unwrapped() {
    let configmap = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: hosted-mc
data:
  config: |
    kind: MachineConfig
    metadata:
      name: embedded
    spec:
      config:
        storage:
          files:
            - path: /etc/counter
              contents:
                source: data:,41%0A
"#;
    let docs = parse_documents(configmap, Path::new("cm.yaml")).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].name(), Some("embedded"));

    let files = extract_all(&docs[0], &settings()).unwrap().files.unwrap();
    // "41\n" parses as JSON and re-renders as a bare number.
    assert_eq!(files["/etc/counter"], "41");
}

#[test]
fn missing_spec_config_is_strict_by_default() {
    let doc = parse_one("metadata:\n  name: broken\nspec: {}\n");
    let err = extract_all(&doc, &settings()).unwrap_err();
    match err {
        InspectError::Schema { document, message } => {
            assert_eq!(document, "broken");
            assert!(message.contains("spec.config"), "got {message}");
        }
        other => panic!("expected schema error, got {other:?}"),
    }

    let doc = parse_one("metadata:\n  name: no-spec\n");
    let err = extract_all(&doc, &settings()).unwrap_err();
    assert!(err.to_string().contains("`spec`"), "got {err}");
}

#[test]
fn missing_spec_config_can_be_treated_as_empty() {
    let doc = parse_one("metadata:\n  name: broken\n");
    let lenient = MachineConfigSettings {
        missing_config: MissingConfigPolicy::Empty,
        ..settings()
    };
    let out = extract_all(&doc, &lenient).unwrap();
    assert_eq!(out.files, Some(BTreeMap::new()));
    assert_eq!(out.systemd_units, Some(BTreeMap::new()));
}

#[test]
fn partial_extraction_leaves_out_other_section() {
    let doc = parse_one(UNITS_MC);
    let files_only = extract(&doc, &settings(), Sections::Files).unwrap();
    assert!(files_only.files.is_some());
    assert!(files_only.systemd_units.is_none());

    let rendered = ocp_inspect_core::yaml::to_yaml(&files_only).unwrap();
    assert!(!rendered.contains("systemd_units"));

    let units_only = extract(&doc, &settings(), Sections::Units).unwrap();
    assert!(units_only.files.is_none());
    assert_eq!(units_only.systemd_units.unwrap().len(), 3);
}

#[test]
fn unnamed_document_in_multi_document_stream_is_rejected() {
    let stream = "metadata:\n  name: named\nspec:\n  config: {}\n---\nspec:\n  config: {}\n";
    let err = extract_from_str(stream, Path::new("s.yaml"), &settings()).unwrap_err();
    assert!(err.to_string().contains("metadata.name"), "got {err}");
}

#[test]
fn duplicate_names_in_multi_document_stream_are_rejected() {
    let stream = "metadata:\n  name: dup\nspec:\n  config: {}\n---\nmetadata:\n  name: other\nspec:\n  config: {}\n---\nmetadata:\n  name: dup\nspec:\n  config: {}\n";
    let err = extract_from_str(stream, Path::new("s.yaml"), &settings()).unwrap_err();
    match err {
        InspectError::Schema { document, message } => {
            assert_eq!(document, "document #3");
            assert!(message.contains("duplicate") && message.contains("dup"), "got {message}");
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn empty_stream_dispatches_to_empty_mapping() {
    let out = dispatch(&[], &settings()).unwrap();
    assert_eq!(out, Extraction::ByName(BTreeMap::new()));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let err = parse_documents("spec: [:::", Path::new("bad.yaml")).unwrap_err();
    assert!(matches!(err, InspectError::Parse { .. }), "got {err:?}");
}

#[test]
fn json_input_is_accepted() {
    let json = r#"{"metadata":{"name":"from-json"},"spec":{"config":{"storage":{"files":[{"path":"/etc/x","contents":{"source":"data:,x"}}]}}}}"#;
    let doc = parse_one(json);
    assert_eq!(doc.name(), Some("from-json"));
    assert_eq!(extract_all(&doc, &settings()).unwrap().files.unwrap()["/etc/x"], "x");
}

#[tokio::test]
async fn extract_from_source_uses_fetched_document() {
    let mut source = MockDocumentSource::new();
    source.expect_fetch().times(1).returning(|| {
        Ok(RawDocument {
            origin: "oc get mc/99-worker-foo".to_string(),
            text: SINGLE_FILE_MC.to_string(),
        })
    });

    let out = extract_from_source(&source, &settings()).await.unwrap();
    let Extraction::Single(content) = out else {
        panic!("expected single extraction");
    };
    assert_eq!(content.files.unwrap()["/etc/foo.conf"], "hello world\n");
}

#[tokio::test]
async fn extract_from_source_propagates_fetch_errors() {
    let mut source = MockDocumentSource::new();
    source.expect_fetch().returning(|| {
        Err(InspectError::Command {
            program: "oc".to_string(),
            message: "exit status: 1: not logged in".to_string(),
        })
    });

    let err = extract_from_source(&source, &settings()).await.unwrap_err();
    assert!(err.to_string().contains("not logged in"));
}

#[tokio::test]
async fn file_source_reports_missing_input_as_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("missing.yaml");
    let source = FileSource::new(InputLocation::Path(missing.clone()));

    let err = extract_from_source(&source, &settings()).await.unwrap_err();
    assert!(matches!(err, InspectError::NotFound { ref path } if path == &missing), "got {err:?}");
}

#[tokio::test]
async fn file_source_reads_documents_from_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("mc.yaml");
    std::fs::write(&path, SINGLE_FILE_MC).unwrap();

    let source = FileSource::new(InputLocation::from(path.to_str().unwrap()));
    let out = extract_from_source(&source, &settings()).await.unwrap();
    assert!(matches!(out, Extraction::Single(_)));
}

#[test]
fn dash_selects_stdin() {
    assert_eq!(InputLocation::from("-"), InputLocation::Stdin);
    assert_eq!(
        InputLocation::from("mc.yaml"),
        InputLocation::Path("mc.yaml".into())
    );
}
