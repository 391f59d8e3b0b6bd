//! Integration tests for CLI commands

use std::process::{Command, Output};

const RUNTIME_ENV: &[&str] = &[
    "PREFLIGHT_DOMAIN",
    "PREFLIGHT_TLS_CERT",
    "PREFLIGHT_TLS_KEY",
    "PREFLIGHT_ADMIN_PASSWORD",
];

/// Helper to run preflight command
fn preflight(args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_preflight"));
    for var in RUNTIME_ENV {
        command.env_remove(var);
    }
    command
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute preflight")
}

/// Get a fixture path
fn fixture(name: &str) -> String {
    format!("{}/../../fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("Output should be valid JSON")
}

mod config_command {
    use super::*;

    #[test]
    fn test_reference_configuration() {
        let output = preflight(&[
            "config",
            "-f",
            &fixture("overrides.yaml"),
            "--domain",
            "test.kyma",
            "--tls-cert",
            "testCert",
            "--tls-key",
            "testKey",
            "--password",
            "testPass",
            "--json",
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let json = json(&output);

        let global = json["global"].as_object().unwrap();
        assert_eq!(global.len(), 4);
        assert_eq!(global["global.domainName"], "test.kyma");
        assert_eq!(global["global.adminPassword"], "********");

        let components = json["components"].as_array().unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0]["component"], "istio");
        assert_eq!(components[0]["configuration"].as_object().unwrap().len(), 4);
        assert_eq!(
            components[0]["configuration"]["global.proxy.resources.limits.memory"],
            "1023Mi"
        );
    }

    #[test]
    fn test_runtime_values_from_environment() {
        let output = Command::new(env!("CARGO_BIN_EXE_preflight"))
            .env("PREFLIGHT_DOMAIN", "env.example.org")
            .args(["config", "-f", &fixture("overrides.yaml"), "--json"])
            .output()
            .expect("Failed to execute preflight");

        assert!(output.status.success());
        assert_eq!(json(&output)["global"]["global.domainName"], "env.example.org");
    }

    #[test]
    fn test_later_override_file_wins() {
        let output = preflight(&[
            "config",
            "-f",
            &fixture("overrides.yaml"),
            "-f",
            &fixture("overrides-configmap.yaml"),
            "--json",
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let json = json(&output);
        assert_eq!(json["global"]["global.loadBalancerIP"], "10.0.0.1");
        assert_eq!(json["global"]["global.registry.password"], "********");
        assert_eq!(
            json["components"][0]["configuration"]["global.proxy.resources.requests.cpu"],
            "300m"
        );
    }

    #[test]
    fn test_show_secrets() {
        let output = preflight(&[
            "config",
            "--password",
            "testPass",
            "--show-secrets",
        ]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("dGVzdFBhc3M="));
    }

    #[test]
    fn test_show_secrets_with_json() {
        let output = preflight(&[
            "config",
            "-f",
            &fixture("overrides-configmap.yaml"),
            "--password",
            "testPass",
            "--json",
            "--show-secrets",
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let json = json(&output);
        assert_eq!(json["global"]["global.adminPassword"], "dGVzdFBhc3M=");
        assert_eq!(json["global"]["global.registry.password"], "secret-value");
        assert_eq!(
            json["components"][0]["configuration"]["global.proxy.resources.requests.cpu"],
            "300m"
        );
    }

    #[test]
    fn test_override_values_keep_source_text() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("versions.yaml");
        std::fs::write(&path, "global.version: 1.10\nglobal.hex: 0x1F\n").unwrap();

        let output = preflight(&["config", "-f", path.to_str().unwrap(), "--json"]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let json = json(&output);
        assert_eq!(json["global"]["global.version"], "1.10");
        assert_eq!(json["global"]["global.hex"], "0x1F");
    }

    #[test]
    fn test_secrets_masked_by_default() {
        let output = preflight(&["config", "--password", "testPass"]);

        assert!(output.status.success());
        assert!(!stdout(&output).contains("dGVzdFBhc3M="));
        assert!(stdout(&output).contains("global.adminPassword"));
    }

    #[test]
    fn test_nested_override_value_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested.yaml");
        std::fs::write(&path, "global:\n  domainName: example.org\n").unwrap();

        let output = preflight(&["config", "-f", path.to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("scalar"));
    }

    #[test]
    fn test_missing_override_file() {
        let output = preflight(&["config", "-f", &fixture("does-not-exist.yaml")]);
        assert_eq!(output.status.code(), Some(5));
    }
}

mod components_command {
    use super::*;

    #[test]
    fn test_flat_components() {
        let output = preflight(&["components", &fixture("components.yaml"), "--json"]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let components = json(&output);
        let components = components.as_array().unwrap();
        assert_eq!(components.len(), 6);
        assert_eq!(components[0]["name"], "cluster-essentials");
        assert_eq!(components[5]["namespace"], "");
    }

    #[test]
    fn test_installation_resource_components() {
        let output = preflight(&["components", &fixture("installation.yaml"), "--json"]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(json(&output).as_array().unwrap().len(), 8);
    }

    #[test]
    fn test_table_output_uses_default_namespace() {
        let output = preflight(&[
            "components",
            &fixture("components.yaml"),
            "--default-namespace",
            "fallback-ns",
        ]);

        assert!(output.status.success());
        let stdout = stdout(&output);
        assert!(stdout.contains("NAMESPACE"));
        assert!(stdout.contains("fallback-ns"));
    }

    #[test]
    fn test_unrecognized_declaration() {
        let output = preflight(&["components", &fixture("not-components.yaml")]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("spec.components"));
    }
}

mod image_command {
    use super::*;

    #[test]
    fn test_get_image() {
        let output = preflight(&["image", "get", &fixture("installer.yaml")]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(stdout(&output).trim(), "eu.gcr.io/kyma-project/kyma-installer:1.2.0");
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::TempDir::new().unwrap();
        let patched = dir.path().join("installer.yaml");
        let patched = patched.to_str().unwrap();

        let output = preflight(&[
            "image",
            "set",
            &fixture("installer.yaml"),
            "eu.gcr.io/kyma-project/kyma-installer:1.3.0",
            "-o",
            patched,
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let output = preflight(&["image", "get", patched]);
        assert_eq!(stdout(&output).trim(), "eu.gcr.io/kyma-project/kyma-installer:1.3.0");

        let content = std::fs::read_to_string(patched).unwrap();
        assert!(content.contains("kind: Namespace"));
        assert!(content.contains("serviceAccountName: kyma-installer"));
    }

    #[test]
    fn test_set_to_stdout() {
        let output = preflight(&["image", "set", &fixture("installer.yaml"), "example/installer:dev"]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("image: example/installer:dev"));
    }

    #[test]
    fn test_unknown_container() {
        let output = preflight(&[
            "image",
            "get",
            &fixture("installer.yaml"),
            "--container",
            "missing",
        ]);

        assert_eq!(output.status.code(), Some(4));
        assert!(stderr(&output).contains("missing"));
    }

    #[test]
    fn test_manifest_without_installer() {
        let output = preflight(&["image", "set", &fixture("components.yaml"), "x"]);
        assert_eq!(output.status.code(), Some(4));
    }
}

mod check_upgrade_command {
    use super::*;

    #[test]
    fn test_allowed() {
        let output = preflight(&["check-upgrade", "1.2.0", "1.3.0"]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("is allowed"));
    }

    #[test]
    fn test_denied_scenarios() {
        let cases = [
            ("1.2.0", "1.2.0", "already at target version"),
            ("1.3.0", "1.2.0", "downgrade unsupported"),
            ("1.2.0", "1.4.0", "minor version gap too large"),
            ("1.2.0", "2.0.0", "major version gap too large"),
        ];

        for (installed, target, reason) in cases {
            let output = preflight(&["check-upgrade", installed, target]);

            assert_eq!(output.status.code(), Some(6), "{} -> {}", installed, target);
            assert!(stdout(&output).contains(reason), "{} -> {}", installed, target);
        }
    }

    #[test]
    fn test_json_output() {
        let output = preflight(&["check-upgrade", "1.2.0", "1.3.0", "--json"]);

        assert!(output.status.success());
        let json = json(&output);
        assert_eq!(json["allowed"], true);
        assert_eq!(json["resolved_version"], "1.3.0");
        assert!(json["reason"].is_null());
    }

    #[test]
    fn test_json_output_denied() {
        let output = preflight(&["check-upgrade", "1.2.0", "1.4.0", "--json"]);

        assert_eq!(output.status.code(), Some(6));
        let json = json(&output);
        assert_eq!(json["allowed"], false);
        assert_eq!(json["reason"], "minor-gap");
    }

    #[test]
    fn test_invalid_version() {
        let output = preflight(&["check-upgrade", "not-a-version", "1.3.0"]);
        assert_eq!(output.status.code(), Some(2));
    }
}

mod prepare_command {
    use super::*;

    #[test]
    fn test_prepare_upgrade() {
        let output = preflight(&[
            "prepare",
            "--installed",
            "1.2.0",
            "--target",
            "1.3.0",
            "--manifest",
            &fixture("installer.yaml"),
            "--components",
            &fixture("installation.yaml"),
            "-f",
            &fixture("overrides.yaml"),
            "--domain",
            "test.kyma",
            "--image",
            "eu.gcr.io/kyma-project/kyma-installer:1.3.0",
            "--json",
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let json = json(&output);
        assert_eq!(json["action"]["action"], "upgrade");
        assert_eq!(json["decision"]["resolved_version"], "1.3.0");
        assert_eq!(json["installer_image"], "eu.gcr.io/kyma-project/kyma-installer:1.3.0");
        assert_eq!(json["components"].as_array().unwrap().len(), 8);
        assert_eq!(json["configurations"]["global"]["global.domainName"], "test.kyma");
        assert!(stderr(&output).contains("Upgrade is ready"));
    }

    #[test]
    fn test_prepare_writes_patched_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("patched.yaml");

        let output = preflight(&[
            "prepare",
            "--installed",
            "1.2.0",
            "--target",
            "1.3.0",
            "--manifest",
            &fixture("installer.yaml"),
            "--image",
            "example/installer:1.3.0",
            "-o",
            out.to_str().unwrap(),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.contains("image: example/installer:1.3.0"));
    }

    #[test]
    fn test_prepare_reattaches() {
        let output = preflight(&[
            "prepare",
            "--state",
            "InProgress",
            "--installed",
            "1.2.0",
            "--target",
            "1.3.0",
        ]);

        assert!(output.status.success());
        assert!(stderr(&output).contains("already in progress"));
    }

    #[test]
    fn test_prepare_reattach_leaves_manifest_unwritten() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("patched.yaml");

        let output = preflight(&[
            "prepare",
            "--state",
            "InProgress",
            "--installed",
            "1.2.0",
            "--target",
            "1.3.0",
            "--manifest",
            &fixture("installer.yaml"),
            "--image",
            "example/installer:1.3.0",
            "-o",
            out.to_str().unwrap(),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(!out.exists());
        assert!(stderr(&output).contains("not written"));
    }

    #[test]
    fn test_prepare_denied() {
        let output = preflight(&["prepare", "--installed", "1.2.0", "--target", "2.0.0"]);

        assert_eq!(output.status.code(), Some(6));
        assert!(stderr(&output).contains("major version gap too large"));
    }

    #[test]
    fn test_prepare_not_installed() {
        let output = preflight(&[
            "prepare",
            "--state",
            "NoInstallation",
            "--installed",
            "",
            "--target",
            "1.3.0",
        ]);

        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("nothing"));
    }
}

mod usage {
    use super::*;

    #[test]
    fn test_unknown_flag() {
        let output = preflight(&["check-upgrade", "1.2.0", "1.3.0", "--bogus"]);
        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_help() {
        let output = preflight(&["--help"]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("check-upgrade"));
    }
}
