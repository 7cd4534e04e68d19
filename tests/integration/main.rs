//! Integration tests for TracMath

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn tracmath() -> Command {
        cargo_bin_cmd!("tracmath")
    }

    #[test]
    fn help_displays() {
        tracmath()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Render LaTeX formulas embedded in wiki markup",
            ));
    }

    #[test]
    fn version_displays() {
        tracmath()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("tracmath"));
    }

    #[test]
    fn config_path_honors_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        tracmath()
            .args(["--config", path.to_str().unwrap(), "config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tracmath()
            .args(["--config", path.to_str().unwrap(), "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[render]"))
            .stdout(predicate::str::contains("max_png = 500"));
    }

    #[test]
    fn fetch_missing_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[render]\ncache_dir = \"cache\"\n").unwrap();

        tracmath()
            .args(["--config", path.to_str().unwrap(), "fetch", "missing.png"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cache entry not found"));
    }

    #[test]
    fn fetch_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[render]\ncache_dir = \"cache\"\n").unwrap();

        tracmath()
            .args(["--config", path.to_str().unwrap(), "fetch", "../config.toml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid cache entry name"));
    }
}

#[cfg(unix)]
mod pipeline_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use serial_test::serial;
    use sha2::{Digest, Sha256};
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const PREAMBLE: &str = "\\documentclass{article}\n\\begin{document}\n";

    /// Temp workspace with stub latex/dvipng and a config pointing at them
    struct Fixture {
        dir: TempDir,
        config: PathBuf,
        runs: PathBuf,
    }

    impl Fixture {
        fn new(latex_body: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let runs = dir.path().join("latex-runs");

            let latex = write_script(
                dir.path(),
                "latex",
                &format!("echo run >> '{}'\n{}", runs.display(), latex_body),
            );
            let dvipng = write_script(
                dir.path(),
                "dvipng",
                r#"while [ "$#" -gt 0 ]; do
  if [ "$1" = "-o" ]; then
    shift
    printf 'PNGSTUB' > "$1"
  fi
  shift
done
exit 0"#,
            );

            let config = dir.path().join("config.toml");
            let toml = format!(
                "[render]\ncache_dir = \"cache\"\nlatex_cmd = \"{}\"\ndvipng_cmd = \"{}\"\nmax_png = 3\npreamble = {:?}\n",
                latex.display(),
                dvipng.display(),
                PREAMBLE,
            );
            std::fs::write(&config, toml).unwrap();

            Self { dir, config, runs }
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("tracmath");
            cmd.arg("--config").arg(&self.config);
            cmd
        }

        fn cache(&self) -> PathBuf {
            self.dir.path().join("cache")
        }

        fn latex_runs(&self) -> usize {
            std::fs::read_to_string(&self.runs)
                .map(|s| s.lines().count())
                .unwrap_or(0)
        }

        fn pngs(&self) -> Vec<String> {
            match std::fs::read_dir(self.cache()) {
                Ok(dir) => dir
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|n| n.ends_with(".png"))
                    .collect(),
                Err(_) => Vec::new(),
            }
        }
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn expected_key(source: &str, resolution: u32) -> String {
        let template = format!("{PREAMBLE}\n\\end{{document}}\n");
        let template_digest = hex::encode(Sha256::digest(template.as_bytes()));

        let mut hasher = Sha256::new();
        hasher.update(source.trim().as_bytes());
        hasher.update(template_digest.as_bytes());
        hasher.update(resolution.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    #[test]
    #[serial]
    fn render_end_to_end() {
        let fx = Fixture::new("exit 0");
        let key = expected_key("x^2+y^2=z^2", 1200);

        fx.cmd()
            .arg("render")
            .write_stdin("x^2+y^2=z^2\n")
            .assert()
            .success()
            .stdout(predicate::str::contains(format!(
                r#"<img src="/tracmath/{key}.png" alt="x^2+y^2=z^2"#
            )));

        assert_eq!(fx.pngs(), vec![format!("{key}.png")]);
        assert!(!fx.cache().join(format!("{key}.tex")).exists());
        assert!(!fx.cache().join(format!("{key}.part")).exists());
    }

    #[test]
    #[serial]
    fn second_render_hits_cache() {
        let fx = Fixture::new("exit 0");

        for _ in 0..2 {
            fx.cmd().arg("render").write_stdin("a+b").assert().success();
        }

        assert_eq!(fx.latex_runs(), 1);
        assert_eq!(fx.pngs().len(), 1);
    }

    #[test]
    #[serial]
    fn toolchain_failure_reports_stderr() {
        let fx = Fixture::new("echo 'Undefined control sequence' >&2\nexit 1");

        fx.cmd()
            .arg("render")
            .write_stdin("\\frobnicate")
            .assert()
            .failure()
            .stdout(predicate::str::contains("has detected an error"))
            .stdout(predicate::str::contains("Undefined control sequence"));

        assert!(fx.pngs().is_empty());
    }

    #[test]
    #[serial]
    fn denylisted_source_never_runs_latex() {
        let fx = Fixture::new("exit 0");

        fx.cmd()
            .arg("render")
            .write_stdin("\\input{/etc/passwd}")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Forbidden command"));

        assert_eq!(fx.latex_runs(), 0);
    }

    #[test]
    #[serial]
    fn unknown_macro_is_reported() {
        let fx = Fixture::new("exit 0");

        fx.cmd()
            .args(["render", "--macro", "tex"])
            .write_stdin("x")
            .assert()
            .failure()
            .stdout(predicate::str::contains("Unknown macro tex"));
    }

    #[test]
    #[serial]
    fn markup_expands_processor_blocks() {
        let fx = Fixture::new("exit 0");
        let key = expected_key("E = mc^2 \\label{energy}", 1200);

        fx.cmd()
            .args(["render", "--markup"])
            .write_stdin("Intro\n{{{\n#!latex\nE = mc^2 \\label{energy}\n}}}\nOutro")
            .assert()
            .success()
            .stdout(predicate::str::contains("Intro\n"))
            .stdout(predicate::str::contains(r#"<a name="energy">(energy)</a>"#))
            .stdout(predicate::str::contains(format!("{key}.png")))
            .stdout(predicate::str::contains("\nOutro"));
    }

    #[test]
    #[serial]
    fn cache_list_and_fetch() {
        let fx = Fixture::new("exit 0");
        fx.cmd().arg("render").write_stdin("y = 2x").assert().success();
        let name = format!("{}.png", expected_key("y = 2x", 1200));

        fx.cmd()
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(name.clone()));

        let out = fx.dir.path().join("out.png");
        fx.cmd()
            .args(["fetch", &format!("/tracmath/{name}"), "-o"])
            .arg(&out)
            .assert()
            .success();
        assert_eq!(std::fs::read(&out).unwrap(), b"PNGSTUB");
    }

    #[test]
    #[serial]
    fn eviction_keeps_limit() {
        let fx = Fixture::new("exit 0");

        for formula in ["a", "b", "c", "d", "e"] {
            fx.cmd().arg("render").write_stdin(formula).assert().success();
        }

        assert_eq!(fx.pngs().len(), 3);
    }

    #[test]
    #[serial]
    fn cache_clear_with_yes() {
        let fx = Fixture::new("exit 0");
        fx.cmd().arg("render").write_stdin("z").assert().success();

        fx.cmd()
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cleared 1 file(s)"));

        assert!(fx.pngs().is_empty());
    }
}
