#![allow(dead_code)]

use shellexec::{EnvMap, Launcher, ShellHost, TermDefaults};
use shellexec_test_utils::TestFixtures;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// Deterministic host: `/bin/sh`, a temporary home, 25x80 defaults
pub struct TestHost {
    pub home: PathBuf,
    pub defaults: TermDefaults,
}

impl ShellHost for TestHost {
    fn shell_path(&self) -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    fn term_defaults(&self) -> TermDefaults {
        self.defaults.clone()
    }

    fn env_vars(&self, term_type: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("TERM".to_string(), term_type.to_string())])
    }

    fn lang(&self) -> String {
        "C.UTF-8".to_string()
    }

    fn home_dir(&self) -> PathBuf {
        self.home.clone()
    }
}

pub struct TestEnv {
    pub fixtures: TestFixtures,
    pub home: PathBuf,
    pub launcher: Launcher,
}

pub fn base_env(pairs: &[(&str, &str)]) -> EnvMap {
    pairs
        .iter()
        .map(|(k, v)| (OsString::from(k), OsString::from(v)))
        .collect()
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_defaults(TermDefaults::default())
    }

    pub fn with_defaults(defaults: TermDefaults) -> Self {
        Self::with_base_env(defaults, base_env(&[("PATH", "/usr/bin:/bin")]))
    }

    pub fn with_base_env(defaults: TermDefaults, env: EnvMap) -> Self {
        shellexec_test_utils::init_test_logging();
        let fixtures = TestFixtures::new().expect("create fixtures");
        let home = fixtures.create_dir("home").expect("create home");
        let host = TestHost {
            home: home.clone(),
            defaults,
        };
        let launcher = Launcher::with_base_env(Arc::new(host), env);
        Self {
            fixtures,
            home,
            launcher,
        }
    }
}

/// Read a PTY master until the child side goes away
pub fn read_to_end(mut pty: std::fs::File) -> Vec<u8> {
    let mut output = Vec::new();
    let mut buffer = [0u8; 4096];
    loop {
        match pty.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => output.extend_from_slice(&buffer[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    output
}
