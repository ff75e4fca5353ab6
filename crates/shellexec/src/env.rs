//! Environment composition for child processes

use crate::host::ShellHost;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::process::Command;

/// A full child environment
pub type EnvMap = BTreeMap<OsString, OsString>;

/// Snapshot of the current process environment
pub fn from_process() -> EnvMap {
    std::env::vars_os().collect()
}

fn is_unset(env: &EnvMap, key: &OsStr) -> bool {
    env.get(key).map_or(true, |value| value.is_empty())
}

/// Add baseline variables without clobbering ones already set to a
/// non-empty value.
pub fn merge_baseline<I, K, V>(env: &mut EnvMap, vars: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<OsString>,
    V: Into<OsString>,
{
    for (key, value) in vars {
        let key = key.into();
        if is_unset(env, &key) {
            env.insert(key, value.into());
        }
    }
}

/// Set variables unconditionally
pub fn apply_overrides<I, K, V>(env: &mut EnvMap, vars: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<OsString>,
    V: Into<OsString>,
{
    env.extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
}

/// Apply the variables explicitly set or removed on a prepared command
pub fn apply_command_envs(env: &mut EnvMap, cmd: &Command) {
    for (key, value) in cmd.get_envs() {
        match value {
            Some(value) => {
                env.insert(key.to_os_string(), value.to_os_string());
            }
            None => {
                env.remove(key);
            }
        }
    }
}

/// Base environment plus the host's baseline for `term_type`, with a
/// locale fallback when `LANG` is unset.
pub fn compose(base: &EnvMap, host: &dyn ShellHost, term_type: &str) -> EnvMap {
    let mut env = base.clone();
    let mut baseline = host.env_vars(term_type);
    if is_unset(base, OsStr::new("LANG")) {
        baseline.insert("LANG".to_string(), host.lang());
    }
    merge_baseline(&mut env, baseline);
    env
}
