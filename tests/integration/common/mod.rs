#![allow(dead_code)]

use std::{
    fs,
    os::unix::{fs::PermissionsExt, net::UnixListener},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

/// A throwaway directory holding templates, scripts and the config file.
pub struct Fixture {
    pub dir: PathBuf,
}

impl Fixture {
    /// Writes templates, both scripts and `tandem.yaml` into `dir`.
    pub fn new(dir: &Path, independent: &str, dependent: &str) -> Self {
        fs::write(dir.join("app.conf.tpl"), "listen = {{sock}}\n").unwrap();
        fs::write(
            dir.join("proxy.conf.tpl"),
            "upstream app { server unix:{{sock}}; }\nerror_log {{sock}}.log;\n",
        )
        .unwrap();

        write_script(&dir.join("independent.sh"), independent);
        write_script(&dir.join("dependent.sh"), dependent);

        let yaml = format!(
            r#"endpoint: {dir}/app.sock
token: "{{{{sock}}}}"
log_dir: {dir}/logs/proxy
probe:
  interval: 50ms
monitor:
  interval: 100ms
independent:
  name: app
  command: /bin/sh
  args: ["{dir}/independent.sh"]
  template: app.conf.tpl
  config: {dir}/app.conf
dependent:
  name: proxy
  command: /bin/sh
  args: ["{dir}/dependent.sh"]
  template: proxy.conf.tpl
  config: {dir}/proxy.conf
"#,
            dir = dir.display()
        );
        fs::write(dir.join("tandem.yaml"), yaml).unwrap();

        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join("tandem.yaml")
    }

    pub fn endpoint(&self) -> PathBuf {
        self.dir.join("app.sock")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Plays the independent process's part: start accepting on the endpoint.
    pub fn bind_endpoint(&self) -> UnixListener {
        UnixListener::bind(self.endpoint()).unwrap()
    }

    /// Starts `tandem run` against this fixture.
    pub fn spawn_supervisor(&self) -> Child {
        Command::new(assert_cmd::cargo::cargo_bin!("tandem"))
            .arg("run")
            .arg("--config")
            .arg(self.config_path())
            .arg("--log-level")
            .arg("debug")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to start tandem")
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Script body that records SIGTERM in `marker` and otherwise runs forever.
pub fn record_term(marker: &Path) -> String {
    format!(
        "trap 'echo terminated > {}; exit 0' TERM\nwhile true; do sleep 0.1; done",
        marker.display()
    )
}

pub fn send_signal(child: &Child, signal: nix::sys::signal::Signal) {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(child.id() as i32), signal).unwrap();
}

/// Waits for the supervisor to exit, killing it if it takes too long.
pub fn wait_for_exit(child: &mut Child, timeout: Duration) -> ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            panic!("tandem did not exit within {timeout:?}");
        }
        thread::sleep(Duration::from_millis(50));
    }
}

pub fn wait_for_path(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    panic!("Timed out waiting for {:?} to exist", path);
}
